//! Destructuring.
//!
//! A pattern is lowered against a value expression evaluated exactly once.
//! Object patterns read properties; array patterns drive the iterator
//! protocol and close the iterator unless a rest element drained it.

use std::sync::Arc;

use crate::error::{CompileError, CompileErrorKind};
use crate::parser::ast::{PatId, PatternType, PropertyName};
use crate::runner::compiler::ir::{BinaryOp, Binding, ErrorKind, Expr, Literal, MemberKey};
use crate::runner::compiler::lower::Lowerer;
use crate::runner::compiler::lower_expr::CONST_ASSIGNMENT;
use crate::runner::compiler::scope::Resolution;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum PatternMode {
    /// Initializes freshly declared bindings, `const` included.
    Declaration,
    /// Writes existing bindings or members.
    Assignment,
}

fn local(var: u32) -> Expr {
    Expr::Var(Binding::Local(var))
}

impl<'a> Lowerer<'a> {
    pub(crate) fn bind_pattern(&mut self, pattern: PatId, value: Expr, mode: PatternMode) -> Result<Expr, CompileError> {
        let node = self.ast.pattern(pattern);
        match &node.kind {
            PatternType::Identifier(name) => self.bind_name(name, value, mode),
            PatternType::Member(target) => {
                if mode == PatternMode::Declaration {
                    return Err(self.error(CompileErrorKind::Compile, node.meta, "invalid destructuring target"));
                }
                let (object, key) = self.member_target(*target)?;
                Ok(Expr::SetMember {
                    object: object.boxed(),
                    key,
                    value: value.boxed(),
                })
            }
            PatternType::AssignmentPattern { target, default } => {
                let temp = self.binder.temp();
                let name = match &self.ast.pattern(*target).kind {
                    PatternType::Identifier(name) => Some(name.clone()),
                    _ => None,
                };
                let default = self.lower_expr_named(*default, name)?;
                let bind = self.bind_pattern(*target, local(temp), mode)?;
                Ok(Expr::Block(vec![
                    Expr::Assign(Binding::Local(temp), value.boxed()),
                    Expr::Conditional {
                        test: Expr::Binary(BinaryOp::StrictEq, local(temp).boxed(), Expr::undefined().boxed()).boxed(),
                        then: Expr::Assign(Binding::Local(temp), default.boxed()).boxed(),
                        otherwise: Expr::Block(Vec::new()).boxed(),
                    },
                    bind,
                ]))
            }
            PatternType::ObjectPattern { properties, rest } => {
                let source = self.binder.temp();
                let mut items = vec![
                    Expr::Assign(Binding::Local(source), value.boxed()),
                    Expr::Conditional {
                        test: Expr::Binary(BinaryOp::Eq, local(source).boxed(), Expr::Constant(Literal::Null).boxed())
                            .boxed(),
                        then: Expr::ThrowError(
                            ErrorKind::TypeError,
                            Arc::from("Cannot destructure 'undefined' or 'null'."),
                        )
                        .boxed(),
                        otherwise: Expr::Block(Vec::new()).boxed(),
                    },
                ];
                let mut excluded = Vec::new();
                for property in properties {
                    let key = match &property.key {
                        PropertyName::Named(name) => {
                            if rest.is_some() {
                                excluded.push(Expr::Constant(Literal::String(name.clone())));
                            }
                            MemberKey::Named(name.clone())
                        }
                        PropertyName::Computed(key) => {
                            let key_var = self.binder.temp();
                            let key = self.lower_expr(*key)?;
                            items.push(Expr::Assign(Binding::Local(key_var), key.boxed()));
                            if rest.is_some() {
                                excluded.push(local(key_var));
                            }
                            MemberKey::Computed(local(key_var).boxed())
                        }
                    };
                    let read = Expr::Member {
                        object: local(source).boxed(),
                        key,
                    };
                    items.push(self.bind_pattern(property.value, read, mode)?);
                }
                if let Some(rest) = rest {
                    let copy = Expr::CopyDataProperties {
                        target: Expr::Object(Vec::new()).boxed(),
                        source: local(source).boxed(),
                        excluded,
                    };
                    items.push(self.bind_pattern(*rest, copy, mode)?);
                }
                Ok(Expr::Block(items))
            }
            PatternType::ArrayPattern { elements, rest } => {
                let iterator = self.binder.temp();
                let mut items = vec![Expr::Assign(
                    Binding::Local(iterator),
                    Expr::GetIterator(value.boxed()).boxed(),
                )];
                for element in elements {
                    let next = Expr::IteratorValue(Binding::Local(iterator));
                    items.push(match element {
                        Some(element) => self.bind_pattern(*element, next, mode)?,
                        None => next,
                    });
                }
                match rest {
                    Some(rest) => {
                        let remaining = Expr::IteratorRest(Binding::Local(iterator));
                        items.push(self.bind_pattern(*rest, remaining, mode)?);
                    }
                    None => items.push(Expr::IteratorClose(Binding::Local(iterator))),
                }
                Ok(Expr::Block(items))
            }
        }
    }

    /// Writes `value` to the variable `name` resolves to.
    pub(crate) fn bind_name(&mut self, name: &Arc<str>, value: Expr, mode: PatternMode) -> Result<Expr, CompileError> {
        Ok(match self.binder.resolve(name) {
            Resolution::Local(resolved) if resolved.constant && mode == PatternMode::Assignment => Expr::Block(vec![
                value,
                Expr::ThrowError(ErrorKind::TypeError, Arc::from(CONST_ASSIGNMENT)),
            ]),
            Resolution::Local(resolved) => Expr::Assign(resolved.binding, value.boxed()),
            Resolution::Global => Expr::GlobalSet(name.clone(), value.boxed()),
        })
    }
}
