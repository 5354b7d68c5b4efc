//! Class lowering.
//!
//! A class becomes a scope holding the parent constructor, the parent
//! prototype and the class's inner name. Methods capture the first two for
//! `super` lookups; they are initialized only when some method uses them.

use std::sync::Arc;

use crate::error::CompileError;
use crate::parser::ast::{ClassData, MethodDefinitionKind};
use crate::runner::compiler::ir::{Args, BinaryOp, Binding, Expr, FunctionKind, IrFunction, Literal, MemberKey, MethodKind};
use crate::runner::compiler::lower::Lowerer;
use crate::runner::compiler::scope::{HomeKind, Implicit, SUPER_CONSTRUCTOR, SUPER_PROTOTYPE};

fn local(var: u32) -> Expr {
    Expr::Var(Binding::Local(var))
}

fn prototype_of(object: Expr) -> Expr {
    Expr::Member {
        object: object.boxed(),
        key: MemberKey::Named(Arc::from("prototype")),
    }
}

impl<'a> Lowerer<'a> {
    pub(crate) fn lower_class(&mut self, class: &ClassData, name: Option<Arc<str>>) -> Result<Expr, CompileError> {
        let name = class.id.clone().or(name);
        let parent = class.super_class.map(|e| self.lower_expr(e)).transpose()?;
        self.in_block(|this| this.lower_class_body(class, name, parent))
    }

    fn lower_class_body(
        &mut self,
        class: &ClassData,
        name: Option<Arc<str>>,
        parent: Option<Expr>,
    ) -> Result<Expr, CompileError> {
        let super_constructor = self.binder.declare(&Arc::from(SUPER_CONSTRUCTOR), true);
        let super_prototype = self.binder.declare(&Arc::from(SUPER_PROTOTYPE), true);
        let inner = class.id.as_ref().map(|id| self.binder.declare(id, true));
        let class_var = match inner {
            Some(var) => var,
            None => self.binder.temp(),
        };
        let derived = parent.is_some();

        let constructor = match class.constructor {
            Some(constructor) => self.lower_function(constructor, name.clone(), None, Some(HomeKind::Prototype))?,
            None => self.default_constructor(class, name, derived),
        };

        let mut methods = Vec::with_capacity(class.body.len());
        for method in &class.body {
            let key = self.property_key(&method.key)?;
            let home = if method.static_flag {
                HomeKind::Constructor
            } else {
                HomeKind::Prototype
            };
            let function = self.lower_function(method.value, None, None, Some(home))?;
            let target = if method.static_flag {
                local(class_var)
            } else {
                prototype_of(local(class_var))
            };
            methods.push(Expr::DefineMethod {
                target: target.boxed(),
                key,
                function: Expr::Function(Box::new(function)).boxed(),
                kind: match method.kind {
                    MethodDefinitionKind::Method => MethodKind::Method,
                    MethodDefinitionKind::Get => MethodKind::Getter,
                    MethodDefinitionKind::Set => MethodKind::Setter,
                },
            });
        }

        let mut items = Vec::with_capacity(methods.len() + 5);
        let parent_expr = match parent {
            Some(parent) => {
                items.push(Expr::Assign(Binding::Local(super_constructor), parent.boxed()));
                Some(local(super_constructor).boxed())
            }
            None => None,
        };
        items.push(Expr::Assign(
            Binding::Local(class_var),
            Expr::CreateClass {
                constructor: Expr::Function(Box::new(constructor)).boxed(),
                parent: parent_expr,
            }
            .boxed(),
        ));
        if derived {
            if self.binder.var_captured(super_prototype) {
                let is_null = Expr::Binary(
                    BinaryOp::StrictEq,
                    local(super_constructor).boxed(),
                    Expr::Constant(Literal::Null).boxed(),
                );
                items.push(Expr::Assign(
                    Binding::Local(super_prototype),
                    Expr::Conditional {
                        test: is_null.boxed(),
                        then: Expr::Constant(Literal::Null).boxed(),
                        otherwise: prototype_of(local(super_constructor)).boxed(),
                    }
                    .boxed(),
                ));
            }
        } else {
            if self.binder.var_captured(super_constructor) {
                let base = prototype_of(Expr::GlobalGet(Arc::from("Function")));
                items.push(Expr::Assign(Binding::Local(super_constructor), base.boxed()));
            }
            if self.binder.var_captured(super_prototype) {
                let base = prototype_of(Expr::GlobalGet(Arc::from("Object")));
                items.push(Expr::Assign(Binding::Local(super_prototype), base.boxed()));
            }
        }
        items.extend(methods);
        items.push(local(class_var));

        let mut vars = vec![super_constructor, super_prototype];
        vars.extend(inner);
        Ok(Expr::Scope {
            vars,
            body: Expr::Block(items).boxed(),
        })
    }

    /// `constructor() {}`, or `constructor(...args) { super(...args); }` when derived.
    fn default_constructor(&mut self, class: &ClassData, name: Option<Arc<str>>, derived: bool) -> IrFunction {
        let kind = if derived {
            FunctionKind::DerivedConstructor
        } else {
            FunctionKind::ClassConstructor
        };
        self.binder.enter_function(kind, Some(HomeKind::Prototype), true);
        let mut body = Vec::new();
        if derived {
            let this = self.binder.implicit(Implicit::This);
            if let Expr::Var(this) = this {
                let constructor = self.read_name(&Arc::from(SUPER_CONSTRUCTOR));
                let new_target = self.binder.implicit(Implicit::NewTarget);
                body.push(Expr::Assign(
                    this,
                    Expr::SuperCall {
                        constructor: constructor.boxed(),
                        new_target: new_target.boxed(),
                        args: Args::Spread(Expr::RestArguments(0).boxed()),
                    }
                    .boxed(),
                ));
            }
            body.push(Expr::Return(self.derived_result(Expr::undefined()).boxed()));
        }
        let scope = self.binder.exit_function();
        let mut items = scope.prologue;
        items.extend(body);
        IrFunction {
            name: name.map(|n| n.to_string()).unwrap_or_default(),
            kind,
            arity: 0,
            vars: scope.vars,
            captures: scope.captures,
            body: Expr::Block(items),
            self_binding: None,
            source_start: class.meta.start_index as u32,
            source_end: class.meta.end_index as u32,
        }
    }
}
