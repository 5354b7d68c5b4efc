//! Expression lowering.

use std::sync::Arc;

use crate::error::{CompileError, CompileErrorKind};
use crate::parser::ast::{
    AssignmentOperator, BinaryOperator, ExprId, ExpressionOrSpreadElement, ExpressionType, LiteralType,
    LogicalOperator, MemberProperty, Meta, PatId, PatternType, PropertyData, PropertyKind, PropertyName,
    TemplateElementData, UnaryOperator, UpdateOperator,
};
use crate::runner::compiler::ir::{
    Args, ArrayElement, BinaryOp, Binding, Callee, ErrorKind, Expr, Literal, LogicalOp, MemberKey,
    MethodKind, PropertyInit, UnaryOp, VarId,
};
use crate::runner::compiler::lower::Lowerer;
use crate::runner::compiler::patterns::PatternMode;
use crate::runner::compiler::scope::{HomeKind, Implicit, Resolution, Resolved, SUPER_CONSTRUCTOR, SUPER_PROTOTYPE};

pub(crate) const CONST_ASSIGNMENT: &str = "Assignment to constant variable.";

/// A place that can be read and written more than once without
/// re-evaluating the expressions that located it.
pub(crate) enum Reference {
    Local(Resolved),
    Global(Arc<str>),
    Member { object: VarId, key: ReferenceKey },
}

pub(crate) enum ReferenceKey {
    Named(Arc<str>),
    Computed(VarId),
}

fn binary_op(operator: BinaryOperator) -> BinaryOp {
    match operator {
        BinaryOperator::LooselyEqual => BinaryOp::Eq,
        BinaryOperator::LooselyUnequal => BinaryOp::NotEq,
        BinaryOperator::StrictlyEqual => BinaryOp::StrictEq,
        BinaryOperator::StrictlyUnequal => BinaryOp::StrictNotEq,
        BinaryOperator::LessThan => BinaryOp::Lt,
        BinaryOperator::LessThanEqual => BinaryOp::LtEq,
        BinaryOperator::GreaterThan => BinaryOp::Gt,
        BinaryOperator::GreaterThanEqual => BinaryOp::GtEq,
        BinaryOperator::BitwiseLeftShift => BinaryOp::Shl,
        BinaryOperator::BitwiseRightShift => BinaryOp::Shr,
        BinaryOperator::BitwiseUnsignedRightShift => BinaryOp::UShr,
        BinaryOperator::Add => BinaryOp::Add,
        BinaryOperator::Subtract => BinaryOp::Sub,
        BinaryOperator::Multiply => BinaryOp::Mul,
        BinaryOperator::Divide => BinaryOp::Div,
        BinaryOperator::Modulo => BinaryOp::Mod,
        BinaryOperator::Exponent => BinaryOp::Exp,
        BinaryOperator::BitwiseOr => BinaryOp::BitOr,
        BinaryOperator::BitwiseAnd => BinaryOp::BitAnd,
        BinaryOperator::BitwiseXor => BinaryOp::BitXor,
        BinaryOperator::In => BinaryOp::In,
        BinaryOperator::InstanceOf => BinaryOp::InstanceOf,
    }
}

fn logical_op(operator: LogicalOperator) -> LogicalOp {
    match operator {
        LogicalOperator::Or => LogicalOp::Or,
        LogicalOperator::And => LogicalOp::And,
        LogicalOperator::NullishCoalescing => LogicalOp::Nullish,
    }
}

fn local(var: VarId) -> Expr {
    Expr::Var(Binding::Local(var))
}

fn named(name: &str) -> MemberKey {
    MemberKey::Named(Arc::from(name))
}

impl<'a> Lowerer<'a> {
    pub(crate) fn lower_expr(&mut self, id: ExprId) -> Result<Expr, CompileError> {
        let node = self.ast.expression(id);
        let meta = node.meta;
        match &node.kind {
            ExpressionType::Literal(literal) => Ok(match literal {
                LiteralType::StringLiteral(s) => Expr::Constant(Literal::String(s.clone())),
                LiteralType::BooleanLiteral(b) => Expr::Constant(Literal::Boolean(*b)),
                LiteralType::NullLiteral => Expr::Constant(Literal::Null),
                LiteralType::NumberLiteral(n) => Expr::number(*n),
                LiteralType::RegExpLiteral { pattern, flags } => Expr::New {
                    callee: Expr::GlobalGet(Arc::from("RegExp")).boxed(),
                    args: Args::List(vec![
                        Expr::Constant(Literal::String(pattern.clone())),
                        Expr::Constant(Literal::String(flags.clone())),
                    ]),
                },
            }),
            ExpressionType::Identifier(name) => Ok(self.read_name(name)),
            ExpressionType::ThisExpression => Ok(self.binder.implicit(Implicit::This)),
            ExpressionType::NewTarget => Ok(self.binder.implicit(Implicit::NewTarget)),
            ExpressionType::ArrayExpression(elements) => {
                let mut lowered = Vec::with_capacity(elements.len());
                for element in elements {
                    lowered.push(match element {
                        None => ArrayElement::Hole,
                        Some(ExpressionOrSpreadElement::Expression(e)) => ArrayElement::Item(self.lower_expr(*e)?),
                        Some(ExpressionOrSpreadElement::SpreadElement(e)) => {
                            ArrayElement::Spread(self.lower_expr(*e)?)
                        }
                    });
                }
                Ok(Expr::Array(lowered))
            }
            ExpressionType::ObjectExpression(properties) => self.lower_object(properties),
            ExpressionType::FunctionExpression(function) => self.lower_function_expression(*function, None),
            ExpressionType::ClassExpression(class) => self.lower_class(class, None),
            ExpressionType::UnaryExpression { operator, argument } => self.lower_unary(*operator, *argument),
            ExpressionType::UpdateExpression {
                operator,
                argument,
                prefix,
            } => self.lower_update(*operator, *argument, *prefix),
            ExpressionType::BinaryExpression { operator, left, right } => {
                let left = self.lower_expr(*left)?;
                let right = self.lower_expr(*right)?;
                Ok(Expr::Binary(binary_op(*operator), left.boxed(), right.boxed()))
            }
            ExpressionType::LogicalExpression { operator, left, right } => {
                let left = self.lower_expr(*left)?;
                let right = self.lower_expr(*right)?;
                Ok(Expr::Logical(logical_op(*operator), left.boxed(), right.boxed()))
            }
            ExpressionType::AssignmentExpression { operator, left, right } => {
                self.lower_assignment(*operator, *left, *right)
            }
            ExpressionType::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => Ok(Expr::Conditional {
                test: self.lower_expr(*test)?.boxed(),
                then: self.lower_expr(*consequent)?.boxed(),
                otherwise: self.lower_expr(*alternate)?.boxed(),
            }),
            ExpressionType::CallExpression {
                callee,
                arguments,
                optional,
            } => self.lower_call(*callee, arguments, *optional, meta),
            ExpressionType::NewExpression { callee, arguments } => {
                let callee = self.lower_expr(*callee)?;
                let args = self.lower_arguments(arguments)?;
                Ok(Expr::New {
                    callee: callee.boxed(),
                    args,
                })
            }
            ExpressionType::MemberExpression {
                object,
                property,
                optional,
            } => {
                let object = self.lower_expr(*object)?;
                let object = if *optional { self.guard_nullish(object, meta)? } else { object };
                let key = self.member_key(property)?;
                Ok(Expr::Member {
                    object: object.boxed(),
                    key,
                })
            }
            ExpressionType::OptionalChain(inner) => {
                self.optional_chain(*inner, Expr::undefined(), Self::lower_expr)
            }
            ExpressionType::SuperMember(property) => {
                let home = self.super_home(meta)?;
                let key = self.member_key(property)?;
                Ok(Expr::SuperMember {
                    home: home.boxed(),
                    key,
                    this: self.binder.implicit(Implicit::This).boxed(),
                })
            }
            ExpressionType::SuperCall(arguments) => self.lower_super_call(arguments, meta),
            ExpressionType::SequenceExpression(expressions) => {
                let items = expressions
                    .iter()
                    .map(|e| self.lower_expr(*e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Block(items))
            }
            ExpressionType::YieldExpression { argument, delegate } => {
                let value = match argument {
                    Some(argument) => self.lower_expr(*argument)?,
                    None => Expr::undefined(),
                };
                if *delegate {
                    Ok(self.delegate_yield(value))
                } else {
                    Ok(Expr::Yield(value.boxed()))
                }
            }
            ExpressionType::AwaitExpression(argument) => Ok(Expr::Await(self.lower_expr(*argument)?.boxed())),
            ExpressionType::TemplateLiteral { quasis, expressions } => self.lower_template(quasis, expressions),
            ExpressionType::TaggedTemplateExpression {
                tag,
                quasis,
                expressions,
            } => {
                let callee = self.lower_callee(*tag, meta)?;
                let mut args = vec![Expr::TemplateObject {
                    cooked: quasis.iter().map(|q| q.cooked.clone()).collect(),
                    raw: quasis.iter().map(|q| q.raw.clone()).collect(),
                }];
                for expression in expressions {
                    args.push(self.lower_expr(*expression)?);
                }
                Ok(Expr::Call {
                    callee,
                    args: Args::List(args),
                })
            }
        }
    }

    /// Lowers an initializer, naming it after its binding when it is an
    /// anonymous function or class.
    pub(crate) fn lower_expr_named(&mut self, id: ExprId, name: Option<Arc<str>>) -> Result<Expr, CompileError> {
        match &self.ast.expression(id).kind {
            ExpressionType::FunctionExpression(function) if self.ast.function(*function).id.is_none() => {
                self.lower_function_expression(*function, name)
            }
            ExpressionType::ClassExpression(class) if class.id.is_none() => self.lower_class(class, name),
            _ => self.lower_expr(id),
        }
    }

    fn lower_function_expression(
        &mut self,
        function: crate::parser::ast::FuncId,
        name: Option<Arc<str>>,
    ) -> Result<Expr, CompileError> {
        let data = self.ast.function(function);
        let own_name = match (&data.id, data.form) {
            (Some(id), crate::parser::ast::FunctionForm::Expression) => id.clone(),
            _ => {
                let ir = self.lower_function(function, name, None, None)?;
                return Ok(Expr::Function(Box::new(ir)));
            }
        };
        // The name of a function expression is visible only inside it.
        self.in_block(|this| {
            let var = this.binder.declare(&own_name, true);
            let ir = this.lower_function(function, None, Some(var), None)?;
            if ir.self_binding.is_none() {
                return Ok(Expr::Function(Box::new(ir)));
            }
            Ok(Expr::Scope {
                vars: vec![var],
                body: Expr::Block(vec![
                    Expr::Assign(Binding::Local(var), Expr::Function(Box::new(ir)).boxed()),
                    local(var),
                ])
                .boxed(),
            })
        })
    }

    pub(crate) fn read_name(&mut self, name: &Arc<str>) -> Expr {
        if &**name == "arguments" {
            if let Some(arguments) = self.binder.resolve_arguments() {
                return arguments;
            }
        }
        match self.binder.resolve(name) {
            Resolution::Local(resolved) => Expr::Var(resolved.binding),
            Resolution::Global if &**name == "undefined" => Expr::undefined(),
            Resolution::Global => Expr::GlobalGet(name.clone()),
        }
    }

    pub(crate) fn member_key(&mut self, property: &MemberProperty) -> Result<MemberKey, CompileError> {
        Ok(match property {
            MemberProperty::Named(name) => MemberKey::Named(name.clone()),
            MemberProperty::Computed(expr) => MemberKey::Computed(self.lower_expr(*expr)?.boxed()),
        })
    }

    pub(crate) fn property_key(&mut self, key: &PropertyName) -> Result<MemberKey, CompileError> {
        Ok(match key {
            PropertyName::Named(name) => MemberKey::Named(name.clone()),
            PropertyName::Computed(expr) => MemberKey::Computed(self.lower_expr(*expr)?.boxed()),
        })
    }

    /// Lowers `inner` under a fresh chain label. A short-circuit skips the
    /// rest of the chain and evaluates `short` instead.
    fn optional_chain(
        &mut self,
        inner: ExprId,
        short: Expr,
        lower: fn(&mut Self, ExprId) -> Result<Expr, CompileError>,
    ) -> Result<Expr, CompileError> {
        let done = self.binder.new_label();
        let skipped = self.binder.new_label();
        self.chains.push(skipped);
        let body = lower(self, inner);
        self.chains.pop();
        let body = Expr::Block(vec![body?, Expr::Goto(done)]);
        Ok(Expr::Label(
            done,
            Expr::Block(vec![Expr::Label(skipped, body.boxed()), short]).boxed(),
        ))
    }

    /// Evaluates `value` once; leaves the innermost optional chain when it
    /// is null or undefined.
    fn guard_nullish(&mut self, value: Expr, meta: Meta) -> Result<Expr, CompileError> {
        let label = match self.chains.last() {
            Some(label) => *label,
            None => {
                return Err(self.error(CompileErrorKind::Compile, meta, "optional access outside of a chain"));
            }
        };
        let temp = self.binder.temp();
        Ok(Expr::Block(vec![
            Expr::Assign(Binding::Local(temp), value.boxed()),
            Expr::Conditional {
                test: Expr::Binary(BinaryOp::Eq, local(temp).boxed(), Expr::Constant(Literal::Null).boxed()).boxed(),
                then: Expr::Goto(label).boxed(),
                otherwise: Expr::Block(Vec::new()).boxed(),
            },
            local(temp),
        ]))
    }

    pub(crate) fn super_home(&mut self, meta: Meta) -> Result<Expr, CompileError> {
        match self.binder.home() {
            Some(HomeKind::Prototype) => Ok(self.read_name(&Arc::from(SUPER_PROTOTYPE))),
            Some(HomeKind::Constructor) => Ok(self.read_name(&Arc::from(SUPER_CONSTRUCTOR))),
            Some(HomeKind::ObjectLiteral) => Ok(Expr::Member {
                object: Expr::GlobalGet(Arc::from("Object")).boxed(),
                key: named("prototype"),
            }),
            None => Err(self.error(CompileErrorKind::Bind, meta, "'super' keyword unexpected here")),
        }
    }

    fn lower_super_call(&mut self, arguments: &[ExpressionOrSpreadElement], meta: Meta) -> Result<Expr, CompileError> {
        if !self.binder.in_derived_constructor() {
            return Err(self.error(CompileErrorKind::Bind, meta, "'super' keyword unexpected here"));
        }
        let this = match self.binder.implicit(Implicit::This) {
            Expr::Var(binding) => binding,
            _ => return Err(self.error(CompileErrorKind::Bind, meta, "'super' keyword unexpected here")),
        };
        let constructor = self.read_name(&Arc::from(SUPER_CONSTRUCTOR));
        let new_target = self.binder.implicit(Implicit::NewTarget);
        let args = self.lower_arguments(arguments)?;
        Ok(Expr::Assign(
            this,
            Expr::SuperCall {
                constructor: constructor.boxed(),
                new_target: new_target.boxed(),
                args,
            }
            .boxed(),
        ))
    }

    pub(crate) fn lower_arguments(&mut self, arguments: &[ExpressionOrSpreadElement]) -> Result<Args, CompileError> {
        let spread = arguments
            .iter()
            .any(|a| matches!(a, ExpressionOrSpreadElement::SpreadElement(_)));
        if spread {
            let mut elements = Vec::with_capacity(arguments.len());
            for argument in arguments {
                elements.push(match argument {
                    ExpressionOrSpreadElement::Expression(e) => ArrayElement::Item(self.lower_expr(*e)?),
                    ExpressionOrSpreadElement::SpreadElement(e) => ArrayElement::Spread(self.lower_expr(*e)?),
                });
            }
            return Ok(Args::Spread(Expr::Array(elements).boxed()));
        }
        let mut list = Vec::with_capacity(arguments.len());
        for argument in arguments {
            if let ExpressionOrSpreadElement::Expression(e) = argument {
                list.push(self.lower_expr(*e)?);
            }
        }
        Ok(Args::List(list))
    }

    /// The callee of a call, keeping the receiver of method calls.
    fn lower_callee(&mut self, callee: ExprId, meta: Meta) -> Result<Callee, CompileError> {
        match &self.ast.expression(callee).kind {
            ExpressionType::MemberExpression {
                object,
                property,
                optional,
            } => {
                let object = self.lower_expr(*object)?;
                let object = if *optional { self.guard_nullish(object, meta)? } else { object };
                let key = self.member_key(property)?;
                Ok(Callee::Member {
                    object: object.boxed(),
                    key,
                })
            }
            ExpressionType::SuperMember(property) => {
                let home = self.super_home(meta)?;
                let key = self.member_key(property)?;
                Ok(Callee::Super {
                    home: home.boxed(),
                    key,
                    this: self.binder.implicit(Implicit::This).boxed(),
                })
            }
            _ => Ok(Callee::Plain(self.lower_expr(callee)?.boxed())),
        }
    }

    fn lower_call(
        &mut self,
        callee: ExprId,
        arguments: &[ExpressionOrSpreadElement],
        optional: bool,
        meta: Meta,
    ) -> Result<Expr, CompileError> {
        let callee = self.lower_callee(callee, meta)?;
        if !optional {
            let args = self.lower_arguments(arguments)?;
            return Ok(Expr::Call { callee, args });
        }
        // `f?.()` / `o.m?.()`: the function value itself is checked.
        match callee {
            Callee::Plain(function) => {
                let function = self.guard_nullish(*function, meta)?;
                let args = self.lower_arguments(arguments)?;
                Ok(Expr::Call {
                    callee: Callee::Plain(function.boxed()),
                    args,
                })
            }
            Callee::Member { object, key } => {
                let receiver = self.binder.temp();
                let mut items = vec![Expr::Assign(Binding::Local(receiver), object)];
                let key = match key {
                    MemberKey::Named(name) => ReferenceKey::Named(name),
                    MemberKey::Computed(key) => {
                        let temp = self.binder.temp();
                        items.push(Expr::Assign(Binding::Local(temp), key));
                        ReferenceKey::Computed(temp)
                    }
                };
                let function = Expr::Member {
                    object: local(receiver).boxed(),
                    key: self.reference_key(&key),
                };
                let label = self.chains.last().copied();
                let label = match label {
                    Some(label) => label,
                    None => return Err(self.error(CompileErrorKind::Compile, meta, "optional call outside of a chain")),
                };
                items.push(Expr::Conditional {
                    test: Expr::Binary(BinaryOp::Eq, function.boxed(), Expr::Constant(Literal::Null).boxed()).boxed(),
                    then: Expr::Goto(label).boxed(),
                    otherwise: Expr::Block(Vec::new()).boxed(),
                });
                let args = self.lower_arguments(arguments)?;
                items.push(Expr::Call {
                    callee: Callee::Member {
                        object: local(receiver).boxed(),
                        key: self.reference_key(&key),
                    },
                    args,
                });
                Ok(Expr::Block(items))
            }
            Callee::Super { home, key, this } => {
                let args = self.lower_arguments(arguments)?;
                Ok(Expr::Call {
                    callee: Callee::Super { home, key, this },
                    args,
                })
            }
        }
    }

    fn lower_object(&mut self, properties: &[PropertyData]) -> Result<Expr, CompileError> {
        let mut inits = Vec::with_capacity(properties.len());
        for property in properties {
            inits.push(match property {
                PropertyData::Value { key, value, .. } => {
                    let name = key.as_named().map(Arc::from);
                    let key = self.property_key(key)?;
                    let value = self.lower_expr_named(*value, name)?;
                    PropertyInit::Value { key, value }
                }
                PropertyData::Method { key, function, kind } => {
                    let key = self.property_key(key)?;
                    let ir = self.lower_function(*function, None, None, Some(HomeKind::ObjectLiteral))?;
                    PropertyInit::Method {
                        key,
                        function: Expr::Function(Box::new(ir)),
                        kind: match kind {
                            PropertyKind::Init => MethodKind::Method,
                            PropertyKind::Get => MethodKind::Getter,
                            PropertyKind::Set => MethodKind::Setter,
                        },
                    }
                }
                PropertyData::Spread(value) => PropertyInit::Spread(self.lower_expr(*value)?),
            });
        }
        Ok(Expr::Object(inits))
    }

    fn lower_unary(&mut self, operator: UnaryOperator, argument: ExprId) -> Result<Expr, CompileError> {
        let op = match operator {
            UnaryOperator::Minus => UnaryOp::Minus,
            UnaryOperator::Plus => UnaryOp::Plus,
            UnaryOperator::LogicalNot => UnaryOp::Not,
            UnaryOperator::BitwiseNot => UnaryOp::BitNot,
            UnaryOperator::Void => UnaryOp::Void,
            UnaryOperator::TypeOf => {
                if let ExpressionType::Identifier(name) = &self.ast.expression(argument).kind {
                    if &**name != "arguments" {
                        if let Resolution::Global = self.binder.resolve(name) {
                            return Ok(Expr::GlobalTypeOf(name.clone()));
                        }
                    }
                }
                UnaryOp::TypeOf
            }
            UnaryOperator::Delete => return self.lower_delete(argument),
        };
        Ok(Expr::Unary(op, self.lower_expr(argument)?.boxed()))
    }

    fn lower_delete(&mut self, argument: ExprId) -> Result<Expr, CompileError> {
        let node = self.ast.expression(argument);
        match &node.kind {
            ExpressionType::MemberExpression {
                object,
                property,
                optional,
            } => {
                let object = self.lower_expr(*object)?;
                let object = if *optional { self.guard_nullish(object, node.meta)? } else { object };
                let key = self.member_key(property)?;
                Ok(Expr::DeleteMember {
                    object: object.boxed(),
                    key,
                })
            }
            ExpressionType::OptionalChain(inner) => {
                self.optional_chain(*inner, Expr::Constant(Literal::Boolean(true)), Self::lower_delete)
            }
            ExpressionType::Identifier(name) => match self.binder.resolve(name) {
                Resolution::Local(_) => Ok(Expr::Constant(Literal::Boolean(false))),
                Resolution::Global => Ok(Expr::DeleteMember {
                    object: Expr::GlobalGet(Arc::from("globalThis")).boxed(),
                    key: MemberKey::Named(name.clone()),
                }),
            },
            _ => {
                let value = self.lower_expr(argument)?;
                Ok(Expr::Block(vec![value, Expr::Constant(Literal::Boolean(true))]))
            }
        }
    }

    // ----- references -----

    fn reference_key(&self, key: &ReferenceKey) -> MemberKey {
        match key {
            ReferenceKey::Named(name) => MemberKey::Named(name.clone()),
            ReferenceKey::Computed(var) => MemberKey::Computed(local(*var).boxed()),
        }
    }

    /// Locates an assignment target, returning the code that evaluates its
    /// object and key into temporaries.
    fn reference(&mut self, target: ExprId) -> Result<(Vec<Expr>, Reference), CompileError> {
        let node = self.ast.expression(target);
        match &node.kind {
            ExpressionType::Identifier(name) => Ok((Vec::new(), self.name_reference(name))),
            ExpressionType::MemberExpression { object, property, .. } => {
                let object_var = self.binder.temp();
                let mut prelude = vec![Expr::Assign(Binding::Local(object_var), self.lower_expr(*object)?.boxed())];
                let key = match property {
                    MemberProperty::Named(name) => ReferenceKey::Named(name.clone()),
                    MemberProperty::Computed(key) => {
                        let key_var = self.binder.temp();
                        let key = self.lower_expr(*key)?;
                        prelude.push(Expr::Assign(Binding::Local(key_var), key.boxed()));
                        ReferenceKey::Computed(key_var)
                    }
                };
                Ok((
                    prelude,
                    Reference::Member {
                        object: object_var,
                        key,
                    },
                ))
            }
            _ => Err(self.error(
                CompileErrorKind::Compile,
                node.meta,
                "invalid left-hand side in assignment",
            )),
        }
    }

    fn name_reference(&mut self, name: &Arc<str>) -> Reference {
        match self.binder.resolve(name) {
            Resolution::Local(resolved) => Reference::Local(resolved),
            Resolution::Global => Reference::Global(name.clone()),
        }
    }

    fn reference_get(&self, reference: &Reference) -> Expr {
        match reference {
            Reference::Local(resolved) => Expr::Var(resolved.binding),
            Reference::Global(name) => Expr::GlobalGet(name.clone()),
            Reference::Member { object, key } => Expr::Member {
                object: local(*object).boxed(),
                key: self.reference_key(key),
            },
        }
    }

    fn reference_set(&self, reference: &Reference, value: Expr) -> Expr {
        match reference {
            Reference::Local(resolved) if resolved.constant => Expr::Block(vec![
                value,
                Expr::ThrowError(ErrorKind::TypeError, Arc::from(CONST_ASSIGNMENT)),
            ]),
            Reference::Local(resolved) => Expr::Assign(resolved.binding, value.boxed()),
            Reference::Global(name) => Expr::GlobalSet(name.clone(), value.boxed()),
            Reference::Member { object, key } => Expr::SetMember {
                object: local(*object).boxed(),
                key: self.reference_key(key),
                value: value.boxed(),
            },
        }
    }

    fn lower_update(&mut self, operator: UpdateOperator, argument: ExprId, prefix: bool) -> Result<Expr, CompileError> {
        let (mut items, reference) = self.reference(argument)?;
        let op = match operator {
            UpdateOperator::PlusPlus => BinaryOp::Add,
            UpdateOperator::MinusMinus => BinaryOp::Sub,
        };
        let old = Expr::Unary(UnaryOp::ToNumeric, self.reference_get(&reference).boxed());
        if prefix {
            let value = Expr::Binary(op, old.boxed(), Expr::number(1.0).boxed());
            items.push(self.reference_set(&reference, value));
        } else {
            let temp = self.binder.temp();
            items.push(Expr::Assign(Binding::Local(temp), old.boxed()));
            let value = Expr::Binary(op, local(temp).boxed(), Expr::number(1.0).boxed());
            items.push(self.reference_set(&reference, value));
            items.push(local(temp));
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Block(items)
        })
    }

    fn lower_assignment(
        &mut self,
        operator: AssignmentOperator,
        left: PatId,
        right: ExprId,
    ) -> Result<Expr, CompileError> {
        let pattern = self.ast.pattern(left);
        match operator {
            AssignmentOperator::Equals => match &pattern.kind {
                PatternType::Identifier(name) => {
                    let value = self.lower_expr_named(right, Some(name.clone()))?;
                    let reference = self.name_reference(name);
                    Ok(self.reference_set(&reference, value))
                }
                PatternType::Member(target) => {
                    let (object, key) = self.member_target(*target)?;
                    let value = self.lower_expr(right)?;
                    Ok(Expr::SetMember {
                        object: object.boxed(),
                        key,
                        value: value.boxed(),
                    })
                }
                _ => {
                    let value = self.lower_expr(right)?;
                    let temp = self.binder.temp();
                    let destructure = self.bind_pattern(left, local(temp), PatternMode::Assignment)?;
                    Ok(Expr::Block(vec![
                        Expr::Assign(Binding::Local(temp), value.boxed()),
                        destructure,
                        local(temp),
                    ]))
                }
            },
            AssignmentOperator::Binary(operator) => {
                let (mut items, reference) = self.pattern_reference(left)?;
                let right = self.lower_expr(right)?;
                let value = Expr::Binary(binary_op(operator), self.reference_get(&reference).boxed(), right.boxed());
                items.push(self.reference_set(&reference, value));
                Ok(Expr::Block(items))
            }
            AssignmentOperator::Logical(operator) => {
                let (mut items, reference) = self.pattern_reference(left)?;
                let name = match &pattern.kind {
                    PatternType::Identifier(name) => Some(name.clone()),
                    _ => None,
                };
                let right = self.lower_expr_named(right, name)?;
                let write = self.reference_set(&reference, right);
                items.push(Expr::Logical(
                    logical_op(operator),
                    self.reference_get(&reference).boxed(),
                    write.boxed(),
                ));
                Ok(Expr::Block(items))
            }
        }
    }

    fn pattern_reference(&mut self, pattern: PatId) -> Result<(Vec<Expr>, Reference), CompileError> {
        let node = self.ast.pattern(pattern);
        match &node.kind {
            PatternType::Identifier(name) => Ok((Vec::new(), self.name_reference(name))),
            PatternType::Member(target) => self.reference(*target),
            _ => Err(self.error(
                CompileErrorKind::Compile,
                node.meta,
                "invalid left-hand side in assignment",
            )),
        }
    }

    /// Object and key of a member assignment target, evaluated in order.
    pub(crate) fn member_target(&mut self, target: ExprId) -> Result<(Expr, MemberKey), CompileError> {
        let node = self.ast.expression(target);
        match &node.kind {
            ExpressionType::MemberExpression { object, property, .. } => {
                let object = self.lower_expr(*object)?;
                let key = self.member_key(property)?;
                Ok((object, key))
            }
            ExpressionType::SuperMember(property) => {
                let key = self.member_key(property)?;
                Ok((self.binder.implicit(Implicit::This), key))
            }
            _ => Err(self.error(
                CompileErrorKind::Compile,
                node.meta,
                "invalid assignment target",
            )),
        }
    }

    // ----- generators and templates -----

    /// `yield* value`: re-yields every value of the inner iterator.
    fn delegate_yield(&mut self, value: Expr) -> Expr {
        let iterator = self.binder.temp();
        let item = self.binder.temp();
        let done = self.binder.new_label();
        let step = Expr::IteratorStep {
            iter: Binding::Local(iterator),
            value: Binding::Local(item),
        };
        Expr::Block(vec![
            Expr::Assign(Binding::Local(iterator), Expr::GetIterator(value.boxed()).boxed()),
            Expr::Label(
                done,
                Expr::Loop(
                    Expr::Conditional {
                        test: step.boxed(),
                        then: Expr::Yield(local(item).boxed()).boxed(),
                        otherwise: Expr::Goto(done).boxed(),
                    }
                    .boxed(),
                )
                .boxed(),
            ),
            Expr::undefined(),
        ])
    }

    fn lower_template(&mut self, quasis: &[TemplateElementData], expressions: &[ExprId]) -> Result<Expr, CompileError> {
        let mut parts = Vec::with_capacity(quasis.len() + expressions.len());
        for (i, quasi) in quasis.iter().enumerate() {
            if let Some(cooked) = &quasi.cooked {
                if !cooked.is_empty() {
                    parts.push(Expr::Constant(Literal::String(cooked.clone())));
                }
            }
            if let Some(expression) = expressions.get(i) {
                parts.push(Expr::Unary(UnaryOp::ToStr, self.lower_expr(*expression)?.boxed()));
            }
        }
        let mut parts = parts.into_iter();
        let first = match parts.next() {
            Some(first) => first,
            None => return Ok(Expr::string("")),
        };
        Ok(parts.fold(first, |acc, part| Expr::Binary(BinaryOp::Add, acc.boxed(), part.boxed())))
    }
}
