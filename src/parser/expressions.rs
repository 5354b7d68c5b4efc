//! Expressions, by precedence climbing.

use std::sync::Arc;

use crate::parser::api::{JsParser, ParseContext};
use crate::parser::ast::*;
use crate::parser::error::ParseError;
use crate::parser::token::{Keyword, Punct, TokenKind};

/// Binding power of a binary operator token, and the operator it denotes.
fn binary_operator(kind: &TokenKind, no_in: bool) -> Option<(u8, BinaryOrLogical)> {
    use BinaryOperator as B;
    use BinaryOrLogical::{Binary, Logical};
    let entry = match kind {
        TokenKind::Punct(p) => match p {
            Punct::QuestionQuestion => (1, Logical(LogicalOperator::NullishCoalescing)),
            Punct::PipePipe => (2, Logical(LogicalOperator::Or)),
            Punct::AmpAmp => (3, Logical(LogicalOperator::And)),
            Punct::Pipe => (4, Binary(B::BitwiseOr)),
            Punct::Caret => (5, Binary(B::BitwiseXor)),
            Punct::Amp => (6, Binary(B::BitwiseAnd)),
            Punct::Equal => (7, Binary(B::LooselyEqual)),
            Punct::NotEqual => (7, Binary(B::LooselyUnequal)),
            Punct::StrictEqual => (7, Binary(B::StrictlyEqual)),
            Punct::StrictNotEqual => (7, Binary(B::StrictlyUnequal)),
            Punct::Less => (8, Binary(B::LessThan)),
            Punct::LessEqual => (8, Binary(B::LessThanEqual)),
            Punct::Greater => (8, Binary(B::GreaterThan)),
            Punct::GreaterEqual => (8, Binary(B::GreaterThanEqual)),
            Punct::ShiftLeft => (9, Binary(B::BitwiseLeftShift)),
            Punct::ShiftRight => (9, Binary(B::BitwiseRightShift)),
            Punct::UnsignedShiftRight => (9, Binary(B::BitwiseUnsignedRightShift)),
            Punct::Plus => (10, Binary(B::Add)),
            Punct::Minus => (10, Binary(B::Subtract)),
            Punct::Star => (11, Binary(B::Multiply)),
            Punct::Slash => (11, Binary(B::Divide)),
            Punct::Percent => (11, Binary(B::Modulo)),
            Punct::StarStar => (12, Binary(B::Exponent)),
            _ => return None,
        },
        TokenKind::Keyword(Keyword::InstanceOf) => (8, Binary(B::InstanceOf)),
        TokenKind::Keyword(Keyword::In) if !no_in => (8, Binary(B::In)),
        _ => return None,
    };
    Some(entry)
}

#[derive(Copy, Clone)]
enum BinaryOrLogical {
    Binary(BinaryOperator),
    Logical(LogicalOperator),
}

fn assignment_operator(kind: &TokenKind) -> Option<AssignmentOperator> {
    use AssignmentOperator::{Binary, Equals, Logical};
    use BinaryOperator as B;
    let p = match kind {
        TokenKind::Punct(p) => p,
        _ => return None,
    };
    Some(match p {
        Punct::Assign => Equals,
        Punct::PlusAssign => Binary(B::Add),
        Punct::MinusAssign => Binary(B::Subtract),
        Punct::StarAssign => Binary(B::Multiply),
        Punct::SlashAssign => Binary(B::Divide),
        Punct::PercentAssign => Binary(B::Modulo),
        Punct::StarStarAssign => Binary(B::Exponent),
        Punct::ShiftLeftAssign => Binary(B::BitwiseLeftShift),
        Punct::ShiftRightAssign => Binary(B::BitwiseRightShift),
        Punct::UnsignedShiftRightAssign => Binary(B::BitwiseUnsignedRightShift),
        Punct::AmpAssign => Binary(B::BitwiseAnd),
        Punct::PipeAssign => Binary(B::BitwiseOr),
        Punct::CaretAssign => Binary(B::BitwiseXor),
        Punct::AmpAmpAssign => Logical(LogicalOperator::And),
        Punct::PipePipeAssign => Logical(LogicalOperator::Or),
        Punct::QuestionQuestionAssign => Logical(LogicalOperator::NullishCoalescing),
        _ => return None,
    })
}

impl<'a> JsParser<'a> {
    /// Comma-separated expression.
    pub(crate) fn parse_expression(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        let first = self.parse_assignment()?;
        if !self.at_punct(Punct::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat_punct(Punct::Comma)? {
            expressions.push(self.parse_assignment()?);
        }
        let meta = self.finish_meta(start);
        Ok(self.ast.add_expression(meta, ExpressionType::SequenceExpression(expressions)))
    }

    pub(crate) fn parse_assignment(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        if self.context.generator && self.at_word("yield") {
            return self.parse_yield();
        }
        if let Some(arrow) = self.try_parse_arrow_function()? {
            return Ok(arrow);
        }
        let left = self.parse_conditional()?;
        let operator = match assignment_operator(&self.token.kind) {
            Some(operator) => operator,
            None => return Ok(left),
        };
        let target = match operator {
            AssignmentOperator::Equals => self.expression_to_pattern(left)?,
            _ => self.simple_assignment_target(left)?,
        };
        self.advance()?;
        let right = self.parse_assignment()?;
        let meta = self.finish_meta(start);
        Ok(self.ast.add_expression(
            meta,
            ExpressionType::AssignmentExpression {
                operator,
                left: target,
                right,
            },
        ))
    }

    fn parse_yield(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        self.advance()?;
        let delegate = !self.token.newline_before && self.eat_punct(Punct::Star)?;
        let ends_expression = self.token.newline_before && !delegate
            || matches!(
                self.token.kind,
                TokenKind::Eof
                    | TokenKind::Punct(Punct::RightParen)
                    | TokenKind::Punct(Punct::RightBracket)
                    | TokenKind::Punct(Punct::RightBrace)
                    | TokenKind::Punct(Punct::Comma)
                    | TokenKind::Punct(Punct::Semicolon)
                    | TokenKind::Punct(Punct::Colon)
            )
            || self.at_keyword(Keyword::In);
        let argument = if ends_expression && !delegate {
            None
        } else {
            Some(self.parse_assignment()?)
        };
        let meta = self.finish_meta(start);
        Ok(self
            .ast
            .add_expression(meta, ExpressionType::YieldExpression { argument, delegate }))
    }

    fn parse_conditional(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        let test = self.parse_binary(0)?;
        if !self.eat_punct(Punct::Question)? {
            return Ok(test);
        }
        let consequent = self.with_context(ParseContext { no_in: false, ..self.context }, |p| {
            p.parse_assignment()
        })?;
        self.expect_punct(Punct::Colon)?;
        let alternate = self.parse_assignment()?;
        let meta = self.finish_meta(start);
        Ok(self.ast.add_expression(
            meta,
            ExpressionType::ConditionalExpression {
                test,
                consequent,
                alternate,
            },
        ))
    }

    fn parse_binary(&mut self, min_power: u8) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        let mut left = self.parse_unary()?;
        while let Some((power, operator)) = binary_operator(&self.token.kind, self.context.no_in) {
            if power <= min_power {
                break;
            }
            self.advance()?;
            // `**` is right-associative.
            let right = if matches!(operator, BinaryOrLogical::Binary(BinaryOperator::Exponent)) {
                self.parse_binary(power - 1)?
            } else {
                self.parse_binary(power)?
            };
            let meta = self.finish_meta(start);
            let kind = match operator {
                BinaryOrLogical::Binary(operator) => ExpressionType::BinaryExpression { operator, left, right },
                BinaryOrLogical::Logical(operator) => ExpressionType::LogicalExpression { operator, left, right },
            };
            left = self.ast.add_expression(meta, kind);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        let operator = match &self.token.kind {
            TokenKind::Punct(Punct::Minus) => Some(UnaryOperator::Minus),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOperator::Plus),
            TokenKind::Punct(Punct::Bang) => Some(UnaryOperator::LogicalNot),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOperator::BitwiseNot),
            TokenKind::Keyword(Keyword::TypeOf) => Some(UnaryOperator::TypeOf),
            TokenKind::Keyword(Keyword::Void) => Some(UnaryOperator::Void),
            TokenKind::Keyword(Keyword::Delete) => Some(UnaryOperator::Delete),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance()?;
            let argument = self.parse_unary()?;
            if self.at_punct(Punct::StarStar) {
                return Err(self.invalid("unary operator before '**' needs parentheses"));
            }
            let meta = self.finish_meta(start);
            return Ok(self
                .ast
                .add_expression(meta, ExpressionType::UnaryExpression { operator, argument }));
        }
        if self.at_punct(Punct::PlusPlus) || self.at_punct(Punct::MinusMinus) {
            let operator = if self.at_punct(Punct::PlusPlus) {
                UpdateOperator::PlusPlus
            } else {
                UpdateOperator::MinusMinus
            };
            self.advance()?;
            let argument = self.parse_unary()?;
            self.check_update_target(argument)?;
            let meta = self.finish_meta(start);
            return Ok(self.ast.add_expression(
                meta,
                ExpressionType::UpdateExpression {
                    operator,
                    argument,
                    prefix: true,
                },
            ));
        }
        if self.context.is_async && self.at_word("await") {
            self.advance()?;
            let argument = self.parse_unary()?;
            let meta = self.finish_meta(start);
            return Ok(self.ast.add_expression(meta, ExpressionType::AwaitExpression(argument)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        let argument = self.parse_left_hand_side()?;
        if (self.at_punct(Punct::PlusPlus) || self.at_punct(Punct::MinusMinus)) && !self.token.newline_before {
            let operator = if self.at_punct(Punct::PlusPlus) {
                UpdateOperator::PlusPlus
            } else {
                UpdateOperator::MinusMinus
            };
            self.check_update_target(argument)?;
            self.advance()?;
            let meta = self.finish_meta(start);
            return Ok(self.ast.add_expression(
                meta,
                ExpressionType::UpdateExpression {
                    operator,
                    argument,
                    prefix: false,
                },
            ));
        }
        Ok(argument)
    }

    fn check_update_target(&self, argument: ExprId) -> Result<(), ParseError> {
        let node = self.ast.expression(argument);
        match node.kind {
            ExpressionType::Identifier(_)
            | ExpressionType::MemberExpression { optional: false, .. }
            | ExpressionType::SuperMember(_) => Ok(()),
            _ => Err(self.invalid_at(node.meta, "invalid left-hand side in update expression")),
        }
    }

    /// Calls, member accesses, `new` and tagged templates.
    pub(crate) fn parse_left_hand_side(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        let mut expression = if self.at_keyword(Keyword::New) {
            self.parse_new()?
        } else if self.at_keyword(Keyword::Super) {
            self.parse_super()?
        } else {
            self.parse_primary()?
        };
        let mut in_chain = false;
        loop {
            let kind = match &self.token.kind {
                TokenKind::Punct(Punct::Dot) => {
                    self.advance()?;
                    let name = self.parse_identifier_name()?;
                    ExpressionType::MemberExpression {
                        object: expression,
                        property: MemberProperty::Named(name),
                        optional: false,
                    }
                }
                TokenKind::Punct(Punct::QuestionDot) => {
                    self.advance()?;
                    in_chain = true;
                    if self.at_punct(Punct::LeftParen) {
                        let arguments = self.parse_arguments()?;
                        ExpressionType::CallExpression {
                            callee: expression,
                            arguments,
                            optional: true,
                        }
                    } else if self.eat_punct(Punct::LeftBracket)? {
                        let property = self.parse_expression_allowing_in()?;
                        self.expect_punct(Punct::RightBracket)?;
                        ExpressionType::MemberExpression {
                            object: expression,
                            property: MemberProperty::Computed(property),
                            optional: true,
                        }
                    } else {
                        let name = self.parse_identifier_name()?;
                        ExpressionType::MemberExpression {
                            object: expression,
                            property: MemberProperty::Named(name),
                            optional: true,
                        }
                    }
                }
                TokenKind::Punct(Punct::LeftBracket) => {
                    self.advance()?;
                    let property = self.parse_expression_allowing_in()?;
                    self.expect_punct(Punct::RightBracket)?;
                    ExpressionType::MemberExpression {
                        object: expression,
                        property: MemberProperty::Computed(property),
                        optional: false,
                    }
                }
                TokenKind::Punct(Punct::LeftParen) => {
                    let arguments = self.parse_arguments()?;
                    ExpressionType::CallExpression {
                        callee: expression,
                        arguments,
                        optional: false,
                    }
                }
                TokenKind::Template { .. } => {
                    if in_chain {
                        return Err(self.invalid("tagged template cannot be used in an optional chain"));
                    }
                    let (quasis, expressions) = self.parse_template_parts(true)?;
                    ExpressionType::TaggedTemplateExpression {
                        tag: expression,
                        quasis,
                        expressions,
                    }
                }
                _ => break,
            };
            let meta = self.finish_meta(start);
            expression = self.ast.add_expression(meta, kind);
        }
        if in_chain {
            let meta = self.finish_meta(start);
            expression = self.ast.add_expression(meta, ExpressionType::OptionalChain(expression));
        }
        Ok(expression)
    }

    fn parse_expression_allowing_in(&mut self) -> Result<ExprId, ParseError> {
        self.with_context(ParseContext { no_in: false, ..self.context }, |p| p.parse_expression())
    }

    /// `new X(...)`, `new X` or `new.target`.
    fn parse_new(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        self.expect_keyword(Keyword::New)?;
        if self.eat_punct(Punct::Dot)? {
            if !self.at_word("target") {
                return Err(self.unexpected("'target'"));
            }
            if !self.context.in_function {
                return Err(self.invalid("new.target expression is not allowed here"));
            }
            self.advance()?;
            let meta = self.finish_meta(start);
            return Ok(self.ast.add_expression(meta, ExpressionType::NewTarget));
        }
        let mut callee = if self.at_keyword(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            let kind = match &self.token.kind {
                TokenKind::Punct(Punct::Dot) => {
                    self.advance()?;
                    let name = self.parse_identifier_name()?;
                    ExpressionType::MemberExpression {
                        object: callee,
                        property: MemberProperty::Named(name),
                        optional: false,
                    }
                }
                TokenKind::Punct(Punct::LeftBracket) => {
                    self.advance()?;
                    let property = self.parse_expression_allowing_in()?;
                    self.expect_punct(Punct::RightBracket)?;
                    ExpressionType::MemberExpression {
                        object: callee,
                        property: MemberProperty::Computed(property),
                        optional: false,
                    }
                }
                TokenKind::Punct(Punct::QuestionDot) => {
                    return Err(self.invalid("invalid optional chain from new expression"));
                }
                _ => break,
            };
            let meta = self.finish_meta(start);
            callee = self.ast.add_expression(meta, kind);
        }
        let arguments = if self.at_punct(Punct::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let meta = self.finish_meta(start);
        Ok(self
            .ast
            .add_expression(meta, ExpressionType::NewExpression { callee, arguments }))
    }

    fn parse_super(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        self.expect_keyword(Keyword::Super)?;
        let kind = match &self.token.kind {
            TokenKind::Punct(Punct::LeftParen) => {
                if !self.context.super_call {
                    return Err(self.invalid("'super' keyword unexpected here"));
                }
                ExpressionType::SuperCall(self.parse_arguments()?)
            }
            TokenKind::Punct(Punct::Dot) => {
                if !self.context.super_property {
                    return Err(self.invalid("'super' keyword unexpected here"));
                }
                self.advance()?;
                ExpressionType::SuperMember(MemberProperty::Named(self.parse_identifier_name()?))
            }
            TokenKind::Punct(Punct::LeftBracket) => {
                if !self.context.super_property {
                    return Err(self.invalid("'super' keyword unexpected here"));
                }
                self.advance()?;
                let property = self.parse_expression_allowing_in()?;
                self.expect_punct(Punct::RightBracket)?;
                ExpressionType::SuperMember(MemberProperty::Computed(property))
            }
            _ => return Err(self.invalid("'super' keyword unexpected here")),
        };
        let meta = self.finish_meta(start);
        Ok(self.ast.add_expression(meta, kind))
    }

    /// Any identifier, including reserved words, after `.`.
    fn parse_identifier_name(&mut self) -> Result<Arc<str>, ParseError> {
        let name = match &self.token.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Keyword(k) => Arc::from(k.as_str()),
            _ => return Err(self.unexpected("property name")),
        };
        self.advance()?;
        Ok(name)
    }

    pub(crate) fn parse_arguments(&mut self) -> Result<Vec<ExpressionOrSpreadElement>, ParseError> {
        self.expect_punct(Punct::LeftParen)?;
        let context = ParseContext { no_in: false, ..self.context };
        self.with_context(context, |p| {
            let mut arguments = Vec::new();
            while !p.eat_punct(Punct::RightParen)? {
                if p.eat_punct(Punct::Ellipsis)? {
                    arguments.push(ExpressionOrSpreadElement::SpreadElement(p.parse_assignment()?));
                } else {
                    arguments.push(ExpressionOrSpreadElement::Expression(p.parse_assignment()?));
                }
                if !p.at_punct(Punct::RightParen) {
                    p.expect_punct(Punct::Comma)?;
                }
            }
            Ok(arguments)
        })
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        let start = self.start_meta();
        let kind = match &self.token.kind {
            TokenKind::Keyword(Keyword::This) => {
                self.advance()?;
                ExpressionType::ThisExpression
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance()?;
                ExpressionType::Literal(LiteralType::NullLiteral)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance()?;
                ExpressionType::Literal(LiteralType::BooleanLiteral(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance()?;
                ExpressionType::Literal(LiteralType::BooleanLiteral(false))
            }
            TokenKind::Number(n) => {
                let n = *n;
                self.advance()?;
                ExpressionType::Literal(LiteralType::NumberLiteral(n))
            }
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance()?;
                ExpressionType::Literal(LiteralType::StringLiteral(s))
            }
            TokenKind::RegExp { pattern, flags } => {
                let (pattern, flags) = (pattern.clone(), flags.clone());
                self.advance()?;
                ExpressionType::Literal(LiteralType::RegExpLiteral { pattern, flags })
            }
            TokenKind::Template { .. } => {
                let (quasis, expressions) = self.parse_template_parts(false)?;
                ExpressionType::TemplateLiteral { quasis, expressions }
            }
            TokenKind::Punct(Punct::LeftBracket) => self.parse_array_literal()?,
            TokenKind::Punct(Punct::LeftBrace) => self.parse_object_literal()?,
            TokenKind::Punct(Punct::LeftParen) => {
                self.advance()?;
                let inner = self.parse_expression_allowing_in()?;
                self.expect_punct(Punct::RightParen)?;
                return Ok(inner);
            }
            TokenKind::Keyword(Keyword::Function) => {
                ExpressionType::FunctionExpression(self.parse_function_expression(false)?)
            }
            TokenKind::Keyword(Keyword::Class) => {
                ExpressionType::ClassExpression(Box::new(self.parse_class(false)?))
            }
            TokenKind::Identifier(name) if &**name == "async" && self.async_function_follows()? => {
                ExpressionType::FunctionExpression(self.parse_function_expression(true)?)
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.check_binding_name(&name)?;
                self.advance()?;
                ExpressionType::Identifier(name)
            }
            _ => return Err(self.unexpected("expression")),
        };
        let meta = self.finish_meta(start);
        Ok(self.ast.add_expression(meta, kind))
    }

    /// Quasis and substitutions of a template starting at the current token.
    fn parse_template_parts(
        &mut self,
        tagged: bool,
    ) -> Result<(Vec<TemplateElementData>, Vec<ExprId>), ParseError> {
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        loop {
            let (cooked, raw, tail) = match &self.token.kind {
                TokenKind::Template { cooked, raw, tail } => (cooked.clone(), raw.clone(), *tail),
                _ => return Err(self.unexpected("template literal")),
            };
            if !tagged && cooked.is_none() {
                return Err(self.invalid("invalid escape sequence in template literal"));
            }
            quasis.push(TemplateElementData { cooked, raw });
            self.advance()?;
            if tail {
                break;
            }
            expressions.push(self.parse_expression_allowing_in()?);
            if !self.at_punct(Punct::RightBrace) {
                return Err(self.unexpected("'}'"));
            }
            self.rescan_template_continuation()?;
        }
        Ok((quasis, expressions))
    }

    fn parse_array_literal(&mut self) -> Result<ExpressionType, ParseError> {
        self.expect_punct(Punct::LeftBracket)?;
        let context = ParseContext { no_in: false, ..self.context };
        let elements = self.with_context(context, |p| {
            let mut elements = Vec::new();
            loop {
                if p.eat_punct(Punct::RightBracket)? {
                    break;
                }
                if p.eat_punct(Punct::Comma)? {
                    elements.push(None);
                    continue;
                }
                let element = if p.eat_punct(Punct::Ellipsis)? {
                    ExpressionOrSpreadElement::SpreadElement(p.parse_assignment()?)
                } else {
                    ExpressionOrSpreadElement::Expression(p.parse_assignment()?)
                };
                elements.push(Some(element));
                if !p.at_punct(Punct::RightBracket) {
                    p.expect_punct(Punct::Comma)?;
                }
            }
            Ok(elements)
        })?;
        Ok(ExpressionType::ArrayExpression(elements))
    }

    fn parse_object_literal(&mut self) -> Result<ExpressionType, ParseError> {
        self.expect_punct(Punct::LeftBrace)?;
        let context = ParseContext { no_in: false, ..self.context };
        let properties = self.with_context(context, |p| {
            let mut properties = Vec::new();
            while !p.eat_punct(Punct::RightBrace)? {
                properties.push(p.parse_object_property()?);
                if !p.at_punct(Punct::RightBrace) {
                    p.expect_punct(Punct::Comma)?;
                }
            }
            Ok(properties)
        })?;
        Ok(ExpressionType::ObjectExpression(properties))
    }

    fn parse_object_property(&mut self) -> Result<PropertyData, ParseError> {
        if self.eat_punct(Punct::Ellipsis)? {
            return Ok(PropertyData::Spread(self.parse_assignment()?));
        }
        let start = self.start_meta();
        let mut kind = PropertyKind::Init;
        let mut is_async = false;
        if (self.at_word("get") || self.at_word("set")) && !self.modifier_is_name()? {
            kind = if self.at_word("get") {
                PropertyKind::Get
            } else {
                PropertyKind::Set
            };
            self.advance()?;
        } else if self.at_word("async") && !self.modifier_is_name()? && !self.peek()?.newline_before {
            is_async = true;
            self.advance()?;
        }
        let generator = self.eat_punct(Punct::Star)?;
        let shorthand_name = match &self.token.kind {
            TokenKind::Identifier(name) => Some(name.clone()),
            _ => None,
        };
        let key = self.parse_property_name()?;

        if kind != PropertyKind::Init || is_async || generator || self.at_punct(Punct::LeftParen) {
            let form = match kind {
                PropertyKind::Init => FunctionForm::Method,
                PropertyKind::Get => FunctionForm::Getter,
                PropertyKind::Set => FunctionForm::Setter,
            };
            let name = key.as_named().map(Arc::from);
            let function = self.parse_function_rest(start, name, form, generator, is_async)?;
            return Ok(PropertyData::Method { key, function, kind });
        }
        if self.eat_punct(Punct::Colon)? {
            let value = self.parse_assignment()?;
            return Ok(PropertyData::Value {
                key,
                value,
                shorthand: false,
            });
        }
        let name = shorthand_name.ok_or_else(|| self.unexpected("':'"))?;
        self.check_binding_name(&name)?;
        let meta = self.finish_meta(start);
        let mut value = self.ast.add_expression(meta, ExpressionType::Identifier(name.clone()));
        if self.at_punct(Punct::Assign) {
            // `{ a = 1 }` is only valid once reinterpreted as a pattern.
            self.advance()?;
            let default = self.parse_assignment()?;
            let target = self.ast.add_pattern(meta, PatternType::Identifier(name));
            let meta = self.finish_meta(start);
            value = self.ast.add_expression(
                meta,
                ExpressionType::AssignmentExpression {
                    operator: AssignmentOperator::Equals,
                    left: target,
                    right: default,
                },
            );
        }
        Ok(PropertyData::Value {
            key,
            value,
            shorthand: true,
        })
    }

    // ----- arrow functions -----

    /// Parses an arrow function if one starts here; leaves the parser untouched otherwise.
    fn try_parse_arrow_function(&mut self) -> Result<Option<ExprId>, ParseError> {
        let start = self.start_meta();
        let is_async_prefix = self.at_word("async") && {
            let next = self.peek()?;
            !next.newline_before
                && (next.is_punct(Punct::LeftParen) || matches!(next.kind, TokenKind::Identifier(_)))
        };
        let marker = self.mark();
        if is_async_prefix {
            self.advance()?;
        }
        let params = match &self.token.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let next = self.peek()?;
                if !next.is_punct(Punct::Arrow) || next.newline_before {
                    self.reset(marker);
                    return Ok(None);
                }
                self.check_binding_name(&name)?;
                let param_start = self.start_meta();
                self.advance()?;
                let meta = self.finish_meta(param_start);
                Some((vec![self.ast.add_pattern(meta, PatternType::Identifier(name))], None))
            }
            TokenKind::Punct(Punct::LeftParen) => {
                let context = ParseContext {
                    is_async: self.context.is_async || is_async_prefix,
                    no_in: false,
                    ..self.context
                };
                match self.with_context(context, |p| p.parse_formal_parameters()) {
                    Ok(params) if self.at_punct(Punct::Arrow) && !self.token.newline_before => Some(params),
                    _ => None,
                }
            }
            _ => None,
        };
        let (params, rest) = match params {
            Some(params) => params,
            None => {
                self.reset(marker);
                return Ok(None);
            }
        };
        self.expect_punct(Punct::Arrow)?;
        let context = ParseContext {
            in_function: true,
            generator: false,
            is_async: is_async_prefix,
            no_in: self.context.no_in,
            ..self.context
        };
        self.enter_function_scope();
        let body = self.with_context(context, |p| {
            if p.at_punct(Punct::LeftBrace) {
                Ok(FunctionBody::Block(p.parse_block()?))
            } else {
                Ok(FunctionBody::Expression(p.parse_assignment()?))
            }
        });
        let hoisted_vars = self.exit_function_scope();
        let body = body?;
        let meta = self.finish_meta(start);
        let function = self.ast.add_function(FunctionData {
            meta,
            id: None,
            form: FunctionForm::Arrow,
            generator: false,
            is_async: is_async_prefix,
            params,
            rest,
            body,
            hoisted_vars,
        });
        Ok(Some(self.ast.add_expression(meta, ExpressionType::FunctionExpression(function))))
    }

    // ----- reinterpretation as patterns -----

    fn simple_assignment_target(&mut self, expression: ExprId) -> Result<PatId, ParseError> {
        let node = self.ast.expression(expression);
        let meta = node.meta;
        let kind = match &node.kind {
            ExpressionType::Identifier(name) => PatternType::Identifier(name.clone()),
            ExpressionType::MemberExpression { optional: false, .. } | ExpressionType::SuperMember(_) => {
                PatternType::Member(expression)
            }
            _ => return Err(self.invalid_at(meta, "invalid left-hand side in assignment")),
        };
        Ok(self.ast.add_pattern(meta, kind))
    }

    /// Reinterprets an already parsed expression as an assignment target.
    pub(crate) fn expression_to_pattern(&mut self, expression: ExprId) -> Result<PatId, ParseError> {
        let meta = self.ast.expression(expression).meta;
        let kind = match &self.ast.expression(expression).kind {
            ExpressionType::Identifier(_)
            | ExpressionType::MemberExpression { .. }
            | ExpressionType::SuperMember(_) => return self.simple_assignment_target(expression),
            ExpressionType::AssignmentExpression {
                operator: AssignmentOperator::Equals,
                left,
                right,
            } => PatternType::AssignmentPattern {
                target: *left,
                default: *right,
            },
            ExpressionType::ArrayExpression(elements) => {
                let elements = elements.clone();
                let mut targets = Vec::new();
                let mut rest = None;
                let count = elements.len();
                for (i, element) in elements.into_iter().enumerate() {
                    match element {
                        None => targets.push(None),
                        Some(ExpressionOrSpreadElement::Expression(e)) => {
                            targets.push(Some(self.expression_to_pattern(e)?))
                        }
                        Some(ExpressionOrSpreadElement::SpreadElement(e)) => {
                            if i + 1 != count {
                                return Err(self.invalid_at(meta, "rest element must be last element"));
                            }
                            rest = Some(self.expression_to_pattern(e)?);
                        }
                    }
                }
                PatternType::ArrayPattern {
                    elements: targets,
                    rest,
                }
            }
            ExpressionType::ObjectExpression(properties) => {
                let properties = properties.clone();
                let mut targets = Vec::new();
                let mut rest = None;
                let count = properties.len();
                for (i, property) in properties.into_iter().enumerate() {
                    match property {
                        PropertyData::Value { key, value, .. } => {
                            let value = self.expression_to_pattern(value)?;
                            targets.push(AssignmentPropertyData { key, value });
                        }
                        PropertyData::Spread(e) => {
                            if i + 1 != count {
                                return Err(self.invalid_at(meta, "rest element must be last element"));
                            }
                            rest = Some(self.expression_to_pattern(e)?);
                        }
                        PropertyData::Method { .. } => {
                            return Err(self.invalid_at(meta, "invalid destructuring assignment target"));
                        }
                    }
                }
                PatternType::ObjectPattern {
                    properties: targets,
                    rest,
                }
            }
            _ => return Err(self.invalid_at(meta, "invalid destructuring assignment target")),
        };
        Ok(self.ast.add_pattern(meta, kind))
    }
}
