//! Statements, declarations, functions and classes.

use std::sync::Arc;

use crate::parser::api::{JsParser, ParseContext};
use crate::parser::ast::*;
use crate::parser::error::ParseError;
use crate::parser::token::{Keyword, Punct, TokenKind};
use crate::runner::ds::operations::type_conversion::number_to_string;

impl<'a> JsParser<'a> {
    pub(crate) fn parse_statement_list_item(&mut self) -> Result<StmtId, ParseError> {
        match &self.token.kind {
            TokenKind::Keyword(Keyword::Function) => self.parse_function_declaration(false),
            TokenKind::Keyword(Keyword::Class) => {
                let start = self.start_meta();
                let class = self.parse_class(true)?;
                let meta = self.finish_meta(start);
                Ok(self.ast.add_statement(meta, StatementType::ClassDeclaration(Box::new(class))))
            }
            TokenKind::Keyword(Keyword::Const) => self.parse_lexical_declaration(VariableDeclarationKind::Const),
            TokenKind::Identifier(name) if &**name == "let" && self.let_starts_declaration()? => {
                self.parse_lexical_declaration(VariableDeclarationKind::Let)
            }
            TokenKind::Identifier(name) if &**name == "async" && self.async_function_follows()? => {
                self.parse_function_declaration(true)
            }
            _ => self.parse_statement(),
        }
    }

    fn let_starts_declaration(&self) -> Result<bool, ParseError> {
        let next = self.peek()?;
        Ok(matches!(next.kind, TokenKind::Identifier(_))
            || next.is_punct(Punct::LeftBracket)
            || next.is_punct(Punct::LeftBrace))
    }

    pub(crate) fn async_function_follows(&self) -> Result<bool, ParseError> {
        let next = self.peek()?;
        Ok(next.is_keyword(Keyword::Function) && !next.newline_before)
    }

    pub(crate) fn parse_statement(&mut self) -> Result<StmtId, ParseError> {
        let start = self.start_meta();
        let kind = match &self.token.kind {
            TokenKind::Punct(Punct::LeftBrace) => StatementType::BlockStatement(self.parse_block()?),
            TokenKind::Punct(Punct::Semicolon) => {
                self.advance()?;
                StatementType::EmptyStatement
            }
            TokenKind::Keyword(Keyword::Var) => {
                self.advance()?;
                let declaration = self.parse_variable_declarations(VariableDeclarationKind::Var)?;
                self.consume_semicolon()?;
                StatementType::VariableDeclaration(declaration)
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::While) => {
                self.advance()?;
                let test = self.parse_paren_expression()?;
                let body = self.parse_statement()?;
                StatementType::WhileStatement { test, body }
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.advance()?;
                let body = self.parse_statement()?;
                self.expect_keyword(Keyword::While)?;
                let test = self.parse_paren_expression()?;
                self.eat_punct(Punct::Semicolon)?;
                StatementType::DoWhileStatement { body, test }
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance()?;
                let label = self.parse_jump_label()?;
                self.consume_semicolon()?;
                StatementType::ContinueStatement(label)
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance()?;
                let label = self.parse_jump_label()?;
                self.consume_semicolon()?;
                StatementType::BreakStatement(label)
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance()?;
                let argument = if self.at_punct(Punct::Semicolon)
                    || self.at_punct(Punct::RightBrace)
                    || self.token.kind == TokenKind::Eof
                    || self.token.newline_before
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                StatementType::ReturnStatement(argument)
            }
            TokenKind::Keyword(Keyword::With) => {
                self.advance()?;
                let object = self.parse_paren_expression()?;
                let body = self.parse_statement()?;
                StatementType::WithStatement { object, body }
            }
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch()?,
            TokenKind::Keyword(Keyword::Throw) => {
                self.advance()?;
                if self.token.newline_before {
                    return Err(self.invalid("illegal newline after throw"));
                }
                let argument = self.parse_expression()?;
                self.consume_semicolon()?;
                StatementType::ThrowStatement(argument)
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::Debugger) => {
                self.advance()?;
                self.consume_semicolon()?;
                StatementType::DebuggerStatement
            }
            TokenKind::Keyword(Keyword::Function) => {
                return self.parse_function_declaration(false);
            }
            TokenKind::Keyword(Keyword::Import) | TokenKind::Keyword(Keyword::Export) => {
                return Err(self.invalid("modules are not supported"));
            }
            TokenKind::Identifier(label) if self.peek()?.is_punct(Punct::Colon) => {
                let label = label.clone();
                self.advance()?;
                self.advance()?;
                let body = if self.at_keyword(Keyword::Function) {
                    self.parse_function_declaration(false)?
                } else {
                    self.parse_statement()?
                };
                StatementType::LabeledStatement { label, body }
            }
            _ => {
                let expression = self.parse_expression()?;
                self.consume_semicolon()?;
                StatementType::ExpressionStatement(expression)
            }
        };
        let meta = self.finish_meta(start);
        Ok(self.ast.add_statement(meta, kind))
    }

    pub(crate) fn parse_block(&mut self) -> Result<Vec<StmtId>, ParseError> {
        self.expect_punct(Punct::LeftBrace)?;
        let mut body = Vec::new();
        while !self.at_punct(Punct::RightBrace) {
            if self.token.kind == TokenKind::Eof {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_statement_list_item()?);
        }
        self.advance()?;
        Ok(body)
    }

    fn parse_paren_expression(&mut self) -> Result<ExprId, ParseError> {
        self.expect_punct(Punct::LeftParen)?;
        let expression = self.parse_expression()?;
        self.expect_punct(Punct::RightParen)?;
        Ok(expression)
    }

    fn parse_jump_label(&mut self) -> Result<Option<Arc<str>>, ParseError> {
        match &self.token.kind {
            TokenKind::Identifier(name) if !self.token.newline_before => {
                let name = name.clone();
                self.advance()?;
                Ok(Some(name))
            }
            _ => Ok(None),
        }
    }

    fn parse_if(&mut self) -> Result<StatementType, ParseError> {
        self.advance()?;
        let test = self.parse_paren_expression()?;
        let consequent = self.parse_statement()?;
        let alternate = if self.eat_keyword(Keyword::Else)? {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(StatementType::IfStatement {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_lexical_declaration(&mut self, kind: VariableDeclarationKind) -> Result<StmtId, ParseError> {
        let start = self.start_meta();
        self.advance()?;
        let declaration = self.parse_variable_declarations(kind)?;
        self.consume_semicolon()?;
        let meta = self.finish_meta(start);
        Ok(self.ast.add_statement(meta, StatementType::VariableDeclaration(declaration)))
    }

    /// Declarators after the `var`/`let`/`const` keyword.
    fn parse_variable_declarations(
        &mut self,
        kind: VariableDeclarationKind,
    ) -> Result<VariableDeclarationData, ParseError> {
        let mut declarations = Vec::new();
        loop {
            let start = self.start_meta();
            let id = self.parse_binding_target()?;
            declarations.push(self.finish_declarator(start, kind, id)?);
            if !self.eat_punct(Punct::Comma)? {
                break;
            }
        }
        Ok(VariableDeclarationData { kind, declarations })
    }

    fn finish_declarator(
        &mut self,
        start: Meta,
        kind: VariableDeclarationKind,
        id: PatId,
    ) -> Result<VariableDeclaratorData, ParseError> {
        let init = if self.eat_punct(Punct::Assign)? {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        let is_identifier = matches!(self.ast.pattern(id).kind, PatternType::Identifier(_));
        if init.is_none() && !self.context.no_in {
            if kind == VariableDeclarationKind::Const {
                return Err(self.invalid("missing initializer in const declaration"));
            }
            if !is_identifier {
                return Err(self.invalid("missing initializer in destructuring declaration"));
            }
        }
        if kind == VariableDeclarationKind::Var {
            self.declare_pattern_vars(id);
        }
        Ok(VariableDeclaratorData {
            meta: self.finish_meta(start),
            id,
            init,
        })
    }

    fn declare_pattern_vars(&mut self, pattern: PatId) {
        let mut names = Vec::new();
        self.ast.bound_names(pattern, &mut names);
        for name in names {
            self.declare_var(name);
        }
    }

    fn parse_for(&mut self) -> Result<StatementType, ParseError> {
        self.advance()?;
        if self.at_word("await") {
            return Err(self.invalid("for await is not supported"));
        }
        self.expect_punct(Punct::LeftParen)?;
        let outer = self.context;
        let head_context = ParseContext { no_in: true, ..outer };

        let init = if self.at_punct(Punct::Semicolon) {
            None
        } else {
            let declaration_kind = if self.at_keyword(Keyword::Var) {
                Some(VariableDeclarationKind::Var)
            } else if self.at_keyword(Keyword::Const) {
                Some(VariableDeclarationKind::Const)
            } else if self.at_word("let") && self.let_starts_declaration()? {
                Some(VariableDeclarationKind::Let)
            } else {
                None
            };
            match declaration_kind {
                Some(kind) => {
                    self.advance()?;
                    let start = self.start_meta();
                    let first = self.parse_binding_target()?;
                    if let Some(iteration) = self.parse_for_iteration_rest(
                        VariableDeclarationOrPattern::VariableDeclaration(kind, first),
                    )? {
                        if kind == VariableDeclarationKind::Var {
                            self.declare_pattern_vars(first);
                        }
                        return Ok(iteration);
                    }
                    let declaration = self.with_context(head_context, |p| {
                        let mut declarations = vec![p.finish_declarator(start, kind, first)?];
                        while p.eat_punct(Punct::Comma)? {
                            let start = p.start_meta();
                            let id = p.parse_binding_target()?;
                            declarations.push(p.finish_declarator(start, kind, id)?);
                        }
                        Ok(VariableDeclarationData { kind, declarations })
                    })?;
                    for declarator in &declaration.declarations {
                        if declarator.init.is_none() && kind == VariableDeclarationKind::Const {
                            return Err(self.invalid_at(declarator.meta, "missing initializer in const declaration"));
                        }
                    }
                    Some(VariableDeclarationOrExpression::VariableDeclaration(declaration))
                }
                None => {
                    let expression = self.with_context(head_context, |p| p.parse_expression())?;
                    if self.at_word("of") || self.at_keyword(Keyword::In) {
                        let target = self.expression_to_pattern(expression)?;
                        if let Some(iteration) =
                            self.parse_for_iteration_rest(VariableDeclarationOrPattern::Pattern(target))?
                        {
                            return Ok(iteration);
                        }
                    }
                    Some(VariableDeclarationOrExpression::Expression(expression))
                }
            }
        };
        self.expect_punct(Punct::Semicolon)?;
        let test = if self.at_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::Semicolon)?;
        let update = if self.at_punct(Punct::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::RightParen)?;
        let body = self.parse_statement()?;
        Ok(StatementType::ForStatement {
            init,
            test,
            update,
            body,
        })
    }

    /// The `of x) body` / `in x) body` part of a for-of/for-in, if the head is one.
    fn parse_for_iteration_rest(
        &mut self,
        left: VariableDeclarationOrPattern,
    ) -> Result<Option<StatementType>, ParseError> {
        let is_of = if self.at_word("of") {
            true
        } else if self.at_keyword(Keyword::In) {
            false
        } else {
            return Ok(None);
        };
        self.advance()?;
        let right = if is_of {
            self.parse_assignment()?
        } else {
            self.parse_expression()?
        };
        self.expect_punct(Punct::RightParen)?;
        let body = self.parse_statement()?;
        let data = ForIteratorData { left, right, body };
        Ok(Some(if is_of {
            StatementType::ForOfStatement(data)
        } else {
            StatementType::ForInStatement(data)
        }))
    }

    fn parse_switch(&mut self) -> Result<StatementType, ParseError> {
        self.advance()?;
        let discriminant = self.parse_paren_expression()?;
        self.expect_punct(Punct::LeftBrace)?;
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.eat_punct(Punct::RightBrace)? {
            let start = self.start_meta();
            let test = if self.eat_keyword(Keyword::Case)? {
                Some(self.parse_expression()?)
            } else if self.at_keyword(Keyword::Default) {
                if seen_default {
                    return Err(self.invalid("more than one default clause in switch statement"));
                }
                seen_default = true;
                self.advance()?;
                None
            } else {
                return Err(self.unexpected("'case', 'default' or '}'"));
            };
            self.expect_punct(Punct::Colon)?;
            let mut consequent = Vec::new();
            while !self.at_keyword(Keyword::Case)
                && !self.at_keyword(Keyword::Default)
                && !self.at_punct(Punct::RightBrace)
            {
                if self.token.kind == TokenKind::Eof {
                    return Err(self.unexpected("'}'"));
                }
                consequent.push(self.parse_statement_list_item()?);
            }
            cases.push(SwitchCaseData {
                meta: self.finish_meta(start),
                test,
                consequent,
            });
        }
        Ok(StatementType::SwitchStatement { discriminant, cases })
    }

    fn parse_try(&mut self) -> Result<StatementType, ParseError> {
        self.advance()?;
        let block = self.parse_block()?;
        let handler = if self.eat_keyword(Keyword::Catch)? {
            let param = if self.eat_punct(Punct::LeftParen)? {
                let param = self.parse_binding_target()?;
                self.expect_punct(Punct::RightParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClauseData { param, body })
        } else {
            None
        };
        let finalizer = if self.eat_keyword(Keyword::Finally)? {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("'catch' or 'finally'"));
        }
        Ok(StatementType::TryStatement {
            block,
            handler,
            finalizer,
        })
    }

    // ----- binding patterns -----

    pub(crate) fn parse_binding_target(&mut self) -> Result<PatId, ParseError> {
        let start = self.start_meta();
        let kind = match &self.token.kind {
            TokenKind::Punct(Punct::LeftBracket) => self.parse_array_binding()?,
            TokenKind::Punct(Punct::LeftBrace) => self.parse_object_binding()?,
            TokenKind::Identifier(_) => PatternType::Identifier(self.expect_identifier()?),
            _ => return Err(self.unexpected("binding pattern")),
        };
        let meta = self.finish_meta(start);
        Ok(self.ast.add_pattern(meta, kind))
    }

    /// A binding target with an optional `= default`.
    pub(crate) fn parse_binding_element(&mut self) -> Result<PatId, ParseError> {
        let start = self.start_meta();
        let target = self.parse_binding_target()?;
        self.parse_pattern_default(start, target)
    }

    fn parse_pattern_default(&mut self, start: Meta, target: PatId) -> Result<PatId, ParseError> {
        if self.eat_punct(Punct::Assign)? {
            let default = self.with_context(ParseContext { no_in: false, ..self.context }, |p| {
                p.parse_assignment()
            })?;
            let meta = self.finish_meta(start);
            Ok(self.ast.add_pattern(meta, PatternType::AssignmentPattern { target, default }))
        } else {
            Ok(target)
        }
    }

    fn parse_array_binding(&mut self) -> Result<PatternType, ParseError> {
        self.expect_punct(Punct::LeftBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;
        loop {
            if self.eat_punct(Punct::RightBracket)? {
                break;
            }
            if self.at_punct(Punct::Comma) {
                self.advance()?;
                elements.push(None);
                continue;
            }
            if self.eat_punct(Punct::Ellipsis)? {
                rest = Some(self.parse_binding_target()?);
                self.expect_punct(Punct::RightBracket)?;
                break;
            }
            elements.push(Some(self.parse_binding_element()?));
            if !self.at_punct(Punct::RightBracket) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(PatternType::ArrayPattern { elements, rest })
    }

    fn parse_object_binding(&mut self) -> Result<PatternType, ParseError> {
        self.expect_punct(Punct::LeftBrace)?;
        let mut properties = Vec::new();
        let mut rest = None;
        while !self.eat_punct(Punct::RightBrace)? {
            if self.eat_punct(Punct::Ellipsis)? {
                let start = self.start_meta();
                let name = self.expect_identifier()?;
                let meta = self.finish_meta(start);
                rest = Some(self.ast.add_pattern(meta, PatternType::Identifier(name)));
                self.expect_punct(Punct::RightBrace)?;
                break;
            }
            let start = self.start_meta();
            let shorthand_name = match &self.token.kind {
                TokenKind::Identifier(name) => Some(name.clone()),
                _ => None,
            };
            let key = self.parse_property_name()?;
            let value = if self.eat_punct(Punct::Colon)? {
                self.parse_binding_element()?
            } else {
                let name = shorthand_name.ok_or_else(|| self.unexpected("':'"))?;
                self.check_binding_name(&name)?;
                let meta = self.finish_meta(start);
                let target = self.ast.add_pattern(meta, PatternType::Identifier(name));
                self.parse_pattern_default(start, target)?
            };
            properties.push(AssignmentPropertyData { key, value });
            if !self.at_punct(Punct::RightBrace) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(PatternType::ObjectPattern { properties, rest })
    }

    pub(crate) fn parse_property_name(&mut self) -> Result<PropertyName, ParseError> {
        let name = match &self.token.kind {
            TokenKind::Identifier(name) | TokenKind::String(name) => PropertyName::Named(name.clone()),
            TokenKind::Keyword(k) => PropertyName::Named(Arc::from(k.as_str())),
            TokenKind::Number(n) => PropertyName::Named(Arc::from(number_to_string(*n))),
            TokenKind::Punct(Punct::LeftBracket) => {
                self.advance()?;
                let key = self.with_context(ParseContext { no_in: false, ..self.context }, |p| {
                    p.parse_assignment()
                })?;
                self.expect_punct(Punct::RightBracket)?;
                return Ok(PropertyName::Computed(key));
            }
            _ => return Err(self.unexpected("property name")),
        };
        self.advance()?;
        Ok(name)
    }

    // ----- functions -----

    fn parse_function_declaration(&mut self, is_async: bool) -> Result<StmtId, ParseError> {
        let start = self.start_meta();
        if is_async {
            self.advance()?;
        }
        self.expect_keyword(Keyword::Function)?;
        let generator = self.eat_punct(Punct::Star)?;
        let name = self.expect_identifier()?;
        let function = self.parse_function_rest(start, Some(name), FunctionForm::Declaration, generator, is_async)?;
        let meta = self.finish_meta(start);
        Ok(self.ast.add_statement(meta, StatementType::FunctionDeclaration(function)))
    }

    /// `function [*] [name] (...) {...}` after an optional `async`.
    pub(crate) fn parse_function_expression(&mut self, is_async: bool) -> Result<FuncId, ParseError> {
        let start = self.start_meta();
        if is_async {
            self.advance()?;
        }
        self.expect_keyword(Keyword::Function)?;
        let generator = self.eat_punct(Punct::Star)?;
        let name = match &self.token.kind {
            TokenKind::Identifier(_) => {
                let context = ParseContext {
                    generator,
                    is_async,
                    ..self.context
                };
                Some(self.with_context(context, |p| p.expect_identifier())?)
            }
            _ => None,
        };
        self.parse_function_rest(start, name, FunctionForm::Expression, generator, is_async)
    }

    /// Parameters and body of a non-arrow function.
    pub(crate) fn parse_function_rest(
        &mut self,
        start: Meta,
        id: Option<Arc<str>>,
        form: FunctionForm,
        generator: bool,
        is_async: bool,
    ) -> Result<FuncId, ParseError> {
        let context = ParseContext {
            in_function: true,
            generator,
            is_async,
            super_call: matches!(form, FunctionForm::ClassConstructor { derived: true }),
            super_property: matches!(
                form,
                FunctionForm::Method | FunctionForm::Getter | FunctionForm::Setter | FunctionForm::ClassConstructor { .. }
            ),
            no_in: false,
        };
        self.enter_function_scope();
        let parsed = self.with_context(context, |p| {
            let (params, rest) = p.parse_formal_parameters()?;
            let body = p.parse_block()?;
            Ok((params, rest, body))
        });
        let hoisted_vars = self.exit_function_scope();
        let (params, rest, body) = parsed?;
        match form {
            FunctionForm::Getter if !params.is_empty() || rest.is_some() => {
                return Err(self.invalid_at(start, "getter must not have parameters"));
            }
            FunctionForm::Setter if params.len() != 1 || rest.is_some() => {
                return Err(self.invalid_at(start, "setter must have exactly one parameter"));
            }
            _ => {}
        }
        let meta = self.finish_meta(start);
        Ok(self.ast.add_function(FunctionData {
            meta,
            id,
            form,
            generator,
            is_async,
            params,
            rest,
            body: FunctionBody::Block(body),
            hoisted_vars,
        }))
    }

    /// `( a, b = 1, [c], ...d )`
    pub(crate) fn parse_formal_parameters(&mut self) -> Result<(Vec<PatId>, Option<PatId>), ParseError> {
        self.expect_punct(Punct::LeftParen)?;
        let mut params = Vec::new();
        let mut rest = None;
        while !self.eat_punct(Punct::RightParen)? {
            if self.eat_punct(Punct::Ellipsis)? {
                rest = Some(self.parse_binding_target()?);
                self.expect_punct(Punct::RightParen)?;
                break;
            }
            params.push(self.parse_binding_element()?);
            if !self.at_punct(Punct::RightParen) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok((params, rest))
    }

    // ----- classes -----

    pub(crate) fn parse_class(&mut self, require_name: bool) -> Result<ClassData, ParseError> {
        let start = self.start_meta();
        self.expect_keyword(Keyword::Class)?;
        let id = match &self.token.kind {
            TokenKind::Identifier(_) => Some(self.expect_identifier()?),
            _ if require_name => return Err(self.unexpected("class name")),
            _ => None,
        };
        let super_class = if self.eat_keyword(Keyword::Extends)? {
            Some(self.parse_left_hand_side()?)
        } else {
            None
        };
        self.expect_punct(Punct::LeftBrace)?;
        let mut constructor = None;
        let mut body = Vec::new();
        while !self.eat_punct(Punct::RightBrace)? {
            if self.eat_punct(Punct::Semicolon)? {
                continue;
            }
            let member_start = self.start_meta();
            let static_flag = self.at_word("static") && !self.modifier_is_name()?;
            if static_flag {
                self.advance()?;
            }
            let mut kind = MethodDefinitionKind::Method;
            let mut is_async = false;
            let mut generator = false;
            if (self.at_word("get") || self.at_word("set")) && !self.modifier_is_name()? {
                kind = if self.at_word("get") {
                    MethodDefinitionKind::Get
                } else {
                    MethodDefinitionKind::Set
                };
                self.advance()?;
            } else if self.at_word("async") && !self.modifier_is_name()? && !self.peek()?.newline_before {
                is_async = true;
                self.advance()?;
            }
            if self.eat_punct(Punct::Star)? {
                generator = true;
            }
            let key = self.parse_property_name()?;
            if !self.at_punct(Punct::LeftParen) {
                return Err(self.invalid("class fields are not supported"));
            }
            let is_constructor = !static_flag && key.as_named() == Some("constructor");
            if is_constructor {
                if kind != MethodDefinitionKind::Method || generator || is_async {
                    return Err(self.invalid("class constructor may not be an accessor, generator or async"));
                }
                if constructor.is_some() {
                    return Err(self.invalid("a class may only have one constructor"));
                }
                let form = FunctionForm::ClassConstructor {
                    derived: super_class.is_some(),
                };
                constructor = Some(self.parse_function_rest(member_start, id.clone(), form, false, false)?);
                continue;
            }
            let form = match kind {
                MethodDefinitionKind::Method => FunctionForm::Method,
                MethodDefinitionKind::Get => FunctionForm::Getter,
                MethodDefinitionKind::Set => FunctionForm::Setter,
            };
            let name = key.as_named().map(Arc::from);
            let value = self.parse_function_rest(member_start, name, form, generator, is_async)?;
            body.push(MethodDefinitionData {
                meta: self.finish_meta(member_start),
                key,
                value,
                kind,
                static_flag,
            });
        }
        Ok(ClassData {
            meta: self.finish_meta(start),
            id,
            super_class,
            constructor,
            body,
        })
    }

    /// Whether a `static`/`get`/`set`/`async` word is itself the member name.
    pub(crate) fn modifier_is_name(&self) -> Result<bool, ParseError> {
        let next = self.peek()?;
        Ok(matches!(
            next.kind,
            TokenKind::Punct(Punct::LeftParen)
                | TokenKind::Punct(Punct::Colon)
                | TokenKind::Punct(Punct::Comma)
                | TokenKind::Punct(Punct::RightBrace)
                | TokenKind::Punct(Punct::Assign)
                | TokenKind::Punct(Punct::Semicolon)
        ))
    }
}
