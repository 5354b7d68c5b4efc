use std::mem;
use std::sync::Arc;
use std::time::Instant;

use crate::parser::ast::{Ast, AstMark, FunctionBody, FunctionData, FunctionForm, Meta, ProgramData};
use crate::parser::error::ParseError;
use crate::parser::lexer::Lexer;
use crate::parser::token::{Keyword, LexPosition, Punct, Token, TokenKind};

/// What the enclosing function allows.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct ParseContext {
    pub(crate) in_function: bool,
    pub(crate) generator: bool,
    pub(crate) is_async: bool,
    pub(crate) super_call: bool,
    pub(crate) super_property: bool,
    /// `in` is not a relational operator inside a `for (...;` head.
    pub(crate) no_in: bool,
}

/// Everything needed to abandon a speculative parse.
pub(crate) struct Marker {
    token: Token,
    prev_end: usize,
    ast: AstMark,
    hoisted: usize,
    context: ParseContext,
}

/// Recursive-descent parser over an on-demand token stream.
pub struct JsParser<'a> {
    lexer: Lexer<'a>,
    pub(crate) ast: Ast,
    pub(crate) token: Token,
    prev_end: usize,
    hoist_stack: Vec<Vec<Arc<str>>>,
    pub(crate) context: ParseContext,
}

/// Parses a whole script.
pub fn parse_program(source: &str) -> Result<ProgramData, ParseError> {
    let start = Instant::now();
    let mut parser = JsParser::new(source)?;
    let program = parser.parse_script()?;
    log::debug!(
        "parsed {} bytes into {} nodes in {:?}",
        source.len(),
        program.ast.node_count(),
        start.elapsed()
    );
    Ok(program)
}

impl<'a> JsParser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let lexer = Lexer::new(source);
        let token = lexer.next_token(LexPosition::start())?;
        Ok(JsParser {
            lexer,
            ast: Ast::new(),
            token,
            prev_end: 0,
            hoist_stack: Vec::new(),
            context: ParseContext::default(),
        })
    }

    pub fn parse_script(&mut self) -> Result<ProgramData, ParseError> {
        let start = self.start_meta();
        self.hoist_stack.push(Vec::new());
        let mut body = Vec::new();
        while self.token.kind != TokenKind::Eof {
            body.push(self.parse_statement_list_item()?);
        }
        let hoisted_vars = self.hoist_stack.pop().unwrap_or_default();
        let meta = self.finish_meta(start);
        let script = self.ast.add_function(FunctionData {
            meta,
            id: None,
            form: FunctionForm::Script,
            generator: false,
            is_async: false,
            params: Vec::new(),
            rest: None,
            body: FunctionBody::Block(body),
            hoisted_vars,
        });
        Ok(ProgramData {
            ast: mem::take(&mut self.ast),
            script,
        })
    }

    // ----- token stream -----

    pub(crate) fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token(self.token.next)?;
        let previous = mem::replace(&mut self.token, next);
        self.prev_end = previous.end;
        Ok(previous)
    }

    /// The token after the current one.
    pub(crate) fn peek(&self) -> Result<Token, ParseError> {
        Ok(self.lexer.next_token(self.token.next)?)
    }

    /// Rescans the current `}` as the continuation of a template literal.
    pub(crate) fn rescan_template_continuation(&mut self) -> Result<(), ParseError> {
        let pos = LexPosition {
            offset: self.token.start,
            line: self.token.line,
            column: self.token.column,
            regex_allowed: false,
        };
        self.token = self.lexer.template_continuation(pos)?;
        Ok(())
    }

    pub(crate) fn at_punct(&self, p: Punct) -> bool {
        self.token.is_punct(p)
    }

    pub(crate) fn at_keyword(&self, k: Keyword) -> bool {
        self.token.is_keyword(k)
    }

    pub(crate) fn at_word(&self, word: &str) -> bool {
        self.token.is_word(word)
    }

    pub(crate) fn eat_punct(&mut self, p: Punct) -> Result<bool, ParseError> {
        if self.at_punct(p) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(crate) fn eat_keyword(&mut self, k: Keyword) -> Result<bool, ParseError> {
        if self.at_keyword(k) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(crate) fn expect_punct(&mut self, p: Punct) -> Result<Token, ParseError> {
        if self.at_punct(p) {
            self.advance()
        } else {
            Err(self.unexpected(&format!("'{}'", p.as_str())))
        }
    }

    pub(crate) fn expect_keyword(&mut self, k: Keyword) -> Result<Token, ParseError> {
        if self.at_keyword(k) {
            self.advance()
        } else {
            Err(self.unexpected(&format!("'{}'", k.as_str())))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<Arc<str>, ParseError> {
        match &self.token.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.check_binding_name(&name)?;
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Names that cannot be bound in the current context.
    pub(crate) fn check_binding_name(&self, name: &str) -> Result<(), ParseError> {
        let reserved = (name == "yield" && self.context.generator)
            || (name == "await" && self.context.is_async)
            || matches!(name, "enum" | "implements" | "package" | "protected" | "interface" | "private" | "public");
        if reserved {
            Err(self.invalid(format!("unexpected reserved word '{}'", name)))
        } else {
            Ok(())
        }
    }

    /// Automatic semicolon insertion.
    pub(crate) fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat_punct(Punct::Semicolon)? {
            return Ok(());
        }
        if self.at_punct(Punct::RightBrace) || self.token.kind == TokenKind::Eof || self.token.newline_before {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Unexpected {
            expected: expected.to_string(),
            found: self.token.kind.to_string(),
            line: self.token.line,
            column: self.token.column,
        }
    }

    pub(crate) fn invalid(&self, message: impl Into<String>) -> ParseError {
        ParseError::Invalid {
            message: message.into(),
            line: self.token.line,
            column: self.token.column,
        }
    }

    pub(crate) fn invalid_at(&self, meta: Meta, message: impl Into<String>) -> ParseError {
        ParseError::Invalid {
            message: message.into(),
            line: meta.line,
            column: meta.column,
        }
    }

    // ----- positions -----

    pub(crate) fn start_meta(&self) -> Meta {
        Meta {
            start_index: self.token.start,
            end_index: self.token.start,
            line: self.token.line,
            column: self.token.column,
        }
    }

    pub(crate) fn finish_meta(&self, start: Meta) -> Meta {
        Meta {
            end_index: self.prev_end.max(start.start_index),
            ..start
        }
    }

    // ----- speculation -----

    pub(crate) fn mark(&self) -> Marker {
        Marker {
            token: self.token.clone(),
            prev_end: self.prev_end,
            ast: self.ast.mark(),
            hoisted: self.hoist_stack.last().map_or(0, Vec::len),
            context: self.context,
        }
    }

    pub(crate) fn reset(&mut self, marker: Marker) {
        self.token = marker.token;
        self.prev_end = marker.prev_end;
        self.ast.reset(marker.ast);
        if let Some(top) = self.hoist_stack.last_mut() {
            top.truncate(marker.hoisted);
        }
        self.context = marker.context;
    }

    // ----- hoisting -----

    pub(crate) fn enter_function_scope(&mut self) {
        self.hoist_stack.push(Vec::new());
    }

    pub(crate) fn exit_function_scope(&mut self) -> Vec<Arc<str>> {
        self.hoist_stack.pop().unwrap_or_default()
    }

    /// Records a `var` name in the nearest function's hoist set.
    pub(crate) fn declare_var(&mut self, name: Arc<str>) {
        if let Some(top) = self.hoist_stack.last_mut() {
            if !top.contains(&name) {
                top.push(name);
            }
        }
    }

    /// Runs `f` with a modified context, restoring the previous one afterwards.
    pub(crate) fn with_context<T>(
        &mut self,
        context: ParseContext,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = mem::replace(&mut self.context, context);
        let result = f(self);
        self.context = saved;
        result
    }
}
