//! On-demand tokenizer.
//!
//! The lexer keeps no state between calls: [`Lexer::next_token`] scans one
//! token starting at a [`LexPosition`] and returns the position after it.
//! Whether `/` starts a regular expression is decided by the token before it
//! and carried in the position.

use std::sync::Arc;

use crate::parser::error::LexError;
use crate::parser::token::{Keyword, LexPosition, Punct, Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a str,
}

struct Cursor<'a> {
    source: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn at(source: &'a str, pos: LexPosition) -> Self {
        Cursor {
            source,
            offset: pos.offset,
            line: pos.line,
            column: pos.column,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if is_line_terminator(c) {
            if !(c == '\r' && self.peek() == Some('\n')) {
                self.line += 1;
                self.column = 1;
            }
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError::new(message, self.line, self.column)
    }

    fn position(&self, regex_allowed: bool) -> LexPosition {
        LexPosition {
            offset: self.offset,
            line: self.line,
            column: self.column,
            regex_allowed,
        }
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_whitespace(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\u{b}' | '\u{c}' | '\u{a0}' | '\u{feff}'
    ) || (c as u32 > 127 && c.is_whitespace() && !is_line_terminator(c))
}

pub(crate) fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

pub(crate) fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Scans the token at `pos`, skipping whitespace and comments before it.
    pub fn next_token(&self, pos: LexPosition) -> Result<Token, LexError> {
        let mut cursor = Cursor::at(self.source, pos);
        let newline_before = skip_trivia(&mut cursor)?;
        let (start, line, column) = (cursor.offset, cursor.line, cursor.column);
        let kind = match cursor.peek() {
            None => TokenKind::Eof,
            Some(c) if is_identifier_start(c) || c == '\\' => scan_word(&mut cursor)?,
            Some(c) if c.is_ascii_digit() => scan_number(&mut cursor)?,
            Some('.') if cursor.peek_nth(1).map_or(false, |c| c.is_ascii_digit()) => scan_number(&mut cursor)?,
            Some(q @ ('"' | '\'')) => {
                cursor.bump();
                scan_string(&mut cursor, q)?
            }
            Some('`') => {
                cursor.bump();
                scan_template(&mut cursor)?
            }
            Some('/') if pos.regex_allowed => scan_regexp(&mut cursor)?,
            Some(_) => scan_punct(&mut cursor)?,
        };
        let regex_allowed = kind.allows_regex_after();
        Ok(Token {
            kind,
            start,
            end: cursor.offset,
            line,
            column,
            newline_before,
            next: cursor.position(regex_allowed),
        })
    }

    /// Rescans from the `}` closing a template substitution as the next template chunk.
    pub fn template_continuation(&self, pos: LexPosition) -> Result<Token, LexError> {
        let mut cursor = Cursor::at(self.source, pos);
        let (start, line, column) = (cursor.offset, cursor.line, cursor.column);
        if !cursor.eat('}') {
            return Err(cursor.error("expected '}' to close template substitution"));
        }
        let kind = scan_template(&mut cursor)?;
        let regex_allowed = kind.allows_regex_after();
        Ok(Token {
            kind,
            start,
            end: cursor.offset,
            line,
            column,
            newline_before: false,
            next: cursor.position(regex_allowed),
        })
    }
}

/// Returns whether a line terminator was skipped.
fn skip_trivia(cursor: &mut Cursor) -> Result<bool, LexError> {
    let mut newline = false;
    if cursor.offset == 0 && cursor.rest().starts_with("#!") {
        while cursor.peek().map_or(false, |c| !is_line_terminator(c)) {
            cursor.bump();
        }
    }
    loop {
        match cursor.peek() {
            Some(c) if is_line_terminator(c) => {
                newline = true;
                cursor.bump();
            }
            Some(c) if is_whitespace(c) => {
                cursor.bump();
            }
            Some('/') if cursor.peek_nth(1) == Some('/') => {
                while cursor.peek().map_or(false, |c| !is_line_terminator(c)) {
                    cursor.bump();
                }
            }
            Some('/') if cursor.peek_nth(1) == Some('*') => {
                let (line, column) = (cursor.line, cursor.column);
                cursor.bump();
                cursor.bump();
                loop {
                    match cursor.bump() {
                        None => return Err(LexError::new("unterminated comment", line, column)),
                        Some('*') if cursor.peek() == Some('/') => {
                            cursor.bump();
                            break;
                        }
                        Some(c) if is_line_terminator(c) => newline = true,
                        Some(_) => {}
                    }
                }
            }
            _ => return Ok(newline),
        }
    }
}

fn scan_word(cursor: &mut Cursor) -> Result<TokenKind, LexError> {
    let mut name = String::new();
    let mut escaped = false;
    loop {
        match cursor.peek() {
            Some('\\') => {
                cursor.bump();
                if !cursor.eat('u') {
                    return Err(cursor.error("invalid escape in identifier"));
                }
                let c = scan_unicode_escape(cursor)?;
                let valid = if name.is_empty() {
                    is_identifier_start(c)
                } else {
                    is_identifier_part(c)
                };
                if !valid {
                    return Err(cursor.error("invalid identifier escape"));
                }
                escaped = true;
                name.push(c);
            }
            Some(c) if is_identifier_part(c) => {
                cursor.bump();
                name.push(c);
            }
            _ => break,
        }
    }
    if !escaped {
        if let Some(keyword) = Keyword::from_str(&name) {
            return Ok(TokenKind::Keyword(keyword));
        }
    }
    Ok(TokenKind::Identifier(Arc::from(name)))
}

fn digit_run(cursor: &mut Cursor, radix: u32, out: &mut String) -> Result<(), LexError> {
    let mut last_was_digit = false;
    while let Some(c) = cursor.peek() {
        if c == '_' {
            if !last_was_digit || !cursor.peek_nth(1).map_or(false, |d| d.is_digit(radix)) {
                return Err(cursor.error("invalid numeric separator"));
            }
            cursor.bump();
            last_was_digit = false;
        } else if c.is_digit(radix) {
            cursor.bump();
            out.push(c);
            last_was_digit = true;
        } else {
            break;
        }
    }
    Ok(())
}

fn scan_number(cursor: &mut Cursor) -> Result<TokenKind, LexError> {
    let (line, column) = (cursor.line, cursor.column);
    let value = if cursor.peek() == Some('0')
        && matches!(cursor.peek_nth(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'))
    {
        cursor.bump();
        let radix = match cursor.bump() {
            Some('x' | 'X') => 16,
            Some('o' | 'O') => 8,
            _ => 2,
        };
        let mut digits = String::new();
        digit_run(cursor, radix, &mut digits)?;
        if digits.is_empty() {
            return Err(LexError::new("invalid numeric literal", line, column));
        }
        digits
            .chars()
            .fold(0f64, |acc, d| acc * radix as f64 + d.to_digit(radix).unwrap_or(0) as f64)
    } else if cursor.peek() == Some('0') && cursor.peek_nth(1).map_or(false, |c| c.is_ascii_digit()) {
        cursor.bump();
        let mut digits = String::new();
        while let Some(c) = cursor.peek().filter(|c| c.is_ascii_digit()) {
            cursor.bump();
            digits.push(c);
        }
        if digits.chars().all(|c| c < '8') {
            digits
                .chars()
                .fold(0f64, |acc, d| acc * 8.0 + d.to_digit(8).unwrap_or(0) as f64)
        } else {
            digits
                .parse::<f64>()
                .map_err(|_| LexError::new("invalid numeric literal", line, column))?
        }
    } else {
        let mut text = String::new();
        digit_run(cursor, 10, &mut text)?;
        if cursor.peek() == Some('.') {
            cursor.bump();
            text.push('.');
            digit_run(cursor, 10, &mut text)?;
        }
        if matches!(cursor.peek(), Some('e' | 'E')) {
            cursor.bump();
            text.push('e');
            if let Some(sign @ ('+' | '-')) = cursor.peek() {
                cursor.bump();
                text.push(sign);
            }
            let before = text.len();
            digit_run(cursor, 10, &mut text)?;
            if text.len() == before {
                return Err(LexError::new("invalid numeric literal: missing exponent", line, column));
            }
        }
        if text.starts_with('.') {
            text.insert(0, '0');
        }
        text.parse::<f64>()
            .map_err(|_| LexError::new("invalid numeric literal", line, column))?
    };
    match cursor.peek() {
        Some('n') => Err(cursor.error("BigInt literals are not supported")),
        Some(c) if is_identifier_start(c) || c.is_ascii_digit() => {
            Err(LexError::new("invalid numeric literal", line, column))
        }
        _ => Ok(TokenKind::Number(value)),
    }
}

fn hex_value(cursor: &mut Cursor, count: usize) -> Result<u32, LexError> {
    let mut value = 0;
    for _ in 0..count {
        let digit = cursor
            .peek()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| cursor.error("invalid escape sequence"))?;
        cursor.bump();
        value = value * 16 + digit;
    }
    Ok(value)
}

/// After `\u`: either four hex digits or `{...}`. Surrogate pairs are joined.
fn scan_unicode_escape(cursor: &mut Cursor) -> Result<char, LexError> {
    let code = if cursor.eat('{') {
        let mut value: u32 = 0;
        let mut digits = 0;
        while let Some(d) = cursor.peek().and_then(|c| c.to_digit(16)) {
            cursor.bump();
            value = value.saturating_mul(16).saturating_add(d);
            digits += 1;
        }
        if digits == 0 || !cursor.eat('}') || value > 0x10ffff {
            return Err(cursor.error("invalid escape sequence"));
        }
        value
    } else {
        hex_value(cursor, 4)?
    };
    if (0xd800..0xdc00).contains(&code) && cursor.rest().starts_with("\\u") {
        let saved = (cursor.offset, cursor.line, cursor.column);
        cursor.bump();
        cursor.bump();
        if let Ok(low) = hex_value(cursor, 4) {
            if (0xdc00..0xe000).contains(&low) {
                let combined = 0x10000 + ((code - 0xd800) << 10) + (low - 0xdc00);
                return Ok(char::from_u32(combined).unwrap_or('\u{fffd}'));
            }
        }
        cursor.offset = saved.0;
        cursor.line = saved.1;
        cursor.column = saved.2;
    }
    Ok(char::from_u32(code).unwrap_or('\u{fffd}'))
}

/// One escape after `\`, appended to `out`. Errors on malformed escapes.
fn scan_escape(cursor: &mut Cursor, out: &mut String, in_template: bool) -> Result<(), LexError> {
    let c = cursor
        .bump()
        .ok_or_else(|| cursor.error("unterminated string literal"))?;
    match c {
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'r' => out.push('\r'),
        'b' => out.push('\u{8}'),
        'f' => out.push('\u{c}'),
        'v' => out.push('\u{b}'),
        '0' if !cursor.peek().map_or(false, |c| c.is_ascii_digit()) => out.push('\0'),
        'x' => {
            let code = hex_value(cursor, 2)?;
            out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
        }
        'u' => out.push(scan_unicode_escape(cursor)?),
        '\r' => {
            cursor.eat('\n');
        }
        c if is_line_terminator(c) => {}
        '0'..='9' if in_template => return Err(cursor.error("octal escape in template")),
        '8' | '9' => out.push(c),
        '0'..='7' => {
            let mut value = c.to_digit(8).unwrap_or(0);
            let max_len = if c <= '3' { 2 } else { 1 };
            for _ in 0..max_len {
                match cursor.peek().and_then(|d| d.to_digit(8)) {
                    Some(d) => {
                        cursor.bump();
                        value = value * 8 + d;
                    }
                    None => break,
                }
            }
            out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
        }
        other => out.push(other),
    }
    Ok(())
}

/// Called after the opening quote; errors point at the quote.
fn scan_string(cursor: &mut Cursor, quote: char) -> Result<TokenKind, LexError> {
    let (line, column) = (cursor.line, cursor.column - 1);
    let mut value = String::new();
    loop {
        match cursor.peek() {
            None => return Err(LexError::new("unterminated string literal", line, column)),
            Some(c) if c == quote => {
                cursor.bump();
                return Ok(TokenKind::String(Arc::from(value)));
            }
            Some('\n' | '\r') => return Err(LexError::new("unterminated string literal", line, column)),
            Some('\\') => {
                cursor.bump();
                scan_escape(cursor, &mut value, false)?;
            }
            Some(c) => {
                cursor.bump();
                value.push(c);
            }
        }
    }
}

/// Scans a template chunk after its opening `` ` `` or `}`.
fn scan_template(cursor: &mut Cursor) -> Result<TokenKind, LexError> {
    let (line, column) = (cursor.line, cursor.column);
    let mut cooked = Some(String::new());
    let mut raw = String::new();
    loop {
        match cursor.peek() {
            None => return Err(LexError::new("unterminated template literal", line, column)),
            Some('`') => {
                cursor.bump();
                return Ok(template_token(cooked, raw, true));
            }
            Some('$') if cursor.peek_nth(1) == Some('{') => {
                cursor.bump();
                cursor.bump();
                return Ok(template_token(cooked, raw, false));
            }
            Some('\\') => {
                let escape_start = cursor.offset;
                cursor.bump();
                let mut piece = String::new();
                match scan_escape(cursor, &mut piece, true) {
                    Ok(()) => {
                        if let Some(cooked) = cooked.as_mut() {
                            cooked.push_str(&piece);
                        }
                    }
                    Err(_) => {
                        cooked = None;
                        if cursor.offset == escape_start + 1 {
                            cursor.bump();
                        }
                    }
                }
                raw.push_str(&cursor.source[escape_start..cursor.offset].replace("\r\n", "\n"));
            }
            Some('\r') => {
                cursor.bump();
                cursor.eat('\n');
                raw.push('\n');
                if let Some(cooked) = cooked.as_mut() {
                    cooked.push('\n');
                }
            }
            Some(c) => {
                cursor.bump();
                raw.push(c);
                if let Some(cooked) = cooked.as_mut() {
                    cooked.push(c);
                }
            }
        }
    }
}

fn template_token(cooked: Option<String>, raw: String, tail: bool) -> TokenKind {
    TokenKind::Template {
        cooked: cooked.map(Arc::from),
        raw: Arc::from(raw),
        tail,
    }
}

fn scan_regexp(cursor: &mut Cursor) -> Result<TokenKind, LexError> {
    let (line, column) = (cursor.line, cursor.column);
    cursor.bump();
    let mut pattern = String::new();
    let mut in_class = false;
    loop {
        match cursor.bump() {
            None => return Err(LexError::new("unterminated regular expression", line, column)),
            Some(c) if is_line_terminator(c) => {
                return Err(LexError::new("unterminated regular expression", line, column))
            }
            Some('\\') => {
                pattern.push('\\');
                match cursor.bump() {
                    Some(c) if !is_line_terminator(c) => pattern.push(c),
                    _ => return Err(LexError::new("unterminated regular expression", line, column)),
                }
            }
            Some('[') => {
                in_class = true;
                pattern.push('[');
            }
            Some(']') => {
                in_class = false;
                pattern.push(']');
            }
            Some('/') if !in_class => break,
            Some(c) => pattern.push(c),
        }
    }
    let mut flags = String::new();
    while let Some(c) = cursor.peek().filter(|c| is_identifier_part(*c)) {
        if !"dgimsuyv".contains(c) || flags.contains(c) {
            return Err(cursor.error(format!("invalid regular expression flag '{}'", c)));
        }
        cursor.bump();
        flags.push(c);
    }
    Ok(TokenKind::RegExp {
        pattern: Arc::from(pattern),
        flags: Arc::from(flags),
    })
}

fn scan_punct(cursor: &mut Cursor) -> Result<TokenKind, LexError> {
    let rest = cursor.rest();
    for (text, punct) in Punct::BY_LENGTH {
        if rest.starts_with(text) {
            // `a?.5:b` is a conditional, not optional chaining.
            if *punct == Punct::QuestionDot && rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            for _ in 0..text.len() {
                cursor.bump();
            }
            return Ok(TokenKind::Punct(*punct));
        }
    }
    let c = cursor.peek().unwrap_or('\0');
    Err(cursor.error(format!("unexpected character '{}'", c)))
}
