use std::fmt;

use thiserror::Error;

use crate::parser::error::{LexError, ParseError};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::config::ConfigError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompileErrorKind {
    Lex,
    Parse,
    Bind,
    Compile,
    CodeGen,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileErrorKind::Lex => "LexError",
            CompileErrorKind::Parse => "ParseError",
            CompileErrorKind::Bind => "BindError",
            CompileErrorKind::Compile => "CompileError",
            CompileErrorKind::CodeGen => "CodeGenError",
        };
        write!(f, "{}", name)
    }
}

/// A failed compilation. Nothing of the unit is kept or cached.
#[derive(Clone, Debug, Error)]
#[error("{kind}: {message} ({}:{line}:{column})", .location.as_deref().unwrap_or("<anonymous>"))]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
    /// The offending source line.
    pub source_excerpt: String,
    pub location: Option<String>,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, line: u32, column: u32) -> Self {
        CompileError {
            kind,
            message: message.into(),
            line,
            column,
            source_excerpt: String::new(),
            location: None,
        }
    }

    /// An internal invariant violation in the code generator.
    pub fn codegen(message: impl Into<String>) -> Self {
        let error = CompileError::new(CompileErrorKind::CodeGen, message, 0, 0);
        log::error!("code generation failed: {}", error.message);
        error
    }

    /// Attaches the source line and location label.
    pub fn with_source(mut self, source: &str, location: Option<&str>) -> Self {
        if self.line > 0 {
            self.source_excerpt = source
                .lines()
                .nth(self.line as usize - 1)
                .unwrap_or_default()
                .to_string();
        }
        self.location = location.map(str::to_string);
        self
    }
}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::new(CompileErrorKind::Lex, e.message, e.line, e.column)
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Lex(lex) => lex.into(),
            ParseError::Unexpected {
                expected,
                found,
                line,
                column,
            } => CompileError::new(
                CompileErrorKind::Parse,
                format!("expected {}, found {}", expected, found),
                line,
                column,
            ),
            ParseError::Invalid {
                message,
                line,
                column,
            } => CompileError::new(CompileErrorKind::Parse, message, line, column),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// An uncaught language-level exception.
    #[error("Uncaught {message}")]
    Runtime { value: JsValue, message: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub fn is_runtime(&self) -> bool {
        matches!(self, EngineError::Runtime { .. })
    }

    /// The thrown value of a runtime failure.
    pub fn thrown_value(&self) -> Option<&JsValue> {
        match self {
            EngineError::Runtime { value, .. } => Some(value),
            _ => None,
        }
    }
}
