use thiserror::Error;

/// A malformed token.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message} ({line}:{column})")]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl LexError {
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        LexError {
            message: message.into(),
            line,
            column,
        }
    }
}

/// The first unrecoverable mismatch of a parse. There is no error recovery.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("expected {expected}, found {found} ({line}:{column})")]
    Unexpected {
        expected: String,
        found: String,
        line: u32,
        column: u32,
    },
    #[error("{message} ({line}:{column})")]
    Invalid {
        message: String,
        line: u32,
        column: u32,
    },
}

impl ParseError {
    pub fn line(&self) -> u32 {
        match self {
            ParseError::Lex(e) => e.line,
            ParseError::Unexpected { line, .. } | ParseError::Invalid { line, .. } => *line,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            ParseError::Lex(e) => e.column,
            ParseError::Unexpected { column, .. } | ParseError::Invalid { column, .. } => *column,
        }
    }
}
