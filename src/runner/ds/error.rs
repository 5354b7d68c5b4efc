use std::fmt;

use crate::runner::ds::value::JsValue;

/// A pending exception inside the runtime.
///
/// Native code raises the typed variants; `Thrown` carries whatever value a
/// script threw. A realm turns the typed variants into Error objects when
/// script code observes them.
#[derive(Clone, Debug)]
pub enum JErrorType {
    Error(String),
    ReferenceError(String),
    TypeError(String),
    RangeError(String),
    SyntaxError(String),
    Thrown(JsValue),
}

pub type JsResult<T> = Result<T, JErrorType>;

impl JErrorType {
    pub fn name(&self) -> &'static str {
        match self {
            JErrorType::Error(_) => "Error",
            JErrorType::ReferenceError(_) => "ReferenceError",
            JErrorType::TypeError(_) => "TypeError",
            JErrorType::RangeError(_) => "RangeError",
            JErrorType::SyntaxError(_) => "SyntaxError",
            JErrorType::Thrown(_) => "Thrown",
        }
    }

    pub fn message(&self) -> String {
        match self {
            JErrorType::Error(m)
            | JErrorType::ReferenceError(m)
            | JErrorType::TypeError(m)
            | JErrorType::RangeError(m)
            | JErrorType::SyntaxError(m) => m.to_string(),
            JErrorType::Thrown(v) => v.inspect(),
        }
    }

    pub fn not_a_function(value: &JsValue) -> Self {
        JErrorType::TypeError(format!("{} is not a function", describe(value)))
    }

    pub fn not_a_constructor(value: &JsValue) -> Self {
        JErrorType::TypeError(format!("{} is not a constructor", describe(value)))
    }
}

/// Short textual form of a value for error messages.
pub fn describe(value: &JsValue) -> String {
    match value {
        JsValue::String(s) => format!("\"{}\"", s),
        other => other.inspect(),
    }
}

impl fmt::Display for JErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JErrorType::Thrown(v) => write!(f, "Uncaught {}", v.inspect()),
            other => write!(f, "Uncaught {}: {}", other.name(), other.message()),
        }
    }
}
