//! Source text to syntax tree.
//!
//! The [`lexer`] produces tokens on demand from any position; [`JsParser`]
//! consumes them by recursive descent and allocates nodes into an [`ast::Ast`]
//! arena.

mod api;
pub mod ast;
pub mod error;
mod expressions;
pub mod lexer;
mod statements;
pub mod token;
#[cfg(test)]
mod unit_tests;

pub use api::{parse_program, JsParser};
