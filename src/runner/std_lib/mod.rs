//! Built-in objects the core itself relies on.
//!
//! Everything here attaches through [`BuiltInRegistry`](crate::runner::plugin::BuiltInRegistry):
//! `Object`, `Function`, `Symbol`, the Error family, the iterator and
//! generator prototypes, a minimal `Promise` and a `RegExp` placeholder.
//! The wider library (string, number, collection methods) is not part of
//! the engine.

pub mod core;
pub mod error;
pub mod function;
pub mod iterator;
pub mod object;
pub mod promise;
pub mod regexp;
pub mod symbol;

pub use self::core::register_core_builtins;

use crate::runner::ds::value::JsValue;

/// The argument at `index`, `undefined` when absent.
pub(crate) fn argument(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}
