//! # kite - a native-code JavaScript engine
//!
//! Source text goes through a hand-written lexer and recursive-descent
//! parser into an arena AST, is lowered to a typed expression IR with every
//! identifier resolved, and is compiled by Cranelift straight to machine
//! code. There is no bytecode and no interpreter.
//!
//! ## Quick Start
//!
//! ```
//! use kite::runner::ds::value::JsValue;
//!
//! let value = kite::evaluate("let a = 1; { let a = 2; } a + 1", None).unwrap();
//! assert!(matches!(value, JsValue::Number(n) if n == 2.0));
//! ```
//!
//! ### Compiling once, running many times
//!
//! ```
//! use kite::{compile, InMemoryCodeCache};
//! use kite::runner::ds::realm::Realm;
//! use kite::runner::ds::value::JsValue;
//!
//! let cache = InMemoryCodeCache::new();
//! let area = compile("return w * h;", Some("area.js"), Some(&["w", "h"]), Some(&cache)).unwrap();
//!
//! let realm = Realm::new();
//! let result = area.invoke(&realm, &[JsValue::Number(3.0), JsValue::Number(4.0)]).unwrap();
//! assert!(matches!(result, JsValue::Number(n) if n == 12.0));
//! ```
//!
//! ### Native functions
//!
//! Host code attaches functions to any object of a realm; this is also how
//! the built-in library plugs in (see [`runner::plugin`]).
//!
//! ```
//! use kite::runner::ds::property_key::PropertyKey;
//! use kite::runner::ds::realm::Realm;
//! use kite::runner::ds::value::JsValue;
//!
//! let realm = Realm::new();
//! realm.register_native(&realm.global_object(), PropertyKey::from("twice"), "twice", 1, |_realm, _this, args| {
//!     Ok(JsValue::Number(args.first().and_then(|v| v.as_number()).unwrap_or(0.0) * 2.0))
//! });
//! let value = realm.evaluate("twice(21)", None).unwrap();
//! assert!(matches!(value, JsValue::Number(n) if n == 42.0));
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - lexer, arena AST and parser
//! - **[`runner`]** - everything after parsing
//!   - **[`runner::compiler`]** - scope binder and AST to IR lowering
//!   - **[`runner::jit`]** - Cranelift code generation and runtime helpers
//!   - **[`runner::ds`]** - values, objects, realms, generators and promises
//!   - **[`runner::plugin`]** - built-in registration and configuration
//! - **[`error`]** - errors surfaced to embedders

pub mod error;
pub mod parser;
pub mod runner;

pub use error::{CompileError, CompileErrorKind, EngineError};
pub use runner::api::{compile, evaluate, CacheKey, CodeCache, CompiledFunction, InMemoryCodeCache};
pub use runner::ds::realm::Realm;
pub use runner::ds::value::JsValue;
pub use runner::plugin::config::EngineConfig;
