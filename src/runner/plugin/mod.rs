//! Built-in registration and engine configuration.
//!
//! The standard library attaches to the object model only through this
//! module: a [`BuiltInRegistry`] is an explicit table mapping global names to
//! native function pointers, built once and installed into each realm.
//!
//! ```
//! use kite::runner::plugin::{BuiltInObject, BuiltInRegistry};
//! use kite::runner::ds::value::JsValue;
//!
//! let mut registry = BuiltInRegistry::with_core();
//! registry.register_object(
//!     BuiltInObject::new("Utils").add_static("double", 1, |_realm, _this, args| {
//!         let n = args.first().and_then(|v| v.as_number()).unwrap_or(0.0);
//!         Ok(JsValue::Number(n * 2.0))
//!     }),
//! );
//! assert!(registry.has_method("Utils", "double"));
//! ```

pub mod config;
pub mod registry;
pub mod types;

pub use config::{ConfigError, EngineConfig, OptLevel};
pub use registry::{BuiltInRegistry, RegistryError};
pub use types::{BuiltInFn, BuiltInMethod, BuiltInObject, NativeFn};
