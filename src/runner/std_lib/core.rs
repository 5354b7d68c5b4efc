//! Core built-ins registration.

use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;

use super::error;
use super::function;
use super::iterator;
use super::object;
use super::promise;
use super::regexp;
use super::symbol;

/// Register all core built-in objects with the registry.
pub fn register_core_builtins(registry: &mut BuiltInRegistry) {
    registry.register_value("NaN", JsValue::Number(f64::NAN));
    registry.register_value("Infinity", JsValue::Number(f64::INFINITY));

    object::register(registry);
    function::register(registry);
    symbol::register(registry);
    error::register(registry);
    iterator::register(registry);
    promise::register(registry);
    regexp::register(registry);
}
