//! `Symbol`: the well-known symbols and the process-wide `Symbol.for` registry.

use lazy_static::lazy_static;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::operations::type_conversion::to_string;
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::symbol::{
    SymbolData, SYMBOL_ASYNC_ITERATOR, SYMBOL_HAS_INSTANCE, SYMBOL_ITERATOR, SYMBOL_TO_PRIMITIVE,
    SYMBOL_TO_STRING_TAG,
};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::BuiltInObject;

use super::argument;

lazy_static! {
    /// `Symbol.for` keys; shared by every realm like the key table itself.
    static ref SYMBOL_REGISTRY: Mutex<FxHashMap<String, SymbolData>> = Mutex::new(FxHashMap::default());
}

pub fn register(registry: &mut BuiltInRegistry) {
    let symbol = BuiltInObject::new("Symbol")
        .with_prototype(WellKnownIntrinsics::SymbolPrototype)
        .with_constructor(symbol_function, 0)
        .add_property("iterator", JsValue::Symbol(SYMBOL_ITERATOR))
        .add_property("asyncIterator", JsValue::Symbol(SYMBOL_ASYNC_ITERATOR))
        .add_property("hasInstance", JsValue::Symbol(SYMBOL_HAS_INSTANCE))
        .add_property("toPrimitive", JsValue::Symbol(SYMBOL_TO_PRIMITIVE))
        .add_property("toStringTag", JsValue::Symbol(SYMBOL_TO_STRING_TAG))
        .add_static("for", 1, symbol_for)
        .add_static("keyFor", 1, symbol_key_for)
        .add_method("toString", 0, symbol_to_string)
        .add_method("valueOf", 0, symbol_value_of);
    registry.register_object(symbol);
}

fn symbol_function(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    // Only `new Symbol()` hands in a fresh receiver.
    if this.is_object() {
        return Err(JErrorType::TypeError("Symbol is not a constructor".to_string()));
    }
    Ok(JsValue::Symbol(match argument(args, 0) {
        JsValue::Undefined => SymbolData::new_empty(),
        description => SymbolData::new(to_string(realm, &description)?.to_string()),
    }))
}

fn symbol_for(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let key = to_string(realm, &argument(args, 0))?.to_string();
    let mut symbols = SYMBOL_REGISTRY.lock();
    let symbol = *symbols
        .entry(key)
        .or_insert_with_key(|key| SymbolData::new(key.clone()));
    Ok(JsValue::Symbol(symbol))
}

fn symbol_key_for(_realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let symbol = match argument(args, 0) {
        JsValue::Symbol(symbol) => symbol,
        other => return Err(JErrorType::TypeError(format!("{} is not a symbol", other.inspect()))),
    };
    let symbols = SYMBOL_REGISTRY.lock();
    Ok(symbols
        .iter()
        .find(|(_, s)| **s == symbol)
        .map(|(key, _)| JsValue::from(key.as_str()))
        .unwrap_or(JsValue::Undefined))
}

fn this_symbol(this: &JsValue) -> JsResult<SymbolData> {
    match this {
        JsValue::Symbol(symbol) => Ok(*symbol),
        other => Err(JErrorType::TypeError(format!(
            "Symbol.prototype method called on incompatible receiver {}",
            other.inspect()
        ))),
    }
}

fn symbol_to_string(_realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::from(this_symbol(&this)?.to_string()))
}

fn symbol_value_of(_realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Symbol(this_symbol(&this)?))
}
