//! `RegExp` as a plain record of `source` and `flags`.
//!
//! Regex literals lower to `new RegExp(pattern, flags)`. Matching belongs to
//! the wider library; this only keeps literals constructible and printable.

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::get;
use crate::runner::ds::operations::type_conversion::to_string;
use crate::runner::ds::property_key::PropertyKey;
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::BuiltInObject;

use super::argument;

const FLAGS: &str = "dgimsuy";

pub fn register(registry: &mut BuiltInRegistry) {
    let regexp = BuiltInObject::new("RegExp")
        .with_constructor(regexp_constructor, 2)
        .add_method("toString", 0, regexp_to_string);
    registry.register_object(regexp);
}

fn regexp_constructor(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let source = match argument(args, 0) {
        JsValue::Undefined => "(?:)".into(),
        value => to_string(realm, &value)?,
    };
    let flags = match argument(args, 1) {
        JsValue::Undefined => "".into(),
        value => to_string(realm, &value)?,
    };
    for (i, flag) in flags.char_indices() {
        if !FLAGS.contains(flag) || flags[..i].contains(flag) {
            return Err(JErrorType::SyntaxError(format!(
                "Invalid regular expression flags '{}'",
                flags
            )));
        }
    }
    let target = match this {
        JsValue::Object(o) => o,
        _ => realm.new_object(),
    };
    target.define_own_property(PropertyKey::from("source"), PropertyDescriptor::new_hidden(JsValue::String(source)));
    target.define_own_property(PropertyKey::from("flags"), PropertyDescriptor::new_hidden(JsValue::String(flags)));
    target.define_own_property(
        PropertyKey::from("lastIndex"),
        PropertyDescriptor::Data {
            value: JsValue::Number(0.0),
            writable: true,
            enumerable: false,
            configurable: false,
        },
    );
    Ok(JsValue::Object(target))
}

fn regexp_to_string(realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let o = match &this {
        JsValue::Object(o) => o,
        other => {
            return Err(JErrorType::TypeError(format!(
                "RegExp.prototype.toString called on incompatible receiver {}",
                other.inspect()
            )))
        }
    };
    let source = to_string(realm, &get(realm, o, PropertyKey::from("source"))?)?;
    let flags = to_string(realm, &get(realm, o, PropertyKey::from("flags"))?)?;
    Ok(JsValue::from(format!("/{}/{}", source, flags)))
}
