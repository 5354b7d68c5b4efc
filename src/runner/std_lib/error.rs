//! The Error family: `Error`, `TypeError`, `ReferenceError`, `RangeError`
//! and `SyntaxError`.
//!
//! Each constructor's prototype is a realm intrinsic, so errors raised by
//! the runtime itself and errors built by script code share one chain.

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::object::{ClassTag, JsObjectType};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::get;
use crate::runner::ds::operations::type_conversion::to_string;
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, NativeFn};

use super::argument;

pub fn register(registry: &mut BuiltInRegistry) {
    let kinds: [(&str, WellKnownIntrinsics, NativeFn); 5] = [
        ("Error", WellKnownIntrinsics::ErrorPrototype, error_constructor),
        ("TypeError", WellKnownIntrinsics::TypeErrorPrototype, type_error_constructor),
        ("ReferenceError", WellKnownIntrinsics::ReferenceErrorPrototype, reference_error_constructor),
        ("RangeError", WellKnownIntrinsics::RangeErrorPrototype, range_error_constructor),
        ("SyntaxError", WellKnownIntrinsics::SyntaxErrorPrototype, syntax_error_constructor),
    ];
    for (name, prototype, constructor) in kinds.iter() {
        let mut object = BuiltInObject::new(*name)
            .with_prototype(*prototype)
            .with_constructor(*constructor, 1)
            .add_prototype_property("name", JsValue::from(*name))
            .add_prototype_property("message", JsValue::from(""));
        // Subclass prototypes inherit toString from Error.prototype.
        if *prototype == WellKnownIntrinsics::ErrorPrototype {
            object = object.add_method("toString", 0, error_to_string);
        }
        registry.register_object(object);
    }
}

fn inherits_from(o: &JsObjectType, prototype: &JsObjectType) -> bool {
    let mut cursor = o.get_prototype_of();
    while let Some(p) = cursor {
        if p.ptr_eq(prototype) {
            return true;
        }
        cursor = p.get_prototype_of();
    }
    false
}

/// Builds the error object. Under `new` (including a subclass's `super()`)
/// the receiver carries the prototype to use; a plain call falls back to
/// the intrinsic.
fn construct_error(realm: &Realm, this: &JsValue, args: &[JsValue], which: WellKnownIntrinsics) -> JsResult<JsValue> {
    let intrinsic = realm.intrinsic(which);
    let prototype = match this {
        JsValue::Object(o) if o.class_tag() == ClassTag::Ordinary && inherits_from(o, &intrinsic) => {
            o.get_prototype_of().unwrap_or(intrinsic)
        }
        _ => intrinsic,
    };
    let message = match argument(args, 0) {
        JsValue::Undefined => None,
        value => Some(to_string(realm, &value)?),
    };
    let error = realm.new_error_object(prototype, message.as_deref());
    if let JsValue::Object(options) = argument(args, 1) {
        if options.has_property(PropertyKey::Str(well_known::CAUSE)) {
            let cause = get(realm, &options, PropertyKey::Str(well_known::CAUSE))?;
            error.define_own_property(PropertyKey::Str(well_known::CAUSE), PropertyDescriptor::new_hidden(cause));
        }
    }
    Ok(JsValue::Object(error))
}

fn error_constructor(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    construct_error(realm, &this, args, WellKnownIntrinsics::ErrorPrototype)
}

fn type_error_constructor(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    construct_error(realm, &this, args, WellKnownIntrinsics::TypeErrorPrototype)
}

fn reference_error_constructor(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    construct_error(realm, &this, args, WellKnownIntrinsics::ReferenceErrorPrototype)
}

fn range_error_constructor(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    construct_error(realm, &this, args, WellKnownIntrinsics::RangeErrorPrototype)
}

fn syntax_error_constructor(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    construct_error(realm, &this, args, WellKnownIntrinsics::SyntaxErrorPrototype)
}

/// `name: message`, dropping whichever part is empty.
fn error_to_string(realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let o = match &this {
        JsValue::Object(o) => o,
        other => {
            return Err(JErrorType::TypeError(format!(
                "Error.prototype.toString called on non-object {}",
                other.inspect()
            )))
        }
    };
    let name = match get(realm, o, PropertyKey::Str(well_known::NAME))? {
        JsValue::Undefined => "Error".into(),
        value => to_string(realm, &value)?,
    };
    let message = match get(realm, o, PropertyKey::Str(well_known::MESSAGE))? {
        JsValue::Undefined => "".into(),
        value => to_string(realm, &value)?,
    };
    let text = match (name.is_empty(), message.is_empty()) {
        (_, true) => name.to_string(),
        (true, false) => message.to_string(),
        (false, false) => format!("{}: {}", name, message),
    };
    Ok(JsValue::from(text))
}
