//! Iteration built-ins: `%IteratorPrototype%`, the array/string iterator
//! `next`, generator objects and the `Array` constructor.
//!
//! Array and string iterators are `Enumerator` objects; as long as their
//! `next` is the one installed here, `for-of` and destructuring step them
//! without going through the protocol.

use crate::runner::ds::enumerator::{iterator_step, new_array_iterator, new_string_iterator};
use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::generator::generator_resume;
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::type_conversion::to_object;
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::symbol::{SYMBOL_ITERATOR, SYMBOL_TO_STRING_TAG};
use crate::runner::ds::value::JsValue;
use crate::runner::jit::activation::ResumeMode;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::BuiltInObject;

use super::argument;

pub fn register(registry: &mut BuiltInRegistry) {
    registry.register_object(
        BuiltInObject::intrinsic("%IteratorPrototype%", WellKnownIntrinsics::IteratorPrototype).add_keyed_method(
            PropertyKey::Sym(SYMBOL_ITERATOR),
            "[Symbol.iterator]",
            0,
            iterator_self,
        ),
    );
    registry.register_object(
        BuiltInObject::intrinsic("%ArrayIteratorPrototype%", WellKnownIntrinsics::ArrayIteratorPrototype)
            .add_method("next", 0, array_iterator_next)
            .add_keyed_property(PropertyKey::Sym(SYMBOL_TO_STRING_TAG), JsValue::from("Array Iterator")),
    );
    registry.register_object(
        BuiltInObject::intrinsic("%GeneratorPrototype%", WellKnownIntrinsics::GeneratorPrototype)
            .add_method("next", 1, generator_next)
            .add_method("return", 1, generator_return)
            .add_method("throw", 1, generator_throw)
            .add_keyed_property(PropertyKey::Sym(SYMBOL_TO_STRING_TAG), JsValue::from("Generator")),
    );
    registry.register_object(
        BuiltInObject::intrinsic("%StringPrototype%", WellKnownIntrinsics::StringPrototype).add_keyed_method(
            PropertyKey::Sym(SYMBOL_ITERATOR),
            "[Symbol.iterator]",
            0,
            string_iterator,
        ),
    );
    registry.register_object(
        BuiltInObject::new("Array")
            .with_prototype(WellKnownIntrinsics::ArrayPrototype)
            .with_constructor(array_constructor, 1)
            .add_static("isArray", 1, array_is_array)
            .add_method("values", 0, array_values)
            .add_keyed_method(PropertyKey::Sym(SYMBOL_ITERATOR), "values", 0, array_values)
            .add_method("push", 1, array_push),
    );
}

fn iterator_self(_realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(this)
}

fn array_iterator_next(realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(match iterator_step(realm, &this)? {
        Some(value) => realm.new_iter_result(value, false),
        None => realm.new_iter_result(JsValue::Undefined, true),
    })
}

fn generator_next(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    generator_resume(realm, &this, ResumeMode::Next, argument(args, 0))
}

fn generator_return(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    generator_resume(realm, &this, ResumeMode::Return, argument(args, 0))
}

fn generator_throw(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    generator_resume(realm, &this, ResumeMode::Throw, argument(args, 0))
}

fn string_iterator(realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    match this {
        JsValue::String(text) => Ok(JsValue::Object(new_string_iterator(realm, text))),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(
            "String.prototype[Symbol.iterator] called on null or undefined".to_string(),
        )),
        other => Ok(JsValue::Object(new_array_iterator(realm, to_object(realm, &other)?))),
    }
}

/// `Array(n)` makes `n` holes; any other argument list becomes the elements.
fn array_constructor(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let array = match args {
        [JsValue::Number(n)] => {
            if *n < 0.0 || n.fract() != 0.0 || *n > u32::MAX as f64 {
                return Err(JErrorType::RangeError("Invalid array length".to_string()));
            }
            let array = realm.new_array(Vec::new());
            array.define_own_property(
                PropertyKey::Str(well_known::LENGTH),
                PropertyDescriptor::new_data(JsValue::Number(*n)),
            );
            array
        }
        _ => realm.new_array(args.to_vec()),
    };
    // Subclasses constructed through `super()` keep their own prototype.
    if let JsValue::Object(receiver) = &this {
        if let Some(prototype) = receiver.get_prototype_of() {
            let base = realm.intrinsic(WellKnownIntrinsics::ArrayPrototype);
            if !prototype.ptr_eq(&base) && !prototype.ptr_eq(&realm.intrinsic(WellKnownIntrinsics::ObjectPrototype)) {
                array.set_prototype_of(Some(prototype));
            }
        }
    }
    Ok(JsValue::Object(array))
}

fn array_is_array(_realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(
        argument(args, 0).as_object().map(|o| o.is_array()).unwrap_or(false),
    ))
}

fn array_values(realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let target = to_object(realm, &this)?;
    Ok(JsValue::Object(new_array_iterator(realm, target)))
}

fn array_push(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = to_object(realm, &this)?;
    let length = match target.array_length() {
        Some(length) => length,
        None => {
            return Err(JErrorType::TypeError(
                "Array.prototype.push called on a non-array".to_string(),
            ))
        }
    };
    if length as u64 + args.len() as u64 > u32::MAX as u64 {
        return Err(JErrorType::TypeError(
            "Pushing elements past the maximum array length".to_string(),
        ));
    }
    for value in args {
        target.push_element(value.clone());
    }
    Ok(JsValue::from(length + args.len() as u32))
}
