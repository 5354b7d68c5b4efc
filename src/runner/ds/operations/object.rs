//! Property access, calls and construction on the object model.

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::function_object::FunctionObject;
use crate::runner::ds::object::{object_create, JsObjectType, OwnWrite};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::symbol::SYMBOL_HAS_INSTANCE;
use crate::runner::ds::value::JsValue;
use crate::runner::jit::activation::call_script;

pub fn get(realm: &Realm, o: &JsObjectType, key: PropertyKey) -> JsResult<JsValue> {
    get_with_receiver(realm, o, key, &JsValue::Object(o.clone()))
}

pub fn get_with_receiver(
    realm: &Realm,
    o: &JsObjectType,
    key: PropertyKey,
    receiver: &JsValue,
) -> JsResult<JsValue> {
    match o.lookup_property(key) {
        None => Ok(JsValue::Undefined),
        Some(PropertyDescriptor::Data { value, .. }) => Ok(value),
        Some(PropertyDescriptor::Accessor { get: None, .. }) => Ok(JsValue::Undefined),
        Some(PropertyDescriptor::Accessor {
            get: Some(getter), ..
        }) => call(realm, &JsValue::Object(getter), receiver.clone(), &[]),
    }
}

/// `value[key]` for any value: primitives read through their prototype.
pub fn get_value(realm: &Realm, v: &JsValue, key: PropertyKey) -> JsResult<JsValue> {
    let prototype = match v {
        JsValue::Object(o) => return get(realm, o, key),
        JsValue::Undefined | JsValue::Null => {
            return Err(JErrorType::TypeError(format!(
                "Cannot read properties of {} (reading '{}')",
                v, key
            )))
        }
        JsValue::String(s) => {
            match key {
                PropertyKey::Str(k) if k == well_known::LENGTH => {
                    return Ok(JsValue::from(s.encode_utf16().count() as u32))
                }
                PropertyKey::Int(i) => {
                    return Ok(match s.chars().nth(i as usize) {
                        Some(c) => JsValue::from(c.to_string()),
                        None => JsValue::Undefined,
                    })
                }
                _ => {}
            }
            WellKnownIntrinsics::StringPrototype
        }
        JsValue::Number(_) => WellKnownIntrinsics::NumberPrototype,
        JsValue::Boolean(_) => WellKnownIntrinsics::BooleanPrototype,
        JsValue::Symbol(_) => WellKnownIntrinsics::SymbolPrototype,
    };
    get_with_receiver(realm, &realm.intrinsic(prototype), key, v)
}

/// Ordinary `[[Set]]` with the object itself as receiver. Returns false when
/// the write was refused (read-only, missing setter, non-extensible).
pub fn set(realm: &Realm, o: &JsObjectType, key: PropertyKey, value: JsValue) -> JsResult<bool> {
    match o.write_own_value(key, &value) {
        OwnWrite::Written => return Ok(true),
        OwnWrite::ReadOnly | OwnWrite::Setter(None) => return Ok(false),
        OwnWrite::Setter(Some(setter)) => {
            call(realm, &JsValue::Object(setter), JsValue::Object(o.clone()), &[value])?;
            return Ok(true);
        }
        OwnWrite::Absent => {}
    }
    if let Some(prototype) = o.get_prototype_of() {
        match prototype.lookup_property(key) {
            Some(PropertyDescriptor::Accessor { set: Some(setter), .. }) => {
                call(realm, &JsValue::Object(setter), JsValue::Object(o.clone()), &[value])?;
                return Ok(true);
            }
            Some(PropertyDescriptor::Accessor { set: None, .. }) => return Ok(false),
            Some(PropertyDescriptor::Data {
                writable: false, ..
            }) => return Ok(false),
            _ => {}
        }
    }
    Ok(o.define_own_property(key, PropertyDescriptor::new_data(value)))
}

/// `target[key] = value` for any value.
pub fn put_value(realm: &Realm, target: &JsValue, key: PropertyKey, value: JsValue) -> JsResult<()> {
    match target {
        JsValue::Object(o) => {
            set(realm, o, key, value)?;
            Ok(())
        }
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot set properties of {} (setting '{}')",
            target, key
        ))),
        _ => Ok(()),
    }
}

pub fn delete_value(target: &JsValue, key: PropertyKey) -> JsResult<bool> {
    match target {
        JsValue::Object(o) => Ok(o.delete(key)),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot convert {} to object",
            target
        ))),
        _ => Ok(true),
    }
}

pub fn create_data_property(o: &JsObjectType, key: PropertyKey, value: JsValue) -> bool {
    o.define_own_property(key, PropertyDescriptor::new_data(value))
}

pub fn get_method(realm: &Realm, v: &JsValue, key: PropertyKey) -> JsResult<Option<JsValue>> {
    let method = get_value(realm, v, key)?;
    if method.is_nullish() {
        return Ok(None);
    }
    if !method.is_callable() {
        return Err(JErrorType::not_a_function(&method));
    }
    Ok(Some(method))
}

pub fn call(realm: &Realm, callee: &JsValue, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let function_object = match callee {
        JsValue::Object(o) => o,
        _ => return Err(JErrorType::not_a_function(callee)),
    };
    let function = match function_object.function() {
        Some(f) => f,
        None => return Err(JErrorType::not_a_function(callee)),
    };
    match &*function {
        FunctionObject::Script(script) => {
            if script.template.kind.is_class_constructor() {
                return Err(JErrorType::TypeError(format!(
                    "Class constructor {} cannot be invoked without 'new'",
                    script.template.name
                )));
            }
            call_script(realm, function_object, script, this, args, JsValue::Undefined)
        }
        FunctionObject::Native(native) => native.body.call(realm, this, args),
        FunctionObject::Bound(bound) => {
            let mut all_args = bound.args.clone();
            all_args.extend_from_slice(args);
            call(
                realm,
                &JsValue::Object(bound.target.clone()),
                bound.this.clone(),
                &all_args,
            )
        }
    }
}

pub fn get_prototype_from_constructor(
    realm: &Realm,
    constructor: &JsValue,
    default: WellKnownIntrinsics,
) -> JsResult<JsObjectType> {
    if let JsValue::Object(c) = constructor {
        if let JsValue::Object(p) = get(realm, c, PropertyKey::Str(well_known::PROTOTYPE))? {
            return Ok(p);
        }
    }
    Ok(realm.intrinsic(default))
}

/// `new callee(...args)`; `new_target` defaults to the callee.
pub fn construct(
    realm: &Realm,
    callee: &JsValue,
    args: &[JsValue],
    new_target: Option<&JsValue>,
) -> JsResult<JsValue> {
    let function_object = match callee {
        JsValue::Object(o) => o,
        _ => return Err(JErrorType::not_a_constructor(callee)),
    };
    let function = match function_object.function() {
        Some(f) if f.is_constructor() => f,
        _ => return Err(JErrorType::not_a_constructor(callee)),
    };
    let new_target = new_target.cloned().unwrap_or_else(|| callee.clone());
    match &*function {
        FunctionObject::Script(script) => {
            if script.template.kind.is_derived_constructor() {
                let result = call_script(
                    realm,
                    function_object,
                    script,
                    JsValue::Undefined,
                    args,
                    new_target,
                )?;
                return match result {
                    JsValue::Object(_) => Ok(result),
                    _ => Err(JErrorType::ReferenceError(
                        "Must call super constructor in derived class before accessing 'this' or returning from derived constructor".to_string(),
                    )),
                };
            }
            let prototype = get_prototype_from_constructor(
                realm,
                &new_target,
                WellKnownIntrinsics::ObjectPrototype,
            )?;
            let this = JsValue::Object(object_create(Some(prototype)));
            let result = call_script(realm, function_object, script, this.clone(), args, new_target)?;
            Ok(if result.is_object() { result } else { this })
        }
        FunctionObject::Native(native) => {
            let prototype = get_prototype_from_constructor(
                realm,
                &new_target,
                WellKnownIntrinsics::ObjectPrototype,
            )?;
            let this = JsValue::Object(object_create(Some(prototype)));
            let result = native.body.call(realm, this.clone(), args)?;
            Ok(if result.is_object() { result } else { this })
        }
        FunctionObject::Bound(bound) => {
            let mut all_args = bound.args.clone();
            all_args.extend_from_slice(args);
            let target = JsValue::Object(bound.target.clone());
            let new_target = if new_target == *callee {
                target.clone()
            } else {
                new_target
            };
            construct(realm, &target, &all_args, Some(&new_target))
        }
    }
}

/// `value instanceof target`.
pub fn instance_of(realm: &Realm, value: &JsValue, target: &JsValue) -> JsResult<bool> {
    let target_object = match target {
        JsValue::Object(o) => o,
        _ => {
            return Err(JErrorType::TypeError(format!(
                "Right-hand side of 'instanceof' is not an object: {}",
                target.inspect()
            )))
        }
    };
    let handler = get(realm, target_object, PropertyKey::Sym(SYMBOL_HAS_INSTANCE))?;
    if !handler.is_nullish() {
        let result = call(realm, &handler, target.clone(), &[value.clone()])?;
        return Ok(crate::runner::ds::operations::type_conversion::to_boolean(&result));
    }
    if !target.is_callable() {
        return Err(JErrorType::TypeError(
            "Right-hand side of 'instanceof' is not callable".to_string(),
        ));
    }
    ordinary_has_instance(realm, target_object, value)
}

pub fn ordinary_has_instance(realm: &Realm, c: &JsObjectType, value: &JsValue) -> JsResult<bool> {
    if let Some(function) = c.function() {
        if let FunctionObject::Bound(bound) = &*function {
            return instance_of(realm, value, &JsValue::Object(bound.target.clone()));
        }
    }
    let o = match value {
        JsValue::Object(o) => o,
        _ => return Ok(false),
    };
    let prototype = match get(realm, c, PropertyKey::Str(well_known::PROTOTYPE))? {
        JsValue::Object(p) => p,
        _ => {
            return Err(JErrorType::TypeError(
                "Function has non-object prototype in instanceof check".to_string(),
            ))
        }
    };
    let mut cursor = o.get_prototype_of();
    while let Some(p) = cursor {
        if p.ptr_eq(&prototype) {
            return Ok(true);
        }
        cursor = p.get_prototype_of();
    }
    Ok(false)
}

/// `key in target`.
pub fn has_property_in(target: &JsValue, key: PropertyKey) -> JsResult<bool> {
    match target {
        JsValue::Object(o) => Ok(o.has_property(key)),
        _ => Err(JErrorType::TypeError(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            key,
            target.inspect()
        ))),
    }
}

/// Copies own enumerable properties of `source` onto `target`, skipping `excluded`.
pub fn copy_data_properties(
    realm: &Realm,
    target: &JsObjectType,
    source: &JsValue,
    excluded: &[PropertyKey],
) -> JsResult<()> {
    let source_object = match source {
        JsValue::Undefined | JsValue::Null => return Ok(()),
        JsValue::Object(o) => o.clone(),
        other => crate::runner::ds::operations::type_conversion::to_object(realm, other)?,
    };
    for key in source_object.own_keys() {
        if excluded.contains(&key) {
            continue;
        }
        match source_object.get_own_property(key) {
            Some(desc) if desc.is_enumerable() => {
                let value = get(realm, &source_object, key)?;
                create_data_property(target, key, value);
            }
            _ => {}
        }
    }
    Ok(())
}
