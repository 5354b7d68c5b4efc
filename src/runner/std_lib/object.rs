//! `Object` and `Object.prototype`.

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::object::{object_create, ClassTag, JsObjectType};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::{copy_data_properties, get, get_value, set};
use crate::runner::ds::operations::type_conversion::{to_boolean, to_object, to_property_key};
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::symbol::SYMBOL_TO_STRING_TAG;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::BuiltInObject;

use super::argument;

pub fn register(registry: &mut BuiltInRegistry) {
    let object = BuiltInObject::new("Object")
        .with_prototype(WellKnownIntrinsics::ObjectPrototype)
        .with_constructor(object_constructor, 1)
        .add_method("hasOwnProperty", 1, object_has_own_property)
        .add_method("isPrototypeOf", 1, object_is_prototype_of)
        .add_method("propertyIsEnumerable", 1, object_property_is_enumerable)
        .add_method("toString", 0, object_to_string)
        .add_method("valueOf", 0, object_value_of)
        .add_static("keys", 1, object_keys)
        .add_static("values", 1, object_values)
        .add_static("entries", 1, object_entries)
        .add_static("assign", 2, object_assign)
        .add_static("create", 2, object_create_static)
        .add_static("getPrototypeOf", 1, object_get_prototype_of)
        .add_static("setPrototypeOf", 2, object_set_prototype_of)
        .add_static("defineProperty", 3, object_define_property)
        .add_static("getOwnPropertyNames", 1, object_get_own_property_names)
        .add_static("freeze", 1, object_freeze)
        .add_static("isFrozen", 1, object_is_frozen);
    registry.register_object(object);
}

fn object_constructor(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    match argument(args, 0) {
        JsValue::Undefined | JsValue::Null => match this {
            // `new Object()` already allocated the receiver.
            JsValue::Object(o) if o.class_tag() == ClassTag::Ordinary && o.own_keys().is_empty() => {
                Ok(JsValue::Object(o))
            }
            _ => Ok(JsValue::Object(realm.new_object())),
        },
        value => Ok(JsValue::Object(to_object(realm, &value)?)),
    }
}

fn object_has_own_property(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let key = to_property_key(realm, &argument(args, 0))?;
    let o = to_object(realm, &this)?;
    Ok(JsValue::Boolean(match &this {
        JsValue::String(s) => match key {
            PropertyKey::Int(i) => (i as usize) < s.chars().count(),
            PropertyKey::Str(k) => k == well_known::LENGTH,
            PropertyKey::Sym(_) => false,
        },
        _ => o.has_own_property(key),
    }))
}

fn object_is_prototype_of(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let value = match argument(args, 0) {
        JsValue::Object(o) => o,
        _ => return Ok(JsValue::Boolean(false)),
    };
    let prototype = to_object(realm, &this)?;
    let mut cursor = value.get_prototype_of();
    while let Some(p) = cursor {
        if p.ptr_eq(&prototype) {
            return Ok(JsValue::Boolean(true));
        }
        cursor = p.get_prototype_of();
    }
    Ok(JsValue::Boolean(false))
}

fn object_property_is_enumerable(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let key = to_property_key(realm, &argument(args, 0))?;
    let o = to_object(realm, &this)?;
    Ok(JsValue::Boolean(
        o.get_own_property(key).map(|d| d.is_enumerable()).unwrap_or(false),
    ))
}

/// `[object Tag]`, honoring `Symbol.toStringTag`.
fn object_to_string(realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let builtin_tag = match &this {
        JsValue::Undefined => return Ok(JsValue::from("[object Undefined]")),
        JsValue::Null => return Ok(JsValue::from("[object Null]")),
        JsValue::Boolean(_) => "Boolean",
        JsValue::Number(_) => "Number",
        JsValue::String(_) => "String",
        JsValue::Symbol(_) => "Symbol",
        JsValue::Object(o) => match o.class_tag() {
            ClassTag::Array => "Array",
            ClassTag::Error => "Error",
            ClassTag::Arguments => "Arguments",
            ClassTag::Function => "Function",
            _ => "Object",
        },
    };
    let tag = match get_value(realm, &this, PropertyKey::Sym(SYMBOL_TO_STRING_TAG))? {
        JsValue::String(tag) => tag.to_string(),
        _ => builtin_tag.to_string(),
    };
    Ok(JsValue::from(format!("[object {}]", tag)))
}

fn object_value_of(realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Object(to_object(realm, &this)?))
}

/// Own enumerable string-keyed properties, in `own_keys` order.
fn enumerable_own(realm: &Realm, value: &JsValue) -> JsResult<(JsObjectType, Vec<PropertyKey>)> {
    let o = to_object(realm, value)?;
    let keys = o
        .own_keys()
        .into_iter()
        .filter(|k| !k.is_symbol())
        .filter(|k| o.get_own_property(*k).map(|d| d.is_enumerable()).unwrap_or(false))
        .collect();
    Ok((o, keys))
}

fn object_keys(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let (_, keys) = enumerable_own(realm, &argument(args, 0))?;
    let names = keys.iter().map(|k| k.to_js_value()).collect();
    Ok(JsValue::Object(realm.new_array(names)))
}

fn object_values(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let (o, keys) = enumerable_own(realm, &argument(args, 0))?;
    let mut values = Vec::with_capacity(keys.len());
    for key in keys {
        values.push(get(realm, &o, key)?);
    }
    Ok(JsValue::Object(realm.new_array(values)))
}

fn object_entries(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let (o, keys) = enumerable_own(realm, &argument(args, 0))?;
    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        let value = get(realm, &o, key)?;
        entries.push(JsValue::Object(realm.new_array(vec![key.to_js_value(), value])));
    }
    Ok(JsValue::Object(realm.new_array(entries)))
}

fn object_assign(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = to_object(realm, &argument(args, 0))?;
    for source in args.iter().skip(1) {
        if source.is_nullish() {
            continue;
        }
        let (source, keys) = enumerable_own(realm, source)?;
        for key in keys {
            let value = get(realm, &source, key)?;
            if !set(realm, &target, key, value)? {
                return Err(JErrorType::TypeError(format!(
                    "Cannot assign to read only property '{}' of object",
                    key
                )));
            }
        }
    }
    Ok(JsValue::Object(target))
}

fn prototype_argument(value: &JsValue) -> JsResult<Option<JsObjectType>> {
    match value {
        JsValue::Object(o) => Ok(Some(o.clone())),
        JsValue::Null => Ok(None),
        other => Err(JErrorType::TypeError(format!(
            "Object prototype may only be an Object or null: {}",
            other.inspect()
        ))),
    }
}

fn object_create_static(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let created = object_create(prototype_argument(&argument(args, 0))?);
    let properties = argument(args, 1);
    if !properties.is_undefined() {
        define_properties(realm, &created, &properties)?;
    }
    Ok(JsValue::Object(created))
}

fn object_get_prototype_of(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = to_object(realm, &argument(args, 0))?;
    Ok(o.get_prototype_of().map(JsValue::Object).unwrap_or(JsValue::Null))
}

fn object_set_prototype_of(_realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = argument(args, 0);
    let prototype = prototype_argument(&argument(args, 1))?;
    if let JsValue::Object(o) = &target {
        if !o.set_prototype_of(prototype) {
            return Err(JErrorType::TypeError(
                "Cyclic __proto__ value or non-extensible object".to_string(),
            ));
        }
    } else if target.is_nullish() {
        return Err(JErrorType::TypeError(
            "Object.setPrototypeOf called on null or undefined".to_string(),
        ));
    }
    Ok(target)
}

/// Reads a descriptor object: absent fields default to false/undefined.
fn to_property_descriptor(realm: &Realm, value: &JsValue) -> JsResult<PropertyDescriptor> {
    let o = match value {
        JsValue::Object(o) => o,
        other => {
            return Err(JErrorType::TypeError(format!(
                "Property description must be an object: {}",
                other.inspect()
            )))
        }
    };
    let flag = |name: &str| -> JsResult<bool> { Ok(to_boolean(&get(realm, o, PropertyKey::from(name))?)) };
    let enumerable = flag("enumerable")?;
    let configurable = flag("configurable")?;
    let accessor_half = |key| -> JsResult<Option<Option<JsObjectType>>> {
        if !o.has_property(PropertyKey::Str(key)) {
            return Ok(None);
        }
        match get(realm, o, PropertyKey::Str(key))? {
            JsValue::Undefined => Ok(Some(None)),
            JsValue::Object(f) if f.is_callable() => Ok(Some(Some(f))),
            other => Err(JErrorType::TypeError(format!(
                "Getter/setter must be a function: {}",
                other.inspect()
            ))),
        }
    };
    let getter = accessor_half(well_known::GET)?;
    let setter = accessor_half(well_known::SET)?;
    if getter.is_some() || setter.is_some() {
        if o.has_property(PropertyKey::Str(well_known::VALUE)) || o.has_property(PropertyKey::from("writable")) {
            return Err(JErrorType::TypeError(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute"
                    .to_string(),
            ));
        }
        return Ok(PropertyDescriptor::Accessor {
            get: getter.flatten(),
            set: setter.flatten(),
            enumerable,
            configurable,
        });
    }
    Ok(PropertyDescriptor::Data {
        value: get(realm, o, PropertyKey::Str(well_known::VALUE))?,
        writable: flag("writable")?,
        enumerable,
        configurable,
    })
}

fn define_properties(realm: &Realm, target: &JsObjectType, properties: &JsValue) -> JsResult<()> {
    let (source, keys) = enumerable_own(realm, properties)?;
    for key in keys {
        let desc = to_property_descriptor(realm, &get(realm, &source, key)?)?;
        if !target.define_own_property(key, desc) {
            return Err(JErrorType::TypeError(format!("Cannot redefine property: {}", key)));
        }
    }
    Ok(())
}

fn object_define_property(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = match argument(args, 0) {
        JsValue::Object(o) => o,
        other => {
            return Err(JErrorType::TypeError(format!(
                "Object.defineProperty called on non-object: {}",
                other.inspect()
            )))
        }
    };
    let key = to_property_key(realm, &argument(args, 1))?;
    let desc = to_property_descriptor(realm, &argument(args, 2))?;
    if !target.define_own_property(key, desc) {
        return Err(JErrorType::TypeError(format!("Cannot redefine property: {}", key)));
    }
    Ok(JsValue::Object(target))
}

fn object_get_own_property_names(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = to_object(realm, &argument(args, 0))?;
    let names = o
        .own_keys()
        .into_iter()
        .filter(|k| !k.is_symbol())
        .map(|k| k.to_js_value())
        .collect();
    Ok(JsValue::Object(realm.new_array(names)))
}

fn object_freeze(_realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let target = argument(args, 0);
    if let JsValue::Object(o) = &target {
        for key in o.own_keys() {
            let frozen = match o.get_own_property(key) {
                Some(PropertyDescriptor::Data { value, enumerable, .. }) => PropertyDescriptor::Data {
                    value,
                    writable: false,
                    enumerable,
                    configurable: false,
                },
                Some(PropertyDescriptor::Accessor { get, set, enumerable, .. }) => PropertyDescriptor::Accessor {
                    get,
                    set,
                    enumerable,
                    configurable: false,
                },
                None => continue,
            };
            o.define_own_property(key, frozen);
        }
        o.prevent_extensions();
    }
    Ok(target)
}

fn object_is_frozen(_realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let o = match argument(args, 0) {
        JsValue::Object(o) => o,
        _ => return Ok(JsValue::Boolean(true)),
    };
    if o.is_extensible() {
        return Ok(JsValue::Boolean(false));
    }
    let frozen = o.own_keys().into_iter().all(|key| match o.get_own_property(key) {
        Some(PropertyDescriptor::Data {
            writable, configurable, ..
        }) => !writable && !configurable,
        Some(desc) => !desc.is_configurable(),
        None => true,
    });
    Ok(JsValue::Boolean(frozen))
}
