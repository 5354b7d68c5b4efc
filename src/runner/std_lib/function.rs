//! `Function` and `Function.prototype`.

use crate::error::EngineError;
use crate::runner::api::compile_with;
use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::function_object::{make_bound_function, FunctionObject};
use crate::runner::ds::operations::object::{call, get};
use crate::runner::ds::operations::type_conversion::{to_number, to_string};
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::BuiltInObject;

use super::argument;

pub fn register(registry: &mut BuiltInRegistry) {
    let function = BuiltInObject::new("Function")
        .with_prototype(WellKnownIntrinsics::FunctionPrototype)
        .with_constructor(function_constructor, 1)
        .add_method("call", 1, function_call)
        .add_method("apply", 2, function_apply)
        .add_method("bind", 1, function_bind)
        .add_method("toString", 0, function_to_string);
    registry.register_object(function);
}

/// `new Function("a", "b", "return a + b")`: every argument but the last
/// names a parameter, the last is the body.
fn function_constructor(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let (body, params) = match args.split_last() {
        Some((body, params)) => (to_string(realm, body)?, params),
        None => ("".into(), &[][..]),
    };
    let mut names = Vec::new();
    for param in params {
        let text = to_string(realm, param)?;
        names.extend(
            text.split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        );
    }
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let compiled = compile_with(&body, Some("anonymous"), Some(names.as_slice()), None, realm.config())
        .map_err(|e| match e {
            EngineError::Compile(e) => JErrorType::SyntaxError(e.message),
            other => JErrorType::SyntaxError(other.to_string()),
        })?;
    Ok(JsValue::Object(compiled.to_function(realm)))
}

fn this_function(this: &JsValue, method: &str) -> JsResult<()> {
    if this.is_callable() {
        Ok(())
    } else {
        Err(JErrorType::TypeError(format!(
            "Function.prototype.{} called on non-function {}",
            method,
            this.inspect()
        )))
    }
}

fn function_call(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    this_function(&this, "call")?;
    let receiver = argument(args, 0);
    let rest = if args.is_empty() { args } else { &args[1..] };
    call(realm, &this, receiver, rest)
}

/// Elements `0..length` of an array-like.
fn list_from_array_like(realm: &Realm, value: &JsValue) -> JsResult<Vec<JsValue>> {
    let o = match value {
        JsValue::Undefined | JsValue::Null => return Ok(Vec::new()),
        JsValue::Object(o) => o,
        other => {
            return Err(JErrorType::TypeError(format!(
                "CreateListFromArrayLike called on non-object {}",
                other.inspect()
            )))
        }
    };
    let length = match o.array_length() {
        Some(length) => length,
        None => {
            let length = to_number(realm, &get(realm, o, PropertyKey::Str(well_known::LENGTH))?)?;
            if length.is_nan() || length <= 0.0 {
                0
            } else {
                length.min(u32::MAX as f64) as u32
            }
        }
    };
    let mut list = Vec::with_capacity(length as usize);
    for index in 0..length {
        list.push(get(realm, o, PropertyKey::Int(index))?);
    }
    Ok(list)
}

fn function_apply(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    this_function(&this, "apply")?;
    let list = list_from_array_like(realm, &argument(args, 1))?;
    call(realm, &this, argument(args, 0), &list)
}

fn function_bind(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    this_function(&this, "bind")?;
    let target = match &this {
        JsValue::Object(o) => o.clone(),
        _ => return Err(JErrorType::not_a_function(&this)),
    };
    let bound_args: Vec<JsValue> = args.iter().skip(1).cloned().collect();
    let name = match get(realm, &target, PropertyKey::Str(well_known::NAME))? {
        JsValue::String(name) => name.to_string(),
        _ => String::new(),
    };
    let arity = match get(realm, &target, PropertyKey::Str(well_known::LENGTH))? {
        JsValue::Number(n) if n > bound_args.len() as f64 => (n - bound_args.len() as f64) as u32,
        _ => 0,
    };
    let bound = make_bound_function(realm, target, argument(args, 0), bound_args, &name, arity);
    Ok(JsValue::Object(bound))
}

/// Source text for script functions, a `[native code]` stub otherwise.
fn function_to_string(realm: &Realm, this: JsValue, _args: &[JsValue]) -> JsResult<JsValue> {
    let function = match this.as_object().and_then(|o| o.function()) {
        Some(function) => function,
        None => {
            return Err(JErrorType::TypeError(
                "Function.prototype.toString requires that 'this' be a Function".to_string(),
            ))
        }
    };
    let text = match &*function {
        FunctionObject::Script(script) => script.template.source_text().to_string(),
        FunctionObject::Native(native) => format!("function {}() {{ [native code] }}", native.name),
        FunctionObject::Bound(_) => {
            let name = match &this {
                JsValue::Object(o) => get(realm, o, PropertyKey::Str(well_known::NAME))?,
                _ => JsValue::Undefined,
            };
            format!("function {}() {{ [native code] }}", name)
        }
    };
    Ok(JsValue::from(text))
}
