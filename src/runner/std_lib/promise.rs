//! A minimal `Promise`: the constructor, `then`/`catch`/`finally`,
//! `Promise.resolve` and `Promise.reject`.
//!
//! Settlement and reaction jobs live in `ds::promise`; `await` uses the same
//! machinery without going through these functions.

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::function_object::make_native_function;
use crate::runner::ds::object::{ClassTag, JsObjectType};
use crate::runner::ds::operations::object::{call, get};
use crate::runner::ds::promise::{
    create_resolving_functions, new_promise, perform_then, promise_resolve, reject_promise, Reaction,
};
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::symbol::SYMBOL_TO_STRING_TAG;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInFn, BuiltInObject};

use super::argument;

pub fn register(registry: &mut BuiltInRegistry) {
    let promise = BuiltInObject::new("Promise")
        .with_prototype(WellKnownIntrinsics::PromisePrototype)
        .with_constructor(promise_constructor, 1)
        .add_method("then", 2, promise_then)
        .add_method("catch", 1, promise_catch)
        .add_method("finally", 1, promise_finally)
        .add_static("resolve", 1, promise_resolve_static)
        .add_static("reject", 1, promise_reject_static);
    registry.register_object(promise);
    registry.register_object(
        BuiltInObject::intrinsic("%PromisePrototype%", WellKnownIntrinsics::PromisePrototype)
            .add_keyed_property(PropertyKey::Sym(SYMBOL_TO_STRING_TAG), JsValue::from("Promise")),
    );
}

fn promise_constructor(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    // A plain call has no fresh receiver.
    let receiver = match &this {
        JsValue::Object(o) if o.class_tag() == ClassTag::Ordinary => o.clone(),
        _ => {
            return Err(JErrorType::TypeError(
                "Promise constructor cannot be invoked without 'new'".to_string(),
            ))
        }
    };
    let executor = argument(args, 0);
    if !executor.is_callable() {
        return Err(JErrorType::TypeError(format!(
            "Promise resolver {} is not a function",
            executor.inspect()
        )));
    }
    let promise = new_promise(realm);
    if let Some(prototype) = receiver.get_prototype_of() {
        promise.set_prototype_of(Some(prototype));
    }
    let (resolve, reject) = create_resolving_functions(realm, &promise);
    let handlers = [JsValue::Object(resolve), JsValue::Object(reject.clone())];
    if let Err(e) = call(realm, &executor, JsValue::Undefined, &handlers) {
        call(realm, &JsValue::Object(reject), JsValue::Undefined, &[realm.throw_to_value(e)])?;
    }
    Ok(JsValue::Object(promise))
}

fn this_promise(this: &JsValue, method: &str) -> JsResult<JsObjectType> {
    match this {
        JsValue::Object(o) if o.promise().is_some() => Ok(o.clone()),
        other => Err(JErrorType::TypeError(format!(
            "Method Promise.prototype.{} called on incompatible receiver {}",
            method,
            other.inspect()
        ))),
    }
}

fn then(realm: &Realm, promise: &JsObjectType, on_fulfilled: JsValue, on_rejected: JsValue) -> JsValue {
    let derived = new_promise(realm);
    perform_then(
        realm,
        promise,
        Reaction::Then {
            on_fulfilled,
            on_rejected,
            derived: Some(derived.clone()),
        },
    );
    JsValue::Object(derived)
}

fn promise_then(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let promise = this_promise(&this, "then")?;
    Ok(then(realm, &promise, argument(args, 0), argument(args, 1)))
}

fn promise_catch(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let method = get(realm, &this_promise(&this, "catch")?, PropertyKey::Str(well_known::THEN))?;
    call(realm, &method, this, &[JsValue::Undefined, argument(args, 0)])
}

/// Runs `on_finally` either way, then passes the original outcome through.
fn promise_finally(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let promise = this_promise(&this, "finally")?;
    let on_finally = argument(args, 0);
    if !on_finally.is_callable() {
        return Ok(then(realm, &promise, on_finally.clone(), on_finally));
    }
    let callback = on_finally.clone();
    let on_fulfilled = make_native_function(
        realm,
        "",
        1,
        BuiltInFn::closure(move |realm, _this, args| {
            call(realm, &callback, JsValue::Undefined, &[])?;
            Ok(argument(args, 0))
        }),
        false,
    );
    let callback = on_finally;
    let on_rejected = make_native_function(
        realm,
        "",
        1,
        BuiltInFn::closure(move |realm, _this, args| {
            call(realm, &callback, JsValue::Undefined, &[])?;
            Err(JErrorType::Thrown(argument(args, 0)))
        }),
        false,
    );
    Ok(then(
        realm,
        &promise,
        JsValue::Object(on_fulfilled),
        JsValue::Object(on_rejected),
    ))
}

fn promise_resolve_static(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    Ok(JsValue::Object(promise_resolve(realm, argument(args, 0))))
}

fn promise_reject_static(realm: &Realm, _this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    let promise = new_promise(realm);
    reject_promise(realm, &promise, argument(args, 0));
    Ok(JsValue::Object(promise))
}
