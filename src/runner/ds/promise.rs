//! Promise state and reaction jobs.
//!
//! Settling a promise never runs reactions inline: each reaction becomes a
//! job on the realm's queue, drained by [`Realm::run_jobs`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::function_object::make_native_function;
use crate::runner::ds::generator::{async_step, AsyncTask};
use crate::runner::ds::object::{JsObjectType, ObjectClass};
use crate::runner::ds::operations::object::{call, get};
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::value::JsValue;
use crate::runner::jit::activation::ResumeMode;
use crate::runner::plugin::types::BuiltInFn;

#[derive(Clone, Debug)]
pub enum PromiseStatus {
    Pending,
    Fulfilled(JsValue),
    Rejected(JsValue),
}

pub enum Reaction {
    /// From `then`: settles `derived` with the handler's outcome.
    Then {
        on_fulfilled: JsValue,
        on_rejected: JsValue,
        derived: Option<JsObjectType>,
    },
    /// Resumes an async function suspended at `await`.
    Await(Arc<AsyncTask>),
}

pub struct PromiseState {
    pub status: PromiseStatus,
    reactions: Vec<Reaction>,
}

impl PromiseState {
    pub fn new() -> Self {
        PromiseState {
            status: PromiseStatus::Pending,
            reactions: Vec::new(),
        }
    }
}

impl Default for PromiseState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn new_promise(realm: &Realm) -> JsObjectType {
    JsObjectType::new(
        Some(realm.intrinsic(WellKnownIntrinsics::PromisePrototype)),
        ObjectClass::Promise(Arc::new(Mutex::new(PromiseState::new()))),
    )
}

/// Current status of `promise`, or `None` when it is not a promise.
pub fn promise_status(promise: &JsObjectType) -> Option<PromiseStatus> {
    promise.promise().map(|state| state.lock().status.clone())
}

fn settle(realm: &Realm, promise: &JsObjectType, status: PromiseStatus) {
    let state = match promise.promise() {
        Some(state) => state,
        None => return,
    };
    let reactions = {
        let mut guard = state.lock();
        if !matches!(guard.status, PromiseStatus::Pending) {
            return;
        }
        guard.status = status.clone();
        std::mem::take(&mut guard.reactions)
    };
    for reaction in reactions {
        enqueue_reaction(realm, reaction, status.clone());
    }
}

pub fn fulfill_promise(realm: &Realm, promise: &JsObjectType, value: JsValue) {
    settle(realm, promise, PromiseStatus::Fulfilled(value));
}

pub fn reject_promise(realm: &Realm, promise: &JsObjectType, reason: JsValue) {
    settle(realm, promise, PromiseStatus::Rejected(reason));
}

/// Resolves `promise` with `resolution`, adopting the state of thenables.
pub fn resolve_promise(realm: &Realm, promise: &JsObjectType, resolution: JsValue) {
    let thenable = match &resolution {
        JsValue::Object(o) => o.clone(),
        _ => return fulfill_promise(realm, promise, resolution),
    };
    if thenable.ptr_eq(promise) {
        let error = JErrorType::TypeError("Chaining cycle detected for promise".to_string());
        return reject_promise(realm, promise, realm.throw_to_value(error));
    }
    let then = match get(realm, &thenable, PropertyKey::Str(well_known::THEN)) {
        Ok(then) => then,
        Err(e) => return reject_promise(realm, promise, realm.throw_to_value(e)),
    };
    if !then.is_callable() {
        return fulfill_promise(realm, promise, resolution);
    }
    let target = promise.clone();
    realm.enqueue_job(Box::new(move |realm: &Realm| {
        let (resolve, reject) = create_resolving_functions(realm, &target);
        if let Err(e) = call(
            realm,
            &then,
            resolution,
            &[JsValue::Object(resolve), JsValue::Object(reject.clone())],
        ) {
            call(realm, &JsValue::Object(reject), JsValue::Undefined, &[realm.throw_to_value(e)])?;
        }
        Ok(())
    }));
}

/// The `resolve`/`reject` pair handed to an executor; only the first call counts.
pub fn create_resolving_functions(realm: &Realm, promise: &JsObjectType) -> (JsObjectType, JsObjectType) {
    let already_resolved = Arc::new(AtomicBool::new(false));

    let target = promise.clone();
    let flag = already_resolved.clone();
    let resolve = make_native_function(
        realm,
        "",
        1,
        BuiltInFn::closure(move |realm, _this, args| {
            if !flag.swap(true, Ordering::SeqCst) {
                let value = args.first().cloned().unwrap_or(JsValue::Undefined);
                resolve_promise(realm, &target, value);
            }
            Ok(JsValue::Undefined)
        }),
        false,
    );

    let target = promise.clone();
    let flag = already_resolved;
    let reject = make_native_function(
        realm,
        "",
        1,
        BuiltInFn::closure(move |realm, _this, args| {
            if !flag.swap(true, Ordering::SeqCst) {
                let reason = args.first().cloned().unwrap_or(JsValue::Undefined);
                reject_promise(realm, &target, reason);
            }
            Ok(JsValue::Undefined)
        }),
        false,
    );
    (resolve, reject)
}

/// Registers `reaction`, or queues it right away if `promise` is already settled.
pub fn perform_then(realm: &Realm, promise: &JsObjectType, reaction: Reaction) {
    let state = match promise.promise() {
        Some(state) => state,
        None => return,
    };
    let status = {
        let mut guard = state.lock();
        match &guard.status {
            PromiseStatus::Pending => {
                guard.reactions.push(reaction);
                return;
            }
            status => status.clone(),
        }
    };
    enqueue_reaction(realm, reaction, status);
}

/// `PromiseResolve`: promises pass through, anything else is wrapped.
pub fn promise_resolve(realm: &Realm, value: JsValue) -> JsObjectType {
    if let JsValue::Object(o) = &value {
        if o.promise().is_some() {
            return o.clone();
        }
    }
    let promise = new_promise(realm);
    resolve_promise(realm, &promise, value);
    promise
}

fn enqueue_reaction(realm: &Realm, reaction: Reaction, status: PromiseStatus) {
    let (fulfilled, value) = match status {
        PromiseStatus::Fulfilled(v) => (true, v),
        PromiseStatus::Rejected(v) => (false, v),
        PromiseStatus::Pending => return,
    };
    realm.enqueue_job(Box::new(move |realm: &Realm| run_reaction(realm, reaction, fulfilled, value)));
}

fn run_reaction(realm: &Realm, reaction: Reaction, fulfilled: bool, value: JsValue) -> JsResult<()> {
    match reaction {
        Reaction::Await(task) => {
            let mode = if fulfilled {
                ResumeMode::Next
            } else {
                ResumeMode::Throw
            };
            async_step(realm, &task, mode, value);
        }
        Reaction::Then {
            on_fulfilled,
            on_rejected,
            derived,
        } => {
            let handler = if fulfilled { on_fulfilled } else { on_rejected };
            let outcome = if handler.is_callable() {
                call(realm, &handler, JsValue::Undefined, &[value])
            } else if fulfilled {
                Ok(value)
            } else {
                Err(JErrorType::Thrown(value))
            };
            if let Some(derived) = derived {
                match outcome {
                    Ok(v) => resolve_promise(realm, &derived, v),
                    Err(e) => reject_promise(realm, &derived, realm.throw_to_value(e)),
                }
            }
        }
    }
    Ok(())
}
