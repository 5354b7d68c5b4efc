//! Resumable functions: generator objects and async function tasks.
//!
//! Both keep the suspended [`Activation`] of their function; generated code
//! re-enters at the saved resume point with the injected value and mode.

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::object::{JsObjectType, ObjectClass};
use crate::runner::ds::operations::object::get;
use crate::runner::ds::promise::{
    new_promise, perform_then, promise_resolve, reject_promise, resolve_promise, Reaction,
};
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::value::JsValue;
use crate::runner::jit::activation::{Activation, Completion, ResumeMode};

pub enum GeneratorState {
    SuspendedStart(Box<Activation>),
    SuspendedYield(Box<Activation>),
    Running,
    Completed,
}

pub fn new_generator_object(
    realm: &Realm,
    callee: &JsObjectType,
    activation: Box<Activation>,
) -> JsResult<JsObjectType> {
    let prototype = match get(realm, callee, PropertyKey::Str(well_known::PROTOTYPE))? {
        JsValue::Object(p) => p,
        _ => realm.intrinsic(WellKnownIntrinsics::GeneratorPrototype),
    };
    Ok(JsObjectType::new(
        Some(prototype),
        ObjectClass::Generator(Arc::new(Mutex::new(GeneratorState::SuspendedStart(
            activation,
        )))),
    ))
}

/// `next`, `throw` and `return` on a generator object.
pub fn generator_resume(
    realm: &Realm,
    generator: &JsValue,
    mode: ResumeMode,
    value: JsValue,
) -> JsResult<JsValue> {
    let state = generator
        .as_object()
        .and_then(|o| o.generator())
        .ok_or_else(|| {
            JErrorType::TypeError(format!(
                "generator method called on incompatible receiver {}",
                generator.inspect()
            ))
        })?;
    let mut activation = {
        let mut guard = state.lock();
        match mem::replace(&mut *guard, GeneratorState::Running) {
            GeneratorState::Running => {
                return Err(JErrorType::TypeError(
                    "Generator is already running".to_string(),
                ))
            }
            GeneratorState::Completed => {
                *guard = GeneratorState::Completed;
                return match mode {
                    ResumeMode::Next => Ok(realm.new_iter_result(JsValue::Undefined, true)),
                    ResumeMode::Return => Ok(realm.new_iter_result(value, true)),
                    ResumeMode::Throw => Err(JErrorType::Thrown(value)),
                };
            }
            GeneratorState::SuspendedStart(activation) => match mode {
                ResumeMode::Next => activation,
                ResumeMode::Return => {
                    *guard = GeneratorState::Completed;
                    return Ok(realm.new_iter_result(value, true));
                }
                ResumeMode::Throw => {
                    *guard = GeneratorState::Completed;
                    return Err(JErrorType::Thrown(value));
                }
            },
            GeneratorState::SuspendedYield(activation) => activation,
        }
    };
    activation.resume_mode = mode;
    activation.resume_value = value;
    let completion = activation.run();
    let mut guard = state.lock();
    match completion {
        Completion::Yield(value) => {
            *guard = GeneratorState::SuspendedYield(activation);
            Ok(realm.new_iter_result(value, false))
        }
        Completion::Return(value) => {
            *guard = GeneratorState::Completed;
            Ok(realm.new_iter_result(value, true))
        }
        Completion::Throw(e) => {
            *guard = GeneratorState::Completed;
            Err(e)
        }
        Completion::Await(_) => {
            *guard = GeneratorState::Completed;
            Err(JErrorType::SyntaxError(
                "await is only valid in async functions".to_string(),
            ))
        }
    }
}

/// A running async function: its suspended frame and the promise it settles.
pub struct AsyncTask {
    activation: Mutex<Option<Box<Activation>>>,
    promise: JsObjectType,
}

/// Runs an async function up to its first `await` and returns its promise.
pub fn start_async(realm: &Realm, activation: Box<Activation>) -> JsValue {
    let promise = new_promise(realm);
    let task = Arc::new(AsyncTask {
        activation: Mutex::new(Some(activation)),
        promise: promise.clone(),
    });
    async_step(realm, &task, ResumeMode::Next, JsValue::Undefined);
    JsValue::Object(promise)
}

/// Resumes the task with the settled value of the promise it awaited.
pub(crate) fn async_step(realm: &Realm, task: &Arc<AsyncTask>, mode: ResumeMode, value: JsValue) {
    let mut activation = match task.activation.lock().take() {
        Some(activation) => activation,
        None => {
            log::warn!("async task resumed while not suspended");
            return;
        }
    };
    activation.resume_mode = mode;
    activation.resume_value = value;
    match activation.run() {
        Completion::Return(value) => resolve_promise(realm, &task.promise, value),
        Completion::Throw(e) => reject_promise(realm, &task.promise, realm.throw_to_value(e)),
        Completion::Await(value) | Completion::Yield(value) => {
            *task.activation.lock() = Some(activation);
            let awaited = promise_resolve(realm, value);
            perform_then(realm, &awaited, Reaction::Await(task.clone()));
        }
    }
}
