//! Per-invocation state of generated code.
//!
//! Every call allocates one [`Activation`]: the variable and temporary slots,
//! the heap cells of captured variables and the call's `this`/arguments.
//! Generated code receives a pointer to it and reports how it left through
//! a status code; the value or exception travels in the activation.

use std::cell::Cell;
use std::mem;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::function_object::ScriptFunction;
use crate::runner::ds::generator::{new_generator_object, start_async};
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::jit::FunctionTemplate;

/// Heap storage of a captured variable, shared by every closure that sees it.
pub type VarCell = Arc<RwLock<JsValue>>;

pub fn new_cell(value: JsValue) -> VarCell {
    Arc::new(RwLock::new(value))
}

pub const STATUS_RETURN: u32 = 0;
pub const STATUS_THROW: u32 = 1;
pub const STATUS_YIELD: u32 = 2;
pub const STATUS_AWAIT: u32 = 3;

/// How a suspended function is re-entered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResumeMode {
    Next,
    Throw,
    /// Forced return: unwinds through `finally` blocks.
    Return,
}

/// How one run of generated code ended.
#[derive(Debug)]
pub enum Completion {
    Return(JsValue),
    Throw(JErrorType),
    Yield(JsValue),
    Await(JsValue),
}

thread_local! {
    static CALL_DEPTH: Cell<u32> = Cell::new(0);
}

struct CallDepthGuard;

impl CallDepthGuard {
    fn enter(limit: u32) -> JsResult<CallDepthGuard> {
        CALL_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= limit {
                return Err(JErrorType::RangeError(
                    "Maximum call stack size exceeded".to_string(),
                ));
            }
            depth.set(current + 1);
            Ok(CallDepthGuard)
        })
    }
}

impl Drop for CallDepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

pub struct Activation {
    pub(crate) realm: Realm,
    pub(crate) template: Arc<FunctionTemplate>,
    /// The function object being run; `None` for a top-level script.
    pub(crate) callee: Option<JsObjectType>,
    /// Variables first, then temporaries.
    pub(crate) slots: Vec<JsValue>,
    /// Captured environment first, then this function's own captured variables.
    pub(crate) cells: Vec<VarCell>,
    pub(crate) args: Vec<JsValue>,
    pub(crate) this: JsValue,
    pub(crate) new_target: JsValue,
    pub(crate) ret: JsValue,
    pub(crate) exception: Option<JErrorType>,
    pub(crate) resume_point: u32,
    pub(crate) resume_value: JsValue,
    pub(crate) resume_mode: ResumeMode,
}

impl Activation {
    pub(crate) fn new(
        realm: &Realm,
        template: Arc<FunctionTemplate>,
        callee: Option<JsObjectType>,
        env: &[VarCell],
        this: JsValue,
        args: Vec<JsValue>,
        new_target: JsValue,
    ) -> Box<Activation> {
        let mut cells = Vec::with_capacity(env.len() + template.own_cells as usize);
        cells.extend(env.iter().cloned());
        cells.extend((0..template.own_cells).map(|_| new_cell(JsValue::Undefined)));
        Box::new(Activation {
            realm: realm.clone(),
            slots: vec![JsValue::Undefined; template.slot_count as usize],
            template,
            callee,
            cells,
            args,
            this,
            new_target,
            ret: JsValue::Undefined,
            exception: None,
            resume_point: 0,
            resume_value: JsValue::Undefined,
            resume_mode: ResumeMode::Next,
        })
    }

    /// Runs generated code from the current resume point until it returns, throws or suspends.
    pub(crate) fn run(&mut self) -> Completion {
        let _depth = match CallDepthGuard::enter(self.realm.config().max_call_depth) {
            Ok(guard) => guard,
            Err(e) => return Completion::Throw(e),
        };
        let entry = self.template.entry;
        let status = unsafe { entry.invoke(self as *mut Activation) };
        match status {
            STATUS_RETURN => Completion::Return(mem::replace(&mut self.ret, JsValue::Undefined)),
            STATUS_YIELD => Completion::Yield(mem::replace(&mut self.ret, JsValue::Undefined)),
            STATUS_AWAIT => Completion::Await(mem::replace(&mut self.ret, JsValue::Undefined)),
            _ => Completion::Throw(self.exception.take().unwrap_or_else(|| {
                JErrorType::Error("exception status without a pending exception".to_string())
            })),
        }
    }

    /// Rewinds the frame for a self tail call with fresh arguments.
    pub(crate) fn reset_frame(&mut self, args: Vec<JsValue>) {
        for slot in self.slots.iter_mut() {
            *slot = JsValue::Undefined;
        }
        let env_count = self.template.captures.len();
        for cell in self.cells[env_count..].iter_mut() {
            *cell = new_cell(JsValue::Undefined);
        }
        self.args = args;
        self.this = JsValue::Undefined;
    }

    pub(crate) fn take_exception(&mut self) -> JErrorType {
        self.exception
            .take()
            .unwrap_or_else(|| JErrorType::Error("no pending exception".to_string()))
    }
}

/// Invokes a script function. Generators and async functions return their
/// generator object or promise without running to completion here.
pub fn call_script(
    realm: &Realm,
    callee: &JsObjectType,
    function: &ScriptFunction,
    this: JsValue,
    args: &[JsValue],
    new_target: JsValue,
) -> JsResult<JsValue> {
    let template = function.template.clone();
    let kind = template.kind;
    let mut activation = Activation::new(
        realm,
        template,
        Some(callee.clone()),
        &function.env,
        this,
        args.to_vec(),
        new_target,
    );
    if kind.is_generator() {
        return new_generator_object(realm, callee, activation).map(JsValue::Object);
    }
    if kind.is_async() {
        return Ok(start_async(realm, activation));
    }
    finish(activation.run())
}

/// Runs a top-level template: no callee, no captured environment.
pub(crate) fn invoke_template(
    realm: &Realm,
    template: &Arc<FunctionTemplate>,
    this: JsValue,
    args: &[JsValue],
) -> JsResult<JsValue> {
    let mut activation = Activation::new(
        realm,
        template.clone(),
        None,
        &[],
        this,
        args.to_vec(),
        JsValue::Undefined,
    );
    finish(activation.run())
}

fn finish(completion: Completion) -> JsResult<JsValue> {
    match completion {
        Completion::Return(value) => Ok(value),
        Completion::Throw(e) => Err(e),
        Completion::Yield(_) | Completion::Await(_) => Err(JErrorType::SyntaxError(
            "suspension outside of a generator or async function".to_string(),
        )),
    }
}
