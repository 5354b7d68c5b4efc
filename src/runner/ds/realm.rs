//! The realm: global object, intrinsic prototypes and the job queue.
//!
//! A realm is the explicit execution context handed through compilation
//! results and runtime helpers. Cloning a realm is cheap and shares state.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::EngineError;
use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::function_object::make_native_function;
use crate::runner::ds::object::{object_create, JsObjectType, ObjectClass};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::config::EngineConfig;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInFn, NativeFn};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WellKnownIntrinsics {
    ObjectPrototype,
    FunctionPrototype,
    ArrayPrototype,
    ErrorPrototype,
    TypeErrorPrototype,
    ReferenceErrorPrototype,
    RangeErrorPrototype,
    SyntaxErrorPrototype,
    IteratorPrototype,
    ArrayIteratorPrototype,
    GeneratorPrototype,
    PromisePrototype,
    StringPrototype,
    NumberPrototype,
    BooleanPrototype,
    SymbolPrototype,
}

impl WellKnownIntrinsics {
    const COUNT: usize = 16;

    fn parent(&self) -> Option<WellKnownIntrinsics> {
        match self {
            WellKnownIntrinsics::ObjectPrototype => None,
            WellKnownIntrinsics::TypeErrorPrototype
            | WellKnownIntrinsics::ReferenceErrorPrototype
            | WellKnownIntrinsics::RangeErrorPrototype
            | WellKnownIntrinsics::SyntaxErrorPrototype => Some(WellKnownIntrinsics::ErrorPrototype),
            WellKnownIntrinsics::ArrayIteratorPrototype | WellKnownIntrinsics::GeneratorPrototype => {
                Some(WellKnownIntrinsics::IteratorPrototype)
            }
            _ => Some(WellKnownIntrinsics::ObjectPrototype),
        }
    }

    /// In dependency order: every parent precedes its children.
    const ALL: [WellKnownIntrinsics; WellKnownIntrinsics::COUNT] = [
        WellKnownIntrinsics::ObjectPrototype,
        WellKnownIntrinsics::FunctionPrototype,
        WellKnownIntrinsics::ArrayPrototype,
        WellKnownIntrinsics::ErrorPrototype,
        WellKnownIntrinsics::TypeErrorPrototype,
        WellKnownIntrinsics::ReferenceErrorPrototype,
        WellKnownIntrinsics::RangeErrorPrototype,
        WellKnownIntrinsics::SyntaxErrorPrototype,
        WellKnownIntrinsics::IteratorPrototype,
        WellKnownIntrinsics::ArrayIteratorPrototype,
        WellKnownIntrinsics::GeneratorPrototype,
        WellKnownIntrinsics::PromisePrototype,
        WellKnownIntrinsics::StringPrototype,
        WellKnownIntrinsics::NumberPrototype,
        WellKnownIntrinsics::BooleanPrototype,
        WellKnownIntrinsics::SymbolPrototype,
    ];

    fn error_prototype_for(error: &JErrorType) -> WellKnownIntrinsics {
        match error {
            JErrorType::TypeError(_) => WellKnownIntrinsics::TypeErrorPrototype,
            JErrorType::ReferenceError(_) => WellKnownIntrinsics::ReferenceErrorPrototype,
            JErrorType::RangeError(_) => WellKnownIntrinsics::RangeErrorPrototype,
            JErrorType::SyntaxError(_) => WellKnownIntrinsics::SyntaxErrorPrototype,
            _ => WellKnownIntrinsics::ErrorPrototype,
        }
    }
}

pub type Job = Box<dyn FnOnce(&Realm) -> JsResult<()> + Send>;

struct RealmRecord {
    global: JsObjectType,
    intrinsics: Vec<JsObjectType>,
    jobs: Mutex<VecDeque<Job>>,
    config: EngineConfig,
}

#[derive(Clone)]
pub struct Realm {
    inner: Arc<RealmRecord>,
}

impl Realm {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_registry(config, &BuiltInRegistry::with_core())
    }

    /// A realm whose globals come from `registry`.
    pub fn with_registry(config: EngineConfig, registry: &BuiltInRegistry) -> Self {
        let mut intrinsics: Vec<JsObjectType> = Vec::with_capacity(WellKnownIntrinsics::COUNT);
        for which in WellKnownIntrinsics::ALL.iter() {
            let parent = which.parent().map(|p| intrinsics[p as usize].clone());
            let class = match which {
                WellKnownIntrinsics::ArrayPrototype => ObjectClass::Array,
                _ => ObjectClass::Ordinary,
            };
            intrinsics.push(JsObjectType::new(parent, class));
        }
        let global = object_create(Some(intrinsics[WellKnownIntrinsics::ObjectPrototype as usize].clone()));
        let realm = Realm {
            inner: Arc::new(RealmRecord {
                global,
                intrinsics,
                jobs: Mutex::new(VecDeque::new()),
                config,
            }),
        };
        registry.install(&realm);
        realm
    }

    pub fn global_object(&self) -> JsObjectType {
        self.inner.global.clone()
    }

    pub fn intrinsic(&self, which: WellKnownIntrinsics) -> JsObjectType {
        self.inner.intrinsics[which as usize].clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn ptr_eq(&self, other: &Realm) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identity of this realm while it is alive.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    pub fn new_object(&self) -> JsObjectType {
        object_create(Some(self.intrinsic(WellKnownIntrinsics::ObjectPrototype)))
    }

    pub fn new_array(&self, values: Vec<JsValue>) -> JsObjectType {
        let array = JsObjectType::new(
            Some(self.intrinsic(WellKnownIntrinsics::ArrayPrototype)),
            ObjectClass::Array,
        );
        for value in values {
            array.push_element(value);
        }
        array
    }

    /// `{ value, done }`.
    pub fn new_iter_result(&self, value: JsValue, done: bool) -> JsValue {
        let result = self.new_object();
        result.define_own_property(
            PropertyKey::Str(well_known::VALUE),
            PropertyDescriptor::new_data(value),
        );
        result.define_own_property(
            PropertyKey::Str(well_known::DONE),
            PropertyDescriptor::new_data(JsValue::Boolean(done)),
        );
        JsValue::Object(result)
    }

    pub fn new_error_object(&self, prototype: JsObjectType, message: Option<&str>) -> JsObjectType {
        let error = JsObjectType::new(Some(prototype), ObjectClass::Error);
        if let Some(message) = message {
            error.define_own_property(
                PropertyKey::Str(well_known::MESSAGE),
                PropertyDescriptor::new_hidden(JsValue::from(message)),
            );
        }
        error
    }

    /// The language-level value of a pending exception.
    pub fn throw_to_value(&self, error: JErrorType) -> JsValue {
        match error {
            JErrorType::Thrown(value) => value,
            other => {
                let prototype = self.intrinsic(WellKnownIntrinsics::error_prototype_for(&other));
                JsValue::Object(self.new_error_object(prototype, Some(&other.message())))
            }
        }
    }

    /// Attaches a native function to `target` under `key`; the sole extension point for library code.
    pub fn register_native(
        &self,
        target: &JsObjectType,
        key: PropertyKey,
        name: &str,
        arity: u32,
        func: NativeFn,
    ) -> JsObjectType {
        self.register_builtin(target, key, name, arity, BuiltInFn::Native(func), false)
    }

    pub fn register_builtin(
        &self,
        target: &JsObjectType,
        key: PropertyKey,
        name: &str,
        arity: u32,
        func: BuiltInFn,
        constructor: bool,
    ) -> JsObjectType {
        let function = make_native_function(self, name, arity, func, constructor);
        target.define_own_property(key, PropertyDescriptor::new_hidden(JsValue::Object(function.clone())));
        function
    }

    pub fn enqueue_job(&self, job: Job) {
        self.inner.jobs.lock().push_back(job);
    }

    pub fn pending_jobs(&self) -> usize {
        self.inner.jobs.lock().len()
    }

    /// Runs queued jobs, including ones queued while draining, until the queue is empty.
    pub fn run_jobs(&self) -> JsResult<()> {
        loop {
            let job = self.inner.jobs.lock().pop_front();
            match job {
                Some(job) => {
                    if let Err(e) = job(self) {
                        log::warn!("job failed, {} left in queue: {}", self.pending_jobs(), e);
                        return Err(e);
                    }
                }
                None => return Ok(()),
            }
        }
    }

    /// Compiles `source` and runs it against this realm's global object.
    pub fn evaluate(&self, source: &str, location: Option<&str>) -> Result<JsValue, EngineError> {
        crate::runner::api::evaluate_in(self, source, location)
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}
