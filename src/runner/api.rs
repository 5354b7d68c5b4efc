//! Compile and evaluate entry points.
//!
//! A compilation unit runs the whole pipeline (parse, lower, generate) and
//! either yields a [`CompiledFunction`] or fails as one [`CompileError`];
//! nothing partial is kept or cached.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::error::{CompileError, EngineError};
use crate::parser::parse_program;
use crate::runner::compiler::lower_program;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::make_script_function;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::operations::object::get;
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::jit::activation::invoke_template;
use crate::runner::jit::{generate, FunctionTemplate};
use crate::runner::plugin::config::EngineConfig;

/// An immutable, callable compilation result. Clones share the native code.
#[derive(Clone)]
pub struct CompiledFunction {
    template: Arc<FunctionTemplate>,
    location: Option<Arc<str>>,
    id: Uuid,
}

impl CompiledFunction {
    /// Runs the unit in `realm` with `this` bound to the global object.
    pub fn invoke(&self, realm: &Realm, args: &[JsValue]) -> Result<JsValue, EngineError> {
        let this = JsValue::Object(realm.global_object());
        invoke_template(realm, &self.template, this, args).map_err(|e| runtime_error(realm, e))
    }

    /// A function object of `realm` that runs this unit when called.
    pub fn to_function(&self, realm: &Realm) -> JsObjectType {
        make_script_function(realm, self.template.clone(), Arc::from(Vec::new()))
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    /// Number of named arguments the unit was compiled with.
    pub fn arity(&self) -> u32 {
        self.template.arity
    }

    pub fn source(&self) -> &str {
        &self.template.source
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Unique per compilation; a cache hit returns the cached unit's id.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFunction")
            .field("id", &self.id)
            .field("location", &self.location)
            .field("template", &self.template)
            .finish()
    }
}

/// What a compilation is cached under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub location: Option<String>,
    pub source: String,
    pub arg_names: Option<Vec<String>>,
}

impl CacheKey {
    pub fn new(source: &str, location: Option<&str>, arg_names: Option<&[&str]>) -> Self {
        CacheKey {
            location: location.map(str::to_string),
            source: source.to_string(),
            arg_names: arg_names.map(|names| names.iter().map(|n| n.to_string()).collect()),
        }
    }
}

/// Storage for compiled units, consulted before compiling.
pub trait CodeCache: Send + Sync {
    /// Returns the unit cached under `key`, or runs `create` and caches its
    /// result if it succeeds.
    fn get_or_create(
        &self,
        key: &CacheKey,
        create: &mut dyn FnMut() -> Result<CompiledFunction, CompileError>,
    ) -> Result<CompiledFunction, CompileError>;
}

#[derive(Default)]
pub struct InMemoryCodeCache {
    entries: Mutex<FxHashMap<CacheKey, CompiledFunction>>,
}

impl InMemoryCodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl CodeCache for InMemoryCodeCache {
    fn get_or_create(
        &self,
        key: &CacheKey,
        create: &mut dyn FnMut() -> Result<CompiledFunction, CompileError>,
    ) -> Result<CompiledFunction, CompileError> {
        if let Some(hit) = self.entries.lock().get(key) {
            log::trace!("code cache hit for {:?}", key.location);
            return Ok(hit.clone());
        }
        log::trace!("code cache miss for {:?}", key.location);
        // Compiled outside the lock; the first unit stored wins.
        let compiled = create()?;
        Ok(self.entries.lock().entry(key.clone()).or_insert(compiled).clone())
    }
}

/// Compiles `source` with the default configuration.
///
/// With `arg_names` the unit is a function body whose named arguments are
/// bound from the invocation arguments; otherwise it is a global script.
pub fn compile(
    source: &str,
    location: Option<&str>,
    arg_names: Option<&[&str]>,
    cache: Option<&dyn CodeCache>,
) -> Result<CompiledFunction, EngineError> {
    compile_with(source, location, arg_names, cache, &EngineConfig::default())
}

pub(crate) fn compile_with(
    source: &str,
    location: Option<&str>,
    arg_names: Option<&[&str]>,
    cache: Option<&dyn CodeCache>,
    config: &EngineConfig,
) -> Result<CompiledFunction, EngineError> {
    let mut create = || compile_uncached(source, location, arg_names, config);
    let compiled = match cache {
        Some(cache) => cache.get_or_create(&CacheKey::new(source, location, arg_names), &mut create),
        None => create(),
    };
    Ok(compiled?)
}

fn compile_uncached(
    source: &str,
    location: Option<&str>,
    arg_names: Option<&[&str]>,
    config: &EngineConfig,
) -> Result<CompiledFunction, CompileError> {
    let start = Instant::now();
    let attach = |e: CompileError| e.with_source(source, location);
    let program = parse_program(source).map_err(|e| attach(e.into()))?;
    let ir = lower_program(&program, arg_names).map_err(attach)?;
    let template = generate(&ir, Arc::from(source), config).map_err(attach)?;
    log::debug!(
        "compiled {} ({} bytes) in {:?}",
        location.unwrap_or("<anonymous>"),
        source.len(),
        start.elapsed()
    );
    Ok(CompiledFunction {
        template,
        location: location.map(Arc::from),
        id: Uuid::new_v4(),
    })
}

/// Compiles and runs `source` as a global script in a fresh realm.
pub fn evaluate(source: &str, location: Option<&str>) -> Result<JsValue, EngineError> {
    let realm = Realm::new();
    evaluate_in(&realm, source, location)
}

pub(crate) fn evaluate_in(realm: &Realm, source: &str, location: Option<&str>) -> Result<JsValue, EngineError> {
    let compiled = compile_with(source, location, None, None, realm.config())?;
    let start = Instant::now();
    let value = compiled.invoke(realm, &[])?;
    if realm.config().drain_jobs {
        realm.run_jobs().map_err(|e| runtime_error(realm, e))?;
    }
    log::debug!(
        "evaluated {} in {:?}",
        location.unwrap_or("<anonymous>"),
        start.elapsed()
    );
    Ok(value)
}

/// Wraps an uncaught exception for the embedder.
pub(crate) fn runtime_error(realm: &Realm, error: JErrorType) -> EngineError {
    let value = realm.throw_to_value(error);
    let message = render_error(realm, &value);
    EngineError::Runtime { value, message }
}

/// `name: message` for error objects, the inspected value otherwise.
fn render_error(realm: &Realm, value: &JsValue) -> String {
    let object = match value {
        JsValue::Object(object) => object,
        other => return other.inspect(),
    };
    let field = |key| match get(realm, object, PropertyKey::Str(key)) {
        Ok(JsValue::String(s)) => Some(s),
        _ => None,
    };
    match (field(well_known::NAME), field(well_known::MESSAGE)) {
        (Some(name), Some(message)) if !message.is_empty() => format!("{}: {}", name, message),
        (Some(name), _) => name.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => value.inspect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;

    #[test]
    fn test_compile_error_carries_excerpt() {
        let error = compile("let a = 1;\nlet = ;", Some("bad.js"), None, None).unwrap_err();
        match error {
            EngineError::Compile(e) => {
                assert_eq!(e.kind, CompileErrorKind::Parse);
                assert_eq!(e.line, 2);
                assert_eq!(e.source_excerpt, "let = ;");
                assert_eq!(e.location.as_deref(), Some("bad.js"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cache_reuses_units() {
        let cache = InMemoryCodeCache::new();
        let a = compile("1 + 1", Some("a.js"), None, Some(&cache)).unwrap();
        let b = compile("1 + 1", Some("a.js"), None, Some(&cache)).unwrap();
        let c = compile("1 + 1", Some("b.js"), None, Some(&cache)).unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_compile_is_not_cached() {
        let cache = InMemoryCodeCache::new();
        assert!(compile("(", None, None, Some(&cache)).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_arguments_are_bound_by_name() {
        let realm = Realm::new();
        let sum = compile("return a + b;", None, Some(&["a", "b"]), None).unwrap();
        assert_eq!(sum.arity(), 2);
        let result = sum
            .invoke(&realm, &[JsValue::Number(2.0), JsValue::Number(3.0)])
            .unwrap();
        assert!(matches!(result, JsValue::Number(n) if n == 5.0));
    }

    #[test]
    fn test_uncaught_error_message() {
        let error = evaluate("null.x", None).unwrap_err();
        assert!(error.is_runtime());
        assert!(error.to_string().starts_with("Uncaught TypeError"));
    }
}
