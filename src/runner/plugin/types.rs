//! Core types for built-in registration.

use std::fmt;
use std::sync::Arc;

use crate::runner::ds::error::JsResult;
use crate::runner::ds::property_key::PropertyKey;
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::value::JsValue;

/// Function signature for built-in methods.
/// Native functions receive the realm, the `this` value and the arguments.
pub type NativeFn = fn(realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue>;

pub type PluginFn = Arc<dyn Fn(&Realm, JsValue, &[JsValue]) -> JsResult<JsValue> + Send + Sync>;

/// Built-in function - either compiled-in or a closure supplied at runtime.
#[derive(Clone)]
pub enum BuiltInFn {
    /// Direct function pointer - zero overhead for compiled-in functions.
    Native(NativeFn),

    /// Closure with captured state, e.g. promise resolving functions.
    Plugin(PluginFn),
}

impl BuiltInFn {
    /// Execute this built-in function.
    pub fn call(&self, realm: &Realm, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        match self {
            BuiltInFn::Native(f) => f(realm, this, args),
            BuiltInFn::Plugin(f) => f(realm, this, args),
        }
    }

    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&Realm, JsValue, &[JsValue]) -> JsResult<JsValue> + Send + Sync + 'static,
    {
        BuiltInFn::Plugin(Arc::new(f))
    }
}

impl fmt::Debug for BuiltInFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuiltInFn::Native(_) => write!(f, "BuiltInFn::Native"),
            BuiltInFn::Plugin(_) => write!(f, "BuiltInFn::Plugin"),
        }
    }
}

/// One function-valued property of a built-in.
#[derive(Clone, Debug)]
pub struct BuiltInMethod {
    pub key: PropertyKey,
    /// Value of the function's `name` property.
    pub name: String,
    pub arity: u32,
    pub func: BuiltInFn,
}

/// Built-in object definition.
/// Represents a global like `Object`, `Promise` or `Math`, or the methods
/// of an intrinsic prototype that has no global name of its own.
pub struct BuiltInObject {
    /// Name of the global binding (e.g., "Array", "Object", "Math").
    pub name: String,

    /// Intrinsic that backs `name.prototype`; prototype methods land here.
    pub prototype: Option<WellKnownIntrinsics>,

    /// Whether a global binding is created for `name`.
    pub exposed: bool,

    /// Constructor function and its arity, if this object is constructable.
    pub constructor: Option<(BuiltInFn, u32)>,

    /// Methods defined on the constructor (or the namespace object).
    pub statics: Vec<BuiltInMethod>,

    /// Methods defined on the prototype.
    pub methods: Vec<BuiltInMethod>,

    /// Static data properties.
    pub properties: Vec<(PropertyKey, JsValue)>,

    /// Data properties of the prototype, such as `Error.prototype.name`.
    pub prototype_properties: Vec<(PropertyKey, JsValue)>,
}

impl BuiltInObject {
    /// Create a new global built-in object with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        BuiltInObject {
            name: name.into(),
            prototype: None,
            exposed: true,
            constructor: None,
            statics: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            prototype_properties: Vec::new(),
        }
    }

    /// Methods for an intrinsic prototype that is not reachable through a global name.
    pub fn intrinsic(name: impl Into<String>, prototype: WellKnownIntrinsics) -> Self {
        BuiltInObject {
            exposed: false,
            ..BuiltInObject::new(name).with_prototype(prototype)
        }
    }

    pub fn with_prototype(mut self, prototype: WellKnownIntrinsics) -> Self {
        self.prototype = Some(prototype);
        self
    }

    /// Add a native prototype method.
    pub fn add_method(mut self, name: &str, arity: u32, func: NativeFn) -> Self {
        self.methods.push(BuiltInMethod {
            key: PropertyKey::from(name),
            name: name.to_string(),
            arity,
            func: BuiltInFn::Native(func),
        });
        self
    }

    /// Add a prototype method under a non-string key such as a well-known symbol.
    pub fn add_keyed_method(mut self, key: PropertyKey, name: &str, arity: u32, func: NativeFn) -> Self {
        self.methods.push(BuiltInMethod {
            key,
            name: name.to_string(),
            arity,
            func: BuiltInFn::Native(func),
        });
        self
    }

    /// Add a native static method.
    pub fn add_static(mut self, name: &str, arity: u32, func: NativeFn) -> Self {
        self.statics.push(BuiltInMethod {
            key: PropertyKey::from(name),
            name: name.to_string(),
            arity,
            func: BuiltInFn::Native(func),
        });
        self
    }

    /// Add a property.
    pub fn add_property(mut self, name: &str, value: JsValue) -> Self {
        self.properties.push((PropertyKey::from(name), value));
        self
    }

    pub fn add_keyed_property(mut self, key: PropertyKey, value: JsValue) -> Self {
        self.properties.push((key, value));
        self
    }

    pub fn add_prototype_property(mut self, name: &str, value: JsValue) -> Self {
        self.prototype_properties.push((PropertyKey::from(name), value));
        self
    }

    /// Set the constructor function.
    pub fn with_constructor(mut self, constructor: NativeFn, arity: u32) -> Self {
        self.constructor = Some((BuiltInFn::Native(constructor), arity));
        self
    }

    pub fn find_method(&self, name: &str) -> Option<&BuiltInMethod> {
        self.methods
            .iter()
            .chain(self.statics.iter())
            .find(|m| m.name == name)
    }
}
