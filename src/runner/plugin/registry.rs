//! Built-in registry: the explicit table of globals installed into every realm.

use std::collections::HashMap;

use thiserror::Error;

use super::types::{BuiltInFn, BuiltInObject};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::register_core_builtins;

/// Error type for registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
    #[error("Method not found: {0}.{1}")]
    MethodNotFound(String, String),
}

/// Registry for built-in objects.
/// Built once, then installed into each new realm in registration order.
pub struct BuiltInRegistry {
    /// All registered built-in objects.
    objects: HashMap<String, BuiltInObject>,

    /// Names in registration order.
    order: Vec<String>,

    /// Override chain (object.method -> number of replacements).
    overrides: HashMap<String, usize>,

    /// Plain global values such as `NaN`, installed before the objects.
    values: Vec<(String, JsValue)>,
}

impl BuiltInRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        BuiltInRegistry {
            objects: HashMap::new(),
            order: Vec::new(),
            overrides: HashMap::new(),
            values: Vec::new(),
        }
    }

    /// Create a registry with core built-ins (Object, Function, Error family, Promise, iterators).
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        register_core_builtins(&mut registry);
        registry
    }

    /// Register a built-in object (programmatic API). Re-registering a name replaces it.
    pub fn register_object(&mut self, obj: BuiltInObject) {
        if !self.objects.contains_key(&obj.name) {
            self.order.push(obj.name.clone());
        }
        self.objects.insert(obj.name.clone(), obj);
    }

    /// Registers a global binding holding `value`.
    pub fn register_value(&mut self, name: &str, value: JsValue) {
        self.values.retain(|(n, _)| n != name);
        self.values.push((name.to_string(), value));
    }

    pub fn unregister_object(&mut self, name: &str) -> Option<BuiltInObject> {
        self.order.retain(|n| n != name);
        self.objects.remove(name)
    }

    /// Get a registered object by name.
    pub fn get_object(&self, name: &str) -> Option<&BuiltInObject> {
        self.objects.get(name)
    }

    /// Get a mutable reference to a registered object.
    pub fn get_object_mut(&mut self, name: &str) -> Option<&mut BuiltInObject> {
        self.objects.get_mut(name)
    }

    /// Override an existing built-in method.
    pub fn override_method(
        &mut self,
        object: &str,
        method: &str,
        func: BuiltInFn,
    ) -> Result<(), RegistryError> {
        let obj = self
            .objects
            .get_mut(object)
            .ok_or_else(|| RegistryError::ObjectNotFound(object.to_string()))?;

        let slot = obj
            .methods
            .iter_mut()
            .chain(obj.statics.iter_mut())
            .find(|m| m.name == method)
            .ok_or_else(|| RegistryError::MethodNotFound(object.to_string(), method.to_string()))?;
        slot.func = func;

        *self
            .overrides
            .entry(format!("{}.{}", object, method))
            .or_insert(0) += 1;
        log::debug!("overrode built-in {}.{}", object, method);
        Ok(())
    }

    /// Get a built-in function by object and method name.
    pub fn get_method(&self, object: &str, method: &str) -> Option<&BuiltInFn> {
        self.objects
            .get(object)
            .and_then(|obj| obj.find_method(method))
            .map(|m| &m.func)
    }

    /// Get a constructor function for an object.
    pub fn get_constructor(&self, object: &str) -> Option<&BuiltInFn> {
        self.objects
            .get(object)
            .and_then(|obj| obj.constructor.as_ref())
            .map(|(f, _)| f)
    }

    /// Check if an object exists in the registry.
    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Check if a method exists on an object.
    pub fn has_method(&self, object: &str, method: &str) -> bool {
        self.get_method(object, method).is_some()
    }

    /// Names of all registered objects, in registration order.
    pub fn object_names(&self) -> Vec<&String> {
        self.order.iter().collect()
    }

    pub fn override_count(&self, object: &str, method: &str) -> usize {
        self.overrides
            .get(&format!("{}.{}", object, method))
            .copied()
            .unwrap_or(0)
    }

    /// Materializes every registered object into `realm`'s global object and intrinsics.
    pub fn install(&self, realm: &Realm) {
        let global = realm.global_object();
        global.define_own_property(
            PropertyKey::from("globalThis"),
            PropertyDescriptor::new_hidden(JsValue::Object(global.clone())),
        );
        for (name, value) in &self.values {
            global.define_own_property(
                PropertyKey::from(name.as_str()),
                PropertyDescriptor::new_frozen(value.clone()),
            );
        }
        for name in &self.order {
            let obj = match self.objects.get(name) {
                Some(obj) => obj,
                None => continue,
            };
            if realm.config().disabled_builtins.iter().any(|d| d == name) {
                log::debug!("skipping disabled built-in {}", name);
                continue;
            }
            // Constructors without an intrinsic still get a prototype of their own.
            let prototype = match (obj.prototype, &obj.constructor) {
                (Some(p), _) => Some(realm.intrinsic(p)),
                (None, Some(_)) => Some(realm.new_object()),
                (None, None) => None,
            };
            let target = match (&obj.constructor, obj.exposed) {
                (Some((constructor, arity)), true) => {
                    let function = realm.register_builtin(
                        &global,
                        PropertyKey::from(name.as_str()),
                        name,
                        *arity,
                        constructor.clone(),
                        true,
                    );
                    if let Some(prototype) = &prototype {
                        function.define_own_property(
                            PropertyKey::Str(well_known::PROTOTYPE),
                            PropertyDescriptor::new_frozen(JsValue::Object(prototype.clone())),
                        );
                        prototype.define_own_property(
                            PropertyKey::Str(well_known::CONSTRUCTOR),
                            PropertyDescriptor::new_hidden(JsValue::Object(function.clone())),
                        );
                    }
                    function
                }
                (None, true) => {
                    let namespace = realm.new_object();
                    global.define_own_property(
                        PropertyKey::from(name.as_str()),
                        PropertyDescriptor::new_hidden(JsValue::Object(namespace.clone())),
                    );
                    namespace
                }
                (_, false) => match &prototype {
                    Some(prototype) => prototype.clone(),
                    None => continue,
                },
            };
            for method in &obj.statics {
                realm.register_builtin(&target, method.key, &method.name, method.arity, method.func.clone(), false);
            }
            let method_target = prototype.as_ref().unwrap_or(&target);
            for method in &obj.methods {
                realm.register_builtin(
                    method_target,
                    method.key,
                    &method.name,
                    method.arity,
                    method.func.clone(),
                    false,
                );
            }
            for (key, value) in &obj.properties {
                target.define_own_property(*key, PropertyDescriptor::new_hidden(value.clone()));
            }
            if let Some(prototype) = &prototype {
                for (key, value) in &obj.prototype_properties {
                    prototype.define_own_property(*key, PropertyDescriptor::new_hidden(value.clone()));
                }
            }
        }
    }
}

impl Default for BuiltInRegistry {
    fn default() -> Self {
        Self::with_core()
    }
}
