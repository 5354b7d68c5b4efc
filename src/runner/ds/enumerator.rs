//! Iteration state behind `for-of`, `for-in`, spread and destructuring.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::runner::ds::error::{JErrorType, JsResult};
use crate::runner::ds::object::{JsObjectType, ObjectClass};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::{call, get, get_method, get_value};
use crate::runner::ds::operations::type_conversion::{to_boolean, to_object};
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::realm::{Realm, WellKnownIntrinsics};
use crate::runner::ds::symbol::SYMBOL_ITERATOR;
use crate::runner::ds::value::{JsString, JsValue};

pub enum Enumerator {
    /// Index walk over an array-like; the length is re-read on every step.
    Array { target: JsObjectType, index: u32 },
    /// Code points of a string.
    String { text: JsString, offset: usize },
    /// A script-visible iterator driven through its `next` method.
    Protocol { iterator: JsValue, next: JsValue },
    Keys(PropertyEnumerator),
    Done,
}

/// Lazily walks enumerable string keys of an object and then its
/// prototypes, skipping keys already seen lower in the chain.
pub struct PropertyEnumerator {
    current: Option<JsObjectType>,
    pending: VecDeque<PropertyKey>,
    visited: FxHashSet<PropertyKey>,
}

impl PropertyEnumerator {
    pub fn new(target: JsObjectType) -> Self {
        let pending = Self::string_keys(&target);
        PropertyEnumerator {
            current: Some(target),
            pending,
            visited: FxHashSet::default(),
        }
    }

    fn string_keys(o: &JsObjectType) -> VecDeque<PropertyKey> {
        o.own_keys().into_iter().filter(|k| !k.is_symbol()).collect()
    }
}

impl Iterator for PropertyEnumerator {
    type Item = JsValue;

    fn next(&mut self) -> Option<JsValue> {
        loop {
            let current = self.current.clone()?;
            match self.pending.pop_front() {
                Some(key) => {
                    if !self.visited.insert(key) {
                        continue;
                    }
                    // Deleted since the walk started, or hidden.
                    match current.get_own_property(key) {
                        Some(desc) if desc.is_enumerable() => return Some(key.to_js_value()),
                        _ => continue,
                    }
                }
                None => {
                    self.current = current.get_prototype_of();
                    if let Some(next) = &self.current {
                        self.pending = Self::string_keys(next);
                    }
                }
            }
        }
    }
}

fn wrap(enumerator: Enumerator, prototype: Option<JsObjectType>) -> JsObjectType {
    JsObjectType::new(
        prototype,
        ObjectClass::Enumerator(Arc::new(Mutex::new(enumerator))),
    )
}

pub fn new_array_iterator(realm: &Realm, target: JsObjectType) -> JsObjectType {
    wrap(
        Enumerator::Array { target, index: 0 },
        Some(realm.intrinsic(WellKnownIntrinsics::ArrayIteratorPrototype)),
    )
}

pub fn new_string_iterator(realm: &Realm, text: JsString) -> JsObjectType {
    wrap(
        Enumerator::String { text, offset: 0 },
        Some(realm.intrinsic(WellKnownIntrinsics::ArrayIteratorPrototype)),
    )
}

/// Whether `iterator` still uses the built-in `next`, so steps can bypass the protocol.
fn has_intrinsic_next(realm: &Realm, iterator: &JsObjectType) -> bool {
    let intrinsic = realm
        .intrinsic(WellKnownIntrinsics::ArrayIteratorPrototype)
        .get_own_property(PropertyKey::Str(well_known::NEXT));
    match (intrinsic, iterator.lookup_property(PropertyKey::Str(well_known::NEXT))) {
        (
            Some(PropertyDescriptor::Data { value: a, .. }),
            Some(PropertyDescriptor::Data { value: b, .. }),
        ) => a == b,
        _ => false,
    }
}

/// `GetIterator(value)`: an object whose class is `Enumerator`.
pub fn get_iterator(realm: &Realm, value: &JsValue) -> JsResult<JsObjectType> {
    let method = match get_method(realm, value, PropertyKey::Sym(SYMBOL_ITERATOR))? {
        Some(m) => m,
        None => {
            return Err(JErrorType::TypeError(format!(
                "{} is not iterable",
                crate::runner::ds::error::describe(value)
            )))
        }
    };
    let iterator = call(realm, &method, value.clone(), &[])?;
    let iterator_object = match &iterator {
        JsValue::Object(o) => o.clone(),
        _ => {
            return Err(JErrorType::TypeError(
                "Result of the Symbol.iterator method is not an object".to_string(),
            ))
        }
    };
    if iterator_object.enumerator().is_some() && has_intrinsic_next(realm, &iterator_object) {
        return Ok(iterator_object);
    }
    let next = get(realm, &iterator_object, PropertyKey::Str(well_known::NEXT))?;
    Ok(wrap(Enumerator::Protocol { iterator, next }, None))
}

/// Enumerable string keys of `value` and its prototypes, for `for-in`.
pub fn for_in_keys(realm: &Realm, value: &JsValue) -> JsResult<JsObjectType> {
    let enumerator = match value {
        JsValue::Undefined | JsValue::Null => Enumerator::Done,
        JsValue::Object(o) => Enumerator::Keys(o.enumerate()),
        other => Enumerator::Keys(to_object(realm, other)?.enumerate()),
    };
    Ok(wrap(enumerator, None))
}

fn enumerator_of(iterator: &JsValue) -> JsResult<Arc<Mutex<Enumerator>>> {
    iterator
        .as_object()
        .and_then(|o| o.enumerator())
        .ok_or_else(|| JErrorType::TypeError(format!("{} is not an iterator", iterator.inspect())))
}

enum Pending {
    Element(JsObjectType, u32),
    Next(JsValue, JsValue),
}

/// Advances the iterator: `Some(value)` or `None` once it is exhausted.
pub fn iterator_step(realm: &Realm, iterator: &JsValue) -> JsResult<Option<JsValue>> {
    let state = enumerator_of(iterator)?;
    // The lock is never held across a call back into script code.
    let pending = {
        let mut guard = state.lock();
        match &mut *guard {
            Enumerator::Done => return Ok(None),
            Enumerator::String { text, offset } => {
                let next = text[*offset..].chars().next();
                return Ok(match next {
                    Some(c) => {
                        *offset += c.len_utf8();
                        Some(JsValue::from(c.to_string()))
                    }
                    None => {
                        *guard = Enumerator::Done;
                        None
                    }
                });
            }
            Enumerator::Keys(keys) => {
                let next = keys.next();
                if next.is_none() {
                    *guard = Enumerator::Done;
                }
                return Ok(next);
            }
            Enumerator::Array { target, index } => {
                let at = *index;
                *index += 1;
                Pending::Element(target.clone(), at)
            }
            Enumerator::Protocol { iterator, next } => Pending::Next(iterator.clone(), next.clone()),
        }
    };
    match pending {
        Pending::Element(target, index) => {
            if index >= array_like_length(realm, &target)? {
                *state.lock() = Enumerator::Done;
                return Ok(None);
            }
            get(realm, &target, PropertyKey::Int(index)).map(Some)
        }
        Pending::Next(iterator_value, next) => {
            let result = call(realm, &next, iterator_value, &[])?;
            if !result.is_object() {
                return Err(JErrorType::TypeError(format!(
                    "Iterator result {} is not an object",
                    result.inspect()
                )));
            }
            if to_boolean(&get_value(realm, &result, PropertyKey::Str(well_known::DONE))?) {
                *state.lock() = Enumerator::Done;
                return Ok(None);
            }
            get_value(realm, &result, PropertyKey::Str(well_known::VALUE)).map(Some)
        }
    }
}

fn array_like_length(realm: &Realm, target: &JsObjectType) -> JsResult<u32> {
    if let Some(length) = target.array_length() {
        return Ok(length);
    }
    let length = get(realm, target, PropertyKey::Str(well_known::LENGTH))?;
    Ok(length.as_number().map(|n| n.max(0.0).min(u32::MAX as f64) as u32).unwrap_or(0))
}

/// Drains the iterator into a new array.
pub fn iterator_rest(realm: &Realm, iterator: &JsValue) -> JsResult<JsObjectType> {
    let mut values = Vec::new();
    while let Some(value) = iterator_step(realm, iterator)? {
        values.push(value);
    }
    Ok(realm.new_array(values))
}

/// Abandons the iterator early, calling its `return` method when it has one.
pub fn iterator_close(realm: &Realm, iterator: &JsValue) -> JsResult<()> {
    let state = enumerator_of(iterator)?;
    let previous = std::mem::replace(&mut *state.lock(), Enumerator::Done);
    if let Enumerator::Protocol { iterator, .. } = previous {
        if let Some(method) = get_method(realm, &iterator, PropertyKey::Str(well_known::RETURN))? {
            let result = call(realm, &method, iterator, &[])?;
            if !result.is_object() {
                return Err(JErrorType::TypeError(format!(
                    "Iterator result {} is not an object",
                    result.inspect()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_walk_the_chain_without_duplicates() {
        let realm = Realm::new();
        let parent = realm.new_object();
        parent.define_own_property(PropertyKey::from("a"), PropertyDescriptor::new_data(JsValue::from(1)));
        parent.define_own_property(PropertyKey::from("b"), PropertyDescriptor::new_data(JsValue::from(2)));
        let child = crate::runner::ds::object::object_create(Some(parent));
        child.define_own_property(PropertyKey::from("b"), PropertyDescriptor::new_data(JsValue::from(3)));
        child.define_own_property(PropertyKey::from("c"), PropertyDescriptor::new_hidden(JsValue::from(4)));
        let keys: Vec<String> = child.enumerate().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn array_iterator_rereads_length() {
        let realm = Realm::new();
        let array = realm.new_array(vec![JsValue::from(1)]);
        let iterator = JsValue::Object(new_array_iterator(&realm, array.clone()));
        assert_eq!(iterator_step(&realm, &iterator).ok().flatten(), Some(JsValue::from(1)));
        array.push_element(JsValue::from(2));
        assert_eq!(iterator_step(&realm, &iterator).ok().flatten(), Some(JsValue::from(2)));
        assert!(matches!(iterator_step(&realm, &iterator), Ok(None)));
        array.push_element(JsValue::from(3));
        assert!(matches!(iterator_step(&realm, &iterator), Ok(None)));
    }
}
