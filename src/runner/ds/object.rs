//! Object storage.
//!
//! An object keeps index keys in a dense `Vec` while they stay close to each
//! other and spills far-away indices into an ordered sparse map. Named and
//! symbol keys live in an insertion-ordered map resolved through their
//! interned handles. Structural changes (adding or deleting a property,
//! changing the prototype) bump `version`, which is what prototype caches
//! validate against.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashMap;

use crate::runner::ds::enumerator::{Enumerator, PropertyEnumerator};
use crate::runner::ds::function_object::FunctionObject;
use crate::runner::ds::generator::GeneratorState;
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::promise::PromiseState;
use crate::runner::ds::property_key::{well_known, PropertyKey};
use crate::runner::ds::prototype_cache::PrototypeCache;
use crate::runner::ds::value::JsValue;

/// A write to an index further than this past the dense length goes to sparse storage.
pub const DENSE_GAP_LIMIT: u32 = 1024;

pub enum ObjectClass {
    Ordinary,
    Array,
    Error,
    Arguments,
    Function(Arc<FunctionObject>),
    Generator(Arc<Mutex<GeneratorState>>),
    Promise(Arc<Mutex<PromiseState>>),
    Enumerator(Arc<Mutex<Enumerator>>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClassTag {
    Ordinary,
    Array,
    Error,
    Arguments,
    Function,
    Generator,
    Promise,
    Enumerator,
}

impl ObjectClass {
    pub fn tag(&self) -> ClassTag {
        match self {
            ObjectClass::Ordinary => ClassTag::Ordinary,
            ObjectClass::Array => ClassTag::Array,
            ObjectClass::Error => ClassTag::Error,
            ObjectClass::Arguments => ClassTag::Arguments,
            ObjectClass::Function(_) => ClassTag::Function,
            ObjectClass::Generator(_) => ClassTag::Generator,
            ObjectClass::Promise(_) => ClassTag::Promise,
            ObjectClass::Enumerator(_) => ClassTag::Enumerator,
        }
    }
}

#[derive(Default)]
struct PropertyMap {
    entries: Vec<Option<(PropertyKey, PropertyDescriptor)>>,
    index: FxHashMap<PropertyKey, usize>,
}

impl PropertyMap {
    fn get(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        let slot = *self.index.get(key)?;
        self.entries[slot].as_ref().map(|(_, d)| d)
    }

    fn get_mut(&mut self, key: &PropertyKey) -> Option<&mut PropertyDescriptor> {
        let slot = *self.index.get(key)?;
        self.entries[slot].as_mut().map(|(_, d)| d)
    }

    /// Returns true when the key was not present before.
    fn insert(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        if let Some(existing) = self.get_mut(&key) {
            *existing = desc;
            return false;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(Some((key, desc)));
        true
    }

    fn remove(&mut self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let slot = self.index.remove(key)?;
        let removed = self.entries[slot].take().map(|(_, d)| d);
        if self.entries.len() > 8 && self.index.len() * 2 < self.entries.len() {
            self.compact();
        }
        removed
    }

    fn compact(&mut self) {
        self.entries.retain(|e| e.is_some());
        self.index.clear();
        for (slot, entry) in self.entries.iter().enumerate() {
            if let Some((key, _)) = entry {
                self.index.insert(*key, slot);
            }
        }
    }

    fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.entries.iter().filter_map(|e| e.as_ref().map(|(k, _)| k))
    }
}

pub struct ObjectData {
    prototype: Option<JsObjectType>,
    extensible: bool,
    class: ObjectClass,
    elements: Vec<Option<PropertyDescriptor>>,
    sparse: BTreeMap<u32, PropertyDescriptor>,
    length: u32,
    properties: PropertyMap,
}

impl ObjectData {
    fn new(prototype: Option<JsObjectType>, class: ObjectClass) -> Self {
        ObjectData {
            prototype,
            extensible: true,
            class,
            elements: Vec::new(),
            sparse: BTreeMap::new(),
            length: 0,
            properties: PropertyMap::default(),
        }
    }

    pub fn class(&self) -> &ObjectClass {
        &self.class
    }

    pub fn prototype(&self) -> Option<&JsObjectType> {
        self.prototype.as_ref()
    }

    fn is_array(&self) -> bool {
        matches!(self.class, ObjectClass::Array)
    }

    fn array_length_descriptor(&self) -> PropertyDescriptor {
        PropertyDescriptor::Data {
            value: JsValue::Number(self.length as f64),
            writable: true,
            enumerable: false,
            configurable: false,
        }
    }

    fn get_element(&self, index: u32) -> Option<&PropertyDescriptor> {
        match self.elements.get(index as usize) {
            Some(slot) => slot.as_ref(),
            None => self.sparse.get(&index),
        }
    }

    fn get_element_mut(&mut self, index: u32) -> Option<&mut PropertyDescriptor> {
        if (index as usize) < self.elements.len() {
            self.elements[index as usize].as_mut()
        } else {
            self.sparse.get_mut(&index)
        }
    }

    /// Returns true when the index was not present before.
    fn insert_element(&mut self, index: u32, desc: PropertyDescriptor) -> bool {
        let dense_len = self.elements.len() as u64;
        let is_new;
        if (index as u64) < dense_len {
            is_new = self.elements[index as usize].is_none();
            self.elements[index as usize] = Some(desc);
        } else if (index as u64) <= dense_len + DENSE_GAP_LIMIT as u64 {
            self.elements.resize(index as usize + 1, None);
            is_new = true;
            self.elements[index as usize] = Some(desc);
            self.absorb_sparse();
        } else {
            is_new = self.sparse.insert(index, desc).is_none();
        }
        if self.is_array() && index >= self.length {
            self.length = index + 1;
        }
        is_new
    }

    /// Moves sparse entries inside or directly after the dense segment into it.
    fn absorb_sparse(&mut self) {
        let dense_len = self.elements.len() as u32;
        let tail = self.sparse.split_off(&dense_len);
        for (i, d) in std::mem::replace(&mut self.sparse, tail) {
            self.elements[i as usize] = Some(d);
        }
        while let Some(entry) = self.sparse.first_entry() {
            if *entry.key() as usize != self.elements.len() {
                break;
            }
            self.elements.push(Some(entry.remove()));
        }
    }

    fn remove_element(&mut self, index: u32) -> Option<PropertyDescriptor> {
        if (index as usize) < self.elements.len() {
            let removed = self.elements[index as usize].take();
            while let Some(None) = self.elements.last() {
                self.elements.pop();
            }
            removed
        } else {
            self.sparse.remove(&index)
        }
    }

    fn index_keys(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self
            .elements
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|_| i as u32))
            .collect();
        keys.extend(self.sparse.keys().copied());
        keys
    }

    fn truncate(&mut self, new_length: u32) -> bool {
        let doomed: Vec<u32> = self
            .index_keys()
            .into_iter()
            .filter(|i| *i >= new_length)
            .collect();
        for index in doomed.iter().rev() {
            if let Some(d) = self.get_element(*index) {
                if !d.is_configurable() {
                    self.length = index + 1;
                    return false;
                }
            }
            self.remove_element(*index);
        }
        self.length = new_length;
        true
    }
}

pub struct JsObject {
    data: RwLock<ObjectData>,
    version: AtomicU64,
    cache: PrototypeCache,
}

/// Shared reference to an object.
#[derive(Clone)]
pub struct JsObjectType(Arc<JsObject>);

pub(crate) type WeakObject = Weak<JsObject>;

/// Outcome of writing a value to an own property.
pub enum OwnWrite {
    Written,
    ReadOnly,
    Setter(Option<JsObjectType>),
    Absent,
}

impl JsObjectType {
    pub fn new(prototype: Option<JsObjectType>, class: ObjectClass) -> Self {
        JsObjectType(Arc::new(JsObject {
            data: RwLock::new(ObjectData::new(prototype, class)),
            version: AtomicU64::new(0),
            cache: PrototypeCache::new(),
        }))
    }

    pub fn ptr_eq(&self, other: &JsObjectType) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakObject {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &WeakObject) -> Option<JsObjectType> {
        weak.upgrade().map(JsObjectType)
    }

    pub(crate) fn version(&self) -> u64 {
        self.0.version.load(Ordering::Acquire)
    }

    fn bump_version(&self) {
        self.0.version.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn prototype_cache(&self) -> &PrototypeCache {
        &self.0.cache
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ObjectData> {
        self.0.data.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, ObjectData> {
        self.0.data.write()
    }

    pub fn class_tag(&self) -> ClassTag {
        self.read().class.tag()
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.read().class, ObjectClass::Function(_))
    }

    pub fn is_array(&self) -> bool {
        self.read().is_array()
    }

    pub fn function(&self) -> Option<Arc<FunctionObject>> {
        match &self.read().class {
            ObjectClass::Function(f) => Some(f.clone()),
            _ => None,
        }
    }

    pub fn generator(&self) -> Option<Arc<Mutex<GeneratorState>>> {
        match &self.read().class {
            ObjectClass::Generator(g) => Some(g.clone()),
            _ => None,
        }
    }

    pub fn promise(&self) -> Option<Arc<Mutex<PromiseState>>> {
        match &self.read().class {
            ObjectClass::Promise(p) => Some(p.clone()),
            _ => None,
        }
    }

    pub fn enumerator(&self) -> Option<Arc<Mutex<Enumerator>>> {
        match &self.read().class {
            ObjectClass::Enumerator(e) => Some(e.clone()),
            _ => None,
        }
    }

    pub fn array_length(&self) -> Option<u32> {
        let data = self.read();
        if data.is_array() {
            Some(data.length)
        } else {
            None
        }
    }

    pub fn get_prototype_of(&self) -> Option<JsObjectType> {
        self.read().prototype.clone()
    }

    /// Fails when the new prototype would close a cycle.
    pub fn set_prototype_of(&self, prototype: Option<JsObjectType>) -> bool {
        let mut cursor = prototype.clone();
        while let Some(p) = cursor {
            if p.ptr_eq(self) {
                return false;
            }
            cursor = p.get_prototype_of();
        }
        {
            let mut data = self.write();
            let unchanged = match (&data.prototype, &prototype) {
                (Some(a), Some(b)) => a.ptr_eq(b),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                return true;
            }
            if !data.extensible {
                return false;
            }
            data.prototype = prototype;
        }
        self.bump_version();
        true
    }

    pub fn is_extensible(&self) -> bool {
        self.read().extensible
    }

    pub fn prevent_extensions(&self) {
        self.write().extensible = false;
    }

    pub fn get_own_property(&self, key: PropertyKey) -> Option<PropertyDescriptor> {
        let data = self.read();
        match key {
            PropertyKey::Int(i) => data.get_element(i).cloned(),
            PropertyKey::Str(s) if s == well_known::LENGTH && data.is_array() => {
                Some(data.array_length_descriptor())
            }
            _ => data.properties.get(&key).cloned(),
        }
    }

    pub fn has_own_property(&self, key: PropertyKey) -> bool {
        let data = self.read();
        match key {
            PropertyKey::Int(i) => data.get_element(i).is_some(),
            PropertyKey::Str(s) if s == well_known::LENGTH && data.is_array() => true,
            _ => data.properties.get(&key).is_some(),
        }
    }

    /// Own property first, then the prototype chain through its cache.
    pub fn lookup_property(&self, key: PropertyKey) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.get_own_property(key) {
            return Some(desc);
        }
        let prototype = self.get_prototype_of()?;
        PrototypeCache::lookup(&prototype, key)
    }

    pub fn has_property(&self, key: PropertyKey) -> bool {
        self.lookup_property(key).is_some()
    }

    /// Writes `value` into an existing own data property without consulting the chain.
    pub fn write_own_value(&self, key: PropertyKey, value: &JsValue) -> OwnWrite {
        let mut data = self.write();
        if let PropertyKey::Str(s) = key {
            if s == well_known::LENGTH && data.is_array() {
                return match value {
                    JsValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64 => {
                        let new_length = *n as u32;
                        let shrinking = new_length < data.length;
                        let ok = data.truncate(new_length);
                        drop(data);
                        if shrinking {
                            self.bump_version();
                        }
                        if ok {
                            OwnWrite::Written
                        } else {
                            OwnWrite::ReadOnly
                        }
                    }
                    _ => OwnWrite::ReadOnly,
                };
            }
        }
        let slot = match key {
            PropertyKey::Int(i) => data.get_element_mut(i),
            _ => data.properties.get_mut(&key),
        };
        match slot {
            Some(PropertyDescriptor::Data {
                value: current,
                writable,
                ..
            }) => {
                if *writable {
                    *current = value.clone();
                    OwnWrite::Written
                } else {
                    OwnWrite::ReadOnly
                }
            }
            Some(PropertyDescriptor::Accessor { set, .. }) => OwnWrite::Setter(set.clone()),
            None => OwnWrite::Absent,
        }
    }

    /// Adds or replaces an own property. Returns false when the object or the
    /// existing property forbids it.
    pub fn define_own_property(&self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        let structural;
        {
            let mut data = self.write();
            if let PropertyKey::Str(s) = key {
                if s == well_known::LENGTH && data.is_array() {
                    return match desc {
                        PropertyDescriptor::Data {
                            value: JsValue::Number(n),
                            ..
                        } if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => {
                            let ok = data.truncate(n as u32);
                            drop(data);
                            self.bump_version();
                            ok
                        }
                        _ => false,
                    };
                }
            }
            let existing = match key {
                PropertyKey::Int(i) => data.get_element(i),
                _ => data.properties.get(&key),
            };
            match existing {
                Some(current) => {
                    if !current.is_configurable() {
                        let allowed = match (current, &desc) {
                            (
                                PropertyDescriptor::Data {
                                    writable: true,
                                    enumerable: e1,
                                    ..
                                },
                                PropertyDescriptor::Data {
                                    enumerable: e2,
                                    configurable: false,
                                    ..
                                },
                            ) => e1 == e2,
                            _ => false,
                        };
                        if !allowed {
                            return false;
                        }
                    }
                    structural = !current.same_shape(&desc);
                }
                None => {
                    if !data.extensible {
                        return false;
                    }
                    structural = true;
                }
            }
            match key {
                PropertyKey::Int(i) => {
                    data.insert_element(i, desc);
                }
                _ => {
                    data.properties.insert(key, desc);
                }
            }
        }
        if structural {
            self.bump_version();
        }
        true
    }

    /// Removes an own property. Missing properties delete successfully.
    pub fn delete(&self, key: PropertyKey) -> bool {
        {
            let mut data = self.write();
            let existing = match key {
                PropertyKey::Int(i) => data.get_element(i),
                PropertyKey::Str(s) if s == well_known::LENGTH && data.is_array() => return false,
                _ => data.properties.get(&key),
            };
            match existing {
                None => return true,
                Some(d) if !d.is_configurable() => return false,
                Some(_) => {}
            }
            match key {
                PropertyKey::Int(i) => {
                    data.remove_element(i);
                }
                _ => {
                    data.properties.remove(&key);
                }
            }
        }
        self.bump_version();
        true
    }

    /// Integer keys ascending, then strings in insertion order, then symbols in insertion order.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let data = self.read();
        let mut keys: Vec<PropertyKey> = data
            .index_keys()
            .into_iter()
            .map(PropertyKey::Int)
            .collect();
        if data.is_array() {
            keys.push(PropertyKey::Str(well_known::LENGTH));
        }
        keys.extend(
            data.properties
                .keys()
                .filter(|k| matches!(k, PropertyKey::Str(_)))
                .copied(),
        );
        keys.extend(data.properties.keys().filter(|k| k.is_symbol()).copied());
        keys
    }

    /// Lazy walk over enumerable string keys of this object and its prototypes.
    pub fn enumerate(&self) -> PropertyEnumerator {
        PropertyEnumerator::new(self.clone())
    }

    /// Appends `value` at the array's current length.
    pub fn push_element(&self, value: JsValue) {
        let mut data = self.write();
        let index = if data.is_array() {
            data.length
        } else {
            data.elements.len() as u32
        };
        data.insert_element(index, PropertyDescriptor::new_data(value));
        drop(data);
        self.bump_version();
    }

    /// Leaves a hole: only the length moves.
    pub fn push_hole(&self) {
        let mut data = self.write();
        if data.is_array() {
            data.length += 1;
        }
    }
}

impl fmt::Debug for JsObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", JsValue::Object(self.clone()))
    }
}

pub fn object_create(prototype: Option<JsObjectType>) -> JsObjectType {
    JsObjectType::new(prototype, ObjectClass::Ordinary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::property_key::KeyString;

    fn key(name: &str) -> PropertyKey {
        PropertyKey::from_str(name)
    }

    #[test]
    fn own_keys_order() {
        let o = object_create(None);
        o.define_own_property(key("b"), PropertyDescriptor::new_data(JsValue::from(1)));
        o.define_own_property(PropertyKey::Int(2), PropertyDescriptor::new_data(JsValue::from(2)));
        o.define_own_property(key("a"), PropertyDescriptor::new_data(JsValue::from(3)));
        o.define_own_property(PropertyKey::Int(0), PropertyDescriptor::new_data(JsValue::from(4)));
        let sym = crate::runner::ds::symbol::SymbolData::new("s".to_string());
        o.define_own_property(PropertyKey::Sym(sym), PropertyDescriptor::new_data(JsValue::Null));
        assert_eq!(
            o.own_keys(),
            vec![
                PropertyKey::Int(0),
                PropertyKey::Int(2),
                PropertyKey::Str(KeyString::intern("b")),
                PropertyKey::Str(KeyString::intern("a")),
                PropertyKey::Sym(sym),
            ]
        );
    }

    #[test]
    fn far_indices_go_sparse_and_come_back() {
        let o = JsObjectType::new(None, ObjectClass::Array);
        o.define_own_property(PropertyKey::Int(5000), PropertyDescriptor::new_data(JsValue::from(1)));
        assert_eq!(o.read().elements.len(), 0);
        assert_eq!(o.array_length(), Some(5001));
        for i in 0..5000 {
            o.define_own_property(PropertyKey::Int(i), PropertyDescriptor::new_data(JsValue::from(i)));
        }
        assert!(o.read().sparse.is_empty());
        assert_eq!(o.read().elements.len(), 5001);
    }

    #[test]
    fn adjacent_sparse_run_joins_dense_segment() {
        let o = JsObjectType::new(None, ObjectClass::Array);
        for i in [3000, 3001, 3002, 3500] {
            o.define_own_property(PropertyKey::Int(i), PropertyDescriptor::new_data(JsValue::from(i)));
        }
        for i in 0..3000 {
            o.define_own_property(PropertyKey::Int(i), PropertyDescriptor::new_data(JsValue::from(i)));
        }
        assert_eq!(o.read().elements.len(), 3003);
        assert_eq!(o.read().sparse.keys().copied().collect::<Vec<_>>(), vec![3500]);
        assert_eq!(o.array_length(), Some(3501));
    }

    #[test]
    fn delete_respects_configurable() {
        let o = object_create(None);
        o.define_own_property(key("fixed"), PropertyDescriptor::new_frozen(JsValue::from(1)));
        o.define_own_property(key("loose"), PropertyDescriptor::new_data(JsValue::from(1)));
        assert!(!o.delete(key("fixed")));
        assert!(o.delete(key("loose")));
        assert!(o.delete(key("missing")));
        assert!(o.get_own_property(key("loose")).is_none());
    }

    #[test]
    fn truncating_length_drops_elements() {
        let o = JsObjectType::new(None, ObjectClass::Array);
        for i in 0..4 {
            o.push_element(JsValue::from(i));
        }
        assert!(matches!(
            o.write_own_value(key("length"), &JsValue::from(1)),
            OwnWrite::Written
        ));
        assert_eq!(o.own_keys().len(), 2);
        assert_eq!(o.array_length(), Some(1));
    }

    #[test]
    fn prototype_cycles_are_rejected() {
        let a = object_create(None);
        let b = object_create(Some(a.clone()));
        assert!(!a.set_prototype_of(Some(b)));
    }
}
