//! Memoized prototype-chain resolution.
//!
//! The cache lives on the object at the head of a chain and records, for every
//! key reachable through that chain, which chain member owns it. Each chain
//! member's version is recorded at build time; a table is used only while all
//! recorded versions still match. Rebuilds are serialized per head and the
//! finished table is published in one swap, so readers never observe a
//! half-built table.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::runner::ds::object::{JsObjectType, WeakObject};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::property_key::PropertyKey;

struct CacheTable {
    chain: Vec<(WeakObject, u64)>,
    owners: FxHashMap<PropertyKey, u32>,
}

impl CacheTable {
    fn is_valid(&self) -> bool {
        self.chain.iter().all(|(weak, version)| {
            JsObjectType::upgrade(weak)
                .map(|o| o.version() == *version)
                .unwrap_or(false)
        })
    }

    fn owner(&self, key: &PropertyKey) -> Option<JsObjectType> {
        let depth = *self.owners.get(key)?;
        JsObjectType::upgrade(&self.chain[depth as usize].0)
    }
}

pub struct PrototypeCache {
    table: RwLock<Option<Arc<CacheTable>>>,
    rebuild: Mutex<()>,
}

impl PrototypeCache {
    pub fn new() -> Self {
        PrototypeCache {
            table: RwLock::new(None),
            rebuild: Mutex::new(()),
        }
    }

    /// Resolves `key` on `head` or any of its prototypes.
    pub fn lookup(head: &JsObjectType, key: PropertyKey) -> Option<PropertyDescriptor> {
        let table = head.prototype_cache().current(head);
        match table.owner(&key) {
            Some(owner) => match owner.get_own_property(key) {
                Some(desc) => Some(desc),
                // The owner changed after validation; answer from the live chain.
                None => walk_chain(head, key),
            },
            None => {
                if table.owners.contains_key(&key) {
                    walk_chain(head, key)
                } else {
                    None
                }
            }
        }
    }

    pub fn is_warm(&self) -> bool {
        self.table
            .read()
            .as_ref()
            .map(|t| t.is_valid())
            .unwrap_or(false)
    }

    fn current(&self, head: &JsObjectType) -> Arc<CacheTable> {
        if let Some(table) = self.table.read().as_ref() {
            if table.is_valid() {
                return table.clone();
            }
        }
        let _guard = self.rebuild.lock();
        // Another thread may have rebuilt while this one waited.
        if let Some(table) = self.table.read().as_ref() {
            if table.is_valid() {
                return table.clone();
            }
        }
        let table = Arc::new(build_table(head));
        *self.table.write() = Some(table.clone());
        table
    }
}

impl Default for PrototypeCache {
    fn default() -> Self {
        Self::new()
    }
}

fn build_table(head: &JsObjectType) -> CacheTable {
    let mut chain = vec![];
    let mut owners = FxHashMap::default();
    let mut cursor = Some(head.clone());
    while let Some(object) = cursor {
        let depth = chain.len() as u32;
        let version = object.version();
        for key in object.own_keys() {
            owners.entry(key).or_insert(depth);
        }
        chain.push((object.downgrade(), version));
        cursor = object.get_prototype_of();
    }
    log::trace!(
        "rebuilt prototype cache: {} objects, {} keys",
        chain.len(),
        owners.len()
    );
    CacheTable { chain, owners }
}

fn walk_chain(head: &JsObjectType, key: PropertyKey) -> Option<PropertyDescriptor> {
    let mut cursor = Some(head.clone());
    while let Some(object) = cursor {
        if let Some(desc) = object.get_own_property(key) {
            return Some(desc);
        }
        cursor = object.get_prototype_of();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::object::object_create;
    use crate::runner::ds::value::JsValue;

    fn key(name: &str) -> PropertyKey {
        PropertyKey::from_str(name)
    }

    #[test]
    fn nearer_owner_wins() {
        let grand = object_create(None);
        grand.define_own_property(key("x"), PropertyDescriptor::new_data(JsValue::from(1)));
        let parent = object_create(Some(grand.clone()));
        parent.define_own_property(key("x"), PropertyDescriptor::new_data(JsValue::from(2)));
        let child = object_create(Some(parent.clone()));
        match child.lookup_property(key("x")) {
            Some(PropertyDescriptor::Data { value, .. }) => assert_eq!(value, JsValue::from(2)),
            _ => panic!("x should resolve"),
        }
    }

    #[test]
    fn deletion_on_chain_invalidates() {
        let p = object_create(None);
        p.define_own_property(key("x"), PropertyDescriptor::new_data(JsValue::from(1)));
        let o = object_create(Some(p.clone()));
        assert!(o.lookup_property(key("x")).is_some());
        assert!(p.prototype_cache().is_warm());
        p.delete(key("x"));
        assert!(!p.prototype_cache().is_warm());
        assert!(o.lookup_property(key("x")).is_none());
    }

    #[test]
    fn value_writes_keep_the_cache_warm() {
        let p = object_create(None);
        p.define_own_property(key("x"), PropertyDescriptor::new_data(JsValue::from(1)));
        let o = object_create(Some(p.clone()));
        o.lookup_property(key("x"));
        p.write_own_value(key("x"), &JsValue::from(5));
        assert!(p.prototype_cache().is_warm());
        match o.lookup_property(key("x")) {
            Some(PropertyDescriptor::Data { value, .. }) => assert_eq!(value, JsValue::from(5)),
            _ => panic!("x should resolve"),
        }
    }

    #[test]
    fn grandparent_mutation_invalidates() {
        let grand = object_create(None);
        let parent = object_create(Some(grand.clone()));
        let child = object_create(Some(parent.clone()));
        assert!(child.lookup_property(key("late")).is_none());
        grand.define_own_property(key("late"), PropertyDescriptor::new_data(JsValue::from(3)));
        assert!(child.lookup_property(key("late")).is_some());
    }
}
