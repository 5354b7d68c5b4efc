//! Object model tests: property storage, prototype chains and arrays, driven
//! both from the host API and from scripts.

extern crate kite;

use kite::runner::ds::object::{object_create, ClassTag, JsObjectType, DENSE_GAP_LIMIT};
use kite::runner::ds::object_property::PropertyDescriptor;
use kite::runner::ds::operations::object::{get, set};
use kite::runner::ds::property_key::{KeyString, PropertyKey};
use kite::runner::ds::realm::{Realm, WellKnownIntrinsics};
use kite::runner::ds::value::JsValue;
use kite::evaluate;

fn key(name: &str) -> PropertyKey {
    PropertyKey::from(name)
}

fn data(value: impl Into<JsValue>) -> PropertyDescriptor {
    PropertyDescriptor::new_data(value.into())
}

fn value_of(object: &JsObjectType, name: &str) -> Option<JsValue> {
    match object.lookup_property(key(name)) {
        Some(PropertyDescriptor::Data { value, .. }) => Some(value),
        _ => None,
    }
}

fn eval(code: &str) -> JsValue {
    evaluate(code, None).unwrap_or_else(|e| panic!("{} failed: {}", code, e))
}

// ============================================================================
// Keys
// ============================================================================

mod key_tests {
    use super::*;

    #[test]
    fn test_interned_names_share_a_handle() {
        let a = KeyString::intern("someLongPropertyName");
        let b = KeyString::intern(&format!("someLong{}", "PropertyName"));
        assert_eq!(a, b);
        assert_eq!(a.handle(), b.handle());
        assert_eq!(&*a.as_str(), "someLongPropertyName");
        assert_ne!(a, KeyString::intern("other"));
    }

    #[test]
    fn test_canonical_numeric_strings_are_indexes() {
        assert_eq!(PropertyKey::from("17"), PropertyKey::Int(17));
        assert_eq!(PropertyKey::from("0"), PropertyKey::Int(0));
        assert!(matches!(PropertyKey::from("017"), PropertyKey::Str(_)));
        assert!(matches!(PropertyKey::from("-1"), PropertyKey::Str(_)));
        assert!(matches!(PropertyKey::from("4294967295"), PropertyKey::Str(_)));
        assert_eq!(PropertyKey::from_number(3.0), PropertyKey::Int(3));
        assert_eq!(PropertyKey::from_number(1.5), PropertyKey::from("1.5"));
    }

    #[test]
    fn test_own_keys_order() {
        let object = object_create(None);
        object.define_own_property(key("b"), data(1));
        object.define_own_property(key("2"), data(1));
        object.define_own_property(key("a"), data(1));
        object.define_own_property(key("0"), data(1));
        let keys: Vec<String> = object.own_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "2", "b", "a"]);
    }

    #[test]
    fn test_script_key_order() {
        assert_eq!(
            eval("const o = { z: 1, 10: 1, a: 1, 1: 1 }; let s = ''; for (const k in o) s += k + ','; s"),
            JsValue::from("1,10,z,a,")
        );
    }
}

// ============================================================================
// Properties and prototypes
// ============================================================================

mod property_tests {
    use super::*;

    #[test]
    fn test_lookup_walks_the_chain() {
        let base = object_create(None);
        base.define_own_property(key("shared"), data(1));
        let derived = object_create(Some(base.clone()));
        assert_eq!(value_of(&derived, "shared"), Some(JsValue::from(1)));
        assert!(!derived.has_own_property(key("shared")));
        assert!(derived.has_property(key("shared")));
    }

    #[test]
    fn test_prototype_delete_is_observed() {
        let base = object_create(None);
        base.define_own_property(key("x"), data(1));
        let derived = object_create(Some(base.clone()));
        assert!(value_of(&derived, "x").is_some());
        assert!(base.delete(key("x")));
        assert_eq!(value_of(&derived, "x"), None);
    }

    #[test]
    fn test_script_prototype_delete_is_observed() {
        let code = "
            const p = { x: 1 };
            const o = Object.create(p);
            let before = 0;
            for (let i = 0; i < 50; i++) before += o.x;
            delete p.x;
            [before, o.x];
        ";
        let result = eval(code);
        let array = result.as_object().unwrap();
        assert_eq!(value_of(array, "0"), Some(JsValue::from(50)));
        assert_eq!(value_of(array, "1"), Some(JsValue::Undefined));
    }

    #[test]
    fn test_set_prototype_cycle_is_refused() {
        let a = object_create(None);
        let b = object_create(Some(a.clone()));
        assert!(!a.set_prototype_of(Some(b.clone())));
        assert!(a.get_prototype_of().is_none());
    }

    #[test]
    fn test_non_configurable_delete_fails() {
        let object = object_create(None);
        object.define_own_property(key("fixed"), PropertyDescriptor::new_frozen(JsValue::from(1)));
        assert!(!object.delete(key("fixed")));
        assert!(object.delete(key("missing")));
    }

    #[test]
    fn test_non_extensible_rejects_new_properties() {
        let realm = Realm::new();
        let object = realm.new_object();
        object.define_own_property(key("kept"), data(1));
        object.prevent_extensions();
        assert!(!object.is_extensible());
        assert!(!object.define_own_property(key("added"), data(2)));
        set(&realm, &object, key("kept"), JsValue::from(3)).unwrap();
        assert_eq!(get(&realm, &object, key("kept")).unwrap(), JsValue::from(3));
    }

    #[test]
    fn test_accessors_run_with_receiver() {
        let code = "
            const base = { get double() { return this.n * 2; }, set double(v) { this.n = v / 2; } };
            const o = Object.create(base);
            o.n = 4;
            const first = o.double;
            o.double = 20;
            first * 100 + o.n;
        ";
        assert_eq!(eval(code), JsValue::from(810));
    }

    #[test]
    fn test_frozen_object_ignores_writes() {
        assert_eq!(
            eval("const o = Object.freeze({ a: 1 }); o.a = 2; o.b = 3; o.a * 10 + (o.b === undefined ? 1 : 0)"),
            JsValue::from(11)
        );
        assert_eq!(eval("Object.isFrozen(Object.freeze({}))"), JsValue::Boolean(true));
    }
}

// ============================================================================
// Arrays
// ============================================================================

mod array_tests {
    use super::*;

    #[test]
    fn test_array_length_tracks_writes() {
        let realm = Realm::new();
        let array = realm.new_array(vec![JsValue::from(1), JsValue::from(2)]);
        assert_eq!(array.class_tag(), ClassTag::Array);
        assert_eq!(array.array_length(), Some(2));
        array.push_element(JsValue::from(3));
        assert_eq!(array.array_length(), Some(3));
        array.push_hole();
        assert_eq!(array.array_length(), Some(4));
        assert!(!array.has_own_property(PropertyKey::Int(3)));
    }

    #[test]
    fn test_far_index_write_is_sparse_but_visible() {
        let realm = Realm::new();
        let array = realm.new_array(Vec::new());
        let far = DENSE_GAP_LIMIT * 4;
        array.define_own_property(PropertyKey::Int(far), data("far"));
        assert_eq!(array.array_length(), Some(far + 1));
        assert_eq!(get(&realm, &array, PropertyKey::Int(far)).unwrap(), JsValue::from("far"));
        assert_eq!(get(&realm, &array, PropertyKey::Int(0)).unwrap(), JsValue::Undefined);
        let keys = array.own_keys();
        assert_eq!(keys[0], PropertyKey::Int(far));
    }

    #[test]
    fn test_length_truncation_drops_elements() {
        let realm = Realm::new();
        let array = realm.new_array((0..5).map(JsValue::from).collect());
        array.define_own_property(key("length"), data(2));
        assert_eq!(array.array_length(), Some(2));
        assert!(!array.has_own_property(PropertyKey::Int(3)));
        assert!(!array.delete(key("length")));
    }

    #[test]
    fn test_script_arrays() {
        assert_eq!(eval("const a = [1, , 3]; a.length"), JsValue::from(3));
        assert_eq!(eval("const a = [1, , 3]; 1 in a"), JsValue::Boolean(false));
        assert_eq!(eval("const a = []; a[5] = 1; a.length"), JsValue::from(6));
        assert_eq!(eval("const a = [1, 2, 3, 4]; a.length = 1; a[2]"), JsValue::Undefined);
        assert_eq!(eval("Array.isArray([]) && !Array.isArray({ length: 0 })"), JsValue::Boolean(true));
    }
}

// ============================================================================
// Realm intrinsics
// ============================================================================

mod realm_tests {
    use super::*;

    #[test]
    fn test_new_objects_inherit_object_prototype() {
        let realm = Realm::new();
        let object = realm.new_object();
        let proto = realm.intrinsic(WellKnownIntrinsics::ObjectPrototype);
        assert!(object.get_prototype_of().map_or(false, |p| p.ptr_eq(&proto)));
        assert!(value_of(&object, "hasOwnProperty").map_or(false, |f| f.is_callable()));
    }

    #[test]
    fn test_intrinsics_are_per_realm() {
        let a = Realm::new();
        let b = Realm::new();
        let pa = a.intrinsic(WellKnownIntrinsics::ArrayPrototype);
        let pb = b.intrinsic(WellKnownIntrinsics::ArrayPrototype);
        assert!(!pa.ptr_eq(&pb));
    }

    #[test]
    fn test_global_this_is_the_global_object() {
        let realm = Realm::new();
        let value = realm.evaluate("globalThis", None).unwrap();
        assert!(value.as_object().map_or(false, |o| o.ptr_eq(&realm.global_object())));
    }
}
