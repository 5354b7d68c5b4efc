//! Tests for the built-in library and its registry.
//!
//! These tests verify the built-in objects installed into every realm
//! (Object, Function, the Error family, Symbol, Array, Promise and RegExp)
//! and the registration API hosts use to add or replace them.

extern crate kite;

use kite::runner::ds::operations::object::{call, get};
use kite::runner::ds::property_key::PropertyKey;
use kite::runner::ds::realm::Realm;
use kite::runner::ds::value::JsValue;
use kite::runner::plugin::config::EngineConfig;
use kite::runner::plugin::registry::{BuiltInRegistry, RegistryError};
use kite::runner::plugin::types::{BuiltInFn, BuiltInObject};
use kite::evaluate;

fn eval(code: &str) -> JsValue {
    evaluate(code, Some("std_lib.js")).unwrap_or_else(|e| panic!("{} failed: {}", code, e))
}

fn eval_error(code: &str) -> String {
    match evaluate(code, Some("std_lib.js")) {
        Ok(value) => panic!("{} should throw, got {:?}", code, value),
        Err(e) => e.to_string(),
    }
}

fn t() -> JsValue {
    JsValue::Boolean(true)
}

// ============================================================================
// Object
// ============================================================================

mod object_tests {
    use super::*;

    #[test]
    fn test_object_keys_values_entries() {
        assert_eq!(eval("Object.keys({ b: 1, a: 2, 1: 3 }).length"), JsValue::from(3));
        assert_eq!(eval("Object.keys({ b: 1, a: 2, 1: 3 })[0]"), JsValue::from("1"));
        assert_eq!(eval("Object.values({ x: 5, y: 6 })[1]"), JsValue::from(6));
        assert_eq!(eval("const [k, v] = Object.entries({ x: 5 })[0]; k + v"), JsValue::from("x5"));
    }

    #[test]
    fn test_object_keys_skip_non_enumerable() {
        assert_eq!(
            eval("const o = { a: 1 }; Object.defineProperty(o, 'hidden', { value: 2 }); Object.keys(o).length"),
            JsValue::from(1)
        );
        assert_eq!(
            eval("const o = { a: 1 }; Object.defineProperty(o, 'hidden', { value: 2 }); Object.getOwnPropertyNames(o).length"),
            JsValue::from(2)
        );
    }

    #[test]
    fn test_object_assign() {
        assert_eq!(
            eval("const t = { a: 1 }; const r = Object.assign(t, { b: 2 }, null, { a: 3 }); r === t && t.a * 10 + t.b"),
            JsValue::from(32)
        );
    }

    #[test]
    fn test_object_create() {
        assert_eq!(eval("const p = { hi() { return 'hi'; } }; Object.create(p).hi()"), JsValue::from("hi"));
        assert_eq!(eval("Object.getPrototypeOf(Object.create(null))"), JsValue::Null);
        assert_eq!(
            eval("const o = Object.create({}, { x: { value: 7, enumerable: true } }); o.x"),
            JsValue::from(7)
        );
        assert!(eval_error("Object.create(1)").contains("TypeError"));
    }

    #[test]
    fn test_define_property_read_only() {
        let code = "
            const o = {};
            Object.defineProperty(o, 'fixed', { value: 1, writable: false });
            o.fixed = 2;
            o.fixed;
        ";
        assert_eq!(eval(code), JsValue::from(1));
    }

    #[test]
    fn test_define_property_accessor() {
        let code = "
            const o = { raw: 2 };
            Object.defineProperty(o, 'doubled', { get() { return this.raw * 2; }, enumerable: false });
            o.doubled + Object.keys(o).length;
        ";
        assert_eq!(eval(code), JsValue::from(5));
    }

    #[test]
    fn test_set_prototype_of() {
        assert_eq!(
            eval("const o = {}; Object.setPrototypeOf(o, { v: 9 }); o.v"),
            JsValue::from(9)
        );
    }

    #[test]
    fn test_freeze() {
        assert_eq!(eval("const o = Object.freeze({ a: 1 }); delete o.a; o.a"), JsValue::from(1));
        assert_eq!(eval("Object.isFrozen({ a: 1 })"), JsValue::Boolean(false));
    }

    #[test]
    fn test_prototype_methods() {
        assert_eq!(eval("({ a: 1 }).hasOwnProperty('a')"), t());
        assert_eq!(eval("({ a: 1 }).hasOwnProperty('toString')"), JsValue::Boolean(false));
        assert_eq!(eval("const p = {}; p.isPrototypeOf(Object.create(p))"), t());
        assert_eq!(eval("({}).toString()"), JsValue::from("[object Object]"));
        assert_eq!(eval("Object.prototype.toString.call([])"), JsValue::from("[object Array]"));
        assert_eq!(eval("Object.prototype.toString.call(null)"), JsValue::from("[object Null]"));
        assert_eq!(
            eval("({ [Symbol.toStringTag]: 'Custom' }).toString()"),
            JsValue::from("[object Custom]")
        );
    }
}

// ============================================================================
// Function
// ============================================================================

mod function_tests {
    use super::*;

    #[test]
    fn test_call_and_apply() {
        assert_eq!(eval("function f(a, b) { return this.v + a + b; } f.call({ v: 1 }, 2, 3)"), JsValue::from(6));
        assert_eq!(eval("function f(a, b) { return this.v + a + b; } f.apply({ v: 1 }, [2, 3])"), JsValue::from(6));
        assert_eq!(eval("function f() { return arguments.length; } f.apply(null)"), JsValue::from(0));
    }

    #[test]
    fn test_bind() {
        let code = "
            function f(a, b, c) { return this.base + a + b + c; }
            const g = f.bind({ base: 100 }, 1);
            [g(2, 3), g.name, g.length];
        ";
        let realm = Realm::new();
        let value = realm.evaluate(code, None).unwrap();
        let list = value.as_object().unwrap();
        let at = |i| get(&realm, list, PropertyKey::Int(i)).unwrap();
        assert_eq!(at(0), JsValue::from(106));
        assert_eq!(at(1), JsValue::from("bound f"));
        assert_eq!(at(2), JsValue::from(2));
    }

    #[test]
    fn test_bound_function_as_constructor() {
        let code = "
            function P(x, y) { this.x = x; this.y = y; }
            const Bound = P.bind(null, 1);
            const p = new Bound(2);
            p instanceof P && p.x * 10 + p.y;
        ";
        assert_eq!(eval(code), JsValue::from(12));
    }

    #[test]
    fn test_function_constructor() {
        assert_eq!(eval("const add = new Function('a', 'b', 'return a + b;'); add(2, 3)"), JsValue::from(5));
        assert_eq!(eval("Function('return 7')()"), JsValue::from(7));
        assert_eq!(eval("Function('a, b', 'return a * b')(6, 7)"), JsValue::from(42));
        assert!(eval_error("new Function('return (')").contains("SyntaxError"));
    }

    #[test]
    fn test_function_to_string() {
        assert_eq!(
            eval("function add(a, b) { return a + b; } add.toString()"),
            JsValue::from("function add(a, b) { return a + b; }")
        );
        let native = eval("Object.keys.toString()");
        assert!(matches!(&native, JsValue::String(s) if s.contains("[native code]")), "{:?}", native);
    }

    #[test]
    fn test_call_on_non_function() {
        assert!(eval_error("Function.prototype.call.call(1)").contains("TypeError"));
    }
}

// ============================================================================
// Errors
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_error_fields() {
        assert_eq!(eval("new Error('m').message"), JsValue::from("m"));
        assert_eq!(eval("new Error().message"), JsValue::from(""));
        assert_eq!(eval("new TypeError('t').name"), JsValue::from("TypeError"));
        assert_eq!(eval("Error('no new').message"), JsValue::from("no new"));
        assert_eq!(eval("new Error('x', { cause: 'why' }).cause"), JsValue::from("why"));
    }

    #[test]
    fn test_error_to_string() {
        assert_eq!(eval("new Error('boom').toString()"), JsValue::from("Error: boom"));
        assert_eq!(eval("new SyntaxError().toString()"), JsValue::from("SyntaxError"));
        assert_eq!(
            eval("Error.prototype.toString.call({ name: 'Custom', message: 'msg' })"),
            JsValue::from("Custom: msg")
        );
    }

    #[test]
    fn test_error_hierarchy() {
        assert_eq!(eval("new RangeError() instanceof Error"), t());
        assert_eq!(eval("new ReferenceError() instanceof TypeError"), JsValue::Boolean(false));
        assert_eq!(eval("Object.getPrototypeOf(TypeError.prototype) === Error.prototype"), t());
    }

    #[test]
    fn test_engine_errors_are_instances() {
        assert_eq!(eval("try { null.x } catch (e) { e instanceof TypeError }"), t());
        assert_eq!(eval("try { nope } catch (e) { e instanceof ReferenceError }"), t());
    }
}

// ============================================================================
// Symbol
// ============================================================================

mod symbol_tests {
    use super::*;

    #[test]
    fn test_symbols_are_unique() {
        assert_eq!(eval("Symbol('a') === Symbol('a')"), JsValue::Boolean(false));
        assert_eq!(eval("const s = Symbol('a'); s === s"), t());
    }

    #[test]
    fn test_symbol_registry() {
        assert_eq!(eval("Symbol.for('app') === Symbol.for('app')"), t());
        assert_eq!(eval("Symbol.keyFor(Symbol.for('app'))"), JsValue::from("app"));
        assert_eq!(eval("Symbol.keyFor(Symbol('local'))"), JsValue::Undefined);
    }

    #[test]
    fn test_symbol_description() {
        assert_eq!(eval("Symbol('desc').toString()"), JsValue::from("Symbol(desc)"));
        assert_eq!(eval("Symbol.iterator.toString()"), JsValue::from("Symbol(Symbol.iterator)"));
    }

    #[test]
    fn test_symbol_keys() {
        let code = "
            const s = Symbol('k');
            const o = { [s]: 1, plain: 2 };
            o[s] + Object.keys(o).length;
        ";
        assert_eq!(eval(code), JsValue::from(2));
    }

    #[test]
    fn test_symbol_is_not_a_constructor() {
        assert!(eval_error("new Symbol()").contains("TypeError"));
    }

    #[test]
    fn test_has_instance() {
        assert_eq!(
            eval("const Even = { [Symbol.hasInstance](n) { return n % 2 === 0; } }; 4 instanceof Even"),
            t()
        );
    }
}

// ============================================================================
// Array, iterators and RegExp
// ============================================================================

mod array_tests {
    use super::*;

    #[test]
    fn test_array_constructor() {
        assert_eq!(eval("new Array(3).length"), JsValue::from(3));
        assert_eq!(eval("0 in new Array(3)"), JsValue::Boolean(false));
        assert_eq!(eval("Array(1, 2).length"), JsValue::from(2));
        assert!(eval_error("new Array(-1)").contains("RangeError"));
    }

    #[test]
    fn test_push_returns_length() {
        assert_eq!(eval("const a = [1]; a.push(2, 3)"), JsValue::from(3));
    }

    #[test]
    fn test_array_iterator_protocol() {
        let code = "
            const it = [10, 20][Symbol.iterator]();
            const a = it.next(), b = it.next(), c = it.next();
            a.value + b.value + (c.done ? 1 : 0);
        ";
        assert_eq!(eval(code), JsValue::from(31));
        assert_eq!(
            eval("Object.prototype.toString.call([][Symbol.iterator]())"),
            JsValue::from("[object Array Iterator]")
        );
    }

    #[test]
    fn test_string_iteration() {
        assert_eq!(eval("let n = 0; for (const c of 'héllo') n++; n"), JsValue::from(5));
    }

    #[test]
    fn test_regexp() {
        assert_eq!(eval("/ab+c/gi.toString()"), JsValue::from("/ab+c/gi"));
        assert_eq!(eval("new RegExp('x', 'm').flags"), JsValue::from("m"));
        assert_eq!(eval("/a/.lastIndex"), JsValue::from(0));
        assert!(eval_error("new RegExp('a', 'gg')").contains("SyntaxError"));
        assert!(eval_error("new RegExp('a', 'z')").contains("SyntaxError"));
    }
}

// ============================================================================
// Promise
// ============================================================================

mod promise_tests {
    use super::*;

    fn settle(code: &str) -> JsValue {
        let realm = Realm::new();
        realm.evaluate(code, None).unwrap_or_else(|e| panic!("{} failed: {}", code, e));
        get(&realm, &realm.global_object(), PropertyKey::from("out")).unwrap()
    }

    #[test]
    fn test_then_chain() {
        assert_eq!(
            settle("var out; Promise.resolve(1).then(v => v + 1).then(v => { out = v * 10; });"),
            JsValue::from(20)
        );
    }

    #[test]
    fn test_executor_resolution() {
        assert_eq!(
            settle("var out; new Promise((resolve, reject) => { resolve('ok'); reject('ignored'); }).then(v => { out = v; });"),
            JsValue::from("ok")
        );
    }

    #[test]
    fn test_executor_throw_rejects() {
        assert_eq!(
            settle("var out; new Promise(() => { throw new Error('e'); }).catch(e => { out = e.message; });"),
            JsValue::from("e")
        );
    }

    #[test]
    fn test_finally_passes_value_through() {
        assert_eq!(
            settle("var out = ''; Promise.resolve('v').finally(() => { out += 'f'; }).then(v => { out += v; });"),
            JsValue::from("fv")
        );
    }

    #[test]
    fn test_resolve_adopts_thenables() {
        let code = "
            var out;
            const thenable = { then(resolve) { resolve(42); } };
            Promise.resolve(thenable).then(v => { out = v; });
        ";
        assert_eq!(settle(code), JsValue::from(42));
    }

    #[test]
    fn test_resolve_returns_same_promise() {
        assert_eq!(eval("const p = Promise.resolve(1); Promise.resolve(p) === p"), t());
    }

    #[test]
    fn test_promise_requires_new() {
        assert!(eval_error("Promise(() => {})").contains("TypeError"));
    }

    #[test]
    fn test_unhandled_rejection_does_not_fail_script() {
        assert_eq!(eval("Promise.reject(1); 'done'"), JsValue::from("done"));
    }
}

// ============================================================================
// Registry
// ============================================================================

mod registry_tests {
    use super::*;

    #[test]
    fn test_core_registry_contents() {
        let registry = BuiltInRegistry::with_core();
        for name in ["Object", "Function", "Error", "TypeError", "Symbol", "Array", "Promise", "RegExp"] {
            assert!(registry.has_object(name), "{} missing", name);
        }
        assert!(registry.has_method("Object", "keys"));
        assert!(registry.has_method("Function", "bind"));
        assert!(!registry.has_method("Object", "nonexistent"));
        assert!(registry.get_constructor("Promise").is_some());
    }

    #[test]
    fn test_registered_objects_are_installed() {
        let mut registry = BuiltInRegistry::with_core();
        registry.register_object(
            BuiltInObject::new("Host")
                .add_static("twice", 1, |_realm, _this, args| {
                    Ok(JsValue::Number(args.first().and_then(|v| v.as_number()).unwrap_or(0.0) * 2.0))
                })
                .add_property("version", JsValue::from("1.0")),
        );
        registry.register_value("ANSWER", JsValue::from(42));
        let realm = Realm::with_registry(EngineConfig::default(), &registry);
        assert_eq!(realm.evaluate("Host.twice(ANSWER)", None).unwrap(), JsValue::from(84));
        assert_eq!(realm.evaluate("Host.version", None).unwrap(), JsValue::from("1.0"));
        assert_eq!(realm.evaluate("ANSWER = 1; ANSWER", None).unwrap(), JsValue::from(42));
    }

    #[test]
    fn test_registered_constructor_gets_prototype() {
        let mut registry = BuiltInRegistry::with_core();
        registry.register_object(
            BuiltInObject::new("Counter")
                .with_constructor(
                    |_realm, this, _args| {
                        if let JsValue::Object(o) = &this {
                            o.define_own_property(
                                PropertyKey::from("count"),
                                kite::runner::ds::object_property::PropertyDescriptor::new_data(JsValue::from(0)),
                            );
                        }
                        Ok(this)
                    },
                    0,
                )
                .add_method("describe", 0, |_realm, _this, _args| Ok(JsValue::from("counter")))
                .add_prototype_property("kind", JsValue::from("tally")),
        );
        let realm = Realm::with_registry(EngineConfig::default(), &registry);
        let code = "const c = new Counter(); [c instanceof Counter, c.count, c.describe(), c.kind]";
        let value = realm.evaluate(code, None).unwrap();
        let list = value.as_object().unwrap();
        let at = |i| get(&realm, list, PropertyKey::Int(i)).unwrap();
        assert_eq!(at(0), t());
        assert_eq!(at(1), JsValue::from(0));
        assert_eq!(at(2), JsValue::from("counter"));
        assert_eq!(at(3), JsValue::from("tally"));
    }

    #[test]
    fn test_override_method() {
        let mut registry = BuiltInRegistry::with_core();
        registry
            .override_method(
                "Object",
                "keys",
                BuiltInFn::closure(|_realm, _this, _args| Ok(JsValue::from("overridden"))),
            )
            .unwrap();
        assert_eq!(registry.override_count("Object", "keys"), 1);
        let realm = Realm::with_registry(EngineConfig::default(), &registry);
        assert_eq!(realm.evaluate("Object.keys({})", None).unwrap(), JsValue::from("overridden"));
    }

    #[test]
    fn test_override_unknown_method_fails() {
        let mut registry = BuiltInRegistry::with_core();
        let noop = BuiltInFn::closure(|_realm, _this, _args| Ok(JsValue::Undefined));
        assert!(matches!(
            registry.override_method("Nope", "x", noop.clone()),
            Err(RegistryError::ObjectNotFound(_))
        ));
        assert!(matches!(
            registry.override_method("Object", "nope", noop),
            Err(RegistryError::MethodNotFound(..))
        ));
    }

    #[test]
    fn test_unregister_object() {
        let mut registry = BuiltInRegistry::with_core();
        assert!(registry.unregister_object("RegExp").is_some());
        assert!(!registry.has_object("RegExp"));
        let realm = Realm::with_registry(EngineConfig::default(), &registry);
        assert_eq!(realm.evaluate("typeof RegExp", None).unwrap(), JsValue::from("undefined"));
    }

    #[test]
    fn test_disabled_builtins() {
        let config = EngineConfig {
            disabled_builtins: vec!["Promise".to_string()],
            ..EngineConfig::default()
        };
        let realm = Realm::with_config(config);
        assert_eq!(realm.evaluate("typeof Promise", None).unwrap(), JsValue::from("undefined"));
        assert_eq!(realm.evaluate("typeof Object", None).unwrap(), JsValue::from("function"));
    }

    #[test]
    fn test_native_registration_on_realm() {
        let realm = Realm::new();
        let target = realm.new_object();
        realm.register_native(&target, PropertyKey::from("greet"), "greet", 1, |_realm, _this, args| {
            Ok(JsValue::from(format!("hello {}", args.first().cloned().unwrap_or(JsValue::Undefined))))
        });
        let greet = get(&realm, &target, PropertyKey::from("greet")).unwrap();
        let result = call(&realm, &greet, JsValue::Undefined, &[JsValue::from("kite")]).unwrap();
        assert_eq!(result, JsValue::from("hello kite"));
        let name = get(&realm, greet.as_object().unwrap(), PropertyKey::from("name")).unwrap();
        assert_eq!(name, JsValue::from("greet"));
    }
}
