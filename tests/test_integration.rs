//! Integration tests for whole-language features.
//!
//! These tests run complete scripts through the engine and inspect the
//! completion value or globals left behind.

extern crate kite;

use kite::runner::ds::operations::object::get;
use kite::runner::ds::property_key::PropertyKey;
use kite::runner::ds::realm::Realm;
use kite::runner::ds::value::JsValue;
use kite::{evaluate, EngineError};

/// Helper to run JavaScript code, returning the completion value.
fn run_js(code: &str) -> Result<JsValue, EngineError> {
    evaluate(code, Some("integration.js"))
}

fn run_ok(code: &str) -> JsValue {
    run_js(code).unwrap_or_else(|e| panic!("{} failed: {}", code, e))
}

/// Helper to run JavaScript and read a global afterwards, once queued jobs ran.
fn run_js_get_var(code: &str, var_name: &str) -> JsValue {
    let realm = Realm::new();
    realm
        .evaluate(code, Some("integration.js"))
        .unwrap_or_else(|e| panic!("{} failed: {}", code, e));
    get(&realm, &realm.global_object(), PropertyKey::from(var_name)).unwrap()
}

/// Elements of an array completion value.
fn run_list(code: &str) -> Vec<JsValue> {
    let realm = Realm::new();
    let value = realm.evaluate(code, None).unwrap_or_else(|e| panic!("{} failed: {}", code, e));
    let array = match value.as_object() {
        Some(array) if array.is_array() => array.clone(),
        _ => panic!("{} did not produce an array: {:?}", code, value),
    };
    let length = array.array_length().unwrap_or(0);
    (0..length)
        .map(|i| get(&realm, &array, PropertyKey::Int(i)).unwrap())
        .collect()
}

fn num(n: f64) -> JsValue {
    JsValue::Number(n)
}

fn s(text: &str) -> JsValue {
    JsValue::from(text)
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_while_and_do_while() {
    assert_eq!(run_ok("let i = 0, n = 0; while (i < 10) { i++; if (i % 2) continue; n += i; } n"), num(30.0));
    assert_eq!(run_ok("let i = 10; do { i++; } while (i < 5); i"), num(11.0));
}

#[test]
fn test_labeled_block_break() {
    assert_eq!(run_ok("let r = 'start'; done: { r = 'inside'; break done; r = 'unreachable'; } r"), s("inside"));
}

#[test]
fn test_switch_uses_strict_equality() {
    let code = "
        function kind(v) {
            switch (v) { case '1': return 'string'; case 1: return 'number'; default: return 'other'; }
        }
        kind(1) + ',' + kind('1') + ',' + kind(true);
    ";
    assert_eq!(run_ok(code), s("number,string,other"));
}

#[test]
fn test_switch_lexical_scope() {
    assert_eq!(run_ok("let x = 'outer'; switch (1) { case 1: let x = 'inner'; } x"), s("outer"));
}

#[test]
fn test_nested_finally_order() {
    let code = "
        let log = '';
        outer: for (let i = 0; i < 3; i++) {
            try {
                try { if (i === 1) break outer; log += 'a' + i; }
                finally { log += 'f' + i; }
            } finally { log += 'g' + i; }
        }
        log;
    ";
    assert_eq!(run_ok(code), s("a0f0g0f1g1"));
}

#[test]
fn test_finally_return_overrides() {
    assert_eq!(run_ok("function f() { try { throw 1; } finally { return 2; } } f()"), num(2.0));
    assert_eq!(run_ok("function f() { try { return 1; } finally { return 2; } } f()"), num(2.0));
}

#[test]
fn test_rethrow_from_catch() {
    let code = "
        let seen = '';
        try { try { throw new Error('first'); } catch (e) { seen += e.message; throw new TypeError('second'); } }
        catch (e) { seen += ':' + e.name + ':' + e.message; }
        seen;
    ";
    assert_eq!(run_ok(code), s("first:TypeError:second"));
}

// ============================================================================
// Closures and loops
// ============================================================================

#[test]
fn test_let_loop_bindings_are_per_iteration() {
    let code = "
        const fns = [];
        for (let i = 0; i < 3; i++) fns.push(() => i);
        fns[0]() * 100 + fns[1]() * 10 + fns[2]();
    ";
    assert_eq!(run_ok(code), num(12.0));
}

#[test]
fn test_var_loop_binding_is_shared() {
    let code = "
        const fns = [];
        for (var i = 0; i < 3; i++) fns.push(() => i);
        fns[0]() + fns[2]();
    ";
    assert_eq!(run_ok(code), num(6.0));
}

#[test]
fn test_closure_survives_its_frame() {
    let code = "
        function bank(start) {
            let balance = start;
            return { deposit(n) { balance += n; return balance; }, read: () => balance };
        }
        const a = bank(10), b = bank(100);
        a.deposit(5); b.deposit(1); a.deposit(5);
        a.read() * 1000 + b.read();
    ";
    assert_eq!(run_ok(code), num(20101.0));
}

// ============================================================================
// Objects, classes and super
// ============================================================================

#[test]
fn test_object_literal_features() {
    let code = "
        const k = 'dyn';
        const x = 1;
        const o = { x, [k + 'amic']: 2, 'quoted key': 3, 4: 4, get sum() { return this.x + this.dynamic; } };
        o.sum * 1000 + o['quoted key'] * 100 + o[4];
    ";
    assert_eq!(run_ok(code), num(3304.0));
}

#[test]
fn test_classes_and_super() {
    let code = "
        class Animal {
            constructor(name) { this.name = name; }
            speak() { return this.name + ' makes a sound'; }
            static create(name) { return new this(name); }
        }
        class Dog extends Animal {
            constructor(name) { super(name); this.kind = 'dog'; }
            speak() { return super.speak() + ' (woof)'; }
        }
        const d = Dog.create('Rex');
        [d.speak(), d instanceof Dog, d instanceof Animal, d.kind, Object.getPrototypeOf(Dog) === Animal];
    ";
    assert_eq!(
        run_list(code),
        vec![s("Rex makes a sound (woof)"), JsValue::Boolean(true), JsValue::Boolean(true), s("dog"), JsValue::Boolean(true)]
    );
}

#[test]
fn test_class_accessors_and_static_inheritance() {
    let code = "
        class Temp {
            constructor(c) { this.c = c; }
            get f() { return this.c * 9 / 5 + 32; }
            set f(v) { this.c = (v - 32) * 5 / 9; }
            static unit() { return 'C'; }
        }
        class Sub extends Temp {}
        const t = new Sub(100);
        const before = t.f;
        t.f = 32;
        [before, t.c, Sub.unit()];
    ";
    assert_eq!(run_list(code), vec![num(212.0), num(0.0), s("C")]);
}

#[test]
fn test_class_constructor_requires_new() {
    let error = run_js("class A {} A()").unwrap_err();
    assert!(error.to_string().contains("TypeError"), "{}", error);
}

#[test]
fn test_derived_constructor_must_call_super() {
    let error = run_js("class A {} class B extends A { constructor() {} } new B()").unwrap_err();
    assert!(error.to_string().contains("ReferenceError"), "{}", error);
}

#[test]
fn test_extending_builtins() {
    let code = "
        class MyError extends Error { constructor(m) { super(m); this.name = 'MyError'; } }
        const e = new MyError('boom');
        [e instanceof MyError, e instanceof Error, e.message, e.toString()];
    ";
    assert_eq!(
        run_list(code),
        vec![JsValue::Boolean(true), JsValue::Boolean(true), s("boom"), s("MyError: boom")]
    );
}

#[test]
fn test_new_target() {
    assert_eq!(
        run_ok("function F() { return new.target === F; } const o = new F(); F()"),
        JsValue::Boolean(false)
    );
    assert_eq!(
        run_ok("let seen; function F() { seen = new.target === F; } new F(); seen"),
        JsValue::Boolean(true)
    );
}

// ============================================================================
// Destructuring, spread and rest
// ============================================================================

#[test]
fn test_destructuring() {
    let code = "
        const { a, b: { c = 5 } = {}, ...rest } = { a: 1, d: 4, e: 6 };
        const [x, , y = 10, ...tail] = [1, 2, undefined, 4, 5];
        [a, c, rest.d + rest.e, x, y, tail.length, tail[1]];
    ";
    assert_eq!(
        run_list(code),
        vec![num(1.0), num(5.0), num(10.0), num(1.0), num(10.0), num(2.0), num(5.0)]
    );
}

#[test]
fn test_swap_by_destructuring_assignment() {
    assert_eq!(run_ok("let a = 1, b = 2; [a, b] = [b, a]; a * 10 + b"), num(21.0));
}

#[test]
fn test_destructuring_parameters() {
    assert_eq!(
        run_ok("function f({ x, y = 2 }, [z] = [3]) { return x + y + z; } f({ x: 1 })"),
        num(6.0)
    );
}

#[test]
fn test_destructuring_null_throws() {
    let error = run_js("const { a } = null;").unwrap_err();
    assert!(error.to_string().contains("TypeError"), "{}", error);
}

#[test]
fn test_spread() {
    let code = "
        function sum(...xs) { let t = 0; for (const x of xs) t += x; return t; }
        const parts = [2, 3];
        const all = [1, ...parts, ...'ab'];
        const merged = { ...{ p: 1, q: 2 }, q: 3 };
        [sum(...parts, 4), all.length, all[4], merged.p + merged.q];
    ";
    assert_eq!(run_list(code), vec![num(9.0), num(5.0), s("b"), num(4.0)]);
}

// ============================================================================
// Templates
// ============================================================================

#[test]
fn test_template_literals() {
    assert_eq!(run_ok("const n = 3; `n=${n}, twice=${n * 2}`"), s("n=3, twice=6"));
    assert_eq!(run_ok("`line\\none`"), s("line\none"));
}

#[test]
fn test_tagged_templates() {
    let code = "
        function tag(strings, ...values) {
            return strings.raw[0] + '|' + strings.length + '|' + values[0] + '|' + strings[1];
        }
        tag`a\\n${1 + 1}b`;
    ";
    assert_eq!(run_ok(code), s("a\\n|2|2|b"));
}

#[test]
fn test_template_object_is_cached_per_site() {
    let code = "
        function id(strings) { return strings; }
        function site() { return id`x${1}y`; }
        site() === site();
    ";
    assert_eq!(run_ok(code), JsValue::Boolean(true));
}

// ============================================================================
// Iteration
// ============================================================================

#[test]
fn test_for_in_walks_prototype_chain_once() {
    let code = "
        const base = { shared: 1, shadowed: 1 };
        const o = Object.create(base);
        o.own = 1;
        o.shadowed = 2;
        let keys = '';
        for (const k in o) keys += k + ',';
        keys;
    ";
    assert_eq!(run_ok(code), s("own,shadowed,shared,"));
}

#[test]
fn test_for_in_skips_deleted_keys() {
    let code = "
        const o = { a: 1, b: 2, c: 3 };
        let keys = '';
        for (const k in o) { if (k === 'a') delete o.b; keys += k; }
        keys;
    ";
    assert_eq!(run_ok(code), s("ac"));
}

#[test]
fn test_for_in_with_var_and_assignment_targets() {
    let code = "
        let keys = '';
        for (var k in { a: 1, b: 2, c: 3 }) { if (k === 'c') break; keys += k; }
        for (var n in null) keys += 'never';
        for (k in { d: 1 }) keys += k;
        keys + k;
    ";
    assert_eq!(run_ok(code), s("abdd"));
}

#[test]
fn test_custom_iterables() {
    let code = "
        const range = {
            [Symbol.iterator]() {
                let i = 0;
                return { next: () => ({ value: i, done: i++ >= 3 }) };
            }
        };
        let total = 0;
        for (const v of range) total += v;
        total;
    ";
    assert_eq!(run_ok(code), num(3.0));
}

#[test]
fn test_for_of_break_calls_return() {
    let code = "
        let closed = false;
        const it = {
            [Symbol.iterator]() { return this; },
            next() { return { value: 1, done: false }; },
            return() { closed = true; return {}; }
        };
        for (const v of it) break;
        closed;
    ";
    assert_eq!(run_ok(code), JsValue::Boolean(true));
}

#[test]
fn test_generator_iterated_twice() {
    let code = "
        function* count() { yield 1; yield 2; }
        const g = count();
        let first = 0;
        for (const v of g) first += v;
        let second = 0;
        for (const v of g) second += v;
        const after = g.next();
        [first, second, after.done, after.value];
    ";
    assert_eq!(
        run_list(code),
        vec![num(3.0), num(0.0), JsValue::Boolean(true), JsValue::Undefined]
    );
}

#[test]
fn test_generator_resumed_while_running() {
    let code = "
        function* g() {
            try { it.next(); } catch (e) { yield e.name + ': ' + e.message; }
        }
        var it = g();
        it.next().value;
    ";
    assert_eq!(run_ok(code), s("TypeError: Generator is already running"));
}

#[test]
fn test_generator_protocol() {
    let code = "
        function* g() {
            const got = yield 'first';
            try { yield got * 2; } finally { log += 'cleanup'; }
        }
        var log = '';
        const it = g();
        const a = it.next().value;
        const b = it.next(21).value;
        const c = it.return(7);
        [a, b, c.value, c.done, log];
    ";
    assert_eq!(
        run_list(code),
        vec![s("first"), num(42.0), num(7.0), JsValue::Boolean(true), s("cleanup")]
    );
}

/// The delegated generator's return value is not forwarded.
#[test]
fn test_yield_delegation() {
    let code = "
        function* inner() { yield 1; yield 2; return 'r'; }
        function* outer() { const r = yield* inner(); yield r; }
        let out = '';
        for (const v of outer()) out += v;
        out;
    ";
    assert_eq!(run_ok(code), s("12undefined"));
}

// ============================================================================
// Optional chaining and nullish values
// ============================================================================

#[test]
fn test_optional_chaining() {
    let code = "
        const o = { a: { b: () => 'called' }, n: null };
        [o?.a?.b(), o.n?.x.y.z, o.missing?.(), o.a.b?.(), o.n ?? 'fallback'];
    ";
    assert_eq!(
        run_list(code),
        vec![s("called"), JsValue::Undefined, JsValue::Undefined, s("called"), s("fallback")]
    );
}

#[test]
fn test_optional_member_call_short_circuits_to_undefined() {
    assert_eq!(run_ok("typeof ({}).nope?.()"), s("undefined"));
    assert_eq!(run_ok("const o = {}; o.f?.(1, 2)"), JsValue::Undefined);
    assert_eq!(run_ok("const o = { f: null }; o.f?.()"), JsValue::Undefined);
    assert_eq!(run_ok("const n = null; n?.a.b()"), JsValue::Undefined);
    assert_eq!(run_ok("const o = { n: null }; delete o.n?.x"), JsValue::Boolean(true));
}

#[test]
fn test_optional_call_keeps_this() {
    assert_eq!(run_ok("const o = { v: 5, m() { return this.v; } }; o.m?.()"), num(5.0));
}

// ============================================================================
// Promises and async functions
// ============================================================================

#[test]
fn test_async_await_order() {
    let code = "
        var log = '';
        async function work() {
            log += 'a';
            const v = await 1;
            log += 'c' + v;
            return v + 1;
        }
        work().then(v => { log += 'd' + v; });
        log += 'b';
    ";
    assert_eq!(run_js_get_var(code, "log"), s("abc1d2"));
}

#[test]
fn test_await_rejection_is_catchable() {
    let code = "
        var result;
        async function f() {
            try { await Promise.reject(new Error('nope')); }
            catch (e) { return 'caught ' + e.message; }
        }
        f().then(v => { result = v; });
    ";
    assert_eq!(run_js_get_var(code, "result"), s("caught nope"));
}

#[test]
fn test_async_throw_rejects() {
    let code = "
        var reason;
        async function f() { throw 'bad'; }
        f().catch(r => { reason = r; });
    ";
    assert_eq!(run_js_get_var(code, "reason"), s("bad"));
}

#[test]
fn test_async_arrow_and_method() {
    let code = "
        var total = 0;
        const add = async (a, b) => a + b;
        const o = { async twice(x) { return (await add(x, x)); } };
        o.twice(21).then(v => { total = v; });
    ";
    assert_eq!(run_js_get_var(code, "total"), num(42.0));
}

#[test]
fn test_jobs_run_after_script() {
    let code = "
        var order = '';
        Promise.resolve().then(() => { order += 'job'; });
        order += 'sync';
        var atEnd = order;
    ";
    assert_eq!(run_js_get_var(code, "atEnd"), s("sync"));
    assert_eq!(run_js_get_var(code, "order"), s("syncjob"));
}
