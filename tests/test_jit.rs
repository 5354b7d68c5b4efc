extern crate kite;

use kite::runner::ds::operations::object::get;
use kite::runner::ds::object_property::PropertyDescriptor;
use kite::runner::ds::property_key::PropertyKey;
use kite::runner::ds::realm::Realm;
use kite::runner::ds::value::JsValue;
use kite::runner::plugin::config::{EngineConfig, OptLevel};
use kite::{compile, CompileErrorKind, EngineError, InMemoryCodeCache};

fn jit_run_get_var(code: &str, var_name: &str) -> JsValue {
    let realm = Realm::new();
    realm.evaluate(code, Some("jit.js")).unwrap();
    get(&realm, &realm.global_object(), PropertyKey::from(var_name)).unwrap()
}

fn jit_run_get_num(code: &str, var_name: &str) -> f64 {
    match jit_run_get_var(code, var_name) {
        JsValue::Number(n) => n,
        other => panic!("{} was {:?}, expected a number", var_name, other),
    }
}

fn run_with(config: EngineConfig, code: &str) -> Result<JsValue, EngineError> {
    Realm::with_config(config).evaluate(code, None)
}

fn compile_error(code: &str) -> kite::CompileError {
    match compile(code, Some("broken.js"), None, None) {
        Err(EngineError::Compile(e)) => e,
        other => panic!("expected a compile error, got {:?}", other),
    }
}

#[test]
fn test_jit_simple_var() {
    assert_eq!(jit_run_get_num("var x = 42;", "x"), 42.0);
}

#[test]
fn test_jit_nested_for() {
    let code = r#"
var count = 0;
for (var i = 0; i < 3; i = i + 1) {
    for (var j = 0; j < 4; j = j + 1) {
        count = count + 1;
    }
}
"#;
    assert_eq!(jit_run_get_num(code, "count"), 12.0);
}

#[test]
fn test_jit_fibonacci_loop() {
    let code = r#"
var a = 0;
var b = 1;
for (var i = 0; i < 30; i = i + 1) {
    var temp = a;
    a = b;
    b = temp + b;
}
"#;
    assert_eq!(jit_run_get_num(code, "a"), 832040.0);
}

#[test]
fn test_jit_gcd() {
    let code = r#"
function gcd(a, b) { while (b !== 0) { const t = b; b = a % b; a = t; } return a; }
var g = gcd(1071, 462);
"#;
    assert_eq!(jit_run_get_num(code, "g"), 21.0);
}

#[test]
fn test_jit_bitwise_loop() {
    let code = r#"
var bits = 0;
for (var n = 255; n; n = n >>> 1) { bits += n & 1; }
"#;
    assert_eq!(jit_run_get_num(code, "bits"), 8.0);
}

#[test]
fn test_jit_labeled_continue() {
    let code = r#"
var hits = 0;
outer: for (var i = 0; i < 5; i++) {
    for (var j = 0; j < 5; j++) {
        if (j > i) continue outer;
        hits++;
    }
}
"#;
    assert_eq!(jit_run_get_num(code, "hits"), 15.0);
}

#[test]
fn test_jit_switch_fallthrough() {
    let code = r#"
var out = '';
function pick(x) {
    switch (x) {
        case 1: out += 'a';
        case 2: out += 'b'; break;
        default: out += 'd';
        case 3: out += 'c';
    }
}
pick(1); pick(2); pick(3); pick(9);
"#;
    assert_eq!(jit_run_get_var(code, "out"), JsValue::from("abbcdc"));
}

#[test]
fn test_jit_self_tail_calls_run_in_constant_depth() {
    let code = r#"
function down(n, acc) { if (n === 0) return acc; return down(n - 1, acc + 1); }
const count = (n, acc) => { if (n === 0) return acc; return count(n - 1, acc + 1); };
const sum = function (n, acc) { if (n === 0) return acc; return sum(n - 1, acc + n); };
var a = down(100000, 0);
var b = count(100000, 0);
var c = sum(100000, 0);
"#;
    assert_eq!(jit_run_get_num(code, "a"), 100000.0);
    assert_eq!(jit_run_get_num(code, "b"), 100000.0);
    assert_eq!(jit_run_get_num(code, "c"), 5000050000.0);
}

#[test]
fn test_jit_unbound_global_is_undefined_property() {
    assert_eq!(jit_run_get_var("var x = 1;", "y"), JsValue::Undefined);
}

// ============================================================================
// Compilation units
// ============================================================================

#[test]
fn test_compile_is_deterministic() {
    let source = "let s = 0; for (let i = 1; i <= 10; i++) s += i * i; s";
    let first = compile(source, None, None, None).unwrap();
    let second = compile(source, None, None, None).unwrap();
    assert_ne!(first.id(), second.id());
    let a = first.invoke(&Realm::new(), &[]).unwrap();
    let b = second.invoke(&Realm::new(), &[]).unwrap();
    assert_eq!(a, JsValue::Number(385.0));
    assert_eq!(a, b);
}

#[test]
fn test_compiled_unit_runs_in_many_realms() {
    let unit = compile("var runs = (typeof runs === 'number' ? runs : 0) + 1; runs", None, None, None).unwrap();
    let one = Realm::new();
    let two = Realm::new();
    assert_eq!(unit.invoke(&one, &[]).unwrap(), JsValue::Number(1.0));
    assert_eq!(unit.invoke(&one, &[]).unwrap(), JsValue::Number(2.0));
    assert_eq!(unit.invoke(&two, &[]).unwrap(), JsValue::Number(1.0));
}

#[test]
fn test_arg_names_bind_invocation_arguments() {
    let unit = compile("var area = w * h; return area + (extra === undefined ? 0 : extra);", None, Some(&["w", "h", "extra"]), None).unwrap();
    let realm = Realm::new();
    assert_eq!(unit.arity(), 3);
    let result = unit.invoke(&realm, &[JsValue::from(3), JsValue::from(4)]).unwrap();
    assert_eq!(result, JsValue::Number(12.0));
    // Function-body units keep their vars local.
    let leaked = get(&realm, &realm.global_object(), PropertyKey::from("area")).unwrap();
    assert_eq!(leaked, JsValue::Undefined);
}

#[test]
fn test_cache_keys_include_arg_names() {
    let cache = InMemoryCodeCache::new();
    let a = compile("return x;", Some("u.js"), Some(&["x"]), Some(&cache)).unwrap();
    let b = compile("return x;", Some("u.js"), Some(&["x"]), Some(&cache)).unwrap();
    let c = compile("return x;", Some("u.js"), Some(&["y", "x"]), Some(&cache)).unwrap();
    assert_eq!(a.id(), b.id());
    assert_ne!(a.id(), c.id());
    assert_eq!(cache.len(), 2);
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_compiled_unit_as_function_object() {
    let realm = Realm::new();
    let unit = compile("return a + 1;", None, Some(&["a"]), None).unwrap();
    let function = unit.to_function(&realm);
    assert!(function.is_callable());
    realm
        .global_object()
        .define_own_property(PropertyKey::from("plusOne"), PropertyDescriptor::new_data(JsValue::Object(function)));
    assert_eq!(realm.evaluate("plusOne(41)", None).unwrap(), JsValue::Number(42.0));
}

#[test]
fn test_unoptimized_code_gives_same_results() {
    let config = EngineConfig {
        opt_level: OptLevel::None,
        ..EngineConfig::default()
    };
    let code = "function f(n) { let r = 1; while (n > 1) r *= n--; return r; } f(10)";
    assert_eq!(run_with(config, code).unwrap(), JsValue::Number(3628800.0));
}

// ============================================================================
// Limits and failures
// ============================================================================

#[test]
fn test_call_depth_limit_is_range_error() {
    let config = EngineConfig {
        max_call_depth: 32,
        ..EngineConfig::default()
    };
    let code = "function down(n) { return n === 0 ? 0 : 1 + down(n - 1); } down(10)";
    assert_eq!(run_with(config.clone(), code).unwrap(), JsValue::Number(10.0));

    let code = "function down(n) { return n === 0 ? 0 : 1 + down(n - 1); } down(100)";
    let error = run_with(config.clone(), code).unwrap_err();
    assert!(error.to_string().contains("RangeError"), "{}", error);

    let code = "function down(n) { return n === 0 ? 0 : 1 + down(n - 1); } try { down(100) } catch (e) { e instanceof RangeError }";
    assert_eq!(run_with(config, code).unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_compile_error_kinds() {
    assert_eq!(compile_error("let s = 'open").kind, CompileErrorKind::Lex);
    assert_eq!(compile_error("if (").kind, CompileErrorKind::Parse);
    assert_eq!(compile_error("while (x) {}\nbreak nowhere;").kind, CompileErrorKind::Bind);
    assert_eq!(compile_error("with (o) {}").kind, CompileErrorKind::Compile);
    assert_eq!(compile_error("async function* g() {}").kind, CompileErrorKind::Compile);
    assert_eq!(compile_error("({ async *m() {} })").kind, CompileErrorKind::Compile);
}

#[test]
fn test_compile_error_excerpt_and_location() {
    let error = compile_error("let a = 1;\nlet b = 2;\nlet c = ;\n");
    assert_eq!(error.line, 3);
    assert_eq!(error.source_excerpt, "let c = ;");
    assert_eq!(error.location.as_deref(), Some("broken.js"));
    assert!(error.to_string().starts_with("ParseError: "), "{}", error);
    assert!(error.to_string().ends_with("(broken.js:3:9)"), "{}", error);
}
