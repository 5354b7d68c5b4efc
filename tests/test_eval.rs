//! End-to-end evaluation tests.
//!
//! Every test goes through the whole pipeline: parse, lower, Cranelift
//! codegen and native execution against a fresh realm.

extern crate kite;

use kite::runner::ds::realm::Realm;
use kite::runner::ds::value::JsValue;
use kite::{evaluate, EngineError};

fn eval(code: &str) -> JsValue {
    evaluate(code, Some("test.js")).unwrap_or_else(|e| panic!("{} failed: {}", code, e))
}

fn eval_error(code: &str) -> EngineError {
    match evaluate(code, Some("test.js")) {
        Ok(value) => panic!("{} should fail, got {:?}", code, value),
        Err(e) => e,
    }
}

fn num(n: f64) -> JsValue {
    JsValue::Number(n)
}

fn string(s: &str) -> JsValue {
    JsValue::from(s)
}

// ============================================================================
// Literals and operators
// ============================================================================

mod operator_tests {
    use super::*;

    #[test]
    fn test_addition() {
        assert_eq!(eval("2+2"), num(4.0));
    }

    #[test]
    fn test_typeof_undefined() {
        assert_eq!(eval("typeof undefined"), string("undefined"));
    }

    #[test]
    fn test_typeof_values() {
        assert_eq!(eval("typeof null"), string("object"));
        assert_eq!(eval("typeof function() {}"), string("function"));
        assert_eq!(eval("typeof Symbol()"), string("symbol"));
        assert_eq!(eval("typeof 'x'"), string("string"));
        assert_eq!(eval("typeof notDeclaredAnywhere"), string("undefined"));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval("'a' + 1 + 2"), string("a12"));
        assert_eq!(eval("1 + 2 + 'a'"), string("3a"));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("7 % 3"), num(1.0));
        assert_eq!(eval("2 ** 10"), num(1024.0));
        assert_eq!(eval("2 ** 3 ** 2"), num(512.0));
        assert_eq!(eval("-7 / 2"), num(-3.5));
        assert!(matches!(eval("0 / 0"), JsValue::Number(n) if n.is_nan()));
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(eval("5 & 3"), num(1.0));
        assert_eq!(eval("5 | 3"), num(7.0));
        assert_eq!(eval("5 ^ 3"), num(6.0));
        assert_eq!(eval("~5"), num(-6.0));
        assert_eq!(eval("1 << 4"), num(16.0));
        assert_eq!(eval("-16 >> 2"), num(-4.0));
        assert_eq!(eval("-1 >>> 28"), num(15.0));
    }

    #[test]
    fn test_equality() {
        assert_eq!(eval("1 == '1'"), JsValue::Boolean(true));
        assert_eq!(eval("1 === '1'"), JsValue::Boolean(false));
        assert_eq!(eval("null == undefined"), JsValue::Boolean(true));
        assert_eq!(eval("null === undefined"), JsValue::Boolean(false));
        assert_eq!(eval("NaN === NaN"), JsValue::Boolean(false));
    }

    #[test]
    fn test_comparison() {
        assert_eq!(eval("'a' < 'b'"), JsValue::Boolean(true));
        assert_eq!(eval("2 < '10'"), JsValue::Boolean(true));
        assert_eq!(eval("NaN < 1"), JsValue::Boolean(false));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(eval("0 || 'x'"), string("x"));
        assert_eq!(eval("1 && 'y'"), string("y"));
        assert_eq!(eval("null ?? 5"), num(5.0));
        assert_eq!(eval("0 ?? 5"), num(0.0));
    }

    #[test]
    fn test_update_expressions() {
        assert_eq!(eval("let i = 1; let j = i++; j * 10 + i"), num(12.0));
        assert_eq!(eval("let i = 1; let j = ++i; j * 10 + i"), num(22.0));
    }

    #[test]
    fn test_compound_and_logical_assignment() {
        assert_eq!(eval("let a = 2; a *= 5; a -= 1; a"), num(9.0));
        assert_eq!(eval("let a = null; a ??= 3; a"), num(3.0));
        assert_eq!(eval("let a = 0; a ||= 4; a"), num(4.0));
        assert_eq!(eval("let a = 1; a &&= 6; a"), num(6.0));
    }

    #[test]
    fn test_in_and_instanceof() {
        assert_eq!(eval("'x' in { x: 1 }"), JsValue::Boolean(true));
        assert_eq!(eval("class A {} new A() instanceof A"), JsValue::Boolean(true));
        assert_eq!(eval("[] instanceof Object"), JsValue::Boolean(true));
    }
}

// ============================================================================
// Bindings and scope
// ============================================================================

mod scope_tests {
    use super::*;

    #[test]
    fn test_block_scoped_shadowing() {
        assert_eq!(eval("let a=1; { let a=2; } return a;"), num(1.0));
    }

    #[test]
    fn test_inner_mutation_does_not_leak() {
        assert_eq!(eval("let a = 1; { let a = 2; a = 3; } a"), num(1.0));
    }

    #[test]
    fn test_var_is_function_scoped() {
        assert_eq!(eval("function f() { if (true) { var x = 5; } return x; } f()"), num(5.0));
    }

    #[test]
    fn test_function_declarations_are_hoisted() {
        assert_eq!(eval("var r = f(); function f() { return 7; } r"), num(7.0));
    }

    #[test]
    fn test_top_level_var_becomes_global_property() {
        assert_eq!(eval("var g = 3; globalThis.g"), num(3.0));
        assert_eq!(eval("let l = 3; globalThis.l"), JsValue::Undefined);
    }

    #[test]
    fn test_const_assignment_throws_type_error() {
        let error = eval_error("const c = 1; c = 2;");
        assert!(error.to_string().contains("TypeError"), "{}", error);
    }

    #[test]
    fn test_undeclared_read_is_reference_error() {
        let error = eval_error("missingName + 1");
        assert!(error.to_string().contains("ReferenceError"), "{}", error);
        assert!(error.to_string().contains("missingName"), "{}", error);
    }

    #[test]
    fn test_assignment_to_undeclared_creates_global() {
        assert_eq!(eval("function f() { created = 4; } f(); created"), num(4.0));
    }
}

// ============================================================================
// Functions and closures
// ============================================================================

mod function_tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        assert_eq!(eval("function a(b=2){return b} a()===2"), JsValue::Boolean(true));
        assert_eq!(eval("function a(b=2){return b} a(1)===1"), JsValue::Boolean(true));
    }

    #[test]
    fn test_rest_parameters() {
        assert_eq!(eval("function f(a, ...rest) { return rest.length * 10 + a; } f(1, 2, 3)"), num(21.0));
    }

    #[test]
    fn test_counter_closures_do_not_share_state() {
        let code = "
            function makeCounter() { let n = 0; return function() { n = n + 1; return n; }; }
            const a = makeCounter();
            const b = makeCounter();
            const first = a();
            const second = a();
            const other = b();
            first * 100 + second * 10 + other;
        ";
        assert_eq!(eval(code), num(121.0));
    }

    #[test]
    fn test_arrow_functions_capture_this() {
        let code = "
            const o = { v: 42, get() { return (() => this.v)(); } };
            o.get();
        ";
        assert_eq!(eval(code), num(42.0));
    }

    #[test]
    fn test_plain_call_has_undefined_this() {
        assert_eq!(eval("function f() { return this; } f()"), JsValue::Undefined);
    }

    #[test]
    fn test_arguments_object() {
        assert_eq!(eval("function f() { return arguments.length + arguments[1]; } f(1, 10, 100)"), num(13.0));
    }

    #[test]
    fn test_named_function_expression_binds_own_name() {
        assert_eq!(
            eval("const fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); }; fact(5)"),
            num(120.0)
        );
    }

    #[test]
    fn test_function_name_and_length() {
        assert_eq!(eval("const f = function(a, b) {}; f.name"), string("f"));
        assert_eq!(eval("function g(a, b = 1, ...c) {} g.length"), num(1.0));
    }

    #[test]
    fn test_recursion() {
        assert_eq!(eval("function fib(n) { return n < 2 ? n : fib(n-1) + fib(n-2); } fib(20)"), num(6765.0));
    }

    #[test]
    fn test_runaway_recursion_is_range_error() {
        let error = eval_error("function f() { return f(); } f()");
        assert!(error.to_string().contains("RangeError"), "{}", error);
    }
}

// ============================================================================
// Errors
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_calling_non_function_is_catchable_type_error() {
        let code = "
            let caught;
            try { const x = 5; x(); } catch (e) { caught = e; }
            caught instanceof TypeError ? caught.message : 'wrong type';
        ";
        let message = eval(code);
        assert!(matches!(&message, JsValue::String(s) if &**s == "5 is not a function"), "{:?}", message);
    }

    #[test]
    fn test_uncaught_call_of_non_function() {
        let error = eval_error("let v = 'text'; v();");
        assert!(error.is_runtime());
        let text = error.to_string();
        assert!(text.contains("TypeError"), "{}", text);
        assert!(text.contains("\"text\""), "{}", text);
    }

    #[test]
    fn test_property_of_null() {
        let error = eval_error("null.x");
        assert!(error.to_string().contains("Cannot read properties of null"), "{}", error);
    }

    #[test]
    fn test_throw_any_value() {
        match eval_error("throw 42") {
            EngineError::Runtime { value, .. } => assert_eq!(value, num(42.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_finally_runs_on_every_path() {
        let code = "
            let log = '';
            function f() { try { return 'r'; } finally { log += 'f'; } }
            const r = f();
            try { try { throw 1; } finally { log += 'g'; } } catch (e) { log += e; }
            log + r;
        ";
        assert_eq!(eval(code), string("fg1r"));
    }

    #[test]
    fn test_catch_without_binding() {
        assert_eq!(eval("let x = 0; try { null.y; } catch { x = 1; } x"), num(1.0));
    }

    #[test]
    fn test_error_object_fields() {
        assert_eq!(eval("new RangeError('bad').toString()"), string("RangeError: bad"));
        assert_eq!(eval("try { undefined.p } catch (e) { e.name }"), string("TypeError"));
    }
}

// ============================================================================
// Realms
// ============================================================================

mod realm_tests {
    use super::*;

    #[test]
    fn test_realm_keeps_globals_between_evaluations() {
        let realm = Realm::new();
        realm.evaluate("var total = 1;", None).unwrap();
        realm.evaluate("total = total + 41;", None).unwrap();
        assert_eq!(realm.evaluate("total", None).unwrap(), num(42.0));
    }

    #[test]
    fn test_realms_are_isolated() {
        let a = Realm::new();
        let b = Realm::new();
        a.evaluate("var shared = 1;", None).unwrap();
        assert_eq!(b.evaluate("typeof shared", None).unwrap(), string("undefined"));
    }
}
