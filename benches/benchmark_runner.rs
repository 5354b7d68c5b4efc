/// Benchmark runner for the kite engine.
///
/// Times compilation and native execution separately for a fixed set of
/// scripts, then checks every script's completion value.
use std::time::{Duration, Instant};

use kite::runner::ds::realm::Realm;
use kite::runner::ds::value::JsValue;
use kite::{compile, CompiledFunction};

/// Compile `code` `iterations` times; returns the elapsed time and the last unit.
fn run_compile(name: &str, code: &str, iterations: u32) -> (Duration, CompiledFunction) {
    let start = Instant::now();
    let mut compiled = None;
    for _ in 0..iterations {
        compiled = Some(
            compile(code, Some(name), None, None)
                .unwrap_or_else(|e| panic!("Failed to compile benchmark {}: {}", name, e)),
        );
    }
    let elapsed = start.elapsed();
    (elapsed, compiled.expect("at least one iteration"))
}

/// Run an already compiled unit `iterations` times, each in a fresh realm.
fn run_execute(name: &str, compiled: &CompiledFunction, iterations: u32) -> Duration {
    let realms: Vec<Realm> = (0..iterations).map(|_| Realm::new()).collect();
    let start = Instant::now();
    for realm in &realms {
        if let Err(e) = compiled.invoke(realm, &[]) {
            panic!("Benchmark {} failed: {}", name, e);
        }
    }
    start.elapsed()
}

fn completion_value(compiled: &CompiledFunction) -> f64 {
    match compiled.invoke(&Realm::new(), &[]) {
        Ok(JsValue::Number(n)) => n,
        _ => f64::NAN,
    }
}

// ============================================================================
// Benchmark definitions
// ============================================================================

const BENCH_FIBONACCI: &str = r#"
var n = 20;
var a = 0;
var b = 1;
for (var i = 0; i < n; i = i + 1) {
    var temp = a;
    a = b;
    b = temp + b;
}
a;
"#;

const BENCH_LOOP_SUM: &str = r#"
let sum = 0;
for (let i = 0; i < 10000; i++) {
    sum += i;
}
sum;
"#;

const BENCH_NESTED_LOOPS: &str = r#"
let count = 0;
for (let i = 0; i < 100; i++) {
    for (let j = 0; j < 100; j++) {
        count++;
    }
}
count;
"#;

const BENCH_RECURSION: &str = r#"
function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
fib(15);
"#;

const BENCH_CLOSURES: &str = r#"
function counter() {
    let n = 0;
    return () => ++n;
}
let total = 0;
for (let i = 0; i < 100; i++) {
    const next = counter();
    next();
    total += next();
}
total;
"#;

const BENCH_PROPERTY_ACCESS: &str = r#"
const proto = { scale: 3 };
const o = Object.create(proto);
o.x = 1;
let acc = 0;
for (let i = 0; i < 2000; i++) {
    acc += o.x * o.scale;
}
acc;
"#;

const BENCH_GENERATOR: &str = r#"
function* range(n) { for (let i = 0; i < n; i++) yield i; }
let s = 0;
for (const v of range(500)) s += v;
s;
"#;

const BENCH_PRIME_SIEVE: &str = r#"
var count = 0;
for (var n = 2; n < 100; n = n + 1) {
    var isPrime = true;
    for (var i = 2; i * i <= n; i = i + 1) {
        if (n % i === 0) {
            isPrime = false;
            break;
        }
    }
    if (isPrime) {
        count = count + 1;
    }
}
count;
"#;

fn main() {
    println!("=======================================================");
    println!("  kite JavaScript Engine - Performance Benchmarks");
    println!("  Compile (parse + lower + Cranelift) vs Execute");
    println!("=======================================================\n");

    let benchmarks: Vec<(&str, &str, u32, f64)> = vec![
        ("Fibonacci (n=20)", BENCH_FIBONACCI, 200, 6765.0),
        ("Loop Sum (10K iterations)", BENCH_LOOP_SUM, 100, 49995000.0),
        ("Nested Loops (100x100)", BENCH_NESTED_LOOPS, 100, 10000.0),
        ("Recursive fib(15)", BENCH_RECURSION, 100, 610.0),
        ("Closures (100 counters)", BENCH_CLOSURES, 100, 200.0),
        ("Prototype reads (2K)", BENCH_PROPERTY_ACCESS, 100, 6000.0),
        ("Generator (500 yields)", BENCH_GENERATOR, 50, 124750.0),
        ("Prime Sieve (<100)", BENCH_PRIME_SIEVE, 200, 25.0),
    ];

    println!("{:<30} {:>14} {:>14} {:>8}", "Benchmark", "Compile", "Execute", "Check");
    println!("{}", "-".repeat(70));

    let mut total_compile = Duration::ZERO;
    let mut total_execute = Duration::ZERO;

    for (name, code, iterations, expected) in &benchmarks {
        let (compile_dur, compiled) = run_compile(name, code, *iterations);
        let execute_dur = run_execute(name, &compiled, *iterations);
        total_compile += compile_dur;
        total_execute += execute_dur;

        let actual = completion_value(&compiled);
        let status = if actual == *expected { "ok" } else { "FAIL" };
        println!(
            "{:<30} {:>12.2?} {:>12.2?} {:>8}",
            name, compile_dur, execute_dur, status
        );
        if actual != *expected {
            println!("    expected {}, got {}", expected, actual);
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:<30} {:>12.2?} {:>12.2?}",
        "TOTAL", total_compile, total_execute
    );
}
