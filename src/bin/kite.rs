//! Command line front end for the kite engine.
//!
//! Usage:
//!   kite <file.js>              # Execute a JavaScript file
//!   kite -e "code"              # Evaluate JavaScript code and print the result
//!   kite                        # Start REPL (interactive mode)

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use log::{Level, LevelFilter, Log, Metadata, Record};

use kite::runner::ds::realm::Realm;
use kite::runner::ds::value::JsValue;
use kite::{EngineConfig, EngineError};

#[derive(Parser)]
#[command(name = "kite")]
#[command(about = "kite - native-code JavaScript engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Script file to run
    file: Option<PathBuf>,
    /// Evaluate CODE and print its completion value
    #[arg(short = 'e', long = "eval", value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,
    /// Engine configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// More log output; repeat for trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Writes log records to stderr.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        eprintln!("[{} {}] {}", tag, record.target(), record.args());
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn init_logging(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured.parse().unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                process::exit(2);
            }
        },
        None => EngineConfig::default(),
    };
    init_logging(cli.verbose, &config.log_level);

    let realm = Realm::with_config(config);
    match (&cli.file, &cli.eval) {
        (Some(path), _) => run_file(&realm, path),
        (None, Some(code)) => eval_code(&realm, code),
        (None, None) => run_repl(&realm),
    }
}

fn report(error: &EngineError) {
    match error {
        EngineError::Compile(e) => {
            eprintln!("{}", e);
            if !e.source_excerpt.is_empty() {
                eprintln!("    {}", e.source_excerpt);
            }
        }
        other => eprintln!("{}", other),
    }
}

fn run_file(realm: &Realm, path: &PathBuf) {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            process::exit(1);
        }
    };
    let location = path.display().to_string();
    if let Err(e) = realm.evaluate(&source, Some(&location)) {
        report(&e);
        process::exit(1);
    }
}

fn eval_code(realm: &Realm, code: &str) {
    match realm.evaluate(code, Some("<eval>")) {
        Ok(value) => {
            if !value.is_undefined() {
                println!("{}", value.inspect());
            }
        }
        Err(e) => {
            report(&e);
            process::exit(1);
        }
    }
}

fn run_repl(realm: &Realm) {
    println!("kite v{} - JavaScript Engine", env!("CARGO_PKG_VERSION"));
    println!("Type JavaScript code and press Enter. Type .exit to quit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
            None => break,
        };
        let input = line.trim();
        if input == ".exit" || input == ".quit" {
            break;
        }
        if input.is_empty() {
            continue;
        }
        // Every line runs against the same global object.
        match realm.evaluate(input, Some("<repl>")) {
            Ok(JsValue::Undefined) => {}
            Ok(value) => println!("{}", value.inspect()),
            Err(e) => report(&e),
        }
    }
}
