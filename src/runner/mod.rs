//! Compilation and execution.
//!
//! - [`compiler`] lowers the syntax tree into the expression IR
//! - [`jit`] turns the IR into native code on Cranelift
//! - [`ds`] is the value and object model generated code runs against
//! - [`plugin`] and [`std_lib`] register the built-in globals
//! - [`api`] ties the pipeline together

pub mod api;
pub mod compiler;
pub mod ds;
pub mod jit;
pub mod plugin;
pub mod std_lib;
