//! Native code generation on Cranelift.
//!
//! The pipeline ends here:
//!
//! ```text
//! source → Lexer → Parser → AST → Binder/Lowering → IR → codegen → native code
//! ```
//!
//! Each compilation unit gets its own `JITModule`. Every function of the unit
//! (the script body and all nested functions) is emitted into it as one native
//! function taking a pointer to its [`activation::Activation`] and returning a
//! status code. A [`FunctionTemplate`] ties that entry point to the constants,
//! keys and child templates the code refers to by index.

pub mod activation;
pub mod codegen;
pub(crate) mod helpers;

use std::fmt;
use std::mem;
use std::sync::Arc;

use cranelift_jit::JITModule;
use parking_lot::Mutex;

use crate::runner::compiler::ir::FunctionKind;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::property_key::PropertyKey;
use crate::runner::ds::value::JsValue;

use self::activation::Activation;

pub use self::codegen::generate;

type NativeEntry = extern "C" fn(*mut Activation) -> u32;

/// Address of a finalized native function.
#[derive(Copy, Clone)]
pub(crate) struct EntryPoint(*const u8);

unsafe impl Send for EntryPoint {}
unsafe impl Sync for EntryPoint {}

impl EntryPoint {
    /// # Safety
    /// The address must come from a finalized function of a live [`CodeUnit`]
    /// and `activation` must point to an activation built for that function.
    pub(crate) unsafe fn invoke(self, activation: *mut Activation) -> u32 {
        let func: NativeEntry = mem::transmute(self.0);
        func(activation)
    }
}

/// Owns the executable memory of one compilation unit.
pub(crate) struct CodeUnit {
    module: Option<JITModule>,
}

// Finalized code is never mutated; the module is only touched again when freed.
unsafe impl Send for CodeUnit {}
unsafe impl Sync for CodeUnit {}

impl Drop for CodeUnit {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            unsafe { module.free_memory() };
        }
    }
}

/// Strings of one tagged-template call site.
pub(crate) struct TemplateSite {
    pub(crate) cooked: Vec<Option<Arc<str>>>,
    pub(crate) raw: Vec<Arc<str>>,
    /// The strings array handed out for this site, per realm.
    pub(crate) cache: Mutex<Option<(usize, JsObjectType)>>,
}

/// A compiled function: native code plus the tables it indexes into.
pub struct FunctionTemplate {
    pub name: String,
    pub kind: FunctionKind,
    pub arity: u32,
    pub(crate) entry: EntryPoint,
    pub(crate) unit: Arc<CodeUnit>,
    pub(crate) constants: Vec<JsValue>,
    pub(crate) keys: Vec<PropertyKey>,
    pub(crate) children: Vec<Arc<FunctionTemplate>>,
    /// For each captured cell, its index in the enclosing function's cells.
    pub(crate) captures: Vec<u32>,
    pub(crate) slot_count: u32,
    pub(crate) own_cells: u32,
    pub(crate) template_sites: Vec<TemplateSite>,
    pub(crate) source: Arc<str>,
    pub source_start: u32,
    pub source_end: u32,
}

impl FunctionTemplate {
    /// Source text of the function.
    pub fn source_text(&self) -> &str {
        let start = self.source_start as usize;
        let end = (self.source_end as usize).min(self.source.len());
        self.source.get(start..end).unwrap_or_default()
    }
}

impl fmt::Debug for FunctionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTemplate")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("arity", &self.arity)
            .field("slots", &self.slot_count)
            .field("cells", &self.own_cells)
            .field("children", &self.children.len())
            .finish()
    }
}
