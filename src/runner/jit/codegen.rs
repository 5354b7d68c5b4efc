//! IR to Cranelift lowering.
//!
//! One pass per function. Variables that no closure captures live in the
//! activation's slot array; captured ones live in heap cells. Temporaries are
//! allocated in slots above the variables with a simple stack discipline. All
//! value manipulation goes through runtime helpers; the generated code itself
//! only sequences helper calls and branches on their status codes.

use std::sync::Arc;

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::{types, AbiParam, Block, FuncRef, Function, InstBuilder, Signature, UserFuncName, Value};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{default_libcall_names, FuncId, Linkage, Module};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::CompileError;
use crate::runner::compiler::ir::{
    Args, ArrayElement, Binding, BinaryOp, Callee, CatchClause, ErrorKind, Expr, FunctionKind, IrFunction,
    LabelId, Literal, LogicalOp, MemberKey, MethodKind, PropertyInit, UnaryOp,
};
use crate::runner::ds::property_key::PropertyKey;
use crate::runner::ds::value::JsValue;
use crate::runner::jit::activation::{STATUS_AWAIT, STATUS_RETURN, STATUS_THROW, STATUS_YIELD};
use crate::runner::jit::helpers::{Helper, NONE};
use crate::runner::jit::{CodeUnit, EntryPoint, FunctionTemplate, TemplateSite};
use crate::runner::plugin::config::EngineConfig;

/// Completion codes of a `try ... finally` region, stored in its kind slot.
const LEAVE_NORMAL: u32 = 0;
const LEAVE_THROW: u32 = 1;
const LEAVE_RETURN: u32 = 2;
const LEAVE_GOTO: u32 = 3;

/// Compiles `ir` and every function nested in it into one code unit.
pub fn generate(
    ir: &IrFunction,
    source: Arc<str>,
    config: &EngineConfig,
) -> Result<Arc<FunctionTemplate>, CompileError> {
    let mut module = new_module(config)?;
    let helpers = declare_helpers(&mut module)?;
    let mut builder_ctx = FunctionBuilderContext::new();
    let mut counter = 0;
    let mut root = compile_tree(
        &mut module,
        &helpers,
        &mut builder_ctx,
        ir,
        Vec::new(),
        &mut counter,
    )?;
    module
        .finalize_definitions()
        .map_err(|e| CompileError::codegen(format!("finalize failed: {}", e)))?;
    resolve_entries(&module, &mut root);
    log::trace!("emitted {} native functions", counter);
    let unit = Arc::new(CodeUnit {
        module: Some(module),
    });
    Ok(build_template(root, &unit, &source))
}

fn new_module(config: &EngineConfig) -> Result<JITModule, CompileError> {
    let mut flag_builder = settings::builder();
    flag_builder
        .set("opt_level", config.opt_level.as_str())
        .map_err(|e| CompileError::codegen(format!("failed to set opt_level: {}", e)))?;
    flag_builder
        .set("use_colocated_libcalls", "false")
        .map_err(|e| CompileError::codegen(e.to_string()))?;
    flag_builder
        .set("is_pic", "false")
        .map_err(|e| CompileError::codegen(e.to_string()))?;
    let isa = cranelift_native::builder()
        .map_err(|e| CompileError::codegen(format!("native ISA unavailable: {}", e)))?
        .finish(settings::Flags::new(flag_builder))
        .map_err(|e| CompileError::codegen(e.to_string()))?;
    let mut builder = JITBuilder::with_isa(isa, default_libcall_names());
    for helper in Helper::ALL {
        builder.symbol(helper.name(), helper.address());
    }
    Ok(JITModule::new(builder))
}

fn helper_signature(module: &JITModule) -> Signature {
    let mut sig = module.make_signature();
    sig.params.push(AbiParam::new(module.target_config().pointer_type()));
    for _ in 0..4 {
        sig.params.push(AbiParam::new(types::I32));
    }
    sig.returns.push(AbiParam::new(types::I32));
    sig
}

fn entry_signature(module: &JITModule) -> Signature {
    let mut sig = module.make_signature();
    sig.params.push(AbiParam::new(module.target_config().pointer_type()));
    sig.returns.push(AbiParam::new(types::I32));
    sig
}

fn declare_helpers(module: &mut JITModule) -> Result<Vec<FuncId>, CompileError> {
    let sig = helper_signature(module);
    Helper::ALL
        .iter()
        .map(|helper| {
            module
                .declare_function(helper.name(), Linkage::Import, &sig)
                .map_err(|e| CompileError::codegen(format!("declare {}: {}", helper.name(), e)))
        })
        .collect()
}

/// A defined but not yet finalized function and its nested functions.
struct PendingFunction {
    id: FuncId,
    entry: *const u8,
    name: String,
    kind: FunctionKind,
    arity: u32,
    output: FunctionOutput,
    captures: Vec<u32>,
    children: Vec<PendingFunction>,
    source_start: u32,
    source_end: u32,
}

struct FunctionOutput {
    constants: Vec<JsValue>,
    keys: Vec<PropertyKey>,
    template_sites: Vec<TemplateSite>,
    slot_count: u32,
    own_cells: u32,
    var_cells: Vec<Option<u32>>,
}

fn compile_tree(
    module: &mut JITModule,
    helpers: &[FuncId],
    builder_ctx: &mut FunctionBuilderContext,
    ir: &IrFunction,
    captures: Vec<u32>,
    counter: &mut u32,
) -> Result<PendingFunction, CompileError> {
    let sig = entry_signature(module);
    let symbol = format!("kite_fn_{}", *counter);
    *counter += 1;
    let id = module
        .declare_function(&symbol, Linkage::Local, &sig)
        .map_err(|e| CompileError::codegen(format!("declare {}: {}", symbol, e)))?;
    let mut func = Function::with_name_signature(UserFuncName::user(0, id.as_u32()), sig);
    let (output, nested) = {
        let builder = FunctionBuilder::new(&mut func, builder_ctx);
        FunctionCompiler::new(builder, module, helpers, ir).compile()?
    };
    let mut ctx = Context::for_function(func);
    module
        .define_function(id, &mut ctx)
        .map_err(|e| CompileError::codegen(format!("define {} ({}): {}", symbol, ir.name, e)))?;

    let mut children = Vec::with_capacity(nested.len());
    for child in nested {
        let child_captures = child
            .captures
            .iter()
            .map(|binding| match binding {
                Binding::Env(n) => Ok(*n),
                Binding::Local(v) => output
                    .var_cells
                    .get(*v as usize)
                    .copied()
                    .flatten()
                    .ok_or_else(|| {
                        CompileError::codegen(format!(
                            "closure {} captures uncaptured variable {}",
                            child.name, v
                        ))
                    }),
            })
            .collect::<Result<Vec<u32>, CompileError>>()?;
        children.push(compile_tree(module, helpers, builder_ctx, child, child_captures, counter)?);
    }
    Ok(PendingFunction {
        id,
        entry: std::ptr::null(),
        name: ir.name.clone(),
        kind: ir.kind,
        arity: ir.arity,
        output,
        captures,
        children,
        source_start: ir.source_start,
        source_end: ir.source_end,
    })
}

fn resolve_entries(module: &JITModule, function: &mut PendingFunction) {
    function.entry = module.get_finalized_function(function.id);
    for child in function.children.iter_mut() {
        resolve_entries(module, child);
    }
}

fn build_template(function: PendingFunction, unit: &Arc<CodeUnit>, source: &Arc<str>) -> Arc<FunctionTemplate> {
    let children = function
        .children
        .into_iter()
        .map(|child| build_template(child, unit, source))
        .collect();
    Arc::new(FunctionTemplate {
        name: function.name,
        kind: function.kind,
        arity: function.arity,
        entry: EntryPoint(function.entry),
        unit: unit.clone(),
        constants: function.output.constants,
        keys: function.output.keys,
        children,
        captures: function.captures,
        slot_count: function.output.slot_count,
        own_cells: function.output.own_cells,
        template_sites: function.output.template_sites,
        source: source.clone(),
        source_start: function.source_start,
        source_end: function.source_end,
    })
}

enum Region {
    Catch {
        handler: Block,
    },
    Finally {
        entry: Block,
        on_throw: Block,
        kind_slot: u32,
        value_slot: u32,
        gotos: Vec<LabelId>,
    },
}

struct FunctionCompiler<'a, 'ir> {
    builder: FunctionBuilder<'a>,
    module: &'a mut JITModule,
    helper_ids: &'a [FuncId],
    helper_refs: FxHashMap<Helper, FuncRef>,
    ir: &'ir IrFunction,
    act: Value,

    var_cells: Vec<Option<u32>>,
    own_cells: u32,
    next_temp: u32,
    max_slot: u32,

    constants: Vec<JsValue>,
    keys: Vec<PropertyKey>,
    key_index: FxHashMap<PropertyKey, u32>,
    template_sites: Vec<TemplateSite>,
    children: Vec<&'ir IrFunction>,

    labels: FxHashMap<LabelId, (Block, usize)>,
    regions: Vec<Region>,
    throw_exit: Block,
    return_exit: Block,
    body_start: Block,
    resume_blocks: Vec<Block>,
}

impl<'a, 'ir> FunctionCompiler<'a, 'ir> {
    fn new(
        mut builder: FunctionBuilder<'a>,
        module: &'a mut JITModule,
        helper_ids: &'a [FuncId],
        ir: &'ir IrFunction,
    ) -> Self {
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        let act = builder.block_params(entry)[0];

        let env_count = ir.captures.len() as u32;
        let mut own_cells = 0;
        let var_cells = ir
            .vars
            .iter()
            .map(|var| {
                if var.captured {
                    own_cells += 1;
                    Some(env_count + own_cells - 1)
                } else {
                    None
                }
            })
            .collect();
        let throw_exit = builder.create_block();
        let return_exit = builder.create_block();
        let body_start = builder.create_block();
        let var_count = ir.vars.len() as u32;
        FunctionCompiler {
            builder,
            module,
            helper_ids,
            helper_refs: FxHashMap::default(),
            ir,
            act,
            var_cells,
            own_cells,
            next_temp: var_count,
            max_slot: var_count,
            constants: Vec::new(),
            keys: Vec::new(),
            key_index: FxHashMap::default(),
            template_sites: Vec::new(),
            children: Vec::new(),
            labels: FxHashMap::default(),
            regions: Vec::new(),
            throw_exit,
            return_exit,
            body_start,
            resume_blocks: Vec::new(),
        }
    }

    fn compile(mut self) -> Result<(FunctionOutput, Vec<&'ir IrFunction>), CompileError> {
        let dispatch = self.builder.create_block();
        self.builder.ins().jump(dispatch, &[]);

        self.builder.switch_to_block(self.body_start);
        let result = self.alloc_temp();
        let ir = self.ir;
        self.expr(&ir.body, result)?;
        if self.ir.kind != FunctionKind::Script {
            self.call(Helper::LoadUndefined, &[result]);
        }
        self.call(Helper::Return, &[result]);
        let exit = self.return_exit;
        self.builder.ins().jump(exit, &[]);

        self.builder.switch_to_block(self.throw_exit);
        let status = self.builder.ins().iconst(types::I32, STATUS_THROW as i64);
        self.builder.ins().return_(&[status]);

        self.builder.switch_to_block(self.return_exit);
        let status = self.builder.ins().iconst(types::I32, STATUS_RETURN as i64);
        self.builder.ins().return_(&[status]);

        self.builder.switch_to_block(dispatch);
        if self.resume_blocks.is_empty() {
            let start = self.body_start;
            self.builder.ins().jump(start, &[]);
        } else {
            let point = self.call_raw(Helper::ResumePoint, &[]);
            let resume_blocks = self.resume_blocks.clone();
            for (i, target) in resume_blocks.into_iter().enumerate() {
                let is_point = self.builder.ins().icmp_imm(IntCC::Equal, point, (i + 1) as i64);
                let next = self.builder.create_block();
                self.builder.ins().brif(is_point, target, &[], next, &[]);
                self.builder.switch_to_block(next);
            }
            let start = self.body_start;
            self.builder.ins().jump(start, &[]);
        }

        if !self.regions.is_empty() {
            return Err(CompileError::codegen("unbalanced exception regions"));
        }
        self.builder.seal_all_blocks();
        self.builder.finalize();
        log::trace!(
            "function {}: {} slots, {} cells, {} resume points",
            self.ir.name,
            self.max_slot,
            self.own_cells,
            self.resume_blocks.len()
        );
        Ok((
            FunctionOutput {
                constants: self.constants,
                keys: self.keys,
                template_sites: self.template_sites,
                slot_count: self.max_slot,
                own_cells: self.own_cells,
                var_cells: self.var_cells,
            },
            self.children,
        ))
    }

    // ----- emission primitives -----

    fn helper_ref(&mut self, helper: Helper) -> FuncRef {
        if let Some(r) = self.helper_refs.get(&helper) {
            return *r;
        }
        let r = self
            .module
            .declare_func_in_func(self.helper_ids[helper as usize], self.builder.func);
        self.helper_refs.insert(helper, r);
        r
    }

    /// Calls `helper` and returns its raw result.
    fn call_raw(&mut self, helper: Helper, operands: &[u32]) -> Value {
        let func = self.helper_ref(helper);
        let mut args = Vec::with_capacity(5);
        args.push(self.act);
        for i in 0..4 {
            let operand = operands.get(i).copied().unwrap_or(0);
            args.push(self.builder.ins().iconst(types::I32, operand as i64));
        }
        let inst = self.builder.ins().call(func, &args);
        self.builder.inst_results(inst)[0]
    }

    /// Calls a fallible helper and branches to the active exception handler on failure.
    fn call(&mut self, helper: Helper, operands: &[u32]) {
        let status = self.call_raw(helper, operands);
        let target = self.throw_target();
        let cont = self.builder.create_block();
        self.builder.ins().brif(status, target, &[], cont, &[]);
        self.builder.switch_to_block(cont);
    }

    /// Ends the current block with a jump and continues in a fresh, unreachable one.
    fn jump_away(&mut self, target: Block) {
        self.builder.ins().jump(target, &[]);
        let dead = self.builder.create_block();
        self.builder.switch_to_block(dead);
    }

    fn branch(&mut self, condition: Value) -> (Block, Block) {
        let yes = self.builder.create_block();
        let no = self.builder.create_block();
        self.builder.ins().brif(condition, yes, &[], no, &[]);
        (yes, no)
    }

    fn throw_target(&self) -> Block {
        match self.regions.last() {
            Some(Region::Catch { handler }) => *handler,
            Some(Region::Finally { on_throw, .. }) => *on_throw,
            None => self.throw_exit,
        }
    }

    fn alloc_temp(&mut self) -> u32 {
        let slot = self.next_temp;
        self.next_temp += 1;
        self.max_slot = self.max_slot.max(self.next_temp);
        slot
    }

    fn alloc_temps(&mut self, count: u32) -> u32 {
        let base = self.next_temp;
        self.next_temp += count;
        self.max_slot = self.max_slot.max(self.next_temp);
        base
    }

    fn constant(&mut self, value: JsValue) -> u32 {
        self.constants.push(value);
        (self.constants.len() - 1) as u32
    }

    fn key(&mut self, name: &str) -> u32 {
        let key = PropertyKey::from_str(name);
        if let Some(index) = self.key_index.get(&key) {
            return *index;
        }
        let index = self.keys.len() as u32;
        self.keys.push(key);
        self.key_index.insert(key, index);
        index
    }

    fn load_literal(&mut self, literal: &Literal, dst: u32) {
        let value = match literal {
            Literal::Undefined => {
                self.call(Helper::LoadUndefined, &[dst]);
                return;
            }
            Literal::Null => JsValue::Null,
            Literal::Boolean(b) => JsValue::Boolean(*b),
            Literal::Number(n) => JsValue::Number(*n),
            Literal::String(s) => JsValue::String(s.clone()),
        };
        let index = self.constant(value);
        self.call(Helper::LoadConst, &[dst, index]);
    }

    fn load_undefined(&mut self, dst: u32) {
        self.call(Helper::LoadUndefined, &[dst]);
    }

    fn set_int(&mut self, dst: u32, value: u32) {
        self.call_raw(Helper::SetInt, &[dst, value]);
    }

    // ----- bindings -----

    /// Slot holding an uncaptured local, if `binding` is one.
    fn direct_slot(&self, binding: Binding) -> Option<u32> {
        match binding {
            Binding::Local(v) if self.var_cells.get(v as usize).copied().flatten().is_none() => Some(v),
            _ => None,
        }
    }

    fn cell_of(&self, binding: Binding) -> Result<u32, CompileError> {
        match binding {
            Binding::Env(n) => Ok(n),
            Binding::Local(v) => self
                .var_cells
                .get(v as usize)
                .copied()
                .flatten()
                .ok_or_else(|| CompileError::codegen(format!("unknown binding {:?}", binding))),
        }
    }

    fn read_binding(&mut self, binding: Binding, dst: u32) -> Result<(), CompileError> {
        match self.direct_slot(binding) {
            Some(slot) => {
                if slot != dst {
                    self.call(Helper::Move, &[dst, slot]);
                }
            }
            None => {
                let cell = self.cell_of(binding)?;
                self.call(Helper::LoadCell, &[dst, cell]);
            }
        }
        Ok(())
    }

    fn write_binding(&mut self, binding: Binding, src: u32) -> Result<(), CompileError> {
        match self.direct_slot(binding) {
            Some(slot) => {
                if slot != src {
                    self.call(Helper::Move, &[slot, src]);
                }
            }
            None => {
                let cell = self.cell_of(binding)?;
                self.call(Helper::StoreCell, &[cell, src]);
            }
        }
        Ok(())
    }

    /// Slot holding the value of `expr`: the variable's own slot when that is
    /// safe to read later, otherwise a fresh temporary.
    fn operand(&mut self, expr: &'ir Expr, reads_later: bool) -> Result<u32, CompileError> {
        if let Expr::Var(binding) = expr {
            if let Some(slot) = self.direct_slot(*binding) {
                if !reads_later {
                    return Ok(slot);
                }
            }
        }
        let temp = self.alloc_temp();
        self.expr(expr, temp)?;
        Ok(temp)
    }

    /// A slot holding the property key: a string constant for named keys.
    fn key_operand(&mut self, key: &'ir MemberKey) -> Result<u32, CompileError> {
        match key {
            MemberKey::Named(name) => {
                let temp = self.alloc_temp();
                self.load_literal(&Literal::String(name.clone()), temp);
                Ok(temp)
            }
            MemberKey::Computed(expr) => {
                let temp = self.alloc_temp();
                self.expr(expr, temp)?;
                Ok(temp)
            }
        }
    }

    // ----- control transfer -----

    fn route_return(&mut self, src: u32) {
        let finally = self.regions.iter().rev().find_map(|region| match region {
            Region::Finally {
                entry,
                kind_slot,
                value_slot,
                ..
            } => Some((*entry, *kind_slot, *value_slot)),
            _ => None,
        });
        match finally {
            Some((entry, kind_slot, value_slot)) => {
                self.call(Helper::Move, &[value_slot, src]);
                self.set_int(kind_slot, LEAVE_RETURN);
                self.jump_away(entry);
            }
            None => {
                self.call(Helper::Return, &[src]);
                let exit = self.return_exit;
                self.jump_away(exit);
            }
        }
    }

    fn route_goto(&mut self, label: LabelId) -> Result<(), CompileError> {
        let (target, depth) = *self
            .labels
            .get(&label)
            .ok_or_else(|| CompileError::codegen(format!("missing label {}", label)))?;
        let crossing = self.regions[depth.min(self.regions.len())..]
            .iter()
            .rposition(|region| matches!(region, Region::Finally { .. }))
            .map(|i| i + depth);
        match crossing {
            Some(index) => {
                let (entry, kind_slot, code) = match &mut self.regions[index] {
                    Region::Finally {
                        entry,
                        kind_slot,
                        gotos,
                        ..
                    } => {
                        let code = match gotos.iter().position(|l| *l == label) {
                            Some(k) => k,
                            None => {
                                gotos.push(label);
                                gotos.len() - 1
                            }
                        };
                        (*entry, *kind_slot, LEAVE_GOTO + code as u32)
                    }
                    Region::Catch { .. } => {
                        return Err(CompileError::codegen("finally region lookup mismatch"))
                    }
                };
                self.set_int(kind_slot, code);
                self.jump_away(entry);
            }
            None => self.jump_away(target),
        }
        Ok(())
    }

    /// Suspends with `status`, then continues according to how the function is resumed.
    fn suspend(&mut self, dst: u32, status: u32) {
        let point = self.resume_blocks.len() as u32 + 1;
        let resume = self.builder.create_block();
        self.resume_blocks.push(resume);
        let code = self.call_raw(Helper::Suspend, &[dst, point, status]);
        self.builder.ins().return_(&[code]);

        self.builder.switch_to_block(resume);
        let mode = self.call_raw(Helper::Resume, &[dst]);
        let is_next = self.builder.ins().icmp_imm(IntCC::Equal, mode, 0);
        let (next, other) = self.branch(is_next);
        self.builder.switch_to_block(other);
        let is_throw = self.builder.ins().icmp_imm(IntCC::Equal, mode, 1);
        let throw_target = self.throw_target();
        let forced_return = self.builder.create_block();
        self.builder
            .ins()
            .brif(is_throw, throw_target, &[], forced_return, &[]);
        self.builder.switch_to_block(forced_return);
        self.route_return(dst);
        self.builder.ins().jump(next, &[]);
        self.builder.switch_to_block(next);
    }

    fn is_self_tail_call(&self, expr: &Expr) -> bool {
        let self_binding = match self.ir.self_binding {
            Some(b) => b,
            None => return false,
        };
        if !self.regions.is_empty() || self.ir.kind.is_resumable() || self.ir.kind == FunctionKind::Script {
            return false;
        }
        match expr {
            Expr::Call {
                callee: Callee::Plain(callee),
                args: Args::List(args),
            } => matches!(**callee, Expr::Var(b) if b == self_binding) && args.len() as u32 == self.ir.arity,
            _ => false,
        }
    }

    // ----- expressions -----

    fn expr(&mut self, expr: &'ir Expr, dst: u32) -> Result<(), CompileError> {
        let mark = self.next_temp;
        let result = self.expr_inner(expr, dst);
        self.next_temp = mark;
        result
    }

    fn expr_inner(&mut self, expr: &'ir Expr, dst: u32) -> Result<(), CompileError> {
        match expr {
            Expr::Constant(literal) => self.load_literal(literal, dst),
            Expr::Var(binding) => self.read_binding(*binding, dst)?,
            Expr::Assign(binding, value) => {
                self.expr(value, dst)?;
                self.write_binding(*binding, dst)?;
            }
            Expr::This => self.call(Helper::This, &[dst]),
            Expr::NewTarget => self.call(Helper::NewTarget, &[dst]),
            Expr::Argument(n) => self.call(Helper::Argument, &[dst, *n]),
            Expr::RestArguments(n) => self.call(Helper::RestArgs, &[dst, *n]),
            Expr::Arguments => self.call(Helper::Arguments, &[dst]),

            Expr::GlobalGet(name) => {
                let key = self.key(name);
                self.call(Helper::GetGlobal, &[dst, key]);
            }
            Expr::GlobalTypeOf(name) => {
                let key = self.key(name);
                self.call(Helper::TypeOfGlobal, &[dst, key]);
            }
            Expr::GlobalSet(name, value) => {
                self.expr(value, dst)?;
                let key = self.key(name);
                self.call(Helper::SetGlobal, &[key, dst]);
            }
            Expr::GlobalDeclare { name, value } => {
                let key = self.key(name);
                match value {
                    Some(value) => {
                        self.expr(value, dst)?;
                        self.call(Helper::DeclareGlobal, &[key, dst, 1]);
                    }
                    None => {
                        self.call(Helper::DeclareGlobal, &[key, 0, 0]);
                        self.load_undefined(dst);
                    }
                }
            }

            Expr::Member { object, key } => {
                let object = self.operand(object, false)?;
                match key {
                    MemberKey::Named(name) => {
                        let key = self.key(name);
                        self.call(Helper::GetNamed, &[dst, object, key]);
                    }
                    MemberKey::Computed(key) => {
                        let key = self.operand(key, false)?;
                        self.call(Helper::GetMember, &[dst, object, key]);
                    }
                }
            }
            Expr::SetMember { object, key, value } => {
                let object = self.operand(object, true)?;
                match key {
                    MemberKey::Named(name) => {
                        self.expr(value, dst)?;
                        let key = self.key(name);
                        self.call(Helper::SetNamed, &[object, key, dst]);
                    }
                    MemberKey::Computed(key) => {
                        let key = self.operand(key, true)?;
                        self.expr(value, dst)?;
                        self.call(Helper::SetMember, &[object, key, dst]);
                    }
                }
            }
            Expr::DeleteMember { object, key } => {
                let object = self.operand(object, true)?;
                let key = self.key_operand(key)?;
                self.call(Helper::DeleteMember, &[dst, object, key]);
            }
            Expr::SuperMember { home, key, this } => {
                let home = self.operand(home, true)?;
                let key = self.key_operand(key)?;
                let this = self.operand(this, false)?;
                self.call(Helper::GetSuper, &[dst, home, key, this]);
            }

            Expr::Call { callee, args } => self.call_expr(callee, args, dst)?,
            Expr::New { callee, args } => {
                let (base, argc) = self.arg_frame(args)?;
                self.expr(callee, base)?;
                self.args_into(args, base)?;
                match args {
                    Args::List(_) => self.call(Helper::New, &[base, argc, dst]),
                    Args::Spread(_) => self.call(Helper::NewSpread, &[base, dst]),
                }
            }
            Expr::SuperCall {
                constructor,
                new_target,
                args,
            } => {
                let (base, argc) = self.arg_frame(args)?;
                self.expr(constructor, base)?;
                self.expr(new_target, base + 1)?;
                self.args_into(args, base)?;
                match args {
                    Args::List(_) => self.call(Helper::SuperCall, &[base, argc, dst]),
                    Args::Spread(_) => self.call(Helper::SuperCallSpread, &[base, dst]),
                }
            }

            Expr::Unary(op, operand) => {
                let src = self.operand(operand, false)?;
                self.call(Helper::Unary, &[dst, src, unary_index(*op)]);
            }
            Expr::Binary(op, left, right) => {
                let left = self.operand(left, !right.is_pure())?;
                let right = self.operand(right, false)?;
                self.call(Helper::Binary, &[dst, left, right, binary_index(*op)]);
            }
            Expr::Logical(op, left, right) => {
                self.expr(left, dst)?;
                let test = match op {
                    LogicalOp::And | LogicalOp::Or => self.call_raw(Helper::Truthy, &[dst]),
                    LogicalOp::Nullish => self.call_raw(Helper::IsNullish, &[dst]),
                };
                let (yes, no) = self.branch(test);
                let (evaluate_right, done) = match op {
                    LogicalOp::And | LogicalOp::Nullish => (yes, no),
                    LogicalOp::Or => (no, yes),
                };
                self.builder.switch_to_block(evaluate_right);
                self.expr(right, dst)?;
                self.builder.ins().jump(done, &[]);
                self.builder.switch_to_block(done);
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                let test = self.operand(test, false)?;
                let truthy = self.call_raw(Helper::Truthy, &[test]);
                let (yes, no) = self.branch(truthy);
                let after = self.builder.create_block();
                self.builder.switch_to_block(yes);
                self.expr(then, dst)?;
                self.builder.ins().jump(after, &[]);
                self.builder.switch_to_block(no);
                self.expr(otherwise, dst)?;
                self.builder.ins().jump(after, &[]);
                self.builder.switch_to_block(after);
            }

            Expr::Block(items) => {
                if items.is_empty() {
                    self.load_undefined(dst);
                }
                for item in items {
                    self.expr(item, dst)?;
                }
            }
            Expr::Scope { vars, body } => {
                for var in vars {
                    self.fresh_var(*var)?;
                }
                self.expr(body, dst)?;
            }
            Expr::RenewCells(vars) => {
                for var in vars {
                    if let Some(cell) = self.var_cells.get(*var as usize).copied().flatten() {
                        self.call(Helper::RenewCell, &[cell]);
                    }
                }
            }
            Expr::Loop(body) => {
                let head = self.builder.create_block();
                self.builder.ins().jump(head, &[]);
                self.builder.switch_to_block(head);
                let scratch = self.alloc_temp();
                self.expr(body, scratch)?;
                self.jump_away(head);
            }
            Expr::Label(label, body) => {
                let after = self.builder.create_block();
                self.labels.insert(*label, (after, self.regions.len()));
                self.load_undefined(dst);
                self.expr(body, dst)?;
                self.labels.remove(label);
                self.builder.ins().jump(after, &[]);
                self.builder.switch_to_block(after);
            }
            Expr::Goto(label) => self.route_goto(*label)?,
            Expr::Return(value) => {
                if self.is_self_tail_call(value) {
                    self.self_tail_call(value, dst)?;
                } else {
                    self.expr(value, dst)?;
                    self.route_return(dst);
                }
            }
            Expr::Throw(value) => {
                self.expr(value, dst)?;
                self.call(Helper::ThrowValue, &[dst]);
            }
            Expr::ThrowError(kind, message) => {
                let message = self.constant(JsValue::String(message.clone()));
                let kind = match kind {
                    ErrorKind::TypeError => 0,
                    ErrorKind::ReferenceError => 1,
                    ErrorKind::SyntaxError => 2,
                };
                self.call(Helper::ThrowError, &[kind, message]);
            }
            Expr::Try {
                block,
                catch,
                finally,
            } => self.try_expr(block, catch.as_deref(), finally.as_deref(), dst)?,
            Expr::Switch {
                discriminant,
                cases,
            } => {
                let value = self.alloc_temp();
                self.expr(discriminant, value)?;
                self.load_undefined(dst);
                let bodies: Vec<Block> = cases.iter().map(|_| self.builder.create_block()).collect();
                let after = self.builder.create_block();
                let test_slot = self.alloc_temp();
                for (case, body) in cases.iter().zip(bodies.iter()) {
                    if let Some(test) = &case.test {
                        self.expr(test, test_slot)?;
                        let matched = self.call_raw(Helper::StrictEquals, &[value, test_slot]);
                        let next = self.builder.create_block();
                        self.builder.ins().brif(matched, *body, &[], next, &[]);
                        self.builder.switch_to_block(next);
                    }
                }
                let fallback = cases
                    .iter()
                    .position(|case| case.test.is_none())
                    .map(|i| bodies[i])
                    .unwrap_or(after);
                self.builder.ins().jump(fallback, &[]);
                for (i, case) in cases.iter().enumerate() {
                    self.builder.switch_to_block(bodies[i]);
                    self.expr(&case.body, dst)?;
                    let next = bodies.get(i + 1).copied().unwrap_or(after);
                    self.builder.ins().jump(next, &[]);
                }
                self.builder.switch_to_block(after);
            }

            Expr::Yield(value) => {
                self.expr(value, dst)?;
                self.suspend(dst, STATUS_YIELD);
            }
            Expr::Await(value) => {
                self.expr(value, dst)?;
                self.suspend(dst, STATUS_AWAIT);
            }

            Expr::Function(function) => {
                self.children.push(function);
                let child = (self.children.len() - 1) as u32;
                self.call(Helper::MakeClosure, &[dst, child]);
            }
            Expr::Object(properties) => {
                let object = self.alloc_temp();
                self.call(Helper::NewObject, &[object]);
                for property in properties {
                    let mark = self.next_temp;
                    match property {
                        PropertyInit::Value { key, value } => {
                            let key = self.key_operand(key)?;
                            let value = self.operand(value, false)?;
                            self.call(Helper::DefineData, &[object, key, value]);
                        }
                        PropertyInit::Method {
                            key,
                            function,
                            kind,
                        } => {
                            let key = self.key_operand(key)?;
                            let function = self.operand(function, false)?;
                            self.call(Helper::DefineMethod, &[object, key, function, method_bits(*kind) | 4]);
                        }
                        PropertyInit::Spread(source) => {
                            let source = self.operand(source, false)?;
                            self.call(Helper::CopyDataProperties, &[object, source, NONE]);
                        }
                    }
                    self.next_temp = mark;
                }
                self.call(Helper::Move, &[dst, object]);
            }
            Expr::Array(elements) => {
                let array = self.alloc_temp();
                self.call(Helper::NewArray, &[array]);
                for element in elements {
                    let mark = self.next_temp;
                    match element {
                        ArrayElement::Hole => self.call(Helper::ArrayHole, &[array]),
                        ArrayElement::Item(item) => {
                            let value = self.operand(item, false)?;
                            self.call(Helper::ArrayPush, &[array, value]);
                        }
                        ArrayElement::Spread(source) => {
                            let source = self.operand(source, false)?;
                            self.call(Helper::ArraySpread, &[array, source]);
                        }
                    }
                    self.next_temp = mark;
                }
                self.call(Helper::Move, &[dst, array]);
            }
            Expr::TemplateObject { cooked, raw } => {
                self.template_sites.push(TemplateSite {
                    cooked: cooked.clone(),
                    raw: raw.clone(),
                    cache: Mutex::new(None),
                });
                let site = (self.template_sites.len() - 1) as u32;
                self.call(Helper::TemplateObject, &[dst, site]);
            }

            Expr::GetIterator(source) => {
                let source = self.operand(source, false)?;
                self.call(Helper::GetIterator, &[dst, source]);
            }
            Expr::IteratorStep { iter, value } => {
                let iterator = self.binding_operand(*iter)?;
                match self.direct_slot(*value) {
                    Some(slot) => self.call(Helper::IteratorStep, &[dst, iterator, slot]),
                    None => {
                        let temp = self.alloc_temp();
                        self.call(Helper::IteratorStep, &[dst, iterator, temp]);
                        self.write_binding(*value, temp)?;
                    }
                }
            }
            Expr::IteratorValue(iter) => {
                let iterator = self.binding_operand(*iter)?;
                self.call(Helper::IteratorValue, &[dst, iterator]);
            }
            Expr::IteratorRest(iter) => {
                let iterator = self.binding_operand(*iter)?;
                self.call(Helper::IteratorRest, &[dst, iterator]);
            }
            Expr::IteratorClose(iter) => {
                let iterator = self.binding_operand(*iter)?;
                self.call(Helper::IteratorClose, &[iterator]);
                self.load_undefined(dst);
            }
            Expr::ForInKeys(source) => {
                let source = self.operand(source, false)?;
                self.call(Helper::ForInKeys, &[dst, source]);
            }
            Expr::CopyDataProperties {
                target,
                source,
                excluded,
            } => {
                self.expr(target, dst)?;
                let source = self.operand(source, true)?;
                let excluded_keys = if excluded.is_empty() {
                    NONE
                } else {
                    let keys = self.alloc_temp();
                    self.call(Helper::NewArray, &[keys]);
                    for key in excluded {
                        let mark = self.next_temp;
                        let key = self.operand(key, false)?;
                        self.call(Helper::ArrayPush, &[keys, key]);
                        self.next_temp = mark;
                    }
                    keys
                };
                self.call(Helper::CopyDataProperties, &[dst, source, excluded_keys]);
            }
            Expr::DefineMethod {
                target,
                key,
                function,
                kind,
            } => {
                self.expr(target, dst)?;
                let key = self.key_operand(key)?;
                let function = self.operand(function, false)?;
                self.call(Helper::DefineMethod, &[dst, key, function, method_bits(*kind)]);
            }
            Expr::CreateClass {
                constructor,
                parent,
            } => {
                let parent = match parent {
                    Some(parent) => self.operand(parent, true)?,
                    None => NONE,
                };
                let constructor = self.operand(constructor, false)?;
                self.call(Helper::CreateClass, &[dst, constructor, parent]);
            }
            Expr::DerivedResult { value, this } => {
                let value = self.operand(value, true)?;
                let this = self.operand(this, false)?;
                self.call(Helper::DerivedResult, &[dst, value, this]);
            }
        }
        Ok(())
    }

    fn binding_operand(&mut self, binding: Binding) -> Result<u32, CompileError> {
        match self.direct_slot(binding) {
            Some(slot) => Ok(slot),
            None => {
                let temp = self.alloc_temp();
                self.read_binding(binding, temp)?;
                Ok(temp)
            }
        }
    }

    /// Gives a block-scoped variable fresh storage.
    fn fresh_var(&mut self, var: u32) -> Result<(), CompileError> {
        match self.var_cells.get(var as usize).copied() {
            Some(Some(cell)) => self.call(Helper::NewCell, &[cell]),
            Some(None) => self.load_undefined(var),
            None => return Err(CompileError::codegen(format!("unknown variable {}", var))),
        }
        Ok(())
    }

    /// Reserves callee, receiver and argument slots.
    fn arg_frame(&mut self, args: &Args) -> Result<(u32, u32), CompileError> {
        let argc = match args {
            Args::List(list) => list.len() as u32,
            Args::Spread(_) => 1,
        };
        Ok((self.alloc_temps(argc + 2), argc))
    }

    fn args_into(&mut self, args: &'ir Args, base: u32) -> Result<(), CompileError> {
        match args {
            Args::List(list) => {
                for (i, arg) in list.iter().enumerate() {
                    self.expr(arg, base + 2 + i as u32)?;
                }
            }
            Args::Spread(array) => self.expr(array, base + 2)?,
        }
        Ok(())
    }

    fn callee_into(&mut self, callee: &'ir Callee, base: u32) -> Result<(), CompileError> {
        match callee {
            Callee::Plain(function) => {
                self.expr(function, base)?;
                self.load_undefined(base + 1);
            }
            Callee::Member { object, key } => {
                self.expr(object, base + 1)?;
                match key {
                    MemberKey::Named(name) => {
                        let key = self.key(name);
                        self.call(Helper::GetNamed, &[base, base + 1, key]);
                    }
                    MemberKey::Computed(key) => {
                        let key = self.operand(key, false)?;
                        self.call(Helper::GetMember, &[base, base + 1, key]);
                    }
                }
            }
            Callee::Super { home, key, this } => {
                let home = self.operand(home, true)?;
                let key = self.key_operand(key)?;
                self.expr(this, base + 1)?;
                self.call(Helper::GetSuper, &[base, home, key, base + 1]);
            }
        }
        Ok(())
    }

    fn call_expr(&mut self, callee: &'ir Callee, args: &'ir Args, dst: u32) -> Result<(), CompileError> {
        let (base, argc) = self.arg_frame(args)?;
        self.callee_into(callee, base)?;
        self.args_into(args, base)?;
        match args {
            Args::List(_) => self.call(Helper::Call, &[base, argc, dst]),
            Args::Spread(_) => self.call(Helper::CallSpread, &[base, dst]),
        }
        Ok(())
    }

    /// `return f(...)` where `f` is the running function: rewinds the frame instead of calling.
    fn self_tail_call(&mut self, call: &'ir Expr, dst: u32) -> Result<(), CompileError> {
        let (callee, args) = match call {
            Expr::Call { callee, args } => (callee, args),
            _ => return Err(CompileError::codegen("malformed tail call")),
        };
        let (base, argc) = self.arg_frame(args)?;
        self.callee_into(callee, base)?;
        self.args_into(args, base)?;
        let is_self = self.call_raw(Helper::IsSelf, &[base]);
        let (tail, ordinary) = self.branch(is_self);

        self.builder.switch_to_block(tail);
        self.call(Helper::ResetFrame, &[base, argc]);
        let start = self.body_start;
        self.builder.ins().jump(start, &[]);

        self.builder.switch_to_block(ordinary);
        self.call(Helper::Call, &[base, argc, dst]);
        self.route_return(dst);
        Ok(())
    }

    fn try_expr(
        &mut self,
        block: &'ir Expr,
        catch: Option<&'ir CatchClause>,
        finally: Option<&'ir Expr>,
        dst: u32,
    ) -> Result<(), CompileError> {
        let after = self.builder.create_block();
        let finally_state = match finally {
            Some(_) => {
                let kind_slot = self.alloc_temp();
                let value_slot = self.alloc_temp();
                let entry = self.builder.create_block();
                let on_throw = self.builder.create_block();
                self.regions.push(Region::Finally {
                    entry,
                    on_throw,
                    kind_slot,
                    value_slot,
                    gotos: Vec::new(),
                });
                Some((entry, on_throw, kind_slot, value_slot))
            }
            None => None,
        };
        let normal_exit = self.builder.create_block();

        match catch {
            Some(clause) => {
                let handler = self.builder.create_block();
                self.regions.push(Region::Catch { handler });
                self.expr(block, dst)?;
                self.regions.pop();
                self.builder.ins().jump(normal_exit, &[]);

                self.builder.switch_to_block(handler);
                let caught = self.alloc_temp();
                self.call(Helper::Catch, &[caught]);
                if let Some(binding) = clause.binding {
                    self.write_binding(binding, caught)?;
                }
                self.expr(&clause.body, dst)?;
                self.builder.ins().jump(normal_exit, &[]);
            }
            None => {
                self.expr(block, dst)?;
                self.builder.ins().jump(normal_exit, &[]);
            }
        }

        self.builder.switch_to_block(normal_exit);
        let (entry, on_throw, kind_slot, value_slot) = match finally_state {
            Some(state) => state,
            None => {
                self.builder.ins().jump(after, &[]);
                self.builder.switch_to_block(after);
                return Ok(());
            }
        };
        let gotos = match self.regions.pop() {
            Some(Region::Finally { gotos, .. }) => gotos,
            _ => return Err(CompileError::codegen("exception region stack corrupted")),
        };
        self.set_int(kind_slot, LEAVE_NORMAL);
        self.builder.ins().jump(entry, &[]);

        self.builder.switch_to_block(on_throw);
        self.call(Helper::Catch, &[value_slot]);
        self.set_int(kind_slot, LEAVE_THROW);
        self.builder.ins().jump(entry, &[]);

        self.builder.switch_to_block(entry);
        let scratch = self.alloc_temp();
        if let Some(finally) = finally {
            self.expr(finally, scratch)?;
        }
        let kind = self.call_raw(Helper::ToIndex, &[kind_slot]);

        let is_normal = self.builder.ins().icmp_imm(IntCC::Equal, kind, LEAVE_NORMAL as i64);
        let not_normal = self.builder.create_block();
        self.builder.ins().brif(is_normal, after, &[], not_normal, &[]);
        self.builder.switch_to_block(not_normal);

        let is_throw = self.builder.ins().icmp_imm(IntCC::Equal, kind, LEAVE_THROW as i64);
        let (rethrow, not_throw) = self.branch(is_throw);
        self.builder.switch_to_block(rethrow);
        self.call(Helper::ThrowValue, &[value_slot]);
        self.builder.ins().jump(after, &[]);

        self.builder.switch_to_block(not_throw);
        let is_return = self.builder.ins().icmp_imm(IntCC::Equal, kind, LEAVE_RETURN as i64);
        let (returning, jumping) = self.branch(is_return);
        self.builder.switch_to_block(returning);
        self.route_return(value_slot);
        self.builder.ins().jump(after, &[]);

        self.builder.switch_to_block(jumping);
        for (k, label) in gotos.iter().enumerate() {
            let is_goto = self
                .builder
                .ins()
                .icmp_imm(IntCC::Equal, kind, (LEAVE_GOTO + k as u32) as i64);
            let (take, next) = self.branch(is_goto);
            self.builder.switch_to_block(take);
            self.route_goto(*label)?;
            self.builder.ins().jump(after, &[]);
            self.builder.switch_to_block(next);
        }
        self.builder.ins().jump(after, &[]);

        self.builder.switch_to_block(after);
        Ok(())
    }
}

fn unary_index(op: UnaryOp) -> u32 {
    UnaryOp::ALL.iter().position(|o| *o == op).unwrap_or(0) as u32
}

fn binary_index(op: BinaryOp) -> u32 {
    BinaryOp::ALL.iter().position(|o| *o == op).unwrap_or(0) as u32
}

fn method_bits(kind: MethodKind) -> u32 {
    match kind {
        MethodKind::Method => 0,
        MethodKind::Getter => 1,
        MethodKind::Setter => 2,
    }
}
