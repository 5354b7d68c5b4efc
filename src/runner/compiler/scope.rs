//! Scope binder.
//!
//! Tracks, for every function being lowered, its variables, the block scopes
//! that name them and the cells it captures from enclosing functions. A name
//! resolved across a function boundary marks the variable captured and threads
//! a capture through every function in between.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::runner::compiler::ir::{Binding, Expr, FunctionKind, LabelId, VarId, VarInfo};

/// Hidden names. None of them is a valid identifier.
pub(crate) const SUPER_CONSTRUCTOR: &str = "%super_ctor";
pub(crate) const SUPER_PROTOTYPE: &str = "%super_proto";
pub(crate) const DERIVED_THIS: &str = "%this";

/// Per-invocation values an arrow function sees from its enclosing function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Implicit {
    This,
    Arguments,
    NewTarget,
}

impl Implicit {
    fn hidden_name(self) -> &'static str {
        match self {
            Implicit::This => "%this_value",
            Implicit::Arguments => "%arguments",
            Implicit::NewTarget => "%new_target",
        }
    }

    fn load(self) -> Expr {
        match self {
            Implicit::This => Expr::This,
            Implicit::Arguments => Expr::Arguments,
            Implicit::NewTarget => Expr::NewTarget,
        }
    }
}

/// Where a method's `super.x` starts looking.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum HomeKind {
    /// Instance methods and the constructor of a class.
    Prototype,
    /// Static methods of a class.
    Constructor,
    /// Methods of an object literal.
    ObjectLiteral,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Resolved {
    pub(crate) binding: Binding,
    pub(crate) constant: bool,
}

#[derive(Copy, Clone, Debug)]
pub(crate) enum Resolution {
    Local(Resolved),
    Global,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TargetKind {
    Loop,
    Switch,
    /// A labeled statement that is not a loop: only `break label` reaches it.
    Labeled,
}

pub(crate) struct JumpTarget {
    pub(crate) labels: Vec<Arc<str>>,
    pub(crate) kind: TargetKind,
    pub(crate) break_label: LabelId,
    pub(crate) continue_label: Option<LabelId>,
    /// Iterator of a `for...of` loop, closed when a jump leaves the loop.
    pub(crate) iterator: Option<VarId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct VarKey {
    depth: usize,
    var: VarId,
}

#[derive(Default)]
struct BlockScope {
    names: FxHashMap<Arc<str>, (VarId, bool)>,
}

struct FunctionScope {
    kind: FunctionKind,
    home: Option<HomeKind>,
    /// Whether `arguments` names the invocation arguments here.
    has_arguments: bool,
    vars: Vec<VarInfo>,
    blocks: Vec<BlockScope>,
    captures: Vec<(VarKey, Binding)>,
    implicits: Vec<(Implicit, VarId)>,
    targets: Vec<JumpTarget>,
    next_label: LabelId,
    completion: Option<VarId>,
}

impl FunctionScope {
    fn lookup(&self, name: &str) -> Option<(VarId, bool)> {
        self.blocks
            .iter()
            .rev()
            .find_map(|block| block.names.get(name).copied())
    }

    fn new_var(&mut self, name: &str) -> VarId {
        self.vars.push(VarInfo {
            name: name.to_string(),
            captured: false,
        });
        (self.vars.len() - 1) as VarId
    }
}

/// A function whose scope has been closed.
pub(crate) struct FinishedScope {
    pub(crate) vars: Vec<VarInfo>,
    pub(crate) captures: Vec<Binding>,
    /// Initializations of hidden variables, run before the body.
    pub(crate) prologue: Vec<Expr>,
    keys: Vec<VarKey>,
}

impl FinishedScope {
    /// How the function sees variable `var` of the function at `depth`, if it captures it.
    pub(crate) fn captured(&self, depth: usize, var: VarId) -> Option<Binding> {
        self.keys
            .iter()
            .position(|key| *key == VarKey { depth, var })
            .map(|index| Binding::Env(index as u32))
    }
}

#[derive(Default)]
pub(crate) struct Binder {
    functions: Vec<FunctionScope>,
}

impl Binder {
    pub(crate) fn new() -> Self {
        Binder::default()
    }

    /// Depth of the function currently being lowered.
    pub(crate) fn depth(&self) -> usize {
        self.functions.len().saturating_sub(1)
    }

    fn current(&self) -> &FunctionScope {
        &self.functions[self.depth()]
    }

    fn current_mut(&mut self) -> &mut FunctionScope {
        let depth = self.depth();
        &mut self.functions[depth]
    }

    pub(crate) fn enter_function(&mut self, kind: FunctionKind, home: Option<HomeKind>, has_arguments: bool) {
        let mut scope = FunctionScope {
            kind,
            home,
            has_arguments,
            vars: Vec::new(),
            blocks: vec![BlockScope::default()],
            captures: Vec::new(),
            implicits: Vec::new(),
            targets: Vec::new(),
            next_label: 0,
            completion: None,
        };
        if kind.is_derived_constructor() {
            let var = scope.new_var(DERIVED_THIS);
            scope.blocks[0].names.insert(Arc::from(DERIVED_THIS), (var, false));
        }
        self.functions.push(scope);
    }

    pub(crate) fn exit_function(&mut self) -> FinishedScope {
        let scope = match self.functions.pop() {
            Some(scope) => scope,
            None => {
                return FinishedScope {
                    vars: Vec::new(),
                    captures: Vec::new(),
                    prologue: Vec::new(),
                    keys: Vec::new(),
                }
            }
        };
        let prologue = scope
            .implicits
            .iter()
            .map(|(which, var)| Expr::Assign(Binding::Local(*var), which.load().boxed()))
            .collect();
        FinishedScope {
            vars: scope.vars,
            captures: scope.captures.iter().map(|(_, binding)| *binding).collect(),
            keys: scope.captures.iter().map(|(key, _)| *key).collect(),
            prologue,
        }
    }

    pub(crate) fn kind(&self) -> FunctionKind {
        self.current().kind
    }

    pub(crate) fn enter_block(&mut self) {
        self.current_mut().blocks.push(BlockScope::default());
    }

    pub(crate) fn exit_block(&mut self) {
        let scope = self.current_mut();
        if scope.blocks.len() > 1 {
            scope.blocks.pop();
        }
    }

    /// Declares `name` in the innermost block. Redeclaring in the same block reuses the variable.
    pub(crate) fn declare(&mut self, name: &Arc<str>, constant: bool) -> VarId {
        let scope = self.current_mut();
        let existing = scope.blocks.last().and_then(|block| block.names.get(name).copied());
        if let Some((var, _)) = existing {
            if let Some(block) = scope.blocks.last_mut() {
                block.names.insert(name.clone(), (var, constant));
            }
            return var;
        }
        let var = scope.new_var(name);
        if let Some(block) = scope.blocks.last_mut() {
            block.names.insert(name.clone(), (var, constant));
        }
        var
    }

    /// Declares `name` in the function's outermost block, the home of `var` and parameters.
    pub(crate) fn declare_function_scoped(&mut self, name: &Arc<str>) -> VarId {
        let scope = self.current_mut();
        if let Some((var, _)) = scope.blocks[0].names.get(name).copied() {
            return var;
        }
        let var = scope.new_var(name);
        scope.blocks[0].names.insert(name.clone(), (var, false));
        var
    }

    /// An unnamed variable for intermediate values.
    pub(crate) fn temp(&mut self) -> VarId {
        self.current_mut().new_var("%tmp")
    }

    pub(crate) fn var_captured(&self, var: VarId) -> bool {
        self.current()
            .vars
            .get(var as usize)
            .map(|v| v.captured)
            .unwrap_or(false)
    }

    /// The script's completion-value variable, created on first use.
    pub(crate) fn completion(&mut self) -> Option<VarId> {
        let scope = self.current_mut();
        if scope.kind != FunctionKind::Script {
            return None;
        }
        if scope.completion.is_none() {
            scope.completion = Some(scope.new_var("%completion"));
        }
        scope.completion
    }

    pub(crate) fn has_completion(&self) -> Option<VarId> {
        self.current().completion
    }

    pub(crate) fn resolve(&mut self, name: &str) -> Resolution {
        for depth in (0..self.functions.len()).rev() {
            if let Some((var, constant)) = self.functions[depth].lookup(name) {
                return Resolution::Local(Resolved {
                    binding: self.capture(depth, var),
                    constant,
                });
            }
        }
        Resolution::Global
    }

    /// `arguments`: a declared variable of that name, or the arguments object of
    /// the nearest function that has one.
    pub(crate) fn resolve_arguments(&mut self) -> Option<Expr> {
        for depth in (0..self.functions.len()).rev() {
            if let Some((var, _)) = self.functions[depth].lookup("arguments") {
                return Some(Expr::Var(self.capture(depth, var)));
            }
            if self.functions[depth].has_arguments && !self.functions[depth].kind.is_arrow() {
                return Some(self.implicit_at(depth, Implicit::Arguments));
            }
        }
        None
    }

    /// `this` or `new.target` as seen from the current function.
    pub(crate) fn implicit(&mut self, which: Implicit) -> Expr {
        let owner = self.non_arrow_depth();
        if which == Implicit::This && self.functions[owner].kind.is_derived_constructor() {
            if let Some((var, _)) = self.functions[owner].blocks[0].names.get(DERIVED_THIS).copied() {
                return Expr::Var(self.capture(owner, var));
            }
        }
        self.implicit_at(owner, which)
    }

    fn implicit_at(&mut self, owner: usize, which: Implicit) -> Expr {
        if owner == self.depth() {
            return which.load();
        }
        let scope = &mut self.functions[owner];
        let var = match scope.implicits.iter().find(|(w, _)| *w == which) {
            Some((_, var)) => *var,
            None => {
                let var = scope.new_var(which.hidden_name());
                scope.implicits.push((which, var));
                var
            }
        };
        Expr::Var(self.capture(owner, var))
    }

    fn non_arrow_depth(&self) -> usize {
        (0..self.functions.len())
            .rev()
            .find(|&depth| !self.functions[depth].kind.is_arrow())
            .unwrap_or(0)
    }

    /// Home of the nearest enclosing method, seen through arrow functions.
    pub(crate) fn home(&self) -> Option<HomeKind> {
        self.functions[self.non_arrow_depth()].home
    }

    /// Whether the nearest non-arrow function is a derived class constructor.
    pub(crate) fn in_derived_constructor(&self) -> bool {
        self.functions[self.non_arrow_depth()].kind.is_derived_constructor()
    }

    /// Makes variable `var` of the function at `depth` reachable from the current function.
    fn capture(&mut self, depth: usize, var: VarId) -> Binding {
        let top = self.depth();
        if depth == top {
            return Binding::Local(var);
        }
        if let Some(info) = self.functions[depth].vars.get_mut(var as usize) {
            info.captured = true;
        }
        let key = VarKey { depth, var };
        let mut binding = Binding::Local(var);
        for scope in self.functions[depth + 1..=top].iter_mut() {
            let index = match scope.captures.iter().position(|(k, _)| *k == key) {
                Some(index) => index,
                None => {
                    scope.captures.push((key, binding));
                    scope.captures.len() - 1
                }
            };
            binding = Binding::Env(index as u32);
        }
        binding
    }

    // ----- jump targets -----

    pub(crate) fn new_label(&mut self) -> LabelId {
        let scope = self.current_mut();
        scope.next_label += 1;
        scope.next_label
    }

    pub(crate) fn push_target(&mut self, target: JumpTarget) {
        self.current_mut().targets.push(target);
    }

    pub(crate) fn pop_target(&mut self) {
        self.current_mut().targets.pop();
    }

    /// Label a `break` jumps to and the `for...of` iterators it leaves.
    pub(crate) fn break_target(&self, label: Option<&str>) -> Option<(LabelId, Vec<VarId>)> {
        let targets = &self.current().targets;
        let index = targets.iter().rposition(|target| match label {
            Some(label) => target.labels.iter().any(|l| &**l == label),
            None => target.kind != TargetKind::Labeled,
        })?;
        let iterators = targets[index..].iter().rev().filter_map(|t| t.iterator).collect();
        Some((targets[index].break_label, iterators))
    }

    /// Label a `continue` jumps to and the inner `for...of` iterators it leaves.
    pub(crate) fn continue_target(&self, label: Option<&str>) -> Option<(LabelId, Vec<VarId>)> {
        let targets = &self.current().targets;
        let index = targets.iter().rposition(|target| {
            target.kind == TargetKind::Loop
                && label.map_or(true, |label| target.labels.iter().any(|l| &**l == label))
        })?;
        let continue_label = targets[index].continue_label?;
        let iterators = targets[index + 1..].iter().rev().filter_map(|t| t.iterator).collect();
        Some((continue_label, iterators))
    }

    /// Every open `for...of` iterator of the current function, innermost first.
    pub(crate) fn open_iterators(&self) -> Vec<VarId> {
        self.current()
            .targets
            .iter()
            .rev()
            .filter_map(|t| t.iterator)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_block_shadows_outer() {
        let mut binder = Binder::new();
        binder.enter_function(FunctionKind::Normal, None, true);
        let outer = binder.declare(&Arc::from("a"), false);
        binder.enter_block();
        let inner = binder.declare(&Arc::from("a"), true);
        assert_ne!(outer, inner);
        assert!(matches!(
            binder.resolve("a"),
            Resolution::Local(Resolved { binding: Binding::Local(v), constant: true }) if v == inner
        ));
        binder.exit_block();
        assert!(matches!(
            binder.resolve("a"),
            Resolution::Local(Resolved { binding: Binding::Local(v), constant: false }) if v == outer
        ));
        assert!(matches!(binder.resolve("b"), Resolution::Global));
    }

    #[test]
    fn test_capture_threads_through_intermediate_functions() {
        let mut binder = Binder::new();
        binder.enter_function(FunctionKind::Normal, None, true);
        let counter = binder.declare(&Arc::from("counter"), false);
        binder.enter_function(FunctionKind::Arrow, None, false);
        binder.enter_function(FunctionKind::Normal, None, true);
        assert!(matches!(
            binder.resolve("counter"),
            Resolution::Local(Resolved { binding: Binding::Env(0), .. })
        ));
        let innermost = binder.exit_function();
        assert_eq!(innermost.captures, vec![Binding::Env(0)]);
        let middle = binder.exit_function();
        assert_eq!(middle.captures, vec![Binding::Local(counter)]);
        let outer = binder.exit_function();
        assert!(outer.vars[counter as usize].captured);
    }

    #[test]
    fn test_arrow_this_is_hoisted_into_enclosing_function() {
        let mut binder = Binder::new();
        binder.enter_function(FunctionKind::Method, Some(HomeKind::Prototype), true);
        binder.enter_function(FunctionKind::Arrow, None, false);
        assert!(matches!(binder.implicit(Implicit::This), Expr::Var(Binding::Env(0))));
        assert_eq!(binder.home(), Some(HomeKind::Prototype));
        binder.exit_function();
        let method = binder.exit_function();
        assert_eq!(method.prologue.len(), 1);
        assert!(matches!(
            &method.prologue[0],
            Expr::Assign(Binding::Local(_), value) if matches!(**value, Expr::This)
        ));
    }

    #[test]
    fn test_break_and_continue_targets() {
        let mut binder = Binder::new();
        binder.enter_function(FunctionKind::Normal, None, true);
        assert!(binder.break_target(None).is_none());
        let outer_break = binder.new_label();
        let outer_continue = binder.new_label();
        binder.push_target(JumpTarget {
            labels: vec![Arc::from("outer")],
            kind: TargetKind::Loop,
            break_label: outer_break,
            continue_label: Some(outer_continue),
            iterator: Some(7),
        });
        let switch_break = binder.new_label();
        binder.push_target(JumpTarget {
            labels: Vec::new(),
            kind: TargetKind::Switch,
            break_label: switch_break,
            continue_label: None,
            iterator: None,
        });
        assert_eq!(binder.break_target(None), Some((switch_break, vec![])));
        assert_eq!(binder.break_target(Some("outer")), Some((outer_break, vec![7])));
        assert_eq!(binder.continue_target(None), Some((outer_continue, vec![])));
        assert!(binder.continue_target(Some("missing")).is_none());
        assert_eq!(binder.open_iterators(), vec![7]);
    }
}
