//! AST to IR lowering: scripts, functions and statements.
//!
//! Control flow becomes explicit labels, loops and gotos. `break` and
//! `continue` resolve against the binder's jump targets; leaving a
//! `for...of` loop early closes its iterator first.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{CompileError, CompileErrorKind};
use crate::parser::ast::{
    Ast, CatchClauseData, ExprId, ExpressionType, ForIteratorData, FuncId, FunctionBody, FunctionData,
    FunctionForm, Meta, PatternType, ProgramData, StatementType, StmtId, SwitchCaseData, VariableDeclarationData,
    VariableDeclarationKind, VariableDeclarationOrExpression, VariableDeclarationOrPattern,
};
use crate::runner::compiler::ir::{
    Binding, CatchClause, Expr, FunctionKind, IrFunction, LabelId, SwitchCase, VarId,
};
use crate::runner::compiler::patterns::PatternMode;
use crate::runner::compiler::scope::{Binder, HomeKind, JumpTarget, Resolution, Resolved, TargetKind};

pub(crate) struct Lowerer<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) binder: Binder,
    /// Top-level `var` and function declarations of the script define global properties.
    global_declarations: bool,
    /// Innermost open optional chain.
    pub(crate) chains: Vec<LabelId>,
}

/// Lowers a parsed script into the IR of its top-level function.
///
/// With `arg_names` the script is compiled as a function body: the named
/// arguments and every declaration are locals, and the result is whatever a
/// top-level `return` produces. Without, it is a global script whose
/// completion value is the value of its last expression statement.
pub fn lower_program(program: &ProgramData, arg_names: Option<&[&str]>) -> Result<IrFunction, CompileError> {
    let start = Instant::now();
    let mut lowerer = Lowerer {
        ast: &program.ast,
        binder: Binder::new(),
        global_declarations: arg_names.is_none(),
        chains: Vec::new(),
    };
    let ir = lowerer.lower_script(program.script, arg_names.unwrap_or(&[]))?;
    log::debug!("lowered script with {} variables in {:?}", ir.vars.len(), start.elapsed());
    Ok(ir)
}

pub(crate) fn exit_unless(test: Expr, label: LabelId) -> Expr {
    Expr::Conditional {
        test: test.boxed(),
        then: Expr::Block(Vec::new()).boxed(),
        otherwise: Expr::Goto(label).boxed(),
    }
}

fn wrap_scope(vars: Vec<VarId>, items: Vec<Expr>) -> Expr {
    if vars.is_empty() {
        Expr::Block(items)
    } else {
        Expr::Scope {
            vars,
            body: Expr::Block(items).boxed(),
        }
    }
}

impl<'a> Lowerer<'a> {
    pub(crate) fn error(&self, kind: CompileErrorKind, meta: Meta, message: impl Into<String>) -> CompileError {
        CompileError::new(kind, message, meta.line, meta.column)
    }

    /// Runs `f` inside a fresh block scope.
    pub(crate) fn in_block<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        self.binder.enter_block();
        let result = f(self);
        self.binder.exit_block();
        result
    }

    fn with_target<T>(
        &mut self,
        target: JumpTarget,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        self.binder.push_target(target);
        let result = f(self);
        self.binder.pop_target();
        result
    }

    // ----- functions -----

    fn lower_script(&mut self, script: FuncId, arg_names: &[&str]) -> Result<IrFunction, CompileError> {
        let function = self.ast.function(script);
        self.binder
            .enter_function(FunctionKind::Script, None, !self.global_declarations);
        let body = self.lower_script_body(function, arg_names);
        let scope = self.binder.exit_function();
        let mut items = scope.prologue;
        items.extend(body?);
        Ok(IrFunction {
            name: String::new(),
            kind: FunctionKind::Script,
            arity: arg_names.len() as u32,
            vars: scope.vars,
            captures: scope.captures,
            body: Expr::Block(items),
            self_binding: None,
            source_start: function.meta.start_index as u32,
            source_end: function.meta.end_index as u32,
        })
    }

    fn lower_script_body(&mut self, function: &FunctionData, arg_names: &[&str]) -> Result<Vec<Expr>, CompileError> {
        let mut items = Vec::new();
        for (i, name) in arg_names.iter().enumerate() {
            let var = self.binder.declare_function_scoped(&Arc::from(*name));
            items.push(Expr::Assign(Binding::Local(var), Expr::Argument(i as u32).boxed()));
        }
        for name in &function.hoisted_vars {
            if self.global_declarations {
                items.push(Expr::GlobalDeclare {
                    name: name.clone(),
                    value: None,
                });
            } else {
                self.binder.declare_function_scoped(name);
            }
        }
        let statements: &[StmtId] = match &function.body {
            FunctionBody::Block(statements) => statements,
            FunctionBody::Expression(_) => &[],
        };
        let (_, hoisted) = self.hoist_declarations(statements, true)?;
        items.extend(hoisted);
        items.extend(self.lower_statements(statements)?);
        items.push(match self.binder.has_completion() {
            Some(var) => Expr::Var(Binding::Local(var)),
            None => Expr::undefined(),
        });
        Ok(items)
    }

    fn function_kind(&self, function: &FunctionData) -> Result<FunctionKind, CompileError> {
        if function.generator && function.is_async {
            return Err(self.error(
                CompileErrorKind::Compile,
                function.meta,
                "async generators are not supported",
            ));
        }
        Ok(match function.form {
            FunctionForm::Script => FunctionKind::Script,
            FunctionForm::ClassConstructor { derived: true } => FunctionKind::DerivedConstructor,
            FunctionForm::ClassConstructor { derived: false } => FunctionKind::ClassConstructor,
            _ if function.generator => FunctionKind::Generator,
            FunctionForm::Arrow if function.is_async => FunctionKind::AsyncArrow,
            _ if function.is_async => FunctionKind::Async,
            FunctionForm::Arrow => FunctionKind::Arrow,
            FunctionForm::Method | FunctionForm::Getter | FunctionForm::Setter => FunctionKind::Method,
            FunctionForm::Declaration | FunctionForm::Expression => FunctionKind::Normal,
        })
    }

    /// Lowers a nested function. `self_key` names the variable of the current
    /// function through which the new function refers to itself.
    pub(crate) fn lower_function(
        &mut self,
        id: FuncId,
        name: Option<Arc<str>>,
        self_key: Option<VarId>,
        home: Option<HomeKind>,
    ) -> Result<IrFunction, CompileError> {
        let function = self.ast.function(id);
        let kind = self.function_kind(function)?;
        let name = function
            .id
            .clone()
            .or(name)
            .map(|n| n.to_string())
            .unwrap_or_default();
        let parent_depth = self.binder.depth();
        let saved_chains = std::mem::take(&mut self.chains);
        self.binder.enter_function(kind, home, !kind.is_arrow());
        let body = self.lower_function_body(function, kind);
        let scope = self.binder.exit_function();
        self.chains = saved_chains;
        let body = body?;
        let self_binding = self_key.and_then(|var| scope.captured(parent_depth, var));
        let mut items = scope.prologue;
        items.extend(body);
        let arity = function
            .params
            .iter()
            .take_while(|p| !matches!(self.ast.pattern(**p).kind, PatternType::AssignmentPattern { .. }))
            .count() as u32;
        Ok(IrFunction {
            name,
            kind,
            arity,
            vars: scope.vars,
            captures: scope.captures,
            body: Expr::Block(items),
            self_binding,
            source_start: function.meta.start_index as u32,
            source_end: function.meta.end_index as u32,
        })
    }

    fn lower_function_body(&mut self, function: &FunctionData, kind: FunctionKind) -> Result<Vec<Expr>, CompileError> {
        let mut names = Vec::new();
        for param in function.params.iter().chain(function.rest.iter()) {
            self.ast.bound_names(*param, &mut names);
        }
        for name in &names {
            self.binder.declare_function_scoped(name);
        }
        for name in &function.hoisted_vars {
            self.binder.declare_function_scoped(name);
        }

        let mut items = Vec::new();
        for (i, param) in function.params.iter().enumerate() {
            items.push(self.bind_pattern(*param, Expr::Argument(i as u32), PatternMode::Declaration)?);
        }
        if let Some(rest) = function.rest {
            let from = function.params.len() as u32;
            items.push(self.bind_pattern(rest, Expr::RestArguments(from), PatternMode::Declaration)?);
        }
        match &function.body {
            FunctionBody::Block(statements) => {
                let (_, hoisted) = self.hoist_declarations(statements, true)?;
                items.extend(hoisted);
                items.extend(self.lower_statements(statements)?);
            }
            FunctionBody::Expression(expr) => {
                let value = self.lower_expr(*expr)?;
                items.push(Expr::Return(value.boxed()));
            }
        }
        if kind.is_derived_constructor() {
            items.push(Expr::Return(self.derived_result(Expr::undefined()).boxed()));
        }
        Ok(items)
    }

    pub(crate) fn derived_result(&mut self, value: Expr) -> Expr {
        let this = self.binder.implicit(crate::runner::compiler::scope::Implicit::This);
        Expr::DerivedResult {
            value: value.boxed(),
            this: this.boxed(),
        }
    }

    // ----- statement lists -----

    /// Declares the block-scoped names of `statements` and lowers their
    /// function declarations. Returns the variables needing fresh storage
    /// per entry and the function initializers to run first.
    fn hoist_declarations(
        &mut self,
        statements: &[StmtId],
        function_top: bool,
    ) -> Result<(Vec<VarId>, Vec<Expr>), CompileError> {
        let mut scoped = Vec::new();
        let mut functions = Vec::new();
        for &id in statements {
            match &self.ast.statement(id).kind {
                StatementType::VariableDeclaration(data) if data.kind != VariableDeclarationKind::Var => {
                    let constant = data.kind == VariableDeclarationKind::Const;
                    let mut names = Vec::new();
                    for declarator in &data.declarations {
                        self.ast.bound_names(declarator.id, &mut names);
                    }
                    for name in &names {
                        scoped.push(self.binder.declare(name, constant));
                    }
                }
                StatementType::ClassDeclaration(class) => {
                    if let Some(name) = &class.id {
                        scoped.push(self.binder.declare(name, false));
                    }
                }
                StatementType::FunctionDeclaration(function) => functions.push(*function),
                _ => {}
            }
        }

        let global = function_top && self.global_declarations && self.binder.kind() == FunctionKind::Script;
        let mut declared = Vec::with_capacity(functions.len());
        for function in functions {
            let name = match &self.ast.function(function).id {
                Some(name) => name.clone(),
                None => continue,
            };
            let var = if global {
                None
            } else if function_top {
                Some(self.binder.declare_function_scoped(&name))
            } else {
                let var = self.binder.declare(&name, false);
                scoped.push(var);
                Some(var)
            };
            declared.push((function, name, var));
        }

        let mut items = Vec::with_capacity(declared.len());
        for (function, name, var) in declared {
            let ir = self.lower_function(function, None, var, None)?;
            let value = Expr::Function(Box::new(ir));
            items.push(match var {
                Some(var) => Expr::Assign(Binding::Local(var), value.boxed()),
                None => Expr::GlobalDeclare {
                    name,
                    value: Some(value.boxed()),
                },
            });
        }
        Ok((scoped, items))
    }

    fn lower_statements(&mut self, statements: &[StmtId]) -> Result<Vec<Expr>, CompileError> {
        let mut items = Vec::with_capacity(statements.len());
        for &id in statements {
            if matches!(self.ast.statement(id).kind, StatementType::FunctionDeclaration(_)) {
                continue;
            }
            items.push(self.lower_statement(id)?);
        }
        Ok(items)
    }

    pub(crate) fn lower_block(&mut self, statements: &[StmtId]) -> Result<Expr, CompileError> {
        self.in_block(|this| {
            let (vars, mut items) = this.hoist_declarations(statements, false)?;
            items.extend(this.lower_statements(statements)?);
            Ok(wrap_scope(vars, items))
        })
    }

    // ----- statements -----

    pub(crate) fn lower_statement(&mut self, id: StmtId) -> Result<Expr, CompileError> {
        let node = self.ast.statement(id);
        let meta = node.meta;
        match &node.kind {
            StatementType::ExpressionStatement(expr) => {
                let value = self.lower_expr(*expr)?;
                let completion = if self.global_declarations {
                    self.binder.completion()
                } else {
                    None
                };
                Ok(match completion {
                    Some(var) => Expr::Assign(Binding::Local(var), value.boxed()),
                    None => value,
                })
            }
            StatementType::BlockStatement(body) => self.lower_block(body),
            StatementType::EmptyStatement | StatementType::DebuggerStatement => Ok(Expr::Block(Vec::new())),
            StatementType::ReturnStatement(argument) => self.lower_return(*argument),
            StatementType::BreakStatement(label) => self.lower_jump(label.as_deref(), meta, true),
            StatementType::ContinueStatement(label) => self.lower_jump(label.as_deref(), meta, false),
            StatementType::LabeledStatement { .. } => self.lower_labeled(id, Vec::new()),
            StatementType::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                let test = self.lower_expr(*test)?;
                let then = self.lower_statement(*consequent)?;
                let otherwise = match alternate {
                    Some(alternate) => self.lower_statement(*alternate)?,
                    None => Expr::Block(Vec::new()),
                };
                Ok(Expr::Conditional {
                    test: test.boxed(),
                    then: then.boxed(),
                    otherwise: otherwise.boxed(),
                })
            }
            StatementType::SwitchStatement { discriminant, cases } => {
                self.lower_switch(*discriminant, cases, Vec::new())
            }
            StatementType::ThrowStatement(argument) => {
                let value = self.lower_expr(*argument)?;
                Ok(Expr::Throw(value.boxed()))
            }
            StatementType::TryStatement {
                block,
                handler,
                finalizer,
            } => self.lower_try(block, handler.as_ref(), finalizer.as_deref()),
            StatementType::WhileStatement { .. }
            | StatementType::DoWhileStatement { .. }
            | StatementType::ForStatement { .. }
            | StatementType::ForInStatement(_)
            | StatementType::ForOfStatement(_) => self.lower_loop(id, Vec::new()),
            StatementType::WithStatement { .. } => Err(self.error(
                CompileErrorKind::Compile,
                meta,
                "'with' statements are not supported",
            )),
            StatementType::VariableDeclaration(data) => self.lower_variable_declaration(data),
            // Only reached when a declaration is the direct body of another statement.
            StatementType::FunctionDeclaration(_) => self.lower_block(std::slice::from_ref(&id)),
            StatementType::ClassDeclaration(class) => {
                let value = self.lower_class(class, None)?;
                match &class.id {
                    Some(name) => self.bind_name(name, value, PatternMode::Declaration),
                    None => Ok(value),
                }
            }
        }
    }

    fn lower_return(&mut self, argument: Option<crate::parser::ast::ExprId>) -> Result<Expr, CompileError> {
        let mut value = match argument {
            Some(argument) => self.lower_expr(argument)?,
            None => Expr::undefined(),
        };
        if self.binder.kind().is_derived_constructor() {
            value = self.derived_result(value);
        }
        let iterators = self.binder.open_iterators();
        if iterators.is_empty() {
            return Ok(Expr::Return(value.boxed()));
        }
        let result = self.binder.temp();
        let mut items = vec![Expr::Assign(Binding::Local(result), value.boxed())];
        items.extend(iterators.into_iter().map(|it| Expr::IteratorClose(Binding::Local(it))));
        items.push(Expr::Return(Expr::Var(Binding::Local(result)).boxed()));
        Ok(Expr::Block(items))
    }

    fn lower_jump(&mut self, label: Option<&str>, meta: Meta, is_break: bool) -> Result<Expr, CompileError> {
        let target = if is_break {
            self.binder.break_target(label)
        } else {
            self.binder.continue_target(label)
        };
        let (target, iterators) = match target {
            Some(found) => found,
            None => {
                let message = match (label, is_break) {
                    (Some(label), _) => format!("undefined label '{}'", label),
                    (None, true) => "illegal break statement".to_string(),
                    (None, false) => "illegal continue statement: no surrounding iteration statement".to_string(),
                };
                return Err(self.error(CompileErrorKind::Bind, meta, message));
            }
        };
        if iterators.is_empty() {
            return Ok(Expr::Goto(target));
        }
        let mut items: Vec<Expr> = iterators
            .into_iter()
            .map(|it| Expr::IteratorClose(Binding::Local(it)))
            .collect();
        items.push(Expr::Goto(target));
        Ok(Expr::Block(items))
    }

    fn lower_labeled(&mut self, id: StmtId, mut labels: Vec<Arc<str>>) -> Result<Expr, CompileError> {
        match &self.ast.statement(id).kind {
            StatementType::LabeledStatement { label, body } => {
                labels.push(label.clone());
                self.lower_labeled(*body, labels)
            }
            StatementType::WhileStatement { .. }
            | StatementType::DoWhileStatement { .. }
            | StatementType::ForStatement { .. }
            | StatementType::ForInStatement(_)
            | StatementType::ForOfStatement(_) => self.lower_loop(id, labels),
            StatementType::SwitchStatement { discriminant, cases } => self.lower_switch(*discriminant, cases, labels),
            _ if labels.is_empty() => self.lower_statement(id),
            _ => {
                let label = self.binder.new_label();
                let target = JumpTarget {
                    labels,
                    kind: TargetKind::Labeled,
                    break_label: label,
                    continue_label: None,
                    iterator: None,
                };
                let body = self.with_target(target, |this| this.lower_statement(id))?;
                Ok(Expr::Label(label, body.boxed()))
            }
        }
    }

    fn lower_loop(&mut self, id: StmtId, labels: Vec<Arc<str>>) -> Result<Expr, CompileError> {
        let exit = self.binder.new_label();
        let next = self.binder.new_label();
        let target = |iterator: Option<VarId>| JumpTarget {
            labels: labels.clone(),
            kind: TargetKind::Loop,
            break_label: exit,
            continue_label: Some(next),
            iterator,
        };
        match &self.ast.statement(id).kind {
            StatementType::WhileStatement { test, body } => {
                let test = self.lower_expr(*test)?;
                let body = self.with_target(target(None), |this| this.lower_statement(*body))?;
                Ok(Expr::Label(
                    exit,
                    Expr::Loop(Expr::Block(vec![exit_unless(test, exit), Expr::Label(next, body.boxed())]).boxed())
                        .boxed(),
                ))
            }
            StatementType::DoWhileStatement { body, test } => {
                let body = self.with_target(target(None), |this| this.lower_statement(*body))?;
                let test = self.lower_expr(*test)?;
                Ok(Expr::Label(
                    exit,
                    Expr::Loop(Expr::Block(vec![Expr::Label(next, body.boxed()), exit_unless(test, exit)]).boxed())
                        .boxed(),
                ))
            }
            StatementType::ForStatement {
                init,
                test,
                update,
                body,
            } => self.in_block(|this| {
                let mut items = Vec::new();
                let mut per_iteration = Vec::new();
                match init {
                    Some(VariableDeclarationOrExpression::VariableDeclaration(data)) => {
                        if data.kind != VariableDeclarationKind::Var {
                            let constant = data.kind == VariableDeclarationKind::Const;
                            let mut names = Vec::new();
                            for declarator in &data.declarations {
                                this.ast.bound_names(declarator.id, &mut names);
                            }
                            for name in &names {
                                per_iteration.push(this.binder.declare(name, constant));
                            }
                        }
                        items.push(this.lower_variable_declaration(data)?);
                    }
                    Some(VariableDeclarationOrExpression::Expression(expr)) => items.push(this.lower_expr(*expr)?),
                    None => {}
                }
                let test = test.map(|t| this.lower_expr(t)).transpose()?;
                let update = update.map(|u| this.lower_expr(u)).transpose()?;
                let body = this.with_target(target(None), |this| this.lower_statement(*body))?;

                let mut iteration = Vec::new();
                if let Some(test) = test {
                    iteration.push(exit_unless(test, exit));
                }
                iteration.push(Expr::Label(next, body.boxed()));
                if !per_iteration.is_empty() {
                    iteration.push(Expr::RenewCells(per_iteration.clone()));
                }
                if let Some(update) = update {
                    iteration.push(update);
                }
                items.push(Expr::Label(exit, Expr::Loop(Expr::Block(iteration).boxed()).boxed()));
                Ok(wrap_scope(per_iteration, items))
            }),
            StatementType::ForInStatement(data) => {
                let target = target(None);
                self.lower_for_iteration(data, false, target, exit, next)
            }
            StatementType::ForOfStatement(data) => {
                let target = target(None);
                self.lower_for_iteration(data, true, target, exit, next)
            }
            _ => self.lower_statement(id),
        }
    }

    fn lower_for_iteration(
        &mut self,
        data: &ForIteratorData,
        of: bool,
        mut target: JumpTarget,
        exit: LabelId,
        next: LabelId,
    ) -> Result<Expr, CompileError> {
        let right = self.lower_expr(data.right)?;
        let iterator = self.binder.temp();
        let value = self.binder.temp();
        let source = if of {
            Expr::GetIterator(right.boxed())
        } else {
            Expr::ForInKeys(right.boxed())
        };
        if of {
            target.iterator = Some(iterator);
        }
        let step = self.with_target(target, |this| {
            this.in_block(|this| {
                let (vars, assign) = match &data.left {
                    VariableDeclarationOrPattern::VariableDeclaration(kind, pattern) => {
                        let mut vars = Vec::new();
                        if *kind != VariableDeclarationKind::Var {
                            let mut names = Vec::new();
                            this.ast.bound_names(*pattern, &mut names);
                            for name in &names {
                                vars.push(this.binder.declare(name, *kind == VariableDeclarationKind::Const));
                            }
                        }
                        let assign = this.bind_pattern(
                            *pattern,
                            Expr::Var(Binding::Local(value)),
                            PatternMode::Declaration,
                        )?;
                        (vars, assign)
                    }
                    VariableDeclarationOrPattern::Pattern(pattern) => {
                        let assign =
                            this.bind_pattern(*pattern, Expr::Var(Binding::Local(value)), PatternMode::Assignment)?;
                        (Vec::new(), assign)
                    }
                };
                let body = this.lower_statement(data.body)?;
                Ok(wrap_scope(vars, vec![assign, Expr::Label(next, body.boxed())]))
            })
        })?;
        let advance = Expr::IteratorStep {
            iter: Binding::Local(iterator),
            value: Binding::Local(value),
        };
        Ok(Expr::Block(vec![
            Expr::Assign(Binding::Local(iterator), source.boxed()),
            Expr::Label(
                exit,
                Expr::Loop(Expr::Block(vec![exit_unless(advance, exit), step]).boxed()).boxed(),
            ),
        ]))
    }

    fn lower_switch(
        &mut self,
        discriminant: crate::parser::ast::ExprId,
        cases: &[SwitchCaseData],
        labels: Vec<Arc<str>>,
    ) -> Result<Expr, CompileError> {
        let discriminant = self.lower_expr(discriminant)?;
        let exit = self.binder.new_label();
        self.in_block(|this| {
            let all: Vec<StmtId> = cases.iter().flat_map(|c| c.consequent.iter().copied()).collect();
            let (vars, mut items) = this.hoist_declarations(&all, false)?;
            let target = JumpTarget {
                labels,
                kind: TargetKind::Switch,
                break_label: exit,
                continue_label: None,
                iterator: None,
            };
            let lowered = this.with_target(target, |this| {
                cases
                    .iter()
                    .map(|case| {
                        Ok(SwitchCase {
                            test: case.test.map(|t| this.lower_expr(t)).transpose()?,
                            body: Expr::Block(this.lower_statements(&case.consequent)?),
                        })
                    })
                    .collect::<Result<Vec<_>, CompileError>>()
            })?;
            items.push(Expr::Label(
                exit,
                Expr::Switch {
                    discriminant: discriminant.boxed(),
                    cases: lowered,
                }
                .boxed(),
            ));
            Ok(wrap_scope(vars, items))
        })
    }

    fn lower_try(
        &mut self,
        block: &[StmtId],
        handler: Option<&CatchClauseData>,
        finalizer: Option<&[StmtId]>,
    ) -> Result<Expr, CompileError> {
        let block = self.lower_block(block)?;
        let (catch, vars) = match handler {
            Some(handler) => {
                let (clause, vars) = self.in_block(|this| this.lower_catch(handler))?;
                (Some(Box::new(clause)), vars)
            }
            None => (None, Vec::new()),
        };
        let finally = finalizer.map(|f| self.lower_block(f)).transpose()?;
        let statement = Expr::Try {
            block: block.boxed(),
            catch,
            finally: finally.map(Expr::boxed),
        };
        Ok(wrap_scope(vars, vec![statement]))
    }

    fn lower_catch(&mut self, handler: &CatchClauseData) -> Result<(CatchClause, Vec<VarId>), CompileError> {
        let param = match handler.param {
            Some(param) => param,
            None => {
                let body = self.lower_block(&handler.body)?;
                return Ok((CatchClause { binding: None, body }, Vec::new()));
            }
        };
        if let PatternType::Identifier(name) = &self.ast.pattern(param).kind {
            let var = self.binder.declare(name, false);
            let body = self.lower_block(&handler.body)?;
            return Ok((
                CatchClause {
                    binding: Some(Binding::Local(var)),
                    body,
                },
                vec![var],
            ));
        }
        let mut names = Vec::new();
        self.ast.bound_names(param, &mut names);
        let vars: Vec<VarId> = names.iter().map(|name| self.binder.declare(name, false)).collect();
        let caught = self.binder.temp();
        let destructure = self.bind_pattern(param, Expr::Var(Binding::Local(caught)), PatternMode::Declaration)?;
        let body = self.lower_block(&handler.body)?;
        Ok((
            CatchClause {
                binding: Some(Binding::Local(caught)),
                body: Expr::Block(vec![destructure, body]),
            },
            vars,
        ))
    }

    pub(crate) fn lower_variable_declaration(&mut self, data: &VariableDeclarationData) -> Result<Expr, CompileError> {
        let mut items = Vec::with_capacity(data.declarations.len());
        for declarator in &data.declarations {
            let value = match declarator.init {
                Some(init) => {
                    let name = match &self.ast.pattern(declarator.id).kind {
                        PatternType::Identifier(name) => Some(name.clone()),
                        _ => None,
                    };
                    match self.const_function(data.kind, name.as_ref(), init) {
                        Some((function, var)) => {
                            let ir = self.lower_function(function, name, Some(var), None)?;
                            Expr::Function(Box::new(ir))
                        }
                        None => self.lower_expr_named(init, name)?,
                    }
                }
                None if data.kind == VariableDeclarationKind::Var => continue,
                None => Expr::undefined(),
            };
            items.push(self.bind_pattern(declarator.id, value, PatternMode::Declaration)?);
        }
        Ok(Expr::Block(items))
    }

    /// `const f = function () {}` or `const f = () => {}`: the function can
    /// only ever see itself through `f`, so `f` serves as its self reference.
    fn const_function(
        &mut self,
        kind: VariableDeclarationKind,
        name: Option<&Arc<str>>,
        init: ExprId,
    ) -> Option<(FuncId, VarId)> {
        if kind != VariableDeclarationKind::Const {
            return None;
        }
        let function = match &self.ast.expression(init).kind {
            ExpressionType::FunctionExpression(function) if self.ast.function(*function).id.is_none() => *function,
            _ => return None,
        };
        match self.binder.resolve(name?) {
            Resolution::Local(Resolved {
                binding: Binding::Local(var),
                constant: true,
            }) => Some((function, var)),
            _ => None,
        }
    }
}
