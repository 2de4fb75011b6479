//! Evaluator for lowered programs
//!
//! Every interpreted call pushes a [`StackFrame`], indexes its labels and
//! runs a fetch-execute loop over the flat statement list. Jumps overwrite the
//! instruction pointer; everything else advances it by one.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::io::Write;

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::frame::StackFrame;
use super::value::Value;
use crate::ast::Span;
use crate::bound::{
    ArrayInit, BinaryOperator, BoundExpr, BoundExprKind, BoundProgram, BoundStmt, FunctionBody,
    Label,
};
use crate::config::RuntimeConfig;
use crate::native::NativeContext;
use crate::symbols::{FunctionKind, FunctionRef, SymbolTable, TypeSymbol, VariableId, VariableRef};

/// Stack headroom before a call or expression grows the native stack
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Name prefix of the frames that run package global initializers
const GLOBALS_FRAME: &str = "<globals>";

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Return value of the entry function; `Void` after `sys::Exit`
    pub value: Value,
    pub exit_code: i32,
}

/// Runs a bound, lowered program
pub struct Evaluator<'a> {
    program: &'a BoundProgram,
    table: &'a SymbolTable,
    config: &'a RuntimeConfig,
    out: &'a mut dyn Write,
    globals: HashMap<VariableId, Value>,
    frames: Vec<StackFrame>,
    /// Recoverable errors reported so far
    diagnostics: Vec<RuntimeError>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        program: &'a BoundProgram,
        table: &'a SymbolTable,
        config: &'a RuntimeConfig,
        out: &'a mut dyn Write,
    ) -> Self {
        Evaluator {
            program,
            table,
            config,
            out,
            globals: HashMap::new(),
            frames: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Run global initializers, then `entry`
    ///
    /// `sys::Exit` ends the run successfully with its exit code.
    #[tracing::instrument(skip_all, fields(entry = %entry.qualified_name()))]
    pub fn run(&mut self, entry: &FunctionRef) -> InterpResult<Execution> {
        let result = self.run_globals(&entry.package).and_then(|()| {
            let args = entry
                .params
                .iter()
                .map(|param| self.default_value(&param.ty))
                .collect();
            self.call(entry, args, None)
        });

        self.frames.clear();
        match result {
            Ok(value) => {
                tracing::info!(diagnostics = self.diagnostics.len(), "evaluation finished");
                Ok(Execution {
                    value,
                    exit_code: 0,
                })
            }
            Err(err) => match err.kind {
                ErrorKind::Exit(code) => {
                    tracing::info!(code, "program exited");
                    Ok(Execution {
                        value: Value::Void,
                        exit_code: code,
                    })
                }
                _ => Err(err),
            },
        }
    }

    /// Recoverable errors reported so far, oldest first
    pub fn take_diagnostics(&mut self) -> Vec<RuntimeError> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Initialize every package global
    ///
    /// Each global holds its default first. Initializers then run package by
    /// package, every package after the packages it loads, starting from the
    /// entry package; a package in a load cycle sees defaults for the globals
    /// of packages not yet initialized.
    fn run_globals(&mut self, entry_package: &str) -> InterpResult<()> {
        let program = self.program;
        for group in program.global_inits() {
            for stmt in &group.stmts {
                if let BoundStmt::Declaration { variable, .. } = stmt {
                    let value = self.default_value(&variable.ty);
                    self.globals.insert(variable.id, value);
                }
            }
        }

        let mut visited = HashSet::new();
        let mut order = Vec::new();
        init_order(self.table, entry_package, &mut visited, &mut order);
        for group in program.global_inits() {
            init_order(self.table, &group.package, &mut visited, &mut order);
        }

        for package in order {
            let groups = program.global_inits().iter().filter(|g| g.package == package);
            for group in groups {
                tracing::debug!(%package, globals = group.stmts.len(), "initializing globals");
                self.frames.push(StackFrame::new(
                    format!("{GLOBALS_FRAME} {package}"),
                    group.file,
                    &group.stmts,
                    Value::Void,
                ));
                let result = self.run_frame(&group.stmts);
                self.frames.pop();
                result?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a native or interpreted function with evaluated arguments
    pub fn call(
        &mut self,
        function: &FunctionRef,
        args: Vec<Value>,
        receiver: Option<Value>,
    ) -> InterpResult<Value> {
        match &function.kind {
            FunctionKind::Native(callable) => {
                tracing::debug!(function = %function.qualified_name(), "native call");
                let mut context = NativeContext { out: &mut *self.out };
                callable.invoke(&mut context, receiver.as_ref(), &args)
            }
            FunctionKind::Interpreted => {
                stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
                    self.call_interpreted(function, args)
                })
            }
        }
    }

    fn call_interpreted(&mut self, function: &FunctionRef, args: Vec<Value>) -> InterpResult<Value> {
        if self.frames.len() >= self.config.max_call_depth {
            return Err(RuntimeError::stack_overflow(self.config.max_call_depth));
        }

        let program = self.program;
        let name = function.qualified_name();
        let bound = program
            .function(function.id)
            .ok_or_else(|| RuntimeError::unresolved_function(&name))?;
        let FunctionBody::Lowered(body) = &bound.body else {
            return Err(RuntimeError::unlowered(&name));
        };

        tracing::debug!(function = %name, depth = self.frames.len(), "call");
        let default_return = self.default_value(&function.return_type);
        let mut frame = StackFrame::new(name, bound.file, body, default_return);
        for (param, arg) in function.params.iter().zip(args) {
            frame.set_local(param.id, arg);
        }

        self.frames.push(frame);
        let result = self.run_frame(body);
        let frame = self.frames.pop();
        tracing::trace!(depth = self.frames.len(), "frame popped");
        result?;

        Ok(frame.map(|f| f.return_value).unwrap_or(Value::Void))
    }

    /// Fetch-execute loop of the topmost frame
    fn run_frame(&mut self, body: &'a [BoundStmt]) -> InterpResult<()> {
        loop {
            let Some(frame) = self.frames.last() else {
                return Ok(());
            };
            if frame.returned || frame.ip >= body.len() {
                return Ok(());
            }

            let ip = frame.ip;
            let next = self.execute(&body[ip])?.unwrap_or(ip + 1);
            if let Some(frame) = self.frames.last_mut() {
                frame.ip = next;
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Execute one statement; `Some(ip)` is a jump
    fn execute(&mut self, stmt: &'a BoundStmt) -> InterpResult<Option<usize>> {
        match stmt {
            BoundStmt::Declaration {
                variable,
                initializer,
            } => {
                let value = match initializer {
                    Some(init) => self.eval_expr(init)?,
                    None => self.default_value(&variable.ty),
                };
                self.store(variable, value)?;
            }

            BoundStmt::Return(value) => {
                let value = value.as_ref().map(|v| self.eval_expr(v)).transpose()?;
                if let Some(frame) = self.frames.last_mut() {
                    if let Some(value) = value {
                        frame.return_value = value;
                    }
                    frame.returned = true;
                }
            }

            BoundStmt::Expression(expr) => {
                self.eval_expr(expr)?;
            }

            BoundStmt::Label(_) => {}

            BoundStmt::Goto(label) => return self.jump(*label).map(Some),

            BoundStmt::GotoIf { cond, label } => {
                if self.eval_expr(cond)?.as_bool()? {
                    return self.jump(*label).map(Some);
                }
            }

            BoundStmt::Delete(variable) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.remove_local(variable.id);
                }
            }

            BoundStmt::Approach { variable, target } => {
                let current = self.load(variable)?.as_int()?;
                let goal = self.load(target)?.as_int()?;
                let step = match current.cmp(&goal) {
                    Ordering::Less => current + 1,
                    Ordering::Greater => current - 1,
                    Ordering::Equal => current,
                };
                let value = Value::Long(step).convert(&variable.ty)?;
                self.store(variable, value)?;
            }

            BoundStmt::While { .. }
            | BoundStmt::For { .. }
            | BoundStmt::FromTo { .. }
            | BoundStmt::Loop { .. }
            | BoundStmt::If { .. }
            | BoundStmt::Block(_) => {
                let function = self
                    .frames
                    .last()
                    .map(|f| f.function.clone())
                    .unwrap_or_default();
                return Err(RuntimeError::unlowered(&function));
            }
        }
        Ok(None)
    }

    fn jump(&self, label: Label) -> InterpResult<usize> {
        self.frames
            .last()
            .and_then(|frame| frame.label(label))
            .ok_or_else(|| RuntimeError::unresolved_label(label))
    }

    fn load(&self, variable: &VariableRef) -> InterpResult<Value> {
        let value = if variable.is_global() {
            self.globals.get(&variable.id)
        } else {
            self.frames.last().and_then(|frame| frame.local(variable.id))
        };
        value
            .cloned()
            .ok_or_else(|| RuntimeError::unresolved_variable(&variable.name))
    }

    fn store(&mut self, variable: &VariableRef, value: Value) -> InterpResult<()> {
        if variable.is_global() {
            self.globals.insert(variable.id, value);
            return Ok(());
        }
        match self.frames.last_mut() {
            Some(frame) => {
                frame.set_local(variable.id, value);
                Ok(())
            }
            None => Err(RuntimeError::unresolved_variable(&variable.name)),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval_expr(&mut self, expr: &'a BoundExpr) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.eval_expr_inner(expr)
                .map_err(|err| err.at(expr.span, self.current_file()))
        })
    }

    fn eval_expr_inner(&mut self, expr: &'a BoundExpr) -> InterpResult<Value> {
        match &expr.kind {
            BoundExprKind::Literal(constant) => Ok(Value::from_constant(constant)),

            BoundExprKind::Paren(inner) => self.eval_expr(inner),

            BoundExprKind::Name(variable) => self.load(variable),

            BoundExprKind::Assign { target, value } => self.eval_assign(target, value),

            BoundExprKind::Unary { op, operand } => self.eval_expr(operand)?.unary(*op),

            BoundExprKind::Binary { left, op, right } => match op {
                BinaryOperator::And => {
                    if !self.eval_expr(left)?.as_bool()? {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(self.eval_expr(right)?.as_bool()?))
                }
                BinaryOperator::Or => {
                    if self.eval_expr(left)?.as_bool()? {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(self.eval_expr(right)?.as_bool()?))
                }
                _ => {
                    let l = self.eval_expr(left)?;
                    let r = self.eval_expr(right)?;
                    match Value::binary(*op, &l, &r) {
                        Ok(value) => Ok(value),
                        Err(err) => {
                            let placeholder = self.default_value(&expr.ty);
                            self.recover(err, expr.span, placeholder)
                        }
                    }
                }
            },

            BoundExprKind::Call {
                function,
                receiver,
                args,
            } => {
                let receiver = receiver
                    .as_deref()
                    .map(|r| self.eval_expr(r))
                    .transpose()?;
                let args = args
                    .iter()
                    .map(|arg| self.eval_expr(arg))
                    .collect::<InterpResult<Vec<_>>>()?;
                self.call(function, args, receiver)
            }

            BoundExprKind::Conversion(operand) => {
                let value = self.eval_expr(operand)?;
                match value.convert(&expr.ty) {
                    Ok(value) => Ok(value),
                    Err(err) => {
                        let placeholder = self.default_value(&expr.ty);
                        self.recover(err, expr.span, placeholder)
                    }
                }
            }

            BoundExprKind::MakeArray(init) => self.eval_make_array(expr, init),

            BoundExprKind::Index { target, index } => {
                let array = self.eval_expr(target)?;
                let index = self.eval_expr(index)?.as_int()?;
                let Value::Array(array) = array else {
                    return Err(RuntimeError::operand_mismatch("array", array.type_name()));
                };

                let (element, len) = {
                    let instance = array.borrow();
                    let element = usize::try_from(index)
                        .ok()
                        .and_then(|i| instance.elements.get(i).cloned());
                    (element, instance.elements.len())
                };
                match element {
                    Some(value) => Ok(value),
                    None => {
                        let placeholder = self.default_value(&expr.ty);
                        self.recover(
                            RuntimeError::index_out_of_bounds(index, len),
                            expr.span,
                            placeholder,
                        )
                    }
                }
            }

            BoundExprKind::Error => Err(RuntimeError::error_node()),
        }
    }

    /// Assignment yields the assigned value
    fn eval_assign(&mut self, target: &'a BoundExpr, value: &'a BoundExpr) -> InterpResult<Value> {
        match &target.kind {
            BoundExprKind::Name(variable) => {
                let value = self.eval_expr(value)?;
                self.store(variable, value.clone())?;
                Ok(value)
            }
            BoundExprKind::Index { target: array, index } => {
                let array = self.eval_expr(array)?;
                let index = self.eval_expr(index)?.as_int()?;
                let value = self.eval_expr(value)?;
                let Value::Array(array) = array else {
                    return Err(RuntimeError::operand_mismatch("array", array.type_name()));
                };

                let len = {
                    let mut instance = array.borrow_mut();
                    let len = instance.elements.len();
                    match usize::try_from(index).ok().filter(|&i| i < len) {
                        Some(i) => {
                            instance.elements[i] = value.clone();
                            return Ok(value);
                        }
                        None => len,
                    }
                };
                self.recover(
                    RuntimeError::index_out_of_bounds(index, len),
                    target.span,
                    value,
                )
            }
            _ => Err(RuntimeError::error_node()),
        }
    }

    fn eval_make_array(&mut self, expr: &'a BoundExpr, init: &'a ArrayInit) -> InterpResult<Value> {
        let element_type = expr
            .ty
            .element_type()
            .cloned()
            .unwrap_or_else(TypeSymbol::error);

        match init {
            ArrayInit::Length(len) => {
                let len = self.eval_expr(len)?.as_int()?;
                match usize::try_from(len) {
                    Ok(n) => {
                        let elements = (0..n).map(|_| self.default_value(&element_type)).collect();
                        Ok(Value::array(element_type, elements))
                    }
                    Err(_) => {
                        let empty = Value::array(element_type, Vec::new());
                        self.recover(RuntimeError::negative_length(len), expr.span, empty)
                    }
                }
            }
            ArrayInit::Elements(items) => {
                let elements = items
                    .iter()
                    .map(|item| self.eval_expr(item))
                    .collect::<InterpResult<Vec<_>>>()?;
                Ok(Value::array(element_type, elements))
            }
        }
    }

    fn current_file(&self) -> Option<usize> {
        self.frames.last().and_then(|frame| frame.file)
    }

    fn default_value(&self, ty: &TypeSymbol) -> Value {
        Value::default_for(ty, self.table)
    }

    /// Report a recoverable error and continue with `placeholder`
    ///
    /// In strict mode, and for every other kind, the error is returned.
    fn recover(&mut self, err: RuntimeError, span: Span, placeholder: Value) -> InterpResult<Value> {
        let err = err.at(span, self.current_file());
        if self.config.strict || !err.kind.is_recoverable() {
            return Err(err);
        }
        let function = self.frames.last().map(|f| f.function.as_str()).unwrap_or_default();
        tracing::warn!(%function, "{err}");
        self.diagnostics.push(err);
        Ok(placeholder)
    }
}

/// Post-order walk of the load graph: loaded packages come first
fn init_order(
    table: &SymbolTable,
    package: &str,
    visited: &mut HashSet<String>,
    order: &mut Vec<String>,
) {
    if !visited.insert(package.to_string()) {
        return;
    }
    if let Some(loads) = table.package(package).map(|p| p.loads()) {
        for loaded in loads {
            init_order(table, loaded, visited, order);
        }
    }
    order.push(package.to_string());
}
