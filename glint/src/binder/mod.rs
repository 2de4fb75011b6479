//! Binder: syntax tree to bound tree
//!
//! Resolves names, types, calls and operators. A local failure produces an
//! error-typed node and a diagnostic; the walk keeps going so one pass reports
//! every independent problem.

pub mod conversion;
pub mod operators;

pub use conversion::{Conversion, classify};

use std::rc::Rc;

use crate::ast::{Expr, FunctionDecl, Literal, Member, Program, Span, Spanned, Stmt, TypeClause, VarDecl};
use crate::bound::{
    ArrayInit, BoundExpr, BoundExprKind, BoundFunction, BoundProgram, BoundStmt, Constant,
    FunctionBody, LoopLabels,
};
use crate::error::{BindErrorKind, CompileError, Diagnostics};
use crate::symbols::{
    FunctionKind, FunctionRef, FunctionSymbol, ScopeChain, SymbolIds, SymbolTable, TypeGroup,
    TypeSymbol, VariableKind, VariableRef,
};
use crate::util::{closest_name, suggestion_suffix};

/// Stack headroom before expression binding grows the stack
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Name of the hidden counter of `loop(N)`
pub const LOOP_ITERATOR: &str = "__iterator";

/// Bind every file into one program
///
/// Diagnostics go to `diagnostics`; the returned program holds whatever bound
/// successfully and must not be lowered or run when diagnostics exist.
#[tracing::instrument(skip_all, fields(files = files.len()))]
pub fn bind(
    files: &[Program],
    table: &mut SymbolTable,
    ids: &mut SymbolIds,
    diagnostics: &mut Diagnostics,
) -> BoundProgram {
    let mut binder = Binder {
        table,
        ids,
        diagnostics,
        program: BoundProgram::new(),
        file: None,
        package: String::new(),
        function: None,
        scopes: ScopeChain::new(),
        loops: Vec::new(),
    };

    binder.collect_packages(files);
    let indexed = binder.index_functions(files);
    binder.index_globals(files);
    for (file, decl, symbol) in indexed {
        binder.bind_function(file, decl, symbol);
    }

    tracing::info!(
        functions = binder.program.len(),
        globals = binder.program.global_count(),
        "binding finished"
    );
    binder.program
}

struct Binder<'a> {
    table: &'a mut SymbolTable,
    ids: &'a mut SymbolIds,
    diagnostics: &'a mut Diagnostics,
    program: BoundProgram,
    /// File and package being bound
    file: Option<usize>,
    package: String,
    /// Function whose body is being bound; `None` for global initializers
    function: Option<FunctionRef>,
    scopes: ScopeChain,
    loops: Vec<LoopLabels>,
}

impl<'a> Binder<'a> {
    fn error(&mut self, kind: BindErrorKind, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(self.file, CompileError::bind(kind, message, span));
    }

    fn enter_file(&mut self, file: usize, program: &Program) {
        self.file = Some(file);
        self.package = program.package_name().to_string();
    }

    // ========================================================================
    // Passes
    // ========================================================================

    /// Create every package, then record its loads
    fn collect_packages(&mut self, files: &[Program]) {
        for program in files {
            self.table.ensure_package(program.package_name());
        }

        for (file, program) in files.iter().enumerate() {
            self.enter_file(file, program);
            for member in &program.members {
                let Member::Load { package, include } = member else {
                    continue;
                };
                if self.table.package(&package.node).is_none() {
                    let known: Vec<String> = self.table.packages().map(|p| p.name.clone()).collect();
                    let known: Vec<&str> = known.iter().map(String::as_str).collect();
                    self.error(
                        BindErrorKind::UnknownPackage,
                        format!(
                            "unknown package `{}`{}",
                            package.node,
                            suggestion_suffix(closest_name(&package.node, &known))
                        ),
                        package.span,
                    );
                    continue;
                }
                self.table
                    .ensure_package(&self.package)
                    .add_load(&package.node, *include);
            }
        }
    }

    /// Register a symbol for every function; duplicates are skipped
    fn index_functions<'p>(
        &mut self,
        files: &'p [Program],
    ) -> Vec<(usize, &'p FunctionDecl, FunctionRef)> {
        let mut indexed = Vec::new();
        for (file, program) in files.iter().enumerate() {
            self.enter_file(file, program);
            for member in &program.members {
                let Member::Function(decl) = member else {
                    continue;
                };
                let params = decl
                    .params
                    .iter()
                    .map(|p| {
                        let ty = self.resolve_type(&p.ty);
                        self.ids.variable(&p.name.node, ty, VariableKind::Parameter)
                    })
                    .collect();
                let return_type = match &decl.ret_ty {
                    Some(ty) => self.resolve_type(ty),
                    None => TypeSymbol::void(),
                };
                let symbol = Rc::new(FunctionSymbol {
                    id: self.ids.function(),
                    name: decl.name.node.clone(),
                    package: self.package.clone(),
                    params,
                    return_type,
                    receiver: None,
                    kind: FunctionKind::Interpreted,
                });

                if self
                    .table
                    .ensure_package(&self.package)
                    .register_function(symbol.clone())
                {
                    tracing::debug!(function = %symbol.qualified_name(), "indexed function");
                    indexed.push((file, decl, symbol));
                } else {
                    let message = format!(
                        "function `{}` is already defined in package `{}`",
                        decl.name.node, self.package
                    );
                    self.error(BindErrorKind::DuplicateSymbol, message, decl.name.span);
                }
            }
        }
        indexed
    }

    /// Register every package global and bind its initializer
    ///
    /// An initializer sees the globals of its package declared before it.
    fn index_globals(&mut self, files: &[Program]) {
        for (file, program) in files.iter().enumerate() {
            self.enter_file(file, program);
            for member in &program.members {
                let Member::Global(decl) = member else {
                    continue;
                };
                let globals = self.package_globals();
                self.scopes = ScopeChain::with_globals(&globals);
                self.function = None;

                let stmt = self.bind_declaration(decl, VariableKind::Global);
                if let BoundStmt::Declaration { variable, .. } = &stmt {
                    if self
                        .table
                        .ensure_package(&self.package)
                        .register_global(variable.clone())
                    {
                        let package = self.package.clone();
                        self.program.push_global_init(&package, self.file, stmt);
                    } else {
                        let message = format!(
                            "global `{}` is already defined in package `{}`",
                            decl.name.node, self.package
                        );
                        self.error(BindErrorKind::DuplicateSymbol, message, decl.name.span);
                    }
                }
            }
        }
    }

    fn package_globals(&self) -> Vec<VariableRef> {
        self.table
            .package(&self.package)
            .map(|p| p.globals().to_vec())
            .unwrap_or_default()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(function = %symbol.qualified_name()))]
    fn bind_function(&mut self, file: usize, decl: &FunctionDecl, symbol: FunctionRef) {
        self.file = Some(file);
        self.package = symbol.package.clone();
        self.function = Some(symbol.clone());
        self.loops.clear();

        let globals = self.package_globals();
        self.scopes = ScopeChain::with_globals(&globals);
        self.scopes.push();
        for (param, decl_param) in symbol.params.iter().zip(&decl.params) {
            if !self.scopes.try_declare(param.clone()) {
                let message = format!("parameter `{}` is declared twice", param.name);
                self.error(BindErrorKind::DuplicateSymbol, message, decl_param.name.span);
            }
        }

        let body = self.bind_stmt(&decl.body);
        self.scopes.pop();
        self.program.insert(BoundFunction {
            symbol,
            file: Some(file),
            body: FunctionBody::Structured(body),
        });
    }

    // ========================================================================
    // Types and conversions
    // ========================================================================

    fn resolve_type(&mut self, clause: &Spanned<TypeClause>) -> TypeSymbol {
        let TypeClause { name, subtypes } = &clause.node;
        if name == "array" {
            if let [element] = subtypes.as_slice() {
                return TypeSymbol::array(self.resolve_type(element));
            }
            self.error(
                BindErrorKind::UnknownType,
                "`array` takes exactly one element type",
                clause.span,
            );
            return TypeSymbol::error();
        }

        match self.table.lookup_type(name) {
            Some(ty) if subtypes.is_empty() => ty.clone(),
            Some(_) => {
                let message = format!("type `{name}` takes no type arguments");
                self.error(BindErrorKind::UnknownType, message, clause.span);
                TypeSymbol::error()
            }
            None => {
                let names = self.table.type_names();
                let message = format!(
                    "unknown type `{name}`{}",
                    suggestion_suffix(closest_name(name, &names))
                );
                self.error(BindErrorKind::UnknownType, message, clause.span);
                TypeSymbol::error()
            }
        }
    }

    /// Convert `expr` to `to`, reporting when no allowed path exists
    ///
    /// Error-typed operands pass through without a second diagnostic.
    fn convert(&mut self, expr: BoundExpr, to: &TypeSymbol, allow_explicit: bool) -> BoundExpr {
        if expr.ty.is_error() {
            return expr;
        }
        if to.is_error() {
            return BoundExpr::error(expr.span);
        }

        match classify(&expr.ty, to) {
            Conversion::Identity => expr,
            Conversion::Implicit => expr.conversion(to.clone()),
            Conversion::Explicit if allow_explicit => expr.conversion(to.clone()),
            Conversion::Explicit => {
                let message = format!(
                    "cannot convert `{}` to `{to}` implicitly; an explicit conversion `{to}(..)` exists",
                    expr.ty
                );
                self.error(BindErrorKind::MissingExplicitCast, message, expr.span);
                BoundExpr::error(expr.span)
            }
            Conversion::None => {
                let message = format!("cannot convert `{}` to `{to}`", expr.ty);
                self.error(BindErrorKind::NoConversion, message, expr.span);
                BoundExpr::error(expr.span)
            }
        }
    }

    fn bind_converted(&mut self, expr: &Spanned<Expr>, to: &TypeSymbol) -> BoundExpr {
        let bound = self.bind_expr(expr);
        self.convert(bound, to, false)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn error_stmt(span: Span) -> BoundStmt {
        BoundStmt::Expression(BoundExpr::error(span))
    }

    fn fresh_loop_labels(&mut self) -> LoopLabels {
        LoopLabels {
            brk: self.ids.label(),
            cont: self.ids.label(),
        }
    }

    /// Bind a loop body with its labels as break/continue targets
    fn bind_loop_body(&mut self, body: &Spanned<Stmt>, labels: LoopLabels) -> BoundStmt {
        self.loops.push(labels);
        let body = self.bind_stmt(body);
        self.loops.pop();
        body
    }

    fn bind_stmt(&mut self, stmt: &Spanned<Stmt>) -> BoundStmt {
        let span = stmt.span;
        match &stmt.node {
            Stmt::Declaration(decl) => self.bind_declaration(decl, VariableKind::Local),
            Stmt::Return(value) => self.bind_return(value.as_ref(), span),
            Stmt::While { cond, body } => {
                self.scopes.push();
                let labels = self.fresh_loop_labels();
                let cond = self.bind_converted(cond, &TypeSymbol::bool());
                let body = self.bind_loop_body(body, labels);
                self.scopes.pop();
                BoundStmt::While {
                    cond,
                    body: Box::new(body),
                    labels,
                }
            }
            Stmt::For {
                init,
                cond,
                action,
                body,
            } => {
                self.scopes.push();
                let labels = self.fresh_loop_labels();
                let init = self.bind_stmt(init);
                let cond = self.bind_converted(cond, &TypeSymbol::bool());
                let action = self.bind_stmt(action);
                let body = self.bind_loop_body(body, labels);
                self.scopes.pop();
                BoundStmt::For {
                    init: Box::new(init),
                    cond,
                    action: Box::new(action),
                    body: Box::new(body),
                    labels,
                }
            }
            Stmt::FromTo {
                iterator,
                lower,
                upper,
                body,
            } => {
                self.scopes.push();
                let labels = self.fresh_loop_labels();
                let lower = self.bind_converted(lower, &TypeSymbol::int());
                let upper = self.bind_converted(upper, &TypeSymbol::int());
                let variable = self
                    .ids
                    .variable(&iterator.node, TypeSymbol::int(), VariableKind::Local);
                self.scopes.try_declare(variable.clone());
                let body = self.bind_loop_body(body, labels);
                self.scopes.pop();
                BoundStmt::FromTo {
                    iterator: variable,
                    lower,
                    upper,
                    body: Box::new(body),
                    labels,
                }
            }
            Stmt::Loop { count, body } => {
                self.scopes.push();
                let labels = self.fresh_loop_labels();
                let count = self.bind_converted(count, &TypeSymbol::int());
                let iterator = self
                    .ids
                    .variable(LOOP_ITERATOR, TypeSymbol::int(), VariableKind::Local);
                let body = self.bind_loop_body(body, labels);
                self.scopes.pop();
                BoundStmt::Loop {
                    iterator,
                    count,
                    body: Box::new(body),
                    labels,
                }
            }
            Stmt::Break | Stmt::Continue => {
                let is_break = matches!(stmt.node, Stmt::Break);
                match self.loops.last().copied() {
                    Some(labels) if is_break => BoundStmt::Goto(labels.brk),
                    Some(labels) => BoundStmt::Goto(labels.cont),
                    None => {
                        let keyword = if is_break { "break" } else { "continue" };
                        let message = format!("`{keyword}` outside of a loop");
                        self.error(BindErrorKind::LoopControlOutsideLoop, message, span);
                        Self::error_stmt(span)
                    }
                }
            }
            Stmt::Block(stmts) => {
                self.scopes.push();
                let bound = stmts.iter().map(|s| self.bind_stmt(s)).collect();
                self.scopes.pop();
                BoundStmt::Block(bound)
            }
            Stmt::Expr(expr) => {
                let bound = self.bind_expr_at(expr, span);
                if !matches!(
                    bound.kind,
                    BoundExprKind::Call { .. } | BoundExprKind::Assign { .. } | BoundExprKind::Error
                ) {
                    self.error(
                        BindErrorKind::InvalidStatement,
                        "only calls and assignments can be used as statements",
                        span,
                    );
                }
                BoundStmt::Expression(bound)
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.bind_converted(cond, &TypeSymbol::bool());
                self.scopes.push();
                let then_branch = self.bind_stmt(then_branch);
                self.scopes.pop();
                let else_branch = else_branch.as_ref().map(|branch| {
                    self.scopes.push();
                    let bound = self.bind_stmt(branch);
                    self.scopes.pop();
                    Box::new(bound)
                });
                BoundStmt::If {
                    cond,
                    then_branch: Box::new(then_branch),
                    else_branch,
                }
            }
        }
    }

    fn bind_declaration(&mut self, decl: &VarDecl, kind: VariableKind) -> BoundStmt {
        let declared = decl.ty.as_ref().map(|ty| self.resolve_type(ty));
        let initializer = decl.init.as_ref().map(|init| self.bind_expr(init));

        let (ty, initializer) = match (declared, initializer) {
            (Some(ty), Some(init)) => {
                let init = self.convert(init, &ty, false);
                (ty, Some(init))
            }
            (Some(ty), None) => (ty, None),
            (None, Some(init)) => (init.ty.clone(), Some(init)),
            (None, None) => {
                let message = format!("variable `{}` needs a type or an initializer", decl.name.node);
                self.error(BindErrorKind::InvalidDeclaration, message, decl.span);
                (TypeSymbol::error(), None)
            }
        };

        let ty = if ty.is_void() {
            let message = format!("variable `{}` cannot have type `void`", decl.name.node);
            self.error(BindErrorKind::InvalidDeclaration, message, decl.span);
            TypeSymbol::error()
        } else {
            ty
        };

        let variable = self.ids.variable(&decl.name.node, ty, kind);
        if kind != VariableKind::Global && !self.scopes.try_declare(variable.clone()) {
            let message = format!("variable `{}` is already declared in this scope", decl.name.node);
            self.error(BindErrorKind::DuplicateSymbol, message, decl.name.span);
            return Self::error_stmt(decl.span);
        }
        BoundStmt::Declaration {
            variable,
            initializer,
        }
    }

    fn bind_return(&mut self, value: Option<&Spanned<Expr>>, span: Span) -> BoundStmt {
        let Some(function) = self.function.clone() else {
            self.error(BindErrorKind::ReturnMismatch, "`return` outside of a function", span);
            return Self::error_stmt(span);
        };
        let expected = &function.return_type;

        match value {
            None if expected.is_void() => BoundStmt::Return(None),
            None => {
                let message = format!(
                    "function `{}` must return a value of type `{expected}`",
                    function.name
                );
                self.error(BindErrorKind::ReturnMismatch, message, span);
                Self::error_stmt(span)
            }
            Some(value) => {
                let bound = self.bind_expr(value);
                if expected.is_void() {
                    let message = format!(
                        "function `{}` returns `void` and cannot return a value",
                        function.name
                    );
                    self.error(BindErrorKind::ReturnMismatch, message, value.span);
                    return Self::error_stmt(span);
                }
                if bound.ty.is_error() || expected.is_error() {
                    return Self::error_stmt(span);
                }
                if bound.ty != *expected {
                    let message = format!(
                        "function `{}` returns `{expected}`, found `{}`",
                        function.name, bound.ty
                    );
                    self.error(BindErrorKind::ReturnMismatch, message, value.span);
                    return Self::error_stmt(span);
                }
                BoundStmt::Return(Some(bound))
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn bind_expr(&mut self, expr: &Spanned<Expr>) -> BoundExpr {
        self.bind_expr_at(&expr.node, expr.span)
    }

    fn bind_expr_at(&mut self, expr: &Expr, span: Span) -> BoundExpr {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.bind_expr_inner(expr, span))
    }

    fn bind_expr_inner(&mut self, expr: &Expr, span: Span) -> BoundExpr {
        match expr {
            Expr::Literal(literal) => self.bind_literal(literal, span),
            Expr::Paren(inner) => {
                let inner = self.bind_expr(inner);
                let ty = inner.ty.clone();
                BoundExpr::new(BoundExprKind::Paren(Box::new(inner)), ty, span)
            }
            Expr::Assign { target, value } => {
                let target = self.bind_expr(target);
                if target.is_error() {
                    self.bind_expr(value);
                    return BoundExpr::error(span);
                }
                if !matches!(target.kind, BoundExprKind::Name(_) | BoundExprKind::Index { .. }) {
                    self.error(
                        BindErrorKind::InvalidAssignmentTarget,
                        "only variables and array elements can be assigned",
                        target.span,
                    );
                    self.bind_expr(value);
                    return BoundExpr::error(span);
                }
                let ty = target.ty.clone();
                let value = self.bind_converted(value, &ty);
                BoundExpr::new(
                    BoundExprKind::Assign {
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    ty,
                    span,
                )
            }
            Expr::Unary { op, operand } => {
                let operand = self.bind_expr(operand);
                if operand.ty.is_error() {
                    return BoundExpr::error(span);
                }
                match operators::resolve_unary(*op, &operand.ty) {
                    Some(resolved) => BoundExpr::new(
                        BoundExprKind::Unary {
                            op: resolved.op,
                            operand: Box::new(operand),
                        },
                        resolved.result_ty,
                        span,
                    ),
                    None => {
                        let message = format!("operator `{op}` is not defined for `{}`", operand.ty);
                        self.error(BindErrorKind::NoOperator, message, span);
                        BoundExpr::error(span)
                    }
                }
            }
            Expr::Binary { left, op, right } => {
                let left = self.bind_expr(left);
                let right = self.bind_expr(right);
                if left.ty.is_error() || right.ty.is_error() {
                    return BoundExpr::error(span);
                }
                let Some(resolved) = operators::resolve_binary(*op, &left.ty, &right.ty) else {
                    let message = format!(
                        "operator `{op}` is not defined for `{}` and `{}`",
                        left.ty, right.ty
                    );
                    self.error(BindErrorKind::NoOperator, message, span);
                    return BoundExpr::error(span);
                };
                let left = self.convert(left, &resolved.operand_ty, false);
                let right = self.convert(right, &resolved.operand_ty, false);
                let mut bound = BoundExpr::binary(left, resolved.op, right, resolved.result_ty);
                bound.span = span;
                bound
            }
            Expr::Call {
                package,
                name,
                args,
            } => self.bind_call(package.as_ref(), name, args, span),
            Expr::MethodCall {
                receiver,
                name,
                args,
            } => self.bind_method_call(receiver, name, args, span),
            Expr::Name(name) => match self.scopes.lookup(name) {
                Some(variable) => BoundExpr::name(variable.clone(), span),
                None => {
                    let message = format!(
                        "unknown name `{name}`{}",
                        suggestion_suffix(closest_name(name, &self.scopes.visible_names()))
                    );
                    self.error(BindErrorKind::UnknownName, message, span);
                    BoundExpr::error(span)
                }
            },
            Expr::MakeArray {
                ty,
                length,
                elements,
            } => self.bind_make_array(ty, length.as_deref(), elements.as_deref(), span),
            Expr::Index { target, index } => {
                let target = self.bind_expr(target);
                if target.ty.is_error() {
                    self.bind_expr(index);
                    return BoundExpr::error(span);
                }
                let Some(element) = target.ty.element_type().cloned() else {
                    let message = format!("cannot index a value of type `{}`", target.ty);
                    self.error(BindErrorKind::NotAnArray, message, target.span);
                    self.bind_expr(index);
                    return BoundExpr::error(span);
                };
                let index = self.bind_converted(index, &TypeSymbol::int());
                BoundExpr::new(
                    BoundExprKind::Index {
                        target: Box::new(target),
                        index: Box::new(index),
                    },
                    element,
                    span,
                )
            }
        }
    }

    fn bind_literal(&mut self, literal: &Literal, span: Span) -> BoundExpr {
        let constant = match literal {
            Literal::String(s) => Constant::Str(Rc::from(s.as_str())),
            Literal::Bool(b) => Constant::Bool(*b),
            Literal::Number(text) if text.contains('.') => match text.parse::<f32>() {
                Ok(x) => Constant::Float(x),
                Err(_) => return self.malformed_number(text, span),
            },
            Literal::Number(text) => match text.parse::<i32>() {
                Ok(n) => Constant::Int(n),
                Err(_) => return self.malformed_number(text, span),
            },
        };
        let ty = match &constant {
            Constant::Int(_) => TypeSymbol::int(),
            Constant::Float(_) => TypeSymbol::float(),
            Constant::Bool(_) => TypeSymbol::bool(),
            Constant::Str(_) => TypeSymbol::string(),
        };
        BoundExpr::new(BoundExprKind::Literal(constant), ty, span)
    }

    fn malformed_number(&mut self, text: &str, span: Span) -> BoundExpr {
        let message = format!("malformed number `{text}`");
        self.error(BindErrorKind::MalformedLiteral, message, span);
        BoundExpr::error(span)
    }

    /// Bind arguments only for their diagnostics
    fn bind_discarded(&mut self, args: &[Spanned<Expr>]) {
        for arg in args {
            self.bind_expr(arg);
        }
    }

    fn bind_call(
        &mut self,
        package: Option<&Spanned<String>>,
        name: &Spanned<String>,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> BoundExpr {
        // `T(x)` is an explicit conversion when `T` names a type
        if package.is_none() && args.len() == 1 {
            if let Some(ty) = self.table.lookup_type(&name.node).cloned() {
                let operand = self.bind_expr(&args[0]);
                let mut converted = self.convert(operand, &ty, true);
                converted.span = span;
                return converted;
            }
        }

        let Some(function) = self.resolve_function(package, name) else {
            self.bind_discarded(args);
            return BoundExpr::error(span);
        };
        self.bind_invocation(function, None, args, span)
    }

    /// Find the callee of a plain or qualified call
    fn resolve_function(
        &mut self,
        package: Option<&Spanned<String>>,
        name: &Spanned<String>,
    ) -> Option<FunctionRef> {
        let current = self.table.package(&self.package)?.clone();

        if let Some(package) = package {
            if !current.can_reference(&package.node) {
                let message = if self.table.package(&package.node).is_some() {
                    format!("package `{}` is not loaded by `{}`", package.node, self.package)
                } else {
                    format!("unknown package `{}`", package.node)
                };
                self.error(BindErrorKind::UnknownPackage, message, package.span);
                return None;
            }
            let target = self.table.package(&package.node)?;
            if let Some(function) = target.function(&name.node) {
                return Some(function.clone());
            }
            let names: Vec<&str> = target.functions().iter().map(|f| f.name.as_str()).collect();
            let message = format!(
                "unknown function `{}::{}`{}",
                package.node,
                name.node,
                suggestion_suffix(closest_name(&name.node, &names))
            );
            self.error(BindErrorKind::UnknownFunction, message, name.span);
            return None;
        }

        let mut candidates: Vec<String> = Vec::new();
        let searched = std::iter::once(current.name.clone()).chain(current.includes().iter().cloned());
        for package_name in searched {
            let Some(package) = self.table.package(&package_name) else {
                continue;
            };
            if let Some(function) = package.function(&name.node) {
                return Some(function.clone());
            }
            candidates.extend(package.functions().iter().map(|f| f.name.clone()));
        }

        let candidates: Vec<&str> = candidates.iter().map(String::as_str).collect();
        let message = format!(
            "unknown function `{}`{}",
            name.node,
            suggestion_suffix(closest_name(&name.node, &candidates))
        );
        self.error(BindErrorKind::UnknownFunction, message, name.span);
        None
    }

    fn bind_method_call(
        &mut self,
        receiver: &Spanned<Expr>,
        name: &Spanned<String>,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> BoundExpr {
        let receiver = self.bind_expr(receiver);
        if receiver.ty.is_error() {
            self.bind_discarded(args);
            return BoundExpr::error(span);
        }

        let method = match receiver.ty.group() {
            TypeGroup::Container => self.table.container(&receiver.ty).map(|container| {
                let names: Vec<&str> = container.methods.iter().map(|m| m.name.as_str()).collect();
                container
                    .method(&name.node)
                    .cloned()
                    .ok_or_else(|| closest_name(&name.node, &names).map(str::to_string))
            }),
            _ => None,
        };

        let method = match method {
            Some(Ok(method)) => method,
            Some(Err(suggestion)) => {
                let message = format!(
                    "type `{}` has no method `{}`{}",
                    receiver.ty,
                    name.node,
                    suggestion_suffix(suggestion.as_deref())
                );
                self.error(BindErrorKind::UnknownFunction, message, name.span);
                self.bind_discarded(args);
                return BoundExpr::error(span);
            }
            None => {
                let message = format!("type `{}` has no methods", receiver.ty);
                self.error(BindErrorKind::UnknownFunction, message, name.span);
                self.bind_discarded(args);
                return BoundExpr::error(span);
            }
        };
        self.bind_invocation(method, Some(receiver), args, span)
    }

    /// Check arity and convert each argument to its parameter type
    fn bind_invocation(
        &mut self,
        function: FunctionRef,
        receiver: Option<BoundExpr>,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> BoundExpr {
        if args.len() != function.params.len() {
            let message = format!(
                "function `{}` expects {} argument(s), found {}",
                function.qualified_name(),
                function.params.len(),
                args.len()
            );
            self.error(BindErrorKind::ArityMismatch, message, span);
            self.bind_discarded(args);
            return BoundExpr::error(span);
        }

        let args = args
            .iter()
            .zip(&function.params)
            .map(|(arg, param)| self.bind_converted(arg, &param.ty))
            .collect();
        let ty = function.return_type.clone();
        BoundExpr::new(
            BoundExprKind::Call {
                function,
                receiver: receiver.map(Box::new),
                args,
            },
            ty,
            span,
        )
    }

    fn bind_make_array(
        &mut self,
        ty: &Spanned<TypeClause>,
        length: Option<&Spanned<Expr>>,
        elements: Option<&[Spanned<Expr>]>,
        span: Span,
    ) -> BoundExpr {
        let array_ty = self.resolve_type(ty);
        let element = array_ty.element_type().cloned();

        let init = match (length, elements, element) {
            (_, _, _) if array_ty.is_error() => None,
            (_, _, None) => {
                let message = format!("`make` needs an array type, found `{array_ty}`");
                self.error(BindErrorKind::InvalidArrayConstruction, message, ty.span);
                None
            }
            (Some(length), None, Some(_)) => {
                let length = self.bind_converted(length, &TypeSymbol::int());
                Some(ArrayInit::Length(Box::new(length)))
            }
            (None, Some(elements), Some(element)) => {
                let elements = elements
                    .iter()
                    .map(|e| self.bind_converted(e, &element))
                    .collect();
                Some(ArrayInit::Elements(elements))
            }
            (_, _, Some(_)) => {
                self.error(
                    BindErrorKind::InvalidArrayConstruction,
                    "`make` takes either a length or an element list",
                    span,
                );
                None
            }
        };

        match init {
            Some(init) => BoundExpr::new(BoundExprKind::MakeArray(init), array_ty, span),
            None => {
                if let Some(length) = length {
                    self.bind_expr(length);
                }
                self.bind_discarded(elements.unwrap_or_default());
                BoundExpr::error(span)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn bind_source(source: &str) -> (BoundProgram, Diagnostics) {
        let tokens = tokenize(source).expect("lex");
        let program = parse("test.gl", source, tokens).expect("parse");
        let mut table = SymbolTable::new();
        let mut ids = SymbolIds::new();
        let mut diagnostics = Diagnostics::new();
        let bound = bind(&[program], &mut table, &mut ids, &mut diagnostics);
        (bound, diagnostics)
    }

    fn kinds(source: &str) -> Vec<BindErrorKind> {
        let (_, diagnostics) = bind_source(source);
        diagnostics.errors().filter_map(|e| e.bind_kind()).collect()
    }

    #[test]
    fn test_bind_simple_function() {
        let (program, diagnostics) =
            bind_source("function main() int { var x int <- 2; var y int <- 3; return x + y }");
        assert!(diagnostics.is_empty());
        let main = program.functions().next().expect("main");
        assert_eq!(main.symbol.return_type, TypeSymbol::int());
        let FunctionBody::Structured(BoundStmt::Block(stmts)) = &main.body else {
            panic!("expected structured block");
        };
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[2].to_string(), "return (x + y)");
    }

    #[test]
    fn test_inferred_declaration_and_widening() {
        let (program, diagnostics) =
            bind_source("function main() long { var b byte <- byte(1); var l long <- b; return l + b }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let listing = crate::bound::format_program(&program);
        assert!(listing.contains("var l long <- long(b)"), "{listing}");
        assert!(listing.contains("return (l + long(b))"), "{listing}");
    }

    #[test]
    fn test_missing_explicit_cast_vs_no_conversion() {
        assert_eq!(
            kinds("function main() { var b byte <- 300 }"),
            vec![BindErrorKind::MissingExplicitCast]
        );
        assert_eq!(
            kinds("function main() { var b int <- true }"),
            vec![BindErrorKind::NoConversion]
        );
        assert!(kinds("function main() { var b byte <- byte(300) }").is_empty());
    }

    #[test]
    fn test_error_nodes_do_not_cascade() {
        assert_eq!(
            kinds("function main() { var x int <- missing + 1; var y int <- x }"),
            vec![BindErrorKind::UnknownName]
        );
    }

    #[test]
    fn test_duplicate_function_first_wins() {
        let (program, diagnostics) = bind_source(
            "function calc() int { return 1 }
             function calc() bool { return true }",
        );
        assert_eq!(diagnostics.count_kind(BindErrorKind::DuplicateSymbol), 1);
        assert_eq!(program.len(), 1);
        let calc = program.functions().next().expect("calc");
        assert_eq!(calc.symbol.return_type, TypeSymbol::int());
    }

    #[test]
    fn test_scope_rules() {
        assert_eq!(
            kinds("function main() { var x <- 1; var x <- 2 }"),
            vec![BindErrorKind::DuplicateSymbol]
        );
        assert!(kinds("function main() { var x <- 1; { var x <- true } }").is_empty());
        assert_eq!(
            kinds("function main() { { var inner <- 1 } inner <- 2 }"),
            vec![BindErrorKind::UnknownName]
        );
    }

    #[test]
    fn test_return_rules() {
        assert_eq!(kinds("function f() { return 1 }"), vec![BindErrorKind::ReturnMismatch]);
        assert_eq!(kinds("function f() int { return }"), vec![BindErrorKind::ReturnMismatch]);
        // no widening at return
        assert_eq!(
            kinds("function f() long { return 1 }"),
            vec![BindErrorKind::ReturnMismatch]
        );
    }

    #[test]
    fn test_statement_rules() {
        assert_eq!(kinds("function f() { 1 + 2 }"), vec![BindErrorKind::InvalidStatement]);
        assert_eq!(kinds("function f() { break }"), vec![BindErrorKind::LoopControlOutsideLoop]);
        assert_eq!(kinds("function f() { var x }"), vec![BindErrorKind::InvalidDeclaration]);
        assert_eq!(
            kinds("function g() { } function f() { var x <- g() }"),
            vec![BindErrorKind::InvalidDeclaration]
        );
    }

    #[test]
    fn test_conditions_must_be_bool() {
        assert_eq!(kinds("function f() { if (1) return }"), vec![BindErrorKind::NoConversion]);
        assert_eq!(kinds("function f() { while (1) { } }"), vec![BindErrorKind::NoConversion]);
    }

    #[test]
    fn test_call_rules() {
        assert_eq!(
            kinds("function g(a int) { } function f() { g(1, 2) }"),
            vec![BindErrorKind::ArityMismatch]
        );
        assert_eq!(kinds("function f() { nope() }"), vec![BindErrorKind::UnknownFunction]);
        assert_eq!(kinds("function f() { other::g() }"), vec![BindErrorKind::UnknownPackage]);
    }

    #[test]
    fn test_unknown_name_suggests_similar() {
        let (_, diagnostics) = bind_source("function f() { var total <- 1; totl <- 2 }");
        let message = diagnostics.errors().next().map(|e| e.message()).unwrap_or_default();
        assert!(message.contains("did you mean `total`"), "{message}");
    }

    #[test]
    fn test_array_rules() {
        assert!(kinds("function f() { var a <- make array[int](3); a[0] <- 1 }").is_empty());
        assert_eq!(
            kinds("function f() { var a <- make int(3) }"),
            vec![BindErrorKind::InvalidArrayConstruction]
        );
        assert_eq!(kinds("function f() { var a <- 1; a[0] <- 2 }"), vec![BindErrorKind::NotAnArray]);
        assert_eq!(
            kinds("function f() { var a <- make array[int] { 1, true } }"),
            vec![BindErrorKind::NoConversion]
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(
            kinds("function g() int { return 1 } function f() { g() <- 2 }"),
            vec![BindErrorKind::InvalidAssignmentTarget]
        );
    }

    #[test]
    fn test_malformed_literals() {
        assert_eq!(kinds("function f() { var x <- 1.2.3 }"), vec![BindErrorKind::MalformedLiteral]);
        assert_eq!(
            kinds("function f() { var x <- 99999999999 }"),
            vec![BindErrorKind::MalformedLiteral]
        );
    }

    #[test]
    fn test_operator_errors() {
        assert_eq!(kinds("function f() { var x <- 1 + 1.5 }"), vec![BindErrorKind::NoOperator]);
        assert_eq!(kinds("function f() { var x <- !1 }"), vec![BindErrorKind::NoOperator]);
    }

    #[test]
    fn test_unknown_types() {
        assert_eq!(kinds("function f(x integer) { }"), vec![BindErrorKind::UnknownType]);
        assert_eq!(kinds("function f() strng { }"), vec![BindErrorKind::UnknownType]);
        assert_eq!(
            kinds("function f() { var a <- make array(2) }"),
            vec![BindErrorKind::UnknownType]
        );
        assert_eq!(kinds("var g int[bool] <- 1"), vec![BindErrorKind::UnknownType]);

        let (_, diagnostics) = bind_source("function f() { var s strng <- \"\" }");
        let message = diagnostics.errors().next().map(|e| e.message()).unwrap_or_default();
        assert!(message.contains("did you mean `string`"), "{message}");
    }

    #[test]
    fn test_method_call_rules() {
        let source = "function f() { var n <- 1; n.Append(\"x\") }";
        let (_, diagnostics) = bind_source(source);
        assert_eq!(diagnostics.count_kind(BindErrorKind::UnknownFunction), 1);
        let message = diagnostics.errors().next().map(|e| e.message()).unwrap_or_default();
        assert_eq!(message, "type `int` has no methods");
    }

    #[test]
    fn test_globals_visible_in_functions() {
        let (program, diagnostics) =
            bind_source("var counter int <- 5; function f() int { counter <- counter + 1; return counter }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(program.global_count(), 1);
    }
}
