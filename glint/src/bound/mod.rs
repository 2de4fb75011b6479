//! Bound tree: the typed, resolved program
//!
//! Produced by the binder, rewritten in place by the lowerer and executed by
//! the evaluator. After lowering a function body only holds `Label`, `Goto`,
//! `GotoIf`, `Delete`, `Approach`, `Declaration`, `Return` and `Expression`.

mod display;

pub use display::{format_function, format_program};

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Span;
use crate::symbols::{FunctionId, FunctionRef, TypeSymbol, VariableRef};

/// Jump target inside one function body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Break and continue targets of a loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLabels {
    pub brk: Label,
    pub cont: Label,
}

// ============================================================================
// Expressions
// ============================================================================

/// Literal value known at bind time
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(Rc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Identity,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// `+` on two strings
    Concat,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add | BinaryOperator::Concat => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Le => "<=",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Identity => "+",
            UnaryOperator::LogicalNot => "!",
        }
    }
}

/// Array construction: a length or an element list, never both
#[derive(Debug, Clone)]
pub enum ArrayInit {
    Length(Box<BoundExpr>),
    Elements(Vec<BoundExpr>),
}

/// A typed expression; failed nodes carry the error type
#[derive(Debug, Clone)]
pub struct BoundExpr {
    pub kind: BoundExprKind,
    pub ty: TypeSymbol,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum BoundExprKind {
    Literal(Constant),
    Paren(Box<BoundExpr>),
    /// Target is a `Name` or an `Index`
    Assign {
        target: Box<BoundExpr>,
        value: Box<BoundExpr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<BoundExpr>,
    },
    Binary {
        left: Box<BoundExpr>,
        op: BinaryOperator,
        right: Box<BoundExpr>,
    },
    Call {
        function: FunctionRef,
        /// Container instance for method calls
        receiver: Option<Box<BoundExpr>>,
        args: Vec<BoundExpr>,
    },
    Name(VariableRef),
    /// Converts the operand to the node's type
    Conversion(Box<BoundExpr>),
    MakeArray(ArrayInit),
    Index {
        target: Box<BoundExpr>,
        index: Box<BoundExpr>,
    },
    Error,
}

impl BoundExpr {
    pub fn new(kind: BoundExprKind, ty: TypeSymbol, span: Span) -> Self {
        BoundExpr { kind, ty, span }
    }

    pub fn error(span: Span) -> Self {
        BoundExpr::new(BoundExprKind::Error, TypeSymbol::error(), span)
    }

    pub fn name(variable: VariableRef, span: Span) -> Self {
        let ty = variable.ty.clone();
        BoundExpr::new(BoundExprKind::Name(variable), ty, span)
    }

    pub fn int(value: i32, span: Span) -> Self {
        BoundExpr::new(
            BoundExprKind::Literal(Constant::Int(value)),
            TypeSymbol::int(),
            span,
        )
    }

    pub fn binary(left: BoundExpr, op: BinaryOperator, right: BoundExpr, ty: TypeSymbol) -> Self {
        let span = left.span.merge(right.span);
        BoundExpr::new(
            BoundExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            ty,
            span,
        )
    }

    pub fn conversion(self, ty: TypeSymbol) -> Self {
        let span = self.span;
        BoundExpr::new(BoundExprKind::Conversion(Box::new(self)), ty, span)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, BoundExprKind::Error)
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone)]
pub enum BoundStmt {
    Declaration {
        variable: VariableRef,
        initializer: Option<BoundExpr>,
    },
    Return(Option<BoundExpr>),
    While {
        cond: BoundExpr,
        body: Box<BoundStmt>,
        labels: LoopLabels,
    },
    For {
        init: Box<BoundStmt>,
        cond: BoundExpr,
        action: Box<BoundStmt>,
        body: Box<BoundStmt>,
        labels: LoopLabels,
    },
    FromTo {
        iterator: VariableRef,
        lower: BoundExpr,
        upper: BoundExpr,
        body: Box<BoundStmt>,
        labels: LoopLabels,
    },
    Loop {
        /// Hidden counter declared by the binder
        iterator: VariableRef,
        count: BoundExpr,
        body: Box<BoundStmt>,
        labels: LoopLabels,
    },
    Block(Vec<BoundStmt>),
    Expression(BoundExpr),
    If {
        cond: BoundExpr,
        then_branch: Box<BoundStmt>,
        else_branch: Option<Box<BoundStmt>>,
    },
    Label(Label),
    Goto(Label),
    GotoIf {
        cond: BoundExpr,
        label: Label,
    },
    /// Scope exit of a local
    Delete(VariableRef),
    /// Step `variable` one unit toward `target`
    Approach {
        variable: VariableRef,
        target: VariableRef,
    },
}

impl BoundStmt {
    /// Whether this statement may appear in a lowered body
    pub fn is_lowered(&self) -> bool {
        matches!(
            self,
            BoundStmt::Declaration { .. }
                | BoundStmt::Return(_)
                | BoundStmt::Expression(_)
                | BoundStmt::Label(_)
                | BoundStmt::Goto(_)
                | BoundStmt::GotoIf { .. }
                | BoundStmt::Delete(_)
                | BoundStmt::Approach { .. }
        )
    }
}

// ============================================================================
// Functions and programs
// ============================================================================

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Structured(BoundStmt),
    Lowered(Vec<BoundStmt>),
}

#[derive(Debug, Clone)]
pub struct BoundFunction {
    pub symbol: FunctionRef,
    /// Index of the source file the function was declared in
    pub file: Option<usize>,
    pub body: FunctionBody,
}

/// Consecutive global declarations of one package from one file
#[derive(Debug, Clone)]
pub struct GlobalInits {
    pub package: String,
    pub file: Option<usize>,
    pub stmts: Vec<BoundStmt>,
}

/// Every bound function plus the package global initializers
#[derive(Debug, Clone, Default)]
pub struct BoundProgram {
    functions: HashMap<FunctionId, BoundFunction>,
    /// Function ids in binding order
    order: Vec<FunctionId>,
    /// Global declarations in binding order
    global_inits: Vec<GlobalInits>,
}

impl BoundProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, function: BoundFunction) {
        let id = function.symbol.id;
        if self.functions.insert(id, function).is_none() {
            self.order.push(id);
        }
    }

    /// Append a global declaration of `package` bound from `file`
    pub fn push_global_init(&mut self, package: &str, file: Option<usize>, stmt: BoundStmt) {
        match self.global_inits.last_mut() {
            Some(group) if group.package == package && group.file == file => group.stmts.push(stmt),
            _ => self.global_inits.push(GlobalInits {
                package: package.to_string(),
                file,
                stmts: vec![stmt],
            }),
        }
    }

    /// Global declaration groups in binding order
    pub fn global_inits(&self) -> &[GlobalInits] {
        &self.global_inits
    }

    pub fn global_count(&self) -> usize {
        self.global_inits.iter().map(|g| g.stmts.len()).sum()
    }

    pub fn function(&self, id: FunctionId) -> Option<&BoundFunction> {
        self.functions.get(&id)
    }

    /// Functions in binding order
    pub fn functions(&self) -> impl Iterator<Item = &BoundFunction> {
        self.order.iter().filter_map(|id| self.functions.get(id))
    }

    pub fn functions_mut(&mut self) -> impl Iterator<Item = &mut BoundFunction> {
        self.functions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
