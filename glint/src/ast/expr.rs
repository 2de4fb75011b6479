//! Expression AST nodes

use super::{Spanned, TypeClause};
use serde::{Deserialize, Serialize};

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),

    /// `( inner )`
    Paren(Box<Spanned<Expr>>),

    /// `target <- value`
    Assign {
        target: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },

    Unary {
        op: UnOp,
        operand: Box<Spanned<Expr>>,
    },

    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// `name(args)` or `package::name(args)`
    Call {
        package: Option<Spanned<String>>,
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },

    /// `receiver.name(args)`
    MethodCall {
        receiver: Box<Spanned<Expr>>,
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },

    /// Variable reference
    Name(String),

    /// `make array[T](length)` or `make array[T] { elements }`
    MakeArray {
        ty: Spanned<TypeClause>,
        length: Option<Box<Spanned<Expr>>>,
        elements: Option<Vec<Spanned<Expr>>>,
    },

    /// `target[index]`
    Index {
        target: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
}

/// Literal token; numbers keep their source text so the binder can reject
/// malformed numerals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(String),
    String(String),
    Bool(bool),
}

/// Binary operator token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // Logical
    And,
    Or,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        f.write_str(text)
    }
}

/// Unary operator token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    /// `-`
    Neg,
    /// `+`
    Plus,
    /// `!`
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Plus => write!(f, "+"),
            UnOp::Not => write!(f, "!"),
        }
    }
}
