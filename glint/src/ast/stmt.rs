//! Statement nodes

use super::{Expr, Spanned, VarDecl};
use serde::{Deserialize, Serialize};

/// Statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// `var name [type] [<- init]`
    Declaration(VarDecl),

    /// `return [value]`
    Return(Option<Spanned<Expr>>),

    /// `while (cond) body`
    While {
        cond: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },

    /// `for (init; cond; action) body`
    For {
        init: Box<Spanned<Stmt>>,
        cond: Spanned<Expr>,
        action: Box<Spanned<Stmt>>,
        body: Box<Spanned<Stmt>>,
    },

    /// `from it <- lower to upper body`
    FromTo {
        iterator: Spanned<String>,
        lower: Spanned<Expr>,
        upper: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },

    /// `loop (count) body`
    Loop {
        count: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },

    Break,
    Continue,

    /// `{ ... }`
    Block(Vec<Spanned<Stmt>>),

    /// Bare expression used as a statement
    Expr(Expr),

    /// `if (cond) then_branch [else else_branch]`
    If {
        cond: Spanned<Expr>,
        then_branch: Box<Spanned<Stmt>>,
        else_branch: Option<Box<Spanned<Stmt>>>,
    },
}
