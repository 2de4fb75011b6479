//! Untyped syntax tree handed to the binder

mod expr;
mod span;
mod stmt;
mod types;

pub use expr::*;
pub use span::*;
pub use stmt::*;
pub use types::*;

use serde::{Deserialize, Serialize};

/// Package a file belongs to when it has no `package` member
pub const DEFAULT_PACKAGE: &str = "main";

/// One compilation file: an ordered list of members
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub members: Vec<Member>,
}

impl Program {
    /// Name declared by the file's `package` member, or the default package
    pub fn package_name(&self) -> &str {
        self.members
            .iter()
            .find_map(|member| match member {
                Member::Package(name) => Some(name.node.as_str()),
                _ => None,
            })
            .unwrap_or(DEFAULT_PACKAGE)
    }
}

/// Top-level member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Member {
    /// `package name`
    Package(Spanned<String>),
    /// `load name` or `load name include`
    Load {
        package: Spanned<String>,
        include: bool,
    },
    Function(FunctionDecl),
    /// Package-level `var`
    Global(VarDecl),
}

/// Function declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    /// `None` means `void`
    pub ret_ty: Option<Spanned<TypeClause>>,
    pub body: Spanned<Stmt>,
    pub span: Span,
}

/// Function parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeClause>,
}

/// `var name [type] [<- init]`, used for locals and globals alike
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: Spanned<String>,
    pub ty: Option<Spanned<TypeClause>>,
    pub init: Option<Spanned<Expr>>,
    pub span: Span,
}
