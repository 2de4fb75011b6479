//! Readable listings of bound and lowered code

use std::fmt::{self, Write};

use super::{
    ArrayInit, BoundExpr, BoundExprKind, BoundFunction, BoundProgram, BoundStmt, Constant,
    FunctionBody,
};

const INDENT: &str = "    ";

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(n) => write!(f, "{n}"),
            Constant::Float(x) => write!(f, "{x:?}"),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Str(s) => write!(f, "{:?}", s.as_ref()),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[BoundExpr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for BoundExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BoundExprKind::Literal(c) => write!(f, "{c}"),
            BoundExprKind::Paren(inner) => write!(f, "({inner})"),
            BoundExprKind::Assign { target, value } => write!(f, "{target} <- {value}"),
            BoundExprKind::Unary { op, operand } => write!(f, "{}{operand}", op.symbol()),
            BoundExprKind::Binary { left, op, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            BoundExprKind::Call {
                function,
                receiver,
                args,
            } => {
                match receiver {
                    Some(recv) => write!(f, "{recv}.{}(", function.name)?,
                    None => write!(f, "{}(", function.qualified_name())?,
                }
                write_args(f, args)?;
                f.write_str(")")
            }
            BoundExprKind::Name(variable) => f.write_str(&variable.name),
            BoundExprKind::Conversion(operand) => write!(f, "{}({operand})", self.ty),
            BoundExprKind::MakeArray(ArrayInit::Length(len)) => {
                write!(f, "make {}({len})", self.ty)
            }
            BoundExprKind::MakeArray(ArrayInit::Elements(elements)) => {
                write!(f, "make {} {{", self.ty)?;
                write_args(f, elements)?;
                f.write_str("}")
            }
            BoundExprKind::Index { target, index } => write!(f, "{target}[{index}]"),
            BoundExprKind::Error => f.write_str("?"),
        }
    }
}

impl fmt::Display for BoundStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_stmt(&mut out, self, 0)?;
        f.write_str(&out)
    }
}

fn pad(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Write `stmt` starting at the current position; nested lines use `depth`
fn write_stmt(out: &mut String, stmt: &BoundStmt, depth: usize) -> fmt::Result {
    match stmt {
        BoundStmt::Declaration {
            variable,
            initializer,
        } => {
            write!(out, "var {} {}", variable.name, variable.ty)?;
            if let Some(init) = initializer {
                write!(out, " <- {init}")?;
            }
        }
        BoundStmt::Return(None) => out.push_str("return"),
        BoundStmt::Return(Some(value)) => write!(out, "return {value}")?,
        BoundStmt::While { cond, body, .. } => {
            write!(out, "while {cond} ")?;
            write_stmt(out, body, depth)?;
        }
        BoundStmt::For {
            init,
            cond,
            action,
            body,
            ..
        } => {
            out.push_str("for (");
            write_stmt(out, init, depth)?;
            write!(out, "; {cond}; ")?;
            write_stmt(out, action, depth)?;
            out.push_str(") ");
            write_stmt(out, body, depth)?;
        }
        BoundStmt::FromTo {
            iterator,
            lower,
            upper,
            body,
            ..
        } => {
            write!(out, "from {} <- {lower} to {upper} ", iterator.name)?;
            write_stmt(out, body, depth)?;
        }
        BoundStmt::Loop { count, body, .. } => {
            write!(out, "loop {count} ")?;
            write_stmt(out, body, depth)?;
        }
        BoundStmt::Block(stmts) => {
            out.push_str("{\n");
            for inner in stmts {
                pad(out, depth + 1);
                write_stmt(out, inner, depth + 1)?;
                out.push('\n');
            }
            pad(out, depth);
            out.push('}');
        }
        BoundStmt::Expression(expr) => write!(out, "{expr}")?,
        BoundStmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            write!(out, "if {cond} ")?;
            write_stmt(out, then_branch, depth)?;
            if let Some(else_branch) = else_branch {
                out.push_str(" else ");
                write_stmt(out, else_branch, depth)?;
            }
        }
        BoundStmt::Label(label) => write!(out, "{label}:")?,
        BoundStmt::Goto(label) => write!(out, "goto {label}")?,
        BoundStmt::GotoIf { cond, label } => write!(out, "gotoif {cond} {label}")?,
        BoundStmt::Delete(variable) => write!(out, "delete {}", variable.name)?,
        BoundStmt::Approach { variable, target } => {
            write!(out, "approach {} -> {}", variable.name, target.name)?
        }
    }
    Ok(())
}

/// Format one function: a signature line, then its body
///
/// Lowered bodies print one statement per line with labels flush left.
pub fn format_function(function: &BoundFunction) -> String {
    let symbol = &function.symbol;
    let params: Vec<String> = symbol
        .params
        .iter()
        .map(|p| format!("{} {}", p.name, p.ty))
        .collect();
    let mut out = format!(
        "function {}({}) {}\n",
        symbol.qualified_name(),
        params.join(", "),
        symbol.return_type
    );

    // Writing into a String cannot fail
    match &function.body {
        FunctionBody::Structured(body) => {
            let _ = write_stmt(&mut out, body, 0);
            out.push('\n');
        }
        FunctionBody::Lowered(stmts) => {
            for stmt in stmts {
                if !matches!(stmt, BoundStmt::Label(_)) {
                    out.push_str(INDENT);
                }
                let _ = write_stmt(&mut out, stmt, 1);
                out.push('\n');
            }
        }
    }
    out
}

/// Format every function of a program, in binding order
pub fn format_program(program: &BoundProgram) -> String {
    program
        .functions()
        .map(format_function)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::bound::{BinaryOperator, Label};
    use crate::symbols::{SymbolIds, TypeSymbol, VariableKind};

    #[test]
    fn test_vm_statement_listing() {
        let mut ids = SymbolIds::new();
        let i = ids.variable("i", TypeSymbol::int(), VariableKind::Local);
        let bound = ids.variable("__bound", TypeSymbol::int(), VariableKind::Local);
        let cond = BoundExpr::binary(
            BoundExpr::name(i.clone(), Span::default()),
            BinaryOperator::Lt,
            BoundExpr::int(3, Span::default()),
            TypeSymbol::bool(),
        );

        assert_eq!(BoundStmt::Goto(Label(1)).to_string(), "goto L1");
        assert_eq!(BoundStmt::Label(Label(0)).to_string(), "L0:");
        assert_eq!(
            BoundStmt::GotoIf { cond, label: Label(0) }.to_string(),
            "gotoif (i < 3) L0"
        );
        assert_eq!(BoundStmt::Delete(i.clone()).to_string(), "delete i");
        assert_eq!(
            BoundStmt::Approach { variable: i, target: bound }.to_string(),
            "approach i -> __bound"
        );
    }

    #[test]
    fn test_block_listing_indents() {
        let mut ids = SymbolIds::new();
        let x = ids.variable("x", TypeSymbol::int(), VariableKind::Local);
        let block = BoundStmt::Block(vec![
            BoundStmt::Declaration {
                variable: x.clone(),
                initializer: Some(BoundExpr::int(2, Span::default())),
            },
            BoundStmt::Return(Some(BoundExpr::name(x, Span::default()))),
        ]);
        assert_eq!(block.to_string(), "{\n    var x int <- 2\n    return x\n}");
    }

    #[test]
    fn test_constant_display() {
        assert_eq!(Constant::Float(2.0).to_string(), "2.0");
        assert_eq!(Constant::Str("a\"b".into()).to_string(), "\"a\\\"b\"");
        assert_eq!(
            BoundExpr::int(300, Span::default()).conversion(TypeSymbol::byte()).to_string(),
            "byte(300)"
        );
    }
}
