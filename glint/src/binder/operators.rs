//! Operator table and numeric promotion

use crate::ast::{BinOp, UnOp};
use crate::bound::{BinaryOperator, UnaryOperator};
use crate::symbols::TypeSymbol;

/// A resolved binary operator
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryResolution {
    pub op: BinaryOperator,
    /// Type both operands are converted to
    pub operand_ty: TypeSymbol,
    pub result_ty: TypeSymbol,
}

/// A resolved unary operator
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryResolution {
    pub op: UnaryOperator,
    pub result_ty: TypeSymbol,
}

fn same_numeric_family(left: &TypeSymbol, right: &TypeSymbol) -> bool {
    left.is_numeric() && left.group() == right.group()
}

fn comparable(ty: &TypeSymbol) -> bool {
    !ty.is_void() && !ty.is_error()
}

/// Table lookup; the result uses the left operand type for numeric rows
fn lookup_binary(op: BinOp, left: &TypeSymbol, right: &TypeSymbol) -> Option<BinaryResolution> {
    let row = |op, result_ty: TypeSymbol| {
        Some(BinaryResolution {
            op,
            operand_ty: left.clone(),
            result_ty,
        })
    };

    match op {
        BinOp::Add if *left == TypeSymbol::string() && *right == TypeSymbol::string() => {
            row(BinaryOperator::Concat, TypeSymbol::string())
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
            if same_numeric_family(left, right) =>
        {
            let op = match op {
                BinOp::Add => BinaryOperator::Add,
                BinOp::Sub => BinaryOperator::Sub,
                BinOp::Mul => BinaryOperator::Mul,
                BinOp::Div => BinaryOperator::Div,
                _ => BinaryOperator::Rem,
            };
            row(op, left.clone())
        }
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge if same_numeric_family(left, right) => {
            let op = match op {
                BinOp::Lt => BinaryOperator::Lt,
                BinOp::Gt => BinaryOperator::Gt,
                BinOp::Le => BinaryOperator::Le,
                _ => BinaryOperator::Ge,
            };
            row(op, TypeSymbol::bool())
        }
        BinOp::Eq | BinOp::Ne
            if same_numeric_family(left, right) || (left == right && comparable(left)) =>
        {
            let op = if op == BinOp::Eq {
                BinaryOperator::Eq
            } else {
                BinaryOperator::Ne
            };
            row(op, TypeSymbol::bool())
        }
        BinOp::And | BinOp::Or
            if *left == TypeSymbol::bool() && *right == TypeSymbol::bool() =>
        {
            let op = if op == BinOp::And {
                BinaryOperator::And
            } else {
                BinaryOperator::Or
            };
            row(op, TypeSymbol::bool())
        }
        _ => None,
    }
}

/// Resolve a binary operator, promoting same-family numeric operands to the
/// wider of the two types
pub fn resolve_binary(op: BinOp, left: &TypeSymbol, right: &TypeSymbol) -> Option<BinaryResolution> {
    let mut resolution = lookup_binary(op, left, right)?;
    if same_numeric_family(left, right) {
        let wider = if right.size() > left.size() { right } else { left };
        if resolution.result_ty == resolution.operand_ty {
            resolution.result_ty = wider.clone();
        }
        resolution.operand_ty = wider.clone();
    }
    Some(resolution)
}

/// Resolve a unary operator
pub fn resolve_unary(op: UnOp, operand: &TypeSymbol) -> Option<UnaryResolution> {
    let op = match op {
        UnOp::Neg if operand.is_numeric() => UnaryOperator::Negate,
        UnOp::Plus if operand.is_numeric() => UnaryOperator::Identity,
        UnOp::Not if *operand == TypeSymbol::bool() => UnaryOperator::LogicalNot,
        _ => return None,
    };
    Some(UnaryResolution {
        op,
        result_ty: operand.clone(),
    })
}
