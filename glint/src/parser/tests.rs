//! Parser tests for the surface syntax

use crate::ast::{BinOp, Expr, Literal, Member, Program, Stmt};
use crate::lexer::tokenize;
use crate::parser::parse;

/// Helper to parse a program
fn parse_program(source: &str) -> crate::Result<Program> {
    let tokens = tokenize(source)?;
    parse("test.gl", source, tokens)
}

/// Helper to parse and expect success
fn parse_ok(source: &str) -> Program {
    parse_program(source).expect("Parse should succeed")
}

/// Body statements of the first function member
fn body_of(program: &Program) -> Vec<Stmt> {
    for member in &program.members {
        if let Member::Function(f) = member {
            if let Stmt::Block(stmts) = &f.body.node {
                return stmts.iter().map(|s| s.node.clone()).collect();
            }
        }
    }
    panic!("Expected a function with a block body");
}

// ============================================
// Members
// ============================================

#[test]
fn test_parse_members() {
    let prog = parse_ok(
        "package util;
         load sys;
         load math include;
         var counter int <- 0;
         function main() { }",
    );
    assert_eq!(prog.members.len(), 5);
    assert_eq!(prog.package_name(), "util");
    assert!(matches!(&prog.members[1], Member::Load { include: false, .. }));
    assert!(matches!(&prog.members[2], Member::Load { include: true, .. }));
    assert!(matches!(&prog.members[3], Member::Global(g) if g.name.node == "counter"));
}

#[test]
fn test_default_package_is_main() {
    assert_eq!(parse_ok("function main() { }").package_name(), "main");
}

#[test]
fn test_parse_function_signature() {
    let prog = parse_ok("function add(a int, b array[long]) int { return a }");
    let Member::Function(f) = &prog.members[0] else {
        panic!("Expected function");
    };
    assert_eq!(f.name.node, "add");
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.params[1].ty.node.to_string(), "array[long]");
    assert_eq!(f.ret_ty.as_ref().map(|t| t.node.name.as_str()), Some("int"));
}

// ============================================
// Statements
// ============================================

#[test]
fn test_parse_declarations() {
    let prog = parse_ok("function main() { var x int <- 2; var y <- 3; var z float }");
    let body = body_of(&prog);
    assert_eq!(body.len(), 3);
    match &body[0] {
        Stmt::Declaration(d) => {
            assert_eq!(d.name.node, "x");
            assert!(d.ty.is_some());
            assert!(d.init.is_some());
        }
        other => panic!("Expected declaration, got {other:?}"),
    }
    assert!(matches!(&body[1], Stmt::Declaration(d) if d.ty.is_none() && d.init.is_some()));
    assert!(matches!(&body[2], Stmt::Declaration(d) if d.ty.is_some() && d.init.is_none()));
}

#[test]
fn test_parse_semicolons_are_optional() {
    let prog = parse_ok("function main() { loop(3) { sys::Print(\"hi\") } }");
    let body = body_of(&prog);
    assert_eq!(body.len(), 1);
    let Stmt::Loop { body, .. } = &body[0] else {
        panic!("Expected loop");
    };
    assert!(matches!(&body.node, Stmt::Block(stmts) if stmts.len() == 1));
}

#[test]
fn test_parse_loops() {
    let prog = parse_ok(
        "function main() {
            while (true) { break }
            for (var i <- 0; i < 10; i <- i + 1) continue
            from it <- 0 to 10 { }
            loop (5) { }
        }",
    );
    let body = body_of(&prog);
    assert!(matches!(&body[0], Stmt::While { .. }));
    assert!(matches!(&body[1], Stmt::For { init, .. } if matches!(init.node, Stmt::Declaration(_))));
    assert!(matches!(&body[2], Stmt::FromTo { iterator, .. } if iterator.node == "it"));
    assert!(matches!(&body[3], Stmt::Loop { .. }));
}

#[test]
fn test_parse_if_else_chain() {
    let prog = parse_ok("function main() { if (a) return 1 else if (b) return 2 else return }");
    let body = body_of(&prog);
    let Stmt::If { else_branch, .. } = &body[0] else {
        panic!("Expected if");
    };
    let nested = else_branch.as_ref().expect("else branch");
    assert!(matches!(&nested.node, Stmt::If { else_branch: Some(_), .. }));
}

#[test]
fn test_parse_bare_return() {
    let prog = parse_ok("function main() { return }");
    assert!(matches!(&body_of(&prog)[0], Stmt::Return(None)));
}

#[test]
fn test_return_value_starts_on_return_line() {
    let prog = parse_ok("function main() {\n    if (done) return\n    sys::Print(\"x\")\n}");
    let body = body_of(&prog);
    assert_eq!(body.len(), 2);
    let Stmt::If { then_branch, .. } = &body[0] else {
        panic!("Expected if");
    };
    assert!(matches!(&then_branch.node, Stmt::Return(None)));
    assert!(matches!(&body[1], Stmt::Expr(Expr::Call { .. })));

    // a value may continue onto later lines
    let prog = parse_ok("function f() int { return 1 +\n 2 }");
    assert!(matches!(&body_of(&prog)[0], Stmt::Return(Some(_))));
}

// ============================================
// Expressions
// ============================================

fn first_expr(source: &str) -> Expr {
    match &body_of(&parse_ok(source))[0] {
        Stmt::Expr(e) => e.clone(),
        other => panic!("Expected expression statement, got {other:?}"),
    }
}

#[test]
fn test_parse_precedence() {
    let expr = first_expr("function main() { x <- 1 + 2 * 3 }");
    let Expr::Assign { value, .. } = expr else {
        panic!("Expected assignment");
    };
    let Expr::Binary { op, right, .. } = &value.node else {
        panic!("Expected binary");
    };
    assert_eq!(*op, BinOp::Add);
    assert!(matches!(&right.node, Expr::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_parse_logical_binds_looser_than_comparison() {
    let expr = first_expr("function main() { f(a < b && c == d || e) }");
    let Expr::Call { args, .. } = expr else {
        panic!("Expected call");
    };
    assert!(matches!(&args[0].node, Expr::Binary { op: BinOp::Or, .. }));
}

#[test]
fn test_parse_assignment_is_right_associative() {
    let expr = first_expr("function main() { a <- b <- 3 }");
    let Expr::Assign { value, .. } = expr else {
        panic!("Expected assignment");
    };
    assert!(matches!(&value.node, Expr::Assign { .. }));
}

#[test]
fn test_parse_calls() {
    let expr = first_expr("function main() { sys::Print(int(x)) }");
    let Expr::Call { package, name, args } = expr else {
        panic!("Expected call");
    };
    assert_eq!(package.map(|p| p.node), Some("sys".to_string()));
    assert_eq!(name.node, "Print");
    assert!(matches!(&args[0].node, Expr::Call { package: None, name, .. } if name.node == "int"));
}

#[test]
fn test_parse_method_call_and_index() {
    let expr = first_expr("function main() { sb.Append(items[2]) }");
    let Expr::MethodCall { receiver, name, args } = expr else {
        panic!("Expected method call");
    };
    assert!(matches!(receiver.node, Expr::Name(ref n) if n == "sb"));
    assert_eq!(name.node, "Append");
    assert!(matches!(&args[0].node, Expr::Index { .. }));
}

#[test]
fn test_parse_make_array() {
    let expr = first_expr("function main() { a <- make array[int](3) }");
    let Expr::Assign { value, .. } = expr else {
        panic!("Expected assignment");
    };
    assert!(matches!(&value.node, Expr::MakeArray { length: Some(_), elements: None, .. }));

    let expr = first_expr("function main() { a <- make array[int] { 1, 2, 3 } }");
    let Expr::Assign { value, .. } = expr else {
        panic!("Expected assignment");
    };
    assert!(matches!(&value.node, Expr::MakeArray { length: None, elements: Some(e), .. } if e.len() == 3));
}

#[test]
fn test_parse_literals() {
    let expr = first_expr("function main() { f(1.5, \"s\", false) }");
    let Expr::Call { args, .. } = expr else {
        panic!("Expected call");
    };
    assert!(matches!(&args[0].node, Expr::Literal(Literal::Number(t)) if t == "1.5"));
    assert!(matches!(&args[1].node, Expr::Literal(Literal::String(s)) if s == "s"));
    assert!(matches!(&args[2].node, Expr::Literal(Literal::Bool(false))));
}

// ============================================
// Errors
// ============================================

#[test]
fn test_parse_errors() {
    assert!(parse_program("function main( { }").is_err());
    assert!(parse_program("function main() { var }").is_err());
    assert!(parse_program("function main() { x <- }").is_err());
    assert!(parse_program("return 1").is_err());
    assert!(parse_program("function main() { ").is_err());
}
