//! Lowering of structured control flow
//!
//! `while`, `for`, `from`, `loop` and `if` are rewritten into labels and
//! gotos, then the body is flattened into a single statement list.

mod flatten;

pub use flatten::flatten;

use crate::bound::{
    BinaryOperator, BoundExpr, BoundFunction, BoundProgram, BoundStmt, FunctionBody, LoopLabels,
};
use crate::symbols::{SymbolIds, TypeSymbol, VariableKind};

/// Name of the hidden upper bound of `from` loops
pub const BOUND_NAME: &str = "__bound";

/// Lower every function of `program` in place
#[tracing::instrument(skip_all, fields(functions = program.len()))]
pub fn lower(program: &mut BoundProgram, ids: &mut SymbolIds) {
    for function in program.functions_mut() {
        lower_function(function, ids);
    }
    tracing::info!("lowering finished");
}

/// Lower one function; an already lowered function is left untouched
pub fn lower_function(function: &mut BoundFunction, ids: &mut SymbolIds) {
    let body = std::mem::replace(&mut function.body, FunctionBody::Lowered(Vec::new()));
    let body = match body {
        FunctionBody::Structured(body) => body,
        lowered @ FunctionBody::Lowered(_) => {
            function.body = lowered;
            return;
        }
    };

    let stmts = flatten(Lowerer { ids }.rewrite(body));
    debug_assert!(stmts.iter().all(BoundStmt::is_lowered));
    tracing::debug!(
        function = %function.symbol.qualified_name(),
        statements = stmts.len(),
        "lowered function"
    );
    function.body = FunctionBody::Lowered(stmts);
}

struct Lowerer<'a> {
    ids: &'a mut SymbolIds,
}

impl Lowerer<'_> {
    fn rewrite(&mut self, stmt: BoundStmt) -> BoundStmt {
        match stmt {
            BoundStmt::Declaration { .. }
            | BoundStmt::Return(_)
            | BoundStmt::Expression(_)
            | BoundStmt::Label(_)
            | BoundStmt::Goto(_)
            | BoundStmt::GotoIf { .. }
            | BoundStmt::Delete(_)
            | BoundStmt::Approach { .. } => stmt,

            BoundStmt::Block(stmts) => {
                BoundStmt::Block(stmts.into_iter().map(|s| self.rewrite(s)).collect())
            }

            BoundStmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.rewrite_if(cond, *then_branch, else_branch.map(|b| *b)),

            BoundStmt::While { cond, body, labels } => {
                let start = self.ids.label();
                BoundStmt::Block(vec![
                    BoundStmt::Goto(labels.cont),
                    BoundStmt::Label(start),
                    self.rewrite(*body),
                    BoundStmt::Label(labels.cont),
                    BoundStmt::GotoIf { cond, label: start },
                    BoundStmt::Label(labels.brk),
                ])
            }

            BoundStmt::For {
                init,
                cond,
                action,
                body,
                labels,
            } => {
                // `continue` lands before the action; the inner while gets
                // its own continue label
                let declared = match init.as_ref() {
                    BoundStmt::Declaration { variable, .. } => Some(variable.clone()),
                    _ => None,
                };
                let inner = BoundStmt::While {
                    cond,
                    body: Box::new(BoundStmt::Block(vec![
                        *body,
                        BoundStmt::Label(labels.cont),
                        *action,
                    ])),
                    labels: LoopLabels {
                        brk: labels.brk,
                        cont: self.ids.label(),
                    },
                };

                let mut stmts = vec![*init, inner];
                stmts.extend(declared.map(BoundStmt::Delete));
                self.rewrite(BoundStmt::Block(stmts))
            }

            BoundStmt::FromTo {
                iterator,
                lower,
                upper,
                body,
                labels,
            } => {
                let span = upper.span;
                let bound = self
                    .ids
                    .variable(BOUND_NAME, TypeSymbol::int(), VariableKind::Local);
                let cond = BoundExpr::binary(
                    BoundExpr::name(iterator.clone(), lower.span),
                    BinaryOperator::Ne,
                    BoundExpr::name(bound.clone(), span),
                    TypeSymbol::bool(),
                );
                let counting = BoundStmt::For {
                    init: Box::new(BoundStmt::Declaration {
                        variable: iterator.clone(),
                        initializer: Some(lower),
                    }),
                    cond,
                    action: Box::new(BoundStmt::Approach {
                        variable: iterator,
                        target: bound.clone(),
                    }),
                    body,
                    labels,
                };

                self.rewrite(BoundStmt::Block(vec![
                    BoundStmt::Declaration {
                        variable: bound.clone(),
                        initializer: Some(upper),
                    },
                    counting,
                    BoundStmt::Delete(bound),
                ]))
            }

            BoundStmt::Loop {
                iterator,
                count,
                body,
                labels,
            } => {
                let zero = BoundExpr::int(0, count.span);
                self.rewrite(BoundStmt::FromTo {
                    iterator,
                    lower: zero,
                    upper: count,
                    body,
                    labels,
                })
            }
        }
    }

    fn rewrite_if(
        &mut self,
        cond: BoundExpr,
        then_branch: BoundStmt,
        else_branch: Option<BoundStmt>,
    ) -> BoundStmt {
        let inner = self.ids.label();
        match else_branch {
            None => {
                let end = self.ids.label();
                BoundStmt::Block(vec![
                    BoundStmt::GotoIf { cond, label: inner },
                    BoundStmt::Goto(end),
                    BoundStmt::Label(inner),
                    self.rewrite(then_branch),
                    BoundStmt::Label(end),
                ])
            }
            Some(else_branch) => {
                let otherwise = self.ids.label();
                let end = self.ids.label();
                BoundStmt::Block(vec![
                    BoundStmt::GotoIf { cond, label: inner },
                    BoundStmt::Goto(otherwise),
                    BoundStmt::Label(inner),
                    self.rewrite(then_branch),
                    BoundStmt::Goto(end),
                    BoundStmt::Label(otherwise),
                    self.rewrite(else_branch),
                    BoundStmt::Label(end),
                ])
            }
        }
    }
}
