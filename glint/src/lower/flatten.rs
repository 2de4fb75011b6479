//! Block flattening
//!
//! Inlines nested blocks into one statement list. Where a block would have
//! exited, its direct declarations are deleted, most recent first.

use std::collections::HashSet;

use crate::bound::BoundStmt;
use crate::symbols::VariableId;

/// `Delete` statements closing the scope of `stmts`
///
/// Variables the block already deletes itself are skipped.
fn block_cleanup(stmts: &[BoundStmt]) -> Vec<BoundStmt> {
    let deleted: HashSet<VariableId> = stmts
        .iter()
        .filter_map(|stmt| match stmt {
            BoundStmt::Delete(variable) => Some(variable.id),
            _ => None,
        })
        .collect();

    stmts
        .iter()
        .rev()
        .filter_map(|stmt| match stmt {
            BoundStmt::Declaration { variable, .. } if !deleted.contains(&variable.id) => {
                Some(BoundStmt::Delete(variable.clone()))
            }
            _ => None,
        })
        .collect()
}

/// Flatten `stmt` into a list with no `Block` left
pub fn flatten(stmt: BoundStmt) -> Vec<BoundStmt> {
    let mut flat = Vec::new();
    let mut pending = vec![stmt];

    while let Some(stmt) = pending.pop() {
        match stmt {
            BoundStmt::Block(stmts) => {
                // Cleanup goes on first so it pops after the whole block
                let cleanup = block_cleanup(&stmts);
                pending.extend(cleanup.into_iter().rev());
                pending.extend(stmts.into_iter().rev());
            }
            other => flat.push(other),
        }
    }

    flat
}
