//! Lexical scope chain used while binding
//!
//! A stack of name tables; index 0 holds the package globals. Lookups walk
//! from the innermost scope outward, so inner declarations shadow outer ones.

use std::collections::HashMap;

use super::VariableRef;

#[derive(Debug)]
pub struct ScopeChain {
    scopes: Vec<HashMap<String, VariableRef>>,
}

impl ScopeChain {
    /// Create a chain with a single empty outermost scope
    pub fn new() -> Self {
        ScopeChain {
            scopes: vec![HashMap::new()],
        }
    }

    /// Create a chain whose outermost scope holds `globals`
    pub fn with_globals<'a>(globals: impl IntoIterator<Item = &'a VariableRef>) -> Self {
        let mut chain = Self::new();
        for global in globals {
            chain.try_declare(global.clone());
        }
        chain
    }

    /// Push a new scope; returns the new depth
    pub fn push(&mut self) -> usize {
        self.scopes.push(HashMap::new());
        self.scopes.len()
    }

    /// Pop the innermost scope; the outermost scope is never removed
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declare in the innermost scope; returns `false` if the name is already
    /// declared there
    pub fn try_declare(&mut self, variable: VariableRef) -> bool {
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };
        if scope.contains_key(&variable.name) {
            return false;
        }
        scope.insert(variable.name.clone(), variable);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&VariableRef> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Every visible name, for suggestions
    pub fn visible_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .scopes
            .iter()
            .flat_map(|scope| scope.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}
