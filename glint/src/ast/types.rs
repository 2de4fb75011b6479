//! Type clauses as written in source

use serde::{Deserialize, Serialize};

use super::Spanned;

/// A type as written: `int`, `StringBuilder`, `array[int]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeClause {
    pub name: String,
    pub subtypes: Vec<Spanned<TypeClause>>,
}

impl TypeClause {
    pub fn named(name: impl Into<String>) -> Self {
        TypeClause {
            name: name.into(),
            subtypes: Vec::new(),
        }
    }
}

impl std::fmt::Display for TypeClause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for sub in &self.subtypes {
            write!(f, "[{}]", sub.node)?;
        }
        Ok(())
    }
}
