//! Call frames of the evaluator

use std::collections::HashMap;

use super::value::Value;
use crate::bound::{BoundStmt, Label};
use crate::symbols::VariableId;

/// One interpreted call: instruction pointer, label index and locals
#[derive(Debug)]
pub struct StackFrame {
    /// Qualified name, for tracing and error messages
    pub function: String,
    /// Source file of the running code
    pub file: Option<usize>,
    pub ip: usize,
    labels: HashMap<Label, usize>,
    locals: HashMap<VariableId, Value>,
    pub return_value: Value,
    pub returned: bool,
}

impl StackFrame {
    /// Create a frame for `body`, indexing every label it contains
    pub fn new(
        function: String,
        file: Option<usize>,
        body: &[BoundStmt],
        default_return: Value,
    ) -> Self {
        let labels: HashMap<Label, usize> = body
            .iter()
            .enumerate()
            .filter_map(|(index, stmt)| match stmt {
                BoundStmt::Label(label) => Some((*label, index)),
                _ => None,
            })
            .collect();
        tracing::trace!(%function, labels = labels.len(), "indexed labels");

        StackFrame {
            function,
            file,
            ip: 0,
            labels,
            locals: HashMap::new(),
            return_value: default_return,
            returned: false,
        }
    }

    /// Statement index of `label`
    pub fn label(&self, label: Label) -> Option<usize> {
        self.labels.get(&label).copied()
    }

    pub fn local(&self, id: VariableId) -> Option<&Value> {
        self.locals.get(&id)
    }

    pub fn set_local(&mut self, id: VariableId, value: Value) {
        self.locals.insert(id, value);
    }

    pub fn remove_local(&mut self, id: VariableId) -> Option<Value> {
        self.locals.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_indexed() {
        let body = vec![
            BoundStmt::Goto(Label(1)),
            BoundStmt::Label(Label(0)),
            BoundStmt::Label(Label(1)),
        ];
        let frame = StackFrame::new("main::main".into(), Some(0), &body, Value::Void);
        assert_eq!(frame.label(Label(0)), Some(1));
        assert_eq!(frame.label(Label(1)), Some(2));
        assert_eq!(frame.label(Label(7)), None);
    }

    #[test]
    fn test_locals() {
        let mut frame = StackFrame::new("f".into(), None, &[], Value::Int(0));
        frame.set_local(VariableId(3), Value::Int(9));
        assert_eq!(frame.local(VariableId(3)), Some(&Value::Int(9)));
        assert_eq!(frame.remove_local(VariableId(3)), Some(Value::Int(9)));
        assert_eq!(frame.local(VariableId(3)), None);
    }
}
