//! Runtime errors for the evaluator

use std::fmt;

use crate::ast::Span;

/// Runtime error during evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Source position of the failing node, when known
    pub span: Option<Span>,
    /// Index of the source file `span` points into
    pub file: Option<usize>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Array index outside `0..len`
    IndexOutOfBounds,
    /// String could not be parsed as the target type
    ConversionFailed,
    /// Integer division or remainder by zero
    DivisionByZero,
    /// `make array[T](n)` with `n < 0`
    NegativeLength,
    /// Call depth limit reached
    StackOverflow,
    /// Failure inside a native function
    Native,
    /// Variable with no value in the frame or globals
    UnresolvedVariable,
    /// Jump to a label missing from the function body
    UnresolvedLabel,
    /// Call to a function with no bound body
    UnresolvedFunction,
    /// Structured statement reached the evaluator
    Unlowered,
    /// Error node reached the evaluator
    ErrorNode,
    /// Operand of an unexpected runtime type
    OperandMismatch,
    /// Unwinding: `sys::Exit` was called
    Exit(i32),
}

impl ErrorKind {
    /// Broken binder or lowerer invariant; never caused by user code
    pub fn is_internal(self) -> bool {
        matches!(
            self,
            ErrorKind::UnresolvedVariable
                | ErrorKind::UnresolvedLabel
                | ErrorKind::UnresolvedFunction
                | ErrorKind::Unlowered
                | ErrorKind::ErrorNode
                | ErrorKind::OperandMismatch
        )
    }

    /// Reported, after which evaluation continues with a placeholder value
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::IndexOutOfBounds
                | ErrorKind::ConversionFailed
                | ErrorKind::DivisionByZero
                | ErrorKind::NegativeLength
        )
    }
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: String) -> Self {
        RuntimeError {
            kind,
            message,
            span: None,
            file: None,
        }
    }

    /// Attach a source position unless one is already set
    pub fn at(mut self, span: Span, file: Option<usize>) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
            self.file = file;
        }
        self
    }

    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("index {index} out of bounds for length {len}"),
        )
    }

    pub fn conversion_failed(text: &str, target: &str) -> Self {
        Self::new(
            ErrorKind::ConversionFailed,
            format!("cannot convert {text:?} to {target}"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero".to_string())
    }

    pub fn negative_length(len: i64) -> Self {
        Self::new(
            ErrorKind::NegativeLength,
            format!("array length {len} is negative"),
        )
    }

    pub fn stack_overflow(limit: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("stack overflow: call depth exceeded {limit}"),
        )
    }

    pub fn native(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Native, message.into())
    }

    pub fn unresolved_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UnresolvedVariable,
            format!("variable `{name}` has no value"),
        )
    }

    pub fn unresolved_label(label: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::UnresolvedLabel,
            format!("label {label} is not defined in this function"),
        )
    }

    pub fn unresolved_function(name: &str) -> Self {
        Self::new(
            ErrorKind::UnresolvedFunction,
            format!("function `{name}` has no body"),
        )
    }

    pub fn unlowered(function: &str) -> Self {
        Self::new(
            ErrorKind::Unlowered,
            format!("function `{function}` contains structured control flow"),
        )
    }

    pub fn error_node() -> Self {
        Self::new(ErrorKind::ErrorNode, "error node reached evaluation".to_string())
    }

    pub fn operand_mismatch(expected: &str, found: &str) -> Self {
        Self::new(
            ErrorKind::OperandMismatch,
            format!("expected a {expected} operand, found {found}"),
        )
    }

    pub fn exit(code: i32) -> Self {
        Self::new(ErrorKind::Exit(code), format!("exit with code {code}"))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_internal() {
            write!(f, "Internal runtime error: {}", self.message)
        } else {
            write!(f, "Runtime error: {}", self.message)
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for evaluator operations
pub type InterpResult<T> = Result<T, RuntimeError>;
