//! Evaluator for lowered bound programs

pub mod error;
pub mod eval;
pub mod frame;
pub mod value;

pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{Evaluator, Execution};
pub use frame::StackFrame;
pub use value::Value;
