//! Glint Compiler Library
//!
//! Binder, control-flow lowerer and frame-based evaluator for a small
//! statically typed imperative language.

pub mod ast;
pub mod binder;
pub mod bound;
pub mod config;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod lower;
pub mod native;
pub mod parser;
pub mod session;
pub mod symbols;
pub mod util;

pub use ast::Span;
pub use config::Config;
pub use error::{CompileError, Result};
pub use session::Session;
