//! Error types, diagnostic collection and reporting

use crate::ast::Span;
use crate::interp::RuntimeError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// What went wrong while binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindErrorKind {
    DuplicateSymbol,
    UnknownName,
    UnknownFunction,
    UnknownType,
    UnknownPackage,
    ArityMismatch,
    /// No conversion path exists between the two types
    NoConversion,
    /// Only an explicit conversion exists, but the context accepts implicit ones
    MissingExplicitCast,
    /// Expression kind that is not allowed as a bare statement
    InvalidStatement,
    LoopControlOutsideLoop,
    MalformedLiteral,
    ReturnMismatch,
    NoOperator,
    InvalidAssignmentTarget,
    InvalidDeclaration,
    InvalidArrayConstruction,
    NotAnArray,
}

/// Compile error
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("Lexer error at {span}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span}: {message}")]
    Parser { message: String, span: Span },

    #[error("Bind error at {span}: {message}")]
    Bind {
        kind: BindErrorKind,
        message: String,
        span: Span,
    },

    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    /// A pipeline stage refused to continue because diagnostics exist
    #[error("{stage} halted with {count} diagnostic(s)")]
    Halted { stage: &'static str, count: usize },
}

/// How a diagnostic should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    /// Broken binder/lowerer invariant; never caused by user code
    Internal,
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn bind(kind: BindErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self::Bind {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Parser { span, .. } | Self::Bind { span, .. } => {
                Some(*span)
            }
            Self::Runtime(err) => err.span,
            Self::Io { .. } | Self::Config { .. } | Self::Halted { .. } => None,
        }
    }

    /// Source file of a runtime error, when known
    pub fn file(&self) -> Option<usize> {
        match self {
            Self::Runtime(err) => err.file,
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Lexer { message, .. }
            | Self::Parser { message, .. }
            | Self::Bind { message, .. }
            | Self::Io { message }
            | Self::Config { message } => message.clone(),
            Self::Runtime(err) => err.message.clone(),
            Self::Halted { .. } => self.to_string(),
        }
    }

    /// Binder diagnostic kind, if this is a binder diagnostic
    pub fn bind_kind(&self) -> Option<BindErrorKind> {
        match self {
            Self::Bind { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Runtime(err) if err.kind.is_internal() => Severity::Internal,
            _ => Severity::Error,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer",
            Self::Parser { .. } => "Parser",
            Self::Bind { .. } => "Bind",
            Self::Runtime(_) => "Runtime",
            Self::Io { .. } => "IO",
            Self::Config { .. } => "Config",
            Self::Halted { .. } => "Pipeline",
        }
    }
}

/// One collected diagnostic and the file it belongs to
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Index into the file list given to the session; `None` when no source
    /// position is known
    pub file: Option<usize>,
    pub error: CompileError,
}

/// Diagnostics accumulated across a pipeline stage
///
/// Stages keep walking after a local failure and push here instead of
/// returning early, so one pass can surface several independent problems.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: Option<usize>, error: CompileError) {
        self.entries.push(Diagnostic { file, error });
    }

    pub fn has_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &CompileError> {
        self.entries.iter().map(|d| &d.error)
    }

    /// Number of binder diagnostics of the given kind
    pub fn count_kind(&self, kind: BindErrorKind) -> usize {
        self.errors().filter(|e| e.bind_kind() == Some(kind)).count()
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = match error.severity() {
        Severity::Error => ReportKind::Error,
        Severity::Internal => ReportKind::Custom("Internal error", Color::Magenta),
    };
    let span = error.span().unwrap_or_default();
    let range = span.start..span.end;

    let mut report =
        Report::build(kind, (filename, range.clone())).with_message(format!("{} error", error.label()));
    if error.span().is_some() {
        report = report.with_label(
            Label::new((filename, range))
                .with_message(error.message())
                .with_color(Color::Red),
        );
    } else {
        report = report.with_note(error.message());
    }
    report.finish().eprint((filename, Source::from(source)))
}
