//! Compilation session: bind, lower and evaluate with one symbol table
//!
//! A session owns every piece of state the pipeline shares between stages.
//! Each stage refuses to start while diagnostics exist.

use std::io::{self, Write};

use crate::ast::Program;
use crate::binder;
use crate::bound::{BoundProgram, format_program};
use crate::config::Config;
use crate::error::{CompileError, Diagnostics, Result};
use crate::interp::{Evaluator, Execution};
use crate::lexer::tokenize;
use crate::lower;
use crate::native::register_natives;
use crate::parser::parse;
use crate::symbols::{SymbolIds, SymbolTable};

pub struct Session {
    config: Config,
    table: SymbolTable,
    ids: SymbolIds,
    diagnostics: Diagnostics,
    program: BoundProgram,
}

impl Session {
    /// Create a session with the native packages registered
    pub fn new(config: Config) -> Self {
        let mut table = SymbolTable::new();
        let mut ids = SymbolIds::new();
        register_natives(&mut table, &mut ids);
        Session {
            config,
            table,
            ids,
            diagnostics: Diagnostics::new(),
            program: BoundProgram::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn program(&self) -> &BoundProgram {
        &self.program
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Readable listing of every bound function
    pub fn listing(&self) -> String {
        format_program(&self.program)
    }

    fn ensure_clean(&self, stage: &'static str) -> Result<()> {
        if self.diagnostics.has_errors() {
            return Err(CompileError::Halted {
                stage,
                count: self.diagnostics.len(),
            });
        }
        Ok(())
    }

    /// Bind `files`; halts when any diagnostic was reported
    #[tracing::instrument(skip_all, fields(files = files.len()))]
    pub fn bind(&mut self, files: &[Program]) -> Result<()> {
        self.ensure_clean("binding")?;
        let bound = binder::bind(files, &mut self.table, &mut self.ids, &mut self.diagnostics);
        for function in bound.functions() {
            tracing::debug!(function = %function.symbol.qualified_name(), "bound");
        }
        self.program = bound;
        self.ensure_clean("binding")
    }

    /// Lower every bound function in place
    pub fn lower(&mut self) -> Result<()> {
        self.ensure_clean("lowering")?;
        lower::lower(&mut self.program, &mut self.ids);
        Ok(())
    }

    /// Run `entry_package::entry_function`, printing to stdout
    pub fn evaluate(&mut self, entry_function: &str, entry_package: &str) -> Result<Execution> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.evaluate_with_output(entry_function, entry_package, &mut out)
    }

    /// Run `entry_package::entry_function`, printing to `out`
    ///
    /// Recoverable runtime errors are added to the session diagnostics; a
    /// fatal one is returned.
    #[tracing::instrument(skip(self, out))]
    pub fn evaluate_with_output(
        &mut self,
        entry_function: &str,
        entry_package: &str,
        out: &mut dyn Write,
    ) -> Result<Execution> {
        self.ensure_clean("evaluation")?;
        let entry = self
            .table
            .package(entry_package)
            .and_then(|package| package.function(entry_function))
            .cloned()
            .ok_or_else(|| {
                CompileError::config_error(format!(
                    "entry function `{entry_package}::{entry_function}` not found"
                ))
            })?;

        let mut evaluator = Evaluator::new(&self.program, &self.table, &self.config.runtime, out);
        let result = evaluator.run(&entry);
        for err in evaluator.take_diagnostics() {
            self.diagnostics.push(err.file, err.into());
        }
        out.flush()
            .map_err(|e| CompileError::io_error(format!("cannot flush output: {e}")))?;
        Ok(result?)
    }

    /// Tokenize, parse, bind, lower and run one source text from the
    /// configured entry point
    pub fn run_source(&mut self, source: &str) -> Result<Execution> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_source_with_output(source, &mut out)
    }

    pub fn run_source_with_output(&mut self, source: &str, out: &mut dyn Write) -> Result<Execution> {
        let tokens = tokenize(source)?;
        let program = parse("<source>", source, tokens)?;
        self.bind(&[program])?;
        self.lower()?;
        let entry = self.config.entry.clone();
        self.evaluate_with_output(&entry.function, &entry.package, out)
    }
}
