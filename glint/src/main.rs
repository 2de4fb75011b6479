//! Glint Compiler CLI

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use glint::ast::Program;
use glint::config::CONFIG_FILE;
use glint::error::report_error;
use glint::{CompileError, Config, Session};

#[derive(Parser)]
#[command(name = "glint", version, about = "Glint - bind, lower and run Glint programs")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ProgramArgs {
    /// Source files, bound together
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Config file (default: glint.toml next to the first source file)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Package of the entry function
    #[arg(long)]
    entry_package: Option<String>,

    /// Name of the entry function
    #[arg(long)]
    entry_function: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Parse and dump the syntax tree as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Bind source files and report diagnostics
    Check(ProgramArgs),
    /// Print the lowered listing of every function
    Lower(ProgramArgs),
    /// Run a program from its entry function
    Run(ProgramArgs),
}

/// Source files loaded for one command
struct Sources {
    names: Vec<String>,
    texts: Vec<String>,
}

impl Sources {
    fn read(paths: &[PathBuf]) -> Result<Self, CompileError> {
        let mut names = Vec::new();
        let mut texts = Vec::new();
        for path in paths {
            let text = std::fs::read_to_string(path).map_err(|e| {
                CompileError::io_error(format!("cannot read {}: {e}", path.display()))
            })?;
            names.push(path.display().to_string());
            texts.push(text);
        }
        Ok(Sources { names, texts })
    }

    /// Lex and parse every file; reports and stops at the first failure
    fn parse(&self) -> Option<Vec<Program>> {
        let mut programs = Vec::new();
        for (index, (name, text)) in self.names.iter().zip(&self.texts).enumerate() {
            let parsed = glint::lexer::tokenize(text)
                .and_then(|tokens| glint::parser::parse(name, text, tokens));
            match parsed {
                Ok(program) => programs.push(program),
                Err(e) => {
                    self.report(Some(index), &e);
                    return None;
                }
            }
        }
        Some(programs)
    }

    /// Report `error` against file `index`; the first file when unknown
    fn report(&self, index: Option<usize>, error: &CompileError) {
        let index = index.unwrap_or(0);
        let name = self.names.get(index).map(String::as_str).unwrap_or("<unknown>");
        let text = self.texts.get(index).map(String::as_str).unwrap_or("");
        if report_error(name, text, error).is_err() {
            eprintln!("Error: {error}");
        }
    }

    fn report_all(&self, session: &Session) {
        for diagnostic in session.diagnostics().iter() {
            self.report(diagnostic.file, &diagnostic.error);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Tokens { file } => tokenize_file(&file),
        Command::Parse { file } => parse_file(&file),
        Command::Check(args) => check_files(&args),
        Command::Lower(args) => lower_files(&args),
        Command::Run(args) => run_files(&args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &ProgramArgs) -> Result<Config, CompileError> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => args
            .files
            .first()
            .and_then(|file| file.parent())
            .map(|dir| dir.join(CONFIG_FILE))
            .filter(|path| path.is_file()),
    };

    let mut config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            Config::load(&path)?
        }
        None => Config::default(),
    };
    if let Some(package) = &args.entry_package {
        config.entry.package = package.clone();
    }
    if let Some(function) = &args.entry_function {
        config.entry.function = function.clone();
    }
    Ok(config)
}

/// Read, parse and bind; `None` when diagnostics were already reported
fn bind_files(args: &ProgramArgs) -> Result<Option<(Session, Sources)>, CompileError> {
    let config = load_config(args)?;
    let sources = Sources::read(&args.files)?;
    let Some(programs) = sources.parse() else {
        return Ok(None);
    };

    let mut session = Session::new(config);
    if session.bind(&programs).is_err() {
        sources.report_all(&session);
        return Ok(None);
    }
    Ok(Some((session, sources)))
}

fn check_files(args: &ProgramArgs) -> Result<i32, CompileError> {
    let (session, _) = match bind_files(args)? {
        Some(bound) => bound,
        None => return Ok(1),
    };
    println!(
        "✓ {} function(s) in {} file(s) bind successfully",
        session.program().len(),
        args.files.len()
    );
    Ok(0)
}

fn lower_files(args: &ProgramArgs) -> Result<i32, CompileError> {
    let (mut session, _) = match bind_files(args)? {
        Some(bound) => bound,
        None => return Ok(1),
    };
    session.lower()?;
    print!("{}", session.listing());
    Ok(0)
}

fn run_files(args: &ProgramArgs) -> Result<i32, CompileError> {
    let (mut session, sources) = match bind_files(args)? {
        Some(bound) => bound,
        None => return Ok(1),
    };
    session.lower()?;

    let entry = session.config().entry.clone();
    let result = session.evaluate(&entry.function, &entry.package);
    sources.report_all(&session);
    match result {
        Ok(execution) => Ok(execution.exit_code),
        Err(e) => {
            sources.report(e.file(), &e);
            Ok(1)
        }
    }
}

fn tokenize_file(path: &Path) -> Result<i32, CompileError> {
    let sources = Sources::read(&[path.to_path_buf()])?;
    match glint::lexer::tokenize(&sources.texts[0]) {
        Ok(tokens) => {
            for (tok, span) in &tokens {
                println!("{:?} @ {}..{}", tok, span.start, span.end);
            }
            Ok(0)
        }
        Err(e) => {
            sources.report(None, &e);
            Ok(1)
        }
    }
}

fn parse_file(path: &Path) -> Result<i32, CompileError> {
    let sources = Sources::read(&[path.to_path_buf()])?;
    let Some(programs) = sources.parse() else {
        return Ok(1);
    };
    let json = serde_json::to_string_pretty(&programs[0])
        .map_err(|e| CompileError::io_error(format!("cannot serialize syntax tree: {e}")))?;
    println!("{json}");
    Ok(0)
}
