//! `glint.toml` configuration

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CompileError, Result};

/// File name looked up next to the first source file
pub const CONFIG_FILE: &str = "glint.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub entry: EntryConfig,
    pub runtime: RuntimeConfig,
}

/// Function the evaluator starts from
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntryConfig {
    pub package: String,
    pub function: String,
}

impl Default for EntryConfig {
    fn default() -> Self {
        EntryConfig {
            package: "main".to_string(),
            function: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Interpreted frames allowed before `StackOverflow`
    pub max_call_depth: usize,
    /// Treat recoverable runtime errors as fatal
    pub strict: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_call_depth: 10_000,
            strict: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|error| {
            CompileError::io_error(format!("cannot read {}: {error}", path.display()))
        })?;
        Self::from_toml_str(&content).map_err(|error| {
            CompileError::config_error(format!("{}: {}", path.display(), error.message()))
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|error| CompileError::config_error(error.message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.entry.package, "main");
        assert_eq!(config.entry.function, "main");
        assert_eq!(config.runtime.max_call_depth, 10_000);
        assert!(!config.runtime.strict);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml_str(
            r#"
            [entry]
            function = "start"

            [runtime]
            strict = true
            "#,
        )
        .unwrap();
        assert_eq!(config.entry.package, "main");
        assert_eq!(config.entry.function, "start");
        assert!(config.runtime.strict);
        assert_eq!(config.runtime.max_call_depth, 10_000);
    }

    #[test]
    fn test_malformed_config() {
        let err = Config::from_toml_str("[runtime]\nmax_call_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, CompileError::Config { .. }));
        let err = Config::from_toml_str("[runtime]\nfast = true").unwrap_err();
        assert!(matches!(err, CompileError::Config { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/glint.toml")).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }
}
