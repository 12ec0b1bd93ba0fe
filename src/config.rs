//! Configuration for the ttyprompt binary.
//!
//! Loaded from `~/.ttyprompt/config.toml`. Every field is optional:
//!
//! ```toml
//! # Prompt shown when none is given on the command line
//! prompt = "Password: "
//!
//! # Show typed characters
//! echo = false
//!
//! # Log filter (overridden by RUST_LOG)
//! log_level = "warn"
//!
//! # Log to ~/.ttyprompt/ttyprompt.log instead of stderr
//! log_file = true
//! ```
//!
//! The library's `prompt_line` takes no configuration; this only feeds the
//! command-line host.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default prompt text
    pub prompt: String,
    /// Show typed characters
    pub echo: bool,
    /// Default log filter
    pub log_level: String,
    /// Log to a file under the config directory
    pub log_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: "Password: ".to_string(),
            echo: false,
            log_level: "warn".to_string(),
            log_file: true,
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults.
    ///
    /// A missing file is not an error. A broken one is reported alongside
    /// the defaults so the caller can log it once logging is up.
    pub fn load() -> (Self, Option<ConfigError>) {
        match Self::config_path() {
            Some(path) if path.exists() => match Self::load_from(&path) {
                Ok(config) => (config, None),
                Err(e) => (Self::default(), Some(e)),
            },
            _ => (Self::default(), None),
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// `~/.ttyprompt`
    pub fn config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".ttyprompt"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Where the log goes when `log_file` is set
    pub fn log_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("ttyprompt.log"))
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::parse("echo = true\nprompt = \"Name: \"\n").unwrap();
        assert!(config.echo);
        assert_eq!(config.prompt, "Name: ");
        assert_eq!(config.log_level, "warn");
        assert!(config.log_file);
    }

    #[test]
    fn test_bad_type_is_parse_error() {
        assert!(matches!(
            Config::parse("echo = \"yes\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_level = \"debug\"\nlog_file = false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(!config.log_file);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            Config::load_from(&dir.path().join("absent.toml")),
            Err(ConfigError::Read(_))
        ));
    }
}
