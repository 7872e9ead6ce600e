//! Aspect configuration structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, SuiteError};
use crate::runner::DEFAULT_MAX_CONCURRENCY;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".aspect/config.toml";

/// Top-level configuration from .aspect/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AspectConfig {
    /// Suite runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Cloud provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Report output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Suite runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Number of (element, region) units processed concurrently
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Cloud provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Directory holding inventory snapshots (`<dir>/<region>/<Kind>.json`)
    #[serde(default = "default_inventory_dir")]
    pub inventory_dir: PathBuf,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            inventory_dir: default_inventory_dir(),
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// "json" (default) or "text". Override per-command with `--format`.
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            other => Err(format!("unknown output format '{}' (expected json or text)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_inventory_dir() -> PathBuf {
    PathBuf::from(".aspect/inventory")
}

impl AspectConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SuiteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SuiteError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load config, returning default if the file doesn't exist
    ///
    /// A file that exists but does not parse is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable configuration");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = AspectConfig::load_or_default(&dir.path().join("config.toml"));
        assert_eq!(config.runner.max_concurrency, 4);
        assert_eq!(config.providers.inventory_dir, PathBuf::from(".aspect/inventory"));
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[runner]\nmax_concurrency = 8\n\n[output]\nformat = \"text\"\n")
            .unwrap();

        let config = AspectConfig::load(&path).unwrap();
        assert_eq!(config.runner.max_concurrency, 8);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.providers.inventory_dir, PathBuf::from(".aspect/inventory"));
    }

    #[test]
    fn invalid_file_is_an_error_but_load_or_default_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[runner]\nmax_concurrency = \"many\"\n").unwrap();

        assert!(matches!(AspectConfig::load(&path), Err(SuiteError::Config { .. })));
        assert_eq!(AspectConfig::load_or_default(&path).runner.max_concurrency, 4);
    }

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("TEXT".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
