//! Ledger configuration.
//!
//! # Responsibility
//! - Describe where the ledger lives and which defaults new records get.
//! - Load settings from a JSON document with per-field defaults.
//!
//! # Invariants
//! - `storage_dir` and `default_currency` are never blank after `validate()`.

use crate::model::record::DEFAULT_CURRENCY;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    BlankStorageDir,
    BlankDefaultCurrency,
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankStorageDir => write!(f, "storage_dir cannot be empty"),
            Self::BlankDefaultCurrency => write!(f, "default_currency cannot be empty"),
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::BlankStorageDir | Self::BlankDefaultCurrency => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Settings consumed by [`crate::Ledger::open`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Directory holding the `financial_*.jsonl` block files.
    pub storage_dir: PathBuf,
    /// Currency for records created without one.
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Optional log level; `None` means the build-mode default.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Optional absolute log directory; logging stays off when absent.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl LedgerConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            default_currency: default_currency(),
            log_level: None,
            log_dir: None,
        }
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&document)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage_dir.as_os_str().is_empty() {
            return Err(ConfigError::BlankStorageDir);
        }
        if self.default_currency.trim().is_empty() {
            return Err(ConfigError::BlankDefaultCurrency);
        }
        Ok(())
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}
