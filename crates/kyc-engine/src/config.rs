//! Engine configuration.
//!
//! Read from the environment, with defaults suitable for local use.
//! Explicit construction overrides any field.

use std::path::{Path, PathBuf};

use kyc_state::{PolicyError, TierPolicy};

/// Default directory for the JSON-file gateway.
pub const DEFAULT_DATA_DIR: &str = "./kyc-data";

/// Default tracing filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime configuration for an engine deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding one `<user>.json` snapshot per user.
    pub data_dir: PathBuf,
    /// YAML tier table; the standard table is used when absent.
    pub policy_path: Option<PathBuf>,
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            policy_path: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `KYC_DATA_DIR` (default: `./kyc-data`)
    /// - `KYC_TIER_POLICY` (optional path to a YAML tier table)
    /// - `KYC_LOG_LEVEL` (default: `info`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = match lookup("KYC_DATA_DIR") {
            Some(raw) if raw.trim().is_empty() => return Err(ConfigError::Empty("KYC_DATA_DIR")),
            Some(raw) => PathBuf::from(raw),
            None => PathBuf::from(DEFAULT_DATA_DIR),
        };
        let policy_path = lookup("KYC_TIER_POLICY")
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);
        let log_level = match lookup("KYC_LOG_LEVEL") {
            Some(raw) if raw.trim().is_empty() => return Err(ConfigError::Empty("KYC_LOG_LEVEL")),
            Some(raw) => raw.trim().to_string(),
            None => DEFAULT_LOG_LEVEL.to_string(),
        };
        Ok(Self {
            data_dir,
            policy_path,
            log_level,
        })
    }

    /// The tier policy this configuration selects.
    pub fn load_policy(&self) -> Result<TierPolicy, ConfigError> {
        match &self.policy_path {
            Some(path) => load_policy_file(path),
            None => Ok(TierPolicy::standard()),
        }
    }
}

/// Read and validate a YAML tier table.
pub fn load_policy_file(path: &Path) -> Result<TierPolicy, ConfigError> {
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadPolicy {
        path: path.to_path_buf(),
        source,
    })?;
    TierPolicy::from_yaml(&source).map_err(|source| ConfigError::InvalidPolicy {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is set but empty")]
    Empty(&'static str),
    #[error("failed to read tier policy {path}: {source}")]
    ReadPolicy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tier policy {path}: {source}")]
    InvalidPolicy {
        path: PathBuf,
        #[source]
        source: PolicyError,
    },
}
