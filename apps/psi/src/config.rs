//! # Configuration
//!
//! Optional `psi.toml` read at startup. Command-line flags override every
//! value found in the file.
//!
//! ```toml
//! database = "psi.redb"
//! json_mode = false
//! max_rulebook_bytes = 10485760
//! ```

use psi_core::PsiError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "psi.toml";

/// Default rulebook size limit (10 MB).
pub const DEFAULT_MAX_RULEBOOK_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum size of the config file itself (64 KB).
const MAX_CONFIG_BYTES: u64 = 64 * 1024;

/// Settings shared by every command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PsiConfig {
    /// redb database path; in-memory store when `None`.
    pub database: Option<PathBuf>,
    /// Print machine-readable JSON instead of text.
    pub json_mode: bool,
    /// Rulebooks larger than this are refused before reading.
    pub max_rulebook_bytes: u64,
}

impl Default for PsiConfig {
    fn default() -> Self {
        Self {
            database: None,
            json_mode: false,
            max_rulebook_bytes: DEFAULT_MAX_RULEBOOK_BYTES,
        }
    }
}

impl PsiConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, PsiError> {
        let config: Self =
            toml::from_str(text).map_err(|e| PsiError::DeserializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config.
    ///
    /// An explicit path must exist. Without one, `psi.toml` in the working
    /// directory is used if present, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PsiError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let metadata = std::fs::metadata(&path).map_err(|e| {
            PsiError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_BYTES {
            return Err(PsiError::IoError(format!(
                "Config '{}' exceeds {} bytes",
                path.display(),
                MAX_CONFIG_BYTES
            )));
        }

        let text = std::fs::read_to_string(&path).map_err(|e| {
            PsiError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Self::from_toml(&text)
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, database: Option<PathBuf>, json_mode: bool) -> Self {
        if database.is_some() {
            self.database = database;
        }
        self.json_mode |= json_mode;
        self
    }

    fn validate(&self) -> Result<(), PsiError> {
        if self.max_rulebook_bytes == 0 {
            return Err(PsiError::DeserializationError(
                "max_rulebook_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
