//! Locating and parsing `InvestigatorConfig` files.

use std::path::{Path, PathBuf};

use super::InvestigatorConfig;

const LOCAL_FILE: &str = ".audit-investigator.toml";
const APP_DIR: &str = "audit-investigator";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Resolves the config file to use. The first candidate that exists wins;
/// with no candidate on disk the defaults apply.
#[derive(Debug)]
pub struct ConfigLoader {
    candidates: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// `./.audit-investigator.toml`, then `<config_dir>/audit-investigator/config.toml`.
    #[must_use]
    pub fn new() -> Self {
        let user_file = dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"));
        let candidates = std::iter::once(PathBuf::from(LOCAL_FILE))
            .chain(user_file)
            .collect();
        Self { candidates }
    }

    /// Only consult `path`.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            candidates: vec![path],
        }
    }

    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// # Errors
    ///
    /// Fails when the chosen file cannot be read or is not valid TOML for
    /// `InvestigatorConfig`.
    pub fn load(&self) -> Result<InvestigatorConfig, ConfigError> {
        let Some(path) = self.candidates.iter().find(|p| p.exists()) else {
            tracing::debug!(candidates = self.candidates.len(), "No config file found, using defaults");
            return Ok(InvestigatorConfig::default());
        };
        tracing::debug!(path = %path.display(), "Loading config file");
        parse_file(path)
    }
}

fn parse_file(path: &Path) -> Result<InvestigatorConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}
