//! Run configuration. Passed explicitly to everything that needs it; there
//! is no process-wide state.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::model::TargetLanguage;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub language: TargetLanguage,
    /// Base URL of the hosted coverage report links point into.
    #[serde(default = "default_coverage_url")]
    pub coverage_url: String,
    /// Where to look for the coverage.py `html_status.json` index.
    #[serde(default = "default_index_root")]
    pub index_root: PathBuf,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_coverage_url() -> String {
    "/covreport/linux".to_string()
}

fn default_index_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: TargetLanguage::default(),
            coverage_url: default_coverage_url(),
            index_root: default_index_root(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Read a TOML config file, failing on I/O or syntax errors.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Read a TOML config file, falling back to defaults when it is missing
    /// or broken.
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn with_language(mut self, language: TargetLanguage) -> Self {
        self.language = language;
        self
    }

    pub fn with_coverage_url(mut self, url: impl Into<String>) -> Self {
        self.coverage_url = url.into();
        self
    }

    pub fn with_index_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.index_root = root.into();
        self
    }
}
