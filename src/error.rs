use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FuzzcovError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown coverage format")]
    UnknownFormat,

    #[error("Unsupported target language: '{0}'. Supported: c-cpp, python")]
    UnsupportedLanguage(String),

    #[error("No fuzzer profiles found in {}", .0.display())]
    NoProfiles(PathBuf),

    /// A function listed as reachable has no entry in the static inventory.
    #[error("Reachable function '{function}' is missing from the static function inventory")]
    MissingStaticFunction { function: String },

    #[error("No fuzz entry point found in {}", data_file.display())]
    EntryPointNotFound { data_file: PathBuf },

    #[error("Coverage format '{format}' is not supported for {language} targets")]
    UnsupportedCoverage { language: String, format: String },
}

impl FuzzcovError {
    /// True for faults that make a single fuzzer profile unusable because
    /// its inputs disagree with each other.
    #[must_use]
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            FuzzcovError::MissingStaticFunction { .. }
                | FuzzcovError::EntryPointNotFound { .. }
                | FuzzcovError::UnsupportedCoverage { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FuzzcovError>;
