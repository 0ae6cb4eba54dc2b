//! Mapping between introspection log files and the fuzzer executables they
//! were produced for.
//!
//! The mapping is usually written as YAML:
//!
//! ```yaml
//! pairings:
//! - fuzzer_log_file: fuzzerLogFile-0-abc
//!   executable_path: /out/fuzz_parse
//! ```
//!
//! A `.json` file with the same shape is read as JSON.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Correlation {
    #[serde(default)]
    pub pairings: Vec<Pairing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pairing {
    pub fuzzer_log_file: String,
    pub executable_path: String,
}

impl Correlation {
    pub fn from_slice(input: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(input)?)
    }

    pub fn from_yaml(input: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(input)?)
    }

    /// Read the mapping at `path`, as JSON for a `.json` extension and as
    /// YAML otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_slice(&std::fs::read(path)?)
        } else {
            Self::from_yaml(&std::fs::read_to_string(path)?)
        }
    }

    /// The executable paired with `data_file_name` (the basename of an
    /// introspection data file, e.g. `fuzzerLogFile-0-abc.data`).
    pub fn executable_for(&self, data_file_name: &str) -> Option<&str> {
        self.pairings
            .iter()
            .rev()
            .find(|p| format!("{}.data", p.fuzzer_log_file).contains(data_file_name))
            .map(|p| p.executable_path.as_str())
    }
}
