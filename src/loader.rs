//! Loading of the per-fuzzer static analysis artifacts written by the
//! compile-time introspection pass (`fuzzerLogFile-*.data.json`).
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::fsutil::walk_files;
use crate::model::{CallSite, FunctionStaticInfo};

static ARTIFACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^fuzzerLogFile.*\.data\.json$").unwrap());

/// One fuzzer's static analysis document.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticAnalysis {
    #[serde(rename = "Fuzzer filename")]
    pub fuzzer_filename: String,
    #[serde(rename = "All functions")]
    pub all_functions: FunctionList,
    /// Flattened call-tree edges.
    #[serde(rename = "Callsites", default)]
    pub callsites: Vec<CallSite>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionList {
    #[serde(rename = "Elements", default)]
    pub elements: Vec<FunctionStaticInfo>,
}

impl StaticAnalysis {
    pub fn from_slice(input: &[u8]) -> Result<Self> {
        let analysis: StaticAnalysis = serde_json::from_slice(input)?;
        for func in &analysis.all_functions.elements {
            if looks_unnormalized(&func.name) {
                info!("We may have a non-normalised function name: {}", func.name);
            }
        }
        Ok(analysis)
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!("loading static analysis from {}", path.display());
        Self::from_slice(&std::fs::read(path)?)
    }
}

/// `foo.123` style names come from compiler-generated clones.
fn looks_unnormalized(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, suffix)) => !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// All static analysis artifacts below `dir`, sorted by path.
pub fn discover(dir: &Path) -> Vec<PathBuf> {
    walk_files(dir)
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| ARTIFACT_RE.is_match(n))
        })
        .collect()
}
