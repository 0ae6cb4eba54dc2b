//! Uniform in-memory representation of runtime coverage and static
//! analysis data. Parsers fill a `CoverageProfile`; after parsing it is
//! only ever read.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FuzzcovError;

/// Language of the fuzzed project. Picks the coverage format and the
/// link-resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetLanguage {
    #[default]
    #[serde(rename = "c-cpp")]
    NativeCompiled,
    #[serde(rename = "python")]
    Interpreted,
}

impl TargetLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLanguage::NativeCompiled => "c-cpp",
            TargetLanguage::Interpreted => "python",
        }
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = FuzzcovError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "c-cpp" | "c" | "cpp" | "c++" => Ok(TargetLanguage::NativeCompiled),
            "python" | "py" => Ok(TargetLanguage::Interpreted),
            _ => Err(FuzzcovError::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granularity of a coverage profile. Callers must check this before
/// choosing how to look things up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverageMode {
    #[default]
    Unset,
    FunctionGranularity,
    FileGranularity,
}

/// One `(line, hit count)` pair from a function section of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineHit {
    pub line_number: u32,
    pub hit_count: u64,
}

/// True/false arm counts of a single branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchHits {
    pub true_hits: u64,
    pub false_hits: u64,
}

/// Totals for one function's hit-list. Duplicate line numbers count
/// once per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitSummary {
    pub total_lines: usize,
    pub hit_lines: usize,
}

impl HitSummary {
    pub fn from_hits(hits: &[LineHit]) -> Self {
        Self {
            total_lines: hits.len(),
            hit_lines: hits.iter().filter(|h| h.hit_count > 0).count(),
        }
    }

    /// `hit_lines / total_lines * 100`, or `None` when there are no lines.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        if self.total_lines == 0 {
            None
        } else {
            Some(self.hit_lines as f64 / self.total_lines as f64 * 100.0)
        }
    }
}

/// Key under which a branch is stored: `<function>:<line>,<column>`.
pub fn branch_key(function: &str, line: u32, column: u32) -> String {
    format!("{function}:{line},{column}")
}

/// The folded result of every coverage report read for one fuzzer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageProfile {
    function_hits: BTreeMap<String, Vec<LineHit>>,
    file_executed_lines: BTreeMap<String, BTreeSet<u32>>,
    branch_hits: BTreeMap<String, BranchHits>,
    source_reports: Vec<PathBuf>,
    mode: CoverageMode,
}

impl CoverageProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> CoverageMode {
        self.mode
    }

    /// True when no function, file or branch data was recorded.
    pub fn is_empty(&self) -> bool {
        self.function_hits.is_empty()
            && self.file_executed_lines.is_empty()
            && self.branch_hits.is_empty()
    }

    pub fn function_hits(&self, key: &str) -> Option<&[LineHit]> {
        self.function_hits.get(key).map(Vec::as_slice)
    }

    /// The stored key equal to `key`, borrowed from the profile.
    pub fn function_key(&self, key: &str) -> Option<&str> {
        self.function_hits
            .get_key_value(key)
            .map(|(k, _)| k.as_str())
    }

    pub fn contains_function(&self, key: &str) -> bool {
        self.function_hits.contains_key(key)
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &[LineHit])> {
        self.function_hits
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Every function key that has a hit-list.
    pub fn all_hit_functions(&self) -> Vec<&str> {
        self.function_hits.keys().map(String::as_str).collect()
    }

    pub fn file_executed_lines(&self, path: &str) -> Option<&BTreeSet<u32>> {
        self.file_executed_lines.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &BTreeSet<u32>)> {
        self.file_executed_lines
            .iter()
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn branch_hits(&self, key: &str) -> Option<BranchHits> {
        self.branch_hits.get(key).copied()
    }

    pub fn branches(&self) -> impl Iterator<Item = (&str, BranchHits)> {
        self.branch_hits.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn source_reports(&self) -> &[PathBuf] {
        &self.source_reports
    }

    // Mutation is crate-private: only parsers write into a profile.

    /// Register a fresh, empty hit-list for `key`, dropping any earlier one.
    pub(crate) fn begin_function(&mut self, key: &str) {
        self.function_hits.insert(key.to_string(), Vec::new());
    }

    pub(crate) fn push_line_hit(&mut self, key: &str, hit: LineHit) {
        self.function_hits
            .entry(key.to_string())
            .or_default()
            .push(hit);
    }

    pub(crate) fn record_branch(&mut self, key: String, hits: BranchHits) {
        self.branch_hits.insert(key, hits);
    }

    pub(crate) fn set_file_lines(&mut self, path: String, lines: BTreeSet<u32>) {
        self.file_executed_lines.insert(path, lines);
    }

    pub(crate) fn add_source_report(&mut self, path: &Path) {
        self.source_reports.push(path.to_path_buf());
    }

    pub(crate) fn set_mode(&mut self, mode: CoverageMode) {
        self.mode = mode;
    }
}

/// Static metrics of one function, as produced by the compile-time
/// introspection pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionStaticInfo {
    #[serde(rename = "functionName")]
    pub name: String,
    #[serde(rename = "functionSourceFile", default)]
    pub source_file: String,
    #[serde(rename = "BBCount", default)]
    pub basic_block_count: u64,
    #[serde(rename = "CyclomaticComplexity", default)]
    pub cyclomatic_complexity: u64,
    /// Every function transitively reachable from this one.
    #[serde(rename = "functionsReached", default)]
    pub functions_reached: BTreeSet<String>,
}

/// One call edge of the call-tree: where the callee lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallSite {
    pub dst_function_name: String,
    #[serde(default)]
    pub dst_function_source_file: String,
}
