/// Auto-detection of coverage report formats.
///
/// Strategy:
///   1. Check file extension / name for strong hints
///   2. Peek at the first bytes of the file content
///   3. Otherwise the format is unknown; callers may pass an explicit one
use std::path::Path;

use crate::error::FuzzcovError;
use crate::model::TargetLanguage;

/// Supported coverage report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `llvm-cov show` text dump, one file per fuzzer (`*.covreport`).
    LlvmCov,
    /// coverage.py `json` report.
    CoveragePy,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::LlvmCov => "llvm-cov",
            Format::CoveragePy => "coverage-py",
        }
    }

    /// The format a target language's coverage is collected in.
    pub fn for_language(language: TargetLanguage) -> Self {
        match language {
            TargetLanguage::NativeCompiled => Format::LlvmCov,
            TargetLanguage::Interpreted => Format::CoveragePy,
        }
    }

    /// Fail unless this format can carry coverage for `language`.
    pub fn check_language(&self, language: TargetLanguage) -> crate::error::Result<()> {
        if Format::for_language(language) == *self {
            Ok(())
        } else {
            Err(FuzzcovError::UnsupportedCoverage {
                language: language.to_string(),
                format: self.to_string(),
            })
        }
    }
}

impl std::str::FromStr for Format {
    type Err = FuzzcovError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llvm-cov" | "covreport" => Ok(Format::LlvmCov),
            "coverage-py" | "json" => Ok(Format::CoveragePy),
            _ => Err(FuzzcovError::Parse(format!(
                "Unknown format: '{}'. Supported: llvm-cov, coverage-py",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the coverage format from filename and file content.
pub fn detect_format(path: &Path, content: &[u8]) -> Option<Format> {
    if let Some(fmt) = detect_by_extension(path) {
        return Some(fmt);
    }

    detect_by_content(content)
}

fn detect_by_extension(path: &Path) -> Option<Format> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "covreport" => Some(Format::LlvmCov),
        "json" => None, // needs content inspection
        _ => None,
    }
}

fn detect_by_content(content: &[u8]) -> Option<Format> {
    let head = crate::parsers::sniff_head(content);

    if head.trim_start().starts_with('{') {
        if head.contains("\"files\"") && head.contains("\"executed_lines\"") {
            return Some(Format::CoveragePy);
        }
        return None;
    }

    // llvm-cov: a function header followed by `<line>|<count>|` rows.
    let has_header = head
        .lines()
        .any(|l| !l.is_empty() && l.ends_with(':') && !l.contains('|'));
    let has_rows = head
        .lines()
        .any(|l| l.split('|').next().is_some_and(|n| n.trim().parse::<u32>().is_ok()));
    if has_header && has_rows {
        return Some(Format::LlvmCov);
    }

    None
}
