//! Output formatting for run summaries.

use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::FuzzcovError;

/// Aggregate numbers for one accumulated fuzzer profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileStats {
    pub key: String,
    pub data_file: String,
    pub language: String,
    pub total_basic_blocks: u64,
    pub total_cyclomatic_complexity: u64,
    pub file_target_count: usize,
    pub reached_functions: usize,
    pub unreached_functions: usize,
    pub uncovered_reachable_functions: usize,
    pub coverage_reports: usize,
}

/// A profile that was dropped from the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileFailure {
    pub data_file: String,
    pub error: String,
    /// The profile's inputs contradicted each other, as opposed to an
    /// unreadable file.
    pub integrity_fault: bool,
}

impl ProfileFailure {
    pub fn new(data_file: &Path, err: &FuzzcovError) -> Self {
        Self {
            data_file: data_file.display().to_string(),
            error: err.to_string(),
            integrity_fault: err.is_integrity_fault(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub basefolder: String,
    pub profiles: Vec<ProfileStats>,
    pub failures: Vec<ProfileFailure>,
}

impl RunSummary {
    pub fn new(basefolder: String, profiles: Vec<ProfileStats>, failures: Vec<ProfileFailure>) -> Self {
        Self {
            generated_at: Utc::now(),
            basefolder,
            profiles,
            failures,
        }
    }

    /// Format using a specific formatter.
    #[must_use]
    pub fn format(&self, formatter: &dyn ReportFormatter) -> String {
        formatter.format(self)
    }
}

/// Trait for formatting run summaries.
pub trait ReportFormatter {
    /// Format the summary to a string.
    fn format(&self, summary: &RunSummary) -> String;
}

/// Fixed-width text table.
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, summary: &RunSummary) -> String {
        let mut out = String::new();

        writeln!(
            out,
            "Generated:  {}",
            summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .unwrap();
        writeln!(out, "Basefolder: {}", summary.basefolder).unwrap();
        out.push('\n');

        writeln!(
            out,
            "{:<40} {:>8} {:>8} {:>8} {:>10} {:>10} {:>6}",
            "FUZZER", "REACHED", "UNREACH", "UNCOV", "BBS", "COMPLEXITY", "FILES"
        )
        .unwrap();
        writeln!(out, "{}", "-".repeat(96)).unwrap();

        for p in &summary.profiles {
            writeln!(
                out,
                "{:<40} {:>8} {:>8} {:>8} {:>10} {:>10} {:>6}",
                p.key,
                p.reached_functions,
                p.unreached_functions,
                p.uncovered_reachable_functions,
                p.total_basic_blocks,
                p.total_cyclomatic_complexity,
                p.file_target_count
            )
            .unwrap();
        }

        if !summary.failures.is_empty() {
            out.push('\n');
            writeln!(out, "Failed profiles:").unwrap();
            for f in &summary.failures {
                let kind = if f.integrity_fault { "integrity" } else { "error" };
                writeln!(out, "  {} [{kind}] {}", f.data_file, f.error).unwrap();
            }
        }

        out
    }
}

/// Pretty-printed JSON document.
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, summary: &RunSummary) -> String {
        // Plain data with string keys; serialization cannot fail.
        let mut out = serde_json::to_string_pretty(summary).unwrap_or_default();
        out.push('\n');
        out
    }
}

/// Maximum number of consecutive non-instrumented lines that can be bridged
/// when coalescing missed ranges. Gaps of up to this many lines (where none
/// of the gap lines are instrumented) are merged into a single range.
const MAX_BRIDGE_GAP: u32 = 2;

/// Coalesce sorted line numbers into `(start, end)` ranges, bridging small
/// gaps where every line in the gap is non-instrumented.
///
/// Both `lines` and `instrumented` must be sorted and deduplicated.
#[must_use]
pub fn coalesce_ranges(lines: &[u32], instrumented: &[u32]) -> Vec<(u32, u32)> {
    if lines.is_empty() {
        return Vec::new();
    }

    debug_assert!(
        lines.windows(2).all(|w| w[0] < w[1]),
        "coalesce_ranges requires sorted, deduplicated input"
    );

    let mut ranges: Vec<(u32, u32)> = Vec::new();
    let mut start = lines[0];
    let mut end = lines[0];

    for &line in &lines[1..] {
        let gap = line - end - 1;
        if gap <= MAX_BRIDGE_GAP && (end + 1..line).all(|l| instrumented.binary_search(&l).is_err()) {
            end = line;
        } else {
            ranges.push((start, end));
            start = line;
            end = line;
        }
    }

    ranges.push((start, end));
    ranges
}

/// Format line numbers into compact range notation, e.g. "1, 3-5, 8".
///
/// The input slice must be sorted in ascending order.
#[must_use]
pub fn format_line_ranges(lines: &[u32], instrumented: &[u32]) -> String {
    coalesce_ranges(lines, instrumented)
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
