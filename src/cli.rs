//! Command handler functions for the fuzzcov CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::link::LinkResolver;
use crate::model::{CoverageMode, CoverageProfile, TargetLanguage};
use crate::parsers::{self, coverage_py, llvm_cov};
use crate::pipeline;
use crate::profile::FuzzerProfile;
use crate::report::{self, JsonFormatter, TextFormatter};

/// Run the whole pipeline over `target_dir` and render the summary.
pub fn cmd_report(
    config: &Config,
    target_dir: &Path,
    correlation_file: Option<&Path>,
    json: bool,
) -> Result<String> {
    let outcome = pipeline::run(config, target_dir, correlation_file)?;
    let summary = outcome.summary();
    Ok(if json {
        summary.format(&JsonFormatter)
    } else {
        summary.format(&TextFormatter)
    })
}

/// Per-function (native) or per-file (interpreted) totals of the coverage
/// at `path`.
///
/// A single file is parsed in `format`, or the detected format. A directory
/// is searched for the reports `language` produces.
pub fn cmd_coverage(
    path: &Path,
    language: TargetLanguage,
    target: Option<&str>,
    format: Option<&str>,
) -> Result<String> {
    let profile = if path.is_file() {
        let (_, profile) = parsers::parse_file(path, format)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        profile
    } else {
        match language {
            TargetLanguage::NativeCompiled => llvm_cov::load_dir(path, target),
            TargetLanguage::Interpreted => coverage_py::load(path),
        }
    };

    match profile.mode() {
        CoverageMode::Unset => Ok(format!("No coverage reports found in '{}'\n", path.display())),
        CoverageMode::FunctionGranularity => Ok(format_function_coverage(&profile)),
        CoverageMode::FileGranularity => Ok(format_file_coverage(&profile)),
    }
}

fn format_function_coverage(profile: &CoverageProfile) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{:<50} {:>8} {:>8} {:>8}  MISSED",
        "FUNCTION", "LINES", "HIT", "RATE"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(96)).unwrap();

    for (name, hits) in profile.functions() {
        let mut instrumented: Vec<u32> = hits.iter().map(|h| h.line_number).collect();
        instrumented.sort_unstable();
        instrumented.dedup();
        let mut missed: Vec<u32> = hits
            .iter()
            .filter(|h| h.hit_count == 0)
            .map(|h| h.line_number)
            .collect();
        missed.sort_unstable();
        missed.dedup();

        let total = hits.len();
        let hit = hits.iter().filter(|h| h.hit_count > 0).count();
        let rate = match total {
            0 => "-".to_string(),
            _ => format!("{:.1}%", hit as f64 / total as f64 * 100.0),
        };
        writeln!(
            out,
            "{:<50} {:>8} {:>8} {:>8}  {}",
            name,
            total,
            hit,
            rate,
            report::format_line_ranges(&missed, &instrumented)
        )
        .unwrap();
    }

    let branches = profile.branches().count();
    if branches > 0 {
        let taken = profile
            .branches()
            .filter(|(_, b)| b.true_hits > 0 && b.false_hits > 0)
            .count();
        writeln!(out, "\nBranches:   {taken}/{branches} taken both ways").unwrap();
    }
    out
}

fn format_file_coverage(profile: &CoverageProfile) -> String {
    let mut out = String::new();
    writeln!(out, "{:<70} {:>8}", "FILE", "EXECUTED").unwrap();
    writeln!(out, "{}", "-".repeat(79)).unwrap();
    for (path, lines) in profile.files() {
        writeln!(out, "{:<70} {:>8}", path, lines.len()).unwrap();
    }
    out
}

/// Reachable functions of one fuzzer that no coverage report shows as hit.
pub fn cmd_uncovered(config: &Config, target_dir: &Path, artifact: &Path) -> Result<String> {
    let mut profile = FuzzerProfile::load(artifact, config)
        .with_context(|| format!("Failed to load {}", artifact.display()))?;
    profile.accumulate(target_dir)?;

    let uncovered = profile.uncovered_reachable_functions();
    if uncovered.is_empty() {
        return Ok(format!(
            "All {} reachable functions of '{}' are covered\n",
            profile.reached_functions().len(),
            profile.key()
        ));
    }

    let mut out = String::new();
    writeln!(
        out,
        "Uncovered reachable functions of '{}' ({} of {}):",
        profile.key(),
        uncovered.len(),
        profile.reached_functions().len()
    )
    .unwrap();
    for name in uncovered {
        let detail = match profile.hit_summary(name) {
            Some(s) => format!("0/{} lines", s.total_lines),
            None => "no data".to_string(),
        };
        let location = profile
            .function(name)
            .map(|f| f.source_file.as_str())
            .unwrap_or_default();
        writeln!(out, "  {name}  ({detail})  {location}").unwrap();
    }
    Ok(out)
}

/// The coverage-report link for a source location.
pub fn cmd_link(config: &Config, source_file: &str, line: u32, function: &str) -> String {
    let resolver = LinkResolver::from_config(config);
    let mut link = resolver.resolve_link(&config.coverage_url, source_file, line, function);
    link.push('\n');
    link
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "Fuzzer filename": "/src/proj/fuzz_parse.c",
        "All functions": {"Elements": [
            {"functionName": "LLVMFuzzerTestOneInput", "functionSourceFile": "/src/proj/fuzz_parse.c",
             "BBCount": 4, "CyclomaticComplexity": 2, "functionsReached": ["parse", "helper"]},
            {"functionName": "parse", "functionSourceFile": "/src/proj/parse.c",
             "BBCount": 10, "CyclomaticComplexity": 5, "functionsReached": ["helper"]},
            {"functionName": "helper", "functionSourceFile": "/src/proj/parse.c",
             "BBCount": 3, "CyclomaticComplexity": 1}
        ]},
        "Callsites": [{"dst_function_name": "parse", "dst_function_source_file": "/src/proj/parse.c"}]
    }"#;

    const REPORT: &str = "\
LLVMFuzzerTestOneInput:
    5|     12|  parse(data, size);
parse:
   10|     12|  if (size < 4)
   11|      0|    return 0;
   12|     12|  helper();
  |  Branch (10:7): [True: 0, False: 12]
helper:
   20|      0|  abort();
";

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fuzzerLogFile-0-abc.data.json"), ARTIFACT).unwrap();
        std::fs::write(dir.path().join("fuzz_parse.covreport"), REPORT).unwrap();
        dir
    }

    #[test]
    fn test_cmd_report_text() {
        let dir = setup();
        let out = cmd_report(&Config::default(), dir.path(), None, false).unwrap();

        assert!(out.contains("FUZZER"));
        assert!(out.contains("/fuzz_parse.c"));
        assert!(out.contains("Basefolder: /src/proj"));
    }

    #[test]
    fn test_cmd_report_json() {
        let dir = setup();
        let out = cmd_report(&Config::default(), dir.path(), None, true).unwrap();

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["profiles"][0]["reached-functions"], 2);
        assert_eq!(value["profiles"][0]["total-basic-blocks"], 13);
        assert_eq!(value["profiles"][0]["uncovered-reachable-functions"], 1);
    }

    #[test]
    fn test_cmd_report_no_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_report(&Config::default(), dir.path(), None, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::FuzzcovError>(),
            Some(crate::error::FuzzcovError::NoProfiles(_))
        ));
    }

    #[test]
    fn test_cmd_coverage_functions() {
        let dir = setup();
        let out = cmd_coverage(dir.path(), TargetLanguage::NativeCompiled, Some("fuzz_parse"), None).unwrap();

        assert!(out.contains("FUNCTION"));
        assert!(out.contains("parse"));
        assert!(out.contains("66.7%"));
        assert!(out.contains("Branches:   0/1"));
    }

    #[test]
    fn test_cmd_coverage_empty() {
        let dir = tempfile::tempdir().unwrap();
        let out = cmd_coverage(dir.path(), TargetLanguage::NativeCompiled, None, None).unwrap();
        assert!(out.contains("No coverage reports found"));
    }

    #[test]
    fn test_cmd_coverage_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("all_cov.json"),
            r#"{"files": {"/pythoncovmergedfiles/medio/pkg/mod.py": {"executed_lines": [1, 2]}}}"#,
        )
        .unwrap();
        let out = cmd_coverage(dir.path(), TargetLanguage::Interpreted, None, None).unwrap();
        assert!(out.contains("pkg/mod.py"));
        assert!(!out.contains("pythoncovmergedfiles"));
    }

    #[test]
    fn test_cmd_coverage_single_file() {
        let dir = setup();
        let report = dir.path().join("fuzz_parse.covreport");
        // The file's own format wins over the language default.
        let out = cmd_coverage(&report, TargetLanguage::Interpreted, None, None).unwrap();
        assert!(out.contains("helper"));

        let junk = dir.path().join("notes.txt");
        std::fs::write(&junk, "hello").unwrap();
        assert!(cmd_coverage(&junk, TargetLanguage::NativeCompiled, None, None).is_err());
    }

    #[test]
    fn test_cmd_uncovered() {
        let dir = setup();
        let artifact = dir.path().join("fuzzerLogFile-0-abc.data.json");
        let out = cmd_uncovered(&Config::default(), dir.path(), &artifact).unwrap();

        assert!(out.contains("(1 of 2)"));
        assert!(out.contains("helper  (0/1 lines)"));
        assert!(!out.contains("  parse  ("));
    }

    #[test]
    fn test_cmd_link_native() {
        let out = cmd_link(&Config::default(), "/src/proj/parse.c", 42, "parse");
        assert_eq!(out, "/covreport/linux/src/proj/parse.c.html#L42\n");
    }

    #[test]
    fn test_cmd_link_interpreted_without_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default()
            .with_language(TargetLanguage::Interpreted)
            .with_index_root(dir.path());
        assert_eq!(cmd_link(&config, "yaml/reader.py", 3, "yaml.reader.peek"), "#\n");
    }
}
