/// Parser for coverage.py JSON reports (`coverage json`).
///
/// Reference: https://coverage.readthedocs.io/en/latest/cmd.html#json-reporting-coverage-json
///
/// Only the per-file executed lines are used:
///   { "files": { "<path>": { "executed_lines": [1, 2, 5], ... }, ... } }
///
/// Coverage of interpreted targets is file-granular: there are no function
/// sections, so the resulting profile is in [`CoverageMode::FileGranularity`].
use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use super::{sniff_head, CoverageParser, Format};
use crate::error::Result;
use crate::fsutil::walk_files;
use crate::model::*;

/// Mount points the OSS-Fuzz Python coverage build prepends to every path.
const SANDBOX_PREFIXES: [&str; 2] = ["/pythoncovmergedfiles", "/medio"];

/// coverage.py JSON parser.
pub struct CoveragePyParser;

#[derive(Deserialize)]
struct Report {
    #[serde(default)]
    files: BTreeMap<String, FileEntry>,
}

#[derive(Deserialize)]
struct FileEntry {
    #[serde(default)]
    executed_lines: Vec<u32>,
}

impl CoverageParser for CoveragePyParser {
    fn format(&self) -> Format {
        Format::CoveragePy
    }

    fn can_parse(&self, path: &Path, content: &[u8]) -> bool {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if !is_json {
            return false;
        }
        let head = sniff_head(content);
        head.trim_start().starts_with('{')
            && head.contains("\"files\"")
            && head.contains("\"executed_lines\"")
    }

    fn parse_into(&self, reader: &mut dyn BufRead, profile: &mut CoverageProfile) -> Result<()> {
        let report: Report = serde_json::from_reader(reader)?;
        for (path, entry) in report.files {
            profile.set_file_lines(
                normalize_path(&path),
                entry.executed_lines.into_iter().collect::<BTreeSet<_>>(),
            );
        }
        profile.set_mode(CoverageMode::FileGranularity);
        Ok(())
    }
}

/// Parse a single coverage.py report from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageProfile> {
    let mut profile = CoverageProfile::new();
    CoveragePyParser.parse_into(&mut &*input, &mut profile)?;
    Ok(profile)
}

/// Load coverage.py output from `path`, which may be a report file or a
/// directory to search for reports.
///
/// Every JSON file in the directory that looks like a coverage.py report is
/// folded in. Documents that fail to parse are logged and skipped. A
/// missing path yields an empty profile with mode [`CoverageMode::Unset`].
pub fn load(path: &Path) -> CoverageProfile {
    let mut profile = CoverageProfile::new();

    let candidates = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        walk_files(path)
    } else {
        warn!("coverage path {} does not exist", path.display());
        return profile;
    };

    for candidate in candidates {
        let content = match std::fs::read(&candidate) {
            Ok(c) => c,
            Err(e) => {
                warn!("could not read {}: {e}", candidate.display());
                continue;
            }
        };
        if !CoveragePyParser.can_parse(&candidate, &content) {
            continue;
        }
        info!("reading coverage report {}", candidate.display());
        match CoveragePyParser.parse_into(&mut content.as_slice(), &mut profile) {
            Ok(()) => profile.add_source_report(&candidate),
            Err(e) => warn!("skipping malformed report {}: {e}", candidate.display()),
        }
    }

    profile
}

/// Strip the sandbox mount prefixes so paths line up with source-tree
/// relative paths.
pub fn normalize_path(path: &str) -> String {
    let mut out = path.to_string();
    for prefix in SANDBOX_PREFIXES {
        out = out.replace(prefix, "");
    }
    if out.len() != path.len() {
        if let Some(rest) = out.strip_prefix('/') {
            return rest.to_string();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_sandbox_prefix() {
        let input = br#"{"files": {"/pythoncovmergedfiles/medio/pkg/mod.py": {"executed_lines": [3,4,5]}}}"#;
        let cp = parse(input).unwrap();

        assert_eq!(cp.mode(), CoverageMode::FileGranularity);
        let lines = cp.file_executed_lines("pkg/mod.py").unwrap();
        assert_eq!(lines.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_parse_keeps_plain_paths() {
        let input = br#"{"files": {"/src/app/util.py": {"executed_lines": [1], "missing_lines": [2]}}}"#;
        let cp = parse(input).unwrap();
        assert!(cp.file_executed_lines("/src/app/util.py").is_some());
    }

    #[test]
    fn test_parse_missing_executed_lines() {
        let input = br#"{"files": {"a.py": {"summary": {}}}}"#;
        let cp = parse(input).unwrap();
        assert!(cp.file_executed_lines("a.py").unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse(b"{not json").is_err());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/pythoncovmergedfiles/medio/yaml/reader.py"), "yaml/reader.py");
        assert_eq!(normalize_path("/medio/x.py"), "x.py");
        assert_eq!(normalize_path("/src/x.py"), "/src/x.py");
        assert_eq!(normalize_path("rel/x.py"), "rel/x.py");
    }

    #[test]
    fn test_can_parse() {
        let parser = CoveragePyParser;
        let content = br#"{"files": {"a.py": {"executed_lines": []}}}"#;
        assert!(parser.can_parse(Path::new("all_cov.json"), content));
        assert!(!parser.can_parse(Path::new("all_cov.txt"), content));
        assert!(!parser.can_parse(Path::new("other.json"), b"{\"files\": []}"));
    }
}
