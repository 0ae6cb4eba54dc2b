/// Parser for `llvm-cov show` text dumps (`*.covreport`).
///
/// Reference: https://llvm.org/docs/CommandGuide/llvm-cov.html#llvm-cov-show
///
/// The dump is a sequence of function sections:
///   <function name>:
///      <line>|  <count>|<source text>
///     |  Branch (<line>:<column>): [True: <count>, False: <count>]
///
/// Counts are abbreviated for large values (`1.2k`, `5.99M`), see
/// [`parse_scaled_count`].
use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, trace, warn};

use super::{parse_scaled_count, CoverageParser, Format};
use crate::error::Result;
use crate::fsutil::walk_files;
use crate::model::*;
use crate::resolve::demangle;

/// File extension of per-fuzzer coverage dumps.
pub const REPORT_EXTENSION: &str = "covreport";

static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Branch \((\d+):(\d+)\):\s*\[True:\s*([^,\]]*),\s*False:\s*([^\]]*)\]").unwrap()
});

/// llvm-cov text dump parser.
pub struct LlvmCovParser;

impl CoverageParser for LlvmCovParser {
    fn format(&self) -> Format {
        Format::LlvmCov
    }

    fn can_parse(&self, path: &Path, _content: &[u8]) -> bool {
        is_report_file(path)
    }

    fn parse_into(&self, reader: &mut dyn BufRead, profile: &mut CoverageProfile) -> Result<()> {
        parse_streaming_reader(reader, profile)?;
        profile.set_mode(CoverageMode::FunctionGranularity);
        Ok(())
    }
}

/// Parse a single report from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageProfile> {
    let mut profile = CoverageProfile::new();
    LlvmCovParser.parse_into(&mut &*input, &mut profile)?;
    Ok(profile)
}

/// Scan `dir` for `*.covreport` files and fold them into one profile.
///
/// When `target_name` is given and some report file names contain it, only
/// those reports are read. Otherwise every report found is folded in. A
/// missing directory, or one without reports, yields an empty profile with
/// mode [`CoverageMode::Unset`].
pub fn load_dir(dir: &Path, target_name: Option<&str>) -> CoverageProfile {
    let mut profile = CoverageProfile::new();
    if !dir.is_dir() {
        warn!("coverage directory {} does not exist", dir.display());
        return profile;
    }

    let reports: Vec<_> = walk_files(dir)
        .into_iter()
        .filter(|p| is_report_file(p))
        .collect();
    info!("found {} coverage reports in {}", reports.len(), dir.display());

    let selected: Vec<_> = match target_name {
        Some(name) if reports.iter().any(|p| file_name_contains(p, name)) => reports
            .into_iter()
            .filter(|p| file_name_contains(p, name))
            .collect(),
        Some(name) => {
            debug!("no report matches '{name}', folding all reports");
            reports
        }
        None => reports,
    };

    for report in &selected {
        info!("reading coverage report {}", report.display());
        let file = match std::fs::File::open(report) {
            Ok(f) => f,
            Err(e) => {
                warn!("could not open {}: {e}", report.display());
                continue;
            }
        };
        let mut reader = std::io::BufReader::new(file);
        match LlvmCovParser.parse_into(&mut reader, &mut profile) {
            Ok(()) => profile.add_source_report(report),
            Err(e) => warn!("could not read {}: {e}", report.display()),
        }
    }

    profile
}

fn is_report_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(REPORT_EXTENSION))
}

fn file_name_contains(path: &Path, needle: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(needle))
}

/// A function header ends with `:` and has no column separator.
fn is_function_header(line: &str) -> bool {
    line.ends_with(':') && !line.contains('|')
}

/// Pull the function name out of a header line.
///
/// `file.c:name:` style headers (three colon fields) yield the middle
/// field; anything else is the whole line minus spaces and the trailing
/// colon.
fn header_function_name(line: &str) -> String {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() == 3 {
        return fields[1].replace(' ', "");
    }
    let compact = line.replace(' ', "");
    match compact.strip_suffix(':') {
        Some(name) => name.to_string(),
        None => compact,
    }
}

/// Parse `Branch (<line>:<column>): [True: <n>, False: <m>]`. Any field
/// that fails to parse drops the whole record.
fn parse_branch_line(line: &str) -> Option<(u32, u32, BranchHits)> {
    let caps = BRANCH_RE.captures(line)?;
    let line_number = caps[1].parse().ok()?;
    let column = caps[2].parse().ok()?;
    let true_hits = parse_scaled_count(&caps[3])?;
    let false_hits = parse_scaled_count(&caps[4])?;
    Some((
        line_number,
        column,
        BranchHits {
            true_hits,
            false_hits,
        },
    ))
}

/// Parse `<line>|<count>|<source>`. A bad line number drops the record; a
/// bad count is recorded as zero.
fn parse_count_line(line: &str) -> Option<LineHit> {
    let mut fields = line.split('|');
    let line_number = fields.next()?.trim().parse().ok()?;
    let hit_count = fields.next().and_then(parse_scaled_count).unwrap_or(0);
    Some(LineHit {
        line_number,
        hit_count,
    })
}

/// Single forward pass over one report. The only state is the function
/// whose section we are in; rows before the first header are ignored.
fn parse_streaming_reader(reader: &mut dyn BufRead, profile: &mut CoverageProfile) -> Result<()> {
    let mut current_function: Option<String> = None;

    let mut raw_line = Vec::new();
    loop {
        raw_line.clear();
        let n = reader.read_until(b'\n', &mut raw_line)?;
        if n == 0 {
            break; // EOF
        }

        let Ok(text) = std::str::from_utf8(&raw_line) else {
            continue; // not UTF-8
        };
        let line = text.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            continue;
        }

        if is_function_header(line) {
            let key = demangle(&header_function_name(line));
            trace!("function section: {key}");
            profile.begin_function(&key);
            current_function = Some(key);
            continue;
        }

        let Some(function) = current_function.as_deref() else {
            continue;
        };

        if line.contains("Branch (") {
            if let Some((line_number, column, hits)) = parse_branch_line(line) {
                profile.record_branch(branch_key(function, line_number, column), hits);
            }
        } else if line.contains('|') {
            if let Some(hit) = parse_count_line(line) {
                trace!("{function} -- {} -- {}", hit.line_number, hit.hit_count);
                profile.push_line_hit(function, hit);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_function() {
        let input = b"LLVMFuzzerTestOneInput:\n   10|      5|  foo();\n   11|      0|  bar();\n";
        let cp = parse(input).unwrap();

        assert_eq!(cp.mode(), CoverageMode::FunctionGranularity);
        let hits = cp.function_hits("LLVMFuzzerTestOneInput").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0], LineHit { line_number: 10, hit_count: 5 });
        assert_eq!(hits[1], LineHit { line_number: 11, hit_count: 0 });
    }

    #[test]
    fn test_parse_branch_line() {
        let input = b"f:\n   81|  1.2k|  if (x) {\n  |  Branch (81:7): [True: 1.2k, False: 0]\n";
        let cp = parse(input).unwrap();

        assert_eq!(
            cp.branch_hits("f:81,7"),
            Some(BranchHits { true_hits: 1200, false_hits: 0 })
        );
        // The branch row is not a line row.
        assert_eq!(cp.function_hits("f").unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_branch_is_skipped() {
        let input = b"f:\n  |  Branch (81:7): [True: lots, False: 0]\n";
        let cp = parse(input).unwrap();
        assert_eq!(cp.branches().count(), 0);
        assert!(cp.function_hits("f").unwrap().is_empty());
    }

    #[test]
    fn test_branch_overwrites_same_key() {
        let input = b"f:\n  |  Branch (3:1): [True: 1, False: 2]\n  |  Branch (3:1): [True: 7, False: 8]\n";
        let cp = parse(input).unwrap();
        assert_eq!(
            cp.branch_hits("f:3,1"),
            Some(BranchHits { true_hits: 7, false_hits: 8 })
        );
    }

    #[test]
    fn test_rows_before_header_ignored() {
        let input = b"   1|  3|  int x;\nmain:\n   2|  1|  return 0;\n";
        let cp = parse(input).unwrap();
        assert_eq!(cp.functions().count(), 1);
        assert_eq!(cp.function_hits("main").unwrap().len(), 1);
    }

    #[test]
    fn test_bad_count_defaults_to_zero() {
        let input = b"main:\n   7|   ??|  x++;\n  xx|  4|  y++;\n";
        let cp = parse(input).unwrap();
        // Line 7 kept with zero hits; the non-numeric line number is dropped.
        assert_eq!(
            cp.function_hits("main").unwrap(),
            &[LineHit { line_number: 7, hit_count: 0 }]
        );
    }

    #[test]
    fn test_duplicate_lines_are_kept() {
        let input = b"main:\n   5|  1|  a();\n   5|  0|  a();\n";
        let cp = parse(input).unwrap();
        assert_eq!(cp.function_hits("main").unwrap().len(), 2);
    }

    #[test]
    fn test_repeated_header_resets_hits() {
        let input = b"main:\n   5|  1|  a();\nmain:\n   6|  2|  b();\n";
        let cp = parse(input).unwrap();
        assert_eq!(
            cp.function_hits("main").unwrap(),
            &[LineHit { line_number: 6, hit_count: 2 }]
        );
    }

    #[test]
    fn test_header_name_extraction() {
        assert_eq!(header_function_name("LLVMFuzzerTestOneInput:"), "LLVMFuzzerTestOneInput");
        assert_eq!(header_function_name("parse.c:parse_header:"), "parse_header");
        assert_eq!(header_function_name("ns::helper:"), "ns::helper");
        assert_eq!(header_function_name("  spaced name :"), "spacedname");
    }

    #[test]
    fn test_mangled_header_is_demangled() {
        let input = b"_Z3fooi:\n    3|  2|  return x;\n";
        let cp = parse(input).unwrap();
        assert!(cp.contains_function("foo(int)"));
        assert!(!cp.contains_function("_Z3fooi"));
    }

    #[test]
    fn test_scaled_hit_counts() {
        let input = b"hot:\n   83|  5.99M|    char *p = malloc(123);\n";
        let cp = parse(input).unwrap();
        assert_eq!(cp.function_hits("hot").unwrap()[0].hit_count, 5_990_000);
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let mut input = b"main:\n".to_vec();
        input.extend_from_slice(b"   1|  1|  \xff\xfe\n");
        input.extend_from_slice(b"   2|  1|  ok();\n");
        let cp = parse(&input).unwrap();
        assert_eq!(
            cp.function_hits("main").unwrap(),
            &[LineHit { line_number: 2, hit_count: 1 }]
        );
    }

    #[test]
    fn test_can_parse_by_extension() {
        let parser = LlvmCovParser;
        assert!(parser.can_parse(Path::new("fuzz_a.covreport"), b""));
        assert!(!parser.can_parse(Path::new("fuzz_a.txt"), b""));
    }
}
