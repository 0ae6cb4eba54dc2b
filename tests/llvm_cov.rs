mod common;

use fuzzcov::model::{BranchHits, CoverageMode, LineHit};
use fuzzcov::parsers::llvm_cov;
use fuzzcov::parsers::CoverageParser;

#[test]
fn parse_fixture_report() {
    let cp = llvm_cov::parse(include_bytes!("fixtures/fuzz_parse.covreport")).unwrap();

    assert_eq!(cp.mode(), CoverageMode::FunctionGranularity);
    assert_eq!(cp.functions().count(), 3);

    let entry = cp.hit_summary("LLVMFuzzerTestOneInput").unwrap();
    assert_eq!((entry.total_lines, entry.hit_lines), (6, 6));

    // `parse.c:parse_header:` headers keep only the function name.
    let parse = cp.hit_details("parse_header");
    assert_eq!(parse.len(), 7);
    assert_eq!(parse[2], LineHit { line_number: 32, hit_count: 1200 });
    assert_eq!(parse[3], LineHit { line_number: 33, hit_count: 0 });

    assert_eq!(
        cp.branch_hits("LLVMFuzzerTestOneInput:13,7"),
        Some(BranchHits { true_hits: 3, false_hits: 45 })
    );
    assert_eq!(
        cp.branch_hits("parse_header:31,22"),
        Some(BranchHits { true_hits: 1200, false_hits: 45 })
    );
    assert_eq!(cp.branches().count(), 3);
}

#[test]
fn mangled_header_resolves_both_ways() {
    let cp = llvm_cov::parse(include_bytes!("fixtures/fuzz_parse.covreport")).unwrap();

    let by_mangled = cp.hit_summary("_Z8checksumPKhm").unwrap();
    assert_eq!((by_mangled.total_lines, by_mangled.hit_lines), (3, 0));
    assert!(!cp.is_function_hit("_Z8checksumPKhm"));
    assert!(!cp.contains_function("_Z8checksumPKhm"));
}

#[test]
fn load_dir_prefers_target_reports() {
    let dir = tempfile::tempdir().unwrap();
    common::write(dir.path(), "fuzz_a.covreport", "a_only:\n  1|  1|  x;\n");
    common::write(dir.path(), "nested/fuzz_b.covreport", "b_only:\n  1|  1|  x;\n");
    common::write(dir.path(), "fuzz_a.txt", "ignored:\n  1|  1|  x;\n");

    let cp = llvm_cov::load_dir(dir.path(), Some("fuzz_b"));
    assert!(cp.contains_function("b_only"));
    assert!(!cp.contains_function("a_only"));
    assert_eq!(cp.source_reports().len(), 1);

    let all = llvm_cov::load_dir(dir.path(), None);
    assert!(all.contains_function("a_only"));
    assert!(all.contains_function("b_only"));
    assert!(!all.contains_function("ignored"));
}

#[test]
fn load_dir_falls_back_to_every_report() {
    let dir = tempfile::tempdir().unwrap();
    common::write(dir.path(), "all.covreport", "main:\n  1|  1|  x;\n");

    let cp = llvm_cov::load_dir(dir.path(), Some("fuzz_missing"));
    assert!(cp.contains_function("main"));
}

#[test]
fn load_dir_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    common::write(dir.path(), "fuzz_a.covreport", "main:\n  1|  2.5k|  x;\n  |  Branch (1:3): [True: 1, False: 0]\n");
    common::write(dir.path(), "fuzz_b.covreport", "other:\n  4|  0|  y;\n");

    let first = llvm_cov::load_dir(dir.path(), None);
    let second = llvm_cov::load_dir(dir.path(), None);
    assert_eq!(first, second);
}

#[test]
fn load_missing_dir_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let cp = llvm_cov::load_dir(&dir.path().join("nope"), None);
    assert!(cp.is_empty());
    assert_eq!(cp.mode(), CoverageMode::Unset);

    let empty = llvm_cov::load_dir(dir.path(), None);
    assert!(empty.is_empty());
    assert_eq!(empty.mode(), CoverageMode::Unset);
}

#[test]
fn hit_summary_counts_every_appended_pair() {
    let input = b"f:\n  1|  0|  a;\n  1|  3|  a;\n  2|  9|  b;\n  3|  0|  c;\n";
    let cp = llvm_cov::parse(input).unwrap();
    let summary = cp.hit_summary("f").unwrap();
    assert_eq!(summary.total_lines, 4);
    assert_eq!(summary.hit_lines, 2);
    assert_eq!(summary.percentage(), Some(50.0));
}

#[test]
fn parser_handles_crlf() {
    let mut profile = fuzzcov::model::CoverageProfile::new();
    let input = b"main:\r\n  7|  1|  x;\r\n";
    llvm_cov::LlvmCovParser
        .parse_into(&mut &input[..], &mut profile)
        .unwrap();
    assert_eq!(
        profile.function_hits("main").unwrap(),
        &[LineHit { line_number: 7, hit_count: 1 }]
    );
}
