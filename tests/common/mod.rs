#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

pub const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

pub fn fixture(name: &str) -> PathBuf {
    Path::new(FIXTURES).join(name)
}

/// Write `content` to `dir/name`, creating parent directories.
pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// `(name, source file, basic blocks, complexity, functions reached)`
pub type Func<'a> = (&'a str, &'a str, u64, u64, &'a [&'a str]);

/// A static analysis artifact document.
pub fn artifact(fuzzer_filename: &str, functions: &[Func], callsites: &[(&str, &str)]) -> String {
    let elements: Vec<_> = functions
        .iter()
        .map(|(name, file, bb, cc, reached)| {
            json!({
                "functionName": name,
                "functionSourceFile": file,
                "BBCount": bb,
                "CyclomaticComplexity": cc,
                "functionsReached": reached,
            })
        })
        .collect();
    let callsites: Vec<_> = callsites
        .iter()
        .map(|(name, file)| json!({"dst_function_name": name, "dst_function_source_file": file}))
        .collect();
    json!({
        "Fuzzer filename": fuzzer_filename,
        "All functions": {"Elements": elements},
        "Callsites": callsites,
    })
    .to_string()
}

/// A target directory holding the `fuzz_parse` fixtures: one artifact and
/// its coverage report.
pub fn native_target_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(
        fixture("fuzzerLogFile-0-Xu1Pq.data.json"),
        dir.path().join("fuzzerLogFile-0-Xu1Pq.data.json"),
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("covreport")).unwrap();
    std::fs::copy(
        fixture("fuzz_parse.covreport"),
        dir.path().join("covreport/fuzz_parse.covreport"),
    )
    .unwrap();
    dir
}
