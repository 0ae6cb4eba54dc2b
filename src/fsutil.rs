//! Small filesystem utilities.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Every regular file below `dir`, in sorted order. Unreadable entries are
/// logged and skipped.
pub fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry under {}: {e}", dir.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();
    out.sort();
    out
}

/// The first file (in sorted order) below `dir` whose name is exactly
/// `file_name`.
pub fn find_file_named(dir: &Path, file_name: &str) -> Option<PathBuf> {
    walk_files(dir)
        .into_iter()
        .find(|p| p.file_name().and_then(|n| n.to_str()) == Some(file_name))
}
