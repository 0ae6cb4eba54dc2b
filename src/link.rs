//! Links from (source file, line, function) into a hosted coverage report.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::fsutil::find_file_named;
use crate::model::TargetLanguage;
use crate::resolve::module_match_depth;

/// Returned when no link can be produced.
pub const NO_LINK: &str = "#";

/// Index written by coverage.py's HTML reporter, mapping HTML page names
/// to the source files they render.
pub const HTML_INDEX_FILE: &str = "html_status.json";

#[derive(Debug, Deserialize)]
struct HtmlIndex {
    #[serde(default)]
    files: BTreeMap<String, HtmlIndexEntry>,
}

#[derive(Debug, Deserialize)]
struct HtmlIndexEntry {
    index: HtmlIndexInfo,
}

#[derive(Debug, Deserialize)]
struct HtmlIndexInfo {
    relative_filename: String,
}

/// Resolves coverage-report URLs for one target language.
///
/// For interpreted targets the HTML index is searched for once, on first
/// use, and reused afterwards.
#[derive(Debug)]
pub struct LinkResolver {
    language: TargetLanguage,
    index_root: PathBuf,
    index: OnceCell<Option<HtmlIndex>>,
}

impl LinkResolver {
    pub fn new(language: TargetLanguage, index_root: impl Into<PathBuf>) -> Self {
        Self {
            language,
            index_root: index_root.into(),
            index: OnceCell::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.language, config.index_root.clone())
    }

    /// URL of `line` in `source_file`, or [`NO_LINK`] when it cannot be
    /// resolved.
    pub fn resolve_link(&self, base_url: &str, source_file: &str, line: u32, function: &str) -> String {
        match self.language {
            TargetLanguage::NativeCompiled => format!("{base_url}{source_file}.html#L{line}"),
            TargetLanguage::Interpreted => self.resolve_interpreted(base_url, line, function),
        }
    }

    fn resolve_interpreted(&self, base_url: &str, line: u32, function: &str) -> String {
        let Some(index) = self.index.get_or_init(|| load_index(&self.index_root)) else {
            return NO_LINK.to_string();
        };
        // The page whose module path covers the most of the dotted name wins;
        // ties go to the first page in name order.
        let mut best: Option<(usize, &str)> = None;
        for (html_name, entry) in &index.files {
            if let Some(depth) = module_match_depth(function, &entry.index.relative_filename) {
                if best.map_or(true, |(d, _)| depth > d) {
                    best = Some((depth, html_name));
                }
            }
        }
        match best {
            Some((_, html_name)) => format!("{base_url}/{html_name}.html#t{line}"),
            None => {
                debug!("no coverage page matches {function}");
                NO_LINK.to_string()
            }
        }
    }
}

fn load_index(root: &Path) -> Option<HtmlIndex> {
    let Some(path) = find_file_named(root, HTML_INDEX_FILE) else {
        info!("could not find any {HTML_INDEX_FILE} under {}", root.display());
        return None;
    };
    let content = match std::fs::read(&path) {
        Ok(c) => c,
        Err(e) => {
            warn!("could not read {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_slice(&content) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!("malformed {}: {e}", path.display());
            None
        }
    }
}
