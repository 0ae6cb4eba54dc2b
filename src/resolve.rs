//! Matching between function names as the static analysis knows them and
//! keys as they appear in coverage reports.
//!
//! Symbols arrive mangled or demangled depending on the toolchain, so a
//! lookup walks an ordered chain of [`KeyStrategy`]s and stops at the first
//! candidate key that exists in the profile.

use std::borrow::Cow;

use crate::model::{CoverageMode, CoverageProfile, HitSummary, LineHit};

/// Demangle a C++ (Itanium) or Rust symbol. Spaces are removed first;
/// names that are not mangled come back as that compact form.
pub fn demangle(symbol: &str) -> String {
    let compact: String = symbol.chars().filter(|c| *c != ' ').collect();

    if is_rust_symbol(&compact) {
        if let Ok(demangled) = rustc_demangle::try_demangle(&compact) {
            return format!("{demangled:#}");
        }
    }
    if let Ok(sym) = cpp_demangle::Symbol::new(compact.as_bytes()) {
        if let Ok(demangled) = sym.demangle(&cpp_demangle::DemangleOptions::default()) {
            return demangled;
        }
    }
    compact
}

/// v0 symbols start with `_R`. Legacy ones share the Itanium `_ZN` prefix
/// and are told apart by their trailing `17h<16 hex>E` hash segment.
fn is_rust_symbol(symbol: &str) -> bool {
    if symbol.starts_with("_R") {
        return true;
    }
    if !symbol.starts_with("_ZN") {
        return false;
    }
    // Drop an LLVM `.llvm.1234` style suffix before looking for the hash.
    let base = symbol.split('.').next().unwrap_or(symbol);
    base.strip_suffix('E')
        .and_then(|rest| rest.len().checked_sub(19).and_then(|i| rest.get(i..)))
        .and_then(|tail| tail.strip_prefix("17h"))
        .is_some_and(|hash| hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Drop whitespace that some toolchains leave inside identifiers.
pub fn normalize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\t' | '\r' | '\n' | ' '))
        .collect()
}

/// One way of turning a function name into a candidate report key.
pub trait KeyStrategy {
    fn name(&self) -> &'static str;

    fn candidate<'a>(&self, function: &'a str) -> Cow<'a, str>;
}

/// The name as given.
pub struct ExactKey;

impl KeyStrategy for ExactKey {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn candidate<'a>(&self, function: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(function)
    }
}

/// The demangled name.
pub struct DemangledKey;

impl KeyStrategy for DemangledKey {
    fn name(&self) -> &'static str {
        "demangled"
    }

    fn candidate<'a>(&self, function: &'a str) -> Cow<'a, str> {
        Cow::Owned(demangle(function))
    }
}

/// The name with embedded whitespace removed.
pub struct NormalizedKey;

impl KeyStrategy for NormalizedKey {
    fn name(&self) -> &'static str {
        "normalized"
    }

    fn candidate<'a>(&self, function: &'a str) -> Cow<'a, str> {
        Cow::Owned(normalize_identifier(function))
    }
}

/// Ordered chain of key strategies; the first hit wins.
pub struct NameResolver {
    strategies: Vec<Box<dyn KeyStrategy + Send + Sync>>,
}

impl Default for NameResolver {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(ExactKey),
                Box::new(DemangledKey),
                Box::new(NormalizedKey),
            ],
        }
    }
}

impl std::fmt::Debug for NameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}

impl NameResolver {
    pub fn with_strategies(strategies: Vec<Box<dyn KeyStrategy + Send + Sync>>) -> Self {
        Self { strategies }
    }

    /// The `function_hits` key for `function`, if any strategy finds one.
    pub fn resolve<'p>(&self, profile: &'p CoverageProfile, function: &str) -> Option<&'p str> {
        self.strategies.iter().find_map(|strategy| {
            let candidate = strategy.candidate(function);
            profile.function_key(&candidate)
        })
    }

    /// `(total_lines, hit_lines)` for `function`, or `None` when the
    /// function cannot be found in the report.
    pub fn hit_summary(&self, profile: &CoverageProfile, function: &str) -> Option<HitSummary> {
        let key = self.resolve(profile, function)?;
        profile.function_hits(key).map(HitSummary::from_hits)
    }

    /// The resolved hit-list, or an empty slice.
    pub fn hit_details<'p>(&self, profile: &'p CoverageProfile, function: &str) -> &'p [LineHit] {
        self.resolve(profile, function)
            .and_then(|key| profile.function_hits(key))
            .unwrap_or(&[])
    }

    /// Map a dotted module-style name to a file key of a file-granular
    /// profile. `pkg.mod` becomes `pkg/mod.py`, which must be a suffix of
    /// a known file path.
    pub fn resolve_file<'p>(&self, profile: &'p CoverageProfile, module: &str) -> Option<&'p str> {
        if profile.mode() != CoverageMode::FileGranularity {
            return None;
        }
        let refined = module_to_path(module);
        profile
            .files()
            .map(|(path, _)| path)
            .find(|path| path.ends_with(&refined))
    }
}

/// Lookups through the default resolver chain.
impl CoverageProfile {
    pub fn hit_summary(&self, function: &str) -> Option<HitSummary> {
        NameResolver::default().hit_summary(self, function)
    }

    pub fn hit_details(&self, function: &str) -> &[LineHit] {
        NameResolver::default().hit_details(self, function)
    }

    pub fn is_function_hit(&self, function: &str) -> bool {
        self.hit_summary(function).is_some_and(|s| s.hit_lines > 0)
    }

    /// Whether `line` of file `key` executed. Only meaningful for
    /// file-granular profiles; with `resolve_name`, `key` is a dotted module
    /// name mapped through [`NameResolver::resolve_file`].
    pub fn file_line_hit(&self, key: &str, line: u32, resolve_name: bool) -> bool {
        if self.mode() != CoverageMode::FileGranularity {
            return false;
        }
        let target = if resolve_name {
            match NameResolver::default().resolve_file(self, key) {
                Some(found) => found,
                None => return false,
            }
        } else {
            key
        };
        self.file_executed_lines(target)
            .is_some_and(|lines| lines.contains(&line))
    }
}

/// `yaml.reader` → `yaml/reader.py`.
pub fn module_to_path(module: &str) -> String {
    let stem = module.strip_suffix(".py").unwrap_or(module);
    format!("{}.py", stem.replace('.', "/"))
}

/// Best-effort check that a dotted function name like
/// `yaml.reader.Reader.peek` lives in `relative_file` (e.g.
/// `yaml/reader.py`).
pub fn approximate_module_file(function: &str, relative_file: &str) -> bool {
    module_match_depth(function, relative_file).is_some()
}

/// How many leading components of the dotted `function` name match
/// `relative_file` as a module path, or `None` if no prefix does.
///
/// Every dotted prefix of the name, longest first, is turned into a path
/// and tested as a path-component suffix of the file with its `.py`
/// extension (and a trailing `__init__`) removed.
pub fn module_match_depth(function: &str, relative_file: &str) -> Option<usize> {
    let function = function.trim_start_matches('.');
    let stem = relative_file.strip_suffix(".py")?;
    let stem = stem.strip_suffix("/__init__").unwrap_or(stem);
    let stem = stem.replace('\\', "/");

    let parts: Vec<&str> = function.split('.').filter(|p| !p.is_empty()).collect();
    (1..=parts.len()).rev().find(|&n| {
        let candidate = parts[..n].join("/");
        stem == candidate || stem.ends_with(&format!("/{candidate}"))
    })
}
