//! One fuzzer's correlated view: its static function inventory, the set of
//! functions its entry point reaches, and the runtime coverage attached to
//! those functions.
//!
//! A profile is filled in a fixed order, which [`FuzzerProfile::accumulate`]
//! runs in one go:
//!
//!   1. reachability from the entry point
//!   2. the unreached set
//!   3. coverage loading
//!   4. per-file targets from the call-tree
//!   5. aggregate basic-block / complexity totals
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::correlate::Correlation;
use crate::detect::Format;
use crate::error::{FuzzcovError, Result};
use crate::link::LinkResolver;
use crate::loader::StaticAnalysis;
use crate::model::*;
use crate::parsers::{coverage_py, llvm_cov};
use crate::report::ProfileStats;
use crate::resolve::NameResolver;

/// Entry function of libFuzzer-style native harnesses.
pub const NATIVE_ENTRY_POINT: &str = "LLVMFuzzerTestOneInput";

/// Interpreted harnesses name their entry point `...TestOneInput`.
pub const ENTRY_POINT_MARKER: &str = "TestOneInput";

const NATIVE_SOURCE_EXTENSIONS: [&str; 4] = [".cpp", ".cxx", ".cc", ".c"];

#[derive(Debug)]
pub struct FuzzerProfile {
    data_file: PathBuf,
    entry_source_file: String,
    binary_path: String,
    target_language: TargetLanguage,
    all_functions: BTreeMap<String, FunctionStaticInfo>,
    callsites: Vec<CallSite>,
    reached_functions: BTreeSet<String>,
    unreached_functions: BTreeSet<String>,
    file_targets: BTreeMap<String, BTreeSet<String>>,
    coverage: Option<CoverageProfile>,
    total_basic_blocks: u64,
    total_cyclomatic_complexity: u64,
    resolver: NameResolver,
    links: LinkResolver,
}

impl FuzzerProfile {
    pub fn new(data_file: impl Into<PathBuf>, analysis: StaticAnalysis, config: &Config) -> Self {
        let all_functions = analysis
            .all_functions
            .elements
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();

        Self {
            data_file: data_file.into(),
            entry_source_file: analysis.fuzzer_filename,
            binary_path: String::new(),
            target_language: config.language,
            all_functions,
            callsites: analysis.callsites,
            reached_functions: BTreeSet::new(),
            unreached_functions: BTreeSet::new(),
            file_targets: BTreeMap::new(),
            coverage: None,
            total_basic_blocks: 0,
            total_cyclomatic_complexity: 0,
            resolver: NameResolver::default(),
            links: LinkResolver::from_config(config),
        }
    }

    /// Build a profile from a static analysis artifact on disk.
    pub fn load(data_file: &Path, config: &Config) -> Result<Self> {
        let analysis = StaticAnalysis::load(data_file)?;
        Ok(Self::new(data_file, analysis, config))
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn entry_source_file(&self) -> &str {
        &self.entry_source_file
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }

    pub fn target_language(&self) -> TargetLanguage {
        self.target_language
    }

    pub fn all_functions(&self) -> &BTreeMap<String, FunctionStaticInfo> {
        &self.all_functions
    }

    pub fn function(&self, name: &str) -> Option<&FunctionStaticInfo> {
        self.all_functions.get(name)
    }

    pub fn reached_functions(&self) -> &BTreeSet<String> {
        &self.reached_functions
    }

    pub fn unreached_functions(&self) -> &BTreeSet<String> {
        &self.unreached_functions
    }

    pub fn file_targets(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.file_targets
    }

    pub fn coverage(&self) -> Option<&CoverageProfile> {
        self.coverage.as_ref()
    }

    pub fn total_basic_blocks(&self) -> u64 {
        self.total_basic_blocks
    }

    pub fn total_cyclomatic_complexity(&self) -> u64 {
        self.total_cyclomatic_complexity
    }

    /// Run every pipeline step in order.
    pub fn accumulate(&mut self, target_dir: &Path) -> Result<()> {
        self.set_reached_functions()?;
        self.set_unreached_functions();
        self.load_coverage(target_dir)?;
        self.derive_file_targets();
        self.compute_totals()
    }

    /// The function fuzzing starts from.
    ///
    /// `LLVMFuzzerTestOneInput` is looked up verbatim. Interpreted targets
    /// fall back to the first function whose name contains `TestOneInput`.
    pub fn entry_function(&self) -> Result<&FunctionStaticInfo> {
        if let Some(entry) = self.all_functions.get(NATIVE_ENTRY_POINT) {
            return Ok(entry);
        }
        if self.target_language == TargetLanguage::Interpreted {
            if let Some(entry) = self
                .all_functions
                .values()
                .find(|f| f.name.contains(ENTRY_POINT_MARKER))
            {
                return Ok(entry);
            }
        }
        Err(FuzzcovError::EntryPointNotFound {
            data_file: self.data_file.clone(),
        })
    }

    pub fn set_reached_functions(&mut self) -> Result<()> {
        let entry = self.entry_function()?;
        debug!("entry point of {} is {}", self.data_file.display(), entry.name);
        self.reached_functions = entry.functions_reached.clone();
        Ok(())
    }

    pub fn set_unreached_functions(&mut self) {
        self.unreached_functions = self
            .all_functions
            .keys()
            .filter(|name| !self.reached_functions.contains(*name))
            .cloned()
            .collect();
    }

    /// Load this fuzzer's coverage in the format its language uses.
    pub fn load_coverage(&mut self, target_dir: &Path) -> Result<()> {
        self.load_coverage_as(target_dir, Format::for_language(self.target_language))
    }

    /// Load coverage in an explicit format, which must fit the target
    /// language.
    pub fn load_coverage_as(&mut self, target_dir: &Path, format: Format) -> Result<()> {
        format.check_language(self.target_language)?;
        info!("loading {format} coverage for {}", self.key());
        let coverage = match format {
            Format::LlvmCov => llvm_cov::load_dir(target_dir, Some(&self.target_fuzzer_filename())),
            Format::CoveragePy => coverage_py::load(target_dir),
        };
        self.coverage = Some(coverage);
        Ok(())
    }

    /// Attach coverage parsed elsewhere.
    pub fn attach_coverage(&mut self, coverage: CoverageProfile) {
        self.coverage = Some(coverage);
    }

    /// Group call-tree callees by the file they live in. Callees without a
    /// source file are skipped.
    pub fn derive_file_targets(&mut self) {
        for cs in &self.callsites {
            if cs.dst_function_source_file.trim().is_empty() {
                continue;
            }
            self.file_targets
                .entry(cs.dst_function_source_file.clone())
                .or_default()
                .insert(cs.dst_function_name.clone());
        }
    }

    /// Sum basic blocks and cyclomatic complexity over every reached
    /// function. A reached function missing from the inventory means the
    /// artifacts are out of sync and is an error.
    pub fn compute_totals(&mut self) -> Result<()> {
        let mut basic_blocks = 0;
        let mut complexity = 0;
        for name in &self.reached_functions {
            let func = self.all_functions.get(name).ok_or_else(|| {
                FuzzcovError::MissingStaticFunction {
                    function: name.clone(),
                }
            })?;
            basic_blocks += func.basic_block_count;
            complexity += func.cyclomatic_complexity;
        }
        self.total_basic_blocks = basic_blocks;
        self.total_cyclomatic_complexity = complexity;
        Ok(())
    }

    pub fn reaches(&self, function: &str) -> bool {
        self.reached_functions.contains(function)
    }

    /// Whether any call-tree callee lives in `file`. Both the name as given
    /// and with `basefolder` stripped are tried.
    pub fn reaches_file(&self, file: &str, basefolder: Option<&str>) -> bool {
        let stripped = strip_base(file, basefolder);
        self.file_targets.contains_key(file) || self.file_targets.contains_key(stripped.as_str())
    }

    /// `(total_lines, hit_lines)` of `function`, or `None` when there is no
    /// coverage for it.
    pub fn hit_summary(&self, function: &str) -> Option<HitSummary> {
        let coverage = self.coverage.as_ref()?;
        self.resolver.hit_summary(coverage, function)
    }

    /// Percentage of `function`'s lines that were hit. `None` when there is
    /// no data, including a function with zero recorded lines.
    pub fn hit_percentage(&self, function: &str) -> Option<f64> {
        self.hit_summary(function)?.percentage()
    }

    /// Reached functions with no coverage data or no line hit.
    pub fn uncovered_reachable_functions(&self) -> Vec<&str> {
        self.reached_functions
            .iter()
            .filter(|name| match self.hit_summary(name) {
                None => true,
                Some(summary) => summary.hit_lines == 0,
            })
            .map(String::as_str)
            .collect()
    }

    /// True when some function defined in `file` has a non-zero hit
    /// percentage and the file is one this fuzzer's call-tree targets.
    ///
    /// `basefolder` is stripped from both the query and each function's
    /// source file before comparing; `/` means no stripping.
    pub fn is_file_covered(&self, file: &str, basefolder: Option<&str>) -> bool {
        let stripped_file = strip_base(file, basefolder);

        self.all_functions.values().any(|func| {
            let func_file = func.source_file.as_str();
            let stripped_func_file = strip_base(func_file, basefolder);
            if func_file != file && stripped_func_file != stripped_file {
                return false;
            }
            let hit = self.hit_percentage(&func.name).is_some_and(|p| p > 0.0);
            hit && (self.file_targets.contains_key(func_file)
                || self.file_targets.contains_key(stripped_file.as_str()))
        })
    }

    /// Remove the project's base folder from every path this profile
    /// reports. A base folder of `/` is left alone.
    pub fn refine_paths(&mut self, basefolder: &str) {
        if basefolder.is_empty() || basefolder == "/" {
            return;
        }

        self.entry_source_file = self.entry_source_file.replace(basefolder, "");
        for cs in &mut self.callsites {
            cs.dst_function_source_file = cs.dst_function_source_file.replace(basefolder, "");
        }

        let targets = std::mem::take(&mut self.file_targets);
        for (file, functions) in targets {
            self.file_targets
                .entry(file.replace(basefolder, ""))
                .or_default()
                .extend(functions);
        }
    }

    /// Set the binary path from the pairing that names this profile's data
    /// file.
    pub fn correlate_executable_name(&mut self, correlation: &Correlation) {
        let data_name = self.data_file_stem();
        if let Some(executable) = correlation.executable_for(&data_name) {
            info!("correlated {data_name} with {executable}");
            self.binary_path = executable.to_string();
        }
    }

    /// Name this profile is reported under: the executable basename when
    /// known, otherwise the fuzzer source file.
    pub fn key(&self) -> String {
        if self.binary_path.is_empty() {
            return self.entry_source_file.clone();
        }
        Path::new(&self.binary_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.binary_path)
            .to_string()
    }

    /// The fuzzer source basename without its extension; coverage reports
    /// are named after it.
    pub fn target_fuzzer_filename(&self) -> String {
        let base = self
            .entry_source_file
            .rsplit('/')
            .next()
            .unwrap_or(&self.entry_source_file);
        NATIVE_SOURCE_EXTENSIONS
            .iter()
            .find_map(|ext| base.strip_suffix(ext))
            .unwrap_or(base)
            .to_string()
    }

    /// Link into the hosted coverage report for a source location.
    pub fn resolve_coverage_link(&self, base_url: &str, source_file: &str, line: u32, function: &str) -> String {
        self.links.resolve_link(base_url, source_file, line, function)
    }

    pub fn stats(&self) -> ProfileStats {
        ProfileStats {
            key: self.key(),
            data_file: self.data_file.display().to_string(),
            language: self.target_language.to_string(),
            total_basic_blocks: self.total_basic_blocks,
            total_cyclomatic_complexity: self.total_cyclomatic_complexity,
            file_target_count: self.file_targets.len(),
            reached_functions: self.reached_functions.len(),
            unreached_functions: self.unreached_functions.len(),
            uncovered_reachable_functions: self.uncovered_reachable_functions().len(),
            coverage_reports: self
                .coverage
                .as_ref()
                .map_or(0, |c| c.source_reports().len()),
        }
    }

    /// Data file basename with the `.json` serialization suffix dropped,
    /// e.g. `fuzzerLogFile-0-abc.data`.
    fn data_file_stem(&self) -> String {
        let name = self
            .data_file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        name.strip_suffix(".json").unwrap_or(name).to_string()
    }
}

fn strip_base(path: &str, basefolder: Option<&str>) -> String {
    match basefolder {
        Some(base) if !base.is_empty() && base != "/" => path.replace(base, ""),
        _ => path.to_string(),
    }
}
