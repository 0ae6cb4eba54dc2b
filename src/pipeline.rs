//! Whole-project run: discover every fuzzer's static artifact, build and
//! accumulate a profile for each, then line their paths up against the
//! project's base folder.
//!
//! A fault in one profile never aborts the others. Only a run that ends up
//! with no usable profile at all is an error.
use std::path::Path;

use tracing::{info, warn};

use crate::config::Config;
use crate::correlate::Correlation;
use crate::error::{FuzzcovError, Result};
use crate::loader;
use crate::profile::FuzzerProfile;
use crate::report::{ProfileFailure, RunSummary};

/// Everything a run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub profiles: Vec<FuzzerProfile>,
    pub failures: Vec<ProfileFailure>,
    /// Common prefix stripped from every reported path (`/` when none).
    pub basefolder: String,
}

impl RunOutcome {
    pub fn summary(&self) -> RunSummary {
        RunSummary::new(
            self.basefolder.clone(),
            self.profiles.iter().map(FuzzerProfile::stats).collect(),
            self.failures.clone(),
        )
    }
}

pub fn run(config: &Config, target_dir: &Path, correlation_file: Option<&Path>) -> Result<RunOutcome> {
    let artifacts = loader::discover(target_dir);
    info!(
        "found {} static analysis artifacts in {}",
        artifacts.len(),
        target_dir.display()
    );

    let correlation = correlation_file.and_then(|path| match Correlation::load(path) {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("nothing to correlate, could not read {}: {e}", path.display());
            None
        }
    });

    let mut failures = Vec::new();
    let mut profiles = Vec::new();
    for artifact in &artifacts {
        let mut profile = match FuzzerProfile::load(artifact, config) {
            Ok(p) => p,
            Err(e) => {
                warn!("could not load {}: {e}", artifact.display());
                failures.push(ProfileFailure::new(artifact, &e));
                continue;
            }
        };

        if let Err(e) = profile.accumulate(target_dir) {
            warn!("dropping profile {}: {e}", artifact.display());
            failures.push(ProfileFailure::new(artifact, &e));
            continue;
        }

        if let Some(correlation) = &correlation {
            profile.correlate_executable_name(correlation);
        }
        profiles.push(profile);
    }

    if profiles.is_empty() {
        return Err(FuzzcovError::NoProfiles(target_dir.to_path_buf()));
    }

    let basefolder = project_basefolder(&profiles);
    info!("project base folder: {basefolder}");
    for profile in &mut profiles {
        profile.refine_paths(&basefolder);
    }

    Ok(RunOutcome {
        profiles,
        failures,
        basefolder,
    })
}

/// Longest common directory of every function source file across
/// `profiles`. System headers and the bare root are left out.
pub fn project_basefolder(profiles: &[FuzzerProfile]) -> String {
    let files = profiles
        .iter()
        .flat_map(|p| p.all_functions().values())
        .map(|f| f.source_file.as_str())
        .filter(|f| !f.is_empty() && *f != "/" && !f.contains("/usr/include/"));
    longest_common_prefix(files)
}

/// Longest shared run of whole path components. Returns `/` when the paths
/// share nothing (or there are none).
pub fn longest_common_prefix<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut common: Option<Vec<&str>> = None;

    for path in paths {
        // The file name itself is never part of the folder.
        let dirs: Vec<&str> = match path.rsplit_once('/') {
            Some((dir, _)) => dir.split('/').collect(),
            None => Vec::new(),
        };
        common = Some(match common {
            None => dirs,
            Some(prev) => prev
                .iter()
                .zip(&dirs)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        });
    }

    match common {
        Some(parts) if parts.iter().any(|p| !p.is_empty()) => parts.join("/"),
        _ => "/".to_string(),
    }
}
