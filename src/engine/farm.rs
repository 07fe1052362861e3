//! Symlink-farm backends that link a bundle's files into the home directory.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::exec::Executor;
use crate::resources::helpers::fs::walk_files;
use crate::resources::symlink::SymlinkResource;
use crate::resources::{Applicable, ResourceChange};

/// Result of applying one bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FarmReport {
    /// Links created by this application.
    pub linked: usize,
    /// Links that were already correct.
    pub unchanged: usize,
    /// Home-relative paths left untouched because something else is there.
    pub conflicts: Vec<PathBuf>,
    /// Non-fatal backend diagnostics other than conflicts.
    pub warnings: Vec<String>,
}

impl FarmReport {
    /// Whether every link was already in place before this application.
    ///
    /// Backends that cannot tell report zero unchanged links, so this is
    /// only ever true for a confirmed no-op.
    #[must_use]
    pub fn already_applied(&self) -> bool {
        self.linked == 0 && self.conflicts.is_empty() && self.unchanged > 0
    }
}

/// Idempotent "link this bundle into home" operation.
pub trait SymlinkFarm: std::fmt::Debug {
    /// Link every file of `bundle` into the home directory.
    ///
    /// Re-applying an applied bundle is a no-op.  Pre-existing files are
    /// reported as conflicts, not errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails for a reason other than a
    /// conflict.
    fn apply(&self, bundle: &str) -> Result<FarmReport>;
}

/// Available farm backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FarmBackend {
    /// Built-in per-file linker.
    #[default]
    Native,
    /// GNU Stow.
    Stow,
}

/// Construct the farm for `backend`.
#[must_use]
pub fn build(
    backend: FarmBackend,
    bundles_dir: &Path,
    home: &Path,
    executor: Arc<dyn Executor>,
) -> Box<dyn SymlinkFarm> {
    match backend {
        FarmBackend::Native => Box::new(NativeFarm::new(bundles_dir, home)),
        FarmBackend::Stow => Box::new(StowFarm::new(bundles_dir, home, executor)),
    }
}

/// Per-file linker built on [`SymlinkResource`].
///
/// Every file below `bundles/<bundle>/` is linked to the same relative path
/// under home.  Parent directories are created as real directories.
#[derive(Debug, Clone)]
pub struct NativeFarm {
    bundles_dir: PathBuf,
    home: PathBuf,
}

impl NativeFarm {
    /// Create a farm linking from `bundles_dir` into `home`.
    #[must_use]
    pub fn new(bundles_dir: &Path, home: &Path) -> Self {
        Self {
            bundles_dir: bundles_dir.to_path_buf(),
            home: home.to_path_buf(),
        }
    }
}

impl SymlinkFarm for NativeFarm {
    fn apply(&self, bundle: &str) -> Result<FarmReport> {
        let source_root = self.bundles_dir.join(bundle);
        let mut report = FarmReport::default();

        for rel in walk_files(&source_root)? {
            let resource = SymlinkResource::new(source_root.join(&rel), self.home.join(&rel));
            match resource
                .apply()
                .with_context(|| format!("linking {}", resource.description()))?
            {
                ResourceChange::Applied => report.linked += 1,
                ResourceChange::AlreadyCorrect => report.unchanged += 1,
                ResourceChange::Skipped { .. } => report.conflicts.push(rel),
            }
        }

        Ok(report)
    }
}

/// GNU Stow backend.
#[derive(Debug)]
pub struct StowFarm {
    bundles_dir: PathBuf,
    home: PathBuf,
    executor: Arc<dyn Executor>,
}

impl StowFarm {
    /// Create a farm stowing from `bundles_dir` into `home`.
    #[must_use]
    pub fn new(bundles_dir: &Path, home: &Path, executor: Arc<dyn Executor>) -> Self {
        Self {
            bundles_dir: bundles_dir.to_path_buf(),
            home: home.to_path_buf(),
            executor,
        }
    }
}

impl SymlinkFarm for StowFarm {
    fn apply(&self, bundle: &str) -> Result<FarmReport> {
        let dir = self.bundles_dir.to_string_lossy();
        let target = self.home.to_string_lossy();
        let result = self.executor.run_unchecked(
            "stow",
            &[
                "--no-folding",
                "--restow",
                "-d",
                &dir,
                "-t",
                &target,
                bundle,
            ],
        )?;
        let output = result.combined_output();
        let conflicts = parse_stow_conflicts(&output);
        let warnings: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with("WARNING") && !l.contains("would cause conflicts"))
            .map(String::from)
            .collect();

        if result.success {
            return Ok(FarmReport {
                linked: 0,
                unchanged: 0,
                conflicts,
                warnings,
            });
        }

        if conflicts.is_empty() {
            anyhow::bail!(
                "stow failed (exit {}): {}",
                result.code.unwrap_or(-1),
                output.trim()
            );
        }

        Ok(FarmReport {
            linked: 0,
            unchanged: 0,
            conflicts,
            warnings,
        })
    }
}

/// Extract conflicting targets from stow diagnostics.
///
/// Recognises `existing target is ...: <path>` and
/// `cannot stow <src> over existing target <path> since ...`.
fn parse_stow_conflicts(output: &str) -> Vec<PathBuf> {
    let mut conflicts: Vec<PathBuf> = Vec::new();
    for line in output.lines() {
        let line = line.trim().trim_start_matches("* ").trim();
        let target = if let Some((_, rest)) = line.split_once("over existing target ") {
            rest.split_whitespace().next()
        } else if line.contains("existing target is") {
            line.rsplit_once(": ").map(|(_, path)| path.trim())
        } else {
            None
        };
        if let Some(path) = target.filter(|p| !p.is_empty()) {
            let path = PathBuf::from(path);
            if !conflicts.contains(&path) {
                conflicts.push(path);
            }
        }
    }
    conflicts
}
