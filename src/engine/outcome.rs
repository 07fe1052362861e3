//! Per-package install outcomes accumulated over a run.
use std::collections::BTreeMap;

use crate::error::ProvisionError;

/// Final status of one package.
///
/// Variants are ordered by precedence: when two tiers disagree about a
/// package, the greater status wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackageStatus {
    /// The operator declined its tier, or the run was a dry run.
    Skipped,
    /// The installer failed for this package.
    Failed,
    /// The package is installed.
    Installed,
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
            Self::Installed => write!(f, "installed"),
        }
    }
}

/// Mapping from package identifier to [`PackageStatus`].
///
/// Built per tier and merged into the run-wide outcome; the capability
/// resolver reads it as an explicit input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOutcome {
    packages: BTreeMap<String, PackageStatus>,
    reasons: BTreeMap<String, String>,
}

impl InstallOutcome {
    /// Create an empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status` for `package`, keeping the higher-precedence status
    /// if one is already recorded.
    pub fn record(&mut self, package: &str, status: PackageStatus) {
        let entry = self
            .packages
            .entry(package.to_string())
            .or_insert(status);
        if status > *entry {
            *entry = status;
        }
        if *entry != PackageStatus::Failed {
            self.reasons.remove(package);
        }
    }

    /// Record a failure together with its reason.
    pub fn fail(&mut self, package: &str, reason: &str) {
        self.record(package, PackageStatus::Failed);
        if self.status(package) == Some(PackageStatus::Failed) {
            self.reasons
                .entry(package.to_string())
                .or_insert_with(|| reason.to_string());
        }
    }

    /// Record the same status for every package in `packages`.
    pub fn record_all(&mut self, packages: &[String], status: PackageStatus) {
        for package in packages {
            self.record(package, status);
        }
    }

    /// Record a failure with the same reason for every package in `packages`.
    pub fn fail_all(&mut self, packages: &[String], reason: &str) {
        for package in packages {
            self.fail(package, reason);
        }
    }

    /// Merge another outcome into this one using status precedence.
    pub fn merge(&mut self, other: Self) {
        for (package, status) in other.packages {
            match other.reasons.get(&package) {
                Some(reason) => self.fail(&package, reason),
                None => self.record(&package, status),
            }
        }
    }

    /// Status of `package`, if it was part of any tier.
    #[must_use]
    pub fn status(&self, package: &str) -> Option<PackageStatus> {
        self.packages.get(package).copied()
    }

    /// Whether `package` is installed.
    #[must_use]
    pub fn is_installed(&self, package: &str) -> bool {
        self.status(package) == Some(PackageStatus::Installed)
    }

    /// Installed package identifiers in sorted order.
    pub fn installed(&self) -> impl Iterator<Item = &str> {
        self.packages
            .iter()
            .filter(|(_, s)| **s == PackageStatus::Installed)
            .map(|(p, _)| p.as_str())
    }

    /// Number of packages with `status`.
    #[must_use]
    pub fn count(&self, status: PackageStatus) -> usize {
        self.packages.values().filter(|s| **s == status).count()
    }

    /// All entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, PackageStatus)> {
        self.packages.iter().map(|(p, s)| (p.as_str(), *s))
    }

    /// Number of distinct packages recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// One [`ProvisionError::PackageInstallFailure`] per failed package.
    #[must_use]
    pub fn failures(&self) -> Vec<ProvisionError> {
        self.packages
            .iter()
            .filter(|(_, s)| **s == PackageStatus::Failed)
            .map(|(package, _)| ProvisionError::PackageInstallFailure {
                package: package.clone(),
                reason: self
                    .reasons
                    .get(package)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
            })
            .collect()
    }
}
