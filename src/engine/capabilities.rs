//! Capability resolution: installed packages, the package database, and live
//! executable probes.
use std::collections::BTreeSet;

use crate::exec::Executor;
use crate::logging::Log;
use crate::resources::package::{self, PackageSource};

use super::outcome::InstallOutcome;

/// Capability tokens known to be present.
///
/// A token is either a package identifier or an executable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    tokens: BTreeSet<String>,
}

impl CapabilitySet {
    /// Whether `token` is present.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Present tokens in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Number of present tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Packages the system database already records as installed.
///
/// Covers software installed by earlier runs or by hand.  Yields nothing
/// when pacman is not on the execution path or the query fails; the
/// failure is logged as a warning.
pub fn recorded_packages(executor: &dyn Executor, log: &dyn Log) -> Vec<String> {
    if !PackageSource::System.is_available(executor) {
        log.debug("pacman not found, no recorded packages");
        return Vec::new();
    }
    match package::query_installed(executor) {
        Ok(packages) => {
            log.debug(&format!("{} packages recorded as installed", packages.len()));
            packages
        }
        Err(e) => {
            log.warn(&format!("cannot query installed packages: {e:#}"));
            Vec::new()
        }
    }
}

/// Resolve the capability set from `outcome`, the `recorded` package
/// database, and executable probes.
///
/// Every package installed this run or recorded in the database is
/// present.  Each of `probes` not already covered is checked against the
/// execution path.  Nothing is cached: call again after further installs
/// to see their effect.
pub fn resolve<'a>(
    outcome: &InstallOutcome,
    recorded: &[String],
    executor: &dyn Executor,
    probes: impl IntoIterator<Item = &'a str>,
) -> CapabilitySet {
    let mut tokens: BTreeSet<String> = outcome
        .installed()
        .map(String::from)
        .chain(recorded.iter().cloned())
        .collect();
    for probe in probes {
        if !tokens.contains(probe) && executor.which(probe) {
            tokens.insert(probe.to_string());
        }
    }
    CapabilitySet { tokens }
}
