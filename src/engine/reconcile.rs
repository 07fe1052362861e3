//! Partial-failure reconciliation of bulk installer output.
//!
//! A needed-mode bulk install can fail individual packages while the rest of
//! the batch installs.  The installer does not report per-package results, so
//! failures are recovered from two known diagnostic phrasings:
//!
//! ```text
//! error: target not found: foo
//! error: could not find all required packages:
//!     foo (target)
//!     libbar (wanted by: baz)
//! ```
use std::collections::BTreeSet;

use crate::exec::ExecResult;

use super::outcome::{InstallOutcome, PackageStatus};

const TARGET_NOT_FOUND: &str = "target not found:";
const MISSING_REQUIRED: &str = "could not find all required packages:";
const WANTED_BY: &str = "(wanted by:";
const TARGET_MARKER: &str = "(target)";

/// A package named as failed in installer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTarget {
    /// Package identifier.
    pub package: String,
    /// Reason derived from the diagnostic.
    pub reason: String,
}

impl FailedTarget {
    fn new(package: &str, reason: impl Into<String>) -> Self {
        Self {
            package: package.to_string(),
            reason: reason.into(),
        }
    }
}

/// Extract every package named by a failure signature in `output`, in
/// order of appearance.
#[must_use]
pub fn scan_failures(output: &str) -> Vec<FailedTarget> {
    let mut failures = Vec::new();
    let mut in_required_block = false;

    for line in output.lines() {
        let indented = line.starts_with([' ', '\t']);
        let trimmed = line.trim();

        if let Some((_, rest)) = trimmed.split_once(TARGET_NOT_FOUND) {
            in_required_block = false;
            if let Some(name) = rest.split_whitespace().next() {
                failures.push(FailedTarget::new(name, "target not found"));
            }
            continue;
        }

        if let Some((_, rest)) = trimmed.split_once(MISSING_REQUIRED) {
            in_required_block = true;
            failures.extend(parse_required_entry(rest));
            continue;
        }

        if in_required_block && indented && !trimmed.is_empty() {
            failures.extend(parse_required_entry(trimmed));
        } else {
            in_required_block = false;
        }
    }

    failures
}

/// Parse one entry of a "could not find all required packages" report.
fn parse_required_entry(entry: &str) -> Vec<FailedTarget> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Vec::new();
    }

    if let Some((dependency, wanted_by)) = entry.split_once(WANTED_BY) {
        let reason = format!("missing dependency {}", dependency.trim());
        return wanted_by
            .trim_end_matches(')')
            .split([',', ' '])
            .filter(|s| !s.is_empty())
            .map(|pkg| FailedTarget::new(pkg, reason.clone()))
            .collect();
    }

    if let Some((name, _)) = entry.split_once(TARGET_MARKER) {
        let name = name.trim();
        if name.is_empty() {
            return Vec::new();
        }
        return vec![FailedTarget::new(name, "could not find package")];
    }

    entry
        .split_whitespace()
        .map(|name| FailedTarget::new(name, "could not find package"))
        .collect()
}

/// Per-package result of one bulk install.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Outcome of every requested package.
    pub outcome: InstallOutcome,
    /// Failures that named a requested package.
    pub failures: Vec<FailedTarget>,
    /// Packages named in failure output that were not part of the batch.
    pub foreign: Vec<String>,
    /// The installer exited nonzero without naming any requested package.
    pub unmatched_failure: bool,
}

/// Classify each of `requested` from the installer's result.
///
/// Named failures are `Failed` and every other requested package is
/// `Installed`, whatever the exit status.  A nonzero exit without any named
/// failure leaves the whole batch `Failed`.
#[must_use]
pub fn reconcile(requested: &[String], result: &ExecResult) -> Reconciliation {
    let batch: BTreeSet<&str> = requested.iter().map(String::as_str).collect();

    let mut failures = Vec::new();
    let mut foreign = Vec::new();
    let mut seen = BTreeSet::new();
    for failure in scan_failures(&result.combined_output()) {
        if !seen.insert(failure.package.clone()) {
            continue;
        }
        if batch.contains(failure.package.as_str()) {
            failures.push(failure);
        } else {
            foreign.push(failure.package);
        }
    }

    let mut outcome = InstallOutcome::new();
    let unmatched_failure = failures.is_empty() && !result.success;

    if unmatched_failure {
        let reason = match result.code {
            Some(code) => format!("installer exited with status {code}"),
            None => "installer terminated by signal".to_string(),
        };
        outcome.fail_all(requested, &reason);
    } else {
        for failure in &failures {
            outcome.fail(&failure.package, &failure.reason);
        }
        for package in requested {
            if outcome.status(package).is_none() {
                outcome.record(package, PackageStatus::Installed);
            }
        }
    }

    Reconciliation {
        outcome,
        failures,
        foreign,
        unmatched_failure,
    }
}
