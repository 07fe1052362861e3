//! Gated bundle deployment.
use std::fmt;

use super::Context;
use super::capabilities::CapabilitySet;
use super::farm::SymlinkFarm;
use crate::config::bundles::BundleRule;
use crate::error::ProvisionError;
use crate::logging::TaskStatus;

/// Why a bundle was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `bundles/<name>/` does not exist.
    NotPresent,
    /// The requirement is not met; carries the blocking tokens.
    CapabilityMissing(Vec<String>),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPresent => write!(f, "not-present"),
            Self::CapabilityMissing(tokens) => {
                write!(f, "capability-missing({})", tokens.join(", "))
            }
        }
    }
}

/// What happened to one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Linked; conflicts, if any, are in `warnings`.
    Applied {
        /// Links created.
        linked: usize,
        /// Conflicts and backend diagnostics.
        warnings: Vec<String>,
    },
    /// Every link was already in place.
    AlreadyApplied,
    /// Not applied.
    Skipped(SkipReason),
    /// The farm failed for this bundle.
    Failed(String),
    /// Dry run: would have been applied.
    DryRun,
}

/// Deployment result of one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    /// Bundle name.
    pub bundle: String,
    /// What happened.
    pub outcome: DeployOutcome,
}

impl DeployResult {
    /// Whether the bundle is (now) linked into home.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(
            self.outcome,
            DeployOutcome::Applied { .. } | DeployOutcome::AlreadyApplied
        )
    }
}

/// Deploy every bundle in `bundles` order, gated on `capabilities`.
///
/// A bundle whose directory is missing is skipped as `not-present`; one
/// whose requirement fails is skipped naming the blocking tokens.  Farm
/// conflicts become warnings and farm errors fail only that bundle.
pub fn deploy_all(
    ctx: &Context,
    bundles: &[BundleRule],
    capabilities: &CapabilitySet,
    farm: &dyn SymlinkFarm,
) -> Vec<DeployResult> {
    let bundles_dir = ctx.bundles_dir();
    bundles
        .iter()
        .map(|rule| {
            let outcome = if bundles_dir.join(&rule.name).is_dir() {
                deploy_one(ctx, rule, capabilities, farm)
            } else {
                let missing = ProvisionError::ResourceMissing {
                    what: format!("bundle '{}'", rule.name),
                    path: bundles_dir.join(&rule.name),
                };
                ctx.log.debug(&missing.to_string());
                DeployOutcome::Skipped(SkipReason::NotPresent)
            };
            let result = DeployResult {
                bundle: rule.name.clone(),
                outcome,
            };
            record(ctx, &result);
            result
        })
        .collect()
}

fn deploy_one(
    ctx: &Context,
    rule: &BundleRule,
    capabilities: &CapabilitySet,
    farm: &dyn SymlinkFarm,
) -> DeployOutcome {
    if let Some(missing) = rule.requirement.missing(|t| capabilities.contains(t)) {
        return DeployOutcome::Skipped(SkipReason::CapabilityMissing(missing));
    }

    if ctx.dry_run {
        ctx.log.dry_run(&format!("would link bundle {}", rule.name));
        return DeployOutcome::DryRun;
    }

    match farm.apply(&rule.name) {
        Ok(report) if report.already_applied() => DeployOutcome::AlreadyApplied,
        Ok(report) => {
            let mut warnings: Vec<String> = report
                .conflicts
                .iter()
                .map(|target| {
                    ProvisionError::DeployConflict {
                        bundle: rule.name.clone(),
                        target: ctx.home.join(target),
                    }
                    .to_string()
                })
                .collect();
            warnings.extend(report.warnings);
            for warning in &warnings {
                ctx.log.warn(warning);
            }
            DeployOutcome::Applied {
                linked: report.linked,
                warnings,
            }
        }
        Err(e) => {
            ctx.log
                .error(&format!("bundle {} failed: {e:#}", rule.name));
            DeployOutcome::Failed(format!("{e:#}"))
        }
    }
}

fn record(ctx: &Context, result: &DeployResult) {
    let name = format!("deploy {}", result.bundle);
    match &result.outcome {
        DeployOutcome::Applied { linked, warnings } => {
            let msg = if warnings.is_empty() {
                format!("{linked} linked")
            } else {
                format!("{linked} linked, {} warning(s)", warnings.len())
            };
            ctx.log.info(&format!("{name}: {msg}"));
            ctx.log.record_task(&name, TaskStatus::Ok, Some(&msg));
        }
        DeployOutcome::AlreadyApplied => {
            ctx.log.debug(&format!("{name}: already applied"));
            ctx.log
                .record_task(&name, TaskStatus::Ok, Some("already applied"));
        }
        DeployOutcome::Skipped(reason) => {
            let msg = reason.to_string();
            ctx.log.info(&format!("{name}: skipped, {msg}"));
            ctx.log.record_task(&name, TaskStatus::Skipped, Some(&msg));
        }
        DeployOutcome::Failed(err) => {
            ctx.log.record_task(&name, TaskStatus::Failed, Some(err));
        }
        DeployOutcome::DryRun => {
            ctx.log.record_task(&name, TaskStatus::DryRun, None);
        }
    }
}
