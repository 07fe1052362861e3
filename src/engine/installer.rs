//! Tiered installation across both package sources.
use anyhow::Result;

use super::Context;
use super::helper::{HelperStatus, ensure_helper};
use super::outcome::{InstallOutcome, PackageStatus};
use super::reconcile::reconcile;
use crate::config::lists::{ListPlan, PackageList, SourceLists};
use crate::logging::TaskStatus;

/// Options for [`install_all`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Leave every community tier (and the helper bootstrap) out.
    pub skip_community: bool,
}

/// Install one tier and return the outcome of each of its packages.
///
/// Mandatory tiers install directly.  Other tiers show the list and ask for
/// confirmation; a refusal marks every package `Skipped` without running the
/// installer.  The installer runs once for the whole list and its output is
/// reconciled per package.
///
/// # Errors
///
/// Returns an error only if the confirmation prompt fails.
pub fn install_tier(ctx: &Context, list: &PackageList) -> Result<InstallOutcome> {
    let name = list.label();
    let mut outcome = InstallOutcome::new();

    if list.is_empty() {
        ctx.log.debug(&format!("{name}: nothing to install"));
        ctx.log
            .record_task(&name, TaskStatus::NotApplicable, Some("empty list"));
        return Ok(outcome);
    }

    let count = list.packages.len();
    if ctx.dry_run {
        ctx.log.dry_run(&format!(
            "would install {name} ({count}): {}",
            list.packages.join(" ")
        ));
        outcome.record_all(&list.packages, PackageStatus::Skipped);
        ctx.log.record_task(&name, TaskStatus::DryRun, None);
        return Ok(outcome);
    }

    if list.tier.requires_confirmation() {
        ctx.log
            .info(&format!("{name} ({count}): {}", list.packages.join(" ")));
        if !ctx.prompt.confirm(&format!("Install {name} packages?"))? {
            ctx.log.info(&format!("{name}: skipped by operator"));
            outcome.record_all(&list.packages, PackageStatus::Skipped);
            ctx.log
                .record_task(&name, TaskStatus::Skipped, Some("declined"));
            return Ok(outcome);
        }
    }

    ctx.log
        .info(&format!("installing {name} ({count} packages)"));
    let result = match list
        .source
        .bulk_install_needed(&*ctx.executor, &list.packages)
    {
        Ok(result) => result,
        Err(e) => {
            let reason = format!("{e:#}");
            ctx.log.error(&format!("{name}: {reason}"));
            outcome.fail_all(&list.packages, &reason);
            ctx.log.record_task(&name, TaskStatus::Failed, Some(&reason));
            return Ok(outcome);
        }
    };

    let rec = reconcile(&list.packages, &result);
    for failure in &rec.failures {
        ctx.log
            .warn(&format!("{}: {}", failure.package, failure.reason));
    }
    for package in &rec.foreign {
        ctx.log
            .debug(&format!("{name}: ignoring failure of unrequested {package}"));
    }
    if rec.unmatched_failure {
        ctx.log.error(&format!(
            "{name}: installer failed without naming packages: {}",
            result.combined_output().trim()
        ));
    }

    let installed = rec.outcome.count(PackageStatus::Installed);
    let failed = rec.outcome.count(PackageStatus::Failed);
    if failed == 0 {
        ctx.log.record_task(
            &name,
            TaskStatus::Ok,
            Some(&format!("{installed} installed")),
        );
    } else {
        ctx.log.record_task(
            &name,
            TaskStatus::Failed,
            Some(&format!("{installed} installed, {failed} failed")),
        );
    }

    outcome.merge(rec.outcome);
    Ok(outcome)
}

/// Install every tier of `lists` in order, merging their outcomes.
///
/// # Errors
///
/// Returns an error only if a confirmation prompt fails.
pub fn install_source(ctx: &Context, lists: &SourceLists) -> Result<InstallOutcome> {
    ctx.log.stage(&format!("Installing {} packages", lists.source));
    for missing in &lists.missing {
        ctx.log
            .debug(&format!("no list at {}, skipping", missing.display()));
    }

    let mut outcome = InstallOutcome::new();
    for list in lists.tiers() {
        outcome.merge(install_tier(ctx, list)?);
    }
    Ok(outcome)
}

/// Mark every community tier failed after the helper could not be provided.
fn fail_unavailable_source(
    ctx: &Context,
    lists: &SourceLists,
    err: &anyhow::Error,
) -> InstallOutcome {
    let reason = err.to_string();
    let mut outcome = InstallOutcome::new();
    for list in lists.tiers().filter(|l| !l.is_empty()) {
        outcome.fail_all(&list.packages, &reason);
        ctx.log
            .record_task(&list.label(), TaskStatus::Failed, Some(&reason));
    }
    outcome
}

/// Run every tier of both sources in order: system tiers, then the helper
/// bootstrap, then community tiers.
///
/// # Errors
///
/// Returns [`SourceUnavailable`](crate::error::ProvisionError::SourceUnavailable) if the helper cannot be
/// provided while the community mandatory list is non-empty, or an error if
/// a confirmation prompt fails.
pub fn install_all(
    ctx: &Context,
    plan: &ListPlan,
    opts: InstallOptions,
) -> Result<InstallOutcome> {
    let mut outcome = install_source(ctx, &plan.system)?;

    if opts.skip_community {
        ctx.log
            .info(&format!("skipping {} packages", plan.community.source));
        return Ok(outcome);
    }

    if plan.community.is_empty() {
        ctx.log.debug(&format!(
            "no {} packages listed, helper not needed",
            plan.community.source
        ));
        return Ok(outcome);
    }

    ctx.log.stage("Bootstrapping community helper");
    match ensure_helper(ctx) {
        Ok(status) => {
            let msg = match status {
                HelperStatus::AlreadyPresent => "already present",
                HelperStatus::Built => "built",
                HelperStatus::DryRun => "dry run",
            };
            let task_status = if status == HelperStatus::DryRun {
                TaskStatus::DryRun
            } else {
                TaskStatus::Ok
            };
            ctx.log.record_task("helper bootstrap", task_status, Some(msg));
        }
        Err(err) => {
            ctx.log.error(&format!("{err:#}"));
            ctx.log
                .record_task("helper bootstrap", TaskStatus::Failed, Some(&err.to_string()));
            if !plan.community.mandatory.is_empty() {
                return Err(err);
            }
            outcome.merge(fail_unavailable_source(ctx, &plan.community, &err));
            return Ok(outcome);
        }
    }

    outcome.merge(install_source(ctx, &plan.community)?);
    Ok(outcome)
}
