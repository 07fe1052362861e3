use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::config::Config;
use crate::config::bundles::BundleRule;
use crate::engine::capabilities::{self, CapabilitySet};
use crate::engine::deploy::{self, DeployResult};
use crate::engine::farm::{self, SymlinkFarm};
use crate::engine::installer::{self, InstallOptions};
use crate::engine::outcome::{InstallOutcome, PackageStatus};
use crate::engine::Context;
use crate::logging::Logger;

use super::CommandSetup;

/// Everything a full run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Per-package outcomes across every tier.
    pub outcome: InstallOutcome,
    /// Capability set the deployer was gated on.
    pub capabilities: CapabilitySet,
    /// Per-bundle results, empty when deployment was skipped.
    pub deployments: Vec<DeployResult>,
}

/// Run the install command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the run aborts, or any
/// step recorded a failure.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let farm = farm::build(
        global.farm,
        &setup.config.bundles_dir(),
        &setup.ctx.home,
        Arc::clone(&setup.ctx.executor),
    );

    execute(&setup.ctx, &setup.config, opts, farm.as_ref())?;
    super::finish(log)
}

/// Install every tier, then deploy the bundles the outcome enables.
///
/// # Errors
///
/// Returns an error only when the run must abort: the community helper is
/// unavailable while community mandatory packages are listed, or a
/// confirmation prompt cannot be read.
pub fn execute(
    ctx: &Context,
    config: &Config,
    opts: &InstallOpts,
    farm: &dyn SymlinkFarm,
) -> Result<RunReport> {
    let outcome = installer::install_all(
        ctx,
        &config.lists,
        InstallOptions {
            skip_community: opts.skip_community,
        },
    )?;
    log_outcome(ctx, &outcome);

    if opts.skip_deploy {
        ctx.log.info("skipping deployment");
        return Ok(RunReport {
            outcome,
            ..RunReport::default()
        });
    }

    ctx.log.stage("Deploying configuration bundles");
    let recorded = capabilities::recorded_packages(&*ctx.executor, &*ctx.log);
    let capabilities = capabilities::resolve(
        &outcome,
        &recorded,
        &*ctx.executor,
        probe_tokens(&config.bundles),
    );
    ctx.log.debug(&format!(
        "capabilities: {}",
        capabilities.iter().collect::<Vec<_>>().join(" ")
    ));
    let deployments = deploy::deploy_all(ctx, &config.bundles, &capabilities, farm);

    Ok(RunReport {
        outcome,
        capabilities,
        deployments,
    })
}

/// Every token any bundle requirement names, for executable probing.
pub fn probe_tokens(bundles: &[BundleRule]) -> impl Iterator<Item = &str> {
    bundles
        .iter()
        .flat_map(|rule| rule.requirement.tokens())
        .map(String::as_str)
}

fn log_outcome(ctx: &Context, outcome: &InstallOutcome) {
    ctx.log.info(&format!(
        "packages: {} installed, {} skipped, {} failed",
        outcome.count(PackageStatus::Installed),
        outcome.count(PackageStatus::Skipped),
        outcome.count(PackageStatus::Failed)
    ));
    for failure in outcome.failures() {
        ctx.log.debug(&failure.to_string());
    }
}
