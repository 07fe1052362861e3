use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::engine::Context;
use crate::engine::capabilities;
use crate::engine::deploy::{self, DeployResult};
use crate::engine::farm::{self, SymlinkFarm};
use crate::engine::outcome::InstallOutcome;
use crate::logging::Logger;

use super::CommandSetup;
use super::install::probe_tokens;

/// Run the deploy command: no installs, capabilities from the package
/// database and the execution path.
///
/// # Errors
///
/// Returns an error if configuration loading fails or any bundle failed.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let farm = farm::build(
        global.farm,
        &setup.config.bundles_dir(),
        &setup.ctx.home,
        Arc::clone(&setup.ctx.executor),
    );

    execute(&setup.ctx, &setup.config, farm.as_ref());
    super::finish(log)
}

/// Deploy every bundle gated on what is already installed.
pub fn execute(ctx: &Context, config: &Config, farm: &dyn SymlinkFarm) -> Vec<DeployResult> {
    ctx.log.stage("Deploying configuration bundles");
    let recorded = capabilities::recorded_packages(&*ctx.executor, &*ctx.log);
    let capabilities = capabilities::resolve(
        &InstallOutcome::new(),
        &recorded,
        &*ctx.executor,
        probe_tokens(&config.bundles),
    );
    ctx.log
        .debug(&format!("{} capabilities resolved", capabilities.len()));
    deploy::deploy_all(ctx, &config.bundles, &capabilities, farm)
}
