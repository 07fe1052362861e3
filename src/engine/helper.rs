//! Community-source helper bootstrap.
use anyhow::{Context as _, Result};

use super::Context;
use crate::error::ProvisionError;
use crate::resources::package::{HELPER_PROGRAM, PackageSource};

/// Upstream repository holding the helper's build recipe.
pub const HELPER_REPO: &str = "https://aur.archlinux.org/paru-bin.git";

/// System packages required to build the helper.
pub const PREREQUISITES: [&str; 2] = ["base-devel", "git"];

/// Default number of parallel jobs for makepkg if nproc detection fails.
const DEFAULT_NPROC: &str = "4";

/// What [`ensure_helper`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperStatus {
    /// The helper was already on the execution path.
    AlreadyPresent,
    /// The helper was built and installed.
    Built,
    /// Dry run: the build was only logged.
    DryRun,
}

/// Ensure the community-source client is available, building it once if not.
///
/// The build happens in a temporary directory that is removed when this
/// function returns, whether the build succeeded or not.
///
/// # Errors
///
/// Returns [`ProvisionError::SourceUnavailable`] if any bootstrap step fails
/// or the helper is still not resolvable afterwards.
pub fn ensure_helper(ctx: &Context) -> Result<HelperStatus> {
    if PackageSource::Community.is_available(&*ctx.executor) {
        ctx.log.debug(&format!("{HELPER_PROGRAM} already in PATH"));
        return Ok(HelperStatus::AlreadyPresent);
    }

    if ctx.dry_run {
        ctx.log
            .dry_run(&format!("would build {HELPER_PROGRAM} from {HELPER_REPO}"));
        return Ok(HelperStatus::DryRun);
    }

    ctx.log.info(&format!("bootstrapping {HELPER_PROGRAM}"));
    build_helper(ctx).map_err(|e| unavailable(&format!("{e:#}")))?;

    if !PackageSource::Community.is_available(&*ctx.executor) {
        return Err(unavailable(&format!(
            "{HELPER_PROGRAM} not found in PATH after build"
        )));
    }

    ctx.log.info(&format!("{HELPER_PROGRAM} installed"));
    Ok(HelperStatus::Built)
}

fn unavailable(reason: &str) -> anyhow::Error {
    ProvisionError::SourceUnavailable {
        source_name: PackageSource::Community.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Install prerequisites, clone the recipe, and build it in a scoped
/// temporary directory.
fn build_helper(ctx: &Context) -> Result<()> {
    install_prerequisites(ctx)?;

    let build_root = tempfile::Builder::new()
        .prefix("paru-build-")
        .tempdir()
        .context("creating build directory")?;
    let checkout = build_root.path().join("paru-bin");
    let checkout_str = checkout.to_string_lossy();

    ctx.log.debug(&format!("cloning {HELPER_REPO}"));
    ctx.executor
        .run("git", &["clone", "--depth", "1", HELPER_REPO, &checkout_str])
        .context("cloning helper sources")?;

    let nproc = ctx.executor.run("nproc", &[]).map_or_else(
        |_| DEFAULT_NPROC.to_string(),
        |r| {
            let n = r.stdout.trim();
            if n.is_empty() {
                DEFAULT_NPROC.to_string()
            } else {
                n.to_string()
            }
        },
    );
    let makeflags = format!("-j{nproc}");
    ctx.log.debug(&format!("building with MAKEFLAGS={makeflags}"));
    ctx.executor
        .run_in_with_env(
            &checkout,
            "makepkg",
            &["-si", "--noconfirm"],
            &[("MAKEFLAGS", &makeflags)],
        )
        .context("building helper with makepkg")?;

    Ok(())
}

fn install_prerequisites(ctx: &Context) -> Result<()> {
    let packages: Vec<String> = PREREQUISITES.iter().map(ToString::to_string).collect();
    ctx.log.debug(&format!(
        "installing build prerequisites: {}",
        packages.join(" ")
    ));
    let result = PackageSource::System
        .bulk_install_needed(&*ctx.executor, &packages)
        .context("installing build prerequisites")?;
    if !result.success {
        anyhow::bail!(
            "installing build prerequisites failed: {}",
            result.combined_output().trim()
        );
    }
    Ok(())
}
