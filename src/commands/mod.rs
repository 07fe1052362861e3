/// The `deploy` subcommand.
pub mod deploy;
/// The `install` subcommand.
pub mod install;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::config::lists::LISTS_DIR;
use crate::engine::Context;
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::prompt::{Confirm, FixedConfirm, StdinConfirm};

/// Environment variable naming the provisioning root.
pub const ROOT_ENV: &str = "PROVISION_ROOT";

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Loaded lists and bundle table.
    pub config: Config,
    /// Run context wired to the real system.
    pub ctx: Context,
}

impl CommandSetup {
    /// Resolve the root, load configuration, and build the run context.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be determined, a mandatory list is
    /// missing, the bundle table is malformed, or `HOME` is unset.
    pub fn init(global: &GlobalOpts, log: &Arc<Logger>) -> Result<Self> {
        let root = resolve_root(global)?;
        log.info(&format!("provision {}", version::version()));
        log.debug(&format!("root: {}", root.display()));

        log.stage("Loading configuration");
        let config = Config::load(&root)?;
        let lists = &config.lists;
        for missing in lists.system.missing.iter().chain(&lists.community.missing) {
            log.debug(&format!("skipping absent {}", missing.display()));
        }
        log.info(&format!(
            "loaded {} system packages, {} community packages, {} bundles",
            config.lists.system.package_count(),
            config.lists.community.package_count(),
            config.bundles.len()
        ));

        let prompt: Arc<dyn Confirm> = if global.yes {
            Arc::new(FixedConfirm(true))
        } else {
            Arc::new(StdinConfirm)
        };
        let ctx = Context::new(
            root,
            Arc::clone(log) as Arc<dyn Log>,
            Arc::new(SystemExecutor),
            prompt,
            global.dry_run,
        )?;

        Ok(Self { config, ctx })
    }
}

/// Print the summary and bail if any step recorded a failure.
///
/// # Errors
///
/// Returns an error if one or more steps failed.
pub fn finish(log: &Logger) -> Result<()> {
    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} step(s) failed");
    }
    Ok(())
}

/// Resolve the provisioning root from CLI arguments or auto-detection.
///
/// Order: `--root`, `PROVISION_ROOT`, ancestors of the running binary, then
/// the current directory.  Auto-detected candidates must contain `lists/`.
///
/// # Errors
///
/// Returns an error if no candidate qualifies.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(ref root) = global.root {
        return canonical_root(root);
    }

    if let Ok(root) = std::env::var(ROOT_ENV) {
        return canonical_root(Path::new(&root));
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(found) = exe.ancestors().skip(1).find(|p| is_root(p))
    {
        return canonical_root(found);
    }

    let cwd = std::env::current_dir()?;
    if is_root(&cwd) {
        return Ok(cwd);
    }

    anyhow::bail!("cannot determine provisioning root. Use --root or set {ROOT_ENV}");
}

fn is_root(path: &Path) -> bool {
    path.join(LISTS_DIR).is_dir()
}

fn canonical_root(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path)
        .map_err(|e| anyhow::anyhow!("provisioning root {}: {e}", path.display()))
}
