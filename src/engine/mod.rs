//! Selective provisioning engine: tiered installs, helper bootstrap,
//! capability resolution, and gated bundle deployment.
pub mod capabilities;
pub mod deploy;
pub mod farm;
pub mod helper;
pub mod installer;
pub mod outcome;
pub mod reconcile;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::BUNDLES_DIR;
use crate::exec::Executor;
use crate::logging::Log;
use crate::prompt::Confirm;

/// Shared context for one provisioning run.
pub struct Context {
    /// Provisioning root.
    pub root: PathBuf,
    /// Operator's home directory; bundles are linked below it.
    pub home: PathBuf,
    /// Logger for output and step recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Confirmation source for confirm-then-install tiers.
    pub prompt: Arc<dyn Confirm>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.root)
            .field("home", &self.home)
            .field("log", &"<dyn Log>")
            .field("executor", &self.executor)
            .field("prompt", &self.prompt)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Context {
    /// Creates a new context, reading the home directory from `HOME`.
    ///
    /// # Errors
    ///
    /// Returns an error if the `HOME` environment variable is not set.
    pub fn new(
        root: PathBuf,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        prompt: Arc<dyn Confirm>,
        dry_run: bool,
    ) -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?;
        Ok(Self {
            root,
            home: PathBuf::from(home),
            log,
            executor,
            prompt,
            dry_run,
        })
    }

    /// Configuration bundles source directory.
    #[must_use]
    pub fn bundles_dir(&self) -> PathBuf {
        self.root.join(BUNDLES_DIR)
    }
}
