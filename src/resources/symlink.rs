//! Symlink resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A symlink resource that can be checked and applied.
///
/// Applying never replaces an existing target: a link that already points
/// at the source is left alone, and anything else at the target path is
/// reported as a conflict.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// The source file (what the symlink points to).
    pub source: PathBuf,
    /// The target path (where the symlink will be created).
    pub target: PathBuf,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }
}

impl Applicable for SymlinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.target.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.current_state()? {
            ResourceState::Correct => Ok(ResourceChange::AlreadyCorrect),
            ResourceState::Incorrect { current } => Ok(ResourceChange::Skipped { reason: current }),
            ResourceState::Invalid { reason } => Ok(ResourceChange::Skipped { reason }),
            ResourceState::Missing => {
                super::helpers::fs::ensure_parent_dir(&self.target)?;
                create_symlink(&self.source, &self.target)
                    .with_context(|| format!("create link: {}", self.target.display()))?;
                Ok(ResourceChange::Applied)
            }
        }
    }
}

impl Resource for SymlinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        if self.source.symlink_metadata().is_err() {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.display()),
            });
        }

        let Ok(meta) = self.target.symlink_metadata() else {
            // A dangling parent link also lands here; creation reports it.
            return Ok(ResourceState::Missing);
        };

        if meta.is_dir() {
            return Ok(ResourceState::Incorrect {
                current: "target is a real directory".to_string(),
            });
        }

        if !meta.is_symlink() {
            return Ok(ResourceState::Incorrect {
                current: "target is a regular file".to_string(),
            });
        }

        let existing = std::fs::read_link(&self.target)
            .with_context(|| format!("reading link: {}", self.target.display()))?;
        if existing == self.source {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("points to {}", existing.display()),
            })
        }
    }
}

/// Create a symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "creating symlink {} -> {}",
                link.display(),
                target.display()
            )
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        anyhow::bail!(
            "symlinks are not supported on this platform: {} -> {}",
            link.display(),
            target.display()
        )
    }
}
