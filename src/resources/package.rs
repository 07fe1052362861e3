//! Package sources and their bulk-install operation.
use anyhow::Result;

use crate::exec::{ExecResult, Executor};

/// Client program of the community source.
pub const HELPER_PROGRAM: &str = "paru";

/// Supported package sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageSource {
    /// Official repositories (pacman).
    System,
    /// Community-contributed repository (AUR via paru).
    Community,
}

impl std::fmt::Display for PackageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "pacman"),
            Self::Community => write!(f, "aur"),
        }
    }
}

impl PackageSource {
    /// Directory name under `lists/` holding this source's lists.
    #[must_use]
    pub const fn list_dir(self) -> &'static str {
        match self {
            Self::System => "pacman",
            Self::Community => "aur",
        }
    }

    /// Program and leading arguments of the needed-mode install command.
    #[must_use]
    pub const fn install_command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::System => ("sudo", &["pacman", "-S", "--needed", "--noconfirm"]),
            Self::Community => (HELPER_PROGRAM, &["-S", "--needed", "--noconfirm"]),
        }
    }

    /// Whether the source's client is resolvable on the execution path.
    #[must_use]
    pub fn is_available(self, executor: &dyn Executor) -> bool {
        match self {
            Self::System => executor.which("pacman"),
            Self::Community => executor.which(HELPER_PROGRAM),
        }
    }

    /// Install `packages` in a single needed-mode invocation.
    ///
    /// The exit status is not interpreted here: a nonzero exit can still
    /// mean most of the batch installed, so callers reconcile the output.
    ///
    /// # Errors
    ///
    /// Returns an error only if the installer cannot be spawned.
    pub fn bulk_install_needed(
        self,
        executor: &dyn Executor,
        packages: &[String],
    ) -> Result<ExecResult> {
        let (program, base) = self.install_command();
        let mut args: Vec<&str> = base.to_vec();
        args.extend(packages.iter().map(String::as_str));
        executor.run_unchecked(program, &args)
    }
}

/// Every package the system package database records as installed,
/// whichever source it came from.
///
/// # Errors
///
/// Returns an error if the query cannot be spawned or exits nonzero.
pub fn query_installed(executor: &dyn Executor) -> Result<Vec<String>> {
    let result = executor.run("pacman", &["-Qq"])?;
    Ok(result
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
