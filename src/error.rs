//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return [`ProvisionError`] where the caller needs to tell
//! failure kinds apart (a missing mandatory list aborts the run, a missing
//! optional list does not).  Command handlers at the CLI boundary convert
//! them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error taxonomy
//!
//! ```text
//! ProvisionError
//! ├── ResourceMissing          list file or bundle directory absent
//! ├── SourceUnavailable        community source has no usable client
//! ├── PackageInstallFailure    one package of a batch failed (recovered)
//! ├── DeployConflict           symlink farm hit a pre-existing file (recovered)
//! └── InvalidBundleTable       malformed bundle requirement table
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// A list resource or bundle directory does not exist.
    ///
    /// Fatal for mandatory lists, a soft-skip everywhere else.
    #[error("{what} not found: {}", path.display())]
    ResourceMissing {
        /// Human-readable name of the missing resource (e.g. `"pacman mandatory list"`).
        what: String,
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// The community package source has no usable client.
    #[error("{source_name} source unavailable: {reason}")]
    SourceUnavailable {
        /// Display name of the source (e.g. `"aur"`).
        source_name: String,
        /// Why the client could not be made available.
        reason: String,
    },

    /// A single package of a batch install failed.
    #[error("package '{package}' failed to install: {reason}")]
    PackageInstallFailure {
        /// Package identifier.
        package: String,
        /// Reason extracted from the installer output.
        reason: String,
    },

    /// The symlink farm found a pre-existing file it will not replace.
    #[error("bundle '{bundle}' conflicts with existing {}", target.display())]
    DeployConflict {
        /// Bundle being deployed.
        bundle: String,
        /// Conflicting path in the home directory.
        target: PathBuf,
    },

    /// The bundle requirement table is malformed.
    #[error("invalid bundle table entry '{bundle}': {message}")]
    InvalidBundleTable {
        /// Bundle whose entry is malformed.
        bundle: String,
        /// What is wrong with it.
        message: String,
    },
}
