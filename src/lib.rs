//! Selective provisioning engine.
//!
//! Installs packages from per-source tiered lists (mandatory, default,
//! optional groups), bootstraps the community-source helper when needed,
//! then links configuration bundles into the home directory only when the
//! capabilities they require are present.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: package lists and the bundle requirement table
//! - **[`resources`]**: idempotent `check + apply` primitives (symlinks, package sources)
//! - **[`engine`]**: tiered installer, reconciliation, capability resolution, deployment
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `deploy`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

/// Command-line argument definitions.
pub mod cli;
/// Top-level subcommand orchestration.
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod logging;
pub mod prompt;
pub mod resources;
