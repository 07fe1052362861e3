use clap::{Parser, Subcommand};

use crate::engine::farm::FarmBackend;

/// Top-level CLI entry point for the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "provision",
    about = "Selective provisioning: tiered package installs and capability-gated configuration bundles",
    version
)]
pub struct Cli {
    #[allow(missing_docs)]
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[allow(missing_docs)]
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Override provisioning root directory
    #[arg(long, global = true)]
    pub root: Option<std::path::PathBuf>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Symlink-farm backend used for deployment
    #[arg(long, value_enum, default_value_t = FarmBackend::Native, global = true)]
    pub farm: FarmBackend,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install package tiers, then deploy configuration bundles
    Install(InstallOpts),
    /// Deploy configuration bundles only
    Deploy,
    /// Print version information
    Version,
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Deploy => "deploy",
            Self::Version => "version",
            Self::Completions { .. } => "completions",
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallOpts {
    /// Skip the community source and its helper bootstrap
    #[arg(long)]
    pub skip_community: bool,

    /// Install packages only, do not deploy bundles
    #[arg(long)]
    pub skip_deploy: bool,
}
