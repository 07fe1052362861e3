#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `install` command.
//!
//! These tests drive a full run (tiers, helper bootstrap, capability
//! resolution, deployment) against a temporary provisioning root, with the
//! package managers replaced by a scripted executor.
#![cfg(unix)]

mod common;

use std::sync::Arc;

use common::{ScriptedConfirm, ScriptedExecutor, TestRoot};
use provision_cli::cli::InstallOpts;
use provision_cli::commands::install::{RunReport, execute};
use provision_cli::engine::deploy::{DeployOutcome, SkipReason};
use provision_cli::engine::farm::NativeFarm;
use provision_cli::engine::outcome::PackageStatus;
use provision_cli::error::ProvisionError;
use provision_cli::logging::{Logger, TaskStatus};

const TABLE: &str = r#"
[bundles.git]
all-of = ["gitA"]

[bundles.shell]

[bundles.toolb]
all-of = ["toolB"]

[bundles.toolc]
all-of = ["toolC"]
"#;

/// Root with one package per system tier and one bundle per package.
fn scenario_root() -> TestRoot {
    TestRoot::new()
        .with_list("pacman/mandatory", "gitA\n")
        .with_list("pacman/default", "# confirm first\ntoolB\n")
        .with_list("pacman/optional/extra", "toolC\n")
        .with_bundle_table(TABLE)
        .with_bundle_file("git", ".gitconfig", "[user]\n")
        .with_bundle_file("shell", ".bashrc", "set -o vi\n")
        .with_bundle_file("toolb", ".config/toolb/config", "b\n")
        .with_bundle_file("toolc", ".config/toolc/config", "c\n")
}

fn run(
    root: &TestRoot,
    executor: &Arc<ScriptedExecutor>,
    prompt: &Arc<ScriptedConfirm>,
    opts: &InstallOpts,
    dry_run: bool,
) -> (anyhow::Result<RunReport>, Arc<Logger>) {
    let config = root.config();
    let (ctx, log) = root.context(executor.clone(), prompt.clone(), dry_run);
    let farm = NativeFarm::new(&config.bundles_dir(), &root.home());
    (execute(&ctx, &config, opts, &farm), log)
}

fn deployment<'a>(report: &'a RunReport, bundle: &str) -> &'a DeployOutcome {
    &report
        .deployments
        .iter()
        .find(|d| d.bundle == bundle)
        .expect("deployment result for bundle")
        .outcome
}

fn task_status(log: &Logger, name: &str) -> Option<TaskStatus> {
    log.task_entries()
        .into_iter()
        .find(|t| t.name == name)
        .map(|t| t.status)
}

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

/// Mandatory installs, default is declined, the accepted optional group
/// fails: only the mandatory package is a capability and only bundles
/// gated on it (or on nothing) are linked.
#[test]
fn declined_and_failed_tiers_gate_their_bundles() {
    let root = scenario_root();
    let executor = Arc::new(ScriptedExecutor::new().with_unknown(&["toolC"]));
    let prompt = Arc::new(ScriptedConfirm::accepting(&["optional:extra"]));

    let (report, log) = run(&root, &executor, &prompt, &InstallOpts::default(), false);
    let report = report.unwrap();

    assert_eq!(report.capabilities.iter().collect::<Vec<_>>(), ["gitA"]);
    assert_eq!(
        report.outcome.status("gitA"),
        Some(PackageStatus::Installed)
    );
    assert_eq!(report.outcome.status("toolB"), Some(PackageStatus::Skipped));
    assert_eq!(report.outcome.status("toolC"), Some(PackageStatus::Failed));

    assert!(matches!(
        deployment(&report, "git"),
        DeployOutcome::Applied { linked: 1, .. }
    ));
    assert!(matches!(
        deployment(&report, "shell"),
        DeployOutcome::Applied { .. }
    ));
    assert_eq!(
        deployment(&report, "toolb"),
        &DeployOutcome::Skipped(SkipReason::CapabilityMissing(vec!["toolB".to_string()]))
    );
    assert_eq!(
        deployment(&report, "toolc"),
        &DeployOutcome::Skipped(SkipReason::CapabilityMissing(vec!["toolC".to_string()]))
    );

    let home = root.home();
    assert_eq!(
        std::fs::read_link(home.join(".gitconfig")).unwrap(),
        root.root().join("bundles/git/.gitconfig")
    );
    assert!(!home.join(".config/toolb").exists());
    assert!(!home.join(".config/toolc").exists());

    assert_eq!(
        prompt.asked(),
        [
            "Install pacman default packages?",
            "Install pacman optional:extra packages?"
        ]
    );
    assert!(executor.calls_starting_with("paru").is_empty());
    assert_eq!(task_status(&log, "pacman default"), Some(TaskStatus::Skipped));
    assert_eq!(
        task_status(&log, "pacman optional:extra"),
        Some(TaskStatus::Failed)
    );
    assert_eq!(log.failure_count(), 1);
}

/// One pacman invocation per non-declined tier, in tier order.
#[test]
fn installs_each_tier_in_one_batch() {
    let root = scenario_root();
    let executor = Arc::new(ScriptedExecutor::new().with_unknown(&["toolC"]));
    let prompt = Arc::new(ScriptedConfirm::accepting(&["default", "extra"]));

    run(&root, &executor, &prompt, &InstallOpts::default(), false)
        .0
        .unwrap();

    assert_eq!(
        executor.calls_starting_with("sudo pacman"),
        [
            "sudo pacman -S --needed --noconfirm gitA",
            "sudo pacman -S --needed --noconfirm toolB",
            "sudo pacman -S --needed --noconfirm toolC",
        ]
    );
}

/// A second run changes nothing and reports bundles as already applied.
#[test]
fn rerun_is_idempotent() {
    let root = scenario_root();
    let executor = Arc::new(ScriptedExecutor::new());
    let prompt = Arc::new(ScriptedConfirm::accepting(&[]));

    run(&root, &executor, &prompt, &InstallOpts::default(), false)
        .0
        .unwrap();
    let (second, log) = run(&root, &executor, &prompt, &InstallOpts::default(), false);
    let second = second.unwrap();

    assert_eq!(deployment(&second, "git"), &DeployOutcome::AlreadyApplied);
    assert_eq!(deployment(&second, "shell"), &DeployOutcome::AlreadyApplied);
    assert!(!log.has_failures());
}

/// Packages installed by an earlier run gate bundles even when this run's
/// lists no longer name them.
#[test]
fn earlier_installs_are_capabilities() {
    let root = scenario_root();
    let executor = Arc::new(
        ScriptedExecutor::new()
            .with_executables(&["pacman"])
            .with_earlier_installs(&["toolC"]),
    );
    let prompt = Arc::new(ScriptedConfirm::accepting(&[]));

    let (report, log) = run(&root, &executor, &prompt, &InstallOpts::default(), false);
    let report = report.unwrap();

    assert_eq!(report.outcome.status("toolC"), Some(PackageStatus::Skipped));
    assert!(report.capabilities.contains("toolC"));
    assert!(report.capabilities.contains("gitA"));
    assert!(matches!(
        deployment(&report, "toolc"),
        DeployOutcome::Applied { linked: 1, .. }
    ));
    assert_eq!(
        deployment(&report, "toolb"),
        &DeployOutcome::Skipped(SkipReason::CapabilityMissing(vec!["toolB".to_string()]))
    );
    assert_eq!(executor.calls_starting_with("pacman -Qq").len(), 1);
    assert!(!log.has_failures());
}

/// A pre-existing file is left in place and reported as one warning.
#[test]
fn conflicting_file_is_a_warning() {
    let root = scenario_root();
    std::fs::write(root.home().join(".bashrc"), "mine\n").unwrap();
    let executor = Arc::new(ScriptedExecutor::new());
    let prompt = Arc::new(ScriptedConfirm::accepting(&[]));

    let (report, log) = run(&root, &executor, &prompt, &InstallOpts::default(), false);
    let report = report.unwrap();

    let outcome = deployment(&report, "shell");
    assert!(
        matches!(
            outcome,
            DeployOutcome::Applied { linked: 0, warnings }
                if warnings.len() == 1 && warnings[0].contains(".bashrc")
        ),
        "expected Applied with a single .bashrc warning, got {outcome:?}"
    );
    assert_eq!(
        std::fs::read_to_string(root.home().join(".bashrc")).unwrap(),
        "mine\n"
    );
    assert!(!log.has_failures());
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Dry run never prompts, installs, or links.
#[test]
fn dry_run_changes_nothing() {
    let root = scenario_root();
    let executor = Arc::new(ScriptedExecutor::new());
    let prompt = Arc::new(ScriptedConfirm::accepting(&["default", "extra"]));

    let (report, log) = run(&root, &executor, &prompt, &InstallOpts::default(), true);
    let report = report.unwrap();

    assert!(executor.calls().is_empty());
    assert!(prompt.asked().is_empty());
    assert_eq!(report.outcome.count(PackageStatus::Skipped), 3);
    assert_eq!(deployment(&report, "shell"), &DeployOutcome::DryRun);
    assert!(matches!(
        deployment(&report, "git"),
        DeployOutcome::Skipped(SkipReason::CapabilityMissing(_))
    ));
    assert!(std::fs::read_dir(root.home()).unwrap().next().is_none());
    assert_eq!(task_status(&log, "pacman mandatory"), Some(TaskStatus::DryRun));
}

#[test]
fn skip_deploy_installs_only() {
    let root = scenario_root();
    let executor = Arc::new(ScriptedExecutor::new());
    let prompt = Arc::new(ScriptedConfirm::accepting(&[]));
    let opts = InstallOpts {
        skip_deploy: true,
        ..InstallOpts::default()
    };

    let report = run(&root, &executor, &prompt, &opts, false).0.unwrap();

    assert!(report.outcome.is_installed("gitA"));
    assert!(report.deployments.is_empty());
    assert!(std::fs::read_dir(root.home()).unwrap().next().is_none());
}

#[test]
fn skip_community_leaves_helper_alone() {
    let root = scenario_root().with_list("aur/mandatory", "spotify\n");
    let executor = Arc::new(ScriptedExecutor::new());
    let prompt = Arc::new(ScriptedConfirm::accepting(&[]));
    let opts = InstallOpts {
        skip_community: true,
        ..InstallOpts::default()
    };

    let report = run(&root, &executor, &prompt, &opts, false).0.unwrap();

    assert_eq!(report.outcome.status("spotify"), None);
    assert!(executor.calls_starting_with("paru").is_empty());
    assert!(executor.calls_starting_with("git clone").is_empty());
}

// ---------------------------------------------------------------------------
// Community source
// ---------------------------------------------------------------------------

#[test]
fn community_tiers_run_after_system_tiers() {
    let root = scenario_root().with_list("aur/mandatory", "spotify\n");
    let executor = Arc::new(ScriptedExecutor::new().with_executables(&["paru"]));
    let prompt = Arc::new(ScriptedConfirm::accepting(&[]));

    let (report, log) = run(&root, &executor, &prompt, &InstallOpts::default(), false);
    let report = report.unwrap();

    assert!(report.outcome.is_installed("spotify"));
    let calls = executor.calls();
    let system = calls
        .iter()
        .position(|c| c == "sudo pacman -S --needed --noconfirm gitA")
        .unwrap();
    let community = calls
        .iter()
        .position(|c| c == "paru -S --needed --noconfirm spotify")
        .unwrap();
    assert!(system < community);
    assert_eq!(task_status(&log, "helper bootstrap"), Some(TaskStatus::Ok));
}

/// The helper never appears: mandatory community packages abort the run,
/// but only after every system tier ran.
#[test]
fn unavailable_helper_aborts_mandatory_community_tier() {
    let root = scenario_root().with_list("aur/mandatory", "spotify\n");
    let executor = Arc::new(ScriptedExecutor::new());
    let prompt = Arc::new(ScriptedConfirm::accepting(&[]));

    let (result, _log) = run(&root, &executor, &prompt, &InstallOpts::default(), false);
    let err = result.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::SourceUnavailable { .. })
    ));
    assert_eq!(
        executor.calls_starting_with("sudo pacman -S --needed --noconfirm gitA").len(),
        1
    );
    assert!(executor.calls_starting_with("paru").is_empty());
    assert!(std::fs::read_dir(root.home()).unwrap().next().is_none());
}

/// Without mandatory community packages the run degrades instead.
#[test]
fn unavailable_helper_fails_optional_community_tiers_only() {
    let root = scenario_root().with_list("aur/default", "spotify\n");
    let executor = Arc::new(ScriptedExecutor::new());
    let prompt = Arc::new(ScriptedConfirm::accepting(&["aur default"]));

    let (report, log) = run(&root, &executor, &prompt, &InstallOpts::default(), false);
    let report = report.unwrap();

    assert_eq!(report.outcome.status("spotify"), Some(PackageStatus::Failed));
    assert!(report.outcome.is_installed("gitA"));
    assert!(matches!(
        deployment(&report, "git"),
        DeployOutcome::Applied { .. }
    ));
    assert_eq!(
        task_status(&log, "helper bootstrap"),
        Some(TaskStatus::Failed)
    );
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[test]
fn missing_mandatory_list_aborts_before_installing() {
    let root = scenario_root();
    std::fs::remove_file(root.root().join("lists/aur/mandatory")).unwrap();

    let err = provision_cli::config::Config::load(&root.root()).unwrap_err();
    assert!(
        err.chain()
            .any(|e| matches!(
                e.downcast_ref::<ProvisionError>(),
                Some(ProvisionError::ResourceMissing { .. })
            )),
        "expected ResourceMissing, got {err:#}"
    );
}

#[test]
fn missing_bundle_directory_is_not_present() {
    let root = scenario_root().with_bundle_table(&format!("{TABLE}\n[bundles.ghost]\n"));
    let executor = Arc::new(ScriptedExecutor::new());
    let prompt = Arc::new(ScriptedConfirm::accepting(&[]));

    let report = run(&root, &executor, &prompt, &InstallOpts::default(), false)
        .0
        .unwrap();

    assert_eq!(
        deployment(&report, "ghost"),
        &DeployOutcome::Skipped(SkipReason::NotPresent)
    );
}
