// Shared helpers for integration tests.
//
// Provides a temporary provisioning root plus home directory, a scripted
// executor standing in for the package managers, and a scripted prompt.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use provision_cli::config::Config;
use provision_cli::engine::Context;
use provision_cli::exec::{ExecResult, Executor};
use provision_cli::logging::{Log, Logger};
use provision_cli::prompt::Confirm;

/// Executor that answers package-manager invocations from a script.
///
/// Install commands succeed for every requested package except those in
/// `unknown`, which produce pacman's `target not found` diagnostic and a
/// nonzero exit.  `which` resolves names in `executables` plus everything
/// installed so far.  `pacman -Qq` lists the packages of earlier runs plus
/// everything installed so far.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    unknown: BTreeSet<String>,
    executables: BTreeSet<String>,
    earlier: BTreeSet<String>,
    installed: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packages the installer does not know.
    pub fn with_unknown(mut self, packages: &[&str]) -> Self {
        self.unknown.extend(packages.iter().map(ToString::to_string));
        self
    }

    /// Executables resolvable on PATH from the start.
    pub fn with_executables(mut self, names: &[&str]) -> Self {
        self.executables.extend(names.iter().map(ToString::to_string));
        self
    }

    /// Packages installed before this run; known to the package database
    /// but not resolvable on PATH.
    pub fn with_earlier_installs(mut self, packages: &[&str]) -> Self {
        self.earlier.extend(packages.iter().map(ToString::to_string));
        self
    }

    /// Every command line run so far, as `"program arg..."`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Command lines starting with `prefix`.
    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn record(&self, program: &str, args: &[&str]) {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().expect("calls lock").push(line);
    }

    fn install(&self, args: &[&str]) -> ExecResult {
        let requested: Vec<&str> = args
            .iter()
            .copied()
            .filter(|a| !a.starts_with('-') && *a != "pacman")
            .collect();
        let mut output = String::new();
        for package in &requested {
            if self.unknown.contains(*package) {
                output.push_str(&format!("error: target not found: {package}\n"));
            }
        }
        let success = output.is_empty();
        if success {
            let mut installed = self.installed.lock().expect("installed lock");
            installed.extend(requested.iter().map(ToString::to_string));
        }
        ExecResult {
            stdout: String::new(),
            stderr: output,
            success,
            code: Some(if success { 0 } else { 1 }),
        }
    }

    fn database_listing(&self) -> String {
        let installed = self.installed.lock().expect("installed lock");
        self.earlier
            .iter()
            .chain(installed.iter())
            .map(|p| format!("{p}\n"))
            .collect()
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let result = self.run_unchecked(program, args)?;
        if !result.success {
            anyhow::bail!("{program} failed: {}", result.stderr.trim());
        }
        Ok(result)
    }

    fn run_in(&self, _dir: &Path, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.run(program, args)
    }

    fn run_in_with_env(
        &self,
        _dir: &Path,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> anyhow::Result<ExecResult> {
        self.run(program, args)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.record(program, args);
        if matches!(program, "sudo" | "paru") && args.contains(&"-S") {
            return Ok(self.install(args));
        }
        let stdout = if program == "pacman" && args == ["-Qq"] {
            self.database_listing()
        } else {
            String::new()
        };
        Ok(ExecResult {
            stdout,
            stderr: String::new(),
            success: true,
            code: Some(0),
        })
    }

    fn which(&self, program: &str) -> bool {
        self.executables.contains(program)
            || self
                .installed
                .lock()
                .is_ok_and(|installed| installed.contains(program))
    }
}

/// Prompt that accepts questions containing any of the given phrases and
/// declines everything else, remembering what it was asked.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    accept: Vec<String>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn accepting(phrases: &[&str]) -> Self {
        Self {
            accept: phrases.iter().map(ToString::to_string).collect(),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().expect("asked lock").clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> anyhow::Result<bool> {
        self.asked
            .lock()
            .expect("asked lock")
            .push(question.to_string());
        Ok(self.accept.iter().any(|p| question.contains(p.as_str())))
    }
}

/// An isolated provisioning root and home directory backed by a
/// [`tempfile::TempDir`].
pub struct TestRoot {
    dir: tempfile::TempDir,
}

impl TestRoot {
    /// Create a root with empty mandatory lists for both sources.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = Self { dir };
        std::fs::create_dir_all(root.home()).expect("create home");
        root.with_list("pacman/mandatory", "")
            .with_list("aur/mandatory", "")
    }

    /// Path to the provisioning root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    /// Path to the home directory bundles are linked into.
    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// Write `lists/<rel>`.
    pub fn with_list(self, rel: &str, content: &str) -> Self {
        write(&self.root().join("lists").join(rel), content);
        self
    }

    /// Write `bundles/<bundle>/<rel>`.
    pub fn with_bundle_file(self, bundle: &str, rel: &str, content: &str) -> Self {
        write(&self.root().join("bundles").join(bundle).join(rel), content);
        self
    }

    /// Write `conf/bundles.toml`.
    pub fn with_bundle_table(self, content: &str) -> Self {
        write(&self.root().join("conf/bundles.toml"), content);
        self
    }

    /// Load the configuration of this root.
    pub fn config(&self) -> Config {
        Config::load(&self.root()).expect("load config")
    }

    /// Build a run context wired to `executor` and `prompt`.
    pub fn context(
        &self,
        executor: Arc<dyn Executor>,
        prompt: Arc<dyn Confirm>,
        dry_run: bool,
    ) -> (Context, Arc<Logger>) {
        let logger = Arc::new(Logger::new("test"));
        let ctx = Context {
            root: self.root(),
            home: self.home(),
            log: Arc::clone(&logger) as Arc<dyn Log>,
            executor,
            prompt,
            dry_run,
        };
        (ctx, logger)
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write file");
}
