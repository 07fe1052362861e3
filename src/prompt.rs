//! Operator confirmation for confirm-then-install tiers.
use std::io::{BufRead, Write};

use anyhow::{Context as _, Result};

/// Yes/no confirmation source.
///
/// Interactive runs read from the terminal; `--yes` and tests substitute a
/// fixed answer.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm: Send + Sync + std::fmt::Debug {
    /// Ask `question` and return whether the answer was affirmative.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt cannot be written or the answer read.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Whether `answer` counts as a "yes". Anything else, including an empty
/// line, is a refusal.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Blocking prompt on stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        let mut out = std::io::stdout().lock();
        write!(out, "{question} [y/N] ").context("writing prompt")?;
        out.flush().context("flushing prompt")?;
        drop(out);

        let mut answer = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("reading confirmation")?;
        // EOF: no operator to ask.
        if read == 0 {
            return Ok(false);
        }
        Ok(is_affirmative(&answer))
    }
}

/// Confirmation that always returns the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirm(pub bool);

impl Confirm for FixedConfirm {
    fn confirm(&self, _question: &str) -> Result<bool> {
        Ok(self.0)
    }
}
