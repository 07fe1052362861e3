//! Bundle requirement table.
//!
//! Maps each configuration bundle to the capability tokens that must be
//! present before it is deployed.  Loaded from `conf/bundles.toml`:
//!
//! ```toml
//! [bundles.bash]
//!
//! [bundles.nvim]
//! all-of = ["neovim"]
//!
//! [bundles.launcher]
//! any-of = ["rofi", "dmenu"]
//! ```
//!
//! When the file is absent the built-in [`default_table`] is used.
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::error::ProvisionError;

/// Path of the requirement table relative to the provisioning root.
pub const BUNDLE_TABLE_FILE: &str = "conf/bundles.toml";

/// Deployment requirement of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Always deploy.
    Always,
    /// Deploy only when every token is present.
    AllOf(Vec<String>),
    /// Deploy when at least one token is present.
    AnyOf(Vec<String>),
}

impl Requirement {
    /// Capability tokens referenced by this requirement.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        match self {
            Self::Always => &[],
            Self::AllOf(tokens) | Self::AnyOf(tokens) => tokens,
        }
    }

    /// Evaluate against a presence predicate.
    ///
    /// Returns `None` when satisfied, otherwise the tokens whose absence
    /// blocks deployment: the missing subset for `AllOf`, every token for
    /// `AnyOf`.
    ///
    /// # Examples
    ///
    /// ```
    /// use provision_cli::config::bundles::Requirement;
    ///
    /// let req = Requirement::AllOf(vec!["x".into(), "y".into()]);
    /// assert_eq!(req.missing(|t| t == "x"), Some(vec!["y".to_string()]));
    ///
    /// let req = Requirement::AnyOf(vec!["x".into(), "y".into()]);
    /// assert_eq!(req.missing(|t| t == "x"), None);
    /// ```
    pub fn missing(&self, is_present: impl Fn(&str) -> bool) -> Option<Vec<String>> {
        match self {
            Self::Always => None,
            Self::AllOf(tokens) => {
                let absent: Vec<String> = tokens
                    .iter()
                    .filter(|t| !is_present(t.as_str()))
                    .cloned()
                    .collect();
                (!absent.is_empty()).then_some(absent)
            }
            Self::AnyOf(tokens) => {
                if tokens.iter().any(|t| is_present(t.as_str())) {
                    None
                } else {
                    Some(tokens.clone())
                }
            }
        }
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::AllOf(tokens) => write!(f, "all of [{}]", tokens.join(", ")),
            Self::AnyOf(tokens) => write!(f, "any of [{}]", tokens.join(", ")),
        }
    }
}

/// A bundle and its requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRule {
    /// Bundle name (directory under `bundles/`).
    pub name: String,
    /// Requirement gating deployment.
    pub requirement: Requirement,
}

impl BundleRule {
    fn new(name: &str, requirement: Requirement) -> Self {
        Self {
            name: name.to_string(),
            requirement,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleTable {
    #[serde(default)]
    bundles: BTreeMap<String, BundleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct BundleEntry {
    all_of: Option<Vec<String>>,
    any_of: Option<Vec<String>>,
}

impl BundleEntry {
    fn into_requirement(self, bundle: &str) -> Result<Requirement, ProvisionError> {
        let invalid = |message: &str| ProvisionError::InvalidBundleTable {
            bundle: bundle.to_string(),
            message: message.to_string(),
        };
        match (self.all_of, self.any_of) {
            (None, None) => Ok(Requirement::Always),
            (Some(_), Some(_)) => Err(invalid("all-of and any-of are mutually exclusive")),
            (Some(tokens), None) if tokens.is_empty() => Err(invalid("all-of is empty")),
            (None, Some(tokens)) if tokens.is_empty() => Err(invalid("any-of is empty")),
            (Some(tokens), None) => Ok(Requirement::AllOf(tokens)),
            (None, Some(tokens)) => Ok(Requirement::AnyOf(tokens)),
        }
    }
}

/// Parse a requirement table.  Rules come back in bundle-name order.
///
/// # Errors
///
/// Returns an error if the TOML is malformed, has unknown keys, or an entry
/// is invalid.
pub fn parse(content: &str) -> Result<Vec<BundleRule>> {
    let table: BundleTable = toml::from_str(content).context("parsing bundle table")?;
    table
        .bundles
        .into_iter()
        .map(|(name, entry)| {
            let requirement = entry.into_requirement(&name)?;
            Ok(BundleRule { name, requirement })
        })
        .collect()
}

/// Load the table at `root/conf/bundles.toml`, or the built-in default when
/// the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(root: &Path) -> Result<Vec<BundleRule>> {
    let path = root.join(BUNDLE_TABLE_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => parse(&content).with_context(|| format!("loading {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default_table()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Built-in requirement table, in bundle-name order.
#[must_use]
pub fn default_table() -> Vec<BundleRule> {
    let all = |tokens: &[&str]| Requirement::AllOf(tokens.iter().map(ToString::to_string).collect());
    let any = |tokens: &[&str]| Requirement::AnyOf(tokens.iter().map(ToString::to_string).collect());

    let mut table = vec![
        BundleRule::new("alacritty", all(&["alacritty"])),
        BundleRule::new("bash", Requirement::Always),
        BundleRule::new("dunst", all(&["dunst"])),
        BundleRule::new("git", all(&["git"])),
        BundleRule::new("gtk", all(&["gtk3"])),
        BundleRule::new("i3", all(&["i3-wm", "i3status"])),
        BundleRule::new("launcher", any(&["rofi", "dmenu"])),
        BundleRule::new("mpv", all(&["mpv"])),
        BundleRule::new("nvim", all(&["neovim"])),
        BundleRule::new("picom", all(&["picom"])),
        BundleRule::new("tmux", all(&["tmux"])),
        BundleRule::new("x11", all(&["xorg-xinit"])),
        BundleRule::new("zsh", all(&["zsh"])),
    ];
    table.sort_by(|a, b| a.name.cmp(&b.name));
    table
}
