//! Package list loading.
//!
//! Lists live under `lists/<source>/` as plain text, one package per line:
//!
//! ```text
//! lists/pacman/mandatory
//! lists/pacman/default
//! lists/pacman/optional/<group>
//! lists/aur/...
//! ```
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::error::ProvisionError;
use crate::resources::package::PackageSource;

/// Directory under the provisioning root holding all package lists.
pub const LISTS_DIR: &str = "lists";
/// File name of a source's mandatory list.
pub const MANDATORY_FILE: &str = "mandatory";
/// File name of a source's default list.
pub const DEFAULT_FILE: &str = "default";
/// Directory holding a source's optional group lists.
pub const OPTIONAL_DIR: &str = "optional";

/// Installation tier of a package list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tier {
    /// Installed unconditionally.
    Mandatory,
    /// Installed after operator confirmation.
    Default,
    /// Named group, installed after its own confirmation.
    Optional(String),
}

impl Tier {
    /// Whether the operator must confirm before this tier installs.
    #[must_use]
    pub const fn requires_confirmation(&self) -> bool {
        !matches!(self, Self::Mandatory)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mandatory => write!(f, "mandatory"),
            Self::Default => write!(f, "default"),
            Self::Optional(group) => write!(f, "optional:{group}"),
        }
    }
}

/// An ordered list of package identifiers for one source and tier.
///
/// Duplicates are kept; order is preserved for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageList {
    /// Source the packages are installed from.
    pub source: PackageSource,
    /// Tier controlling the confirmation policy.
    pub tier: Tier,
    /// Package identifiers in file order.
    pub packages: Vec<String>,
}

impl PackageList {
    /// Create a list.
    #[must_use]
    pub const fn new(source: PackageSource, tier: Tier, packages: Vec<String>) -> Self {
        Self {
            source,
            tier,
            packages,
        }
    }

    /// Display label, e.g. `"pacman optional:games"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.source, self.tier)
    }

    /// Whether the list has no packages.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Parse list content: every line that is neither blank nor a comment
/// (first non-whitespace character `#`), trimmed, in file order.
///
/// # Examples
///
/// ```
/// use provision_cli::config::lists::parse_list;
///
/// let packages = parse_list("# editors\nneovim\n\n  git  \n   # indented comment\n");
/// assert_eq!(packages, ["neovim", "git"]);
/// ```
#[must_use]
pub fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Load a list file.
///
/// # Errors
///
/// Returns [`ProvisionError::ResourceMissing`] if the file does not exist,
/// or an I/O error if it cannot be read.
pub fn load(path: &Path, what: &str) -> Result<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_list(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ProvisionError::ResourceMissing {
                what: what.to_string(),
                path: path.to_path_buf(),
            }
            .into())
        }
        Err(e) => Err(e).with_context(|| format!("reading {what}: {}", path.display())),
    }
}

/// All lists of one source.
#[derive(Debug, Clone)]
pub struct SourceLists {
    /// Source these lists belong to.
    pub source: PackageSource,
    /// Mandatory tier.
    pub mandatory: PackageList,
    /// Default tier (empty when its file is absent).
    pub default: PackageList,
    /// Optional groups in file-name order.
    pub optional: Vec<PackageList>,
    /// Optional resources that were absent and soft-skipped.
    pub missing: Vec<PathBuf>,
}

impl SourceLists {
    /// Load the lists of `source` from `lists_dir/<source>/`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ResourceMissing`] if the mandatory list is
    /// absent, or an I/O error if any present list cannot be read.
    pub fn load(lists_dir: &Path, source: PackageSource) -> Result<Self> {
        let dir = lists_dir.join(source.list_dir());
        let mut missing = Vec::new();

        let mandatory = load(
            &dir.join(MANDATORY_FILE),
            &format!("{source} mandatory list"),
        )?;

        let default_path = dir.join(DEFAULT_FILE);
        let default = if default_path.exists() {
            load(&default_path, &format!("{source} default list"))?
        } else {
            missing.push(default_path);
            Vec::new()
        };

        let optional_dir = dir.join(OPTIONAL_DIR);
        let optional = if optional_dir.is_dir() {
            load_groups(&optional_dir, source)?
        } else {
            missing.push(optional_dir);
            Vec::new()
        };

        Ok(Self {
            source,
            mandatory: PackageList::new(source, Tier::Mandatory, mandatory),
            default: PackageList::new(source, Tier::Default, default),
            optional,
            missing,
        })
    }

    /// Lists in installation order: mandatory, default, then each optional group.
    pub fn tiers(&self) -> impl Iterator<Item = &PackageList> {
        std::iter::once(&self.mandatory)
            .chain(std::iter::once(&self.default))
            .chain(self.optional.iter())
    }

    /// Whether every list of this source is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers().all(PackageList::is_empty)
    }

    /// Total number of package entries across all tiers.
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.tiers().map(|l| l.packages.len()).sum()
    }
}

/// Load every optional group file in `dir`, sorted by file name.
fn load_groups(dir: &Path, source: PackageSource) -> Result<Vec<PackageList>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading optional groups: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| !n.to_string_lossy().starts_with('.'))
        })
        .collect();
    paths.sort();

    paths
        .iter()
        .filter_map(|path| {
            let group = path.file_name()?.to_string_lossy().into_owned();
            Some((group, path))
        })
        .map(|(group, path)| {
            let packages = load(path, &format!("{source} optional group '{group}'"))?;
            Ok(PackageList::new(source, Tier::Optional(group), packages))
        })
        .collect()
}

/// Package lists for both sources.
#[derive(Debug, Clone)]
pub struct ListPlan {
    /// System repository lists.
    pub system: SourceLists,
    /// Community repository lists.
    pub community: SourceLists,
}

impl ListPlan {
    /// Load all lists under `root/lists/`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ResourceMissing`] if either source's
    /// mandatory list is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let lists_dir = root.join(LISTS_DIR);
        Ok(Self {
            system: SourceLists::load(&lists_dir, PackageSource::System)?,
            community: SourceLists::load(&lists_dir, PackageSource::Community)?,
        })
    }
}
