//! Configuration loaded from the provisioning root.
pub mod bundles;
pub mod lists;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory under the provisioning root holding configuration bundles.
pub const BUNDLES_DIR: &str = "bundles";

/// Package lists and bundle table for one provisioning root.
#[derive(Debug)]
pub struct Config {
    /// Provisioning root.
    pub root: PathBuf,
    /// Package lists for both sources.
    pub lists: lists::ListPlan,
    /// Bundle requirement table, in deployment order.
    pub bundles: Vec<bundles::BundleRule>,
}

impl Config {
    /// Load lists and bundle table from `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if a mandatory list is missing or any present file
    /// cannot be parsed.
    pub fn load(root: &Path) -> Result<Self> {
        let lists = lists::ListPlan::load(root).context("loading package lists")?;
        let bundles = bundles::load(root).context("loading bundle table")?;
        Ok(Self {
            root: root.to_path_buf(),
            lists,
            bundles,
        })
    }

    /// Directory holding the configuration bundles.
    #[must_use]
    pub fn bundles_dir(&self) -> PathBuf {
        self.root.join(BUNDLES_DIR)
    }
}
