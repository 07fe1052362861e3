//! File-system resource helpers.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// List every non-directory entry below `root`, as paths relative to `root`,
/// in sorted order.
///
/// Directories are recursed into, never returned.  Symlinks inside the tree
/// are returned as entries and not followed.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_into(root, Path::new(""), &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_into(root: &Path, rel: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let dir = root.join(rel);
    for entry in
        std::fs::read_dir(&dir).with_context(|| format!("reading directory {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("reading entry in {}", dir.display()))?;
        let rel_path = rel.join(entry.file_name());
        let file_type = entry
            .file_type()
            .with_context(|| format!("reading type of {}", entry.path().display()))?;
        if file_type.is_dir() {
            walk_into(root, &rel_path, out)?;
        } else {
            out.push(rel_path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ensure_parent_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("file.txt");
        ensure_parent_dir(&nested).unwrap();
        assert!(dir.path().join("a").join("b").exists());
    }

    #[test]
    fn ensure_parent_dir_noop_when_parent_exists() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        ensure_parent_dir(&file).unwrap();
        assert!(dir.path().exists());
    }

    #[test]
    fn walk_files_returns_sorted_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".config/nvim/lua")).unwrap();
        std::fs::write(dir.path().join(".config/nvim/init.lua"), "").unwrap();
        std::fs::write(dir.path().join(".config/nvim/lua/opts.lua"), "").unwrap();
        std::fs::write(dir.path().join(".bashrc"), "").unwrap();

        let files = walk_files(dir.path()).unwrap();
        assert_eq!(
            files,
            [
                PathBuf::from(".bashrc"),
                PathBuf::from(".config/nvim/init.lua"),
                PathBuf::from(".config/nvim/lua/opts.lua"),
            ]
        );
    }

    #[test]
    fn walk_files_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(walk_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn walk_files_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(walk_files(&dir.path().join("absent")).is_err());
    }
}
