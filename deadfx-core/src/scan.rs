//! Deterministic Go source discovery with early directory pruning.
//!
//! - Early directory pruning via `WalkDir::filter_entry` (O(1) subtree skip)
//! - Parallel entry filtering via Rayon's `par_bridge`
//! - Output sorted so every run sees files in the same order

use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{DeadfxError, DeadfxResult};

/// Directories excluded by default (Go tooling conventions).
const EXCLUDED_DIRS: &[&str] = &["vendor", "testdata", ".git", "node_modules"];

/// Source file extension.
const GO_EXTENSION: &str = "go";

#[inline]
fn is_excluded_dir(entry: &walkdir::DirEntry, excludes: &HashSet<&str>) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.contains(name) || name.starts_with(['_', '.']))
}

/// Gathers all `.go` files under `root`, skipping vendored and hidden trees.
///
/// Any traversal error (including a missing root) is a `Walk` error.
pub fn gather_go_files(root: &Path) -> DeadfxResult<Vec<PathBuf>> {
    gather_go_files_with_excludes(root, &[])
}

/// Gathers all `.go` files with additional excluded directory names.
pub fn gather_go_files_with_excludes(root: &Path, excludes: &[&str]) -> DeadfxResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(DeadfxError::walk(root, "directory does not exist"));
    }

    let all_excludes: HashSet<&str> = EXCLUDED_DIRS
        .iter()
        .copied()
        .chain(excludes.iter().copied())
        .collect();

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e, &all_excludes))
        .par_bridge()
        .filter_map(|entry| match entry {
            Ok(e) => {
                let path = e.path();
                if e.file_type().is_file() && path.extension().is_some_and(|ext| ext == GO_EXTENSION) {
                    Some(Ok(path.to_path_buf()))
                } else {
                    None
                }
            }
            Err(e) => {
                let at = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                Some(Err(DeadfxError::walk(at, e.to_string())))
            }
        })
        .collect::<DeadfxResult<Vec<_>>>()?;

    files.sort();
    Ok(files)
}

/// True for files following Go's `_test.go` convention.
pub fn is_test_file(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix))
}
