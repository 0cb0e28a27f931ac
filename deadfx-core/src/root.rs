//! Go module root detection and the file → package path transform.
//!
//! A Go package is a directory; its import path is the module path from
//! `go.mod` followed by the directory relative to the module root.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DeadfxError, DeadfxResult};

/// Normalize a path string to use forward slashes consistently.
#[inline]
pub fn normalize_path_string(path: &str) -> String {
    path.replace('\\', "/")
}

/// Convert a Path to a normalized string (forward slashes).
#[inline]
pub fn path_to_normalized_string(path: &Path) -> String {
    normalize_path_string(&path.display().to_string())
}

/// Reads the `module` directive from go.mod content.
pub fn parse_module_directive(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches('"');
        (!module.is_empty()).then(|| module.to_string())
    })
}

/// Location of a Go module on disk and its import path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Canonical project root.
    pub root: PathBuf,
    /// Module path from go.mod, or the root directory name when absent.
    pub module_path: String,
}

impl ProjectLayout {
    /// Builds a layout from explicit parts (no filesystem access).
    pub fn new(root: impl Into<PathBuf>, module_path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            module_path: module_path.into(),
        }
    }

    /// Inspects `root` for a go.mod file.
    ///
    /// Fails only if the root itself cannot be resolved; a missing or
    /// directive-less go.mod falls back to the directory name.
    pub fn discover(root: &Path) -> DeadfxResult<Self> {
        let root = root
            .canonicalize()
            .map_err(|e| DeadfxError::load(root, format!("cannot resolve project root: {}", e)))?;
        if !root.is_dir() {
            return Err(DeadfxError::load(&root, "project root is not a directory"));
        }

        let go_mod = root.join("go.mod");
        let module_path = match fs::read_to_string(&go_mod) {
            Ok(content) => parse_module_directive(&content),
            Err(_) => None,
        }
        .unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "main".to_string())
        });

        Ok(Self { root, module_path })
    }

    /// Path of `file` relative to the project root, with forward slashes.
    ///
    /// Paths outside the root are returned normalized but unchanged.
    pub fn relative_path(&self, file: &Path) -> String {
        let rel = file.strip_prefix(&self.root).unwrap_or(file);
        path_to_normalized_string(rel)
            .trim_start_matches("./")
            .to_string()
    }

    /// Directory of `file` relative to the project root ("" for the root).
    pub fn relative_dir(&self, file: &Path) -> String {
        let rel = self.relative_path(file);
        match rel.rfind('/') {
            Some(idx) => rel[..idx].to_string(),
            None => String::new(),
        }
    }

    /// Import path of the package declaring `file`.
    pub fn package_path(&self, file: &Path) -> String {
        self.package_path_for_dir(&self.relative_dir(file))
    }

    /// Import path of the package in project-relative directory `dir`.
    pub fn package_path_for_dir(&self, dir: &str) -> String {
        if dir.is_empty() {
            self.module_path.clone()
        } else {
            format!("{}/{}", self.module_path, dir)
        }
    }
}
