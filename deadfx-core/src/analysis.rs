//! Per-file analysis record and the safety classification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parse::SourceFile;
use crate::root::ProjectLayout;

/// Deletion safety, from safest to strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyLevel {
    UltraSafe,
    PotentiallySafe,
    Dangerous,
    NeverDelete,
}

impl SafetyLevel {
    pub const ALL: [SafetyLevel; 4] = [
        SafetyLevel::UltraSafe,
        SafetyLevel::PotentiallySafe,
        SafetyLevel::Dangerous,
        SafetyLevel::NeverDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::UltraSafe => "ULTRA_SAFE",
            SafetyLevel::PotentiallySafe => "POTENTIALLY_SAFE",
            SafetyLevel::Dangerous => "DANGEROUS",
            SafetyLevel::NeverDelete => "NEVER_DELETE",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about one file, accumulated stage by stage.
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    /// Project-relative path with forward slashes.
    pub path: String,
    /// Project-relative directory of the package ("" at the root).
    pub package_dir: String,
    pub package_name: String,
    pub package_path: String,
    pub total_functions: usize,
    pub unreachable_functions: usize,
    pub total_lines: usize,

    pub has_interfaces: bool,
    pub has_fx_usage: bool,
    pub is_imported: bool,
    pub has_tests: bool,
    pub has_templates: bool,
    pub is_critical: bool,
    pub has_global_state: bool,
    pub has_init_function: bool,
    pub has_main_function: bool,

    pub reasons: Vec<String>,
    pub exported_functions: Vec<String>,
    pub imports: Vec<String>,

    pub safety_score: i64,
    pub safety_level: SafetyLevel,
}

impl FileAnalysis {
    /// Seeds a record from the extracted source facts.
    pub fn new(file: &SourceFile, layout: &ProjectLayout) -> Self {
        Self {
            path: layout.relative_path(&file.path),
            package_dir: layout.relative_dir(&file.path),
            package_name: file.package_name.clone(),
            package_path: file.package_path.clone(),
            total_functions: file.function_count(),
            unreachable_functions: 0,
            total_lines: file.total_lines,
            has_interfaces: file.has_interfaces,
            has_fx_usage: false,
            is_imported: false,
            has_tests: false,
            has_templates: false,
            is_critical: false,
            has_global_state: file.has_global_state,
            has_init_function: file.has_init_function,
            has_main_function: file.has_main_function,
            reasons: Vec::new(),
            exported_functions: file.exported_functions.clone(),
            imports: file.imports.clone(),
            safety_score: 0,
            safety_level: SafetyLevel::UltraSafe,
        }
    }

    /// Bare record for a path, everything else zeroed.
    pub fn blank(path: &str) -> Self {
        let package_dir = path.rsplit_once('/').map(|(d, _)| d).unwrap_or("").to_string();
        Self {
            path: path.to_string(),
            package_name: package_dir.rsplit('/').next().unwrap_or("").to_string(),
            package_path: package_dir.clone(),
            package_dir,
            total_functions: 0,
            unreachable_functions: 0,
            total_lines: 0,
            has_interfaces: false,
            has_fx_usage: false,
            is_imported: false,
            has_tests: false,
            has_templates: false,
            is_critical: false,
            has_global_state: false,
            has_init_function: false,
            has_main_function: false,
            reasons: Vec::new(),
            exported_functions: Vec::new(),
            imports: Vec::new(),
            safety_score: 0,
            safety_level: SafetyLevel::UltraSafe,
        }
    }

    /// File name component of the path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Share of declared functions found unreachable, 0–100.
    pub fn unreachable_percent(&self) -> i64 {
        if self.total_functions == 0 {
            0
        } else {
            (self.unreachable_functions * 100 / self.total_functions) as i64
        }
    }

    pub fn add_reason(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(SafetyLevel::UltraSafe < SafetyLevel::PotentiallySafe);
        assert!(SafetyLevel::PotentiallySafe < SafetyLevel::Dangerous);
        assert!(SafetyLevel::Dangerous < SafetyLevel::NeverDelete);
        assert_eq!(SafetyLevel::ALL.iter().max(), Some(&SafetyLevel::NeverDelete));
    }

    #[test]
    fn test_level_serialization() {
        assert_eq!(
            serde_json::to_string(&SafetyLevel::PotentiallySafe).unwrap(),
            "\"POTENTIALLY_SAFE\""
        );
        assert_eq!(SafetyLevel::NeverDelete.to_string(), "NEVER_DELETE");
    }

    #[test]
    fn test_blank_and_percent() {
        let mut a = FileAnalysis::blank("internal/pricing/round.go");
        assert_eq!(a.package_dir, "internal/pricing");
        assert_eq!(a.package_name, "pricing");
        assert_eq!(a.file_name(), "round.go");
        assert_eq!(a.unreachable_percent(), 0);
        a.total_functions = 3;
        a.unreachable_functions = 2;
        assert_eq!(a.unreachable_percent(), 66);
    }
}
