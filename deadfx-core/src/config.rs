//! Configuration loading from deadfx.toml.
//!
//! Every table the classifier consults (critical packages, path keywords,
//! DI registration rules, score weights) lives here so tests and users can
//! inject their own.
//!
//! ```toml
//! source_dir = "internal"
//! exclude = ["mocks"]
//!
//! [scoring]
//! preserve_level_floors = false
//!
//! [heuristics]
//! critical_packages = ["config", "billing"]
//!
//! [[di.rules]]
//! import_path = "go.uber.org/fx"
//! methods = ["Provide", "Invoke"]
//! ```

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{DeadfxError, DeadfxResult};

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "deadfx.toml";

/// Import path of the uber-go/fx framework.
pub const FX_IMPORT_PATH: &str = "go.uber.org/fx";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadfxConfig {
    /// Subdirectory (relative to the project root) whose files are classified.
    pub source_dir: String,
    /// Extra directory names pruned from every walk.
    pub exclude: Vec<String>,
    pub scoring: ScoringConfig,
    pub heuristics: Heuristics,
    pub di: DiConfig,
}

impl Default for DeadfxConfig {
    fn default() -> Self {
        Self {
            source_dir: "internal".to_string(),
            exclude: Vec::new(),
            scoring: ScoringConfig::default(),
            heuristics: Heuristics::default(),
            di: DiConfig::default(),
        }
    }
}

/// Weights used by the safety scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub critical: i64,
    pub interfaces: i64,
    pub fx_usage: i64,
    pub imported: i64,
    pub tests: i64,
    pub templates: i64,
    /// Multiplied by the number of exported functions.
    pub exported_function: i64,
    pub init_or_setup: i64,
    pub entry_point: i64,
    pub global_state: i64,
    pub state_mutation: i64,
    /// Subtracted per percentage point of unreachable functions.
    pub unreachable_percent: i64,
    /// Subtracted for utility paths and small files.
    pub utility_bonus: i64,
    pub ultra_safe_below: i64,
    pub potentially_safe_below: i64,
    /// Keep the level forced by critical/dangerous signals as a lower bound
    /// on the score-derived level.
    pub preserve_level_floors: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            critical: 100_000,
            interfaces: 50_000,
            fx_usage: 20_000,
            imported: 10_000,
            tests: 5_000,
            templates: 3_000,
            exported_function: 1_500,
            init_or_setup: 5_000,
            entry_point: 10_000,
            global_state: 3_000,
            state_mutation: 8_000,
            unreachable_percent: 300,
            utility_bonus: 2_000,
            ultra_safe_below: 1_000,
            potentially_safe_below: 5_000,
            preserve_level_floors: true,
        }
    }
}

/// Keyword tables matched against paths and names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    /// Substrings of a project-relative package path that mark it critical.
    pub critical_packages: Vec<String>,
    /// Path substrings of pure utility code.
    pub utility_keywords: Vec<String>,
    /// Path substrings of code touching databases, files, network, caches,
    /// queues or sessions.
    pub state_keywords: Vec<String>,
    /// Path substrings hinting at package-level mutable state.
    pub global_keywords: Vec<String>,
    /// File-name substrings hinting at initialization code.
    pub init_keywords: Vec<String>,
    /// Directory names holding program entry points.
    pub entry_dirs: Vec<String>,
    /// Function name prefixes treated as DI constructors.
    pub constructor_prefixes: Vec<String>,
    /// Import paths (or prefixes) of testing support packages.
    pub test_packages: Vec<String>,
    /// File suffix of test files.
    pub test_file_suffix: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            critical_packages: strings(&[
                "sanitizer",
                "logger",
                "logging",
                "config",
                "database",
                "errors",
                "events",
                "middleware/auth",
                "middleware/session",
                "middleware/access",
                "validation",
                "validator",
                "response",
                "modules",
            ]),
            utility_keywords: strings(&[
                "utils", "util", "helper", "math", "string", "time", "format", "convert", "parse",
            ]),
            state_keywords: strings(&[
                "database",
                "repository",
                "store",
                "file",
                "storage",
                "network",
                "http",
                "client",
                "cache",
                "queue",
                "session",
            ]),
            global_keywords: strings(&["global", "registry", "singleton", "state"]),
            init_keywords: strings(&["init", "setup", "bootstrap"]),
            entry_dirs: strings(&["cmd"]),
            constructor_prefixes: strings(&["New", "Create", "Provide", "Make"]),
            test_packages: strings(&[
                "testing",
                "net/http/httptest",
                "github.com/stretchr/testify",
                "go.uber.org/mock",
                "github.com/golang/mock",
            ]),
            test_file_suffix: "_test.go".to_string(),
        }
    }
}

impl Heuristics {
    /// First critical package name contained in `package_dir`.
    pub fn critical_match(&self, package_dir: &str) -> Option<&str> {
        first_contained(&self.critical_packages, package_dir)
    }

    pub fn utility_match(&self, path: &str) -> Option<&str> {
        first_contained(&self.utility_keywords, path)
    }

    pub fn state_match(&self, path: &str) -> Option<&str> {
        first_contained(&self.state_keywords, path)
    }

    pub fn global_match(&self, path: &str) -> Option<&str> {
        first_contained(&self.global_keywords, path)
    }

    pub fn init_match(&self, file_name: &str) -> Option<&str> {
        first_contained(&self.init_keywords, file_name)
    }

    /// True if any directory component of `relative_path` is an entry directory.
    pub fn in_entry_dir(&self, relative_path: &str) -> bool {
        relative_path
            .split('/')
            .any(|part| self.entry_dirs.iter().any(|d| d == part))
    }

    pub fn is_constructor_name(&self, name: &str) -> bool {
        self.constructor_prefixes
            .iter()
            .any(|p| name.starts_with(p.as_str()))
    }

    /// Matches the import path exactly or as a parent path.
    pub fn is_test_package(&self, import_path: &str) -> bool {
        self.test_packages.iter().any(|p| {
            import_path == p
                || import_path
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

fn first_contained<'a>(keywords: &'a [String], haystack: &str) -> Option<&'a str> {
    let haystack = haystack.to_lowercase();
    keywords
        .iter()
        .find(|k| haystack.contains(&k.to_lowercase()))
        .map(|k| k.as_str())
}

/// DI framework registration rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiConfig {
    pub rules: Vec<DiRule>,
}

impl Default for DiConfig {
    fn default() -> Self {
        Self {
            rules: vec![DiRule::fx()],
        }
    }
}

impl DiConfig {
    /// Import paths of all configured frameworks.
    pub fn framework_paths(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.import_path.as_str())
    }
}

/// A registration call pattern that makes functions reachable through
/// reflection: `<alias of import_path>.<method>(...)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiRule {
    pub import_path: String,
    pub methods: Vec<String>,
    /// The function containing the call becomes an entry point.
    #[serde(default = "default_true")]
    pub marks_caller: bool,
    /// Function references passed as arguments become entry points.
    #[serde(default = "default_true")]
    pub marks_arguments: bool,
}

fn default_true() -> bool {
    true
}

impl DiRule {
    /// Provider, invoker, module option and annotation registration in fx.
    pub fn fx() -> Self {
        Self {
            import_path: FX_IMPORT_PATH.to_string(),
            methods: strings(&["Provide", "Invoke", "Options", "Module", "Annotate", "Decorate"]),
            marks_caller: true,
            marks_arguments: true,
        }
    }

    pub fn matches_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

/// Loads configuration from `deadfx.toml` in `root` if it exists.
pub fn load_config(root: &Path) -> DeadfxResult<Option<DeadfxConfig>> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Loads configuration from an explicit file.
pub fn load_config_file(path: &Path) -> DeadfxResult<DeadfxConfig> {
    let content = fs::read_to_string(path).map_err(|e| DeadfxError::config(path, e.to_string()))?;
    toml::from_str(&content).map_err(|e| DeadfxError::config(path, format!("invalid {}: {}", CONFIG_FILE_NAME, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_weights() {
        let cfg = DeadfxConfig::default();
        assert_eq!(cfg.source_dir, "internal");
        assert_eq!(cfg.scoring.critical, 100_000);
        assert_eq!(cfg.scoring.unreachable_percent, 300);
        assert!(cfg.scoring.preserve_level_floors);
        assert_eq!(cfg.di.rules, vec![DiRule::fx()]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: DeadfxConfig = toml::from_str(
            r#"
source_dir = "pkg"

[scoring]
preserve_level_floors = false
templates = 42
"#,
        )
        .unwrap();
        assert_eq!(cfg.source_dir, "pkg");
        assert!(!cfg.scoring.preserve_level_floors);
        assert_eq!(cfg.scoring.templates, 42);
        assert_eq!(cfg.scoring.fx_usage, 20_000);
        assert!(!cfg.heuristics.critical_packages.is_empty());
    }

    #[test]
    fn test_di_rule_defaults_to_marking() {
        let cfg: DeadfxConfig = toml::from_str(
            r#"
[[di.rules]]
import_path = "github.com/google/wire"
methods = ["NewSet", "Build"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.di.rules.len(), 1);
        assert!(cfg.di.rules[0].marks_caller);
        assert!(cfg.di.rules[0].marks_arguments);
        assert!(cfg.di.rules[0].matches_method("Build"));
    }

    #[test]
    fn test_heuristic_matching() {
        let h = Heuristics::default();
        assert_eq!(h.critical_match("internal/config/loader"), Some("config"));
        assert_eq!(h.critical_match("internal/billing"), None);
        assert!(h.in_entry_dir("cmd/server/main.go"));
        assert!(!h.in_entry_dir("internal/cmdline/x.go"));
        assert!(h.is_constructor_name("NewService"));
        assert!(!h.is_constructor_name("newService"));
        assert!(h.is_test_package("testing"));
        assert!(h.is_test_package("github.com/stretchr/testify/assert"));
        assert!(!h.is_test_package("testingx"));
    }

    #[test]
    fn test_load_config_missing_is_none() {
        let dir = std::env::temp_dir().join(format!("deadfx_cfg_missing_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(load_config(&dir).unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_invalid_is_config_error() {
        let dir = std::env::temp_dir().join(format!("deadfx_cfg_invalid_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CONFIG_FILE_NAME), "source_dir = [").unwrap();
        let err = load_config(&dir).unwrap_err();
        assert!(matches!(err, DeadfxError::Config { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }
}
