//! Builder API and analysis orchestration.
//!
//! ```rust,ignore
//! use deadfx_core::prelude::*;
//!
//! let results = Deadfx::new("/path/to/service")
//!     .source_dir("internal")
//!     .verbose(true)
//!     .analyze()?;
//!
//! for file in results.files_at(SafetyLevel::UltraSafe) {
//!     println!("{} ({})", file.path, file.safety_score);
//! }
//! ```
//!
//! Pipeline: discover layout → load packages → call graph + import graph →
//! enumerate files under the source directory → per file (in parallel):
//! parse, extract, detect, reachability, import flag, score → sort.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::analysis::{FileAnalysis, SafetyLevel};
use crate::callgraph::{CallGraph, CallGraphStats};
use crate::config::{load_config, load_config_file, DeadfxConfig};
use crate::detect::{default_detectors, run_detectors, PatternDetector};
use crate::error::{DeadfxError, DeadfxResult};
use crate::imports::ImportGraph;
use crate::parse::{load_packages, parse_go_file, SkippedFile, SourceFile};
use crate::reachability::ReachabilityAnalyzer;
use crate::root::{path_to_normalized_string, ProjectLayout};
use crate::scan::gather_go_files_with_excludes;
use crate::score::SafetyScorer;

/// Builder for configuring a run.
#[derive(Debug, Clone)]
pub struct Deadfx {
    /// Project (Go module) root
    root: PathBuf,

    /// Configuration given programmatically
    config: Option<DeadfxConfig>,

    /// Explicit configuration file
    config_path: Option<PathBuf>,

    /// Overrides `config.source_dir`
    source_dir: Option<String>,

    /// Overrides `config.scoring.preserve_level_floors`
    preserve_level_floors: Option<bool>,

    /// Extra directory names pruned from walks
    excluded_dirs: Vec<String>,

    /// Render the call graph as DOT into the results
    callgraph_dot: bool,

    /// Log skipped files at warn instead of debug
    verbose: bool,
}

impl Deadfx {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: None,
            config_path: None,
            source_dir: None,
            preserve_level_floors: None,
            excluded_dirs: Vec::new(),
            callgraph_dot: false,
            verbose: false,
        }
    }

    /// Use this configuration instead of reading `deadfx.toml`.
    pub fn with_config(mut self, config: DeadfxConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Read configuration from this file instead of `deadfx.toml`.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Subdirectory whose files are classified.
    pub fn source_dir(mut self, dir: impl Into<String>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    /// `false` lets the score alone decide the level.
    pub fn preserve_level_floors(mut self, enabled: bool) -> Self {
        self.preserve_level_floors = Some(enabled);
        self
    }

    pub fn exclude_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.excluded_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn callgraph_dot(mut self, enabled: bool) -> Self {
        self.callgraph_dot = enabled;
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Effective configuration: explicit value, explicit file, project
    /// `deadfx.toml`, defaults; then builder overrides.
    fn resolve_config(&self, layout: &ProjectLayout) -> Result<DeadfxConfig> {
        let mut config = match (&self.config, &self.config_path) {
            (Some(config), _) => config.clone(),
            (None, Some(path)) => load_config_file(path).context("failed to read configuration")?,
            (None, None) => load_config(&layout.root)
                .context("failed to read configuration")?
                .unwrap_or_default(),
        };
        if let Some(dir) = &self.source_dir {
            config.source_dir = dir.clone();
        }
        if let Some(enabled) = self.preserve_level_floors {
            config.scoring.preserve_level_floors = enabled;
        }
        config.exclude.extend(self.excluded_dirs.iter().cloned());

        let dir = Path::new(&config.source_dir);
        if dir.is_absolute() || dir.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(DeadfxError::invalid_argument(format!(
                "source directory must be inside the project: {}",
                config.source_dir
            ))
            .into());
        }
        Ok(config)
    }

    /// Runs the analysis.
    ///
    /// Fails only when the module cannot be loaded or the source directory
    /// cannot be enumerated; single bad files end up in `Results::skipped`.
    pub fn analyze(&self) -> Result<Results> {
        // 1. Layout and configuration
        let layout = ProjectLayout::discover(&self.root).context("failed to load Go packages")?;
        let config = self.resolve_config(&layout)?;
        tracing::info!(
            root = %layout.root.display(),
            module = %layout.module_path,
            source_dir = %config.source_dir,
            "starting analysis"
        );

        // 2. Whole-module load
        let packages = load_packages(&layout, &config).context("failed to load Go packages")?;
        for skipped in &packages.skipped {
            self.log_skipped(skipped);
        }

        // 3. Graphs; problems are warnings
        let build = CallGraph::build(&packages, &config.di.rules);
        let (imports, import_warnings) = ImportGraph::build(&packages);
        let warnings: Vec<String> = build
            .warnings
            .iter()
            .chain(import_warnings.iter())
            .map(|w| w.to_string())
            .collect();
        for warning in &warnings {
            tracing::warn!(warning = %warning, "graph construction");
        }
        let graph = build.graph;

        // 4. Files to classify
        let source_root = match config.source_dir.trim_matches('/') {
            "" | "." => layout.root.clone(),
            dir => layout.root.join(dir),
        };
        let excludes: Vec<&str> = config.exclude.iter().map(String::as_str).collect();
        let files = gather_go_files_with_excludes(&source_root, &excludes)
            .context("failed to enumerate source files")?;

        // 5. Per-file stage over frozen graphs
        let stage = FileStage {
            layout: &layout,
            graph: &graph,
            imports: &imports,
            detectors: default_detectors(&config),
            scorer: SafetyScorer::new(config.scoring.clone(), config.heuristics.clone()),
        };
        let outcomes: Vec<DeadfxResult<FileAnalysis>> =
            files.par_iter().map(|path| stage.analyze(path)).collect();

        let mut analyzed = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (path, outcome) in files.iter().zip(outcomes) {
            match outcome {
                Ok(analysis) => analyzed.push(analysis),
                Err(e) if e.is_recoverable() => {
                    let skip = SkippedFile::new(path, &e);
                    self.log_skipped(&skip);
                    skipped.push(skip);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to analyze {}", path.display()))
                }
            }
        }

        // 6. Aggregate
        analyzed.sort_by(|a, b| {
            a.safety_score
                .cmp(&b.safety_score)
                .then_with(|| a.path.cmp(&b.path))
        });

        let results = Results {
            root: path_to_normalized_string(&layout.root),
            module_path: layout.module_path.clone(),
            source_dir: config.source_dir.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            counts: LevelCounts::from_files(&analyzed),
            total_files: analyzed.len(),
            total_functions: analyzed.iter().map(|a| a.total_functions).sum(),
            unreachable_functions: analyzed.iter().map(|a| a.unreachable_functions).sum(),
            callgraph: graph.stats(),
            warnings,
            skipped,
            callgraph_dot: self.callgraph_dot.then(|| graph.to_dot()),
            files: analyzed,
        };

        tracing::info!(
            files = results.total_files,
            skipped = results.skipped.len(),
            ultra_safe = results.counts.ultra_safe,
            "analysis complete"
        );
        Ok(results)
    }

    fn log_skipped(&self, skip: &SkippedFile) {
        if self.verbose {
            tracing::warn!(file = %skip.path, reason = %skip.reason, "skipped file");
        } else {
            tracing::debug!(file = %skip.path, reason = %skip.reason, "skipped file");
        }
    }
}

/// Shared read-only state of the per-file stage.
struct FileStage<'a> {
    layout: &'a ProjectLayout,
    graph: &'a CallGraph,
    imports: &'a ImportGraph<'a>,
    detectors: Vec<Box<dyn PatternDetector>>,
    scorer: SafetyScorer,
}

impl FileStage<'_> {
    fn analyze(&self, path: &Path) -> DeadfxResult<FileAnalysis> {
        let tree = parse_go_file(path)?;
        let source = SourceFile::extract(&tree, &self.layout.package_path(path));
        let mut analysis = FileAnalysis::new(&source, self.layout);

        run_detectors(&self.detectors, &tree, &mut analysis);
        ReachabilityAnalyzer::new(self.graph).analyze(&source, &mut analysis);

        let importers = self.imports.importers_of(&analysis.package_path);
        if !importers.is_empty() {
            analysis.is_imported = true;
            analysis.add_reason(format!("imported by {} package(s)", importers.len()));
        }

        self.scorer.score(&mut analysis);
        Ok(analysis)
    }
}

/// Number of files per safety level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    pub ultra_safe: usize,
    pub potentially_safe: usize,
    pub dangerous: usize,
    pub never_delete: usize,
}

impl LevelCounts {
    pub fn from_files(files: &[FileAnalysis]) -> Self {
        let mut counts = Self::default();
        for file in files {
            *counts.slot(file.safety_level) += 1;
        }
        counts
    }

    fn slot(&mut self, level: SafetyLevel) -> &mut usize {
        match level {
            SafetyLevel::UltraSafe => &mut self.ultra_safe,
            SafetyLevel::PotentiallySafe => &mut self.potentially_safe,
            SafetyLevel::Dangerous => &mut self.dangerous,
            SafetyLevel::NeverDelete => &mut self.never_delete,
        }
    }

    pub fn get(&self, level: SafetyLevel) -> usize {
        match level {
            SafetyLevel::UltraSafe => self.ultra_safe,
            SafetyLevel::PotentiallySafe => self.potentially_safe,
            SafetyLevel::Dangerous => self.dangerous,
            SafetyLevel::NeverDelete => self.never_delete,
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Results {
    pub root: String,
    pub module_path: String,
    pub source_dir: String,
    /// RFC 3339 UTC timestamp
    pub generated_at: String,

    /// Sorted ascending by score, ties by path
    pub files: Vec<FileAnalysis>,
    pub counts: LevelCounts,
    pub total_files: usize,
    pub total_functions: usize,
    pub unreachable_functions: usize,

    pub skipped: Vec<SkippedFile>,
    pub callgraph: CallGraphStats,
    /// Graph construction warnings
    pub warnings: Vec<String>,

    #[serde(skip)]
    pub callgraph_dot: Option<String>,
}

impl Results {
    pub fn files_at(&self, level: SafetyLevel) -> impl Iterator<Item = &FileAnalysis> {
        self.files.iter().filter(move |f| f.safety_level == level)
    }

    pub fn file(&self, path: &str) -> Option<&FileAnalysis> {
        self.files.iter().find(|f| f.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn create_test_module() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("deadfx_builder_test_{}_{}", std::process::id(), id));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(dir.join("internal/ledger")).expect("Failed to create test directory");
        fs::create_dir_all(dir.join("cmd/api")).expect("Failed to create test directory");

        fs::write(dir.join("go.mod"), "module example.com/shop\n\ngo 1.22\n").expect("Failed to write go.mod");
        fs::write(
            dir.join("cmd/api/main.go"),
            "package main\n\nimport \"example.com/shop/internal/ledger\"\n\nfunc main() {\n\tledger.Post()\n}\n",
        )
        .expect("Failed to write main.go");
        fs::write(
            dir.join("internal/ledger/post.go"),
            "package ledger\n\nfunc Post() {\n\tvalidate()\n}\n\nfunc validate() {}\n",
        )
        .expect("Failed to write post.go");
        fs::write(
            dir.join("internal/ledger/stale.go"),
            "package ledger\n\nfunc oldA() {}\n\nfunc oldB() {}\n",
        )
        .expect("Failed to write stale.go");
        fs::write(dir.join("internal/ledger/broken.go"), "package ledger\n\nfunc broken( {\n")
            .expect("Failed to write broken.go");
        dir
    }

    #[test]
    fn test_builder_basic() {
        let dir = create_test_module();
        let results = Deadfx::new(&dir).analyze().unwrap();

        assert_eq!(results.module_path, "example.com/shop");
        assert_eq!(results.total_files, 2);
        assert_eq!(results.skipped.len(), 1);
        assert!(results.skipped[0].path.ends_with("broken.go"));

        let stale = results.file("internal/ledger/stale.go").unwrap();
        assert_eq!(stale.unreachable_functions, 2);
        assert!(stale.is_imported);

        let post = results.file("internal/ledger/post.go").unwrap();
        assert_eq!(post.unreachable_functions, 0);
        assert_eq!(post.exported_functions, vec!["Post"]);

        assert!(results.files.windows(2).all(|w| w[0].safety_score <= w[1].safety_score));
        assert_eq!(results.counts.get(SafetyLevel::Dangerous), 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_literal_levels_override() {
        let dir = create_test_module();
        let floored = Deadfx::new(&dir).analyze().unwrap();
        let literal = Deadfx::new(&dir).preserve_level_floors(false).analyze().unwrap();

        let a = floored.file("internal/ledger/stale.go").unwrap();
        let b = literal.file("internal/ledger/stale.go").unwrap();
        assert_eq!(a.safety_score, b.safety_score);
        assert_eq!(a.safety_level, SafetyLevel::Dangerous);
        assert_eq!(b.safety_level, SafetyLevel::UltraSafe);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_source_dir_is_fatal() {
        let dir = create_test_module();
        let err = Deadfx::new(&dir).source_dir("pkg").analyze().unwrap_err();
        assert!(format!("{:#}", err).contains("failed to enumerate source files"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_source_dir_outside_project_rejected() {
        let dir = create_test_module();
        let err = Deadfx::new(&dir).source_dir("../elsewhere").analyze().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeadfxError>(),
            Some(DeadfxError::InvalidArgument { .. })
        ));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_module_is_fatal() {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("deadfx_builder_empty_{}_{}", std::process::id(), id));
        fs::create_dir_all(&dir).unwrap();
        let err = Deadfx::new(&dir).analyze().unwrap_err();
        assert!(format!("{:#}", err).contains("failed to load Go packages"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_callgraph_dot_on_request() {
        let dir = create_test_module();
        let results = Deadfx::new(&dir).callgraph_dot(true).analyze().unwrap();
        let dot = results.callgraph_dot.unwrap();
        assert!(dot.contains("example.com/shop/internal/ledger.Post"));
        assert!(Deadfx::new(&dir).analyze().unwrap().callgraph_dot.is_none());
        fs::remove_dir_all(&dir).ok();
    }
}
