//! deadfx-core: reachability and deletion-safety analysis for Go codebases
//!
//! Finds functions no program entry point can reach, including functions
//! made live only by registration with a reflection-based dependency
//! injection framework (uber-go/fx), and classifies every file by how
//! safe it is to delete.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use deadfx_core::prelude::*;
//!
//! let results = Deadfx::new("/path/to/service").analyze()?;
//!
//! for file in results.files_at(SafetyLevel::UltraSafe) {
//!     println!("{} can go", file.path);
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`scan`]: Go file discovery
//! - [`root`]: go.mod discovery and import paths
//! - [`parse`]: tree-sitter parsing, per-file facts and package loading
//! - [`binder`]: syntactic scopes, call sites and type hints
//! - [`callgraph`]: qualified functions, call resolution, DI-aware call graph
//! - [`imports`]: package import graph
//! - [`detect`]: DI, template and test pattern detectors
//! - [`reachability`]: per-file unreachable counts
//! - [`score`]: weighted safety scoring
//! - [`builder`]: fluent builder API and orchestration
//! - [`report`]: plain text and JSON rendering
//! - [`config`]: `deadfx.toml`
//! - [`error`]: typed error handling

pub mod analysis;
pub mod binder;
pub mod builder;
pub mod callgraph;
pub mod common;
pub mod config;
pub mod detect;
pub mod error;
pub mod imports;
pub mod logging;
pub mod parse;
pub mod prelude;
pub mod reachability;
pub mod report;
pub mod root;
pub mod scan;
pub mod score;

// Common trait re-exports
pub use common::GraphTraversal;

// ============================================================================
// Explicit Re-exports
// ============================================================================

// Error types
pub use error::{DeadfxError, DeadfxResult, IoResultExt};

// Builder API
pub use builder::{Deadfx, LevelCounts, Results};

// Per-file record
pub use analysis::{FileAnalysis, SafetyLevel};

// Configuration
pub use config::{
    load_config, load_config_file, DeadfxConfig, DiConfig, DiRule, Heuristics, ScoringConfig,
    CONFIG_FILE_NAME, FX_IMPORT_PATH,
};

// Logging
pub use logging::init_structured_logging;

// Parsing and loading
pub use parse::{
    load_packages, parse_go_file, parse_go_source, FileFacts, Package, PackageSet, SkippedFile,
    SourceFile, SyntaxTree,
};

// Call graph
pub use callgraph::{
    CallContext, CallGraph, CallGraphStats, CallResolution, EdgeKind, EntryReason, FunctionNode,
    GraphBuild, ImportTable, QualifiedFunction, Resolver,
};

// Import graph
pub use imports::ImportGraph;

// Detectors, reachability and scoring
pub use detect::{default_detectors, run_detectors, PatternDetector};
pub use reachability::ReachabilityAnalyzer;
pub use score::{size_penalty, SafetyScorer};

// Reporting
pub use report::{render_json, render_plain};

// Layout and discovery
pub use root::{path_to_normalized_string, ProjectLayout};
pub use scan::{gather_go_files, gather_go_files_with_excludes, is_test_file};
