//! Function call graph for a Go module.
//!
//! ```text
//! ┌─────────────────────┐     ┌─────────────────────┐
//! │     binder.rs       │     │     resolve.rs      │
//! │  ─────────────────  │     │  ─────────────────  │
//! │  Call sites, local  │────▶│  Module-wide decl   │
//! │  types, imports     │     │  tables, DI rules   │
//! └─────────────────────┘     └──────────┬──────────┘
//!                                        ▼
//!                             ┌─────────────────────┐
//!                             │      graph.rs       │
//!                             │  ─────────────────  │
//!                             │  Nodes, entry       │
//!                             │  points, edges,     │
//!                             │  reachability, DOT  │
//!                             └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use deadfx_core::callgraph::CallGraph;
//!
//! let build = CallGraph::build(&packages, &config.di.rules);
//! for warning in &build.warnings {
//!     tracing::warn!(%warning, "call graph");
//! }
//! let graph = build.graph;
//! let dead: Vec<_> = graph
//!     .entry_points()
//!     .keys()
//!     .filter(|f| !graph.is_reachable(f))
//!     .collect();
//! assert!(dead.is_empty());
//! ```

pub mod graph;
pub mod qualified;
pub mod resolve;

pub use graph::{CallGraph, CallGraphStats, EdgeKind, EntryReason, FunctionNode, GraphBuild};
pub use qualified::QualifiedFunction;
pub use resolve::{CallContext, CallResolution, ImportTable, Resolver};
