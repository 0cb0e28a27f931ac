//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use deadfx_core::prelude::*;
//! ```

// Builder API
pub use crate::builder::{Deadfx, Results};

// Classification
pub use crate::analysis::{FileAnalysis, SafetyLevel};

// Errors
pub use crate::error::{DeadfxError, DeadfxResult};

// Configuration
pub use crate::config::{load_config, DeadfxConfig};

// Graphs
pub use crate::callgraph::{CallGraph, EntryReason, QualifiedFunction};
pub use crate::common::GraphTraversal;

// Rendering
pub use crate::report::{render_json, render_plain};
