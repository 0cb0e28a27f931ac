//! Syntax pattern detectors.
//!
//! Each detector walks a file's syntax tree once and annotates the
//! [`FileAnalysis`] with a flag and human-readable reasons. Detectors hold
//! only configuration, so one set is shared by every rayon worker.

mod fx;
mod template;
mod testing;

pub use fx::FxUsageDetector;
pub use template::TemplateUsageDetector;
pub use testing::TestUsageDetector;

use tree_sitter::Node;

use crate::analysis::FileAnalysis;
use crate::config::DeadfxConfig;
use crate::parse::SyntaxTree;

/// A stateless per-file pattern detector.
pub trait PatternDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Inspects `tree` and records findings on `analysis`.
    fn detect(&self, tree: &SyntaxTree, analysis: &mut FileAnalysis);
}

/// The standard detector set for a configuration.
pub fn default_detectors(config: &DeadfxConfig) -> Vec<Box<dyn PatternDetector>> {
    vec![
        Box::new(FxUsageDetector::new(
            config.di.framework_paths().map(str::to_string).collect(),
            config.heuristics.constructor_prefixes.clone(),
        )),
        Box::new(TemplateUsageDetector),
        Box::new(TestUsageDetector::new(config.heuristics.clone())),
    ]
}

/// Runs every detector over one file.
pub fn run_detectors(detectors: &[Box<dyn PatternDetector>], tree: &SyntaxTree, analysis: &mut FileAnalysis) {
    for detector in detectors {
        detector.detect(tree, analysis);
    }
}

/// Callee of a call expression as `(operand identifier, name)`.
///
/// `fx.Provide(..)` → `(Some("fx"), "Provide")`, `helper()` → `(None, "helper")`.
/// Calls on arbitrary expressions keep only the selected name.
pub(crate) fn callee<'t>(tree: &'t SyntaxTree, call: Node<'_>) -> Option<(Option<&'t str>, &'t str)> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some((None, tree.text(function))),
        "selector_expression" => {
            let field = tree.text(function.child_by_field_name("field")?);
            let operand = function
                .child_by_field_name("operand")
                .filter(|o| o.kind() == "identifier")
                .map(|o| tree.text(o));
            Some((operand, field))
        }
        _ => None,
    }
}

/// Pushes `reason` unless an identical one is already recorded.
pub(crate) fn add_unique(analysis: &mut FileAnalysis, reason: String) {
    if !analysis.reasons.contains(&reason) {
        analysis.reasons.push(reason);
    }
}
