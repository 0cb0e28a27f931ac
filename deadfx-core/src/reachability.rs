//! Per-file reachability counts against a frozen call graph.

use crate::analysis::FileAnalysis;
use crate::callgraph::{CallGraph, QualifiedFunction};
use crate::parse::SourceFile;

/// Counts unreachable functions file by file. Read-only over the graph.
pub struct ReachabilityAnalyzer<'g> {
    graph: &'g CallGraph,
}

impl<'g> ReachabilityAnalyzer<'g> {
    pub fn new(graph: &'g CallGraph) -> Self {
        Self { graph }
    }

    /// Qualified names of the functions `file` declares.
    pub fn functions_of(file: &SourceFile) -> Vec<QualifiedFunction> {
        file.functions
            .iter()
            .map(|f| QualifiedFunction::new(&file.package_path, f.member()))
            .collect()
    }

    /// Declared functions of `file` that no entry point reaches.
    ///
    /// Functions absent from the graph (test files are not loaded into it)
    /// count as unreachable.
    pub fn unreachable_in(&self, file: &SourceFile) -> Vec<QualifiedFunction> {
        let reachable = self.graph.reachable_set();
        Self::functions_of(file)
            .into_iter()
            .filter(|f| !reachable.contains(f))
            .collect()
    }

    /// Sets `unreachable_functions` and records a reason.
    pub fn analyze(&self, file: &SourceFile, analysis: &mut FileAnalysis) {
        let unreachable = self.unreachable_in(file);
        analysis.unreachable_functions = unreachable.len();
        if analysis.total_functions > 0 {
            analysis.add_reason(format!(
                "{}/{} functions unreachable",
                unreachable.len(),
                analysis.total_functions
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::{EdgeKind, EntryReason, FunctionNode};
    use crate::parse::parse_go_source;
    use crate::root::ProjectLayout;

    const PKG: &str = "example.com/app/internal/pricing";

    fn source(src: &str) -> SourceFile {
        let tree = parse_go_source("/p/internal/pricing/round.go", src.to_string()).unwrap();
        SourceFile::extract(&tree, PKG)
    }

    #[test]
    fn test_counts_only_functions_of_the_file() {
        let file = source(
            "package pricing\n\nfunc Round() {\n\tfloor()\n}\n\nfunc floor() {}\n\nfunc (p *Price) ceil() {}\n",
        );
        let mut graph = CallGraph::new();
        for f in ReachabilityAnalyzer::functions_of(&file) {
            graph.add_function(f, FunctionNode::declared(&file.path, 1, false));
        }
        let sibling = QualifiedFunction::new(PKG, "orphanInOtherFile");
        graph.add_function(sibling.clone(), FunctionNode::declared("/p/internal/pricing/other.go", 1, false));
        let round = QualifiedFunction::new(PKG, "Round");
        graph.mark_entry(round.clone(), EntryReason::Exported);
        graph.add_edge(&round, &QualifiedFunction::new(PKG, "floor"), EdgeKind::Resolved);

        let analyzer = ReachabilityAnalyzer::new(&graph);
        let unreachable = analyzer.unreachable_in(&file);
        assert_eq!(unreachable, vec![QualifiedFunction::new(PKG, "Price.ceil")]);

        let mut analysis = FileAnalysis::new(&file, &ProjectLayout::new("/p", "example.com/app"));
        analyzer.analyze(&file, &mut analysis);
        assert_eq!(analysis.total_functions, 3);
        assert_eq!(analysis.unreachable_functions, 1);
        assert_eq!(analysis.reasons, vec!["1/3 functions unreachable"]);
        assert!(!graph.is_reachable(&sibling));
    }

    #[test]
    fn test_missing_from_graph_is_unreachable() {
        let file = source("package pricing\n\nfunc helper() {}\n");
        let graph = CallGraph::new();
        assert_eq!(ReachabilityAnalyzer::new(&graph).unreachable_in(&file).len(), 1);
    }
}
