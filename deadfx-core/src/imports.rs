//! Package import graph.
//!
//! Edges point from the imported package to the importer, so a package's
//! outgoing neighbours are exactly the packages that use it.
//!
//! Uses `DiGraphMap<&str, ()>` borrowing package paths from the loaded
//! [`PackageSet`]; nothing is cloned.

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::BTreeSet;

use crate::error::DeadfxError;
use crate::parse::PackageSet;

#[derive(Debug, Clone)]
pub struct ImportGraph<'a> {
    graph: DiGraphMap<&'a str, ()>,
}

impl<'a> ImportGraph<'a> {
    /// Builds the graph in one pass over every package's imports.
    ///
    /// Packages whose files disagree on the package name are reported as
    /// warnings; their edges are still recorded.
    pub fn build(packages: &'a PackageSet) -> (Self, Vec<DeadfxError>) {
        let mut graph = DiGraphMap::new();
        let mut warnings = Vec::new();

        for pkg in packages.packages.values() {
            graph.add_node(pkg.path.as_str());

            let names: BTreeSet<&str> = pkg.files.iter().map(|f| f.package_name.as_str()).collect();
            if names.len() > 1 {
                warnings.push(DeadfxError::graph(format!(
                    "package {} mixes package names: {}",
                    pkg.path,
                    names.into_iter().collect::<Vec<_>>().join(", ")
                )));
            }

            for imported in pkg.imports() {
                if imported != pkg.path {
                    graph.add_edge(imported, pkg.path.as_str(), ());
                }
            }
        }

        tracing::debug!(
            packages = graph.node_count(),
            edges = graph.edge_count(),
            "import graph built"
        );
        (Self { graph }, warnings)
    }

    /// True when at least one other package imports `package`.
    pub fn is_used_externally(&self, package: &str) -> bool {
        self.graph.contains_node(package)
            && self
                .graph
                .neighbors_directed(package, Direction::Outgoing)
                .next()
                .is_some()
    }

    /// Packages importing `package`, sorted.
    pub fn importers_of(&self, package: &str) -> Vec<&'a str> {
        // node keys borrow from the PackageSet, `package` may not
        let Some(node) = self.graph.nodes().find(|n| *n == package) else {
            return Vec::new();
        };
        let mut importers: Vec<&'a str> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        importers.sort_unstable();
        importers
    }

    /// Nodes, module packages and imported externals alike.
    pub fn package_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
