//! Shared graph traversal abstraction.
//!
//! Graphs expose their outgoing neighbours; the multi-source BFS is written
//! once here and reused by the call graph and by tests over toy graphs.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Forward traversal over a directed graph.
pub trait GraphTraversal {
    /// Node identifier.
    type Node: Clone + Eq + Hash;

    /// Outgoing neighbours of `node`.
    fn neighbors(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn contains_node(&self, node: &Self::Node) -> bool;

    /// Multi-source BFS: every node reachable from any root, roots included.
    ///
    /// O(|V| + |E|) however many roots are given. Roots missing from the
    /// graph are ignored.
    fn reachable_from<I>(&self, roots: I) -> HashSet<Self::Node>
    where
        I: IntoIterator<Item = Self::Node>,
    {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        for root in roots {
            if self.contains_node(&root) && visited.insert(root.clone()) {
                queue.push_back(root);
            }
        }

        while let Some(node) = queue.pop_front() {
            for next in self.neighbors(&node) {
                if visited.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }

        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Toy {
        edges: HashMap<&'static str, Vec<&'static str>>,
    }

    impl Toy {
        fn edge(mut self, from: &'static str, to: &'static str) -> Self {
            self.edges.entry(from).or_default().push(to);
            self.edges.entry(to).or_default();
            self
        }
    }

    impl GraphTraversal for Toy {
        type Node = &'static str;

        fn neighbors(&self, node: &&'static str) -> Vec<&'static str> {
            self.edges.get(node).cloned().unwrap_or_default()
        }

        fn contains_node(&self, node: &&'static str) -> bool {
            self.edges.contains_key(node)
        }
    }

    #[test]
    fn test_no_roots() {
        let g = Toy::default().edge("main", "run");
        assert!(g.reachable_from(Vec::new()).is_empty());
    }

    #[test]
    fn test_chain_and_branches() {
        let g = Toy::default()
            .edge("main", "run")
            .edge("run", "serve")
            .edge("init", "register")
            .edge("orphan", "helper");
        let reached = g.reachable_from(["main", "init"]);
        assert_eq!(reached.len(), 5);
        assert!(!reached.contains("orphan"));
        assert!(!reached.contains("helper"));
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let g = Toy::default()
            .edge("even", "odd")
            .edge("odd", "even")
            .edge("even", "even");
        assert_eq!(g.reachable_from(["even"]).len(), 2);
    }

    #[test]
    fn test_unknown_root_ignored() {
        let g = Toy::default().edge("main", "run");
        let reached = g.reachable_from(["main", "ghost"]);
        assert_eq!(reached.len(), 2);
    }
}
