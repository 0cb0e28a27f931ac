//! Call graph construction and reachability.
//!
//! Nodes are [`QualifiedFunction`]s, edges mean "the caller's body contains a
//! call (or a function reference) resolving to the callee".
//!
//! # Performance Characteristics
//!
//! - Build: O(|F| + |C|), one resolution per call site
//! - `is_reachable`: O(|V| + |E|) worst case, reverse DFS from the target
//! - `reachable_set`: O(|V| + |E|) once, cached in a `OnceLock` afterwards

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use super::resolve::{CallContext, CallResolution, ImportTable, Resolver};
use super::QualifiedFunction;
use crate::binder::CallSite;
use crate::common::GraphTraversal;
use crate::config::DiRule;
use crate::error::DeadfxError;
use crate::parse::PackageSet;

/// Why a function is treated as always reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    /// `func main()`
    ProcessEntry,
    /// `func init()`
    PackageInit,
    /// Upper-case name, callable from outside the package.
    Exported,
    /// Body contains a DI registration call.
    DiRegistration,
    /// Passed as an argument to a DI registration call.
    DiArgument,
    /// Called while initializing a package-level variable.
    VarInitializer,
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryReason::ProcessEntry => "process entry",
            EntryReason::PackageInit => "package init",
            EntryReason::Exported => "exported",
            EntryReason::DiRegistration => "DI registration",
            EntryReason::DiArgument => "DI-registered argument",
            EntryReason::VarInitializer => "package variable initializer",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Resolved,
    Approximated,
}

/// What is known about a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionNode {
    /// Declaring file; `None` for callees outside the loaded module
    /// (stdlib, third-party, approximated receiver keys).
    pub file: Option<PathBuf>,
    pub line: usize,
    pub exported: bool,
}

impl FunctionNode {
    pub fn declared(file: impl Into<PathBuf>, line: usize, exported: bool) -> Self {
        Self {
            file: Some(file.into()),
            line,
            exported,
        }
    }

    pub fn external() -> Self {
        Self {
            file: None,
            line: 0,
            exported: false,
        }
    }

    pub fn is_declared(&self) -> bool {
        self.file.is_some()
    }
}

/// Summary numbers reported with the results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallGraphStats {
    pub declared_functions: usize,
    pub external_functions: usize,
    pub edges: usize,
    pub approximated_edges: usize,
    pub entry_points: usize,
    pub reachable_functions: usize,
    pub unreachable_functions: usize,
}

/// A call graph with its entry points.
#[derive(Debug, Default)]
pub struct CallGraph {
    nodes: HashMap<QualifiedFunction, FunctionNode>,
    /// (caller, callee) → strongest kind seen
    edges: HashMap<(QualifiedFunction, QualifiedFunction), EdgeKind>,
    /// caller → callees
    forward: HashMap<QualifiedFunction, Vec<QualifiedFunction>>,
    /// callee → callers
    reverse: HashMap<QualifiedFunction, HashSet<QualifiedFunction>>,
    entry_points: BTreeMap<QualifiedFunction, EntryReason>,
    reachable: OnceLock<HashSet<QualifiedFunction>>,
}

/// A built graph plus the problems met while building it.
#[derive(Debug)]
pub struct GraphBuild {
    pub graph: CallGraph,
    pub warnings: Vec<DeadfxError>,
}

impl GraphTraversal for CallGraph {
    type Node = QualifiedFunction;

    fn neighbors(&self, node: &QualifiedFunction) -> Vec<QualifiedFunction> {
        self.forward.get(node).cloned().unwrap_or_default()
    }

    fn contains_node(&self, node: &QualifiedFunction) -> bool {
        self.nodes.contains_key(node)
    }
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph for a loaded module.
    ///
    /// Pass one declares every function and collects entry points, pass two
    /// resolves call sites into edges. Problems become warnings; the graph
    /// is returned in whatever state it reached.
    pub fn build(packages: &PackageSet, rules: &[DiRule]) -> GraphBuild {
        let resolver = Resolver::new(packages);
        let mut graph = Self::new();
        let mut warnings = Vec::new();

        for pkg in packages.packages.values() {
            for file in &pkg.files {
                for func in &file.functions {
                    let f = QualifiedFunction::new(&pkg.path, func.member());
                    let node = FunctionNode::declared(&file.path, func.line, func.exported);
                    // Go allows any number of init functions per package
                    if !graph.add_function(f.clone(), node) && func.member() != "init" {
                        warnings.push(DeadfxError::graph(format!(
                            "{} declared more than once (kept first, also in {})",
                            f,
                            file.path.display()
                        )));
                    }
                    if func.receiver.is_none() && func.name == "main" {
                        graph.mark_entry(f.clone(), EntryReason::ProcessEntry);
                    }
                    if func.receiver.is_none() && func.name == "init" {
                        graph.mark_entry(f.clone(), EntryReason::PackageInit);
                    }
                    if func.exported {
                        graph.mark_entry(f, EntryReason::Exported);
                    }
                }
            }
        }

        for pkg in packages.packages.values() {
            for file in &pkg.files {
                let imports = ImportTable::new(&file.imports);
                let ctx = CallContext {
                    package: &pkg.path,
                    imports: &imports,
                };

                for func in &file.functions {
                    let caller = QualifiedFunction::new(&pkg.path, func.member());
                    for call in &func.calls {
                        graph.apply_rules(Some(&caller), call, rules, &resolver, ctx);
                        let resolution = resolver.resolve(&call.shape, ctx);
                        graph.record(&caller, &resolution);
                        if let Some(target) = resolution.target() {
                            for candidate in resolver.implementations(target) {
                                graph.add_edge(&caller, candidate, EdgeKind::Approximated);
                            }
                        }
                    }
                    let references = func.calls.iter().flat_map(|c| &c.func_args).chain(&func.references);
                    for shape in references {
                        let referenced = resolver.resolve(shape, ctx);
                        if referenced.target().is_some_and(|t| resolver.is_declared(t)) {
                            graph.record(&caller, &referenced);
                        }
                    }
                }

                for call in &file.initializer_calls {
                    graph.apply_rules(None, call, rules, &resolver, ctx);
                }
                let initializer_shapes = file
                    .initializer_calls
                    .iter()
                    .flat_map(|c| std::iter::once(&c.shape).chain(&c.func_args))
                    .chain(&file.initializer_refs);
                for shape in initializer_shapes {
                    if let CallResolution::Resolved(target) = resolver.resolve(shape, ctx) {
                        if resolver.is_declared(&target) {
                            graph.mark_entry(target, EntryReason::VarInitializer);
                        }
                    }
                }
            }
        }

        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            entry_points = graph.entry_points.len(),
            warnings = warnings.len(),
            "call graph built"
        );
        GraphBuild { graph, warnings }
    }

    /// Marks entry points for a call that matches a DI rule.
    fn apply_rules(
        &mut self,
        caller: Option<&QualifiedFunction>,
        call: &CallSite,
        rules: &[DiRule],
        resolver: &Resolver,
        ctx: CallContext<'_>,
    ) {
        for rule in rules {
            if !Resolver::matches_rule(&call.shape, rule, ctx) {
                continue;
            }
            if rule.marks_caller {
                if let Some(caller) = caller {
                    self.mark_entry(caller.clone(), EntryReason::DiRegistration);
                }
            }
            if rule.marks_arguments {
                for arg in &call.func_args {
                    if let Some(target) = resolver.resolve(arg, ctx).target() {
                        if resolver.is_declared(target) {
                            self.mark_entry(target.clone(), EntryReason::DiArgument);
                        }
                    }
                }
            }
        }
    }

    /// Declares a function. Returns false if it was already declared.
    ///
    /// A node first seen as an external callee becomes declared.
    pub fn add_function(&mut self, f: QualifiedFunction, node: FunctionNode) -> bool {
        match self.nodes.get_mut(&f) {
            Some(existing) if existing.is_declared() => false,
            Some(existing) => {
                *existing = node;
                self.reachable.take();
                true
            }
            None => {
                self.forward.entry(f.clone()).or_default();
                self.reverse.entry(f.clone()).or_default();
                self.nodes.insert(f, node);
                self.reachable.take();
                true
            }
        }
    }

    /// Marks a declared function as an entry point; the first reason wins.
    /// Returns false for undeclared functions.
    pub fn mark_entry(&mut self, f: QualifiedFunction, reason: EntryReason) -> bool {
        if !self.nodes.get(&f).is_some_and(FunctionNode::is_declared) {
            return false;
        }
        if !self.entry_points.contains_key(&f) {
            self.entry_points.insert(f, reason);
            self.reachable.take();
        }
        true
    }

    /// Records the edge a resolution implies, if any.
    pub fn record(&mut self, caller: &QualifiedFunction, resolution: &CallResolution) {
        match resolution {
            CallResolution::Resolved(callee) => self.add_edge(caller, callee, EdgeKind::Resolved),
            CallResolution::Approximated(callee) => self.add_edge(caller, callee, EdgeKind::Approximated),
            CallResolution::Unresolved => {}
        }
    }

    /// Adds `caller → callee`. Unknown endpoints are seeded as external nodes.
    pub fn add_edge(&mut self, caller: &QualifiedFunction, callee: &QualifiedFunction, kind: EdgeKind) {
        for end in [caller, callee] {
            if !self.nodes.contains_key(end) {
                self.nodes.insert(end.clone(), FunctionNode::external());
                self.forward.entry(end.clone()).or_default();
                self.reverse.entry(end.clone()).or_default();
            }
        }

        let key = (caller.clone(), callee.clone());
        if let Some(existing) = self.edges.get_mut(&key) {
            if kind == EdgeKind::Resolved {
                *existing = EdgeKind::Resolved;
            }
            return;
        }
        self.edges.insert(key, kind);
        self.forward.entry(caller.clone()).or_default().push(callee.clone());
        self.reverse.entry(callee.clone()).or_default().insert(caller.clone());
        self.reachable.take();
    }

    pub fn contains(&self, f: &QualifiedFunction) -> bool {
        self.nodes.contains_key(f)
    }

    pub fn node(&self, f: &QualifiedFunction) -> Option<&FunctionNode> {
        self.nodes.get(f)
    }

    pub fn entry_points(&self) -> &BTreeMap<QualifiedFunction, EntryReason> {
        &self.entry_points
    }

    pub fn entry_reason(&self, f: &QualifiedFunction) -> Option<EntryReason> {
        self.entry_points.get(f).copied()
    }

    pub fn edge_kind(&self, caller: &QualifiedFunction, callee: &QualifiedFunction) -> Option<EdgeKind> {
        self.edges.get(&(caller.clone(), callee.clone())).copied()
    }

    /// Direct callees, in insertion order.
    pub fn callees_of(&self, f: &QualifiedFunction) -> &[QualifiedFunction] {
        self.forward.get(f).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct callers, sorted.
    pub fn callers_of(&self, f: &QualifiedFunction) -> Vec<&QualifiedFunction> {
        let mut callers: Vec<&QualifiedFunction> = self
            .reverse
            .get(f)
            .map(|set| set.iter().collect())
            .unwrap_or_default();
        callers.sort();
        callers
    }

    /// Single reachability query.
    ///
    /// Walks callers depth-first from `f` until an entry point is found,
    /// which is the same as asking whether some entry point reaches `f`
    /// along forward edges.
    pub fn is_reachable(&self, f: &QualifiedFunction) -> bool {
        if !self.nodes.contains_key(f) {
            return false;
        }
        let mut visited: HashSet<&QualifiedFunction> = HashSet::new();
        let mut stack = vec![f];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if self.entry_points.contains_key(current) {
                return true;
            }
            if let Some(callers) = self.reverse.get(current) {
                stack.extend(callers.iter().filter(|c| !visited.contains(*c)));
            }
        }
        false
    }

    /// Everything reachable from the entry points, computed once.
    pub fn reachable_set(&self) -> &HashSet<QualifiedFunction> {
        self.reachable
            .get_or_init(|| self.reachable_from(self.entry_points.keys().cloned()))
    }

    pub fn function_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_declared()).count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn stats(&self) -> CallGraphStats {
        let reachable = self.reachable_set();
        let declared = self.function_count();
        let reachable_declared = self
            .nodes
            .iter()
            .filter(|(f, n)| n.is_declared() && reachable.contains(*f))
            .count();
        CallGraphStats {
            declared_functions: declared,
            external_functions: self.nodes.len() - declared,
            edges: self.edges.len(),
            approximated_edges: self
                .edges
                .values()
                .filter(|k| **k == EdgeKind::Approximated)
                .count(),
            entry_points: self.entry_points.len(),
            reachable_functions: reachable_declared,
            unreachable_functions: declared - reachable_declared,
        }
    }

    /// Graphviz DOT export. Entry points are blue, unreachable functions
    /// grey, external callees dashed; approximated edges are dotted.
    pub fn to_dot(&self) -> String {
        let reachable = self.reachable_set();
        let mut dot = String::from("digraph CallGraph {\n");
        dot.push_str("    rankdir=LR;\n");
        dot.push_str("    node [shape=box, fontname=\"monospace\"];\n\n");

        let mut nodes: Vec<(&QualifiedFunction, &FunctionNode)> = self.nodes.iter().collect();
        nodes.sort_by(|a, b| a.0.cmp(b.0));
        for (f, node) in nodes {
            let style = if !node.is_declared() {
                "style=dashed"
            } else if self.entry_points.contains_key(f) {
                "style=filled fillcolor=lightblue"
            } else if reachable.contains(f) {
                "style=filled fillcolor=white"
            } else {
                "style=filled fillcolor=lightgray"
            };
            dot.push_str(&format!(
                "    \"{}\" [label=\"{}\" {}];\n",
                escape(&f.to_string()),
                escape(&f.member),
                style
            ));
        }

        dot.push('\n');

        let mut edges: Vec<(&(QualifiedFunction, QualifiedFunction), &EdgeKind)> = self.edges.iter().collect();
        edges.sort_by(|a, b| a.0.cmp(b.0));
        for ((from, to), kind) in edges {
            let attrs = match kind {
                EdgeKind::Resolved => "",
                EdgeKind::Approximated => " [style=dotted]",
            };
            dot.push_str(&format!(
                "    \"{}\" -> \"{}\"{};\n",
                escape(&from.to_string()),
                escape(&to.to_string()),
                attrs
            ));
        }

        dot.push_str("}\n");
        dot
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
