//! Source loading: Go files into syntax trees and bound facts.
//!
//! Two entry points mirror how the analysis consumes sources:
//! - [`load_packages`] parses the whole module once (in parallel) and groups
//!   the bound facts by package for graph construction
//! - [`parse_go_file`] parses one file on demand for the per-file detectors
//!
//! A single bad file never aborts a load: it is recorded as skipped. Only a
//! failure to enumerate the module (or an empty module) is fatal.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

use crate::binder::{visit, CallShape, CallSite, FileScope, FunctionFacts, ImportSpec, TypeHint, TypeRef};
use crate::config::DeadfxConfig;
use crate::error::{DeadfxError, DeadfxResult, IoResultExt};
use crate::root::{path_to_normalized_string, ProjectLayout};
use crate::scan::{gather_go_files_with_excludes, is_test_file};

/// Files larger than this are skipped to keep memory bounded.
const MAX_FILE_SIZE: u64 = 10_000_000;

/// A parsed Go file that owns its source text.
pub struct SyntaxTree {
    pub path: PathBuf,
    pub source: String,
    tree: Tree,
}

impl SyntaxTree {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        crate::binder::node_text(node, &self.source)
    }

    /// Physical line count.
    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }
}

impl std::fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("path", &self.path)
            .field("bytes", &self.source.len())
            .finish()
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    let mut found = None;
    visit(node, &mut |n| {
        if found.is_some() {
            return false;
        }
        if n.is_error() || n.is_missing() {
            found = Some(n);
            return false;
        }
        n.has_error()
    });
    found
}

/// Parses Go source text. Trees containing syntax errors are rejected.
pub fn parse_go_source(path: impl Into<PathBuf>, source: String) -> DeadfxResult<SyntaxTree> {
    let path = path.into();
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::language())
        .map_err(|e| DeadfxError::parse(&path, format!("grammar unavailable: {}", e)))?;
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| DeadfxError::parse(&path, "parser produced no tree"))?;

    if let Some(err) = first_error(tree.root_node()) {
        let pos = err.start_position();
        let message = if err.is_missing() {
            format!("missing {}", err.kind())
        } else {
            "syntax error".to_string()
        };
        return Err(DeadfxError::parse_at(&path, message, pos.row + 1, pos.column + 1));
    }

    Ok(SyntaxTree { path, source, tree })
}

/// Reads and parses a single Go file.
pub fn parse_go_file(path: &Path) -> DeadfxResult<SyntaxTree> {
    let size = fs::metadata(path).with_path(path)?.len();
    if size > MAX_FILE_SIZE {
        return Err(DeadfxError::parse(
            path,
            format!("file too large ({} bytes, max {})", size, MAX_FILE_SIZE),
        ));
    }
    let source = fs::read_to_string(path).with_path(path)?;
    parse_go_source(path, source)
}

/// A function or method declared in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredFunction {
    pub name: String,
    pub receiver: Option<String>,
    pub exported: bool,
    pub line: usize,
}

impl DeclaredFunction {
    /// `Name` or `Receiver.Name`.
    pub fn member(&self) -> String {
        match &self.receiver {
            Some(recv) => format!("{}.{}", recv, self.name),
            None => self.name.clone(),
        }
    }
}

/// Everything bound from one file.
#[derive(Debug, Clone)]
pub struct FileFacts {
    pub path: PathBuf,
    pub package_name: String,
    pub package_path: String,
    pub line_count: usize,
    pub imports: Vec<ImportSpec>,
    pub functions: Vec<FunctionFacts>,
    /// struct type name → field name → field type
    pub structs: HashMap<String, HashMap<String, TypeRef>>,
    /// package-level variable → type hint
    pub globals: HashMap<String, Option<TypeHint>>,
    /// Calls inside package-level `var` initializers.
    pub initializer_calls: Vec<CallSite>,
    /// Functions named as package-level variable values (`var h = serve`).
    pub initializer_refs: Vec<CallShape>,
    pub interfaces: Vec<String>,
}

impl FileFacts {
    /// Binds every top-level declaration of `tree`.
    pub fn extract(tree: &SyntaxTree, package_path: &str) -> Self {
        let root = tree.root();
        let mut cursor = root.walk();
        let top: Vec<Node<'_>> = root.named_children(&mut cursor).collect();

        let mut package_name = String::new();
        let mut imports = Vec::new();
        for node in &top {
            match node.kind() {
                "package_clause" => {
                    if let Some(name) = node.named_child(0) {
                        package_name = tree.text(name).to_string();
                    }
                }
                "import_declaration" => collect_imports(tree, *node, &mut imports),
                _ => {}
            }
        }

        let scope = FileScope::new(&tree.source, package_path, &imports);
        let mut functions = Vec::new();
        let mut structs = HashMap::new();
        let mut globals = HashMap::new();
        let mut interfaces = Vec::new();
        let mut initializer_calls = Vec::new();
        let mut initializer_refs = Vec::new();

        for node in &top {
            match node.kind() {
                "function_declaration" | "method_declaration" => {
                    if let Some(facts) = scope.function(*node) {
                        functions.push(facts);
                    }
                }
                "type_declaration" => {
                    let mut c = node.walk();
                    for spec in node.named_children(&mut c) {
                        let (Some(name), Some(ty)) =
                            (spec.child_by_field_name("name"), spec.child_by_field_name("type"))
                        else {
                            continue;
                        };
                        let name = tree.text(name).to_string();
                        match ty.kind() {
                            "struct_type" => {
                                structs.insert(name, scope.struct_fields(ty));
                            }
                            "interface_type" => interfaces.push(name),
                            _ => {}
                        }
                    }
                }
                "var_declaration" => {
                    globals.extend(scope.globals(*node));
                    let body = scope.initializer(*node);
                    initializer_calls.extend(body.calls);
                    initializer_refs.extend(body.references);
                }
                _ => {}
            }
        }

        Self {
            path: tree.path.clone(),
            package_name,
            package_path: package_path.to_string(),
            line_count: tree.line_count(),
            imports,
            functions,
            structs,
            globals,
            initializer_calls,
            initializer_refs,
            interfaces,
        }
    }
}

/// Import specs of a parsed file.
pub fn imports_of(tree: &SyntaxTree) -> Vec<ImportSpec> {
    let root = tree.root();
    let mut cursor = root.walk();
    let mut imports = Vec::new();
    for node in root.named_children(&mut cursor) {
        if node.kind() == "import_declaration" {
            collect_imports(tree, node, &mut imports);
        }
    }
    imports
}

fn collect_imports(tree: &SyntaxTree, decl: Node<'_>, out: &mut Vec<ImportSpec>) {
    visit(decl, &mut |node| {
        if node.kind() != "import_spec" {
            return true;
        }
        if let Some(path) = node.child_by_field_name("path") {
            let path = tree.text(path).trim_matches(|c| c == '"' || c == '`').to_string();
            let alias = node
                .child_by_field_name("name")
                .map(|n| tree.text(n).to_string());
            out.push(ImportSpec { path, alias });
        }
        false
    });
}

/// Per-file summary consumed by detectors and the scorer.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub package_path: String,
    pub package_name: String,
    pub total_lines: usize,
    pub functions: Vec<DeclaredFunction>,
    pub exported_functions: Vec<String>,
    pub imports: Vec<String>,
    pub has_interfaces: bool,
    /// Top-level `var` declaration present.
    pub has_global_state: bool,
    /// Top-level `func init()` present.
    pub has_init_function: bool,
    /// `func main()` present.
    pub has_main_function: bool,
}

impl SourceFile {
    pub fn extract(tree: &SyntaxTree, package_path: &str) -> Self {
        Self::from_facts(&FileFacts::extract(tree, package_path))
    }

    pub fn from_facts(facts: &FileFacts) -> Self {
        let functions: Vec<DeclaredFunction> = facts
            .functions
            .iter()
            .map(|f| DeclaredFunction {
                name: f.name.clone(),
                receiver: f.receiver.clone(),
                exported: f.exported,
                line: f.line,
            })
            .collect();
        let plain = |name: &str| functions.iter().any(|f| f.receiver.is_none() && f.name == name);

        Self {
            path: facts.path.clone(),
            package_path: facts.package_path.clone(),
            package_name: facts.package_name.clone(),
            total_lines: facts.line_count,
            exported_functions: functions
                .iter()
                .filter(|f| f.exported)
                .map(|f| f.name.clone())
                .collect(),
            imports: facts.imports.iter().map(|i| i.path.clone()).collect(),
            has_interfaces: !facts.interfaces.is_empty(),
            has_global_state: !facts.globals.is_empty(),
            has_init_function: plain("init"),
            has_main_function: plain("main"),
            functions,
        }
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

/// All files of one Go package (one directory).
#[derive(Debug, Clone)]
pub struct Package {
    pub path: String,
    pub name: String,
    pub files: Vec<FileFacts>,
}

impl Package {
    /// Distinct import paths over all files.
    pub fn imports(&self) -> BTreeSet<&str> {
        self.files
            .iter()
            .flat_map(|f| f.imports.iter().map(|i| i.path.as_str()))
            .collect()
    }
}

/// A file the loader could not use.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

impl SkippedFile {
    pub fn new(path: &Path, err: &DeadfxError) -> Self {
        Self {
            path: path_to_normalized_string(path),
            reason: err.to_string(),
        }
    }
}

/// The loaded module.
#[derive(Debug, Clone)]
pub struct PackageSet {
    pub layout: ProjectLayout,
    pub packages: BTreeMap<String, Package>,
    pub skipped: Vec<SkippedFile>,
}

impl PackageSet {
    /// Groups already-bound files by package path.
    pub fn from_files(layout: ProjectLayout, files: Vec<FileFacts>) -> Self {
        let mut packages: BTreeMap<String, Package> = BTreeMap::new();
        for file in files {
            packages
                .entry(file.package_path.clone())
                .or_insert_with(|| Package {
                    path: file.package_path.clone(),
                    name: file.package_name.clone(),
                    files: Vec::new(),
                })
                .files
                .push(file);
        }
        Self {
            layout,
            packages,
            skipped: Vec::new(),
        }
    }

    pub fn get(&self, package_path: &str) -> Option<&Package> {
        self.packages.get(package_path)
    }

    pub fn file_count(&self) -> usize {
        self.packages.values().map(|p| p.files.len()).sum()
    }
}

/// Loads every non-test Go file of the module.
///
/// Test files are left out, as a Go package loader does by default; they
/// are still classified file by file by the orchestrator.
pub fn load_packages(layout: &ProjectLayout, config: &DeadfxConfig) -> DeadfxResult<PackageSet> {
    let excludes: Vec<&str> = config.exclude.iter().map(String::as_str).collect();
    let files = gather_go_files_with_excludes(&layout.root, &excludes)
        .map_err(|e| DeadfxError::load(&layout.root, format!("cannot enumerate module: {}", e)))?;

    let suffix = config.heuristics.test_file_suffix.as_str();
    let outcomes: Vec<Result<FileFacts, SkippedFile>> = files
        .par_iter()
        .filter(|path| !is_test_file(path, suffix))
        .map(|path| {
            let package_path = layout.package_path(path);
            parse_go_file(path)
                .map(|tree| FileFacts::extract(&tree, &package_path))
                .map_err(|e| {
                    tracing::debug!(file = %path.display(), error = %e, "skipping file");
                    SkippedFile::new(path, &e)
                })
        })
        .collect();

    let mut parsed = Vec::with_capacity(outcomes.len());
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(facts) => parsed.push(facts),
            Err(skip) => skipped.push(skip),
        }
    }

    if parsed.is_empty() {
        return Err(DeadfxError::load(
            &layout.root,
            format!("no loadable Go packages ({} files skipped)", skipped.len()),
        ));
    }

    let mut set = PackageSet::from_files(layout.clone(), parsed);
    set.skipped = skipped;
    tracing::info!(
        packages = set.packages.len(),
        files = set.file_count(),
        skipped = set.skipped.len(),
        "loaded Go packages"
    );
    Ok(set)
}
