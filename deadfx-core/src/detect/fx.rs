use tree_sitter::Node;

use super::{add_unique, callee, PatternDetector};
use crate::analysis::FileAnalysis;
use crate::binder::visit;
use crate::callgraph::ImportTable;
use crate::parse::{imports_of, SyntaxTree};

/// Flags DI framework usage: framework imports, any call through the
/// framework alias, constructor-named functions and reflection inside them.
pub struct FxUsageDetector {
    framework_paths: Vec<String>,
    constructor_prefixes: Vec<String>,
}

impl FxUsageDetector {
    pub fn new(framework_paths: Vec<String>, constructor_prefixes: Vec<String>) -> Self {
        Self {
            framework_paths,
            constructor_prefixes,
        }
    }

    fn is_constructor(&self, name: &str) -> bool {
        self.constructor_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    fn scan_calls(
        &self,
        tree: &SyntaxTree,
        node: Node<'_>,
        imports: &ImportTable,
        constructor: Option<&str>,
        analysis: &mut FileAnalysis,
    ) {
        visit(node, &mut |n| {
            if n.kind() != "call_expression" {
                return true;
            }
            if let Some((Some(alias), method)) = callee(tree, n) {
                match imports.path_of(alias) {
                    Some(path) if self.framework_paths.iter().any(|p| p == path) => {
                        analysis.has_fx_usage = true;
                        add_unique(analysis, format!("calls {}.{}", alias, method));
                    }
                    Some("reflect") => {
                        if let Some(ctor) = constructor {
                            analysis.has_fx_usage = true;
                            add_unique(analysis, format!("reflection in constructor {}", ctor));
                        }
                    }
                    _ => {}
                }
            }
            true
        });
    }
}

impl PatternDetector for FxUsageDetector {
    fn name(&self) -> &'static str {
        "fx"
    }

    fn detect(&self, tree: &SyntaxTree, analysis: &mut FileAnalysis) {
        let specs = imports_of(tree);
        for spec in &specs {
            if self.framework_paths.contains(&spec.path) {
                analysis.has_fx_usage = true;
                add_unique(analysis, format!("imports {}", spec.path));
            }
        }
        let imports = ImportTable::new(&specs);

        let root = tree.root();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "function_declaration" | "method_declaration" => {
                    let name = node
                        .child_by_field_name("name")
                        .map(|n| tree.text(n))
                        .unwrap_or("");
                    let constructor = self.is_constructor(name).then_some(name);
                    if let Some(ctor) = constructor {
                        analysis.has_fx_usage = true;
                        add_unique(analysis, format!("constructor {}", ctor));
                    }
                    if let Some(body) = node.child_by_field_name("body") {
                        self.scan_calls(tree, body, &imports, constructor, analysis);
                    }
                }
                "var_declaration" => self.scan_calls(tree, node, &imports, None, analysis),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FX_IMPORT_PATH;
    use crate::parse::parse_go_source;

    fn run(src: &str) -> FileAnalysis {
        let tree = parse_go_source("internal/app/app.go", src.to_string()).unwrap();
        let detector = FxUsageDetector::new(
            vec![FX_IMPORT_PATH.to_string()],
            vec!["New".into(), "Create".into(), "Provide".into(), "Make".into()],
        );
        let mut analysis = FileAnalysis::blank("internal/app/app.go");
        detector.detect(&tree, &mut analysis);
        analysis
    }

    #[test]
    fn test_provide_call_and_import() {
        let a = run(
            "package app\n\nimport \"go.uber.org/fx\"\n\nvar Module = fx.Options(fx.Provide(newRepo))\n\nfunc newRepo() {}\n",
        );
        assert!(a.has_fx_usage);
        assert!(a.reasons.contains(&"imports go.uber.org/fx".to_string()));
        assert!(a.reasons.contains(&"calls fx.Provide".to_string()));
        assert!(a.reasons.contains(&"calls fx.Options".to_string()));
    }

    #[test]
    fn test_aliased_framework_any_method() {
        let a = run("package app\n\nimport di \"go.uber.org/fx\"\n\nfunc run() {\n\tdi.New().Run()\n}\n");
        assert!(a.reasons.contains(&"calls di.New".to_string()));
    }

    #[test]
    fn test_constructor_with_reflection() {
        let a = run(
            "package app\n\nimport \"reflect\"\n\nfunc NewThing(v any) {\n\treflect.TypeOf(v)\n}\n\nfunc other(v any) {\n\treflect.TypeOf(v)\n}\n",
        );
        assert!(a.has_fx_usage);
        assert_eq!(
            a.reasons,
            vec!["constructor NewThing", "reflection in constructor NewThing"]
        );
    }

    #[test]
    fn test_plain_file_is_clean() {
        let a = run("package app\n\nimport \"fmt\"\n\nfunc newThing() {\n\tfmt.Println()\n}\n");
        assert!(!a.has_fx_usage);
        assert!(a.reasons.is_empty());
    }
}
