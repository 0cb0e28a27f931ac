use super::{add_unique, callee, PatternDetector};
use crate::analysis::FileAnalysis;
use crate::binder::visit;
use crate::parse::{imports_of, SyntaxTree};

fn mentions_template(s: &str) -> bool {
    s.to_ascii_lowercase().contains("template")
}

/// Flags calls, imports and struct fields mentioning templates.
pub struct TemplateUsageDetector;

impl PatternDetector for TemplateUsageDetector {
    fn name(&self) -> &'static str {
        "template"
    }

    fn detect(&self, tree: &SyntaxTree, analysis: &mut FileAnalysis) {
        for spec in imports_of(tree) {
            if mentions_template(&spec.path) {
                analysis.has_templates = true;
                add_unique(analysis, format!("imports {}", spec.path));
            }
        }

        visit(tree.root(), &mut |node| {
            match node.kind() {
                "call_expression" => {
                    if let Some((operand, name)) = callee(tree, node) {
                        let display = match operand {
                            Some(op) => format!("{}.{}", op, name),
                            None => name.to_string(),
                        };
                        if mentions_template(&display) {
                            analysis.has_templates = true;
                            add_unique(analysis, format!("template call {}", display));
                        }
                    }
                }
                "field_declaration" => {
                    let text = tree.text(node);
                    if mentions_template(text) {
                        analysis.has_templates = true;
                        let field = text.split_whitespace().next().unwrap_or(text);
                        add_unique(analysis, format!("template field {}", field));
                    }
                    return false;
                }
                _ => {}
            }
            true
        });
    }
}
