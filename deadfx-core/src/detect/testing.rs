use regex::Regex;

use super::{add_unique, callee, PatternDetector};
use crate::analysis::FileAnalysis;
use crate::binder::visit;
use crate::config::Heuristics;
use crate::parse::{imports_of, SyntaxTree};

/// `go test` naming rule: the prefix alone, or followed by a rune that is
/// not a lower-case letter.
const TEST_FUNCTION_PATTERN: &str = r"^(Test|Benchmark|Example|Fuzz)(\P{Ll}|$)";

/// Flags test files, test functions, testing imports and assertion calls.
pub struct TestUsageDetector {
    heuristics: Heuristics,
    test_name: Regex,
}

impl TestUsageDetector {
    pub fn new(heuristics: Heuristics) -> Self {
        Self {
            heuristics,
            test_name: Regex::new(TEST_FUNCTION_PATTERN).expect("Hardcoded regex pattern is valid"),
        }
    }

    pub fn is_test_function(&self, name: &str) -> bool {
        self.test_name.is_match(name)
    }
}

impl PatternDetector for TestUsageDetector {
    fn name(&self) -> &'static str {
        "testing"
    }

    fn detect(&self, tree: &SyntaxTree, analysis: &mut FileAnalysis) {
        if analysis.path.ends_with(&self.heuristics.test_file_suffix) {
            analysis.has_tests = true;
            add_unique(analysis, "test file".to_string());
        }

        for spec in imports_of(tree) {
            if self.heuristics.is_test_package(&spec.path) {
                analysis.has_tests = true;
                add_unique(analysis, format!("imports {}", spec.path));
            }
        }

        visit(tree.root(), &mut |node| {
            match node.kind() {
                "function_declaration" => {
                    if let Some(name) = node.child_by_field_name("name").map(|n| tree.text(n)) {
                        if self.is_test_function(name) {
                            analysis.has_tests = true;
                            add_unique(analysis, format!("test function {}", name));
                        }
                    }
                }
                "call_expression" => {
                    if let Some((operand, name)) = callee(tree, node) {
                        let lowered = format!("{}.{}", operand.unwrap_or(""), name).to_ascii_lowercase();
                        if lowered.contains("assert") || lowered.contains("require") {
                            analysis.has_tests = true;
                            let shown = match operand {
                                Some(op) => format!("{}.{}", op, name),
                                None => name.to_string(),
                            };
                            add_unique(analysis, format!("assertion {}", shown));
                        }
                    }
                }
                _ => {}
            }
            true
        });
    }
}
