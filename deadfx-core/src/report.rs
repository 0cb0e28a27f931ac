//! Output formatting - plaintext and JSON.

use std::fmt::Write as _;

use crate::analysis::SafetyLevel;
use crate::builder::Results;

/// Renders files grouped by level, safest first, with score and reasons.
pub fn render_plain(results: &Results) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "deadfx report for {} ({})",
        results.module_path, results.source_dir
    );
    let _ = writeln!(
        out,
        "{} files, {} functions, {} unreachable",
        results.total_files, results.total_functions, results.unreachable_functions
    );

    for level in SafetyLevel::ALL {
        let count = results.counts.get(level);
        if count == 0 {
            continue;
        }
        let _ = writeln!(out, "\n{} ({}):", level, count);
        for file in results.files_at(level) {
            let _ = writeln!(
                out,
                "- {} [score {}, {}/{} unreachable]",
                file.path, file.safety_score, file.unreachable_functions, file.total_functions
            );
            for reason in &file.reasons {
                let _ = writeln!(out, "    {}", reason);
            }
        }
    }

    if results.files.is_empty() {
        let _ = writeln!(out, "\nNo Go files analyzed.");
    }

    if !results.skipped.is_empty() {
        let _ = writeln!(out, "\nSKIPPED ({}):", results.skipped.len());
        for skip in &results.skipped {
            let _ = writeln!(out, "- {}: {}", skip.path, skip.reason);
        }
    }

    if !results.warnings.is_empty() {
        let _ = writeln!(out, "\nWARNINGS ({}):", results.warnings.len());
        for warning in &results.warnings {
            let _ = writeln!(out, "- {}", warning);
        }
    }

    let stats = &results.callgraph;
    let _ = writeln!(
        out,
        "\ncall graph: {} functions, {} edges ({} approximated), {} entry points, {} reachable",
        stats.declared_functions,
        stats.edges,
        stats.approximated_edges,
        stats.entry_points,
        stats.reachable_functions
    );
    out
}

/// Pretty JSON of the whole result.
pub fn render_json(results: &Results) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}
