//! deadfx CLI - dead code and deletion-safety report for Go projects.
//!
//! Features:
//! - go.mod-aware package loading
//! - DI registration (uber-go/fx) treated as reachability
//! - Per-file safety level with the reasons behind the score
//! - Plain or JSON report, optional Graphviz DOT call graph

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use deadfx_core::{init_structured_logging, render_json, render_plain, Deadfx};

#[derive(Parser, Debug)]
#[command(author, version, about = "Dead code and deletion-safety report for Go projects using uber-go/fx")]
pub struct Cli {
    /// Path to the root of the Go module
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Subdirectory whose files are classified (default from deadfx.toml, else "internal")
    #[arg(long)]
    source_dir: Option<String>,

    /// Configuration file (default: deadfx.toml in the project root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log progress and skipped files
    #[arg(long, short)]
    verbose: bool,

    /// Write the call graph in Graphviz DOT format to a file
    #[arg(long, value_name = "FILE")]
    callgraph_dot: Option<PathBuf>,

    /// Let the score alone decide each level (no floor from critical or dangerous signals)
    #[arg(long)]
    literal_levels: bool,

    /// Extra directory names to skip
    #[arg(long, num_args = 1..)]
    exclude: Vec<String>,
}

impl Cli {
    fn builder(&self) -> Deadfx {
        let mut builder = Deadfx::new(&self.path)
            .verbose(self.verbose)
            .callgraph_dot(self.callgraph_dot.is_some())
            .exclude_dirs(self.exclude.iter().cloned());
        if let Some(dir) = &self.source_dir {
            builder = builder.source_dir(dir.clone());
        }
        if let Some(path) = &self.config {
            builder = builder.config_file(path.clone());
        }
        if self.literal_levels {
            builder = builder.preserve_level_floors(false);
        }
        builder
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // JSON to stderr, respects RUST_LOG
    init_structured_logging(cli.verbose);

    let results = cli
        .builder()
        .analyze()
        .with_context(|| format!("Analysis failed for: {}", cli.path.display()))?;

    if let (Some(path), Some(dot)) = (&cli.callgraph_dot, &results.callgraph_dot) {
        fs::write(path, dot)
            .with_context(|| format!("Failed to write call graph to {}", path.display()))?;
    }

    let report = if cli.json {
        render_json(&results).context("Failed to serialize results to JSON")?
    } else {
        render_plain(&results)
    };

    match &cli.output {
        Some(path) => fs::write(path, report)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => print!("{}", report),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["deadfx"]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert!(!cli.json);
        assert!(!cli.literal_levels);
        assert!(cli.source_dir.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::parse_from([
            "deadfx",
            "/srv/shop",
            "--source-dir",
            "pkg",
            "--config",
            "ci.toml",
            "--json",
            "--output",
            "report.json",
            "--verbose",
            "--callgraph-dot",
            "calls.dot",
            "--literal-levels",
            "--exclude",
            "gen",
            "mocks",
        ]);
        assert_eq!(cli.path, PathBuf::from("/srv/shop"));
        assert_eq!(cli.source_dir.as_deref(), Some("pkg"));
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
        assert!(cli.json && cli.verbose && cli.literal_levels);
        assert_eq!(cli.output, Some(PathBuf::from("report.json")));
        assert_eq!(cli.callgraph_dot, Some(PathBuf::from("calls.dot")));
        assert_eq!(cli.exclude, vec!["gen", "mocks"]);
    }
}
