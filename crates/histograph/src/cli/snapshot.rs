//! `histograph snapshot` command implementation.

use std::path::Path;

use colored::Colorize;
use histograph::{CallEdge, GraphSummary, MethodNode, analyze_working_tree};
use serde::Serialize;

use super::display;
use crate::WalkArgs;

#[derive(Serialize)]
struct GraphRecord {
    summary: GraphSummary,
    methods: Vec<MethodNode>,
    edges: Vec<CallEdge>,
}

/// Run the snapshot command.
pub fn run(repo: &Path, args: &WalkArgs, json: bool) -> Result<(), histograph::Error> {
    let config = super::load_config(repo, args)?;
    let analysis = analyze_working_tree(repo, &config)?;

    if json {
        return super::print_json(&GraphRecord {
            summary: analysis.graph.summary(),
            methods: analysis.graph.methods(),
            edges: analysis.graph.edges(),
        });
    }

    println!("{} {}", "Snapshot".cyan().bold(), repo.display());
    println!(
        "  {} source files, {} source roots, {} archives",
        analysis.snapshot.source_files.len(),
        analysis.snapshot.source_roots.len(),
        analysis.snapshot.classpath.len()
    );
    display::print_graph_stats(&analysis.graph, &analysis.build);
    display::print_diagnostics("Diagnostics", analysis.diagnostics());

    Ok(())
}
