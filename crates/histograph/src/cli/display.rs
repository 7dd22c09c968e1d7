//! Common display utilities for CLI commands.

use colored::Colorize;
use histograph::{BuildReport, CallGraph, Diagnostic, MethodKey};

const MAX_DISPLAY_ITEMS: usize = 10;

/// Display changed methods with optional truncation.
///
/// Shows up to `MAX_DISPLAY_ITEMS` methods with bullet points. If there are
/// more, shows "... and N more".
pub fn print_changed(changed: &[MethodKey]) {
    if changed.is_empty() {
        println!("    {}", "no methods changed".dimmed());
        return;
    }

    for key in changed.iter().take(MAX_DISPLAY_ITEMS) {
        println!(
            "    {} {}{}{}",
            "•".dimmed(),
            key.file.dimmed(),
            "#".dimmed(),
            key.signature
        );
    }

    if changed.len() > MAX_DISPLAY_ITEMS {
        println!(
            "    {} ... and {} more",
            "•".dimmed(),
            changed.len() - MAX_DISPLAY_ITEMS
        );
    }
}

/// Display diagnostics under a heading, truncated to the first five.
pub fn print_diagnostics<'a>(heading: &str, diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
    let diagnostics: Vec<_> = diagnostics.into_iter().collect();
    if diagnostics.is_empty() {
        return;
    }

    println!("  {} ({}):", heading.yellow().bold(), diagnostics.len());
    for diagnostic in diagnostics.iter().take(5) {
        println!("    {} {diagnostic}", "•".yellow());
    }
    if diagnostics.len() > 5 {
        println!("    ... and {} more", diagnostics.len() - 5);
    }
}

/// One-line graph and build statistics.
pub fn print_graph_stats(graph: &CallGraph, build: &BuildReport) {
    println!(
        "  {} methods, {} edges, {} unresolved calls {}",
        graph.node_count().to_string().green(),
        graph.edge_count().to_string().green(),
        build.unresolved_calls,
        format!("({} threads, {:.2?})", build.threads, build.duration).dimmed()
    );
}
