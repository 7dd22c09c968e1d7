//! `histograph walk` command implementation.

use std::path::Path;

use colored::Colorize;
use histograph::{
    BuildReport, CommitAnalysis, CommitInfo, CommitWalker, CorrelationReport, Diagnostic,
    GraphSummary,
};
use serde::Serialize;
use tracing::warn;

use super::display;
use crate::WalkArgs;

/// One line of `--json` output.
#[derive(Serialize)]
struct StepRecord<'a> {
    commit: &'a CommitInfo,
    graph: GraphSummary,
    build: &'a BuildReport,
    correlation: &'a CorrelationReport,
    parse_diagnostics: &'a [Diagnostic],
}

impl<'a> StepRecord<'a> {
    fn new(step: &'a CommitAnalysis) -> Self {
        Self {
            commit: &step.commit,
            graph: step.graph().summary(),
            build: &step.tree.build,
            correlation: &step.correlation,
            parse_diagnostics: &step.tree.parse_diagnostics,
        }
    }
}

/// Run the walk command.
pub fn run(
    repo: &Path,
    args: &WalkArgs,
    limit: Option<usize>,
    json: bool,
    restore: bool,
) -> Result<(), histograph::Error> {
    let mut config = super::load_config(repo, args)?;
    if limit.is_some() {
        config.max_commits = limit;
    }
    config.validate()?;

    let mut walker = CommitWalker::open(repo, &config)?;
    if !json {
        println!(
            "{} {} commits...",
            "Walking".cyan().bold(),
            walker.commits().len()
        );
    }

    let mut result = Ok(());
    while walker.has_next() {
        match walker.next_graph() {
            Ok(step) if json => {
                if let Err(e) = super::print_json(&StepRecord::new(&step)) {
                    result = Err(e);
                    break;
                }
            }
            Ok(step) => print_step(&step),
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }

    if restore {
        if let Err(e) = walker.vcs_mut().restore_head() {
            warn!(error = %e, "Failed to restore original HEAD");
            if result.is_ok() {
                result = Err(e);
            }
        }
    }

    result
}

fn print_step(step: &CommitAnalysis) {
    println!();
    println!(
        "{} {}",
        step.commit.short_id.yellow().bold(),
        step.commit.summary
    );
    display::print_graph_stats(step.graph(), &step.tree.build);
    display::print_changed(&step.graph().changed_methods());
    display::print_diagnostics("Diagnostics", step.tree.diagnostics());
    display::print_diagnostics("Diff problems", &step.correlation.diagnostics);
}
