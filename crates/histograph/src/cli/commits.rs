//! `histograph commits` command implementation.

use std::path::Path;

use colored::Colorize;
use histograph::{GitRepository, VersionControl};

/// Run the commits command.
pub fn run(repo: &Path, limit: Option<usize>) -> Result<(), histograph::Error> {
    let repository = GitRepository::open(repo)?;
    let commits = repository.list_commits()?;
    let shown = limit.unwrap_or(commits.len()).min(commits.len());

    for commit in &commits[..shown] {
        println!(
            "{} {} {} {}",
            commit.short_id.yellow(),
            commit.timestamp.format("%Y-%m-%d").to_string().dimmed(),
            commit.author.cyan(),
            commit.summary
        );
    }

    if shown < commits.len() {
        println!("{}", format!("... {} newer commits not shown", commits.len() - shown).dimmed());
    }

    Ok(())
}
