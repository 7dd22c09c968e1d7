//! Pull-style iteration over a repository's history.
//!
//! Each step checks out the next commit, rediscovers the working tree,
//! parses it, builds a fresh call graph and flags the methods the commit's
//! diff touched. Nothing is carried from one step to the next.
//!
//! ## States
//!
//! ```text
//! NotStarted ──next_graph──▶ Positioned(0) ──▶ … ──▶ Positioned(n-2) ──▶ Exhausted
//!      │                                                                   ▲
//!      └──────────────── fatal error (any state) ──────────────────────────┘
//! ```
//!
//! The walker moves to `Exhausted` as soon as it produces the last commit, or
//! when a step fails with a fatal error such as a failed checkout. Asking an
//! exhausted walker for another graph yields `Error::ExhaustedHistory`.

use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::builder::{BuildReport, GraphBuilder};
use crate::config::WalkConfig;
use crate::diff::{CorrelationReport, DiffCorrelator};
use crate::error::{Diagnostic, DiagnosticKind, Error, Result};
use crate::graph::CallGraph;
use crate::parser::{JavaParser, ParseOutput, SourceParser};
use crate::snapshot::{FsSnapshotLocator, SnapshotLocator};
use crate::types::{CommitInfo, ProjectSnapshot};
use crate::vcs::{GitRepository, VersionControl};

/// Where a walker is in its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkerState {
    /// No commit produced yet
    NotStarted,
    /// The commit at this index was the last one produced
    Positioned(usize),
    /// Nothing left to produce
    Exhausted,
}

/// Everything built from one working tree.
#[derive(Debug)]
pub struct TreeAnalysis {
    /// What the tree held
    pub snapshot: ProjectSnapshot,
    /// The call graph
    pub graph: CallGraph,
    /// Statistics of the graph build
    pub build: BuildReport,
    /// Files that could not be parsed
    pub parse_diagnostics: Vec<Diagnostic>,
}

impl TreeAnalysis {
    /// Every diagnostic of the analysis: parse problems then build failures.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.parse_diagnostics.iter().chain(self.build.failures.iter())
    }
}

/// The result of one step of a walk.
#[derive(Debug)]
pub struct CommitAnalysis {
    /// The commit analyzed
    pub commit: CommitInfo,
    /// Snapshot, graph and build statistics
    pub tree: TreeAnalysis,
    /// What the commit's diff flagged
    pub correlation: CorrelationReport,
}

impl CommitAnalysis {
    /// The call graph of this commit.
    #[must_use]
    pub fn graph(&self) -> &CallGraph {
        &self.tree.graph
    }
}

/// Discovery, parsing and building, shared by walks and one-off builds.
#[derive(Debug)]
struct Pipeline<L, P> {
    locator: L,
    parser: P,
    builder: GraphBuilder,
    ignore_names: Vec<String>,
    ignore_pattern: Option<Regex>,
}

impl<L: SnapshotLocator, P: SourceParser> Pipeline<L, P> {
    fn new(locator: L, parser: P, config: &WalkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            locator,
            parser,
            builder: config.graph_builder()?,
            ignore_names: config.ignore_names.clone(),
            ignore_pattern: config.ignore_regex()?,
        })
    }

    fn analyze(&self, root: &Path, graph: CallGraph) -> Result<TreeAnalysis> {
        let snapshot =
            self.locator
                .locate(root, &self.ignore_names, self.ignore_pattern.as_ref())?;

        let parsed = if snapshot.is_empty() {
            debug!(root = %root.display(), "No source files in working tree");
            ParseOutput::default()
        } else {
            self.parser.parse(
                &snapshot.classpath,
                &snapshot.source_roots,
                &snapshot.source_files,
            )?
        };

        let build = self.builder.build(&parsed.units, &graph)?;

        Ok(TreeAnalysis {
            snapshot,
            graph,
            build,
            parse_diagnostics: parsed.diagnostics,
        })
    }
}

/// Build the call graph of a working tree as it is, without touching history.
///
/// # Errors
///
/// Returns `Error::Config` for an invalid configuration, `Error::Io` if the
/// root can't be read, and `Error::Parser`/`Error::Internal` if parsing or
/// the worker pool can't be set up.
pub fn analyze_working_tree(root: &Path, config: &WalkConfig) -> Result<TreeAnalysis> {
    let pipeline = Pipeline::new(FsSnapshotLocator::new(), JavaParser::new(root), config)?;
    pipeline.analyze(root, CallGraph::untagged())
}

/// Walks a repository's history one commit at a time, oldest first.
///
/// `next_graph` takes `&mut self`, so only one step can be in progress.
#[derive(Debug)]
pub struct CommitWalker<V, L = FsSnapshotLocator, P = JavaParser> {
    vcs: V,
    pipeline: Pipeline<L, P>,
    correlator: DiffCorrelator,
    commits: Vec<CommitInfo>,
    state: WalkerState,
}

impl CommitWalker<GitRepository> {
    /// Walk the Git repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository can't be opened, its history can't
    /// be listed, or `config` is invalid.
    pub fn open(path: &Path, config: &WalkConfig) -> Result<Self> {
        let vcs = GitRepository::open(path)?;
        let root: PathBuf = vcs.repository_root().to_path_buf();
        Self::new(vcs, FsSnapshotLocator::new(), JavaParser::new(root), config)
    }
}

impl<V, L, P> CommitWalker<V, L, P>
where
    V: VersionControl,
    L: SnapshotLocator,
    P: SourceParser,
{
    /// Create a walker over `vcs`'s history.
    ///
    /// The commit list is read once here. With `max_commits` set, only the
    /// oldest commits are visited.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the history can't be listed.
    pub fn new(vcs: V, locator: L, parser: P, config: &WalkConfig) -> Result<Self> {
        let pipeline = Pipeline::new(locator, parser, config)?;

        let mut commits = vcs.list_commits()?;
        if let Some(limit) = config.max_commits {
            commits.truncate(limit);
        }
        info!(commits = commits.len(), "History loaded");

        Ok(Self {
            vcs,
            pipeline,
            correlator: DiffCorrelator::new(),
            commits,
            state: WalkerState::NotStarted,
        })
    }

    /// Whether another call to `next_graph` will produce a commit.
    #[must_use]
    pub fn has_next(&self) -> bool {
        match self.state {
            WalkerState::NotStarted => !self.commits.is_empty(),
            WalkerState::Positioned(index) => index + 1 < self.commits.len(),
            WalkerState::Exhausted => false,
        }
    }

    /// Analyze the next commit.
    ///
    /// # Errors
    ///
    /// Returns `Error::ExhaustedHistory` when no commit is left, and
    /// `Error::CheckoutFailed` (or another fatal error) when the step could not
    /// be carried out. Either way the walker is exhausted afterwards.
    pub fn next_graph(&mut self) -> Result<CommitAnalysis> {
        let index = match self.state {
            WalkerState::NotStarted => 0,
            WalkerState::Positioned(index) => index + 1,
            WalkerState::Exhausted => return Err(Error::ExhaustedHistory),
        };
        let Some(commit) = self.commits.get(index).cloned() else {
            self.state = WalkerState::Exhausted;
            return Err(Error::ExhaustedHistory);
        };

        match self.analyze(commit) {
            Ok(analysis) => {
                self.state = if index + 1 < self.commits.len() {
                    WalkerState::Positioned(index)
                } else {
                    WalkerState::Exhausted
                };
                Ok(analysis)
            }
            Err(e) => {
                warn!(error = %e, index, "Step failed, ending walk");
                self.state = WalkerState::Exhausted;
                Err(e)
            }
        }
    }

    fn analyze(&mut self, commit: CommitInfo) -> Result<CommitAnalysis> {
        self.vcs.checkout(&commit)?;

        let root = self.vcs.repository_root().to_path_buf();
        let tree = self
            .pipeline
            .analyze(&root, CallGraph::new(commit.clone()))?;

        let correlation = match self.vcs.diff_hunk_headers(&commit) {
            Ok(diff) => self.correlator.correlate(&diff, &tree.graph),
            Err(e) => {
                warn!(commit = %commit.short_id, error = %e, "Cannot read diff, no methods flagged");
                CorrelationReport {
                    diagnostics: vec![Diagnostic::new(
                        root,
                        DiagnosticKind::IoError,
                        format!("cannot read diff of {}: {e}", commit.short_id),
                    )],
                    ..CorrelationReport::default()
                }
            }
        };

        info!(
            commit = %commit.short_id,
            methods = tree.graph.node_count(),
            edges = tree.graph.edge_count(),
            changed = correlation.methods_marked,
            "Commit analyzed"
        );

        Ok(CommitAnalysis {
            commit,
            tree,
            correlation,
        })
    }

    /// The commits this walker visits, oldest first.
    #[must_use]
    pub fn commits(&self) -> &[CommitInfo] {
        &self.commits
    }

    /// Current state.
    #[must_use]
    pub fn position(&self) -> WalkerState {
        self.state
    }

    /// The version control collaborator.
    pub fn vcs_mut(&mut self) -> &mut V {
        &mut self.vcs
    }
}

impl<V, L, P> Iterator for CommitWalker<V, L, P>
where
    V: VersionControl,
    L: SnapshotLocator,
    P: SourceParser,
{
    type Item = Result<CommitAnalysis>;

    fn next(&mut self) -> Option<Self::Item> {
        self.has_next().then(|| self.next_graph())
    }
}

impl<V, L, P> FusedIterator for CommitWalker<V, L, P>
where
    V: VersionControl,
    L: SnapshotLocator,
    P: SourceParser,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct EmptyHistory(PathBuf);

    impl VersionControl for EmptyHistory {
        fn repository_root(&self) -> &Path {
            &self.0
        }
        fn list_commits(&self) -> Result<Vec<CommitInfo>> {
            Ok(Vec::new())
        }
        fn checkout(&mut self, _commit: &CommitInfo) -> Result<()> {
            Ok(())
        }
        fn diff_hunk_headers(&self, _commit: &CommitInfo) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn empty_history_is_never_positioned() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut walker = CommitWalker::new(
            EmptyHistory(dir.path().to_path_buf()),
            FsSnapshotLocator::new(),
            JavaParser::new(dir.path()),
            &WalkConfig::default(),
        )
        .expect("walker should be created");

        assert!(!walker.has_next());
        assert_eq!(walker.position(), WalkerState::NotStarted);
        assert!(matches!(walker.next_graph(), Err(Error::ExhaustedHistory)));
        assert_eq!(walker.position(), WalkerState::Exhausted);
        assert!(walker.next().is_none());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let config = WalkConfig {
            threads: Some(0),
            ..WalkConfig::default()
        };

        let result = CommitWalker::new(
            EmptyHistory(dir.path().to_path_buf()),
            FsSnapshotLocator::new(),
            JavaParser::new(dir.path()),
            &config,
        );

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn working_tree_analysis_builds_untagged_graph() {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::write(
            dir.path().join("App.java"),
            "class App { void main() { helper(); } void helper() {} }",
        )
        .unwrap();

        let analysis =
            analyze_working_tree(dir.path(), &WalkConfig::default()).expect("analysis should succeed");

        assert!(analysis.graph.commit().is_none());
        assert_eq!(analysis.graph.node_count(), 2);
        assert_eq!(analysis.graph.edge_count(), 1);
        assert_eq!(analysis.diagnostics().count(), 0);
    }
}
