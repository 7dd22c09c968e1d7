//! # Histograph: Call Graphs Across a Repository's History
//!
//! Histograph walks the commits of a Git repository one at a time. For each
//! commit it checks out the working tree, parses every Java source file with
//! tree-sitter, builds a method-level call graph on a worker pool, and flags
//! the methods whose lines the commit's diff touched.
//!
//! ## Design Philosophy
//!
//! - **One graph per commit** - Nothing is carried over between steps; each graph describes exactly one snapshot
//! - **Parallel build, serial resolution** - Files are visited concurrently, symbol resolution goes through one lock
//! - **Best effort** - Unparseable files and malformed hunks degrade a graph, they don't abort the walk
//! - **Library first, CLI second**
//!
//! ## Quick Start
//!
//! ```no_run
//! use histograph::{CommitWalker, WalkConfig};
//! use std::path::Path;
//!
//! let mut walker = CommitWalker::open(Path::new("/path/to/repo"), &WalkConfig::default())?;
//!
//! while walker.has_next() {
//!     let step = walker.next_graph()?;
//!     println!(
//!         "{}: {} methods, {} changed",
//!         step.commit.short_id,
//!         step.graph().node_count(),
//!         step.graph().changed_methods().len()
//!     );
//! }
//!
//! walker.vcs_mut().restore_head()?;
//! # Ok::<(), histograph::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod diff;
mod error;
pub mod graph;
pub mod languages;
pub mod parser;
pub mod resolver;
pub mod snapshot;
mod types;
pub mod vcs;
pub mod walker;

pub use builder::{BuildReport, GraphBuilder};
pub use config::WalkConfig;
pub use diff::{CorrelationReport, DiffCorrelator, FileChange, parse_unified_diff};
pub use error::{Diagnostic, DiagnosticKind, Error, Result};
pub use graph::{CallGraph, EdgeInsert, GraphSummary};
pub use parser::{JavaParser, ParseOutput, ParsedUnits, SourceParser, SyntaxTree};
pub use resolver::{
    DeclarationIndex, DeclarationResolver, Resolution, ResolverStats, SerializedResolver,
    SymbolResolver, UnresolvedReason,
};
pub use snapshot::{FsSnapshotLocator, SnapshotLocator};
pub use types::{
    CallEdge, CommitInfo, Language, LineRange, MethodKey, MethodKind, MethodNode, ProjectSnapshot,
};
pub use vcs::{GitRepository, VersionControl};
pub use walker::{CommitAnalysis, CommitWalker, TreeAnalysis, WalkerState, analyze_working_tree};
