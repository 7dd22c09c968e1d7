//! Concurrent call graph construction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     GraphBuilder::build                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Phase 1 (Parallel):    outline each tree, insert nodes      │
//! │  (Sequential):          index declarations, wrap resolver    │
//! │  Phase 2 (Parallel):    extract call sites, resolve, edges   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both parallel phases run on a rayon pool created for this build only and
//! dropped when the build returns. Every node exists before any edge is
//! offered, so edge insertion never races node insertion.
//!
//! A task that panics is caught and reported as a `WorkerTaskFailure` for its
//! file. Sibling tasks keep running and the build still returns normally.

use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Diagnostic, Error, Result};
use crate::graph::{CallGraph, EdgeInsert};
use crate::languages::common::FileOutline;
use crate::languages::get_language_support;
use crate::parser::{ParsedUnits, SyntaxTree};
use crate::resolver::{
    DeclarationIndex, DeclarationResolver, Resolution, ResolverStats, SerializedResolver,
    SymbolResolver,
};
use crate::types::MethodNode;

/// Statistics from one graph build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Worker threads used (0 when no pool was created)
    pub threads: usize,
    /// Trees visited
    pub files_visited: usize,
    /// Nodes inserted
    pub methods_inserted: usize,
    /// Declarations rejected because their key already existed
    pub duplicate_methods: usize,
    /// Call sites handed to the resolver
    pub call_sites: usize,
    /// Edges inserted
    pub edges_inserted: usize,
    /// Resolved calls whose edge was already present
    pub duplicate_edges: usize,
    /// Resolved calls whose edge had a missing endpoint
    pub rejected_edges: usize,
    /// Call sites that did not resolve
    pub unresolved_calls: usize,
    /// Counters reported by the resolver
    pub resolver: ResolverStats,
    /// Tasks that failed, one per file
    pub failures: Vec<Diagnostic>,
    /// How long the build took
    pub duration: Duration,
}

impl BuildReport {
    /// Report for a build with nothing to do.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether every task finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Builds call graphs from parsed units on a per-build worker pool.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    threads: Option<NonZeroUsize>,
}

impl GraphBuilder {
    /// Builder sized to the machine's available parallelism.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with a fixed number of worker threads.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `threads` is zero.
    pub fn with_threads(threads: usize) -> Result<Self> {
        let threads = NonZeroUsize::new(threads)
            .ok_or_else(|| Error::Config("worker thread count must be at least 1".to_string()))?;
        Ok(Self {
            threads: Some(threads),
        })
    }

    /// Number of workers a build will use.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
    }

    /// Build `graph` from `units`, binding calls with a `DeclarationResolver`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the worker pool can't be created.
    pub fn build(&self, units: &ParsedUnits, graph: &CallGraph) -> Result<BuildReport> {
        self.build_with(units, graph, DeclarationResolver::new)
    }

    /// Build `graph` from `units` with a resolver made from the snapshot's
    /// declarations.
    ///
    /// The resolver is created once, shared by all workers behind a mutex and
    /// dropped when the build returns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the worker pool can't be created.
    pub fn build_with<R, F>(
        &self,
        units: &ParsedUnits,
        graph: &CallGraph,
        make_resolver: F,
    ) -> Result<BuildReport>
    where
        R: SymbolResolver,
        F: FnOnce(DeclarationIndex) -> R,
    {
        if units.is_empty() {
            debug!("No source files, skipping graph build");
            return Ok(BuildReport::empty());
        }

        let start = Instant::now();
        let threads = self.threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("histograph-build-{i}"))
            .build()
            .map_err(|e| Error::Internal(format!("failed to create worker pool: {e}")))?;

        let mut report = BuildReport {
            threads,
            files_visited: units.len(),
            ..BuildReport::default()
        };

        // Phase 1: declarations
        let declared: Vec<std::result::Result<DeclarationOutcome, Diagnostic>> = pool.install(|| {
            units
                .par_iter()
                .map(|(file_id, unit)| visit_declarations(file_id, unit, graph))
                .collect()
        });

        let mut outlines = Vec::with_capacity(declared.len());
        for outcome in declared {
            match outcome {
                Ok(outcome) => {
                    report.methods_inserted += outcome.inserted;
                    report.duplicate_methods += outcome.duplicates;
                    outlines.push(outcome.outline);
                }
                Err(failure) => report.failures.push(failure),
            }
        }
        outlines.sort_by(|a, b| a.file.cmp(&b.file));

        let index = DeclarationIndex::from_outlines(&outlines);
        debug!(
            types = index.type_count(),
            methods = index.method_count(),
            "Declarations indexed"
        );
        let resolver = SerializedResolver::new(make_resolver(index));

        // Phase 2: calls, only for files whose declarations went in
        let linked: Vec<std::result::Result<CallOutcome, Diagnostic>> = pool.install(|| {
            outlines
                .par_iter()
                .filter_map(|outline| units.get(&outline.file))
                .map(|unit| visit_calls(unit, graph, &resolver))
                .collect()
        });
        drop(pool);

        for outcome in linked {
            match outcome {
                Ok(outcome) => {
                    report.call_sites += outcome.call_sites;
                    report.edges_inserted += outcome.inserted;
                    report.duplicate_edges += outcome.duplicates;
                    report.rejected_edges += outcome.rejected;
                    report.unresolved_calls += outcome.unresolved;
                }
                Err(failure) => report.failures.push(failure),
            }
        }

        report.resolver = resolver.stats();
        report.failures.sort_by(|a, b| a.path.cmp(&b.path));
        report.duration = start.elapsed();

        for failure in &report.failures {
            warn!(
                file = %failure.path.display(),
                error = %failure.message,
                "Graph build task failed"
            );
        }
        info!(
            files = report.files_visited,
            methods = report.methods_inserted,
            edges = report.edges_inserted,
            unresolved = report.unresolved_calls,
            threads,
            duration_ms = report.duration.as_millis(),
            "Graph built"
        );

        Ok(report)
    }
}

struct DeclarationOutcome {
    outline: FileOutline,
    inserted: usize,
    duplicates: usize,
}

#[derive(Default)]
struct CallOutcome {
    call_sites: usize,
    inserted: usize,
    duplicates: usize,
    rejected: usize,
    unresolved: usize,
}

fn visit_declarations(
    file_id: &str,
    unit: &SyntaxTree,
    graph: &CallGraph,
) -> std::result::Result<DeclarationOutcome, Diagnostic> {
    catch_unwind(AssertUnwindSafe(|| {
        let support = get_language_support(unit.language);
        let outline = support.extract_outline(file_id, &unit.tree, unit.source.as_bytes());

        let mut inserted = 0;
        let mut duplicates = 0;
        for method in outline.methods() {
            if graph.insert_method(MethodNode::new(method.key.clone(), method.kind, method.lines)) {
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }

        DeclarationOutcome {
            outline,
            inserted,
            duplicates,
        }
    }))
    .map_err(|payload| Diagnostic::worker_failure(file_id, panic_message(payload.as_ref())))
}

fn visit_calls<R: SymbolResolver>(
    unit: &SyntaxTree,
    graph: &CallGraph,
    resolver: &SerializedResolver<R>,
) -> std::result::Result<CallOutcome, Diagnostic> {
    catch_unwind(AssertUnwindSafe(|| {
        let support = get_language_support(unit.language);
        let sites = support.extract_call_sites(&unit.file_id, &unit.tree, unit.source.as_bytes());

        let mut outcome = CallOutcome {
            call_sites: sites.len(),
            ..CallOutcome::default()
        };
        for site in &sites {
            match resolver.resolve(site) {
                Resolution::Resolved(callee) => match graph.insert_edge(site.caller.clone(), callee) {
                    EdgeInsert::Inserted => outcome.inserted += 1,
                    EdgeInsert::Duplicate => outcome.duplicates += 1,
                    EdgeInsert::MissingEndpoint => outcome.rejected += 1,
                },
                Resolution::Unresolved(_) => outcome.unresolved += 1,
            }
        }
        outcome
    }))
    .map_err(|payload| {
        Diagnostic::worker_failure(unit.file_id.as_str(), panic_message(payload.as_ref()))
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("task panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("task panicked: {message}")
    } else {
        "task panicked".to_string()
    }
}
