//! The per-commit call graph.
//!
//! Nodes are method declarations, edges are resolved calls. The graph is
//! shared by every worker of a build, so all mutation goes through `&self`:
//! the maps are sharded (`dashmap`) and the only node state that changes after
//! insertion is the atomic changed flag.
//!
//! ## Invariants
//!
//! - At most one node per `(file, signature)`; a duplicate insert keeps the
//!   first node.
//! - Every edge's endpoints are nodes of this graph. An edge offered before
//!   both endpoints exist is rejected.
//! - At most one edge per `(caller, callee)` pair.

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tracing::trace;

use crate::types::{CallEdge, CommitInfo, LineRange, MethodKey, MethodNode};

/// Outcome of offering an edge to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeInsert {
    /// The edge is new
    Inserted,
    /// The same caller/callee pair was already present
    Duplicate,
    /// The caller or callee is not a node of this graph
    MissingEndpoint,
}

/// Call graph of one commit.
#[derive(Debug)]
pub struct CallGraph {
    commit: Option<CommitInfo>,
    nodes: DashMap<MethodKey, MethodNode>,
    /// file id -> keys of the methods declared in it
    by_file: DashMap<String, Vec<MethodKey>>,
    edges: DashSet<CallEdge>,
}

impl CallGraph {
    /// Create an empty graph for a commit.
    #[must_use]
    pub fn new(commit: CommitInfo) -> Self {
        Self::with_label(Some(commit))
    }

    /// Create an empty graph not tied to any commit (e.g., a working tree).
    #[must_use]
    pub fn untagged() -> Self {
        Self::with_label(None)
    }

    fn with_label(commit: Option<CommitInfo>) -> Self {
        Self {
            commit,
            nodes: DashMap::new(),
            by_file: DashMap::new(),
            edges: DashSet::new(),
        }
    }

    /// The commit this graph was built for.
    #[must_use]
    pub fn commit(&self) -> Option<&CommitInfo> {
        self.commit.as_ref()
    }

    // === Mutation ===

    /// Insert a method node. Returns `false` if the key is already present.
    pub fn insert_method(&self, node: MethodNode) -> bool {
        let key = node.key.clone();
        match self.nodes.entry(key.clone()) {
            Entry::Occupied(_) => {
                trace!(method = %key, "Duplicate method declaration rejected");
                return false;
            }
            Entry::Vacant(slot) => {
                // Release the node shard before touching the file index
                drop(slot.insert(node));
            }
        }

        self.by_file.entry(key.file.clone()).or_default().push(key);
        true
    }

    /// Insert a call edge between two existing nodes.
    pub fn insert_edge(&self, caller: MethodKey, callee: MethodKey) -> EdgeInsert {
        if !self.nodes.contains_key(&caller) || !self.nodes.contains_key(&callee) {
            trace!(%caller, %callee, "Edge with missing endpoint rejected");
            return EdgeInsert::MissingEndpoint;
        }

        if self.edges.insert(CallEdge { caller, callee }) {
            EdgeInsert::Inserted
        } else {
            EdgeInsert::Duplicate
        }
    }

    /// Flag every method of `file` whose extent overlaps `range`.
    ///
    /// Returns how many methods were newly flagged by this call.
    pub fn mark_changed(&self, file: &str, range: &LineRange) -> usize {
        let keys = self.keys_in_file(file);
        keys.iter()
            .filter_map(|key| self.nodes.get(key))
            .filter(|node| node.lines.overlaps(range))
            .filter(|node| node.mark_changed())
            .count()
    }

    // === Queries ===

    /// Methods of `file` whose extent overlaps `range`, sorted by key.
    #[must_use]
    pub fn methods_overlapping(&self, file: &str, range: &LineRange) -> Vec<MethodKey> {
        let mut keys: Vec<MethodKey> = self
            .keys_in_file(file)
            .into_iter()
            .filter(|key| {
                self.nodes
                    .get(key)
                    .is_some_and(|node| node.lines.overlaps(range))
            })
            .collect();
        keys.sort();
        keys
    }

    fn keys_in_file(&self, file: &str) -> Vec<MethodKey> {
        self.by_file
            .get(file)
            .map(|keys| keys.value().clone())
            .unwrap_or_default()
    }

    /// Copy of one node.
    #[must_use]
    pub fn method(&self, key: &MethodKey) -> Option<MethodNode> {
        self.nodes.get(key).map(|node| node.value().clone())
    }

    /// Whether a node exists.
    #[must_use]
    pub fn contains(&self, key: &MethodKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Copies of all nodes, sorted by key.
    #[must_use]
    pub fn methods(&self) -> Vec<MethodNode> {
        let mut nodes: Vec<MethodNode> = self
            .nodes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        nodes
    }

    /// All edges, sorted.
    #[must_use]
    pub fn edges(&self) -> Vec<CallEdge> {
        let mut edges: Vec<CallEdge> = self.edges.iter().map(|edge| edge.key().clone()).collect();
        edges.sort();
        edges
    }

    /// Keys of flagged methods, sorted.
    #[must_use]
    pub fn changed_methods(&self) -> Vec<MethodKey> {
        let mut keys: Vec<MethodKey> = self
            .nodes
            .iter()
            .filter(|entry| entry.value().is_changed())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Serializable overview of the graph.
    #[must_use]
    pub fn summary(&self) -> GraphSummary {
        let changed = self.changed_methods();
        GraphSummary {
            commit: self.commit.as_ref().map(|c| c.id.clone()),
            methods: self.node_count(),
            edges: self.edge_count(),
            files: self.by_file.len(),
            changed_count: changed.len(),
            changed,
        }
    }
}

/// Counts and changed methods of one graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    /// Full id of the commit, if the graph is tagged
    pub commit: Option<String>,
    /// Number of method nodes
    pub methods: usize,
    /// Number of call edges
    pub edges: usize,
    /// Number of files declaring at least one method
    pub files: usize,
    /// Number of flagged methods
    pub changed_count: usize,
    /// Flagged methods, sorted
    pub changed: Vec<MethodKey>,
}
