//! Shared tree-sitter utilities for language support modules.
//!
//! Provides common functions for extracting text and positions from tree-sitter nodes.

// Tree-sitter returns usize for positions, but we store u32 for compactness.
// This is safe for practical source files (no file has 4 billion lines).
#![allow(clippy::cast_possible_truncation)]

use crate::types::LineRange;

/// Get text content of a tree-sitter node.
///
/// Returns `None` if the node's byte range contains invalid UTF-8.
pub fn node_text(node: &tree_sitter::Node, content: &[u8]) -> Option<String> {
    match std::str::from_utf8(&content[node.byte_range()]) {
        Ok(s) => Some(s.to_string()),
        Err(e) => {
            tracing::trace!(
                byte_range = ?node.byte_range(),
                error = %e,
                node_kind = %node.kind(),
                "Failed to decode node text as UTF-8"
            );
            None
        }
    }
}

/// 1-indexed line on which a node starts.
pub fn start_line(node: &tree_sitter::Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Convert tree-sitter positions to an inclusive line range.
///
/// Tree-sitter uses 0-indexed rows; `LineRange` is 1-indexed.
pub fn node_lines(node: &tree_sitter::Node) -> LineRange {
    let start = start_line(node);
    let end = node.end_position().row as u32 + 1;

    LineRange::new(start, end).unwrap_or_else(|| {
        tracing::warn!(
            start,
            end,
            node_kind = %node.kind(),
            "Tree-sitter produced invalid line range, using start line"
        );
        LineRange { start, end: start }
    })
}

/// Count the expression children of an argument list, ignoring comments.
pub fn argument_count(arguments: &tree_sitter::Node) -> usize {
    let mut cursor = arguments.walk();
    arguments
        .named_children(&mut cursor)
        .filter(|child| !child.kind().ends_with("comment"))
        .count()
}
