//! Error types for histograph operations.
//!
//! Errors are categorized into two main types:
//!
//! - **`Error`**: Step-level errors that end a walk (checkout failures, history
//!   exhaustion, repository access)
//! - **`Diagnostic`**: Per-file problems that are collected but only degrade the
//!   completeness of a graph
//!
//! ## Error Philosophy
//!
//! Analysis is "best effort" within a commit:
//! - A file that fails to parse contributes no nodes, the rest still do
//! - A malformed diff hunk leaves that file's methods unmarked, other files are
//!   still correlated
//! - A failing worker task is reported after all sibling tasks have finished
//!
//! Only a failed checkout and running past the last commit stop the walk.
//!
//! ## Diagnostic Categorization
//!
//! `DiagnosticKind` uses a 4xx/5xx style categorization:
//! - Input problems (repository content): parse failures, bad encodings, malformed hunks
//! - Internal problems (our fault or the environment's): I/O errors, worker failures

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for histograph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for histograph operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The walker was asked to advance past the last commit.
    #[error("commit history exhausted")]
    ExhaustedHistory,

    /// Checking out a commit failed; the working tree is in an unknown state.
    #[error("checkout of {commit} failed: {source}")]
    CheckoutFailed {
        /// The commit that could not be checked out.
        commit: String,
        /// The underlying git error.
        #[source]
        source: git2::Error,
    },

    /// Repository operation failed
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tree-sitter parsing infrastructure failed
    #[error("parser error: {0}")]
    Parser(String),

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// An internal invariant was violated
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` if this error ends a walk rather than signalling its normal end.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ExhaustedHistory)
    }
}

/// A problem with one file encountered while analyzing a commit.
///
/// Diagnostics are collected during a step but don't halt it. The affected
/// file simply contributes less to the resulting graph.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Path (file id) of the affected file
    pub path: PathBuf,
    /// Category of the problem
    pub kind: DiagnosticKind,
    /// Human-readable message
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.path.display(),
            self.message,
            self.kind
        )
    }
}

impl std::error::Error for Diagnostic {}

/// Categorization of per-file diagnostics.
///
/// Uses a 4xx/5xx style pattern:
/// - Input problems are issues with the repository content at that commit
/// - Internal problems are issues with histograph or its environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    // === Input Problems (analogous to HTTP 4xx) ===
    /// Source file could not be parsed
    ParseFailure,

    /// File content is not valid UTF-8
    EncodingError,

    /// A diff hunk header could not be interpreted
    MalformedDiffHunk,

    // === Internal Problems (analogous to HTTP 5xx) ===
    /// Could not read the file from disk
    IoError,

    /// A graph-building task failed while visiting this file
    WorkerTaskFailure,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailure => write!(f, "parse failure"),
            Self::EncodingError => write!(f, "encoding error"),
            Self::MalformedDiffHunk => write!(f, "malformed diff hunk"),
            Self::IoError => write!(f, "I/O error"),
            Self::WorkerTaskFailure => write!(f, "worker task failure"),
        }
    }
}

impl DiagnosticKind {
    /// Returns `true` if this is an input problem (4xx-style).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::ParseFailure | Self::EncodingError | Self::MalformedDiffHunk
        )
    }

    /// Returns `true` if this is an internal problem (5xx-style).
    #[must_use]
    pub fn is_internal_error(&self) -> bool {
        matches!(self, Self::IoError | Self::WorkerTaskFailure)
    }
}

impl Diagnostic {
    /// Create a new diagnostic.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a parse failure for a file.
    #[must_use]
    pub fn parse_failure(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(path, DiagnosticKind::ParseFailure, message)
    }

    /// Create an encoding error for a file.
    #[must_use]
    pub fn encoding_error(path: impl Into<PathBuf>) -> Self {
        Self::new(path, DiagnosticKind::EncodingError, "file is not valid UTF-8")
    }

    /// Create a malformed hunk diagnostic, quoting the offending header.
    #[must_use]
    pub fn malformed_hunk(path: impl Into<PathBuf>, header: &str) -> Self {
        Self::new(
            path,
            DiagnosticKind::MalformedDiffHunk,
            format!("unparseable hunk header: {header}"),
        )
    }

    /// Create an I/O error for a file.
    #[must_use]
    pub fn io_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(path, DiagnosticKind::IoError, error.to_string())
    }

    /// Create a worker task failure for a file.
    #[must_use]
    pub fn worker_failure(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(path, DiagnosticKind::WorkerTaskFailure, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_kind_categorization() {
        // Input errors (4xx-style)
        assert!(DiagnosticKind::ParseFailure.is_input_error());
        assert!(DiagnosticKind::EncodingError.is_input_error());
        assert!(DiagnosticKind::MalformedDiffHunk.is_input_error());
        assert!(!DiagnosticKind::ParseFailure.is_internal_error());

        // Internal errors (5xx-style)
        assert!(DiagnosticKind::IoError.is_internal_error());
        assert!(DiagnosticKind::WorkerTaskFailure.is_internal_error());
        assert!(!DiagnosticKind::WorkerTaskFailure.is_input_error());
    }

    #[test]
    fn diagnostic_display_includes_path_and_kind() {
        let diagnostic = Diagnostic::parse_failure("src/Foo.java", "unexpected token");

        let display = diagnostic.to_string();
        assert!(display.contains("src/Foo.java"));
        assert!(display.contains("unexpected token"));
        assert!(display.contains("parse failure"));
    }

    #[test]
    fn malformed_hunk_quotes_header() {
        let diagnostic = Diagnostic::malformed_hunk("Foo.java", "@@ -1 +x @@");

        assert_eq!(diagnostic.kind, DiagnosticKind::MalformedDiffHunk);
        assert!(diagnostic.message.contains("@@ -1 +x @@"));
    }

    #[test]
    fn exhaustion_is_not_fatal() {
        assert!(!Error::ExhaustedHistory.is_fatal());
        assert!(Error::Config("bad".to_string()).is_fatal());
    }
}
