//! Tree-sitter parsing coordination.
//!
//! Turns the source files of a snapshot into syntax trees keyed by file id
//! (the repository-relative, `/`-separated path).
//!
//! ## Design
//!
//! Tree-sitter parsers are stateful and not `Sync`, so each rayon worker gets
//! its own parser through `map_init` and reuses it for every file it handles.
//! A file that can't be read or decoded becomes a diagnostic; it never stops
//! the other files from parsing.
//!
//! Trees containing syntax errors are kept. Tree-sitter recovers around the
//! error and the declarations it could still see remain useful for the graph.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{Diagnostic, Error, Result};
use crate::languages::get_language_support;
use crate::types::Language;

/// One parsed source file.
#[derive(Debug)]
pub struct SyntaxTree {
    /// Repository-relative `/`-separated path
    pub file_id: String,
    /// Path the source was read from
    pub path: PathBuf,
    /// Language of the file
    pub language: Language,
    /// Full source text
    pub source: String,
    /// Parsed tree
    pub tree: tree_sitter::Tree,
}

impl SyntaxTree {
    /// Whether tree-sitter had to recover from syntax errors in this file.
    #[must_use]
    pub fn has_syntax_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// Parsed units keyed by file id. Ordered so iteration is deterministic.
pub type ParsedUnits = BTreeMap<String, SyntaxTree>;

/// Result of parsing one snapshot.
#[derive(Debug, Default)]
pub struct ParseOutput {
    /// Successfully parsed files
    pub units: ParsedUnits,
    /// Files that could not be parsed
    pub diagnostics: Vec<Diagnostic>,
}

/// Front-end that turns source files into syntax trees.
pub trait SourceParser: Send + Sync {
    /// Parse `files`, reporting per-file failures as diagnostics.
    ///
    /// `classpath` and `source_roots` describe the project layout the files
    /// belong to. Returns `Err` only if the parser itself cannot be set up.
    fn parse(
        &self,
        classpath: &[PathBuf],
        source_roots: &[PathBuf],
        files: &[PathBuf],
    ) -> Result<ParseOutput>;
}

/// Java front-end backed by tree-sitter-java.
#[derive(Debug, Clone)]
pub struct JavaParser {
    root: PathBuf,
}

impl JavaParser {
    /// Create a parser whose file ids are relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root that file ids are relative to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File id for a path: relative to the root, `/`-separated.
    ///
    /// Paths outside the root keep their full form.
    #[must_use]
    pub fn file_id(&self, path: &Path) -> String {
        file_id(&self.root, path)
    }

    /// Parse source text that is already in memory.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parser` if the grammar can't be loaded or tree-sitter
    /// returns no tree.
    pub fn parse_source(&self, file_id: &str, source: impl Into<String>) -> Result<SyntaxTree> {
        let mut parser = new_parser(Language::Java)?;
        let source = source.into();
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| Error::Parser(format!("failed to parse {file_id}")))?;

        Ok(SyntaxTree {
            file_id: file_id.to_string(),
            path: self.root.join(file_id),
            language: Language::Java,
            source,
            tree,
        })
    }

    fn parse_file(
        &self,
        parser: Option<&mut tree_sitter::Parser>,
        path: &Path,
    ) -> std::result::Result<SyntaxTree, Diagnostic> {
        let file_id = self.file_id(path);
        let Some(parser) = parser else {
            return Err(Diagnostic::parse_failure(
                file_id.as_str(),
                "no parser available on this worker",
            ));
        };

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let bytes =
            std::fs::read(&absolute).map_err(|e| Diagnostic::io_error(file_id.as_str(), &e))?;
        let source =
            String::from_utf8(bytes).map_err(|_| Diagnostic::encoding_error(file_id.as_str()))?;

        let tree = parser.parse(&source, None).ok_or_else(|| {
            Diagnostic::parse_failure(file_id.as_str(), "tree-sitter returned no tree")
        })?;

        Ok(SyntaxTree {
            file_id,
            path: absolute,
            language: Language::Java,
            source,
            tree,
        })
    }
}

impl SourceParser for JavaParser {
    fn parse(
        &self,
        classpath: &[PathBuf],
        source_roots: &[PathBuf],
        files: &[PathBuf],
    ) -> Result<ParseOutput> {
        // Fail early if the grammar is unusable rather than once per file
        drop(new_parser(Language::Java)?);

        debug!(
            files = files.len(),
            classpath = classpath.len(),
            source_roots = source_roots.len(),
            "Parsing snapshot"
        );

        let results: Vec<std::result::Result<SyntaxTree, Diagnostic>> = files
            .par_iter()
            .map_init(
                || new_parser(Language::Java).ok(),
                |parser, path| self.parse_file(parser.as_mut(), path),
            )
            .collect();

        let mut output = ParseOutput::default();
        for result in results {
            match result {
                Ok(unit) => {
                    if unit.has_syntax_errors() {
                        debug!(file = %unit.file_id, "Keeping tree with syntax errors");
                    }
                    if output.units.contains_key(&unit.file_id) {
                        warn!(file = %unit.file_id, "Duplicate file id, keeping first");
                        continue;
                    }
                    output.units.insert(unit.file_id.clone(), unit);
                }
                Err(diagnostic) => {
                    warn!(
                        file = %diagnostic.path.display(),
                        kind = %diagnostic.kind,
                        message = %diagnostic.message,
                        "Skipping file"
                    );
                    output.diagnostics.push(diagnostic);
                }
            }
        }

        Ok(output)
    }
}

/// Create a tree-sitter parser configured for `language`.
///
/// # Errors
///
/// Returns `Error::Parser` if the grammar version is incompatible.
pub fn new_parser(language: Language) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&get_language_support(language).tree_sitter_language())
        .map_err(|e| Error::Parser(e.to_string()))?;
    Ok(parser)
}

/// Repository-relative `/`-separated id of `path` under `root`.
pub(crate) fn file_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect();
    parts.join("/")
}
