//! Language-specific declaration and call-site extraction.
//!
//! Each supported language implements the `LanguageSupport` trait, which defines
//! how to extract method declarations and call sites from tree-sitter syntax trees.
//!
//! ## Adding a New Language
//!
//! 1. Add the variant to `Language` enum in `types.rs`
//! 2. Create a new module (e.g., `kotlin.rs`)
//! 3. Implement `LanguageSupport` trait
//! 4. Register in `get_language_support()`
//!
//! Extraction is a pure function of the tree, so it runs on any worker thread.
//! Binding call sites to declarations is left to the resolver.

pub mod common;
pub mod java;
pub mod tree_sitter_utils;

use crate::types::Language;
use common::{CallSite, FileOutline};

/// Get the language support implementation for a language.
#[must_use]
pub fn get_language_support(lang: Language) -> &'static dyn LanguageSupport {
    match lang {
        Language::Java => &java::JavaLanguage,
    }
}

/// Trait for language-specific extraction.
pub trait LanguageSupport: Send + Sync {
    /// File extensions this language handles.
    fn extensions(&self) -> &[&str];

    /// Get the tree-sitter language for parsing.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Extract the package, imports, types and method declarations of a file.
    fn extract_outline(&self, file: &str, tree: &tree_sitter::Tree, content: &[u8])
    -> FileOutline;

    /// Extract every call site that sits inside a method or constructor body.
    fn extract_call_sites(
        &self,
        file: &str,
        tree: &tree_sitter::Tree,
        content: &[u8],
    ) -> Vec<CallSite>;
}
