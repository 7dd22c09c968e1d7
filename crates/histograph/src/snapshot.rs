//! Discovering what a working tree holds.
//!
//! Walks the tree once per commit and sorts what it finds into library
//! archives (the classpath), Java source files, and the source roots those
//! files hang off. Nothing is cached between calls; every commit may add,
//! move or delete any of them.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::parser::file_id;
use crate::types::{Language, ProjectSnapshot};

static PACKAGE_DECLARATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^package\s+([\w.]+)\s*;").ok());

/// Finds the classpath, source roots and source files of a working tree.
pub trait SnapshotLocator {
    /// Scan `root`.
    ///
    /// Directories and files whose name is in `ignore_names` are skipped, as
    /// is anything whose root-relative `/`-separated path matches
    /// `ignore_pattern`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if `root` itself can't be read. Unreadable
    /// subdirectories are skipped with a warning.
    fn locate(
        &self,
        root: &Path,
        ignore_names: &[String],
        ignore_pattern: Option<&Regex>,
    ) -> Result<ProjectSnapshot>;
}

/// File-system implementation of `SnapshotLocator`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSnapshotLocator;

impl FsSnapshotLocator {
    /// Create a locator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

struct WalkRules<'a> {
    root: &'a Path,
    ignore_names: &'a [String],
    ignore_pattern: Option<&'a Regex>,
}

impl WalkRules<'_> {
    fn is_ignored(&self, path: &Path) -> bool {
        let name_ignored = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.ignore_names.iter().any(|ignored| ignored == name));

        name_ignored
            || self
                .ignore_pattern
                .is_some_and(|pattern| pattern.is_match(&file_id(self.root, path)))
    }
}

#[derive(Default)]
struct Found {
    archives: Vec<PathBuf>,
    sources: Vec<PathBuf>,
}

impl SnapshotLocator for FsSnapshotLocator {
    fn locate(
        &self,
        root: &Path,
        ignore_names: &[String],
        ignore_pattern: Option<&Regex>,
    ) -> Result<ProjectSnapshot> {
        if !root.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("working tree not found: {}", root.display()),
            )));
        }

        let rules = WalkRules {
            root,
            ignore_names,
            ignore_pattern,
        };
        let mut found = Found::default();
        walk_dir(&rules, root, &mut found);

        let mut source_roots: Vec<PathBuf> = Vec::new();
        for source in &found.sources {
            let source_root = source_root_of(source);
            if !source_roots.contains(&source_root) {
                source_roots.push(source_root);
            }
        }

        let mut source_files = found.sources;
        source_files.sort();
        source_files.dedup();

        debug!(
            root = %root.display(),
            sources = source_files.len(),
            archives = found.archives.len(),
            source_roots = source_roots.len(),
            "Located snapshot"
        );

        Ok(ProjectSnapshot {
            classpath: found.archives,
            source_roots,
            source_files,
        })
    }
}

/// Recursively walk a directory, collecting archives and sources.
///
/// Entries are visited in name order so discovery order is stable.
fn walk_dir(rules: &WalkRules<'_>, dir: &Path, found: &mut Found) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                directory = %dir.display(),
                error = %e,
                "Cannot read directory, skipping"
            );
            return;
        }
    };

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => paths.push(entry.path()),
            Err(e) => {
                warn!(
                    directory = %dir.display(),
                    error = %e,
                    "Failed to read directory entry, skipping"
                );
            }
        }
    }
    paths.sort();

    for path in paths {
        if rules.is_ignored(&path) {
            continue;
        }

        if path.is_dir() {
            walk_dir(rules, &path, found);
        } else if path.is_file() {
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if ext.eq_ignore_ascii_case("jar") {
                found.archives.push(path);
            } else if Language::from_extension(ext) == Some(Language::Java) {
                found.sources.push(path);
            }
        }
    }
}

/// The directory `source` hangs off according to its `package` declaration.
///
/// `src/main/java/com/acme/App.java` declaring `package com.acme;` has the
/// root `src/main/java`. A file whose directory doesn't end with its package
/// path, or that declares no package, is its own root.
fn source_root_of(source: &Path) -> PathBuf {
    let parent = source.parent().unwrap_or(source).to_path_buf();

    let package = match File::open(source) {
        Ok(file) => declared_package(BufReader::new(file)),
        Err(e) => {
            warn!(file = %source.display(), error = %e, "Cannot read source file for package");
            None
        }
    };
    let Some(package) = package else {
        return parent;
    };

    let mut root = parent.clone();
    for segment in package.rsplit('.') {
        if root.file_name().and_then(|n| n.to_str()) != Some(segment) {
            return parent;
        }
        if !root.pop() {
            return parent;
        }
    }
    root
}

/// Read `source` up to its first declaration and return the package name.
///
/// Only comments and annotations may precede a `package` line, so the scan
/// stops at the first line that is neither. Import and type declarations end
/// it without reading the rest of the file.
fn declared_package(source: impl BufRead) -> Option<String> {
    let pattern = PACKAGE_DECLARATION.as_ref()?;
    let mut in_comment = false;

    for line in source.split(b'\n') {
        let line = line.ok()?;
        let line = String::from_utf8_lossy(&line);
        let mut rest = line.trim();

        loop {
            if in_comment {
                match rest.find("*/") {
                    Some(end) => {
                        in_comment = false;
                        rest = rest[end + 2..].trim_start();
                    }
                    None => break,
                }
            } else if let Some(open) = rest.strip_prefix("/*") {
                in_comment = true;
                rest = open;
            } else {
                break;
            }
        }

        if in_comment || rest.is_empty() || rest.starts_with("//") || rest.starts_with('@') {
            continue;
        }
        return pattern
            .captures(rest)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, relative: &str, content: &str) {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(path, content).expect("failed to write file");
    }

    fn names(paths: &[PathBuf], root: &Path) -> Vec<String> {
        paths.iter().map(|p| file_id(root, p)).collect()
    }

    #[test]
    fn finds_sources_archives_and_roots() {
        let dir = TempDir::new().expect("failed to create temp dir");
        write(&dir, "src/main/java/com/acme/App.java", "package com.acme;\nclass App {}");
        write(&dir, "src/main/java/com/acme/util/Io.java", "package com.acme.util;\nclass Io {}");
        write(&dir, "src/test/java/AppTest.java", "class AppTest {}");
        write(&dir, "lib/guava.jar", "");
        write(&dir, "README.md", "# readme");

        let snapshot = FsSnapshotLocator::new()
            .locate(dir.path(), &[".git".to_string()], None)
            .expect("locate should succeed");

        assert_eq!(names(&snapshot.classpath, dir.path()), vec!["lib/guava.jar"]);
        assert_eq!(
            names(&snapshot.source_files, dir.path()),
            vec![
                "src/main/java/com/acme/App.java",
                "src/main/java/com/acme/util/Io.java",
                "src/test/java/AppTest.java",
            ]
        );
        assert_eq!(
            names(&snapshot.source_roots, dir.path()),
            vec!["src/main/java", "src/test/java"]
        );
    }

    #[test]
    fn skips_ignored_names_and_pattern() {
        let dir = TempDir::new().expect("failed to create temp dir");
        write(&dir, ".git/objects/Hidden.java", "class Hidden {}");
        write(&dir, "build/generated/Gen.java", "class Gen {}");
        write(&dir, "src/Keep.java", "class Keep {}");

        let pattern = Regex::new(r"^build(/|$)").unwrap();
        let snapshot = FsSnapshotLocator::new()
            .locate(dir.path(), &[".git".to_string()], Some(&pattern))
            .expect("locate should succeed");

        assert_eq!(names(&snapshot.source_files, dir.path()), vec!["src/Keep.java"]);
    }

    #[test]
    fn mismatched_package_uses_parent_directory() {
        let dir = TempDir::new().expect("failed to create temp dir");
        write(&dir, "src/Odd.java", "package com.acme;\nclass Odd {}");

        let snapshot = FsSnapshotLocator::new()
            .locate(dir.path(), &[], None)
            .expect("locate should succeed");

        assert_eq!(names(&snapshot.source_roots, dir.path()), vec!["src"]);
    }

    #[test]
    fn empty_tree_yields_empty_snapshot() {
        let dir = TempDir::new().expect("failed to create temp dir");

        let snapshot = FsSnapshotLocator::new()
            .locate(dir.path(), &[], None)
            .expect("locate should succeed");

        assert!(snapshot.is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let missing = dir.path().join("nope");

        let result = FsSnapshotLocator::new().locate(&missing, &[], None);

        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn declared_package_ignores_comments_before_it() {
        assert_eq!(
            declared_package("// header\n/* c */\npackage a.b.c;\nclass X {}".as_bytes()),
            Some("a.b.c".to_string())
        );
        assert_eq!(
            declared_package("/*\n * License\n */ package d.e;\n".as_bytes()),
            Some("d.e".to_string())
        );
        assert_eq!(declared_package("class X {}".as_bytes()), None);
    }

    #[test]
    fn package_scan_stops_at_the_first_declaration() {
        // Package-like text after imports or inside a class body is not a declaration
        assert_eq!(
            declared_package("import a.B;\npackage late.one;\n".as_bytes()),
            None
        );
        assert_eq!(
            declared_package(
                "@Generated\nclass X {\n    String s = \"\n\npackage fake;\n\";\n}\n".as_bytes()
            ),
            None
        );
        // Not valid UTF-8 past the header
        let mut bytes = b"package ok.fine;\n".to_vec();
        bytes.extend_from_slice(&[0xff; 64]);
        assert_eq!(declared_package(bytes.as_slice()), Some("ok.fine".to_string()));
    }
}
