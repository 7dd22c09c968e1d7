//! Unified diff parsing and diff-to-graph correlation.
//!
//! Only the structure of a diff matters here: which files changed and which
//! lines of the new version each hunk covers. Hunk bodies, when present, are skipped by
//! their declared line counts so that a removed line such as `--- x` is never
//! mistaken for a file header.
//!
//! ## Line ranges
//!
//! | Header | Range in the new file |
//! |--------|-----------------------|
//! | `+c,d` with `d > 0` | `[c, c+d-1]` |
//! | `+c` | `[c, c]` |
//! | `+c,0` (pure deletion) | `[max(c,1), max(c,1)]` |
//!
//! A pure deletion has no lines in the new file. Its position still falls
//! inside the method the lines were removed from, so that method is flagged.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Diagnostic;
use crate::graph::CallGraph;
use crate::types::{Language, LineRange};

static HUNK_HEADER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").ok()
});

/// Path used for diagnostics that can't be tied to a file.
const UNKNOWN_FILE: &str = "<diff>";

/// Changes to one file.
#[derive(Debug, Clone, Default)]
pub struct FileChange {
    /// Path before the change (`None` for an added file)
    pub old_path: Option<String>,
    /// Path after the change (`None` for a deleted file)
    pub new_path: Option<String>,
    /// Touched lines of the new file, in hunk order
    pub ranges: Vec<LineRange>,
    /// Hunk headers that could not be interpreted
    pub diagnostics: Vec<Diagnostic>,
}

impl FileChange {
    /// Path to report this change under.
    #[must_use]
    pub fn display_path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or(UNKNOWN_FILE)
    }

    /// Whether the file no longer exists after the change.
    #[must_use]
    pub fn is_deletion(&self) -> bool {
        self.new_path.is_none() && self.old_path.is_some()
    }

    fn has_content(&self) -> bool {
        self.old_path.is_some()
            || self.new_path.is_some()
            || !self.ranges.is_empty()
            || !self.diagnostics.is_empty()
    }
}

/// Parse the file and hunk headers of a unified diff.
///
/// Recognizes `diff --git`, `---`, `+++` and `@@` lines; everything else is
/// ignored. A malformed hunk header is recorded on its file and parsing
/// continues with the next line.
#[must_use]
pub fn parse_unified_diff(text: &str) -> Vec<FileChange> {
    let mut files = Vec::new();
    let mut current = FileChange::default();
    // Body lines still expected from the current hunk (old side, new side)
    let mut pending = (0u64, 0u64);

    let lines: Vec<&str> = text.lines().collect();
    for (index, &line) in lines.iter().enumerate() {
        if pending.0 > 0 || pending.1 > 0 {
            if starts_file_header(&lines[index..]) {
                pending = (0, 0);
            } else {
                match line.as_bytes().first() {
                    Some(b'-') => {
                        pending.0 = pending.0.saturating_sub(1);
                        continue;
                    }
                    Some(b'+') => {
                        pending.1 = pending.1.saturating_sub(1);
                        continue;
                    }
                    Some(b'\\') => continue,
                    Some(b' ') | None => {
                        pending.0 = pending.0.saturating_sub(1);
                        pending.1 = pending.1.saturating_sub(1);
                        continue;
                    }
                    // Header-only output: the next header ends the hunk
                    _ => pending = (0, 0),
                }
            }
        }

        if line.starts_with("diff --git ") {
            if current.has_content() {
                files.push(std::mem::take(&mut current));
            }
        } else if let Some(path) = line.strip_prefix("--- ") {
            // A `---` after hunks or a `+++` starts the next file in diffs
            // without `diff --git` lines
            if current.new_path.is_some() || !current.ranges.is_empty() {
                files.push(std::mem::take(&mut current));
            }
            current.old_path = header_path(path, "a/");
        } else if let Some(path) = line.strip_prefix("+++ ") {
            current.new_path = header_path(path, "b/");
        } else if line.starts_with("@@") {
            match parse_hunk_header(line) {
                Some(hunk) => {
                    trace!(file = current.display_path(), range = %hunk.range, "Parsed hunk");
                    current.ranges.push(hunk.range);
                    pending = (hunk.old_count, hunk.new_count);
                }
                None => {
                    debug!(file = current.display_path(), header = line, "Malformed hunk header");
                    let diagnostic = Diagnostic::malformed_hunk(current.display_path(), line);
                    current.diagnostics.push(diagnostic);
                }
            }
        }
    }

    if current.has_content() {
        files.push(current);
    }
    files
}

/// Whether `lines` open with a `---`/`+++` pair that is followed by a hunk
/// header or by nothing at all.
///
/// Header-only output carries no bodies, so a pending hunk count would
/// otherwise swallow the next file's headers. A removed `--- x` line followed
/// by an added `+++ y` line inside a real body is followed by more body lines.
fn starts_file_header(lines: &[&str]) -> bool {
    match lines {
        [old, new, rest @ ..] if old.starts_with("--- ") && new.starts_with("+++ ") => {
            rest.first().is_none_or(|next| next.starts_with("@@"))
        }
        _ => false,
    }
}

/// `a/src/Foo.java` -> `src/Foo.java`; `/dev/null` -> `None`.
fn header_path(raw: &str, prefix: &str) -> Option<String> {
    // Some producers append a tab and a timestamp
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    if raw == "/dev/null" {
        return None;
    }
    let path = match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(quoted) => unquote(quoted),
        None => raw.to_string(),
    };
    Some(match path.strip_prefix(prefix) {
        Some(stripped) => stripped.to_string(),
        None => path,
    })
}

/// Decode the C-style escapes Git uses in quoted paths.
///
/// Non-ASCII bytes arrive as `\ooo` octal escapes and are reassembled
/// before UTF-8 decoding, so `Caf\303\251.java` becomes `Café.java`.
fn unquote(quoted: &str) -> String {
    let mut bytes = Vec::with_capacity(quoted.len());
    let mut rest = quoted.as_bytes();

    while let Some((&byte, tail)) = rest.split_first() {
        rest = tail;
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        let Some((&escape, tail)) = rest.split_first() else {
            bytes.push(byte);
            break;
        };
        rest = tail;
        match escape {
            b'0'..=b'7' => {
                let mut value = u32::from(escape - b'0');
                let digits = rest
                    .iter()
                    .take(2)
                    .take_while(|&&d| matches!(d, b'0'..=b'7'))
                    .count();
                for digit in &rest[..digits] {
                    value = value * 8 + u32::from(digit - b'0');
                }
                rest = &rest[digits..];
                bytes.push(u8::try_from(value).unwrap_or(u8::MAX));
            }
            b'a' => bytes.push(0x07),
            b'b' => bytes.push(0x08),
            b'f' => bytes.push(0x0c),
            b'n' => bytes.push(b'\n'),
            b'r' => bytes.push(b'\r'),
            b't' => bytes.push(b'\t'),
            b'v' => bytes.push(0x0b),
            other => bytes.push(other),
        }
    }

    match String::from_utf8(bytes) {
        Ok(path) => path,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

struct Hunk {
    range: LineRange,
    old_count: u64,
    new_count: u64,
}

fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let captures = HUNK_HEADER.as_ref()?.captures(line)?;
    let number = |index: usize, default: u64| -> Option<u64> {
        match captures.get(index) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    let old_count = number(2, 1)?;
    let new_start = u32::try_from(number(3, 0)?).ok()?;
    let new_count = number(4, 1)?;

    let range = if new_count == 0 {
        LineRange::line(new_start.max(1))?
    } else {
        let count = u32::try_from(new_count).ok()?;
        let end = new_start.checked_add(count - 1)?;
        LineRange::new(new_start, end)?
    };

    Some(Hunk {
        range,
        old_count,
        new_count,
    })
}

/// What correlating one diff did to a graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorrelationReport {
    /// Changed source files whose ranges were applied
    pub files_considered: usize,
    /// Changed files ignored (deleted, or not source files)
    pub files_skipped: usize,
    /// Ranges applied to the graph
    pub ranges_applied: usize,
    /// Methods newly flagged as changed
    pub methods_marked: usize,
    /// Malformed hunks, one per header
    pub diagnostics: Vec<Diagnostic>,
}

/// Flags the methods a diff touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffCorrelator;

impl DiffCorrelator {
    /// Create a correlator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse `diff` and flag every method of `graph` overlapping a changed range.
    ///
    /// Files whose new path is absent (deleted) or isn't a Java source are
    /// skipped. Diagnostics for malformed hunks are collected, never fatal.
    pub fn correlate(&self, diff: &str, graph: &CallGraph) -> CorrelationReport {
        let mut report = CorrelationReport::default();

        for change in parse_unified_diff(diff) {
            report.diagnostics.extend(change.diagnostics.iter().cloned());

            let Some(new_path) = change.new_path.as_deref() else {
                report.files_skipped += 1;
                continue;
            };
            if Language::from_path(new_path) != Some(Language::Java) {
                report.files_skipped += 1;
                continue;
            }

            report.files_considered += 1;
            for range in &change.ranges {
                report.ranges_applied += 1;
                report.methods_marked += graph.mark_changed(new_path, range);
            }
        }

        debug!(
            files = report.files_considered,
            skipped = report.files_skipped,
            marked = report.methods_marked,
            malformed = report.diagnostics.len(),
            "Diff correlated"
        );
        report
    }
}
