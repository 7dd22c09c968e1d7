//! Domain types for histograph.
//!
//! These types represent the core domain model:
//! - **History**: `CommitInfo` (one entry of the walked history)
//! - **Snapshot**: `ProjectSnapshot` (what the working tree holds at a commit)
//! - **Graph**: `MethodKey`, `MethodNode`, `CallEdge` (the per-commit call graph)
//! - **Ranges**: `LineRange` (declared method extents and changed diff lines)
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | File id | Repository-relative `/` path | Matches diff paths without rewriting |
//! | Method identity | (file id, qualified signature) | Overloads stay distinct |
//! | Changed flag | `AtomicBool` | Flipped through a shared graph reference |
//! | Line ranges | 1-indexed, inclusive | Matches hunk header numbering |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// Enums
// ============================================================================

/// Supported programming languages.
///
/// The pipeline only understands the languages listed here; everything else in
/// a working tree is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Java source files (`.java`)
    Java,
}

impl Language {
    /// File extensions handled by this language.
    #[must_use]
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Java => &["java"],
        }
    }

    /// Detect language from file extension.
    ///
    /// # Returns
    ///
    /// `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "java" => Some(Self::Java),
            _ => None,
        }
    }

    /// Detect language from a path's extension.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let (_, ext) = path.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Lowercase name of the language.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java => "java",
        }
    }
}

/// What kind of method declaration a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Ordinary (instance or static) method
    Method,
    /// Constructor, named `<init>` in signatures
    Constructor,
}

impl MethodKind {
    /// Lowercase name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Constructor => "constructor",
        }
    }
}

// ============================================================================
// Line ranges
// ============================================================================

/// An inclusive range of 1-indexed source lines.
///
/// Used both for the extent of a method declaration and for the lines a diff
/// hunk touched in the post-change file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawLineRange")]
pub struct LineRange {
    /// First line (1-indexed)
    pub start: u32,
    /// Last line (1-indexed, inclusive)
    pub end: u32,
}

impl LineRange {
    /// Create a new range with validation.
    ///
    /// Returns `None` if `end` is before `start` or `start` is zero.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Option<Self> {
        if start == 0 || end < start {
            return None;
        }
        Some(Self { start, end })
    }

    /// A range covering exactly one line.
    #[must_use]
    pub fn line(line: u32) -> Option<Self> {
        Self::new(line, line)
    }

    /// Whether two ranges share at least one line.
    ///
    /// Boundaries are inclusive: `[10, 15]` and `[15, 20]` overlap.
    #[must_use]
    pub fn overlaps(&self, other: &LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of lines covered.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always `false`; a valid range covers at least one line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Unchecked wire form of [`LineRange`]; deserialization goes through
/// [`LineRange::new`].
#[derive(Deserialize)]
struct RawLineRange {
    start: u32,
    end: u32,
}

impl TryFrom<RawLineRange> for LineRange {
    type Error = String;

    fn try_from(raw: RawLineRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end).ok_or_else(|| {
            format!(
                "invalid line range {}-{}: lines start at 1 and end must not precede start",
                raw.start, raw.end
            )
        })
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

// ============================================================================
// Graph entities
// ============================================================================

/// Identity of a method within one call graph.
///
/// The signature is `package.Outer.Inner.name(ParamType,...)` with generic
/// arguments erased and constructors named `<init>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodKey {
    /// Repository-relative path of the declaring file
    pub file: String,
    /// Qualified signature
    pub signature: String,
}

impl MethodKey {
    /// Create a key from a file id and a qualified signature.
    #[must_use]
    pub fn new(file: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            signature: signature.into(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file, self.signature)
    }
}

/// A method declaration in the call graph.
///
/// Created once per declaration during a build. The only mutation after
/// creation is raising the changed flag, which is atomic so correlation can
/// run against a shared graph.
#[derive(Debug)]
pub struct MethodNode {
    /// Identity of the method
    pub key: MethodKey,
    /// Method or constructor
    pub kind: MethodKind,
    /// Declared extent of the method
    pub lines: LineRange,
    changed: AtomicBool,
}

impl MethodNode {
    /// Create an unchanged node.
    #[must_use]
    pub fn new(key: MethodKey, kind: MethodKind, lines: LineRange) -> Self {
        Self {
            key,
            kind,
            lines,
            changed: AtomicBool::new(false),
        }
    }

    /// Whether the commit's diff touched this method.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Flag the method as changed. Returns `true` if it was not flagged before.
    pub fn mark_changed(&self) -> bool {
        !self.changed.swap(true, Ordering::AcqRel)
    }
}

impl Clone for MethodNode {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            kind: self.kind,
            lines: self.lines,
            changed: AtomicBool::new(self.is_changed()),
        }
    }
}

impl PartialEq for MethodNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.kind == other.kind
            && self.lines == other.lines
            && self.is_changed() == other.is_changed()
    }
}

impl Eq for MethodNode {}

impl Serialize for MethodNode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("MethodNode", 4)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("lines", &self.lines)?;
        state.serialize_field("changed", &self.is_changed())?;
        state.end()
    }
}

/// A resolved caller → callee relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallEdge {
    /// The method containing the call site
    pub caller: MethodKey,
    /// The method the call site binds to
    pub callee: MethodKey,
}

// ============================================================================
// History and snapshots
// ============================================================================

/// Metadata of one commit in the walked history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full commit hash
    pub id: String,
    /// Abbreviated hash (12 characters)
    pub short_id: String,
    /// Author name
    pub author: String,
    /// Author email
    pub email: String,
    /// First line of the commit message
    pub summary: String,
    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
}

impl CommitInfo {
    /// Create a commit record with only an id, for fakes and working-tree builds.
    #[must_use]
    pub fn bare(id: impl Into<String>) -> Self {
        let id = id.into();
        let short_id = id.chars().take(12).collect();
        Self {
            id,
            short_id,
            author: String::new(),
            email: String::new(),
            summary: String::new(),
            timestamp: DateTime::<Utc>::default(),
        }
    }
}

/// What the working tree holds at one commit.
///
/// Rebuilt from scratch for every commit; nothing carries over between steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSnapshot {
    /// Library archives, in discovery order
    pub classpath: Vec<PathBuf>,
    /// Source root directories, in discovery order
    pub source_roots: Vec<PathBuf>,
    /// Source files, sorted and de-duplicated
    pub source_files: Vec<PathBuf>,
}

impl ProjectSnapshot {
    /// Whether the snapshot holds no source files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source_files.is_empty()
    }
}
