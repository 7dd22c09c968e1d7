//! Common extraction types shared across language implementations.
//!
//! These types represent the intermediate output of tree-sitter extraction,
//! before declarations become graph nodes and call sites become edges.

use std::collections::HashMap;

use crate::types::{LineRange, MethodKey, MethodKind};

/// Declarations found in one source file.
#[derive(Debug, Clone, Default)]
pub struct FileOutline {
    /// File id the outline was extracted from
    pub file: String,
    /// Declared package, if any
    pub package: Option<String>,
    /// Import declarations
    pub imports: Vec<ImportStatement>,
    /// Type declarations, outer types before the types nested in them
    pub types: Vec<TypeOutline>,
}

impl FileOutline {
    /// All method declarations in the file, in declaration order per type.
    pub fn methods(&self) -> impl Iterator<Item = &MethodOutline> {
        self.types.iter().flat_map(|t| t.methods.iter())
    }
}

/// A class, interface, enum or record declaration.
#[derive(Debug, Clone)]
pub struct TypeOutline {
    /// Simple name (`Inner`)
    pub name: String,
    /// Qualified name (`pkg.Outer.Inner`)
    pub qualified_name: String,
    /// Qualified name of the lexically enclosing type
    pub outer: Option<String>,
    /// Superclass as written, with generic arguments erased
    pub superclass: Option<String>,
    /// Field name -> declared type (erased)
    pub fields: HashMap<String, String>,
    /// Methods and constructors declared directly in this type
    pub methods: Vec<MethodOutline>,
}

/// A method or constructor declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOutline {
    /// Simple name; constructors use `<init>`
    pub name: String,
    /// Method or constructor
    pub kind: MethodKind,
    /// Graph identity
    pub key: MethodKey,
    /// Number of declared parameters (a varargs parameter counts as one)
    pub arity: usize,
    /// Whether the last parameter is varargs
    pub varargs: bool,
    /// Declared extent
    pub lines: LineRange,
}

impl MethodOutline {
    /// Whether a call with `arg_count` arguments can bind to this declaration.
    #[must_use]
    pub fn accepts(&self, arg_count: usize) -> bool {
        if self.varargs {
            arg_count + 1 >= self.arity
        } else {
            arg_count == self.arity
        }
    }
}

/// An import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Dotted path without the trailing `.*` (e.g., `java.util.List`)
    pub path: String,
    /// `import static`
    pub is_static: bool,
    /// Whether this is an on-demand (`.*`) import
    pub is_wildcard: bool,
    /// Line number (1-indexed)
    pub line: u32,
}

/// A call expression inside a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Method containing the call
    pub caller: MethodKey,
    /// Qualified name of the type declaring the caller
    pub enclosing_type: String,
    /// What kind of call this is
    pub kind: CallKind,
    /// Method name, or the constructed type for `new T(...)`
    pub name: String,
    /// What the call is made on
    pub receiver: Receiver,
    /// Number of arguments at the call site
    pub arg_count: usize,
    /// Line number (1-indexed)
    pub line: u32,
}

/// Kind of call expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `m(...)`, `x.m(...)`
    Method,
    /// `new T(...)`
    Constructor,
    /// `this(...)` inside a constructor
    ThisConstructor,
    /// `super(...)` inside a constructor
    SuperConstructor,
}

/// The receiver of a method call, as far as syntax reveals it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Receiver {
    /// No receiver: `m()`
    Implicit,
    /// `this.m()`
    This,
    /// `super.m()`
    Super,
    /// `x.m()` where `x` is a plain name; `local_type` is set when `x` is a
    /// parameter or local variable with a declared type
    Name {
        /// The name as written
        name: String,
        /// Declared type of the local, if known
        local_type: Option<String>,
    },
    /// `this.f.m()`
    Field(String),
    /// `a.b.C.m()`: a dotted chain of plain names
    Path(String),
    /// An expression whose static type is syntactically evident
    /// (`new T().m()`, `((T) x).m()`)
    Typed(String),
    /// Any other expression
    Opaque,
}
