//! Binding call sites to method declarations.
//!
//! A `SymbolResolver` is the one stateful collaborator of a graph build: it
//! memoizes type lookups and inheritance chains while call sites stream in
//! from every worker. `SerializedResolver` puts a resolver behind a mutex so
//! that at most one resolution is in flight at any time.
//!
//! ## Binding rules
//!
//! `DeclarationResolver` only knows the declarations found in the snapshot
//! being built. Calls into libraries on the classpath stay unresolved.
//!
//! | Call | Searched |
//! |------|----------|
//! | `m()`, `this.m()` | enclosing type and its superclasses, then lexically enclosing types |
//! | `super.m()` | superclasses of the enclosing type |
//! | `x.m()` | declared type of local, parameter or field `x`; else `x` as a type |
//! | `a.b.T.m()` | type `a.b.T` |
//! | `new T()` | constructors of `T` |
//! | `this()`, `super()` | constructors of the enclosing type or its superclass |
//!
//! Overloads are narrowed by argument count. Remaining ties pick the lowest
//! key so the result never depends on scheduling.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{trace, warn};

use crate::languages::common::{
    CallKind, CallSite, FileOutline, ImportStatement, MethodOutline, Receiver,
};
use crate::types::{MethodKey, MethodKind};

/// Outcome of resolving one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The call binds to this method
    Resolved(MethodKey),
    /// No declaration in the snapshot matches
    Unresolved(UnresolvedReason),
}

impl Resolution {
    /// The resolved key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&MethodKey> {
        match self {
            Self::Resolved(key) => Some(key),
            Self::Unresolved(_) => None,
        }
    }
}

/// Why a call site could not be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The receiver expression has no statically known type
    OpaqueReceiver,
    /// A type name doesn't refer to a type declared in the snapshot
    UnknownType(String),
    /// The type is known but declares no matching method
    NoMatchingMethod {
        /// Type searched first
        type_name: String,
        /// Method name at the call site
        name: String,
        /// Argument count at the call site
        arg_count: usize,
    },
    /// `super` used in a type without a known superclass
    NoSuperclass(String),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpaqueReceiver => write!(f, "receiver type unknown"),
            Self::UnknownType(name) => write!(f, "unknown type {name}"),
            Self::NoMatchingMethod {
                type_name,
                name,
                arg_count,
            } => write!(f, "no {name}/{arg_count} in {type_name}"),
            Self::NoSuperclass(name) => write!(f, "{name} has no known superclass"),
        }
    }
}

/// Counters kept by a resolver over one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Call sites bound to a declaration
    pub resolved: usize,
    /// Call sites left unbound
    pub unresolved: usize,
    /// Lookups answered from memoized state
    pub cache_hits: usize,
}

/// Binds call sites to declarations.
///
/// Implementations may keep mutable state across calls; callers share them
/// through `SerializedResolver`.
pub trait SymbolResolver: Send {
    /// Resolve one call site.
    fn resolve(&mut self, site: &CallSite) -> Resolution;

    /// Counters accumulated so far.
    fn stats(&self) -> ResolverStats {
        ResolverStats::default()
    }
}

/// A resolver shared by all workers of one build.
///
/// Every call takes the lock for its full duration, so resolutions never
/// overlap. A worker that panics while holding the lock poisons it; the
/// resolver's state is only caches and counters, so later calls recover the
/// guard and carry on.
#[derive(Debug)]
pub struct SerializedResolver<R> {
    inner: Mutex<R>,
}

impl<R: SymbolResolver> SerializedResolver<R> {
    /// Wrap a resolver.
    pub fn new(resolver: R) -> Self {
        Self {
            inner: Mutex::new(resolver),
        }
    }

    /// Resolve a call site, blocking while another resolution is in flight.
    pub fn resolve(&self, site: &CallSite) -> Resolution {
        self.lock().resolve(site)
    }

    /// Counters of the wrapped resolver.
    pub fn stats(&self) -> ResolverStats {
        self.lock().stats()
    }

    /// Unwrap the resolver.
    pub fn into_inner(self) -> R {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, R> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Resolver lock poisoned by a failed task, continuing");
            poisoned.into_inner()
        })
    }
}

// ============================================================================
// Declaration index
// ============================================================================

/// A type declaration as seen by the resolver.
#[derive(Debug, Clone)]
struct TypeEntry {
    name: String,
    file: String,
    outer: Option<String>,
    superclass: Option<String>,
    fields: HashMap<String, String>,
    methods: Vec<MethodOutline>,
    /// Simple name -> qualified name of directly nested types
    nested: HashMap<String, String>,
}

/// Package and imports of one file, the scope type names resolve in.
#[derive(Debug, Clone, Default)]
struct FileScope {
    package: Option<String>,
    imports: Vec<ImportStatement>,
}

/// Every type and method declared in one snapshot.
#[derive(Debug, Clone, Default)]
pub struct DeclarationIndex {
    types: HashMap<String, TypeEntry>,
    by_simple_name: HashMap<String, Vec<String>>,
    files: HashMap<String, FileScope>,
}

impl DeclarationIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from file outlines.
    ///
    /// Outlines should arrive in a stable order: when two files declare the
    /// same qualified type, the first one wins.
    pub fn from_outlines<'a>(outlines: impl IntoIterator<Item = &'a FileOutline>) -> Self {
        let mut index = Self::new();
        for outline in outlines {
            index.add(outline);
        }
        index
    }

    /// Add the declarations of one file.
    pub fn add(&mut self, outline: &FileOutline) {
        self.files.insert(
            outline.file.clone(),
            FileScope {
                package: outline.package.clone(),
                imports: outline.imports.clone(),
            },
        );

        for ty in &outline.types {
            if self.types.contains_key(&ty.qualified_name) {
                trace!(
                    type_name = %ty.qualified_name,
                    file = %outline.file,
                    "Type declared twice, keeping first declaration"
                );
                continue;
            }

            if let Some(outer) = ty.outer.as_ref().and_then(|o| self.types.get_mut(o)) {
                outer
                    .nested
                    .insert(ty.name.clone(), ty.qualified_name.clone());
            }

            self.by_simple_name
                .entry(ty.name.clone())
                .or_default()
                .push(ty.qualified_name.clone());

            self.types.insert(
                ty.qualified_name.clone(),
                TypeEntry {
                    name: ty.name.clone(),
                    file: outline.file.clone(),
                    outer: ty.outer.clone(),
                    superclass: ty.superclass.clone(),
                    fields: ty.fields.clone(),
                    methods: ty.methods.clone(),
                    nested: HashMap::new(),
                },
            );
        }
    }

    /// Number of indexed types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of indexed methods and constructors.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.types.values().map(|t| t.methods.len()).sum()
    }

    /// Whether a qualified type name is declared in the snapshot.
    #[must_use]
    pub fn contains_type(&self, qualified_name: &str) -> bool {
        self.types.contains_key(qualified_name)
    }

    /// Resolve a type name as written inside `context` (a qualified type name).
    fn lookup_type(&self, context: &str, name: &str) -> Option<String> {
        if name.ends_with(']') {
            return None;
        }

        if let Some((first, rest)) = name.split_once('.') {
            if self.types.contains_key(name) {
                return Some(name.to_string());
            }
            let head = self.lookup_simple_type(context, first)?;
            let candidate = format!("{head}.{rest}");
            return self.types.contains_key(&candidate).then_some(candidate);
        }

        self.lookup_simple_type(context, name)
    }

    fn lookup_simple_type(&self, context: &str, name: &str) -> Option<String> {
        // The context type, its nested types and those of every enclosing type
        let mut current = self.types.get(context).map(|_| context.to_string());
        while let Some(ty) = current {
            let entry = self.types.get(&ty)?;
            if entry.name == name {
                return Some(ty);
            }
            if let Some(nested) = entry.nested.get(name) {
                return Some(nested.clone());
            }
            current = entry.outer.clone();
        }

        let scope = self
            .types
            .get(context)
            .and_then(|entry| self.files.get(&entry.file));

        if let Some(scope) = scope {
            let same_package = match &scope.package {
                Some(package) => format!("{package}.{name}"),
                None => name.to_string(),
            };
            if self.types.contains_key(&same_package) {
                return Some(same_package);
            }

            let suffix = format!(".{name}");
            for import in scope.imports.iter().filter(|i| !i.is_wildcard && !i.is_static) {
                if import.path.ends_with(&suffix) && self.types.contains_key(&import.path) {
                    return Some(import.path.clone());
                }
            }

            for import in scope.imports.iter().filter(|i| i.is_wildcard) {
                let candidate = format!("{}.{name}", import.path);
                if self.types.contains_key(&candidate) {
                    return Some(candidate);
                }
            }
        }

        match self.by_simple_name.get(name).map(Vec::as_slice) {
            Some([only]) => Some(only.clone()),
            _ => None,
        }
    }

    /// Best matching method named `name` declared directly in `type_name`.
    fn method_in_type(
        &self,
        type_name: &str,
        kind: MethodKind,
        name: &str,
        arg_count: usize,
    ) -> Option<&MethodOutline> {
        let entry = self.types.get(type_name)?;
        let candidates = entry
            .methods
            .iter()
            .filter(|m| m.kind == kind && m.name == name && m.accepts(arg_count));

        // Fixed arity beats varargs; ties go to the lowest key
        candidates.min_by(|a, b| a.varargs.cmp(&b.varargs).then_with(|| a.key.cmp(&b.key)))
    }
}

// ============================================================================
// Declaration resolver
// ============================================================================

/// Resolver over the declarations of one snapshot.
///
/// Memoizes type-name lookups per context type and superclass chains per
/// type, which is why resolution needs `&mut self`.
#[derive(Debug)]
pub struct DeclarationResolver {
    index: DeclarationIndex,
    type_cache: HashMap<(String, String), Option<String>>,
    chains: HashMap<String, Vec<String>>,
    stats: ResolverStats,
}

impl DeclarationResolver {
    /// Create a resolver over an index.
    #[must_use]
    pub fn new(index: DeclarationIndex) -> Self {
        Self {
            index,
            type_cache: HashMap::new(),
            chains: HashMap::new(),
            stats: ResolverStats::default(),
        }
    }

    /// The underlying declaration index.
    #[must_use]
    pub fn index(&self) -> &DeclarationIndex {
        &self.index
    }

    fn resolve_type(&mut self, context: &str, name: &str) -> Option<String> {
        let cache_key = (context.to_string(), name.to_string());
        if let Some(cached) = self.type_cache.get(&cache_key) {
            self.stats.cache_hits += 1;
            return cached.clone();
        }
        let resolved = self.index.lookup_type(context, name);
        self.type_cache.insert(cache_key, resolved.clone());
        resolved
    }

    /// `type_name` followed by its known superclasses.
    fn chain(&mut self, type_name: &str) -> Vec<String> {
        if let Some(chain) = self.chains.get(type_name) {
            self.stats.cache_hits += 1;
            return chain.clone();
        }

        let mut chain = vec![type_name.to_string()];
        let mut current = type_name.to_string();
        while let Some(superclass) = self
            .index
            .types
            .get(&current)
            .and_then(|entry| entry.superclass.clone())
        {
            match self.resolve_type(&current, &superclass) {
                Some(next) if !chain.contains(&next) => {
                    chain.push(next.clone());
                    current = next;
                }
                _ => break,
            }
        }

        self.chains.insert(type_name.to_string(), chain.clone());
        chain
    }

    fn superclass_of(&mut self, type_name: &str) -> Option<String> {
        self.chain(type_name).get(1).cloned()
    }

    fn method_in_chain(&mut self, type_name: &str, name: &str, arg_count: usize) -> Option<MethodKey> {
        self.chain(type_name).iter().find_map(|ty| {
            self.index
                .method_in_type(ty, MethodKind::Method, name, arg_count)
                .map(|m| m.key.clone())
        })
    }

    fn methods_of(&mut self, type_name: &str, site: &CallSite) -> Resolution {
        match self.method_in_chain(type_name, &site.name, site.arg_count) {
            Some(key) => Resolution::Resolved(key),
            None => Resolution::Unresolved(UnresolvedReason::NoMatchingMethod {
                type_name: type_name.to_string(),
                name: site.name.clone(),
                arg_count: site.arg_count,
            }),
        }
    }

    fn constructor_of(&self, type_name: &str, arg_count: usize) -> Resolution {
        match self
            .index
            .method_in_type(type_name, MethodKind::Constructor, "<init>", arg_count)
        {
            Some(method) => Resolution::Resolved(method.key.clone()),
            None => Resolution::Unresolved(UnresolvedReason::NoMatchingMethod {
                type_name: type_name.to_string(),
                name: "<init>".to_string(),
                arg_count,
            }),
        }
    }

    /// Declared type of field `name` visible from `type_name`, resolved.
    fn field_type(&mut self, type_name: &str, name: &str) -> Option<String> {
        let mut lexical = Some(type_name.to_string());
        while let Some(ty) = lexical {
            for declaring in self.chain(&ty) {
                let declared = self
                    .index
                    .types
                    .get(&declaring)
                    .and_then(|entry| entry.fields.get(name).cloned());
                if let Some(declared) = declared {
                    return self.resolve_type(&declaring, &declared);
                }
            }
            lexical = self.index.types.get(&ty).and_then(|entry| entry.outer.clone());
        }
        None
    }

    fn resolve_unqualified(&mut self, site: &CallSite, lexical: bool) -> Resolution {
        let mut current = Some(site.enclosing_type.clone());
        while let Some(ty) = current {
            if let Some(key) = self.method_in_chain(&ty, &site.name, site.arg_count) {
                return Resolution::Resolved(key);
            }
            if !lexical {
                break;
            }
            current = self.index.types.get(&ty).and_then(|entry| entry.outer.clone());
        }

        Resolution::Unresolved(UnresolvedReason::NoMatchingMethod {
            type_name: site.enclosing_type.clone(),
            name: site.name.clone(),
            arg_count: site.arg_count,
        })
    }

    fn resolve_on_type_name(&mut self, site: &CallSite, type_name: &str) -> Resolution {
        match self.resolve_type(&site.enclosing_type, type_name) {
            Some(ty) => self.methods_of(&ty, site),
            None => Resolution::Unresolved(UnresolvedReason::UnknownType(type_name.to_string())),
        }
    }

    fn resolve_method_call(&mut self, site: &CallSite) -> Resolution {
        match &site.receiver {
            Receiver::Implicit => self.resolve_unqualified(site, true),
            Receiver::This => self.resolve_unqualified(site, false),
            Receiver::Super => match self.superclass_of(&site.enclosing_type) {
                Some(superclass) => self.methods_of(&superclass, site),
                None => Resolution::Unresolved(UnresolvedReason::NoSuperclass(
                    site.enclosing_type.clone(),
                )),
            },
            Receiver::Name { name, local_type } => {
                if let Some(local_type) = local_type {
                    return self.resolve_on_type_name(site, local_type);
                }
                if let Some(field_type) = self.field_type(&site.enclosing_type, name) {
                    return self.methods_of(&field_type, site);
                }
                // Neither local nor field: a static call on a type
                self.resolve_on_type_name(site, name)
            }
            Receiver::Field(field) => match self.field_type(&site.enclosing_type, field) {
                Some(ty) => self.methods_of(&ty, site),
                None => Resolution::Unresolved(UnresolvedReason::UnknownType(field.clone())),
            },
            Receiver::Path(path) | Receiver::Typed(path) => self.resolve_on_type_name(site, path),
            Receiver::Opaque => Resolution::Unresolved(UnresolvedReason::OpaqueReceiver),
        }
    }
}

impl SymbolResolver for DeclarationResolver {
    fn resolve(&mut self, site: &CallSite) -> Resolution {
        let resolution = match site.kind {
            CallKind::Method => self.resolve_method_call(site),
            CallKind::Constructor => match self.resolve_type(&site.enclosing_type, &site.name) {
                Some(ty) => self.constructor_of(&ty, site.arg_count),
                None => Resolution::Unresolved(UnresolvedReason::UnknownType(site.name.clone())),
            },
            CallKind::ThisConstructor => self.constructor_of(&site.enclosing_type, site.arg_count),
            CallKind::SuperConstructor => match self.superclass_of(&site.enclosing_type) {
                Some(superclass) => self.constructor_of(&superclass, site.arg_count),
                None => Resolution::Unresolved(UnresolvedReason::NoSuperclass(
                    site.enclosing_type.clone(),
                )),
            },
        };

        match &resolution {
            Resolution::Resolved(key) => {
                self.stats.resolved += 1;
                trace!(caller = %site.caller, callee = %key, line = site.line, "Resolved call");
            }
            Resolution::Unresolved(reason) => {
                self.stats.unresolved += 1;
                trace!(caller = %site.caller, name = %site.name, line = site.line, %reason, "Unresolved call");
            }
        }
        resolution
    }

    fn stats(&self) -> ResolverStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::java;
    use crate::parser::JavaParser;

    /// Index `files` and return a resolver plus every call site found.
    fn setup(files: &[(&str, &str)]) -> (DeclarationResolver, Vec<CallSite>) {
        let parser = JavaParser::new("/repo");
        let mut outlines = Vec::new();
        let mut sites = Vec::new();
        for (id, source) in files {
            let unit = parser.parse_source(id, *source).expect("parse should succeed");
            outlines.push(java::extract_outline(id, &unit.tree, unit.source.as_bytes()));
            sites.extend(java::extract_call_sites(id, &unit.tree, unit.source.as_bytes()));
        }
        let index = DeclarationIndex::from_outlines(&outlines);
        (DeclarationResolver::new(index), sites)
    }

    fn site<'a>(sites: &'a [CallSite], name: &str) -> &'a CallSite {
        sites
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("no call site named {name}"))
    }

    fn resolved_signature(resolver: &mut DeclarationResolver, site: &CallSite) -> Option<String> {
        resolver.resolve(site).key().map(|k| k.signature.clone())
    }

    #[test]
    fn binds_unqualified_call_in_same_class() {
        let (mut resolver, sites) = setup(&[(
            "A.java",
            "class A { void a() { b(); } void b() {} }",
        )]);

        let resolution = resolver.resolve(site(&sites, "b"));
        assert_eq!(
            resolution,
            Resolution::Resolved(MethodKey::new("A.java", "A.b()"))
        );
    }

    #[test]
    fn narrows_overloads_by_argument_count() {
        let (mut resolver, sites) = setup(&[(
            "A.java",
            "class A {\n\
               void a() { log(1); log(1, 2); log(); }\n\
               void log(int x) {}\n\
               void log(int x, int y) {}\n\
               void log(String... parts) {}\n\
             }",
        )]);

        let sigs: Vec<Option<String>> = sites
            .iter()
            .filter(|s| s.name == "log")
            .map(|s| resolved_signature(&mut resolver, s))
            .collect();
        assert_eq!(
            sigs,
            vec![
                Some("A.log(int)".to_string()),
                Some("A.log(int,int)".to_string()),
                Some("A.log(String[])".to_string()),
            ]
        );
    }

    #[test]
    fn follows_superclass_across_packages_via_import() {
        let (mut resolver, sites) = setup(&[
            (
                "base/Base.java",
                "package base; public class Base { protected void helper() {} }",
            ),
            (
                "app/Child.java",
                "package app; import base.Base; class Child extends Base { void run() { helper(); super.helper(); } }",
            ),
        ]);

        for call in sites.iter().filter(|s| s.name == "helper") {
            assert_eq!(
                resolver.resolve(call),
                Resolution::Resolved(MethodKey::new("base/Base.java", "base.Base.helper()"))
            );
        }
    }

    #[test]
    fn uses_declared_types_of_locals_and_fields() {
        let (mut resolver, sites) = setup(&[
            ("p/Repo.java", "package p; class Repo { void load() {} void save(int x) {} }"),
            (
                "p/Service.java",
                "package p; class Service {\n\
                   private Repo repo;\n\
                   void run(Repo other) { other.load(); repo.save(1); this.repo.load(); }\n\
                 }",
            ),
        ]);

        for call in &sites {
            let resolved = resolved_signature(&mut resolver, call);
            assert!(resolved.is_some(), "{} should resolve", call.name);
        }
        assert_eq!(
            resolved_signature(&mut resolver, site(&sites, "save")),
            Some("p.Repo.save(int)".to_string())
        );
    }

    #[test]
    fn resolves_static_calls_through_wildcard_imports() {
        let (mut resolver, sites) = setup(&[
            ("util/Strings.java", "package util; public class Strings { public static void trim(String s) {} }"),
            ("app/Main.java", "package app; import util.*; class Main { void run() { Strings.trim(\"x\"); } }"),
        ]);

        assert_eq!(
            resolved_signature(&mut resolver, site(&sites, "trim")),
            Some("util.Strings.trim(String)".to_string())
        );
    }

    #[test]
    fn resolves_constructor_calls() {
        let (mut resolver, sites) = setup(&[(
            "p/A.java",
            "package p;\n\
             class Base { Base(int x) {} }\n\
             class A extends Base {\n\
               A() { this(1); }\n\
               A(int x) { super(x); }\n\
               void make() { new A(); new Plain(); }\n\
             }\n\
             class Plain {}",
        )]);

        let resolved: Vec<Option<String>> = sites
            .iter()
            .map(|s| resolved_signature(&mut resolver, s))
            .collect();
        assert_eq!(
            resolved,
            vec![
                Some("p.A.<init>(int)".to_string()),
                Some("p.Base.<init>(int)".to_string()),
                Some("p.A.<init>()".to_string()),
                // No declared constructor, so no node to bind to
                None,
            ]
        );
    }

    #[test]
    fn inner_class_calls_reach_outer_methods() {
        let (mut resolver, sites) = setup(&[(
            "Outer.java",
            "class Outer {\n\
               void shared() {}\n\
               class Inner { void run() { shared(); } }\n\
             }",
        )]);

        assert_eq!(
            resolved_signature(&mut resolver, site(&sites, "shared")),
            Some("Outer.shared()".to_string())
        );
    }

    #[test]
    fn this_receiver_does_not_reach_outer_methods() {
        let (mut resolver, sites) = setup(&[(
            "Outer.java",
            "class Outer {\n\
               void shared() {}\n\
               class Inner { void run() { this.shared(); } }\n\
             }",
        )]);

        assert_eq!(resolved_signature(&mut resolver, site(&sites, "shared")), None);
    }

    #[test]
    fn library_and_opaque_calls_stay_unresolved() {
        let (mut resolver, sites) = setup(&[(
            "A.java",
            "import java.util.List;\n\
             class A { void a(List<String> xs) { xs.size(); make().go(); } A make() { return this; } void go() {} }",
        )]);

        assert!(matches!(
            resolver.resolve(site(&sites, "size")),
            Resolution::Unresolved(UnresolvedReason::UnknownType(_))
        ));
        assert_eq!(
            resolver.resolve(site(&sites, "go")),
            Resolution::Unresolved(UnresolvedReason::OpaqueReceiver)
        );
    }

    #[test]
    fn stats_count_outcomes_and_cache_hits() {
        let (mut resolver, sites) = setup(&[(
            "A.java",
            "class A { void a() { b(); b(); missing(); } void b() {} }",
        )]);

        for call in &sites {
            resolver.resolve(call);
        }

        let stats = resolver.stats();
        assert_eq!(stats.resolved, 2);
        assert_eq!(stats.unresolved, 1);
        assert!(stats.cache_hits > 0);
    }

    #[test]
    fn duplicate_types_keep_first_declaration() {
        let first = FileOutline {
            file: "a/X.java".to_string(),
            package: None,
            imports: Vec::new(),
            types: Vec::new(),
        };
        let parser = JavaParser::new("/repo");
        let a = parser.parse_source("a/X.java", "class X { void m() {} }").unwrap();
        let b = parser.parse_source("b/X.java", "class X { void m() {} }").unwrap();
        let outlines = [
            first,
            java::extract_outline("a/X.java", &a.tree, a.source.as_bytes()),
            java::extract_outline("b/X.java", &b.tree, b.source.as_bytes()),
        ];

        let index = DeclarationIndex::from_outlines(&outlines);
        assert_eq!(index.type_count(), 1);
        assert_eq!(index.method_count(), 1);
        assert_eq!(index.types["X"].file, "a/X.java");
    }

    struct PanicOnce {
        panicked: bool,
    }

    impl SymbolResolver for PanicOnce {
        fn resolve(&mut self, site: &CallSite) -> Resolution {
            if !self.panicked {
                self.panicked = true;
                panic!("resolver failure");
            }
            Resolution::Resolved(site.caller.clone())
        }
    }

    #[test]
    fn serialized_resolver_survives_poisoned_lock() {
        let (_, sites) = setup(&[("A.java", "class A { void a() { b(); } void b() {} }")]);
        let shared = SerializedResolver::new(PanicOnce { panicked: false });

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            shared.resolve(&sites[0])
        }));
        assert!(first.is_err());

        let second = shared.resolve(&sites[0]);
        assert_eq!(second.key(), Some(&sites[0].caller));
        assert_eq!(shared.stats(), ResolverStats::default());
    }
}
