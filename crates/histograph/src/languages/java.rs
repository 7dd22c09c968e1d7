//! Java language support for histograph.
//!
//! Implements declaration and call-site extraction for Java source files using
//! tree-sitter-java.
//!
//! Method identity follows the JVM's view of a declaration: the qualified name
//! of the declaring type, the method name (`<init>` for constructors) and the
//! erased parameter types, e.g. `com.acme.Cache.put(String,List)`.
//!
//! Calls made inside local or anonymous classes are attributed to the method
//! that lexically contains them. Calls in field initializers and initializer
//! blocks have no containing method and are not reported.

// Tree-sitter returns usize for positions, but we store u32 for compactness.
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;

use super::LanguageSupport;
use super::common::{
    CallKind, CallSite, FileOutline, ImportStatement, MethodOutline, Receiver, TypeOutline,
};
use super::tree_sitter_utils::{argument_count, node_lines, node_text, start_line};
use crate::types::{MethodKey, MethodKind};

/// Tree-sitter node kind constants for the Java grammar.
mod node_kinds {
    // Compilation unit
    pub const PACKAGE_DECLARATION: &str = "package_declaration";
    pub const IMPORT_DECLARATION: &str = "import_declaration";

    // Type declarations
    pub const CLASS_DECLARATION: &str = "class_declaration";
    pub const INTERFACE_DECLARATION: &str = "interface_declaration";
    pub const ENUM_DECLARATION: &str = "enum_declaration";
    pub const RECORD_DECLARATION: &str = "record_declaration";
    pub const ANNOTATION_TYPE_DECLARATION: &str = "annotation_type_declaration";
    pub const ENUM_BODY: &str = "enum_body";
    pub const ENUM_BODY_DECLARATIONS: &str = "enum_body_declarations";

    // Members
    pub const METHOD_DECLARATION: &str = "method_declaration";
    pub const CONSTRUCTOR_DECLARATION: &str = "constructor_declaration";
    pub const COMPACT_CONSTRUCTOR_DECLARATION: &str = "compact_constructor_declaration";
    pub const FIELD_DECLARATION: &str = "field_declaration";

    // Parameters and locals
    pub const FORMAL_PARAMETER: &str = "formal_parameter";
    pub const SPREAD_PARAMETER: &str = "spread_parameter";
    pub const VARIABLE_DECLARATOR: &str = "variable_declarator";
    pub const MODIFIERS: &str = "modifiers";
    pub const LOCAL_VARIABLE_DECLARATION: &str = "local_variable_declaration";
    pub const ENHANCED_FOR_STATEMENT: &str = "enhanced_for_statement";
    pub const RESOURCE: &str = "resource";

    // Expressions
    pub const METHOD_INVOCATION: &str = "method_invocation";
    pub const OBJECT_CREATION_EXPRESSION: &str = "object_creation_expression";
    pub const EXPLICIT_CONSTRUCTOR_INVOCATION: &str = "explicit_constructor_invocation";
    pub const FIELD_ACCESS: &str = "field_access";
    pub const CAST_EXPRESSION: &str = "cast_expression";
    pub const PARENTHESIZED_EXPRESSION: &str = "parenthesized_expression";

    // Names
    pub const IDENTIFIER: &str = "identifier";
    pub const SCOPED_IDENTIFIER: &str = "scoped_identifier";
    pub const THIS: &str = "this";
    pub const SUPER: &str = "super";
}

/// Java language support implementation.
pub struct JavaLanguage;

impl LanguageSupport for JavaLanguage {
    fn extensions(&self) -> &[&str] {
        &["java"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_java::LANGUAGE.into()
    }

    fn extract_outline(
        &self,
        file: &str,
        tree: &tree_sitter::Tree,
        content: &[u8],
    ) -> FileOutline {
        extract_outline(file, tree, content)
    }

    fn extract_call_sites(
        &self,
        file: &str,
        tree: &tree_sitter::Tree,
        content: &[u8],
    ) -> Vec<CallSite> {
        extract_call_sites(file, tree, content)
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Extract the package, imports, type and method declarations of a Java file.
pub fn extract_outline(file: &str, tree: &tree_sitter::Tree, content: &[u8]) -> FileOutline {
    let root = tree.root_node();
    let package = extract_package(&root, content);
    let imports = extract_imports(&root, content);

    let mut types = Vec::new();
    for node in top_level_types(&root) {
        outline_type(&node, content, file, package.as_deref(), None, &mut types);
    }

    FileOutline {
        file: file.to_string(),
        package,
        imports,
        types,
    }
}

fn extract_package(root: &tree_sitter::Node, content: &[u8]) -> Option<String> {
    use node_kinds::{IDENTIFIER, PACKAGE_DECLARATION, SCOPED_IDENTIFIER};

    let mut cursor = root.walk();
    let declaration = root
        .named_children(&mut cursor)
        .find(|child| child.kind() == PACKAGE_DECLARATION)?;

    let mut inner = declaration.walk();
    let name = declaration
        .named_children(&mut inner)
        .find(|child| matches!(child.kind(), IDENTIFIER | SCOPED_IDENTIFIER))?;

    node_text(&name, content).map(|text| strip_whitespace(&text))
}

fn extract_imports(root: &tree_sitter::Node, content: &[u8]) -> Vec<ImportStatement> {
    use node_kinds::IMPORT_DECLARATION;

    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == IMPORT_DECLARATION {
            if let Some(import) = parse_import(&child, content) {
                imports.push(import);
            }
        }
    }
    imports
}

fn parse_import(node: &tree_sitter::Node, content: &[u8]) -> Option<ImportStatement> {
    let text = node_text(node, content)?;
    let body = text.trim().strip_prefix("import")?.trim().trim_end_matches(';');

    let (is_static, body) = match body.trim().strip_prefix("static") {
        Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest),
        _ => (false, body),
    };

    let compact = strip_whitespace(body);
    let (path, is_wildcard) = match compact.strip_suffix(".*") {
        Some(path) => (path.to_string(), true),
        None => (compact, false),
    };

    if path.is_empty() {
        return None;
    }

    Some(ImportStatement {
        path,
        is_static,
        is_wildcard,
        line: start_line(node),
    })
}

/// Record a type declaration and, after it, every type nested in its body.
fn outline_type(
    node: &tree_sitter::Node,
    content: &[u8],
    file: &str,
    package: Option<&str>,
    outer: Option<&str>,
    types: &mut Vec<TypeOutline>,
) {
    use node_kinds::{FIELD_DECLARATION, RECORD_DECLARATION};

    let Some(name) = declared_name(node, content) else {
        return;
    };
    let qualified_name = qualify(package, outer, &name);

    let superclass = node
        .child_by_field_name("superclass")
        .and_then(|clause| clause.named_child(0))
        .and_then(|ty| node_text(&ty, content))
        .map(|ty| erase_type(&ty));

    let mut fields = HashMap::new();
    let record_params = record_parameters(node);
    if node.kind() == RECORD_DECLARATION {
        if let Some(params) = &record_params {
            for param in parameters(params, content) {
                if let Some(name) = param.name {
                    fields.insert(name, param.type_name);
                }
            }
        }
    }

    let index = types.len();
    types.push(TypeOutline {
        name,
        qualified_name: qualified_name.clone(),
        outer: outer.map(String::from),
        superclass,
        fields,
        methods: Vec::new(),
    });

    let mut nested = Vec::new();
    for member in body_members(node) {
        if member.kind() == FIELD_DECLARATION {
            for (field, ty) in field_bindings(&member, content) {
                types[index].fields.insert(field, ty);
            }
        } else if is_type_declaration(member.kind()) {
            nested.push(member);
        } else if let Some(method) =
            outline_member(&member, content, file, &qualified_name, record_params.as_ref())
        {
            types[index].methods.push(method);
        }
    }

    for member in nested {
        outline_type(&member, content, file, package, Some(&qualified_name), types);
    }
}

/// Build the outline of a method, constructor or compact constructor.
///
/// Returns `None` for any other member kind.
fn outline_member(
    node: &tree_sitter::Node,
    content: &[u8],
    file: &str,
    type_name: &str,
    record_params: Option<&tree_sitter::Node>,
) -> Option<MethodOutline> {
    use node_kinds::{COMPACT_CONSTRUCTOR_DECLARATION, CONSTRUCTOR_DECLARATION, METHOD_DECLARATION};

    let (name, kind, params) = match node.kind() {
        METHOD_DECLARATION => (
            declared_name(node, content)?,
            MethodKind::Method,
            node.child_by_field_name("parameters"),
        ),
        CONSTRUCTOR_DECLARATION => (
            "<init>".to_string(),
            MethodKind::Constructor,
            node.child_by_field_name("parameters"),
        ),
        COMPACT_CONSTRUCTOR_DECLARATION => (
            "<init>".to_string(),
            MethodKind::Constructor,
            record_params.copied(),
        ),
        _ => return None,
    };

    let params = params
        .map(|p| parameters(&p, content))
        .unwrap_or_default();
    let varargs = params.last().is_some_and(|p| p.varargs);
    let type_list: Vec<&str> = params.iter().map(|p| p.type_name.as_str()).collect();
    let signature = format!("{type_name}.{name}({})", type_list.join(","));

    Some(MethodOutline {
        name,
        kind,
        key: MethodKey::new(file, signature),
        arity: params.len(),
        varargs,
        lines: node_lines(node),
    })
}

/// A declared parameter with its erased type.
struct Parameter {
    name: Option<String>,
    type_name: String,
    varargs: bool,
}

fn parameters(params: &tree_sitter::Node, content: &[u8]) -> Vec<Parameter> {
    use node_kinds::{FORMAL_PARAMETER, MODIFIERS, SPREAD_PARAMETER, VARIABLE_DECLARATOR};

    let mut result = Vec::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        match child.kind() {
            FORMAL_PARAMETER => {
                let Some(ty) = child
                    .child_by_field_name("type")
                    .and_then(|t| node_text(&t, content))
                else {
                    continue;
                };
                let mut type_name = erase_type(&ty);
                if let Some(dims) = child
                    .child_by_field_name("dimensions")
                    .and_then(|d| node_text(&d, content))
                {
                    type_name.push_str(&strip_whitespace(&dims));
                }
                result.push(Parameter {
                    name: child
                        .child_by_field_name("name")
                        .and_then(|n| node_text(&n, content)),
                    type_name,
                    varargs: false,
                });
            }
            SPREAD_PARAMETER => {
                let mut inner = child.walk();
                let mut type_name = None;
                let mut name = None;
                for part in child.named_children(&mut inner) {
                    match part.kind() {
                        MODIFIERS => {}
                        VARIABLE_DECLARATOR => {
                            name = part
                                .child_by_field_name("name")
                                .and_then(|n| node_text(&n, content));
                        }
                        _ if type_name.is_none() => {
                            type_name = node_text(&part, content).map(|t| erase_type(&t));
                        }
                        _ => {}
                    }
                }
                if let Some(type_name) = type_name {
                    result.push(Parameter {
                        name,
                        type_name: format!("{type_name}[]"),
                        varargs: true,
                    });
                }
            }
            _ => {}
        }
    }
    result
}

fn field_bindings(node: &tree_sitter::Node, content: &[u8]) -> Vec<(String, String)> {
    let Some(ty) = node
        .child_by_field_name("type")
        .and_then(|t| node_text(&t, content))
    else {
        return Vec::new();
    };
    let ty = erase_type(&ty);

    let mut cursor = node.walk();
    node.children_by_field_name("declarator", &mut cursor)
        .filter_map(|declarator| declarator.child_by_field_name("name"))
        .filter_map(|name| node_text(&name, content))
        .map(|name| (name, ty.clone()))
        .collect()
}

// ============================================================================
// Call sites
// ============================================================================

/// Extract every call site inside a method or constructor body of a Java file.
pub fn extract_call_sites(file: &str, tree: &tree_sitter::Tree, content: &[u8]) -> Vec<CallSite> {
    let root = tree.root_node();
    let package = extract_package(&root, content);

    let mut sites = Vec::new();
    for node in top_level_types(&root) {
        calls_in_type(&node, content, file, package.as_deref(), None, &mut sites);
    }
    sites
}

/// Per-method state while walking a body.
struct MethodScope<'a> {
    caller: MethodKey,
    enclosing_type: &'a str,
    /// Parameters and locals seen so far: name -> erased type
    locals: HashMap<String, String>,
}

fn calls_in_type(
    node: &tree_sitter::Node,
    content: &[u8],
    file: &str,
    package: Option<&str>,
    outer: Option<&str>,
    sites: &mut Vec<CallSite>,
) {
    let Some(name) = declared_name(node, content) else {
        return;
    };
    let qualified_name = qualify(package, outer, &name);
    let record_params = record_parameters(node);

    for member in body_members(node) {
        if is_type_declaration(member.kind()) {
            calls_in_type(&member, content, file, package, Some(&qualified_name), sites);
            continue;
        }

        let Some(outline) =
            outline_member(&member, content, file, &qualified_name, record_params.as_ref())
        else {
            continue;
        };
        let Some(body) = member.child_by_field_name("body") else {
            continue;
        };

        let mut scope = MethodScope {
            caller: outline.key,
            enclosing_type: &qualified_name,
            locals: HashMap::new(),
        };
        let params = member
            .child_by_field_name("parameters")
            .or(record_params);
        if let Some(params) = params {
            for param in parameters(&params, content) {
                if let Some(name) = param.name {
                    scope.locals.insert(name, param.type_name);
                }
            }
        }

        collect_calls(&body, content, &mut scope, sites);
    }
}

fn collect_calls(
    node: &tree_sitter::Node,
    content: &[u8],
    scope: &mut MethodScope<'_>,
    sites: &mut Vec<CallSite>,
) {
    use node_kinds::{
        ENHANCED_FOR_STATEMENT, EXPLICIT_CONSTRUCTOR_INVOCATION, LOCAL_VARIABLE_DECLARATION,
        METHOD_INVOCATION, OBJECT_CREATION_EXPRESSION, RESOURCE,
    };

    match node.kind() {
        LOCAL_VARIABLE_DECLARATION => record_locals(node, content, scope),
        ENHANCED_FOR_STATEMENT | RESOURCE => {
            let ty = node
                .child_by_field_name("type")
                .and_then(|t| node_text(&t, content));
            let name = node
                .child_by_field_name("name")
                .and_then(|n| node_text(&n, content));
            if let (Some(ty), Some(name)) = (ty, name) {
                let ty = erase_type(&ty);
                if ty != "var" {
                    scope.locals.insert(name, ty);
                }
            }
        }
        METHOD_INVOCATION => {
            if let Some(site) = method_invocation_site(node, content, scope) {
                sites.push(site);
            }
        }
        OBJECT_CREATION_EXPRESSION => {
            if let Some(site) = object_creation_site(node, content, scope) {
                sites.push(site);
            }
        }
        EXPLICIT_CONSTRUCTOR_INVOCATION => {
            if let Some(site) = explicit_constructor_site(node, scope) {
                sites.push(site);
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_calls(&child, content, scope, sites);
    }
}

fn record_locals(node: &tree_sitter::Node, content: &[u8], scope: &mut MethodScope<'_>) {
    use node_kinds::OBJECT_CREATION_EXPRESSION;

    let Some(declared) = node
        .child_by_field_name("type")
        .and_then(|t| node_text(&t, content))
        .map(|t| erase_type(&t))
    else {
        return;
    };

    let mut cursor = node.walk();
    for declarator in node.children_by_field_name("declarator", &mut cursor) {
        let Some(name) = declarator
            .child_by_field_name("name")
            .and_then(|n| node_text(&n, content))
        else {
            continue;
        };

        let ty = if declared == "var" {
            // `var x = new T(...)` is the only inference we attempt
            declarator
                .child_by_field_name("value")
                .filter(|value| value.kind() == OBJECT_CREATION_EXPRESSION)
                .and_then(|value| value.child_by_field_name("type"))
                .and_then(|t| node_text(&t, content))
                .map(|t| erase_type(&t))
        } else {
            Some(declared.clone())
        };

        match ty {
            Some(ty) => {
                scope.locals.insert(name, ty);
            }
            None => {
                scope.locals.remove(&name);
            }
        }
    }
}

fn method_invocation_site(
    node: &tree_sitter::Node,
    content: &[u8],
    scope: &MethodScope<'_>,
) -> Option<CallSite> {
    let name_node = node.child_by_field_name("name")?;
    let name = node_text(&name_node, content)?;
    let receiver = match node.child_by_field_name("object") {
        Some(object) => receiver_of(&object, content, scope),
        None => Receiver::Implicit,
    };

    Some(CallSite {
        caller: scope.caller.clone(),
        enclosing_type: scope.enclosing_type.to_string(),
        kind: CallKind::Method,
        name,
        receiver,
        arg_count: node
            .child_by_field_name("arguments")
            .map_or(0, |args| argument_count(&args)),
        line: start_line(&name_node),
    })
}

fn object_creation_site(
    node: &tree_sitter::Node,
    content: &[u8],
    scope: &MethodScope<'_>,
) -> Option<CallSite> {
    let ty = node.child_by_field_name("type")?;
    let name = erase_type(&node_text(&ty, content)?);

    Some(CallSite {
        caller: scope.caller.clone(),
        enclosing_type: scope.enclosing_type.to_string(),
        kind: CallKind::Constructor,
        name,
        receiver: Receiver::Implicit,
        arg_count: node
            .child_by_field_name("arguments")
            .map_or(0, |args| argument_count(&args)),
        line: start_line(&ty),
    })
}

fn explicit_constructor_site(node: &tree_sitter::Node, scope: &MethodScope<'_>) -> Option<CallSite> {
    use node_kinds::{SUPER, THIS};

    let constructor = node.child_by_field_name("constructor")?;
    let kind = match constructor.kind() {
        THIS => CallKind::ThisConstructor,
        SUPER => CallKind::SuperConstructor,
        _ => return None,
    };

    Some(CallSite {
        caller: scope.caller.clone(),
        enclosing_type: scope.enclosing_type.to_string(),
        kind,
        name: "<init>".to_string(),
        receiver: Receiver::Implicit,
        arg_count: node
            .child_by_field_name("arguments")
            .map_or(0, |args| argument_count(&args)),
        line: start_line(node),
    })
}

/// Classify the object expression of a method invocation.
fn receiver_of(node: &tree_sitter::Node, content: &[u8], scope: &MethodScope<'_>) -> Receiver {
    use node_kinds::{
        CAST_EXPRESSION, FIELD_ACCESS, IDENTIFIER, OBJECT_CREATION_EXPRESSION,
        PARENTHESIZED_EXPRESSION, SCOPED_IDENTIFIER, SUPER, THIS,
    };

    match node.kind() {
        THIS => Receiver::This,
        SUPER => Receiver::Super,
        IDENTIFIER => match node_text(node, content) {
            Some(name) => {
                let local_type = scope.locals.get(&name).cloned();
                Receiver::Name { name, local_type }
            }
            None => Receiver::Opaque,
        },
        FIELD_ACCESS => {
            let object = node.child_by_field_name("object");
            let field = node
                .child_by_field_name("field")
                .and_then(|f| node_text(&f, content));
            match (object, field) {
                (Some(object), Some(field)) if object.kind() == THIS => Receiver::Field(field),
                _ if is_dotted_name(node) => node_text(node, content)
                    .map_or(Receiver::Opaque, |text| Receiver::Path(strip_whitespace(&text))),
                _ => Receiver::Opaque,
            }
        }
        SCOPED_IDENTIFIER => node_text(node, content)
            .map_or(Receiver::Opaque, |text| Receiver::Path(strip_whitespace(&text))),
        OBJECT_CREATION_EXPRESSION | CAST_EXPRESSION => node
            .child_by_field_name("type")
            .and_then(|t| node_text(&t, content))
            .map_or(Receiver::Opaque, |t| Receiver::Typed(erase_type(&t))),
        PARENTHESIZED_EXPRESSION => node
            .named_child(0)
            .map_or(Receiver::Opaque, |inner| receiver_of(&inner, content, scope)),
        _ => Receiver::Opaque,
    }
}

/// Whether a field access is a chain of plain names (`a.b.c`).
fn is_dotted_name(node: &tree_sitter::Node) -> bool {
    use node_kinds::{FIELD_ACCESS, IDENTIFIER};

    match node.kind() {
        IDENTIFIER => true,
        FIELD_ACCESS => {
            let field_ok = node
                .child_by_field_name("field")
                .is_some_and(|f| f.kind() == IDENTIFIER);
            field_ok
                && node
                    .child_by_field_name("object")
                    .is_some_and(|object| is_dotted_name(&object))
        }
        _ => false,
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn is_type_declaration(kind: &str) -> bool {
    use node_kinds::{
        ANNOTATION_TYPE_DECLARATION, CLASS_DECLARATION, ENUM_DECLARATION, INTERFACE_DECLARATION,
        RECORD_DECLARATION,
    };

    matches!(
        kind,
        CLASS_DECLARATION
            | INTERFACE_DECLARATION
            | ENUM_DECLARATION
            | RECORD_DECLARATION
            | ANNOTATION_TYPE_DECLARATION
    )
}

/// Type declarations directly under the compilation unit, looking through
/// error nodes so a syntax error elsewhere doesn't hide a whole class.
fn top_level_types<'t>(root: &tree_sitter::Node<'t>) -> Vec<tree_sitter::Node<'t>> {
    let mut found = Vec::new();
    let mut pending = vec![*root];

    while let Some(node) = pending.pop() {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if is_type_declaration(child.kind()) {
                found.push(child);
            } else if child.is_error() {
                pending.push(child);
            }
        }
    }

    found.sort_by_key(|node| node.start_byte());
    found
}

/// Members of a type body; for enums, the declarations after the constants.
fn body_members<'t>(node: &tree_sitter::Node<'t>) -> Vec<tree_sitter::Node<'t>> {
    use node_kinds::{ENUM_BODY, ENUM_BODY_DECLARATIONS};

    let Some(body) = node.child_by_field_name("body") else {
        return Vec::new();
    };

    let container = if body.kind() == ENUM_BODY {
        let mut cursor = body.walk();
        let declarations = body
            .named_children(&mut cursor)
            .find(|child| child.kind() == ENUM_BODY_DECLARATIONS);
        match declarations {
            Some(declarations) => declarations,
            None => return Vec::new(),
        }
    } else {
        body
    };

    let mut cursor = container.walk();
    container.named_children(&mut cursor).collect()
}

fn record_parameters<'t>(node: &tree_sitter::Node<'t>) -> Option<tree_sitter::Node<'t>> {
    if node.kind() == node_kinds::RECORD_DECLARATION {
        node.child_by_field_name("parameters")
    } else {
        None
    }
}

fn declared_name(node: &tree_sitter::Node, content: &[u8]) -> Option<String> {
    node.child_by_field_name("name")
        .and_then(|name| node_text(&name, content))
}

fn qualify(package: Option<&str>, outer: Option<&str>, name: &str) -> String {
    match (outer, package) {
        (Some(outer), _) => format!("{outer}.{name}"),
        (None, Some(package)) => format!("{package}.{name}"),
        (None, None) => name.to_string(),
    }
}

/// Drop annotations, generic arguments and whitespace from a type as written.
///
/// `Map<String, List<Integer>>` becomes `Map`; `@NonNull String` becomes `String`.
pub fn erase_type(text: &str) -> String {
    let without_annotations: Vec<&str> = text
        .split_whitespace()
        .filter(|token| !token.starts_with('@'))
        .collect();

    let mut erased = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in without_annotations.concat().chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 => erased.push(c),
            _ => {}
        }
    }
    erased
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
