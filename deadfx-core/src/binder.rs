//! Symbol binding for Go syntax trees.
//!
//! Turns a tree-sitter-go tree into plain facts the call graph builder can
//! resolve without the tree: the file's import table, the declared functions
//! with their call sites, struct field types and package-level variable
//! types. Types are bound as far as syntax allows:
//!
//! - receivers, parameters and `var x T` get their declared type
//! - `x := T{}`, `x := &T{}`, `x := new(T)` get `T`
//! - `x := f()` remembers the call so its result type can be looked up once
//!   every package is loaded
//!
//! Names are bound in source order with block, closure and statement scopes,
//! so a local only shadows what follows it inside its own scope. Everything
//! else stays unbound and is approximated later.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tree_sitter::Node;

/// Nodes that open a lexical scope.
const SCOPE_NODES: &[&str] = &[
    "block",
    "func_literal",
    "if_statement",
    "for_statement",
    "expression_switch_statement",
    "type_switch_statement",
    "select_statement",
    "expression_case",
    "type_case",
    "default_case",
    "communication_case",
];

/// Go's predeclared types; they carry no user methods.
const PREDECLARED_TYPES: &[&str] = &[
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error", "float32",
    "float64", "int", "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8",
    "uint16", "uint32", "uint64", "uintptr",
];

/// Text of a node, empty if the source slice is not valid UTF-8.
#[inline]
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Pre-order traversal; `f` returns false to skip a node's children.
pub fn visit<'t>(root: Node<'t>, f: &mut impl FnMut(Node<'t>) -> bool) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !f(node) {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

/// Go's exported-identifier rule.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Package name Go assumes for an import path without an explicit alias.
///
/// `github.com/x/y/v2` → `y`, `gopkg.in/yaml.v3` → `yaml`,
/// `github.com/mattn/go-sqlite3` → `sqlite3`.
pub fn default_import_name(path: &str) -> String {
    let mut parts = path.rsplit('/');
    let mut last = parts.next().unwrap_or(path);
    let is_major = |s: &str| {
        s.len() > 1 && s.starts_with('v') && s[1..].chars().all(|c| c.is_ascii_digit())
    };
    if is_major(last) {
        if let Some(prev) = parts.next() {
            last = prev;
        }
    }
    if let Some((head, tail)) = last.rsplit_once('.') {
        if is_major(tail) {
            last = head;
        }
    }
    let last = last.strip_prefix("go-").unwrap_or(last);
    let last = last.strip_suffix("-go").unwrap_or(last);
    last.replace(['-', '.'], "_")
}

/// One import spec of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpec {
    pub path: String,
    /// Explicit alias (`_` and `.` included) if written.
    pub alias: Option<String>,
}

impl ImportSpec {
    /// Identifier under which the package is visible in the file, if any.
    pub fn local_name(&self) -> Option<String> {
        match self.alias.as_deref() {
            Some("_") | Some(".") => None,
            Some(alias) => Some(alias.to_string()),
            None => Some(default_import_name(&self.path)),
        }
    }
}

/// A named type qualified by the package that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeRef {
    pub package: String,
    pub name: String,
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// What is known about the static type of a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    Named(TypeRef),
    /// Result type of the first return value of this call.
    ResultOf(Box<CallShape>),
}

/// The value a method is selected from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Identifier not bound in the function: import alias, package-level
    /// variable or unknown.
    Ident(String),
    /// Receiver, parameter or local variable.
    Local { name: String, hint: Option<TypeHint> },
    /// `base.field`
    Field { base: Box<Operand>, field: String },
    /// A value expression whose type could be bound (`NewX()`, `&T{}`).
    Value(TypeHint),
    /// Anything else; source text kept for diagnostics.
    Expr(String),
}

impl Operand {
    /// Dotted source form for identifier chains (`s.repo`).
    pub fn dotted(&self) -> Option<String> {
        match self {
            Operand::Ident(name) | Operand::Local { name, .. } => Some(name.clone()),
            Operand::Field { base, field } => base.dotted().map(|b| format!("{}.{}", b, field)),
            Operand::Value(_) | Operand::Expr(_) => None,
        }
    }
}

/// Syntactic shape of a call target or function reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallShape {
    /// `f(...)`
    Bare(String),
    /// `x.f(...)`
    Selector { operand: Operand, method: String },
    /// Closures, function values and other expressions.
    Opaque,
}

/// A call expression inside a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub shape: CallShape,
    /// Arguments that are plain function references (`NewRepo`, `db.Open`).
    pub func_args: Vec<CallShape>,
    /// 1-indexed line.
    pub line: usize,
}

/// A declared function or method with its bound call sites.
#[derive(Debug, Clone)]
pub struct FunctionFacts {
    pub name: String,
    /// Receiver base type name for methods.
    pub receiver: Option<String>,
    pub exported: bool,
    pub line: usize,
    /// Type of the first result, if it is a named type.
    pub result: Option<TypeRef>,
    pub calls: Vec<CallSite>,
    /// Functions named without being called or passed straight to a call
    /// (`cb := serve`, `{"a": serve}`, `return s.handle`).
    pub references: Vec<CallShape>,
}

impl FunctionFacts {
    /// `Name` for functions, `Receiver.Name` for methods.
    pub fn member(&self) -> String {
        match &self.receiver {
            Some(recv) => format!("{}.{}", recv, self.name),
            None => self.name.clone(),
        }
    }
}

/// Calls and function references found in a body or a package-level `var`.
#[derive(Debug, Default)]
pub struct BodyFacts {
    pub calls: Vec<CallSite>,
    pub references: Vec<CallShape>,
}

/// File-level binding context shared by all functions of the file.
pub struct FileScope<'a> {
    pub source: &'a str,
    pub package_path: &'a str,
    /// local name → import path
    imports: HashMap<String, String>,
}

impl<'a> FileScope<'a> {
    pub fn new(source: &'a str, package_path: &'a str, imports: &[ImportSpec]) -> Self {
        let imports = imports
            .iter()
            .filter_map(|spec| spec.local_name().map(|name| (name, spec.path.clone())))
            .collect();
        Self {
            source,
            package_path,
            imports,
        }
    }

    pub fn import_path(&self, alias: &str) -> Option<&str> {
        self.imports.get(alias).map(String::as_str)
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.source)
    }

    /// Named type denoted by a type expression, through pointers, generics
    /// and parentheses. Predeclared and composite types yield `None`.
    pub fn type_ref(&self, node: Node<'_>) -> Option<TypeRef> {
        match node.kind() {
            "type_identifier" | "identifier" => {
                let name = self.text(node);
                if name.is_empty() || PREDECLARED_TYPES.contains(&name) {
                    None
                } else {
                    Some(TypeRef {
                        package: self.package_path.to_string(),
                        name: name.to_string(),
                    })
                }
            }
            "qualified_type" => {
                let pkg = self.text(node.child_by_field_name("package")?);
                let name = self.text(node.child_by_field_name("name")?);
                let package = self.import_path(pkg)?.to_string();
                Some(TypeRef {
                    package,
                    name: name.to_string(),
                })
            }
            "selector_expression" => {
                // `new(pkg.T)` arguments parse as expressions
                let pkg = node.child_by_field_name("operand")?;
                if pkg.kind() != "identifier" {
                    return None;
                }
                let package = self.import_path(self.text(pkg))?.to_string();
                let name = self.text(node.child_by_field_name("field")?);
                Some(TypeRef {
                    package,
                    name: name.to_string(),
                })
            }
            "generic_type" => self.type_ref(node.child_by_field_name("type")?),
            "pointer_type" | "parenthesized_type" => self.type_ref(node.named_child(0)?),
            _ => None,
        }
    }

    /// Type hint for a value expression.
    fn expr_hint(&self, node: Node<'_>, locals: &Locals) -> Option<TypeHint> {
        match node.kind() {
            "composite_literal" => self
                .type_ref(node.child_by_field_name("type")?)
                .map(TypeHint::Named),
            "unary_expression" => self.expr_hint(node.child_by_field_name("operand")?, locals),
            "parenthesized_expression" => self.expr_hint(node.named_child(0)?, locals),
            "call_expression" => {
                let function = node.child_by_field_name("function")?;
                if function.kind() == "identifier" && self.text(function) == "new" {
                    let args = node.child_by_field_name("arguments")?;
                    return self.type_ref(args.named_child(0)?).map(TypeHint::Named);
                }
                match self.call_shape(function, locals) {
                    CallShape::Opaque => None,
                    shape => Some(TypeHint::ResultOf(Box::new(shape))),
                }
            }
            "identifier" => locals.hint(self.text(node)).cloned(),
            _ => None,
        }
    }

    fn operand(&self, node: Node<'_>, locals: &Locals) -> Operand {
        match node.kind() {
            "identifier" => {
                let name = self.text(node);
                match locals.get(name) {
                    Some(hint) => Operand::Local {
                        name: name.to_string(),
                        hint: hint.clone(),
                    },
                    None => Operand::Ident(name.to_string()),
                }
            }
            "selector_expression" => match (
                node.child_by_field_name("operand"),
                node.child_by_field_name("field"),
            ) {
                (Some(base), Some(field)) => Operand::Field {
                    base: Box::new(self.operand(base, locals)),
                    field: self.text(field).to_string(),
                },
                _ => Operand::Expr(self.text(node).to_string()),
            },
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.operand(inner, locals),
                None => Operand::Expr(self.text(node).to_string()),
            },
            "unary_expression" => match node.child_by_field_name("operand") {
                Some(inner) => self.operand(inner, locals),
                None => Operand::Expr(self.text(node).to_string()),
            },
            _ => match self.expr_hint(node, locals) {
                Some(hint) => Operand::Value(hint),
                None => Operand::Expr(self.text(node).to_string()),
            },
        }
    }

    /// Shape of a call's `function` child.
    fn call_shape(&self, function: Node<'_>, locals: &Locals) -> CallShape {
        match function.kind() {
            "identifier" => {
                let name = self.text(function);
                if locals.contains(name) {
                    CallShape::Opaque
                } else {
                    CallShape::Bare(name.to_string())
                }
            }
            "selector_expression" => match (
                function.child_by_field_name("operand"),
                function.child_by_field_name("field"),
            ) {
                (Some(operand), Some(field)) => CallShape::Selector {
                    operand: self.operand(operand, locals),
                    method: self.text(field).to_string(),
                },
                _ => CallShape::Opaque,
            },
            "parenthesized_expression" => match function.named_child(0) {
                Some(inner) => self.call_shape(inner, locals),
                None => CallShape::Opaque,
            },
            // generic instantiation `f[T](x)` in older grammars
            "index_expression" => match function.child_by_field_name("operand") {
                Some(inner) => self.call_shape(inner, locals),
                None => CallShape::Opaque,
            },
            _ => CallShape::Opaque,
        }
    }

    /// Binds a function or method declaration node.
    pub fn function(&self, node: Node<'_>) -> Option<FunctionFacts> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        if name.is_empty() {
            return None;
        }

        let mut locals = Locals::default();
        let receiver = match node.child_by_field_name("receiver") {
            Some(recv) => {
                let mut base = None;
                for param in named_children(recv) {
                    if let Some(ty) = param.child_by_field_name("type") {
                        base = self.type_ref(ty).map(|t| t.name);
                    }
                    self.bind_parameter(param, &mut locals);
                }
                // methods on unnamed or predeclared receivers cannot exist; keep the raw text
                Some(base.unwrap_or_else(|| self.text(recv).trim_matches(['(', ')', '*', ' ']).to_string()))
            }
            None => None,
        };

        if let Some(params) = node.child_by_field_name("parameters") {
            for param in named_children(params) {
                self.bind_parameter(param, &mut locals);
            }
        }

        let result = node.child_by_field_name("result").and_then(|r| {
            if r.kind() == "parameter_list" {
                let first = named_children(r).into_iter().next()?;
                self.type_ref(first.child_by_field_name("type")?)
            } else {
                self.type_ref(r)
            }
        });

        let body = node
            .child_by_field_name("body")
            .map(|body| self.walk_body(body, locals))
            .unwrap_or_default();

        Some(FunctionFacts {
            exported: is_exported(&name),
            name,
            receiver,
            line: node.start_position().row + 1,
            result,
            calls: body.calls,
            references: body.references,
        })
    }

    fn bind_parameter(&self, param: Node<'_>, locals: &mut Locals) {
        let hint = param
            .child_by_field_name("type")
            .and_then(|ty| self.type_ref(ty))
            .map(TypeHint::Named);
        let mut cursor = param.walk();
        for name in param.children_by_field_name("name", &mut cursor) {
            locals.bind(self.text(name), hint.clone());
        }
    }

    /// Binds and collects in source order. Every scope node starts from a
    /// copy of the enclosing scope, so its bindings never leak out.
    fn walk_body<'t>(&self, root: Node<'t>, locals: Locals) -> BodyFacts {
        let mut out = BodyFacts::default();
        let mut scopes = vec![locals];
        let mut stack = vec![(root, 0usize)];
        while let Some((node, parent)) = stack.pop() {
            let scope = if SCOPE_NODES.contains(&node.kind()) {
                let inner = scopes[parent].clone();
                scopes.push(inner);
                scopes.len() - 1
            } else {
                parent
            };
            self.bind_node(node, &mut scopes[scope]);
            self.collect_node(node, &scopes[scope], &mut out);
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, scope)));
        }
        out
    }

    fn bind_node(&self, node: Node<'_>, locals: &mut Locals) {
        match node.kind() {
            "var_spec" => self.bind_var_spec(node, locals),
            "short_var_declaration" => {
                let left = node.child_by_field_name("left");
                let right = node.child_by_field_name("right");
                if let Some(left) = left {
                    let values = right.map(named_children).unwrap_or_default();
                    for (i, name) in named_children(left).into_iter().enumerate() {
                        let hint = if i == 0 && values.len() == 1 || values.len() > 1 {
                            values.get(i).and_then(|v| self.expr_hint(*v, locals))
                        } else {
                            None
                        };
                        locals.bind(self.text(name), hint);
                    }
                }
            }
            "range_clause" | "receive_statement" | "type_switch_statement" => {
                if let Some(left) = node.child_by_field_name("left").or_else(|| node.child_by_field_name("alias")) {
                    for name in named_children(left) {
                        locals.bind(self.text(name), None);
                    }
                    if left.kind() == "identifier" {
                        locals.bind(self.text(left), None);
                    }
                }
            }
            "func_literal" => {
                if let Some(params) = node.child_by_field_name("parameters") {
                    for param in named_children(params) {
                        self.bind_parameter(param, locals);
                    }
                }
            }
            _ => {}
        }
    }

    fn bind_var_spec(&self, spec: Node<'_>, locals: &mut Locals) {
        let declared = spec
            .child_by_field_name("type")
            .and_then(|ty| self.type_ref(ty))
            .map(TypeHint::Named);
        let values = spec
            .child_by_field_name("value")
            .map(named_children)
            .unwrap_or_default();
        let mut cursor = spec.walk();
        let names: Vec<Node<'_>> = spec.children_by_field_name("name", &mut cursor).collect();
        for (i, name) in names.into_iter().enumerate() {
            let hint = declared
                .clone()
                .or_else(|| values.get(i).and_then(|v| self.expr_hint(*v, locals)));
            locals.bind(self.text(name), hint);
        }
    }

    fn collect_node(&self, node: Node<'_>, locals: &Locals, out: &mut BodyFacts) {
        match node.kind() {
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    let func_args = node
                        .child_by_field_name("arguments")
                        .map(|args| self.function_refs(args, locals))
                        .unwrap_or_default();
                    out.calls.push(CallSite {
                        shape: self.call_shape(function, locals),
                        func_args,
                        line: node.start_position().row + 1,
                    });
                }
            }
            "identifier" | "selector_expression" if is_value_reference(node) => {
                if self.text(node) == "_" {
                    return;
                }
                match self.call_shape(node, locals) {
                    CallShape::Opaque => {}
                    shape => out.references.push(shape),
                }
            }
            _ => {}
        }
    }

    /// Arguments that name a function without calling it.
    fn function_refs(&self, args: Node<'_>, locals: &Locals) -> Vec<CallShape> {
        named_children(args)
            .into_iter()
            .filter_map(|arg| match arg.kind() {
                "identifier" => {
                    let name = self.text(arg);
                    (!locals.contains(name) && name != "nil").then(|| CallShape::Bare(name.to_string()))
                }
                "selector_expression" => match self.call_shape(arg, locals) {
                    CallShape::Opaque => None,
                    shape => Some(shape),
                },
                _ => None,
            })
            .collect()
    }

    /// Calls and function references made while initializing package-level
    /// variables.
    pub fn initializer(&self, var_decl: Node<'_>) -> BodyFacts {
        self.walk_body(var_decl, Locals::default())
    }

    /// Package-level `var` declarations: name → type hint.
    pub fn globals(&self, var_decl: Node<'_>) -> Vec<(String, Option<TypeHint>)> {
        let mut locals = Locals::default();
        visit(var_decl, &mut |node| {
            if node.kind() == "var_spec" {
                self.bind_var_spec(node, &mut locals);
                return false;
            }
            true
        });
        locals.into_bindings()
    }

    /// Field name → type for a struct type node.
    pub fn struct_fields(&self, struct_type: Node<'_>) -> HashMap<String, TypeRef> {
        let mut fields = HashMap::new();
        visit(struct_type, &mut |node| {
            if node.kind() != "field_declaration" {
                return true;
            }
            let Some(ty) = node.child_by_field_name("type").and_then(|t| self.type_ref(t)) else {
                return false;
            };
            let mut cursor = node.walk();
            let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
            if names.is_empty() {
                // embedded field: promoted under the type's own name
                fields.insert(ty.name.clone(), ty);
            } else {
                for name in names {
                    fields.insert(self.text(name).to_string(), ty.clone());
                }
            }
            false
        });
        fields
    }
}

/// An identifier or selector used as a value: not called, not a parameter
/// name, not a composite literal key and not a direct call argument (those
/// are `CallSite::func_args`).
fn is_value_reference(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "call_expression" => !is_field(parent, "function", node),
        "argument_list" | "selector_expression" | "parameter_declaration"
        | "variadic_parameter_declaration" => false,
        "keyed_element" => !is_key(parent, node),
        "literal_element" => !parent
            .parent()
            .is_some_and(|kv| kv.kind() == "keyed_element" && is_key(kv, parent)),
        _ => true,
    }
}

fn is_field(of: Node<'_>, field: &str, child: Node<'_>) -> bool {
    of.child_by_field_name(field).is_some_and(|f| f.id() == child.id())
}

/// Key side of a `key: value` element; older grammars leave it unnamed.
fn is_key(keyed: Node<'_>, child: Node<'_>) -> bool {
    keyed
        .child_by_field_name("key")
        .or_else(|| keyed.named_child(0))
        .is_some_and(|key| key.id() == child.id())
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Names bound inside one scope of a function.
#[derive(Debug, Clone, Default)]
struct Locals {
    names: HashMap<String, Option<TypeHint>>,
    order: Vec<String>,
}

impl Locals {
    fn bind(&mut self, name: &str, hint: Option<TypeHint>) {
        if name.is_empty() || name == "_" {
            return;
        }
        if self.names.insert(name.to_string(), hint).is_none() {
            self.order.push(name.to_string());
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&Option<TypeHint>> {
        self.names.get(name)
    }

    fn hint(&self, name: &str) -> Option<&TypeHint> {
        self.names.get(name).and_then(Option::as_ref)
    }

    fn into_bindings(mut self) -> Vec<(String, Option<TypeHint>)> {
        self.order
            .drain(..)
            .filter_map(|name| self.names.remove(&name).map(|hint| (name, hint)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_go::language()).unwrap();
        parser.parse(source, None).unwrap()
    }

    fn first_function(source: &str, imports: &[ImportSpec]) -> FunctionFacts {
        let tree = parse(source);
        let scope = FileScope::new(source, "example.com/app/internal/orders", imports);
        let mut found = None;
        visit(tree.root_node(), &mut |node| {
            if found.is_none()
                && matches!(node.kind(), "function_declaration" | "method_declaration")
            {
                found = scope.function(node);
                return false;
            }
            true
        });
        found.expect("no function in source")
    }

    fn import(path: &str) -> ImportSpec {
        ImportSpec {
            path: path.to_string(),
            alias: None,
        }
    }

    #[test]
    fn test_default_import_name() {
        assert_eq!(default_import_name("go.uber.org/fx"), "fx");
        assert_eq!(default_import_name("github.com/jackc/pgx/v5"), "pgx");
        assert_eq!(default_import_name("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(default_import_name("github.com/mattn/go-sqlite3"), "sqlite3");
        assert_eq!(default_import_name("fmt"), "fmt");
    }

    #[test]
    fn test_import_local_name() {
        let blank = ImportSpec {
            path: "embed".into(),
            alias: Some("_".into()),
        };
        let aliased = ImportSpec {
            path: "go.uber.org/zap".into(),
            alias: Some("log".into()),
        };
        assert_eq!(blank.local_name(), None);
        assert_eq!(aliased.local_name(), Some("log".to_string()));
        assert_eq!(import("net/http").local_name(), Some("http".to_string()));
    }

    #[test]
    fn test_is_exported() {
        assert!(is_exported("Handle"));
        assert!(!is_exported("handle"));
        assert!(!is_exported("_x"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_method_receiver_and_calls() {
        let src = r#"package orders

func (s *Service) Place(o Order) error {
	s.validate(o)
	return save(o)
}
"#;
        let f = first_function(src, &[]);
        assert_eq!(f.member(), "Service.Place");
        assert!(f.exported);
        assert_eq!(f.calls.len(), 2);
        match &f.calls[0].shape {
            CallShape::Selector { operand, method } => {
                assert_eq!(method, "validate");
                match operand {
                    Operand::Local { name, hint } => {
                        assert_eq!(name, "s");
                        assert_eq!(
                            hint,
                            &Some(TypeHint::Named(TypeRef {
                                package: "example.com/app/internal/orders".into(),
                                name: "Service".into(),
                            }))
                        );
                    }
                    other => panic!("unexpected operand {:?}", other),
                }
            }
            other => panic!("unexpected shape {:?}", other),
        }
        assert_eq!(f.calls[1].shape, CallShape::Bare("save".into()));
    }

    #[test]
    fn test_import_alias_stays_unbound() {
        let src = r#"package orders

import "strings"

func clean(s string) string {
	return strings.TrimSpace(s)
}
"#;
        let f = first_function(src, &[import("strings")]);
        assert_eq!(
            f.calls[0].shape,
            CallShape::Selector {
                operand: Operand::Ident("strings".into()),
                method: "TrimSpace".into(),
            }
        );
    }

    #[test]
    fn test_short_var_bindings() {
        let src = r#"package orders

import "example.com/app/internal/db"

func run() {
	repo := &Repo{}
	conn := db.Open()
	svc := NewService(repo)
	repo.Find()
	conn.Close()
	svc.Start()
}
"#;
        let f = first_function(src, &[import("example.com/app/internal/db")]);
        let operands: Vec<&Operand> = f
            .calls
            .iter()
            .filter_map(|c| match &c.shape {
                CallShape::Selector { operand, .. } => Some(operand),
                _ => None,
            })
            .collect();
        // db.Open, repo.Find, conn.Close, svc.Start
        assert_eq!(operands.len(), 4);
        assert!(matches!(
            operands[1],
            Operand::Local { hint: Some(TypeHint::Named(t)), .. } if t.name == "Repo"
        ));
        assert!(matches!(
            operands[2],
            Operand::Local { hint: Some(TypeHint::ResultOf(_)), .. }
        ));
        assert!(matches!(
            operands[3],
            Operand::Local { hint: Some(TypeHint::ResultOf(shape)), .. }
                if **shape == CallShape::Bare("NewService".into())
        ));
    }

    #[test]
    fn test_function_arguments_are_references() {
        let src = r#"package app

import "go.uber.org/fx"

func Module() fx.Option {
	return fx.Provide(NewRepo, orders.NewService, newLocal())
}
"#;
        let f = first_function(src, &[import("go.uber.org/fx")]);
        let provide = f
            .calls
            .iter()
            .find(|c| matches!(&c.shape, CallShape::Selector { method, .. } if method == "Provide"))
            .unwrap();
        assert_eq!(provide.func_args.len(), 2);
        assert_eq!(provide.func_args[0], CallShape::Bare("NewRepo".into()));
        assert!(matches!(&provide.func_args[1], CallShape::Selector { method, .. } if method == "NewService"));
        assert_eq!(
            f.result,
            Some(TypeRef {
                package: "go.uber.org/fx".into(),
                name: "Option".into()
            })
        );
    }

    #[test]
    fn test_local_closure_call_is_opaque() {
        let src = r#"package app

func run() {
	helper := func() {}
	helper()
}
"#;
        let f = first_function(src, &[]);
        assert!(f.calls.iter().any(|c| c.shape == CallShape::Opaque));
        assert!(!f.calls.iter().any(|c| c.shape == CallShape::Bare("helper".into())));
    }

    #[test]
    fn test_closure_and_block_bindings_stay_scoped() {
        let src = r#"package app

func run() {
	each(func(check func()) {
		check()
	})
	check()
	if ok := true; ok {
		check := func() {}
		check()
	}
	check()
}
"#;
        let f = first_function(src, &[]);
        let shapes: Vec<&CallShape> = f.calls.iter().map(|c| &c.shape).collect();
        let bare = CallShape::Bare("check".into());
        assert_eq!(
            shapes,
            vec![
                &CallShape::Bare("each".into()),
                &CallShape::Opaque,
                &bare,
                &CallShape::Opaque,
                &bare,
            ]
        );
    }

    #[test]
    fn test_function_values_are_references() {
        let src = r#"package app

func Post(s *Service) {
	cb := serveLater
	cb()
	routes := map[string]func(){"a": serveIndex}
	_ = routes
	handler := &Handler{Run: s.handle}
	register(handler, onDone)
}
"#;
        let f = first_function(src, &[]);
        let refs = &f.references;
        assert!(refs.contains(&CallShape::Bare("serveLater".into())));
        assert!(refs.contains(&CallShape::Bare("serveIndex".into())));
        assert!(refs.iter().any(|r| matches!(r, CallShape::Selector { method, .. } if method == "handle")));
        // locals, blanks, keys and direct arguments are not references
        for name in ["cb", "routes", "_", "handler", "Run", "onDone"] {
            assert!(!refs.contains(&CallShape::Bare(name.into())), "{}", name);
        }
        let register = f.calls.iter().find(|c| c.shape == CallShape::Bare("register".into())).unwrap();
        assert_eq!(register.func_args, vec![CallShape::Bare("onDone".into())]);
    }

    #[test]
    fn test_struct_fields_and_globals() {
        let src = r#"package orders

import "example.com/app/internal/db"

type Service struct {
	repo  *db.Repo
	name  string
	Clock
}

var defaultService = &Service{}
"#;
        let tree = parse(src);
        let imports = [import("example.com/app/internal/db")];
        let scope = FileScope::new(src, "example.com/app/internal/orders", &imports);
        let mut fields = HashMap::new();
        let mut globals = Vec::new();
        visit(tree.root_node(), &mut |node| {
            match node.kind() {
                "struct_type" => fields = scope.struct_fields(node),
                "var_declaration" => globals = scope.globals(node),
                _ => {}
            }
            true
        });
        assert_eq!(fields["repo"].to_string(), "example.com/app/internal/db.Repo");
        assert!(!fields.contains_key("name"));
        assert_eq!(fields["Clock"].name, "Clock");
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].0, "defaultService");
        assert!(matches!(&globals[0].1, Some(TypeHint::Named(t)) if t.name == "Service"));
    }
}
