//! Call site resolution against the package tables of the whole module.
//!
//! The binder records what a call looks like; this module decides which
//! function it names once every package has been loaded: same-package
//! functions, imported package functions and methods of statically typed
//! receivers, including methods promoted through embedded fields. Receivers
//! with no type information degrade to an approximate `package.x.method`
//! key instead of failing. Calls through a module interface are approximated
//! and fan out to every declared method of that name.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use super::QualifiedFunction;
use crate::binder::{CallShape, ImportSpec, Operand, TypeHint, TypeRef};
use crate::config::DiRule;
use crate::parse::PackageSet;

/// Outcome of resolving one call site or function reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum CallResolution {
    /// Target known from declarations and static types.
    Resolved(QualifiedFunction),
    /// Receiver type unknown; keyed on the receiver expression.
    Approximated(QualifiedFunction),
    /// Builtins, closures, function values, calls on arbitrary expressions.
    Unresolved,
}

impl CallResolution {
    pub fn target(&self) -> Option<&QualifiedFunction> {
        match self {
            CallResolution::Resolved(f) | CallResolution::Approximated(f) => Some(f),
            CallResolution::Unresolved => None,
        }
    }
}

/// Import table of one file: visible name → import path.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    names: HashMap<String, String>,
}

impl ImportTable {
    pub fn new(imports: &[ImportSpec]) -> Self {
        Self {
            names: imports
                .iter()
                .filter_map(|spec| spec.local_name().map(|name| (name, spec.path.clone())))
                .collect(),
        }
    }

    pub fn path_of(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }
}

/// Where a call site sits: its package and the file's imports.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub package: &'a str,
    pub imports: &'a ImportTable,
}

/// Module-wide declaration tables used to resolve call sites.
#[derive(Debug, Default)]
pub struct Resolver {
    /// package → declared members
    declared: HashMap<String, HashSet<String>>,
    /// declared function → named type of its first result
    results: HashMap<QualifiedFunction, TypeRef>,
    /// struct type → field → field type
    fields: HashMap<TypeRef, HashMap<String, TypeRef>>,
    /// (package, variable) → variable type
    globals: HashMap<(String, String), TypeRef>,
    interfaces: HashSet<TypeRef>,
    /// method name → every declared method of that name
    methods: HashMap<String, Vec<QualifiedFunction>>,
}

impl Resolver {
    /// Builds the tables from every loaded package.
    ///
    /// Global variable types may depend on function result types, so those
    /// are bound in a second step once declarations are known.
    pub fn new(packages: &PackageSet) -> Self {
        let mut resolver = Self::default();

        for pkg in packages.packages.values() {
            for file in &pkg.files {
                let members = resolver.declared.entry(pkg.path.clone()).or_default();
                for func in &file.functions {
                    members.insert(func.member());
                }
                for func in &file.functions {
                    let f = QualifiedFunction::new(&pkg.path, func.member());
                    if let Some(result) = &func.result {
                        resolver.results.insert(f.clone(), result.clone());
                    }
                    if func.receiver.is_some() {
                        resolver.methods.entry(func.name.clone()).or_default().push(f);
                    }
                }
                for name in &file.interfaces {
                    resolver.interfaces.insert(TypeRef {
                        package: pkg.path.clone(),
                        name: name.clone(),
                    });
                }
                for (name, fields) in &file.structs {
                    resolver.fields.insert(
                        TypeRef {
                            package: pkg.path.clone(),
                            name: name.clone(),
                        },
                        fields.clone(),
                    );
                }
            }
        }

        let mut globals = HashMap::new();
        for pkg in packages.packages.values() {
            for file in &pkg.files {
                let imports = ImportTable::new(&file.imports);
                let ctx = CallContext {
                    package: &pkg.path,
                    imports: &imports,
                };
                for (name, hint) in &file.globals {
                    if let Some(ty) = hint.as_ref().and_then(|h| resolver.type_of_hint(h, ctx)) {
                        globals.insert((pkg.path.clone(), name.clone()), ty);
                    }
                }
            }
        }
        resolver.globals = globals;
        resolver
    }

    pub fn is_declared(&self, f: &QualifiedFunction) -> bool {
        self.declared
            .get(&f.package)
            .is_some_and(|members| members.contains(&f.member))
    }

    /// Resolves the target of a call or function reference.
    pub fn resolve(&self, shape: &CallShape, ctx: CallContext<'_>) -> CallResolution {
        match shape {
            CallShape::Bare(name) => {
                let f = QualifiedFunction::new(ctx.package, name.as_str());
                if self.is_declared(&f) {
                    CallResolution::Resolved(f)
                } else {
                    CallResolution::Unresolved
                }
            }
            CallShape::Selector { operand, method } => self.resolve_selector(operand, method, ctx),
            CallShape::Opaque => CallResolution::Unresolved,
        }
    }

    fn resolve_selector(&self, operand: &Operand, method: &str, ctx: CallContext<'_>) -> CallResolution {
        if let Operand::Ident(name) = operand {
            if let Some(path) = ctx.imports.path_of(name) {
                return CallResolution::Resolved(QualifiedFunction::new(path, method));
            }
        }

        if let Some(ty) = self.type_of_operand(operand, ctx) {
            return self.resolve_method(&ty, method);
        }

        match operand {
            Operand::Ident(_) | Operand::Local { .. } | Operand::Field { .. } => match operand.dotted() {
                Some(chain) => CallResolution::Approximated(QualifiedFunction::new(
                    ctx.package,
                    format!("{}.{}", chain, method),
                )),
                None => CallResolution::Unresolved,
            },
            Operand::Value(_) | Operand::Expr(_) => CallResolution::Unresolved,
        }
    }

    /// Method `method` on a value of static type `ty`.
    ///
    /// Types from packages outside the module are trusted as written. Inside
    /// the module the method must be declared on `ty` or on a type embedded
    /// in it; interfaces and misses stay approximated.
    fn resolve_method(&self, ty: &TypeRef, method: &str) -> CallResolution {
        let direct = QualifiedFunction::method(&ty.package, &ty.name, method);
        if !self.declared.contains_key(&ty.package) {
            return CallResolution::Resolved(direct);
        }
        self.find_embedded(ty, |t| {
            let f = QualifiedFunction::method(&t.package, &t.name, method);
            if self.is_declared(&f) {
                Some(CallResolution::Resolved(f))
            } else if self.interfaces.contains(t) {
                Some(CallResolution::Approximated(f))
            } else {
                None
            }
        })
        .unwrap_or(CallResolution::Approximated(direct))
    }

    /// Breadth-first walk from `ty` through embedded struct fields; the
    /// shallowest hit wins, as with Go selectors.
    fn find_embedded<T>(&self, ty: &TypeRef, mut hit: impl FnMut(&TypeRef) -> Option<T>) -> Option<T> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([ty.clone()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(found) = hit(&current) {
                return Some(found);
            }
            if let Some(fields) = self.fields.get(&current) {
                // embedded fields are keyed by their type name
                let mut embedded: Vec<&TypeRef> = fields
                    .iter()
                    .filter(|(name, field)| **name == field.name)
                    .map(|(_, field)| field)
                    .collect();
                embedded.sort_by(|a, b| a.name.cmp(&b.name));
                queue.extend(embedded.into_iter().cloned());
            }
        }
        None
    }

    /// Declared methods a call through a module interface may dispatch to:
    /// every method of the same name. Empty for any other target.
    pub fn implementations(&self, target: &QualifiedFunction) -> &[QualifiedFunction] {
        let Some((receiver, name)) = target.member.rsplit_once('.') else {
            return &[];
        };
        let iface = TypeRef {
            package: target.package.clone(),
            name: receiver.to_string(),
        };
        if !self.interfaces.contains(&iface) {
            return &[];
        }
        self.methods.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Static type of a selector operand, if it can be bound.
    fn type_of_operand(&self, operand: &Operand, ctx: CallContext<'_>) -> Option<TypeRef> {
        match operand {
            Operand::Ident(name) => {
                if ctx.imports.path_of(name).is_some() {
                    return None;
                }
                self.globals
                    .get(&(ctx.package.to_string(), name.clone()))
                    .cloned()
            }
            Operand::Local { hint, .. } => hint.as_ref().and_then(|h| self.type_of_hint(h, ctx)),
            Operand::Field { base, field } => {
                // `pkg.Var` names another package's global
                if let Operand::Ident(alias) = base.as_ref() {
                    if let Some(path) = ctx.imports.path_of(alias) {
                        return self.globals.get(&(path.to_string(), field.clone())).cloned();
                    }
                }
                let base_ty = self.type_of_operand(base, ctx)?;
                self.find_embedded(&base_ty, |t| self.fields.get(t)?.get(field).cloned())
            }
            Operand::Value(hint) => self.type_of_hint(hint, ctx),
            Operand::Expr(_) => None,
        }
    }

    fn type_of_hint(&self, hint: &TypeHint, ctx: CallContext<'_>) -> Option<TypeRef> {
        match hint {
            TypeHint::Named(ty) => Some(ty.clone()),
            TypeHint::ResultOf(shape) => match self.resolve(shape, ctx) {
                CallResolution::Resolved(f) => self.results.get(&f).cloned(),
                _ => None,
            },
        }
    }

    /// True when `shape` is a registration call under `rule`.
    pub fn matches_rule(shape: &CallShape, rule: &DiRule, ctx: CallContext<'_>) -> bool {
        match shape {
            CallShape::Selector {
                operand: Operand::Ident(alias),
                method,
            } => ctx.imports.path_of(alias) == Some(rule.import_path.as_str()) && rule.matches_method(method),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_go_source, FileFacts};
    use crate::root::ProjectLayout;

    const APP: &str = "example.com/app";

    fn facts(dir: &str, name: &str, src: &str) -> FileFacts {
        let tree = parse_go_source(format!("/p/{}/{}", dir, name), src.to_string()).unwrap();
        FileFacts::extract(&tree, &format!("{}/{}", APP, dir))
    }

    fn set(files: Vec<FileFacts>) -> PackageSet {
        PackageSet::from_files(ProjectLayout::new("/p", APP), files)
    }

    /// Resolutions of every call site in `func` of `file`.
    fn resolutions(resolver: &Resolver, file: &FileFacts, func: &str) -> Vec<CallResolution> {
        let imports = ImportTable::new(&file.imports);
        let ctx = CallContext {
            package: &file.package_path,
            imports: &imports,
        };
        let f = file.functions.iter().find(|f| f.name == func).unwrap();
        f.calls.iter().map(|c| resolver.resolve(&c.shape, ctx)).collect()
    }

    fn qf(pkg: &str, member: &str) -> QualifiedFunction {
        QualifiedFunction::new(format!("{}/{}", APP, pkg), member)
    }

    #[test]
    fn test_import_alias_versus_untyped_receiver() {
        let db = facts("internal/db", "db.go", "package db\n\nfunc Foo() {}\n");
        let svc = facts(
            "internal/orders",
            "orders.go",
            r#"package orders

import store "example.com/app/internal/db"

func run(obj interface{ Foo() }) {
	store.Foo()
	obj.Foo()
	thing.Foo()
}
"#,
        );
        let resolver = Resolver::new(&set(vec![db, svc.clone()]));
        let got = resolutions(&resolver, &svc, "run");
        assert_eq!(got[0], CallResolution::Resolved(qf("internal/db", "Foo")));
        // interface literal parameter: no named type
        assert_eq!(got[1], CallResolution::Approximated(qf("internal/orders", "obj.Foo")));
        assert_eq!(got[2], CallResolution::Approximated(qf("internal/orders", "thing.Foo")));
    }

    #[test]
    fn test_bare_calls() {
        let file = facts(
            "internal/orders",
            "orders.go",
            "package orders\n\nfunc run() {\n\thelper()\n\tlen(nil)\n}\n\nfunc helper() {}\n",
        );
        let resolver = Resolver::new(&set(vec![file.clone()]));
        let got = resolutions(&resolver, &file, "run");
        assert_eq!(got[0], CallResolution::Resolved(qf("internal/orders", "helper")));
        assert_eq!(got[1], CallResolution::Unresolved);
    }

    #[test]
    fn test_typed_receivers_fields_and_results() {
        let repo = facts(
            "internal/db",
            "repo.go",
            "package db\n\ntype Repo struct{}\n\nfunc Open() *Repo { return &Repo{} }\n\nfunc (r *Repo) Find() {}\n",
        );
        let svc = facts(
            "internal/orders",
            "service.go",
            r#"package orders

import "example.com/app/internal/db"

type Service struct {
	repo *db.Repo
}

var shared = db.Open()

func (s *Service) Load() {
	s.repo.Find()
	conn := db.Open()
	conn.Find()
	shared.Find()
	s.cache.Get()
	makeThing().Run()
}
"#,
        );
        let resolver = Resolver::new(&set(vec![repo, svc.clone()]));
        let got = resolutions(&resolver, &svc, "Load");
        let find = qf("internal/db", "Repo.Find");
        assert_eq!(got[0], CallResolution::Resolved(find.clone()));
        assert_eq!(got[1], CallResolution::Resolved(qf("internal/db", "Open")));
        assert_eq!(got[2], CallResolution::Resolved(find.clone()));
        assert_eq!(got[3], CallResolution::Resolved(find));
        assert_eq!(got[4], CallResolution::Approximated(qf("internal/orders", "s.cache.Get")));
        assert_eq!(got[5], CallResolution::Unresolved);
    }

    #[test]
    fn test_promoted_methods_resolve_to_embedded_type() {
        let file = facts(
            "internal/ledger",
            "book.go",
            r#"package ledger

type base struct{ log *journal }

type journal struct{}

type Book struct {
	base
}

func (b *base) audit() {}

func (j *journal) write() {}

func (k *Book) Post() {
	k.audit()
	k.log.write()
	k.missing()
}
"#,
        );
        let resolver = Resolver::new(&set(vec![file.clone()]));
        let got = resolutions(&resolver, &file, "Post");
        assert_eq!(got[0], CallResolution::Resolved(qf("internal/ledger", "base.audit")));
        assert_eq!(got[1], CallResolution::Resolved(qf("internal/ledger", "journal.write")));
        // not declared on Book or anything it embeds
        assert_eq!(got[2], CallResolution::Approximated(qf("internal/ledger", "Book.missing")));
    }

    #[test]
    fn test_interface_receiver_is_approximated() {
        let file = facts(
            "internal/ledger",
            "sink.go",
            r#"package ledger

type sink interface{ write() }

type fileSink struct{}

func (f *fileSink) write() {}

type Book struct {
	out sink
}

func (k *Book) Post() {
	k.out.write()
}
"#,
        );
        let resolver = Resolver::new(&set(vec![file.clone()]));
        let got = resolutions(&resolver, &file, "Post");
        let through = qf("internal/ledger", "sink.write");
        assert_eq!(got[0], CallResolution::Approximated(through.clone()));
        assert_eq!(
            resolver.implementations(&through),
            &[qf("internal/ledger", "fileSink.write")]
        );
        assert!(resolver
            .implementations(&qf("internal/ledger", "fileSink.write"))
            .is_empty());
    }

    #[test]
    fn test_rule_matching_uses_import_alias() {
        let file = facts(
            "internal/app",
            "app.go",
            r#"package app

import (
	dig "go.uber.org/fx"
	"example.com/app/internal/fx"
)

func wire() {
	dig.Provide(New)
	fx.Provide(New)
	dig.Supply(1)
}
"#,
        );
        let imports = ImportTable::new(&file.imports);
        let ctx = CallContext {
            package: &file.package_path,
            imports: &imports,
        };
        let rule = DiRule::fx();
        let calls = &file.functions[0].calls;
        assert!(Resolver::matches_rule(&calls[0].shape, &rule, ctx));
        assert!(!Resolver::matches_rule(&calls[1].shape, &rule, ctx));
        assert!(!Resolver::matches_rule(&calls[2].shape, &rule, ctx));
    }
}
