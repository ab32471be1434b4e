//! Declarations (§3.4), the environment (§3.5), and container-relative
//! name resolution (§3.6).

use rustc_hash::{FxHashMap, FxHashSet};

use cel_diagnostic::{Diagnostic, ErrorCode, IssueCollector};
use cel_ir::Span;

use crate::ty::TypeId;

#[derive(Clone, Debug)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeId,
}

/// One overload of a function. `type_params` are locally scoped to this
/// overload: the checker freshens them into new inference variables for
/// every call-site attempt, so two calls to the same overload never
/// share a binding.
#[derive(Clone, Debug)]
pub struct OverloadDecl {
    pub id: String,
    pub is_instance: bool,
    pub type_params: Vec<String>,
    pub params: Vec<TypeId>,
    pub result: TypeId,
}

#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub overloads: Vec<OverloadDecl>,
}

/// Candidate fully-qualified names for `relative` inside `container`,
/// most-qualified first (§3.6): `x.y` + `a.b.c` → `x.y.a.b.c`,
/// `x.a.b.c`, `a.b.c`. A leading dot on `relative` forces absolute and
/// skips the walk entirely.
pub fn candidate_names(container: &str, relative: &str) -> Vec<String> {
    if let Some(stripped) = relative.strip_prefix('.') {
        return vec![stripped.to_string()];
    }
    if container.is_empty() {
        return vec![relative.to_string()];
    }
    let segments: Vec<&str> = container.split('.').collect();
    (0..=segments.len())
        .rev()
        .map(|i| {
            if i == 0 {
                relative.to_string()
            } else {
                format!("{}.{relative}", segments[..i].join("."))
            }
        })
        .collect()
}

/// One lexical frame: a comprehension's `iter_var`/`accu_var` bindings,
/// or the root frame holding every top-level `VarDecl`.
#[derive(Debug, Default)]
struct Scope {
    vars: FxHashMap<String, TypeId>,
}

/// A scope holds two mutable maps (identifiers, functions) plus a parent
/// pointer; identifiers are looked up by walking frames inward-out,
/// functions resolved globally (§3.5) since CEL has no per-scope
/// function declarations.
#[derive(Debug)]
pub struct Env {
    scopes: Vec<Scope>,
    functions: FxHashMap<String, FunctionDecl>,
    container: String,
    standard_functions: FxHashSet<String>,
    standard_vars: FxHashSet<String>,
    lock_standard: bool,
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Env {
    pub fn new() -> Self {
        Env {
            scopes: vec![Scope::default()],
            functions: FxHashMap::default(),
            container: String::new(),
            standard_functions: FxHashSet::default(),
            standard_vars: FxHashSet::default(),
            lock_standard: false,
        }
    }

    pub fn with_container(container: impl Into<String>) -> Self {
        let mut env = Self::new();
        env.container = container.into();
        env
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Set the container after construction, e.g. once the standard
    /// environment (which always builds with an empty container) has
    /// been populated and a caller-supplied container needs to apply on
    /// top of it.
    pub fn set_container(&mut self, container: impl Into<String>) {
        self.container = container.into();
    }

    /// Push a new lexical frame (entering a comprehension's scope).
    pub fn enter(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost lexical frame.
    ///
    /// # Panics
    /// Panics if called without a matching `enter()` (the root frame is
    /// never popped).
    pub fn exit(&mut self) {
        assert!(self.scopes.len() > 1, "cannot exit the root scope");
        self.scopes.pop();
    }

    pub fn declare_var(&mut self, name: impl Into<String>, ty: TypeId) {
        let scope = self.scopes.last_mut().expect("root scope always present");
        scope.vars.insert(name.into(), ty);
    }

    /// Register `decl`, returning a diagnostic if one of its overloads
    /// shares a `(params, is_instance)` shape with an overload already
    /// declared for the same function name, or with another overload in
    /// `decl` itself (§3.4: overload signatures must be distinct).
    pub fn declare_function(&mut self, decl: FunctionDecl) -> Option<Diagnostic> {
        let collision = self.overload_collision(&decl);
        self.functions.insert(decl.name.clone(), decl);
        collision
    }

    fn overload_collision(&self, decl: &FunctionDecl) -> Option<Diagnostic> {
        let mut seen: Vec<(bool, &[TypeId])> = Vec::new();
        if let Some(existing) = self.functions.get(&decl.name) {
            seen.extend(existing.overloads.iter().map(|o| (o.is_instance, o.params.as_slice())));
        }
        for overload in &decl.overloads {
            let shape = (overload.is_instance, overload.params.as_slice());
            if seen.contains(&shape) {
                return Some(Diagnostic::error(
                    ErrorCode::E3002,
                    format!(
                        "ambiguous reference: overload `{}` of `{}` shares a signature with another overload",
                        overload.id, decl.name
                    ),
                    Span::DUMMY,
                ));
            }
            seen.push(shape);
        }
        None
    }

    /// Register a standard-library declaration. Call `lock_standard`
    /// afterwards so later user declarations can be checked against the
    /// names recorded here.
    pub(crate) fn declare_standard_function(&mut self, decl: FunctionDecl) {
        self.standard_functions.insert(decl.name.clone());
        self.functions.insert(decl.name.clone(), decl);
    }

    pub(crate) fn declare_standard_var(&mut self, name: impl Into<String>, ty: TypeId) {
        let name = name.into();
        self.standard_vars.insert(name.clone());
        self.declare_var(name, ty);
    }

    /// Forbid further declarations from shadowing a standard name.
    /// Attempts after this point raise `E5002` instead of overwriting.
    pub fn lock_standard(&mut self) {
        self.lock_standard = true;
    }

    /// Like `declare_function`, but rejects (with `E5002`) an attempt to
    /// override a standard declaration while the standard environment is
    /// locked.
    pub fn declare_function_checked(&mut self, decl: FunctionDecl, issues: &mut IssueCollector) {
        if self.lock_standard && self.standard_functions.contains(&decl.name) {
            issues.push(Diagnostic::error(
                ErrorCode::E5002,
                format!("cannot override standard function `{}`", decl.name),
                Span::DUMMY,
            ));
            return;
        }
        if let Some(collision) = self.declare_function(decl) {
            issues.push(collision);
        }
    }

    pub fn declare_var_checked(&mut self, name: impl Into<String>, ty: TypeId, issues: &mut IssueCollector) {
        let name = name.into();
        if self.lock_standard && self.standard_vars.contains(&name) {
            issues.push(Diagnostic::error(
                ErrorCode::E5002,
                format!("cannot override standard identifier `{name}`"),
                Span::DUMMY,
            ));
            return;
        }
        self.declare_var(name, ty);
    }

    /// Resolve `relative` against the container, walking scopes
    /// inward-out at each candidate name. Returns the fully-qualified
    /// name that matched plus its type.
    pub fn resolve_var(&self, relative: &str) -> Option<(String, TypeId)> {
        for candidate in candidate_names(&self.container, relative) {
            for scope in self.scopes.iter().rev() {
                if let Some(&ty) = scope.vars.get(&candidate) {
                    return Some((candidate, ty));
                }
            }
        }
        None
    }

    /// Resolve a function name against the container, in candidate order.
    pub fn resolve_function(&self, relative: &str) -> Option<&FunctionDecl> {
        candidate_names(&self.container, relative)
            .iter()
            .find_map(|candidate| self.functions.get(candidate))
    }

    pub fn function(&self, fully_qualified: &str) -> Option<&FunctionDecl> {
        self.functions.get(fully_qualified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_names_walk_container_outward() {
        assert_eq!(
            candidate_names("x.y", "a.b.c"),
            vec!["x.y.a.b.c", "x.a.b.c", "a.b.c"]
        );
    }

    #[test]
    fn leading_dot_forces_absolute() {
        assert_eq!(candidate_names("x.y", ".a.b"), vec!["a.b"]);
    }

    #[test]
    fn empty_container_yields_the_bare_name() {
        assert_eq!(candidate_names("", "a.b"), vec!["a.b"]);
    }

    #[test]
    fn inner_scope_shadows_outer_declaration() {
        let mut env = Env::new();
        env.declare_var("x", TypeId::INT);
        env.enter();
        env.declare_var("x", TypeId::STRING);
        assert_eq!(env.resolve_var("x"), Some(("x".to_string(), TypeId::STRING)));
        env.exit();
        assert_eq!(env.resolve_var("x"), Some(("x".to_string(), TypeId::INT)));
    }

    #[test]
    fn var_resolution_prefers_the_most_qualified_candidate() {
        let mut env = Env::with_container("pkg");
        env.declare_var("pkg.x", TypeId::STRING);
        env.declare_var("x", TypeId::INT);
        assert_eq!(env.resolve_var("x"), Some(("pkg.x".to_string(), TypeId::STRING)));
    }

    #[test]
    fn unresolved_name_is_none() {
        let env = Env::new();
        assert_eq!(env.resolve_var("missing"), None);
    }

    #[test]
    fn overriding_a_locked_standard_function_raises_e5002() {
        let mut env = Env::new();
        env.declare_standard_function(FunctionDecl {
            name: "size".to_string(),
            overloads: vec![],
        });
        env.lock_standard();
        let mut issues = IssueCollector::new();
        env.declare_function_checked(
            FunctionDecl {
                name: "size".to_string(),
                overloads: vec![],
            },
            &mut issues,
        );
        assert!(issues.has_errors());
    }

    #[test]
    fn overloads_with_the_same_shape_collide() {
        let mut env = Env::new();
        let collision = env.declare_function(FunctionDecl {
            name: "f".to_string(),
            overloads: vec![
                OverloadDecl {
                    id: "f_int".to_string(),
                    is_instance: false,
                    type_params: vec![],
                    params: vec![TypeId::INT],
                    result: TypeId::BOOL,
                },
                OverloadDecl {
                    id: "f_int_again".to_string(),
                    is_instance: false,
                    type_params: vec![],
                    params: vec![TypeId::INT],
                    result: TypeId::STRING,
                },
            ],
        });
        assert!(collision.is_some());
    }

    #[test]
    fn distinct_overload_shapes_do_not_collide() {
        let mut env = Env::new();
        let collision = env.declare_function(FunctionDecl {
            name: "f".to_string(),
            overloads: vec![OverloadDecl {
                id: "f_int".to_string(),
                is_instance: false,
                type_params: vec![],
                params: vec![TypeId::INT],
                result: TypeId::BOOL,
            }],
        });
        assert!(collision.is_none());
        let collision = env.declare_function(FunctionDecl {
            name: "f".to_string(),
            overloads: vec![OverloadDecl {
                id: "f_string".to_string(),
                is_instance: false,
                type_params: vec![],
                params: vec![TypeId::STRING],
                result: TypeId::BOOL,
            }],
        });
        assert!(collision.is_none());
    }

    #[test]
    fn declaring_a_new_function_while_locked_is_unaffected() {
        let mut env = Env::new();
        env.lock_standard();
        let mut issues = IssueCollector::new();
        env.declare_function_checked(
            FunctionDecl {
                name: "myFunc".to_string(),
                overloads: vec![],
            },
            &mut issues,
        );
        assert!(!issues.has_errors());
        assert!(env.function("myFunc").is_some());
    }
}
