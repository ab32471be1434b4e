//! The post-order type checker (§4.5) and its call-site contract (§6
//! "Checker output"): a type per expression id, a reference (resolved
//! variable name or matching overload ids) per expression id, and
//! whatever issues were raised along the way.

use rustc_hash::{FxHashMap, FxHashSet};

use cel_diagnostic::{Diagnostic, ErrorCode, IssueCollector};
use cel_ir::{Constant, ExprArena, ExprId, ExprKind, FieldInit, MapEntry, Name, StringInterner};
use cel_stack::ensure_sufficient_stack;

use crate::env::{candidate_names, Env, FunctionDecl, OverloadDecl};
use crate::pool::{Pool, VarState};
use crate::ty::{TypeData, TypeId, VarId};
use crate::unify::{JsonAnchors, Unifier};

/// A field a [`TypeProvider`] resolved for a struct selection or
/// initialization. `wrapper` mirrors §4.5.2: a wrapper-typed field is
/// exposed to the checker as `nullable-of(ty)`, never as the bare
/// wrapper type.
pub struct FieldType {
    pub ty: TypeId,
    pub wrapper: bool,
}

/// A resolved `fq-extension-name` (§6's `lookupExtensionType`): the
/// message type the extension is attached to and the type of the
/// extension field itself.
pub struct ExtensionType {
    pub message_type: TypeId,
    pub field_type: TypeId,
}

/// The struct-descriptor half of the environment (§6). Proto descriptors
/// themselves are out of scope for this core; this trait is the seam a
/// host crate hangs a real descriptor-backed implementation from. Lookups
/// that need to build composite field types are handed the `Pool`
/// directly, since only the pool can intern them.
pub trait TypeProvider {
    fn has_type(&self, name: &str) -> bool;
    fn lookup_field_type(&self, pool: &mut Pool, struct_name: &str, field: &str) -> Option<FieldType>;
    fn lookup_enum_value(&self, name: &str) -> Option<i64>;

    /// Resolve `name` as a type reference itself (§6's `findType`), e.g.
    /// a message or enum type used where a type, not a value, is
    /// expected. Default: no named types beyond the standard ones the
    /// checker already knows about.
    fn find_type(&self, pool: &mut Pool, name: &str) -> Option<TypeId> {
        let _ = (pool, name);
        None
    }

    /// Every type name this provider can resolve (§6's `types()`).
    /// Default: none.
    fn types(&self) -> Vec<String> {
        Vec::new()
    }

    /// The field names declared on `struct_name`, when the provider can
    /// enumerate them (§6's `lookupFieldNames`). Default: unknown.
    fn lookup_field_names(&self, struct_name: &str) -> Option<Vec<String>> {
        let _ = struct_name;
        None
    }

    /// Resolve a fully-qualified extension name to the message type it
    /// extends and the extension field's own type (§6's
    /// `lookupExtensionType`). Default: no extensions.
    fn lookup_extension_type(&self, pool: &mut Pool, fq_extension_name: &str) -> Option<ExtensionType> {
        let _ = (pool, fq_extension_name);
        None
    }
}

/// A `TypeProvider` with no registered structs or enums. Every message
/// descriptor lookup used by `Select`/`CreateStruct`/identifier-chain
/// typing fails, which is exactly right for a core that never parses
/// `.proto` files itself.
#[derive(Clone, Copy, Default)]
pub struct EmptyTypeProvider;

impl TypeProvider for EmptyTypeProvider {
    fn has_type(&self, _name: &str) -> bool {
        false
    }

    fn lookup_field_type(&self, _pool: &mut Pool, _struct_name: &str, _field: &str) -> Option<FieldType> {
        None
    }

    fn lookup_enum_value(&self, _name: &str) -> Option<i64> {
        None
    }
}

/// What an expression id's name/call ultimately resolved to.
#[derive(Clone, Debug, PartialEq)]
pub enum Reference {
    /// A fully-qualified variable, enum-value, or type name.
    Variable(String),
    /// Every overload id that unified at this call site (§4.5 item 4).
    Overloads(Vec<String>),
}

/// The checker's output: one type and (where applicable) one reference
/// per expression id. Diagnostics live in the caller-supplied
/// `IssueCollector` passed to [`check`].
#[derive(Default)]
pub struct CheckResult {
    pub types: FxHashMap<ExprId, TypeId>,
    pub references: FxHashMap<ExprId, Reference>,
}

/// Type-check `arena` against `env`, consulting `provider` for struct and
/// enum descriptors. `env` and `pool` are mutated in place: `env` gains
/// and loses comprehension-scoped declarations as the walk proceeds,
/// `pool` gains whatever fresh type-parameters and interned composites
/// the checker needed.
pub fn check(
    arena: &ExprArena,
    interner: &StringInterner,
    env: &mut Env,
    pool: &mut Pool,
    provider: &dyn TypeProvider,
    issues: &mut IssueCollector,
) -> CheckResult {
    check_expecting(arena, interner, env, pool, provider, None, issues)
}

/// Like [`check`], but additionally unifies the root expression's type
/// against `expected` (when given), raising `E4008` at the root's span if
/// they don't agree. This is the whole of what a caller-supplied expected
/// result type means for the checker: it's checked like any other
/// unification, not threaded through every node as a top-down hint.
pub fn check_expecting(
    arena: &ExprArena,
    interner: &StringInterner,
    env: &mut Env,
    pool: &mut Pool,
    provider: &dyn TypeProvider,
    expected: Option<TypeId>,
    issues: &mut IssueCollector,
) -> CheckResult {
    let anchors = JsonAnchors::standard(pool);
    let mut checker = Checker {
        arena,
        interner,
        env,
        pool,
        provider,
        issues,
        anchors,
        types: FxHashMap::default(),
        references: FxHashMap::default(),
    };
    if let Some(root) = arena.root() {
        let actual = checker.check_expr(root);
        if let Some(expected) = expected {
            let mut unifier = Unifier::new(checker.pool);
            if unifier.unify(actual, expected).is_err() {
                let rendered_expected = checker.pool.display(expected);
                let rendered_actual = checker.pool.display(actual);
                checker.issues.push(
                    Diagnostic::error(
                        ErrorCode::E4008,
                        format!("expected type does not match: expected `{rendered_expected}`, found `{rendered_actual}`"),
                        arena.span(root),
                    )
                    .with_expr(root),
                );
            }
        }
    }
    CheckResult {
        types: checker.types,
        references: checker.references,
    }
}

struct Checker<'a> {
    arena: &'a ExprArena,
    interner: &'a StringInterner,
    env: &'a mut Env,
    pool: &'a mut Pool,
    provider: &'a dyn TypeProvider,
    issues: &'a mut IssueCollector,
    anchors: JsonAnchors,
    types: FxHashMap<ExprId, TypeId>,
    references: FxHashMap<ExprId, Reference>,
}

impl<'a> Checker<'a> {
    fn check_expr(&mut self, id: ExprId) -> TypeId {
        if let Some(&ty) = self.types.get(&id) {
            return ty;
        }
        let ty = ensure_sufficient_stack(|| self.check_kind(id));
        self.types.insert(id, ty);
        ty
    }

    fn check_kind(&mut self, id: ExprId) -> TypeId {
        match self.arena.kind(id) {
            ExprKind::Constant(c) => Self::type_of_constant(c),
            ExprKind::Ident { name, absolute } => self.check_ident(id, *name, *absolute),
            ExprKind::Select { operand, field, test_only } => {
                self.check_select(id, *operand, *field, *test_only)
            }
            ExprKind::Call { target, function, args } => self.check_call(id, *target, *function, args),
            ExprKind::CreateList { elements, optional_indices } => {
                self.check_list(elements, optional_indices)
            }
            ExprKind::CreateMap { entries } => self.check_map(entries),
            ExprKind::CreateStruct { type_name, fields } => self.check_struct(id, *type_name, fields),
            ExprKind::Comprehension {
                iter_var,
                iter_range,
                accu_var,
                accu_init,
                loop_cond,
                loop_step,
                result,
            } => self.check_comprehension(
                *iter_var,
                *iter_range,
                *accu_var,
                *accu_init,
                *loop_cond,
                *loop_step,
                *result,
            ),
        }
    }

    fn type_of_constant(c: &Constant) -> TypeId {
        match c {
            Constant::Bool(_) => TypeId::BOOL,
            Constant::Int(_) => TypeId::INT,
            Constant::Uint(_) => TypeId::UINT,
            Constant::Double(_) => TypeId::DOUBLE,
            Constant::String(_) => TypeId::STRING,
            Constant::Bytes(_) => TypeId::BYTES,
            Constant::Null => TypeId::NULL,
        }
    }

    fn check_ident(&mut self, id: ExprId, name: Name, absolute: bool) -> TypeId {
        let ident = self.interner.resolve(name).to_string();
        let relative = if absolute { format!(".{ident}") } else { ident.clone() };
        if let Some((resolved, ty)) = self.env.resolve_var(&relative) {
            self.references.insert(id, Reference::Variable(resolved));
            return ty;
        }
        if let Some(ty) = self.resolve_chain(id, &[ident], absolute) {
            return ty;
        }
        self.issues.push(
            Diagnostic::error(ErrorCode::E3001, format!("undeclared reference to `{relative}`"), self.arena.span(id))
                .with_expr(id),
        );
        TypeId::ERROR
    }

    /// Walk a chain of plain (non-test-only) selects down to its root
    /// identifier, e.g. `a.b.c` → `(["a", "b", "c"], absolute)`. Returns
    /// `None` as soon as a non-select/non-ident node appears, since only
    /// such chains can plausibly denote a qualified type or enum name
    /// (§4.5.3).
    fn dotted_chain(arena: &ExprArena, interner: &StringInterner, id: ExprId) -> Option<(Vec<String>, bool)> {
        match arena.kind(id) {
            ExprKind::Ident { name, absolute } => Some((vec![interner.resolve(*name).to_string()], *absolute)),
            ExprKind::Select { operand, field, test_only: false } => {
                let (mut segments, absolute) = Self::dotted_chain(arena, interner, *operand)?;
                segments.push(interner.resolve(*field).to_string());
                Some((segments, absolute))
            }
            _ => None,
        }
    }

    /// §4.5.3: try the whole chain as an enum value first, then shrink
    /// from the right looking for the longest prefix that names a
    /// registered type.
    fn resolve_chain(&mut self, id: ExprId, segments: &[String], absolute: bool) -> Option<TypeId> {
        let container = self.env.container().to_string();

        let full = segments.join(".");
        let full_relative = if absolute { format!(".{full}") } else { full };
        for candidate in candidate_names(&container, &full_relative) {
            if self.provider.lookup_enum_value(&candidate).is_some() {
                self.references.insert(id, Reference::Variable(candidate));
                return Some(TypeId::INT);
            }
        }

        for len in (1..=segments.len()).rev() {
            let prefix = segments[..len].join(".");
            let relative = if absolute { format!(".{prefix}") } else { prefix };
            for candidate in candidate_names(&container, &relative) {
                if self.provider.has_type(&candidate) {
                    let struct_ty = self.pool.struct_ref(candidate.clone());
                    let type_of_ty = self.pool.type_of(struct_ty);
                    self.references.insert(id, Reference::Variable(candidate));
                    return Some(type_of_ty);
                }
            }
        }
        None
    }

    fn check_select(&mut self, id: ExprId, operand: ExprId, field: Name, test_only: bool) -> TypeId {
        let field_name = self.interner.resolve(field).to_string();
        let operand_ty = self.check_expr(operand);

        if operand_ty == TypeId::ERROR {
            // The operand may itself be an unresolved identifier that,
            // taken together with this select, actually names a type or
            // enum value (`pkg.Enum.VALUE`, `pkg.Message`).
            if let Some((segments, absolute)) = Self::dotted_chain(self.arena, self.interner, id) {
                if let Some(ty) = self.resolve_chain(id, &segments, absolute) {
                    return ty;
                }
            }
            return TypeId::ERROR;
        }

        let resolved = {
            let mut unifier = Unifier::new(self.pool);
            unifier.resolve(operand_ty)
        };

        match self.pool.get(resolved).clone() {
            TypeData::StructRef(struct_name) => match self.provider.lookup_field_type(self.pool, &struct_name, &field_name) {
                Some(field) if test_only => TypeId::BOOL,
                Some(field) => {
                    if field.wrapper {
                        self.pool.nullable_of(field.ty)
                    } else {
                        field.ty
                    }
                }
                None => {
                    let message = match self.provider.lookup_field_names(&struct_name) {
                        Some(known) => {
                            format!("`{struct_name}` has no field `{field_name}`, known fields: {}", known.join(", "))
                        }
                        None => format!("`{struct_name}` has no field `{field_name}`"),
                    };
                    self.issues.push(Diagnostic::error(ErrorCode::E4002, message, self.arena.span(id)).with_expr(id));
                    TypeId::ERROR
                }
            },
            TypeData::Map(_, value) => {
                if test_only {
                    TypeId::BOOL
                } else {
                    value
                }
            }
            // `dyn` and the json-convergence sentinel defer field
            // presence to runtime; `has()` on them never errors here.
            TypeData::Dyn => {
                if test_only {
                    TypeId::BOOL
                } else {
                    TypeId::DYN
                }
            }
            TypeData::Opaque(name, _) if name == "json" => {
                if test_only {
                    TypeId::BOOL
                } else {
                    TypeId::DYN
                }
            }
            TypeData::Param(_) => {
                if test_only {
                    TypeId::BOOL
                } else {
                    TypeId::DYN
                }
            }
            _ => {
                self.issues.push(
                    Diagnostic::error(
                        ErrorCode::E4006,
                        format!("cannot select `{field_name}` from `{}`", self.pool.display(resolved)),
                        self.arena.span(id),
                    )
                    .with_expr(id),
                );
                TypeId::ERROR
            }
        }
    }

    /// `a.?b` desugars to a call to this pseudo-function (§4.3's optional
    /// syntax) rather than a `Select` node, since the field name travels
    /// as an ordinary string-constant argument instead of the `field`
    /// slot. It resolves structurally, the same way `Select` does, never
    /// through overload resolution, since its second argument is a field
    /// name rather than a typed value.
    fn check_optional_select(&mut self, id: ExprId, operand: ExprId, field_arg: ExprId) -> TypeId {
        let operand_ty = self.check_expr(operand);
        let field_name = match self.arena.kind(field_arg) {
            ExprKind::Constant(Constant::String(s)) => s.clone(),
            _ => {
                self.issues.push(
                    Diagnostic::error(
                        ErrorCode::E4001,
                        "optional_select field name must be a string constant".to_string(),
                        self.arena.span(id),
                    )
                    .with_expr(id),
                );
                return TypeId::ERROR;
            }
        };
        self.references.insert(id, Reference::Overloads(vec!["optional_select".to_string()]));

        if operand_ty == TypeId::ERROR {
            return TypeId::ERROR;
        }

        let mut resolved = {
            let mut unifier = Unifier::new(self.pool);
            unifier.resolve(operand_ty)
        };
        if let TypeData::OptionalOf(inner) = self.pool.get(resolved).clone() {
            resolved = {
                let mut unifier = Unifier::new(self.pool);
                unifier.resolve(inner)
            };
        }

        match self.pool.get(resolved).clone() {
            TypeData::StructRef(struct_name) => match self.provider.lookup_field_type(self.pool, &struct_name, &field_name) {
                Some(field) => self.pool.optional_of(field.ty),
                None => {
                    let message = match self.provider.lookup_field_names(&struct_name) {
                        Some(known) => {
                            format!("`{struct_name}` has no field `{field_name}`, known fields: {}", known.join(", "))
                        }
                        None => format!("`{struct_name}` has no field `{field_name}`"),
                    };
                    self.issues.push(Diagnostic::error(ErrorCode::E4002, message, self.arena.span(id)).with_expr(id));
                    TypeId::ERROR
                }
            },
            TypeData::Map(_, value) => self.pool.optional_of(value),
            TypeData::Dyn => self.pool.optional_of(TypeId::DYN),
            TypeData::Opaque(name, _) if name == "json" => self.pool.optional_of(TypeId::DYN),
            TypeData::Param(_) => self.pool.optional_of(TypeId::DYN),
            _ => {
                self.issues.push(
                    Diagnostic::error(
                        ErrorCode::E4006,
                        format!("cannot select `{field_name}` from `{}`", self.pool.display(resolved)),
                        self.arena.span(id),
                    )
                    .with_expr(id),
                );
                TypeId::ERROR
            }
        }
    }

    fn check_call(&mut self, id: ExprId, target: Option<ExprId>, function: Name, args: &[ExprId]) -> TypeId {
        let function_name = self.interner.resolve(function).to_string();

        if function_name == "optional_select" && target.is_none() && args.len() == 2 {
            return self.check_optional_select(id, args[0], args[1]);
        }

        let mut actual = Vec::with_capacity(args.len() + 1);
        if let Some(target_id) = target {
            actual.push(self.check_expr(target_id));
        }
        for &arg in args {
            actual.push(self.check_expr(arg));
        }

        if (function_name == "_==_" || function_name == "_!=_") && actual.len() == 2 {
            if let Some((lhs, rhs)) = self.null_against_primitive(actual[0], actual[1]) {
                self.issues.push(
                    Diagnostic::error(
                        ErrorCode::E4007,
                        format!(
                            "`null` used where a primitive is expected: `{function_name}({}, {})`",
                            self.pool.display(lhs),
                            self.pool.display(rhs)
                        ),
                        self.arena.span(id),
                    )
                    .with_expr(id),
                );
                return TypeId::ERROR;
            }
        }

        let decl: FunctionDecl = match self.env.resolve_function(&function_name) {
            Some(decl) => decl.clone(),
            None => {
                self.issues.push(
                    Diagnostic::error(
                        ErrorCode::E3001,
                        format!("undeclared function `{function_name}`"),
                        self.arena.span(id),
                    )
                    .with_expr(id),
                );
                return TypeId::ERROR;
            }
        };

        let is_instance = target.is_some();
        let candidates: Vec<&OverloadDecl> = decl
            .overloads
            .iter()
            .filter(|o| o.is_instance == is_instance && o.params.len() == actual.len())
            .collect();

        let mut matches: Vec<(String, TypeId)> = Vec::new();
        for overload in &candidates {
            let snapshot = self.pool.snapshot_vars();
            if let Some(result) = try_overload(self.pool, &actual, overload) {
                matches.push((overload.id.clone(), result));
            }
            self.pool.restore_vars(snapshot);
        }

        if matches.is_empty() {
            let shown: Vec<String> = actual.iter().map(|&t| self.pool.display(t)).collect();
            self.issues.push(
                Diagnostic::error(
                    ErrorCode::E4001,
                    format!("no matching overload for `{function_name}({})`", shown.join(", ")),
                    self.arena.span(id),
                )
                .with_expr(id),
            );
            return TypeId::ERROR;
        }

        let ids: Vec<String> = matches.iter().map(|(id, _)| id.clone()).collect();
        self.references.insert(id, Reference::Overloads(ids));

        let result_types: Vec<TypeId> = matches.iter().map(|(_, t)| *t).collect();
        if let [only] = result_types[..] {
            only
        } else {
            let mut unifier = Unifier::new(self.pool);
            unifier.lub(&result_types, &self.anchors)
        }
    }

    /// `_==_`/`_!=_`'s generic `(T, T) -> bool` overload would otherwise
    /// let `null` unify against any concrete primitive by binding `T` to
    /// whichever side it sees first. §4.5.2 requires that comparison to
    /// be a type error rather than a silently well-typed one, so it's
    /// caught here before overload resolution runs. Returns the
    /// resolved `(lhs, rhs)` pair when one side is `null` and the other
    /// is a non-null primitive.
    fn null_against_primitive(&mut self, lhs: TypeId, rhs: TypeId) -> Option<(TypeId, TypeId)> {
        let mut unifier = Unifier::new(self.pool);
        let lhs = unifier.resolve(lhs);
        let rhs = unifier.resolve(rhs);
        let lhs_data = self.pool.get(lhs).clone();
        let rhs_data = self.pool.get(rhs).clone();
        let is_null_vs_primitive = match (&lhs_data, &rhs_data) {
            (TypeData::Null, other) | (other, TypeData::Null) => {
                other.is_primitive() && !matches!(other, TypeData::Null)
            }
            _ => false,
        };
        is_null_vs_primitive.then_some((lhs, rhs))
    }

    fn check_list(&mut self, elements: &[ExprId], optional_indices: &FxHashSet<usize>) -> TypeId {
        if elements.is_empty() {
            let elem = self.pool.fresh_var(None);
            return self.pool.list_of(elem);
        }
        let mut elem_types = Vec::with_capacity(elements.len());
        for (i, &el) in elements.iter().enumerate() {
            let mut ty = self.check_expr(el);
            if optional_indices.contains(&i) {
                if let TypeData::OptionalOf(inner) = self.pool.get(ty) {
                    ty = *inner;
                }
            }
            elem_types.push(ty);
        }
        let elem = {
            let mut unifier = Unifier::new(self.pool);
            unifier.lub(&elem_types, &self.anchors)
        };
        self.pool.list_of(elem)
    }

    fn check_map(&mut self, entries: &[MapEntry]) -> TypeId {
        if entries.is_empty() {
            let key = self.pool.fresh_var(None);
            let value = self.pool.fresh_var(None);
            return self.pool.map_of(key, value);
        }
        let mut key_types = Vec::with_capacity(entries.len());
        let mut value_types = Vec::with_capacity(entries.len());
        for entry in entries {
            key_types.push(self.check_expr(entry.key));
            let mut value_ty = self.check_expr(entry.value);
            if entry.optional {
                if let TypeData::OptionalOf(inner) = self.pool.get(value_ty) {
                    value_ty = *inner;
                }
            }
            value_types.push(value_ty);
        }
        let key = {
            let mut unifier = Unifier::new(self.pool);
            unifier.lub(&key_types, &self.anchors)
        };
        let value = {
            let mut unifier = Unifier::new(self.pool);
            unifier.lub(&value_types, &self.anchors)
        };
        self.pool.map_of(key, value)
    }

    fn check_struct(&mut self, id: ExprId, type_name: Name, fields: &[FieldInit]) -> TypeId {
        let name = self.interner.resolve(type_name).to_string();
        let container = self.env.container().to_string();
        let struct_name = candidate_names(&container, &name)
            .into_iter()
            .find(|candidate| self.provider.has_type(candidate));

        let Some(struct_name) = struct_name else {
            self.issues.push(
                Diagnostic::error(ErrorCode::E3001, format!("undeclared type `{name}`"), self.arena.span(id)).with_expr(id),
            );
            for field in fields {
                self.check_expr(field.value);
            }
            return TypeId::ERROR;
        };

        for field in fields {
            let field_name = self.interner.resolve(field.field).to_string();
            let mut value_ty = self.check_expr(field.value);
            if field.optional {
                if let TypeData::OptionalOf(inner) = self.pool.get(value_ty) {
                    value_ty = *inner;
                }
            }
            match self.provider.lookup_field_type(self.pool, &struct_name, &field_name) {
                Some(expected) => {
                    let expected_ty = if expected.wrapper {
                        self.pool.nullable_of(expected.ty)
                    } else {
                        expected.ty
                    };
                    let mut unifier = Unifier::new(self.pool);
                    if unifier.unify(value_ty, expected_ty).is_err() {
                        let expected_display = self.pool.display(expected_ty);
                        let actual_display = self.pool.display(value_ty);
                        self.issues.push(
                            Diagnostic::error(
                                ErrorCode::E4003,
                                format!(
                                    "field `{field_name}` of `{struct_name}` expects {expected_display}, found {actual_display}"
                                ),
                                self.arena.span(field.value),
                            )
                            .with_expr(field.value),
                        );
                    }
                }
                None => {
                    let message = match self.provider.lookup_field_names(&struct_name) {
                        Some(known) => {
                            format!("`{struct_name}` has no field `{field_name}`, known fields: {}", known.join(", "))
                        }
                        None => format!("`{struct_name}` has no field `{field_name}`"),
                    };
                    self.issues.push(
                        Diagnostic::error(ErrorCode::E4002, message, self.arena.span(field.value)).with_expr(field.value),
                    );
                }
            }
        }

        self.pool.struct_ref(struct_name)
    }

    #[allow(clippy::too_many_arguments)]
    fn check_comprehension(
        &mut self,
        iter_var: Name,
        iter_range: ExprId,
        accu_var: Name,
        accu_init: ExprId,
        loop_cond: ExprId,
        loop_step: ExprId,
        result: ExprId,
    ) -> TypeId {
        let range_ty = self.check_expr(iter_range);
        let resolved_range = {
            let mut unifier = Unifier::new(self.pool);
            unifier.resolve(range_ty)
        };
        let iter_ty = match self.pool.get(resolved_range).clone() {
            TypeData::List(elem) => elem,
            TypeData::Map(key, _) => key,
            TypeData::Error => TypeId::ERROR,
            _ => TypeId::DYN,
        };

        let accu_ty = self.check_expr(accu_init);

        let iter_name = self.interner.resolve(iter_var).to_string();
        let accu_name = self.interner.resolve(accu_var).to_string();

        self.env.enter();
        self.env.declare_var(iter_name, iter_ty);
        self.env.enter();
        self.env.declare_var(accu_name, accu_ty);

        let cond_ty = self.check_expr(loop_cond);
        if !self.is_assignable(cond_ty, TypeId::BOOL) {
            self.issues.push(
                Diagnostic::error(
                    ErrorCode::E4004,
                    format!("comprehension condition must be bool, found {}", self.pool.display(cond_ty)),
                    self.arena.span(loop_cond),
                )
                .with_expr(loop_cond),
            );
        }

        let step_ty = self.check_expr(loop_step);
        if !self.is_assignable(step_ty, accu_ty) {
            self.issues.push(
                Diagnostic::error(
                    ErrorCode::E4005,
                    format!(
                        "comprehension step produces {} but the accumulator has type {}",
                        self.pool.display(step_ty),
                        self.pool.display(accu_ty)
                    ),
                    self.arena.span(loop_step),
                )
                .with_expr(loop_step),
            );
        }

        let result_ty = self.check_expr(result);

        self.env.exit();
        self.env.exit();

        result_ty
    }

    fn is_assignable(&mut self, src: TypeId, dst: TypeId) -> bool {
        let snapshot = self.pool.snapshot_vars();
        let ok = {
            let mut unifier = Unifier::new(self.pool);
            unifier.unify(src, dst).is_ok()
        };
        self.pool.restore_vars(snapshot);
        ok
    }
}

/// Instantiate `overload`'s locally-scoped `type_params` with fresh
/// variables (one per declared name, shared across every `params`/
/// `result` occurrence of that name) and attempt to unify each actual
/// argument against the corresponding freshened parameter.
fn try_overload(pool: &mut Pool, actual: &[TypeId], overload: &OverloadDecl) -> Option<TypeId> {
    let (params, result) = freshen_overload(pool, overload);
    let mut unifier = Unifier::new(pool);
    for (&a, &p) in actual.iter().zip(params.iter()) {
        unifier.unify(a, p).ok()?;
    }
    Some(unifier.finalise(result, TypeId::DYN))
}

fn freshen_overload(pool: &mut Pool, overload: &OverloadDecl) -> (Vec<TypeId>, TypeId) {
    if overload.type_params.is_empty() {
        return (overload.params.clone(), overload.result);
    }
    let names: FxHashSet<String> = overload.type_params.iter().cloned().collect();
    let mut mapping: FxHashMap<VarId, TypeId> = FxHashMap::default();
    let params = overload.params.iter().map(|&p| freshen(pool, p, &mut mapping, &names)).collect();
    let result = freshen(pool, overload.result, &mut mapping, &names);
    (params, result)
}

/// Substitute every `Param` whose declared name is one of `names` with a
/// fresh variable, shared across all occurrences via `mapping`. Anything
/// else (ground types, and stray parameters that aren't this overload's
/// own) passes through unchanged.
fn freshen(pool: &mut Pool, ty: TypeId, mapping: &mut FxHashMap<VarId, TypeId>, names: &FxHashSet<String>) -> TypeId {
    match pool.get(ty).clone() {
        TypeData::Param(var_id) => {
            if let Some(&fresh) = mapping.get(&var_id) {
                return fresh;
            }
            if let VarState::Unbound { name: Some(n) } = pool.var_state(var_id).clone() {
                if names.contains(&n) {
                    let fresh = pool.fresh_var(Some(n));
                    mapping.insert(var_id, fresh);
                    return fresh;
                }
            }
            ty
        }
        TypeData::List(elem) => {
            let elem = freshen(pool, elem, mapping, names);
            pool.list_of(elem)
        }
        TypeData::Map(key, value) => {
            let key = freshen(pool, key, mapping, names);
            let value = freshen(pool, value, mapping, names);
            pool.map_of(key, value)
        }
        TypeData::WrapperOf(inner) => {
            let inner = freshen(pool, inner, mapping, names);
            pool.wrapper_of(inner)
        }
        TypeData::NullableOf(inner) => {
            let inner = freshen(pool, inner, mapping, names);
            pool.nullable_of(inner)
        }
        TypeData::OptionalOf(inner) => {
            let inner = freshen(pool, inner, mapping, names);
            pool.optional_of(inner)
        }
        TypeData::TypeOf(inner) => {
            let inner = freshen(pool, inner, mapping, names);
            pool.type_of(inner)
        }
        TypeData::Opaque(name, params) => {
            let params = params.into_iter().map(|p| freshen(pool, p, mapping, names)).collect();
            pool.opaque(name, params)
        }
        _ => ty,
    }
}
