//! Assignability and unification (§4.5.1).
//!
//! Link-based: a bound variable points directly at its target rather
//! than living in a substitution map, so `resolve` is a short pointer
//! chase with path compression, not a map lookup chain.

use std::fmt;

use crate::pool::{Pool, VarState};
use crate::ty::{TypeData, TypeId, VarId};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UnifyError {
    /// Two ground types that cannot be reconciled.
    Mismatch { src: TypeId, dst: TypeId },
    /// A variable would have to bind a type that mentions itself.
    Occurs { var: VarId, target: TypeId },
}

impl fmt::Display for UnifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnifyError::Mismatch { .. } => write!(f, "type mismatch"),
            UnifyError::Occurs { .. } => write!(f, "type variable occurs in its own binding"),
        }
    }
}

/// The JSON-convergence anchors from §4.5.1: when a set of actual types
/// can't unify pairwise but every member is assignable to one of these,
/// that's the LUB instead of falling all the way back to `dyn`.
pub struct JsonAnchors {
    pub nullable_bool: TypeId,
    pub nullable_bytes: TypeId,
    pub nullable_double: TypeId,
    pub nullable_int: TypeId,
    pub nullable_string: TypeId,
    pub nullable_uint: TypeId,
    pub json: TypeId,
}

impl JsonAnchors {
    /// Build the standard anchor set, interning `json` as a zero-parameter
    /// opaque type named `"json"` (a convergence sentinel, not a message
    /// type a `TypeProvider` would ever resolve).
    pub fn standard(pool: &mut Pool) -> Self {
        JsonAnchors {
            nullable_bool: pool.nullable_of(TypeId::BOOL),
            nullable_bytes: pool.nullable_of(TypeId::BYTES),
            nullable_double: pool.nullable_of(TypeId::DOUBLE),
            nullable_int: pool.nullable_of(TypeId::INT),
            nullable_string: pool.nullable_of(TypeId::STRING),
            nullable_uint: pool.nullable_of(TypeId::UINT),
            json: pool.opaque("json", Vec::new()),
        }
    }

    fn anchors(&self) -> [TypeId; 7] {
        [
            self.nullable_bool,
            self.nullable_bytes,
            self.nullable_double,
            self.nullable_int,
            self.nullable_string,
            self.nullable_uint,
            self.json,
        ]
    }
}

/// Operates on a `Pool` to resolve, unify, and take the LUB of types.
pub struct Unifier<'a> {
    pool: &'a mut Pool,
}

impl<'a> Unifier<'a> {
    pub fn new(pool: &'a mut Pool) -> Self {
        Unifier { pool }
    }

    pub fn pool(&self) -> &Pool {
        self.pool
    }

    pub fn pool_mut(&mut self) -> &mut Pool {
        self.pool
    }

    /// Follow `id` through any variable bindings, compressing the chain
    /// as it goes. A no-op for anything that isn't a `Param`.
    pub fn resolve(&mut self, id: TypeId) -> TypeId {
        let TypeData::Param(var_id) = *self.pool.get(id) else {
            return id;
        };
        let target = match self.pool.var_state(var_id) {
            VarState::Unbound { .. } => return id,
            VarState::Link { target } => *target,
        };
        let resolved = self.resolve(target);
        if resolved != target {
            self.pool.set_var_state(var_id, VarState::Link { target: resolved });
        }
        resolved
    }

    /// Replace every bound variable inside `id` by its binding,
    /// recursively. Unbound variables and ground structure pass through
    /// unchanged.
    pub fn specialise(&mut self, id: TypeId) -> TypeId {
        let id = self.resolve(id);
        match self.pool.get(id).clone() {
            TypeData::List(elem) => {
                let elem = self.specialise(elem);
                self.pool.list_of(elem)
            }
            TypeData::Map(key, value) => {
                let key = self.specialise(key);
                let value = self.specialise(value);
                self.pool.map_of(key, value)
            }
            TypeData::WrapperOf(inner) => {
                let inner = self.specialise(inner);
                self.pool.wrapper_of(inner)
            }
            TypeData::NullableOf(inner) => {
                let inner = self.specialise(inner);
                self.pool.nullable_of(inner)
            }
            TypeData::OptionalOf(inner) => {
                let inner = self.specialise(inner);
                self.pool.optional_of(inner)
            }
            TypeData::TypeOf(inner) => {
                let inner = self.specialise(inner);
                self.pool.type_of(inner)
            }
            TypeData::Opaque(name, params) => {
                let params = params.into_iter().map(|p| self.specialise(p)).collect();
                self.pool.opaque(name, params)
            }
            _ => id,
        }
    }

    /// Like `specialise`, but replaces any variable still unbound after
    /// specialisation with `default` (typically `dyn`).
    pub fn finalise(&mut self, id: TypeId, default: TypeId) -> TypeId {
        let id = self.specialise(id);
        if matches!(self.pool.get(id), TypeData::Param(_)) {
            return default;
        }
        id
    }

    fn occurs(&mut self, var: VarId, id: TypeId) -> bool {
        let resolved = self.resolve(id);
        match self.pool.get(resolved).clone() {
            TypeData::Param(v) => v == var,
            TypeData::List(elem) => self.occurs(var, elem),
            TypeData::Map(key, value) => self.occurs(var, key) || self.occurs(var, value),
            TypeData::WrapperOf(inner)
            | TypeData::NullableOf(inner)
            | TypeData::OptionalOf(inner)
            | TypeData::TypeOf(inner) => self.occurs(var, inner),
            TypeData::Opaque(_, params) => params.iter().any(|&p| self.occurs(var, p)),
            _ => false,
        }
    }

    fn bind(&mut self, var: VarId, target: TypeId) -> Result<TypeId, UnifyError> {
        if self.occurs(var, target) {
            return Err(UnifyError::Occurs { var, target });
        }
        self.pool.set_var_state(var, VarState::Link { target });
        Ok(target)
    }

    /// Unify `src` and `dst`, returning the (possibly more specific) type
    /// both now agree on.
    pub fn unify(&mut self, src: TypeId, dst: TypeId) -> Result<TypeId, UnifyError> {
        let src = self.resolve(src);
        let dst = self.resolve(dst);
        if src == dst {
            return Ok(src);
        }

        let src_data = self.pool.get(src).clone();
        let dst_data = self.pool.get(dst).clone();

        match (src_data, dst_data) {
            // error absorbs everything, including dyn.
            (TypeData::Error, _) | (_, TypeData::Error) => Ok(TypeId::ERROR),

            // dyn unifies with anything; the more specific side wins.
            (TypeData::Dyn, _) => Ok(dst),
            (_, TypeData::Dyn) => Ok(src),

            // type-parameters unify with anything (occurs-checked).
            (TypeData::Param(v), _) => self.bind(v, dst),
            (_, TypeData::Param(v)) => self.bind(v, src),

            // null <-> wrapper-of/nullable-of: the wrapper/nullable wins,
            // since it's still assignable to null afterwards.
            (TypeData::Null, TypeData::WrapperOf(_) | TypeData::NullableOf(_)) => Ok(dst),
            (TypeData::WrapperOf(_) | TypeData::NullableOf(_), TypeData::Null) => Ok(src),

            // wrapper-of(P)/nullable-of(T) <-> the same P/T: the
            // primitive wins (this is the "unwrapped primitive" result
            // §4.5.2 describes for wrapper arithmetic).
            (TypeData::WrapperOf(p), _) if p == dst => Ok(dst),
            (_, TypeData::WrapperOf(p)) if p == src => Ok(src),
            (TypeData::NullableOf(t), _) if t == dst => Ok(dst),
            (_, TypeData::NullableOf(t)) if t == src => Ok(src),

            (TypeData::List(a), TypeData::List(b)) => {
                let elem = self.unify(a, b)?;
                Ok(self.pool.list_of(elem))
            }
            (TypeData::Map(ak, av), TypeData::Map(bk, bv)) => {
                let key = self.unify(ak, bk)?;
                let value = self.unify(av, bv)?;
                Ok(self.pool.map_of(key, value))
            }
            (TypeData::OptionalOf(a), TypeData::OptionalOf(b)) => {
                let inner = self.unify(a, b)?;
                Ok(self.pool.optional_of(inner))
            }
            (TypeData::TypeOf(a), TypeData::TypeOf(b)) => {
                let inner = self.unify(a, b)?;
                Ok(self.pool.type_of(inner))
            }
            (TypeData::Opaque(na, pa), TypeData::Opaque(nb, pb))
                if na == nb && pa.len() == pb.len() =>
            {
                let mut params = Vec::with_capacity(pa.len());
                for (a, b) in pa.into_iter().zip(pb) {
                    params.push(self.unify(a, b)?);
                }
                Ok(self.pool.opaque(na, params))
            }

            _ => Err(UnifyError::Mismatch { src, dst }),
        }
    }

    fn is_json_compatible(&mut self, anchors: &JsonAnchors, id: TypeId) -> bool {
        let id = self.resolve(id);
        if anchors.anchors().contains(&id) {
            return true;
        }
        match self.pool.get(id).clone() {
            TypeData::Dyn | TypeData::Null | TypeData::Bool | TypeData::Double | TypeData::String => true,
            TypeData::Int | TypeData::Uint => true,
            TypeData::List(elem) => self.is_json_compatible(anchors, elem),
            TypeData::Map(key, value) => {
                matches!(self.pool.get(key), TypeData::String)
                    && self.is_json_compatible(anchors, value)
            }
            _ => false,
        }
    }

    /// The least-upper-bound of `types` (§4.5.1, and the element-type
    /// rules for `CreateList`/`CreateMap` and call-overload results).
    /// Empty input yields a fresh type-parameter (`CreateList`'s
    /// `list(type-parameter)` rule for `[]`).
    pub fn lub(&mut self, types: &[TypeId], anchors: &JsonAnchors) -> TypeId {
        let Some((&first, rest)) = types.split_first() else {
            return self.pool.fresh_var(None);
        };
        let mut acc = first;
        for &ty in rest {
            match self.unify(acc, ty) {
                Ok(next) => acc = next,
                Err(_) => {
                    if types.iter().all(|&t| self.is_json_compatible(anchors, t)) {
                        return anchors.json;
                    }
                    return TypeId::DYN;
                }
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dyn_unifies_with_anything_keeping_the_specific_side() {
        let mut pool = Pool::new();
        let mut u = Unifier::new(&mut pool);
        assert_eq!(u.unify(TypeId::DYN, TypeId::INT).unwrap(), TypeId::INT);
        assert_eq!(u.unify(TypeId::STRING, TypeId::DYN).unwrap(), TypeId::STRING);
    }

    #[test]
    fn error_absorbs_dyn() {
        let mut pool = Pool::new();
        let mut u = Unifier::new(&mut pool);
        assert_eq!(u.unify(TypeId::DYN, TypeId::ERROR).unwrap(), TypeId::ERROR);
    }

    #[test]
    fn null_unifies_with_wrapper_keeping_the_wrapper() {
        let mut pool = Pool::new();
        let wrapper = pool.wrapper_of(TypeId::INT);
        let mut u = Unifier::new(&mut pool);
        assert_eq!(u.unify(TypeId::NULL, wrapper).unwrap(), wrapper);
    }

    #[test]
    fn wrapper_unifies_with_its_primitive_unwrapping() {
        let mut pool = Pool::new();
        let wrapper = pool.wrapper_of(TypeId::INT);
        let mut u = Unifier::new(&mut pool);
        assert_eq!(u.unify(wrapper, TypeId::INT).unwrap(), TypeId::INT);
    }

    #[test]
    fn type_parameter_binds_and_resolves() {
        let mut pool = Pool::new();
        let var = pool.fresh_var(Some("A".to_string()));
        let mut u = Unifier::new(&mut pool);
        u.unify(var, TypeId::STRING).unwrap();
        assert_eq!(u.resolve(var), TypeId::STRING);
    }

    #[test]
    fn occurs_check_rejects_self_referential_binding() {
        let mut pool = Pool::new();
        let var = pool.fresh_var(None);
        let list_of_var = pool.list_of(var);
        let mut u = Unifier::new(&mut pool);
        assert!(matches!(u.unify(var, list_of_var), Err(UnifyError::Occurs { .. })));
    }

    #[test]
    fn list_element_types_unify_structurally() {
        let mut pool = Pool::new();
        let list_int = pool.list_of(TypeId::INT);
        let list_dyn = pool.list_of(TypeId::DYN);
        let mut u = Unifier::new(&mut pool);
        assert_eq!(u.unify(list_int, list_dyn).unwrap(), list_int);
    }

    #[test]
    fn mismatched_primitives_fail() {
        let mut pool = Pool::new();
        let mut u = Unifier::new(&mut pool);
        assert!(u.unify(TypeId::INT, TypeId::STRING).is_err());
    }

    #[test]
    fn lub_of_empty_list_is_a_fresh_parameter() {
        let mut pool = Pool::new();
        let anchors = JsonAnchors::standard(&mut pool);
        let mut u = Unifier::new(&mut pool);
        let ty = u.lub(&[], &anchors);
        assert!(matches!(u.pool().get(ty), TypeData::Param(_)));
    }

    #[test]
    fn lub_falls_back_to_json_when_all_members_are_json_compatible() {
        let mut pool = Pool::new();
        let anchors = JsonAnchors::standard(&mut pool);
        let mut u = Unifier::new(&mut pool);
        let ty = u.lub(&[TypeId::INT, TypeId::STRING, TypeId::BOOL], &anchors);
        assert_eq!(ty, anchors.json);
    }

    #[test]
    fn lub_falls_back_to_dyn_when_not_json_compatible() {
        let mut pool = Pool::new();
        let anchors = JsonAnchors::standard(&mut pool);
        let duration = TypeId::DURATION;
        let struct_ref = pool.struct_ref("pkg.Foo");
        let mut u = Unifier::new(&mut pool);
        let ty = u.lub(&[duration, struct_ref], &anchors);
        assert_eq!(ty, TypeId::DYN);
    }

    #[test]
    fn finalise_replaces_unbound_parameter_with_default() {
        let mut pool = Pool::new();
        let var = pool.fresh_var(None);
        let list_of_var = pool.list_of(var);
        let mut u = Unifier::new(&mut pool);
        let finalised = u.finalise(list_of_var, TypeId::DYN);
        assert_eq!(finalised, u.pool_mut().list_of(TypeId::DYN));
    }
}
