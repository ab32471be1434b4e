//! Interned type storage.
//!
//! Hash-consing means two structurally equal types always share one
//! `TypeId`, so equality is a `u32` compare everywhere except through an
//! unresolved inference variable. Primitives are pre-interned at fixed
//! indices (see `TypeId`'s associated constants) so comparing against
//! `TypeId::INT` never needs pool access.
//!
//! Variables are the one case hash-consing can't cover: two `fresh_var`
//! calls must never collapse into the same `TypeId` even though their
//! `TypeData` starts out looking alike, so each is tagged with a unique
//! `VarId` and its binding lives in a side table (`var_states`) that
//! `Unifier` mutates directly.

use rustc_hash::FxHashMap;

use crate::ty::{TypeData, TypeId, VarId};

/// One inference variable's current state.
#[derive(Clone, Debug)]
pub enum VarState {
    /// Not yet bound to anything.
    Unbound { name: Option<String> },
    /// Bound to `target` (itself possibly another variable; resolution
    /// in `Unifier::resolve` follows the chain and compresses it).
    Link { target: TypeId },
}

/// The interning table for one compilation's types.
#[derive(Debug)]
pub struct Pool {
    data: Vec<TypeData>,
    index: FxHashMap<TypeData, TypeId>,
    var_states: Vec<VarState>,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    pub fn new() -> Self {
        let mut data = Vec::with_capacity(TypeId::PRIMITIVES.len());
        let mut index = FxHashMap::default();
        for ty in TypeId::PRIMITIVES {
            let id = TypeId(data.len() as u32);
            index.insert(ty.clone(), id);
            data.push(ty);
        }
        Pool {
            data,
            index,
            var_states: Vec::new(),
        }
    }

    pub fn get(&self, id: TypeId) -> &TypeData {
        &self.data[id.0 as usize]
    }

    /// Intern `ty`, returning the existing `TypeId` if an identical type
    /// was already interned.
    pub fn intern(&mut self, ty: TypeData) -> TypeId {
        if let Some(&id) = self.index.get(&ty) {
            return id;
        }
        let id = TypeId(self.data.len() as u32);
        self.index.insert(ty.clone(), id);
        self.data.push(ty);
        id
    }

    pub fn list_of(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeData::List(elem))
    }

    pub fn map_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(TypeData::Map(key, value))
    }

    pub fn struct_ref(&mut self, name: impl Into<String>) -> TypeId {
        self.intern(TypeData::StructRef(name.into()))
    }

    pub fn wrapper_of(&mut self, primitive: TypeId) -> TypeId {
        self.intern(TypeData::WrapperOf(primitive))
    }

    pub fn nullable_of(&mut self, inner: TypeId) -> TypeId {
        self.intern(TypeData::NullableOf(inner))
    }

    pub fn optional_of(&mut self, inner: TypeId) -> TypeId {
        self.intern(TypeData::OptionalOf(inner))
    }

    pub fn opaque(&mut self, name: impl Into<String>, params: Vec<TypeId>) -> TypeId {
        self.intern(TypeData::Opaque(name.into(), params))
    }

    pub fn type_of(&mut self, inner: TypeId) -> TypeId {
        self.intern(TypeData::TypeOf(inner))
    }

    /// Allocate a fresh, unbound type-parameter. Every call returns a
    /// distinct `TypeId` even if `name` repeats (freshening overload type
    /// parameters intentionally creates many same-named variables per
    /// call site).
    pub fn fresh_var(&mut self, name: Option<String>) -> TypeId {
        let var_id: VarId = self.var_states.len() as u32;
        self.var_states.push(VarState::Unbound { name });
        let id = TypeId(self.data.len() as u32);
        self.index.insert(TypeData::Param(var_id), id);
        self.data.push(TypeData::Param(var_id));
        id
    }

    pub fn var_state(&self, var_id: VarId) -> &VarState {
        &self.var_states[var_id as usize]
    }

    pub(crate) fn set_var_state(&mut self, var_id: VarId, state: VarState) {
        self.var_states[var_id as usize] = state;
    }

    /// Snapshot every variable's binding state. Overload resolution tries
    /// several candidates speculatively; taking a snapshot before each
    /// attempt and restoring it afterwards keeps a failed (or
    /// not-ultimately-chosen) attempt's bindings from leaking into the
    /// next one.
    pub(crate) fn snapshot_vars(&self) -> Vec<VarState> {
        self.var_states.clone()
    }

    pub(crate) fn restore_vars(&mut self, snapshot: Vec<VarState>) {
        self.var_states = snapshot;
    }

    /// Render `id` to CEL's textual type syntax, e.g. `list(map(string, int))`.
    pub fn display(&self, id: TypeId) -> String {
        match self.get(id) {
            TypeData::List(elem) => format!("list({})", self.display(*elem)),
            TypeData::Map(key, value) => {
                format!("map({}, {})", self.display(*key), self.display(*value))
            }
            TypeData::WrapperOf(inner) => format!("wrapper({})", self.display(*inner)),
            TypeData::NullableOf(inner) => format!("nullable({})", self.display(*inner)),
            TypeData::OptionalOf(inner) => format!("optional_type({})", self.display(*inner)),
            TypeData::TypeOf(inner) => format!("type({})", self.display(*inner)),
            TypeData::Opaque(name, params) if !params.is_empty() => {
                let rendered: Vec<_> = params.iter().map(|p| self.display(*p)).collect();
                format!("{name}({})", rendered.join(", "))
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_pre_interned_at_fixed_ids() {
        let pool = Pool::new();
        assert_eq!(pool.get(TypeId::INT), &TypeData::Int);
        assert_eq!(pool.get(TypeId::DYN), &TypeData::Dyn);
    }

    #[test]
    fn interning_deduplicates_structurally_equal_types() {
        let mut pool = Pool::new();
        let a = pool.list_of(TypeId::STRING);
        let b = pool.list_of(TypeId::STRING);
        assert_eq!(a, b);
        let c = pool.list_of(TypeId::INT);
        assert_ne!(a, c);
    }

    #[test]
    fn fresh_vars_never_collide_even_with_the_same_name() {
        let mut pool = Pool::new();
        let a = pool.fresh_var(Some("A".to_string()));
        let b = pool.fresh_var(Some("A".to_string()));
        assert_ne!(a, b);
    }

    #[test]
    fn display_renders_nested_containers() {
        let mut pool = Pool::new();
        let list_of_strings = pool.list_of(TypeId::STRING);
        let map_type = pool.map_of(TypeId::STRING, list_of_strings);
        assert_eq!(pool.display(map_type), "map(string, list(string))");
    }
}
