//! Property tests for `Unifier::unify` over the primitive ground types
//! (§4.5): unifying a type with itself is a no-op, and whether two types
//! unify at all never depends on argument order.

use cel_types::{Pool, TypeId, Unifier};
use proptest::prelude::*;

fn ground_type() -> impl Strategy<Value = TypeId> {
    prop_oneof![
        Just(TypeId::NULL),
        Just(TypeId::BOOL),
        Just(TypeId::INT),
        Just(TypeId::UINT),
        Just(TypeId::DOUBLE),
        Just(TypeId::STRING),
        Just(TypeId::BYTES),
        Just(TypeId::TIMESTAMP),
        Just(TypeId::DURATION),
        Just(TypeId::DYN),
    ]
}

proptest! {
    #[test]
    fn unifying_a_ground_type_with_itself_is_idempotent(ty in ground_type()) {
        let mut pool = Pool::new();
        let mut unifier = Unifier::new(&mut pool);
        let result = unifier.unify(ty, ty);
        prop_assert_eq!(result, Ok(ty));
    }

    #[test]
    fn unification_success_does_not_depend_on_argument_order(a in ground_type(), b in ground_type()) {
        let mut pool = Pool::new();
        let forward = Unifier::new(&mut pool).unify(a, b);
        let backward = Unifier::new(&mut pool).unify(b, a);
        prop_assert_eq!(forward.is_ok(), backward.is_ok());
    }

    #[test]
    fn list_of_ground_types_unifies_exactly_when_elements_do(a in ground_type(), b in ground_type()) {
        let mut pool = Pool::new();
        let list_a = pool.list_of(a);
        let list_b = pool.list_of(b);
        let elements_unify = {
            let mut probe_pool = Pool::new();
            Unifier::new(&mut probe_pool).unify(a, b).is_ok()
        };
        let lists_unify = Unifier::new(&mut pool).unify(list_a, list_b).is_ok();
        prop_assert_eq!(elements_unify, lists_unify);
    }
}
