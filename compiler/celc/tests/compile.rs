//! End-to-end scenarios driving `Builder` through parsing and checking
//! together, covering the concrete compile scenarios a CEL front end
//! must get right.

use celc::Builder;
use cel_ir::Source;
use cel_types::{FieldType, Pool, Reference, TypeId, TypeProvider};

fn source(text: &str) -> Source {
    Source::new(text.to_string(), "<test>".to_string())
}

#[test]
fn operator_chain_checks_to_bool_with_equals_overload() {
    let builder = Builder::new();
    let (compiled, _) = match builder.build(&source("1 + 2 * 3 - 1 / 2 == 6 % 1")) {
        Ok(ok) => ok,
        Err(diags) => panic!("expected success, got {diags:?}"),
    };
    let root = match compiled.arena.root() {
        Some(id) => id,
        None => panic!("builder did not set a root"),
    };
    assert_eq!(compiled.checked.types[&root], TypeId::BOOL);
    match &compiled.checked.references[&root] {
        Reference::Overloads(ids) => assert!(ids.iter().any(|id| id == "equals")),
        other => panic!("expected an overload reference, got {other:?}"),
    }
}

#[test]
fn list_literal_with_mixed_numeric_elements_is_list_of_dyn() {
    let builder = Builder::new();
    let (compiled, warnings) = match builder.build(&source("[1, 2u]")) {
        Ok(ok) => ok,
        Err(diags) => panic!("expected success, got {diags:?}"),
    };
    assert!(warnings.is_empty());
    let root = match compiled.arena.root() {
        Some(id) => id,
        None => panic!("builder did not set a root"),
    };
    let ty = compiled.checked.types[&root];
    assert_eq!(compiled.pool.display(ty), "list(dyn)");
}

#[test]
fn map_literal_checked_against_a_mismatched_expected_type_fails() {
    let builder = Builder::new();
    let result = builder.build_with(&source("{1:2u, 2:3u}"), |pool, _, _| {
        let expected = pool.map_of(TypeId::INT, TypeId::BOOL);
        Some(expected)
    });
    let diags = match result {
        Err(diags) => diags,
        Ok(_) => panic!("expected a type mismatch against map(int, bool)"),
    };
    assert!(diags.iter().any(|d| d.message.contains("expected type does not match")));
}

#[test]
fn nested_lists_and_maps_check_to_list_of_dyn() {
    let builder = Builder::new();
    let (compiled, warnings) = match builder.build(&source(
        "[[[1]], [[2]], [[3]]][0][0] + [2, 3, {'four': {'five': 'six'}}]",
    )) {
        Ok(ok) => ok,
        Err(diags) => panic!("expected success, got {diags:?}"),
    };
    assert!(warnings.is_empty());
    let root = match compiled.arena.root() {
        Some(id) => id,
        None => panic!("builder did not set a root"),
    };
    let ty = compiled.checked.types[&root];
    assert_eq!(compiled.pool.display(ty), "list(dyn)");
}

#[test]
fn optional_select_checks_to_optional_string_when_enabled() {
    let builder = Builder::new();
    let result = builder.build_with(&source("a.?b"), |pool, env, _| {
        let map_ty = pool.map_of(TypeId::STRING, TypeId::STRING);
        env.declare_var("a", map_ty);
        None
    });
    let (compiled, warnings) = match result {
        Ok(ok) => ok,
        Err(diags) => panic!("expected success, got {diags:?}"),
    };
    assert!(warnings.is_empty());
    let root = match compiled.arena.root() {
        Some(id) => id,
        None => panic!("builder did not set a root"),
    };
    let ty = compiled.checked.types[&root];
    assert_eq!(compiled.pool.display(ty), "optional_type(string)");
    match &compiled.checked.references[&root] {
        Reference::Overloads(ids) => assert!(ids.iter().any(|id| id.contains("optional"))),
        other => panic!("expected an overload reference, got {other:?}"),
    }
}

#[test]
fn optional_select_is_a_parse_error_when_the_syntax_is_disabled() {
    use celc::EnvOptions;
    let mut options = EnvOptions::default();
    options.parser.enable_optional_syntax = false;
    let builder = Builder::new().with_options(options);
    let result = builder.build(&source("a.?b"));
    assert!(result.is_err());
}

#[test]
fn fold_macros_report_three_macro_call_entries() {
    let builder = Builder::new();
    let result = builder.build_with(
        &source("x.all(e, e > 0) && x.exists(e, e < 0) && x.exists_one(e, e == 0)"),
        |pool, env, _| {
            let list_ty = pool.list_of(TypeId::INT);
            env.declare_var("x", list_ty);
            None
        },
    );
    let (compiled, warnings) = match result {
        Ok(ok) => ok,
        Err(diags) => panic!("expected success, got {diags:?}"),
    };
    assert!(warnings.is_empty());
    let root = match compiled.arena.root() {
        Some(id) => id,
        None => panic!("builder did not set a root"),
    };
    assert_eq!(compiled.checked.types[&root], TypeId::BOOL);
    assert_eq!(compiled.macro_calls.len(), 3);
}

#[test]
fn heterogeneous_comparison_is_gated_by_the_feature_flag() {
    let disabled = Builder::new().build(&source("1 > 2u"));
    let diags = match disabled {
        Err(diags) => diags,
        Ok(_) => panic!("expected no matching overload without the flag"),
    };
    assert!(diags.iter().any(|d| d.message.contains("no matching overload")));

    let mut options = EnvOptions::default();
    options.standard.enable_heterogeneous_numeric_comparisons = true;
    let enabled = Builder::new().with_options(options).build(&source("1 > 2u"));
    let (compiled, _) = match enabled {
        Ok(ok) => ok,
        Err(diags) => panic!("expected success with the flag on, got {diags:?}"),
    };
    let root = match compiled.arena.root() {
        Some(id) => id,
        None => panic!("builder did not set a root"),
    };
    assert_eq!(compiled.checked.types[&root], TypeId::BOOL);
}

#[test]
fn source_past_the_code_point_limit_is_a_fatal_issue() {
    let mut options = EnvOptions::default();
    options.parser.max_expression_code_point_size = 4;
    let builder = Builder::new().with_options(options);
    let diags = match builder.build(&source("1 + 2 + 3 + 4 + 5")) {
        Err(diags) => diags,
        Ok(_) => panic!("expected the size limit to trip"),
    };
    assert!(diags.iter().any(|d| d.message.contains("code point")));
}

#[test]
fn has_with_zero_or_non_select_arguments_is_a_fatal_issue() {
    let zero_args = Builder::new().build(&source("has()"));
    assert!(zero_args.is_err());

    let non_select = Builder::new().build(&source("has(1)"));
    let diags = match non_select {
        Err(diags) => diags,
        Ok(_) => panic!("expected `has(1)` to fail"),
    };
    assert!(diags.iter().any(|d| d.message.contains("invalid argument to has() macro")));
}

#[test]
fn has_macro_rewrites_into_a_recorded_test_only_select() {
    let builder = Builder::new().with_provider(TestAllTypesProvider);
    let declare = |pool: &mut Pool, env: &mut cel_types::Env, issues: &mut cel_diagnostic::IssueCollector| {
        let nested = "cel.expr.conformance.proto3.TestAllTypes";
        let var_ty = pool.struct_ref(nested);
        env.declare_var_checked("x", var_ty, issues);
        None
    };
    let (compiled, warnings) = match builder
        .build_with(&source("x.single_nested_message.bb == 43 && has(x.single_nested_message)"), declare)
    {
        Ok(ok) => ok,
        Err(diags) => panic!("expected success, got {diags:?}"),
    };
    assert!(warnings.is_empty());
    let root = match compiled.arena.root() {
        Some(id) => id,
        None => panic!("builder did not set a root"),
    };
    assert_eq!(compiled.checked.types[&root], TypeId::BOOL);
    assert_eq!(compiled.macro_calls.len(), 1);
    let recorded = match compiled.macro_calls.values().next() {
        Some(call) => call,
        None => panic!("expected one macro call recorded"),
    };
    assert_eq!(compiled.interner.resolve(recorded.function), "has");
}

/// A minimal struct descriptor source for the two-message chain spec.md's
/// `has()` scenario references: `TestAllTypes.single_nested_message` is
/// itself a `TestAllTypes.NestedMessage` with an int field `bb`.
#[derive(Clone, Copy)]
struct TestAllTypesProvider;

impl TypeProvider for TestAllTypesProvider {
    fn has_type(&self, name: &str) -> bool {
        matches!(
            name,
            "cel.expr.conformance.proto3.TestAllTypes" | "cel.expr.conformance.proto3.TestAllTypes.NestedMessage"
        )
    }

    fn lookup_field_type(&self, pool: &mut Pool, struct_name: &str, field: &str) -> Option<FieldType> {
        match (struct_name, field) {
            ("cel.expr.conformance.proto3.TestAllTypes", "single_nested_message") => Some(FieldType {
                ty: pool.struct_ref("cel.expr.conformance.proto3.TestAllTypes.NestedMessage"),
                wrapper: false,
            }),
            ("cel.expr.conformance.proto3.TestAllTypes.NestedMessage", "bb") => {
                Some(FieldType { ty: TypeId::INT, wrapper: false })
            }
            _ => None,
        }
    }

    fn lookup_enum_value(&self, _name: &str) -> Option<i64> {
        None
    }
}
