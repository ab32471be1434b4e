//! The frozen standard-declarations table (§4.6).
//!
//! `build_standard_env` populates an [`Env`] with CEL's built-in
//! operators, indexing, and conversions. Coverage is representative
//! rather than exhaustive — see `DESIGN.md` for what's included versus
//! left for a richer `TypeProvider`-driven extension layer.

use cel_diagnostic::{Diagnostic, ErrorCode, IssueCollector};
use cel_ir::Span;

use crate::env::{Env, FunctionDecl, OverloadDecl};
use crate::pool::Pool;
use crate::ty::TypeId;

/// How a standard-declarations builder narrows which functions (or
/// identifiers) it registers. At most one of `include`/`exclude`/
/// `filter` may be set; setting more than one is `E5001`.
#[derive(Clone, Debug, Default)]
pub struct DeclFilter {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub filter: Option<fn(&str) -> bool>,
}

impl DeclFilter {
    fn set_count(&self) -> usize {
        [self.include.is_some(), self.exclude.is_some(), self.filter.is_some()]
            .into_iter()
            .filter(|&set| set)
            .count()
    }

    fn allows(&self, name: &str) -> bool {
        if let Some(include) = &self.include {
            return include.iter().any(|n| n == name);
        }
        if let Some(exclude) = &self.exclude {
            return !exclude.iter().any(|n| n == name);
        }
        if let Some(filter) = &self.filter {
            return filter(name);
        }
        true
    }
}

#[derive(Clone, Debug, Default)]
pub struct StandardOptions {
    pub functions: DeclFilter,
    pub identifiers: DeclFilter,
    pub enable_heterogeneous_numeric_comparisons: bool,
    pub enable_unsigned_longs: bool,
    pub enable_timestamp_epoch: bool,
}

fn overload(id: &str, params: Vec<TypeId>, result: TypeId) -> OverloadDecl {
    OverloadDecl {
        id: id.to_string(),
        is_instance: false,
        type_params: Vec::new(),
        params,
        result,
    }
}

fn instance_overload(id: &str, params: Vec<TypeId>, result: TypeId) -> OverloadDecl {
    OverloadDecl {
        is_instance: true,
        ..overload(id, params, result)
    }
}

fn generic_overload(id: &str, type_param: &str, params: Vec<TypeId>, result: TypeId) -> OverloadDecl {
    OverloadDecl {
        type_params: vec![type_param.to_string()],
        ..overload(id, params, result)
    }
}

/// Build the standard environment described in §4.6 into a fresh `Env`,
/// honouring `options`'s filters and feature flags. Emits `E5001` (via
/// `issues`) and returns an unlocked, otherwise-empty `Env` if more than
/// one of `include`/`exclude`/`filter` is set on either selector.
pub fn build_standard_env(pool: &mut Pool, options: &StandardOptions, issues: &mut IssueCollector) -> Env {
    if options.functions.set_count() > 1 || options.identifiers.set_count() > 1 {
        issues.push(Diagnostic::error(
            ErrorCode::E5001,
            "only one of include/exclude/filter may be set",
            Span::DUMMY,
        ));
        return Env::new();
    }

    let mut env = Env::new();
    let mut add = |env: &mut Env, decl: FunctionDecl| {
        if options.functions.allows(&decl.name) {
            env.declare_standard_function(decl);
        }
    };

    add(&mut env, arithmetic("_+_", "add", pool));
    add(&mut env, arithmetic("_-_", "subtract", pool));
    add(&mut env, arithmetic("_*_", "multiply", pool));
    add(&mut env, arithmetic("_/_", "divide", pool));
    add(&mut env, modulo());
    add(&mut env, negate());

    for (name, id) in [
        ("_<_", "less"),
        ("_<=_", "less_equals"),
        ("_>_", "greater"),
        ("_>=_", "greater_equals"),
    ] {
        add(&mut env, comparison(name, id, options.enable_heterogeneous_numeric_comparisons));
    }
    add(&mut env, equality("_==_", pool));
    add(&mut env, equality("_!=_", pool));

    add(&mut env, logical_not());
    add(&mut env, logical("_&&_"));
    add(&mut env, logical("_||_"));
    add(&mut env, conditional(pool));
    add(&mut env, not_strictly_false());

    add(&mut env, indexing(pool));
    add(&mut env, optional_indexing(pool));
    add(&mut env, membership(pool));

    add(&mut env, size_overloads(pool));

    add(&mut env, type_of_fn(pool));
    add(&mut env, dyn_fn(pool));

    for decl in conversions(options.enable_unsigned_longs) {
        add(&mut env, decl);
    }
    add(&mut env, timestamp_ctor(options.enable_timestamp_epoch));
    add(&mut env, duration_ctor());
    for decl in date_time_accessors() {
        add(&mut env, decl);
    }

    env.lock_standard();
    env
}

fn arithmetic(name: &'static str, id: &'static str, pool: &mut Pool) -> FunctionDecl {
    let string_ty = TypeId::STRING;
    let bytes_ty = TypeId::BYTES;
    let mut overloads = vec![
        overload(&format!("{id}_int64"), vec![TypeId::INT, TypeId::INT], TypeId::INT),
        overload(&format!("{id}_uint64"), vec![TypeId::UINT, TypeId::UINT], TypeId::UINT),
        overload(&format!("{id}_double"), vec![TypeId::DOUBLE, TypeId::DOUBLE], TypeId::DOUBLE),
    ];
    if name == "_+_" {
        overloads.push(overload("add_string", vec![string_ty, string_ty], string_ty));
        overloads.push(overload("add_bytes", vec![bytes_ty, bytes_ty], bytes_ty));
        let list_elem = pool.fresh_var(Some("T".to_string()));
        let list_ty = pool.list_of(list_elem);
        overloads.push(generic_overload("add_list", "T", vec![list_ty, list_ty], list_ty));
    }
    FunctionDecl {
        name: name.to_string(),
        overloads,
    }
}

fn modulo() -> FunctionDecl {
    FunctionDecl {
        name: "_%_".to_string(),
        overloads: vec![
            overload("modulo_int64", vec![TypeId::INT, TypeId::INT], TypeId::INT),
            overload("modulo_uint64", vec![TypeId::UINT, TypeId::UINT], TypeId::UINT),
        ],
    }
}

fn negate() -> FunctionDecl {
    FunctionDecl {
        name: "-_".to_string(),
        overloads: vec![
            overload("negate_int64", vec![TypeId::INT], TypeId::INT),
            overload("negate_double", vec![TypeId::DOUBLE], TypeId::DOUBLE),
        ],
    }
}

fn comparison(name: &'static str, id: &'static str, heterogeneous: bool) -> FunctionDecl {
    let mut overloads = vec![
        overload(&format!("{id}_int64"), vec![TypeId::INT, TypeId::INT], TypeId::BOOL),
        overload(&format!("{id}_uint64"), vec![TypeId::UINT, TypeId::UINT], TypeId::BOOL),
        overload(&format!("{id}_double"), vec![TypeId::DOUBLE, TypeId::DOUBLE], TypeId::BOOL),
        overload(&format!("{id}_string"), vec![TypeId::STRING, TypeId::STRING], TypeId::BOOL),
        overload(&format!("{id}_bytes"), vec![TypeId::BYTES, TypeId::BYTES], TypeId::BOOL),
        overload(&format!("{id}_timestamp"), vec![TypeId::TIMESTAMP, TypeId::TIMESTAMP], TypeId::BOOL),
        overload(&format!("{id}_duration"), vec![TypeId::DURATION, TypeId::DURATION], TypeId::BOOL),
    ];
    if heterogeneous {
        overloads.push(overload(&format!("{id}_int64_double"), vec![TypeId::INT, TypeId::DOUBLE], TypeId::BOOL));
        overloads.push(overload(&format!("{id}_double_int64"), vec![TypeId::DOUBLE, TypeId::INT], TypeId::BOOL));
        overloads.push(overload(&format!("{id}_uint64_int64"), vec![TypeId::UINT, TypeId::INT], TypeId::BOOL));
        overloads.push(overload(&format!("{id}_int64_uint64"), vec![TypeId::INT, TypeId::UINT], TypeId::BOOL));
    }
    FunctionDecl {
        name: name.to_string(),
        overloads,
    }
}

fn equality(name: &'static str, pool: &mut Pool) -> FunctionDecl {
    let t = pool.fresh_var(Some("T".to_string()));
    FunctionDecl {
        name: name.to_string(),
        overloads: vec![generic_overload("equals", "T", vec![t, t], TypeId::BOOL)],
    }
}

fn logical_not() -> FunctionDecl {
    FunctionDecl {
        name: "!_".to_string(),
        overloads: vec![overload("logical_not", vec![TypeId::BOOL], TypeId::BOOL)],
    }
}

fn logical(name: &'static str) -> FunctionDecl {
    FunctionDecl {
        name: name.to_string(),
        overloads: vec![overload("logical_op", vec![TypeId::BOOL, TypeId::BOOL], TypeId::BOOL)],
    }
}

fn conditional(pool: &mut Pool) -> FunctionDecl {
    let a = pool.fresh_var(Some("A".to_string()));
    FunctionDecl {
        name: "_?_:_".to_string(),
        overloads: vec![generic_overload("conditional", "A", vec![TypeId::BOOL, a, a], a)],
    }
}

fn not_strictly_false() -> FunctionDecl {
    FunctionDecl {
        name: "@not_strictly_false".to_string(),
        overloads: vec![
            overload("not_strictly_false", vec![TypeId::BOOL], TypeId::BOOL),
            overload("not_strictly_false_dyn", vec![TypeId::DYN], TypeId::BOOL),
        ],
    }
}

fn indexing(pool: &mut Pool) -> FunctionDecl {
    let elem = pool.fresh_var(Some("A".to_string()));
    let list_ty = pool.list_of(elem);
    let key = pool.fresh_var(Some("K".to_string()));
    let value = pool.fresh_var(Some("V".to_string()));
    let map_ty = pool.map_of(key, value);
    FunctionDecl {
        name: "_[_]".to_string(),
        overloads: vec![
            generic_overload("index_list", "A", vec![list_ty, TypeId::INT], elem),
            OverloadDecl {
                type_params: vec!["K".to_string(), "V".to_string()],
                ..overload("index_map", vec![map_ty, key], value)
            },
        ],
    }
}

fn optional_indexing(pool: &mut Pool) -> FunctionDecl {
    let elem = pool.fresh_var(Some("A".to_string()));
    let list_ty = pool.list_of(elem);
    let optional_elem = pool.optional_of(elem);
    let key = pool.fresh_var(Some("K".to_string()));
    let value = pool.fresh_var(Some("V".to_string()));
    let map_ty = pool.map_of(key, value);
    let optional_value = pool.optional_of(value);
    FunctionDecl {
        name: "_[?_]".to_string(),
        overloads: vec![
            generic_overload("optional_index_list", "A", vec![list_ty, TypeId::INT], optional_elem),
            OverloadDecl {
                type_params: vec!["K".to_string(), "V".to_string()],
                ..overload("optional_index_map", vec![map_ty, key], optional_value)
            },
        ],
    }
}

fn membership(pool: &mut Pool) -> FunctionDecl {
    let elem = pool.fresh_var(Some("A".to_string()));
    let list_ty = pool.list_of(elem);
    let key = pool.fresh_var(Some("K".to_string()));
    let value = pool.fresh_var(Some("V".to_string()));
    let map_ty = pool.map_of(key, value);
    FunctionDecl {
        name: "@in".to_string(),
        overloads: vec![
            generic_overload("in_list", "A", vec![elem, list_ty], TypeId::BOOL),
            OverloadDecl {
                type_params: vec!["K".to_string(), "V".to_string()],
                ..overload("in_map", vec![key, map_ty], TypeId::BOOL)
            },
        ],
    }
}

fn size_overloads(pool: &mut Pool) -> FunctionDecl {
    let elem = pool.fresh_var(Some("A".to_string()));
    let list_ty = pool.list_of(elem);
    let key = pool.fresh_var(Some("K".to_string()));
    let value = pool.fresh_var(Some("V".to_string()));
    let map_ty = pool.map_of(key, value);
    FunctionDecl {
        name: "size".to_string(),
        overloads: vec![
            overload("size_string", vec![TypeId::STRING], TypeId::INT),
            instance_overload("string_size", vec![TypeId::STRING], TypeId::INT),
            overload("size_bytes", vec![TypeId::BYTES], TypeId::INT),
            instance_overload("bytes_size", vec![TypeId::BYTES], TypeId::INT),
            generic_overload("size_list", "A", vec![list_ty], TypeId::INT),
            OverloadDecl {
                type_params: vec!["K".to_string(), "V".to_string()],
                is_instance: true,
                ..overload("map_size", vec![map_ty], TypeId::INT)
            },
        ],
    }
}

fn type_of_fn(pool: &mut Pool) -> FunctionDecl {
    let a = pool.fresh_var(Some("A".to_string()));
    let type_of_a = pool.type_of(a);
    FunctionDecl {
        name: "type".to_string(),
        overloads: vec![generic_overload("type", "A", vec![a], type_of_a)],
    }
}

fn dyn_fn(pool: &mut Pool) -> FunctionDecl {
    let a = pool.fresh_var(Some("A".to_string()));
    FunctionDecl {
        name: "dyn".to_string(),
        overloads: vec![generic_overload("dyn", "A", vec![a], TypeId::DYN)],
    }
}

/// The numeric/string conversion functions (`int`, `uint`, `double`,
/// `string`, `bytes`). Coverage is a representative subset of cel-go's
/// conversion matrix, not every source-type permutation.
fn conversions(enable_unsigned_longs: bool) -> Vec<FunctionDecl> {
    let uint_ty = if enable_unsigned_longs { TypeId::UINT } else { TypeId::INT };
    vec![
        FunctionDecl {
            name: "int".to_string(),
            overloads: vec![
                overload("int64_to_int64", vec![TypeId::INT], TypeId::INT),
                overload("uint64_to_int64", vec![uint_ty], TypeId::INT),
                overload("double_to_int64", vec![TypeId::DOUBLE], TypeId::INT),
                overload("string_to_int64", vec![TypeId::STRING], TypeId::INT),
                overload("timestamp_to_int64", vec![TypeId::TIMESTAMP], TypeId::INT),
            ],
        },
        FunctionDecl {
            name: "uint".to_string(),
            overloads: vec![
                overload("int64_to_uint64", vec![TypeId::INT], uint_ty),
                overload("double_to_uint64", vec![TypeId::DOUBLE], uint_ty),
                overload("string_to_uint64", vec![TypeId::STRING], uint_ty),
            ],
        },
        FunctionDecl {
            name: "double".to_string(),
            overloads: vec![
                overload("int64_to_double", vec![TypeId::INT], TypeId::DOUBLE),
                overload("uint64_to_double", vec![uint_ty], TypeId::DOUBLE),
                overload("string_to_double", vec![TypeId::STRING], TypeId::DOUBLE),
            ],
        },
        FunctionDecl {
            name: "string".to_string(),
            overloads: vec![
                overload("int64_to_string", vec![TypeId::INT], TypeId::STRING),
                overload("uint64_to_string", vec![uint_ty], TypeId::STRING),
                overload("double_to_string", vec![TypeId::DOUBLE], TypeId::STRING),
                overload("bytes_to_string", vec![TypeId::BYTES], TypeId::STRING),
                overload("bool_to_string", vec![TypeId::BOOL], TypeId::STRING),
                overload("timestamp_to_string", vec![TypeId::TIMESTAMP], TypeId::STRING),
                overload("duration_to_string", vec![TypeId::DURATION], TypeId::STRING),
            ],
        },
        FunctionDecl {
            name: "bytes".to_string(),
            overloads: vec![overload("string_to_bytes", vec![TypeId::STRING], TypeId::BYTES)],
        },
    ]
}

fn timestamp_ctor(enable_timestamp_epoch: bool) -> FunctionDecl {
    let mut overloads = vec![overload("timestamp_string", vec![TypeId::STRING], TypeId::TIMESTAMP)];
    if enable_timestamp_epoch {
        overloads.push(overload("timestamp_int64", vec![TypeId::INT], TypeId::TIMESTAMP));
    }
    FunctionDecl {
        name: "timestamp".to_string(),
        overloads,
    }
}

fn duration_ctor() -> FunctionDecl {
    FunctionDecl {
        name: "duration".to_string(),
        overloads: vec![overload("duration_string", vec![TypeId::STRING], TypeId::DURATION)],
    }
}

/// A representative subset of the date/time member calls common to both
/// `timestamp` and `duration` values.
fn date_time_accessors() -> Vec<FunctionDecl> {
    vec![
        FunctionDecl {
            name: "getFullYear".to_string(),
            overloads: vec![instance_overload("timestamp_get_full_year", vec![TypeId::TIMESTAMP], TypeId::INT)],
        },
        FunctionDecl {
            name: "getMonth".to_string(),
            overloads: vec![instance_overload("timestamp_get_month", vec![TypeId::TIMESTAMP], TypeId::INT)],
        },
        FunctionDecl {
            name: "getDayOfMonth".to_string(),
            overloads: vec![instance_overload("timestamp_get_day_of_month", vec![TypeId::TIMESTAMP], TypeId::INT)],
        },
        FunctionDecl {
            name: "getDayOfWeek".to_string(),
            overloads: vec![instance_overload("timestamp_get_day_of_week", vec![TypeId::TIMESTAMP], TypeId::INT)],
        },
        FunctionDecl {
            name: "getHours".to_string(),
            overloads: vec![
                instance_overload("timestamp_get_hours", vec![TypeId::TIMESTAMP], TypeId::INT),
                instance_overload("duration_get_hours", vec![TypeId::DURATION], TypeId::INT),
            ],
        },
        FunctionDecl {
            name: "getMinutes".to_string(),
            overloads: vec![
                instance_overload("timestamp_get_minutes", vec![TypeId::TIMESTAMP], TypeId::INT),
                instance_overload("duration_get_minutes", vec![TypeId::DURATION], TypeId::INT),
            ],
        },
        FunctionDecl {
            name: "getSeconds".to_string(),
            overloads: vec![
                instance_overload("timestamp_get_seconds", vec![TypeId::TIMESTAMP], TypeId::INT),
                instance_overload("duration_get_seconds", vec![TypeId::DURATION], TypeId::INT),
            ],
        },
        FunctionDecl {
            name: "getMilliseconds".to_string(),
            overloads: vec![
                instance_overload("timestamp_get_milliseconds", vec![TypeId::TIMESTAMP], TypeId::INT),
                instance_overload("duration_get_milliseconds", vec![TypeId::DURATION], TypeId::INT),
            ],
        },
    ]
}
