//! The type algebra (§3.3): primitives, containers, and the handful of
//! CEL-specific wrapper/nullable/opaque constructors, plus `TypeId`, the
//! interned handle every other module actually passes around.

use std::fmt;

/// A handle into a [`crate::Pool`]. Two `TypeId`s compare equal exactly
/// when the types they name are structurally identical (hash-consing),
/// except for `Param`, where identity tracks one inference variable, not
/// its current binding (use [`crate::Unifier::resolve`] for that).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub const DYN: TypeId = TypeId(0);
    pub const ERROR: TypeId = TypeId(1);
    pub const NULL: TypeId = TypeId(2);
    pub const BOOL: TypeId = TypeId(3);
    pub const INT: TypeId = TypeId(4);
    pub const UINT: TypeId = TypeId(5);
    pub const DOUBLE: TypeId = TypeId(6);
    pub const STRING: TypeId = TypeId(7);
    pub const BYTES: TypeId = TypeId(8);
    pub const TIMESTAMP: TypeId = TypeId(9);
    pub const DURATION: TypeId = TypeId(10);
    pub const ANY: TypeId = TypeId(11);

    /// The fixed-index primitives, in registration order. [`crate::Pool::new`]
    /// interns exactly these, in exactly this order, so the constants above
    /// stay valid.
    pub(crate) const PRIMITIVES: [TypeData; 12] = [
        TypeData::Dyn,
        TypeData::Error,
        TypeData::Null,
        TypeData::Bool,
        TypeData::Int,
        TypeData::Uint,
        TypeData::Double,
        TypeData::String,
        TypeData::Bytes,
        TypeData::Timestamp,
        TypeData::Duration,
        TypeData::Any,
    ];
}

/// Identifies one inference variable. Stable across [`TypeId`] interning
/// since a variable's binding lives in `Pool`'s side table, not in the
/// hash-consed `TypeData` itself.
pub type VarId = u32;

/// The structural content one `TypeId` resolves to.
///
/// Qualified names (struct references, opaque type names) are plain
/// `String`s rather than `cel_ir::Name` — declarations live in a
/// namespace of their own, independent of whichever `Source`'s interner
/// produced the identifiers that reference them.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeData {
    Dyn,
    Error,
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Timestamp,
    Duration,
    /// `google.protobuf.Any` / untyped JSON-ish "any" well-known type.
    Any,
    List(TypeId),
    Map(TypeId, TypeId),
    StructRef(String),
    WrapperOf(TypeId),
    NullableOf(TypeId),
    OptionalOf(TypeId),
    Opaque(String, Vec<TypeId>),
    TypeOf(TypeId),
    Param(VarId),
}

impl TypeData {
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeData::Null
                | TypeData::Bool
                | TypeData::Int
                | TypeData::Uint
                | TypeData::Double
                | TypeData::String
                | TypeData::Bytes
                | TypeData::Timestamp
                | TypeData::Duration
        )
    }
}

impl fmt::Display for TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeData::Dyn => write!(f, "dyn"),
            TypeData::Error => write!(f, "error"),
            TypeData::Null => write!(f, "null"),
            TypeData::Bool => write!(f, "bool"),
            TypeData::Int => write!(f, "int"),
            TypeData::Uint => write!(f, "uint"),
            TypeData::Double => write!(f, "double"),
            TypeData::String => write!(f, "string"),
            TypeData::Bytes => write!(f, "bytes"),
            TypeData::Timestamp => write!(f, "timestamp"),
            TypeData::Duration => write!(f, "duration"),
            TypeData::Any => write!(f, "any"),
            TypeData::List(_) => write!(f, "list"),
            TypeData::Map(_, _) => write!(f, "map"),
            TypeData::StructRef(name) => write!(f, "{name}"),
            TypeData::WrapperOf(_) => write!(f, "wrapper"),
            TypeData::NullableOf(_) => write!(f, "nullable"),
            TypeData::OptionalOf(_) => write!(f, "optional_type"),
            TypeData::Opaque(name, _) => write!(f, "{name}"),
            TypeData::TypeOf(_) => write!(f, "type"),
            TypeData::Param(id) => write!(f, "T{id}"),
        }
    }
}
