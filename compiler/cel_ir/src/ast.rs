//! The parsed/checked expression tree.
//!
//! Following the "flatten everything" approach: nodes don't hold
//! `Box<Expr>` children, they hold [`ExprId`]s that index into an
//! [`ExprArena`]. This keeps `ExprKind` small, keeps equality/hash cheap,
//! and makes "is every id unique" trivially true by construction (ids are
//! exactly the arena's indices).

use crate::{Constant, ExprId, Name, Span};
use rustc_hash::FxHashSet;

/// One field/value pair inside a `CreateMap` node.
#[derive(Debug, Clone)]
pub struct MapEntry {
    pub key: ExprId,
    pub value: ExprId,
    pub optional: bool,
}

/// One field/value pair inside a `CreateStruct` node.
#[derive(Debug, Clone)]
pub struct FieldInit {
    pub field: Name,
    pub value: ExprId,
    pub optional: bool,
}

/// The payload of one AST node. See `§3.2` of the design docs for the
/// full kind table.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Constant(Constant),

    /// A (possibly container-relative) identifier reference.
    Ident {
        name: Name,
        /// `true` if the identifier began with a leading dot (absolute,
        /// skips the container walk).
        absolute: bool,
    },

    /// `operand.field`, or a test-only select produced by `has(e.f)`.
    Select {
        operand: ExprId,
        field: Name,
        test_only: bool,
    },

    /// `target?.function(args)` / `function(args)` / `target.function(args)`.
    Call {
        target: Option<ExprId>,
        function: Name,
        args: Vec<ExprId>,
    },

    /// `[e0, e1, ...]`. `optional_indices` holds the positions written with
    /// `?e` optional-element syntax.
    CreateList {
        elements: Vec<ExprId>,
        optional_indices: FxHashSet<usize>,
    },

    /// `{k0: v0, k1: v1, ...}`.
    CreateMap { entries: Vec<MapEntry> },

    /// `TypeName{field: value, ...}`.
    CreateStruct {
        type_name: Name,
        fields: Vec<FieldInit>,
    },

    /// The canonical fold node that every macro desugars into.
    Comprehension {
        iter_var: Name,
        iter_range: ExprId,
        accu_var: Name,
        accu_init: ExprId,
        loop_cond: ExprId,
        loop_step: ExprId,
        result: ExprId,
    },
}

impl ExprKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExprKind::Constant(_) => "constant",
            ExprKind::Ident { .. } => "ident",
            ExprKind::Select { .. } => "select",
            ExprKind::Call { .. } => "call",
            ExprKind::CreateList { .. } => "create_list",
            ExprKind::CreateMap { .. } => "create_map",
            ExprKind::CreateStruct { .. } => "create_struct",
            ExprKind::Comprehension { .. } => "comprehension",
        }
    }
}

/// Owns every node of one parsed AST, keyed densely by [`ExprId`].
///
/// Ids are assigned in order starting at 1, so `ExprId(n)` always lives at
/// `nodes[n - 1]`; there are no gaps even though macro expansion discards
/// some intermediate ids from the surface tree (the discarded sub-tree's
/// nodes are still present in the arena, just unreachable from `root`,
/// which mirrors how the reference implementation keeps expansions
/// addressable via the macro-call map).
#[derive(Debug, Clone, Default)]
pub struct ExprArena {
    kinds: Vec<ExprKind>,
    spans: Vec<Span>,
    root: Option<ExprId>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node at the next id. Caller must insert ids in order
    /// starting from 1 (this is exactly what `ExprIdGenerator` produces).
    pub fn insert(&mut self, id: ExprId, kind: ExprKind, span: Span) {
        let idx = (id.get() - 1) as usize;
        assert_eq!(idx, self.kinds.len(), "ExprArena ids must be inserted in order");
        self.kinds.push(kind);
        self.spans.push(span);
    }

    pub fn set_root(&mut self, id: ExprId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<ExprId> {
        self.root
    }

    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.kinds[(id.get() - 1) as usize]
    }

    pub fn span(&self, id: ExprId) -> Span {
        self.spans[(id.get() - 1) as usize]
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ExprId> + '_ {
        (1..=self.kinds.len() as i64).map(ExprId::new)
    }
}

/// A borrowed view of one node: its id, kind, and span together.
#[derive(Debug, Clone, Copy)]
pub struct Expr<'a> {
    pub id: ExprId,
    pub kind: &'a ExprKind,
    pub span: Span,
}

impl ExprArena {
    pub fn expr(&self, id: ExprId) -> Expr<'_> {
        Expr {
            id,
            kind: self.kind(id),
            span: self.span(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExprIdGenerator;

    #[test]
    fn insert_and_read_back() {
        let mut gen = ExprIdGenerator::new();
        let mut arena = ExprArena::new();
        let id = gen.next_id();
        arena.insert(id, ExprKind::Constant(Constant::Int(1)), Span::new(0, 1));
        arena.set_root(id);
        assert_eq!(arena.root(), Some(id));
        assert!(matches!(arena.kind(id), ExprKind::Constant(Constant::Int(1))));
        assert_eq!(arena.span(id), Span::new(0, 1));
    }

    #[test]
    #[should_panic(expected = "in order")]
    fn out_of_order_insert_panics() {
        let mut arena = ExprArena::new();
        arena.insert(ExprId::new(2), ExprKind::Constant(Constant::Null), Span::DUMMY);
    }

    #[test]
    fn ids_iterates_densely() {
        let mut gen = ExprIdGenerator::new();
        let mut arena = ExprArena::new();
        for _ in 0..3 {
            let id = gen.next_id();
            arena.insert(id, ExprKind::Constant(Constant::Null), Span::DUMMY);
        }
        let collected: Vec<_> = arena.ids().map(ExprId::get).collect();
        assert_eq!(collected, vec![1, 2, 3]);
    }
}
