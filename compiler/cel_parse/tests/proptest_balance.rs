//! Property tests for `or`/`and` chain balancing (§4.3.1): the balanced
//! tree must stay shallow and must preserve the source-order leaves no
//! matter how long the chain is.

use cel_ir::{ExprArena, ExprId, ExprKind, Source, StringInterner};
use cel_parse::{parse, MacroRegistry, ParserOptions};
use proptest::prelude::*;

fn parse_chain(idents: &[String], op: &str) -> ExprArena {
    let src = idents.join(&format!(" {op} "));
    let source = Source::new(src, "<proptest>".to_string());
    let mut interner = StringInterner::new();
    let macros = MacroRegistry::new();
    let options = ParserOptions::default();
    let mut issues = cel_diagnostic::IssueCollector::new();
    let output = parse(&source, &mut interner, &macros, &options, &mut issues);
    assert!(!issues.has_errors(), "chain of {} terms failed to parse: {:?}", idents.len(), issues.into_vec());
    output.arena
}

fn depth(arena: &ExprArena, id: ExprId) -> usize {
    match arena.kind(id) {
        ExprKind::Call { args, .. } if !args.is_empty() => {
            1 + args.iter().map(|a| depth(arena, *a)).max().unwrap_or(0)
        }
        _ => 0,
    }
}

fn leaves_in_order(arena: &ExprArena, id: ExprId, interner: &StringInterner, out: &mut Vec<String>) {
    match arena.kind(id) {
        ExprKind::Call { function, args, .. } if interner.resolve(*function) == "_||_" || interner.resolve(*function) == "_&&_" => {
            for a in args {
                leaves_in_order(arena, *a, interner, out);
            }
        }
        ExprKind::Ident { name, .. } => out.push(interner.resolve(*name).to_string()),
        _ => {}
    }
}

fn ident_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z0-9]{0,3}", 2..40)
}

proptest! {
    #[test]
    fn balanced_tree_depth_is_logarithmic(idents in ident_list()) {
        let n = idents.len();
        let arena = parse_chain(&idents, "||");
        let root = match arena.root() {
            Some(id) => id,
            None => panic!("parser did not set a root"),
        };
        let d = depth(&arena, root);
        let expected = (n as f64).log2().ceil() as usize;
        prop_assert_eq!(d, expected.max(1));
    }

    #[test]
    fn balanced_tree_preserves_leaf_order(idents in ident_list()) {
        let source = Source::new(idents.join(" && "), "<proptest>".to_string());
        let mut interner = StringInterner::new();
        let macros = MacroRegistry::new();
        let options = ParserOptions::default();
        let mut issues = cel_diagnostic::IssueCollector::new();
        let output = parse(&source, &mut interner, &macros, &options, &mut issues);
        prop_assert!(!issues.has_errors());
        let root = match output.arena.root() {
            Some(id) => id,
            None => panic!("parser did not set a root"),
        };
        let mut out = Vec::new();
        leaves_in_order(&output.arena, root, &interner, &mut out);
        prop_assert_eq!(out, idents);
    }
}
