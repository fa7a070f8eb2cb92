use axion_ir::{Constant, DType, Graph, InletId, OpKey, RewriteResult, RewriteRule, SinkingMark};

use crate::test::helpers::*;
use crate::transpose_sinking::TransposeFuse;

#[test]
fn test_identity_pair_is_removed() {
    let mut g = Graph::new();
    let x = param(&mut g, "x", &[2, 3, 4, 5]);
    let inner = g.transpose_by(x, &[0, 2, 3, 1]).unwrap();
    let outer = g.transpose_by(inner, &[0, 3, 1, 2]).unwrap();
    let result = g.result(outer).unwrap();

    assert!(TransposeFuse.matches(&g, outer.node));
    assert_eq!(TransposeFuse.apply(&mut g, outer.node), RewriteResult::Rewritten { new_nodes: Default::default() });
    assert_eq!(g.source(InletId::new(result, 0)), Some(x));

    g.remove_dead_nodes();
    assert_eq!(g.count(OpKey::Transpose), 0);
}

#[test]
fn test_composed_order() {
    let mut g = Graph::new();
    let x = param(&mut g, "x", &[2, 3, 4]);
    let inner = g.transpose_by(x, &[1, 0, 2]).unwrap();
    let outer = g.transpose_by(inner, &[2, 0, 1]).unwrap();
    let result = g.result(outer).unwrap();
    let name = g.name_of(outer).unwrap().to_owned();
    let before = g.clone();

    let RewriteResult::Rewritten { new_nodes } = TransposeFuse.apply(&mut g, outer.node) else {
        panic!("expected a rewrite");
    };
    assert_eq!(new_nodes.len(), 1);
    let fused = new_nodes[0];
    assert_eq!(order_of(&g, fused).as_slice(), &[2, 1, 0]);
    assert_eq!(g.source(InletId::new(fused, 0)), Some(x));
    assert_eq!(g.source(InletId::new(result, 0)), Some(fused.into()));
    assert_eq!(g.node(fused).unwrap().name(), name);
    assert_eq!(sinking_mark(&g, fused), SinkingMark::Eligible);

    g.remove_dead_nodes();
    assert_eq!(g.count(OpKey::Transpose), 1);
    assert_same_results(&before, &g);
}

#[test]
fn test_blocked_mark_propagates() {
    for blocked_inner in [true, false] {
        let mut g = Graph::new();
        let x = param(&mut g, "x", &[2, 3, 4]);
        let inner = g.transpose_by(x, &[1, 0, 2]).unwrap();
        let outer = g.transpose_by(inner, &[0, 2, 1]).unwrap();
        g.result(outer).unwrap();
        let marked = if blocked_inner { inner } else { outer };
        g.set_sinking(marked.node, SinkingMark::Blocked).unwrap();

        let RewriteResult::Rewritten { new_nodes } = TransposeFuse.apply(&mut g, outer.node) else {
            panic!("expected a rewrite");
        };
        assert_eq!(sinking_mark(&g, new_nodes[0]), SinkingMark::Blocked);
    }
}

#[test]
fn test_fused_order_takes_outer_dtype() {
    let mut g = Graph::new();
    let y = param(&mut g, "y", &[3, 2, 4]);
    let inner = g.transpose_by(y, &[1, 0, 2]).unwrap();
    let order = g.constant(Constant::ints(DType::I32, [0, 2, 1])).unwrap();
    let outer = g.transpose(inner, order).unwrap();
    g.result(outer).unwrap();

    let RewriteResult::Rewritten { new_nodes } = TransposeFuse.apply(&mut g, outer.node) else {
        panic!("expected a rewrite");
    };
    let fused_order = g.source(InletId::new(new_nodes[0], 1)).unwrap();
    assert_eq!(g.outlet_type(fused_order).unwrap().dtype, DType::I32);
    assert_eq!(order_of(&g, new_nodes[0]).as_slice(), &[1, 2, 0]);
}

#[test]
fn test_single_transpose_does_not_match() {
    let mut g = Graph::new();
    let x = param(&mut g, "x", &[2, 3]);
    let t = g.transpose_by(x, &[1, 0]).unwrap();
    g.result(t).unwrap();
    let snap = g.summary();

    assert!(!TransposeFuse.matches(&g, t.node));
    assert_eq!(TransposeFuse.apply(&mut g, t.node), RewriteResult::NoMatch);
    assert_eq!(g.summary(), snap);
}

#[test]
fn test_shared_inner_transpose_stays_for_other_readers() {
    let mut g = Graph::new();
    let x = param(&mut g, "x", &[2, 3]);
    let inner = g.transpose_by(x, &[1, 0]).unwrap();
    let outer = g.transpose_by(inner, &[1, 0]).unwrap();
    let other = g.result(inner).unwrap();
    g.result(outer).unwrap();

    assert!(TransposeFuse.apply(&mut g, outer.node).is_rewritten());
    assert_eq!(g.source(InletId::new(other, 0)), Some(inner));
    g.remove_dead_nodes();
    assert_eq!(g.count(OpKey::Transpose), 1);
}
