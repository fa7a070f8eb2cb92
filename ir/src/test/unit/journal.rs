//! Unit tests for transactional rewrites.

use crate::error::Error;
use crate::graph::{Graph, InletId, NodeId, SinkingMark};
use crate::op::Op;
use crate::provenance::PassName;
use crate::shape::{PartialShape, TensorType};
use crate::types::{ConcatAttrs, DType};

fn concat_graph() -> (Graph, crate::OutletId, crate::OutletId, NodeId) {
    let mut g = Graph::new();
    let x = g.parameter("x", DType::F32, PartialShape::from_static(&[2, 3])).unwrap();
    let c = g.concat(&[x, x], 0).unwrap();
    let r = g.result(c).unwrap();
    (g, x, c, r)
}

#[test]
fn test_failed_transaction_restores_graph() {
    let (mut g, x, c, r) = concat_graph();
    let before = g.summary();
    let arena_len = g.len();

    let result: crate::Result<()> = g.transaction(|g| {
        let t = g.transpose_by(x, &[1, 0])?;
        g.set_input(InletId::new(r, 0), t)?;
        g.set_op(c.node, Op::Concat(ConcatAttrs::new(1)))?;
        g.set_name(c.node, "renamed")?;
        g.set_sinking(c.node, SinkingMark::Blocked)?;
        g.record_transform(c.node, x.node, PassName::RewritePattern)?;
        // Concat of [2,3] and [2,3] along axis 1 is fine; force a failure.
        g.concat(&[x, t], 0)?;
        Ok(())
    });

    assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    assert_eq!(g.summary(), before);
    assert_eq!(g.len(), arena_len, "added nodes are removed from the arena");
    assert_eq!(g.node(c.node).unwrap().ext().provenance.len(), 1);
}

#[test]
fn test_successful_transaction_keeps_changes() {
    let (mut g, x, _c, r) = concat_graph();

    let t = g
        .transaction(|g| {
            let t = g.transpose_by(x, &[1, 0])?;
            g.set_input(InletId::new(r, 0), t)?;
            Ok(t)
        })
        .unwrap();

    assert_eq!(g.source(InletId::new(r, 0)), Some(t));
    assert!(!g.in_transaction());
}

#[test]
fn test_type_reinference_is_undone() {
    let (mut g, _x, c, _r) = concat_graph();
    let before = g.outlet_type(c).unwrap().clone();

    let result: crate::Result<()> = g.transaction(|g| {
        g.set_op(c.node, Op::Concat(ConcatAttrs::new(1)))?;
        g.infer_types(c.node)?;
        assert_eq!(g.outlet_type(c)?.shape, PartialShape::from_static(&[2, 6]));
        Err(Error::RewriteLimit { sweeps: 0 })
    });

    assert!(result.is_err());
    assert_eq!(g.outlet_type(c).unwrap(), &before);
}

#[test]
fn test_nested_failure_only_rolls_back_inner() {
    let (mut g, x, c, _r) = concat_graph();

    g.transaction(|g| {
        g.set_name(c.node, "outer")?;
        let inner: crate::Result<()> = g.transaction(|g| {
            g.set_name(x.node, "inner")?;
            Err(Error::RewriteLimit { sweeps: 0 })
        });
        assert!(inner.is_err());
        Ok(())
    })
    .unwrap();

    assert_eq!(g.name_of(c).unwrap(), "outer");
    assert_eq!(g.name_of(x).unwrap(), "x");
}

#[test]
fn test_outer_failure_rolls_back_committed_inner() {
    let (mut g, x, _c, _r) = concat_graph();

    let result: crate::Result<()> = g.transaction(|g| {
        g.transaction(|g| g.set_name(x.node, "inner"))?;
        Err(Error::RewriteLimit { sweeps: 0 })
    });

    assert!(result.is_err());
    assert_eq!(g.name_of(x).unwrap(), "x");
}

#[test]
fn test_failed_add_node_leaves_no_trace() {
    let (mut g, x, _c, _r) = concat_graph();
    let before = g.summary();

    let bad = g.transpose_by(x, &[0, 0]);

    assert!(matches!(bad, Err(Error::InvalidPermutation { .. })));
    // The order constant was created before validation failed; it is dead.
    g.remove_dead_nodes();
    assert_eq!(g.summary(), before);
    assert_eq!(g.outlet_type(x).unwrap(), &TensorType::new(DType::F32, PartialShape::from_static(&[2, 3])));
}
