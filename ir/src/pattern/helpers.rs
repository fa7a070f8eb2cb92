//! Helper functions for rule matching.

use crate::graph::{Graph, NodeId, OutletId};
use crate::infer::validate_permutation;
use crate::op::Op;

/// Integer payload of `outlet` if it folds to a constant.
pub fn const_ints(graph: &Graph, outlet: OutletId) -> Option<Vec<i64>> {
    graph.fold_constant(outlet)?.data.as_ints().map(<[i64]>::to_vec)
}

/// Permutation of a transpose node whose order input folds to a valid one.
pub fn transpose_order(graph: &Graph, node: NodeId) -> Option<Vec<usize>> {
    let n = graph.try_node(node)?;
    if !matches!(n.op(), Op::Transpose) {
        return None;
    }
    let order = const_ints(graph, n.input(1)?)?;
    validate_permutation(&order, order.len()).ok()
}
