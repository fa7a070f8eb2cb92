//! Read-only pattern predicates used by the sinking rules.
//!
//! Consumers that are themselves dead (a transpose already bypassed by an
//! earlier rewrite in the same sweep) are ignored.

use axion_ir::{Graph, InletId, NodeId, Op, OutletId, SinkingMark};
use smallvec::SmallVec;

use super::permutation::{AxisOrder, axis_order_of};

/// True if at least one input of `node` is produced by a Transpose.
pub fn has_transpose_input(graph: &Graph, node: NodeId) -> bool {
    graph
        .try_node(node)
        .is_some_and(|n| n.inputs().iter().any(|&i| matches!(graph.producer_op(i), Some(Op::Transpose))))
}

pub fn static_rank(graph: &Graph, outlet: OutletId) -> Option<usize> {
    graph.try_outlet_type(outlet)?.rank()
}

pub fn has_static_rank(graph: &Graph, outlet: OutletId) -> bool {
    static_rank(graph, outlet).is_some()
}

/// Whether a transpose may still be moved by backward rules.
pub fn is_sinking_eligible(graph: &Graph, transpose: NodeId) -> bool {
    graph
        .try_node(transpose)
        .is_some_and(|n| matches!(n.op(), Op::Transpose) && n.ext().sinking == SinkingMark::Eligible)
}

/// Consumers of `outlet` whose node is still live.
pub(crate) fn live_consumers(graph: &Graph, outlet: OutletId) -> impl Iterator<Item = InletId> + '_ {
    graph.consumers(outlet).iter().copied().filter(|c| !graph.is_dead(c.node))
}

/// The transposes consuming every output of a node, all with one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformOutputTranspose {
    pub transposes: SmallVec<[NodeId; 4]>,
    /// Order input of the first transpose.
    pub order_const: OutletId,
    pub order: AxisOrder,
}

/// Every live consumer of every output of `node` is a Transpose (at its data
/// slot) with the same constant order. `None` if there are no consumers.
pub fn uniform_output_transpose(graph: &Graph, node: NodeId) -> Option<UniformOutputTranspose> {
    let n = graph.try_node(node)?;
    let mut uniform: Option<UniformOutputTranspose> = None;

    for slot in 0..n.num_outputs() {
        for consumer in live_consumers(graph, n.output(slot)) {
            let t = graph.try_node(consumer.node)?;
            if consumer.slot != 0 || !matches!(t.op(), Op::Transpose) {
                return None;
            }
            let order_const = t.input(1)?;
            let order = axis_order_of(graph, order_const)?;
            match uniform.as_mut() {
                Some(u) if u.order == order => u.transposes.push(consumer.node),
                Some(_) => return None,
                None => {
                    uniform = Some(UniformOutputTranspose {
                        transposes: smallvec::smallvec![consumer.node],
                        order_const,
                        order,
                    })
                }
            }
        }
    }

    uniform
}

pub fn has_uniform_output_transposes(graph: &Graph, node: NodeId) -> bool {
    uniform_output_transpose(graph, node).is_some()
}

/// Every consumer of `transpose` is something a forward rule can carry the
/// transpose through: a Concat with a rewritable axis, or an Interpolate or
/// Transpose reading it as data.
pub fn can_propagate_forward(graph: &Graph, transpose: NodeId) -> bool {
    let mut consumers = live_consumers(graph, transpose.into()).peekable();
    if consumers.peek().is_none() {
        return false;
    }

    consumers.all(|c| {
        let Some(op) = graph.op(c.node) else { return false };
        if let Some(bearing) = op.as_axis_bearing() {
            return bearing.rewritable_axis().is_some();
        }
        if let Some(bearing) = op.as_axes_tensor_bearing() {
            return bearing.data_slot() == c.slot;
        }
        matches!(op, Op::Transpose) && c.slot == 0
    })
}
