//! Concat sinking rules.
//!
//! Concat's axis dependence is a single attribute, so moving a transpose past
//! it only relocates that attribute. Both rules set the resolved-axis sentinel
//! on the rewritten Concat; a Concat carrying it is never rewritten again.

use axion_ir::error::Result;
use axion_ir::provenance::PassName;
use axion_ir::{Graph, NodeId, OpKey, RewriteResult, RewriteRule};

use super::bookkeeping::{
    NewNodes, TransposeInputsInfo, insert_input_transposes, insert_output_transposes,
    normalize_inputs_to_reference_frame, remove_redundant_output_consumers, select_reference_transpose,
    swap_display_names,
};
use super::permutation::{apply, invert};
use super::predicates::{UniformOutputTranspose, is_sinking_eligible, static_rank, uniform_output_transpose};
use super::{commit, record_new_nodes};

/// Resolved axis of a Concat, `None` for other ops or while the sentinel is set.
fn rewritable_axis(graph: &Graph, node: NodeId) -> Option<usize> {
    graph.op(node)?.as_axis_bearing()?.rewritable_axis()
}

/// Every input of `node` has static rank `rank`.
fn inputs_have_rank(graph: &Graph, node: NodeId, rank: usize) -> bool {
    graph.try_node(node).is_some_and(|n| n.inputs().iter().all(|&i| static_rank(graph, i) == Some(rank)))
}

/// Store `axis` on the node's axis-bearing op and mark it resolved.
fn relocate_axis(graph: &mut Graph, node: NodeId, axis: usize) -> Result<()> {
    let mut op = graph.node(node)?.op().clone();
    if let Some(bearing) = op.as_axis_bearing_mut() {
        bearing.relocate_axis(axis);
    }
    graph.set_op(node, op)
}

/// `Concat(Transpose(x, P), y, ...)` becomes `Transpose(Concat(x, Transpose(y, P⁻¹), ...), P)`
/// with the axis moved to `P[axis]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatForward;

impl ConcatForward {
    fn plan(graph: &Graph, node: NodeId) -> Option<(usize, TransposeInputsInfo)> {
        let axis = rewritable_axis(graph, node)?;
        let reference = select_reference_transpose(graph, node)?;
        let rank = reference.order.len();
        (axis < rank && inputs_have_rank(graph, node, rank)).then_some((axis, reference))
    }
}

impl RewriteRule for ConcatForward {
    fn name(&self) -> &'static str {
        "transpose_sinking_concat_forward"
    }

    fn keys(&self) -> &'static [OpKey] {
        &[OpKey::Concat]
    }

    fn matches(&self, graph: &Graph, node: NodeId) -> bool {
        Self::plan(graph, node).is_some()
    }

    fn apply(&self, graph: &mut Graph, node: NodeId) -> RewriteResult {
        let Some((axis, reference)) = Self::plan(graph, node) else {
            return RewriteResult::NoMatch;
        };

        let outcome = graph.transaction(|g| {
            let mut new_nodes = normalize_inputs_to_reference_frame(g, node, &reference)?;
            relocate_axis(g, node, apply(&reference.order, axis))?;
            g.infer_types(node)?;
            new_nodes.extend(insert_output_transposes(g, node, &reference)?);
            record_new_nodes(g, &new_nodes, node, PassName::TransposeSinkingConcatForward)?;
            Ok(new_nodes)
        });
        commit(self.name(), node, outcome)
    }
}

/// `Transpose(Concat(x, y, ...), P)` on every output becomes
/// `Concat(Transpose(x, P), Transpose(y, P), ...)` with the axis moved to `P⁻¹[axis]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatBackward;

impl ConcatBackward {
    fn plan(graph: &Graph, node: NodeId) -> Option<(usize, UniformOutputTranspose)> {
        let axis = rewritable_axis(graph, node)?;
        let uniform = uniform_output_transpose(graph, node)?;
        let rank = uniform.order.len();
        let eligible = uniform.transposes.iter().all(|&t| is_sinking_eligible(graph, t));
        (eligible && axis < rank && inputs_have_rank(graph, node, rank)).then_some((axis, uniform))
    }
}

impl RewriteRule for ConcatBackward {
    fn name(&self) -> &'static str {
        "transpose_sinking_concat_backward"
    }

    fn keys(&self) -> &'static [OpKey] {
        &[OpKey::Concat]
    }

    fn matches(&self, graph: &Graph, node: NodeId) -> bool {
        Self::plan(graph, node).is_some()
    }

    fn apply(&self, graph: &mut Graph, node: NodeId) -> RewriteResult {
        let Some((axis, uniform)) = Self::plan(graph, node) else {
            return RewriteResult::NoMatch;
        };

        let outcome = graph.transaction(|g| {
            let new_nodes: NewNodes = insert_input_transposes(g, node, uniform.order_const, None)?;
            relocate_axis(g, node, apply(&invert(&uniform.order), axis))?;
            g.infer_types(node)?;
            if let Some(absorbed) = remove_redundant_output_consumers(g, node)? {
                swap_display_names(g, node, absorbed)?;
            }
            record_new_nodes(g, &new_nodes, node, PassName::TransposeSinkingConcatBackward)?;
            Ok(new_nodes)
        });
        commit(self.name(), node, outcome)
    }
}
