//! Interpolate sinking rules.
//!
//! Interpolate selects its axes through a tensor input, so relocating them
//! means inserting a computation: the axes input is replaced by
//! `Gather(order_table, axes, 0)`. Padding arrays are indexed by data axis and
//! are re-indexed into the new data frame.

use axion_ir::error::{InputSlotOutOfRangeSnafu, Result};
use axion_ir::provenance::PassName;
use axion_ir::{Constant, DType, Graph, InletId, NodeId, OpKey, OutletId, RewriteResult, RewriteRule};
use snafu::OptionExt;

use super::bookkeeping::{
    NewNodes, TransposeInputsInfo, insert_input_transposes, insert_output_transposes,
    remove_redundant_output_consumers, swap_display_names, transpose_input_info,
};
use super::permutation::{invert, reindex};
use super::predicates::{UniformOutputTranspose, is_sinking_eligible, static_rank, uniform_output_transpose};
use super::{commit, record_new_nodes};

/// `(data_slot, axes_slot)` of an axes-tensor-bearing op.
fn slots(graph: &Graph, node: NodeId) -> Option<(usize, usize)> {
    let bearing = graph.op(node)?.as_axes_tensor_bearing()?;
    Some((bearing.data_slot(), bearing.axes_slot()))
}

/// Replace the axes input with `Gather(table, axes, 0)`. Returns the gather.
fn remap_axes(graph: &mut Graph, node: NodeId, axes_slot: usize, table: &[usize]) -> Result<OutletId> {
    let inlet = InletId::new(node, axes_slot);
    let axes = graph.source(inlet).context(InputSlotOutOfRangeSnafu { node, slot: axes_slot })?;
    let dtype = graph.outlet_type(axes)?.dtype;

    let table = graph.constant(Constant::ints(dtype, table.iter().map(|&a| a as i64)))?;
    let zero = graph.constant(Constant::int_scalar(DType::I64, 0))?;
    let gathered = graph.gather(table, axes, zero)?;
    graph.set_input(inlet, gathered)?;
    Ok(gathered)
}

/// Re-index padding (zero-extended to `order.len()`) by `order`, if any is set.
fn reindex_padding(graph: &mut Graph, node: NodeId, order: &[usize]) -> Result<()> {
    let mut op = graph.node(node)?.op().clone();
    let Some(bearing) = op.as_padding_bearing_mut() else { return Ok(()) };
    if !bearing.has_padding() {
        return Ok(());
    }

    let extend = |pads: &[usize]| -> Vec<usize> {
        (0..order.len()).map(|i| pads.get(i).copied().unwrap_or(0)).collect()
    };
    let begin = reindex(order, &extend(bearing.pads_begin()));
    let end = reindex(order, &extend(bearing.pads_end()));
    bearing.set_pads(begin, end);
    graph.set_op(node, op)
}

/// `Interpolate(Transpose(x, P), sizes, scales, axes)` becomes
/// `Transpose(Interpolate(x, sizes, scales, Gather(P, axes, 0)), P)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolateForward;

impl InterpolateForward {
    fn plan(graph: &Graph, node: NodeId) -> Option<((usize, usize), TransposeInputsInfo)> {
        let (data_slot, axes_slot) = slots(graph, node)?;
        let reference = transpose_input_info(graph, node, data_slot)?;
        let data = graph.source(InletId::new(reference.transpose, 0))?;
        (static_rank(graph, data) == Some(reference.order.len())).then_some(((data_slot, axes_slot), reference))
    }
}

impl RewriteRule for InterpolateForward {
    fn name(&self) -> &'static str {
        "transpose_sinking_interpolate_forward"
    }

    fn keys(&self) -> &'static [OpKey] {
        &[OpKey::Interpolate]
    }

    fn matches(&self, graph: &Graph, node: NodeId) -> bool {
        Self::plan(graph, node).is_some()
    }

    fn apply(&self, graph: &mut Graph, node: NodeId) -> RewriteResult {
        let Some(((data_slot, axes_slot), reference)) = Self::plan(graph, node) else {
            return RewriteResult::NoMatch;
        };

        let outcome = graph.transaction(|g| {
            let data = g
                .source(InletId::new(reference.transpose, 0))
                .context(InputSlotOutOfRangeSnafu { node: reference.transpose, slot: 0usize })?;
            g.set_input(InletId::new(node, data_slot), data)?;

            let gathered = remap_axes(g, node, axes_slot, &reference.order)?;
            reindex_padding(g, node, &invert(&reference.order))?;
            g.infer_types(node)?;

            let mut new_nodes: NewNodes = smallvec::smallvec![gathered.node];
            new_nodes.extend(insert_output_transposes(g, node, &reference)?);
            record_new_nodes(g, &new_nodes, node, PassName::TransposeSinkingInterpolateForward)?;
            Ok(new_nodes)
        });
        commit(self.name(), node, outcome)
    }
}

/// `Transpose(Interpolate(x, sizes, scales, axes), P)` on every output becomes
/// `Interpolate(Transpose(x, P), sizes, scales, Gather(P⁻¹, axes, 0))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolateBackward;

impl InterpolateBackward {
    fn plan(graph: &Graph, node: NodeId) -> Option<((usize, usize), UniformOutputTranspose)> {
        let (data_slot, axes_slot) = slots(graph, node)?;
        let uniform = uniform_output_transpose(graph, node)?;
        let rank = uniform.order.len();
        let data = graph.source(InletId::new(node, data_slot))?;
        let eligible = uniform.transposes.iter().all(|&t| is_sinking_eligible(graph, t));
        (eligible && static_rank(graph, data) == Some(rank)).then_some(((data_slot, axes_slot), uniform))
    }
}

impl RewriteRule for InterpolateBackward {
    fn name(&self) -> &'static str {
        "transpose_sinking_interpolate_backward"
    }

    fn keys(&self) -> &'static [OpKey] {
        &[OpKey::Interpolate]
    }

    fn matches(&self, graph: &Graph, node: NodeId) -> bool {
        Self::plan(graph, node).is_some()
    }

    fn apply(&self, graph: &mut Graph, node: NodeId) -> RewriteResult {
        let Some(((data_slot, axes_slot), uniform)) = Self::plan(graph, node) else {
            return RewriteResult::NoMatch;
        };

        let outcome = graph.transaction(|g| {
            let data_slots = [data_slot];
            let mut new_nodes = insert_input_transposes(g, node, uniform.order_const, Some(data_slots.as_slice()))?;
            if let Some(absorbed) = remove_redundant_output_consumers(g, node)? {
                swap_display_names(g, node, absorbed)?;
            }

            let gathered = remap_axes(g, node, axes_slot, &invert(&uniform.order))?;
            reindex_padding(g, node, &uniform.order)?;
            g.infer_types(node)?;

            new_nodes.push(gathered.node);
            record_new_nodes(g, &new_nodes, node, PassName::TransposeSinkingInterpolateBackward)?;
            Ok(new_nodes)
        });
        commit(self.name(), node, outcome)
    }
}
