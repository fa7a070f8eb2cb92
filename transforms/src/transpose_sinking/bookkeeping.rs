//! Graph surgery shared by the sinking rules.
//!
//! These helpers mutate the graph through its journaled primitives and are
//! meant to be called inside a [`Graph::transaction`]; any error rolls the
//! whole rewrite back.

use axion_ir::error::{InputSlotOutOfRangeSnafu, RankMismatchSnafu, Result};
use axion_ir::pattern::transpose_order;
use axion_ir::{Constant, Graph, InletId, NodeId, OutletId, SinkingMark};
use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use super::permutation::{AxisOrder, invert};
use super::predicates::{can_propagate_forward, live_consumers};

/// A transpose feeding one input of the node being rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransposeInputsInfo {
    pub transpose: NodeId,
    /// Order input of `transpose`.
    pub order_const: OutletId,
    pub order: AxisOrder,
    /// Input slot of the rewritten node fed by `transpose`.
    pub input_index: usize,
}

pub type NewNodes = SmallVec<[NodeId; 4]>;

/// Transpose with a constant order feeding input `slot` of `node`.
pub fn transpose_input_info(graph: &Graph, node: NodeId, slot: usize) -> Option<TransposeInputsInfo> {
    let input = graph.source(InletId::new(node, slot))?;
    let order = transpose_order(graph, input.node)?.into();
    let order_const = graph.try_node(input.node)?.input(1)?;
    Some(TransposeInputsInfo { transpose: input.node, order_const, order, input_index: slot })
}

/// First input of `node` produced by a transpose with a constant order.
pub fn select_reference_transpose(graph: &Graph, node: NodeId) -> Option<TransposeInputsInfo> {
    let arity = graph.try_node(node)?.inputs().len();
    (0..arity).find_map(|slot| transpose_input_info(graph, node, slot))
}

/// Source of a transpose's data input.
fn transpose_data(graph: &Graph, transpose: NodeId) -> Result<OutletId> {
    graph.source(InletId::new(transpose, 0)).context(InputSlotOutOfRangeSnafu { node: transpose, slot: 0usize })
}

/// Transpose `data` by a fresh constant order of the given element type.
fn add_transpose(graph: &mut Graph, data: OutletId, order: &[usize], like: OutletId) -> Result<OutletId> {
    let dtype = graph.outlet_type(like)?.dtype;
    let order = graph.constant(Constant::ints(dtype, order.iter().map(|&a| a as i64)))?;
    graph.transpose(data, order)
}

/// Move every input of `node` into the reference transpose's input frame.
///
/// Inputs fed by the reference transpose are bypassed. Every other input gets
/// a transpose by the inverse order, so that re-applying the reference order
/// after `node` reproduces it. Returns the inserted transposes.
pub fn normalize_inputs_to_reference_frame(
    graph: &mut Graph,
    node: NodeId,
    reference: &TransposeInputsInfo,
) -> Result<NewNodes> {
    let data = transpose_data(graph, reference.transpose)?;
    let inverse = invert(&reference.order);
    let rank = reference.order.len();
    let op = graph.node(node)?.key();
    let inputs = graph.node(node)?.inputs().to_vec();

    let mut inserted = NewNodes::new();
    for (slot, input) in inputs.into_iter().enumerate() {
        let inlet = InletId::new(node, slot);
        if input.node == reference.transpose {
            graph.set_input(inlet, data)?;
            continue;
        }

        let input_rank = graph.outlet_type(input)?.rank();
        ensure!(input_rank == Some(rank), RankMismatchSnafu { op, expected: rank, actual: input_rank.unwrap_or(0) });
        let t = add_transpose(graph, input, &inverse, reference.order_const)?;
        graph.set_input(inlet, t)?;
        inserted.push(t.node);
    }

    Ok(inserted)
}

/// Put a transpose by the reference order after every output of `node`.
///
/// Previous consumers read from the new transposes, which take over `node`'s
/// display name. Returns the inserted transposes.
pub fn insert_output_transposes(
    graph: &mut Graph,
    node: NodeId,
    reference: &TransposeInputsInfo,
) -> Result<NewNodes> {
    let n = graph.node(node)?;
    let outputs = n.num_outputs();
    let name = n.name().to_owned();

    let mut inserted = NewNodes::new();
    for slot in 0..outputs {
        let out = OutletId::new(node, slot);
        let consumers: Vec<InletId> = graph.consumers(out).to_vec();
        let t = graph.transpose(out, reference.order_const)?;
        for inlet in consumers {
            graph.set_input(inlet, t)?;
        }

        if outputs == 1 {
            swap_display_names(graph, node, t.node)?;
        } else {
            graph.set_name(t.node, format!("{name}.{slot}"))?;
        }
        update_forward_sinking_ability(graph, t.node)?;
        inserted.push(t.node);
    }

    Ok(inserted)
}

/// Prepend a transpose by `order_const` on the given inputs of `node` (all
/// inputs when `which` is `None`). Returns the inserted transposes.
pub fn insert_input_transposes(
    graph: &mut Graph,
    node: NodeId,
    order_const: OutletId,
    which: Option<&[usize]>,
) -> Result<NewNodes> {
    let arity = graph.node(node)?.inputs().len();
    let slots: Vec<usize> = which.map_or_else(|| (0..arity).collect(), <[usize]>::to_vec);

    let mut inserted = NewNodes::new();
    for slot in slots {
        let inlet = InletId::new(node, slot);
        let input = graph.source(inlet).context(InputSlotOutOfRangeSnafu { node, slot })?;
        let t = graph.transpose(input, order_const)?;
        graph.set_input(inlet, t)?;
        inserted.push(t.node);
    }

    Ok(inserted)
}

/// Bypass the transposes consuming `node`'s outputs.
///
/// Their consumers are rewired to read `node` directly; the transposes become
/// dead. Returns the first bypassed transpose.
pub fn remove_redundant_output_consumers(graph: &mut Graph, node: NodeId) -> Result<Option<NodeId>> {
    let outputs = graph.node(node)?.num_outputs();
    let mut first = None;

    for slot in 0..outputs {
        let out = OutletId::new(node, slot);
        let transposes: Vec<NodeId> =
            live_consumers(graph, out).filter(|c| c.slot == 0).map(|c| c.node).collect();
        for t in transposes {
            graph.replace_uses(t.into(), out)?;
            first.get_or_insert(t);
        }
    }

    Ok(first)
}

/// Exchange display names so the surviving node keeps the externally visible one.
pub fn swap_display_names(graph: &mut Graph, a: NodeId, b: NodeId) -> Result<()> {
    graph.swap_names(a, b)
}

/// Mark `transpose` eligible for further sinking iff its consumers can carry it.
pub fn update_forward_sinking_ability(graph: &mut Graph, transpose: NodeId) -> Result<()> {
    let mark = if can_propagate_forward(graph, transpose) { SinkingMark::Eligible } else { SinkingMark::Blocked };
    graph.set_sinking(transpose, mark)
}
