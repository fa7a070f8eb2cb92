//! Adjacent transpose fusion.

use axion_ir::error::{InputSlotOutOfRangeSnafu, Result};
use axion_ir::pattern::transpose_order;
use axion_ir::provenance::PassName;
use axion_ir::{Constant, Graph, InletId, NodeId, OpKey, OutletId, RewriteResult, RewriteRule, SinkingMark};
use smallvec::smallvec;
use snafu::OptionExt;

use super::bookkeeping::{NewNodes, swap_display_names, transpose_input_info};
use super::commit;
use super::permutation::{AxisOrder, compose, is_identity};
use super::predicates::is_sinking_eligible;

/// `Transpose(Transpose(x, P1), P2)` becomes `Transpose(x, compose(P1, P2))`,
/// or just `x` when the composition is the identity.
///
/// The fused transpose is blocked if either source transpose was.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransposeFuse;

impl TransposeFuse {
    fn plan(graph: &Graph, node: NodeId) -> Option<(NodeId, AxisOrder)> {
        let outer_order = transpose_order(graph, node)?;
        let inner = transpose_input_info(graph, node, 0)?;
        (inner.order.len() == outer_order.len()).then(|| (inner.transpose, compose(&inner.order, &outer_order)))
    }
}

impl RewriteRule for TransposeFuse {
    fn name(&self) -> &'static str {
        "transpose_fuse"
    }

    fn keys(&self) -> &'static [OpKey] {
        &[OpKey::Transpose]
    }

    fn matches(&self, graph: &Graph, node: NodeId) -> bool {
        Self::plan(graph, node).is_some()
    }

    fn apply(&self, graph: &mut Graph, node: NodeId) -> RewriteResult {
        let Some((inner, order)) = Self::plan(graph, node) else {
            return RewriteResult::NoMatch;
        };
        let blocked = !is_sinking_eligible(graph, inner) || !is_sinking_eligible(graph, node);

        let outcome = graph.transaction(|g| fuse(g, node, inner, &order, blocked));
        commit(self.name(), node, outcome)
    }
}

fn fuse(graph: &mut Graph, outer: NodeId, inner: NodeId, order: &[usize], blocked: bool) -> Result<NewNodes> {
    let data = graph.source(InletId::new(inner, 0)).context(InputSlotOutOfRangeSnafu { node: inner, slot: 0usize })?;
    if is_identity(order) {
        graph.replace_uses(outer.into(), data)?;
        return Ok(NewNodes::new());
    }

    let outer_order = graph
        .source(InletId::new(outer, 1))
        .context(InputSlotOutOfRangeSnafu { node: outer, slot: 1usize })?;
    let dtype = graph.outlet_type(outer_order)?.dtype;
    let order_const = graph.constant(Constant::ints(dtype, order.iter().map(|&a| a as i64)))?;
    let fused: OutletId = graph.transpose(data, order_const)?;

    graph.replace_uses(outer.into(), fused)?;
    swap_display_names(graph, outer, fused.node)?;
    if blocked {
        graph.set_sinking(fused.node, SinkingMark::Blocked)?;
    }
    graph.record_transform(fused.node, outer, PassName::TransposeFuse)?;
    Ok(smallvec![fused.node])
}
