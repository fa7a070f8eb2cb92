//! Arena graph of tensor operations.
//!
//! Nodes live in an arena and are addressed by stable [`NodeId`]s. An edge is
//! stored twice: the consumer keeps the producing [`OutletId`] for each input
//! slot, and the producer keeps the list of consuming [`InletId`]s for each
//! output slot, so both directions are O(1).
//!
//! Nodes are not owned by the code that rewrites them. A node whose outputs
//! have no consumers left (and which is not a `Result`) is dead; dead nodes
//! are swept by [`Graph::remove_dead_nodes`].
//!
//! Every mutation goes through a small set of journaled primitives so that a
//! rewrite can run inside [`Graph::transaction`] and be rolled back as a whole.

mod builder;
mod journal;

use std::collections::HashSet;
use std::panic::Location;

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::op::{Op, OpKey};
use crate::provenance::{PassName, ProvenanceEvent, SourceLocation};
use crate::shape::TensorType;

use journal::Undo;

/// Stable identifier of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("#{_0}")]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

/// A node output: `(producer, output slot)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{node}:{slot}")]
pub struct OutletId {
    pub node: NodeId,
    pub slot: usize,
}

impl OutletId {
    pub fn new(node: NodeId, slot: usize) -> Self {
        Self { node, slot }
    }
}

impl From<NodeId> for OutletId {
    fn from(node: NodeId) -> Self {
        Self { node, slot: 0 }
    }
}

/// A node input: `(consumer, input slot)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{node}<{slot}")]
pub struct InletId {
    pub node: NodeId,
    pub slot: usize,
}

impl InletId {
    pub fn new(node: NodeId, slot: usize) -> Self {
        Self { node, slot }
    }
}

/// Whether a transpose may take part in further sinking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SinkingMark {
    #[default]
    Eligible,
    /// Sinking stopped here; backward rules must leave this transpose alone.
    Blocked,
}

/// Typed per-node extension record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeExt {
    pub sinking: SinkingMark,
    pub provenance: Vec<ProvenanceEvent>,
}

#[derive(Debug, Clone)]
struct OutputPort {
    ty: TensorType,
    consumers: SmallVec<[InletId; 2]>,
}

/// A graph node.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    op: Op,
    inputs: SmallVec<[OutletId; 4]>,
    outputs: SmallVec<[OutputPort; 1]>,
    ext: NodeExt,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn key(&self) -> OpKey {
        self.op.key()
    }

    pub fn inputs(&self) -> &[OutletId] {
        &self.inputs
    }

    pub fn input(&self, slot: usize) -> Option<OutletId> {
        self.inputs.get(slot).copied()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn output(&self, slot: usize) -> OutletId {
        OutletId::new(self.id, slot)
    }

    pub fn output_type(&self, slot: usize) -> Option<&TensorType> {
        self.outputs.get(slot).map(|port| &port.ty)
    }

    pub fn consumers(&self, slot: usize) -> &[InletId] {
        self.outputs.get(slot).map(|port| port.consumers.as_slice()).unwrap_or_default()
    }

    pub fn has_consumers(&self) -> bool {
        self.outputs.iter().any(|port| !port.consumers.is_empty())
    }

    pub fn ext(&self) -> &NodeExt {
        &self.ext
    }
}

/// Mutable tensor-operation graph.
/// One entry of [`Graph::summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    pub op: Op,
    pub inputs: Vec<OutletId>,
    pub types: Vec<TensorType>,
    /// Consumers of all outputs, sorted.
    pub consumers: Vec<InletId>,
    pub sinking: SinkingMark,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    parameters: Vec<NodeId>,
    results: Vec<NodeId>,
    journal: Option<Vec<Undo>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn try_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.try_node(id).context(UnknownNodeSnafu { node: id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut).context(UnknownNodeSnafu { node: id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.try_node(id).is_some()
    }

    pub fn op(&self, id: NodeId) -> Option<&Op> {
        self.try_node(id).map(Node::op)
    }

    /// Op of the node producing `outlet`.
    pub fn producer_op(&self, outlet: OutletId) -> Option<&Op> {
        self.op(outlet.node)
    }

    pub fn outlet_type(&self, outlet: OutletId) -> Result<&TensorType> {
        self.node(outlet.node)?
            .output_type(outlet.slot)
            .context(OutputSlotOutOfRangeSnafu { node: outlet.node, slot: outlet.slot })
    }

    pub fn try_outlet_type(&self, outlet: OutletId) -> Option<&TensorType> {
        self.try_node(outlet.node)?.output_type(outlet.slot)
    }

    pub fn consumers(&self, outlet: OutletId) -> &[InletId] {
        self.try_node(outlet.node).map(|n| n.consumers(outlet.slot)).unwrap_or_default()
    }

    /// Source currently wired into `inlet`.
    pub fn source(&self, inlet: InletId) -> Option<OutletId> {
        self.try_node(inlet.node)?.input(inlet.slot)
    }

    pub fn parameters(&self) -> &[NodeId] {
        &self.parameters
    }

    pub fn results(&self) -> &[NodeId] {
        &self.results
    }

    /// Number of arena slots holding a node (live or dead).
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A node is dead when nothing consumes it and it is not a graph output.
    pub fn is_dead(&self, id: NodeId) -> bool {
        match self.try_node(id) {
            Some(node) => !matches!(node.op, Op::Result) && !node.has_consumers(),
            None => true,
        }
    }

    /// Nodes reachable from the results, producers before consumers.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();

        for &root in &self.results {
            let mut stack = vec![(root, false)];
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    order.push(id);
                    continue;
                }
                if !visited.insert(id) {
                    continue;
                }
                let Some(node) = self.try_node(id) else { continue };
                stack.push((id, true));
                for input in node.inputs.iter().rev() {
                    if !visited.contains(&input.node) {
                        stack.push((input.node, false));
                    }
                }
            }
        }

        order
    }

    /// Live nodes of a given kind in topological order.
    pub fn nodes_of_kind(&self, key: OpKey) -> Vec<NodeId> {
        self.topological_order().into_iter().filter(|&id| self.op(id).is_some_and(|op| op.key() == key)).collect()
    }

    pub fn count(&self, key: OpKey) -> usize {
        self.nodes_of_kind(key).len()
    }

    /// Wiring of every reachable node in id order, for comparing graph states.
    ///
    /// Consumer lists are sorted, so two graphs that differ only in consumer
    /// order summarize equal.
    pub fn summary(&self) -> Vec<NodeSummary> {
        let mut ids = self.topological_order();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| {
                let n = self.try_node(id)?;
                let types = n.outputs.iter().map(|port| port.ty.clone()).collect();
                let mut consumers: Vec<InletId> = n.outputs.iter().flat_map(|port| port.consumers.iter().copied()).collect();
                consumers.sort_unstable();
                Some(NodeSummary {
                    id,
                    name: n.name.clone(),
                    op: n.op.clone(),
                    inputs: n.inputs.to_vec(),
                    types,
                    consumers,
                    sinking: n.ext.sinking,
                })
            })
            .collect()
    }

    // =========================================================================
    // Mutation primitives (journaled)
    // =========================================================================

    /// Add a node, infer its output types and wire its inputs.
    ///
    /// Nothing is mutated if validation or inference fails.
    #[track_caller]
    pub fn add_node(&mut self, op: Op, inputs: &[OutletId], name: Option<&str>) -> Result<NodeId> {
        let arity = op.arity();
        ensure!(
            arity.contains(&inputs.len()),
            ArityMismatchSnafu { op: op.key(), expected: format_arity(&arity), actual: inputs.len() }
        );
        for &input in inputs {
            self.outlet_type(input)?;
        }
        let types = crate::infer::infer_output_types(self, &op, inputs)?;

        let id = NodeId(self.nodes.len() as u32);
        let name = name.map(str::to_owned).unwrap_or_else(|| format!("{}_{}", op.key(), id.0));
        let location = SourceLocation::from_caller(Location::caller());
        let is_parameter = matches!(op, Op::Parameter(_));
        let is_result = matches!(op, Op::Result);

        for (slot, &input) in inputs.iter().enumerate() {
            self.link(input, InletId::new(id, slot))?;
        }
        self.nodes.push(Some(Node {
            id,
            name,
            op,
            inputs: inputs.iter().copied().collect(),
            outputs: types.into_iter().map(|ty| OutputPort { ty, consumers: SmallVec::new() }).collect(),
            ext: NodeExt { sinking: SinkingMark::default(), provenance: vec![ProvenanceEvent::Created { location }] },
        }));
        if is_parameter {
            self.parameters.push(id);
        }
        if is_result {
            self.results.push(id);
        }

        self.record(Undo::AddNode(id));
        Ok(id)
    }

    /// Rewire `inlet` to read from `source`. Types are not re-inferred.
    pub fn set_input(&mut self, inlet: InletId, source: OutletId) -> Result<()> {
        self.outlet_type(source)?;
        let previous = self
            .node(inlet.node)?
            .input(inlet.slot)
            .context(InputSlotOutOfRangeSnafu { node: inlet.node, slot: inlet.slot })?;
        if previous == source {
            return Ok(());
        }

        self.rewire(inlet, previous, source)?;
        self.record(Undo::SetInput { inlet, previous });
        Ok(())
    }

    /// Rewire every consumer of `from` to read from `to`.
    pub fn replace_uses(&mut self, from: OutletId, to: OutletId) -> Result<()> {
        let consumers: SmallVec<[InletId; 4]> = self.consumers(from).iter().copied().collect();
        for inlet in consumers {
            self.set_input(inlet, to)?;
        }
        Ok(())
    }

    /// Replace a node's op (attributes). Types are not re-inferred.
    pub fn set_op(&mut self, id: NodeId, op: Op) -> Result<()> {
        let node = self.node_mut(id)?;
        let arity = op.arity();
        ensure!(
            arity.contains(&node.inputs.len()) && op.num_outputs() == node.outputs.len(),
            ArityMismatchSnafu { op: op.key(), expected: format_arity(&arity), actual: node.inputs.len() }
        );
        let previous = std::mem::replace(&mut node.op, op);
        self.record(Undo::SetOp { node: id, previous });
        Ok(())
    }

    /// Re-run validation and type inference for one node.
    pub fn infer_types(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let types = crate::infer::infer_output_types(self, &node.op, &node.inputs)?;

        let node = self.node_mut(id)?;
        let changed = node.outputs.iter().zip(&types).any(|(port, ty)| port.ty != *ty);
        if !changed {
            return Ok(());
        }
        let previous: SmallVec<[TensorType; 1]> =
            node.outputs.iter_mut().zip(types).map(|(port, ty)| std::mem::replace(&mut port.ty, ty)).collect();
        self.record(Undo::SetOutputTypes { node: id, previous });
        Ok(())
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        let previous = std::mem::replace(&mut self.node_mut(id)?.name, name.into());
        self.record(Undo::SetName { node: id, previous });
        Ok(())
    }

    /// Exchange the display names of two nodes.
    pub fn swap_names(&mut self, a: NodeId, b: NodeId) -> Result<()> {
        let name_a = self.node(a)?.name.clone();
        let name_b = self.node(b)?.name.clone();
        self.set_name(a, name_b)?;
        self.set_name(b, name_a)
    }

    pub fn set_sinking(&mut self, id: NodeId, mark: SinkingMark) -> Result<()> {
        self.update_ext(id, |ext| ext.sinking = mark)
    }

    /// Record that `id` was produced by `pass` while rewriting `from`.
    pub fn record_transform(&mut self, id: NodeId, from: NodeId, pass_name: PassName) -> Result<()> {
        self.update_ext(id, |ext| ext.provenance.push(ProvenanceEvent::Transformed { from, pass_name }))
    }

    fn update_ext(&mut self, id: NodeId, f: impl FnOnce(&mut NodeExt)) -> Result<()> {
        let node = self.node_mut(id)?;
        let previous = node.ext.clone();
        f(&mut node.ext);
        self.record(Undo::SetExt { node: id, previous });
        Ok(())
    }

    /// Sweep dead nodes. Parameters are kept as graph inputs.
    ///
    /// Not journaled; must not be called inside a transaction.
    pub fn remove_dead_nodes(&mut self) -> usize {
        debug_assert!(self.journal.is_none(), "remove_dead_nodes inside a transaction");
        let mut removed = 0;
        loop {
            let dead: Vec<NodeId> = self
                .nodes
                .iter()
                .flatten()
                .filter(|n| !matches!(n.op, Op::Parameter(_)) && self.is_dead(n.id))
                .map(|n| n.id)
                .collect();
            if dead.is_empty() {
                break;
            }
            for id in dead {
                self.detach(id);
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::trace!(removed, "removed dead nodes");
        }
        removed
    }

    // =========================================================================
    // Raw edge maintenance
    // =========================================================================

    fn link(&mut self, source: OutletId, inlet: InletId) -> Result<()> {
        let producer = self.node_mut(source.node)?;
        let port = producer
            .outputs
            .get_mut(source.slot)
            .context(OutputSlotOutOfRangeSnafu { node: source.node, slot: source.slot })?;
        port.consumers.push(inlet);
        Ok(())
    }

    fn unlink(&mut self, source: OutletId, inlet: InletId) {
        if let Some(port) = self
            .nodes
            .get_mut(source.node.index())
            .and_then(Option::as_mut)
            .and_then(|producer| producer.outputs.get_mut(source.slot))
            && let Some(pos) = port.consumers.iter().position(|c| *c == inlet)
        {
            port.consumers.remove(pos);
        }
    }

    fn rewire(&mut self, inlet: InletId, previous: OutletId, source: OutletId) -> Result<()> {
        self.link(source, inlet)?;
        self.unlink(previous, inlet);
        let node = self.node_mut(inlet.node)?;
        node.inputs[inlet.slot] = source;
        Ok(())
    }

    /// Remove a node from the arena, unlinking it from its producers.
    fn detach(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.get_mut(id.index())?.take()?;
        for (slot, &input) in node.inputs.iter().enumerate() {
            self.unlink(input, InletId::new(id, slot));
        }
        self.parameters.retain(|&p| p != id);
        self.results.retain(|&r| r != id);
        Some(node)
    }
}

fn format_arity(arity: &std::ops::RangeInclusive<usize>) -> String {
    match (*arity.start(), *arity.end()) {
        (lo, hi) if lo == hi => lo.to_string(),
        (lo, usize::MAX) => format!("at least {lo}"),
        (lo, hi) => format!("{lo}..={hi}"),
    }
}
