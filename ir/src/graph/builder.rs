//! Typed node constructors.
//!
//! Thin wrappers over [`Graph::add_node`]. All of them are `#[track_caller]`
//! so the `Created` provenance event points at the code that built the node.

use snafu::OptionExt;

use crate::error::*;
use crate::op::Op;
use crate::shape::{PartialShape, TensorType};
use crate::types::{ConcatAttrs, Constant, DType, InterpolateAttrs};

use super::{Graph, NodeId, OutletId};

impl Graph {
    #[track_caller]
    pub fn parameter(&mut self, name: &str, dtype: DType, shape: PartialShape) -> Result<OutletId> {
        let id = self.add_node(Op::Parameter(TensorType::new(dtype, shape)), &[], Some(name))?;
        Ok(id.into())
    }

    #[track_caller]
    pub fn constant(&mut self, value: Constant) -> Result<OutletId> {
        Ok(self.add_node(Op::Constant(value), &[], None)?.into())
    }

    /// Transpose `data` by the order tensor `order`.
    #[track_caller]
    pub fn transpose(&mut self, data: OutletId, order: OutletId) -> Result<OutletId> {
        Ok(self.add_node(Op::Transpose, &[data, order], None)?.into())
    }

    /// Transpose `data` by a constant `i64` order.
    #[track_caller]
    pub fn transpose_by(&mut self, data: OutletId, order: &[usize]) -> Result<OutletId> {
        let order = self.constant(Constant::ints(DType::I64, order.iter().map(|&a| a as i64)))?;
        self.transpose(data, order)
    }

    #[track_caller]
    pub fn concat(&mut self, inputs: &[OutletId], axis: i64) -> Result<OutletId> {
        Ok(self.add_node(Op::Concat(ConcatAttrs::new(axis)), inputs, None)?.into())
    }

    /// Gather along the axis given by the scalar tensor `axis`.
    #[track_caller]
    pub fn gather(&mut self, data: OutletId, indices: OutletId, axis: OutletId) -> Result<OutletId> {
        Ok(self.add_node(Op::Gather, &[data, indices, axis], None)?.into())
    }

    #[track_caller]
    pub fn interpolate(
        &mut self,
        data: OutletId,
        sizes: OutletId,
        scales: OutletId,
        axes: OutletId,
        attrs: InterpolateAttrs,
    ) -> Result<OutletId> {
        Ok(self.add_node(Op::Interpolate(attrs), &[data, sizes, scales, axes], None)?.into())
    }

    /// Mark `value` as a graph output.
    #[track_caller]
    pub fn result(&mut self, value: OutletId) -> Result<NodeId> {
        self.add_node(Op::Result, &[value], None)
    }

    /// Name of the node producing `outlet`.
    pub fn name_of(&self, outlet: OutletId) -> Result<&str> {
        let node = self.node(outlet.node)?;
        node.output_type(outlet.slot).context(OutputSlotOutOfRangeSnafu { node: outlet.node, slot: outlet.slot })?;
        Ok(node.name())
    }
}
