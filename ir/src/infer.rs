//! Validation, shape inference and constant folding.
//!
//! Inference runs when a node is created and whenever a rewrite asks for it
//! through [`Graph::infer_types`]. It validates the node's inputs and
//! attributes and computes its output types. Inputs that must be known at
//! graph-build time (transpose orders, gather axes, interpolate axes) are
//! resolved through [`Graph::fold_constant`], which sees through the small
//! Gather/Concat chains rewrites build on top of constants.

use smallvec::{SmallVec, smallvec};
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::graph::{Graph, OutletId};
use crate::op::{Op, OpKey};
use crate::shape::{Dim, Dims, PartialShape, TensorType};
use crate::types::{ConcatAttrs, ConstData, Constant, InterpolateAttrs, ShapeCalcMode};

pub(crate) fn infer_output_types(graph: &Graph, op: &Op, inputs: &[OutletId]) -> Result<SmallVec<[TensorType; 1]>> {
    let ty = match op {
        Op::Parameter(ty) => ty.clone(),
        Op::Constant(value) => constant_type(value)?,
        Op::Transpose => transpose_type(graph, inputs)?,
        Op::Concat(attrs) => concat_type(graph, attrs, inputs)?,
        Op::Gather => gather_type(graph, inputs)?,
        Op::Interpolate(attrs) => interpolate_type(graph, attrs, inputs)?,
        Op::Result => return Ok(SmallVec::new()),
    };
    Ok(smallvec![ty])
}

/// Map a possibly negative axis into `0..rank`.
pub fn normalize_axis(axis: i64, rank: usize) -> Option<usize> {
    let rank = i64::try_from(rank).ok()?;
    let axis = if axis < 0 { axis + rank } else { axis };
    (0..rank).contains(&axis).then_some(axis as usize)
}

/// Check that `order` is a permutation of `0..rank`.
pub fn validate_permutation(order: &[i64], rank: usize) -> Result<Vec<usize>> {
    let invalid = || InvalidPermutationSnafu { order: order.to_vec(), rank };
    ensure!(order.len() == rank, invalid());

    let mut seen = vec![false; rank];
    order
        .iter()
        .map(|&a| {
            let a = usize::try_from(a).ok().filter(|&a| a < rank).context(invalid())?;
            ensure!(!std::mem::replace(&mut seen[a], true), invalid());
            Ok(a)
        })
        .collect()
}

/// Output length of an axis resized by `scale`.
pub fn scaled_len(len: usize, scale: f32) -> usize {
    // Small epsilon so that e.g. 3 * (1/3) lands on 1.
    ((len as f64) * f64::from(scale) + 1e-5).floor().max(0.0) as usize
}

fn ensure_int_input(graph: &Graph, op: OpKey, inputs: &[OutletId], slot: usize) -> Result<()> {
    let ty = graph.outlet_type(inputs[slot])?;
    ensure!(ty.dtype.is_int(), ExpectedIntegerInputSnafu { op, slot, actual: ty.dtype });
    Ok(())
}

fn fold_ints(graph: &Graph, outlet: OutletId) -> Option<Vec<i64>> {
    graph.fold_constant(outlet).and_then(|c| c.data.as_ints().map(<[i64]>::to_vec))
}

fn constant_type(value: &Constant) -> Result<TensorType> {
    let expected = value.numel();
    ensure!(
        value.data.len() == expected,
        MalformedConstantSnafu { shape: value.shape.clone(), expected, actual: value.data.len() }
    );
    Ok(TensorType::new(value.dtype, PartialShape::from_static(&value.shape)))
}

fn transpose_type(graph: &Graph, inputs: &[OutletId]) -> Result<TensorType> {
    let op = OpKey::Transpose;
    let data = graph.outlet_type(inputs[0])?;
    ensure_int_input(graph, op, inputs, 1)?;
    if let Some(rank) = graph.outlet_type(inputs[1])?.rank() {
        ensure!(rank == 1, RankMismatchSnafu { op, expected: 1usize, actual: rank });
    }

    let shape = match (fold_ints(graph, inputs[1]), data.shape.dims()) {
        (Some(order), Some(dims)) => {
            ensure!(order.len() == dims.len(), RankMismatchSnafu { op, expected: dims.len(), actual: order.len() });
            let perm = validate_permutation(&order, dims.len())?;
            PartialShape::Ranked(perm.iter().map(|&a| dims[a]).collect())
        }
        (Some(order), None) => {
            validate_permutation(&order, order.len())?;
            PartialShape::dynamic_dims(order.len())
        }
        (None, Some(dims)) => PartialShape::dynamic_dims(dims.len()),
        (None, None) => PartialShape::DynamicRank,
    };
    Ok(TensorType::new(data.dtype, shape))
}

fn concat_type(graph: &Graph, attrs: &ConcatAttrs, inputs: &[OutletId]) -> Result<TensorType> {
    let op = OpKey::Concat;
    let types = inputs.iter().map(|&i| graph.outlet_type(i)).collect::<Result<Vec<_>>>()?;
    let dtype = types[0].dtype;
    for ty in &types[1..] {
        ensure!(ty.dtype == dtype, DTypeMismatchSnafu { op, lhs: dtype, rhs: ty.dtype });
    }

    let mut ranked = types.iter().filter_map(|ty| ty.shape.dims());
    let Some(first) = ranked.next() else {
        return Ok(TensorType::new(dtype, PartialShape::DynamicRank));
    };
    let rank = first.len();
    let axis = normalize_axis(attrs.axis, rank).context(AxisOutOfRangeSnafu { op, axis: attrs.axis, rank })?;

    let mut out: Dims = first.iter().copied().collect();
    for dims in ranked {
        ensure!(dims.len() == rank, RankMismatchSnafu { op, expected: rank, actual: dims.len() });
        for (i, (lhs, rhs)) in out.iter_mut().zip(dims).enumerate() {
            if i == axis {
                *lhs = lhs.add(*rhs);
                continue;
            }
            ensure!(lhs.compatible(rhs), DimensionMismatchSnafu { op, axis: i, lhs: *lhs, rhs: *rhs });
            if lhs.as_static().is_none() {
                *lhs = *rhs;
            }
        }
    }
    if types.iter().any(|ty| ty.rank().is_none()) {
        out[axis] = Dim::Dynamic;
    }

    Ok(TensorType::new(dtype, PartialShape::Ranked(out)))
}

fn gather_type(graph: &Graph, inputs: &[OutletId]) -> Result<TensorType> {
    let op = OpKey::Gather;
    let data = graph.outlet_type(inputs[0])?;
    let indices = graph.outlet_type(inputs[1])?;
    ensure_int_input(graph, op, inputs, 1)?;
    ensure_int_input(graph, op, inputs, 2)?;

    let axis = fold_ints(graph, inputs[2])
        .and_then(|v| (v.len() == 1).then(|| v[0]))
        .context(NonConstantInputSnafu { op, slot: 2usize })?;

    let (Some(dims), Some(index_dims)) = (data.shape.dims(), indices.shape.dims()) else {
        return Ok(TensorType::new(data.dtype, PartialShape::DynamicRank));
    };
    let rank = dims.len();
    let axis = normalize_axis(axis, rank).context(AxisOutOfRangeSnafu { op, axis, rank })?;

    let mut out: Dims = dims[..axis].iter().copied().collect();
    out.extend(index_dims.iter().copied());
    out.extend(dims[axis + 1..].iter().copied());
    Ok(TensorType::new(data.dtype, PartialShape::Ranked(out)))
}

fn interpolate_type(graph: &Graph, attrs: &InterpolateAttrs, inputs: &[OutletId]) -> Result<TensorType> {
    let op = OpKey::Interpolate;
    let data = graph.outlet_type(inputs[0])?;
    ensure_int_input(graph, op, inputs, 3)?;

    let Some(dims) = data.shape.dims() else {
        return Ok(TensorType::new(data.dtype, PartialShape::DynamicRank));
    };
    let rank = dims.len();
    for len in [attrs.pads_begin.len(), attrs.pads_end.len()] {
        ensure!(len <= rank, PaddingTooLongSnafu { len, rank });
    }

    let (begin, end) = attrs.padding_for_rank(rank);
    let mut out: Dims = dims
        .iter()
        .zip(begin.iter().zip(&end))
        .map(|(d, (b, e))| match d {
            Dim::Static(n) => Dim::Static(n + b + e),
            Dim::Dynamic => Dim::Dynamic,
        })
        .collect();

    let Some(axes) = fold_ints(graph, inputs[3]) else {
        return Ok(TensorType::new(data.dtype, PartialShape::dynamic_dims(rank)));
    };
    let axes = axes
        .iter()
        .map(|&axis| normalize_axis(axis, rank).context(AxisOutOfRangeSnafu { op, axis, rank }))
        .collect::<Result<Vec<_>>>()?;

    match attrs.shape_calculation_mode {
        ShapeCalcMode::Sizes => match fold_ints(graph, inputs[1]) {
            Some(sizes) => {
                ensure!(
                    sizes.len() == axes.len(),
                    AxesLengthMismatchSnafu { op, what: "sizes", expected: axes.len(), actual: sizes.len() }
                );
                for (&axis, &size) in axes.iter().zip(&sizes) {
                    out[axis] = Dim::Static(size.max(0) as usize);
                }
            }
            None => axes.iter().for_each(|&axis| out[axis] = Dim::Dynamic),
        },
        ShapeCalcMode::Scales => match graph.fold_constant(inputs[2]) {
            Some(scales) => {
                let scales = scales.data.to_floats();
                ensure!(
                    scales.len() == axes.len(),
                    AxesLengthMismatchSnafu { op, what: "scales", expected: axes.len(), actual: scales.len() }
                );
                for (&axis, &scale) in axes.iter().zip(&scales) {
                    if let Dim::Static(n) = out[axis] {
                        out[axis] = Dim::Static(scaled_len(n, scale));
                    }
                }
            }
            None => axes.iter().for_each(|&axis| out[axis] = Dim::Dynamic),
        },
    }

    Ok(TensorType::new(data.dtype, PartialShape::Ranked(out)))
}

// =========================================================================
// Constant folding
// =========================================================================

impl Graph {
    /// Value of `outlet` if it is computable at graph-build time.
    ///
    /// Handles constants, 1-D gathers of constants and 1-D concats of
    /// constants. Anything else folds to `None`.
    pub fn fold_constant(&self, outlet: OutletId) -> Option<Constant> {
        let node = self.try_node(outlet.node)?;
        match node.op() {
            Op::Constant(value) => Some(value.clone()),
            Op::Gather => {
                let data = self.fold_constant(node.input(0)?)?;
                let indices = self.fold_constant(node.input(1)?)?;
                let axis = self.fold_constant(node.input(2)?)?;
                fold_gather(&data, &indices, &axis)
            }
            Op::Concat(attrs) => {
                let parts = node.inputs().iter().map(|&i| self.fold_constant(i)).collect::<Option<Vec<_>>>()?;
                fold_concat(&parts, attrs.axis)
            }
            _ => None,
        }
    }
}

fn fold_gather(data: &Constant, indices: &Constant, axis: &Constant) -> Option<Constant> {
    if data.shape.len() != 1 || normalize_axis(*axis.data.as_ints()?.first()?, 1)? != 0 {
        return None;
    }
    let len = data.shape[0];
    let picks = indices.data.as_ints()?.iter().map(|&i| normalize_axis(i, len)).collect::<Option<Vec<_>>>()?;

    let data_out = match &data.data {
        ConstData::Int(v) => ConstData::Int(picks.iter().map(|&i| v[i]).collect()),
        ConstData::Float(v) => ConstData::Float(picks.iter().map(|&i| v[i]).collect()),
    };
    Some(Constant { dtype: data.dtype, shape: indices.shape.clone(), data: data_out })
}

fn fold_concat(parts: &[Constant], axis: i64) -> Option<Constant> {
    let first = parts.first()?;
    if normalize_axis(axis, 1)? != 0 || parts.iter().any(|p| p.shape.len() != 1 || p.dtype != first.dtype) {
        return None;
    }

    let data = match &first.data {
        ConstData::Int(_) => ConstData::Int(
            parts.iter().map(|p| p.data.as_ints().map(<[i64]>::to_vec)).collect::<Option<Vec<_>>>()?.concat(),
        ),
        ConstData::Float(_) => ConstData::Float(parts.iter().flat_map(|p| p.data.to_floats()).collect()),
    };
    Some(Constant { dtype: first.dtype, shape: smallvec![data.len()], data })
}
