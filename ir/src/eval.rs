//! Reference evaluator.
//!
//! Executes a graph on concrete `ndarray` values. It exists to check that
//! rewrites preserve results, so it favours plain, obviously-correct code over
//! speed. Interpolate is evaluated for `Nearest` mode only (asymmetric
//! coordinates, floor rounding).

use std::collections::HashMap;

use ndarray::{ArrayD, Axis, IxDyn, Slice};
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::graph::{Graph, NodeId, OutletId};
use crate::infer::{normalize_axis, scaled_len, validate_permutation};
use crate::op::{Op, OpKey};
use crate::shape::{Dim, TensorType};
use crate::types::{ConstData, Constant, DType, InterpolateAttrs, InterpolateMode, ShapeCalcMode};

/// A concrete tensor value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(ArrayD<i64>),
    Float(ArrayD<f32>),
}

impl Value {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Int(a) => a.shape(),
            Self::Float(a) => a.shape(),
        }
    }

    pub fn as_float(&self) -> Option<&ArrayD<f32>> {
        match self {
            Self::Float(a) => Some(a),
            Self::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<&ArrayD<i64>> {
        match self {
            Self::Int(a) => Some(a),
            Self::Float(_) => None,
        }
    }

    fn from_constant(value: &Constant) -> Result<Self> {
        let shape = IxDyn(&value.shape);
        let malformed = |_| Error::MalformedConstant {
            shape: value.shape.clone(),
            expected: value.numel(),
            actual: value.data.len(),
        };
        Ok(match &value.data {
            ConstData::Int(v) => Self::Int(ArrayD::from_shape_vec(shape, v.clone()).map_err(malformed)?),
            ConstData::Float(v) => Self::Float(ArrayD::from_shape_vec(shape, v.clone()).map_err(malformed)?),
        })
    }

    fn matches_type(&self, ty: &TensorType) -> bool {
        let dtype_ok = match self {
            Self::Int(_) => ty.dtype.is_int(),
            Self::Float(_) => ty.dtype == DType::F32,
        };
        let shape_ok = ty.shape.dims().is_none_or(|dims| {
            dims.len() == self.shape().len()
                && dims.iter().zip(self.shape()).all(|(d, &n)| d.compatible(&Dim::Static(n)))
        });
        dtype_ok && shape_ok
    }
}

impl From<ArrayD<f32>> for Value {
    fn from(a: ArrayD<f32>) -> Self {
        Self::Float(a)
    }
}

impl From<ArrayD<i64>> for Value {
    fn from(a: ArrayD<i64>) -> Self {
        Self::Int(a)
    }
}

/// Evaluate every graph result, in [`Graph::results`] order.
///
/// `bindings` maps each parameter node to its value.
pub fn evaluate(graph: &Graph, bindings: &HashMap<NodeId, Value>) -> Result<Vec<Value>> {
    let mut values: HashMap<OutletId, Value> = HashMap::new();
    let mut outputs: HashMap<NodeId, Value> = HashMap::new();

    for id in graph.topological_order() {
        let node = graph.node(id)?;
        let input = |slot: usize| -> Result<&Value> {
            let outlet = node.input(slot).context(InputSlotOutOfRangeSnafu { node: id, slot })?;
            values.get(&outlet).context(UnknownNodeSnafu { node: outlet.node })
        };

        let value = match node.op() {
            Op::Parameter(ty) => {
                let value =
                    bindings.get(&id).context(MissingParameterValueSnafu { node: id, name: node.name() })?;
                ensure!(value.matches_type(ty), ParameterTypeMismatchSnafu { outlet: node.output(0) });
                value.clone()
            }
            Op::Constant(value) => Value::from_constant(value)?,
            Op::Transpose => eval_transpose(input(0)?, input(1)?)?,
            Op::Concat(attrs) => {
                let parts = (0..node.inputs().len()).map(&input).collect::<Result<Vec<_>>>()?;
                eval_concat(&parts, attrs.axis)?
            }
            Op::Gather => eval_gather(input(0)?, input(1)?, input(2)?)?,
            Op::Interpolate(attrs) => eval_interpolate(attrs, input(0)?, input(1)?, input(2)?, input(3)?)?,
            Op::Result => {
                outputs.insert(id, input(0)?.clone());
                continue;
            }
        };
        values.insert(node.output(0), value);
    }

    graph
        .results()
        .iter()
        .map(|id| outputs.remove(id).context(UnknownNodeSnafu { node: *id }))
        .collect()
}

fn int_values(value: &Value, op: OpKey, slot: usize) -> Result<Vec<i64>> {
    match value {
        Value::Int(a) => Ok(a.iter().copied().collect()),
        Value::Float(_) => ExpectedIntegerInputSnafu { op, slot, actual: DType::F32 }.fail(),
    }
}

fn backend_error(op: OpKey) -> impl Fn(ndarray::ShapeError) -> Error {
    move |e| Error::EvalShape { op, message: e.to_string() }
}

fn eval_transpose(data: &Value, order: &Value) -> Result<Value> {
    let order = int_values(order, OpKey::Transpose, 1)?;
    let perm = validate_permutation(&order, data.shape().len())?;
    let permute = IxDyn(&perm);
    Ok(match data {
        Value::Int(a) => Value::Int(a.view().permuted_axes(permute).to_owned()),
        Value::Float(a) => Value::Float(a.view().permuted_axes(permute).to_owned()),
    })
}

fn eval_concat(parts: &[&Value], axis: i64) -> Result<Value> {
    let op = OpKey::Concat;
    let rank = parts[0].shape().len();
    let axis = normalize_axis(axis, rank).context(AxisOutOfRangeSnafu { op, axis, rank })?;

    if let Some(arrays) = parts.iter().map(|v| v.as_float().map(ArrayD::view)).collect::<Option<Vec<_>>>() {
        return Ok(Value::Float(ndarray::concatenate(Axis(axis), &arrays).map_err(backend_error(op))?));
    }
    if let Some(arrays) = parts.iter().map(|v| v.as_int().map(ArrayD::view)).collect::<Option<Vec<_>>>() {
        return Ok(Value::Int(ndarray::concatenate(Axis(axis), &arrays).map_err(backend_error(op))?));
    }
    UnsupportedEvalSnafu { op, reason: "inputs mix integer and float values" }.fail()
}

fn eval_gather(data: &Value, indices: &Value, axis: &Value) -> Result<Value> {
    let op = OpKey::Gather;
    let axis = *int_values(axis, op, 2)?.first().context(NonConstantInputSnafu { op, slot: 2usize })?;
    let rank = data.shape().len();
    let axis = normalize_axis(axis, rank).context(AxisOutOfRangeSnafu { op, axis, rank })?;

    let len = data.shape()[axis];
    let picks = int_values(indices, op, 1)?
        .into_iter()
        .map(|i| normalize_axis(i, len).context(AxisOutOfRangeSnafu { op, axis: i, rank: len }))
        .collect::<Result<Vec<_>>>()?;

    let mut shape = data.shape()[..axis].to_vec();
    shape.extend_from_slice(indices.shape());
    shape.extend_from_slice(&data.shape()[axis + 1..]);

    fn gather<T: Clone>(a: &ArrayD<T>, axis: usize, picks: &[usize], shape: &[usize]) -> Result<ArrayD<T>> {
        a.select(Axis(axis), picks)
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order(IxDyn(shape))
            .map_err(backend_error(OpKey::Gather))
    }

    Ok(match data {
        Value::Int(a) => Value::Int(gather(a, axis, &picks, &shape)?),
        Value::Float(a) => Value::Float(gather(a, axis, &picks, &shape)?),
    })
}

fn eval_interpolate(
    attrs: &InterpolateAttrs,
    data: &Value,
    sizes: &Value,
    scales: &Value,
    axes: &Value,
) -> Result<Value> {
    let op = OpKey::Interpolate;
    ensure!(attrs.mode == InterpolateMode::Nearest, UnsupportedEvalSnafu { op, reason: "only nearest mode" });
    let data = data.as_float().context(UnsupportedEvalSnafu { op, reason: "integer data" })?;

    let rank = data.ndim();
    for len in [attrs.pads_begin.len(), attrs.pads_end.len()] {
        ensure!(len <= rank, PaddingTooLongSnafu { len, rank });
    }
    let (begin, end) = attrs.padding_for_rank(rank);
    let padded_shape: Vec<usize> = (0..rank).map(|i| data.shape()[i] + begin[i] + end[i]).collect();
    let mut out = ArrayD::<f32>::zeros(IxDyn(&padded_shape));
    out.slice_each_axis_mut(|ax| {
        let i = ax.axis.index();
        Slice::from(begin[i]..begin[i] + data.shape()[i])
    })
    .assign(data);

    let axes = int_values(axes, op, 3)?
        .into_iter()
        .map(|axis| normalize_axis(axis, rank).context(AxisOutOfRangeSnafu { op, axis, rank }))
        .collect::<Result<Vec<_>>>()?;

    let picks_for: Box<dyn Fn(usize, usize) -> Vec<usize>> = match attrs.shape_calculation_mode {
        ShapeCalcMode::Sizes => {
            let sizes = int_values(sizes, op, 1)?;
            ensure!(
                sizes.len() == axes.len(),
                AxesLengthMismatchSnafu { op, what: "sizes", expected: axes.len(), actual: sizes.len() }
            );
            Box::new(move |k, len| {
                let target = sizes[k].max(0) as usize;
                (0..target).map(|o| (o * len / target).min(len.saturating_sub(1))).collect()
            })
        }
        ShapeCalcMode::Scales => {
            let scales: Vec<f32> = match scales {
                Value::Float(a) => a.iter().copied().collect(),
                Value::Int(a) => a.iter().map(|&s| s as f32).collect(),
            };
            ensure!(
                scales.len() == axes.len(),
                AxesLengthMismatchSnafu { op, what: "scales", expected: axes.len(), actual: scales.len() }
            );
            Box::new(move |k, len| {
                let scale = f64::from(scales[k]);
                (0..scaled_len(len, scales[k]))
                    .map(|o| ((o as f64 / scale).floor() as usize).min(len.saturating_sub(1)))
                    .collect()
            })
        }
    };

    for (k, &axis) in axes.iter().enumerate() {
        let len = out.shape()[axis];
        let picks = picks_for(k, len);
        ensure!(len > 0 || picks.is_empty(), UnsupportedEvalSnafu { op, reason: "resizing an empty axis" });
        out = out.select(Axis(axis), &picks);
    }

    Ok(Value::Float(out))
}
