//! Fundamental value and attribute types.
//!
//! Element types, constant payloads and the attribute records carried by the
//! structural operations (Concat, Interpolate).

use smallvec::SmallVec;

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[derive(strum::AsRefStr)]
pub enum DType {
    #[display("i32")]
    I32,
    #[display("i64")]
    I64,
    #[display("f32")]
    F32,
}

impl DType {
    /// Check if this is an integer type.
    pub fn is_int(&self) -> bool {
        matches!(self, Self::I32 | Self::I64)
    }
}

/// Constant element payload.
///
/// Integer element types share the `Int` storage; the owning [`Constant`]
/// carries the declared dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstData {
    Int(Vec<i64>),
    Float(Vec<f32>),
}

impl ConstData {
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer view of the payload, `None` for float payloads.
    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Self::Int(v) => Some(v),
            Self::Float(_) => None,
        }
    }

    /// Float view of the payload. Integer payloads are converted.
    pub fn to_floats(&self) -> Vec<f32> {
        match self {
            Self::Int(v) => v.iter().map(|&x| x as f32).collect(),
            Self::Float(v) => v.clone(),
        }
    }
}

/// A constant tensor: dtype, static shape and row-major payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub dtype: DType,
    pub shape: SmallVec<[usize; 4]>,
    pub data: ConstData,
}

impl Constant {
    /// 1-D integer constant.
    pub fn ints(dtype: DType, values: impl IntoIterator<Item = i64>) -> Self {
        let values: Vec<i64> = values.into_iter().collect();
        Self { dtype, shape: SmallVec::from_slice(&[values.len()]), data: ConstData::Int(values) }
    }

    /// Integer scalar constant (rank 0).
    pub fn int_scalar(dtype: DType, value: i64) -> Self {
        Self { dtype, shape: SmallVec::new(), data: ConstData::Int(vec![value]) }
    }

    /// 1-D float constant.
    pub fn floats(values: impl IntoIterator<Item = f32>) -> Self {
        let values: Vec<f32> = values.into_iter().collect();
        Self { dtype: DType::F32, shape: SmallVec::from_slice(&[values.len()]), data: ConstData::Float(values) }
    }

    /// Number of elements implied by the shape.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Value of `ConcatAttrs::concatenation_axis` once the axis has been
/// relocated by a rewrite.
pub const AXIS_RESOLVED: i64 = -1;

/// Concat attributes.
///
/// `axis` is what shape inference and evaluation use (negative values count
/// from the end). `concatenation_axis` is the copy visible to rewrites; a
/// negative value means the axis is unresolved or has already been relocated
/// and the node must not be rewritten again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatAttrs {
    pub axis: i64,
    pub concatenation_axis: i64,
}

impl ConcatAttrs {
    pub fn new(axis: i64) -> Self {
        Self { axis, concatenation_axis: axis }
    }
}

/// Interpolation kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum InterpolateMode {
    #[default]
    Nearest,
    Linear,
    LinearOnnx,
    Cubic,
}

/// How output sizes are derived for the interpolated axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum ShapeCalcMode {
    /// Target sizes come from the `sizes` input.
    #[default]
    Sizes,
    /// Target sizes are `floor(padded_dim * scale)` with scales from the `scales` input.
    Scales,
}

/// Interpolate attributes.
///
/// Padding slots are indexed by the data tensor's axis numbering. Shorter
/// padding vectors are zero-extended to the data rank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpolateAttrs {
    pub mode: InterpolateMode,
    pub shape_calculation_mode: ShapeCalcMode,
    pub pads_begin: Vec<usize>,
    pub pads_end: Vec<usize>,
}

impl InterpolateAttrs {
    pub fn new(mode: InterpolateMode, shape_calculation_mode: ShapeCalcMode) -> Self {
        Self { mode, shape_calculation_mode, ..Default::default() }
    }

    pub fn with_pads(mut self, pads_begin: Vec<usize>, pads_end: Vec<usize>) -> Self {
        self.pads_begin = pads_begin;
        self.pads_end = pads_end;
        self
    }

    /// Padding for `rank` axes, zero-extended.
    pub fn padding_for_rank(&self, rank: usize) -> (Vec<usize>, Vec<usize>) {
        let extend = |pads: &[usize]| (0..rank).map(|i| pads.get(i).copied().unwrap_or(0)).collect();
        (extend(&self.pads_begin), extend(&self.pads_end))
    }
}
