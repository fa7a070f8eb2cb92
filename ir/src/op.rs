//! Operation enum and op capabilities.
//!
//! The [`Op`] enum is closed: every operation the graph can hold is a variant.
//! Rewrites that only care about *how an op encodes axes* query one of the
//! capability traits ([`AxisBearing`], [`AxesTensorBearing`],
//! [`PaddingBearing`]) instead of matching on the concrete variant.

use std::ops::RangeInclusive;

use crate::shape::TensorType;
use crate::types::{AXIS_RESOLVED, ConcatAttrs, Constant, InterpolateAttrs};

/// Operation with its static attributes.
///
/// Inputs are not stored here; they live on the owning [`Node`](crate::Node)
/// as outlet references. Input slot conventions:
///
/// - `Transpose`: `[data, order]`
/// - `Concat`: `[inputs...]`
/// - `Gather`: `[data, indices, axis]`
/// - `Interpolate`: `[data, sizes, scales, axes]`
/// - `Result`: `[value]`
#[derive(Debug, Clone, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(name(OpKey), derive(Hash, PartialOrd, Ord, strum::AsRefStr, strum::Display))]
pub enum Op {
    Parameter(TensorType),
    Constant(Constant),
    Transpose,
    Concat(ConcatAttrs),
    Gather,
    Interpolate(InterpolateAttrs),
    Result,
}

impl Op {
    pub fn key(&self) -> OpKey {
        OpKey::from(self)
    }

    /// Accepted number of inputs.
    pub fn arity(&self) -> RangeInclusive<usize> {
        match self {
            Self::Parameter(_) | Self::Constant(_) => 0..=0,
            Self::Transpose => 2..=2,
            Self::Concat(_) => 1..=usize::MAX,
            Self::Gather => 3..=3,
            Self::Interpolate(_) => 4..=4,
            Self::Result => 1..=1,
        }
    }

    /// Number of outputs the op produces.
    pub fn num_outputs(&self) -> usize {
        match self {
            Self::Result => 0,
            _ => 1,
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Self::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_axis_bearing(&self) -> Option<&dyn AxisBearing> {
        match self {
            Self::Concat(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_axis_bearing_mut(&mut self) -> Option<&mut dyn AxisBearing> {
        match self {
            Self::Concat(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_axes_tensor_bearing(&self) -> Option<&dyn AxesTensorBearing> {
        match self {
            Self::Interpolate(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_padding_bearing(&self) -> Option<&dyn PaddingBearing> {
        match self {
            Self::Interpolate(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_padding_bearing_mut(&mut self) -> Option<&mut dyn PaddingBearing> {
        match self {
            Self::Interpolate(attrs) => Some(attrs),
            _ => None,
        }
    }
}

// =========================================================================
// Capabilities
// =========================================================================

/// An op whose axis dependence is a single scalar attribute.
pub trait AxisBearing {
    /// Axis used for inference; may be negative.
    fn axis(&self) -> i64;

    /// The axis a rewrite may relocate, or `None` while the rewrite sentinel is set.
    fn rewritable_axis(&self) -> Option<usize>;

    /// Store a relocated axis and set the sentinel so the op is not rewritten again.
    fn relocate_axis(&mut self, axis: usize);
}

impl AxisBearing for ConcatAttrs {
    fn axis(&self) -> i64 {
        self.axis
    }

    fn rewritable_axis(&self) -> Option<usize> {
        usize::try_from(self.concatenation_axis).ok()
    }

    fn relocate_axis(&mut self, axis: usize) {
        self.axis = axis as i64;
        self.concatenation_axis = AXIS_RESOLVED;
    }
}

/// An op that selects axes through a tensor-valued input.
pub trait AxesTensorBearing {
    /// Input slot carrying the tensor whose axes are selected.
    fn data_slot(&self) -> usize;

    /// Input slot carrying the axes-selection tensor.
    fn axes_slot(&self) -> usize;
}

impl AxesTensorBearing for InterpolateAttrs {
    fn data_slot(&self) -> usize {
        0
    }

    fn axes_slot(&self) -> usize {
        3
    }
}

/// An op with per-axis padding arrays.
pub trait PaddingBearing {
    fn pads_begin(&self) -> &[usize];

    fn pads_end(&self) -> &[usize];

    fn set_pads(&mut self, pads_begin: Vec<usize>, pads_end: Vec<usize>);

    fn has_padding(&self) -> bool {
        !self.pads_begin().is_empty() || !self.pads_end().is_empty()
    }
}

impl PaddingBearing for InterpolateAttrs {
    fn pads_begin(&self) -> &[usize] {
        &self.pads_begin
    }

    fn pads_end(&self) -> &[usize] {
        &self.pads_end
    }

    fn set_pads(&mut self, pads_begin: Vec<usize>, pads_end: Vec<usize>) {
        self.pads_begin = pads_begin;
        self.pads_end = pads_end;
    }
}
