//! Partial shapes.
//!
//! Shapes may have a dynamic rank or individual dynamic dimensions. Rewrites
//! that need a fixed-length permutation only fire on statically ranked
//! tensors; dimensions themselves may stay dynamic.

use std::fmt;

use itertools::Itertools;
use smallvec::SmallVec;

use crate::types::DType;

/// A single dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    Static(usize),
    Dynamic,
}

impl Dim {
    pub fn as_static(&self) -> Option<usize> {
        match self {
            Self::Static(d) => Some(*d),
            Self::Dynamic => None,
        }
    }

    /// Sum of two dimensions; dynamic if either side is.
    pub fn add(self, other: Dim) -> Dim {
        match (self, other) {
            (Self::Static(a), Self::Static(b)) => Self::Static(a + b),
            _ => Self::Dynamic,
        }
    }

    /// Check whether two dimensions may describe the same extent.
    pub fn compatible(&self, other: &Dim) -> bool {
        match (self, other) {
            (Self::Static(a), Self::Static(b)) => a == b,
            _ => true,
        }
    }
}

impl From<usize> for Dim {
    fn from(d: usize) -> Self {
        Self::Static(d)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(d) => write!(f, "{d}"),
            Self::Dynamic => f.write_str("?"),
        }
    }
}

pub type Dims = SmallVec<[Dim; 4]>;

/// Shape with possibly unknown rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartialShape {
    DynamicRank,
    Ranked(Dims),
}

impl PartialShape {
    pub fn from_static(dims: &[usize]) -> Self {
        Self::Ranked(dims.iter().copied().map(Dim::Static).collect())
    }

    pub fn scalar() -> Self {
        Self::Ranked(SmallVec::new())
    }

    /// A ranked shape with every dimension dynamic.
    pub fn dynamic_dims(rank: usize) -> Self {
        Self::Ranked(smallvec::smallvec![Dim::Dynamic; rank])
    }

    pub fn rank(&self) -> Option<usize> {
        match self {
            Self::DynamicRank => None,
            Self::Ranked(dims) => Some(dims.len()),
        }
    }

    pub fn dims(&self) -> Option<&[Dim]> {
        match self {
            Self::DynamicRank => None,
            Self::Ranked(dims) => Some(dims),
        }
    }

    /// Concrete dimensions if the shape is fully static.
    pub fn to_static(&self) -> Option<SmallVec<[usize; 4]>> {
        self.dims()?.iter().map(Dim::as_static).collect()
    }

    pub fn is_static(&self) -> bool {
        self.to_static().is_some()
    }
}

impl fmt::Display for PartialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DynamicRank => f.write_str("[...]"),
            Self::Ranked(dims) => write!(f, "[{}]", dims.iter().format(",")),
        }
    }
}

/// Element type and shape of one node output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{dtype}{shape}")]
pub struct TensorType {
    pub dtype: DType,
    pub shape: PartialShape,
}

impl TensorType {
    pub fn new(dtype: DType, shape: PartialShape) -> Self {
        Self { dtype, shape }
    }

    pub fn rank(&self) -> Option<usize> {
        self.shape.rank()
    }
}
