//! Common imports for building and rewriting graphs.
//!
//! ```rust,ignore
//! use axion_ir::prelude::*;
//! ```

pub use crate::graph::{Graph, InletId, NodeId, OutletId, SinkingMark};
pub use crate::op::{Op, OpKey};
pub use crate::pattern::{RewriteResult, RewriteRule, RuleSet};
pub use crate::shape::{Dim, PartialShape, TensorType};
pub use crate::types::{ConcatAttrs, Constant, DType, InterpolateAttrs, InterpolateMode, ShapeCalcMode};
pub use crate::{Error, Result};
