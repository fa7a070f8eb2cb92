//! Intermediate Representation (IR) for the Axion tensor compiler.
//!
//! This crate defines the mutable tensor-operation graph that graph-level
//! optimization passes rewrite, together with shape inference, a reference
//! evaluator and the rewrite driver.
//!
//! # Module Organization
//!
//! - [`types`] - Element types, constants and op attribute records
//! - [`shape`] - Partial shapes and tensor types
//! - [`op`] - Operation enum and op capability traits
//! - [`graph`] - Arena graph, transactions and node builders
//! - [`infer`] - Validation, shape inference and constant folding
//! - [`eval`] - Reference evaluator on `ndarray` values
//! - [`pattern`] - Rewrite rules and the rule registry
//! - [`rewrite`] - Fixed-point rewrite driver
//! - [`provenance`] - Node history for diagnostics
//! - [`error`] - Error types and result handling

pub mod error;
pub mod eval;
pub mod graph;
pub mod infer;
pub mod op;
pub mod pattern;
pub mod prelude;
pub mod provenance;
pub mod rewrite;
pub mod shape;
pub mod types;


pub use error::{Error, Result};
pub use graph::{Graph, InletId, Node, NodeExt, NodeId, NodeSummary, OutletId, SinkingMark};
pub use op::{AxesTensorBearing, AxisBearing, Op, OpKey, PaddingBearing};
pub use shape::{Dim, PartialShape, TensorType};
pub use types::{
    AXIS_RESOLVED, ConcatAttrs, ConstData, Constant, DType, InterpolateAttrs, InterpolateMode, ShapeCalcMode,
};

pub use pattern::{RewriteResult, RewriteRule, RuleSet, TraceEvent, TraceHook};
pub use rewrite::{RewriteConfig, RewriteStats, graph_rewrite, graph_rewrite_traced};
