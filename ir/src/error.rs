use smallvec::SmallVec;
use snafu::Snafu;

use crate::graph::{Graph, NodeId, OutletId};
use crate::op::OpKey;
use crate::shape::{Dim, PartialShape};
use crate::types::DType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Node id does not refer to a live node.
    #[snafu(display("unknown node {node}"))]
    UnknownNode { node: NodeId },

    /// Output slot does not exist on the producer.
    #[snafu(display("node {node} has no output slot {slot}"))]
    OutputSlotOutOfRange { node: NodeId, slot: usize },

    /// Input slot does not exist on the consumer.
    #[snafu(display("node {node} has no input slot {slot}"))]
    InputSlotOutOfRange { node: NodeId, slot: usize },

    /// Wrong number of inputs for an op.
    #[snafu(display("{op} expects {expected} inputs, got {actual}"))]
    ArityMismatch { op: OpKey, expected: String, actual: usize },

    /// Inputs that must share an element type do not.
    #[snafu(display("dtype mismatch in {op}: {lhs} vs {rhs}"))]
    DTypeMismatch { op: OpKey, lhs: DType, rhs: DType },

    /// Input must have an integer element type.
    #[snafu(display("{op} input {slot} must be an integer tensor, got {actual}"))]
    ExpectedIntegerInput { op: OpKey, slot: usize, actual: DType },

    /// Ranks that must agree do not.
    #[snafu(display("rank mismatch in {op}: expected {expected}, got {actual}"))]
    RankMismatch { op: OpKey, expected: usize, actual: usize },

    /// Transpose order is not a permutation of `0..rank`.
    #[snafu(display("invalid permutation {order:?}: expected permutation of 0..{rank}"))]
    InvalidPermutation { order: Vec<i64>, rank: usize },

    /// Axis attribute or axis value outside `[-rank, rank)`.
    #[snafu(display("axis {axis} is out of range for rank {rank} in {op}"))]
    AxisOutOfRange { op: OpKey, axis: i64, rank: usize },

    /// Non-concatenated dimensions disagree.
    #[snafu(display("dimension mismatch in {op} at axis {axis}: {lhs} vs {rhs}"))]
    DimensionMismatch { op: OpKey, axis: usize, lhs: Dim, rhs: Dim },

    /// Constant payload does not match its declared shape or dtype.
    #[snafu(display("malformed constant: shape {shape:?} holds {expected} elements, payload has {actual}"))]
    MalformedConstant { shape: SmallVec<[usize; 4]>, expected: usize, actual: usize },

    /// An input that must be a compile-time constant is not.
    #[snafu(display("{op} requires input {slot} to be constant"))]
    NonConstantInput { op: OpKey, slot: usize },

    /// Padding array longer than the data rank.
    #[snafu(display("padding of length {len} exceeds rank {rank}"))]
    PaddingTooLong { len: usize, rank: usize },

    /// Sizes/scales/axes inputs of different lengths.
    #[snafu(display("{op}: {what} has {actual} entries but axes has {expected}"))]
    AxesLengthMismatch { op: OpKey, what: &'static str, expected: usize, actual: usize },

    /// Evaluation needs a statically ranked input.
    #[snafu(display("{op} needs a static shape, got {shape}"))]
    DynamicShape { op: OpKey, shape: PartialShape },

    /// Evaluation is not implemented for this op/configuration.
    #[snafu(display("evaluation of {op} is not supported: {reason}"))]
    UnsupportedEval { op: OpKey, reason: &'static str },

    /// The array backend rejected an operation.
    #[snafu(display("evaluating {op} failed: {message}"))]
    EvalShape { op: OpKey, message: String },

    /// A parameter was not bound before evaluation.
    #[snafu(display("no value bound for parameter {name} ({node})"))]
    MissingParameterValue { node: NodeId, name: String },

    /// Bound value does not match the parameter's declared type.
    #[snafu(display("value bound to {outlet} does not match its declared type"))]
    ParameterTypeMismatch { outlet: OutletId },

    /// Rewriting did not reach a fixpoint.
    #[snafu(display("rewrite did not converge after {sweeps} sweeps"))]
    RewriteLimit { sweeps: usize },
}

/// Log an error together with the provenance chain of the node it concerns.
pub fn log_provenance(graph: &Graph, node: NodeId, error: &Error) {
    use crate::provenance::format_chain;

    let chain = graph.provenance_chain(node);
    if !chain.is_empty() {
        tracing::error!(
            node.id = %node,
            error = %error,
            provenance_chain = %format_chain(&chain),
            "graph error with provenance"
        );
    }
}
