//! Transpose sinking.
//!
//! Layout transposes inserted by frontends often sit between structural ops
//! that do not care about layout. Sinking moves them past such ops, adjusting
//! the ops' axis attributes or axis inputs, until adjacent transposes meet and
//! cancel.
//!
//! # Rules
//!
//! - [`ConcatForward`] / [`ConcatBackward`] - relocate the concatenation axis
//! - [`InterpolateForward`] / [`InterpolateBackward`] - remap the axes input
//!   through a Gather and re-index padding
//! - [`TransposeFuse`] - merge adjacent transposes
//!
//! Every rule pre-checks its match without touching the graph and then stages
//! all mutations in one [`Graph::transaction`]; a rule either rewrites fully or
//! leaves the graph unchanged.
//!
//! # Termination
//!
//! [`TransposeSinking`] runs the forward group to a fixpoint, then the backward
//! group. A rewritten Concat carries the resolved-axis sentinel and is never
//! rewritten again. A transpose that forward sinking leaves in front of a
//! consumer it cannot pass is marked [`SinkingMark::Blocked`](axion_ir::SinkingMark::Blocked), and backward
//! rules only absorb [`SinkingMark::Eligible`](axion_ir::SinkingMark::Eligible) transposes, so the two groups
//! cannot undo each other.

pub mod bookkeeping;
pub mod concat;
pub mod config;
pub mod fuse;
pub mod interpolate;
pub mod permutation;
pub mod predicates;

use axion_ir::error::Result;
use axion_ir::provenance::PassName;
use axion_ir::rewrite::{RewriteConfig, RewriteStats, graph_rewrite};
use axion_ir::{Graph, NodeId, RewriteResult, RuleSet};

pub use bookkeeping::TransposeInputsInfo;
pub use concat::{ConcatBackward, ConcatForward};
pub use config::SinkingConfig;
pub use fuse::TransposeFuse;
pub use interpolate::{InterpolateBackward, InterpolateForward};
pub use permutation::AxisOrder;

/// Turn a staged rewrite into a rule outcome.
///
/// A failed rewrite has already been rolled back by its transaction.
pub(crate) fn commit(rule: &'static str, node: NodeId, outcome: Result<bookkeeping::NewNodes>) -> RewriteResult {
    match outcome {
        Ok(new_nodes) => RewriteResult::Rewritten { new_nodes },
        Err(error) => {
            tracing::debug!(rule, node = %node, %error, "staged rewrite rejected");
            RewriteResult::NoMatch
        }
    }
}

pub(crate) fn record_new_nodes(graph: &mut Graph, new_nodes: &[NodeId], from: NodeId, pass: PassName) -> Result<()> {
    for &id in new_nodes {
        graph.record_transform(id, from, pass)?;
    }
    Ok(())
}

/// What a [`TransposeSinking`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkingStats {
    pub forward: RewriteStats,
    pub backward: RewriteStats,
    /// Dead nodes removed by the final sweep.
    pub removed: usize,
}

impl SinkingStats {
    pub fn total_rewrites(&self) -> usize {
        self.forward.rewrites + self.backward.rewrites
    }

    /// Applications of `rule` across both groups.
    pub fn count(&self, rule: &str) -> usize {
        self.forward.count(rule) + self.backward.count(rule)
    }
}

/// The transpose sinking pass.
#[derive(Debug, Clone, Default)]
pub struct TransposeSinking {
    config: SinkingConfig,
}

impl TransposeSinking {
    pub fn new(config: SinkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SinkingConfig {
        &self.config
    }

    /// Rules that push transposes toward the graph outputs.
    pub fn forward_rules(&self) -> RuleSet {
        let mut rules = RuleSet::new().with(ConcatForward).with(InterpolateForward);
        if self.config.fuse {
            rules.add(TransposeFuse);
        }
        rules
    }

    /// Rules that pull transposes toward the graph inputs.
    pub fn backward_rules(&self) -> RuleSet {
        let mut rules = RuleSet::new().with(ConcatBackward).with(InterpolateBackward);
        if self.config.fuse {
            rules.add(TransposeFuse);
        }
        rules
    }

    /// Run the enabled groups to their fixpoints, then sweep dead nodes.
    #[tracing::instrument(skip_all, fields(nodes = graph.len()))]
    pub fn run(&self, graph: &mut Graph) -> Result<SinkingStats> {
        let mut stats = SinkingStats::default();
        if self.config.is_disabled() {
            tracing::debug!("transpose sinking disabled");
            return Ok(stats);
        }

        let rewrite = RewriteConfig::builder().max_sweeps(self.config.max_sweeps).build();
        if self.config.forward {
            stats.forward = graph_rewrite(graph, &self.forward_rules(), &rewrite)?;
        }
        if self.config.backward {
            stats.backward = graph_rewrite(graph, &self.backward_rules(), &rewrite)?;
        }
        stats.removed = graph.remove_dead_nodes();

        tracing::debug!(
            forward = stats.forward.rewrites,
            backward = stats.backward.rewrites,
            removed = stats.removed,
            "transpose sinking finished"
        );
        Ok(stats)
    }
}
