//! Rewrite rules and their registry.
//!
//! A rewrite rule is rooted at one node kind. The registry ([`RuleSet`])
//! indexes rules by [`OpKey`] so the driver only tries rules that can fire on
//! the node at hand.

pub mod helpers;
pub mod rule_set;

use smallvec::SmallVec;

use crate::graph::{Graph, NodeId};
use crate::op::OpKey;

/// Result of applying a rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteResult {
    /// Rule didn't match or declined to rewrite; the graph is untouched.
    NoMatch,
    /// Rule rewrote the graph and created `new_nodes`.
    Rewritten { new_nodes: SmallVec<[NodeId; 4]> },
}

impl RewriteResult {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, Self::Rewritten { .. })
    }
}

/// A local graph rewrite rooted at one node.
///
/// `matches` is a read-only pre-check. `apply` may assume it returned `true`
/// but must still leave the graph untouched when it returns
/// [`RewriteResult::NoMatch`].
pub trait RewriteRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Node kinds this rule can be rooted at. Empty means every kind.
    fn keys(&self) -> &'static [OpKey];

    fn matches(&self, graph: &Graph, node: NodeId) -> bool;

    fn apply(&self, graph: &mut Graph, node: NodeId) -> RewriteResult;
}

/// Observation point around each rule attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    RuleEnter { rule: &'static str, node: NodeId },
    RuleExit { rule: &'static str, node: NodeId, applied: bool },
}

/// Host callback receiving [`TraceEvent`]s.
pub type TraceHook<'a> = &'a mut dyn FnMut(&TraceEvent);

pub use helpers::{const_ints, transpose_order};
pub use rule_set::RuleSet;
