//! Graph rewrite engine implementation.
//!
//! # Algorithm
//!
//! Each sweep walks the live nodes in topological order. Every node is offered
//! to the rules registered for its kind; when a rule fires, the nodes it
//! created and the node itself are queued again within the same sweep so
//! chains of rewrites settle quickly. Nodes nobody consumes are skipped, and
//! dead nodes are removed at the end of every sweep.
//!
//! The driver stops after the first sweep in which no rule fired. Exceeding
//! [`RewriteConfig::max_sweeps`] (or the per-sweep budget) is reported as
//! [`Error::RewriteLimit`] instead of looping forever, logged with the
//! provenance of the last rewritten node.

use std::collections::{BTreeMap, VecDeque};

use crate::error::*;
use crate::graph::Graph;
use crate::pattern::{RewriteResult, RuleSet, TraceHook};

use super::RewriteConfig;

/// What a rewrite run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Sweeps executed, including the final quiet one.
    pub sweeps: usize,
    /// Total rule applications.
    pub rewrites: usize,
    /// Applications per rule name.
    pub per_rule: BTreeMap<&'static str, usize>,
    /// Dead nodes removed.
    pub removed: usize,
}

impl RewriteStats {
    pub fn count(&self, rule: &str) -> usize {
        self.per_rule.get(rule).copied().unwrap_or(0)
    }
}

/// Apply `rules` to `graph` until a fixpoint is reached.
pub fn graph_rewrite(graph: &mut Graph, rules: &RuleSet, config: &RewriteConfig) -> Result<RewriteStats> {
    run(graph, rules, config, None)
}

/// Like [`graph_rewrite`], reporting every rule attempt to `hook`.
pub fn graph_rewrite_traced(
    graph: &mut Graph,
    rules: &RuleSet,
    config: &RewriteConfig,
    hook: TraceHook<'_>,
) -> Result<RewriteStats> {
    run(graph, rules, config, Some(hook))
}

fn run(
    graph: &mut Graph,
    rules: &RuleSet,
    config: &RewriteConfig,
    mut hook: Option<TraceHook<'_>>,
) -> Result<RewriteStats> {
    let mut stats = RewriteStats::default();
    let mut last_rewritten = None;

    for sweep in 1..=config.max_sweeps {
        let mut queue: VecDeque<_> = graph.topological_order().into();
        let mut rewrites_this_sweep = 0usize;

        while let Some(node) = queue.pop_front() {
            if graph.is_dead(node) {
                continue;
            }

            let (rule, result) = rules.rewrite(graph, node, hook.as_deref_mut());
            let RewriteResult::Rewritten { new_nodes } = result else { continue };

            rewrites_this_sweep += 1;
            last_rewritten = Some(node);
            if rewrites_this_sweep > config.max_rewrites_per_sweep {
                let error = Error::RewriteLimit { sweeps: sweep };
                log_provenance(graph, node, &error);
                return Err(error);
            }
            if let Some(rule) = rule {
                *stats.per_rule.entry(rule).or_default() += 1;
            }
            queue.extend(new_nodes);
            queue.push_back(node);
        }

        stats.sweeps = sweep;
        stats.rewrites += rewrites_this_sweep;
        stats.removed += graph.remove_dead_nodes();
        tracing::trace!(sweep, rewrites = rewrites_this_sweep, "rewrite sweep finished");

        if rewrites_this_sweep == 0 {
            tracing::debug!(sweeps = sweep, rewrites = stats.rewrites, "rewrite reached fixpoint");
            return Ok(stats);
        }
    }

    tracing::warn!(max_sweeps = config.max_sweeps, "rewrite did not converge");
    let error = Error::RewriteLimit { sweeps: config.max_sweeps };
    if let Some(node) = last_rewritten {
        log_provenance(graph, node, &error);
    }
    Err(error)
}
