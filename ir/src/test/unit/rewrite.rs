//! Unit tests for the rule registry and the fixpoint driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use smallvec::smallvec;
use test_case::test_case;

use crate::error::Error;
use crate::graph::{Graph, NodeId};
use crate::op::OpKey;
use crate::pattern::{RewriteResult, RewriteRule, RuleSet, TraceEvent, transpose_order};
use crate::rewrite::{RewriteConfig, graph_rewrite, graph_rewrite_traced};
use crate::shape::PartialShape;
use crate::types::DType;

/// Removes transposes by the identity permutation.
struct DropIdentityTranspose;

impl RewriteRule for DropIdentityTranspose {
    fn name(&self) -> &'static str {
        "drop_identity_transpose"
    }

    fn keys(&self) -> &'static [OpKey] {
        &[OpKey::Transpose]
    }

    fn matches(&self, graph: &Graph, node: NodeId) -> bool {
        transpose_order(graph, node).is_some_and(|p| p.iter().enumerate().all(|(i, &a)| i == a))
    }

    fn apply(&self, graph: &mut Graph, node: NodeId) -> RewriteResult {
        let Some(data) = graph.source(crate::InletId::new(node, 0)) else { return RewriteResult::NoMatch };
        match graph.replace_uses(node.into(), data) {
            Ok(()) => RewriteResult::Rewritten { new_nodes: smallvec![] },
            Err(_) => RewriteResult::NoMatch,
        }
    }
}

/// Always wraps its root in another identity transpose.
struct Diverge(Arc<AtomicUsize>);

impl RewriteRule for Diverge {
    fn name(&self) -> &'static str {
        "diverge"
    }

    fn keys(&self) -> &'static [OpKey] {
        &[OpKey::Parameter]
    }

    fn matches(&self, _graph: &Graph, _node: NodeId) -> bool {
        true
    }

    fn apply(&self, graph: &mut Graph, node: NodeId) -> RewriteResult {
        self.0.fetch_add(1, Ordering::Relaxed);
        let rank = graph.outlet_type(node.into()).ok().and_then(|t| t.rank()).unwrap_or(0);
        let order: Vec<usize> = (0..rank).collect();
        let consumers = graph.consumers(node.into()).to_vec();
        let Ok(t) = graph.transpose_by(node.into(), &order) else { return RewriteResult::NoMatch };
        for inlet in consumers {
            if graph.set_input(inlet, t).is_err() {
                return RewriteResult::NoMatch;
            }
        }
        RewriteResult::Rewritten { new_nodes: smallvec![t.node] }
    }
}

fn chain_of_identities(n: usize) -> (Graph, crate::OutletId) {
    let mut g = Graph::new();
    let x = g.parameter("x", DType::F32, PartialShape::from_static(&[2, 3])).unwrap();
    let mut cur = x;
    for _ in 0..n {
        cur = g.transpose_by(cur, &[0, 1]).unwrap();
    }
    g.result(cur).unwrap();
    (g, x)
}

#[test]
fn test_rewrite_reaches_fixpoint() {
    let (mut g, x) = chain_of_identities(3);
    let rules = RuleSet::new().with(DropIdentityTranspose);

    let stats = graph_rewrite(&mut g, &rules, &RewriteConfig::default()).unwrap();

    assert_eq!(stats.count("drop_identity_transpose"), 3);
    assert_eq!(g.count(OpKey::Transpose), 0);
    assert_eq!(g.consumers(x).len(), 1);
    assert!(stats.removed >= 6, "transposes and order constants are swept");
}

#[test]
fn test_empty_rule_set_is_a_noop() {
    let (mut g, _) = chain_of_identities(2);

    let stats = graph_rewrite(&mut g, &RuleSet::new(), &RewriteConfig::default()).unwrap();

    assert_eq!(stats.rewrites, 0);
    assert_eq!(stats.sweeps, 1);
    assert_eq!(g.count(OpKey::Transpose), 2);
}

#[test]
fn test_divergent_rules_hit_the_limit() {
    let (mut g, _) = chain_of_identities(0);
    let calls = Arc::new(AtomicUsize::new(0));
    let rules = RuleSet::new().with(Diverge(calls.clone()));
    let config = RewriteConfig::builder().max_sweeps(3).max_rewrites_per_sweep(10).build();

    let err = graph_rewrite(&mut g, &rules, &config).unwrap_err();

    assert!(matches!(err, Error::RewriteLimit { .. }));
    assert!(calls.load(Ordering::Relaxed) >= 10);
}

#[test]
fn test_trace_hook_sees_enter_and_exit() {
    let (mut g, _) = chain_of_identities(1);
    let rules = RuleSet::new().with(DropIdentityTranspose);
    let mut events = Vec::new();

    graph_rewrite_traced(&mut g, &rules, &RewriteConfig::default(), &mut |e: &TraceEvent| events.push(*e)).unwrap();

    let applied = events.iter().filter(|e| matches!(e, TraceEvent::RuleExit { applied: true, .. })).count();
    let enters = events.iter().filter(|e| matches!(e, TraceEvent::RuleEnter { .. })).count();
    assert_eq!(applied, 1);
    assert_eq!(enters, events.len() / 2);
}

#[test]
fn test_rule_set_registration() {
    let rules = RuleSet::new().with(DropIdentityTranspose).with(Diverge(Arc::default()));

    assert_eq!(rules.len(), 2);
    assert!(!rules.is_empty());
    assert!(RuleSet::new().is_empty());
}

#[test]
fn test_config_defaults() {
    let config = RewriteConfig::builder().build();

    assert_eq!(config, RewriteConfig::default());
    assert_eq!(config.max_sweeps, 64);
}

#[test]
fn test_sweep_limit_reports_last_sweep() {
    let (mut g, _) = chain_of_identities(3);
    let rules = RuleSet::new().with(DropIdentityTranspose);
    let config = RewriteConfig::builder().max_sweeps(1).build();

    let err = graph_rewrite(&mut g, &rules, &config).unwrap_err();

    assert_eq!(err, Error::RewriteLimit { sweeps: 1 });
}

#[test]
fn test_zero_limits_keep_defaults() {
    let config = RewriteConfig::builder().max_sweeps(0).max_rewrites_per_sweep(0).build();
    assert_eq!(config, RewriteConfig::default());
}

#[test_case(&[] => (64, 100_000); "nothing set")]
#[test_case(&[("AXION_REWRITE_MAX_SWEEPS", "8")] => (8, 100_000); "sweeps")]
#[test_case(&[("AXION_REWRITE_MAX_PER_SWEEP", " 50 ")] => (64, 50); "per sweep trimmed")]
#[test_case(&[("AXION_REWRITE_MAX_SWEEPS", "0")] => (64, 100_000); "zero ignored")]
#[test_case(&[("AXION_REWRITE_MAX_SWEEPS", "-3")] => (64, 100_000); "negative ignored")]
#[test_case(&[("AXION_REWRITE_MAX_SWEEPS", "lots")] => (64, 100_000); "garbage ignored")]
fn test_config_from_lookup(vars: &'static [(&'static str, &'static str)]) -> (usize, usize) {
    let config =
        RewriteConfig::from_lookup(|key| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string()));
    (config.max_sweeps, config.max_rewrites_per_sweep)
}
