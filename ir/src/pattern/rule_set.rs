//! Rule registry with OpKey-based dispatch.
//!
//! Rules are stored in a `HashMap<OpKey, Vec<Arc<dyn RewriteRule>>>`; a rule
//! rooted at several kinds is shared between the entries. Rules without keys
//! are wildcards and are tried after the indexed ones.

use std::collections::HashMap;
use std::sync::Arc;

use crate::graph::{Graph, NodeId};
use crate::op::OpKey;

use super::{RewriteResult, RewriteRule, TraceEvent};

#[derive(Default, Clone)]
pub struct RuleSet {
    indexed: HashMap<OpKey, Vec<Arc<dyn RewriteRule>>>,
    wildcards: Vec<Arc<dyn RewriteRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under each of its keys.
    pub fn add(&mut self, rule: impl RewriteRule + 'static) -> &mut Self {
        let rule: Arc<dyn RewriteRule> = Arc::new(rule);
        if rule.keys().is_empty() {
            self.wildcards.push(rule);
        } else {
            for key in rule.keys() {
                self.indexed.entry(*key).or_default().push(Arc::clone(&rule));
            }
        }
        self
    }

    pub fn with(mut self, rule: impl RewriteRule + 'static) -> Self {
        self.add(rule);
        self
    }

    /// Number of registrations (a multi-key rule counts once per key).
    pub fn len(&self) -> usize {
        self.indexed.values().map(Vec::len).sum::<usize>() + self.wildcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.wildcards.is_empty()
    }

    /// Try the rules registered for `node`'s kind, then the wildcards.
    ///
    /// The first rule that rewrites wins. `hook` sees every attempt.
    pub fn rewrite(
        &self,
        graph: &mut Graph,
        node: NodeId,
        mut hook: Option<&mut (dyn FnMut(&TraceEvent) + '_)>,
    ) -> (Option<&'static str>, RewriteResult) {
        let Some(key) = graph.op(node).map(|op| op.key()) else {
            return (None, RewriteResult::NoMatch);
        };
        let indexed = self.indexed.get(&key).map(Vec::as_slice).unwrap_or_default();
        tracing::trace!(op_key = %key, node = %node, rule_count = indexed.len(), "trying indexed rules");

        for rule in indexed.iter().chain(&self.wildcards) {
            let name = rule.name();
            if let Some(hook) = hook.as_mut() {
                hook(&TraceEvent::RuleEnter { rule: name, node });
            }

            let result = if rule.matches(graph, node) { rule.apply(graph, node) } else { RewriteResult::NoMatch };
            let applied = result.is_rewritten();

            if let Some(hook) = hook.as_mut() {
                hook(&TraceEvent::RuleExit { rule: name, node, applied });
            }
            if applied {
                tracing::debug!(rule = name, op_key = %key, node = %node, "rule applied");
                return (Some(name), result);
            }
        }

        (None, RewriteResult::NoMatch)
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.indexed.values().flatten().chain(&self.wildcards).map(|r| r.name()).collect();
        names.sort_unstable();
        names.dedup();
        f.debug_struct("RuleSet").field("rules", &names).finish()
    }
}
