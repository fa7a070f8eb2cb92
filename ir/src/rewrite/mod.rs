//! Graph rewrite driver with fixed-point sweeps.
//!
//! This module applies a [`RuleSet`](crate::pattern::RuleSet) to a graph until
//! no rule fires.

pub mod config;
pub mod engine;

pub use config::RewriteConfig;
pub use engine::{RewriteStats, graph_rewrite, graph_rewrite_traced};
