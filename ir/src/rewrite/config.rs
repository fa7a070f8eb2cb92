//! Rewrite driver configuration with bon builders and environment fallbacks.

use bon::bon;

/// Limits for [`graph_rewrite`](super::graph_rewrite).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteConfig {
    /// Maximum number of full sweeps before giving up.
    pub max_sweeps: usize,
    /// Maximum number of rule applications within a single sweep.
    pub max_rewrites_per_sweep: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self { max_sweeps: 64, max_rewrites_per_sweep: 100_000 }
    }
}

#[bon]
impl RewriteConfig {
    /// Create a rewrite configuration with builder pattern.
    ///
    /// A zero limit falls back to its default, as in [`from_env`](Self::from_env).
    #[builder]
    pub fn new(
        #[builder(default = 64)] max_sweeps: usize,
        #[builder(default = 100_000)] max_rewrites_per_sweep: usize,
    ) -> Self {
        let defaults = Self::default();
        Self {
            max_sweeps: nonzero_or(max_sweeps, defaults.max_sweeps),
            max_rewrites_per_sweep: nonzero_or(max_rewrites_per_sweep, defaults.max_rewrites_per_sweep),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `AXION_REWRITE_MAX_SWEEPS` - Sweep limit (default: 64)
    /// * `AXION_REWRITE_MAX_PER_SWEEP` - Rule applications per sweep (default: 100000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// Values that are missing, unparsable or zero keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_sweeps: positive_var(&lookup, "AXION_REWRITE_MAX_SWEEPS").unwrap_or(defaults.max_sweeps),
            max_rewrites_per_sweep: positive_var(&lookup, "AXION_REWRITE_MAX_PER_SWEEP")
                .unwrap_or(defaults.max_rewrites_per_sweep),
        }
    }
}

fn positive_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    lookup(key).and_then(|s| s.trim().parse().ok()).filter(|&n| n > 0)
}

fn nonzero_or(value: usize, default: usize) -> usize {
    if value == 0 { default } else { value }
}
