//! Transpose sinking configuration.
//!
//! Provides typed configuration with bon builders and environment variable
//! fallbacks.

use axion_ir::RewriteConfig;
use bon::bon;

/// Which parts of the pass run, and how long the driver may iterate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkingConfig {
    /// Run the forward group (push transposes toward the outputs).
    pub forward: bool,
    /// Run the backward group (pull transposes toward the inputs).
    pub backward: bool,
    /// Register adjacent-transpose fusion in both groups.
    pub fuse: bool,
    /// Sweep limit for each group.
    pub max_sweeps: usize,
}

impl Default for SinkingConfig {
    fn default() -> Self {
        Self { forward: true, backward: true, fuse: true, max_sweeps: 64 }
    }
}

#[bon]
impl SinkingConfig {
    /// Create a sinking configuration with builder pattern.
    ///
    /// `max_sweeps(0)` keeps the default limit.
    #[builder]
    pub fn new(
        #[builder(default = true)] forward: bool,
        #[builder(default = true)] backward: bool,
        #[builder(default = true)] fuse: bool,
        #[builder(default = 64)] max_sweeps: usize,
    ) -> Self {
        let max_sweeps = RewriteConfig::builder().max_sweeps(max_sweeps).build().max_sweeps;
        Self { forward, backward, fuse, max_sweeps }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `AXION_NO_TRANSPOSE_SINKING` - Disable both directions if set
    /// * `AXION_NO_BACKWARD_SINKING` - Disable the backward group if set
    /// * `AXION_NO_TRANSPOSE_FUSE` - Disable transpose fusion if set
    /// * `AXION_REWRITE_MAX_SWEEPS` - Sweep limit per group (default: 64)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let disabled = lookup("AXION_NO_TRANSPOSE_SINKING").is_some();
        let no_backward = lookup("AXION_NO_BACKWARD_SINKING").is_some();
        let fuse = lookup("AXION_NO_TRANSPOSE_FUSE").is_none();
        let max_sweeps = RewriteConfig::from_lookup(&lookup).max_sweeps;

        Self { forward: !disabled, backward: !disabled && !no_backward, fuse, max_sweeps }
    }

    /// Check if the pass does anything at all.
    pub fn is_disabled(&self) -> bool {
        !self.forward && !self.backward
    }
}
