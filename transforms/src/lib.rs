//! Graph-level transformations for the Axion tensor compiler.
//!
//! # Passes
//!
//! - [`transpose_sinking`] - Moves layout transposes through Concat and
//!   Interpolate so that adjacent transposes can cancel.

pub mod transpose_sinking;


pub use transpose_sinking::{SinkingConfig, SinkingStats, TransposeSinking};
