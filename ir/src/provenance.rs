//! Provenance tracking for graph nodes.
//!
//! Each node carries a short list of provenance events in its extension
//! record describing:
//! - Where it was created (source location of the builder call)
//! - Which rewrite pass created it and from which node
//!
//! Events live on the node, so they disappear together with it when dead
//! nodes are swept. Chains are followed through `Transformed` links for as
//! long as the referenced nodes are still alive.

use std::{
    borrow::Cow,
    collections::HashSet,
    panic::Location,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use derive_more::Display;

use crate::graph::{Graph, NodeId};

/// Source code location with workspace-relative paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{file}:{line}:{column}")]
pub struct SourceLocation<'i> {
    /// Path relative to workspace root (e.g., "transforms/src/lib.rs")
    pub file: Cow<'i, str>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation<'static> {
    #[cfg(test)]
    pub(crate) fn new<F: Into<String>>(file: F, line: u32, column: u32) -> Self {
        Self { file: Cow::Owned(file.into()), line, column }
    }

    /// Create a SourceLocation from a panic::Location, converting to workspace-relative path.
    pub fn from_caller(loc: &'static Location<'static>) -> Self {
        Self { file: Cow::Borrowed(get_relative_location(loc)), line: loc.line(), column: loc.column() }
    }
}

/// Rewrite pass name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PassName {
    #[display("transpose_sinking_concat_forward")]
    TransposeSinkingConcatForward,
    #[display("transpose_sinking_concat_backward")]
    TransposeSinkingConcatBackward,
    #[display("transpose_sinking_interpolate_forward")]
    TransposeSinkingInterpolateForward,
    #[display("transpose_sinking_interpolate_backward")]
    TransposeSinkingInterpolateBackward,
    #[display("transpose_fuse")]
    TransposeFuse,
    /// Generic pattern-based graph rewriting
    #[display("rewrite_pattern")]
    RewritePattern,
}

/// Individual provenance event in a node's history.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ProvenanceEvent {
    /// Node was created at this source location
    #[display("Created at {location}")]
    Created { location: SourceLocation<'static> },

    /// Node was created by a rewrite of another node
    #[display("Transformed from node {from} by {pass_name}")]
    Transformed { from: NodeId, pass_name: PassName },
}

/// A chain of provenance events representing a node's history.
pub type ProvenanceChain = Vec<ProvenanceEvent>;

impl Graph {
    /// Full provenance chain of a node, ancestors first.
    pub fn provenance_chain(&self, node: NodeId) -> ProvenanceChain {
        let mut chain = Vec::new();
        self.collect_chain_recursive(node, &mut chain, &mut HashSet::new());
        chain
    }

    fn collect_chain_recursive(&self, node: NodeId, chain: &mut ProvenanceChain, visited: &mut HashSet<NodeId>) {
        if !visited.insert(node) {
            return;
        }

        let Some(n) = self.try_node(node) else { return };
        for event in &n.ext().provenance {
            if let ProvenanceEvent::Transformed { from, .. } = event {
                self.collect_chain_recursive(*from, chain, visited);
            }
        }
        chain.extend(n.ext().provenance.iter().cloned());
    }
}

/// Get the workspace root path, computed from CARGO_MANIFEST_DIR at compile time.
///
/// For workspace member crates (like "ir"), CARGO_MANIFEST_DIR points to the crate directory.
/// The workspace root is its parent.
fn workspace_root() -> &'static Path {
    static ROOT: OnceLock<PathBuf> = OnceLock::new();
    ROOT.get_or_init(|| {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");
        let path = Path::new(manifest_dir);
        path.parent().map(|p| p.to_path_buf()).unwrap_or_else(|| PathBuf::from(manifest_dir))
    })
    .as_path()
}

/// Get a location string relative to the workspace root.
///
/// Falls back to the full path if prefix stripping fails.
pub(crate) fn get_relative_location(loc: &'static Location<'static>) -> &'static str {
    let file = loc.file();
    let Some(root) = workspace_root().to_str() else { return file };

    if let Some(stripped) = file.strip_prefix(root) {
        stripped.strip_prefix('/').or_else(|| stripped.strip_prefix('\\')).unwrap_or(stripped)
    } else {
        file
    }
}

/// Format a provenance chain for display.
pub fn format_chain(chain: &ProvenanceChain) -> String {
    let mut output = String::new();

    for (i, event) in chain.iter().enumerate() {
        output.push_str(&format!("\n  [{}] {}", i, event));
    }

    output
}
