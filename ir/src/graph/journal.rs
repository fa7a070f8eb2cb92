//! Undo journal for atomic rewrites.
//!
//! Each journaled primitive in [`Graph`] pushes the inverse of what it did.
//! [`Graph::transaction`] replays the inverses in LIFO order when the closure
//! fails, leaving the graph exactly as it was before the closure ran.

use smallvec::SmallVec;

use crate::error::Result;
use crate::op::Op;
use crate::shape::TensorType;

use super::{Graph, InletId, NodeExt, NodeId, OutletId};

#[derive(Debug, Clone)]
pub(super) enum Undo {
    AddNode(NodeId),
    SetInput { inlet: InletId, previous: OutletId },
    SetOp { node: NodeId, previous: Op },
    SetOutputTypes { node: NodeId, previous: SmallVec<[TensorType; 1]> },
    SetName { node: NodeId, previous: String },
    SetExt { node: NodeId, previous: NodeExt },
}

impl Graph {
    /// Run `f` atomically.
    ///
    /// If `f` returns an error, every mutation it made through the graph's
    /// primitives is undone before the error is returned. Transactions nest:
    /// a successful inner transaction folds its entries into the outer one.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let outer = self.journal.replace(Vec::new());
        let result = f(self);
        let entries = self.journal.take().unwrap_or_default();

        match (&result, outer) {
            (Ok(_), Some(mut outer)) => {
                outer.extend(entries);
                self.journal = Some(outer);
            }
            (Ok(_), None) => {}
            (Err(error), outer) => {
                tracing::debug!(undone = entries.len(), %error, "rolling back graph transaction");
                self.rollback(entries);
                self.journal = outer;
            }
        }

        result
    }

    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    pub(super) fn record(&mut self, entry: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(entry);
        }
    }

    fn rollback(&mut self, entries: Vec<Undo>) {
        for entry in entries.into_iter().rev() {
            match entry {
                Undo::AddNode(id) => {
                    self.detach(id);
                    if id.index() + 1 == self.nodes.len() {
                        self.nodes.pop();
                    }
                }
                Undo::SetInput { inlet, previous } => {
                    if let Some(current) = self.source(inlet) {
                        // Both endpoints existed when the entry was recorded.
                        let _ = self.rewire(inlet, current, previous);
                    }
                }
                Undo::SetOp { node, previous } => {
                    if let Ok(n) = self.node_mut(node) {
                        n.op = previous;
                    }
                }
                Undo::SetOutputTypes { node, previous } => {
                    if let Ok(n) = self.node_mut(node) {
                        for (port, ty) in n.outputs.iter_mut().zip(previous) {
                            port.ty = ty;
                        }
                    }
                }
                Undo::SetName { node, previous } => {
                    if let Ok(n) = self.node_mut(node) {
                        n.name = previous;
                    }
                }
                Undo::SetExt { node, previous } => {
                    if let Ok(n) = self.node_mut(node) {
                        n.ext = previous;
                    }
                }
            }
        }
    }
}
