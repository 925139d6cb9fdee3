//! Stable node handles.
//!
//! A [`NodeHandle`] encodes the physical location of a node inside the
//! per-(model, thread) slabs: enough to resolve a `&dyn Node` in O(1).
//! Handles never dangle within a run — slabs are append-only and nodes
//! are destroyed only at full teardown, which also drops every
//! directory entry referencing them.

use std::fmt;

use synfire_core::{ModelId, ThreadId};

/// Physical location of one node instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct NodeHandle {
    /// The model whose slab holds the node.
    pub model: ModelId,
    /// The rank-local thread owning the node.
    pub thread: ThreadId,
    /// Index within the (model, thread) slab.
    pub slot: u32,
}

impl NodeHandle {
    /// Create a handle from its parts.
    pub fn new(model: ModelId, thread: ThreadId, slot: u32) -> Self {
        Self {
            model,
            thread,
            slot,
        }
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NodeHandle(model={}, thread={}, slot={})",
            self.model, self.thread, self.slot
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_round_trip() {
        let h = NodeHandle::new(ModelId(2), ThreadId(1), 7);
        assert_eq!(h.model, ModelId(2));
        assert_eq!(h.thread, ThreadId(1));
        assert_eq!(h.slot, 7);
        assert_eq!(h.to_string(), "NodeHandle(model=2, thread=1, slot=7)");
    }
}
