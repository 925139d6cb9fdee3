//! Error types shared by the placement and lookup layers.
//!
//! Per-node lifecycle errors live with the [`Node`](crate::Node) trait
//! in [`node`](crate::node); aggregated prepare failures are defined by
//! the kernel crate, next to the coordinator that raises them.

use std::error::Error;
use std::fmt;

use crate::id::{ModelId, NodeId, ThreadId};

/// Errors rejecting a creation request before any state mutation.
///
/// A failed creation leaves the kernel exactly as it was: no GID range
/// is recorded and no directory entry is published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlacementError {
    /// The model ID is not registered.
    UnknownModel {
        /// The unrecognised model.
        model: ModelId,
    },
    /// The model name is not registered (restore path).
    UnknownModelName {
        /// The unrecognised name.
        name: String,
    },
    /// The requested count is not a positive number.
    InvalidCount {
        /// The rejected count.
        count: u64,
    },
    /// The requested range would overflow the addressable GID space.
    IdRangeExhausted {
        /// Number of GIDs requested.
        requested: u64,
        /// Highest GID assigned so far.
        highest: NodeId,
    },
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownModel { model } => write!(f, "unknown model id {model}"),
            Self::UnknownModelName { name } => write!(f, "unknown model '{name}'"),
            Self::InvalidCount { count } => {
                write!(f, "node count must be at least 1, got {count}")
            }
            Self::IdRangeExhausted { requested, highest } => {
                write!(
                    f,
                    "creating {requested} nodes would overflow the GID range \
                     (highest assigned: {highest}); no nodes were created"
                )
            }
        }
    }
}

impl Error for PlacementError {}

/// Errors resolving a GID to a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// The GID was never created on any rank.
    UnknownNode {
        /// The unresolvable GID.
        id: NodeId,
    },
    /// The GID exists but is owned by another rank. Callers expecting
    /// a proxy object must consult the event-routing layer; this kernel
    /// only records that the node is elsewhere.
    NotLocal {
        /// The remote GID.
        id: NodeId,
    },
    /// The GID names a plain node, but a sibling bundle was requested.
    NoSiblings {
        /// The GID without siblings.
        id: NodeId,
    },
    /// A sibling bundle was asked for a thread it has no child for.
    ThreadOutOfRange {
        /// The bundle's GID.
        id: NodeId,
        /// The requested thread.
        thread: ThreadId,
        /// Number of children in the bundle.
        sibling_count: usize,
    },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { id } => write!(f, "unknown node {id}"),
            Self::NotLocal { id } => write!(f, "node {id} is not local to this rank"),
            Self::NoSiblings { id } => write!(f, "node {id} has no thread siblings"),
            Self::ThreadOutOfRange {
                id,
                thread,
                sibling_count,
            } => {
                write!(
                    f,
                    "node {id}: thread {thread} out of range for {sibling_count} siblings"
                )
            }
        }
    }
}

impl Error for LookupError {}
