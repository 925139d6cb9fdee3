//! Kernel-level error wrapper for operations that cross subsystems.

use std::error::Error;
use std::fmt;

use synfire_core::{LookupError, NodeError, NodeId, PlacementError};

/// Errors from `Population` operations that can fail in more than one
/// subsystem (restore, status updates).
///
/// Single-subsystem operations keep their precise error types
/// ([`PlacementError`] for creation, [`LookupError`] for lookups,
/// [`PrepareError`](crate::lifecycle::PrepareError) for prepare).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// A creation request was rejected.
    Placement(PlacementError),
    /// A GID could not be resolved to a local node.
    Lookup(LookupError),
    /// A node rejected a property map.
    Node {
        /// The GID of the rejecting node.
        gid: NodeId,
        /// The node's error.
        source: NodeError,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placement(err) => write!(f, "{err}"),
            Self::Lookup(err) => write!(f, "{err}"),
            Self::Node { gid, source } => write!(f, "node {gid}: {source}"),
        }
    }
}

impl Error for KernelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Placement(err) => Some(err),
            Self::Lookup(err) => Some(err),
            Self::Node { source, .. } => Some(source),
        }
    }
}

impl From<PlacementError> for KernelError {
    fn from(err: PlacementError) -> Self {
        Self::Placement(err)
    }
}

impl From<LookupError> for KernelError {
    fn from(err: LookupError) -> Self {
        Self::Lookup(err)
    }
}
