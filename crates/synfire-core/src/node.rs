//! The [`Node`] trait — the contract every simulated element fulfils.
//!
//! The kernel manages *where* nodes live and *when* their lifecycle
//! hooks run; what a node computes per step is outside this crate.
//! Node memory is owned by the per-(model, thread) slabs in
//! `synfire-models`; the kernel only ever holds handles.

use std::error::Error;
use std::fmt;

use crate::status::PropertyMap;

/// One simulated element: a neuron, a device, or a recording proxy.
///
/// Implementations must be cheap to construct (placement instantiates
/// them in bulk) and defer expensive buffer allocation to
/// [`init_buffers`](Node::init_buffers), which runs in the prepare pass
/// immediately before a simulation run.
pub trait Node: Send {
    /// Reinitialise dynamic state to the model's initial values.
    ///
    /// Must also mark any simulation buffers as uninitialised so that
    /// the next prepare pass rebuilds them. Called by the kernel's
    /// reset operation; required to be idempotent.
    fn init_state(&mut self);

    /// Allocate and clear the buffers needed for the coming run.
    ///
    /// Runs once per prepare pass, before [`calibrate`](Node::calibrate).
    /// Implementations that track an "initialised" flag may make this a
    /// no-op on repeated calls within one prepare cycle.
    fn init_buffers(&mut self) -> Result<(), NodeError>;

    /// Recompute step-size-dependent internal constants.
    ///
    /// Runs once per prepare pass, after buffers are initialised.
    fn calibrate(&mut self) -> Result<(), NodeError>;

    /// End-of-run teardown hook.
    ///
    /// Flush/close semantics belong to the node (e.g. recording devices
    /// closing files); the kernel only guarantees the call.
    fn finalize(&mut self) {}

    /// Lightweight cleanup invoked after every run segment.
    fn post_run_cleanup(&mut self) {}

    /// Whether this node is excluded from the active update loop.
    fn is_frozen(&self) -> bool {
        false
    }

    /// Whether this node participates in iterative (waveform-relaxation
    /// style) coupling. If any node on any rank returns `true`, every
    /// rank executes the extra collective relaxation step.
    fn uses_relaxation(&self) -> bool {
        false
    }

    /// Report the node's observable state.
    fn status(&self) -> PropertyMap {
        PropertyMap::new()
    }

    /// Apply a property map to this node.
    ///
    /// Unknown keys are an error ([`NodeError::BadProperty`]) unless the
    /// caller explicitly bypasses validation (the restore path does).
    fn apply_status(&mut self, props: &PropertyMap) -> Result<(), NodeError>;
}

/// Errors raised by individual nodes during lifecycle operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeError {
    /// Buffer initialisation failed during the prepare pass.
    BufferInit {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// Calibration failed during the prepare pass.
    Calibration {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A property map entry was rejected.
    BadProperty {
        /// The offending key.
        key: String,
        /// Why the entry was rejected.
        reason: String,
    },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferInit { reason } => write!(f, "buffer initialisation failed: {reason}"),
            Self::Calibration { reason } => write!(f, "calibration failed: {reason}"),
            Self::BadProperty { key, reason } => {
                write!(f, "bad property '{key}': {reason}")
            }
        }
    }
}

impl Error for NodeError {}
