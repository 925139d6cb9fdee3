//! Kernel configuration.

use synfire_topology::{Collective, SingleProcess, Topology, TopologyError};

/// Interpolation order used to size relaxation coupling buffers when
/// no explicit order is configured.
pub const DEFAULT_INTERPOLATION_ORDER: u32 = 3;

/// Extra directory capacity reserved per creation call, on top of the
/// expected local share.
///
/// Headroom for the handful of devices typically created after the
/// large neuron populations; a safety margin, not a contract.
pub const DEFAULT_RESERVE_SLACK: usize = 50;

/// Configuration for a [`Population`](crate::population::Population).
pub struct KernelConfig {
    /// Validated rank/thread topology for this rank.
    pub topology: Topology,
    /// Cross-rank logical-or reduction used by the relaxation
    /// consensus.
    pub collective: Box<dyn Collective>,
    /// Interpolation order for relaxation coupling-buffer sizing.
    pub interpolation_order: u32,
    /// Extra directory capacity reserved per creation call.
    pub reserve_slack: usize,
}

impl KernelConfig {
    /// Configuration with default tuning for the given topology and
    /// collective.
    pub fn new(topology: Topology, collective: Box<dyn Collective>) -> Self {
        Self {
            topology,
            collective,
            interpolation_order: DEFAULT_INTERPOLATION_ORDER,
            reserve_slack: DEFAULT_RESERVE_SLACK,
        }
    }

    /// Single-rank, in-process configuration — the common test and
    /// workstation setup.
    ///
    /// # Errors
    ///
    /// [`TopologyError::ZeroThreads`] for a zero thread count.
    pub fn single_rank(threads_per_rank: u32) -> Result<Self, TopologyError> {
        Ok(Self::new(
            Topology::single_rank(threads_per_rank)?,
            Box::new(SingleProcess),
        ))
    }
}
