//! Topology construction errors.

use std::error::Error;
use std::fmt;

/// Errors rejecting an invalid [`TopologyConfig`](crate::TopologyConfig).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// Every fleet needs at least one simulating rank; recording ranks
    /// must be a strict subset of the total.
    NoSimulatingRanks {
        /// Configured total rank count.
        total_ranks: u32,
        /// Configured recording rank count.
        recording_ranks: u32,
    },
    /// `threads_per_rank` was zero.
    ZeroThreads,
    /// The local rank index is not within the configured fleet.
    RankOutOfRange {
        /// The configured local rank.
        rank: u32,
        /// Configured total rank count.
        total_ranks: u32,
    },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSimulatingRanks {
                total_ranks,
                recording_ranks,
            } => {
                write!(
                    f,
                    "no simulating ranks: {recording_ranks} recording of {total_ranks} total"
                )
            }
            Self::ZeroThreads => write!(f, "threads_per_rank must be at least 1"),
            Self::RankOutOfRange { rank, total_ranks } => {
                write!(f, "rank {rank} out of range for {total_ranks} ranks")
            }
        }
    }
}

impl Error for TopologyError {}
