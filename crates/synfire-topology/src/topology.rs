//! The [`Topology`] type: who owns which GID, and where workers live.
//!
//! Ranks `0..simulating_ranks` run the ordinary distributed simulation;
//! ranks `simulating_ranks..total_ranks` are auxiliary recording ranks
//! that only host global-receiver devices. Logical workers are numbered
//! fleet-wide: simulating workers first (`0..worker_count`), recording
//! workers after them. Within the simulating block, worker `w` lives on
//! rank `w % simulating_ranks`, thread `w / simulating_ranks` — so
//! consecutive GIDs land on consecutive ranks, which is what makes
//! `GID % simulating_ranks` the ownership test.

use synfire_core::{NodeId, Rank, ThreadId, WorkerId};

use crate::error::TopologyError;

/// Configuration for a [`Topology`].
///
/// Plain data; validation happens in [`Topology::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopologyConfig {
    /// Total number of cooperating ranks.
    pub total_ranks: u32,
    /// How many of the total ranks are auxiliary recording ranks.
    /// Must be strictly less than `total_ranks`.
    pub recording_ranks: u32,
    /// This process's rank index, in `0..total_ranks`.
    pub rank: u32,
    /// Worker threads per rank. The same on every rank.
    pub threads_per_rank: u32,
}

/// Validated rank/worker/thread topology for one rank of the fleet.
///
/// All queries are pure functions of the configuration; no state, no
/// communication. Cheap to copy into worker threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Topology {
    rank: Rank,
    simulating_ranks: u32,
    recording_ranks: u32,
    threads_per_rank: u32,
}

impl Topology {
    /// Validate a [`TopologyConfig`] and build the topology.
    ///
    /// # Errors
    ///
    /// [`TopologyError::NoSimulatingRanks`] if no rank would simulate,
    /// [`TopologyError::ZeroThreads`] for a zero thread count, and
    /// [`TopologyError::RankOutOfRange`] if `rank >= total_ranks`.
    pub fn new(config: TopologyConfig) -> Result<Self, TopologyError> {
        if config.total_ranks == 0 || config.recording_ranks >= config.total_ranks {
            return Err(TopologyError::NoSimulatingRanks {
                total_ranks: config.total_ranks,
                recording_ranks: config.recording_ranks,
            });
        }
        if config.threads_per_rank == 0 {
            return Err(TopologyError::ZeroThreads);
        }
        if config.rank >= config.total_ranks {
            return Err(TopologyError::RankOutOfRange {
                rank: config.rank,
                total_ranks: config.total_ranks,
            });
        }
        Ok(Self {
            rank: Rank(config.rank),
            simulating_ranks: config.total_ranks - config.recording_ranks,
            recording_ranks: config.recording_ranks,
            threads_per_rank: config.threads_per_rank,
        })
    }

    /// A single-rank, in-process topology with the given thread count.
    ///
    /// # Errors
    ///
    /// [`TopologyError::ZeroThreads`] for a zero thread count.
    pub fn single_rank(threads_per_rank: u32) -> Result<Self, TopologyError> {
        Self::new(TopologyConfig {
            total_ranks: 1,
            recording_ranks: 0,
            rank: 0,
            threads_per_rank,
        })
    }

    /// This process's rank.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of ranks running the ordinary distributed simulation.
    pub fn simulating_ranks(&self) -> u32 {
        self.simulating_ranks
    }

    /// Number of auxiliary recording ranks.
    pub fn recording_ranks(&self) -> u32 {
        self.recording_ranks
    }

    /// Total rank count.
    pub fn total_ranks(&self) -> u32 {
        self.simulating_ranks + self.recording_ranks
    }

    /// Worker threads per rank.
    pub fn threads_per_rank(&self) -> u32 {
        self.threads_per_rank
    }

    /// Whether this rank participates in the ordinary simulation.
    pub fn is_simulating_rank(&self) -> bool {
        self.rank.0 < self.simulating_ranks
    }

    /// Whether this rank is an auxiliary recording rank.
    pub fn is_recording_rank(&self) -> bool {
        !self.is_simulating_rank()
    }

    /// Number of logical workers on simulating ranks.
    pub fn worker_count(&self) -> u32 {
        self.simulating_ranks * self.threads_per_rank
    }

    /// Number of logical workers on recording ranks.
    pub fn recording_worker_count(&self) -> u32 {
        self.recording_ranks * self.threads_per_rank
    }

    /// The logical worker a GID is sharded to (proxy sharding).
    pub fn suggest_worker(&self, gid: NodeId) -> WorkerId {
        WorkerId((gid.0 % u64::from(self.worker_count())) as u32)
    }

    /// The recording worker for the `cursor`-th global-receiver node.
    ///
    /// Keyed by a monotonically increasing creation cursor rather than
    /// the GID, so successive creation calls stay balanced across the
    /// recording workers regardless of range boundaries.
    pub fn suggest_recording_worker(&self, cursor: u64) -> WorkerId {
        debug_assert!(self.recording_ranks > 0);
        let offset = (cursor % u64::from(self.recording_worker_count())) as u32;
        WorkerId(self.worker_count() + offset)
    }

    /// The rank hosting a logical worker.
    pub fn worker_rank(&self, worker: WorkerId) -> Rank {
        let sim_workers = self.worker_count();
        if worker.0 < sim_workers {
            Rank(worker.0 % self.simulating_ranks)
        } else {
            Rank(self.simulating_ranks + (worker.0 - sim_workers) % self.recording_ranks)
        }
    }

    /// The rank-local thread a logical worker maps to.
    pub fn worker_thread(&self, worker: WorkerId) -> ThreadId {
        let sim_workers = self.worker_count();
        if worker.0 < sim_workers {
            ThreadId(worker.0 / self.simulating_ranks)
        } else {
            ThreadId((worker.0 - sim_workers) / self.recording_ranks)
        }
    }

    /// The logical worker for one of this rank's threads.
    pub fn thread_worker(&self, thread: ThreadId) -> WorkerId {
        if self.is_simulating_rank() {
            WorkerId(thread.0 * self.simulating_ranks + self.rank.0)
        } else {
            let rec_index = self.rank.0 - self.simulating_ranks;
            WorkerId(self.worker_count() + thread.0 * self.recording_ranks + rec_index)
        }
    }

    /// Whether a logical worker lives on this rank.
    pub fn is_local_worker(&self, worker: WorkerId) -> bool {
        self.worker_rank(worker) == self.rank
    }

    /// Proxy-sharding ownership test: whether this rank materialises
    /// the given GID.
    pub fn owns_gid(&self, gid: NodeId) -> bool {
        self.is_simulating_rank() && gid.0 % u64::from(self.simulating_ranks) == u64::from(self.rank.0)
    }

    /// The next GID strictly after `gid` that this rank owns.
    ///
    /// On a recording rank there is no owned GID; the stride by
    /// `simulating_ranks` keeps range walks finite for callers that
    /// iterate unconditionally.
    pub fn next_local_gid(&self, gid: NodeId) -> NodeId {
        let sim = u64::from(self.simulating_ranks);
        let rank = u64::from(self.rank.0);
        if self.is_recording_rank() {
            return NodeId(gid.0 + sim);
        }
        let owner = gid.0 % sim;
        if owner == rank {
            NodeId(gid.0 + sim)
        } else {
            NodeId(gid.0 + (sim + rank - owner) % sim)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fleet(total: u32, recording: u32, threads: u32) -> Vec<Topology> {
        (0..total)
            .map(|rank| {
                Topology::new(TopologyConfig {
                    total_ranks: total,
                    recording_ranks: recording,
                    rank,
                    threads_per_rank: threads,
                })
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn rejects_degenerate_configs() {
        assert_eq!(
            Topology::new(TopologyConfig {
                total_ranks: 2,
                recording_ranks: 2,
                rank: 0,
                threads_per_rank: 1,
            }),
            Err(TopologyError::NoSimulatingRanks {
                total_ranks: 2,
                recording_ranks: 2,
            })
        );
        assert_eq!(Topology::single_rank(0), Err(TopologyError::ZeroThreads));
        assert_eq!(
            Topology::new(TopologyConfig {
                total_ranks: 2,
                recording_ranks: 0,
                rank: 2,
                threads_per_rank: 1,
            }),
            Err(TopologyError::RankOutOfRange {
                rank: 2,
                total_ranks: 2,
            })
        );
    }

    #[test]
    fn single_rank_owns_every_gid() {
        let topo = Topology::single_rank(2).unwrap();
        for gid in 1..=16u64 {
            assert!(topo.owns_gid(NodeId(gid)));
            assert_eq!(topo.next_local_gid(NodeId(gid)), NodeId(gid + 1));
        }
    }

    #[test]
    fn consecutive_gids_alternate_ranks() {
        let fleet = fleet(3, 0, 2);
        // GID g is owned by rank g % 3.
        for gid in 1..=12u64 {
            for topo in &fleet {
                let expected = gid % 3 == u64::from(topo.rank().0);
                assert_eq!(topo.owns_gid(NodeId(gid)), expected);
            }
        }
    }

    #[test]
    fn worker_maps_to_owning_rank() {
        let fleet = fleet(3, 1, 2);
        let topo = &fleet[0];
        for gid in 1..=24u64 {
            let worker = topo.suggest_worker(NodeId(gid));
            let rank = topo.worker_rank(worker);
            // suggest_worker only shards over simulating ranks.
            assert!(rank.0 < topo.simulating_ranks());
            assert_eq!(u64::from(rank.0), gid % u64::from(topo.simulating_ranks()));
        }
    }

    #[test]
    fn thread_worker_round_trips() {
        for topo in fleet(4, 1, 3) {
            for t in 0..topo.threads_per_rank() {
                let worker = topo.thread_worker(ThreadId(t));
                assert!(topo.is_local_worker(worker));
                assert_eq!(topo.worker_thread(worker), ThreadId(t));
                assert_eq!(topo.worker_rank(worker), topo.rank());
            }
        }
    }

    #[test]
    fn recording_workers_cover_recording_ranks() {
        let fleet = fleet(4, 2, 2);
        let topo = &fleet[0];
        // Cursor walks the recording workers round-robin.
        let mut seen = std::collections::BTreeSet::new();
        for cursor in 0..u64::from(topo.recording_worker_count()) {
            let worker = topo.suggest_recording_worker(cursor);
            assert!(worker.0 >= topo.worker_count());
            let rank = topo.worker_rank(worker);
            assert!(rank.0 >= topo.simulating_ranks());
            seen.insert(worker.0);
        }
        assert_eq!(seen.len() as u32, topo.recording_worker_count());
    }

    #[test]
    fn next_local_gid_lands_on_owned_gid() {
        for topo in fleet(5, 0, 2) {
            let mut gid = NodeId(1);
            if !topo.owns_gid(gid) {
                gid = topo.next_local_gid(gid);
            }
            for _ in 0..20 {
                assert!(topo.owns_gid(gid), "rank {} gid {}", topo.rank(), gid);
                gid = topo.next_local_gid(gid);
            }
        }
    }

    proptest! {
        #[test]
        fn ownership_partitions_gids(
            total in 1u32..8,
            recording in 0u32..3,
            threads in 1u32..5,
            gid in 1u64..10_000,
        ) {
            prop_assume!(recording < total);
            let fleet = fleet(total, recording, threads);
            let owners = fleet
                .iter()
                .filter(|t| t.owns_gid(NodeId(gid)))
                .count();
            prop_assert_eq!(owners, 1);
        }

        #[test]
        fn worker_rank_thread_consistent(
            total in 1u32..8,
            recording in 0u32..3,
            threads in 1u32..5,
            gid in 1u64..10_000,
        ) {
            prop_assume!(recording < total);
            let topo = fleet(total, recording, threads)[0];
            let worker = topo.suggest_worker(NodeId(gid));
            let rank = topo.worker_rank(worker);
            let thread = topo.worker_thread(worker);
            // Reconstruct the worker from its (rank, thread) pair.
            let reconstructed = WorkerId(thread.0 * topo.simulating_ranks() + rank.0);
            prop_assert_eq!(worker, reconstructed);
            prop_assert!(thread.0 < topo.threads_per_rank());
        }
    }
}
