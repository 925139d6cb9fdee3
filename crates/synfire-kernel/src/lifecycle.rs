//! Parallel lifecycle passes over the per-thread node views.
//!
//! Each pass runs one OS thread per worker thread. A worker gets
//! exclusive access to its own [`ThreadSlab`] and walks its own
//! [`ThreadView`], so no node is ever touched by two threads at once
//! and no locking is needed. Outcomes flow back over a channel and are
//! aggregated after the implicit barrier at the end of the scope.
//!
//! [`ThreadSlab`]: synfire_models::ThreadSlab
//! [`ThreadView`]: crate::cache::ThreadView

use std::error::Error;
use std::fmt;

use synfire_core::{NodeError, ThreadId};
use synfire_models::NodeStore;

use crate::cache::CacheSnapshot;
use crate::directory::{DirectoryEntry, SparseDirectory};

/// Summary of a successful prepare pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrepareReport {
    /// Nodes that were initialised and calibrated (frozen nodes are
    /// excluded from the active update loop and not counted).
    pub active: usize,
    /// Active nodes that use iterative relaxation.
    pub active_relaxation: usize,
}

/// One worker thread's captured prepare failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadFailure {
    /// The failing worker thread.
    pub thread: ThreadId,
    /// The first error raised on that thread. Remaining nodes on the
    /// same thread were skipped; other threads completed normally.
    pub error: NodeError,
}

/// Aggregated prepare failure, raised once after every thread joined.
///
/// A failed prepare leaves some nodes initialised and others not; a
/// full reset is required before retrying. No automatic retry happens
/// here — these are deterministic configuration errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareError {
    /// Every thread that failed, in thread order.
    pub failures: Vec<ThreadFailure>,
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prepare failed on {} thread(s):", self.failures.len())?;
        for failure in &self.failures {
            write!(f, " [thread {}] {};", failure.thread, failure.error)?;
        }
        Ok(())
    }
}

impl Error for PrepareError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.failures.first().map(|f| &f.error as &(dyn Error + 'static))
    }
}

/// Per-thread result slot, sent over the channel from inside the
/// parallel region.
struct ThreadOutcome {
    thread: ThreadId,
    active: usize,
    active_relaxation: usize,
    failure: Option<NodeError>,
}

/// Initialise buffers and calibrate every non-frozen node, one worker
/// per thread.
///
/// A failure on one thread aborts that thread's remaining nodes only;
/// all other threads finish their full view. After the barrier, either
/// a [`PrepareReport`] or one aggregated [`PrepareError`] is returned.
pub(crate) fn prepare_pass(
    store: &mut NodeStore,
    snapshot: &CacheSnapshot,
) -> Result<PrepareReport, PrepareError> {
    let (tx, rx) = crossbeam_channel::unbounded::<ThreadOutcome>();

    std::thread::scope(|s| {
        for slab in store.thread_slabs_mut() {
            let tx = tx.clone();
            let view = snapshot.view(slab.thread());
            s.spawn(move || {
                let mut outcome = ThreadOutcome {
                    thread: slab.thread(),
                    active: 0,
                    active_relaxation: 0,
                    failure: None,
                };
                for &handle in &view.nodes {
                    let Some(node) = slab.get_mut(handle) else {
                        continue;
                    };
                    if node.is_frozen() {
                        continue;
                    }
                    match node.init_buffers().and_then(|()| node.calibrate()) {
                        Ok(()) => {
                            outcome.active += 1;
                            if node.uses_relaxation() {
                                outcome.active_relaxation += 1;
                            }
                        }
                        Err(error) => {
                            outcome.failure = Some(error);
                            break;
                        }
                    }
                }
                // Best-effort send; the receiver outlives the scope.
                let _ = tx.send(outcome);
            });
        }
    });
    drop(tx);

    let mut report = PrepareReport::default();
    let mut failures = Vec::new();
    for outcome in rx.iter() {
        report.active += outcome.active;
        report.active_relaxation += outcome.active_relaxation;
        if let Some(error) = outcome.failure {
            failures.push(ThreadFailure {
                thread: outcome.thread,
                error,
            });
        }
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        failures.sort_by_key(|f| f.thread);
        Err(PrepareError { failures })
    }
}

/// Reinitialise the state of every local node and sibling child.
///
/// Walks the directory rather than the cache: reset may run while the
/// cache is stale, and must not trigger a rebuild. Idempotent.
pub(crate) fn reset_pass(store: &mut NodeStore, directory: &SparseDirectory) {
    for (_gid, entry) in directory.iter() {
        match entry {
            DirectoryEntry::Local(handle) => {
                if let Some(node) = store.get_mut(*handle) {
                    node.init_state();
                }
            }
            DirectoryEntry::Siblings(bundle) => {
                for handle in bundle.iter() {
                    if let Some(node) = store.get_mut(handle) {
                        node.init_state();
                    }
                }
            }
            DirectoryEntry::Remote => {}
        }
    }
}

/// Run `op` on every owned node, one worker per thread.
///
/// Shared driver for the infallible passes (finalize, post-run
/// cleanup).
fn for_each_parallel<F>(store: &mut NodeStore, snapshot: &CacheSnapshot, op: F)
where
    F: Fn(&mut dyn synfire_core::Node) + Send + Sync,
{
    let op = &op;
    std::thread::scope(|s| {
        for slab in store.thread_slabs_mut() {
            let view = snapshot.view(slab.thread());
            s.spawn(move || {
                for &handle in &view.nodes {
                    if let Some(node) = slab.get_mut(handle) {
                        op(node);
                    }
                }
            });
        }
    });
}

/// End-of-run teardown hook on every owned node.
pub(crate) fn finalize_pass(store: &mut NodeStore, snapshot: &CacheSnapshot) {
    for_each_parallel(store, snapshot, |node| node.finalize());
}

/// Post-run-segment cleanup on every owned node.
pub(crate) fn cleanup_pass(store: &mut NodeStore, snapshot: &CacheSnapshot) {
    for_each_parallel(store, snapshot, |node| node.post_run_cleanup());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::UpdateCache;
    use synfire_core::{ModelId, NodeId};
    use synfire_test_utils::TestNode;
    use synfire_topology::Topology;

    struct Fixture {
        store: NodeStore,
        directory: SparseDirectory,
        topology: Topology,
    }

    impl Fixture {
        fn new(threads: u32) -> Self {
            Self {
                store: NodeStore::new(threads),
                directory: SparseDirectory::new(),
                topology: Topology::single_rank(threads).unwrap(),
            }
        }

        fn add(&mut self, gid: u64, thread: u32, node: TestNode) {
            let handle = self
                .store
                .insert(ModelId(0), ThreadId(thread), Box::new(node));
            self.directory.add_local(NodeId(gid), handle);
        }

        fn snapshot(&self) -> std::sync::Arc<CacheSnapshot> {
            UpdateCache::new().ensure(&self.directory, &self.store, &self.topology)
        }

        fn counter(&self, gid: u64, key: &str) -> i64 {
            let DirectoryEntry::Local(handle) = self.directory.get(NodeId(gid)).unwrap() else {
                panic!("gid {gid} is not a plain local node");
            };
            self.store.get(*handle).unwrap().status()[key]
                .as_int()
                .unwrap()
        }
    }

    #[test]
    fn prepare_counts_active_and_relaxation() {
        let mut fx = Fixture::new(2);
        fx.add(1, 0, TestNode::new());
        fx.add(2, 1, TestNode::relaxing());
        fx.add(3, 1, TestNode::frozen());

        let snap = fx.snapshot();
        let report = prepare_pass(&mut fx.store, &snap).unwrap();
        assert_eq!(report.active, 2);
        assert_eq!(report.active_relaxation, 1);

        // The frozen node was skipped entirely.
        assert_eq!(fx.counter(3, "calibrations"), 0);
        assert_eq!(fx.counter(1, "calibrations"), 1);
    }

    #[test]
    fn failing_thread_does_not_stop_other_threads() {
        let mut fx = Fixture::new(2);
        // Thread 0: ok, then failing — the second node aborts the rest
        // of thread 0 only.
        fx.add(1, 0, TestNode::new());
        fx.add(2, 0, TestNode::failing_calibration());
        fx.add(3, 0, TestNode::new());
        // Thread 1: both fine.
        fx.add(4, 1, TestNode::new());
        fx.add(5, 1, TestNode::new());

        let snap = fx.snapshot();
        let err = prepare_pass(&mut fx.store, &snap).unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].thread, ThreadId(0));

        assert_eq!(fx.counter(1, "calibrations"), 1);
        assert_eq!(fx.counter(3, "calibrations"), 0); // aborted
        assert_eq!(fx.counter(4, "calibrations"), 1);
        assert_eq!(fx.counter(5, "calibrations"), 1);
    }

    #[test]
    fn reset_is_idempotent_and_skips_nothing() {
        let mut fx = Fixture::new(2);
        fx.add(1, 0, TestNode::new());
        fx.add(2, 1, TestNode::frozen());
        fx.directory.add_remote(NodeId(3));

        reset_pass(&mut fx.store, &fx.directory);
        reset_pass(&mut fx.store, &fx.directory);
        assert_eq!(fx.counter(1, "state_inits"), 2);
        assert_eq!(fx.counter(2, "state_inits"), 2);
        // Buffers flagged stale either way.
        assert_eq!(fx.counter(1, "buffers_ready"), 0);
    }

    #[test]
    fn finalize_and_cleanup_touch_every_node_once() {
        let mut fx = Fixture::new(2);
        for gid in 1..=6 {
            fx.add(gid, (gid % 2) as u32, TestNode::new());
        }
        let snap = fx.snapshot();
        finalize_pass(&mut fx.store, &snap);
        cleanup_pass(&mut fx.store, &snap);
        for gid in 1..=6 {
            assert_eq!(fx.counter(gid, "finalizes"), 1);
            assert_eq!(fx.counter(gid, "cleanups"), 1);
        }
    }
}
