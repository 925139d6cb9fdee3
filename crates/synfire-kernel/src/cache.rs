//! The thread-local update cache.
//!
//! The per-step update loop and the lifecycle passes never walk the
//! sparse directory — they walk a dense, per-thread sequence of handles
//! rebuilt lazily whenever the population grows. A node's dense
//! thread-local index is its position in the sequence.
//!
//! Staleness is only ever observed at creation-time boundaries, never
//! mid-run, but creation can happen from a thread-parallel wiring
//! context, so the rebuild is guarded by an explicit state machine:
//!
//! ```text
//! Stale ──(first thread observes size mismatch)──▶ Rebuilding ──▶ Fresh
//!               others block on the condvar until Fresh, then re-check
//! ```
//!
//! The fast path compares the directory's `max_gid` against an atomic
//! generation stamp and takes no lock when the cache is current. A
//! partially built snapshot is never observable: the new snapshot is
//! installed under the mutex only once complete.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use synfire_core::{NodeId, ThreadId};
use synfire_models::{NodeHandle, NodeStore};
use synfire_topology::Topology;

use crate::directory::{DirectoryEntry, SparseDirectory};

/// Sentinel generation meaning "no snapshot has ever been built".
const NEVER_BUILT: u64 = u64::MAX;

/// One worker thread's dense view of the nodes it owns.
#[derive(Clone, Debug, Default)]
pub struct ThreadView {
    /// Handles of every node this thread updates, in directory order.
    /// A node's thread-local index is its position here.
    pub nodes: Vec<NodeHandle>,
    /// The subset of `nodes` that uses iterative relaxation.
    pub relaxation: Vec<NodeHandle>,
}

/// A complete, immutable rebuild result: one [`ThreadView`] per worker
/// thread plus the rank-local relaxation flag.
#[derive(Debug)]
pub struct CacheSnapshot {
    views: Vec<ThreadView>,
    relaxation_used: bool,
    built_for: NodeId,
}

impl CacheSnapshot {
    fn empty() -> Self {
        Self {
            views: Vec::new(),
            relaxation_used: false,
            built_for: NodeId(0),
        }
    }

    /// The view for one worker thread.
    ///
    /// # Panics
    ///
    /// Panics if `thread` is outside the topology the snapshot was
    /// built for.
    pub fn view(&self, thread: ThreadId) -> &ThreadView {
        &self.views[thread.0 as usize]
    }

    /// All per-thread views, indexed by thread.
    pub fn views(&self) -> &[ThreadView] {
        &self.views
    }

    /// Whether any thread on this rank owns a relaxation-using node.
    pub fn relaxation_used(&self) -> bool {
        self.relaxation_used
    }

    /// The directory `max_gid` this snapshot reflects.
    pub fn built_for(&self) -> NodeId {
        self.built_for
    }

    /// Total node count across all threads (sibling children counted
    /// once per thread, remote markers not at all).
    pub fn total_len(&self) -> usize {
        self.views.iter().map(|v| v.nodes.len()).sum()
    }
}

enum Phase {
    Stale,
    Rebuilding,
    Fresh,
}

struct Inner {
    phase: Phase,
    snapshot: Arc<CacheSnapshot>,
}

/// Lazily rebuilt, mutually exclusive cache of per-thread node views.
pub struct UpdateCache {
    /// Generation stamp for the lock-free freshness check.
    built_for: AtomicU64,
    inner: Mutex<Inner>,
    rebuilt: Condvar,
}

impl Default for UpdateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateCache {
    /// Create a cache with no snapshot; the first access rebuilds.
    pub fn new() -> Self {
        Self {
            built_for: AtomicU64::new(NEVER_BUILT),
            inner: Mutex::new(Inner {
                phase: Phase::Stale,
                snapshot: Arc::new(CacheSnapshot::empty()),
            }),
            rebuilt: Condvar::new(),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return a snapshot consistent with the current directory,
    /// rebuilding it first if the population changed.
    ///
    /// Exactly one thread rebuilds at a time; threads arriving during a
    /// rebuild block until it completes and then re-check, so a thread
    /// entering after the size already matches performs no work.
    pub fn ensure(
        &self,
        directory: &SparseDirectory,
        store: &NodeStore,
        topology: &Topology,
    ) -> Arc<CacheSnapshot> {
        let gen = directory.max_gid().0;

        // Fast path: generation matches, no rebuild in flight.
        if self.built_for.load(Ordering::Acquire) == gen {
            let inner = self.lock_inner();
            if matches!(inner.phase, Phase::Fresh) && inner.snapshot.built_for.0 == gen {
                return Arc::clone(&inner.snapshot);
            }
        }

        let mut inner = self.lock_inner();
        loop {
            match inner.phase {
                Phase::Fresh if inner.snapshot.built_for.0 == gen => {
                    return Arc::clone(&inner.snapshot);
                }
                Phase::Rebuilding => {
                    inner = self
                        .rebuilt
                        .wait(inner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                _ => break,
            }
        }
        inner.phase = Phase::Rebuilding;
        drop(inner);

        // Exclusive by the Rebuilding phase; the mutex is released so
        // the rebuild itself never blocks unrelated fast-path readers.
        let snapshot = Arc::new(rebuild(directory, store, topology));

        let mut inner = self.lock_inner();
        inner.snapshot = Arc::clone(&snapshot);
        inner.phase = Phase::Fresh;
        self.built_for.store(gen, Ordering::Release);
        self.rebuilt.notify_all();
        snapshot
    }

    /// Force the next access to rebuild, regardless of directory size.
    /// Teardown uses this after clearing the directory and store.
    pub fn invalidate(&self) {
        let mut inner = self.lock_inner();
        inner.phase = Phase::Stale;
        self.built_for.store(NEVER_BUILT, Ordering::Release);
    }
}

/// Recompute every thread's view from the directory.
///
/// Sibling bundles contribute one child to every thread's view; remote
/// markers contribute nothing anywhere.
fn rebuild(directory: &SparseDirectory, store: &NodeStore, topology: &Topology) -> CacheSnapshot {
    let threads = topology.threads_per_rank() as usize;
    let mut views: Vec<ThreadView> = (0..threads).map(|_| ThreadView::default()).collect();

    let include = |views: &mut Vec<ThreadView>, handle: NodeHandle| {
        let view = &mut views[handle.thread.0 as usize];
        view.nodes.push(handle);
        if store.get(handle).is_some_and(|n| n.uses_relaxation()) {
            view.relaxation.push(handle);
        }
    };

    for (_gid, entry) in directory.iter() {
        match entry {
            DirectoryEntry::Local(handle) => include(&mut views, *handle),
            DirectoryEntry::Siblings(bundle) => {
                for handle in bundle.iter() {
                    include(&mut views, handle);
                }
            }
            DirectoryEntry::Remote => {}
        }
    }

    let relaxation_used = views.iter().any(|v| !v.relaxation.is_empty());
    CacheSnapshot {
        views,
        relaxation_used,
        built_for: directory.max_gid(),
    }
}
