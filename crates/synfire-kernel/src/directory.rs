//! The sparse node directory: GID → local node, sibling bundle, or
//! remote marker.
//!
//! The directory is append-only and ordered by GID, so lookups are a
//! binary search and insertion is an O(1) push. It never owns node
//! memory — entries hold [`NodeHandle`]s into the store. Remote markers
//! carry no payload at all; they exist so that `max_gid()` agrees
//! across ranks after every creation call, even on ranks that
//! materialised nothing.

use smallvec::SmallVec;

use synfire_core::{NodeId, ThreadId};
use synfire_models::NodeHandle;

/// One GID's children when a model replicates one instance per thread.
///
/// Holds exactly one handle per rank-local worker thread, indexed by
/// thread. The bundle owns its children for their full lifetime;
/// children are never registered in the directory individually.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SiblingBundle {
    children: SmallVec<[NodeHandle; 8]>,
}

impl SiblingBundle {
    /// Create an empty bundle with capacity for one child per thread.
    pub fn with_capacity(threads: u32) -> Self {
        Self {
            children: SmallVec::with_capacity(threads as usize),
        }
    }

    /// Append the child for the next thread. Children must be pushed in
    /// thread order, starting at thread 0.
    pub fn push(&mut self, handle: NodeHandle) {
        debug_assert_eq!(handle.thread.0 as usize, self.children.len());
        self.children.push(handle);
    }

    /// The child instance for one thread, if the index is in range.
    pub fn sibling(&self, thread: ThreadId) -> Option<NodeHandle> {
        self.children.get(thread.0 as usize).copied()
    }

    /// Number of children (one per worker thread).
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the bundle has no children yet.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterate the children in thread order.
    pub fn iter(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.children.iter().copied()
    }
}

/// What the directory knows about one registered GID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryEntry {
    /// A node materialised on this rank, owned by one thread.
    Local(NodeHandle),
    /// A thread-replicated pseudo-node: one child per worker thread.
    Siblings(SiblingBundle),
    /// The GID exists but lives on another rank. No local payload.
    Remote,
}

/// Append-only, GID-ordered directory of this rank's view of the
/// population.
#[derive(Debug, Default)]
pub struct SparseDirectory {
    entries: Vec<(NodeId, DirectoryEntry)>,
    max_gid: NodeId,
}

impl SparseDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_gid: NodeId(0),
        }
    }

    /// Grow capacity to hold at least `total` entries, if it does not
    /// already. Placement calls this once per creation call with the
    /// expected local share, so the per-GID pushes never reallocate.
    pub fn reserve_total(&mut self, total: usize) {
        let have = self.entries.capacity();
        if total > have {
            self.entries.reserve(total - have);
        }
    }

    fn push(&mut self, gid: NodeId, entry: DirectoryEntry) {
        debug_assert!(
            gid > self.max_gid,
            "directory entries must be added in increasing GID order"
        );
        self.entries.push((gid, entry));
        self.max_gid = gid;
    }

    /// Register a locally materialised node.
    pub fn add_local(&mut self, gid: NodeId, handle: NodeHandle) {
        self.push(gid, DirectoryEntry::Local(handle));
    }

    /// Register a thread-replicated sibling bundle.
    pub fn add_siblings(&mut self, gid: NodeId, bundle: SiblingBundle) {
        self.push(gid, DirectoryEntry::Siblings(bundle));
    }

    /// Record that a GID exists on another rank.
    pub fn add_remote(&mut self, gid: NodeId) {
        self.push(gid, DirectoryEntry::Remote);
    }

    /// Look up a GID. `None` means the GID was never registered here —
    /// deciding whether that is an error belongs to the caller (the
    /// event-routing layer supplies proxies for valid remote GIDs).
    pub fn get(&self, gid: NodeId) -> Option<&DirectoryEntry> {
        self.entries
            .binary_search_by_key(&gid, |&(g, _)| g)
            .ok()
            .map(|i| &self.entries[i].1)
    }

    /// The i-th entry in insertion (GID) order.
    pub fn get_by_index(&self, index: usize) -> Option<(NodeId, &DirectoryEntry)> {
        self.entries.get(index).map(|(gid, entry)| (*gid, entry))
    }

    /// Iterate all entries in GID order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DirectoryEntry)> {
        self.entries.iter().map(|(gid, entry)| (*gid, entry))
    }

    /// Number of registered entries (remote markers included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The highest GID this rank has observed; `NodeId(0)` when empty.
    ///
    /// Identical on every rank after a creation call completes — this
    /// is the invariant remote markers exist to maintain.
    pub fn max_gid(&self) -> NodeId {
        self.max_gid
    }

    /// Drop every entry. Only teardown calls this; the store releases
    /// the node memory in the same step.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.max_gid = NodeId(0);
    }
}
