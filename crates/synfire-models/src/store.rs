//! Per-thread slab storage owning every node instance.
//!
//! Nodes of one model on one thread live contiguously in one slab.
//! Slabs are append-only within a run: slots are never reused, so a
//! [`NodeHandle`] stays valid until [`NodeStore::clear`] drops
//! everything in bulk. Capacity is pre-reserved per creation call
//! ([`NodeStore::reserve_additional`]) — placement never grows a slab
//! one node at a time.

use indexmap::IndexMap;

use synfire_core::{ModelId, Node, ThreadId};

use crate::handle::NodeHandle;

/// All slabs belonging to one rank-local worker thread.
///
/// The lifecycle coordinator hands each OS worker exactly one
/// `&mut ThreadSlab`, so every node is touched by at most one thread —
/// ownership is exclusive per thread by construction, no locks needed.
pub struct ThreadSlab {
    thread: ThreadId,
    slabs: IndexMap<ModelId, Vec<Box<dyn Node>>>,
}

impl ThreadSlab {
    fn new(thread: ThreadId) -> Self {
        Self {
            thread,
            slabs: IndexMap::new(),
        }
    }

    /// The thread these slabs belong to.
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    fn insert(&mut self, model: ModelId, node: Box<dyn Node>) -> u32 {
        let slab = self.slabs.entry(model).or_default();
        let slot = slab.len() as u32;
        slab.push(node);
        slot
    }

    fn reserve_additional(&mut self, model: ModelId, additional: usize) {
        self.slabs.entry(model).or_default().reserve(additional);
    }

    /// Resolve a handle to a shared node reference.
    ///
    /// Returns `None` for a handle from another thread or an
    /// out-of-range slot.
    pub fn get(&self, handle: NodeHandle) -> Option<&dyn Node> {
        if handle.thread != self.thread {
            return None;
        }
        self.slabs
            .get(&handle.model)?
            .get(handle.slot as usize)
            .map(|n| n.as_ref())
    }

    /// Resolve a handle to an exclusive node reference.
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut (dyn Node + 'static)> {
        if handle.thread != self.thread {
            return None;
        }
        self.slabs
            .get_mut(&handle.model)?
            .get_mut(handle.slot as usize)
            .map(|n| n.as_mut())
    }

    /// Number of nodes across all of this thread's slabs.
    pub fn len(&self) -> usize {
        self.slabs.values().map(Vec::len).sum()
    }

    /// Whether this thread owns no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Node storage for one rank: one [`ThreadSlab`] per worker thread.
pub struct NodeStore {
    threads: Vec<ThreadSlab>,
}

impl NodeStore {
    /// Create a store for the given thread count.
    pub fn new(threads: u32) -> Self {
        Self {
            threads: (0..threads).map(|t| ThreadSlab::new(ThreadId(t))).collect(),
        }
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> u32 {
        self.threads.len() as u32
    }

    /// Move a node into the (model, thread) slab and return its handle.
    ///
    /// # Panics
    ///
    /// Panics if `thread` is outside the configured thread count —
    /// placement derives threads from the validated topology, so an
    /// out-of-range thread is a kernel bug, not an input error.
    pub fn insert(&mut self, model: ModelId, thread: ThreadId, node: Box<dyn Node>) -> NodeHandle {
        let slab = &mut self.threads[thread.0 as usize];
        let slot = slab.insert(model, node);
        NodeHandle::new(model, thread, slot)
    }

    /// Pre-reserve capacity for `additional` nodes of one model on one
    /// thread. Called once per creation call with the expected local
    /// share, never per node.
    pub fn reserve_additional(&mut self, model: ModelId, thread: ThreadId, additional: usize) {
        self.threads[thread.0 as usize].reserve_additional(model, additional);
    }

    /// Resolve a handle to a shared node reference.
    pub fn get(&self, handle: NodeHandle) -> Option<&dyn Node> {
        self.threads.get(handle.thread.0 as usize)?.get(handle)
    }

    /// Resolve a handle to an exclusive node reference.
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut (dyn Node + 'static)> {
        self.threads.get_mut(handle.thread.0 as usize)?.get_mut(handle)
    }

    /// Disjoint exclusive access to every thread's slabs, for the
    /// parallel lifecycle passes.
    pub fn thread_slabs_mut(&mut self) -> &mut [ThreadSlab] {
        &mut self.threads
    }

    /// Total number of nodes on this rank (sibling children included).
    pub fn node_count(&self) -> usize {
        self.threads.iter().map(ThreadSlab::len).sum()
    }

    /// Drop every slab in bulk. Handles become dangling; callers clear
    /// the directory in the same teardown step.
    pub fn clear(&mut self) {
        for slab in &mut self.threads {
            slab.slabs.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synfire_core::{NodeError, PropertyMap};

    struct Marker(u32);

    impl Node for Marker {
        fn init_state(&mut self) {
            self.0 = 0;
        }
        fn init_buffers(&mut self) -> Result<(), NodeError> {
            Ok(())
        }
        fn calibrate(&mut self) -> Result<(), NodeError> {
            Ok(())
        }
        fn status(&self) -> PropertyMap {
            let mut map = PropertyMap::new();
            map.insert("marker".into(), i64::from(self.0).into());
            map
        }
        fn apply_status(&mut self, _props: &PropertyMap) -> Result<(), NodeError> {
            Ok(())
        }
    }

    #[test]
    fn insert_and_resolve() {
        let mut store = NodeStore::new(2);
        let h0 = store.insert(ModelId(0), ThreadId(0), Box::new(Marker(10)));
        let h1 = store.insert(ModelId(0), ThreadId(1), Box::new(Marker(11)));
        let h2 = store.insert(ModelId(1), ThreadId(0), Box::new(Marker(12)));

        // Slots count per (model, thread), not globally.
        assert_eq!(h0.slot, 0);
        assert_eq!(h1.slot, 0);
        assert_eq!(h2.slot, 0);

        let status = store.get(h1).unwrap().status();
        assert_eq!(status["marker"].as_int(), Some(11));
        assert_eq!(store.node_count(), 3);
    }

    #[test]
    fn get_rejects_wrong_thread_or_slot() {
        let mut store = NodeStore::new(2);
        let h = store.insert(ModelId(0), ThreadId(0), Box::new(Marker(1)));
        let wrong_thread = NodeHandle::new(h.model, ThreadId(1), h.slot);
        let wrong_slot = NodeHandle::new(h.model, h.thread, 5);
        assert!(store.get(wrong_thread).is_none());
        assert!(store.get(wrong_slot).is_none());
        assert!(store.get(h).is_some());
    }

    #[test]
    fn clear_releases_everything() {
        let mut store = NodeStore::new(1);
        let h = store.insert(ModelId(0), ThreadId(0), Box::new(Marker(1)));
        store.clear();
        assert_eq!(store.node_count(), 0);
        assert!(store.get(h).is_none());
    }

    #[test]
    fn random_insert_orders_keep_handles_stable() {
        use proptest::prelude::*;

        proptest!(|(
            picks in prop::collection::vec((0u32..4, 0u32..3), 1..64)
        )| {
            let mut store = NodeStore::new(3);
            let mut handles = Vec::new();
            for &(model, thread) in &picks {
                let marker = handles.len() as u32;
                let handle = store.insert(
                    ModelId(model),
                    ThreadId(thread),
                    Box::new(Marker(marker)),
                );
                handles.push((handle, marker));
            }
            prop_assert_eq!(store.node_count(), picks.len());
            for (handle, marker) in handles {
                let status = store.get(handle).unwrap().status();
                prop_assert_eq!(status["marker"].as_int(), Some(i64::from(marker)));
            }
        });
    }

    #[test]
    fn thread_slabs_are_disjoint_for_parallel_mutation() {
        let mut store = NodeStore::new(4);
        for t in 0..4 {
            for _ in 0..8 {
                store.insert(ModelId(0), ThreadId(t), Box::new(Marker(t)));
            }
        }
        std::thread::scope(|s| {
            for slab in store.thread_slabs_mut() {
                s.spawn(move || {
                    let thread = slab.thread();
                    for slot in 0..8 {
                        let h = NodeHandle::new(ModelId(0), thread, slot);
                        slab.get_mut(h).unwrap().init_state();
                    }
                });
            }
        });
        for t in 0..4 {
            let h = NodeHandle::new(ModelId(0), ThreadId(t), 0);
            assert_eq!(store.get(h).unwrap().status()["marker"].as_int(), Some(0));
        }
    }
}
