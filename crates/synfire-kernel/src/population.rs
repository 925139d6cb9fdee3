//! The [`Population`]: placement policy and kernel surface.
//!
//! `Population` owns the model registry, the node store, the GID range
//! table, the sparse directory, and the update cache, and implements
//! the four sharding strategies that decide, per GID, whether this rank
//! materialises a node and which thread owns it:
//!
//! 1. **Global receivers** (when recording ranks exist): round-robin
//!    over the recording ranks' workers, keyed by a monotonic creation
//!    cursor so successive calls stay balanced.
//! 2. **Proxy sharding**: round-robin over simulating ranks with
//!    `GID % simulating_ranks` as the ownership test; only owned GIDs
//!    are materialised, and the final GID of a range is registered as a
//!    remote marker on non-owning ranks so every rank agrees on the new
//!    maximum GID.
//! 3. **Per-thread replication**: proxy-less models get one
//!    [`SiblingBundle`] per GID holding one independent instance per
//!    worker thread.
//! 4. **Rank singletons**: one instance per GID on thread 0 of every
//!    rank, independent of thread count.
//!
//! Creation is all-or-nothing: validation and range allocation precede
//! every directory mutation, so a failed request leaves the kernel
//! exactly as it was.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::info;

use synfire_core::{
    LookupError, ModelId, Node, NodeId, PlacementError, PropertyMap, PropertyValue, ThreadId,
};
use synfire_models::{ModelRegistry, NodeHandle, NodeStore};
use synfire_topology::{Collective, Topology};

use crate::cache::{CacheSnapshot, UpdateCache};
use crate::config::KernelConfig;
use crate::directory::{DirectoryEntry, SiblingBundle, SparseDirectory};
use crate::error::KernelError;
use crate::lifecycle;
use crate::lifecycle::{PrepareError, PrepareReport};
use crate::ranges::{ModelRangeTable, NodeRange};
use crate::relaxation::{self, RelaxationConsensus};

/// This rank's shard of the simulated population, plus the bookkeeping
/// every rank agrees on (GID ranges, maximum GID, relaxation usage).
pub struct Population {
    topology: Topology,
    collective: Box<dyn Collective>,
    interpolation_order: u32,
    reserve_slack: usize,
    registry: ModelRegistry,
    store: NodeStore,
    ranges: ModelRangeTable,
    directory: SparseDirectory,
    cache: UpdateCache,
    relaxation: RelaxationConsensus,
    /// Round-robin cursor for global-receiver placement. Monotonic
    /// across creation calls; never reset while nodes exist.
    receiver_cursor: u64,
    off_grid: bool,
    off_grid_notified: bool,
    active_nodes: usize,
}

impl Population {
    /// Create an empty population over a registry of models.
    pub fn new(config: KernelConfig, registry: ModelRegistry) -> Self {
        let store = NodeStore::new(config.topology.threads_per_rank());
        Self {
            topology: config.topology,
            collective: config.collective,
            interpolation_order: config.interpolation_order,
            reserve_slack: config.reserve_slack,
            registry,
            store,
            ranges: ModelRangeTable::new(),
            directory: SparseDirectory::new(),
            cache: UpdateCache::new(),
            relaxation: RelaxationConsensus::new(),
            receiver_cursor: 0,
            off_grid: false,
            off_grid_notified: false,
            active_nodes: 0,
        }
    }

    // ── Creation ────────────────────────────────────────────────────

    /// Create `count` nodes of `model` and return their GID range.
    ///
    /// Every rank must issue the same creation calls in the same order;
    /// each rank materialises only its own shard, but all ranks agree
    /// on the returned range and on the new maximum GID.
    ///
    /// # Errors
    ///
    /// [`PlacementError::UnknownModel`], [`PlacementError::InvalidCount`],
    /// or [`PlacementError::IdRangeExhausted`] — all rejected before any
    /// state mutation; a failed call creates zero nodes.
    pub fn create(&mut self, model: ModelId, count: u64) -> Result<NodeRange, PlacementError> {
        let traits = self
            .registry
            .traits(model)
            .ok_or(PlacementError::UnknownModel { model })?;
        if count == 0 {
            return Err(PlacementError::InvalidCount { count });
        }
        let range = self.ranges.allocate(model, count)?;

        if traits.global_receiver && self.topology.recording_ranks() > 0 {
            self.place_global_receivers(model, range);
        } else if traits.has_proxies {
            self.place_sharded(model, range);
        } else if !traits.one_per_rank {
            self.place_replicated(model, range);
        } else {
            self.place_rank_singletons(model, range);
        }

        if traits.off_grid {
            self.note_off_grid(model);
        }
        Ok(range)
    }

    /// Recreate one node per item and apply its property map.
    ///
    /// Count-greater-than-one sharding subtleties do not apply here:
    /// each item creates exactly one GID, and its map goes straight to
    /// the fresh node (and to every sibling child, for replicated
    /// models).
    ///
    /// # Errors
    ///
    /// [`KernelError::Placement`] for an unknown model name, or
    /// [`KernelError::Node`] if a node rejects its map. Items before
    /// the failing one remain created.
    pub fn restore(&mut self, items: &[(String, PropertyMap)]) -> Result<(), KernelError> {
        for (name, props) in items {
            let model =
                self.registry
                    .id_of(name)
                    .ok_or_else(|| PlacementError::UnknownModelName {
                        name: name.clone(),
                    })?;
            let range = self.create(model, 1)?;
            self.apply_to_entry(range.first, props)?;
        }
        Ok(())
    }

    fn place_sharded(&mut self, model: ModelId, range: NodeRange) {
        let topo = self.topology;
        if topo.is_simulating_rank() {
            self.reserve_local_share(model, range, u64::from(topo.simulating_ranks()));

            let mut gid = if topo.owns_gid(range.first) {
                range.first
            } else {
                topo.next_local_gid(range.first)
            };
            while gid <= range.last {
                let thread = topo.worker_thread(topo.suggest_worker(gid));
                let node = self.instantiate(model);
                let handle = self.store.insert(model, thread, node);
                self.directory.add_local(gid, handle);
                gid = topo.next_local_gid(gid);
            }
        }
        // Ranks that did not materialise the final GID still record it,
        // so max_gid agrees everywhere.
        if !topo.owns_gid(range.last) {
            self.directory.add_remote(range.last);
        }
    }

    fn place_global_receivers(&mut self, model: ModelId, range: NodeRange) {
        let topo = self.topology;
        if topo.is_recording_rank() {
            self.reserve_local_share(model, range, u64::from(topo.recording_ranks()));
        }
        for gid in range.iter() {
            let worker = topo.suggest_recording_worker(self.receiver_cursor);
            self.receiver_cursor += 1;
            if topo.is_local_worker(worker) {
                let thread = topo.worker_thread(worker);
                let node = self.instantiate(model);
                let handle = self.store.insert(model, thread, node);
                self.directory.add_local(gid, handle);
            } else {
                self.directory.add_remote(gid);
            }
        }
    }

    fn place_replicated(&mut self, model: ModelId, range: NodeRange) {
        let topo = self.topology;
        let threads = topo.threads_per_rank();
        // Every thread gets one instance per GID: reserve the full load.
        for t in 0..threads {
            self.store
                .reserve_additional(model, ThreadId(t), range.len() as usize);
        }
        self.reserve_directory_share(range);

        for gid in range.iter() {
            let mut bundle = SiblingBundle::with_capacity(threads);
            for t in 0..threads {
                let node = self.instantiate(model);
                bundle.push(self.store.insert(model, ThreadId(t), node));
            }
            self.directory.add_siblings(gid, bundle);
        }
    }

    fn place_rank_singletons(&mut self, model: ModelId, range: NodeRange) {
        // One instance per rank, always on thread 0. Every rank
        // materialises every GID, so no remote markers are needed.
        for gid in range.iter() {
            let node = self.instantiate(model);
            let handle = self.store.insert(model, ThreadId(0), node);
            self.directory.add_local(gid, handle);
        }
    }

    /// Bulk-reserve directory and slab capacity for this rank's
    /// expected share of a range, before any node is constructed.
    fn reserve_local_share(&mut self, model: ModelId, range: NodeRange, sharing_ranks: u64) {
        self.reserve_directory_share(range);
        let per_thread =
            (range.len() / sharing_ranks) / u64::from(self.topology.threads_per_rank()) + 1;
        for t in 0..self.topology.threads_per_rank() {
            self.store
                .reserve_additional(model, ThreadId(t), per_thread as usize);
        }
    }

    fn reserve_directory_share(&mut self, range: NodeRange) {
        let sim = u64::from(self.topology.simulating_ranks());
        let expected = range.last.0.div_ceil(sim) as usize + self.reserve_slack;
        self.directory.reserve_total(expected);
    }

    /// Model validity is checked on entry to [`create`](Self::create);
    /// the registry cannot lose a model mid-call.
    fn instantiate(&self, model: ModelId) -> Box<dyn Node> {
        match self.registry.instantiate(model) {
            Ok(node) => node,
            Err(_) => unreachable!("model {model} validated before placement"),
        }
    }

    fn note_off_grid(&mut self, model: ModelId) {
        self.off_grid = true;
        if !self.off_grid_notified {
            self.off_grid_notified = true;
            info!(
                model = self.registry.name(model).unwrap_or("?"),
                "models emitting precisely timed events exist: off-grid \
                 communication is now enabled. Mixing precise and \
                 grid-aligned models may lead to inconsistent results"
            );
        }
    }

    // ── Lookup ──────────────────────────────────────────────────────

    /// Resolve a GID to the local node instance for one thread.
    ///
    /// Plain nodes ignore the thread hint; sibling bundles resolve the
    /// hinted thread's child.
    ///
    /// # Errors
    ///
    /// [`LookupError::NotLocal`] for GIDs owned by another rank (the
    /// event-routing layer supplies proxies for those),
    /// [`LookupError::UnknownNode`] for GIDs never created, and
    /// [`LookupError::ThreadOutOfRange`] for a bad sibling index.
    pub fn get_node(&self, gid: NodeId, thread: ThreadId) -> Result<&dyn Node, LookupError> {
        match self.directory.get(gid) {
            Some(DirectoryEntry::Local(handle)) => self
                .store
                .get(*handle)
                .ok_or(LookupError::UnknownNode { id: gid }),
            Some(DirectoryEntry::Siblings(bundle)) => {
                let handle = bundle
                    .sibling(thread)
                    .ok_or(LookupError::ThreadOutOfRange {
                        id: gid,
                        thread,
                        sibling_count: bundle.len(),
                    })?;
                self.store
                    .get(handle)
                    .ok_or(LookupError::UnknownNode { id: gid })
            }
            Some(DirectoryEntry::Remote) => Err(LookupError::NotLocal { id: gid }),
            None => Err(self.missing(gid)),
        }
    }

    /// The sibling bundle registered at a GID.
    ///
    /// # Errors
    ///
    /// [`LookupError::NoSiblings`] if the GID names a plain node,
    /// [`LookupError::NotLocal`] / [`LookupError::UnknownNode`]
    /// otherwise.
    pub fn get_siblings(&self, gid: NodeId) -> Result<&SiblingBundle, LookupError> {
        match self.directory.get(gid) {
            Some(DirectoryEntry::Siblings(bundle)) => Ok(bundle),
            Some(DirectoryEntry::Local(_)) => Err(LookupError::NoSiblings { id: gid }),
            Some(DirectoryEntry::Remote) => Err(LookupError::NotLocal { id: gid }),
            None => Err(self.missing(gid)),
        }
    }

    /// A GID absent from the directory is either remote (within the
    /// created range — unowned GIDs get no entry except a range's last)
    /// or was never created at all.
    fn missing(&self, gid: NodeId) -> LookupError {
        if gid.0 >= 1 && gid <= self.directory.max_gid() {
            LookupError::NotLocal { id: gid }
        } else {
            LookupError::UnknownNode { id: gid }
        }
    }

    // ── Status access ───────────────────────────────────────────────

    /// Report a node's observable state, plus the kernel's `global_id`
    /// and `model` entries.
    ///
    /// For sibling bundles this reports thread 0's instance.
    ///
    /// # Errors
    ///
    /// See [`get_node`](Self::get_node).
    pub fn status(&self, gid: NodeId) -> Result<PropertyMap, LookupError> {
        let node = self.get_node(gid, ThreadId(0))?;
        let mut props = node.status();
        props.insert("global_id".into(), PropertyValue::Int(gid.0 as i64));
        if let Some(name) = self.ranges.model_of(gid).and_then(|m| self.registry.name(m)) {
            props.insert("model".into(), PropertyValue::from(name));
        }
        Ok(props)
    }

    /// Apply a property map to the node at a GID — to every sibling
    /// child if the GID names a bundle.
    ///
    /// # Errors
    ///
    /// [`KernelError::Lookup`] if the GID does not resolve locally,
    /// [`KernelError::Node`] if the node rejects an entry.
    pub fn set_status(&mut self, gid: NodeId, props: &PropertyMap) -> Result<(), KernelError> {
        self.apply_to_entry(gid, props)
    }

    fn apply_to_entry(&mut self, gid: NodeId, props: &PropertyMap) -> Result<(), KernelError> {
        let handles: Vec<NodeHandle> = match self.directory.get(gid) {
            Some(DirectoryEntry::Local(handle)) => vec![*handle],
            Some(DirectoryEntry::Siblings(bundle)) => bundle.iter().collect(),
            Some(DirectoryEntry::Remote) => {
                return Err(LookupError::NotLocal { id: gid }.into());
            }
            None => return Err(self.missing(gid).into()),
        };
        for handle in handles {
            if let Some(node) = self.store.get_mut(handle) {
                node.apply_status(props)
                    .map_err(|source| KernelError::Node { gid, source })?;
            }
        }
        Ok(())
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Initialise buffers and calibrate every non-frozen node, one
    /// worker per thread, refreshing the update cache and the
    /// relaxation consensus first.
    ///
    /// # Errors
    ///
    /// One aggregated [`PrepareError`] after all threads joined. The
    /// run must not start until the cause is corrected, and a full
    /// [`reset`](Self::reset) is required before retrying — prepare
    /// does not roll back partially initialised nodes.
    pub fn prepare(&mut self) -> Result<PrepareReport, PrepareError> {
        let snapshot = self.refresh_cache();
        let report = lifecycle::prepare_pass(&mut self.store, &snapshot)?;
        self.active_nodes = report.active;
        if report.active_relaxation > 0 {
            info!(
                active = report.active,
                relaxation = report.active_relaxation,
                "prepared nodes for simulation; some use iterative solution techniques"
            );
        } else {
            info!(active = report.active, "prepared nodes for simulation");
        }
        Ok(report)
    }

    /// Reinitialise the state of every local node and sibling child
    /// and mark buffers for re-initialisation on the next prepare.
    ///
    /// Iterates the directory directly — reset is valid while the
    /// update cache is stale. Idempotent.
    pub fn reset(&mut self) {
        lifecycle::reset_pass(&mut self.store, &self.directory);
    }

    /// Run every node's end-of-run teardown hook, one worker per
    /// thread.
    pub fn finalize_nodes(&mut self) {
        let snapshot = self.refresh_cache();
        lifecycle::finalize_pass(&mut self.store, &snapshot);
    }

    /// Run every node's post-run-segment cleanup, one worker per
    /// thread.
    pub fn post_run_cleanup(&mut self) {
        let snapshot = self.refresh_cache();
        lifecycle::cleanup_pass(&mut self.store, &snapshot);
    }

    /// Finalize every node, then release all storage in bulk.
    ///
    /// Nodes are finalized before the slabs drop because devices may
    /// need to close files. Also runs on drop; safe to call twice.
    pub fn teardown(&mut self) {
        for (_gid, entry) in self.directory.iter() {
            match entry {
                DirectoryEntry::Local(handle) => {
                    if let Some(node) = self.store.get_mut(*handle) {
                        node.finalize();
                    }
                }
                DirectoryEntry::Siblings(bundle) => {
                    for handle in bundle.iter() {
                        if let Some(node) = self.store.get_mut(handle) {
                            node.finalize();
                        }
                    }
                }
                DirectoryEntry::Remote => {}
            }
        }
        self.directory.clear();
        self.store.clear();
        self.ranges.clear();
        self.cache.invalidate();
        self.relaxation = RelaxationConsensus::new();
        self.receiver_cursor = 0;
        self.off_grid = false;
        self.active_nodes = 0;
    }

    // ── Cache and consensus ─────────────────────────────────────────

    /// A per-thread view of this rank's nodes, consistent with the
    /// current population. The per-step update loop iterates these
    /// views, never the directory.
    pub fn thread_views(&mut self) -> Arc<CacheSnapshot> {
        self.refresh_cache()
    }

    fn refresh_cache(&mut self) -> Arc<CacheSnapshot> {
        let snapshot = self
            .cache
            .ensure(&self.directory, &self.store, &self.topology);
        self.relaxation
            .sync(snapshot.relaxation_used(), self.collective.as_ref());
        snapshot
    }

    /// Whether iterative relaxation is in use anywhere in the fleet,
    /// per the last consensus.
    pub fn relaxation_active(&self) -> bool {
        self.relaxation.active()
    }

    /// Length of the relaxation coupling buffer for the agreed minimum
    /// delay.
    pub fn coupling_coeff_len(&self, min_delay_steps: u64) -> u64 {
        relaxation::coupling_coeff_len(min_delay_steps, self.interpolation_order)
    }

    // ── Introspection ───────────────────────────────────────────────

    /// Global network size: the number of GIDs created fleet-wide.
    pub fn size(&self) -> u64 {
        self.directory.max_gid().0
    }

    /// The highest GID this rank has observed.
    pub fn max_gid(&self) -> NodeId {
        self.directory.max_gid()
    }

    /// Number of node instances materialised on this rank, sibling
    /// children included.
    pub fn local_node_count(&self) -> usize {
        self.store.node_count()
    }

    /// Nodes counted active (prepared, non-frozen) by the last
    /// successful prepare.
    pub fn active_nodes(&self) -> usize {
        self.active_nodes
    }

    /// Whether any created model emits off-grid (precisely timed)
    /// events.
    pub fn off_grid_active(&self) -> bool {
        self.off_grid
    }

    /// The model registry backing this population.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// This rank's topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Print the model-range table: GID ranges grouped by model name,
    /// aligned on the widest GID.
    pub fn describe(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let digits = self.directory.max_gid().0.max(1).to_string().len();
        let range_width = 2 * digits + 4;
        let mut first_row = true;
        for range in self.ranges.iter() {
            if !first_row {
                writeln!(out)?;
            }
            first_row = false;

            let mut cell = String::new();
            write!(cell, "{:>digits$}", range.first.0)?;
            if range.last != range.first {
                write!(cell, " .. {:>digits$}", range.last.0)?;
            }
            let name = self.registry.name(range.model).unwrap_or("?");
            write!(out, "{cell:<range_width$} {name}")?;
        }
        Ok(())
    }
}

impl Drop for Population {
    fn drop(&mut self) {
        // Devices may need to close files; teardown finalizes every
        // node before releasing the slabs.
        self.teardown();
    }
}
