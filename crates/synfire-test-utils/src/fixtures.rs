//! Ready-made topologies and a registry covering every placement
//! strategy.

use synfire_core::ModelId;
use synfire_models::{ModelRegistry, ModelTraits};
use synfire_topology::{Topology, TopologyConfig};

use crate::TestNode;

/// Single-rank topology with the given thread count.
pub fn single_rank(threads: u32) -> Topology {
    Topology::single_rank(threads).unwrap()
}

/// One rank's view of a multi-rank fleet.
pub fn fleet_member(total_ranks: u32, recording_ranks: u32, rank: u32, threads: u32) -> Topology {
    Topology::new(TopologyConfig {
        total_ranks,
        recording_ranks,
        rank,
        threads_per_rank: threads,
    })
    .unwrap()
}

/// Model IDs returned by [`standard_registry`].
#[derive(Clone, Copy, Debug)]
pub struct StandardModels {
    /// Ordinary proxied neuron — proxy sharding.
    pub neuron: ModelId,
    /// Proxied neuron whose instances use iterative relaxation.
    pub wfr_neuron: ModelId,
    /// Proxied neuron emitting precisely timed (off-grid) events.
    pub precise_neuron: ModelId,
    /// Proxy-less device — one instance per worker thread.
    pub probe: ModelId,
    /// Proxy-less device with one instance per rank, on thread 0.
    pub rank_meter: ModelId,
    /// Global receiver — placed on recording ranks when any exist.
    pub spike_sink: ModelId,
}

/// A registry with one model per placement strategy, all backed by
/// [`TestNode`].
pub fn standard_registry() -> (ModelRegistry, StandardModels) {
    let mut registry = ModelRegistry::new();
    let neuron = registry
        .register("neuron", ModelTraits::default(), TestNode::new().ctor())
        .unwrap();
    let wfr_neuron = registry
        .register(
            "wfr_neuron",
            ModelTraits::default(),
            TestNode::relaxing().ctor(),
        )
        .unwrap();
    let precise_neuron = registry
        .register(
            "precise_neuron",
            ModelTraits {
                off_grid: true,
                ..ModelTraits::default()
            },
            TestNode::new().ctor(),
        )
        .unwrap();
    let probe = registry
        .register(
            "probe",
            ModelTraits {
                has_proxies: false,
                ..ModelTraits::default()
            },
            TestNode::new().ctor(),
        )
        .unwrap();
    let rank_meter = registry
        .register(
            "rank_meter",
            ModelTraits {
                has_proxies: false,
                one_per_rank: true,
                ..ModelTraits::default()
            },
            TestNode::new().ctor(),
        )
        .unwrap();
    let spike_sink = registry
        .register(
            "spike_sink",
            ModelTraits {
                global_receiver: true,
                ..ModelTraits::default()
            },
            TestNode::new().ctor(),
        )
        .unwrap();

    (
        registry,
        StandardModels {
            neuron,
            wfr_neuron,
            precise_neuron,
            probe,
            rank_meter,
            spike_sink,
        },
    )
}
