//! Synfire: the node-placement and lifecycle core of a distributed
//! discrete-event simulation kernel.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Synfire sub-crates. For most users, adding `synfire` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use synfire::prelude::*;
//!
//! // A minimal node: no dynamic state beyond the trait defaults.
//! #[derive(Default)]
//! struct Relay;
//! impl Node for Relay {
//!     fn init_state(&mut self) {}
//!     fn init_buffers(&mut self) -> Result<(), NodeError> { Ok(()) }
//!     fn calibrate(&mut self) -> Result<(), NodeError> { Ok(()) }
//!     fn apply_status(&mut self, _props: &PropertyMap) -> Result<(), NodeError> {
//!         Ok(())
//!     }
//! }
//!
//! // Register the model, build a single-rank two-thread kernel.
//! let mut registry = ModelRegistry::new();
//! let relay = registry
//!     .register("relay", ModelTraits::default(), Box::new(|| Box::new(Relay)))
//!     .unwrap();
//! let config = KernelConfig::single_rank(2).unwrap();
//! let mut population = Population::new(config, registry);
//!
//! // Create four nodes; GIDs are dense starting at 1, sharded 2/2
//! // across the worker threads.
//! let range = population.create(relay, 4).unwrap();
//! assert_eq!((range.first, range.last), (NodeId(1), NodeId(4)));
//! let report = population.prepare().unwrap();
//! assert_eq!(report.active, 4);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `synfire-core` | IDs, the `Node` trait, property maps, core errors |
//! | [`topology`] | `synfire-topology` | Rank/worker sharding arithmetic, `Collective` |
//! | [`models`] | `synfire-models` | Model registry, node store, handles |
//! | [`kernel`] | `synfire-kernel` | Placement, directory, cache, lifecycle |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, the `Node` trait, and error types (`synfire-core`).
pub use synfire_core as types;

/// Rank/worker/thread topology and the collective seam
/// (`synfire-topology`).
pub use synfire_topology as topology;

/// Model registry and slab node storage (`synfire-models`).
pub use synfire_models as models;

/// Placement policy, sparse directory, update cache, and lifecycle
/// coordination (`synfire-kernel`).
pub use synfire_kernel as kernel;

/// Common imports for typical Synfire usage.
///
/// ```rust
/// use synfire::prelude::*;
/// ```
pub mod prelude {
    // IDs and core traits
    pub use synfire_core::{
        LookupError, ModelId, Node, NodeError, NodeId, PlacementError, PropertyMap,
        PropertyValue, Rank, ThreadId, WorkerId,
    };

    // Topology
    pub use synfire_topology::{Collective, SingleProcess, Topology, TopologyConfig};

    // Models and storage
    pub use synfire_models::{ModelRegistry, ModelTraits, NodeHandle, NodeStore};

    // Kernel
    pub use synfire_kernel::{
        CacheSnapshot, KernelConfig, KernelError, NodeRange, Population, PrepareError,
        PrepareReport, SiblingBundle,
    };
}
