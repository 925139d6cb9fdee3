//! Node placement, directory, and lifecycle core of the Synfire
//! simulation kernel.
//!
//! The hard problem this crate solves is deterministic, collision-free
//! placement of a dynamically growing node population across a fleet of
//! ranks and, within each rank, across a pool of worker threads —
//! without any rank holding more than its own shard, while every rank
//! still agrees on the global numbering and on fleet-wide flags.
//!
//! # Architecture
//!
//! ```text
//! Population (placement policy + kernel surface)
//! ├── ModelRangeTable   GID range allocation, GID → model
//! ├── SparseDirectory   GID → Local | Siblings | Remote
//! ├── NodeStore         per-(model, thread) slabs owning the nodes
//! ├── UpdateCache       per-thread dense views, Stale/Rebuilding/Fresh
//! ├── lifecycle         parallel prepare / reset / finalize / cleanup
//! └── RelaxationConsensus   fleet-wide logical-or of relaxation usage
//! ```
//!
//! The per-step update loop consumes [`CacheSnapshot`] views, never the
//! directory; the directory exists for GID resolution and for the
//! passes that must run while the cache is stale.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod population;
pub mod ranges;
pub mod relaxation;

pub use cache::{CacheSnapshot, ThreadView, UpdateCache};
pub use config::{KernelConfig, DEFAULT_INTERPOLATION_ORDER, DEFAULT_RESERVE_SLACK};
pub use directory::{DirectoryEntry, SiblingBundle, SparseDirectory};
pub use error::KernelError;
pub use lifecycle::{PrepareError, PrepareReport, ThreadFailure};
pub use population::Population;
pub use ranges::{ModelRangeTable, NodeRange};
pub use relaxation::{coupling_coeff_len, RelaxationConsensus};
