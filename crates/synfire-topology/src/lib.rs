//! Rank and worker-thread topology arithmetic for Synfire.
//!
//! Placement is deterministic: every GID maps to exactly one logical
//! worker, every worker to exactly one (rank, thread) pair, and every
//! rank can evaluate these functions without communicating. The only
//! collective primitive the kernel needs — a logical-or reduction over
//! all ranks — is abstracted behind the [`Collective`] trait so that
//! single-process runs and tests need no transport at all.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collective;
pub mod error;
pub mod topology;

pub use collective::{Collective, SingleProcess};
pub use error::TopologyError;
pub use topology::{Topology, TopologyConfig};
