//! Benchmark profiles for the Synfire simulation kernel.
//!
//! Provides pre-built populations so benches and examples measure the
//! kernel, not fixture setup.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use synfire_kernel::{KernelConfig, Population};
use synfire_test_utils::{standard_registry, StandardModels};

/// Build a single-rank population with `neurons` proxied nodes and
/// `probes` thread-replicated devices across `threads` worker threads.
pub fn reference_population(
    threads: u32,
    neurons: u64,
    probes: u64,
) -> (Population, StandardModels) {
    let (registry, models) = standard_registry();
    let config = KernelConfig::single_rank(threads)
        .expect("thread count is non-zero in every profile");
    let mut population = Population::new(config, registry);
    if neurons > 0 {
        population
            .create(models.neuron, neurons)
            .expect("reference population fits the GID range");
    }
    if probes > 0 {
        population
            .create(models.probe, probes)
            .expect("reference population fits the GID range");
    }
    (population, models)
}
