//! Cross-rank agreement on iterative relaxation usage.
//!
//! If any node anywhere in the fleet uses waveform-relaxation-style
//! coupling, every rank must execute the extra collective step of the
//! simulation loop — a rank that skipped it would desynchronise the
//! fleet's collective call sequence. The agreed flag therefore comes
//! from a logical-or reduction, never from local state alone.

use synfire_topology::Collective;

/// The fleet-wide relaxation flag, refreshed after every population
/// change that could affect the rank-local flag.
#[derive(Clone, Copy, Debug, Default)]
pub struct RelaxationConsensus {
    agreed: bool,
}

impl RelaxationConsensus {
    /// Start with relaxation inactive (an empty population uses none).
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce this rank's flag with all other ranks' and store the
    /// agreed result.
    pub fn sync(&mut self, local: bool, collective: &dyn Collective) -> bool {
        self.agreed = collective.any_true(local);
        self.agreed
    }

    /// The last agreed fleet-wide flag.
    pub fn active(&self) -> bool {
        self.agreed
    }
}

/// Length of the relaxation coupling-coefficient buffer, in steps.
///
/// Sized from the agreed minimum delay and the configured
/// interpolation order: one coefficient set per delay step and
/// interpolation support point.
pub fn coupling_coeff_len(min_delay_steps: u64, interpolation_order: u32) -> u64 {
    min_delay_steps * (u64::from(interpolation_order) + 1)
}
