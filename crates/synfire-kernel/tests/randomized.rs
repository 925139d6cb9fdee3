//! Seeded randomized creation sequences: the placement invariants must
//! hold for any interleaving of models and counts.

use rand::{RngExt, SeedableRng};
use rand_chacha::ChaCha8Rng;

use synfire_core::ThreadId;
use synfire_kernel::{KernelConfig, Population};
use synfire_test_utils::standard_registry;

#[test]
fn placement_invariants_hold_for_random_sequences() {
    let threads = 3u32;
    let (registry, m) = standard_registry();
    let config = KernelConfig::single_rank(threads).unwrap();
    let mut pop = Population::new(config, registry);

    let mut rng = ChaCha8Rng::seed_from_u64(0x5f1e);
    let mut expected_gids = 0u64;
    let mut expected_local = 0usize;
    let mut expected_relaxation = 0usize;

    for _ in 0..50 {
        let count = rng.random_range(1..6u64);
        let model = match rng.random_range(0..4u32) {
            0 => {
                expected_local += count as usize;
                m.neuron
            }
            1 => {
                expected_local += count as usize;
                expected_relaxation += count as usize;
                m.wfr_neuron
            }
            2 => {
                expected_local += count as usize * threads as usize;
                m.probe
            }
            _ => {
                expected_local += count as usize;
                m.rank_meter
            }
        };

        let range = pop.create(model, count).unwrap();
        assert_eq!(range.len(), count);
        assert_eq!(range.first.0, expected_gids + 1);
        expected_gids += count;
        assert_eq!(pop.max_gid().0, expected_gids);
    }

    assert_eq!(pop.local_node_count(), expected_local);

    // The cache agrees with the store, and every node sits in the view
    // of the thread its handle names.
    let views = pop.thread_views();
    assert_eq!(views.total_len(), expected_local);
    for (t, view) in views.views().iter().enumerate() {
        for handle in &view.nodes {
            assert_eq!(handle.thread, ThreadId(t as u32));
        }
    }

    let report = pop.prepare().unwrap();
    assert_eq!(report.active, expected_local);
    assert_eq!(report.active_relaxation, expected_relaxation);
}
