//! End-to-end placement behaviour on a single rank.

use synfire_core::{ModelId, NodeId, PlacementError, ThreadId};
use synfire_kernel::{KernelConfig, Population};
use synfire_test_utils::{standard_registry, StandardModels};

fn population(threads: u32) -> (Population, StandardModels) {
    let (registry, models) = standard_registry();
    let config = KernelConfig::single_rank(threads).unwrap();
    (Population::new(config, registry), models)
}

#[test]
fn four_neurons_split_evenly_across_two_threads() {
    let (mut pop, m) = population(2);
    let range = pop.create(m.neuron, 4).unwrap();
    assert_eq!(range.first, NodeId(1));
    assert_eq!(range.last, NodeId(4));
    assert_eq!(pop.size(), 4);

    // GID % worker_count decides the thread: 1, 3 → thread 1; 2, 4 → 0.
    let views = pop.thread_views();
    assert_eq!(views.view(ThreadId(0)).nodes.len(), 2);
    assert_eq!(views.view(ThreadId(1)).nodes.len(), 2);

    for gid in 1..=4 {
        assert!(pop.get_node(NodeId(gid), ThreadId(0)).is_ok());
    }
}

#[test]
fn ranges_are_contiguous_and_monotonic_across_models() {
    let (mut pop, m) = population(2);
    let a = pop.create(m.neuron, 3).unwrap();
    let b = pop.create(m.probe, 2).unwrap();
    let c = pop.create(m.neuron, 1).unwrap();

    assert_eq!((a.first, a.last), (NodeId(1), NodeId(3)));
    assert_eq!((b.first, b.last), (NodeId(4), NodeId(5)));
    assert_eq!((c.first, c.last), (NodeId(6), NodeId(6)));
    assert_eq!(pop.max_gid(), NodeId(6));
}

#[test]
fn describe_groups_ranges_by_model() {
    let (mut pop, m) = population(2);
    pop.create(m.neuron, 4).unwrap();
    pop.create(m.probe, 1).unwrap();

    let mut out = String::new();
    pop.describe(&mut out).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("1 .. 4"), "got: {:?}", lines[0]);
    assert!(lines[0].ends_with("neuron"));
    assert!(lines[1].trim_start().starts_with('5'));
    assert!(lines[1].ends_with("probe"));
}

#[test]
fn invalid_requests_leave_the_population_untouched() {
    let (mut pop, m) = population(2);

    assert_eq!(
        pop.create(ModelId(99), 1),
        Err(PlacementError::UnknownModel { model: ModelId(99) })
    );
    assert_eq!(
        pop.create(m.neuron, 0),
        Err(PlacementError::InvalidCount { count: 0 })
    );
    assert_eq!(pop.size(), 0);
    assert_eq!(pop.local_node_count(), 0);

    // The failed calls consumed no GIDs.
    let range = pop.create(m.neuron, 1).unwrap();
    assert_eq!(range.first, NodeId(1));
}

#[test]
fn off_grid_models_set_the_kernel_flag() {
    let (mut pop, m) = population(1);
    assert!(!pop.off_grid_active());
    pop.create(m.neuron, 1).unwrap();
    assert!(!pop.off_grid_active());
    pop.create(m.precise_neuron, 1).unwrap();
    assert!(pop.off_grid_active());
}

#[test]
fn restore_creates_and_configures_single_nodes() {
    let (mut pop, _m) = population(2);
    let items = vec![
        ("neuron".to_owned(), {
            let mut props = synfire_core::PropertyMap::new();
            props.insert("label".into(), "alpha".into());
            props
        }),
        ("probe".to_owned(), {
            let mut props = synfire_core::PropertyMap::new();
            props.insert("label".into(), "beta".into());
            props
        }),
    ];
    pop.restore(&items).unwrap();

    assert_eq!(pop.size(), 2);
    assert_eq!(pop.status(NodeId(1)).unwrap()["label"].as_text(), Some("alpha"));
    // The probe replicates per thread; every sibling got the map.
    for t in 0..2 {
        let node = pop.get_node(NodeId(2), ThreadId(t)).unwrap();
        assert_eq!(node.status()["label"].as_text(), Some("beta"));
    }
}

#[test]
fn restore_rejects_unknown_model_names() {
    let (mut pop, _m) = population(1);
    let items = vec![("no_such_model".to_owned(), synfire_core::PropertyMap::new())];
    let err = pop.restore(&items).unwrap_err();
    assert!(err.to_string().contains("no_such_model"));
    assert_eq!(pop.size(), 0);
}

#[test]
fn status_includes_kernel_bookkeeping() {
    let (mut pop, m) = population(1);
    pop.create(m.neuron, 2).unwrap();
    let props = pop.status(NodeId(2)).unwrap();
    assert_eq!(props["global_id"].as_int(), Some(2));
    assert_eq!(props["model"].as_text(), Some("neuron"));
}
