//! Test utilities for Synfire development: an instrumented [`TestNode`]
//! whose lifecycle counters are observable through its status map, a
//! standard model registry covering every placement strategy, and
//! topology fixtures.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{fleet_member, single_rank, standard_registry, StandardModels};

use synfire_core::{Node, NodeError, PropertyMap, PropertyValue};
use synfire_models::registry::NodeCtor;
use synfire_topology::Collective;

/// Instrumented node counting every lifecycle call.
///
/// All counters are reported by [`status`](Node::status) as integers,
/// so tests can observe per-node post-conditions through the kernel's
/// public status path instead of downcasting.
#[derive(Clone, Debug, Default)]
pub struct TestNode {
    frozen: bool,
    relaxation: bool,
    fail_calibration: bool,
    label: String,
    buffers_ready: bool,
    state_inits: u32,
    buffer_inits: u32,
    calibrations: u32,
    finalizes: u32,
    cleanups: u32,
}

impl TestNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node that reports `uses_relaxation()`.
    pub fn relaxing() -> Self {
        Self {
            relaxation: true,
            ..Self::default()
        }
    }

    /// A node excluded from the active update loop.
    pub fn frozen() -> Self {
        Self {
            frozen: true,
            ..Self::default()
        }
    }

    /// A node whose calibration always fails.
    pub fn failing_calibration() -> Self {
        Self {
            fail_calibration: true,
            ..Self::default()
        }
    }

    /// Use this node as the template for a model constructor.
    pub fn ctor(self) -> NodeCtor {
        Box::new(move || Box::new(self.clone()))
    }
}

impl Node for TestNode {
    fn init_state(&mut self) {
        self.state_inits += 1;
        self.buffers_ready = false;
    }

    fn init_buffers(&mut self) -> Result<(), NodeError> {
        self.buffer_inits += 1;
        self.buffers_ready = true;
        Ok(())
    }

    fn calibrate(&mut self) -> Result<(), NodeError> {
        if self.fail_calibration {
            return Err(NodeError::Calibration {
                reason: "configured to fail".into(),
            });
        }
        self.calibrations += 1;
        Ok(())
    }

    fn finalize(&mut self) {
        self.finalizes += 1;
    }

    fn post_run_cleanup(&mut self) {
        self.cleanups += 1;
    }

    fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn uses_relaxation(&self) -> bool {
        self.relaxation
    }

    fn status(&self) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert("state_inits".into(), i64::from(self.state_inits).into());
        map.insert("buffer_inits".into(), i64::from(self.buffer_inits).into());
        map.insert("calibrations".into(), i64::from(self.calibrations).into());
        map.insert("finalizes".into(), i64::from(self.finalizes).into());
        map.insert("cleanups".into(), i64::from(self.cleanups).into());
        map.insert(
            "buffers_ready".into(),
            PropertyValue::Int(i64::from(self.buffers_ready)),
        );
        map.insert("frozen".into(), self.frozen.into());
        map.insert("relaxation".into(), self.relaxation.into());
        map.insert("label".into(), self.label.as_str().into());
        map
    }

    fn apply_status(&mut self, props: &PropertyMap) -> Result<(), NodeError> {
        for (key, value) in props {
            let bad = |reason: &str| NodeError::BadProperty {
                key: key.clone(),
                reason: reason.into(),
            };
            match key.as_str() {
                "frozen" => self.frozen = value.as_bool().ok_or_else(|| bad("expected bool"))?,
                "relaxation" => {
                    self.relaxation = value.as_bool().ok_or_else(|| bad("expected bool"))?;
                }
                "fail_calibration" => {
                    self.fail_calibration =
                        value.as_bool().ok_or_else(|| bad("expected bool"))?;
                }
                "label" => {
                    self.label = value.as_text().ok_or_else(|| bad("expected text"))?.into();
                }
                // Kernel-injected entries; accepted so status() output
                // round-trips through set_status().
                "global_id" | "model" => {}
                _ => return Err(bad("unknown property")),
            }
        }
        Ok(())
    }
}

/// Collective stub with a fixed remote contribution: the reduction
/// result is `local || remote`.
#[derive(Clone, Copy, Debug)]
pub struct FixedCollective {
    pub remote: bool,
}

impl Collective for FixedCollective {
    fn any_true(&self, local: bool) -> bool {
        local || self.remote
    }
}
