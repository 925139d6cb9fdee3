//! GID range allocation and the model-range table.
//!
//! Every creation call reserves one contiguous range of GIDs, strictly
//! above everything allocated before. The table records which model
//! occupies each range, which is how a GID's model is reconstructed
//! without storing it per node, and what [`describe`] prints.
//!
//! [`describe`]: crate::population::Population::describe

use synfire_core::{ModelId, NodeId, PlacementError};

/// A contiguous, inclusive range of GIDs created from one model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeRange {
    /// The model every GID in the range was created from.
    pub model: ModelId,
    /// First GID of the range.
    pub first: NodeId,
    /// Last GID of the range (inclusive).
    pub last: NodeId,
}

impl NodeRange {
    /// Number of GIDs in the range.
    pub fn len(&self) -> u64 {
        self.last.0 - self.first.0 + 1
    }

    /// Ranges are never empty; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the range contains a GID.
    pub fn contains(&self, gid: NodeId) -> bool {
        self.first <= gid && gid <= self.last
    }

    /// Iterate the GIDs of the range in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> {
        (self.first.0..=self.last.0).map(NodeId)
    }
}

/// Append-only table of [`NodeRange`]s in allocation order.
///
/// Ranges are non-overlapping and ordered by first GID; adjacent ranges
/// of the same model are kept separate — one creation call, one row.
#[derive(Debug, Default)]
pub struct ModelRangeTable {
    ranges: Vec<NodeRange>,
    /// Next GID to hand out. GID 0 is never assigned.
    next: Option<NodeId>,
}

impl ModelRangeTable {
    /// Create an empty table; the first allocation starts at GID 1.
    pub fn new() -> Self {
        Self {
            ranges: Vec::new(),
            next: Some(NodeId(1)),
        }
    }

    /// Reserve a fresh range of `count` GIDs for `model`.
    ///
    /// Atomic with respect to the creation call: on error the table is
    /// untouched and no GID is consumed.
    ///
    /// # Errors
    ///
    /// [`PlacementError::InvalidCount`] for `count == 0`;
    /// [`PlacementError::IdRangeExhausted`] if the range would overflow
    /// the addressable GID space.
    pub fn allocate(&mut self, model: ModelId, count: u64) -> Result<NodeRange, PlacementError> {
        if count == 0 {
            return Err(PlacementError::InvalidCount { count });
        }
        let exhausted = || PlacementError::IdRangeExhausted {
            requested: count,
            highest: self.last_assigned(),
        };
        let first = self.next.ok_or_else(exhausted)?;
        let last = NodeId(first.0.checked_add(count - 1).ok_or_else(exhausted)?);
        let range = NodeRange { model, first, last };
        self.ranges.push(range);
        self.next = last.0.checked_add(1).map(NodeId);
        Ok(range)
    }

    /// Highest GID assigned so far; `NodeId(0)` before any allocation.
    pub fn last_assigned(&self) -> NodeId {
        match self.ranges.last() {
            Some(range) => range.last,
            None => NodeId(0),
        }
    }

    /// The model a GID was created from, if it was ever allocated.
    pub fn model_of(&self, gid: NodeId) -> Option<ModelId> {
        self.ranges
            .binary_search_by(|range| {
                if gid < range.first {
                    std::cmp::Ordering::Greater
                } else if gid > range.last {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
            .map(|i| self.ranges[i].model)
    }

    /// The recorded ranges in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeRange> {
        self.ranges.iter()
    }

    /// Number of recorded ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether no range has been allocated.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Forget every range and restart GID assignment at 1.
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.next = Some(NodeId(1));
    }
}
