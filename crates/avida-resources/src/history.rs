//! Historical resource series
//!
//! The live population records one snapshot of resource levels per update.
//! Test runs read the series; they never write to it.

use std::sync::Arc;

use avida_common::{ResourceError, ResourceLevels};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Per-update snapshot of resource levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub update: u64,
    pub levels: ResourceLevels,
}

/// Ordered per-update snapshot series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceHistory {
    snapshots: Vec<Snapshot>,
}

impl ResourceHistory {
    /// Create an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot; updates must be strictly increasing
    pub fn record(&mut self, update: u64, levels: ResourceLevels) -> Result<(), ResourceError> {
        if let Some(last) = self.snapshots.last() {
            if update <= last.update {
                return Err(ResourceError::OutOfOrderUpdate {
                    update,
                    last: last.update,
                });
            }
            if levels.len() != last.levels.len() {
                return Err(ResourceError::LengthMismatch {
                    expected: last.levels.len(),
                    actual: levels.len(),
                });
            }
        }
        self.snapshots.push(Snapshot { update, levels });
        Ok(())
    }

    /// Levels at `update`: the exact snapshot, or when `exact` is false the
    /// latest snapshot at or before it
    pub fn levels_at(&self, update: u64, exact: bool) -> Option<&ResourceLevels> {
        match self.snapshots.binary_search_by_key(&update, |s| s.update) {
            Ok(idx) => Some(&self.snapshots[idx].levels),
            Err(0) => None,
            Err(_) if exact => None,
            Err(idx) => Some(&self.snapshots[idx - 1].levels),
        }
    }

    /// Snapshot recorded at exactly `update`
    #[inline]
    pub fn exact(&self, update: u64) -> Option<&ResourceLevels> {
        self.levels_at(update, true)
    }

    /// Last recorded update
    pub fn last_update(&self) -> Option<u64> {
        self.snapshots.last().map(|s| s.update)
    }

    /// Number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if no snapshots were recorded
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Resource count of the series (None when empty)
    pub fn resource_count(&self) -> Option<usize> {
        self.snapshots.first().map(|s| s.levels.len())
    }

    /// Parse a series from JSON
    pub fn from_json(text: &str) -> avida_common::Result<Self> {
        let history: ResourceHistory = serde_json::from_str(text)?;
        for pair in history.snapshots.windows(2) {
            if pair[1].update <= pair[0].update {
                return Err(ResourceError::OutOfOrderUpdate {
                    update: pair[1].update,
                    last: pair[0].update,
                }
                .into());
            }
        }
        Ok(history)
    }
}

/// Handle the live population publishes snapshots through
///
/// Tests take an `Arc` snapshot once at start, so a run never observes
/// updates published while it executes.
#[derive(Debug, Clone, Default)]
pub struct SharedHistory {
    inner: Arc<RwLock<Arc<ResourceHistory>>>,
}

impl SharedHistory {
    /// Wrap an existing series
    pub fn new(history: ResourceHistory) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(history))),
        }
    }

    /// Record the levels of a finished update (copy-on-write)
    pub fn publish(&self, update: u64, levels: ResourceLevels) -> Result<(), ResourceError> {
        let mut guard = self.inner.write();
        Arc::make_mut(&mut *guard).record(update, levels)?;
        trace!(update, "Published resource snapshot");
        Ok(())
    }

    /// Immutable view of the series as of now
    pub fn snapshot(&self) -> Arc<ResourceHistory> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_snapshot_is_stable() {
        let shared = SharedHistory::default();
        shared.publish(1, vec![5.0].into()).unwrap();
        let before = shared.snapshot();
        shared.publish(2, vec![4.0].into()).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(shared.snapshot().len(), 2);
    }

    fn series() -> ResourceHistory {
        let mut h = ResourceHistory::new();
        h.record(10, vec![100.0].into()).unwrap();
        h.record(20, vec![80.0].into()).unwrap();
        h.record(30, vec![60.0].into()).unwrap();
        h
    }

    #[test]
    fn test_levels_at_latest_before() {
        let h = series();
        assert_eq!(h.levels_at(25, false).unwrap().get(0), 80.0);
        assert_eq!(h.levels_at(30, false).unwrap().get(0), 60.0);
        assert_eq!(h.levels_at(99, false).unwrap().get(0), 60.0);
        assert!(h.levels_at(5, false).is_none());
    }

    #[test]
    fn test_levels_at_exact() {
        let h = series();
        assert!(h.levels_at(25, true).is_none());
        assert_eq!(h.exact(20).unwrap().get(0), 80.0);
    }

    #[test]
    fn test_record_rejects_out_of_order() {
        let mut h = series();
        let err = h.record(30, vec![1.0].into()).unwrap_err();
        assert_eq!(err, ResourceError::OutOfOrderUpdate { update: 30, last: 30 });
    }

    #[test]
    fn test_record_rejects_length_change() {
        let mut h = series();
        assert!(h.record(40, vec![1.0, 2.0].into()).is_err());
        assert_eq!(h.last_update(), Some(30));
    }
}
