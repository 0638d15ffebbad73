//! The set of all targets known to a build.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};

use super::{Target, TargetId, TargetKey};

/// Concurrent map from target key to target.
///
/// Insertion is atomic per key: when several threads ask for the same key at
/// once, exactly one target is created and all of them get it back.
#[derive(Debug, Default)]
pub struct TargetGraph {
  targets: DashMap<TargetKey, Arc<Target>>,
  next_id: AtomicU64,
}

impl TargetGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn find(&self, key: &TargetKey) -> Option<Arc<Target>> {
    self.targets.get(key).map(|t| t.value().clone())
  }

  /// Find the target for `key`, creating it with the kind's factory if it
  /// does not exist yet. The flag is true if this call created it.
  pub fn find_or_create(&self, key: TargetKey) -> (Arc<Target>, bool) {
    match self.targets.entry(key) {
      Entry::Occupied(entry) => {
        trace!(key = %entry.key(), "found existing target");
        (entry.get().clone(), false)
      }
      Entry::Vacant(entry) => {
        let id = TargetId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let key = entry.key().clone();
        let factory = key.kind.factory();
        let target = Arc::new(factory(id, key));
        debug!(key = %target, id = %id, "created target");
        entry.insert(target.clone());
        (target, true)
      }
    }
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }

  /// Snapshot of all targets, in no particular order.
  pub fn targets(&self) -> Vec<Arc<Target>> {
    self.targets.iter().map(|t| t.value().clone()).collect()
  }
}
