use crate::queue::QueuedResource;
use serde::Serialize;
use stagehand_schema::{Handle, Priority, TriggerName};
use std::collections::BTreeMap;

/// Read-only view of one `(trigger, priority)` bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeferredBucket {
    pub trigger: TriggerName,
    pub priority: Priority,
    pub handles: Vec<Handle>,
}

/// Resources waiting for a host trigger, keyed by trigger then priority.
/// Empty buckets and empty trigger maps are never kept.
#[derive(Debug, Default)]
pub struct DeferralRegistry {
    buckets: BTreeMap<TriggerName, BTreeMap<Priority, Vec<QueuedResource>>>,
}

impl DeferralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, trigger: TriggerName, priority: Priority, entry: QueuedResource) {
        self.buckets
            .entry(trigger)
            .or_default()
            .entry(priority)
            .or_default()
            .push(entry);
    }

    /// Remove the bucket and hand it to the caller. Returns an empty list
    /// when nothing is waiting, so a second firing finds nothing.
    pub fn take_bucket(&mut self, trigger: &TriggerName, priority: Priority) -> Vec<QueuedResource> {
        let Some(by_priority) = self.buckets.get_mut(trigger) else {
            return Vec::new();
        };
        let bucket = by_priority.remove(&priority).unwrap_or_default();
        if by_priority.is_empty() {
            self.buckets.remove(trigger);
        }
        bucket
    }

    /// First deferred entry with `handle`, scanning triggers and priorities in
    /// key order.
    pub fn find_mut(&mut self, handle: &str) -> Option<&mut QueuedResource> {
        self.buckets
            .values_mut()
            .flat_map(BTreeMap::values_mut)
            .flat_map(|bucket| bucket.iter_mut())
            .find(|e| e.definition.handle == handle)
    }

    pub fn contains_bucket(&self, trigger: &TriggerName, priority: Priority) -> bool {
        self.buckets
            .get(trigger)
            .is_some_and(|m| m.contains_key(&priority))
    }

    pub fn snapshot(&self) -> Vec<DeferredBucket> {
        self.buckets
            .iter()
            .flat_map(|(trigger, by_priority)| {
                by_priority.iter().map(move |(priority, entries)| DeferredBucket {
                    trigger: trigger.clone(),
                    priority: *priority,
                    handles: entries.iter().map(|e| e.definition.handle.clone()).collect(),
                })
            })
            .collect()
    }

    /// Total number of deferred entries across all buckets.
    pub fn len(&self) -> usize {
        self.buckets
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_schema::ResourceDefinition;

    fn entry(seq: u64, handle: &str) -> QueuedResource {
        QueuedResource {
            seq,
            definition: ResourceDefinition::new(handle, format!("{handle}.js")),
        }
    }

    #[test]
    fn take_bucket_removes_empty_maps() {
        let mut reg = DeferralRegistry::new();
        let footer = TriggerName::from("footer");
        reg.insert(footer.clone(), 10, entry(0, "x"));
        reg.insert(footer.clone(), 20, entry(1, "y"));

        let ten = reg.take_bucket(&footer, 10);
        assert_eq!(ten.len(), 1);
        assert!(!reg.contains_bucket(&footer, 10));
        assert!(reg.contains_bucket(&footer, 20));

        reg.take_bucket(&footer, 20);
        assert!(reg.is_empty());
        assert!(reg.take_bucket(&footer, 20).is_empty());
    }

    #[test]
    fn find_mut_scans_every_bucket() {
        let mut reg = DeferralRegistry::new();
        reg.insert("init".into(), 5, entry(0, "a"));
        reg.insert("footer".into(), 99, entry(1, "b"));
        assert_eq!(reg.find_mut("b").map(|e| e.seq), Some(1));
        assert!(reg.find_mut("c").is_none());
    }

    #[test]
    fn snapshot_lists_buckets_in_key_order() {
        let mut reg = DeferralRegistry::new();
        reg.insert("footer".into(), 20, entry(0, "late"));
        reg.insert("footer".into(), 10, entry(1, "early"));
        reg.insert("footer".into(), 10, entry(2, "early2"));
        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].priority, 10);
        assert_eq!(snap[0].handles, vec!["early", "early2"]);
        assert_eq!(reg.len(), 3);
    }
}
