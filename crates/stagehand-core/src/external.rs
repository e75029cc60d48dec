//! Fragments whose parent resource was registered outside the orchestrator.

use serde::Serialize;
use stagehand_schema::{Handle, InlineFragment, ResolutionState, TriggerName};
use std::collections::BTreeMap;

/// Diagnostic view of the fragments waiting on one external parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalAttachment {
    pub trigger: TriggerName,
    pub handle: Handle,
    pub fragments: usize,
    /// Fragments whose parent the host already knew at attach time.
    pub already_registered: usize,
    /// Fragments attached on the promise that the parent appears by `trigger`.
    pub promised: usize,
}

#[derive(Debug, Default)]
pub struct ExternalAttachmentRegistry {
    by_trigger: BTreeMap<TriggerName, Vec<(Handle, Vec<InlineFragment>)>>,
}

impl ExternalAttachmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `fragment` for `handle` under `trigger`. Parents keep the order in
    /// which they were first seen; fragments keep attach order.
    pub fn push(&mut self, trigger: TriggerName, handle: Handle, fragment: InlineFragment) {
        let parents = self.by_trigger.entry(trigger).or_default();
        match parents.iter_mut().find(|(h, _)| *h == handle) {
            Some((_, fragments)) => fragments.push(fragment),
            None => parents.push((handle, vec![fragment])),
        }
    }

    /// Remove everything waiting on `trigger`.
    pub fn take(&mut self, trigger: &TriggerName) -> Vec<(Handle, Vec<InlineFragment>)> {
        self.by_trigger.remove(trigger).unwrap_or_default()
    }

    pub fn snapshot(&self) -> Vec<ExternalAttachment> {
        self.by_trigger
            .iter()
            .flat_map(|(trigger, parents)| {
                parents.iter().map(move |(handle, fragments)| ExternalAttachment {
                    trigger: trigger.clone(),
                    handle: handle.clone(),
                    fragments: fragments.len(),
                    already_registered: count_resolved(fragments, ResolutionState::AlreadyRegistered),
                    promised: count_resolved(fragments, ResolutionState::Promised),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_trigger
            .values()
            .flatten()
            .map(|(_, fragments)| fragments.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_trigger.is_empty()
    }
}

fn count_resolved(fragments: &[InlineFragment], state: ResolutionState) -> usize {
    fragments
        .iter()
        .filter(|f| f.resolution == Some(state))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_fragments_by_parent() {
        let mut reg = ExternalAttachmentRegistry::new();
        let footer = TriggerName::from("footer");
        reg.push(footer.clone(), "jquery".into(), InlineFragment::after("a"));
        reg.push(footer.clone(), "lodash".into(), InlineFragment::after("b"));
        reg.push(footer.clone(), "jquery".into(), InlineFragment::before("c"));

        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].handle, "jquery");
        assert_eq!(snap[0].fragments, 2);
        assert_eq!(reg.len(), 3);

        let taken = reg.take(&footer);
        assert_eq!(taken[0].1[1].content, "c");
        assert!(reg.is_empty());
        assert!(reg.take(&footer).is_empty());
    }

    #[test]
    fn snapshot_counts_each_resolution() {
        let mut reg = ExternalAttachmentRegistry::new();
        let mut promised = InlineFragment::after("x");
        promised.resolution = Some(ResolutionState::Promised);
        let mut known = InlineFragment::after("y");
        known.resolution = Some(ResolutionState::AlreadyRegistered);
        reg.push("late".into(), "widget".into(), promised.clone());
        reg.push("late".into(), "widget".into(), known);
        reg.push("late".into(), "widget".into(), promised);

        let snap = reg.snapshot();
        assert_eq!(snap[0].fragments, 3);
        assert_eq!(snap[0].promised, 2);
        assert_eq!(snap[0].already_registered, 1);
    }
}
