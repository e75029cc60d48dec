use serde::Serialize;
use stagehand_runtime::TriggerHost;
use stagehand_schema::{ListenerAction, Priority, ResourceKind, TriggerListener, TriggerName};
use std::collections::HashSet;
use tracing::debug;

/// Which orchestrator entry point a bound listener routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerRole {
    Deferred,
    ExternalInline,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BindingKey {
    pub kind: ResourceKind,
    pub trigger: TriggerName,
    pub priority: Priority,
    pub role: ListenerRole,
}

/// Remembers which listeners were handed to the host so each combination is
/// bound exactly once per orchestrator.
#[derive(Debug, Default)]
pub struct TriggerBinder {
    bound: HashSet<BindingKey>,
}

impl TriggerBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `listener` at `priority` unless an equivalent binding exists.
    /// Returns true when a new binding was made.
    pub fn bind(&mut self, host: &dyn TriggerHost, listener: TriggerListener, priority: Priority) -> bool {
        let key = Self::key_for(&listener, priority);
        if self.bound.contains(&key) {
            return false;
        }
        debug!("binding {listener} at priority {priority}");
        host.bind_trigger_callback(&key.trigger, priority, listener);
        self.bound.insert(key);
        true
    }

    pub fn is_bound(&self, key: &BindingKey) -> bool {
        self.bound.contains(key)
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    fn key_for(listener: &TriggerListener, priority: Priority) -> BindingKey {
        let role = match listener.action {
            ListenerAction::Deferred { .. } => ListenerRole::Deferred,
            ListenerAction::ExternalInline { .. } => ListenerRole::ExternalInline,
        };
        BindingKey {
            kind: listener.kind,
            trigger: listener.trigger().clone(),
            priority,
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_runtime::HookBus;

    #[test]
    fn binds_each_combination_once() {
        let bus = HookBus::new();
        let mut binder = TriggerBinder::new();
        let l = TriggerListener::deferred(ResourceKind::Script, "footer".into(), 10);
        assert!(binder.bind(&bus, l.clone(), 10));
        assert!(!binder.bind(&bus, l, 10));
        assert_eq!(bus.bound_count(), 1);
        assert_eq!(binder.len(), 1);
    }

    #[test]
    fn roles_and_priorities_are_distinct_keys() {
        let bus = HookBus::new();
        let mut binder = TriggerBinder::new();
        let footer = TriggerName::from("footer");
        assert!(binder.bind(
            &bus,
            TriggerListener::deferred(ResourceKind::Script, footer.clone(), 10),
            10
        ));
        assert!(binder.bind(
            &bus,
            TriggerListener::deferred(ResourceKind::Script, footer.clone(), 20),
            20
        ));
        assert!(binder.bind(
            &bus,
            TriggerListener::external_inline(ResourceKind::Script, footer.clone()),
            10
        ));
        assert_eq!(bus.bound_count(), 3);
        assert!(binder.is_bound(&BindingKey {
            kind: ResourceKind::Script,
            trigger: footer,
            priority: 10,
            role: ListenerRole::ExternalInline,
        }));
    }
}
