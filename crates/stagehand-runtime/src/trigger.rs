//! The host's trigger subsystem as seen by the orchestrator.
//!
//! [`TriggerHost`] is the seam: bind a listener to `(trigger, priority)` and
//! ask whether a trigger already fired. [`HookBus`] is the in-process
//! implementation: firing a trigger returns the bound listeners ordered by
//! ascending priority (ties in binding order) for the caller to dispatch.

use stagehand_schema::{Priority, TriggerListener, TriggerName};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

pub trait TriggerHost: Send + Sync {
    fn bind_trigger_callback(
        &self,
        trigger: &TriggerName,
        priority: Priority,
        listener: TriggerListener,
    );

    fn has_trigger_fired(&self, trigger: &TriggerName) -> bool;
}

impl<T: TriggerHost + ?Sized> TriggerHost for Arc<T> {
    fn bind_trigger_callback(
        &self,
        trigger: &TriggerName,
        priority: Priority,
        listener: TriggerListener,
    ) {
        (**self).bind_trigger_callback(trigger, priority, listener);
    }

    fn has_trigger_fired(&self, trigger: &TriggerName) -> bool {
        (**self).has_trigger_fired(trigger)
    }
}

#[derive(Debug, Clone)]
struct Binding {
    priority: Priority,
    seq: u64,
    listener: TriggerListener,
}

#[derive(Debug, Default)]
struct BusState {
    bindings: BTreeMap<TriggerName, Vec<Binding>>,
    fired: BTreeMap<TriggerName, usize>,
    next_seq: u64,
}

#[derive(Debug, Default)]
pub struct HookBus {
    state: Mutex<BusState>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `trigger` as fired and return a snapshot of its listeners in
    /// dispatch order. Listeners stay bound; firing again returns them again.
    pub fn fire(&self, trigger: &TriggerName) -> Vec<TriggerListener> {
        let mut state = self.state();
        *state.fired.entry(trigger.clone()).or_insert(0) += 1;
        let mut bound = state.bindings.get(trigger).cloned().unwrap_or_default();
        bound.sort_by_key(|b| (b.priority, b.seq));
        debug!("firing '{trigger}' with {} listener(s)", bound.len());
        bound.into_iter().map(|b| b.listener).collect()
    }

    pub fn fired_count(&self, trigger: &TriggerName) -> usize {
        self.state().fired.get(trigger).copied().unwrap_or(0)
    }

    /// Total number of bindings across all triggers, duplicates included.
    pub fn bound_count(&self) -> usize {
        self.state().bindings.values().map(Vec::len).sum()
    }

    pub fn listeners_for(&self, trigger: &TriggerName) -> Vec<(Priority, TriggerListener)> {
        self.state()
            .bindings
            .get(trigger)
            .map(|v| v.iter().map(|b| (b.priority, b.listener.clone())).collect())
            .unwrap_or_default()
    }
}

impl TriggerHost for HookBus {
    fn bind_trigger_callback(
        &self,
        trigger: &TriggerName,
        priority: Priority,
        listener: TriggerListener,
    ) {
        let mut state = self.state();
        let seq = state.next_seq;
        state.next_seq += 1;
        trace!("binding {listener} to '{trigger}' at priority {priority}");
        state
            .bindings
            .entry(trigger.clone())
            .or_default()
            .push(Binding {
                priority,
                seq,
                listener,
            });
    }

    fn has_trigger_fired(&self, trigger: &TriggerName) -> bool {
        self.fired_count(trigger) > 0
    }
}
