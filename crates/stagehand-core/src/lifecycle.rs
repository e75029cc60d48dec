use crate::CoreError;
use serde::{Deserialize, Serialize};
use stagehand_schema::Handle;
use std::collections::{BTreeMap, HashMap};

/// Where a single declaration stands. Nothing moves backwards; retrying means
/// declaring again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Pending,
    Deferred,
    RegisteredPendingActivation,
    Activated,
    GuardSkipped,
    RegistrationFailed,
}

impl ResourceState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ResourceState::Activated | ResourceState::GuardSkipped | ResourceState::RegistrationFailed
        )
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceState::Pending => write!(f, "pending"),
            ResourceState::Deferred => write!(f, "deferred"),
            ResourceState::RegisteredPendingActivation => write!(f, "registered"),
            ResourceState::Activated => write!(f, "activated"),
            ResourceState::GuardSkipped => write!(f, "guard-skipped"),
            ResourceState::RegistrationFailed => write!(f, "registration-failed"),
        }
    }
}

pub fn validate_transition(from: ResourceState, to: ResourceState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (
            ResourceState::Pending,
            ResourceState::Deferred | ResourceState::RegisteredPendingActivation
        ) | (
            ResourceState::Pending | ResourceState::Deferred,
            ResourceState::GuardSkipped | ResourceState::RegistrationFailed
        ) | (
            ResourceState::Deferred,
            ResourceState::RegisteredPendingActivation
        ) | (
            ResourceState::RegisteredPendingActivation,
            ResourceState::Activated
        )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Per-declaration state record. Every `declare()` gets a fresh sequence
/// number, so redeclaring a handle starts a new, independent entry.
///
/// The ledger lives as long as its orchestrator, which is one request
/// lifecycle; it grows by one entry per declaration and is never pruned.
#[derive(Debug, Default)]
pub struct Lifecycle {
    entries: BTreeMap<u64, (Handle, ResourceState)>,
    latest: HashMap<Handle, u64>,
    next_seq: u64,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new declaration in `Pending` and return its sequence number.
    pub fn begin(&mut self, handle: &Handle) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(seq, (handle.clone(), ResourceState::Pending));
        self.latest.insert(handle.clone(), seq);
        seq
    }

    pub fn advance(&mut self, seq: u64, to: ResourceState) -> Result<(), CoreError> {
        let Some((_, state)) = self.entries.get_mut(&seq) else {
            return Err(CoreError::InvalidTransition {
                from: format!("undeclared #{seq}"),
                to: to.to_string(),
            });
        };
        validate_transition(*state, to)?;
        *state = to;
        Ok(())
    }

    pub fn state(&self, seq: u64) -> Option<ResourceState> {
        self.entries.get(&seq).map(|(_, s)| *s)
    }

    /// State of the most recent declaration of `handle`.
    pub fn latest(&self, handle: &str) -> Option<ResourceState> {
        self.latest.get(handle).and_then(|seq| self.state(*seq))
    }

    pub fn count(&self, state: ResourceState) -> usize {
        self.entries.values().filter(|(_, s)| *s == state).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
