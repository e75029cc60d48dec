//! Listener values handed to the host's trigger subsystem.
//!
//! A listener carries only the data needed to route a trigger firing back
//! to the right orchestrator entry point, so two bindings of the same
//! listener compare equal and hosts can store them without closures.

use crate::types::{Priority, ResourceKind, TriggerName};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ListenerAction {
    /// Drain the deferral bucket `(trigger, priority)`.
    Deferred {
        trigger: TriggerName,
        priority: Priority,
    },
    /// Flush fragments attached to externally registered parents.
    ExternalInline { trigger: TriggerName },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerListener {
    pub kind: ResourceKind,
    #[serde(flatten)]
    pub action: ListenerAction,
}

impl TriggerListener {
    pub fn deferred(kind: ResourceKind, trigger: TriggerName, priority: Priority) -> Self {
        Self {
            kind,
            action: ListenerAction::Deferred { trigger, priority },
        }
    }

    pub fn external_inline(kind: ResourceKind, trigger: TriggerName) -> Self {
        Self {
            kind,
            action: ListenerAction::ExternalInline { trigger },
        }
    }

    pub fn trigger(&self) -> &TriggerName {
        match &self.action {
            ListenerAction::Deferred { trigger, .. } | ListenerAction::ExternalInline { trigger } => {
                trigger
            }
        }
    }
}

impl fmt::Display for TriggerListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            ListenerAction::Deferred { trigger, priority } => {
                write!(f, "{}:deferred@{trigger}/{priority}", self.kind)
            }
            ListenerAction::ExternalInline { trigger } => {
                write!(f, "{}:inline@{trigger}", self.kind)
            }
        }
    }
}
