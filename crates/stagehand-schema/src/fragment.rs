use crate::definition::Guard;
use crate::types::TriggerName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the parent resource an inline fragment is emitted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Before,
    #[default]
    After,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Before => write!(f, "before"),
            Placement::After => write!(f, "after"),
        }
    }
}

/// How an externally attached fragment expects its parent to appear.
/// Recorded for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    /// The host already knew the parent when the fragment was attached.
    AlreadyRegistered,
    /// The caller promised the parent would exist by the explicit trigger.
    Promised,
}

/// Supplementary content injected next to a parent resource once the parent
/// is registered.
#[derive(Debug, Clone)]
pub struct InlineFragment {
    pub content: String,
    pub placement: Placement,
    pub guard: Option<Guard>,
    pub explicit_trigger: Option<TriggerName>,
    pub resolution: Option<ResolutionState>,
}

impl InlineFragment {
    pub fn new(content: impl Into<String>, placement: Placement) -> Self {
        Self {
            content: content.into(),
            placement,
            guard: None,
            explicit_trigger: None,
            resolution: None,
        }
    }

    pub fn before(content: impl Into<String>) -> Self {
        Self::new(content, Placement::Before)
    }

    pub fn after(content: impl Into<String>) -> Self {
        Self::new(content, Placement::After)
    }

    #[must_use]
    pub fn with_guard(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Trigger to wait for when the parent is not known to the orchestrator.
    #[must_use]
    pub fn on_trigger(mut self, trigger: impl Into<TriggerName>) -> Self {
        self.explicit_trigger = Some(trigger.into());
        self
    }

    pub fn passes_guard(&self) -> bool {
        self.guard.as_ref().is_none_or(Guard::check)
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_placement() {
        assert_eq!(InlineFragment::before("a").placement, Placement::Before);
        assert_eq!(InlineFragment::after("a").placement, Placement::After);
        assert_eq!(Placement::default(), Placement::After);
    }

    #[test]
    fn blank_content_detection() {
        assert!(InlineFragment::after("").is_blank());
        assert!(InlineFragment::after(" \n\t").is_blank());
        assert!(!InlineFragment::after("x").is_blank());
    }

    #[test]
    fn guard_and_trigger_builders() {
        let f = InlineFragment::after("x")
            .with_guard(|| false)
            .on_trigger("footer");
        assert!(!f.passes_guard());
        assert_eq!(f.explicit_trigger.as_deref(), Some("footer"));
        assert!(f.resolution.is_none());
    }

    #[test]
    fn placement_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Placement::Before).unwrap(), "\"before\"");
        let p: Placement = serde_json::from_str("\"after\"").unwrap();
        assert_eq!(p, Placement::After);
    }
}
