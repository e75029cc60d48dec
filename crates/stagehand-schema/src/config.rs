use crate::types::{Priority, TriggerName, DEFAULT_PRIORITY};
use serde::{Deserialize, Serialize};

/// Orchestrator tunables, read from the `[orchestrator]` manifest section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Trigger used for fragments whose parent was registered outside the
    /// orchestrator and whose caller named no trigger.
    #[serde(default = "default_inline_trigger")]
    pub default_inline_trigger: TriggerName,
    /// Priority at which external-inline listeners are bound.
    #[serde(default = "default_priority")]
    pub default_priority: Priority,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_inline_trigger: default_inline_trigger(),
            default_priority: default_priority(),
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn with_inline_trigger(mut self, trigger: impl Into<TriggerName>) -> Self {
        self.default_inline_trigger = trigger.into();
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }
}

fn default_inline_trigger() -> TriggerName {
    TriggerName::new("wp_footer")
}

fn default_priority() -> Priority {
    DEFAULT_PRIORITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.default_inline_trigger, "wp_footer");
        assert_eq!(config.default_priority, 10);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: OrchestratorConfig = toml::from_str("default_priority = 20").unwrap();
        assert_eq!(config.default_priority, 20);
        assert_eq!(config.default_inline_trigger, "wp_footer");
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<OrchestratorConfig>("inline_trigger = \"x\"").is_err());
    }
}
