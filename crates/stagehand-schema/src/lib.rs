//! Resource definitions, inline fragments, listeners, and manifests for Stagehand.
//!
//! This crate defines the data layer shared by processors and the orchestrator:
//! identifier newtypes (`Handle`, `TriggerName`), `ResourceDefinition` with its
//! locator/version/trigger model, `InlineFragment`, the `TriggerListener` value
//! handed to hosts in place of callbacks, orchestrator configuration, and TOML
//! manifest parsing (`ResourceManifest`) with normalization into validated
//! definitions (`NormalizedManifest`).

pub mod config;
pub mod definition;
pub mod fragment;
pub mod listener;
pub mod manifest;
pub mod normalize;
pub mod types;

pub use config::OrchestratorConfig;
pub use definition::{
    ActivationOptions, Guard, Locator, RegistrationRequest, ResourceDefinition, TagAttributes,
    TriggerBinding, VersionToken,
};
pub use fragment::{InlineFragment, Placement, ResolutionState};
pub use listener::{ListenerAction, TriggerListener};
pub use manifest::{
    parse_manifest_file, parse_manifest_str, AttributeValue, InlineSection, ManifestError,
    ResourceEntry, ResourceManifest, TriggerSection,
};
pub use normalize::{InlineRequest, NormalizedManifest};
pub use types::{Handle, Priority, ResourceKind, TriggerName, DEFAULT_PRIORITY};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{kind} definition has an empty handle")]
    EmptyHandle { kind: ResourceKind },
    #[error("{kind} '{handle}': locator must not be an empty string")]
    EmptyLocator { kind: ResourceKind, handle: String },
    #[error("{kind} '{handle}': locator list must contain at least one source")]
    EmptyLocatorList { kind: ResourceKind, handle: String },
    #[error("{kind} '{handle}': locator list entry {index} is empty")]
    EmptyLocatorEntry {
        kind: ResourceKind,
        handle: String,
        index: usize,
    },
    #[error("{kind} '{handle}': trigger name must not be empty")]
    EmptyTriggerName { kind: ResourceKind, handle: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_display_names_kind_and_handle() {
        let e = SchemaError::EmptyLocator {
            kind: ResourceKind::Style,
            handle: "theme".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.contains("style"));
        assert!(msg.contains("'theme'"));
    }
}
