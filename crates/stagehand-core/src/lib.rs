//! Resource lifecycle orchestration for Stagehand.
//!
//! This crate ties schema definitions and runtime processors together into the
//! `Orchestrator`: one instance per resource kind, owning the pending
//! `ResourceQueue`, the trigger-keyed `DeferralRegistry`, the
//! `ExternalAttachmentRegistry` for fragments whose parent lives outside the
//! orchestrator, and the `TriggerBinder` that keeps host bindings unique. The
//! `Loader` builds the per-kind orchestrators, feeds them a manifest, and
//! routes trigger firings back to them. Lifecycle transitions are validated
//! by a small state machine and recorded per declaration.

pub mod binder;
pub mod deferral;
pub mod external;
pub mod lifecycle;
pub mod loader;
pub mod orchestrator;
pub mod queue;

pub use binder::{BindingKey, ListenerRole, TriggerBinder};
pub use deferral::{DeferralRegistry, DeferredBucket};
pub use external::{ExternalAttachment, ExternalAttachmentRegistry};
pub use lifecycle::{validate_transition, Lifecycle, ResourceState};
pub use loader::Loader;
pub use orchestrator::{Orchestrator, OrchestratorSnapshot};
pub use queue::{QueuedResource, ResourceQueue};

use stagehand_schema::ResourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(#[from] stagehand_schema::SchemaError),
    #[error("manifest error: {0}")]
    Manifest(#[from] stagehand_schema::ManifestError),
    #[error("{kind} orchestrator used out of order: {reason}")]
    ContractViolation { kind: ResourceKind, reason: String },
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
