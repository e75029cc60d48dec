use crate::block::BlockProcessor;
use crate::host::HostRegistry;
use crate::script::ScriptProcessor;
use crate::style::StyleProcessor;
use stagehand_schema::{Handle, Placement, RegistrationRequest, ResourceKind, TagAttributes};
use std::sync::Arc;

/// Per-kind capability that performs registration and activation against the
/// external system.
///
/// Implementations hold no orchestration state. Queries must reflect the
/// external system at call time: code outside the orchestrator may register
/// handles between two checks, so results are never cached.
pub trait Processor: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Register the resource. Returns false when the external system refuses.
    fn register(&self, request: RegistrationRequest<'_>) -> bool;

    /// Activate a registered handle. Callers check [`Processor::is_active`]
    /// first to avoid redundant host calls.
    fn activate(&self, handle: &Handle);

    fn is_registered(&self, handle: &Handle) -> bool;

    fn is_active(&self, handle: &Handle) -> bool;

    /// Forward one inline fragment. Returns false if the host rejects it,
    /// e.g. because the parent is not actually registered.
    fn inject_fragment(&self, handle: &Handle, placement: Placement, content: &str) -> bool;

    /// Arrange for `attributes` to be spliced into the handle's rendered
    /// representation. Kinds without a tag representation ignore this.
    fn mutate_representation(&self, _handle: &Handle, _attributes: &TagAttributes) {}
}

impl<P: Processor + ?Sized> Processor for Box<P> {
    fn kind(&self) -> ResourceKind {
        (**self).kind()
    }

    fn register(&self, request: RegistrationRequest<'_>) -> bool {
        (**self).register(request)
    }

    fn activate(&self, handle: &Handle) {
        (**self).activate(handle);
    }

    fn is_registered(&self, handle: &Handle) -> bool {
        (**self).is_registered(handle)
    }

    fn is_active(&self, handle: &Handle) -> bool {
        (**self).is_active(handle)
    }

    fn inject_fragment(&self, handle: &Handle, placement: Placement, content: &str) -> bool {
        (**self).inject_fragment(handle, placement, content)
    }

    fn mutate_representation(&self, handle: &Handle, attributes: &TagAttributes) {
        (**self).mutate_representation(handle, attributes);
    }
}

impl<P: Processor + ?Sized> Processor for Arc<P> {
    fn kind(&self) -> ResourceKind {
        (**self).kind()
    }

    fn register(&self, request: RegistrationRequest<'_>) -> bool {
        (**self).register(request)
    }

    fn activate(&self, handle: &Handle) {
        (**self).activate(handle);
    }

    fn is_registered(&self, handle: &Handle) -> bool {
        (**self).is_registered(handle)
    }

    fn is_active(&self, handle: &Handle) -> bool {
        (**self).is_active(handle)
    }

    fn inject_fragment(&self, handle: &Handle, placement: Placement, content: &str) -> bool {
        (**self).inject_fragment(handle, placement, content)
    }

    fn mutate_representation(&self, handle: &Handle, attributes: &TagAttributes) {
        (**self).mutate_representation(handle, attributes);
    }
}

/// Build the stock processor for `kind`, registering against `host`.
pub fn select_processor(kind: ResourceKind, host: &Arc<HostRegistry>) -> Box<dyn Processor> {
    match kind {
        ResourceKind::Script => Box::new(ScriptProcessor::new(Arc::clone(host))),
        ResourceKind::Style => Box::new(StyleProcessor::new(Arc::clone(host))),
        ResourceKind::Block => Box::new(BlockProcessor::new(Arc::clone(host))),
    }
}
