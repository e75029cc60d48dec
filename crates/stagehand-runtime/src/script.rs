use crate::host::{splice_attributes, HostRegistry};
use crate::processor::Processor;
use stagehand_schema::{
    Handle, Locator, Placement, RegistrationRequest, ResourceKind, TagAttributes,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registers scripts. A script has one source (or none), may be placed in
/// the footer via the boolean `in_footer` option, and accepts inline code on
/// either side.
pub struct ScriptProcessor {
    host: Arc<HostRegistry>,
}

impl ScriptProcessor {
    pub fn new(host: Arc<HostRegistry>) -> Self {
        Self { host }
    }
}

impl Processor for ScriptProcessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Script
    }

    fn register(&self, request: RegistrationRequest<'_>) -> bool {
        if let Locator::Sources(list) = request.locator {
            warn!(
                "script '{}': expected a single source, got {}",
                request.handle,
                list.len()
            );
            return false;
        }
        if let Some(value) = request.options.get("in_footer") {
            if !value.is_boolean() {
                warn!(
                    "script '{}': in_footer must be a boolean, got {value}",
                    request.handle
                );
                return false;
            }
        }
        self.host.register(ResourceKind::Script, request)
    }

    fn activate(&self, handle: &Handle) {
        if !self.host.activate(ResourceKind::Script, handle) {
            warn!("script '{handle}': host refused activation of an unknown handle");
        }
    }

    fn is_registered(&self, handle: &Handle) -> bool {
        self.host.is_registered(ResourceKind::Script, handle)
    }

    fn is_active(&self, handle: &Handle) -> bool {
        self.host.is_active(ResourceKind::Script, handle)
    }

    fn inject_fragment(&self, handle: &Handle, placement: Placement, content: &str) -> bool {
        self.host
            .add_inline(ResourceKind::Script, handle, placement, content)
    }

    fn mutate_representation(&self, handle: &Handle, attributes: &TagAttributes) {
        if attributes.is_empty() {
            return;
        }
        debug!("script '{handle}': installing tag filter for {} attributes", attributes.len());
        let target = handle.clone();
        let attributes = attributes.clone();
        self.host.add_tag_filter(
            ResourceKind::Script,
            Box::new(move |h, tag| {
                if *h == target {
                    splice_attributes(&tag, "script", &attributes)
                } else {
                    tag
                }
            }),
        );
    }
}
