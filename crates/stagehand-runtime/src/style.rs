use crate::host::{splice_attributes, HostRegistry};
use crate::processor::Processor;
use stagehand_schema::{
    Handle, Locator, Placement, RegistrationRequest, ResourceKind, TagAttributes,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registers stylesheets. The optional `media` option must be a string; the
/// host only supports appending inline styles, so `Before` fragments are
/// refused.
pub struct StyleProcessor {
    host: Arc<HostRegistry>,
}

impl StyleProcessor {
    pub fn new(host: Arc<HostRegistry>) -> Self {
        Self { host }
    }
}

impl Processor for StyleProcessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Style
    }

    fn register(&self, request: RegistrationRequest<'_>) -> bool {
        if let Locator::Sources(list) = request.locator {
            warn!(
                "style '{}': expected a single source, got {}",
                request.handle,
                list.len()
            );
            return false;
        }
        if let Some(media) = request.options.get("media") {
            if !media.is_string() {
                warn!("style '{}': media must be a string, got {media}", request.handle);
                return false;
            }
        }
        self.host.register(ResourceKind::Style, request)
    }

    fn activate(&self, handle: &Handle) {
        if !self.host.activate(ResourceKind::Style, handle) {
            warn!("style '{handle}': host refused activation of an unknown handle");
        }
    }

    fn is_registered(&self, handle: &Handle) -> bool {
        self.host.is_registered(ResourceKind::Style, handle)
    }

    fn is_active(&self, handle: &Handle) -> bool {
        self.host.is_active(ResourceKind::Style, handle)
    }

    fn inject_fragment(&self, handle: &Handle, placement: Placement, content: &str) -> bool {
        if placement == Placement::Before {
            debug!("style '{handle}': inline styles can only follow the stylesheet");
            return false;
        }
        self.host
            .add_inline(ResourceKind::Style, handle, placement, content)
    }

    fn mutate_representation(&self, handle: &Handle, attributes: &TagAttributes) {
        if attributes.is_empty() {
            return;
        }
        let target = handle.clone();
        let attributes = attributes.clone();
        self.host.add_tag_filter(
            ResourceKind::Style,
            Box::new(move |h, tag| {
                if *h == target {
                    splice_attributes(&tag, "link", &attributes)
                } else {
                    tag
                }
            }),
        );
    }
}
