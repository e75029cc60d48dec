use crate::host::HostRegistry;
use crate::processor::Processor;
use stagehand_schema::{Handle, Placement, RegistrationRequest, ResourceKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registers block definitions. A block's locator may list every file of its
/// metadata bundle; blocks render no tag of their own and take no inline
/// fragments.
pub struct BlockProcessor {
    host: Arc<HostRegistry>,
}

impl BlockProcessor {
    pub fn new(host: Arc<HostRegistry>) -> Self {
        Self { host }
    }
}

impl Processor for BlockProcessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Block
    }

    fn register(&self, request: RegistrationRequest<'_>) -> bool {
        self.host.register(ResourceKind::Block, request)
    }

    fn activate(&self, handle: &Handle) {
        if !self.host.activate(ResourceKind::Block, handle) {
            warn!("block '{handle}': host refused activation of an unknown handle");
        }
    }

    fn is_registered(&self, handle: &Handle) -> bool {
        self.host.is_registered(ResourceKind::Block, handle)
    }

    fn is_active(&self, handle: &Handle) -> bool {
        self.host.is_active(ResourceKind::Block, handle)
    }

    fn inject_fragment(&self, handle: &Handle, _placement: Placement, _content: &str) -> bool {
        debug!("block '{handle}': blocks do not carry inline fragments");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_schema::ResourceDefinition;

    #[test]
    fn accepts_source_lists() {
        let host = Arc::new(HostRegistry::new());
        let blocks = BlockProcessor::new(Arc::clone(&host));
        let def = ResourceDefinition::new(
            "gallery",
            vec!["gallery/block.json".to_owned(), "gallery/index.js".to_owned()],
        );
        assert!(blocks.register(def.registration_request()));
        blocks.activate(&def.handle);
        assert!(blocks.is_active(&def.handle));
        assert_eq!(host.render_tag(ResourceKind::Block, &def.handle), None);
    }

    #[test]
    fn refuses_fragments() {
        let blocks = BlockProcessor::new(Arc::new(HostRegistry::new()));
        let def = ResourceDefinition::registration_only("gallery");
        blocks.register(def.registration_request());
        assert!(!blocks.inject_fragment(&def.handle, Placement::After, "x"));
    }
}
