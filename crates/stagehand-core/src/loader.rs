//! Host-level load routine: one orchestrator per resource kind, wired to a
//! shared [`HostRegistry`] and [`HookBus`].

use crate::orchestrator::{Orchestrator, OrchestratorSnapshot};
use crate::CoreError;
use stagehand_runtime::{select_processor, HookBus, HostRegistry, Processor, TriggerHost};
use stagehand_schema::{NormalizedManifest, OrchestratorConfig, ResourceKind, TriggerName};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Loader {
    host: Arc<HostRegistry>,
    bus: Arc<HookBus>,
    scripts: Orchestrator<Box<dyn Processor>>,
    styles: Orchestrator<Box<dyn Processor>>,
    blocks: Orchestrator<Box<dyn Processor>>,
}

impl Loader {
    pub fn new(host: Arc<HostRegistry>, bus: Arc<HookBus>, config: OrchestratorConfig) -> Self {
        let build = |kind| {
            let triggers: Arc<dyn TriggerHost> = bus.clone();
            Orchestrator::new(select_processor(kind, &host), triggers, config.clone())
        };
        let scripts = build(ResourceKind::Script);
        let styles = build(ResourceKind::Style);
        let blocks = build(ResourceKind::Block);
        Self {
            host,
            bus,
            scripts,
            styles,
            blocks,
        }
    }

    /// Build a loader and feed it a normalized manifest: every definition is
    /// declared, then every inline request is attached.
    pub fn from_manifest(
        manifest: &NormalizedManifest,
        host: Arc<HostRegistry>,
        bus: Arc<HookBus>,
    ) -> Result<Self, CoreError> {
        let mut loader = Self::new(host, bus, manifest.config.clone());
        for kind in ResourceKind::ALL {
            loader
                .orchestrator_mut(kind)
                .declare(manifest.definitions(kind).iter().cloned())?;
        }
        for request in &manifest.inline {
            loader
                .orchestrator_mut(request.kind)
                .attach_inline(&request.target, request.fragment.clone());
        }
        debug!(
            "loader built from manifest with {} resource(s)",
            manifest.resource_count()
        );
        Ok(loader)
    }

    pub fn orchestrator(&self, kind: ResourceKind) -> &Orchestrator<Box<dyn Processor>> {
        match kind {
            ResourceKind::Script => &self.scripts,
            ResourceKind::Style => &self.styles,
            ResourceKind::Block => &self.blocks,
        }
    }

    pub fn orchestrator_mut(&mut self, kind: ResourceKind) -> &mut Orchestrator<Box<dyn Processor>> {
        match kind {
            ResourceKind::Script => &mut self.scripts,
            ResourceKind::Style => &mut self.styles,
            ResourceKind::Block => &mut self.blocks,
        }
    }

    /// Stage and process every kind, scripts first. Returns the number of
    /// resources activated immediately.
    pub fn load(&mut self) -> Result<usize, CoreError> {
        let mut activated = 0;
        for kind in ResourceKind::ALL {
            let orch = self.orchestrator_mut(kind);
            orch.stage();
            activated += orch.process_immediate()?;
        }
        info!("load complete: {activated} resource(s) activated");
        Ok(activated)
    }

    /// Fire `trigger` on the bus and dispatch its listeners in priority
    /// order. Returns the total work done (resources activated plus
    /// fragments injected).
    pub fn fire(&mut self, trigger: &TriggerName) -> usize {
        let listeners = self.bus.fire(trigger);
        listeners
            .iter()
            .map(|listener| self.orchestrator_mut(listener.kind).handle_trigger(listener))
            .sum()
    }

    pub fn snapshot(&self) -> Vec<OrchestratorSnapshot> {
        ResourceKind::ALL
            .into_iter()
            .map(|kind| self.orchestrator(kind).snapshot())
            .collect()
    }

    pub fn snapshot_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    pub fn host(&self) -> &Arc<HostRegistry> {
        &self.host
    }

    pub fn bus(&self) -> &Arc<HookBus> {
        &self.bus
    }
}
