use crate::binder::TriggerBinder;
use crate::deferral::{DeferralRegistry, DeferredBucket};
use crate::external::{ExternalAttachment, ExternalAttachmentRegistry};
use crate::lifecycle::{Lifecycle, ResourceState};
use crate::queue::{QueuedResource, ResourceQueue};
use crate::CoreError;
use serde::Serialize;
use stagehand_runtime::{Processor, TriggerHost};
use stagehand_schema::{
    Handle, InlineFragment, ListenerAction, OrchestratorConfig, Priority, ResolutionState,
    ResourceDefinition, ResourceKind, TriggerBinding, TriggerListener, TriggerName,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Serializable view of one orchestrator's queues and counters.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorSnapshot {
    pub kind: ResourceKind,
    pub pending: Vec<Handle>,
    pub deferred: Vec<DeferredBucket>,
    pub external: Vec<ExternalAttachment>,
    pub bindings: usize,
    pub activated: usize,
    pub guard_skipped: usize,
    pub registration_failed: usize,
}

/// Drives the resources of one kind through declare → register → activate.
///
/// The orchestrator owns its queues exclusively and never holds an iterator
/// over a registry while mutating it: buckets and attachment lists are taken
/// out before they are processed, so repeated or re-entrant trigger firings
/// find nothing left to do.
///
/// Callers must run [`stage`](Self::stage) before
/// [`process_immediate`](Self::process_immediate); the reverse order is
/// reported as [`CoreError::ContractViolation`].
pub struct Orchestrator<P: Processor> {
    kind: ResourceKind,
    processor: P,
    triggers: Arc<dyn TriggerHost>,
    config: OrchestratorConfig,
    queue: ResourceQueue,
    deferred: DeferralRegistry,
    external: ExternalAttachmentRegistry,
    binder: TriggerBinder,
    lifecycle: Lifecycle,
}

impl<P: Processor> Orchestrator<P> {
    pub fn new(processor: P, triggers: Arc<dyn TriggerHost>, config: OrchestratorConfig) -> Self {
        Self {
            kind: processor.kind(),
            processor,
            triggers,
            config,
            queue: ResourceQueue::new(),
            deferred: DeferralRegistry::new(),
            external: ExternalAttachmentRegistry::new(),
            binder: TriggerBinder::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Queue definitions in order. The whole batch is validated first, so a
    /// malformed entry leaves the queue untouched.
    pub fn declare<I>(&mut self, definitions: I) -> Result<usize, CoreError>
    where
        I: IntoIterator<Item = ResourceDefinition>,
    {
        let batch: Vec<ResourceDefinition> = definitions.into_iter().collect();
        for def in &batch {
            def.validate(self.kind)?;
        }

        let count = batch.len();
        for def in batch {
            let seq = self.lifecycle.begin(&def.handle);
            debug!("declared {} '{}' (#{seq})", self.kind, def.handle);
            self.queue.push(seq, def);
        }
        Ok(count)
    }

    pub fn declare_one(&mut self, definition: ResourceDefinition) -> Result<(), CoreError> {
        self.declare([definition]).map(|_| ())
    }

    /// Split the queue into resources registered now and resources deferred
    /// to a trigger. Entries already staged by an earlier call are left as
    /// they are.
    pub fn stage(&mut self) {
        let entries = self.queue.take_all();
        let mut kept = Vec::with_capacity(entries.len());
        let (mut registered, mut deferred) = (0usize, 0usize);

        for entry in entries {
            if self.lifecycle.state(entry.seq) != Some(ResourceState::Pending) {
                kept.push(entry);
                continue;
            }

            if let Some(binding) = entry.definition.trigger.clone() {
                self.defer(entry, binding);
                deferred += 1;
                continue;
            }

            if !entry.definition.passes_guard() {
                debug!("guard skipped {} '{}'", self.kind, entry.definition.handle);
                self.transition(entry.seq, ResourceState::GuardSkipped);
                continue;
            }

            if self.ensure_registered(&entry.definition) {
                self.transition(entry.seq, ResourceState::RegisteredPendingActivation);
                kept.push(entry);
                registered += 1;
            } else {
                self.drop_failed(entry);
            }
        }

        self.queue.restore(kept);
        info!(
            "staged {}: {registered} registered, {deferred} deferred",
            self.kind
        );
    }

    /// Activate everything left in the queue and flush its fragments.
    /// Returns the number of resources activated.
    pub fn process_immediate(&mut self) -> Result<usize, CoreError> {
        let unstaged = self
            .queue
            .iter()
            .find(|e| self.lifecycle.state(e.seq) == Some(ResourceState::Pending));
        if let Some(entry) = unstaged {
            let handle = &entry.definition.handle;
            let reason = match &entry.definition.trigger {
                Some(binding) => format!(
                    "'{handle}' is still bound to trigger '{}'; stage() must run first",
                    binding.name
                ),
                None => format!("'{handle}' was declared after the last stage()"),
            };
            return Err(CoreError::ContractViolation {
                kind: self.kind,
                reason,
            });
        }

        let entries = self.queue.take_all();
        let count = entries.len();
        for entry in entries {
            self.activate(entry);
        }
        info!("activated {count} immediate {} resource(s)", self.kind);
        Ok(count)
    }

    /// Drain the `(trigger, priority)` bucket. The bucket is removed before
    /// any resource in it is touched. Returns the number activated.
    pub fn process_deferred(&mut self, trigger: &TriggerName, priority: Priority) -> usize {
        let bucket = self.deferred.take_bucket(trigger, priority);
        if bucket.is_empty() {
            debug!("no deferred {} resources for '{trigger}'/{priority}", self.kind);
            return 0;
        }

        debug!(
            "processing {} deferred {} resource(s) for '{trigger}'/{priority}",
            bucket.len(),
            self.kind
        );
        let mut activated = 0;
        for entry in bucket {
            if !entry.definition.passes_guard() {
                debug!("guard skipped {} '{}'", self.kind, entry.definition.handle);
                self.transition(entry.seq, ResourceState::GuardSkipped);
                continue;
            }
            if !self.ensure_registered(&entry.definition) {
                self.drop_failed(entry);
                continue;
            }
            self.transition(entry.seq, ResourceState::RegisteredPendingActivation);
            self.activate(entry);
            activated += 1;
        }
        activated
    }

    /// Attach `fragment` to `target`, wherever the target currently lives:
    /// the pending queue, a deferral bucket, or (when the host already knows
    /// the handle, or the caller named a trigger) the external registry.
    /// Returns false when the fragment was dropped.
    pub fn attach_inline(&mut self, target: &str, fragment: InlineFragment) -> bool {
        let kind = self.kind;

        if let Some(entry) = self.queue.find_mut(target) {
            warn_ignored_trigger(kind, target, &fragment, "queued");
            debug!("attached {} fragment to queued {kind} '{target}'", fragment.placement);
            entry.definition.inline.push(fragment);
            return true;
        }

        if let Some(entry) = self.deferred.find_mut(target) {
            warn_ignored_trigger(kind, target, &fragment, "deferred");
            debug!("attached {} fragment to deferred {kind} '{target}'", fragment.placement);
            entry.definition.inline.push(fragment);
            return true;
        }

        self.attach_external(Handle::from(target), fragment)
    }

    /// Flush fragments attached to externally registered parents under
    /// `trigger`. Returns the number of fragments injected.
    pub fn process_external_inline(&mut self, trigger: &TriggerName) -> usize {
        let parents = self.external.take(trigger);
        let mut injected = 0;
        for (handle, fragments) in parents {
            if !self.processor.is_registered(&handle) {
                warn!(
                    "dropping {} inline fragment(s): {} '{handle}' is not registered at '{trigger}'",
                    fragments.len(),
                    self.kind
                );
                continue;
            }
            injected += self.flush_fragments(&handle, fragments);
        }
        injected
    }

    /// Route a fired listener to the matching entry point. Listeners bound by
    /// another kind are ignored.
    pub fn handle_trigger(&mut self, listener: &TriggerListener) -> usize {
        if listener.kind != self.kind {
            debug!("{} orchestrator ignoring {listener}", self.kind);
            return 0;
        }
        match &listener.action {
            ListenerAction::Deferred { trigger, priority } => self.process_deferred(trigger, *priority),
            ListenerAction::ExternalInline { trigger } => self.process_external_inline(trigger),
        }
    }

    pub fn list_pending(&self) -> Vec<Handle> {
        self.queue.handles()
    }

    pub fn list_deferred(&self) -> Vec<DeferredBucket> {
        self.deferred.snapshot()
    }

    pub fn list_external_attachments(&self) -> Vec<ExternalAttachment> {
        self.external.snapshot()
    }

    /// State of the most recent declaration of `handle`.
    pub fn state_of(&self, handle: &str) -> Option<ResourceState> {
        self.lifecycle.latest(handle)
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        OrchestratorSnapshot {
            kind: self.kind,
            pending: self.list_pending(),
            deferred: self.list_deferred(),
            external: self.list_external_attachments(),
            bindings: self.binder.len(),
            activated: self.lifecycle.count(ResourceState::Activated),
            guard_skipped: self.lifecycle.count(ResourceState::GuardSkipped),
            registration_failed: self.lifecycle.count(ResourceState::RegistrationFailed),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn defer(&mut self, entry: QueuedResource, binding: TriggerBinding) {
        let TriggerBinding { name, priority } = binding;
        if self.triggers.has_trigger_fired(&name) {
            debug!(
                "'{name}' already fired; {} '{}' waits for its next occurrence",
                self.kind, entry.definition.handle
            );
        }
        self.transition(entry.seq, ResourceState::Deferred);
        self.deferred.insert(name.clone(), priority, entry);
        let listener = TriggerListener::deferred(self.kind, name, priority);
        self.binder.bind(self.triggers.as_ref(), listener, priority);
    }

    fn attach_external(&mut self, handle: Handle, mut fragment: InlineFragment) -> bool {
        let registered = self.processor.is_registered(&handle);
        let explicit = fragment
            .explicit_trigger
            .clone()
            .filter(|t| !t.trim().is_empty());
        let Some(trigger) = explicit.or_else(|| {
            registered.then(|| self.config.default_inline_trigger.clone())
        }) else {
            warn!(
                "dropping inline fragment for {} '{handle}': not declared, not registered, no trigger given",
                self.kind
            );
            return false;
        };

        fragment.resolution = Some(if registered {
            ResolutionState::AlreadyRegistered
        } else {
            ResolutionState::Promised
        });
        debug!(
            "attached {} fragment to external {} '{handle}' at '{trigger}'",
            fragment.placement, self.kind
        );
        self.external.push(trigger.clone(), handle, fragment);

        let priority = self.config.default_priority;
        let listener = TriggerListener::external_inline(self.kind, trigger);
        self.binder.bind(self.triggers.as_ref(), listener, priority);
        true
    }

    /// Register unless the host already knows the handle. Tag attributes are
    /// handed over only by the declaration that performed the registration.
    /// Returns false on registration failure.
    fn ensure_registered(&self, def: &ResourceDefinition) -> bool {
        if self.processor.is_registered(&def.handle) {
            debug!("{} '{}' already registered", self.kind, def.handle);
            return true;
        }
        if !self.processor.register(def.registration_request()) {
            return false;
        }
        if !def.attributes.is_empty() {
            self.processor
                .mutate_representation(&def.handle, &def.attributes);
        }
        true
    }

    fn activate(&mut self, entry: QueuedResource) {
        let QueuedResource { seq, definition } = entry;
        if self.processor.is_active(&definition.handle) {
            debug!("{} '{}' already active", self.kind, definition.handle);
        } else {
            self.processor.activate(&definition.handle);
        }
        self.transition(seq, ResourceState::Activated);
        self.flush_fragments(&definition.handle, definition.inline);
    }

    fn drop_failed(&mut self, entry: QueuedResource) {
        let handle = &entry.definition.handle;
        warn!("registration failed for {} '{handle}'; dropping it", self.kind);
        if !entry.definition.inline.is_empty() {
            warn!(
                "dropping {} inline fragment(s) of unregistered {} '{handle}'",
                entry.definition.inline.len(),
                self.kind
            );
        }
        self.transition(entry.seq, ResourceState::RegistrationFailed);
    }

    fn flush_fragments(&self, handle: &Handle, fragments: Vec<InlineFragment>) -> usize {
        let mut injected = 0;
        for fragment in fragments {
            if !fragment.passes_guard() {
                debug!("guard skipped {} fragment for '{handle}'", fragment.placement);
                continue;
            }
            if fragment.is_blank() {
                warn!("dropping empty inline fragment for {} '{handle}'", self.kind);
                continue;
            }
            if self
                .processor
                .inject_fragment(handle, fragment.placement, &fragment.content)
            {
                injected += 1;
            } else {
                warn!(
                    "{} processor rejected {} fragment for '{handle}'",
                    self.kind, fragment.placement
                );
            }
        }
        injected
    }

    fn transition(&mut self, seq: u64, to: ResourceState) {
        if let Err(e) = self.lifecycle.advance(seq, to) {
            warn!("{} lifecycle: {e}", self.kind);
        }
    }
}

fn warn_ignored_trigger(kind: ResourceKind, target: &str, fragment: &InlineFragment, location: &str) {
    if let Some(trigger) = &fragment.explicit_trigger {
        warn!("{kind} '{target}' is {location}; ignoring explicit trigger '{trigger}' for its fragment");
    }
}
