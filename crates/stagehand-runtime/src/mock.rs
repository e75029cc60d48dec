use crate::processor::Processor;
use stagehand_schema::{Handle, Placement, RegistrationRequest, ResourceKind, TagAttributes};
use std::collections::BTreeSet;
use std::sync::Mutex;

/// One observed call into a [`MockProcessor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorCall {
    Register(Handle),
    Activate(Handle),
    IsRegistered(Handle),
    IsActive(Handle),
    Inject {
        handle: Handle,
        placement: Placement,
        content: String,
    },
    Mutate {
        handle: Handle,
        attributes: TagAttributes,
    },
}

#[derive(Default)]
struct MockState {
    calls: Vec<ProcessorCall>,
    registered: BTreeSet<Handle>,
    active: BTreeSet<Handle>,
    failing: BTreeSet<Handle>,
    rejecting_fragments: BTreeSet<Handle>,
}

/// Processor that records every call and keeps its own registered/active
/// sets. Failures are scripted per handle.
pub struct MockProcessor {
    kind: ResourceKind,
    state: Mutex<MockState>,
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self::new(ResourceKind::Script)
    }
}

impl MockProcessor {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            state: Mutex::new(MockState::default()),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state)
    }

    /// Simulate outside code registering `handle` directly with the host.
    pub fn preregister(&self, handle: impl Into<Handle>) {
        self.with_state(|s| s.registered.insert(handle.into()));
    }

    /// Make `register` return false for `handle`.
    pub fn fail_registration(&self, handle: impl Into<Handle>) {
        self.with_state(|s| s.failing.insert(handle.into()));
    }

    /// Make `inject_fragment` return false for `handle`.
    pub fn reject_fragments(&self, handle: impl Into<Handle>) {
        self.with_state(|s| s.rejecting_fragments.insert(handle.into()));
    }

    pub fn calls(&self) -> Vec<ProcessorCall> {
        self.with_state(|s| s.calls.clone())
    }

    /// Handles passed to `register`, in call order.
    pub fn registrations(&self) -> Vec<Handle> {
        self.filter_calls(|c| match c {
            ProcessorCall::Register(h) => Some(h.clone()),
            _ => None,
        })
    }

    /// Handles passed to `activate`, in call order.
    pub fn activations(&self) -> Vec<Handle> {
        self.filter_calls(|c| match c {
            ProcessorCall::Activate(h) => Some(h.clone()),
            _ => None,
        })
    }

    /// `(handle, placement, content)` of every `inject_fragment` call.
    pub fn injections(&self) -> Vec<(Handle, Placement, String)> {
        self.filter_calls(|c| match c {
            ProcessorCall::Inject {
                handle,
                placement,
                content,
            } => Some((handle.clone(), *placement, content.clone())),
            _ => None,
        })
    }

    pub fn injections_for(&self, handle: &str) -> usize {
        self.injections().iter().filter(|(h, _, _)| h == handle).count()
    }

    /// Number of calls of any kind that mention `handle`.
    pub fn touches(&self, handle: &str) -> usize {
        self.with_state(|s| {
            s.calls
                .iter()
                .filter(|c| match c {
                    ProcessorCall::Register(h)
                    | ProcessorCall::Activate(h)
                    | ProcessorCall::IsRegistered(h)
                    | ProcessorCall::IsActive(h)
                    | ProcessorCall::Inject { handle: h, .. }
                    | ProcessorCall::Mutate { handle: h, .. } => h == handle,
                })
                .count()
        })
    }

    fn filter_calls<T>(&self, f: impl Fn(&ProcessorCall) -> Option<T>) -> Vec<T> {
        self.with_state(|s| s.calls.iter().filter_map(f).collect())
    }
}

impl Processor for MockProcessor {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn register(&self, request: RegistrationRequest<'_>) -> bool {
        self.with_state(|s| {
            s.calls.push(ProcessorCall::Register(request.handle.clone()));
            if s.failing.contains(request.handle) {
                return false;
            }
            s.registered.insert(request.handle.clone());
            true
        })
    }

    fn activate(&self, handle: &Handle) {
        self.with_state(|s| {
            s.calls.push(ProcessorCall::Activate(handle.clone()));
            if s.registered.contains(handle) {
                s.active.insert(handle.clone());
            }
        });
    }

    fn is_registered(&self, handle: &Handle) -> bool {
        self.with_state(|s| {
            s.calls.push(ProcessorCall::IsRegistered(handle.clone()));
            s.registered.contains(handle)
        })
    }

    fn is_active(&self, handle: &Handle) -> bool {
        self.with_state(|s| {
            s.calls.push(ProcessorCall::IsActive(handle.clone()));
            s.active.contains(handle)
        })
    }

    fn inject_fragment(&self, handle: &Handle, placement: Placement, content: &str) -> bool {
        self.with_state(|s| {
            s.calls.push(ProcessorCall::Inject {
                handle: handle.clone(),
                placement,
                content: content.to_owned(),
            });
            s.registered.contains(handle) && !s.rejecting_fragments.contains(handle)
        })
    }

    fn mutate_representation(&self, handle: &Handle, attributes: &TagAttributes) {
        self.with_state(|s| {
            s.calls.push(ProcessorCall::Mutate {
                handle: handle.clone(),
                attributes: attributes.clone(),
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_schema::ResourceDefinition;

    #[test]
    fn mock_lifecycle() {
        let mock = MockProcessor::new(ResourceKind::Style);
        let def = ResourceDefinition::new("theme", "theme.css");
        assert_eq!(mock.kind(), ResourceKind::Style);
        assert!(!mock.is_registered(&def.handle));
        assert!(mock.register(def.registration_request()));
        mock.activate(&def.handle);
        assert!(mock.is_active(&def.handle));
        assert_eq!(mock.registrations(), vec![def.handle.clone()]);
        assert_eq!(mock.activations(), vec![def.handle.clone()]);
        assert_eq!(mock.touches("theme"), 4);
    }

    #[test]
    fn scripted_failures() {
        let mock = MockProcessor::default();
        mock.fail_registration("bad");
        mock.reject_fragments("quiet");
        let bad = ResourceDefinition::new("bad", "bad.js");
        let quiet = ResourceDefinition::new("quiet", "quiet.js");
        assert!(!mock.register(bad.registration_request()));
        assert!(mock.register(quiet.registration_request()));
        assert!(!mock.inject_fragment(&quiet.handle, Placement::After, "x"));
        assert_eq!(mock.injections_for("quiet"), 1);
    }

    #[test]
    fn preregistered_handles_accept_fragments() {
        let mock = MockProcessor::default();
        mock.preregister("external");
        let h = Handle::from("external");
        assert!(mock.is_registered(&h));
        assert!(mock.inject_fragment(&h, Placement::Before, "x"));
        assert_eq!(
            mock.injections(),
            vec![(h, Placement::Before, "x".to_owned())]
        );
    }

    #[test]
    fn activate_without_registration_is_ignored() {
        let mock = MockProcessor::default();
        let h = Handle::from("ghost");
        mock.activate(&h);
        assert!(!mock.is_active(&h));
    }
}
