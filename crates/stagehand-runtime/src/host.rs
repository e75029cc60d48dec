//! In-process stand-in for the external asset registry.
//!
//! Mirrors the contract of a page-rendering host: handles are registered
//! once per kind, activated (enqueued) later, may carry inline fragments on
//! either side, and are rendered to tags through a chain of late-bound tag
//! filters registered by processors.

use stagehand_schema::{
    ActivationOptions, Handle, Locator, Placement, RegistrationRequest, ResourceKind,
    TagAttributes, VersionToken,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Rewrites the rendered tag of a handle. Receives the handle and the tag
/// produced so far; returns the (possibly unchanged) tag.
pub type TagFilter = Box<dyn Fn(&Handle, String) -> String + Send + Sync>;

type Key = (ResourceKind, Handle);

#[derive(Debug, Clone)]
struct HostEntry {
    locator: Locator,
    dependencies: Vec<Handle>,
    version: Option<String>,
    options: ActivationOptions,
    active: bool,
    before: Vec<String>,
    after: Vec<String>,
}

#[derive(Default)]
struct HostState {
    entries: BTreeMap<Key, HostEntry>,
    activation_order: Vec<Key>,
    rejected: BTreeSet<Key>,
}

pub struct HostRegistry {
    default_version: String,
    state: Mutex<HostState>,
    filters: Mutex<Vec<(ResourceKind, TagFilter)>>,
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::with_default_version("1.0.0")
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version appended to handles registered with [`VersionToken::HostDefault`].
    pub fn with_default_version(version: &str) -> Self {
        Self {
            default_version: version.to_owned(),
            state: Mutex::new(HostState::default()),
            filters: Mutex::new(Vec::new()),
        }
    }

    /// Make every future registration of `handle` fail, as a misbehaving
    /// host or conflicting plugin would.
    pub fn reject_registration(&self, kind: ResourceKind, handle: impl Into<Handle>) {
        lock(&self.state).rejected.insert((kind, handle.into()));
    }

    /// Returns false if the handle is already registered or was rejected.
    pub fn register(&self, kind: ResourceKind, request: RegistrationRequest<'_>) -> bool {
        let key = (kind, request.handle.clone());
        let mut state = lock(&self.state);
        if state.rejected.contains(&key) || state.entries.contains_key(&key) {
            return false;
        }
        let version = match request.version {
            VersionToken::Fixed(v) => Some(v.clone()),
            VersionToken::HostDefault => Some(self.default_version.clone()),
            VersionToken::Unversioned => None,
        };
        debug!("host: registered {kind} '{}'", request.handle);
        state.entries.insert(
            key,
            HostEntry {
                locator: request.locator.clone(),
                dependencies: request.dependencies.to_vec(),
                version,
                options: request.options.clone(),
                active: false,
                before: Vec::new(),
                after: Vec::new(),
            },
        );
        true
    }

    /// Returns false if the handle is unknown to the host.
    pub fn activate(&self, kind: ResourceKind, handle: &Handle) -> bool {
        let key = (kind, handle.clone());
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        let Some(entry) = state.entries.get_mut(&key) else {
            return false;
        };
        if !entry.active {
            entry.active = true;
            state.activation_order.push(key);
        }
        true
    }

    pub fn is_registered(&self, kind: ResourceKind, handle: &Handle) -> bool {
        lock(&self.state)
            .entries
            .contains_key(&(kind, handle.clone()))
    }

    pub fn is_active(&self, kind: ResourceKind, handle: &Handle) -> bool {
        lock(&self.state)
            .entries
            .get(&(kind, handle.clone()))
            .is_some_and(|e| e.active)
    }

    /// Append inline content to a registered handle.
    pub fn add_inline(
        &self,
        kind: ResourceKind,
        handle: &Handle,
        placement: Placement,
        content: &str,
    ) -> bool {
        let mut state = lock(&self.state);
        let Some(entry) = state.entries.get_mut(&(kind, handle.clone())) else {
            return false;
        };
        match placement {
            Placement::Before => entry.before.push(content.to_owned()),
            Placement::After => entry.after.push(content.to_owned()),
        }
        true
    }

    pub fn inline(&self, kind: ResourceKind, handle: &Handle, placement: Placement) -> Vec<String> {
        lock(&self.state)
            .entries
            .get(&(kind, handle.clone()))
            .map(|e| match placement {
                Placement::Before => e.before.clone(),
                Placement::After => e.after.clone(),
            })
            .unwrap_or_default()
    }

    pub fn dependencies(&self, kind: ResourceKind, handle: &Handle) -> Option<Vec<Handle>> {
        lock(&self.state)
            .entries
            .get(&(kind, handle.clone()))
            .map(|e| e.dependencies.clone())
    }

    pub fn option(&self, kind: ResourceKind, handle: &Handle, key: &str) -> Option<serde_json::Value> {
        lock(&self.state)
            .entries
            .get(&(kind, handle.clone()))
            .and_then(|e| e.options.get(key).cloned())
    }

    /// Handles of `kind` in the order they were activated.
    pub fn active_handles(&self, kind: ResourceKind) -> Vec<Handle> {
        lock(&self.state)
            .activation_order
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, h)| h.clone())
            .collect()
    }

    pub fn registered_count(&self, kind: ResourceKind) -> usize {
        lock(&self.state)
            .entries
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Register a tag rewrite for every rendered handle of `kind`. Filters
    /// run in registration order at render time.
    pub fn add_tag_filter(&self, kind: ResourceKind, filter: TagFilter) {
        lock(&self.filters).push((kind, filter));
    }

    /// Render the tag of an active handle, after all tag filters ran.
    /// Blocks and registration-only handles have no tag.
    pub fn render_tag(&self, kind: ResourceKind, handle: &Handle) -> Option<String> {
        let base = {
            let state = lock(&self.state);
            let entry = state.entries.get(&(kind, handle.clone()))?;
            if !entry.active {
                return None;
            }
            base_tag(kind, handle, entry)?
        };
        let filters = lock(&self.filters);
        Some(
            filters
                .iter()
                .filter(|(k, _)| *k == kind)
                .fold(base, |tag, (_, filter)| filter(handle, tag)),
        )
    }
}

/// Insert rendered attributes right after the opening `<{element}`.
pub(crate) fn splice_attributes(tag: &str, element: &str, attributes: &TagAttributes) -> String {
    let open = format!("<{element}");
    if !tag.starts_with(&open) || attributes.is_empty() {
        return tag.to_owned();
    }
    let mut rendered = String::new();
    for (key, value) in attributes {
        match value {
            Some(v) => {
                let _ = write!(rendered, " {key}=\"{}\"", v.replace('"', "&quot;"));
            }
            None => {
                let _ = write!(rendered, " {key}");
            }
        }
    }
    format!("{open}{rendered}{}", &tag[open.len()..])
}

fn base_tag(kind: ResourceKind, handle: &Handle, entry: &HostEntry) -> Option<String> {
    let src = match &entry.locator {
        Locator::Source(s) => s.as_str(),
        Locator::Sources(list) => list.first()?.as_str(),
        Locator::RegistrationOnly => return None,
    };
    let mut url = src.to_owned();
    if let Some(version) = &entry.version {
        let sep = if url.contains('?') { '&' } else { '?' };
        let _ = write!(url, "{sep}ver={version}");
    }
    match kind {
        ResourceKind::Script => Some(format!("<script src=\"{url}\" id=\"{handle}-js\"></script>")),
        ResourceKind::Style => {
            let media = entry
                .options
                .get("media")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("all");
            Some(format!(
                "<link rel=\"stylesheet\" id=\"{handle}-css\" href=\"{url}\" media=\"{media}\" />"
            ))
        }
        ResourceKind::Block => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_schema::ResourceDefinition;

    #[test]
    fn register_is_once_per_kind() {
        let host = HostRegistry::new();
        let def = ResourceDefinition::new("app", "app.js");
        assert!(host.register(ResourceKind::Script, def.registration_request()));
        assert!(!host.register(ResourceKind::Script, def.registration_request()));
        assert!(host.register(ResourceKind::Style, def.registration_request()));
        assert_eq!(host.registered_count(ResourceKind::Script), 1);
    }

    #[test]
    fn rejected_handles_never_register() {
        let host = HostRegistry::new();
        host.reject_registration(ResourceKind::Style, "broken");
        let def = ResourceDefinition::new("broken", "broken.css");
        assert!(!host.register(ResourceKind::Style, def.registration_request()));
        assert!(!host.is_registered(ResourceKind::Style, &def.handle));
    }

    #[test]
    fn activation_requires_registration_and_is_recorded_once() {
        let host = HostRegistry::new();
        let h = Handle::from("app");
        assert!(!host.activate(ResourceKind::Script, &h));
        let def = ResourceDefinition::new("app", "app.js");
        host.register(ResourceKind::Script, def.registration_request());
        assert!(host.activate(ResourceKind::Script, &h));
        assert!(host.activate(ResourceKind::Script, &h));
        assert!(host.is_active(ResourceKind::Script, &h));
        assert_eq!(host.active_handles(ResourceKind::Script), vec![h]);
    }

    #[test]
    fn inline_requires_registered_parent() {
        let host = HostRegistry::new();
        let h = Handle::from("app");
        assert!(!host.add_inline(ResourceKind::Script, &h, Placement::After, "x"));
        let def = ResourceDefinition::new("app", "app.js");
        host.register(ResourceKind::Script, def.registration_request());
        assert!(host.add_inline(ResourceKind::Script, &h, Placement::After, "x"));
        assert!(host.add_inline(ResourceKind::Script, &h, Placement::Before, "y"));
        assert_eq!(host.inline(ResourceKind::Script, &h, Placement::After), vec!["x"]);
        assert_eq!(host.inline(ResourceKind::Script, &h, Placement::Before), vec!["y"]);
    }

    #[test]
    fn render_applies_version_and_filters() {
        let host = HostRegistry::with_default_version("6.5");
        let def = ResourceDefinition::new("app", "app.js");
        host.register(ResourceKind::Script, def.registration_request());
        assert_eq!(host.render_tag(ResourceKind::Script, &def.handle), None);
        host.activate(ResourceKind::Script, &def.handle);
        assert_eq!(
            host.render_tag(ResourceKind::Script, &def.handle).unwrap(),
            "<script src=\"app.js?ver=6.5\" id=\"app-js\"></script>"
        );

        host.add_tag_filter(
            ResourceKind::Script,
            Box::new(|handle, tag| {
                if handle == "app" {
                    tag.replacen("<script ", "<script defer ", 1)
                } else {
                    tag
                }
            }),
        );
        assert!(host
            .render_tag(ResourceKind::Script, &def.handle)
            .unwrap()
            .starts_with("<script defer src="));
    }

    #[test]
    fn render_style_uses_media_option_and_skips_unversioned() {
        let host = HostRegistry::new();
        let def = ResourceDefinition::new("print", "print.css?x=1")
            .with_version(VersionToken::Fixed("2".to_owned()))
            .with_option("media", "print");
        host.register(ResourceKind::Style, def.registration_request());
        host.activate(ResourceKind::Style, &def.handle);
        let tag = host.render_tag(ResourceKind::Style, &def.handle).unwrap();
        assert!(tag.contains("href=\"print.css?x=1&ver=2\""));
        assert!(tag.contains("media=\"print\""));

        let bare = ResourceDefinition::new("bare", "bare.css").with_version(VersionToken::Unversioned);
        host.register(ResourceKind::Style, bare.registration_request());
        host.activate(ResourceKind::Style, &bare.handle);
        assert!(host
            .render_tag(ResourceKind::Style, &bare.handle)
            .unwrap()
            .contains("href=\"bare.css\""));
    }

    #[test]
    fn splice_renders_flags_and_values() {
        let mut attrs = TagAttributes::new();
        attrs.insert("defer".to_owned(), None);
        attrs.insert("data-x".to_owned(), Some("a\"b".to_owned()));
        let out = splice_attributes("<script src=\"a.js\"></script>", "script", &attrs);
        assert_eq!(
            out,
            "<script data-x=\"a&quot;b\" defer src=\"a.js\"></script>"
        );
        assert_eq!(splice_attributes("<link />", "script", &attrs), "<link />");
    }

    #[test]
    fn registration_only_has_no_tag() {
        let host = HostRegistry::new();
        let def = ResourceDefinition::registration_only("anchor");
        host.register(ResourceKind::Script, def.registration_request());
        host.activate(ResourceKind::Script, &def.handle);
        assert_eq!(host.render_tag(ResourceKind::Script, &def.handle), None);
    }
}
