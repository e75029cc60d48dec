use crate::fragment::InlineFragment;
use crate::types::{Handle, Priority, ResourceKind, TriggerName};
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Type-specific key/value bag forwarded untouched to the processor
/// (`in_footer` for scripts, `media` for styles, ...).
pub type ActivationOptions = BTreeMap<String, serde_json::Value>;

/// Attributes to splice into the host's rendered tag. `None` renders a bare
/// boolean attribute (`defer`), `Some` renders `key="value"`.
pub type TagAttributes = BTreeMap<String, Option<String>>;

/// Where a resource's backing source lives.
///
/// Manifests spell this as a string, a list of strings, or `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLocator", into = "RawLocator")]
pub enum Locator {
    Source(String),
    Sources(Vec<String>),
    /// Register the handle without any backing source (dependency anchors,
    /// inline-only resources).
    RegistrationOnly,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawLocator {
    Flag(bool),
    One(String),
    Many(Vec<String>),
}

impl TryFrom<RawLocator> for Locator {
    type Error = String;

    fn try_from(raw: RawLocator) -> Result<Self, Self::Error> {
        match raw {
            RawLocator::Flag(false) => Ok(Locator::RegistrationOnly),
            RawLocator::Flag(true) => {
                Err("locator must be a string, a list of strings, or false".to_owned())
            }
            RawLocator::One(s) => Ok(Locator::Source(s)),
            RawLocator::Many(v) => Ok(Locator::Sources(v)),
        }
    }
}

impl From<Locator> for RawLocator {
    fn from(locator: Locator) -> Self {
        match locator {
            Locator::Source(s) => RawLocator::One(s),
            Locator::Sources(v) => RawLocator::Many(v),
            Locator::RegistrationOnly => RawLocator::Flag(false),
        }
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Locator::Source(s.to_owned())
    }
}

impl From<String> for Locator {
    fn from(s: String) -> Self {
        Locator::Source(s)
    }
}

impl From<Vec<String>> for Locator {
    fn from(v: Vec<String>) -> Self {
        Locator::Sources(v)
    }
}

impl Locator {
    fn validate(&self, kind: ResourceKind, handle: &Handle) -> Result<(), SchemaError> {
        match self {
            Locator::RegistrationOnly => Ok(()),
            Locator::Source(s) if s.trim().is_empty() => Err(SchemaError::EmptyLocator {
                kind,
                handle: handle.to_string(),
            }),
            Locator::Source(_) => Ok(()),
            Locator::Sources(list) if list.is_empty() => Err(SchemaError::EmptyLocatorList {
                kind,
                handle: handle.to_string(),
            }),
            Locator::Sources(list) => match list.iter().position(|s| s.trim().is_empty()) {
                Some(index) => Err(SchemaError::EmptyLocatorEntry {
                    kind,
                    handle: handle.to_string(),
                    index,
                }),
                None => Ok(()),
            },
        }
    }
}

/// Version suffix handed to the host on registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVersion", into = "RawVersion")]
pub enum VersionToken {
    Fixed(String),
    /// Let the host apply its own default version (`false`).
    #[default]
    HostDefault,
    /// Emit no version at all (`null`).
    Unversioned,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Fixed(String),
    Flag(bool),
    Null,
}

impl TryFrom<RawVersion> for VersionToken {
    type Error = String;

    fn try_from(raw: RawVersion) -> Result<Self, Self::Error> {
        match raw {
            RawVersion::Fixed(s) => Ok(VersionToken::Fixed(s)),
            RawVersion::Flag(false) => Ok(VersionToken::HostDefault),
            RawVersion::Flag(true) => Err("version must be a string, false, or null".to_owned()),
            RawVersion::Null => Ok(VersionToken::Unversioned),
        }
    }
}

impl From<VersionToken> for RawVersion {
    fn from(version: VersionToken) -> Self {
        match version {
            VersionToken::Fixed(s) => RawVersion::Fixed(s),
            VersionToken::HostDefault => RawVersion::Flag(false),
            VersionToken::Unversioned => RawVersion::Null,
        }
    }
}

/// Defers a resource to the given host trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerBinding {
    pub name: TriggerName,
    pub priority: Priority,
}

impl TriggerBinding {
    pub fn new(name: impl Into<TriggerName>, priority: Priority) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }
}

/// Zero-argument predicate evaluated once, at the moment a resource or
/// fragment is processed.
#[derive(Clone)]
pub struct Guard(Arc<dyn Fn() -> bool + Send + Sync>);

impl Guard {
    pub fn new(predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    pub fn check(&self) -> bool {
        (self.0)()
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}

/// Borrowed view of the registration arguments a processor receives.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationRequest<'a> {
    pub handle: &'a Handle,
    pub locator: &'a Locator,
    pub dependencies: &'a [Handle],
    pub version: &'a VersionToken,
    pub options: &'a ActivationOptions,
}

/// A named resource travelling through declare → register → activate.
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    pub handle: Handle,
    pub locator: Locator,
    pub dependencies: Vec<Handle>,
    pub version: VersionToken,
    pub options: ActivationOptions,
    pub guard: Option<Guard>,
    pub trigger: Option<TriggerBinding>,
    pub inline: Vec<InlineFragment>,
    pub attributes: TagAttributes,
}

impl ResourceDefinition {
    pub fn new(handle: impl Into<Handle>, locator: impl Into<Locator>) -> Self {
        Self {
            handle: handle.into(),
            locator: locator.into(),
            dependencies: Vec::new(),
            version: VersionToken::default(),
            options: ActivationOptions::new(),
            guard: None,
            trigger: None,
            inline: Vec::new(),
            attributes: TagAttributes::new(),
        }
    }

    /// A handle with no backing source.
    pub fn registration_only(handle: impl Into<Handle>) -> Self {
        Self::new(handle, Locator::RegistrationOnly)
    }

    #[must_use]
    pub fn with_dependencies<I, H>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: VersionToken) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn with_guard(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Guard::new(predicate));
        self
    }

    #[must_use]
    pub fn deferred_to(mut self, trigger: impl Into<TriggerName>, priority: Priority) -> Self {
        self.trigger = Some(TriggerBinding::new(trigger, priority));
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: Option<&str>) -> Self {
        self.attributes
            .insert(key.to_owned(), value.map(str::to_owned));
        self
    }

    #[must_use]
    pub fn with_inline(mut self, fragment: InlineFragment) -> Self {
        self.inline.push(fragment);
        self
    }

    /// Check the definition can ever be registered. Runs at declare time.
    pub fn validate(&self, kind: ResourceKind) -> Result<(), SchemaError> {
        if self.handle.trim().is_empty() {
            return Err(SchemaError::EmptyHandle { kind });
        }
        self.locator.validate(kind, &self.handle)?;
        if let Some(binding) = &self.trigger {
            if binding.name.trim().is_empty() {
                return Err(SchemaError::EmptyTriggerName {
                    kind,
                    handle: self.handle.to_string(),
                });
            }
        }
        Ok(())
    }

    /// True when there is no guard or the guard allows processing.
    pub fn passes_guard(&self) -> bool {
        self.guard.as_ref().is_none_or(Guard::check)
    }

    pub fn registration_request(&self) -> RegistrationRequest<'_> {
        RegistrationRequest {
            handle: &self.handle,
            locator: &self.locator,
            dependencies: &self.dependencies,
            version: &self.version,
            options: &self.options,
        }
    }
}
