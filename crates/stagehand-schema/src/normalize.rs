use crate::config::OrchestratorConfig;
use crate::definition::{ResourceDefinition, TagAttributes, TriggerBinding, VersionToken};
use crate::fragment::InlineFragment;
use crate::manifest::{AttributeValue, ManifestError, ResourceEntry, ResourceManifest};
use crate::types::{Handle, ResourceKind, TriggerName};

/// Validated, ready-to-declare form of a [`ResourceManifest`].
///
/// Handles and trigger names are trimmed, every definition has passed
/// [`ResourceDefinition::validate`], and manifest-level quirks (`unversioned`,
/// boolean attributes) are folded into the runtime types.
#[derive(Debug, Clone)]
pub struct NormalizedManifest {
    pub config: OrchestratorConfig,
    pub scripts: Vec<ResourceDefinition>,
    pub styles: Vec<ResourceDefinition>,
    pub blocks: Vec<ResourceDefinition>,
    pub inline: Vec<InlineRequest>,
}

/// An inline fragment waiting to be attached to `target` once the
/// manifest's resources are declared.
#[derive(Debug, Clone)]
pub struct InlineRequest {
    pub kind: ResourceKind,
    pub target: Handle,
    pub fragment: InlineFragment,
}

impl ResourceManifest {
    /// Normalize the manifest: check the version, trim identifiers, validate
    /// every definition.
    pub fn normalize(&self) -> Result<NormalizedManifest, ManifestError> {
        if self.manifest_version != 1 {
            return Err(ManifestError::UnsupportedVersion(self.manifest_version));
        }

        let mut inline = Vec::with_capacity(self.inline.len());
        for (index, section) in self.inline.iter().enumerate() {
            let target = section.target.trim();
            if target.is_empty() {
                return Err(ManifestError::EmptyInlineTarget {
                    kind: section.kind,
                    index,
                });
            }
            let mut fragment = InlineFragment::new(section.content.clone(), section.placement);
            fragment.explicit_trigger = section
                .trigger
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(TriggerName::from);
            inline.push(InlineRequest {
                kind: section.kind,
                target: Handle::from(target),
                fragment,
            });
        }

        Ok(NormalizedManifest {
            config: self.orchestrator.clone(),
            scripts: normalize_entries(ResourceKind::Script, &self.scripts)?,
            styles: normalize_entries(ResourceKind::Style, &self.styles)?,
            blocks: normalize_entries(ResourceKind::Block, &self.blocks)?,
            inline,
        })
    }
}

impl NormalizedManifest {
    pub fn definitions(&self, kind: ResourceKind) -> &[ResourceDefinition] {
        match kind {
            ResourceKind::Script => &self.scripts,
            ResourceKind::Style => &self.styles,
            ResourceKind::Block => &self.blocks,
        }
    }

    pub fn inline_for(&self, kind: ResourceKind) -> impl Iterator<Item = &InlineRequest> {
        self.inline.iter().filter(move |r| r.kind == kind)
    }

    pub fn resource_count(&self) -> usize {
        self.scripts.len() + self.styles.len() + self.blocks.len()
    }
}

fn normalize_entries(
    kind: ResourceKind,
    entries: &[ResourceEntry],
) -> Result<Vec<ResourceDefinition>, ManifestError> {
    entries
        .iter()
        .map(|entry| {
            let def = normalize_entry(entry);
            def.validate(kind)?;
            Ok(def)
        })
        .collect()
}

fn normalize_entry(entry: &ResourceEntry) -> ResourceDefinition {
    let version = if entry.unversioned {
        VersionToken::Unversioned
    } else {
        entry.version.clone().unwrap_or_default()
    };

    let mut def = ResourceDefinition::new(entry.handle.trim(), entry.locator.clone())
        .with_dependencies(
            entry
                .dependencies
                .iter()
                .map(|d| d.trim())
                .filter(|d| !d.is_empty()),
        )
        .with_version(version);
    def.options.clone_from(&entry.options);
    def.attributes = normalize_attributes(entry);
    def.trigger = entry
        .trigger
        .as_ref()
        .map(|t| TriggerBinding::new(t.name.trim(), t.priority));
    def
}

fn normalize_attributes(entry: &ResourceEntry) -> TagAttributes {
    entry
        .attributes
        .iter()
        .filter_map(|(key, value)| match value {
            AttributeValue::Flag(true) => Some((key.clone(), None)),
            AttributeValue::Flag(false) => None,
            AttributeValue::Value(v) => Some((key.clone(), Some(v.clone()))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::definition::{Locator, VersionToken};
    use crate::fragment::Placement;
    use crate::manifest::{parse_manifest_str, ManifestError};
    use crate::types::ResourceKind;
    use crate::SchemaError;

    #[test]
    fn normalizes_entries_into_definitions() {
        let manifest = parse_manifest_str(
            r#"
manifest_version = 1
[[scripts]]
handle = "  app "
locator = "app.js"
dependencies = ["vendor", " ", "polyfill "]
trigger = { name = " footer ", priority = 30 }
attributes = { defer = true, async = false, type = "module" }

[[styles]]
handle = "theme"
locator = "theme.css"
unversioned = true

[[inline]]
kind = "script"
target = " app "
content = "boot();"
trigger = "  "
"#,
        )
        .unwrap();
        let normalized = manifest.normalize().unwrap();

        let app = &normalized.scripts[0];
        assert_eq!(app.handle, "app");
        assert_eq!(app.dependencies.len(), 2);
        assert_eq!(app.dependencies[1], "polyfill");
        let binding = app.trigger.as_ref().unwrap();
        assert_eq!(binding.name, "footer");
        assert_eq!(binding.priority, 30);
        assert_eq!(app.attributes.get("defer"), Some(&None));
        assert!(!app.attributes.contains_key("async"));
        assert_eq!(app.attributes.get("type"), Some(&Some("module".to_owned())));
        assert_eq!(app.version, VersionToken::HostDefault);

        assert_eq!(normalized.styles[0].version, VersionToken::Unversioned);

        let request = &normalized.inline[0];
        assert_eq!(request.target, "app");
        assert_eq!(request.fragment.placement, Placement::After);
        assert!(request.fragment.explicit_trigger.is_none());
        assert_eq!(normalized.inline_for(ResourceKind::Script).count(), 1);
        assert_eq!(normalized.inline_for(ResourceKind::Style).count(), 0);
        assert_eq!(normalized.resource_count(), 2);
    }

    #[test]
    fn rejects_unsupported_version() {
        let manifest = parse_manifest_str("manifest_version = 2").unwrap();
        assert!(matches!(
            manifest.normalize(),
            Err(ManifestError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn rejects_blank_handle() {
        let manifest = parse_manifest_str(
            r#"
manifest_version = 1
[[blocks]]
handle = "   "
locator = false
"#,
        )
        .unwrap();
        assert!(matches!(
            manifest.normalize(),
            Err(ManifestError::Schema(SchemaError::EmptyHandle {
                kind: ResourceKind::Block
            }))
        ));
    }

    #[test]
    fn rejects_empty_locator_string() {
        let manifest = parse_manifest_str(
            r#"
manifest_version = 1
[[scripts]]
handle = "a"
locator = ""
"#,
        )
        .unwrap();
        assert!(matches!(
            manifest.normalize(),
            Err(ManifestError::Schema(SchemaError::EmptyLocator { .. }))
        ));
    }

    #[test]
    fn rejects_blank_inline_target() {
        let manifest = parse_manifest_str(
            r#"
manifest_version = 1
[[inline]]
kind = "style"
target = ""
content = "body {}"
"#,
        )
        .unwrap();
        assert!(matches!(
            manifest.normalize(),
            Err(ManifestError::EmptyInlineTarget { index: 0, .. })
        ));
    }

    #[test]
    fn registration_only_locator_survives() {
        let manifest = parse_manifest_str(
            r#"
manifest_version = 1
[[scripts]]
handle = "anchor"
locator = false
"#,
        )
        .unwrap();
        let normalized = manifest.normalize().unwrap();
        assert_eq!(normalized.scripts[0].locator, Locator::RegistrationOnly);
    }
}
