use crate::config::OrchestratorConfig;
use crate::definition::{Locator, VersionToken};
use crate::fragment::Placement;
use crate::types::{Priority, ResourceKind, DEFAULT_PRIORITY};
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported manifest_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("invalid resource: {0}")]
    Schema(#[from] SchemaError),
    #[error("inline entry {index} ({kind}) has an empty target handle")]
    EmptyInlineTarget { kind: ResourceKind, index: usize },
}

/// On-disk declaration of resources, inline fragments, and orchestrator
/// settings (`stagehand.toml`).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResourceManifest {
    pub manifest_version: u32,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub scripts: Vec<ResourceEntry>,
    #[serde(default)]
    pub styles: Vec<ResourceEntry>,
    #[serde(default)]
    pub blocks: Vec<ResourceEntry>,
    #[serde(default)]
    pub inline: Vec<InlineSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResourceEntry {
    pub handle: String,
    pub locator: Locator,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub version: Option<VersionToken>,
    /// TOML has no null; this stands in for an explicit `version = null`.
    #[serde(default)]
    pub unversioned: bool,
    #[serde(default)]
    pub trigger: Option<TriggerSection>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TriggerSection {
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
}

/// `true` renders a bare attribute, `false` drops it, a string renders
/// `key="value"`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Value(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InlineSection {
    pub kind: ResourceKind,
    pub target: String,
    pub content: String,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub trigger: Option<String>,
}

fn default_priority() -> Priority {
    DEFAULT_PRIORITY
}

impl ResourceManifest {
    pub fn entries(&self, kind: ResourceKind) -> &[ResourceEntry] {
        match kind {
            ResourceKind::Script => &self.scripts,
            ResourceKind::Style => &self.styles,
            ResourceKind::Block => &self.blocks,
        }
    }
}

pub fn parse_manifest_str(input: &str) -> Result<ResourceManifest, ManifestError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ResourceManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let input = r#"
manifest_version = 1

[orchestrator]
default_inline_trigger = "shutdown"
default_priority = 5

[[scripts]]
handle = "app"
locator = "app.js"
dependencies = ["vendor"]
version = "1.2.0"
trigger = { name = "footer", priority = 20 }
options = { in_footer = true }
attributes = { defer = true, "data-app" = "main" }

[[scripts]]
handle = "vendor"
locator = false
version = false

[[styles]]
handle = "theme"
locator = "theme.css"
unversioned = true
options = { media = "print" }

[[blocks]]
handle = "gallery"
locator = ["gallery/block.json", "gallery/editor.js"]

[[inline]]
kind = "script"
target = "app"
content = "window.app = {};"
placement = "before"
trigger = "footer"
"#;
        let manifest = parse_manifest_str(input).expect("should parse");
        assert_eq!(manifest.manifest_version, 1);
        assert_eq!(manifest.orchestrator.default_inline_trigger, "shutdown");
        assert_eq!(manifest.scripts.len(), 2);
        assert_eq!(manifest.scripts[0].trigger.as_ref().unwrap().priority, 20);
        assert_eq!(manifest.scripts[1].locator, Locator::RegistrationOnly);
        assert_eq!(manifest.scripts[1].version, Some(VersionToken::HostDefault));
        assert!(manifest.styles[0].unversioned);
        assert_eq!(
            manifest.blocks[0].locator,
            Locator::Sources(vec![
                "gallery/block.json".to_owned(),
                "gallery/editor.js".to_owned()
            ])
        );
        assert_eq!(manifest.inline[0].placement, Placement::Before);
        assert_eq!(manifest.entries(ResourceKind::Style).len(), 1);
    }

    #[test]
    fn parses_minimal_manifest() {
        let manifest = parse_manifest_str("manifest_version = 1").expect("should parse");
        assert!(manifest.scripts.is_empty());
        assert_eq!(manifest.orchestrator, OrchestratorConfig::default());
    }

    #[test]
    fn trigger_priority_defaults() {
        let manifest = parse_manifest_str(
            r#"
manifest_version = 1
[[scripts]]
handle = "a"
locator = "a.js"
trigger = { name = "footer" }
"#,
        )
        .unwrap();
        assert_eq!(manifest.scripts[0].trigger.as_ref().unwrap().priority, 10);
    }

    #[test]
    fn rejects_true_locator() {
        let input = r#"
manifest_version = 1
[[scripts]]
handle = "a"
locator = true
"#;
        assert!(parse_manifest_str(input).is_err());
    }

    #[test]
    fn rejects_numeric_locator() {
        let input = r#"
manifest_version = 1
[[styles]]
handle = "a"
locator = 3
"#;
        assert!(parse_manifest_str(input).is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let input = r#"
manifest_version = 1
[[scripts]]
handle = "a"
locator = "a.js"
src = "b.js"
"#;
        assert!(parse_manifest_str(input).is_err());
    }

    #[test]
    fn rejects_missing_locator() {
        let input = r#"
manifest_version = 1
[[scripts]]
handle = "a"
"#;
        assert!(parse_manifest_str(input).is_err());
    }

    #[test]
    fn reads_manifest_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stagehand.toml");
        fs::write(
            &path,
            "manifest_version = 1\n[[styles]]\nhandle = \"a\"\nlocator = \"a.css\"\n",
        )
        .unwrap();
        let manifest = parse_manifest_file(&path).unwrap();
        assert_eq!(manifest.styles[0].handle, "a");
        assert!(matches!(
            parse_manifest_file(dir.path().join("missing.toml")),
            Err(ManifestError::Io(_))
        ));
    }
}
