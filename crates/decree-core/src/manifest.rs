//! Container manifest parsing.

use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::strings::PropertyStringProcessor;

/// Errors that can occur when loading a container manifest.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// Failed to read the manifest file.
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the manifest.
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// The manifest parsed but describes an invalid configuration.
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

/// Lists the command containers to load and the properties available to
/// `${key}` placeholders.
///
/// # Example
///
/// ```toml
/// [properties]
/// root = "mod"
///
/// [[containers]]
/// name = "my_plugin::commands::ModerationCommands"
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerManifest {
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    #[serde(default)]
    pub containers: Vec<ContainerConfig>,
}

impl ContainerManifest {
    /// Loads a manifest from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// container entry has an empty name.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    /// Parses a manifest from TOML source.
    ///
    /// Container names are de-duplicated; the first occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be parsed, or if a container
    /// entry has an empty name.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let mut manifest: Self = toml::from_str(content)?;

        if let Some(index) = manifest
            .containers
            .iter()
            .position(|container| container.name.trim().is_empty())
        {
            return Err(ManifestError::Invalid(format!(
                "container entry {} has an empty name",
                index + 1
            )));
        }

        let mut seen = HashSet::new();
        manifest.containers.retain(|container| {
            let first = seen.insert(container.name.clone());
            if !first {
                warn!(container = %container.name, "Ignoring duplicate manifest entry");
            }
            first
        });

        Ok(manifest)
    }

    #[must_use = "iterator should be consumed to access enabled containers"]
    pub fn enabled_containers(&self) -> impl Iterator<Item = &ContainerConfig> {
        self.containers.iter().filter(|c| c.enabled)
    }

    /// A string processor over this manifest's properties.
    #[must_use]
    pub fn string_processor(&self) -> PropertyStringProcessor {
        PropertyStringProcessor::new(self.properties.clone())
    }
}

/// A single container entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Fully qualified container name, as registered by
    /// `#[command_container]`.
    pub name: String,

    /// Defaults to `true` if not specified in the manifest.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::strings::StringProcessor;

    fn manifest_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write manifest");
        file
    }

    #[test]
    fn test_load_reads_properties_and_containers() {
        // Arrange
        let file = manifest_file(
            r#"
            [properties]
            root = "mod"

            [[containers]]
            name = "plugin::Moderation"

            [[containers]]
            name = "plugin::Travel"
            enabled = false
            "#,
        );

        // Act
        let manifest = ContainerManifest::load(file.path()).expect("manifest loads");

        // Assert
        assert_eq!(manifest.containers.len(), 2);
        assert!(manifest.containers[0].enabled);
        let enabled: Vec<&str> = manifest
            .enabled_containers()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(enabled, vec!["plugin::Moderation"]);
        assert_eq!(
            manifest.string_processor().process("${root}.ban"),
            "mod.ban"
        );
    }

    #[test]
    fn test_duplicate_containers_keep_first_occurrence() {
        let manifest = ContainerManifest::parse(
            r#"
            [[containers]]
            name = "plugin::Moderation"
            enabled = false

            [[containers]]
            name = "plugin::Moderation"
            "#,
        )
        .expect("manifest parses");

        assert_eq!(manifest.containers.len(), 1);
        assert!(!manifest.containers[0].enabled);
    }

    #[test]
    fn test_empty_manifest_is_valid() {
        let manifest = ContainerManifest::parse("").expect("empty manifest");

        assert!(manifest.containers.is_empty());
        assert!(manifest.properties.is_empty());
    }

    #[test]
    fn test_empty_container_name_is_invalid() {
        let err = ContainerManifest::parse(
            r#"
            [[containers]]
            name = "  "
            "#,
        )
        .expect_err("blank name");

        assert!(matches!(err, ManifestError::Invalid(ref reason) if reason.contains("entry 1")));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");

        let err = ContainerManifest::load(dir.path().join("decree.toml"))
            .expect_err("file does not exist");

        assert!(matches!(err, ManifestError::Io(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = ContainerManifest::parse("[[containers]\nname = 1").expect_err("bad toml");

        assert!(matches!(err, ManifestError::Parse(_)));
    }
}
