//! Rendered manifest files and the Kubernetes resources inside them.

use std::path::Path;

use policy_gate_core::{list_yaml_files, GateError, ResourceRef, Result};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, warn};

/// One YAML document from a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub kind: String,
    pub name: String,
    pub document: Value,
}

impl Resource {
    /// Wrap a parsed document, reading `kind` and `metadata.name`.
    pub fn from_document(document: Value) -> Self {
        let kind = document
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();
        let name = document
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        Self {
            kind,
            name,
            document,
        }
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(&self.kind, &self.name)
    }

    /// The document as JSON, for the engine input.
    pub fn to_json(&self) -> std::result::Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.document)
    }
}

/// Parse a multi-document YAML stream.
///
/// Empty, null and non-mapping documents are dropped. Any parse error fails
/// the whole stream.
pub fn split_documents(text: &str) -> Result<Vec<Resource>> {
    let mut resources = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(doc)?;
        match &value {
            Value::Mapping(map) if !map.is_empty() => {
                resources.push(Resource::from_document(value));
            }
            _ => {}
        }
    }
    Ok(resources)
}

/// A manifest file rendered for one service/environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestFile {
    /// File stem, e.g. `payment-api-prod`.
    pub name: String,
    pub resources: Vec<Resource>,
}

impl ManifestFile {
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            resources: split_documents(text)?,
        })
    }
}

/// Load every `*.yaml` manifest in `dir`, sorted by filename.
///
/// Unreadable or unparseable files are skipped with a warning.
pub fn load_manifests(dir: &Path) -> Result<Vec<ManifestFile>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Manifests directory not found");
        return Ok(Vec::new());
    }

    let mut manifests = Vec::new();
    for (filename, path) in list_yaml_files(dir)? {
        let stem = filename.strip_suffix(".yaml").unwrap_or(&filename);
        let parsed = std::fs::read_to_string(&path)
            .map_err(GateError::from)
            .and_then(|text| ManifestFile::parse(stem, &text));
        match parsed {
            Ok(manifest) => {
                debug!(
                    manifest = %manifest.name,
                    resources = manifest.resources.len(),
                    "Loaded manifest"
                );
                manifests.push(manifest);
            }
            Err(e) => warn!(manifest = %filename, error = %e, "Skipping unparseable manifest"),
        }
    }
    Ok(manifests)
}
