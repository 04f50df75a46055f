//! `plugin.json` reading.
//!
//! A manifest carries a plugin's identity and its declared dependencies.
//! Everything else in the file belongs to the plugin and is ignored here.

use std::path::Path;

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "plugin.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub id: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PluginManifest {
    pub fn new<I, S>(id: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a manifest from parsed `plugin.json` content.
    ///
    /// `id` falls back to `name` when absent or empty. A `dependencies`
    /// value that is not an array counts as no dependencies.
    pub fn from_value(name: &str, data: &Value) -> std::result::Result<Self, String> {
        let Some(object) = data.as_object() else {
            return Err("expected a JSON object".into());
        };

        let id = object
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(name)
            .to_string();

        let dependencies = match object.get("dependencies") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item.as_str() {
                    Some(dep) => Some(dep.to_string()),
                    None => {
                        warn!(plugin = %id, entry = %item, "ignoring non-string dependency");
                        None
                    },
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self { id, dependencies })
    }
}

/// Read `<root>/<name>/plugin.json`.
pub fn read_manifest(root: &Path, name: &str) -> Result<PluginManifest> {
    let path = root.join(name).join(MANIFEST_FILE);
    let text = std::fs::read_to_string(&path)
        .map_err(|e| Error::invalid_manifest(name, &path, e.to_string()))?;
    let data: Value = serde_json::from_str(&text)
        .map_err(|e| Error::invalid_manifest(name, &path, e.to_string()))?;
    let manifest = PluginManifest::from_value(name, &data)
        .map_err(|reason| Error::invalid_manifest(name, &path, reason))?;
    debug!(plugin = %manifest.id, dir = name, deps = ?manifest.dependencies, "read manifest");
    Ok(manifest)
}

/// Read the manifest of every named plugin directory, skipping repeated names.
pub fn load_manifests<S: AsRef<str>>(root: &Path, names: &[S]) -> Result<Vec<PluginManifest>> {
    let mut seen = std::collections::HashSet::new();
    let mut manifests = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        if !seen.insert(name) {
            continue;
        }
        manifests.push(read_manifest(root, name)?);
    }
    Ok(manifests)
}
