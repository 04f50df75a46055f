//! Plugin directory scanning.

use std::path::Path;

use tracing::{debug, warn};

use crate::{
    error::{Context, Result},
    manifest::MANIFEST_FILE,
};

/// Names of the plugin sub-directories under `root`, sorted.
///
/// A missing root yields an empty list. Directories without a
/// `plugin.json` are skipped.
pub fn discover_plugins(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        debug!(path = %root.display(), "plugins directory does not exist");
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("failed to read plugins directory {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %path.display(), "skipping plugin directory with a non UTF-8 name");
            continue;
        };
        if !path.join(MANIFEST_FILE).is_file() {
            warn!(plugin = %name, path = %path.display(), "skipping plugin directory without plugin.json");
            continue;
        }
        names.push(name);
    }

    names.sort();
    debug!(count = names.len(), path = %root.display(), "discovered plugins");
    Ok(names)
}
