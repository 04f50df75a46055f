use std::path::Path;

use {
    anyhow::Result,
    breadcord_config::BreadcordConfig,
    breadcord_plugins::{PluginHost, PluginManifest, PluginRegistry, discover_plugins, load_manifests},
    clap::Subcommand,
};

#[derive(Subcommand)]
pub enum PluginsAction {
    /// List built-in plugins and plugin directories.
    List,
    /// Print the resolved load order.
    Order {
        /// Print the order as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

pub fn handle_plugins(action: PluginsAction, config: &BreadcordConfig) -> Result<()> {
    let registry = PluginRegistry::with_builtins();
    let root = breadcord_config::plugins_dir(config);
    match action {
        PluginsAction::List => {
            for manifest in registry.manifests() {
                println!("{:<16} built-in {}", manifest.id, deps_line(&manifest));
            }
            for name in discover_plugins(&root)? {
                match breadcord_plugins::read_manifest(&root, &name) {
                    Ok(manifest) => println!("{:<16} {name}/ {}", manifest.id, deps_line(&manifest)),
                    Err(e) => println!("{name:<16} invalid: {e}"),
                }
            }
        },
        PluginsAction::Order { json } => {
            let disk = disk_manifests(&root, &config.plugins.enabled, &registry)?;
            let order = PluginHost::new(registry).plan(disk)?;
            if json {
                println!("{}", serde_json::to_string(&order)?);
            } else {
                for (i, id) in order.iter().enumerate() {
                    println!("{:>3}. {id}", i + 1);
                }
            }
        },
    }
    Ok(())
}

/// On-disk manifests to load: the `enabled` list when set, otherwise every
/// discovered plugin. Names taken by built-ins are skipped.
pub fn disk_manifests(
    root: &Path,
    enabled: &[String],
    registry: &PluginRegistry,
) -> Result<Vec<PluginManifest>> {
    let mut names = if enabled.is_empty() {
        discover_plugins(root)?
    } else {
        enabled.to_vec()
    };
    names.retain(|name| registry.get(name).is_none());
    Ok(load_manifests(root, &names)?)
}

fn deps_line(manifest: &PluginManifest) -> String {
    if manifest.dependencies.is_empty() {
        String::new()
    } else {
        format!("(needs {})", manifest.dependencies.join(", "))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::fs};

    fn write_plugin(root: &Path, name: &str, body: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("plugin.json"), body).unwrap();
    }

    #[test]
    fn enabled_list_overrides_discovery() {
        let tmp = tempfile::tempdir().unwrap();
        write_plugin(tmp.path(), "a", "{}");
        write_plugin(tmp.path(), "b", "{}");
        let registry = PluginRegistry::with_builtins();

        let all = disk_manifests(tmp.path(), &[], &registry).unwrap();
        assert_eq!(all.len(), 2);

        let enabled = vec!["breadcore".to_string(), "b".to_string()];
        let some = disk_manifests(tmp.path(), &enabled, &registry).unwrap();
        assert_eq!(some, [PluginManifest::new("b", Vec::<String>::new())]);
    }

    #[test]
    fn enabled_but_missing_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = PluginRegistry::with_builtins();
        assert!(disk_manifests(tmp.path(), &["ghost".into()], &registry).is_err());
    }
}
