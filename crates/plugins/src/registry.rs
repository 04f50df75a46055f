//! Native plugin trait and the registry the host activates from.

use std::sync::Arc;

use {
    breadcord_cache::CacheLayer,
    breadcord_common::Subscription,
    breadcord_gateway::{UiBuses, UiRequester},
    tracing::debug,
};

use crate::{
    builtin::{BreadCache, BreadCore},
    capabilities::Capabilities,
    error::{Error, Result},
    manifest::PluginManifest,
};

/// What a plugin gets to work with when it is activated.
#[derive(Clone)]
pub struct PluginContext {
    pub buses: UiBuses,
    pub cache: CacheLayer,
    pub requester: UiRequester,
}

pub trait Plugin: Send + Sync {
    fn manifest(&self) -> PluginManifest;

    /// Attach to the buses. Returned subscriptions are released when the
    /// host unloads.
    fn activate(&self, ctx: &PluginContext) -> Result<Vec<Subscription>>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::none()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `breadcache` and `breadcore`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.plugins.push(Arc::new(BreadCache));
        registry.plugins.push(Arc::new(BreadCore));
        registry
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let id = plugin.manifest().id;
        if self.get(&id).is_some() {
            return Err(Error::DuplicatePlugin { id });
        }
        debug!(plugin = %id, "registered native plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|p| p.manifest().id == id)
            .cloned()
    }

    pub fn manifests(&self) -> Vec<PluginManifest> {
        self.plugins.iter().map(|p| p.manifest()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
