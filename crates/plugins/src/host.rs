//! Activation of plugins in dependency order.

use std::sync::Arc;

use {
    breadcord_common::Subscription,
    serde::Serialize,
    tracing::{error, info, warn},
};

use crate::{
    capabilities::{Capabilities, PlaybackControl},
    error::{Error, Result},
    manifest::PluginManifest,
    registry::{PluginContext, PluginRegistry},
    resolver::resolve_load_order,
};

/// Outcome of [`PluginHost::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Every plugin id in resolved order.
    pub order: Vec<String>,
    /// Native plugins that were activated, in order.
    pub activated: Vec<String>,
    /// Ids with a manifest but no native implementation. They are left to
    /// an external loader, in order.
    pub external: Vec<String>,
}

struct Active {
    id: String,
    subscriptions: Vec<Subscription>,
    capabilities: Capabilities,
}

pub struct PluginHost {
    registry: PluginRegistry,
    active: Vec<Active>,
}

impl PluginHost {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            active: Vec::new(),
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Every manifest the host knows about: built-ins first, then `disk`.
    pub fn all_manifests(&self, disk: Vec<PluginManifest>) -> Vec<PluginManifest> {
        let mut manifests = self.registry.manifests();
        manifests.extend(disk);
        manifests
    }

    /// Resolve the load order without activating anything.
    pub fn plan(&self, disk: Vec<PluginManifest>) -> Result<Vec<String>> {
        resolve_load_order(&self.all_manifests(disk))
    }

    /// Resolve and activate. A graph error aborts before any plugin is
    /// activated. An activation failure stops the remaining plugins.
    pub fn load(&mut self, disk: Vec<PluginManifest>, ctx: &PluginContext) -> Result<LoadReport> {
        let order = self.plan(disk).inspect_err(|e| {
            error!(error = %e, "plugin dependency graph is invalid, no plugins loaded");
        })?;

        let mut report = LoadReport {
            order: order.clone(),
            ..LoadReport::default()
        };

        for id in order {
            if self.active.iter().any(|a| a.id == id) {
                continue;
            }
            let Some(plugin) = self.registry.get(&id) else {
                info!(plugin = %id, "no native implementation, leaving to external loader");
                report.external.push(id);
                continue;
            };

            let subscriptions = plugin.activate(ctx).map_err(|e| {
                error!(plugin = %id, error = %e, "plugin failed to activate");
                Error::activation(&id, e.to_string())
            })?;
            info!(plugin = %id, subscriptions = subscriptions.len(), "plugin activated");
            self.active.push(Active {
                id: id.clone(),
                subscriptions,
                capabilities: plugin.capabilities(),
            });
            report.activated.push(id);
        }

        Ok(report)
    }

    pub fn active(&self) -> Vec<String> {
        self.active.iter().map(|a| a.id.clone()).collect()
    }

    pub fn capabilities(&self, id: &str) -> Option<&Capabilities> {
        self.active
            .iter()
            .find(|a| a.id == id)
            .map(|a| &a.capabilities)
    }

    /// First active plugin offering playback control.
    pub fn playback(&self) -> Option<Arc<dyn PlaybackControl>> {
        self.active
            .iter()
            .find_map(|a| a.capabilities.playback.clone())
    }

    /// Release every subscription, most recently activated first.
    pub fn unload(&mut self) {
        while let Some(active) = self.active.pop() {
            for subscription in &active.subscriptions {
                if !subscription.unsubscribe() {
                    warn!(plugin = %active.id, subscription = subscription.id(), "subscription already gone");
                }
            }
            info!(plugin = %active.id, "plugin unloaded");
        }
    }
}
