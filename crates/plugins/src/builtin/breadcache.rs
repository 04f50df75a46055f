use breadcord_common::Subscription;

use {
    super::BREADCACHE,
    crate::{
        error::Result,
        manifest::PluginManifest,
        registry::{Plugin, PluginContext},
    },
};

/// Feeds gateway frames into the shared [`breadcord_cache::CacheLayer`].
pub struct BreadCache;

impl Plugin for BreadCache {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new(BREADCACHE, Vec::<String>::new())
    }

    fn activate(&self, ctx: &PluginContext) -> Result<Vec<Subscription>> {
        Ok(vec![ctx.cache.attach(&ctx.buses.gateway)])
    }
}
