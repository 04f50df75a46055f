use {
    breadcord_common::Subscription,
    breadcord_protocol::GatewayFrame,
    tracing::{Level, debug, info, warn},
};

use {
    super::{BREADCACHE, BREADCORE},
    crate::{
        error::Result,
        manifest::PluginManifest,
        registry::{Plugin, PluginContext},
    },
};

/// Diagnostics: dispatch and latency logging plus the cache-ready notice.
pub struct BreadCore;

impl Plugin for BreadCore {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new(BREADCORE, [BREADCACHE])
    }

    fn activate(&self, ctx: &PluginContext) -> Result<Vec<Subscription>> {
        let dispatches = ctx.buses.gateway.subscribe(|frame: &GatewayFrame| {
            if let Some(event) = frame.t.as_deref() {
                debug!(event, seq = ?frame.s, "gateway dispatch");
            }
        });
        let latency = ctx.buses.ping.subscribe(|ping_ms: &u64| {
            debug!(ping_ms, "gateway latency");
        });

        let requester = ctx.requester.clone();
        let cache = ctx.cache.clone();
        ctx.cache.on_ready(move || {
            let user = cache
                .current_user()
                .and_then(|u| u.get("username").and_then(|v| v.as_str()).map(str::to_string));
            info!(user = user.as_deref().unwrap_or("unknown"), "cache ready");
            if let Err(e) = requester.log(Level::INFO, "Renderer is ready") {
                warn!(error = %e, "could not notify host");
            }
        });

        Ok(vec![dispatches, latency])
    }
}
