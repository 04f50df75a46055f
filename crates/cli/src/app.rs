//! Composition root for `breadcord run`.
//!
//! Everything shared (buses, cache, plugin registry, bridge) is built here
//! and handed down explicitly.

use std::sync::Arc;

use {
    anyhow::{Context, Result},
    breadcord_auth::{Credential, CredentialStore, KeyringStore},
    breadcord_cache::CacheLayer,
    breadcord_config::BreadcordConfig,
    breadcord_gateway::{
        GatewayHandle, GatewayManager, GatewayOptions, HostRequests, UiBuses, UiRequester,
        WsTransport, channel,
    },
    breadcord_plugins::{PluginContext, PluginHost, PluginRegistry},
    tokio::{
        io::{AsyncBufReadExt, BufReader},
        task::JoinHandle,
    },
    tracing::{error, info, warn},
};

use crate::plugins_commands::disk_manifests;

pub async fn run(config: BreadcordConfig) -> Result<()> {
    let store: Arc<dyn CredentialStore> =
        Arc::new(KeyringStore::new(config.credentials.service.as_str()));

    let (host_bridge, ui_bridge) = channel();
    let requester = ui_bridge.requester();
    let buses = UiBuses::new();
    let ctx = PluginContext {
        buses: buses.clone(),
        cache: CacheLayer::new(config.cache.arrays),
        requester: requester.clone(),
    };

    let mut plugins = PluginHost::new(PluginRegistry::with_builtins());
    load_plugins(&mut plugins, &config, &ctx);
    let pump = ui_bridge.pump(buses);

    let (sender, mut requests) = host_bridge.split();
    let credential = obtain_credential(&store, &mut requests, &requester).await?;

    let options = GatewayOptions::from_config(&config.gateway);
    info!(url = %options.url, "starting gateway session");
    let (gateway, session) =
        GatewayManager::new(options, credential, Arc::new(WsTransport), sender).spawn();
    let states = log_state_changes(&gateway);
    let server = tokio::spawn(requests.serve(store, gateway.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");

    if let Err(e) = gateway.shutdown().await {
        warn!(error = %e, "gateway already stopped");
    }
    if let Err(e) = session.await {
        error!(error = %e, "gateway task failed");
    }
    plugins.unload();
    states.abort();
    server.abort();
    pump.abort();
    Ok(())
}

/// Plugin graph problems only disable plugins; the session still runs.
fn load_plugins(host: &mut PluginHost, config: &BreadcordConfig, ctx: &PluginContext) {
    let root = breadcord_config::plugins_dir(config);
    let disk = match disk_manifests(&root, &config.plugins.enabled, host.registry()) {
        Ok(disk) => disk,
        Err(e) => {
            error!(error = %e, path = %root.display(), "failed to read plugin manifests");
            Vec::new()
        },
    };
    match host.load(disk, ctx) {
        Ok(report) => {
            info!(
                activated = ?report.activated,
                external = ?report.external,
                "plugins loaded"
            );
        },
        Err(e) => error!(error = %e, "plugin bootstrap failed"),
    }
}

async fn obtain_credential(
    store: &Arc<dyn CredentialStore>,
    requests: &mut HostRequests,
    requester: &UiRequester,
) -> Result<Credential> {
    if let Some(credential) = store.load().await? {
        info!(credential = %credential, "using stored credential");
        return Ok(credential);
    }

    let _ = requester.credential_found(None);
    info!("paste a token on stdin to log in, or run `breadcord token set`");
    let prompt = stdin_login(requester.clone());
    let credential = requests
        .wait_for_credential(store)
        .await
        .context("login was abandoned before a credential was provided")?;
    prompt.abort();
    Ok(credential)
}

/// Headless stand-in for the login screen: each stdin line is handed to
/// the host as a found credential.
fn stdin_login(requester: UiRequester) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let token = line.trim();
                    let found = (!token.is_empty()).then(|| token.to_string());
                    if requester.credential_found(found).is_err() {
                        break;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                },
            }
        }
    })
}

fn log_state_changes(gateway: &GatewayHandle) -> JoinHandle<()> {
    let mut state = gateway.watch_state();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            info!(state = %current, "gateway state");
        }
    })
}
