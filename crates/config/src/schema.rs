/// Config schema types (gateway, cache, plugins, credentials).
use std::path::PathBuf;

use {
    breadcord_common::ArrayStrategy,
    breadcord_protocol::{DEFAULT_GATEWAY_URL, INVALID_SESSION_DELAY_MS, RECONNECT_DELAY_MS},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreadcordConfig {
    pub gateway: GatewayConfig,
    pub cache: CacheConfig,
    pub plugins: PluginsConfig,
    pub credentials: CredentialsConfig,
}

/// Gateway connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// WebSocket URL of the gateway.
    pub url: String,
    /// Client metadata sent in the identify payload.
    pub os: String,
    pub browser: String,
    pub device: String,
    /// Delay before reconnecting after the socket closed.
    pub reconnect_delay_ms: u64,
    /// Delay before reconnecting after the gateway invalidated the session.
    pub invalid_session_delay_ms: u64,
    pub backoff: BackoffConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.into(),
            os: std::env::consts::OS.into(),
            browser: "Breadcord".into(),
            device: "Breadcord".into(),
            reconnect_delay_ms: RECONNECT_DELAY_MS,
            invalid_session_delay_ms: INVALID_SESSION_DELAY_MS,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Reconnect delay policy after a socket close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffPolicy {
    /// Always wait `reconnect_delay_ms`.
    #[default]
    Fixed,
    /// Double from `initial_ms` up to `max_ms`, with full jitter; reset once
    /// the gateway says hello again.
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub policy: BackoffPolicy,
    pub initial_ms: u64,
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            policy: BackoffPolicy::Fixed,
            initial_ms: 1_000,
            max_ms: 60_000,
        }
    }
}

/// Object cache settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Array merge strategy shared by every cache instance.
    pub arrays: ArrayStrategy,
}

/// Plugin discovery settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory holding one sub-directory per plugin. Defaults to
    /// `<data dir>/plugins`.
    pub dir: Option<PathBuf>,
    /// Plugin ids to activate. Empty means every discovered plugin.
    pub enabled: Vec<String>,
}

/// OS keyring settings for the stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Keyring service name. The account is derived from the OS user.
    pub service: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            service: "Breadcord".into(),
        }
    }
}
