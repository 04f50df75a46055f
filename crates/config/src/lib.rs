//! Configuration loading and env substitution.
//!
//! Config files: `breadcord.toml`, `breadcord.yaml`, or `breadcord.json`,
//! searched in `./` then `~/.config/breadcord/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        config_dir, data_dir, discover_and_load, find_config_file, load_config, load_or_discover,
        plugins_dir, render_config,
    },
    schema::{
        BackoffConfig, BackoffPolicy, BreadcordConfig, CacheConfig, CredentialsConfig,
        GatewayConfig, PluginsConfig,
    },
};
