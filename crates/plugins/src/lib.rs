//! Plugin manifests, dependency resolution, and activation.
//!
//! Plugins live in `<plugins dir>/<name>/plugin.json`. The host merges
//! those manifests with the native plugins compiled into the binary,
//! resolves a load order, and activates the native ones in that order.

pub mod builtin;
pub mod capabilities;
pub mod discover;
pub mod error;
pub mod host;
pub mod manifest;
pub mod registry;
pub mod resolver;

pub use {
    capabilities::{Capabilities, PlaybackControl, PlaybackState},
    discover::discover_plugins,
    error::{Error, Result},
    host::{LoadReport, PluginHost},
    manifest::{PluginManifest, load_manifests, read_manifest},
    registry::{Plugin, PluginContext, PluginRegistry},
    resolver::resolve_load_order,
};
