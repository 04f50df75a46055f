//! Optional features a plugin may expose to the rest of the UI.
//!
//! Capabilities are fixed when the plugin is constructed. Consumers look
//! them up through the host instead of probing plugins at runtime.

use std::{sync::Arc, time::Duration};

use {async_trait::async_trait, serde::Serialize};

use crate::error::Result;

#[derive(Clone, Default)]
pub struct Capabilities {
    pub playback: Option<Arc<dyn PlaybackControl>>,
}

impl Capabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_playback(playback: Arc<dyn PlaybackControl>) -> Self {
        Self {
            playback: Some(playback),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.playback.is_none()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("playback", &self.playback.is_some())
            .finish()
    }
}

/// Media playback driven by a plugin (a music service integration, say).
#[async_trait]
pub trait PlaybackControl: Send + Sync {
    async fn pause(&self) -> Result<()>;
    async fn resume(&self) -> Result<()>;
    async fn seek(&self, position: Duration) -> Result<()>;
    async fn next(&self) -> Result<()>;
    async fn previous(&self) -> Result<()>;
    async fn state(&self) -> Result<PlaybackState>;
}

/// Snapshot of the player, taken when `state()` was answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub track: Option<String>,
    pub artists: Vec<String>,
    pub album_art: Option<String>,
    pub progress: Duration,
    pub duration: Duration,
}
