use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("missing or invalid plugin.json for \"{name}\" at {}: {reason}", path.display())]
    InvalidManifest {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("plugin \"{plugin}\" depends on \"{dependency}\", which is not available")]
    MissingDependency { plugin: String, dependency: String },

    #[error("circular dependency detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("plugin \"{id}\" is already registered")]
    DuplicatePlugin { id: String },

    #[error("plugin \"{id}\" failed to activate: {reason}")]
    Activation { id: String, reason: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_manifest(name: &str, path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            name: name.to_string(),
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn missing_dependency(plugin: &str, dependency: &str) -> Self {
        Self::MissingDependency {
            plugin: plugin.to_string(),
            dependency: dependency.to_string(),
        }
    }

    #[must_use]
    pub fn activation(id: &str, reason: impl Into<String>) -> Self {
        Self::Activation {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// Whether this is a dependency-graph problem (cycle or missing
    /// dependency) rather than an I/O or activation failure.
    pub fn is_graph_error(&self) -> bool {
        matches!(self, Self::Cycle { .. } | Self::MissingDependency { .. })
    }
}

impl breadcord_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

breadcord_common::impl_context!();
