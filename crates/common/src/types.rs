use std::fmt;

use serde::{Deserialize, Serialize};

/// How arrays are combined when a cached record is merged with a patch that
/// carries an array at the same key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayStrategy {
    /// The incoming array replaces the stored one.
    #[default]
    Replace,
    /// The incoming array is appended to the stored one.
    Concat,
    /// Set union: appended, then structural duplicates dropped (first wins).
    Unique,
}

impl fmt::Display for ArrayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Replace => "replace",
            Self::Concat => "concat",
            Self::Unique => "unique",
        })
    }
}
