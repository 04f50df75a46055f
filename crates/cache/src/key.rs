use std::fmt;

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Opaque cache key: a string or an integer.
///
/// `"1"` and `1` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheKey {
    Num(i64),
    Str(String),
}

impl CacheKey {
    /// Key from a JSON `id` field. Only strings and integers qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Num),
            _ => None,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&String> for CacheKey {
    fn from(s: &String) -> Self {
        Self::Str(s.clone())
    }
}

impl From<i64> for CacheKey {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<i32> for CacheKey {
    fn from(n: i32) -> Self {
        Self::Num(i64::from(n))
    }
}

impl From<&CacheKey> for CacheKey {
    fn from(k: &CacheKey) -> Self {
        k.clone()
    }
}
