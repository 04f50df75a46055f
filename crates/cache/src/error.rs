use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// `set`/`update` was given something other than a JSON object.
    #[error("expected a record, found {found}")]
    NotARecord { found: &'static str },
}

impl CacheError {
    pub(crate) fn not_a_record(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        let found = match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "a record",
        };
        Self::NotARecord { found }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
