use {
    secrecy::{ExposeSecret, Secret},
    std::fmt,
};

/// The gateway bearer credential.
///
/// `Debug` and `Display` never print the value; use [`Credential::redacted`]
/// when a log line has to identify which credential is in use.
#[derive(Clone)]
pub struct Credential(Secret<String>);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Secret::new(value.into()))
    }

    /// Build a credential from user input, rejecting blank values.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| Self::new(trimmed))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// First dot-separated segment followed by a fixed mask, e.g.
    /// `MTIz.xxxxxxx.xxxxxxx...`.
    pub fn redacted(&self) -> String {
        redact(self.expose())
    }
}

/// Redact a raw credential string the same way as [`Credential::redacted`].
pub fn redact(raw: &str) -> String {
    let head = raw.split('.').next().unwrap_or_default();
    format!("{head}.xxxxxxx.xxxxxxx...")
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
