use std::sync::Mutex;

use {
    async_trait::async_trait,
    keyring::credential::{CredentialBuilderApi, CredentialPersistence},
    tracing::{debug, info},
};

use crate::{
    credential::Credential,
    error::{Error, Result},
};

/// Persistent storage for the single session credential.
///
/// Absence is not an error: [`CredentialStore::load`] returns `Ok(None)`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<Credential>>;

    /// Persist `raw` with surrounding whitespace removed. Blank values are
    /// rejected with [`Error::EmptyCredential`].
    async fn save(&self, raw: &str) -> Result<()>;

    /// Remove the stored credential. Deleting a missing entry succeeds.
    async fn delete(&self) -> Result<()>;
}

/// Keyring account for the current OS user: `<username>:auth_token`.
pub fn account_name() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "user".to_string());
    format!("{user}:auth_token")
}

/// Values written by other tools may be wrapped in literal double quotes.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Surrounding whitespace is never part of a credential.
fn normalize(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyCredential);
    }
    Ok(trimmed)
}

/// Whether the platform keyring keeps entries across logout and reboot.
pub fn keyring_is_persistent() -> bool {
    matches!(
        keyring::default::default_credential_builder().persistence(),
        CredentialPersistence::UntilDelete
    )
}

// ── Keyring ─────────────────────────────────────────────────────────────────

/// Credential store backed by the OS keyring.
///
/// Keyring calls block, so each one runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
    account: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self::with_account(service, account_name())
    }

    pub fn with_account(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    async fn with_entry<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> keyring::Result<T> + Send + 'static,
    {
        let service = self.service.clone();
        let account = self.account.clone();
        let out = tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &account)?;
            op(entry)
        })
        .await??;
        Ok(out)
    }
}

#[async_trait]
impl CredentialStore for KeyringStore {
    async fn load(&self) -> Result<Option<Credential>> {
        let stored = self
            .with_entry(|entry| match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e),
            })
            .await?;

        let credential = stored
            .as_deref()
            .map(unquote)
            .filter(|v| !v.is_empty())
            .map(Credential::new);
        match &credential {
            Some(c) => debug!(service = %self.service, credential = %c, "credential loaded"),
            None => debug!(service = %self.service, "no credential stored"),
        }
        Ok(credential)
    }

    async fn save(&self, raw: &str) -> Result<()> {
        let value = normalize(raw)?.to_string();
        self.with_entry(move |entry| entry.set_password(&value))
            .await?;
        info!(service = %self.service, account = %self.account, "credential saved");
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.with_entry(|entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await?;
        info!(service = %self.service, account = %self.account, "credential deleted");
        Ok(())
    }
}

// ── Memory ──────────────────────────────────────────────────────────────────

/// In-process store with the same semantics as [`KeyringStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store with a raw value, as if another tool wrote it.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Option<Credential>> {
        let guard = self.value.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard
            .as_deref()
            .map(unquote)
            .filter(|v| !v.is_empty())
            .map(Credential::new))
    }

    async fn save(&self, raw: &str) -> Result<()> {
        let value = normalize(raw)?.to_string();
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}
