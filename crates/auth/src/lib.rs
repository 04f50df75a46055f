//! Session credential management.
//!
//! This crate provides:
//! - [`Credential`]: the bearer credential, redacted in every log line
//! - [`CredentialStore`]: load/save/delete, backed by the OS keyring
//!   ([`KeyringStore`]) or memory ([`MemoryStore`], for tests and dry runs)

pub mod credential;
pub mod error;
pub mod store;

pub use {
    credential::{Credential, redact},
    error::{Error, Result},
    store::{CredentialStore, KeyringStore, MemoryStore, account_name, keyring_is_persistent},
};
