use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("credential must be a non-empty string")]
    EmptyCredential,

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("keyring task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
