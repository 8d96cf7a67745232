use crate::api::TransportError;
use crate::crypto::CryptoError;
use crate::env::EnvError;
use crate::secret_store::SecretStoreError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("env error: {0}")]
    Env(#[from] EnvError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("secret store error: {0}")]
    SecretStore(#[from] SecretStoreError),
    #[error("no private key stored for {0}; log in first")]
    NotLoggedIn(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("version {version} of {env} not found")]
    VersionNotFound { env: String, version: i32 },
    #[error("{env} is already at version {version}")]
    AlreadyCurrent { env: String, version: i32 },
    #[error("login failed: stored key does not match the registered public key")]
    IdentityMismatch,
    #[error("background task failed: {0}")]
    Task(String),
}
