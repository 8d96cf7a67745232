//! Secret payloads: the env snapshot and everything that turns it into bytes
//!
//! A [`Snapshot`] is the decrypted mapping of variable names to values for
//! one environment version. On the way to the backend it is canonicalized
//! (sorted `KEY=value` lines), gzip-compressed and sealed with the project
//! master key. On the way back the pipeline runs in reverse, and every
//! failure after authentication is `PayloadCorrupt`.

mod codec;
mod diff;
mod dotenv;

use std::collections::BTreeMap;

use zeroize::Zeroizing;

use crate::crypto::{CryptoError, ProjectMasterKey, NONCE_SIZE};

pub use codec::{canonicalize, compress, decompress, encode_env_file};
pub use diff::{diff, SnapshotDiff};
pub use dotenv::{parse, validate_key};

/// Variable name → value. `BTreeMap` keeps keys unique and sorted, which is
/// the order canonicalization needs.
pub type Snapshot = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// A user-supplied env file is not valid dotenv
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    /// Authenticated plaintext could not be decompressed or parsed
    #[error("payload corrupt: {0}")]
    PayloadCorrupt(String),
    #[error("invalid variable name: {0:?}")]
    InvalidKey(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// A sealed snapshot as it is stored in an env version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
}

/// Canonicalize then compress
///
/// Every key is checked against the variable-name grammar first, so a
/// snapshot that cannot be read back is never stored.
pub fn prepare_for_storage(snapshot: &Snapshot) -> Result<Vec<u8>, EnvError> {
    for key in snapshot.keys() {
        validate_key(key)?;
    }
    let canonical = Zeroizing::new(canonicalize(snapshot));
    compress(&canonical)
}

/// Decompress then parse; the inverse of [`prepare_for_storage`]
pub fn restore_from_storage(data: &[u8]) -> Result<Snapshot, EnvError> {
    let decompressed = decompress(data)?;
    let text = std::str::from_utf8(&decompressed)
        .map_err(|_| EnvError::PayloadCorrupt("payload is not valid utf-8".to_string()))?;
    parse(text).map_err(|e| EnvError::PayloadCorrupt(e.to_string()))
}

/// Prepare a snapshot for storage and seal it under the project master key
pub fn encrypt_payload(pmk: &ProjectMasterKey, snapshot: &Snapshot) -> Result<SealedPayload, EnvError> {
    let prepared = Zeroizing::new(prepare_for_storage(snapshot)?);
    let (ciphertext, nonce) = pmk.encrypt(&prepared)?;
    Ok(SealedPayload { ciphertext, nonce })
}

/// Open a sealed payload and restore the snapshot
///
/// # Errors
///
/// `Crypto(AuthenticationFailure)` for a wrong key or tampering;
/// `PayloadCorrupt` if the authenticated bytes are not a valid payload.
pub fn decrypt_payload(
    pmk: &ProjectMasterKey,
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<Snapshot, EnvError> {
    let prepared = pmk.decrypt(ciphertext, nonce)?;
    restore_from_storage(&prepared)
}
