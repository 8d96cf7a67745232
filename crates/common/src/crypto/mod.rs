//! Cryptographic primitives for envcrypt
//!
//! This module provides the cryptographic foundation for envcrypt's security model:
//!
//! - **Identity**: X25519 keypairs per user, with the private half protected
//!   at rest by a password (Argon2id + AES-256-GCM)
//! - **Payload Encryption**: AES-256-GCM under a per-project master key (PMK)
//! - **Key Wrapping**: ephemeral ECDH + HKDF-SHA256 + AES-256-GCM to hand the
//!   PMK to any number of recipients
//!
//! # Security Model
//!
//! ## Identities
//! Each user has an X25519 keypair (`SecretKey`/`PublicKey`). The public key is
//! registered with the backend; the private key only ever leaves the client as an
//! [`EncryptedPrivateKey`], sealed under a key derived from the user's password.
//!
//! ## Project Master Keys
//! Every project has exactly one [`ProjectMasterKey`]. All secret payloads of
//! the project are sealed with it. The backend never sees it in the clear.
//!
//! ## Key Wrapping Protocol
//! To give a recipient (a user or a service role) access to a project:
//! 1. Generate a fresh ephemeral X25519 keypair
//! 2. Perform ECDH between the ephemeral secret and the recipient's public key
//! 3. Derive a wrap key with HKDF-SHA256 (label `envcrypt-pmk-wrap`, no salt)
//! 4. Seal the PMK with AES-256-GCM under the wrap key and a random nonce
//! 5. Package as a [`WrappedKey`] (ciphertext, nonce, ephemeral public key)
//!
//! The recipient recovers the PMK by repeating the ECDH with their private key
//! and the stored ephemeral public key. Every wrap is independent, so revoking
//! one recipient never touches anyone else's wrapped key.
//!
//! ## Failure Semantics
//! An AEAD tag mismatch is the only correctness oracle. Wrong passwords, wrong
//! recipients and tampered ciphertexts all surface as the same error and never
//! yield plaintext.

mod error;
mod identity;
mod keys;
mod secret;
mod wrapped_key;

pub use error::CryptoError;
pub use identity::{generate_identity, Argon2Params, EncryptedPrivateKey, Identity, SALT_SIZE};
pub use keys::{PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use secret::{ProjectMasterKey, NONCE_SIZE, SECRET_SIZE};
pub use wrapped_key::{unwrap_for_recipient, wrap_for_recipient, WrappedKey, WRAP_LABEL};

/// Fill `buf` from the operating system's CSPRNG.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::getrandom(buf)
        .map_err(|e| CryptoError::KeyDerivationFailure(format!("system rng failure: {}", e)))
}

/// Copy a slice into a fixed-size array, failing with `InvalidKeyLength`.
pub(crate) fn to_array<const N: usize>(
    what: &'static str,
    bytes: &[u8],
) -> Result<[u8; N], CryptoError> {
    if bytes.len() != N {
        return Err(CryptoError::InvalidKeyLength {
            what,
            expected: N,
            got: bytes.len(),
        });
    }
    let mut buff = [0u8; N];
    buff.copy_from_slice(bytes);
    Ok(buff)
}
