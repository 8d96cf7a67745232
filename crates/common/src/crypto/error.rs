/// Errors produced by the cryptographic layer.
///
/// None of these are transient; callers must not retry.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// A key, nonce or salt input does not have its fixed size
    #[error("invalid {what} length, expected {expected}, got {got}")]
    InvalidKeyLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// AEAD tag mismatch: wrong password, wrong key or tampered ciphertext
    #[error("authentication failure")]
    AuthenticationFailure,
    /// A wrapped PMK could not be opened with the supplied private key
    #[error("unable to unwrap project key")]
    UnwrapFailed,
    /// Authenticated plaintext or an ECDH result is not usable key material
    #[error("invalid key material")]
    InvalidKeyMaterial,
    /// RNG or KDF primitive failure
    #[error("key derivation failure: {0}")]
    KeyDerivationFailure(String),
}
