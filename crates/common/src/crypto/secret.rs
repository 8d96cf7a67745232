//! Project master keys and payload encryption using AES-256-GCM
//!
//! A project has exactly one [`ProjectMasterKey`]. Every version of every
//! environment in the project is sealed with it under a fresh random nonce.
//! The key itself only ever crosses a process boundary inside a
//! [`WrappedKey`](super::WrappedKey).

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{fill_random, to_array, CryptoError};

/// Size of an AES-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of an AES-256 key in bytes
pub const SECRET_SIZE: usize = 32;

/// A 256-bit symmetric key that seals all secret payloads of one project
///
/// Zeroized on drop and deliberately neither `Serialize` nor `Display`: the
/// only way to move a PMK out of a process is to wrap it for a recipient.
///
/// # Examples
///
/// ```ignore
/// let pmk = ProjectMasterKey::generate()?;
///
/// let (ciphertext, nonce) = pmk.encrypt(b"FOO=bar\n")?;
/// let plaintext = pmk.decrypt(&ciphertext, &nonce)?;
/// assert_eq!(&plaintext[..], b"FOO=bar\n");
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ProjectMasterKey([u8; SECRET_SIZE]);

impl fmt::Debug for ProjectMasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProjectMasterKey(..)")
    }
}

impl From<[u8; SECRET_SIZE]> for ProjectMasterKey {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        ProjectMasterKey(bytes)
    }
}

impl ProjectMasterKey {
    /// Generate a new random key using the OS CSPRNG
    pub fn generate() -> Result<Self, CryptoError> {
        let mut pmk = ProjectMasterKey([0; SECRET_SIZE]);
        fill_random(&mut pmk.0)?;
        Ok(pmk)
    }

    /// Create a key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyLength` if the slice is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        let buff = Zeroizing::new(to_array::<SECRET_SIZE>("project master key", data)?);
        Ok(ProjectMasterKey(*buff))
    }

    /// Get a reference to the key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Seal a payload with AES-256-GCM under a fresh random nonce
    ///
    /// No associated data is bound. Returns `(ciphertext || tag, nonce)`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_SIZE]), CryptoError> {
        seal(&self.0, plaintext)
    }

    /// Open a payload sealed by [`ProjectMasterKey::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyLength` for a malformed nonce and
    /// `AuthenticationFailure` if the tag does not verify (wrong key or
    /// tampered ciphertext). Never returns partial plaintext.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        open(&self.0, ciphertext, nonce)
    }
}

/// AES-256-GCM seal with a random nonce and no associated data
pub(crate) fn seal(
    key: &[u8; SECRET_SIZE],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_SIZE]), CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    fill_random(&mut nonce_bytes)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::KeyDerivationFailure("aes-gcm seal failed".to_string()))?;

    Ok((ciphertext, nonce_bytes))
}

/// AES-256-GCM open; every tag failure collapses to `AuthenticationFailure`
pub(crate) fn open(
    key: &[u8; SECRET_SIZE],
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let nonce_bytes: [u8; NONCE_SIZE] = to_array("nonce", nonce)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::AuthenticationFailure)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_payload_encrypt_decrypt() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let data = b"DATABASE_URL=postgres://localhost/app\nTOKEN=abc\n";

        let (ciphertext, nonce) = pmk.encrypt(data).unwrap();
        let decrypted = pmk.decrypt(&ciphertext, &nonce).unwrap();

        assert_eq!(data.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let (c1, n1) = pmk.encrypt(b"same").unwrap();
        let (c2, n2) = pmk.encrypt(b"same").unwrap();
        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_secret_size_validation() {
        assert!(ProjectMasterKey::from_slice(&[1u8; 16]).is_err());
        assert!(ProjectMasterKey::from_slice(&[1u8; 64]).is_err());
        assert!(ProjectMasterKey::from_slice(&[1u8; SECRET_SIZE]).is_ok());
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let (mut ciphertext, nonce) = pmk.encrypt(b"integrity matters").unwrap();

        for i in [0, ciphertext.len() / 2, ciphertext.len() - 1] {
            ciphertext[i] ^= 0x01;
            assert!(matches!(
                pmk.decrypt(&ciphertext, &nonce),
                Err(CryptoError::AuthenticationFailure)
            ));
            ciphertext[i] ^= 0x01;
        }
        assert!(pmk.decrypt(&ciphertext, &nonce).is_ok());
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let other = ProjectMasterKey::generate().unwrap();
        let (ciphertext, nonce) = pmk.encrypt(b"payload").unwrap();
        assert!(matches!(
            other.decrypt(&ciphertext, &nonce),
            Err(CryptoError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_malformed_nonce_rejected() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let (ciphertext, _) = pmk.encrypt(b"payload").unwrap();
        assert!(matches!(
            pmk.decrypt(&ciphertext, &[0u8; 8]),
            Err(CryptoError::InvalidKeyLength { what: "nonce", .. })
        ));
    }

    #[test]
    fn test_empty_payload() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let (ciphertext, nonce) = pmk.encrypt(b"").unwrap();
        assert!(pmk.decrypt(&ciphertext, &nonce).unwrap().is_empty());
    }
}
