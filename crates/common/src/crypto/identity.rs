//! Password-protected user identities
//!
//! A user's X25519 private key is stored by the backend only as an
//! [`EncryptedPrivateKey`]: AES-256-GCM under a key derived from the user's
//! password with Argon2id. The Argon2 parameters travel with the blob so a
//! future change of defaults never strands existing identities.
//!
//! The GCM tag is the only password check. A wrong password, a corrupted
//! blob and a tampered blob are indistinguishable to the caller.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use zeroize::Zeroizing;

use super::keys::{PublicKey, SecretKey, PRIVATE_KEY_SIZE};
use super::secret::{open, seal, NONCE_SIZE, SECRET_SIZE};
use super::{fill_random, to_array, CryptoError};

/// Size of the Argon2id salt in bytes
pub const SALT_SIZE: usize = 16;
/// Largest Argon2 memory cost accepted from a stored blob (1 GiB)
pub const MAX_MEMORY_KIB: u32 = 1024 * 1024;
/// Largest Argon2 pass count accepted from a stored blob
pub const MAX_TIME: u32 = 64;

/// Argon2id cost parameters stored alongside each encrypted private key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Number of passes
    pub time: u32,
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub parallelism: u8,
    /// Derived key length; only 32 is accepted
    pub key_len: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time: 3,
            memory_kib: 64 * 1024,
            parallelism: 1,
            key_len: SECRET_SIZE as u32,
        }
    }
}

impl Argon2Params {
    /// Cheap parameters for tests. Never use these for real identities.
    pub fn insecure_fast() -> Self {
        Self {
            time: 1,
            memory_kib: 1024,
            parallelism: 1,
            key_len: SECRET_SIZE as u32,
        }
    }

    /// Derive a 32-byte key from `password` and `salt`
    fn derive_key(
        &self,
        password: &[u8],
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; SECRET_SIZE]>, CryptoError> {
        if self.key_len as usize != SECRET_SIZE {
            return Err(CryptoError::KeyDerivationFailure(format!(
                "unsupported argon2 key length {}",
                self.key_len
            )));
        }
        // stored params are backend-supplied
        if self.memory_kib > MAX_MEMORY_KIB || self.time > MAX_TIME {
            return Err(CryptoError::KeyDerivationFailure(format!(
                "argon2 cost out of range (time {}, memory {} KiB)",
                self.time, self.memory_kib
            )));
        }

        let params = Params::new(
            self.memory_kib,
            self.time,
            self.parallelism as u32,
            Some(SECRET_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivationFailure(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = Zeroizing::new([0u8; SECRET_SIZE]);
        argon2
            .hash_password_into(password, salt, output.as_mut())
            .map_err(|e| CryptoError::KeyDerivationFailure(e.to_string()))?;

        Ok(output)
    }
}

/// A private key sealed under a password-derived key
///
/// # Wire Format
///
/// ```text
/// {
///   "ciphertext": base64(AES-GCM(private key) || tag),
///   "salt":       base64(16 bytes),
///   "nonce":      base64(12 bytes),
///   "argon2":     { "time", "memory_kib", "parallelism", "key_len" }
/// }
/// ```
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPrivateKey {
    #[serde_as(as = "Base64")]
    pub ciphertext: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub salt: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub nonce: Vec<u8>,
    pub argon2: Argon2Params,
}

impl EncryptedPrivateKey {
    /// Seal `private_key` under `password` with a fresh salt and nonce
    pub fn encrypt(
        private_key: &SecretKey,
        password: &str,
        params: Argon2Params,
    ) -> Result<Self, CryptoError> {
        let mut salt = [0u8; SALT_SIZE];
        fill_random(&mut salt)?;

        let key = params.derive_key(password.as_bytes(), &salt)?;
        let (ciphertext, nonce) = seal(&key, private_key.to_bytes().as_ref())?;

        Ok(Self {
            ciphertext,
            salt: salt.to_vec(),
            nonce: nonce.to_vec(),
            argon2: params,
        })
    }

    /// Recover the private key with `password`
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength` if the stored salt or nonce is malformed
    /// - `AuthenticationFailure` for a wrong password or a tampered blob
    /// - `InvalidKeyMaterial` if the authenticated plaintext is not 32 bytes
    pub fn decrypt(&self, password: &str) -> Result<SecretKey, CryptoError> {
        let salt: [u8; SALT_SIZE] = to_array("salt", &self.salt)?;
        to_array::<NONCE_SIZE>("nonce", &self.nonce)?;

        let key = self.argon2.derive_key(password.as_bytes(), &salt)?;
        let plaintext = open(&key, &self.ciphertext, &self.nonce)?;

        if plaintext.len() != PRIVATE_KEY_SIZE {
            return Err(CryptoError::InvalidKeyMaterial);
        }
        SecretKey::try_from(plaintext.as_slice())
    }

    /// Re-seal the same private key under a new password
    ///
    /// The returned blob has a fresh salt and nonce and keeps this blob's
    /// Argon2 parameters.
    pub fn reencrypt(&self, old_password: &str, new_password: &str) -> Result<Self, CryptoError> {
        let private_key = self.decrypt(old_password)?;
        Self::encrypt(&private_key, new_password, self.argon2)
    }
}

/// A user's X25519 keypair, held in memory only for the length of a session
#[derive(Clone, Debug)]
pub struct Identity {
    pub public_key: PublicKey,
    pub private_key: SecretKey,
}

impl Identity {
    pub fn from_private_key(private_key: SecretKey) -> Self {
        Self {
            public_key: private_key.public(),
            private_key,
        }
    }
}

/// Generate a fresh keypair and the password-protected blob that stores it
pub fn generate_identity(
    password: &str,
    params: Argon2Params,
) -> Result<(Identity, EncryptedPrivateKey), CryptoError> {
    let identity = Identity::from_private_key(SecretKey::generate()?);
    let blob = EncryptedPrivateKey::encrypt(&identity.private_key, password, params)?;
    Ok((identity, blob))
}
