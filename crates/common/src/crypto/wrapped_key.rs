//! Project key wrapping using ephemeral ECDH + HKDF + AES-256-GCM
//!
//! This module implements the protocol for handing a project master key to a
//! recipient. It combines X25519 key agreement against a one-time ephemeral
//! key with HKDF-SHA256 key derivation and AES-256-GCM sealing.
//!
//! # Protocol Overview
//!
//! To wrap a PMK for a recipient:
//! 1. **Generate ephemeral keypair**: a fresh X25519 secret, used exactly once
//! 2. **Perform ECDH**: ephemeral secret x recipient public key
//! 3. **Derive wrap key**: HKDF-SHA256 over the shared secret, no salt,
//!    info = [`WRAP_LABEL`]
//! 4. **Seal**: AES-256-GCM over the PMK with a random nonce, no associated data
//! 5. **Package**: a [`WrappedKey`] with ciphertext, nonce and ephemeral public key
//!
//! The recipient recovers the PMK by:
//! 1. **Perform ECDH**: their private key x the stored ephemeral public key
//! 2. **Derive wrap key**: same HKDF label
//! 3. **Open**: AES-256-GCM; any tag failure is `UnwrapFailed`
//!
//! # Security Properties
//!
//! - **Wrap-channel forward secrecy**: the ephemeral secret and the shared
//!   secret are zeroized before `wrap` returns
//! - **Independence**: every recipient gets their own ephemeral exchange, so
//!   deleting one wrapped key never affects another
//! - **Integrity**: the GCM tag binds the PMK to the wrap key; the wrong
//!   recipient gets an error, never a guessed key
//!
//! Revocation deletes a recipient's wrapped key but does not rotate the PMK.
//! A recipient that cached the plaintext PMK before revocation keeps the
//! ability to open ciphertext it already fetched.

use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::keys::{PublicKey, SecretKey};
use super::secret::{open, seal, ProjectMasterKey, NONCE_SIZE, SECRET_SIZE};
use super::{to_array, CryptoError};

/// HKDF info string separating PMK wrap keys from any other use of the
/// shared secret
pub const WRAP_LABEL: &[u8] = b"envcrypt-pmk-wrap";

/// A project master key sealed for exactly one recipient
///
/// One of these exists per (project, recipient) pair. They are created on
/// project creation for the owner, on `grant` for members and on delegation
/// for service roles, and are opaque to the backend that stores them.
///
/// # Wire Format
///
/// ```text
/// {
///   "wrapped_pmk":        base64(AES-GCM ciphertext || tag),  48 bytes
///   "wrap_nonce":         base64(nonce),                       12 bytes
///   "wrap_ephemeral_pub": base64(X25519 public key),           32 bytes
/// }
/// ```
///
/// # Examples
///
/// ```ignore
/// // Alice grants Bob access to a project
/// let pmk = ProjectMasterKey::generate()?;
/// let wrapped = WrappedKey::wrap(&pmk, &bob_secret_key.public())?;
///
/// // Bob recovers the key with his private key
/// let recovered = wrapped.unwrap(&bob_secret_key)?;
/// assert_eq!(pmk, recovered);
/// ```
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    #[serde_as(as = "Base64")]
    pub wrapped_pmk: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub wrap_nonce: Vec<u8>,
    pub wrap_ephemeral_pub: PublicKey,
}

impl WrappedKey {
    /// Wrap a PMK for the holder of `recipient`'s private key
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if the recipient key is a low-order point
    /// and `KeyDerivationFailure` if the RNG or HKDF fails.
    pub fn wrap(pmk: &ProjectMasterKey, recipient: &PublicKey) -> Result<Self, CryptoError> {
        // The ephemeral secret is dropped (and zeroized) at the end of this scope
        let ephemeral_private = SecretKey::generate()?;
        let ephemeral_public = ephemeral_private.public();

        let wrap_key = derive_wrap_key(&ephemeral_private, recipient)?;
        let (wrapped_pmk, wrap_nonce) = seal(&wrap_key, pmk.bytes())?;

        Ok(Self {
            wrapped_pmk,
            wrap_nonce: wrap_nonce.to_vec(),
            wrap_ephemeral_pub: ephemeral_public,
        })
    }

    /// Recover the wrapped PMK using the recipient's private key
    ///
    /// # Errors
    ///
    /// Returns `UnwrapFailed` if the tag does not verify: the key was wrapped
    /// for someone else, or the record was corrupted or tampered with.
    /// Returns `InvalidKeyMaterial` if the authenticated plaintext is not a
    /// 32-byte key.
    pub fn unwrap(&self, recipient_secret: &SecretKey) -> Result<ProjectMasterKey, CryptoError> {
        let wrap_key = derive_wrap_key(recipient_secret, &self.wrap_ephemeral_pub)?;

        let pmk = open(&wrap_key, &self.wrapped_pmk, &self.wrap_nonce).map_err(|e| match e {
            CryptoError::AuthenticationFailure => CryptoError::UnwrapFailed,
            other => other,
        })?;

        if pmk.len() != SECRET_SIZE {
            return Err(CryptoError::InvalidKeyMaterial);
        }
        ProjectMasterKey::from_slice(&pmk)
    }

    /// Check the fixed-size fields of a record received over the wire
    pub fn validate(&self) -> Result<(), CryptoError> {
        to_array::<NONCE_SIZE>("wrap nonce", &self.wrap_nonce)?;
        Ok(())
    }
}

/// ECDH + HKDF-SHA256 → 32-byte AES key
///
/// The shared secret is zeroized when it goes out of scope here; the wrap key
/// is returned in a `Zeroizing` buffer.
fn derive_wrap_key(
    private: &SecretKey,
    public: &PublicKey,
) -> Result<Zeroizing<[u8; SECRET_SIZE]>, CryptoError> {
    let shared_secret = private.diffie_hellman(public)?;

    let hk = Hkdf::<Sha256>::new(None, shared_secret.as_bytes());
    let mut wrap_key = Zeroizing::new([0u8; SECRET_SIZE]);
    hk.expand(WRAP_LABEL, wrap_key.as_mut())
        .map_err(|e| CryptoError::KeyDerivationFailure(format!("hkdf expand failed: {}", e)))?;

    Ok(wrap_key)
}

/// Slice-level wrap: validates that both inputs are exactly 32 bytes
pub fn wrap_for_recipient(
    pmk: &[u8],
    recipient_public_key: &[u8],
) -> Result<WrappedKey, CryptoError> {
    let pmk = ProjectMasterKey::from_slice(pmk)?;
    let recipient = PublicKey::try_from(recipient_public_key)?;
    WrappedKey::wrap(&pmk, &recipient)
}

/// Slice-level unwrap: validates that the private key is exactly 32 bytes
pub fn unwrap_for_recipient(
    wrapped: &WrappedKey,
    recipient_private_key: &[u8],
) -> Result<ProjectMasterKey, CryptoError> {
    let recipient = SecretKey::try_from(recipient_private_key)?;
    wrapped.unwrap(&recipient)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_unwrap() {
        let pmk = ProjectMasterKey::from_slice(&[42u8; SECRET_SIZE]).unwrap();
        let private_key = SecretKey::generate().unwrap();
        let wrapped = WrappedKey::wrap(&pmk, &private_key.public()).unwrap();
        let recovered = wrapped.unwrap(&private_key).unwrap();
        assert_eq!(pmk, recovered);
    }

    #[test]
    fn test_wrap_different_recipient() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let alice = SecretKey::generate().unwrap();
        let bob = SecretKey::generate().unwrap();

        // Wrapped for Alice
        let wrapped = WrappedKey::wrap(&pmk, &alice.public()).unwrap();
        assert_eq!(pmk, wrapped.unwrap(&alice).unwrap());

        // Bob cannot recover it
        assert!(matches!(
            wrapped.unwrap(&bob),
            Err(CryptoError::UnwrapFailed)
        ));
    }

    #[test]
    fn test_ephemeral_freshness() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let recipient = SecretKey::generate().unwrap();

        let first = WrappedKey::wrap(&pmk, &recipient.public()).unwrap();
        let second = WrappedKey::wrap(&pmk, &recipient.public()).unwrap();

        assert_ne!(first.wrap_ephemeral_pub, second.wrap_ephemeral_pub);
        assert_ne!(first.wrapped_pmk, second.wrapped_pmk);
        assert_eq!(first.unwrap(&recipient).unwrap(), pmk);
        assert_eq!(second.unwrap(&recipient).unwrap(), pmk);
    }

    #[test]
    fn test_tampering_is_detected() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let recipient = SecretKey::generate().unwrap();
        let wrapped = WrappedKey::wrap(&pmk, &recipient.public()).unwrap();

        for i in 0..wrapped.wrapped_pmk.len() {
            let mut tampered = wrapped.clone();
            tampered.wrapped_pmk[i] ^= 0x80;
            assert!(matches!(
                tampered.unwrap(&recipient),
                Err(CryptoError::UnwrapFailed)
            ));
        }

        let mut tampered = wrapped.clone();
        tampered.wrap_nonce[0] ^= 0x01;
        assert!(matches!(
            tampered.unwrap(&recipient),
            Err(CryptoError::UnwrapFailed)
        ));

        let mut ephemeral = wrapped.wrap_ephemeral_pub.to_bytes();
        ephemeral[5] ^= 0x01;
        let tampered = WrappedKey {
            wrap_ephemeral_pub: PublicKey::from(ephemeral),
            ..wrapped
        };
        assert!(tampered.unwrap(&recipient).is_err());
    }

    #[test]
    fn test_slice_inputs_are_length_checked() {
        let recipient = SecretKey::generate().unwrap();
        let public = recipient.public().to_bytes();

        assert!(matches!(
            wrap_for_recipient(&[7u8; 31], &public),
            Err(CryptoError::InvalidKeyLength { got: 31, .. })
        ));
        assert!(matches!(
            wrap_for_recipient(&[7u8; SECRET_SIZE], &public[..16]),
            Err(CryptoError::InvalidKeyLength { got: 16, .. })
        ));

        let wrapped = wrap_for_recipient(&[7u8; SECRET_SIZE], &public).unwrap();
        assert!(matches!(
            unwrap_for_recipient(&wrapped, &[1u8; 12]),
            Err(CryptoError::InvalidKeyLength { got: 12, .. })
        ));
        let pmk = unwrap_for_recipient(&wrapped, recipient.to_bytes().as_ref()).unwrap();
        assert_eq!(pmk.bytes(), &[7u8; SECRET_SIZE]);
    }

    #[test]
    fn test_serde_json_roundtrip() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let recipient = SecretKey::generate().unwrap();
        let wrapped = WrappedKey::wrap(&pmk, &recipient.public()).unwrap();

        let json = serde_json::to_value(&wrapped).unwrap();
        assert!(json["wrapped_pmk"].is_string());
        assert!(json["wrap_nonce"].is_string());
        assert!(json["wrap_ephemeral_pub"].is_string());

        let recovered: WrappedKey = serde_json::from_value(json).unwrap();
        assert_eq!(wrapped, recovered);
        assert_eq!(recovered.unwrap(&recipient).unwrap(), pmk);
    }

    #[test]
    fn test_validate_rejects_short_nonce() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let recipient = SecretKey::generate().unwrap();
        let mut wrapped = WrappedKey::wrap(&pmk, &recipient.public()).unwrap();
        assert!(wrapped.validate().is_ok());
        wrapped.wrap_nonce.truncate(8);
        assert!(wrapped.validate().is_err());
        assert!(matches!(
            wrapped.unwrap(&recipient),
            Err(CryptoError::InvalidKeyLength { .. })
        ));
    }
}
