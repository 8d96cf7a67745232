use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, SharedSecret, StaticSecret};
use zeroize::Zeroizing;

use super::{fill_random, to_array, CryptoError};

/// Size of an X25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of an X25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Public half of an X25519 identity
///
/// Identifies a recipient of wrapped project keys: a human user or a
/// service role. Serialized as standard base64, which is how the backend
/// stores and returns it.
///
/// # Examples
///
/// ```ignore
/// let secret_key = SecretKey::generate()?;
/// let public_key = secret_key.public();
///
/// let b64 = public_key.to_base64();
/// let recovered = PublicKey::from_base64(&b64)?;
/// assert_eq!(public_key, recovered);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl From<[u8; PUBLIC_KEY_SIZE]> for PublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        PublicKey(bytes)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Ok(PublicKey(to_array("public key", bytes)?))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        PublicKey::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

impl PublicKey {
    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex).map_err(|_| CryptoError::InvalidKeyMaterial)?;
        Self::try_from(bytes.as_slice())
    }

    /// Parse a public key from standard base64
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| CryptoError::InvalidKeyMaterial)?;
        Self::try_from(bytes.as_slice())
    }

    /// Convert public key to raw bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Convert public key to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Convert public key to standard base64
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub(crate) fn to_x25519(self) -> X25519PublicKey {
        X25519PublicKey::from(self.0)
    }
}

/// Private half of an X25519 identity
///
/// Wraps a `StaticSecret`, which is zeroized when dropped. Never serialized
/// directly; at rest it is either inside an
/// [`EncryptedPrivateKey`](super::EncryptedPrivateKey) or in the OS secret
/// store.
///
/// # Security Considerations
///
/// - Never send this key to the backend
/// - Service role keys are shown to the operator once and then forgotten
#[derive(Clone)]
pub struct SecretKey(StaticSecret);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(StaticSecret::from(secret))
    }
}

impl TryFrom<&[u8]> for SecretKey {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let buff = Zeroizing::new(to_array::<PRIVATE_KEY_SIZE>("private key", bytes)?);
        Ok(Self::from(*buff))
    }
}

impl SecretKey {
    /// Generate a new random secret key from the OS CSPRNG
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        fill_random(bytes.as_mut())?;
        Ok(Self::from(*bytes))
    }

    /// Parse a secret key from standard base64
    ///
    /// This is the format service role keys are handed to CI systems in.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            BASE64
                .decode(encoded.trim())
                .map_err(|_| CryptoError::InvalidKeyMaterial)?,
        );
        Self::try_from(bytes.as_slice())
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(X25519PublicKey::from(&self.0).to_bytes())
    }

    /// Raw key bytes, scrubbed when the returned buffer is dropped
    pub fn to_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_SIZE]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Standard base64 of the raw key bytes
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(BASE64.encode(self.to_bytes().as_ref()))
    }

    /// X25519 key agreement with a peer public key
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if the peer key is a low-order point,
    /// which would make the shared secret predictable.
    pub(crate) fn diffie_hellman(&self, peer: &PublicKey) -> Result<SharedSecret, CryptoError> {
        let shared = self.0.diffie_hellman(&peer.to_x25519());
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidKeyMaterial);
        }
        Ok(shared)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let private_key = SecretKey::generate().unwrap();
        let public_key = private_key.public();

        let recovered_private = SecretKey::from_base64(&private_key.to_base64()).unwrap();
        assert_eq!(*private_key.to_bytes(), *recovered_private.to_bytes());
        assert_eq!(public_key, recovered_private.public());

        let recovered_public = PublicKey::from_hex(&public_key.to_hex()).unwrap();
        assert_eq!(public_key, recovered_public);
        let recovered_public = PublicKey::from_base64(&public_key.to_base64()).unwrap();
        assert_eq!(public_key, recovered_public);
    }

    #[test]
    fn test_key_size_validation() {
        assert!(matches!(
            PublicKey::try_from(&[1u8; 31][..]),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                got: 31,
                ..
            })
        ));
        assert!(matches!(
            SecretKey::try_from(&[1u8; 33][..]),
            Err(CryptoError::InvalidKeyLength { got: 33, .. })
        ));
        assert!(PublicKey::try_from(&[1u8; PUBLIC_KEY_SIZE][..]).is_ok());
    }

    #[test]
    fn test_ecdh_agreement() {
        let alice = SecretKey::generate().unwrap();
        let bob = SecretKey::generate().unwrap();
        let ab = alice.diffie_hellman(&bob.public()).unwrap();
        let ba = bob.diffie_hellman(&alice.public()).unwrap();
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_low_order_point_rejected() {
        let alice = SecretKey::generate().unwrap();
        let identity_point = PublicKey::from([0u8; PUBLIC_KEY_SIZE]);
        assert!(matches!(
            alice.diffie_hellman(&identity_point),
            Err(CryptoError::InvalidKeyMaterial)
        ));
    }

    #[test]
    fn test_public_key_serde_json() {
        let public_key = SecretKey::generate().unwrap().public();
        let json = serde_json::to_string(&public_key).unwrap();
        assert_eq!(json, format!("\"{}\"", public_key.to_base64()));
        let recovered: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(public_key, recovered);
    }

    #[test]
    fn test_secret_key_debug_is_redacted() {
        let secret_key = SecretKey::generate().unwrap();
        assert_eq!(format!("{:?}", secret_key), "SecretKey(..)");
    }
}
