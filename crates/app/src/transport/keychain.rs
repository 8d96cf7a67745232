use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use keyring::Entry;
use zeroize::Zeroizing;

use common::secret_store::{SecretStore, SecretStoreError};

/// Keychain service name entries are stored under
pub const KEYRING_SERVICE: &str = "envcrypt";

/// Private keys in the OS keychain, base64 encoded
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }
}

impl KeyringSecretStore {
    fn entry(&self, label: &str) -> Result<Entry, SecretStoreError> {
        Entry::new(&self.service, label).map_err(backend)
    }
}

fn backend(e: keyring::Error) -> SecretStoreError {
    SecretStoreError::Backend(e.to_string())
}

impl SecretStore for KeyringSecretStore {
    fn save(&self, label: &str, secret: &[u8]) -> Result<(), SecretStoreError> {
        let encoded = Zeroizing::new(BASE64.encode(secret));
        self.entry(label)?.set_password(&encoded).map_err(backend)
    }

    fn load(&self, label: &str) -> Result<Zeroizing<Vec<u8>>, SecretStoreError> {
        let encoded = match self.entry(label)?.get_password() {
            Ok(encoded) => Zeroizing::new(encoded),
            Err(keyring::Error::NoEntry) => return Err(SecretStoreError::NotFound(label.to_string())),
            Err(e) => return Err(backend(e)),
        };
        BASE64
            .decode(encoded.as_bytes())
            .map(Zeroizing::new)
            .map_err(|_| SecretStoreError::Backend(format!("keychain entry for {} is corrupt", label)))
    }

    fn delete(&self, label: &str) -> Result<(), SecretStoreError> {
        match self.entry(label)?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Err(SecretStoreError::NotFound(label.to_string())),
            Err(e) => Err(backend(e)),
        }
    }
}
