//! Local storage for private keys between invocations
//!
//! Implementations back onto an OS keychain or similar. Values are raw key
//! bytes and must never be logged.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use zeroize::Zeroizing;

#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("no secret stored for {0}")]
    NotFound(String),
    #[error("secret store error: {0}")]
    Backend(String),
}

pub trait SecretStore: Send + Sync {
    fn save(&self, label: &str, secret: &[u8]) -> Result<(), SecretStoreError>;
    fn load(&self, label: &str) -> Result<Zeroizing<Vec<u8>>, SecretStoreError>;
    fn delete(&self, label: &str) -> Result<(), SecretStoreError>;
}

/// In-memory secret store for tests and ephemeral use
#[derive(Clone, Default)]
pub struct MemorySecretStore {
    inner: Arc<RwLock<HashMap<String, Zeroizing<Vec<u8>>>>>,
}

impl std::fmt::Debug for MemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySecretStore").finish_non_exhaustive()
    }
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.inner
            .read()
            .map(|inner| inner.contains_key(label))
            .unwrap_or(false)
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> SecretStoreError {
    SecretStoreError::Backend(format!("failed to acquire lock: {}", e))
}

impl SecretStore for MemorySecretStore {
    fn save(&self, label: &str, secret: &[u8]) -> Result<(), SecretStoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.insert(label.to_string(), Zeroizing::new(secret.to_vec()));
        Ok(())
    }

    fn load(&self, label: &str) -> Result<Zeroizing<Vec<u8>>, SecretStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        inner
            .get(label)
            .cloned()
            .ok_or_else(|| SecretStoreError::NotFound(label.to_string()))
    }

    fn delete(&self, label: &str) -> Result<(), SecretStoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner
            .remove(label)
            .map(|_| ())
            .ok_or_else(|| SecretStoreError::NotFound(label.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_save_load_delete() {
        let store = MemorySecretStore::new();
        store.save("alice@example.com", &[1, 2, 3]).unwrap();
        assert!(store.contains("alice@example.com"));
        assert_eq!(store.load("alice@example.com").unwrap().as_slice(), &[1, 2, 3]);

        store.delete("alice@example.com").unwrap();
        assert!(matches!(
            store.load("alice@example.com"),
            Err(SecretStoreError::NotFound(_))
        ));
        assert!(store.delete("alice@example.com").is_err());
    }

    #[test]
    fn test_save_overwrites() {
        let store = MemorySecretStore::new();
        store.save("k", b"old").unwrap();
        store.save("k", b"new").unwrap();
        assert_eq!(store.load("k").unwrap().as_slice(), b"new");
    }
}
