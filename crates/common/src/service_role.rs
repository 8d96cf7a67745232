//! Service roles: non-human recipients for CI pipelines
//!
//! A service role is an X25519 keypair bound to a repository principal. The
//! private half is generated on the operator's machine, shown once as two
//! environment-variable lines, and then forgotten. CI jobs authenticate with
//! an OIDC token instead of a password and unwrap delegated keys with the
//! injected private key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::{CryptoError, PublicKey, SecretKey};

/// Env var a CI job reads the service role private key from
pub const PRIVATE_KEY_ENV: &str = "ENVCRYPT_SERVICE_ROLE_PRIVATE_KEY";
/// Env var carrying the matching public key, for reference only
pub const PUBLIC_KEY_ENV: &str = "ENVCRYPT_SERVICE_ROLE_PUBLIC_KEY";

/// A service role as the backend stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRole {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "service_role_public_key")]
    pub public_key: PublicKey,
    pub repo_principal: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Freshly generated service role keys, shown to the operator exactly once
#[derive(Debug)]
pub struct ServiceRoleKeyPair {
    pub public_key: PublicKey,
    pub private_key: SecretKey,
}

impl ServiceRoleKeyPair {
    pub fn generate() -> Result<Self, CryptoError> {
        let private_key = SecretKey::generate()?;
        Ok(Self {
            public_key: private_key.public(),
            private_key,
        })
    }

    /// The two lines to paste into a CI secret store
    pub fn to_env_lines(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{}={}\n{}={}\n",
            PUBLIC_KEY_ENV,
            self.public_key.to_base64(),
            PRIVATE_KEY_ENV,
            self.private_key.to_base64().as_str(),
        ))
    }
}

/// Build the principal a GitHub OIDC token for `repo` on `branch` asserts
///
/// `repo` is `owner/name`.
pub fn repo_principal(repo: &str, branch: &str) -> String {
    format!("repo:{}:ref:refs/heads/{}", repo, branch)
}
