//! # Recipients
//!
//! A recipient is anyone who can be handed a project's master key: a human
//! member of the project or a service role acting for a CI pipeline.
//!
//! Each recipient has:
//! - An **identity** (X25519 public key) the PMK is wrapped for
//! - A **record id** naming the backend row its [`WrappedKey`] lives in
//!
//! ## Trust Model
//!
//! Access is purely cryptographic: holding a wrapped key and the matching
//! private key is holding the project. Member roles are advisory and are
//! enforced by the backend, not by the wrapping math.
//!
//! ## Revocation
//!
//! Revoking deletes the recipient's wrapped key. The PMK is not rotated, so
//! a recipient that cached the plaintext key before revocation can still
//! open ciphertext it already fetched. Rotation on revoke would require
//! re-encrypting every version and re-wrapping for every remaining
//! recipient; it is not done here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{CryptoError, ProjectMasterKey, PublicKey, WrappedKey};

/// The role of a human member on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Created the project. Always holds a wrapped key.
    Owner,
    /// Can add and revoke members and delegate to service roles.
    Admin,
    /// Can push and pull.
    Member,
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::Owner => write!(f, "owner"),
            MemberRole::Admin => write!(f, "admin"),
            MemberRole::Member => write!(f, "member"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid role {0:?} (must be admin or member)")]
pub struct InvalidRole(String);

impl FromStr for MemberRole {
    type Err = InvalidRole;

    /// Parses the roles that can be granted; `owner` is never granted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(MemberRole::Admin),
            "member" => Ok(MemberRole::Member),
            _ => Err(InvalidRole(s.to_string())),
        }
    }
}

/// Anyone a project master key can be wrapped for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
    User { user_id: Uuid, public_key: PublicKey },
    ServiceRole { role_id: Uuid, public_key: PublicKey },
}

impl Recipient {
    pub fn public_key(&self) -> &PublicKey {
        match self {
            Recipient::User { public_key, .. } => public_key,
            Recipient::ServiceRole { public_key, .. } => public_key,
        }
    }

    /// Id of the user or service role record
    pub fn id(&self) -> Uuid {
        match self {
            Recipient::User { user_id, .. } => *user_id,
            Recipient::ServiceRole { role_id, .. } => *role_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Recipient::User { .. } => "user",
            Recipient::ServiceRole { .. } => "service_role",
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Wrap the project key for a recipient of either kind
pub fn grant_access(
    pmk: &ProjectMasterKey,
    recipient: &Recipient,
) -> Result<WrappedKey, CryptoError> {
    tracing::debug!(recipient = %recipient, "wrapping project key");
    WrappedKey::wrap(pmk, recipient.public_key())
}
