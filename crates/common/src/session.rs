use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated user a call is made on behalf of
///
/// Passed explicitly into every [`Client`](crate::client::Client) call that
/// needs an identity. The email doubles as the secret store label for the
/// user's private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub user_id: Uuid,
}

impl Session {
    pub fn new(email: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            email: email.into(),
            user_id,
        }
    }

    /// Label the private key is stored under
    pub fn key_label(&self) -> &str {
        &self.email
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.email, self.user_id)
    }
}

/// A short-lived CI session obtained by exchanging an OIDC token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiSession {
    pub session_id: Uuid,
    pub project_id: Uuid,
}
