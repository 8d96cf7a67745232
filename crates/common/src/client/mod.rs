//! Orchestration of the engine against a backend
//!
//! [`Client`] composes the crypto, payload and delegation primitives with a
//! [`Transport`] (the backend) and a [`SecretStore`] (where the private key
//! lives between invocations). Every call that acts as a user takes an
//! explicit [`Session`]; there is no ambient "current user".
//!
//! Project master keys and private keys are loaded per call and dropped
//! (zeroized) before the call returns, on every path.

mod env;
mod error;
mod project;
mod service_role;

use tokio::task;
use zeroize::Zeroizing;

use crate::api::{
    CreateUserRequest, LoginRequest, LogoutRequest, ProjectKeysRequest, ProjectKeysResponse,
    Transport, TransportError,
};
use crate::crypto::{generate_identity, Argon2Params, ProjectMasterKey, SecretKey};
use crate::secret_store::{SecretStore, SecretStoreError};
use crate::session::Session;

pub use env::{RollbackPlan, VersionedSnapshot};
pub use error::ClientError;

pub struct Client<T, S> {
    transport: T,
    store: S,
    argon2: Argon2Params,
}

impl<T: Transport, S: SecretStore> Client<T, S> {
    pub fn new(transport: T, store: S) -> Self {
        Self {
            transport,
            store,
            argon2: Argon2Params::default(),
        }
    }

    /// Override the Argon2id cost used for newly registered identities
    pub fn with_argon2_params(mut self, params: Argon2Params) -> Self {
        self.argon2 = params;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a new identity and register it with the backend
    ///
    /// Key generation and Argon2id run on a blocking thread. On success the
    /// private key is in the secret store under the email.
    pub async fn register(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let password = Zeroizing::new(password.to_string());
        let params = self.argon2;
        let (identity, encrypted_private_key) =
            task::spawn_blocking(move || generate_identity(&password, params))
                .await
                .map_err(|e| ClientError::Task(e.to_string()))??;

        let response = self
            .transport
            .send(&CreateUserRequest {
                email: email.to_string(),
                public_key: identity.public_key,
                encrypted_private_key,
            })
            .await?;

        self.store
            .save(email, identity.private_key.to_bytes().as_ref())?;

        tracing::info!(user_id = %response.user.id, "registered new identity");
        Ok(Session::new(response.user.email, response.user.id))
    }

    /// Recover the private key from the backend's encrypted blob
    ///
    /// A wrong password surfaces as `Crypto(AuthenticationFailure)`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let response = self
            .transport
            .send(&LoginRequest {
                email: email.to_string(),
            })
            .await?;

        let password = Zeroizing::new(password.to_string());
        let blob = response.encrypted_private_key;
        let private_key = task::spawn_blocking(move || blob.decrypt(&password))
            .await
            .map_err(|e| ClientError::Task(e.to_string()))??;

        if private_key.public() != response.user.public_key {
            return Err(ClientError::IdentityMismatch);
        }

        self.store.save(email, private_key.to_bytes().as_ref())?;

        tracing::info!(user_id = %response.user.id, "logged in");
        Ok(Session::new(response.user.email, response.user.id))
    }

    /// End the session and forget the locally stored private key
    pub async fn logout(&self, session: &Session) -> Result<(), ClientError> {
        self.transport
            .send(&LogoutRequest {
                user_id: session.user_id,
            })
            .await?;

        match self.store.delete(session.key_label()) {
            Ok(()) | Err(SecretStoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        tracing::info!(user_id = %session.user_id, "logged out");
        Ok(())
    }

    /// Load the session's private key from the secret store
    pub fn private_key(&self, session: &Session) -> Result<SecretKey, ClientError> {
        let bytes = self
            .store
            .load(session.key_label())
            .map_err(|e| match e {
                SecretStoreError::NotFound(label) => ClientError::NotLoggedIn(label),
                other => other.into(),
            })?;
        Ok(SecretKey::try_from(bytes.as_slice())?)
    }

    /// Fetch the caller's wrapped key for a project without unwrapping it
    async fn project_keys(
        &self,
        session: &Session,
        project: &str,
    ) -> Result<ProjectKeysResponse, ClientError> {
        self.transport
            .send(&ProjectKeysRequest {
                project_name: project.to_string(),
                user_id: session.user_id,
            })
            .await
            .map_err(|e| match e {
                TransportError::NotFound(_) => ClientError::NotFound(format!("project {}", project)),
                other => other.into(),
            })
    }

    /// Fetch and unwrap the project master key for `project`
    async fn project_key(
        &self,
        session: &Session,
        project: &str,
    ) -> Result<(ProjectKeysResponse, ProjectMasterKey), ClientError> {
        let keys = self.project_keys(session, project).await?;
        let private_key = self.private_key(session)?;
        let pmk = keys.wrapped_key.unwrap(&private_key)?;
        Ok((keys, pmk))
    }
}
