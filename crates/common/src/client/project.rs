use uuid::Uuid;

use super::{Client, ClientError};
use crate::api::{
    AddMemberRequest, CreateProjectRequest, DeleteProjectRequest, RevokeMemberRequest,
    SearchUserRequest, SearchUserResponse, Transport, TransportError,
};
use crate::crypto::ProjectMasterKey;
use crate::recipient::{grant_access, MemberRole, Recipient};
use crate::secret_store::SecretStore;
use crate::session::Session;

impl<T: Transport, S: SecretStore> Client<T, S> {
    /// Create a project with a fresh master key wrapped for its owner
    pub async fn create_project(&self, session: &Session, name: &str) -> Result<Uuid, ClientError> {
        let private_key = self.private_key(session)?;
        let owner = Recipient::User {
            user_id: session.user_id,
            public_key: private_key.public(),
        };

        let pmk = ProjectMasterKey::generate()?;
        let wrapped_key = grant_access(&pmk, &owner)?;
        drop(pmk);

        let response = self
            .transport
            .send(&CreateProjectRequest {
                name: name.to_string(),
                user_id: session.user_id,
                wrapped_key,
            })
            .await?;

        tracing::info!(project_id = %response.project_id, name, "created project");
        Ok(response.project_id)
    }

    pub async fn delete_project(&self, session: &Session, name: &str) -> Result<(), ClientError> {
        self.transport
            .send(&DeleteProjectRequest {
                project_name: name.to_string(),
                user_id: session.user_id,
            })
            .await
            .map_err(|e| match e {
                TransportError::NotFound(_) => ClientError::NotFound(format!("project {}", name)),
                other => other.into(),
            })?;
        tracing::info!(name, "deleted project");
        Ok(())
    }

    /// Wrap the project key for another registered user
    pub async fn add_member(
        &self,
        session: &Session,
        project: &str,
        email: &str,
        role: MemberRole,
    ) -> Result<(), ClientError> {
        let (keys, pmk) = self.project_key(session, project).await?;
        let member = self.find_user(email).await?;

        let recipient = Recipient::User {
            user_id: member.user_id,
            public_key: member.public_key,
        };
        let wrapped_key = grant_access(&pmk, &recipient)?;
        drop(pmk);

        self.transport
            .send(&AddMemberRequest {
                project_id: keys.project_id,
                admin_id: session.user_id,
                user_id: member.user_id,
                role,
                wrapped_key,
            })
            .await?;

        tracing::info!(project_id = %keys.project_id, %recipient, %role, "added member");
        Ok(())
    }

    /// Delete a member's wrapped key
    ///
    /// The project key is not rotated. A member who already unwrapped it
    /// keeps the ability to open versions fetched before revocation.
    pub async fn revoke_member(
        &self,
        session: &Session,
        project: &str,
        email: &str,
    ) -> Result<(), ClientError> {
        let keys = self.project_keys(session, project).await?;
        let member = self.find_user(email).await?;

        self.transport
            .send(&RevokeMemberRequest {
                project_id: keys.project_id,
                admin_id: session.user_id,
                user_id: member.user_id,
            })
            .await?;

        tracing::info!(project_id = %keys.project_id, user_id = %member.user_id, "revoked member");
        Ok(())
    }

    async fn find_user(&self, email: &str) -> Result<SearchUserResponse, ClientError> {
        self.transport
            .send(&SearchUserRequest {
                email: email.to_string(),
            })
            .await
            .map_err(|e| match e {
                TransportError::NotFound(_) => ClientError::NotFound(format!("user {}", email)),
                other => other.into(),
            })
    }
}
