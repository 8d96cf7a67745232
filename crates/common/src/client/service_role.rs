use uuid::Uuid;

use super::{Client, ClientError, VersionedSnapshot};
use crate::api::{
    CiEnvRequest, CreateServiceRoleRequest, DelegateRequest, DeleteServiceRoleRequest,
    GetServiceRoleRequest, ListServiceRolesRequest, OidcLoginRequest, RevokeDelegationRequest,
    ServiceRolePermission, ServiceRolePermsRequest, ServiceRoleProjectKeyRequest, Transport,
    TransportError,
};
use crate::crypto::SecretKey;
use crate::recipient::{grant_access, Recipient};
use crate::secret_store::SecretStore;
use crate::service_role::{ServiceRole, ServiceRoleKeyPair};
use crate::session::{CiSession, Session};

impl<T: Transport, S: SecretStore> Client<T, S> {
    /// Register a service role for `repo_principal`
    ///
    /// The returned keypair is the only copy of the private key. Show it to
    /// the operator once and drop it.
    pub async fn create_service_role(
        &self,
        session: &Session,
        name: &str,
        repo_principal: &str,
    ) -> Result<(ServiceRole, ServiceRoleKeyPair), ClientError> {
        let keypair = ServiceRoleKeyPair::generate()?;
        let response = self
            .transport
            .send(&CreateServiceRoleRequest {
                service_role_name: name.to_string(),
                service_role_public_key: keypair.public_key,
                repo_principal: repo_principal.to_string(),
                created_by: session.user_id,
            })
            .await?;

        tracing::info!(role_id = %response.service_role.id, repo_principal, "created service role");
        Ok((response.service_role, keypair))
    }

    pub async fn list_service_roles(
        &self,
        session: &Session,
    ) -> Result<Vec<ServiceRole>, ClientError> {
        let response = self
            .transport
            .send(&ListServiceRolesRequest {
                created_by: session.user_id,
            })
            .await?;
        Ok(response.service_roles)
    }

    /// Delete a service role; every key delegated to it goes with it
    pub async fn delete_service_role(
        &self,
        session: &Session,
        service_role_id: Uuid,
    ) -> Result<(), ClientError> {
        self.transport
            .send(&DeleteServiceRoleRequest {
                service_role_id,
                created_by: session.user_id,
            })
            .await
            .map_err(|e| match e {
                TransportError::NotFound(_) => {
                    ClientError::NotFound(format!("service role {}", service_role_id))
                }
                other => other.into(),
            })?;
        tracing::info!(role_id = %service_role_id, "deleted service role");
        Ok(())
    }

    pub async fn get_service_role(&self, repo_principal: &str) -> Result<ServiceRole, ClientError> {
        self.transport
            .send(&GetServiceRoleRequest {
                repo_principal: repo_principal.to_string(),
            })
            .await
            .map(|r| r.service_role)
            .map_err(|e| match e {
                TransportError::NotFound(_) => {
                    ClientError::NotFound(format!("service role for {}", repo_principal))
                }
                other => other.into(),
            })
    }

    /// Wrap the project key for the service role bound to `repo_principal`
    pub async fn delegate_access(
        &self,
        session: &Session,
        repo_principal: &str,
        project: &str,
        env: &str,
    ) -> Result<(), ClientError> {
        let (keys, pmk) = self.project_key(session, project).await?;
        let role = self.get_service_role(repo_principal).await?;

        let recipient = Recipient::ServiceRole {
            role_id: role.id,
            public_key: role.public_key,
        };
        let wrapped_key = grant_access(&pmk, &recipient)?;
        drop(pmk);

        self.transport
            .send(&DelegateRequest {
                repo_principal: repo_principal.to_string(),
                project_id: keys.project_id,
                env_name: env.to_string(),
                delegated_by: session.user_id,
                wrapped_key,
            })
            .await?;

        tracing::info!(project_id = %keys.project_id, env, %recipient, "delegated access");
        Ok(())
    }

    /// Delete the key delegated to a service role for one environment
    pub async fn revoke_service_role_access(
        &self,
        session: &Session,
        repo_principal: &str,
        project: &str,
        env: &str,
    ) -> Result<(), ClientError> {
        let keys = self.project_keys(session, project).await?;
        self.transport
            .send(&RevokeDelegationRequest {
                repo_principal: repo_principal.to_string(),
                project_id: keys.project_id,
                env_name: env.to_string(),
                revoked_by: session.user_id,
            })
            .await
            .map_err(|e| match e {
                TransportError::NotFound(_) => ClientError::NotFound(format!(
                    "delegation of {}/{} to {}",
                    project, env, repo_principal
                )),
                other => other.into(),
            })?;
        tracing::info!(project_id = %keys.project_id, env, repo_principal, "revoked delegation");
        Ok(())
    }

    /// Project environments the service role for `repo_principal` can decrypt
    pub async fn service_role_permissions(
        &self,
        session: &Session,
        repo_principal: &str,
    ) -> Result<Vec<ServiceRolePermission>, ClientError> {
        self.transport
            .send(&ServiceRolePermsRequest {
                repo_principal: repo_principal.to_string(),
                requested_by: session.user_id,
            })
            .await
            .map(|r| r.permissions)
            .map_err(|e| match e {
                TransportError::NotFound(_) => {
                    ClientError::NotFound(format!("service role for {}", repo_principal))
                }
                other => other.into(),
            })
    }

    /// Exchange an OIDC token for a CI session scoped to `project`/`env`
    pub async fn ci_login(
        &self,
        id_token: &str,
        project: &str,
        env: &str,
    ) -> Result<CiSession, ClientError> {
        let response = self
            .transport
            .send(&OidcLoginRequest {
                id_token: id_token.to_string(),
                project_name: project.to_string(),
                env: env.to_string(),
            })
            .await?;
        Ok(CiSession {
            session_id: response.session_id,
            project_id: response.project_id,
        })
    }

    /// Pull an environment as a service role from inside CI
    ///
    /// No user session and no secret store are involved: the service role
    /// private key comes from the CI environment.
    pub async fn ci_pull(
        &self,
        id_token: &str,
        project: &str,
        env: &str,
        service_role_key: &SecretKey,
    ) -> Result<VersionedSnapshot, ClientError> {
        let ci = self.ci_login(id_token, project, env).await?;

        let keys = self
            .transport
            .send(&ServiceRoleProjectKeyRequest {
                project_id: ci.project_id,
                session_id: ci.session_id,
                env: env.to_string(),
            })
            .await?;
        let pmk = keys.wrapped_key.unwrap(service_role_key)?;

        let record = self
            .transport
            .send(&CiEnvRequest {
                project_id: ci.project_id,
                session_id: ci.session_id,
                env_name: env.to_string(),
                version: None,
            })
            .await
            .map_err(|e| match e {
                TransportError::NotFound(_) => {
                    ClientError::NotFound(format!("environment {}", env))
                }
                other => other.into(),
            })?;

        let pulled = VersionedSnapshot::open(&pmk, record)?;
        tracing::info!(project_id = %ci.project_id, env, version = pulled.version, "ci pull");
        Ok(pulled)
    }
}
