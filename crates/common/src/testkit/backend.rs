use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::api::*;
use crate::crypto::{EncryptedPrivateKey, PublicKey, WrappedKey};
use crate::recipient::MemberRole;
use crate::service_role::ServiceRole;

/// In-process backend implementing [`Transport`]
///
/// Requests round-trip through JSON exactly as they would over HTTP, so the
/// wire format is exercised. Stored rows hold only what a real backend
/// would: public keys, encrypted blobs and wrapped keys.
///
/// The fake OIDC provider accepts a token equal to a service role's repo
/// principal; see [`MemoryBackend::mint_oidc_token`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<MemoryBackendInner>>,
}

#[derive(Debug, Default)]
struct MemoryBackendInner {
    /// email -> user
    users: HashMap<String, UserRow>,
    /// project_id -> project
    projects: HashMap<Uuid, ProjectRow>,
    /// (project_id, user_id) -> membership with the member's wrapped key
    members: HashMap<(Uuid, Uuid), MemberRow>,
    /// (project_id, env_name) -> append-only version log
    envs: HashMap<(Uuid, String), Vec<EnvVersion>>,
    /// role_id -> service role
    service_roles: HashMap<Uuid, ServiceRole>,
    /// (role_id, project_id, env_name) -> delegated wrapped key
    delegations: HashMap<(Uuid, Uuid, String), WrappedKey>,
    /// session_id -> ci session
    ci_sessions: HashMap<Uuid, CiSessionRow>,
}

#[derive(Debug, Clone)]
struct UserRow {
    id: Uuid,
    email: String,
    public_key: PublicKey,
    encrypted_private_key: EncryptedPrivateKey,
}

#[derive(Debug, Clone)]
struct ProjectRow {
    name: String,
}

#[derive(Debug, Clone)]
struct MemberRow {
    role: MemberRole,
    wrapped_key: WrappedKey,
}

#[derive(Debug, Clone)]
struct CiSessionRow {
    role_id: Uuid,
    project_id: Uuid,
    env: String,
}

/// Dispatch a JSON body to the handler registered for `path`
macro_rules! routes {
    ($inner:ident, $path:expr, $body:expr, { $($req:ty => $handler:ident),* $(,)? }) => {
        $(
            if $path == <$req as ApiRequest>::PATH {
                let request: $req = serde_json::from_value($body)?;
                let response = $inner.$handler(request)?;
                return Ok(serde_json::to_value(response)?);
            }
        )*
    };
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token the fake OIDC endpoint accepts for `repo_principal`
    pub fn mint_oidc_token(&self, repo_principal: &str) -> String {
        repo_principal.to_string()
    }

    /// Number of stored versions of an environment
    pub fn version_count(&self, project_id: Uuid, env: &str) -> usize {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .envs
                    .get(&(project_id, env.to_string()))
                    .map(Vec::len)
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    /// Number of wrapped keys (members plus delegations) held for a project
    pub fn wrapped_key_count(&self, project_id: Uuid) -> usize {
        self.inner
            .read()
            .map(|inner| {
                inner.members.keys().filter(|(p, _)| *p == project_id).count()
                    + inner
                        .delegations
                        .keys()
                        .filter(|(_, p, _)| *p == project_id)
                        .count()
            })
            .unwrap_or(0)
    }

    /// Raw stored record of one version, as the backend sees it
    pub fn stored_version(&self, project_id: Uuid, env: &str, version: i32) -> Option<EnvVersion> {
        let inner = self.inner.read().ok()?;
        inner
            .envs
            .get(&(project_id, env.to_string()))?
            .iter()
            .find(|v| v.version == version)
            .cloned()
    }

    /// Flip one byte of a stored ciphertext, simulating a hostile backend
    pub fn tamper_version(&self, project_id: Uuid, env: &str, version: i32) -> bool {
        let Ok(mut inner) = self.inner.write() else {
            return false;
        };
        let Some(record) = inner
            .envs
            .get_mut(&(project_id, env.to_string()))
            .and_then(|log| log.iter_mut().find(|v| v.version == version))
        else {
            return false;
        };
        match record.ciphertext.first_mut() {
            Some(byte) => {
                *byte ^= 0x01;
                true
            }
            None => false,
        }
    }

    fn dispatch(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| anyhow::anyhow!("failed to acquire write lock: {}", e))?;

        routes!(inner, path, body, {
            CreateUserRequest => create_user,
            LoginRequest => login,
            SearchUserRequest => search_user,
            LogoutRequest => logout,
            CreateProjectRequest => create_project,
            DeleteProjectRequest => delete_project,
            ProjectKeysRequest => project_keys,
            AddMemberRequest => add_member,
            RevokeMemberRequest => revoke_member,
            PushEnvRequest => push_env,
            GetEnvRequest => get_env,
            EnvHistoryRequest => env_history,
            CreateServiceRoleRequest => create_service_role,
            GetServiceRoleRequest => get_service_role,
            ListServiceRolesRequest => list_service_roles,
            DeleteServiceRoleRequest => delete_service_role,
            DelegateRequest => delegate,
            RevokeDelegationRequest => revoke_delegation,
            ServiceRolePermsRequest => service_role_perms,
            OidcLoginRequest => oidc_login,
            ServiceRoleProjectKeyRequest => service_role_project_key,
            CiEnvRequest => ci_env,
        });

        Err(TransportError::NotFound(format!("no route for {}", path)))
    }
}

#[async_trait]
impl Transport for MemoryBackend {
    async fn send<R: ApiRequest>(&self, request: &R) -> Result<R::Response, TransportError> {
        let body = serde_json::to_value(request)?;
        let response = self.dispatch(R::PATH, body)?;
        Ok(serde_json::from_value(response)?)
    }
}

fn not_found(what: impl Into<String>) -> TransportError {
    TransportError::NotFound(what.into())
}

fn forbidden(what: impl Into<String>) -> TransportError {
    TransportError::Unauthorized(what.into())
}

impl MemoryBackendInner {
    fn user_by_id(&self, user_id: Uuid) -> Result<&UserRow, TransportError> {
        self.users
            .values()
            .find(|u| u.id == user_id)
            .ok_or_else(|| not_found(format!("user {}", user_id)))
    }

    /// The project named `name` that `user_id` is a member of
    fn member_project(&self, name: &str, user_id: Uuid) -> Option<Uuid> {
        self.members
            .keys()
            .filter(|(_, member)| *member == user_id)
            .map(|(project_id, _)| *project_id)
            .find(|project_id| {
                self.projects
                    .get(project_id)
                    .is_some_and(|p| p.name == name)
            })
    }

    fn membership(&self, project_id: Uuid, user_id: Uuid) -> Result<&MemberRow, TransportError> {
        self.members
            .get(&(project_id, user_id))
            .ok_or_else(|| forbidden(format!("user {} is not a member", user_id)))
    }

    fn require_admin(&self, project_id: Uuid, user_id: Uuid) -> Result<(), TransportError> {
        match self.membership(project_id, user_id)?.role {
            MemberRole::Owner | MemberRole::Admin => Ok(()),
            MemberRole::Member => Err(forbidden("admin role required")),
        }
    }

    fn role_by_principal(&self, repo_principal: &str) -> Result<&ServiceRole, TransportError> {
        self.service_roles
            .values()
            .find(|r| r.repo_principal == repo_principal)
            .ok_or_else(|| not_found(format!("service role for {}", repo_principal)))
    }

    fn ci_session(
        &self,
        session_id: Uuid,
        project_id: Uuid,
        env: &str,
    ) -> Result<&CiSessionRow, TransportError> {
        self.ci_sessions
            .get(&session_id)
            .filter(|s| s.project_id == project_id && s.env == env)
            .ok_or_else(|| forbidden("invalid ci session"))
    }

    fn latest_or(
        &self,
        project_id: Uuid,
        env: &str,
        version: Option<i32>,
    ) -> Result<EnvVersion, TransportError> {
        let log = self
            .envs
            .get(&(project_id, env.to_string()))
            .ok_or_else(|| not_found(format!("environment {}", env)))?;
        let record = match version {
            Some(version) => log.iter().find(|v| v.version == version),
            None => log.last(),
        };
        record
            .cloned()
            .ok_or_else(|| not_found(format!("version {:?} of {}", version, env)))
    }

    // users

    fn create_user(&mut self, req: CreateUserRequest) -> Result<CreateUserResponse, TransportError> {
        if self.users.contains_key(&req.email) {
            return Err(TransportError::Conflict(format!("{} already registered", req.email)));
        }
        let row = UserRow {
            id: Uuid::new_v4(),
            email: req.email.clone(),
            public_key: req.public_key,
            encrypted_private_key: req.encrypted_private_key,
        };
        let user = UserRecord {
            id: row.id,
            email: row.email.clone(),
            public_key: row.public_key,
        };
        self.users.insert(req.email, row);
        Ok(CreateUserResponse { user })
    }

    fn login(&mut self, req: LoginRequest) -> Result<LoginResponse, TransportError> {
        let row = self
            .users
            .get(&req.email)
            .ok_or_else(|| not_found(format!("user {}", req.email)))?;
        Ok(LoginResponse {
            user: UserRecord {
                id: row.id,
                email: row.email.clone(),
                public_key: row.public_key,
            },
            encrypted_private_key: row.encrypted_private_key.clone(),
        })
    }

    fn search_user(&mut self, req: SearchUserRequest) -> Result<SearchUserResponse, TransportError> {
        let row = self
            .users
            .get(&req.email)
            .ok_or_else(|| not_found(format!("user {}", req.email)))?;
        Ok(SearchUserResponse {
            user_id: row.id,
            public_key: row.public_key,
        })
    }

    fn logout(&mut self, req: LogoutRequest) -> Result<MessageResponse, TransportError> {
        self.user_by_id(req.user_id)?;
        Ok(MessageResponse::ok())
    }

    // projects

    fn create_project(
        &mut self,
        req: CreateProjectRequest,
    ) -> Result<CreateProjectResponse, TransportError> {
        self.user_by_id(req.user_id)?;
        req.wrapped_key
            .validate()
            .map_err(|e| TransportError::Status { status: 400, message: e.to_string() })?;
        if self.member_project(&req.name, req.user_id).is_some() {
            return Err(TransportError::Conflict(format!("project {} exists", req.name)));
        }

        let project_id = Uuid::new_v4();
        self.projects
            .insert(project_id, ProjectRow { name: req.name });
        self.members.insert(
            (project_id, req.user_id),
            MemberRow {
                role: MemberRole::Owner,
                wrapped_key: req.wrapped_key,
            },
        );
        Ok(CreateProjectResponse { project_id })
    }

    fn delete_project(&mut self, req: DeleteProjectRequest) -> Result<MessageResponse, TransportError> {
        let project_id = self
            .member_project(&req.project_name, req.user_id)
            .ok_or_else(|| not_found(format!("project {}", req.project_name)))?;
        if self.membership(project_id, req.user_id)?.role != MemberRole::Owner {
            return Err(forbidden("only the owner can delete a project"));
        }

        self.projects.remove(&project_id);
        self.members.retain(|(p, _), _| *p != project_id);
        self.envs.retain(|(p, _), _| *p != project_id);
        self.delegations.retain(|(_, p, _), _| *p != project_id);
        self.ci_sessions.retain(|_, s| s.project_id != project_id);
        Ok(MessageResponse::ok())
    }

    fn project_keys(&mut self, req: ProjectKeysRequest) -> Result<ProjectKeysResponse, TransportError> {
        let project_id = self
            .member_project(&req.project_name, req.user_id)
            .ok_or_else(|| not_found(format!("project {}", req.project_name)))?;
        let member = self.membership(project_id, req.user_id)?;
        Ok(ProjectKeysResponse {
            project_id,
            role: member.role,
            wrapped_key: member.wrapped_key.clone(),
        })
    }

    fn add_member(&mut self, req: AddMemberRequest) -> Result<MessageResponse, TransportError> {
        self.require_admin(req.project_id, req.admin_id)?;
        self.user_by_id(req.user_id)?;
        if req.role == MemberRole::Owner {
            return Err(forbidden("cannot grant owner"));
        }
        if self.members.contains_key(&(req.project_id, req.user_id)) {
            return Err(TransportError::Conflict("already a member".to_string()));
        }
        self.members.insert(
            (req.project_id, req.user_id),
            MemberRow {
                role: req.role,
                wrapped_key: req.wrapped_key,
            },
        );
        Ok(MessageResponse::ok())
    }

    fn revoke_member(&mut self, req: RevokeMemberRequest) -> Result<MessageResponse, TransportError> {
        self.require_admin(req.project_id, req.admin_id)?;
        match self.members.get(&(req.project_id, req.user_id)) {
            None => return Err(not_found("membership")),
            Some(row) if row.role == MemberRole::Owner => {
                return Err(forbidden("cannot revoke the owner"))
            }
            Some(_) => {}
        }
        self.members.remove(&(req.project_id, req.user_id));
        Ok(MessageResponse::ok())
    }

    // env versions

    fn push_env(&mut self, req: PushEnvRequest) -> Result<PushEnvResponse, TransportError> {
        self.membership(req.project_id, req.user_id)?;
        let log = self
            .envs
            .entry((req.project_id, req.env_name))
            .or_default();
        let version = log.last().map(|v| v.version + 1).unwrap_or(1);
        log.push(EnvVersion {
            version,
            ciphertext: req.ciphertext,
            nonce: req.nonce,
            metadata: req.metadata,
        });
        Ok(PushEnvResponse { version })
    }

    fn get_env(&mut self, req: GetEnvRequest) -> Result<EnvVersion, TransportError> {
        self.membership(req.project_id, req.user_id)?;
        self.latest_or(req.project_id, &req.env_name, req.version)
    }

    fn env_history(&mut self, req: EnvHistoryRequest) -> Result<EnvHistoryResponse, TransportError> {
        self.membership(req.project_id, req.user_id)?;
        let versions = self
            .envs
            .get(&(req.project_id, req.env_name))
            .cloned()
            .unwrap_or_default();
        Ok(EnvHistoryResponse { versions })
    }

    // service roles

    fn create_service_role(
        &mut self,
        req: CreateServiceRoleRequest,
    ) -> Result<ServiceRoleResponse, TransportError> {
        self.user_by_id(req.created_by)?;
        if self.role_by_principal(&req.repo_principal).is_ok() {
            return Err(TransportError::Conflict(format!(
                "service role for {} exists",
                req.repo_principal
            )));
        }
        let role = ServiceRole {
            id: Uuid::new_v4(),
            name: req.service_role_name,
            public_key: req.service_role_public_key,
            repo_principal: req.repo_principal,
            created_by: req.created_by,
            created_at: Utc::now(),
        };
        self.service_roles.insert(role.id, role.clone());
        Ok(ServiceRoleResponse { service_role: role })
    }

    fn get_service_role(
        &mut self,
        req: GetServiceRoleRequest,
    ) -> Result<ServiceRoleResponse, TransportError> {
        let role = self.role_by_principal(&req.repo_principal)?.clone();
        Ok(ServiceRoleResponse { service_role: role })
    }

    fn list_service_roles(
        &mut self,
        req: ListServiceRolesRequest,
    ) -> Result<ListServiceRolesResponse, TransportError> {
        let mut service_roles: Vec<ServiceRole> = self
            .service_roles
            .values()
            .filter(|r| r.created_by == req.created_by)
            .cloned()
            .collect();
        service_roles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(ListServiceRolesResponse { service_roles })
    }

    fn delete_service_role(
        &mut self,
        req: DeleteServiceRoleRequest,
    ) -> Result<MessageResponse, TransportError> {
        match self.service_roles.get(&req.service_role_id) {
            None => return Err(not_found(format!("service role {}", req.service_role_id))),
            Some(role) if role.created_by != req.created_by => {
                return Err(forbidden("not the creator of this service role"))
            }
            Some(_) => {}
        }
        self.service_roles.remove(&req.service_role_id);
        self.delegations
            .retain(|(role_id, _, _), _| *role_id != req.service_role_id);
        self.ci_sessions
            .retain(|_, s| s.role_id != req.service_role_id);
        Ok(MessageResponse::ok())
    }

    fn delegate(&mut self, req: DelegateRequest) -> Result<MessageResponse, TransportError> {
        self.require_admin(req.project_id, req.delegated_by)?;
        let role_id = self.role_by_principal(&req.repo_principal)?.id;
        self.delegations
            .insert((role_id, req.project_id, req.env_name), req.wrapped_key);
        Ok(MessageResponse::ok())
    }

    fn revoke_delegation(
        &mut self,
        req: RevokeDelegationRequest,
    ) -> Result<MessageResponse, TransportError> {
        self.require_admin(req.project_id, req.revoked_by)?;
        let role_id = self.role_by_principal(&req.repo_principal)?.id;
        self.delegations
            .remove(&(role_id, req.project_id, req.env_name.clone()))
            .ok_or_else(|| not_found("delegation"))?;
        self.ci_sessions.retain(|_, s| {
            !(s.role_id == role_id && s.project_id == req.project_id && s.env == req.env_name)
        });
        Ok(MessageResponse::ok())
    }

    fn service_role_perms(
        &mut self,
        req: ServiceRolePermsRequest,
    ) -> Result<ServiceRolePermsResponse, TransportError> {
        let role = self.role_by_principal(&req.repo_principal)?;
        if role.created_by != req.requested_by {
            return Err(forbidden("not the creator of this service role"));
        }
        let mut permissions: Vec<ServiceRolePermission> = self
            .delegations
            .keys()
            .filter(|(role_id, _, _)| *role_id == role.id)
            .filter_map(|(_, project_id, env)| {
                self.projects.get(project_id).map(|p| ServiceRolePermission {
                    project_name: p.name.clone(),
                    env_name: env.clone(),
                    project_id: *project_id,
                })
            })
            .collect();
        permissions.sort();
        Ok(ServiceRolePermsResponse { permissions })
    }

    // ci

    fn oidc_login(&mut self, req: OidcLoginRequest) -> Result<OidcLoginResponse, TransportError> {
        // the fake provider's token is the principal it asserts
        let role_id = self
            .role_by_principal(&req.id_token)
            .map_err(|_| forbidden("invalid id token"))?
            .id;
        let project_id = self
            .delegations
            .keys()
            .filter(|(r, _, env)| *r == role_id && *env == req.env)
            .map(|(_, p, _)| *p)
            .find(|p| {
                self.projects
                    .get(p)
                    .is_some_and(|row| row.name == req.project_name)
            })
            .ok_or_else(|| forbidden("no delegation for this project environment"))?;

        let session_id = Uuid::new_v4();
        self.ci_sessions.insert(
            session_id,
            CiSessionRow {
                role_id,
                project_id,
                env: req.env,
            },
        );
        Ok(OidcLoginResponse {
            session_id,
            project_id,
        })
    }

    fn service_role_project_key(
        &mut self,
        req: ServiceRoleProjectKeyRequest,
    ) -> Result<ServiceRoleProjectKeyResponse, TransportError> {
        let role_id = self.ci_session(req.session_id, req.project_id, &req.env)?.role_id;
        let wrapped_key = self
            .delegations
            .get(&(role_id, req.project_id, req.env))
            .cloned()
            .ok_or_else(|| forbidden("delegation revoked"))?;
        Ok(ServiceRoleProjectKeyResponse {
            project_id: req.project_id,
            wrapped_key,
        })
    }

    fn ci_env(&mut self, req: CiEnvRequest) -> Result<EnvVersion, TransportError> {
        self.ci_session(req.session_id, req.project_id, &req.env_name)?;
        self.latest_or(req.project_id, &req.env_name, req.version)
    }
}
