use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use uuid::Uuid;

use super::ApiRequest;
use crate::crypto::{EncryptedPrivateKey, PublicKey, WrappedKey};
use crate::recipient::MemberRole;
use crate::service_role::ServiceRole;

/// Metadata `type` of a version created by `push`
pub const ENV_CREATED: &str = "env_created";
/// Metadata `type` of a version created by `rollback`
pub const ENV_ROLLBACK: &str = "env_rollback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            message: "ok".to_string(),
        }
    }
}

// Users

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub public_key: PublicKey,
}

/// POST /users/create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub public_key: PublicKey,
    pub encrypted_private_key: EncryptedPrivateKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub user: UserRecord,
}

impl ApiRequest for CreateUserRequest {
    const PATH: &'static str = "/users/create";
    type Response = CreateUserResponse;
}

/// POST /users/login
///
/// Returns the password-protected private key. The password itself never
/// leaves the client; decrypting the blob is the login check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserRecord,
    pub encrypted_private_key: EncryptedPrivateKey,
}

impl ApiRequest for LoginRequest {
    const PATH: &'static str = "/users/login";
    type Response = LoginResponse;
}

/// POST /users/search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchUserRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchUserResponse {
    pub user_id: Uuid,
    pub public_key: PublicKey,
}

impl ApiRequest for SearchUserRequest {
    const PATH: &'static str = "/users/search";
    type Response = SearchUserResponse;
}

/// POST /users/logout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub user_id: Uuid,
}

impl ApiRequest for LogoutRequest {
    const PATH: &'static str = "/users/logout";
    type Response = MessageResponse;
}

// Projects

/// POST /projects/create
///
/// Carries the owner's wrapped project key; the backend never sees the PMK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub wrapped_key: WrappedKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectResponse {
    pub project_id: Uuid,
}

impl ApiRequest for CreateProjectRequest {
    const PATH: &'static str = "/projects/create";
    type Response = CreateProjectResponse;
}

/// POST /projects/delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteProjectRequest {
    pub project_name: String,
    pub user_id: Uuid,
}

impl ApiRequest for DeleteProjectRequest {
    const PATH: &'static str = "/projects/delete";
    type Response = MessageResponse;
}

/// POST /projects/keys
///
/// The caller's own wrapped key for a project, looked up by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectKeysRequest {
    pub project_name: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectKeysResponse {
    pub project_id: Uuid,
    pub role: MemberRole,
    #[serde(flatten)]
    pub wrapped_key: WrappedKey,
}

impl ApiRequest for ProjectKeysRequest {
    const PATH: &'static str = "/projects/keys";
    type Response = ProjectKeysResponse;
}

/// POST /projects/addUser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub project_id: Uuid,
    pub admin_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    #[serde(flatten)]
    pub wrapped_key: WrappedKey,
}

impl ApiRequest for AddMemberRequest {
    const PATH: &'static str = "/projects/addUser";
    type Response = MessageResponse;
}

/// POST /projects/revokeUser
///
/// Deletes the member's wrapped key. The PMK is not rotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeMemberRequest {
    pub project_id: Uuid,
    pub admin_id: Uuid,
    pub user_id: Uuid,
}

impl ApiRequest for RevokeMemberRequest {
    const PATH: &'static str = "/projects/revokeUser";
    type Response = MessageResponse;
}

// Env versions

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    #[serde(rename = "type")]
    pub kind: String,
}

impl VersionMetadata {
    pub fn created() -> Self {
        Self {
            kind: ENV_CREATED.to_string(),
        }
    }

    pub fn rollback() -> Self {
        Self {
            kind: ENV_ROLLBACK.to_string(),
        }
    }
}

/// One immutable entry of an environment's append-only version log
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVersion {
    pub version: i32,
    #[serde_as(as = "Base64")]
    pub ciphertext: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub nonce: Vec<u8>,
    pub metadata: VersionMetadata,
}

/// POST /env/create
///
/// Appends a new version; the backend assigns the next version number.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvRequest {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub env_name: String,
    #[serde_as(as = "Base64")]
    pub ciphertext: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub nonce: Vec<u8>,
    pub metadata: VersionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvResponse {
    pub version: i32,
}

impl ApiRequest for PushEnvRequest {
    const PATH: &'static str = "/env/create";
    type Response = PushEnvResponse;
}

/// POST /env/get
///
/// `version: None` selects the latest version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetEnvRequest {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub env_name: String,
    pub version: Option<i32>,
}

impl ApiRequest for GetEnvRequest {
    const PATH: &'static str = "/env/get";
    type Response = EnvVersion;
}

/// POST /env/history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvHistoryRequest {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub env_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvHistoryResponse {
    pub versions: Vec<EnvVersion>,
}

impl ApiRequest for EnvHistoryRequest {
    const PATH: &'static str = "/env/history";
    type Response = EnvHistoryResponse;
}

// Service roles

/// POST /service_role/create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRoleRequest {
    pub service_role_name: String,
    pub service_role_public_key: PublicKey,
    pub repo_principal: String,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRoleResponse {
    pub service_role: ServiceRole,
}

impl ApiRequest for CreateServiceRoleRequest {
    const PATH: &'static str = "/service_role/create";
    type Response = ServiceRoleResponse;
}

/// POST /service_role/get
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetServiceRoleRequest {
    pub repo_principal: String,
}

impl ApiRequest for GetServiceRoleRequest {
    const PATH: &'static str = "/service_role/get";
    type Response = ServiceRoleResponse;
}

/// POST /service_role/get/all
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListServiceRolesRequest {
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListServiceRolesResponse {
    #[serde(rename = "services")]
    pub service_roles: Vec<ServiceRole>,
}

impl ApiRequest for ListServiceRolesRequest {
    const PATH: &'static str = "/service_role/get/all";
    type Response = ListServiceRolesResponse;
}

/// POST /service_role/delete
///
/// Drops the role and every wrapped key delegated to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteServiceRoleRequest {
    pub service_role_id: Uuid,
    pub created_by: Uuid,
}

impl ApiRequest for DeleteServiceRoleRequest {
    const PATH: &'static str = "/service_role/delete";
    type Response = MessageResponse;
}

/// POST /service_role/delegate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegateRequest {
    pub repo_principal: String,
    pub project_id: Uuid,
    pub env_name: String,
    pub delegated_by: Uuid,
    #[serde(flatten)]
    pub wrapped_key: WrappedKey,
}

impl ApiRequest for DelegateRequest {
    const PATH: &'static str = "/service_role/delegate";
    type Response = MessageResponse;
}

/// POST /service_role/revoke
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeDelegationRequest {
    pub repo_principal: String,
    pub project_id: Uuid,
    pub env_name: String,
    pub revoked_by: Uuid,
}

impl ApiRequest for RevokeDelegationRequest {
    const PATH: &'static str = "/service_role/revoke";
    type Response = MessageResponse;
}

/// POST /service_role/perms
///
/// Only the role's creator may list what it was delegated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRolePermsRequest {
    pub repo_principal: String,
    pub requested_by: Uuid,
}

/// One project environment a service role holds a wrapped key for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceRolePermission {
    pub project_name: String,
    pub env_name: String,
    pub project_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRolePermsResponse {
    pub permissions: Vec<ServiceRolePermission>,
}

impl ApiRequest for ServiceRolePermsRequest {
    const PATH: &'static str = "/service_role/perms";
    type Response = ServiceRolePermsResponse;
}

// CI

/// POST /oidc/github
///
/// Exchanges a GitHub Actions OIDC token for a short-lived CI session
/// scoped to one project environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcLoginRequest {
    pub id_token: String,
    pub project_name: String,
    pub env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcLoginResponse {
    pub session_id: Uuid,
    pub project_id: Uuid,
}

impl ApiRequest for OidcLoginRequest {
    const PATH: &'static str = "/oidc/github";
    type Response = OidcLoginResponse;
}

/// POST /service_role/project-keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRoleProjectKeyRequest {
    pub project_id: Uuid,
    pub session_id: Uuid,
    pub env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRoleProjectKeyResponse {
    pub project_id: Uuid,
    #[serde(flatten)]
    pub wrapped_key: WrappedKey,
}

impl ApiRequest for ServiceRoleProjectKeyRequest {
    const PATH: &'static str = "/service_role/project-keys";
    type Response = ServiceRoleProjectKeyResponse;
}

/// POST /env/ci/search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiEnvRequest {
    pub project_id: Uuid,
    pub session_id: Uuid,
    pub env_name: String,
    pub version: Option<i32>,
}

impl ApiRequest for CiEnvRequest {
    const PATH: &'static str = "/env/ci/search";
    type Response = EnvVersion;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{ProjectMasterKey, SecretKey};

    #[test]
    fn test_flattened_wrapped_key_fields() {
        let pmk = ProjectMasterKey::generate().unwrap();
        let recipient = SecretKey::generate().unwrap();
        let request = CreateProjectRequest {
            name: "api".to_string(),
            user_id: Uuid::new_v4(),
            wrapped_key: WrappedKey::wrap(&pmk, &recipient.public()).unwrap(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json["wrapped_pmk"].is_string());
        assert!(json["wrap_nonce"].is_string());
        assert!(json["wrap_ephemeral_pub"].is_string());

        let back: CreateProjectRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back.wrapped_key.unwrap(&recipient).unwrap(), pmk);
    }

    #[test]
    fn test_version_metadata_type_field() {
        let json = serde_json::to_value(VersionMetadata::rollback()).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "env_rollback" }));
    }

    #[test]
    fn test_env_version_bytes_are_base64() {
        let version = EnvVersion {
            version: 3,
            ciphertext: vec![1, 2, 3],
            nonce: vec![0; 12],
            metadata: VersionMetadata::created(),
        };
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["ciphertext"], "AQID");
        let back: EnvVersion = serde_json::from_value(json).unwrap();
        assert_eq!(back, version);
    }
}
