use clap::{Args, Subcommand};

use common::api::ServiceRolePermission;
use common::client::ClientError;
use common::service_role::{repo_principal, ServiceRole as Role};
use common::session::Session;

use crate::cli::op::{EnvClient, Op, OpContext};
use crate::git::{self, GitError};
use crate::state::StateError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceRoleError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("no service role named {0:?}")]
    UnknownRole(String),
}

/// Find one of your service roles by name
async fn find_role(
    client: &EnvClient,
    session: &Session,
    name: &str,
) -> Result<Role, ServiceRoleError> {
    client
        .list_service_roles(session)
        .await?
        .into_iter()
        .find(|r| r.name == name)
        .ok_or_else(|| ServiceRoleError::UnknownRole(name.to_string()))
}

/// Create a service role bound to a repository branch
///
/// The private key is printed once and never stored. Put both lines in
/// your CI secret store.
#[derive(Args, Debug, Clone)]
pub struct Create {
    #[arg(long, short)]
    pub name: String,

    /// Repository as owner/name (detected from the origin remote if omitted)
    #[arg(long)]
    pub repo: Option<String>,

    /// Branch the role is valid for (detected from HEAD if omitted)
    #[arg(long)]
    pub branch: Option<String>,
}

#[async_trait::async_trait]
impl Op for Create {
    type Error = ServiceRoleError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let repo = match &self.repo {
            Some(repo) => repo.clone(),
            None => git::detect_repo()?,
        };
        let branch = match &self.branch {
            Some(branch) => branch.clone(),
            None => git::detect_branch()?,
        };
        let principal = repo_principal(&repo, &branch);

        let (role, keypair) = ctx
            .client
            .create_service_role(&session, &self.name, &principal)
            .await?;

        Ok(format!(
            "Created service role {} ({}) for {}\n\n\
             Add these to your CI secrets. The private key is not shown again:\n\n{}",
            role.name,
            role.id,
            role.repo_principal,
            keypair.to_env_lines().as_str()
        ))
    }
}

#[derive(Args, Debug, Clone)]
pub struct List;

#[async_trait::async_trait]
impl Op for List {
    type Error = ServiceRoleError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let roles = ctx.client.list_service_roles(&session).await?;
        if roles.is_empty() {
            return Ok("no service roles".to_string());
        }
        Ok(roles
            .iter()
            .map(|r| {
                format!(
                    "{}  {}  {}  created {}",
                    r.name,
                    r.id,
                    r.repo_principal,
                    r.created_at.format("%Y-%m-%d")
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Delete a service role and every delegation made to it
#[derive(Args, Debug, Clone)]
pub struct Delete {
    pub name: String,
}

#[async_trait::async_trait]
impl Op for Delete {
    type Error = ServiceRoleError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let role = find_role(&ctx.client, &session, &self.name).await?;
        ctx.client.delete_service_role(&session, role.id).await?;
        Ok(format!("Deleted service role {}", role.name))
    }
}

/// List the project environments a service role can pull
#[derive(Args, Debug, Clone)]
pub struct Permissions {
    pub name: String,
}

#[async_trait::async_trait]
impl Op for Permissions {
    type Error = ServiceRoleError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let role = find_role(&ctx.client, &session, &self.name).await?;
        let perms = ctx
            .client
            .service_role_permissions(&session, &role.repo_principal)
            .await?;
        Ok(permissions_table(&role.name, &perms))
    }
}

fn permissions_table(name: &str, perms: &[ServiceRolePermission]) -> String {
    if perms.is_empty() {
        return format!("{} has no delegated environments", name);
    }
    let mut out = format!("Permissions for service role {:?}:\n{:<20}  ENV", name, "PROJECT");
    for p in perms {
        out.push_str(&format!("\n{:<20}  {}", p.project_name, p.env_name));
    }
    out
}

/// Which role and environment a grant or revoke applies to
#[derive(Args, Debug, Clone)]
pub struct Delegation {
    /// Service role name
    #[arg(long = "service-role", short = 's')]
    pub service_role: String,

    #[arg(long, short)]
    pub project: String,

    #[arg(long)]
    pub env: String,
}

/// Let a service role pull one environment
#[derive(Args, Debug, Clone)]
pub struct Grant {
    #[command(flatten)]
    pub delegation: Delegation,
}

#[async_trait::async_trait]
impl Op for Grant {
    type Error = ServiceRoleError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let d = &self.delegation;
        let role = find_role(&ctx.client, &session, &d.service_role).await?;
        ctx.client
            .delegate_access(&session, &role.repo_principal, &d.project, &d.env)
            .await?;
        Ok(format!(
            "Granted {} access to {}/{}",
            role.name, d.project, d.env
        ))
    }
}

/// Stop a service role from pulling one environment
#[derive(Args, Debug, Clone)]
pub struct Revoke {
    #[command(flatten)]
    pub delegation: Delegation,
}

#[async_trait::async_trait]
impl Op for Revoke {
    type Error = ServiceRoleError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let d = &self.delegation;
        let role = find_role(&ctx.client, &session, &d.service_role).await?;
        ctx.client
            .revoke_service_role_access(&session, &role.repo_principal, &d.project, &d.env)
            .await?;
        Ok(format!(
            "Revoked {} access to {}/{}",
            role.name, d.project, d.env
        ))
    }
}

crate::command_enum! {
    (Create, Create),
    (List, List),
    (Delete, Delete),
    (Grant, Grant),
    (Revoke, Revoke),
    (Permissions, Permissions),
}

pub type ServiceRoleCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct ServiceRole {
    #[command(subcommand)]
    pub command: ServiceRoleCommand,
}

#[async_trait::async_trait]
impl Op for ServiceRole {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
