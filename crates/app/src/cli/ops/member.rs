use clap::{Args, Subcommand};

use common::client::ClientError;
use common::recipient::MemberRole;

use crate::cli::op::{Op, OpContext};
use crate::state::StateError;

#[derive(Debug, thiserror::Error)]
pub enum MemberError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Give a registered user access to a project
#[derive(Args, Debug, Clone)]
pub struct Add {
    #[arg(long, short)]
    pub project: String,

    #[arg(long, short)]
    pub email: String,

    /// admin or member
    #[arg(long, default_value = "member")]
    pub role: MemberRole,
}

#[async_trait::async_trait]
impl Op for Add {
    type Error = MemberError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        ctx.client
            .add_member(&session, &self.project, &self.email, self.role)
            .await?;
        Ok(format!(
            "Added {} to {} as {}",
            self.email, self.project, self.role
        ))
    }
}

/// Remove a user's access to a project
///
/// The project key is not rotated: anything the user already pulled stays
/// readable to them.
#[derive(Args, Debug, Clone)]
pub struct Revoke {
    #[arg(long, short)]
    pub project: String,

    #[arg(long, short)]
    pub email: String,
}

#[async_trait::async_trait]
impl Op for Revoke {
    type Error = MemberError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        ctx.client
            .revoke_member(&session, &self.project, &self.email)
            .await?;
        Ok(format!("Revoked {} from {}", self.email, self.project))
    }
}

crate::command_enum! {
    (Add, Add),
    (Revoke, Revoke),
}

pub type MemberCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Member {
    #[command(subcommand)]
    pub command: MemberCommand,
}

#[async_trait::async_trait]
impl Op for Member {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
