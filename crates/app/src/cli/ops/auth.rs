use clap::Args;

use common::client::ClientError;

use crate::cli::op::{Op, OpContext};
use crate::cli::prompt::{self, PromptError};
use crate::state::StateError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Create a new identity; the password never leaves this machine
#[derive(Args, Debug, Clone)]
pub struct Register {
    #[arg(long, short)]
    pub email: String,
}

#[async_trait::async_trait]
impl Op for Register {
    type Error = AuthError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut state = ctx.state()?;
        let password = prompt::new_password()?;

        let session = ctx.client.register(&self.email, &password).await?;
        state.set_session(Some(&session))?;

        Ok(format!("Registered and logged in as {}", session))
    }
}

/// Unlock your private key on this machine
#[derive(Args, Debug, Clone)]
pub struct Login {
    #[arg(long, short)]
    pub email: String,
}

#[async_trait::async_trait]
impl Op for Login {
    type Error = AuthError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut state = ctx.state()?;
        let password = prompt::password("Password: ")?;

        let session = ctx.client.login(&self.email, &password).await?;
        state.set_session(Some(&session))?;

        Ok(format!("Logged in as {}", session))
    }
}

/// Forget the private key and session on this machine
#[derive(Args, Debug, Clone)]
pub struct Logout;

#[async_trait::async_trait]
impl Op for Logout {
    type Error = AuthError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut state = ctx.state()?;
        let session = state.session()?;

        ctx.client.logout(&session).await?;
        state.set_session(None)?;

        Ok(format!("Logged out {}", session.email))
    }
}

#[derive(Args, Debug, Clone)]
pub struct Whoami;

#[async_trait::async_trait]
impl Op for Whoami {
    type Error = AuthError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let public_key = ctx.client.private_key(&session)?.public();
        Ok(format!("{}\npublic key: {}", session, public_key))
    }
}
