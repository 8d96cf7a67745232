use clap::{Args, Subcommand};

use common::client::ClientError;

use crate::cli::op::{Op, OpContext};
use crate::cli::prompt::{self, PromptError};
use crate::state::StateError;

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("aborted")]
    Aborted,
}

/// Create a project; you become its owner
#[derive(Args, Debug, Clone)]
pub struct Create {
    pub name: String,
}

#[async_trait::async_trait]
impl Op for Create {
    type Error = ProjectError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let project_id = ctx.client.create_project(&session, &self.name).await?;
        Ok(format!("Created project {} ({})", self.name, project_id))
    }
}

/// Delete a project with all its environments and keys
#[derive(Args, Debug, Clone)]
pub struct Delete {
    pub name: String,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

#[async_trait::async_trait]
impl Op for Delete {
    type Error = ProjectError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        if !self.yes
            && !prompt::confirm(&format!(
                "Delete project {} and every version of its secrets?",
                self.name
            ))?
        {
            return Err(ProjectError::Aborted);
        }

        ctx.client.delete_project(&session, &self.name).await?;
        Ok(format!("Deleted project {}", self.name))
    }
}

crate::command_enum! {
    (Create, Create),
    (Delete, Delete),
}

pub type ProjectCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Project {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[async_trait::async_trait]
impl Op for Project {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
