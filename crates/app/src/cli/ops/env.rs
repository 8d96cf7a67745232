use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;

use common::client::ClientError;
use common::env::{encode_env_file, parse, EnvError, Snapshot};

use crate::cli::op::{Op, OpContext};
use crate::cli::prompt::{self, PromptError};
use crate::cli::render;
use crate::state::StateError;

pub const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Debug, thiserror::Error)]
pub enum EnvOpError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("{path}: {source}")]
    EnvFile { path: PathBuf, source: EnvError },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} contains no variables")]
    Empty(PathBuf),
    #[error("aborted")]
    Aborted,
}

/// Where a command operates
#[derive(Args, Debug, Clone)]
pub struct Target {
    #[arg(long, short)]
    pub project: String,

    /// Environment name, e.g. dev, staging, prod
    #[arg(long, default_value = "dev")]
    pub env: String,
}

pub(crate) fn read_env_file(path: &Path) -> Result<Snapshot, EnvOpError> {
    let contents = fs::read_to_string(path).map_err(|source| EnvOpError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot = parse(&contents).map_err(|source| EnvOpError::EnvFile {
        path: path.to_path_buf(),
        source,
    })?;
    if snapshot.is_empty() {
        return Err(EnvOpError::Empty(path.to_path_buf()));
    }
    Ok(snapshot)
}

/// Write a `.env` file readable only by the owner
pub(crate) fn write_env_file(path: &Path, snapshot: &Snapshot) -> Result<(), EnvOpError> {
    let io_err = |source| EnvOpError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_err)?;
    // `mode` only applies on create; an existing file keeps its bits otherwise
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(io_err)?;
    }
    let contents = zeroize::Zeroizing::new(encode_env_file(snapshot));
    file.write_all(contents.as_bytes()).map_err(io_err)?;
    Ok(())
}

/// Encrypt a .env file and upload it as the next version
#[derive(Args, Debug, Clone)]
pub struct Push {
    #[command(flatten)]
    pub target: Target,

    /// Path to the .env file to upload
    #[arg(long = "env-file", short = 'f', default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,
}

#[async_trait::async_trait]
impl Op for Push {
    type Error = EnvOpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let snapshot = read_env_file(&self.env_file)?;

        let version = ctx
            .client
            .push(&session, &self.target.project, &self.target.env, &snapshot)
            .await?;

        Ok(format!(
            "{}\nUploaded {}/{} version {}",
            render::env_summary(&snapshot),
            self.target.project,
            self.target.env,
            version
        ))
    }
}

/// Download and decrypt an environment into a .env file
#[derive(Args, Debug, Clone)]
pub struct Pull {
    #[command(flatten)]
    pub target: Target,

    /// Version to pull (defaults to the latest)
    #[arg(long)]
    pub version: Option<i32>,

    /// Where to write the .env file
    #[arg(long = "env-file", short = 'f', default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Print to stdout instead of writing a file
    #[arg(long, conflicts_with = "env_file")]
    pub stdout: bool,

    /// Overwrite an existing file without asking
    #[arg(long, short)]
    pub yes: bool,
}

#[async_trait::async_trait]
impl Op for Pull {
    type Error = EnvOpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let pulled = ctx
            .client
            .pull(&session, &self.target.project, &self.target.env, self.version)
            .await?;

        if self.stdout {
            return Ok(encode_env_file(&pulled.snapshot).trim_end().to_string());
        }

        if self.env_file.exists()
            && !self.yes
            && !prompt::confirm(&format!("Overwrite {}?", self.env_file.display()))?
        {
            return Err(EnvOpError::Aborted);
        }
        write_env_file(&self.env_file, &pulled.snapshot)?;

        Ok(format!(
            "{}\nWrote {}/{} version {} to {}",
            render::env_summary(&pulled.snapshot),
            self.target.project,
            self.target.env,
            pulled.version,
            self.env_file.display()
        ))
    }
}

/// List the versions of an environment
#[derive(Args, Debug, Clone)]
pub struct History {
    #[command(flatten)]
    pub target: Target,
}

#[async_trait::async_trait]
impl Op for History {
    type Error = EnvOpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let versions = ctx
            .client
            .history(&session, &self.target.project, &self.target.env)
            .await?;

        let latest = versions.last().map(|v| v.version);
        let lines: Vec<String> = versions
            .iter()
            .rev()
            .map(|v| {
                let current = if Some(v.version) == latest {
                    " (current)"
                } else {
                    ""
                };
                format!(
                    "v{}  {}  {} variable(s){}",
                    v.version,
                    v.kind,
                    v.snapshot.len(),
                    current
                )
            })
            .collect();

        if lines.is_empty() {
            return Ok(format!(
                "no versions of {}/{}",
                self.target.project, self.target.env
            ));
        }
        Ok(lines.join("\n"))
    }
}

/// Show what changed between two versions
#[derive(Args, Debug, Clone)]
pub struct Diff {
    #[command(flatten)]
    pub target: Target,

    pub old: i32,
    pub new: i32,

    /// Print secret values instead of masking them
    #[arg(long)]
    pub show_secrets: bool,
}

#[async_trait::async_trait]
impl Op for Diff {
    type Error = EnvOpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let (old, new, changes) = ctx
            .client
            .diff_versions(
                &session,
                &self.target.project,
                &self.target.env,
                self.old,
                self.new,
            )
            .await?;

        Ok(format!(
            "v{} -> v{}\n{}",
            old.version,
            new.version,
            render::diff_report(&changes, &old.snapshot, &new.snapshot, self.show_secrets)
        ))
    }
}

/// Restore an earlier version as a new version
#[derive(Args, Debug, Clone)]
pub struct Rollback {
    #[command(flatten)]
    pub target: Target,

    pub version: i32,

    /// Print secret values in the preview instead of masking them
    #[arg(long)]
    pub show_secrets: bool,

    /// Apply without asking for confirmation
    #[arg(long, short)]
    pub yes: bool,
}

#[async_trait::async_trait]
impl Op for Rollback {
    type Error = EnvOpError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session()?;
        let plan = ctx
            .client
            .plan_rollback(&session, &self.target.project, &self.target.env, self.version)
            .await?;

        let current = ctx
            .client
            .pull(
                &session,
                &self.target.project,
                &self.target.env,
                Some(plan.current_version),
            )
            .await?;
        let preview = render::diff_report(
            &plan.diff,
            &current.snapshot,
            &plan.target,
            self.show_secrets,
        );
        eprintln!(
            "Rolling back {}/{} from v{} to v{}:\n{}",
            plan.project, plan.env, plan.current_version, plan.target_version, preview
        );

        if !self.yes && !prompt::confirm("Apply this rollback?")? {
            return Err(EnvOpError::Aborted);
        }

        let version = ctx.client.apply_rollback(&session, &plan).await?;
        Ok(format!(
            "Rolled back {}/{} to v{} as new version {}",
            plan.project, plan.env, plan.target_version, version
        ))
    }
}
