use std::path::PathBuf;

use clap::{Args, Subcommand};
use zeroize::Zeroizing;

use common::client::ClientError;
use common::crypto::{CryptoError, SecretKey};
use common::service_role::PRIVATE_KEY_ENV;

use super::env::{write_env_file, EnvOpError, DEFAULT_ENV_FILE};
use crate::cli::op::{Op, OpContext};
use crate::cli::render;

/// Read instead of `--oidc-token` when set
pub const OIDC_TOKEN_ENV: &str = "ENVCRYPT_OIDC_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum CiError {
    #[error("{0} is not set")]
    MissingEnv(&'static str),
    #[error("ENVCRYPT_SERVICE_ROLE_PRIVATE_KEY is not a valid private key: {0}")]
    InvalidKey(CryptoError),
    #[error("no OIDC token: pass --oidc-token or set ENVCRYPT_OIDC_TOKEN")]
    MissingToken,
    #[error("environment has no variables")]
    Empty,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    EnvFile(#[from] EnvOpError),
}

/// Pull secrets inside a CI job as a service role
///
/// Authenticates with the job's OIDC token and unwraps the delegated
/// project key with the service role private key from
/// `ENVCRYPT_SERVICE_ROLE_PRIVATE_KEY`. No user login is involved.
#[derive(Args, Debug, Clone)]
pub struct Pull {
    #[arg(long, short)]
    pub project: String,

    #[arg(long)]
    pub env: String,

    /// OIDC id token of the running job
    #[arg(long)]
    pub oidc_token: Option<String>,

    /// Where to write the .env file
    #[arg(long, short, default_value = DEFAULT_ENV_FILE)]
    pub output: PathBuf,
}

impl Pull {
    fn oidc_token(&self) -> Result<Zeroizing<String>, CiError> {
        self.oidc_token
            .clone()
            .or_else(|| std::env::var(OIDC_TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
            .map(Zeroizing::new)
            .ok_or(CiError::MissingToken)
    }
}

fn service_role_key() -> Result<SecretKey, CiError> {
    let encoded = std::env::var(PRIVATE_KEY_ENV)
        .map(Zeroizing::new)
        .map_err(|_| CiError::MissingEnv(PRIVATE_KEY_ENV))?;
    SecretKey::from_base64(encoded.trim()).map_err(CiError::InvalidKey)
}

#[async_trait::async_trait]
impl Op for Pull {
    type Error = CiError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let token = self.oidc_token()?;
        let key = service_role_key()?;

        let pulled = ctx
            .client
            .ci_pull(&token, &self.project, &self.env, &key)
            .await?;
        drop(key);

        if pulled.snapshot.is_empty() {
            return Err(CiError::Empty);
        }
        write_env_file(&self.output, &pulled.snapshot)?;

        Ok(format!(
            "{}\nPulled {}/{} version {} to {}",
            render::env_summary(&pulled.snapshot),
            self.project,
            self.env,
            pulled.version,
            self.output.display()
        ))
    }
}

crate::command_enum! {
    (Pull, Pull),
}

pub type CiCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Ci {
    #[command(subcommand)]
    pub command: CiCommand,
}

#[async_trait::async_trait]
impl Op for Ci {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
