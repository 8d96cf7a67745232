use clap::Args;
use url::Url;

use crate::state::{AppConfig, AppState, DEFAULT_API_URL, DEFAULT_LOG_LEVEL};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Backend API url to store in the config file
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: Url,

    /// Default log level
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            api_url: self.api_url.to_string(),
            log_level: self.log_level.clone(),
            session: None,
        };
        let state = AppState::init(ctx.config_path.clone(), config)?;

        Ok(format!(
            "Initialized envcrypt directory at: {}\n\
             - Config: {}\n\
             - API url: {}",
            state.envcrypt_dir.display(),
            state.config_path.display(),
            state.config.api_url,
        ))
    }
}
