pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "envcrypt")]
#[command(about = "End-to-end encrypted environment secrets for teams and CI")]
#[command(version)]
pub struct Args {
    /// Backend API url (overrides ENVCRYPT_API_URL and the config file)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the envcrypt config directory (defaults to ~/.envcrypt)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level for stderr output (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
