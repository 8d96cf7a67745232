mod cli;
mod git;
mod logging;
mod state;
mod transport;

use clap::{Parser, Subcommand};
use cli::{
    args::Args, op::Op, Ci, Diff, History, Init, Login, Logout, Member, Project, Pull, Push,
    Register, Rollback, ServiceRole, Version, Whoami,
};
use state::AppState;

command_enum! {
    (Init, Init),
    (Register, Register),
    (Login, Login),
    (Logout, Logout),
    (Whoami, Whoami),
    (Project, Project),
    (Member, Member),
    (Push, Push),
    (Pull, Pull),
    (History, History),
    (Diff, Diff),
    (Rollback, Rollback),
    (ServiceRole, ServiceRole),
    (Ci, Ci),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let state = match AppState::load_or_default(args.config_path.clone()) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| state.config.log_level.clone());
    let guard = logging::init_logging(&level);

    // Resolve remote URL: explicit flag > ENVCRYPT_API_URL > config api_url
    let remote = match state.api_url(args.remote.clone()) {
        Ok(remote) => remote,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = match cli::op::OpContext::new(remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    let result = args.command.execute(&ctx).await;
    // exit() skips destructors; flush logs first
    drop(guard);
    match result {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
