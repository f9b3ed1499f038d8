// src/main.rs
use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use log::error;
use std::process::ExitCode;

use sync_ci::cli::{Cli, Command, SyncCiArgs};
use sync_ci::config::Settings;
use sync_ci::error::StartupError;
use sync_ci::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::SyncCi(args) => sync_ci(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn sync_ci(args: SyncCiArgs) -> Result<()> {
    let settings = Settings::load(&args.config, &args.overrides()).map_err(StartupError::Config)?;
    Orchestrator::new(settings).run().await?;
    Ok(())
}
