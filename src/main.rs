use clap::Parser;
use dotenv::dotenv;
use log::error;
use std::process::ExitCode;

use advisor_agent::cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = advisor_agent::run(args).await {
        error!("Startup failed: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
