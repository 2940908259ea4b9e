use std::process::ExitCode;
use tracing::{error, info};

mod browser;
mod cli;
mod crawler;
mod error;
mod storage;
mod utils;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = cli::parse_args();

    // Initialize logging
    if let Err(e) = utils::init_logging(args.verbose, args.log_file(), args.log_format) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::from(cli::EXIT_FAILURE);
    }

    info!("Starting announcement crawler v{}", env!("CARGO_PKG_VERSION"));

    // Process commands
    match cli::process_command(args).await {
        Ok(()) => {
            info!("Command completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            ExitCode::from(cli::exit_code(&e))
        }
    }
}
