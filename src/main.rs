use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use s3_directory_sync::RunOutcome;
use s3_directory_sync::cli::Cli;
use s3_directory_sync::prompt::PromptError;

fn main() -> ExitCode {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match s3_directory_sync::run(cli) {
        Ok(RunOutcome::Completed) => ExitCode::SUCCESS,
        Ok(RunOutcome::Cancelled) => {
            eprintln!("Operation cancelled.");
            ExitCode::from(2)
        }
        Err(e) => {
            if matches!(e.downcast_ref::<PromptError>(), Some(PromptError::Cancelled)) {
                eprintln!("Operation cancelled by user.");
                return ExitCode::from(2);
            }
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
