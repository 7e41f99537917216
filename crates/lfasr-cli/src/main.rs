mod app;
mod args;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use lfasr_core::Settings;
use tracing_subscriber::EnvFilter;

use app::App;
use args::{Cli, Commands};
use commands::Status;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let app = App::new(Settings::load(), cli.credentials.clone());
    let status = match run(&app, cli.command).await {
        Ok(status) => status,
        Err(err) => Status::from_error(&err),
    };

    status.print();
    ExitCode::from(u8::try_from(status.code).unwrap_or(1))
}

async fn run(app: &App, command: Commands) -> Result<Status> {
    match command {
        Commands::Upload { file } => commands::upload::run(app, &file).await,
        Commands::Result {
            task_id,
            wait,
            output_dir,
            poll,
        } => commands::result::run(app, &task_id, wait, output_dir.as_deref(), &poll).await,
        Commands::Transcribe {
            file,
            output_dir,
            poll,
        } => commands::transcribe::run(app, &file, output_dir.as_deref(), &poll).await,
        Commands::Batch {
            inputs,
            output_dir,
            workers,
            extensions,
            poll,
        } => {
            commands::batch::run(
                app,
                &inputs,
                output_dir.as_deref(),
                workers,
                extensions.as_deref(),
                &poll,
            )
            .await
        }
        Commands::Config(args) => commands::config::run(app, &args),
    }
}

/// Logs go to stderr so stdout stays a single JSON document.
/// Default level is warn, `--verbose` raises it to debug, and `RUST_LOG` overrides both.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "lfasr=debug,lfasr_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}
