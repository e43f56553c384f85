//! Diligent CLI entry point.

use anyhow::Result;
use clap::Parser;
use diligent::cli::{commands, Cli, Commands};
use diligent::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("diligent={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Execute command
    match &cli.command {
        Commands::Questions => {
            commands::run_questions()?;
        }

        Commands::Chunks { file } => {
            commands::run_chunks(file, settings).await?;
        }

        Commands::Ask {
            file,
            numbers,
            all,
            api_key,
            model,
            telemetry_json,
        } => {
            commands::run_ask(
                file,
                numbers,
                *all,
                api_key.as_deref(),
                model.clone(),
                telemetry_json.as_ref(),
                settings,
            )
            .await?;
        }

        Commands::Session { file, api_key } => {
            commands::run_session(file.as_deref(), api_key.as_deref(), settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
