//! Svar CLI entry point.

use anyhow::Result;
use clap::Parser;
use svar::cli::{commands, log_directive, Cli, Commands};
use svar::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging; -v flags override the configured level
    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
            |_| log_directive(cli.verbose, &settings.general.log_level),
        )))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.cache_dir())?;

    // Execute command
    match &cli.command {
        Commands::Process { video, language } => {
            commands::run_process(video, language.clone(), settings).await?;
        }

        Commands::Ask {
            video,
            question,
            language,
            model,
            top_k,
        } => {
            commands::run_ask(
                video,
                question,
                language.clone(),
                model.clone(),
                *top_k,
                settings,
            )
            .await?;
        }

        Commands::Chat { video, model } => {
            commands::run_chat(video.clone(), model.clone(), settings).await?;
        }

        Commands::Cache { action } => {
            commands::run_cache(action, settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
