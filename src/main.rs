use anyhow::Result;
use bg_remove_service::{config, server};
use tracing::info;

/// Validates that a log level string is valid
fn validate_log_level(level: &str) -> Result<()> {
    level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
                level
            )
        })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging setup)
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG takes full filter directives; the config only names a level
    let log_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => {
            let level = config.server.logs.level.clone();
            if let Err(e) = validate_log_level(&level) {
                eprintln!("{}", e);
                std::process::exit(1);
            }
            level
        }
    };

    let env_filter = match tracing_subscriber::EnvFilter::try_new(&log_filter) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Invalid log filter '{}': {}", log_filter, e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .init();

    info!(
        "Starting background removal service (model: {}, log filter: {})",
        config.model.name, log_filter
    );

    server::run(config).await?;

    Ok(())
}
