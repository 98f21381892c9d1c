use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wallcaster::config::Config;
use wallcaster::mirror::Synchronizer;
use wallcaster::state::WatermarkStore;
use wallcaster::telegram::TelegramClient;
use wallcaster::vk::VkClient;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        eprintln!("wallcaster: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("config.json"), PathBuf::from);

    let (config, record) = Config::load(&config_path).with_context(|| {
        format!(
            "Invalid configuration in {} (fill in the credential fields, or set \
             WALLCASTER_VK_TOKEN / WALLCASTER_TG_TOKEN)",
            config_path.display()
        )
    })?;

    init_tracing(&config.log_level)?;

    info!(
        path = %config_path.display(),
        owner_id = config.vk_owner_id,
        channel = %config.tg_channel_id,
        "Starting wallcaster"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    let source = Arc::new(VkClient::new(&config, http.clone()));
    let sink = Arc::new(TelegramClient::new(&config, http));
    let store = WatermarkStore::new(config_path, record);

    let synchronizer = Synchronizer::new(source, sink, store, &config);

    tokio::select! {
        () = synchronizer.run() => {}
        () = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,wallcaster={default_level}")));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
