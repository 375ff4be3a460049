mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use valentine_api::cleanup;
use valentine_api::generate::Generator;
use valentine_api::state::{AppState, AppStateInner};
use valentine_api::storage::Storage;
use valentine_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "valentine=debug,valentine_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init DB and storage
    let db = Database::open(&config.db_path)?;
    let storage = Storage::new(config.media_dir.clone(), config.public_url.clone()).await?;

    let generator = match &config.openai_api_key {
        Some(key) => {
            let generator = Generator::new(
                key.clone(),
                config.openai_base_url.clone(),
                config.openai_model.clone(),
            )?;
            info!("Text generation enabled with model {}", generator.model());
            Some(generator)
        }
        None => {
            warn!("OPENAI_API_KEY not set; text generation is disabled");
            None
        }
    };

    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        jwt_secret: config.jwt_secret.clone(),
        generator,
        max_upload_bytes: config.max_upload_bytes,
    });

    // Background cleanup of orphaned media (runs every hour)
    tokio::spawn(cleanup::run_cleanup_loop(
        state.clone(),
        config.cleanup_interval_secs,
        config.asset_grace_hours,
    ));

    let app = valentine_api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Valentine server listening on {}", addr);
    info!(
        "Uploads up to {} MB, orphaned media kept {} hours",
        config.max_upload_bytes / (1024 * 1024),
        config.asset_grace_hours
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Could not install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
