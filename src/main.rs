use anyhow::{Context, Result};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    contact_service::{ContactNotifier, NotifierMode},
    gallery_service::GalleryStore,
    mailer::Mailer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Pick up a local .env before anything reads the environment ---
    dotenv::dotenv().ok();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting portfolio-api with config: {:?}", cfg);

    // --- Open the gallery directory (created if missing) ---
    let gallery = GalleryStore::open(&cfg.gallery_dir, cfg.upload_limits)
        .await
        .with_context(|| format!("opening gallery directory {}", cfg.gallery_dir.display()))?;
    tracing::info!("Gallery images stored in {}", gallery.root().display());

    // --- Contact notifier: relay mode is decided once, here ---
    let mode = match &cfg.mail {
        Some(settings) => {
            NotifierMode::Relay(Mailer::new(settings).context("configuring mail relay")?)
        }
        None => {
            tracing::info!("Email credentials not configured - contact messages are logged only");
            NotifierMode::LogOnly
        }
    };
    let contact = ContactNotifier::new(mode);
    tracing::info!("Contact notifier mode: {}", contact.mode_name());

    // --- Build router ---
    let app = routes::routes::app(state::AppState::new(gallery, contact));

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
