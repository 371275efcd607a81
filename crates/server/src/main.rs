// crates/server/src/main.rs
//! Comic compile server binary.
//!
//! Parses configuration, prepares the published and working directories,
//! then serves the API until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use comic_compiler_server::{create_app, Config};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "warn,comic_compiler_server=info,comic_compiler_core=info,tower_http=info".into()
            }),
        )
        .init();

    let config = Config::parse();

    if !config.library_dir.is_dir() {
        tracing::warn!(path = %config.library_dir.display(), "Library directory does not exist yet");
    }
    let work_dir = config.work_dir();
    tokio::fs::create_dir_all(&work_dir)
        .await
        .with_context(|| format!("creating working directory {}", work_dir.display()))?;

    let app = create_app(&config);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        addr = %addr,
        library = %config.library_dir.display(),
        published = %config.published_dir().display(),
        max_concurrent_jobs = config.max_concurrent_jobs,
        "comic-compiler v{} listening",
        env!("CARGO_PKG_VERSION")
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
