//! DocSign API Server - development backend for document signing

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use docsign_api::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("docsign_api=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Initialize application state
    info!("Initializing DocSign API...");
    let state = Arc::new(AppState::from_env());
    let app = router(state);

    // Parse bind address
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting DocSign API on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
