// SPDX-License-Identifier: MIT

//! Tunelink API Server
//!
//! Links user accounts to external music platforms (Spotify) and keeps a
//! local mirror of their playlists and tracks in sync.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tunelink::{
    config::Config,
    db::MirrorDb,
    services::{SpotifyClient, SyncService, TokenBroker},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Tunelink API");

    // Initialize Firestore database
    let db = MirrorDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Spotify client with OAuth credentials (process-wide, read-only)
    let spotify = SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
    );

    let broker = TokenBroker::new(spotify.clone(), db.clone());

    // Per-playlist locks serialize reconciliation passes within this instance
    let playlist_locks = Arc::new(dashmap::DashMap::new());
    let sync = SyncService::new(
        spotify.clone(),
        broker.clone(),
        db.clone(),
        playlist_locks,
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        spotify,
        broker,
        sync,
    });

    // Build router
    let app = tunelink::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tunelink=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
