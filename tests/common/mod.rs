// SPDX-License-Identifier: MIT

use std::sync::Arc;
use tunelink::config::Config;
use tunelink::db::MirrorDb;
use tunelink::routes::create_router;
use tunelink::services::{SpotifyClient, SyncService, TokenBroker};
use tunelink::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> MirrorDb {
    MirrorDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> MirrorDb {
    MirrorDb::new_mock()
}

/// Create a test JWT for the given mail, signed with the given key.
#[allow(dead_code)]
pub fn create_test_jwt(mail: &str, signing_key: &[u8]) -> String {
    tunelink::middleware::auth::create_jwt(mail, signing_key).expect("Failed to create JWT")
}

/// Build a sync service over the given database connection.
#[allow(dead_code)]
pub fn sync_service(db: MirrorDb) -> SyncService {
    let config = Config::test_default();
    let spotify = SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
    );
    let broker = TokenBroker::new(spotify.clone(), db.clone());
    SyncService::new(spotify, broker, db, Arc::new(dashmap::DashMap::new()))
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_db(test_db_offline())
}

/// Create a test app over the given database connection.
#[allow(dead_code)]
pub fn create_test_app_with_db(db: MirrorDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();

    let spotify = SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
    );
    let broker = TokenBroker::new(spotify.clone(), db.clone());
    let playlist_locks = Arc::new(dashmap::DashMap::new());
    let sync = SyncService::new(
        spotify.clone(),
        broker.clone(),
        db.clone(),
        playlist_locks,
    );

    let state = Arc::new(AppState {
        config,
        db,
        spotify,
        broker,
        sync,
    });

    (create_router(state.clone()), state)
}
