// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (account storage)
//! - Platforms (static integration registry)
//! - Platform links (per-user OAuth credentials)
//! - Playlists and tracks (the local mirror of remote catalog data)
//!
//! Document IDs encode the unique keys from the data model, so a plain
//! `update` call is an atomic upsert against those keys. Two concurrent
//! reconciliation passes over the same playlist therefore cannot both
//! "create" the same track row.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Platform, PlatformLink, Playlist, Track, User};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct MirrorDb {
    client: Option<firestore::FirestoreDb>,
}

impl MirrorDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing
        // a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by mail.
    pub async fn get_user(&self, mail: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(mail)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.mail)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Platform Registry Operations ────────────────────────────

    /// Get a platform by registry ID.
    pub async fn get_platform(&self, id: u32) -> Result<Option<Platform>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PLATFORMS)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a platform registry row.
    pub async fn upsert_platform(&self, platform: &Platform) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PLATFORMS)
            .document_id(platform.id.to_string())
            .object(platform)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Platform Link Operations ────────────────────────────────

    /// Get the link for a (user, platform) pair.
    pub async fn get_link(
        &self,
        user: &str,
        platform_id: u32,
    ) -> Result<Option<PlatformLink>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PLATFORM_LINKS)
            .obj()
            .one(&PlatformLink::doc_id(user, platform_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a link (overwrites any link at the same (user, platform) key).
    pub async fn set_link(&self, link: &PlatformLink) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PLATFORM_LINKS)
            .document_id(PlatformLink::doc_id(&link.user, link.platform_id))
            .object(link)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete every link for a (user, platform) pair.
    ///
    /// Queries by fields rather than by document ID so stale rows from older
    /// ID schemes are superseded too. Returns the number of deleted rows.
    pub async fn delete_links(&self, user: &str, platform_id: u32) -> Result<usize, AppError> {
        let user_owned = user.to_string();
        let links: Vec<PlatformLink> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PLATFORM_LINKS)
            .filter(move |q| {
                q.for_all([
                    q.field("user").eq(user_owned.clone()),
                    q.field("platform_id").eq(platform_id),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for link in &links {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::PLATFORM_LINKS)
                .document_id(PlatformLink::doc_id(&link.user, link.platform_id))
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(links.len())
    }

    // ─── Playlist Operations ─────────────────────────────────────

    /// Get a playlist mirror row by remote ID.
    pub async fn get_playlist(&self, remote_id: &str) -> Result<Option<Playlist>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PLAYLISTS)
            .obj()
            .one(remote_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or overwrite a playlist mirror row.
    pub async fn set_playlist(&self, playlist: &Playlist) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PLAYLISTS)
            .document_id(&playlist.remote_id)
            .object(playlist)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List mirrored playlists owned by a user, most recently updated first.
    pub async fn list_playlists_for_user(&self, user: &str) -> Result<Vec<Playlist>, AppError> {
        let user_owned = user.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PLAYLISTS)
            .filter(move |q| q.field("user").eq(user_owned.clone()))
            .order_by([("updated_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Track Operations ────────────────────────────────────────

    /// Get a track row by (playlist, remote track ID).
    pub async fn get_track(
        &self,
        playlist_id: &str,
        remote_id: &str,
    ) -> Result<Option<Track>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PLAYLIST_TRACKS)
            .obj()
            .one(&Track::doc_id(playlist_id, remote_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All track rows for one playlist, newest added first.
    pub async fn get_tracks_for_playlist(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<Track>, AppError> {
        let playlist_owned = playlist_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PLAYLIST_TRACKS)
            .filter(move |q| q.field("playlist_id").eq(playlist_owned.clone()))
            .order_by([("added_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every row for a remote track ID, across all playlists.
    ///
    /// Used by track reconciliation to detect cross-playlist moves.
    pub async fn find_tracks_by_remote_id(&self, remote_id: &str) -> Result<Vec<Track>, AppError> {
        let id_owned = remote_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PLAYLIST_TRACKS)
            .filter(move |q| q.field("remote_id").eq(id_owned.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or overwrite a track row (atomic upsert on the (playlist,
    /// remote id) key via the document ID).
    pub async fn set_track(&self, track: &Track) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PLAYLIST_TRACKS)
            .document_id(Track::doc_id(&track.playlist_id, &track.remote_id))
            .object(track)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Batch upsert of track rows, with bounded concurrency.
    pub async fn set_tracks(&self, tracks: &[Track]) -> Result<(), AppError> {
        let client = self.get_client()?;
        stream::iter(tracks.to_vec())
            .map(|track| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::PLAYLIST_TRACKS)
                    .document_id(Track::doc_id(&track.playlist_id, &track.remote_id))
                    .object(&track)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;
        Ok(())
    }

    /// Delete a track row.
    pub async fn delete_track(&self, playlist_id: &str, remote_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::PLAYLIST_TRACKS)
            .document_id(Track::doc_id(playlist_id, remote_id))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
