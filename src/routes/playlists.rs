// SPDX-License-Identifier: MIT

//! Playlist and track routes: mirror listings, sync triggers, overrides.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Playlist, Track};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/playlists", get(list_playlists))
        .route("/platform/spotify/playlists/sync", post(sync_playlists))
        .route("/playlisttracks/{playlist_id}/sync", post(sync_tracks))
        .route("/playlisttracks/{playlist_id}/tracks", get(list_tracks))
        .route(
            "/playlisttracks/{playlist_id}/tracks/disabled",
            patch(set_tracks_disabled),
        )
}

// ─── Playlists ───────────────────────────────────────────────

/// List the user's mirrored playlists (no remote calls).
async fn list_playlists(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Playlist>>> {
    let playlists = state.db.list_playlists_for_user(&user.mail).await?;
    Ok(Json(playlists))
}

/// Run a playlist reconciliation pass against the remote catalog.
async fn sync_playlists(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Playlist>>> {
    let playlists = state.sync.sync_playlists(&user.mail).await?;
    Ok(Json(playlists))
}

// ─── Tracks ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct TracksResponse {
    pub items: Vec<Track>,
    pub total: u32,
}

/// Run a track reconciliation pass for one playlist.
async fn sync_tracks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> Result<Json<TracksResponse>> {
    let result = state
        .sync
        .sync_playlist_tracks(&user.mail, &playlist_id)
        .await?;

    Ok(Json(TracksResponse {
        items: result.items,
        total: result.total,
    }))
}

/// List one playlist's mirrored tracks, newest added first (no remote calls).
async fn list_tracks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> Result<Json<TracksResponse>> {
    let playlist = state
        .db
        .get_playlist(&playlist_id)
        .await?
        .ok_or_else(|| AppError::PlaylistNotFound(playlist_id.clone()))?;

    if playlist.user != user.mail {
        return Err(AppError::NotAuthorized);
    }

    let items = state.db.get_tracks_for_playlist(&playlist_id).await?;
    let total = items.len() as u32;

    Ok(Json(TracksResponse { items, total }))
}

#[derive(Deserialize, Validate)]
pub struct SetDisabledRequest {
    #[validate(length(min = 1, message = "track_ids must not be empty"))]
    pub track_ids: Vec<String>,
    pub disabled: bool,
}

#[derive(Serialize)]
pub struct SetDisabledResponse {
    /// Rows actually updated; compare with the request to detect unknown IDs
    pub items: Vec<Track>,
    pub updated: u32,
}

/// Apply the disabled override to a batch of tracks.
async fn set_tracks_disabled(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
    Json(payload): Json<SetDisabledRequest>,
) -> Result<Json<SetDisabledResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let items = state
        .sync
        .set_tracks_disabled(&user.mail, &playlist_id, &payload.track_ids, payload.disabled)
        .await?;

    let updated = items.len() as u32;
    Ok(Json(SetDisabledResponse { items, updated }))
}
