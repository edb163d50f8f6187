// SPDX-License-Identifier: MIT

//! Reconciliation engine: merges freshly fetched remote collections into
//! the local mirror with minimal writes.
//!
//! Two passes exist. The playlist pass creates or overwrites content fields
//! and never deletes (absence from a listing is not deletion, since the
//! listing is scoped to one account). The track pass, scoped to one
//! playlist, only ever creates or reads rows: an already-known track is
//! echoed back as persisted, which is what keeps the user's `disabled`
//! override intact across every sync.
//!
//! Planning is pure (no I/O) and separated from the write path so the
//! merge rules are testable without a store.

use crate::db::MirrorDb;
use crate::error::{AppError, Result};
use crate::models::platform::SPOTIFY_PLATFORM_ID;
use crate::models::{Playlist, Track};
use crate::services::pagination::{fetch_all, PAGE_SIZE};
use crate::services::spotify::{SpotifyClient, SpotifyPlaylistItem, SpotifyTrackEntry};
use crate::services::token_broker::TokenBroker;
use crate::time_utils::format_utc_rfc3339;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-playlist mutex map: one reconciliation pass per playlist at a time.
pub type PlaylistLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Result of one track reconciliation pass.
#[derive(Debug, Clone)]
pub struct TrackSyncResult {
    /// Rows touched by the pass (created or already present), newest first
    pub items: Vec<Track>,
    pub total: u32,
}

/// High-level sync service tying together token broker, fetcher and mirror.
#[derive(Clone)]
pub struct SyncService {
    client: SpotifyClient,
    broker: TokenBroker,
    db: MirrorDb,
    playlist_locks: PlaylistLocks,
}

impl SyncService {
    pub fn new(
        client: SpotifyClient,
        broker: TokenBroker,
        db: MirrorDb,
        playlist_locks: PlaylistLocks,
    ) -> Self {
        Self {
            client,
            broker,
            db,
            playlist_locks,
        }
    }

    /// Sync the user's playlist listing into the mirror.
    ///
    /// The whole remote collection is fetched before any write, so a page
    /// failure aborts the pass with nothing committed. Returns the mirrored
    /// rows in remote listing order.
    pub async fn sync_playlists(&self, user: &str) -> Result<Vec<Playlist>> {
        let token = self
            .broker
            .get_valid_token(user, SPOTIFY_PLATFORM_ID)
            .await?;

        let remote = fetch_all(PAGE_SIZE, |offset, limit| {
            self.client.playlists_page(&token, offset, limit)
        })
        .await?;

        tracing::info!(user, count = remote.len(), "Fetched remote playlists");

        let now = format_utc_rfc3339(chrono::Utc::now());
        let mut mirrored = Vec::with_capacity(remote.len());

        for item in &remote {
            let existing = self.db.get_playlist(&item.id).await?;
            let row = merge_playlist(item, existing.as_ref(), user, SPOTIFY_PLATFORM_ID, &now);
            self.db.set_playlist(&row).await?;
            mirrored.push(row);
        }

        Ok(mirrored)
    }

    /// Sync one playlist's track listing into the mirror.
    ///
    /// Holds the per-playlist lock for the whole pass. Rows are written one
    /// at a time, so a failure mid-pass leaves earlier rows committed
    /// (partial progress is preferred over page-level atomicity for large
    /// collections).
    pub async fn sync_playlist_tracks(
        &self,
        user: &str,
        playlist_id: &str,
    ) -> Result<TrackSyncResult> {
        let playlist = self
            .db
            .get_playlist(playlist_id)
            .await?
            .ok_or_else(|| AppError::PlaylistNotFound(playlist_id.to_string()))?;

        if playlist.user != user {
            return Err(AppError::NotAuthorized);
        }

        let token = self
            .broker
            .get_valid_token(user, SPOTIFY_PLATFORM_ID)
            .await?;

        let lock = self
            .playlist_locks
            .entry(playlist_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let remote = fetch_all(PAGE_SIZE, |offset, limit| {
            self.client
                .playlist_tracks_page(&token, playlist_id, offset, limit)
        })
        .await?;

        tracing::info!(
            user,
            playlist_id,
            count = remote.len(),
            "Fetched remote playlist tracks"
        );

        let local: HashMap<String, Track> = self
            .db
            .get_tracks_for_playlist(playlist_id)
            .await?
            .into_iter()
            .map(|t| (t.remote_id.clone(), t))
            .collect();

        let now = format_utc_rfc3339(chrono::Utc::now());
        let mut items = Vec::new();

        for entry in first_occurrences(&remote) {
            let remote_id = match entry.catalog_track() {
                Some((_, id)) => id.to_string(),
                None => continue, // locally-unrepresentable, contributes nothing
            };

            let elsewhere = if local.contains_key(&remote_id) {
                Vec::new()
            } else {
                self.db
                    .find_tracks_by_remote_id(&remote_id)
                    .await?
                    .into_iter()
                    .filter(|t| t.playlist_id != playlist_id)
                    .collect()
            };

            match plan_track(playlist_id, entry, local.get(&remote_id), &elsewhere, &now) {
                TrackDecision::Skip => {}
                TrackDecision::Keep(row) => items.push(row),
                TrackDecision::Create { track, stale } => {
                    for (stale_playlist, stale_id) in &stale {
                        tracing::debug!(
                            track = %stale_id,
                            from = %stale_playlist,
                            to = %playlist_id,
                            "Track moved playlists, deleting stale row"
                        );
                        self.db.delete_track(stale_playlist, stale_id).await?;
                    }
                    self.db.set_track(&track).await?;
                    items.push(track);
                }
            }
        }

        sort_newest_first(&mut items);
        let total = items.len() as u32;

        Ok(TrackSyncResult { items, total })
    }

    /// Apply the user's disabled override to a batch of tracks.
    ///
    /// IDs with no row under the playlist are silently skipped; the response
    /// carries only updated rows so callers can detect short writes.
    pub async fn set_tracks_disabled(
        &self,
        user: &str,
        playlist_id: &str,
        track_ids: &[String],
        disabled: bool,
    ) -> Result<Vec<Track>> {
        let playlist = self
            .db
            .get_playlist(playlist_id)
            .await?
            .ok_or_else(|| AppError::PlaylistNotFound(playlist_id.to_string()))?;

        if playlist.user != user {
            return Err(AppError::NotAuthorized);
        }

        let now = format_utc_rfc3339(chrono::Utc::now());
        let mut updated = Vec::new();

        for remote_id in track_ids {
            match self.db.get_track(playlist_id, remote_id).await? {
                Some(mut track) => {
                    track.disabled = disabled;
                    track.updated_at = now.clone();
                    updated.push(track);
                }
                None => {
                    tracing::debug!(playlist_id, track = %remote_id, "Override target not found, skipping");
                }
            }
        }

        self.db.set_tracks(&updated).await?;

        tracing::info!(
            user,
            playlist_id,
            requested = track_ids.len(),
            updated = updated.len(),
            disabled,
            "Applied track overrides"
        );

        Ok(updated)
    }
}

// ─── Pure planning ───────────────────────────────────────────────────────

/// Build the playlist mirror row for one remote item.
///
/// Content fields always come from the remote; owner, platform and
/// created_at are fixed by the first writer and never reassigned.
pub fn merge_playlist(
    remote: &SpotifyPlaylistItem,
    existing: Option<&Playlist>,
    user: &str,
    platform_id: u32,
    now: &str,
) -> Playlist {
    let (owner, owner_platform, created_at) = match existing {
        Some(current) => (
            current.user.clone(),
            current.platform_id,
            current.created_at.clone(),
        ),
        None => (user.to_string(), platform_id, now.to_string()),
    };

    Playlist {
        user: owner,
        platform_id: owner_platform,
        remote_id: remote.id.clone(),
        name: remote.name.clone(),
        description: remote.description.clone(),
        external_url: remote.external_url().map(str::to_string),
        image_url: remote.image_url().map(str::to_string),
        snapshot_id: remote.snapshot_id.clone(),
        is_public: remote.public.unwrap_or(false),
        tracks_total: remote.tracks.total,
        created_at,
        updated_at: now.to_string(),
    }
}

/// Decision for one remote track entry.
#[derive(Debug, Clone)]
pub enum TrackDecision {
    /// Not representable locally; contributes neither a create nor an update.
    Skip,
    /// Row already exists under this playlist: read and echoed as persisted,
    /// never rewritten. This is what preserves the disabled override.
    Keep(Track),
    /// No row under this playlist: create fresh (disabled = false), deleting
    /// any stale rows for the same track under other playlists first.
    Create {
        track: Track,
        /// (playlist_id, remote_id) keys of stale cross-playlist rows
        stale: Vec<(String, String)>,
    },
}

/// Decide what to do with one remote entry given the local mirror state.
pub fn plan_track(
    playlist_id: &str,
    entry: &SpotifyTrackEntry,
    existing_same: Option<&Track>,
    existing_elsewhere: &[Track],
    now: &str,
) -> TrackDecision {
    let (track_obj, remote_id) = match entry.catalog_track() {
        Some(found) => found,
        None => return TrackDecision::Skip,
    };

    if let Some(row) = existing_same {
        // Content fields for a known track are assumed stable; no write.
        return TrackDecision::Keep(row.clone());
    }

    let external_ids = track_obj.external_ids.clone().unwrap_or_default();
    let track = Track {
        playlist_id: playlist_id.to_string(),
        remote_id: remote_id.to_string(),
        name: track_obj.name.clone(),
        artists: track_obj.artists.iter().map(|a| a.name.clone()).collect(),
        album_name: track_obj
            .album
            .as_ref()
            .map(|a| a.name.clone())
            .unwrap_or_default(),
        kind: track_obj.kind.clone(),
        isrc: external_ids.isrc,
        ean: external_ids.ean,
        upc: external_ids.upc,
        disabled: false,
        added_at: entry.added_at.clone().unwrap_or_else(|| now.to_string()),
        updated_at: now.to_string(),
    };

    let stale = existing_elsewhere
        .iter()
        .filter(|t| t.remote_id == remote_id && t.playlist_id != playlist_id)
        .map(|t| (t.playlist_id.clone(), t.remote_id.clone()))
        .collect();

    TrackDecision::Create { track, stale }
}

/// Drop repeated occurrences of the same catalog track from a remote
/// listing (the remote allows a playlist to contain a track twice, while
/// the mirror keys rows by (playlist, remote id)). Only the first
/// occurrence contributes to a pass; unrepresentable entries pass through
/// since planning skips them anyway.
pub fn first_occurrences(entries: &[SpotifyTrackEntry]) -> Vec<&SpotifyTrackEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| match entry.catalog_track() {
            Some((_, id)) => seen.insert(id.to_string()),
            None => true,
        })
        .collect()
}

/// Order a track response by added_at descending (remote-supplied RFC3339
/// timestamps compare lexicographically), remote ID as tie-break.
pub fn sort_newest_first(tracks: &mut [Track]) {
    tracks.sort_by(|a, b| {
        b.added_at
            .cmp(&a.added_at)
            .then_with(|| a.remote_id.cmp(&b.remote_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::spotify::{ExternalIds, SpotifyArtist, SpotifyTrackObject};

    const NOW: &str = "2024-06-01T12:00:00Z";

    fn remote_playlist(id: &str, snapshot: &str) -> SpotifyPlaylistItem {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Road Trip",
            "description": "Windows down",
            "external_urls": {"spotify": format!("https://open.spotify.com/playlist/{}", id)},
            "images": [{"url": "https://i.scdn.co/image/cover"}],
            "snapshot_id": snapshot,
            "public": true,
            "tracks": {"total": 12}
        }))
        .unwrap()
    }

    fn remote_entry(id: &str, added_at: &str) -> SpotifyTrackEntry {
        SpotifyTrackEntry {
            added_at: Some(added_at.to_string()),
            is_local: false,
            track: Some(SpotifyTrackObject {
                id: Some(id.to_string()),
                name: format!("Track {}", id),
                artists: vec![SpotifyArtist {
                    name: "The Midnights".to_string(),
                }],
                album: None,
                kind: "track".to_string(),
                external_ids: Some(ExternalIds {
                    isrc: Some(format!("USRC1{}", id)),
                    ean: None,
                    upc: None,
                }),
            }),
        }
    }

    fn local_row(playlist_id: &str, remote_id: &str, disabled: bool) -> Track {
        Track {
            playlist_id: playlist_id.to_string(),
            remote_id: remote_id.to_string(),
            name: format!("Track {}", remote_id),
            artists: vec!["The Midnights".to_string()],
            album_name: String::new(),
            kind: "track".to_string(),
            isrc: Some(format!("USRC1{}", remote_id)),
            ean: None,
            upc: None,
            disabled,
            added_at: "2024-05-01T00:00:00Z".to_string(),
            updated_at: "2024-05-01T00:00:00Z".to_string(),
        }
    }

    // ─── Playlist merge ──────────────────────────────────────────

    #[test]
    fn first_sync_creates_with_owner_and_timestamps() {
        let remote = remote_playlist("pl1", "snap-1");
        let row = merge_playlist(&remote, None, "a@example.com", 1, NOW);

        assert_eq!(row.user, "a@example.com");
        assert_eq!(row.remote_id, "pl1");
        assert_eq!(row.snapshot_id, "snap-1");
        assert_eq!(row.created_at, NOW);
        assert_eq!(row.updated_at, NOW);
        assert_eq!(row.tracks_total, 12);
    }

    #[test]
    fn resync_overwrites_content_but_not_owner() {
        let remote_v1 = remote_playlist("pl1", "snap-1");
        let first = merge_playlist(&remote_v1, None, "a@example.com", 1, NOW);

        let remote_v2 = remote_playlist("pl1", "snap-2");
        let second = merge_playlist(
            &remote_v2,
            Some(&first),
            "b@example.com", // different caller
            1,
            "2024-06-02T12:00:00Z",
        );

        // Remote wins on content fields
        assert_eq!(second.snapshot_id, "snap-2");
        assert_eq!(second.updated_at, "2024-06-02T12:00:00Z");
        // First writer wins on ownership, created_at sticks
        assert_eq!(second.user, "a@example.com");
        assert_eq!(second.created_at, NOW);
    }

    #[test]
    fn playlist_merge_is_idempotent() {
        let remote = remote_playlist("pl1", "snap-1");
        let first = merge_playlist(&remote, None, "a@example.com", 1, NOW);
        let second = merge_playlist(&remote, Some(&first), "a@example.com", 1, NOW);

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    // ─── Track planning ──────────────────────────────────────────

    #[test]
    fn unrepresentable_entries_are_skipped() {
        let mut entry = remote_entry("t1", "2024-05-01T00:00:00Z");
        entry.is_local = true;
        assert!(matches!(
            plan_track("pl1", &entry, None, &[], NOW),
            TrackDecision::Skip
        ));

        let no_track = SpotifyTrackEntry {
            added_at: None,
            is_local: false,
            track: None,
        };
        assert!(matches!(
            plan_track("pl1", &no_track, None, &[], NOW),
            TrackDecision::Skip
        ));
    }

    #[test]
    fn absent_track_is_created_fresh_and_enabled() {
        let entry = remote_entry("t1", "2024-05-01T00:00:00Z");
        match plan_track("pl1", &entry, None, &[], NOW) {
            TrackDecision::Create { track, stale } => {
                assert_eq!(track.playlist_id, "pl1");
                assert_eq!(track.remote_id, "t1");
                assert!(!track.disabled);
                assert_eq!(track.added_at, "2024-05-01T00:00:00Z");
                assert_eq!(track.artists, vec!["The Midnights".to_string()]);
                assert_eq!(track.isrc.as_deref(), Some("USRC1t1"));
                assert!(stale.is_empty());
            }
            other => panic!("expected Create, got {:?}", other),
        }
    }

    #[test]
    fn known_track_is_kept_untouched_with_override() {
        let entry = remote_entry("t1", "2024-05-01T00:00:00Z");
        let existing = local_row("pl1", "t1", true);

        match plan_track("pl1", &entry, Some(&existing), &[], NOW) {
            TrackDecision::Keep(row) => {
                // Echoed exactly as persisted: disabled survives, no
                // timestamps move.
                assert!(row.disabled);
                assert_eq!(row.updated_at, "2024-05-01T00:00:00Z");
            }
            other => panic!("expected Keep, got {:?}", other),
        }
    }

    #[test]
    fn cross_playlist_move_deletes_stale_and_creates_fresh() {
        let entry = remote_entry("t2", "2024-05-02T00:00:00Z");
        let elsewhere = vec![local_row("pl1", "t2", true)];

        match plan_track("pl2", &entry, None, &elsewhere, NOW) {
            TrackDecision::Create { track, stale } => {
                assert_eq!(stale, vec![("pl1".to_string(), "t2".to_string())]);
                assert_eq!(track.playlist_id, "pl2");
                // Fresh row does not inherit the old row's override
                assert!(!track.disabled);
            }
            other => panic!("expected Create, got {:?}", other),
        }
    }

    #[test]
    fn second_pass_over_same_input_only_keeps() {
        // First pass creates; feed the created rows back as local state and
        // re-plan the same remote input: every decision must be Keep.
        let entries: Vec<_> = (1..=3)
            .map(|i| remote_entry(&format!("t{}", i), "2024-05-01T00:00:00Z"))
            .collect();

        let mut local: HashMap<String, Track> = HashMap::new();
        for entry in &entries {
            if let TrackDecision::Create { track, .. } =
                plan_track("pl1", entry, None, &[], NOW)
            {
                local.insert(track.remote_id.clone(), track);
            }
        }
        assert_eq!(local.len(), 3);

        for entry in &entries {
            let (_, id) = entry.catalog_track().unwrap();
            let decision = plan_track("pl1", entry, local.get(id), &[], "2024-06-09T00:00:00Z");
            assert!(matches!(decision, TrackDecision::Keep(_)));
        }
    }

    #[test]
    fn repeated_listing_entries_contribute_once() {
        // The remote may list the same track twice in one playlist; only
        // the first occurrence survives, so the pass neither re-creates the
        // row nor double-counts it in the response.
        let entries = vec![
            remote_entry("t1", "2024-05-01T00:00:00Z"),
            remote_entry("t2", "2024-05-02T00:00:00Z"),
            remote_entry("t1", "2024-05-03T00:00:00Z"),
        ];

        let kept = first_occurrences(&entries);
        let ids: Vec<&str> = kept
            .iter()
            .filter_map(|e| e.catalog_track().map(|(_, id)| id))
            .collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        // The first occurrence's added_at is the one that sticks
        assert_eq!(kept[0].added_at.as_deref(), Some("2024-05-01T00:00:00Z"));
    }

    #[test]
    fn unrepresentable_entries_survive_deduplication() {
        let mut local_file = remote_entry("t9", "2024-05-01T00:00:00Z");
        local_file.is_local = true;
        let entries = vec![local_file.clone(), local_file];

        // Both pass through; planning classifies them as Skip later.
        assert_eq!(first_occurrences(&entries).len(), 2);
    }

    #[test]
    fn response_sorted_by_added_at_descending() {
        let mut rows = vec![
            Track {
                added_at: "2024-01-01T00:00:00Z".to_string(),
                ..local_row("pl1", "old", false)
            },
            Track {
                added_at: "2024-06-01T00:00:00Z".to_string(),
                ..local_row("pl1", "new", false)
            },
            Track {
                added_at: "2024-03-01T00:00:00Z".to_string(),
                ..local_row("pl1", "mid", false)
            },
        ];

        sort_newest_first(&mut rows);

        let order: Vec<&str> = rows.iter().map(|t| t.remote_id.as_str()).collect();
        assert_eq!(order, vec!["new", "mid", "old"]);
    }
}
