// SPDX-License-Identifier: MIT

//! Mirrored playlist track model.

use serde::{Deserialize, Serialize};

/// One track instance inside one mirrored playlist, stored in Firestore.
///
/// Keyed by (playlist, remote track ID): the same recording may appear in
/// several playlists with independent override state. Document ID is
/// `{playlist remote id}_{track remote id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Remote ID of the parent playlist
    pub playlist_id: String,
    /// Remote track ID
    pub remote_id: String,
    pub name: String,
    /// Artist names, in remote order
    pub artists: Vec<String>,
    pub album_name: String,
    /// Remote object type ("track", "episode", ...)
    pub kind: String,
    pub isrc: Option<String>,
    pub ean: Option<String>,
    pub upc: Option<String>,
    /// User-controlled override: excluded from downstream sync targets.
    /// Never written by the reconciliation path except at creation.
    pub disabled: bool,
    /// When the track was added to the playlist (remote-supplied, RFC3339)
    pub added_at: String,
    pub updated_at: String,
}

impl Track {
    /// Firestore document ID for a (playlist, track) pair.
    pub fn doc_id(playlist_id: &str, remote_id: &str) -> String {
        format!("{}_{}", playlist_id, remote_id)
    }
}
