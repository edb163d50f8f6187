// SPDX-License-Identifier: MIT

//! Mirrored playlist model.

use serde::{Deserialize, Serialize};

/// Local mirror of a remote playlist, stored in Firestore.
///
/// The remote playlist ID is the natural key (and the document ID), so all
/// users syncing the same remote playlist share one mirror row. The owner
/// is fixed by whichever account first synced the row and is never
/// reassigned on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    /// Owning user's mail (first writer wins)
    pub user: String,
    /// Platform registry ID
    pub platform_id: u32,
    /// Remote playlist ID (also the document ID)
    pub remote_id: String,
    pub name: String,
    pub description: Option<String>,
    pub external_url: Option<String>,
    pub image_url: Option<String>,
    /// Remote change-token; a new value means the remote content changed
    pub snapshot_id: String,
    pub is_public: bool,
    /// Track count declared by the remote listing
    pub tracks_total: u32,
    pub created_at: String,
    pub updated_at: String,
}
