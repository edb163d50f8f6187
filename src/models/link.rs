// SPDX-License-Identifier: MIT

//! Platform link model: the stored credential association between a local
//! user and an external platform account.

use serde::{Deserialize, Serialize};

/// One (user, platform) credential link, stored in Firestore.
///
/// Document ID is `{urlencoded mail}_{platform id}`, which makes the
/// at-most-one-active-link-per-pair invariant structural: a second link
/// for the same pair lands on the same document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformLink {
    /// Owning user's mail
    pub user: String,
    /// Platform registry ID
    pub platform_id: u32,
    /// Profile ID on the remote platform
    pub remote_profile_id: String,
    /// OAuth access token
    pub access_token: String,
    /// OAuth refresh token (stored but never exercised; expiry requires
    /// the user to re-authenticate)
    pub refresh_token: String,
    /// When the access token expires (RFC3339)
    pub token_expires_at: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl PlatformLink {
    /// Firestore document ID for a (user, platform) pair.
    pub fn doc_id(user: &str, platform_id: u32) -> String {
        format!("{}_{}", urlencoding::encode(user), platform_id)
    }
}
