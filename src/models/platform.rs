// SPDX-License-Identifier: MIT

//! Platform registry model.

use serde::{Deserialize, Serialize};

/// Spotify's registry ID. The sync engine only handles this source type.
pub const SPOTIFY_PLATFORM_ID: u32 = 1;

/// An external catalog integration, stored in Firestore (document ID = id).
///
/// Read-only from the sync engine's perspective; rows are managed through
/// the registry CRUD routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    /// Stable numeric registry ID (also used as document ID)
    pub id: u32,
    /// Display name (e.g. "Spotify")
    pub name: String,
    /// API endpoint base URL
    pub endpoint_url: String,
    /// Logo image URL
    pub logo_url: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Whether the integration is enabled
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}
