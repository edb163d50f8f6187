// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::MirrorDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PLATFORMS: &str = "platforms";
    pub const PLATFORM_LINKS: &str = "platform_links";
    pub const PLAYLISTS: &str = "playlists";
    /// Per-playlist track mirror rows (keyed by `{playlist}_{track}`)
    pub const PLAYLIST_TRACKS: &str = "playlist_tracks";
}
