// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod link;
pub mod platform;
pub mod playlist;
pub mod track;
pub mod user;

pub use link::PlatformLink;
pub use platform::Platform;
pub use playlist::Playlist;
pub use track::Track;
pub use user::User;
