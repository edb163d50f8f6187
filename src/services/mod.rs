// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod pagination;
pub mod spotify;
pub mod sync;
pub mod token_broker;

pub use spotify::SpotifyClient;
pub use sync::{SyncService, TrackSyncResult};
pub use token_broker::TokenBroker;
