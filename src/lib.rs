// SPDX-License-Identifier: MIT

//! Tunelink: link user accounts to external music platforms and mirror
//! their playlists locally.
//!
//! This crate provides the backend API for the platform synchronization
//! engine: OAuth token lifecycle, exhaustive paginated retrieval from the
//! remote catalog, and reconciliation of remote data against the local
//! mirror while preserving user overrides.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::MirrorDb;
use services::{SpotifyClient, SyncService, TokenBroker};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: MirrorDb,
    pub spotify: SpotifyClient,
    pub broker: TokenBroker,
    pub sync: SyncService,
}
