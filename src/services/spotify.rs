// SPDX-License-Identifier: MIT

//! Spotify Web API client.
//!
//! Handles:
//! - Authorization-code exchange (HTTP Basic client credentials)
//! - Profile fetch (`GET /me`)
//! - Paginated playlist and track listings
//!
//! Transport failures surface as [`AppError::Fetch`]; upstream rejections
//! keep their status and body as [`AppError::Provider`]. Neither is retried
//! here; retry and backoff policy belongs to the caller.

use crate::error::AppError;
use crate::services::pagination::Page;
use serde::Deserialize;
use std::time::Duration;

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Spotify API client.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    api_base: String,
    accounts_base: String,
    client_id: String,
    client_secret: String,
}

impl SpotifyClient {
    /// Create a new Spotify client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: "https://api.spotify.com/v1".to_string(),
            accounts_base: "https://accounts.spotify.com".to_string(),
            client_id,
            client_secret,
        }
    }

    /// Point the client at different base URLs (tests, mock servers).
    pub fn with_base_urls(mut self, api_base: String, accounts_base: String) -> Self {
        self.api_base = api_base;
        self.accounts_base = accounts_base;
        self
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Authorization codes are single-use, so a non-2xx response is a fatal
    /// exchange failure and is never retried.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenExchangeResponse, AppError> {
        let url = format!("{}/api/token", self.accounts_base);

        let response = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Spotify token exchange failed");
            return Err(AppError::provider(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Fetch(format!("Failed to parse token response: {}", e)))
    }

    /// Get the authenticated user's profile.
    pub async fn get_profile(&self, access_token: &str) -> Result<SpotifyProfile, AppError> {
        let url = format!("{}/me", self.api_base);
        self.get_json(&url, access_token, &[]).await
    }

    /// One page of the authenticated user's playlists.
    pub async fn playlists_page(
        &self,
        access_token: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<SpotifyPlaylistItem>, AppError> {
        let url = format!("{}/me/playlists", self.api_base);
        let paging: Paging<SpotifyPlaylistItem> = self
            .get_json(
                &url,
                access_token,
                &[
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        Ok(paging.into())
    }

    /// One page of a playlist's tracks.
    pub async fn playlist_tracks_page(
        &self,
        access_token: &str,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<SpotifyTrackEntry>, AppError> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_base,
            urlencoding::encode(playlist_id)
        );
        let paging: Paging<SpotifyTrackEntry> = self
            .get_json(
                &url,
                access_token,
                &[
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        Ok(paging.into())
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Spotify rate limit hit (429)");
            }

            return Err(AppError::provider(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Fetch(format!("JSON parse error: {}", e)))
    }
}

/// Token exchange response from Spotify accounts service.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Authenticated user profile (`GET /me`).
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct SpotifyProfile {
    pub id: String,
    pub display_name: Option<String>,
}

/// Spotify paging envelope (`items` + `total`; cursors are ignored since
/// offsets are computed locally).
#[derive(Debug, Clone, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    total: u32,
}

impl<T> From<Paging<T>> for Page<T> {
    fn from(p: Paging<T>) -> Self {
        Page {
            items: p.items,
            total: p.total,
        }
    }
}

/// Playlist summary from `GET /me/playlists`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub external_urls: Option<ExternalUrls>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    pub snapshot_id: String,
    /// Nullable for collaborative playlists
    pub public: Option<bool>,
    pub tracks: TracksRef,
}

impl SpotifyPlaylistItem {
    pub fn external_url(&self) -> Option<&str> {
        self.external_urls
            .as_ref()
            .and_then(|u| u.spotify.as_deref())
    }

    /// Largest image is listed first by the API.
    pub fn image_url(&self) -> Option<&str> {
        self.images.first().map(|i| i.url.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksRef {
    pub total: u32,
}

/// One entry from `GET /playlists/{id}/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrackEntry {
    pub added_at: Option<String>,
    /// True for user-uploaded files with no catalog identity
    #[serde(default)]
    pub is_local: bool,
    /// Null for entries the API cannot resolve anymore
    pub track: Option<SpotifyTrackObject>,
}

impl SpotifyTrackEntry {
    /// The catalog track behind this entry, if it is representable in the
    /// mirror. Local uploads and unresolvable entries have no stable remote
    /// ID and are skipped by reconciliation.
    pub fn catalog_track(&self) -> Option<(&SpotifyTrackObject, &str)> {
        if self.is_local {
            return None;
        }
        let track = self.track.as_ref()?;
        let id = track.id.as_deref()?;
        Some((track, id))
    }
}

/// Full track object inside a playlist entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrackObject {
    /// Null for local files
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbum>,
    #[serde(rename = "type")]
    pub kind: String,
    pub external_ids: Option<ExternalIds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
}

/// Catalog codes attached to a track.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalIds {
    pub isrc: Option<String>,
    pub ean: Option<String>,
    pub upc: Option<String>,
}
