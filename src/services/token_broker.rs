// SPDX-License-Identifier: MIT

//! Token lifecycle for platform links.
//!
//! The broker owns the authorization-code exchange and the validity check
//! for stored access tokens. There is no silent refresh: an expired token
//! surfaces [`AppError::TokenExpired`] and the user must re-authenticate.
//! The refresh token is persisted with the link for a future refresh flow.

use crate::db::MirrorDb;
use crate::error::AppError;
use crate::models::PlatformLink;
use crate::services::spotify::SpotifyClient;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Duration, Utc};

/// Manages platform link creation and token validity.
#[derive(Clone)]
pub struct TokenBroker {
    client: SpotifyClient,
    db: MirrorDb,
}

impl TokenBroker {
    pub fn new(client: SpotifyClient, db: MirrorDb) -> Self {
        Self { client, db }
    }

    /// Exchange an authorization code and persist the resulting link.
    ///
    /// Any prior link for the (user, platform) pair is deleted first, so at
    /// most one link survives. The remote profile is fetched with the new
    /// token to pin the link to a remote account.
    pub async fn link_account(
        &self,
        user: &str,
        platform_id: u32,
        code: &str,
        redirect_uri: &str,
    ) -> Result<PlatformLink, AppError> {
        let tokens = self.client.exchange_code(code, redirect_uri).await?;
        let profile = self.client.get_profile(&tokens.access_token).await?;

        let superseded = self.db.delete_links(user, platform_id).await?;
        if superseded > 0 {
            tracing::info!(user, platform_id, superseded, "Superseded prior links");
        }

        let now = Utc::now();
        let link = PlatformLink {
            user: user.to_string(),
            platform_id,
            remote_profile_id: profile.id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_expires_at: format_utc_rfc3339(now + Duration::seconds(tokens.expires_in)),
            is_active: true,
            created_at: format_utc_rfc3339(now),
            updated_at: format_utc_rfc3339(now),
        };

        self.db.set_link(&link).await?;

        tracing::info!(
            user,
            platform_id,
            remote_profile = %link.remote_profile_id,
            "Platform link created"
        );

        Ok(link)
    }

    /// Get the currently valid access token for a (user, platform) pair.
    ///
    /// Fails with `LinkNotFound` when the user never linked the platform and
    /// with `TokenExpired` once the stored token has lapsed. Callers must
    /// treat both as non-retryable without re-authentication.
    pub async fn get_valid_token(
        &self,
        user: &str,
        platform_id: u32,
    ) -> Result<String, AppError> {
        let link = self
            .db
            .get_link(user, platform_id)
            .await?
            .ok_or_else(|| {
                AppError::LinkNotFound(format!("user {} has no link to platform {}", user, platform_id))
            })?;

        if token_is_expired(&link, Utc::now()) {
            tracing::info!(user, platform_id, "Stored access token expired");
            return Err(AppError::TokenExpired);
        }

        Ok(link.access_token)
    }
}

/// Whether a link's access token has lapsed at `now`.
///
/// An unparseable expiry counts as expired, forcing re-authentication
/// rather than sending a token of unknown age upstream.
pub fn token_is_expired(link: &PlatformLink, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(&link.token_expires_at) {
        Ok(expires_at) => now >= expires_at.with_timezone(&Utc),
        Err(_) => true,
    }
}
