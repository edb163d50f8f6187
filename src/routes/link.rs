// SPDX-License-Identifier: MIT

//! Spotify account-link routes (OAuth authorization-code flow).
//!
//! `authorize` runs behind the session middleware and encodes the linking
//! user's mail into an HMAC-signed state parameter. `callback` is public
//! (the provider redirects the browser there) and recovers the user from
//! the verified state before exchanging the code.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    routing::get,
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::platform::SPOTIFY_PLATFORM_ID;
use crate::services::spotify::SpotifyProfile;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Scopes needed to read the user's playlists.
const SPOTIFY_SCOPES: &str = "playlist-read-private playlist-read-collaborative user-read-private";

/// Public routes (the provider calls back without a session).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/platform/spotify/callback", get(link_callback))
}

/// Routes behind the session middleware.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/platform/spotify/authorize", get(authorize))
        .route("/platform/spotify/profile", get(get_profile))
}

#[derive(Deserialize)]
pub struct AuthorizeParams {
    /// Frontend URL to redirect back to after linking completes.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start the link flow - redirect to Spotify authorization.
async fn authorize(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<AuthorizeParams>,
    headers: HeaderMap,
) -> Result<Redirect> {
    let frontend_url = params
        .redirect_uri
        .unwrap_or_else(|| state.config.frontend_url.clone());

    let oauth_state = sign_state(&user.mail, &frontend_url, &state.config.oauth_state_key)?;
    let callback_url = callback_url_from_headers(&headers);

    let auth_url = format!(
        "https://accounts.spotify.com/authorize?\
         client_id={}&\
         response_type=code&\
         redirect_uri={}&\
         scope={}&\
         state={}",
        state.config.spotify_client_id,
        urlencoding::encode(&callback_url),
        urlencoding::encode(SPOTIFY_SCOPES),
        oauth_state
    );

    tracing::info!(
        mail = %user.mail,
        frontend_url = %frontend_url,
        "Starting link flow, redirecting to Spotify"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// Spotify callback - exchange code, persist the link, redirect home.
async fn link_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let (mail, frontend_url) =
        match verify_and_decode_state(&params.state, &state.config.oauth_state_key) {
            Some(decoded) => decoded,
            None => {
                tracing::warn!("Invalid or tampered state parameter on link callback");
                return Err(AppError::BadRequest("invalid state parameter".to_string()));
            }
        };

    if let Some(error) = params.error {
        tracing::warn!(error = %error, mail = %mail, "OAuth error from Spotify");
        let redirect = format!("{}?error={}", frontend_url, urlencoding::encode(&error));
        return Ok(Redirect::temporary(&redirect));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    // The token exchange validates redirect_uri against the one used in
    // the authorize redirect; both derive from the request host.
    let redirect_uri = callback_url_from_headers(&headers);

    let link = state
        .broker
        .link_account(&mail, SPOTIFY_PLATFORM_ID, &code, &redirect_uri)
        .await?;

    tracing::info!(
        mail = %mail,
        remote_profile = %link.remote_profile_id,
        "Spotify account linked"
    );

    let redirect = format!("{}?linked=spotify", frontend_url);
    Ok(Redirect::temporary(&redirect))
}

/// Fetch the linked Spotify profile for the authenticated user.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SpotifyProfile>> {
    let token = state
        .broker
        .get_valid_token(&user.mail, SPOTIFY_PLATFORM_ID)
        .await?;

    let profile = state.spotify.get_profile(&token).await?;
    Ok(Json(profile))
}

/// Derive the callback URL from the request's Host header.
fn callback_url_from_headers(headers: &HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            std::env::var("API_HOST").unwrap_or_else(|_| "localhost:8080".to_string())
        });

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}/platform/spotify/callback", scheme, host)
}

/// Sign `mail|frontend_url|timestamp` into an opaque state parameter.
fn sign_state(mail: &str, frontend_url: &str, secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{}|{}|{:x}", mail, frontend_url, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and decode (mail, frontend_url) from the
/// OAuth state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<(String, String)> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "mail|frontend_url|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(4, '|').collect();
    if parts.len() != 4 {
        return None;
    }

    let mail = parts[0];
    let frontend_url = parts[1];
    let timestamp_hex = parts[2];
    let signature_hex = parts[3];

    let payload = format!("{}|{}|{}", mail, frontend_url, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some((mail.to_string(), frontend_url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trip() {
        let secret = b"secret_key";
        let encoded = sign_state("a@example.com", "https://example.com", secret).unwrap();

        let decoded = verify_and_decode_state(&encoded, secret);
        assert_eq!(
            decoded,
            Some(("a@example.com".to_string(), "https://example.com".to_string()))
        );
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let secret = b"secret_key";
        let payload = "a@example.com|https://example.com|1234abcd|deadbeef";
        let encoded = URL_SAFE_NO_PAD.encode(payload.as_bytes());

        assert_eq!(verify_and_decode_state(&encoded, secret), None);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let encoded = sign_state("a@example.com", "https://example.com", b"secret_key").unwrap();
        assert_eq!(verify_and_decode_state(&encoded, b"wrong_key"), None);
    }

    #[test]
    fn malformed_state_is_rejected() {
        let secret = b"secret_key";
        let encoded = URL_SAFE_NO_PAD.encode("only|two".as_bytes());
        assert_eq!(verify_and_decode_state(&encoded, secret), None);

        assert_eq!(verify_and_decode_state("not-base64!!!", secret), None);
    }
}
