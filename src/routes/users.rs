// SPDX-License-Identifier: MIT

//! User account routes: registration, login, password reset.

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser};
use crate::models::User;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use validator::Validate;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Public routes (no session required).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/user/create", post(create_user))
}

/// Routes behind the session middleware.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/user/reset-password", post(reset_password))
}

// ─── Requests / Responses ────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub mail: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub mail: String,
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct ResetPasswordRequest {
    /// Must be set for the reset to be applied
    #[serde(default)]
    pub force: bool,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub mail: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub is_success: bool,
    pub token: String,
}

// ─── Handlers ────────────────────────────────────────────────

/// Register a new user account.
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if state.db.get_user(&payload.mail).await?.is_some() {
        return Err(AppError::BadRequest("account already exists".to_string()));
    }

    let user = User {
        mail: payload.mail,
        password_hash: hash_password(&payload.password)?,
        role: payload.role,
        created_at: format_utc_rfc3339(chrono::Utc::now()),
    };
    state.db.upsert_user(&user).await?;

    tracing::info!(mail = %user.mail, "User account created");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            mail: user.mail,
            role: user.role,
            created_at: user.created_at,
        }),
    ))
}

/// Log in with mail and password, returning a session JWT.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // One failure path for unknown mail and wrong password alike.
    let user = state
        .db
        .get_user(&payload.mail)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = create_jwt(&user.mail, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok(Json(LoginResponse {
        is_success: true,
        token,
    }))
}

/// Change the authenticated user's password.
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<UserResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !payload.force {
        return Err(AppError::BadRequest(
            "password reset requires force=true".to_string(),
        ));
    }

    let mut account = state
        .db
        .get_user(&user.mail)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", user.mail)))?;

    account.password_hash = hash_password(&payload.password)?;
    state.db.upsert_user(&account).await?;

    tracing::info!(mail = %account.mail, "Password reset");

    Ok(Json(UserResponse {
        mail: account.mail,
        role: account.role,
        created_at: account.created_at,
    }))
}

// ─── Password hashing (PBKDF2-HMAC-SHA256) ───────────────────

/// Hash a password with a fresh random salt.
///
/// Encoded as `pbkdf2-sha256$iterations$salt_hex$hash_hex`.
fn hash_password(password: &str) -> Result<String> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("RNG failure")))?;

    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid PBKDF2 iteration count")))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(PBKDF2_ALG, iterations, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "pbkdf2-sha256${}${}${}",
        PBKDF2_ITERATIONS,
        hex::encode(salt),
        hex::encode(hash)
    ))
}

/// Verify a password against a stored hash (constant-time via ring).
fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    if parts.len() != 4 || parts[0] != "pbkdf2-sha256" {
        return false;
    }

    let iterations = match parts[1].parse::<u32>().ok().and_then(NonZeroU32::new) {
        Some(n) => n,
        None => return false,
    };
    let salt = match hex::decode(parts[2]) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let hash = match hex::decode(parts[3]) {
        Ok(h) => h,
        Err(_) => return false,
    };

    pbkdf2::verify(PBKDF2_ALG, iterations, &salt, password.as_bytes(), &hash).is_ok()
}
