// SPDX-License-Identifier: MIT

//! Platform registry CRUD routes.
//!
//! The registry is static metadata about external integrations; the sync
//! engine only ever reads it.

use crate::error::{AppError, Result};
use crate::models::Platform;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/platform/create", post(create_platform))
        .route("/platform/{id}", get(get_platform))
        .route("/platform/{id}", patch(update_platform))
}

#[derive(Deserialize, Validate)]
pub struct CreatePlatformRequest {
    pub id: u32,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(url)]
    pub endpoint_url: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Deserialize, Validate)]
pub struct UpdatePlatformRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(url)]
    pub endpoint_url: Option<String>,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct PlatformResponse {
    pub is_success: bool,
    pub platform: Platform,
}

/// Register a new platform integration.
async fn create_platform(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePlatformRequest>,
) -> Result<(StatusCode, Json<Platform>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if state.db.get_platform(payload.id).await?.is_some() {
        return Err(AppError::BadRequest(format!(
            "platform {} already exists",
            payload.id
        )));
    }

    let now = format_utc_rfc3339(chrono::Utc::now());
    let platform = Platform {
        id: payload.id,
        name: payload.name,
        endpoint_url: payload.endpoint_url,
        logo_url: payload.logo_url,
        description: payload.description,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };
    state.db.upsert_platform(&platform).await?;

    tracing::info!(id = platform.id, name = %platform.name, "Platform registered");

    Ok((StatusCode::CREATED, Json(platform)))
}

/// Get platform information by registry ID.
async fn get_platform(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<PlatformResponse>> {
    let platform = state
        .db
        .get_platform(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Platform {}", id)))?;

    Ok(Json(PlatformResponse {
        is_success: true,
        platform,
    }))
}

/// Update a platform registry row.
async fn update_platform(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(payload): Json<UpdatePlatformRequest>,
) -> Result<Json<PlatformResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut platform = state
        .db
        .get_platform(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Platform {}", id)))?;

    if let Some(name) = payload.name {
        platform.name = name;
    }
    if let Some(endpoint_url) = payload.endpoint_url {
        platform.endpoint_url = endpoint_url;
    }
    if let Some(logo_url) = payload.logo_url {
        platform.logo_url = Some(logo_url);
    }
    if let Some(description) = payload.description {
        platform.description = Some(description);
    }
    if let Some(is_active) = payload.is_active {
        platform.is_active = is_active;
    }
    platform.updated_at = format_utc_rfc3339(chrono::Utc::now());

    state.db.upsert_platform(&platform).await?;

    Ok(Json(PlatformResponse {
        is_success: true,
        platform,
    }))
}
