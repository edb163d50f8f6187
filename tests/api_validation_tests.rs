// SPDX-License-Identifier: MIT

//! API input validation tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_create_user_rejects_invalid_mail() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/user/create")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"mail": "not-a-mail-address", "password": "longenough"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_user_rejects_short_password() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/user/create")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"mail": "user@example.com", "password": "short"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_user_rejects_missing_fields() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/user/create")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"mail": "user@example.com"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    // Missing required field fails JSON deserialization
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_login_rejects_invalid_mail() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"mail": "nope", "password": "whatever1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_disabled_rejects_empty_batch() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user@example.com", &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/playlisttracks/pl1/tracks/disabled")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"track_ids": [], "disabled": true}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_platform_rejects_bad_url() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("admin@example.com", &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/platform/create")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"id": 1, "name": "Spotify", "endpoint_url": "not a url"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_password_requires_force() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user@example.com", &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/user/reset-password")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"password": "newpassword1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    // force defaults to false, which the handler rejects
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
