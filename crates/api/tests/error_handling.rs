//! Tests for `AppError` to HTTP response mapping. No server needed: they
//! call `IntoResponse` directly.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use ispsync_api::error::AppError;
use ispsync_core::error::CoreError;
use ispsync_core::sync::store::StoreError;
use ispsync_core::types::DbId;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let id = DbId::new_v4();
    let err = AppError::Core(CoreError::NotFound {
        entity: "Integration",
        id,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], format!("Integration with id {id} not found"));
}

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("integration_id is required".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "integration_id is required");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("Failed to parse the request body as JSON".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unauthorized_and_forbidden_keep_their_messages() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Unauthorized("Invalid or expired token".into())))
            .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid or expired token");

    let (status, json) = error_to_response(AppError::Core(CoreError::Forbidden(
        "You do not have access to this tenant".into(),
    )))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
}

#[tokio::test]
async fn store_failure_is_sanitized_to_500() {
    let core: CoreError = StoreError::Database("password authentication failed for user ispsync".into()).into();

    let (status, json) = error_to_response(AppError::Core(core)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
    assert!(!json.to_string().contains("password"));
}

#[tokio::test]
async fn internal_error_does_not_leak_details() {
    let (status, json) =
        error_to_response(AppError::InternalError("Sync task failed: panicked".into())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!json.to_string().contains("panicked"));
}

#[tokio::test]
async fn missing_row_maps_to_404() {
    let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}
