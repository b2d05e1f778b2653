//! Handler for `POST /integrations/sync`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ispsync_core::sync::{SyncRequestBody, SyncResponse};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// POST /api/v1/integrations/sync
///
/// Runs one sync request. Answers 200 when the provider call succeeded and
/// 400 when it failed; both carry the same body shape.
///
/// The dispatch runs on its own task so the audit row and status projection
/// are written even when the client goes away. A disconnect cancels the
/// provider call, which is then recorded as a failed attempt.
pub async fn sync_integration(
    auth: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<SyncRequestBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SyncResponse>)> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let caller = auth.caller();
    let cancel = CancellationToken::new();
    let on_disconnect = cancel.clone().drop_guard();

    let dispatcher = state.dispatcher.clone();
    let event_bus = state.event_bus.clone();
    let task = tokio::spawn(async move {
        let report = dispatcher.dispatch(&caller, body, cancel).await?;
        for event in ispsync_events::sync_events(&report, Some(caller.user_id)) {
            event_bus.publish(event);
        }
        Ok::<_, ispsync_core::error::CoreError>(report)
    });

    let report = task
        .await
        .map_err(|e| AppError::InternalError(format!("Sync task failed: {e}")))??;
    on_disconnect.disarm();

    let status = if report.success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(report.response())))
}
