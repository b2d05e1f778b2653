use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{integrations, sync};
use crate::state::AppState;

/// Routes mounted at `/integrations`.
///
/// ```text
/// GET, POST           /                 list, create
/// POST                /sync             run a sync request
/// GET, PUT, DELETE    /{id}             get, update, delete
/// GET                 /{id}/sync-logs   audit trail, newest first
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(integrations::list_integrations).post(integrations::create_integration),
        )
        .route("/sync", post(sync::sync_integration))
        .route(
            "/{id}",
            get(integrations::get_integration)
                .put(integrations::update_integration)
                .delete(integrations::delete_integration),
        )
        .route("/{id}/sync-logs", get(integrations::list_sync_logs))
}
