pub mod health;
pub mod integrations;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /integrations                       list, create
/// /integrations/sync                  sync request (POST)
/// /integrations/{id}                  get, update, delete
/// /integrations/{id}/sync-logs        sync audit trail
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/integrations", integrations::router())
}
