use serde::Serialize;
use sqlx::FromRow;

use ispsync_core::types::{DbId, Timestamp};

/// A row from the append-only `integration_sync_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SyncLogRow {
    pub id: DbId,
    pub tenant_id: DbId,
    pub integration_id: DbId,
    pub customer_id: Option<DbId>,
    pub provider_type: String,
    pub action: String,
    pub status: String,
    pub request_snapshot: serde_json::Value,
    pub response_snapshot: serde_json::Value,
    pub error_message: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub duration_ms: i64,
    pub triggered_by: String,
    pub triggered_by_user: Option<DbId>,
    pub created_at: Timestamp,
}
