//! Repository for the append-only `integration_sync_logs` table.

use sqlx::PgPool;

use ispsync_core::sync::store::NewSyncLogEntry;
use ispsync_core::types::DbId;

use crate::models::sync_log::SyncLogRow;

const COLUMNS: &str = "id, tenant_id, integration_id, customer_id, provider_type, action, \
    status, request_snapshot, response_snapshot, error_message, started_at, completed_at, \
    duration_ms, triggered_by, triggered_by_user, created_at";

/// Insert and read sync log rows. Rows are never updated.
pub struct SyncLogRepo;

impl SyncLogRepo {
    pub async fn append(pool: &PgPool, entry: &NewSyncLogEntry) -> Result<DbId, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO integration_sync_logs
                (tenant_id, integration_id, customer_id, provider_type, action, status,
                 request_snapshot, response_snapshot, error_message, started_at, completed_at,
                 duration_ms, triggered_by, triggered_by_user)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING id",
        )
        .bind(entry.tenant_id)
        .bind(entry.integration_id)
        .bind(entry.customer_id)
        .bind(entry.provider_type.as_str())
        .bind(entry.action.as_str())
        .bind(entry.status.as_str())
        .bind(&entry.request_snapshot)
        .bind(&entry.response_snapshot)
        .bind(&entry.error_message)
        .bind(entry.started_at)
        .bind(entry.completed_at)
        .bind(entry.duration_ms)
        .bind(entry.triggered_by.as_str())
        .bind(entry.triggered_by_user)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// Newest first.
    pub async fn list_for_integration(
        pool: &PgPool,
        tenant_id: DbId,
        integration_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SyncLogRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM integration_sync_logs
             WHERE integration_id = $1 AND tenant_id = $2
             ORDER BY started_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, SyncLogRow>(&query)
            .bind(integration_id)
            .bind(tenant_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
