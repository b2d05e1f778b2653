//! Reads and sync writes on `customers`.

use sqlx::PgPool;

use ispsync_core::integration::SyncStatus;
use ispsync_core::types::{DbId, Timestamp};

use crate::models::customer::CustomerSyncRow;

pub struct CustomerRepo;

impl CustomerRepo {
    /// The customer with its package name and speed label.
    pub async fn find_sync_target(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<CustomerSyncRow>, sqlx::Error> {
        sqlx::query_as::<_, CustomerSyncRow>(
            "SELECT c.id, c.name, c.network_username, c.connection_status,
                    p.name AS package_name, p.speed_label
             FROM customers c
             LEFT JOIN packages p ON p.id = c.package_id
             WHERE c.id = $1 AND c.tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn record_network_sync(
        pool: &PgPool,
        id: DbId,
        synced_at: Timestamp,
        status: SyncStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE customers SET last_network_sync_at = $2, network_sync_status = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(synced_at)
        .bind(status.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
