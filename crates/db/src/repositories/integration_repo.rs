//! Repository for the `integrations` table.

use sqlx::PgPool;

use ispsync_core::sync::store::IntegrationSyncUpdate;
use ispsync_core::types::DbId;

use crate::models::integration::{CredentialChange, IntegrationChanges, IntegrationRow, NewIntegration};

/// Column list for `integrations` queries.
const COLUMNS: &str = "id, tenant_id, name, provider_type, host, port, username, \
    encrypted_credentials, settings, sync_mode, sync_interval_minutes, is_enabled, \
    last_sync_at, last_sync_started_at, last_sync_status, created_at, updated_at";

/// Provides tenant-scoped CRUD plus the sync status write.
pub struct IntegrationRepo;

impl IntegrationRepo {
    pub async fn create(pool: &PgPool, input: &NewIntegration) -> Result<IntegrationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO integrations
                (tenant_id, name, provider_type, host, port, username, encrypted_credentials,
                 settings, sync_mode, sync_interval_minutes, is_enabled)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntegrationRow>(&query)
            .bind(input.tenant_id)
            .bind(&input.name)
            .bind(input.config.provider_type().as_str())
            .bind(&input.host)
            .bind(input.port.map(i32::from))
            .bind(&input.username)
            .bind(&input.encrypted_credentials)
            .bind(input.config.settings_json())
            .bind(input.sync_mode.as_str())
            .bind(input.sync_interval_minutes)
            .bind(input.is_enabled)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<IntegrationRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM integrations WHERE id = $1 AND tenant_id = $2");
        sqlx::query_as::<_, IntegrationRow>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    /// Owning tenant of an integration, across all tenants.
    pub async fn find_tenant(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT tenant_id FROM integrations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, tenant_id: DbId) -> Result<Vec<IntegrationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM integrations WHERE tenant_id = $1 ORDER BY name, created_at"
        );
        sqlx::query_as::<_, IntegrationRow>(&query)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    /// Replace the editable columns. The provider type never changes after
    /// creation; a config of another type matches no row.
    pub async fn update(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
        input: &IntegrationChanges,
    ) -> Result<Option<IntegrationRow>, sqlx::Error> {
        let (replace_credentials, credentials) = match &input.credentials {
            CredentialChange::Keep => (false, None),
            CredentialChange::Replace(sealed) => (true, Some(sealed.as_slice())),
            CredentialChange::Clear => (true, None),
        };
        let query = format!(
            "UPDATE integrations SET
                name = $3,
                host = $4,
                port = $5,
                username = $6,
                encrypted_credentials = CASE WHEN $7 THEN $8 ELSE encrypted_credentials END,
                settings = $9,
                sync_mode = $10,
                sync_interval_minutes = $11,
                is_enabled = $12,
                updated_at = NOW()
             WHERE id = $1 AND tenant_id = $2 AND provider_type = $13
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntegrationRow>(&query)
            .bind(id)
            .bind(tenant_id)
            .bind(&input.name)
            .bind(&input.host)
            .bind(input.port.map(i32::from))
            .bind(&input.username)
            .bind(replace_credentials)
            .bind(credentials)
            .bind(input.config.settings_json())
            .bind(input.sync_mode.as_str())
            .bind(input.sync_interval_minutes)
            .bind(input.is_enabled)
            .bind(input.config.provider_type().as_str())
            .fetch_optional(pool)
            .await
    }

    /// Delete an integration and, by cascade, its sync log.
    pub async fn delete(pool: &PgPool, tenant_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM integrations WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write the last-sync columns unless a later-started attempt already
    /// wrote them. Returns whether the row was updated.
    pub async fn record_sync_result(
        pool: &PgPool,
        update: &IntegrationSyncUpdate,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE integrations SET
                last_sync_at = $2,
                last_sync_started_at = $3,
                last_sync_status = $4
             WHERE id = $1
               AND (last_sync_started_at IS NULL OR last_sync_started_at <= $3)",
        )
        .bind(update.integration_id)
        .bind(update.completed_at)
        .bind(update.started_at)
        .bind(update.status.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
