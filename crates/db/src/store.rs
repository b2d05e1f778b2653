//! PostgreSQL implementations of the sync engine's persistence traits.

use async_trait::async_trait;
use sqlx::PgPool;

use ispsync_core::customer::CustomerSyncTarget;
use ispsync_core::integration::{Integration, SyncStatus};
use ispsync_core::sync::access::{AccessGate, Caller, ClaimsAccessGate};
use ispsync_core::sync::store::{
    CustomerStore, IntegrationStore, IntegrationSyncUpdate, NewSyncLogEntry, StoreError,
    SyncLogStore,
};
use ispsync_core::types::{DbId, Timestamp};

use crate::repositories::{CustomerRepo, IntegrationRepo, SyncLogRepo, TenantAccessRepo};

fn db_error(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

/// One pool backing all three sync stores.
#[derive(Debug, Clone)]
pub struct PgSyncStore {
    pool: PgPool,
}

impl PgSyncStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IntegrationStore for PgSyncStore {
    async fn integration_tenant(&self, integration_id: DbId) -> Result<Option<DbId>, StoreError> {
        IntegrationRepo::find_tenant(&self.pool, integration_id)
            .await
            .map_err(db_error)
    }

    async fn find_integration(
        &self,
        tenant_id: DbId,
        integration_id: DbId,
    ) -> Result<Option<Integration>, StoreError> {
        let row = IntegrationRepo::find_by_id(&self.pool, tenant_id, integration_id)
            .await
            .map_err(db_error)?;
        row.map(|r| r.into_domain().map_err(StoreError::Corrupt))
            .transpose()
    }

    async fn record_sync_result(&self, update: &IntegrationSyncUpdate) -> Result<bool, StoreError> {
        let applied = IntegrationRepo::record_sync_result(&self.pool, update)
            .await
            .map_err(db_error)?;
        if !applied {
            tracing::debug!(
                integration_id = %update.integration_id,
                started_at = %update.started_at,
                "Skipped status write, a later attempt already recorded"
            );
        }
        Ok(applied)
    }
}

#[async_trait]
impl CustomerStore for PgSyncStore {
    async fn find_customer(
        &self,
        tenant_id: DbId,
        customer_id: DbId,
    ) -> Result<Option<CustomerSyncTarget>, StoreError> {
        let row = CustomerRepo::find_sync_target(&self.pool, tenant_id, customer_id)
            .await
            .map_err(db_error)?;
        Ok(row.map(CustomerSyncTarget::from))
    }

    async fn record_customer_sync(
        &self,
        customer_id: DbId,
        synced_at: Timestamp,
        status: SyncStatus,
    ) -> Result<(), StoreError> {
        let updated = CustomerRepo::record_network_sync(&self.pool, customer_id, synced_at, status)
            .await
            .map_err(db_error)?;
        if !updated {
            tracing::warn!(%customer_id, "Customer vanished before its sync status was written");
        }
        Ok(())
    }
}

#[async_trait]
impl SyncLogStore for PgSyncStore {
    async fn append(&self, entry: &NewSyncLogEntry) -> Result<DbId, StoreError> {
        SyncLogRepo::append(&self.pool, entry).await.map_err(db_error)
    }
}

/// Token claims combined with a persisted membership row.
///
/// Operators pass on their role alone. Everybody else needs both a matching
/// home tenant in the token and a row in `tenant_memberships`, so a revoked
/// membership takes effect before the token expires.
#[derive(Debug, Clone)]
pub struct PgAccessGate {
    pool: PgPool,
}

impl PgAccessGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessGate for PgAccessGate {
    async fn may_access_tenant(&self, caller: &Caller, tenant_id: DbId) -> Result<bool, StoreError> {
        if caller.is_super_admin() {
            return Ok(true);
        }
        if !ClaimsAccessGate::allows(caller, tenant_id) {
            return Ok(false);
        }
        TenantAccessRepo::is_member(&self.pool, caller.user_id, tenant_id)
            .await
            .map_err(db_error)
    }
}
