//! Persistence seams of the sync pipeline.
//!
//! The `db` crate implements these traits over PostgreSQL; the `memory`
//! module (feature `test-util`) implements them in memory. Record reads are tenant-scoped: a record that
//! exists under another tenant is reported as absent. Only
//! [`IntegrationStore::integration_tenant`] crosses tenants, so the access
//! gate can be asked about the owner.

use async_trait::async_trait;
use serde::Serialize;

use crate::customer::CustomerSyncTarget;
use crate::error::CoreError;
use crate::integration::{Integration, ProviderType, SyncStatus};
use crate::sync::action::{SyncAction, TriggerSource};
use crate::types::{DbId, Timestamp};

/// Failure reported by a store implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be mapped onto the domain model.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

/// Terminal status write for an integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationSyncUpdate {
    pub integration_id: DbId,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub status: SyncStatus,
}

/// One audit row, as handed to [`SyncLogStore::append`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSyncLogEntry {
    pub tenant_id: DbId,
    pub integration_id: DbId,
    pub customer_id: Option<DbId>,
    pub provider_type: ProviderType,
    pub action: SyncAction,
    /// `Success` or `Failed`; logs are only written after completion.
    pub status: SyncStatus,
    pub request_snapshot: serde_json::Value,
    pub response_snapshot: serde_json::Value,
    /// Present iff `status` is `Failed`.
    pub error_message: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub duration_ms: i64,
    pub triggered_by: TriggerSource,
    pub triggered_by_user: Option<DbId>,
}

#[async_trait]
pub trait IntegrationStore: Send + Sync {
    /// Owning tenant of an integration, reading nothing else.
    async fn integration_tenant(&self, integration_id: DbId) -> Result<Option<DbId>, StoreError>;

    /// Load an integration belonging to `tenant_id`.
    async fn find_integration(
        &self,
        tenant_id: DbId,
        integration_id: DbId,
    ) -> Result<Option<Integration>, StoreError>;

    /// Write the last-sync fields.
    ///
    /// Implementations must skip the write when the stored
    /// `last_sync_started_at` is later than `update.started_at`, and return
    /// whether the write was applied.
    async fn record_sync_result(&self, update: &IntegrationSyncUpdate) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Load the sync view of a customer belonging to `tenant_id`.
    async fn find_customer(
        &self,
        tenant_id: DbId,
        customer_id: DbId,
    ) -> Result<Option<CustomerSyncTarget>, StoreError>;

    /// Write the customer's network sync projection.
    async fn record_customer_sync(
        &self,
        customer_id: DbId,
        synced_at: Timestamp,
        status: SyncStatus,
    ) -> Result<(), StoreError>;
}

/// Append-only sink for sync audit rows.
#[async_trait]
pub trait SyncLogStore: Send + Sync {
    async fn append(&self, entry: &NewSyncLogEntry) -> Result<DbId, StoreError>;
}
