//! In-memory implementation of the sync store traits.
//!
//! Backs pipeline tests; compiled only for tests and the `test-util`
//! feature. Counts reads so callers can assert that a rejected request never
//! touched a table, and can be told to fail writes to exercise the
//! best-effort paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::customer::CustomerSyncTarget;
use crate::integration::{Integration, SyncStatus};
use crate::sync::store::{
    CustomerStore, IntegrationStore, IntegrationSyncUpdate, NewSyncLogEntry, StoreError,
    SyncLogStore,
};
use crate::types::{DbId, Timestamp};

/// Network sync fields of a stored customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerSyncState {
    pub last_network_sync_at: Option<Timestamp>,
    pub network_sync_status: Option<SyncStatus>,
}

struct StoredCustomer {
    tenant_id: DbId,
    target: CustomerSyncTarget,
    sync: CustomerSyncState,
}

#[derive(Default)]
struct Tables {
    integrations: HashMap<DbId, Integration>,
    customers: HashMap<DbId, StoredCustomer>,
    logs: Vec<(DbId, NewSyncLogEntry)>,
}

#[derive(Default)]
pub struct InMemorySyncStore {
    tables: Mutex<Tables>,
    tenant_lookups: AtomicUsize,
    integration_reads: AtomicUsize,
    customer_reads: AtomicUsize,
    fail_log_writes: AtomicBool,
    fail_status_writes: AtomicBool,
}

impl InMemorySyncStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_integration(&self, integration: Integration) {
        self.tables().integrations.insert(integration.id, integration);
    }

    pub fn insert_customer(&self, tenant_id: DbId, target: CustomerSyncTarget) {
        self.tables().customers.insert(
            target.id,
            StoredCustomer {
                tenant_id,
                target,
                sync: CustomerSyncState::default(),
            },
        );
    }

    pub fn integration(&self, id: DbId) -> Option<Integration> {
        self.tables().integrations.get(&id).cloned()
    }

    pub fn customer_sync(&self, id: DbId) -> Option<CustomerSyncState> {
        self.tables().customers.get(&id).map(|c| c.sync.clone())
    }

    /// Every appended log row, oldest first.
    pub fn logs(&self) -> Vec<NewSyncLogEntry> {
        self.tables().logs.iter().map(|(_, entry)| entry.clone()).collect()
    }

    pub fn tenant_lookups(&self) -> usize {
        self.tenant_lookups.load(Ordering::SeqCst)
    }

    pub fn integration_reads(&self) -> usize {
        self.integration_reads.load(Ordering::SeqCst)
    }

    pub fn customer_reads(&self) -> usize {
        self.customer_reads.load(Ordering::SeqCst)
    }

    pub fn fail_log_writes(&self, fail: bool) {
        self.fail_log_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    fn check_status_write(&self) -> Result<(), StoreError> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("status write rejected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl IntegrationStore for InMemorySyncStore {
    async fn integration_tenant(&self, integration_id: DbId) -> Result<Option<DbId>, StoreError> {
        self.tenant_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables().integrations.get(&integration_id).map(|i| i.tenant_id))
    }

    async fn find_integration(
        &self,
        tenant_id: DbId,
        integration_id: DbId,
    ) -> Result<Option<Integration>, StoreError> {
        self.integration_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tables()
            .integrations
            .get(&integration_id)
            .filter(|i| i.tenant_id == tenant_id)
            .cloned())
    }

    async fn record_sync_result(&self, update: &IntegrationSyncUpdate) -> Result<bool, StoreError> {
        self.check_status_write()?;
        let mut tables = self.tables();
        let Some(integration) = tables.integrations.get_mut(&update.integration_id) else {
            return Ok(false);
        };
        if integration
            .last_sync_started_at
            .is_some_and(|projected| projected > update.started_at)
        {
            return Ok(false);
        }
        integration.last_sync_started_at = Some(update.started_at);
        integration.last_sync_at = Some(update.completed_at);
        integration.last_sync_status = Some(update.status);
        Ok(true)
    }
}

#[async_trait]
impl CustomerStore for InMemorySyncStore {
    async fn find_customer(
        &self,
        tenant_id: DbId,
        customer_id: DbId,
    ) -> Result<Option<CustomerSyncTarget>, StoreError> {
        self.customer_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tables()
            .customers
            .get(&customer_id)
            .filter(|c| c.tenant_id == tenant_id)
            .map(|c| c.target.clone()))
    }

    async fn record_customer_sync(
        &self,
        customer_id: DbId,
        synced_at: Timestamp,
        status: SyncStatus,
    ) -> Result<(), StoreError> {
        self.check_status_write()?;
        if let Some(customer) = self.tables().customers.get_mut(&customer_id) {
            customer.sync = CustomerSyncState {
                last_network_sync_at: Some(synced_at),
                network_sync_status: Some(status),
            };
        }
        Ok(())
    }
}

#[async_trait]
impl SyncLogStore for InMemorySyncStore {
    async fn append(&self, entry: &NewSyncLogEntry) -> Result<DbId, StoreError> {
        if self.fail_log_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("log write rejected".into()));
        }
        let id = DbId::now_v7();
        self.tables().logs.push((id, entry.clone()));
        Ok(id)
    }
}
