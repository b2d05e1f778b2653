//! Sync context resolution.
//!
//! Turns a validated, authorized [`SyncRequest`] into an immutable
//! [`SyncContext`]: the loaded integration plus, for customer actions, the
//! customer projection the adapter needs. Authorization has already happened
//! by the time the resolver runs.

use std::sync::Arc;

use crate::customer::CustomerSyncTarget;
use crate::error::CoreError;
use crate::integration::Integration;
use crate::sync::access::Caller;
use crate::sync::action::{SyncAction, SyncRequest, TriggerSource};
use crate::sync::store::{CustomerStore, IntegrationStore};
use crate::types::DbId;

/// The capability to invoke, carrying its customer where one is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOperation {
    TestConnection,
    Enable(CustomerSyncTarget),
    Disable(CustomerSyncTarget),
    UpdateSpeed(CustomerSyncTarget),
}

impl SyncOperation {
    pub fn action(&self) -> SyncAction {
        match self {
            Self::TestConnection => SyncAction::TestConnection,
            Self::Enable(_) => SyncAction::Enable,
            Self::Disable(_) => SyncAction::Disable,
            Self::UpdateSpeed(_) => SyncAction::UpdateSpeed,
        }
    }

    pub fn customer(&self) -> Option<&CustomerSyncTarget> {
        match self {
            Self::TestConnection => None,
            Self::Enable(c) | Self::Disable(c) | Self::UpdateSpeed(c) => Some(c),
        }
    }
}

/// Everything one pipeline run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// The tenant the request was authorized for.
    pub tenant_id: DbId,
    pub integration: Integration,
    pub operation: SyncOperation,
    pub caller: Caller,
    pub triggered_by: TriggerSource,
}

impl SyncContext {
    pub fn action(&self) -> SyncAction {
        self.operation.action()
    }

    pub fn customer_id(&self) -> Option<DbId> {
        self.operation.customer().map(|c| c.id)
    }
}

/// Loads the records a sync request refers to.
#[derive(Clone)]
pub struct ContextResolver {
    integrations: Arc<dyn IntegrationStore>,
    customers: Arc<dyn CustomerStore>,
}

impl ContextResolver {
    pub fn new(integrations: Arc<dyn IntegrationStore>, customers: Arc<dyn CustomerStore>) -> Self {
        Self {
            integrations,
            customers,
        }
    }

    /// Resolve `request` within `tenant_id`.
    ///
    /// A missing `customer_id` on a customer action is rejected before any
    /// read. Records that belong to another tenant are reported as not found.
    pub async fn resolve(
        &self,
        tenant_id: DbId,
        caller: &Caller,
        request: &SyncRequest,
    ) -> Result<SyncContext, CoreError> {
        let customer_id = match request.customer_id {
            Some(id) => Some(id),
            None if request.action.requires_customer() => {
                return Err(CoreError::Validation(format!(
                    "customer_id is required for {}",
                    request.action.as_str()
                )))
            }
            None => None,
        };

        let integration = self
            .integrations
            .find_integration(tenant_id, request.integration_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Integration",
                id: request.integration_id,
            })?;

        let operation = match (request.action, customer_id) {
            (SyncAction::TestConnection, _) | (_, None) => SyncOperation::TestConnection,
            (action, Some(customer_id)) => {
                let customer = self
                    .customers
                    .find_customer(tenant_id, customer_id)
                    .await?
                    .ok_or(CoreError::NotFound {
                        entity: "Customer",
                        id: customer_id,
                    })?;
                match action {
                    SyncAction::Enable => SyncOperation::Enable(customer),
                    SyncAction::Disable => SyncOperation::Disable(customer),
                    _ => SyncOperation::UpdateSpeed(customer),
                }
            }
        };

        Ok(SyncContext {
            tenant_id,
            integration,
            operation,
            caller: caller.clone(),
            triggered_by: request.triggered_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::sync::memory::InMemorySyncStore;
    use crate::sync::test_helpers::{customer, mikrotik_integration, staff_caller};

    fn resolver(store: &Arc<InMemorySyncStore>) -> ContextResolver {
        ContextResolver::new(store.clone(), store.clone())
    }

    fn request(action: SyncAction, integration_id: DbId, customer_id: Option<DbId>) -> SyncRequest {
        SyncRequest {
            action,
            integration_id,
            customer_id,
            triggered_by: TriggerSource::Manual,
            tenant_id: None,
        }
    }

    #[tokio::test]
    async fn test_connection_never_reads_customers() {
        let store = Arc::new(InMemorySyncStore::new());
        let integration = mikrotik_integration("203.0.113.5", 8728);
        let tenant = integration.tenant_id;
        store.insert_integration(integration.clone());

        let ctx = resolver(&store)
            .resolve(tenant, &staff_caller(tenant), &request(SyncAction::TestConnection, integration.id, None))
            .await
            .unwrap();

        assert_eq!(ctx.operation, SyncOperation::TestConnection);
        assert_eq!(store.customer_reads(), 0);
    }

    #[tokio::test]
    async fn missing_customer_id_is_rejected_before_reads() {
        let store = Arc::new(InMemorySyncStore::new());
        let integration = mikrotik_integration("203.0.113.5", 8728);
        let tenant = integration.tenant_id;
        store.insert_integration(integration.clone());

        let result = resolver(&store)
            .resolve(tenant, &staff_caller(tenant), &request(SyncAction::Disable, integration.id, None))
            .await;

        assert_matches!(result, Err(CoreError::Validation(msg)) if msg == "customer_id is required for disable");
        assert_eq!(store.integration_reads(), 0);
    }

    #[tokio::test]
    async fn unknown_customer_is_not_found() {
        let store = Arc::new(InMemorySyncStore::new());
        let integration = mikrotik_integration("203.0.113.5", 8728);
        let tenant = integration.tenant_id;
        store.insert_integration(integration.clone());

        let result = resolver(&store)
            .resolve(
                tenant,
                &staff_caller(tenant),
                &request(SyncAction::Enable, integration.id, Some(DbId::new_v4())),
            )
            .await;

        assert_matches!(result, Err(CoreError::NotFound { entity: "Customer", .. }));
    }

    #[tokio::test]
    async fn integration_of_another_tenant_is_not_found() {
        let store = Arc::new(InMemorySyncStore::new());
        let integration = mikrotik_integration("203.0.113.5", 8728);
        store.insert_integration(integration.clone());
        let other_tenant = DbId::new_v4();

        let result = resolver(&store)
            .resolve(
                other_tenant,
                &staff_caller(other_tenant),
                &request(SyncAction::TestConnection, integration.id, None),
            )
            .await;

        assert_matches!(result, Err(CoreError::NotFound { entity: "Integration", .. }));
    }

    #[tokio::test]
    async fn customer_actions_carry_the_customer() {
        let store = Arc::new(InMemorySyncStore::new());
        let integration = mikrotik_integration("203.0.113.5", 8728);
        let tenant = integration.tenant_id;
        let target = customer("Ada", Some("ada01"), Some("10 Mbps"));
        store.insert_integration(integration.clone());
        store.insert_customer(tenant, target.clone());

        let ctx = resolver(&store)
            .resolve(
                tenant,
                &staff_caller(tenant),
                &request(SyncAction::UpdateSpeed, integration.id, Some(target.id)),
            )
            .await
            .unwrap();

        assert_eq!(ctx.action(), SyncAction::UpdateSpeed);
        assert_eq!(ctx.operation.customer(), Some(&target));
        assert_eq!(ctx.customer_id(), Some(target.id));
    }
}
