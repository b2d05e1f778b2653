//! Sync dispatcher: the request entry point.
//!
//! Pipeline per request: parse, owner lookup and access gate, context
//! resolution, execution, then audit log and status projection. Request-level errors abort before
//! any provider call or log write; everything after execution is best
//! effort and never changes the outcome.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::integration::ProviderType;
use crate::sync::access::{check_tenant_access, AccessGate, Caller};
use crate::sync::action::{SyncAction, SyncRequest, SyncRequestBody, TriggerSource};
use crate::sync::audit::AuditLogger;
use crate::sync::context::ContextResolver;
use crate::sync::executor::{Execution, SyncExecutor};
use crate::sync::projector::{PersistenceFailure, PersistenceStage, StatusProjector};
use crate::sync::store::{CustomerStore, IntegrationStore, SyncLogStore};
use crate::types::DbId;

/// The store handles a dispatcher needs.
#[derive(Clone)]
pub struct SyncStores {
    pub integrations: Arc<dyn IntegrationStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub logs: Arc<dyn SyncLogStore>,
}

impl SyncStores {
    /// Use one backend for all three roles.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: IntegrationStore + CustomerStore + SyncLogStore + 'static,
    {
        Self {
            integrations: store.clone(),
            customers: store.clone(),
            logs: store,
        }
    }
}

/// Caller-facing response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub response_time_ms: i64,
}

/// Everything known about one completed dispatch.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub tenant_id: DbId,
    pub integration_id: DbId,
    pub integration_name: String,
    pub provider_type: ProviderType,
    pub action: SyncAction,
    pub customer_id: Option<DbId>,
    pub triggered_by: TriggerSource,
    pub execution: Execution,
    /// Id of the audit row, when it was written.
    pub log_id: Option<DbId>,
    pub persistence_failures: Vec<PersistenceFailure>,
}

impl SyncReport {
    pub fn success(&self) -> bool {
        self.execution.outcome.success
    }

    pub fn response(&self) -> SyncResponse {
        let outcome = &self.execution.outcome;
        SyncResponse {
            success: outcome.success,
            message: outcome.message.clone(),
            data: outcome.data.clone(),
            response_time_ms: self.execution.duration_ms,
        }
    }
}

pub struct SyncDispatcher {
    gate: Arc<dyn AccessGate>,
    integrations: Arc<dyn IntegrationStore>,
    resolver: ContextResolver,
    executor: SyncExecutor,
    audit: AuditLogger,
    projector: StatusProjector,
}

impl SyncDispatcher {
    pub fn new(gate: Arc<dyn AccessGate>, stores: SyncStores, executor: SyncExecutor) -> Self {
        Self {
            gate,
            integrations: stores.integrations.clone(),
            resolver: ContextResolver::new(stores.integrations.clone(), stores.customers.clone()),
            audit: AuditLogger::new(stores.logs),
            projector: StatusProjector::new(stores.integrations, stores.customers),
            executor,
        }
    }

    /// Run one sync request for `caller`.
    ///
    /// `Err` means the request was rejected and nothing was executed or
    /// logged. `Ok` carries the outcome, successful or not.
    pub async fn dispatch(
        &self,
        caller: &Caller,
        body: SyncRequestBody,
        cancel: CancellationToken,
    ) -> Result<SyncReport, CoreError> {
        let request = SyncRequest::parse(body)?;

        let tenant_id = self.authorize(caller, &request).await?;

        let ctx = self.resolver.resolve(tenant_id, caller, &request).await?;

        let execution = self.executor.execute(&ctx, &cancel).await;

        let mut persistence_failures = Vec::new();
        let log_id = match self.audit.record(&ctx, &execution).await {
            Ok(id) => Some(id),
            Err(e) => {
                persistence_failures.push(PersistenceFailure::new(PersistenceStage::AuditLog, &e));
                None
            }
        };
        let projection = self.projector.project(&ctx, &execution).await;
        persistence_failures.extend(projection.failures);

        for failure in &persistence_failures {
            tracing::error!(
                integration_id = %ctx.integration.id,
                tenant_id = %tenant_id,
                stage = failure.stage.as_str(),
                error = %failure.message,
                "Sync bookkeeping write failed",
            );
        }

        tracing::info!(
            integration_id = %ctx.integration.id,
            tenant_id = %tenant_id,
            action = ctx.action().as_str(),
            provider = ctx.integration.provider_type().as_str(),
            triggered_by = ctx.triggered_by.as_str(),
            success = execution.outcome.success,
            duration_ms = execution.duration_ms,
            "Sync dispatched",
        );

        Ok(SyncReport {
            tenant_id,
            integration_id: ctx.integration.id,
            integration_name: ctx.integration.name.clone(),
            provider_type: ctx.integration.provider_type(),
            action: ctx.action(),
            customer_id: ctx.customer_id(),
            triggered_by: ctx.triggered_by,
            execution,
            log_id,
            persistence_failures,
        })
    }

    /// Gate `caller` on the tenant that owns the integration.
    ///
    /// Only the owner is read before the gate. A `tenant_id` in the request
    /// is a cross-check: naming another tenant reads as not found.
    async fn authorize(&self, caller: &Caller, request: &SyncRequest) -> Result<DbId, CoreError> {
        let not_found = || CoreError::NotFound {
            entity: "Integration",
            id: request.integration_id,
        };

        let owner = self
            .integrations
            .integration_tenant(request.integration_id)
            .await?
            .ok_or_else(not_found)?;

        check_tenant_access(self.gate.as_ref(), caller, owner).await?;

        if request.tenant_id.is_some_and(|requested| requested != owner) {
            return Err(not_found());
        }
        Ok(owner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
