//! Sync audit logging.
//!
//! One immutable row per dispatched request, written after the executor has
//! produced its outcome. Snapshots never contain secrets: the provider
//! config is redacted before it is recorded.

use std::sync::Arc;

use serde_json::json;

use crate::integration::SyncStatus;
use crate::sync::context::SyncContext;
use crate::sync::executor::Execution;
use crate::sync::store::{NewSyncLogEntry, StoreError, SyncLogStore};
use crate::types::DbId;

/// Writes sync log rows.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn SyncLogStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn SyncLogStore>) -> Self {
        Self { store }
    }

    /// Persist the log row for one execution.
    pub async fn record(&self, ctx: &SyncContext, execution: &Execution) -> Result<DbId, StoreError> {
        self.store.append(&log_entry(ctx, execution)).await
    }
}

/// Build the log row for one execution.
pub fn log_entry(ctx: &SyncContext, execution: &Execution) -> NewSyncLogEntry {
    let integration = &ctx.integration;
    let outcome = &execution.outcome;
    let customer = ctx.operation.customer();

    let request_snapshot = json!({
        "action": ctx.action(),
        "integration_id": integration.id,
        "customer_id": ctx.customer_id(),
        "triggered_by": ctx.triggered_by,
        "provider": {
            "name": integration.name,
            "endpoint": integration.endpoint_label(),
            "username": integration.username,
            "config": integration.config.redacted(),
        },
        "customer": customer,
    });

    let response_snapshot = serde_json::to_value(outcome).unwrap_or_else(|_| {
        json!({ "success": outcome.success, "message": outcome.message })
    });

    NewSyncLogEntry {
        tenant_id: ctx.tenant_id,
        integration_id: integration.id,
        customer_id: ctx.customer_id(),
        provider_type: integration.provider_type(),
        action: ctx.action(),
        status: SyncStatus::from_outcome(outcome.success),
        request_snapshot,
        response_snapshot,
        error_message: (!outcome.success).then(|| outcome.message.clone()),
        started_at: execution.started_at,
        completed_at: execution.completed_at,
        duration_ms: execution.duration_ms,
        triggered_by: ctx.triggered_by,
        triggered_by_user: Some(ctx.caller.user_id),
    }
}
