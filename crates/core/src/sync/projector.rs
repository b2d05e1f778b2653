//! Status projection.
//!
//! The only writer of an integration's last-sync fields and a customer's
//! network sync fields.

use std::sync::Arc;

use serde::Serialize;

use crate::integration::SyncStatus;
use crate::sync::context::SyncContext;
use crate::sync::executor::Execution;
use crate::sync::store::{CustomerStore, IntegrationStore, IntegrationSyncUpdate, StoreError};

/// Which best-effort write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceStage {
    AuditLog,
    IntegrationStatus,
    CustomerStatus,
}

impl PersistenceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuditLog => "audit_log",
            Self::IntegrationStatus => "integration_status",
            Self::CustomerStatus => "customer_status",
        }
    }
}

/// A persistence failure recovered after the outcome was known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceFailure {
    pub stage: PersistenceStage,
    pub message: String,
}

impl PersistenceFailure {
    pub fn new(stage: PersistenceStage, err: &StoreError) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

/// What the projector managed to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    /// `false` when a later-started attempt had already been projected.
    pub integration_updated: bool,
    pub customer_updated: bool,
    pub failures: Vec<PersistenceFailure>,
}

#[derive(Clone)]
pub struct StatusProjector {
    integrations: Arc<dyn IntegrationStore>,
    customers: Arc<dyn CustomerStore>,
}

impl StatusProjector {
    pub fn new(integrations: Arc<dyn IntegrationStore>, customers: Arc<dyn CustomerStore>) -> Self {
        Self {
            integrations,
            customers,
        }
    }

    /// Project one execution. Integration fields are always written; the
    /// customer only on success, and never for an attempt that a later-started
    /// one has already superseded.
    pub async fn project(&self, ctx: &SyncContext, execution: &Execution) -> Projection {
        let status = SyncStatus::from_outcome(execution.outcome.success);
        let mut projection = Projection::default();

        let mut superseded = false;
        let update = IntegrationSyncUpdate {
            integration_id: ctx.integration.id,
            started_at: execution.started_at,
            completed_at: execution.completed_at,
            status,
        };
        match self.integrations.record_sync_result(&update).await {
            Ok(applied) => {
                if !applied {
                    superseded = true;
                    tracing::debug!(
                        integration_id = %ctx.integration.id,
                        "Skipped status projection, a later attempt is already recorded",
                    );
                }
                projection.integration_updated = applied;
            }
            Err(e) => projection
                .failures
                .push(PersistenceFailure::new(PersistenceStage::IntegrationStatus, &e)),
        }

        if status == SyncStatus::Success && !superseded {
            if let Some(customer_id) = ctx.customer_id() {
                match self
                    .customers
                    .record_customer_sync(customer_id, execution.completed_at, status)
                    .await
                {
                    Ok(()) => projection.customer_updated = true,
                    Err(e) => projection
                        .failures
                        .push(PersistenceFailure::new(PersistenceStage::CustomerStatus, &e)),
                }
            }
        }

        projection
    }
}
