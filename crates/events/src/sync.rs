//! Events describing completed sync attempts.

use ispsync_core::sync::projector::PersistenceStage;
use ispsync_core::sync::SyncReport;
use ispsync_core::types::DbId;

use crate::bus::PlatformEvent;

pub const SYNC_SUCCEEDED: &str = "integration.sync.succeeded";
pub const SYNC_FAILED: &str = "integration.sync.failed";
/// The attempt ran but its audit row could not be written.
pub const SYNC_AUDIT_FAILED: &str = "integration.sync.audit_failed";
/// The attempt ran but a status projection could not be written.
pub const SYNC_PROJECTION_FAILED: &str = "integration.sync.projection_failed";

/// The events one dispatch publishes: its outcome, then one event per
/// persistence failure.
pub fn sync_events(report: &SyncReport, actor: Option<DbId>) -> Vec<PlatformEvent> {
    let outcome = &report.execution.outcome;
    let event_type = if outcome.success { SYNC_SUCCEEDED } else { SYNC_FAILED };

    let base = |event_type: &str| {
        let event = PlatformEvent::new(event_type)
            .with_tenant(report.tenant_id)
            .with_source("integration", report.integration_id);
        match actor {
            Some(user_id) => event.with_actor(user_id),
            None => event,
        }
    };

    let mut events = vec![base(event_type).with_payload(serde_json::json!({
        "integration_name": report.integration_name,
        "provider_type": report.provider_type,
        "action": report.action,
        "customer_id": report.customer_id,
        "triggered_by": report.triggered_by,
        "success": outcome.success,
        "message": outcome.message,
        "duration_ms": report.execution.duration_ms,
        "log_id": report.log_id,
    }))];

    for failure in &report.persistence_failures {
        let event_type = match failure.stage {
            PersistenceStage::AuditLog => SYNC_AUDIT_FAILED,
            PersistenceStage::IntegrationStatus | PersistenceStage::CustomerStatus => {
                SYNC_PROJECTION_FAILED
            }
        };
        events.push(base(event_type).with_payload(serde_json::json!({
            "action": report.action,
            "customer_id": report.customer_id,
            "stage": failure.stage.as_str(),
            "error": failure.message,
        })));
    }

    events
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ispsync_core::integration::ProviderType;
    use ispsync_core::sync::projector::PersistenceFailure;
    use ispsync_core::sync::{Execution, Outcome, SyncAction, TriggerSource};

    use super::*;

    fn report(outcome: Outcome, failures: Vec<PersistenceFailure>) -> SyncReport {
        let now = Utc::now();
        SyncReport {
            tenant_id: DbId::new_v4(),
            integration_id: DbId::new_v4(),
            integration_name: "Core router".into(),
            provider_type: ProviderType::Mikrotik,
            action: SyncAction::Enable,
            customer_id: Some(DbId::new_v4()),
            triggered_by: TriggerSource::Manual,
            execution: Execution {
                outcome,
                started_at: now,
                completed_at: now,
                duration_ms: 12,
            },
            log_id: None,
            persistence_failures: failures,
        }
    }

    #[test]
    fn successful_sync_publishes_one_event() {
        let actor = DbId::new_v4();
        let report = report(Outcome::success("Enabled"), Vec::new());

        let events = sync_events(&report, Some(actor));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, SYNC_SUCCEEDED);
        assert_eq!(events[0].actor_user_id, Some(actor));
        assert_eq!(events[0].source_entity_id, Some(report.integration_id));
        assert_eq!(events[0].payload["action"], "enable");
        assert_eq!(events[0].payload["duration_ms"], 12);
    }

    #[test]
    fn persistence_failures_add_one_event_each() {
        let failures = vec![
            PersistenceFailure {
                stage: PersistenceStage::AuditLog,
                message: "Database error: connection reset".into(),
            },
            PersistenceFailure {
                stage: PersistenceStage::CustomerStatus,
                message: "Database error: deadlock".into(),
            },
        ];
        let report = report(Outcome::failure("Timeout"), failures);

        let events = sync_events(&report, None);

        let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, [SYNC_FAILED, SYNC_AUDIT_FAILED, SYNC_PROJECTION_FAILED]);
        assert_eq!(events[2].payload["stage"], "customer_status");
        assert!(events.iter().all(|e| e.actor_user_id.is_none()));
    }
}
