//! Sync actions, trigger sources, and request parsing.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// The operation a sync request asks a provider to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    TestConnection,
    Enable,
    Disable,
    UpdateSpeed,
}

const VALID_ACTIONS: &[&str] = &["test_connection", "enable", "disable", "update_speed"];

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TestConnection => "test_connection",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::UpdateSpeed => "update_speed",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "test_connection" => Ok(Self::TestConnection),
            "enable" => Ok(Self::Enable),
            "disable" => Ok(Self::Disable),
            "update_speed" => Ok(Self::UpdateSpeed),
            _ => Err(CoreError::Validation(format!(
                "Invalid action '{s}'. Must be one of: {}",
                VALID_ACTIONS.join(", ")
            ))),
        }
    }

    /// Every action except `test_connection` targets a customer.
    pub fn requires_customer(&self) -> bool {
        !matches!(self, Self::TestConnection)
    }
}

// ---------------------------------------------------------------------------
// Trigger source
// ---------------------------------------------------------------------------

/// Who or what initiated a sync request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    #[default]
    Manual,
    Scheduled,
    EventDriven,
}

const VALID_TRIGGERS: &[&str] = &["manual", "scheduled", "event_driven"];

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::EventDriven => "event_driven",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "manual" => Ok(Self::Manual),
            "scheduled" => Ok(Self::Scheduled),
            "event_driven" => Ok(Self::EventDriven),
            _ => Err(CoreError::Validation(format!(
                "Invalid triggered_by '{s}'. Must be one of: {}",
                VALID_TRIGGERS.join(", ")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Raw, unvalidated sync request as received from a caller.
///
/// Every field is optional so that missing values surface as validation
/// errors with a useful message rather than as deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRequestBody {
    pub action: Option<String>,
    pub integration_id: Option<String>,
    pub customer_id: Option<String>,
    pub triggered_by: Option<String>,
    /// Optional cross-check against the integration's owning tenant.
    pub tenant_id: Option<String>,
}

/// A validated sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub action: SyncAction,
    pub integration_id: DbId,
    /// Always `None` for `test_connection`, whatever the caller sent.
    pub customer_id: Option<DbId>,
    pub triggered_by: TriggerSource,
    pub tenant_id: Option<DbId>,
}

impl SyncRequest {
    /// Validate a raw request. Performs no I/O.
    pub fn parse(body: SyncRequestBody) -> Result<Self, CoreError> {
        let action = non_blank(body.action)
            .ok_or_else(|| CoreError::Validation("action is required".to_string()))?;
        let action = SyncAction::from_str(&action)?;

        let integration_id = non_blank(body.integration_id)
            .ok_or_else(|| CoreError::Validation("integration_id is required".to_string()))?;
        let integration_id = parse_id("integration_id", &integration_id)?;

        let customer_id = if action.requires_customer() {
            non_blank(body.customer_id)
                .map(|id| parse_id("customer_id", &id))
                .transpose()?
        } else {
            None
        };

        let triggered_by = match non_blank(body.triggered_by) {
            Some(t) => TriggerSource::from_str(&t)?,
            None => TriggerSource::default(),
        };

        let tenant_id = non_blank(body.tenant_id)
            .map(|id| parse_id("tenant_id", &id))
            .transpose()?;

        Ok(Self {
            action,
            integration_id,
            customer_id,
            triggered_by,
            tenant_id,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_id(field: &str, raw: &str) -> Result<DbId, CoreError> {
    raw.parse::<DbId>()
        .map_err(|_| CoreError::Validation(format!("{field} must be a valid UUID")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn body(action: Option<&str>, integration_id: Option<&str>) -> SyncRequestBody {
        SyncRequestBody {
            action: action.map(String::from),
            integration_id: integration_id.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn missing_action_is_a_validation_error() {
        let id = DbId::new_v4().to_string();
        assert_matches!(
            SyncRequest::parse(body(None, Some(&id))),
            Err(CoreError::Validation(msg)) if msg == "action is required"
        );
    }

    #[test]
    fn missing_integration_id_is_a_validation_error() {
        assert_matches!(
            SyncRequest::parse(body(Some("enable"), Some("  "))),
            Err(CoreError::Validation(msg)) if msg == "integration_id is required"
        );
    }

    #[test]
    fn unknown_action_and_trigger_are_rejected() {
        let id = DbId::new_v4().to_string();
        assert_matches!(
            SyncRequest::parse(body(Some("reboot"), Some(&id))),
            Err(CoreError::Validation(_))
        );

        let mut b = body(Some("test_connection"), Some(&id));
        b.triggered_by = Some("cron".into());
        assert_matches!(SyncRequest::parse(b), Err(CoreError::Validation(_)));
    }

    #[test]
    fn trigger_defaults_to_manual() {
        let id = DbId::new_v4();
        let request = SyncRequest::parse(body(Some("test_connection"), Some(&id.to_string()))).unwrap();
        assert_eq!(request.triggered_by, TriggerSource::Manual);
        assert_eq!(request.integration_id, id);
    }

    #[test]
    fn test_connection_ignores_customer_id() {
        let mut b = body(Some("test_connection"), Some(&DbId::new_v4().to_string()));
        b.customer_id = Some("not-even-a-uuid".into());
        let request = SyncRequest::parse(b).unwrap();
        assert_eq!(request.customer_id, None);
    }

    #[test]
    fn customer_actions_parse_customer_id() {
        let customer = DbId::new_v4();
        let mut b = body(Some("update_speed"), Some(&DbId::new_v4().to_string()));
        b.customer_id = Some(customer.to_string());
        b.triggered_by = Some("event_driven".into());
        let request = SyncRequest::parse(b).unwrap();
        assert_eq!(request.customer_id, Some(customer));
        assert_eq!(request.triggered_by, TriggerSource::EventDriven);
    }

    #[test]
    fn malformed_ids_are_validation_errors() {
        assert_matches!(
            SyncRequest::parse(body(Some("enable"), Some("I1"))),
            Err(CoreError::Validation(msg)) if msg.contains("integration_id")
        );
    }
}
