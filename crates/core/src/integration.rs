//! Integration domain model.
//!
//! An integration is one tenant's configured connection to a network-access
//! device or AAA service. Provider-specific settings are a tagged union so a
//! RADIUS secret can never sit on a MikroTik integration and vice versa.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Upper bound for a scheduled sync interval (one week).
pub const MAX_SYNC_INTERVAL_MINUTES: i32 = 7 * 24 * 60;

/// Placeholder shown instead of secrets in API responses.
pub const REDACTED: &str = "********";

// ---------------------------------------------------------------------------
// Provider type
// ---------------------------------------------------------------------------

/// The protocol family an integration speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Mikrotik,
    Radius,
    Custom,
}

const VALID_PROVIDER_TYPES: &[&str] = &["mikrotik", "radius", "custom"];

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mikrotik => "mikrotik",
            Self::Radius => "radius",
            Self::Custom => "custom",
        }
    }

    /// Parse a provider type from its stored string form.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "mikrotik" => Ok(Self::Mikrotik),
            "radius" => Ok(Self::Radius),
            "custom" => Ok(Self::Custom),
            _ => Err(CoreError::Validation(format!(
                "Invalid provider type '{s}'. Must be one of: {}",
                VALID_PROVIDER_TYPES.join(", ")
            ))),
        }
    }

    /// Human-facing product name used in outcome messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Mikrotik => "MikroTik",
            Self::Radius => "RADIUS",
            Self::Custom => "Custom",
        }
    }
}

// ---------------------------------------------------------------------------
// Provider configuration
// ---------------------------------------------------------------------------

fn default_auth_port() -> u16 {
    1812
}

fn default_acct_port() -> u16 {
    1813
}

fn default_coa_port() -> u16 {
    3799
}

/// RouterOS settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MikrotikConfig {
    /// Talk to the REST API over HTTPS.
    #[serde(default)]
    pub use_ssl: bool,
    /// Default PPP profile assigned to subscriber secrets.
    #[serde(default)]
    pub ppp_profile: Option<String>,
    /// Firewall address list holding suspended subscribers.
    #[serde(default)]
    pub address_list: Option<String>,
}

/// RADIUS server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusConfig {
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    #[serde(default = "default_acct_port")]
    pub acct_port: u16,
    /// Dynamic-authorization (CoA / Disconnect) port on the NAS.
    #[serde(default = "default_coa_port")]
    pub coa_port: u16,
    /// Shared secret.
    pub secret: String,
}

/// Free-form settings for tenant-specific providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomConfig {
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

/// Provider-specific configuration, one shape per [`ProviderType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider_type", rename_all = "snake_case")]
pub enum ProviderConfig {
    Mikrotik(MikrotikConfig),
    Radius(RadiusConfig),
    Custom(CustomConfig),
}

impl ProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Mikrotik(_) => ProviderType::Mikrotik,
            Self::Radius(_) => ProviderType::Radius,
            Self::Custom(_) => ProviderType::Custom,
        }
    }

    /// Rebuild a config from its storage form: the `provider_type` column plus
    /// the untagged JSON settings object.
    pub fn from_parts(
        provider_type: ProviderType,
        settings: serde_json::Value,
    ) -> Result<Self, CoreError> {
        let settings = if settings.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            settings
        };

        let parsed = match provider_type {
            ProviderType::Mikrotik => serde_json::from_value(settings).map(Self::Mikrotik),
            ProviderType::Radius => serde_json::from_value(settings).map(Self::Radius),
            ProviderType::Custom => serde_json::from_value(settings).map(Self::Custom),
        };

        parsed.map_err(|e| {
            CoreError::Validation(format!(
                "Invalid {} settings: {e}",
                provider_type.as_str()
            ))
        })
    }

    /// The untagged settings object stored alongside `provider_type`.
    pub fn settings_json(&self) -> serde_json::Value {
        let value = match self {
            Self::Mikrotik(c) => serde_json::to_value(c),
            Self::Radius(c) => serde_json::to_value(c),
            Self::Custom(c) => serde_json::to_value(c),
        };
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Copy of this config with secrets replaced by [`REDACTED`].
    pub fn redacted(&self) -> Self {
        match self {
            Self::Radius(c) => Self::Radius(RadiusConfig {
                secret: REDACTED.to_string(),
                ..c.clone()
            }),
            other => other.clone(),
        }
    }

    /// Port used when the integration does not set one explicitly.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Mikrotik(c) if c.use_ssl => Some(443),
            Self::Mikrotik(_) => Some(80),
            Self::Radius(c) => Some(c.auth_port),
            Self::Custom(_) => None,
        }
    }

    /// Check provider-specific invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Mikrotik(c) => {
                if c.ppp_profile.as_deref().is_some_and(|p| p.trim().is_empty()) {
                    return Err(CoreError::Validation(
                        "ppp_profile must not be blank".to_string(),
                    ));
                }
                if c.address_list.as_deref().is_some_and(|l| l.trim().is_empty()) {
                    return Err(CoreError::Validation(
                        "address_list must not be blank".to_string(),
                    ));
                }
            }
            Self::Radius(c) => {
                if c.secret.is_empty() {
                    return Err(CoreError::Validation(
                        "RADIUS shared secret is required".to_string(),
                    ));
                }
                if c.auth_port == 0 || c.acct_port == 0 || c.coa_port == 0 {
                    return Err(CoreError::Validation(
                        "RADIUS ports must be between 1 and 65535".to_string(),
                    ));
                }
            }
            Self::Custom(_) => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sync mode and status
// ---------------------------------------------------------------------------

/// Triggering discipline configured for an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Manual,
    Scheduled,
    EventDriven,
}

const VALID_SYNC_MODES: &[&str] = &["manual", "scheduled", "event_driven"];

impl SyncMode {
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
                "Invalid sync mode '{s}'. Must be one of: {}",
                VALID_SYNC_MODES.join(", ")
            ))),
        }
    }
}

/// Last-sync status of an integration or a customer.
///
/// The sync engine itself only ever writes `Success` and `Failed`; the other
/// states are reserved for an external scheduler or retry driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Retrying,
}

const VALID_SYNC_STATUSES: &[&str] = &["pending", "in_progress", "success", "failed", "retrying"];

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "retrying" => Ok(Self::Retrying),
            _ => Err(CoreError::Validation(format!(
                "Invalid sync status '{s}'. Must be one of: {}",
                VALID_SYNC_STATUSES.join(", ")
            ))),
        }
    }

    /// Terminal status for an attempt that finished with `success`.
    pub fn from_outcome(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failed
        }
    }
}

// ---------------------------------------------------------------------------
// Integration
// ---------------------------------------------------------------------------

/// A fully loaded integration record.
#[derive(Debug, Clone)]
pub struct Integration {
    pub id: DbId,
    pub tenant_id: DbId,
    pub name: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    /// AES-GCM sealed password, see [`crate::crypto::CredentialCipher`].
    pub encrypted_credentials: Option<Vec<u8>>,
    pub config: ProviderConfig,
    pub sync_mode: SyncMode,
    pub sync_interval_minutes: Option<i32>,
    pub is_enabled: bool,
    pub last_sync_at: Option<Timestamp>,
    pub last_sync_started_at: Option<Timestamp>,
    pub last_sync_status: Option<SyncStatus>,
}

impl Integration {
    pub fn provider_type(&self) -> ProviderType {
        self.config.provider_type()
    }

    /// Explicit port, falling back to the provider default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.config.default_port())
    }

    /// Configured host, ignoring blank values.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    /// `host:port` label for messages, or `None` when no host is configured.
    pub fn endpoint_label(&self) -> Option<String> {
        let host = self.host()?;
        Some(match self.effective_port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Settings validation
// ---------------------------------------------------------------------------

/// The editable part of an integration, validated before it is persisted.
#[derive(Debug, Clone, Validate)]
pub struct IntegrationSettings {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 253, message = "Host must be 1-253 characters"))]
    pub host: Option<String>,
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: Option<i32>,
    #[validate(length(max = 120, message = "Username cannot exceed 120 characters"))]
    pub username: Option<String>,
    pub config: ProviderConfig,
    pub sync_mode: SyncMode,
    #[validate(range(
        min = 1,
        max = 10080,
        message = "Sync interval must be between 1 and 10080 minutes"
    ))]
    pub sync_interval_minutes: Option<i32>,
}

impl IntegrationSettings {
    /// Run field validation plus the cross-field rules.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        self.config.validate()?;
        validate_schedule(self.sync_mode, self.sync_interval_minutes)?;
        if self.host.as_deref().is_some_and(|h| h.contains(char::is_whitespace)) {
            return Err(CoreError::Validation(
                "Host must not contain whitespace".to_string(),
            ));
        }
        Ok(())
    }
}

/// A scheduled integration needs a positive interval; other modes must not
/// carry one.
pub fn validate_schedule(mode: SyncMode, interval_minutes: Option<i32>) -> Result<(), CoreError> {
    match (mode, interval_minutes) {
        (SyncMode::Scheduled, None) => Err(CoreError::Validation(
            "sync_interval_minutes is required for scheduled sync".to_string(),
        )),
        (SyncMode::Scheduled, Some(m)) if m < 1 || m > MAX_SYNC_INTERVAL_MINUTES => {
            Err(CoreError::Validation(format!(
                "sync_interval_minutes must be between 1 and {MAX_SYNC_INTERVAL_MINUTES}"
            )))
        }
        (SyncMode::Manual | SyncMode::EventDriven, Some(_)) => Err(CoreError::Validation(
            "sync_interval_minutes is only meaningful for scheduled sync".to_string(),
        )),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
