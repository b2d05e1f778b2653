use serde::Serialize;
use sqlx::FromRow;

use ispsync_core::integration::{Integration, ProviderConfig, ProviderType, SyncMode, SyncStatus};
use ispsync_core::types::{DbId, Timestamp};

/// A row from the `integrations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IntegrationRow {
    pub id: DbId,
    pub tenant_id: DbId,
    pub name: String,
    pub provider_type: String,
    pub host: Option<String>,
    pub port: Option<i32>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub encrypted_credentials: Option<Vec<u8>>,
    pub settings: serde_json::Value,
    pub sync_mode: String,
    pub sync_interval_minutes: Option<i32>,
    pub is_enabled: bool,
    pub last_sync_at: Option<Timestamp>,
    pub last_sync_started_at: Option<Timestamp>,
    pub last_sync_status: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl IntegrationRow {
    /// Map the row onto the domain model. Fails with a message naming the
    /// offending column.
    pub fn into_domain(self) -> Result<Integration, String> {
        let provider_type =
            ProviderType::from_str(&self.provider_type).map_err(|e| e.to_string())?;
        let config = ProviderConfig::from_parts(provider_type, self.settings)
            .map_err(|e| e.to_string())?;
        let sync_mode = SyncMode::from_str(&self.sync_mode).map_err(|e| e.to_string())?;
        let last_sync_status = self
            .last_sync_status
            .as_deref()
            .map(SyncStatus::from_str)
            .transpose()
            .map_err(|e| e.to_string())?;
        let port = self
            .port
            .map(u16::try_from)
            .transpose()
            .map_err(|_| format!("port out of range on integration {}", self.id))?;

        Ok(Integration {
            id: self.id,
            tenant_id: self.tenant_id,
            name: self.name,
            host: self.host,
            port,
            username: self.username,
            encrypted_credentials: self.encrypted_credentials,
            config,
            sync_mode,
            sync_interval_minutes: self.sync_interval_minutes,
            is_enabled: self.is_enabled,
            last_sync_at: self.last_sync_at,
            last_sync_started_at: self.last_sync_started_at,
            last_sync_status,
        })
    }
}

/// Insert DTO. Settings and credentials arrive already validated and sealed.
#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub tenant_id: DbId,
    pub name: String,
    pub config: ProviderConfig,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub encrypted_credentials: Option<Vec<u8>>,
    pub sync_mode: SyncMode,
    pub sync_interval_minutes: Option<i32>,
    pub is_enabled: bool,
}

/// What to do with the stored credentials on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CredentialChange {
    #[default]
    Keep,
    Replace(Vec<u8>),
    Clear,
}

/// Full-replacement update DTO for the editable columns.
#[derive(Debug, Clone)]
pub struct IntegrationChanges {
    pub name: String,
    pub config: ProviderConfig,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub credentials: CredentialChange,
    pub sync_mode: SyncMode,
    pub sync_interval_minutes: Option<i32>,
    pub is_enabled: bool,
}
