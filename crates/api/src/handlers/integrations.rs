//! Handlers for the `/integrations` resource.
//!
//! Reads need any authenticated user with access to the tenant; writes also
//! need [`RequireIntegrationAdmin`]. Passwords are sealed on the way in and
//! never returned.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use ispsync_core::error::CoreError;
use ispsync_core::integration::{
    IntegrationSettings, ProviderConfig, ProviderType, SyncMode, SyncStatus, REDACTED,
};
use ispsync_core::types::{DbId, Timestamp};
use ispsync_db::models::integration::{
    CredentialChange, IntegrationChanges, IntegrationRow, NewIntegration,
};
use ispsync_db::models::sync_log::SyncLogRow;
use ispsync_db::repositories::{IntegrationRepo, SyncLogRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireIntegrationAdmin;
use crate::middleware::tenant::TenantScope;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /integrations`.
#[derive(Debug, Deserialize)]
pub struct CreateIntegrationRequest {
    pub name: String,
    pub provider_type: String,
    pub host: Option<String>,
    pub port: Option<i32>,
    pub username: Option<String>,
    /// Plaintext device password; sealed before storage.
    pub password: Option<String>,
    /// Provider-specific settings object.
    #[serde(default)]
    pub settings: serde_json::Value,
    pub sync_mode: Option<String>,
    pub sync_interval_minutes: Option<i32>,
    pub is_enabled: Option<bool>,
}

/// Body of `PUT /integrations/{id}`. Replaces every editable field; the
/// provider type is fixed at creation.
#[derive(Debug, Deserialize)]
pub struct UpdateIntegrationRequest {
    pub name: String,
    pub host: Option<String>,
    pub port: Option<i32>,
    pub username: Option<String>,
    /// New password. Omit to keep the stored one.
    pub password: Option<String>,
    /// Drop the stored password.
    #[serde(default)]
    pub clear_password: bool,
    /// A RADIUS `secret` equal to the redaction placeholder keeps the
    /// stored secret.
    #[serde(default)]
    pub settings: serde_json::Value,
    pub sync_mode: Option<String>,
    pub sync_interval_minutes: Option<i32>,
    pub is_enabled: Option<bool>,
}

/// API view of an integration. Secrets are redacted.
#[derive(Debug, Serialize)]
pub struct IntegrationResponse {
    pub id: DbId,
    pub tenant_id: DbId,
    pub name: String,
    pub provider_type: ProviderType,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub has_password: bool,
    pub settings: serde_json::Value,
    pub sync_mode: SyncMode,
    pub sync_interval_minutes: Option<i32>,
    pub is_enabled: bool,
    pub last_sync_at: Option<Timestamp>,
    pub last_sync_status: Option<SyncStatus>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl IntegrationResponse {
    fn from_row(row: IntegrationRow) -> AppResult<Self> {
        let (created_at, updated_at) = (row.created_at, row.updated_at);
        let integration = row.into_domain().map_err(AppError::InternalError)?;
        Ok(Self {
            id: integration.id,
            tenant_id: integration.tenant_id,
            name: integration.name.clone(),
            provider_type: integration.provider_type(),
            host: integration.host.clone(),
            port: integration.port,
            username: integration.username.clone(),
            has_password: integration.encrypted_credentials.is_some(),
            settings: integration.config.redacted().settings_json(),
            sync_mode: integration.sync_mode,
            sync_interval_minutes: integration.sync_interval_minutes,
            is_enabled: integration.is_enabled,
            last_sync_at: integration.last_sync_at,
            last_sync_status: integration.last_sync_status,
            created_at,
            updated_at,
        })
    }
}

/// Query parameters for `GET /integrations/{id}/sync-logs`.
#[derive(Debug, Deserialize)]
pub struct SyncLogQuery {
    /// Defaults to 50, capped at 200.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 200;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_sync_mode(raw: Option<&str>) -> Result<SyncMode, CoreError> {
    raw.map(SyncMode::from_str).transpose().map(|m| m.unwrap_or(SyncMode::Manual))
}

fn validate_port(port: Option<i32>) -> Result<Option<u16>, CoreError> {
    port.map(|p| {
        u16::try_from(p)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| CoreError::Validation("Port must be between 1 and 65535".into()))
    })
    .transpose()
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn load(state: &AppState, tenant_id: DbId, id: DbId) -> AppResult<IntegrationRow> {
    IntegrationRepo::find_by_id(&state.pool, tenant_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Integration",
            id,
        }))
}

/// Keep the stored RADIUS secret when the client echoes the placeholder.
fn restore_redacted_secret(config: ProviderConfig, existing: &ProviderConfig) -> ProviderConfig {
    match (config, existing) {
        (ProviderConfig::Radius(mut new), ProviderConfig::Radius(old)) if new.secret == REDACTED => {
            new.secret = old.secret.clone();
            ProviderConfig::Radius(new)
        }
        (config, _) => config,
    }
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/integrations
pub async fn list_integrations(
    TenantScope(tenant_id): TenantScope,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<IntegrationResponse>>>> {
    let rows = IntegrationRepo::list(&state.pool, tenant_id).await?;
    let data = rows
        .into_iter()
        .map(IntegrationResponse::from_row)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/integrations/{id}
pub async fn get_integration(
    TenantScope(tenant_id): TenantScope,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<IntegrationResponse>>> {
    let row = load(&state, tenant_id, id).await?;
    Ok(Json(DataResponse {
        data: IntegrationResponse::from_row(row)?,
    }))
}

/// POST /api/v1/integrations
pub async fn create_integration(
    RequireIntegrationAdmin(user): RequireIntegrationAdmin,
    TenantScope(tenant_id): TenantScope,
    State(state): State<AppState>,
    Json(input): Json<CreateIntegrationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<IntegrationResponse>>)> {
    let provider_type = ProviderType::from_str(&input.provider_type)?;
    let config = ProviderConfig::from_parts(provider_type, input.settings)?;
    let settings = IntegrationSettings {
        name: input.name.trim().to_string(),
        host: blank_to_none(input.host),
        port: input.port,
        username: blank_to_none(input.username),
        config,
        sync_mode: parse_sync_mode(input.sync_mode.as_deref())?,
        sync_interval_minutes: input.sync_interval_minutes,
    };
    settings.check()?;

    let encrypted_credentials = input
        .password
        .filter(|p| !p.is_empty())
        .map(|p| state.cipher.seal(tenant_id, &p))
        .transpose()
        .map_err(|e| AppError::InternalError(format!("Cannot seal credentials: {e}")))?;

    let new = NewIntegration {
        tenant_id,
        port: validate_port(settings.port)?,
        name: settings.name,
        config: settings.config,
        host: settings.host,
        username: settings.username,
        encrypted_credentials,
        sync_mode: settings.sync_mode,
        sync_interval_minutes: settings.sync_interval_minutes,
        is_enabled: input.is_enabled.unwrap_or(true),
    };
    let row = IntegrationRepo::create(&state.pool, &new).await?;

    tracing::info!(
        integration_id = %row.id,
        %tenant_id,
        provider_type = %row.provider_type,
        user_id = %user.user_id,
        "Integration created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: IntegrationResponse::from_row(row)?,
        }),
    ))
}

/// PUT /api/v1/integrations/{id}
pub async fn update_integration(
    RequireIntegrationAdmin(user): RequireIntegrationAdmin,
    TenantScope(tenant_id): TenantScope,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateIntegrationRequest>,
) -> AppResult<Json<DataResponse<IntegrationResponse>>> {
    let existing = load(&state, tenant_id, id)
        .await?
        .into_domain()
        .map_err(AppError::InternalError)?;

    let config = ProviderConfig::from_parts(existing.provider_type(), input.settings)?;
    let settings = IntegrationSettings {
        name: input.name.trim().to_string(),
        host: blank_to_none(input.host),
        port: input.port,
        username: blank_to_none(input.username),
        config: restore_redacted_secret(config, &existing.config),
        sync_mode: parse_sync_mode(input.sync_mode.as_deref())?,
        sync_interval_minutes: input.sync_interval_minutes,
    };
    settings.check()?;

    let credentials = match (input.password.filter(|p| !p.is_empty()), input.clear_password) {
        (Some(_), true) => {
            return Err(CoreError::Validation(
                "password and clear_password are mutually exclusive".into(),
            )
            .into())
        }
        (Some(password), false) => CredentialChange::Replace(
            state
                .cipher
                .seal(tenant_id, &password)
                .map_err(|e| AppError::InternalError(format!("Cannot seal credentials: {e}")))?,
        ),
        (None, true) => CredentialChange::Clear,
        (None, false) => CredentialChange::Keep,
    };

    let changes = IntegrationChanges {
        port: validate_port(settings.port)?,
        name: settings.name,
        config: settings.config,
        host: settings.host,
        username: settings.username,
        credentials,
        sync_mode: settings.sync_mode,
        sync_interval_minutes: settings.sync_interval_minutes,
        is_enabled: input.is_enabled.unwrap_or(existing.is_enabled),
    };
    let row = IntegrationRepo::update(&state.pool, tenant_id, id, &changes)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Integration",
            id,
        }))?;

    tracing::info!(integration_id = %id, %tenant_id, user_id = %user.user_id, "Integration updated");

    Ok(Json(DataResponse {
        data: IntegrationResponse::from_row(row)?,
    }))
}

/// DELETE /api/v1/integrations/{id}
///
/// Removes the integration together with its sync log.
pub async fn delete_integration(
    RequireIntegrationAdmin(user): RequireIntegrationAdmin,
    TenantScope(tenant_id): TenantScope,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !IntegrationRepo::delete(&state.pool, tenant_id, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Integration",
            id,
        }));
    }
    tracing::info!(integration_id = %id, %tenant_id, user_id = %user.user_id, "Integration deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Sync log
// ---------------------------------------------------------------------------

/// GET /api/v1/integrations/{id}/sync-logs
///
/// Newest first.
pub async fn list_sync_logs(
    TenantScope(tenant_id): TenantScope,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<SyncLogQuery>,
) -> AppResult<Json<DataResponse<Vec<SyncLogRow>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    let offset = params.offset.unwrap_or(0);
    if limit < 1 || offset < 0 {
        return Err(CoreError::Validation(
            "limit must be positive and offset must not be negative".into(),
        )
        .into());
    }

    load(&state, tenant_id, id).await?;
    let logs =
        SyncLogRepo::list_for_integration(&state.pool, tenant_id, id, limit.min(MAX_LOG_LIMIT), offset)
            .await?;
    Ok(Json(DataResponse { data: logs }))
}
