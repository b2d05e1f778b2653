//! Tenant scoping for the integration management endpoints.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use ispsync_core::sync;
use ispsync_core::types::DbId;
use serde::Deserialize;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Optional `?tenant_id=` override, honoured for platform operators.
#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    pub tenant_id: Option<DbId>,
}

/// The tenant a request acts for, checked against the access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantScope(pub DbId);

/// Resolve and authorize the acting tenant.
pub async fn authorize_tenant(
    state: &AppState,
    user: &AuthUser,
    requested: Option<DbId>,
) -> Result<TenantScope, AppError> {
    let tenant_id =
        sync::authorize_tenant(state.gate.as_ref(), &user.caller(), requested).await?;
    Ok(TenantScope(tenant_id))
}

impl FromRequestParts<AppState> for TenantScope {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let Query(query) = Query::<TenantQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        authorize_tenant(state, &user, query.tenant_id).await
    }
}
