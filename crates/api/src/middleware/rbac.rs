//! Role-based access control extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ispsync_core::error::CoreError;
use ispsync_core::roles::can_manage_integrations;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires `tenant_admin` or `super_admin`. Rejects with 403 otherwise.
///
/// ```ignore
/// async fn create(RequireIntegrationAdmin(user): RequireIntegrationAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireIntegrationAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireIntegrationAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_manage_integrations(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Tenant admin role required".into(),
            )));
        }
        Ok(RequireIntegrationAdmin(user))
    }
}
