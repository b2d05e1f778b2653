//! Caller identity and the tenant access gate.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::roles::ROLE_SUPER_ADMIN;
use crate::sync::store::StoreError;
use crate::types::DbId;

/// The authenticated principal behind a sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: DbId,
    /// Home tenant from the access token; `None` for platform operators.
    pub tenant_id: Option<DbId>,
    pub role: String,
}

impl Caller {
    pub fn is_super_admin(&self) -> bool {
        self.role == ROLE_SUPER_ADMIN
    }

    /// The tenant a request acts for: an explicit override, else the
    /// caller's home tenant.
    pub fn acting_tenant(&self, requested: Option<DbId>) -> Option<DbId> {
        requested.or(self.tenant_id)
    }
}

/// Decides whether a caller may operate on a tenant's resources.
///
/// Consulted before any integration row is read. The dispatcher treats both
/// `Ok(false)` and `Err(_)` as a denial.
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn may_access_tenant(&self, caller: &Caller, tenant_id: DbId) -> Result<bool, StoreError>;
}

const ACCESS_DENIED: &str = "You do not have access to this tenant";

/// Check `caller` against `gate` for `tenant_id`.
///
/// Fails closed: a denial and a gate error both reject.
pub async fn check_tenant_access(
    gate: &dyn AccessGate,
    caller: &Caller,
    tenant_id: DbId,
) -> Result<(), CoreError> {
    match gate.may_access_tenant(caller, tenant_id).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(CoreError::Forbidden(ACCESS_DENIED.into())),
        Err(e) => {
            tracing::warn!(
                user_id = %caller.user_id,
                tenant_id = %tenant_id,
                error = %e,
                "Access gate failed, denying request",
            );
            Err(CoreError::Forbidden(ACCESS_DENIED.into()))
        }
    }
}

/// Resolve the tenant `caller` acts for and check it against `gate`.
pub async fn authorize_tenant(
    gate: &dyn AccessGate,
    caller: &Caller,
    requested: Option<DbId>,
) -> Result<DbId, CoreError> {
    let tenant_id = caller
        .acting_tenant(requested)
        .ok_or_else(|| CoreError::Forbidden("No tenant selected for this request".into()))?;
    check_tenant_access(gate, caller, tenant_id).await?;
    Ok(tenant_id)
}

/// Gate that trusts token claims only: operators reach every tenant,
/// everybody else only their home tenant.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsAccessGate;

impl ClaimsAccessGate {
    pub fn allows(caller: &Caller, tenant_id: DbId) -> bool {
        caller.is_super_admin() || caller.tenant_id == Some(tenant_id)
    }
}

#[async_trait]
impl AccessGate for ClaimsAccessGate {
    async fn may_access_tenant(&self, caller: &Caller, tenant_id: DbId) -> Result<bool, StoreError> {
        Ok(Self::allows(caller, tenant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::ROLE_STAFF;

    #[tokio::test]
    async fn claims_gate_limits_staff_to_home_tenant() {
        let home = DbId::new_v4();
        let caller = Caller {
            user_id: DbId::new_v4(),
            tenant_id: Some(home),
            role: ROLE_STAFF.to_string(),
        };
        assert!(ClaimsAccessGate.may_access_tenant(&caller, home).await.unwrap());
        assert!(!ClaimsAccessGate.may_access_tenant(&caller, DbId::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn claims_gate_lets_super_admin_through() {
        let caller = Caller {
            user_id: DbId::new_v4(),
            tenant_id: None,
            role: ROLE_SUPER_ADMIN.to_string(),
        };
        assert!(ClaimsAccessGate.may_access_tenant(&caller, DbId::new_v4()).await.unwrap());
    }

    struct BrokenGate;

    #[async_trait]
    impl AccessGate for BrokenGate {
        async fn may_access_tenant(&self, _: &Caller, _: DbId) -> Result<bool, StoreError> {
            Err(StoreError::Database("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn authorize_tenant_fails_closed() {
        let home = DbId::new_v4();
        let caller = Caller {
            user_id: DbId::new_v4(),
            tenant_id: Some(home),
            role: ROLE_STAFF.to_string(),
        };

        assert_eq!(authorize_tenant(&ClaimsAccessGate, &caller, None).await.unwrap(), home);
        assert!(matches!(
            authorize_tenant(&ClaimsAccessGate, &caller, Some(DbId::new_v4())).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_tenant(&BrokenGate, &caller, None).await,
            Err(CoreError::Forbidden(msg)) if msg == ACCESS_DENIED
        ));

        let operator = Caller {
            tenant_id: None,
            role: ROLE_SUPER_ADMIN.to_string(),
            ..caller
        };
        assert!(matches!(
            authorize_tenant(&ClaimsAccessGate, &operator, None).await,
            Err(CoreError::Forbidden(msg)) if msg == "No tenant selected for this request"
        ));
    }

    #[test]
    fn acting_tenant_prefers_explicit_override() {
        let home = DbId::new_v4();
        let other = DbId::new_v4();
        let caller = Caller {
            user_id: DbId::new_v4(),
            tenant_id: Some(home),
            role: ROLE_STAFF.to_string(),
        };
        assert_eq!(caller.acting_tenant(None), Some(home));
        assert_eq!(caller.acting_tenant(Some(other)), Some(other));
    }
}
