//! Well-known role name constants.
//!
//! These must match the role names issued in access-token claims by the
//! platform's identity service.

/// Platform operator; may act on any tenant.
pub const ROLE_SUPER_ADMIN: &str = "super_admin";
/// Tenant administrator; manages integrations for their own tenant.
pub const ROLE_TENANT_ADMIN: &str = "tenant_admin";
/// Tenant staff; may trigger syncs but not change integration settings.
pub const ROLE_STAFF: &str = "staff";

/// Whether `role` may create, edit or delete integrations.
pub fn can_manage_integrations(role: &str) -> bool {
    role == ROLE_SUPER_ADMIN || role == ROLE_TENANT_ADMIN
}
