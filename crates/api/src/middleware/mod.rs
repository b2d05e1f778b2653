//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller behind a JWT Bearer token.
//! - [`rbac::RequireIntegrationAdmin`] -- may change integration settings.
//! - [`tenant::TenantScope`] -- the tenant a request acts for, after the
//!   access gate.

pub mod auth;
pub mod rbac;
pub mod tenant;
