//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Every read is scoped by tenant.

pub mod customer_repo;
pub mod integration_repo;
pub mod sync_log_repo;
pub mod tenant_access_repo;

pub use customer_repo::CustomerRepo;
pub use integration_repo::IntegrationRepo;
pub use sync_log_repo::SyncLogRepo;
pub use tenant_access_repo::TenantAccessRepo;
