//! The network integration sync engine.
//!
//! [`SyncDispatcher`] is the entry point. Each request flows through the
//! access gate, the context resolver, the executor (which calls a
//! [`provider::ProviderAdapter`]), and finally the audit logger and status
//! projector.

pub mod access;
pub mod action;
pub mod audit;
pub mod context;
pub mod dispatcher;
pub mod executor;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod outcome;
pub mod projector;
pub mod provider;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use access::{authorize_tenant, check_tenant_access, AccessGate, Caller, ClaimsAccessGate};
pub use action::{SyncAction, SyncRequest, SyncRequestBody, TriggerSource};
pub use context::{ContextResolver, SyncContext, SyncOperation};
pub use dispatcher::{SyncDispatcher, SyncReport, SyncResponse, SyncStores};
pub use executor::{Execution, SyncExecutor, DEFAULT_PROVIDER_TIMEOUT};
pub use outcome::Outcome;
pub use projector::{PersistenceFailure, PersistenceStage};
