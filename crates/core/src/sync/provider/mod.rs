//! Provider adapters: one implementation per [`ProviderType`] behind the
//! [`ProviderAdapter`] capability contract.
//!
//! Adapters own the provider-specific validation and message wording; the
//! actual network round-trips go through transport traits
//! ([`mikrotik::RouterOsApi`], [`radius::RadiusApi`]) so that real clients
//! live in the `network` crate and tests can substitute fakes.

pub mod custom;
pub mod mikrotik;
pub mod radius;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::customer::CustomerSyncTarget;
use crate::integration::{Integration, ProviderType};
use crate::sync::outcome::Outcome;

pub use custom::CustomAdapter;
pub use mikrotik::{MikrotikAdapter, RouterEndpoint, RouterOsApi};
pub use radius::{DynamicAuthReply, DynamicAuthRequest, RadiusAdapter, RadiusApi, RadiusEndpoint};

/// Adapter-level failure. Never reaches the caller as an error: the executor
/// turns it into a failed [`Outcome`] carrying the display text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The integration is missing or has invalid settings.
    #[error("{0}")]
    Configuration(String),

    /// Stored credentials could not be opened.
    #[error("{0}")]
    Credentials(String),

    /// The device could not be reached.
    #[error("{0}")]
    Transport(String),

    /// The device answered with something we could not interpret.
    #[error("{0}")]
    Protocol(String),

    /// The device refused the operation.
    #[error("{0}")]
    Rejected(String),

    #[error("Provider did not respond within {} seconds", .0.as_secs())]
    Timeout(Duration),
}

/// Capability contract every provider implements.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Verify reachability only. Never touches customer state.
    async fn test_connection(&self, integration: &Integration) -> Result<Outcome, ProviderError>;

    async fn enable(
        &self,
        integration: &Integration,
        customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError>;

    async fn disable(
        &self,
        integration: &Integration,
        customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError>;

    async fn update_speed(
        &self,
        integration: &Integration,
        customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError>;
}

// ---------------------------------------------------------------------------
// Shared adapter helpers
// ---------------------------------------------------------------------------

/// Failure returned when a state-changing action targets a customer without
/// a network username. Produced before any I/O.
pub fn missing_username(customer: &CustomerSyncTarget) -> Outcome {
    Outcome::failure(format!(
        "Customer {} has no network username configured",
        customer.name
    ))
}

/// Failure returned when `update_speed` cannot derive a rate from the package.
pub fn missing_speed(customer: &CustomerSyncTarget) -> Outcome {
    Outcome::failure(format!(
        "Customer {} has no package speed configured",
        customer.name
    ))
}

/// The integration's host, or a configuration error.
pub fn require_host(integration: &Integration) -> Result<&str, ProviderError> {
    integration
        .host()
        .ok_or_else(|| ProviderError::Configuration("Integration host is not configured".into()))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Adapter lookup keyed by provider type. Built once at startup.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderType, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under its own provider type, replacing any
    /// previous entry.
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.provider_type(), adapter);
        self
    }

    pub fn get(&self, provider_type: ProviderType) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.adapters.keys().map(ProviderType::as_str).collect();
        types.sort_unstable();
        f.debug_struct("ProviderRegistry").field("adapters", &types).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_keys_adapters_by_their_provider_type() {
        let registry = ProviderRegistry::new().with_adapter(Arc::new(CustomAdapter));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(ProviderType::Custom).is_some());
        assert!(registry.get(ProviderType::Radius).is_none());
    }

    #[test]
    fn timeout_message_names_the_limit() {
        let err = ProviderError::Timeout(Duration::from_secs(15));
        assert_eq!(err.to_string(), "Provider did not respond within 15 seconds");
    }
}
