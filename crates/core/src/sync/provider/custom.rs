//! Adapter for tenant-specific providers.
//!
//! Only configuration checks are available; every state-changing capability
//! answers with a fixed unsupported-capability failure.

use async_trait::async_trait;
use serde_json::json;

use super::{require_host, ProviderAdapter, ProviderError};
use crate::customer::CustomerSyncTarget;
use crate::integration::{Integration, ProviderConfig, ProviderType};
use crate::sync::outcome::Outcome;

pub const NOT_IMPLEMENTED_MESSAGE: &str = "Custom provider sync not yet implemented";

/// Adapter for `provider_type = custom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomAdapter;

#[async_trait]
impl ProviderAdapter for CustomAdapter {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Custom
    }

    async fn test_connection(&self, integration: &Integration) -> Result<Outcome, ProviderError> {
        require_host(integration)?;
        let label = integration.endpoint_label().unwrap_or_default();
        let settings: Vec<&String> = match &integration.config {
            ProviderConfig::Custom(config) => config.settings.keys().collect(),
            _ => Vec::new(),
        };

        Ok(Outcome::success(format!(
            "Custom provider configuration for {label} is valid"
        ))
        .with_data(json!({ "endpoint": label, "settings": settings })))
    }

    async fn enable(
        &self,
        _integration: &Integration,
        _customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError> {
        Ok(Outcome::failure(NOT_IMPLEMENTED_MESSAGE))
    }

    async fn disable(
        &self,
        _integration: &Integration,
        _customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError> {
        Ok(Outcome::failure(NOT_IMPLEMENTED_MESSAGE))
    }

    async fn update_speed(
        &self,
        _integration: &Integration,
        _customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError> {
        Ok(Outcome::failure(NOT_IMPLEMENTED_MESSAGE))
    }
}
