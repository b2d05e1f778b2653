//! MikroTik RouterOS adapter.
//!
//! Subscribers are PPP secrets named after the customer's network username.
//! Enabling and disabling toggle the secret; suspended subscribers are also
//! parked in the configured firewall address list. Speed changes go to the
//! subscriber's simple queue.

use async_trait::async_trait;
use serde_json::json;

use super::{missing_speed, missing_username, require_host, ProviderAdapter, ProviderError};
use crate::crypto::CredentialCipher;
use crate::customer::CustomerSyncTarget;
use crate::integration::{Integration, MikrotikConfig, ProviderConfig, ProviderType};
use crate::speed::RateLimit;
use crate::sync::outcome::Outcome;

/// Connection parameters for one RouterOS device.
#[derive(Clone, PartialEq, Eq)]
pub struct RouterEndpoint {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub username: String,
    pub password: String,
}

impl RouterEndpoint {
    pub fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for RouterEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// The RouterOS operations the adapter needs. Implemented over the REST API
/// by `ispsync_network::RouterOsRestClient`.
#[async_trait]
pub trait RouterOsApi: Send + Sync {
    /// Read `/system/identity`.
    async fn identity(&self, endpoint: &RouterEndpoint) -> Result<String, ProviderError>;

    /// Set the `disabled` flag of the PPP secret `name`.
    async fn set_secret_disabled(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
        disabled: bool,
    ) -> Result<(), ProviderError>;

    /// Assign a PPP profile to the secret `name`.
    async fn set_secret_profile(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
        profile: &str,
    ) -> Result<(), ProviderError>;

    /// Drop active PPP sessions of `name`; returns how many were closed.
    async fn remove_active_sessions(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
    ) -> Result<u32, ProviderError>;

    /// Add the active session address of `name` to `list`. Returns the
    /// address, or `None` when the subscriber is offline.
    async fn suspend_address(
        &self,
        endpoint: &RouterEndpoint,
        list: &str,
        name: &str,
    ) -> Result<Option<String>, ProviderError>;

    /// Remove every entry of `list` tagged with `name`; returns the count.
    async fn release_address(
        &self,
        endpoint: &RouterEndpoint,
        list: &str,
        name: &str,
    ) -> Result<u32, ProviderError>;

    /// Set `max-limit` on the simple queue `name`.
    async fn set_queue_limit(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
        max_limit: &str,
    ) -> Result<(), ProviderError>;
}

/// Adapter for `provider_type = mikrotik`.
pub struct MikrotikAdapter<A> {
    api: A,
    cipher: CredentialCipher,
}

impl<A: RouterOsApi> MikrotikAdapter<A> {
    pub fn new(api: A, cipher: CredentialCipher) -> Self {
        Self { api, cipher }
    }

    fn config(integration: &Integration) -> Result<&MikrotikConfig, ProviderError> {
        match &integration.config {
            ProviderConfig::Mikrotik(config) => Ok(config),
            other => Err(ProviderError::Configuration(format!(
                "Integration is configured for {}, not MikroTik",
                other.provider_type().display_name()
            ))),
        }
    }

    fn endpoint(&self, integration: &Integration) -> Result<RouterEndpoint, ProviderError> {
        let config = Self::config(integration)?;
        let host = require_host(integration)?.to_string();
        let port = integration
            .effective_port()
            .ok_or_else(|| ProviderError::Configuration("Integration port is not configured".into()))?;
        let username = integration
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Configuration("Router API username is not configured".into())
            })?;
        let password = match &integration.encrypted_credentials {
            Some(sealed) => self
                .cipher
                .open(integration.tenant_id, sealed)
                .map_err(|e| ProviderError::Credentials(format!("Cannot read router credentials: {e}")))?,
            None => String::new(),
        };

        Ok(RouterEndpoint {
            host,
            port,
            use_ssl: config.use_ssl,
            username,
            password,
        })
    }
}

#[async_trait]
impl<A: RouterOsApi> ProviderAdapter for MikrotikAdapter<A> {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Mikrotik
    }

    async fn test_connection(&self, integration: &Integration) -> Result<Outcome, ProviderError> {
        let endpoint = self.endpoint(integration)?;
        let identity = self.api.identity(&endpoint).await?;

        Ok(Outcome::success(format!(
            "Connected to MikroTik router at {} (identity: {identity})",
            endpoint.label()
        ))
        .with_data(json!({
            "host": endpoint.host,
            "port": endpoint.port,
            "identity": identity,
        })))
    }

    async fn enable(
        &self,
        integration: &Integration,
        customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError> {
        let Some(username) = customer.network_username() else {
            return Ok(missing_username(customer));
        };
        let config = Self::config(integration)?;
        let endpoint = self.endpoint(integration)?;

        self.api.set_secret_disabled(&endpoint, username, false).await?;
        if let Some(profile) = &config.ppp_profile {
            self.api.set_secret_profile(&endpoint, username, profile).await?;
        }
        let released = match &config.address_list {
            Some(list) => self.api.release_address(&endpoint, list, username).await?,
            None => 0,
        };

        Ok(Outcome::success(format!(
            "Customer {} enabled on MikroTik router {}",
            customer.name,
            endpoint.label()
        ))
        .with_data(json!({
            "username": username,
            "ppp_profile": config.ppp_profile,
            "released_addresses": released,
        })))
    }

    async fn disable(
        &self,
        integration: &Integration,
        customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError> {
        let Some(username) = customer.network_username() else {
            return Ok(missing_username(customer));
        };
        let config = Self::config(integration)?;
        let endpoint = self.endpoint(integration)?;

        // The session address is only known while the session is up.
        let suspended_address = match &config.address_list {
            Some(list) => self.api.suspend_address(&endpoint, list, username).await?,
            None => None,
        };
        self.api.set_secret_disabled(&endpoint, username, true).await?;
        let sessions_closed = self.api.remove_active_sessions(&endpoint, username).await?;

        Ok(Outcome::success(format!(
            "Customer {} disabled on MikroTik router {}",
            customer.name,
            endpoint.label()
        ))
        .with_data(json!({
            "username": username,
            "sessions_closed": sessions_closed,
            "suspended_address": suspended_address,
        })))
    }

    async fn update_speed(
        &self,
        integration: &Integration,
        customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError> {
        let Some(username) = customer.network_username() else {
            return Ok(missing_username(customer));
        };
        let Some(label) = customer.speed_label.as_deref().filter(|l| !l.trim().is_empty()) else {
            return Ok(missing_speed(customer));
        };
        let rate = match RateLimit::from_speed_label(label) {
            Ok(rate) => rate,
            Err(_) => {
                return Ok(Outcome::failure(format!(
                    "Customer {} has an unrecognised package speed '{label}'",
                    customer.name
                )))
            }
        };
        let endpoint = self.endpoint(integration)?;

        let max_limit = rate.to_routeros();
        self.api.set_queue_limit(&endpoint, username, &max_limit).await?;

        Ok(Outcome::success(format!(
            "Speed for customer {} set to {label} on MikroTik router {}",
            customer.name,
            endpoint.label()
        ))
        .with_data(json!({
            "username": username,
            "bandwidth_profile": label,
            "rate_limit": max_limit,
        })))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
