//! RADIUS adapter.
//!
//! Reachability is checked with Status-Server (RFC 5997). Subscriber state is
//! changed through dynamic authorization (RFC 5176): Disconnect-Request to
//! cut a session, CoA-Request to push a new rate limit.

use async_trait::async_trait;
use serde_json::json;

use super::{missing_speed, missing_username, require_host, ProviderAdapter, ProviderError};
use crate::customer::CustomerSyncTarget;
use crate::integration::{Integration, ProviderConfig, ProviderType, RadiusConfig};
use crate::speed::RateLimit;
use crate::sync::outcome::Outcome;

/// RFC 5176 Error-Cause "Session-Context-Not-Found".
pub const ERROR_CAUSE_SESSION_NOT_FOUND: u32 = 503;

/// Address and shared secret of a RADIUS peer.
#[derive(Clone, PartialEq, Eq)]
pub struct RadiusEndpoint {
    pub host: String,
    pub port: u16,
    pub secret: String,
}

impl RadiusEndpoint {
    pub fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for RadiusEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadiusEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

/// Attributes of a CoA or Disconnect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicAuthRequest {
    pub username: String,
    /// `Mikrotik-Rate-Limit` value, e.g. `"30M/30M"`.
    pub rate_limit: Option<String>,
}

/// NAS answer to a dynamic-authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicAuthReply {
    Ack,
    Nak { error_cause: Option<u32> },
}

/// The RADIUS exchanges the adapter needs. Implemented over UDP by
/// `ispsync_network::RadiusUdpClient`.
#[async_trait]
pub trait RadiusApi: Send + Sync {
    /// Send Status-Server and wait for Access-Accept.
    async fn status_server(&self, endpoint: &RadiusEndpoint) -> Result<(), ProviderError>;

    async fn change_of_authorization(
        &self,
        endpoint: &RadiusEndpoint,
        request: &DynamicAuthRequest,
    ) -> Result<DynamicAuthReply, ProviderError>;

    async fn disconnect(
        &self,
        endpoint: &RadiusEndpoint,
        request: &DynamicAuthRequest,
    ) -> Result<DynamicAuthReply, ProviderError>;
}

/// Adapter for `provider_type = radius`.
pub struct RadiusAdapter<A> {
    api: A,
}

impl<A: RadiusApi> RadiusAdapter<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    fn config(integration: &Integration) -> Result<&RadiusConfig, ProviderError> {
        match &integration.config {
            ProviderConfig::Radius(config) => Ok(config),
            other => Err(ProviderError::Configuration(format!(
                "Integration is configured for {}, not RADIUS",
                other.provider_type().display_name()
            ))),
        }
    }

    fn auth_endpoint(integration: &Integration) -> Result<RadiusEndpoint, ProviderError> {
        let config = Self::config(integration)?;
        Ok(RadiusEndpoint {
            host: require_host(integration)?.to_string(),
            port: integration.port.unwrap_or(config.auth_port),
            secret: config.secret.clone(),
        })
    }

    fn coa_endpoint(integration: &Integration) -> Result<RadiusEndpoint, ProviderError> {
        let config = Self::config(integration)?;
        Ok(RadiusEndpoint {
            host: require_host(integration)?.to_string(),
            port: config.coa_port,
            secret: config.secret.clone(),
        })
    }
}

fn nak_message(kind: &str, username: &str, error_cause: Option<u32>) -> String {
    match error_cause {
        Some(cause) => format!("NAS rejected {kind} for {username} (Error-Cause {cause})"),
        None => format!("NAS rejected {kind} for {username}"),
    }
}

#[async_trait]
impl<A: RadiusApi> ProviderAdapter for RadiusAdapter<A> {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Radius
    }

    async fn test_connection(&self, integration: &Integration) -> Result<Outcome, ProviderError> {
        let config = Self::config(integration)?;
        let endpoint = Self::auth_endpoint(integration)?;
        self.api.status_server(&endpoint).await?;

        Ok(Outcome::success(format!(
            "RADIUS server at {} answered Status-Server",
            endpoint.label()
        ))
        .with_data(json!({
            "host": endpoint.host,
            "auth_port": endpoint.port,
            "acct_port": config.acct_port,
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
        let endpoint = Self::coa_endpoint(integration)?;
        // An unparseable label only means no rate attribute on re-authorization.
        let rate_limit = customer
            .speed_label
            .as_deref()
            .and_then(|label| RateLimit::from_speed_label(label).ok())
            .map(|rate| rate.to_routeros());

        let request = DynamicAuthRequest {
            username: username.to_string(),
            rate_limit: rate_limit.clone(),
        };
        match self.api.change_of_authorization(&endpoint, &request).await? {
            DynamicAuthReply::Ack => Ok(Outcome::success(format!(
                "Customer {} re-authorized via RADIUS CoA",
                customer.name
            ))
            .with_data(json!({
                "username": username,
                "rate_limit": rate_limit,
                "session_found": true,
            }))),
            DynamicAuthReply::Nak {
                error_cause: Some(ERROR_CAUSE_SESSION_NOT_FOUND),
            } => Ok(Outcome::success(format!(
                "Customer {} has no active session; access applies at next login",
                customer.name
            ))
            .with_data(json!({
                "username": username,
                "rate_limit": rate_limit,
                "session_found": false,
            }))),
            DynamicAuthReply::Nak { error_cause } => {
                Ok(Outcome::failure(nak_message("CoA", username, error_cause)))
            }
        }
    }

    async fn disable(
        &self,
        integration: &Integration,
        customer: &CustomerSyncTarget,
    ) -> Result<Outcome, ProviderError> {
        let Some(username) = customer.network_username() else {
            return Ok(missing_username(customer));
        };
        let endpoint = Self::coa_endpoint(integration)?;

        let request = DynamicAuthRequest {
            username: username.to_string(),
            rate_limit: None,
        };
        match self.api.disconnect(&endpoint, &request).await? {
            DynamicAuthReply::Ack => Ok(Outcome::success(format!(
                "Customer {} disconnected via RADIUS",
                customer.name
            ))
            .with_data(json!({ "username": username, "session_found": true }))),
            DynamicAuthReply::Nak {
                error_cause: Some(ERROR_CAUSE_SESSION_NOT_FOUND),
            } => Ok(Outcome::success(format!(
                "Customer {} has no active session to disconnect",
                customer.name
            ))
            .with_data(json!({ "username": username, "session_found": false }))),
            DynamicAuthReply::Nak { error_cause } => Ok(Outcome::failure(nak_message(
                "Disconnect-Request",
                username,
                error_cause,
            ))),
        }
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
        let endpoint = Self::coa_endpoint(integration)?;

        let request = DynamicAuthRequest {
            username: username.to_string(),
            rate_limit: Some(rate.to_routeros()),
        };
        match self.api.change_of_authorization(&endpoint, &request).await? {
            DynamicAuthReply::Ack => Ok(Outcome::success(format!(
                "Bandwidth profile for customer {} set to {label}",
                customer.name
            ))
            .with_data(json!({
                "username": username,
                "bandwidth_profile": label,
                "rate_limit": rate.to_routeros(),
            }))),
            DynamicAuthReply::Nak { error_cause } => {
                Ok(Outcome::failure(nak_message("CoA", username, error_cause)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
