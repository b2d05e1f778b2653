//! RouterOS v7 REST API client.
//!
//! Implements [`RouterOsApi`] against `/rest/...` with HTTP basic auth.
//! Records are addressed by their `.id`, so every mutation first looks the
//! record up by name.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use ispsync_core::sync::provider::{ProviderError, RouterEndpoint, RouterOsApi};

/// One record as returned by a RouterOS print (`GET`) call.
#[derive(Debug, Clone, Deserialize)]
struct RouterRecord {
    #[serde(rename = ".id")]
    id: String,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Identity {
    name: String,
}

/// Error body RouterOS sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct RouterOsFault {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// HTTP client for RouterOS devices. One instance serves every router;
/// connection details come with each call.
#[derive(Debug, Clone)]
pub struct RouterOsRestClient {
    client: reqwest::Client,
}

impl RouterOsRestClient {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn url(endpoint: &RouterEndpoint, path: &str) -> String {
        let scheme = if endpoint.use_ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}/rest{path}", endpoint.host, endpoint.port)
    }

    fn request(
        &self,
        method: reqwest::Method,
        endpoint: &RouterEndpoint,
        path: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, Self::url(endpoint, path))
            .basic_auth(&endpoint.username, Some(&endpoint.password))
    }

    async fn send(
        endpoint: &RouterEndpoint,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Transport(format!("Router at {} timed out", endpoint.label()))
            } else {
                ProviderError::Transport(format!("Cannot reach router at {}: {e}", endpoint.label()))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Rejected(format!(
                "Router at {} rejected the API credentials",
                endpoint.label()
            )));
        }

        let fault = response.json::<RouterOsFault>().await.ok();
        let reason = fault
            .and_then(|f| f.detail.or(f.message))
            .unwrap_or_else(|| status.to_string());
        Err(ProviderError::Rejected(format!(
            "RouterOS error ({}): {reason}",
            status.as_u16()
        )))
    }

    async fn json<T: serde::de::DeserializeOwned>(
        endpoint: &RouterEndpoint,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ProviderError> {
        Self::send(endpoint, builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Protocol(format!("Unexpected RouterOS response: {e}")))
    }

    async fn find(
        &self,
        endpoint: &RouterEndpoint,
        path: &str,
        filter: &[(&str, &str)],
    ) -> Result<Vec<RouterRecord>, ProviderError> {
        let builder = self.request(reqwest::Method::GET, endpoint, path).query(filter);
        Self::json(endpoint, builder).await
    }

    async fn find_one(
        &self,
        endpoint: &RouterEndpoint,
        path: &str,
        what: &str,
        name: &str,
    ) -> Result<RouterRecord, ProviderError> {
        self.find(endpoint, path, &[("name", name)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Rejected(format!("No {what} named '{name}' on the router")))
    }

    async fn patch(
        &self,
        endpoint: &RouterEndpoint,
        path: &str,
        id: &str,
        body: serde_json::Value,
    ) -> Result<(), ProviderError> {
        let builder = self
            .request(reqwest::Method::PATCH, endpoint, &format!("{path}/{id}"))
            .json(&body);
        Self::send(endpoint, builder).await.map(|_| ())
    }

    async fn delete(&self, endpoint: &RouterEndpoint, path: &str, id: &str) -> Result<(), ProviderError> {
        let builder = self.request(reqwest::Method::DELETE, endpoint, &format!("{path}/{id}"));
        Self::send(endpoint, builder).await.map(|_| ())
    }
}

const SECRETS: &str = "/ppp/secret";
const ACTIVE: &str = "/ppp/active";
const ADDRESS_LIST: &str = "/ip/firewall/address-list";
const QUEUES: &str = "/queue/simple";

#[async_trait]
impl RouterOsApi for RouterOsRestClient {
    async fn identity(&self, endpoint: &RouterEndpoint) -> Result<String, ProviderError> {
        let builder = self.request(reqwest::Method::GET, endpoint, "/system/identity");
        let identity: Identity = Self::json(endpoint, builder).await?;
        Ok(identity.name)
    }

    async fn set_secret_disabled(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
        disabled: bool,
    ) -> Result<(), ProviderError> {
        let secret = self.find_one(endpoint, SECRETS, "PPP secret", name).await?;
        self.patch(endpoint, SECRETS, &secret.id, json!({ "disabled": disabled.to_string() }))
            .await
    }

    async fn set_secret_profile(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
        profile: &str,
    ) -> Result<(), ProviderError> {
        let secret = self.find_one(endpoint, SECRETS, "PPP secret", name).await?;
        self.patch(endpoint, SECRETS, &secret.id, json!({ "profile": profile }))
            .await
    }

    async fn remove_active_sessions(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
    ) -> Result<u32, ProviderError> {
        let sessions = self.find(endpoint, ACTIVE, &[("name", name)]).await?;
        let mut closed = 0;
        for session in &sessions {
            self.delete(endpoint, ACTIVE, &session.id).await?;
            closed += 1;
        }
        Ok(closed)
    }

    async fn suspend_address(
        &self,
        endpoint: &RouterEndpoint,
        list: &str,
        name: &str,
    ) -> Result<Option<String>, ProviderError> {
        let sessions = self.find(endpoint, ACTIVE, &[("name", name)]).await?;
        let Some(address) = sessions.into_iter().find_map(|s| s.address) else {
            return Ok(None);
        };

        let builder = self
            .request(reqwest::Method::PUT, endpoint, ADDRESS_LIST)
            .json(&json!({ "list": list, "address": address, "comment": name }));
        Self::send(endpoint, builder).await?;
        Ok(Some(address))
    }

    async fn release_address(
        &self,
        endpoint: &RouterEndpoint,
        list: &str,
        name: &str,
    ) -> Result<u32, ProviderError> {
        let entries = self
            .find(endpoint, ADDRESS_LIST, &[("list", list), ("comment", name)])
            .await?;
        let mut released = 0;
        for entry in &entries {
            self.delete(endpoint, ADDRESS_LIST, &entry.id).await?;
            released += 1;
        }
        Ok(released)
    }

    async fn set_queue_limit(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
        max_limit: &str,
    ) -> Result<(), ProviderError> {
        let queue = self.find_one(endpoint, QUEUES, "simple queue", name).await?;
        self.patch(endpoint, QUEUES, &queue.id, json!({ "max-limit": max_limit }))
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
