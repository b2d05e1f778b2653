//! Shared fixtures for sync engine tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::crypto::CredentialCipher;
use crate::customer::CustomerSyncTarget;
use crate::integration::{
    CustomConfig, Integration, MikrotikConfig, ProviderConfig, RadiusConfig, SyncMode,
};
use crate::roles::ROLE_STAFF;
use crate::sync::access::Caller;
use crate::sync::provider::{
    DynamicAuthReply, DynamicAuthRequest, ProviderError, RadiusApi, RadiusEndpoint, RouterEndpoint,
    RouterOsApi,
};
use crate::types::DbId;

pub fn test_cipher() -> CredentialCipher {
    CredentialCipher::from_secret("test-credentials-secret").unwrap()
}

pub fn staff_caller(tenant_id: DbId) -> Caller {
    Caller {
        user_id: DbId::new_v4(),
        tenant_id: Some(tenant_id),
        role: ROLE_STAFF.to_string(),
    }
}

pub fn customer(name: &str, username: Option<&str>, speed: Option<&str>) -> CustomerSyncTarget {
    CustomerSyncTarget {
        id: DbId::new_v4(),
        name: name.to_string(),
        network_username: username.map(String::from),
        connection_status: Some("active".to_string()),
        package_name: speed.map(|s| format!("Home {s}")),
        speed_label: speed.map(String::from),
    }
}

fn integration(name: &str, host: Option<&str>, port: Option<u16>, config: ProviderConfig) -> Integration {
    Integration {
        id: DbId::new_v4(),
        tenant_id: DbId::new_v4(),
        name: name.to_string(),
        host: host.map(String::from),
        port,
        username: None,
        encrypted_credentials: None,
        config,
        sync_mode: SyncMode::Manual,
        sync_interval_minutes: None,
        is_enabled: true,
        last_sync_at: None,
        last_sync_started_at: None,
        last_sync_status: None,
    }
}

pub fn mikrotik_integration(host: &str, port: u16) -> Integration {
    let mut integration = integration(
        "Core router",
        Some(host),
        Some(port),
        ProviderConfig::Mikrotik(MikrotikConfig::default()),
    );
    integration.username = Some("api".to_string());
    integration
}

pub fn radius_integration(host: &str) -> Integration {
    integration(
        "AAA",
        Some(host),
        None,
        ProviderConfig::Radius(RadiusConfig {
            auth_port: 1812,
            acct_port: 1813,
            coa_port: 3799,
            secret: "testing123".to_string(),
        }),
    )
}

pub fn custom_integration() -> Integration {
    integration(
        "Partner OSS",
        Some("oss.example.net"),
        None,
        ProviderConfig::Custom(CustomConfig::default()),
    )
}

// ---------------------------------------------------------------------------
// RouterOS fake
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RouterState {
    calls: Vec<String>,
    last_password: Option<String>,
}

/// Records every RouterOS call; clones share the record.
#[derive(Clone, Default)]
pub struct FakeRouterOs {
    state: Arc<Mutex<RouterState>>,
    failure: Option<String>,
}

impl FakeRouterOs {
    /// A router whose every call fails with a transport error.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn last_password(&self) -> Option<String> {
        self.state.lock().unwrap().last_password.clone()
    }

    fn record(&self, endpoint: &RouterEndpoint, call: String) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.last_password = Some(endpoint.password.clone());
        match &self.failure {
            Some(message) => Err(ProviderError::Transport(message.clone())),
            None => {
                state.calls.push(call);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RouterOsApi for FakeRouterOs {
    async fn identity(&self, endpoint: &RouterEndpoint) -> Result<String, ProviderError> {
        self.record(endpoint, "identity".into())?;
        Ok("core-router".to_string())
    }

    async fn set_secret_disabled(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
        disabled: bool,
    ) -> Result<(), ProviderError> {
        self.record(endpoint, format!("set_secret_disabled:{name}:{disabled}"))
    }

    async fn set_secret_profile(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
        profile: &str,
    ) -> Result<(), ProviderError> {
        self.record(endpoint, format!("set_secret_profile:{name}:{profile}"))
    }

    async fn remove_active_sessions(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
    ) -> Result<u32, ProviderError> {
        self.record(endpoint, format!("remove_active_sessions:{name}"))?;
        Ok(1)
    }

    async fn suspend_address(
        &self,
        endpoint: &RouterEndpoint,
        list: &str,
        name: &str,
    ) -> Result<Option<String>, ProviderError> {
        self.record(endpoint, format!("suspend_address:{list}:{name}"))?;
        Ok(Some("10.0.0.2".to_string()))
    }

    async fn release_address(
        &self,
        endpoint: &RouterEndpoint,
        list: &str,
        name: &str,
    ) -> Result<u32, ProviderError> {
        self.record(endpoint, format!("release_address:{list}:{name}"))?;
        Ok(1)
    }

    async fn set_queue_limit(
        &self,
        endpoint: &RouterEndpoint,
        name: &str,
        max_limit: &str,
    ) -> Result<(), ProviderError> {
        self.record(endpoint, format!("set_queue_limit:{name}:{max_limit}"))
    }
}

// ---------------------------------------------------------------------------
// RADIUS fake
// ---------------------------------------------------------------------------

/// Answers every dynamic-authorization request with a fixed reply.
#[derive(Clone)]
pub struct FakeRadius {
    calls: Arc<Mutex<Vec<String>>>,
    reply: DynamicAuthReply,
}

impl FakeRadius {
    pub fn acking() -> Self {
        Self {
            calls: Arc::default(),
            reply: DynamicAuthReply::Ack,
        }
    }

    pub fn nak(error_cause: Option<u32>) -> Self {
        Self {
            calls: Arc::default(),
            reply: DynamicAuthReply::Nak { error_cause },
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RadiusApi for FakeRadius {
    async fn status_server(&self, endpoint: &RadiusEndpoint) -> Result<(), ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("status_server:{}", endpoint.label()));
        Ok(())
    }

    async fn change_of_authorization(
        &self,
        endpoint: &RadiusEndpoint,
        request: &DynamicAuthRequest,
    ) -> Result<DynamicAuthReply, ProviderError> {
        self.calls.lock().unwrap().push(format!(
            "coa:{}:{}:{}",
            endpoint.label(),
            request.username,
            request.rate_limit.as_deref().unwrap_or("-")
        ));
        Ok(self.reply)
    }

    async fn disconnect(
        &self,
        endpoint: &RadiusEndpoint,
        request: &DynamicAuthRequest,
    ) -> Result<DynamicAuthReply, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("disconnect:{}:{}", endpoint.label(), request.username));
        Ok(self.reply)
    }
}
