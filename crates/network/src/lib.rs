//! Network transports for the provider adapters.
//!
//! [`RouterOsRestClient`] talks to MikroTik routers over the RouterOS REST
//! API; [`RadiusUdpClient`] speaks RADIUS Status-Server and dynamic
//! authorization over UDP. [`provider_registry`] wires both into the core
//! adapters.

pub mod radius;
pub mod routeros;

use std::sync::Arc;
use std::time::Duration;

use ispsync_core::crypto::CredentialCipher;
use ispsync_core::sync::provider::{
    CustomAdapter, MikrotikAdapter, ProviderRegistry, RadiusAdapter,
};

pub use radius::{RadiusError, RadiusUdpClient};
pub use routeros::RouterOsRestClient;

/// RADIUS retransmissions within one provider call.
const RADIUS_ATTEMPTS: u32 = 3;

/// Registry with the production adapter for every provider type.
///
/// `provider_timeout` bounds one whole provider call; the RADIUS client
/// splits it across its retransmissions.
pub fn provider_registry(
    cipher: CredentialCipher,
    provider_timeout: Duration,
) -> Result<ProviderRegistry, reqwest::Error> {
    let router_api = RouterOsRestClient::new(provider_timeout)?;
    let radius_api = RadiusUdpClient::new(provider_timeout / RADIUS_ATTEMPTS, RADIUS_ATTEMPTS);

    Ok(ProviderRegistry::new()
        .with_adapter(Arc::new(MikrotikAdapter::new(router_api, cipher)))
        .with_adapter(Arc::new(RadiusAdapter::new(radius_api)))
        .with_adapter(Arc::new(CustomAdapter)))
}
