//! RADIUS over UDP.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use tokio::net::UdpSocket;

use ispsync_core::sync::provider::{
    DynamicAuthReply, DynamicAuthRequest, ProviderError, RadiusApi, RadiusEndpoint,
};

use super::packet::{
    attr, code, encode_dynamic_request, encode_status_server, verify_response, Packet, RadiusError,
    MAX_PACKET_LENGTH, MIKROTIK_RATE_LIMIT, VENDOR_MIKROTIK,
};

/// Sends RADIUS requests and waits for the matching reply, retransmitting
/// the same packet on silence.
#[derive(Debug, Clone)]
pub struct RadiusUdpClient {
    /// Wait per attempt.
    attempt_timeout: Duration,
    attempts: u32,
}

impl RadiusUdpClient {
    pub fn new(attempt_timeout: Duration, attempts: u32) -> Self {
        Self {
            attempt_timeout,
            attempts: attempts.max(1),
        }
    }

    async fn resolve(endpoint: &RadiusEndpoint) -> Result<SocketAddr, ProviderError> {
        tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| ProviderError::Transport(format!("Cannot resolve {}: {e}", endpoint.host)))?
            .next()
            .ok_or_else(|| ProviderError::Transport(format!("No address for {}", endpoint.host)))
    }

    /// Send `request` and return the first verified reply with the same
    /// identifier. Replies that fail verification are dropped.
    async fn exchange(
        &self,
        endpoint: &RadiusEndpoint,
        identifier: u8,
        request: &[u8],
    ) -> Result<Packet, ProviderError> {
        let peer = Self::resolve(endpoint).await?;
        let bind = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|e| ProviderError::Transport(format!("UDP bind failed: {e}")))?;
        socket
            .connect(peer)
            .await
            .map_err(|e| ProviderError::Transport(format!("Cannot reach {}: {e}", endpoint.label())))?;

        let mut request_authenticator = [0u8; 16];
        request_authenticator.copy_from_slice(&request[4..20]);
        let secret = endpoint.secret.as_bytes();
        let mut buf = vec![0u8; MAX_PACKET_LENGTH];
        let mut last_rejection: Option<RadiusError> = None;

        for attempt in 1..=self.attempts {
            socket
                .send(request)
                .await
                .map_err(|e| ProviderError::Transport(format!("Send to {} failed: {e}", endpoint.label())))?;

            let deadline = tokio::time::Instant::now() + self.attempt_timeout;
            loop {
                let received = match tokio::time::timeout_at(deadline, socket.recv(&mut buf)).await {
                    Ok(Ok(n)) => n,
                    Ok(Err(e)) => {
                        return Err(ProviderError::Transport(format!(
                            "Receive from {} failed: {e}",
                            endpoint.label()
                        )))
                    }
                    Err(_) => break,
                };
                let reply = &buf[..received];
                if reply.len() < 2 || reply[1] != identifier {
                    continue;
                }
                match verify_response(reply, &request_authenticator, secret)
                    .and_then(|()| Packet::decode(reply))
                {
                    Ok(packet) => return Ok(packet),
                    Err(e) => {
                        tracing::warn!(peer = %endpoint.label(), error = %e, "Dropping RADIUS reply");
                        last_rejection = Some(e);
                    }
                }
            }
            tracing::debug!(peer = %endpoint.label(), attempt, "No RADIUS reply");
        }

        Err(match last_rejection {
            Some(e) => ProviderError::Protocol(format!(
                "Invalid reply from RADIUS server at {}: {e}",
                endpoint.label()
            )),
            None => ProviderError::Transport(format!(
                "RADIUS server at {} did not answer after {} attempt(s)",
                endpoint.label(),
                self.attempts
            )),
        })
    }

    async fn dynamic(
        &self,
        endpoint: &RadiusEndpoint,
        request_code: u8,
        request: &DynamicAuthRequest,
    ) -> Result<DynamicAuthReply, ProviderError> {
        let identifier = random_identifier();
        let mut packet = Packet::new(request_code, identifier);
        packet
            .push(attr::USER_NAME, request.username.as_bytes())
            .map_err(codec_error)?;
        if let Some(rate) = &request.rate_limit {
            packet
                .push_vendor(VENDOR_MIKROTIK, MIKROTIK_RATE_LIMIT, rate.as_bytes())
                .map_err(codec_error)?;
        }
        let bytes = encode_dynamic_request(&packet, endpoint.secret.as_bytes()).map_err(codec_error)?;

        let reply = self.exchange(endpoint, identifier, &bytes).await?;
        match reply.code {
            code::COA_ACK | code::DISCONNECT_ACK => Ok(DynamicAuthReply::Ack),
            code::COA_NAK | code::DISCONNECT_NAK => Ok(DynamicAuthReply::Nak {
                error_cause: reply.error_cause(),
            }),
            other => Err(ProviderError::Protocol(format!(
                "Unexpected RADIUS reply code {other} from {}",
                endpoint.label()
            ))),
        }
    }
}

impl Default for RadiusUdpClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), 3)
    }
}

fn random_identifier() -> u8 {
    (rand::rng().next_u32() & 0xff) as u8
}

fn codec_error(e: RadiusError) -> ProviderError {
    ProviderError::Configuration(format!("Cannot build RADIUS request: {e}"))
}

#[async_trait]
impl RadiusApi for RadiusUdpClient {
    async fn status_server(&self, endpoint: &RadiusEndpoint) -> Result<(), ProviderError> {
        let identifier = random_identifier();
        let mut authenticator = [0u8; 16];
        rand::rng().fill_bytes(&mut authenticator);
        let bytes = encode_status_server(identifier, authenticator, endpoint.secret.as_bytes())
            .map_err(codec_error)?;

        let reply = self.exchange(endpoint, identifier, &bytes).await?;
        match reply.code {
            code::ACCESS_ACCEPT => Ok(()),
            code::ACCESS_REJECT => Err(ProviderError::Rejected(format!(
                "RADIUS server at {} rejected Status-Server",
                endpoint.label()
            ))),
            other => Err(ProviderError::Protocol(format!(
                "Unexpected RADIUS reply code {other} from {}",
                endpoint.label()
            ))),
        }
    }

    async fn change_of_authorization(
        &self,
        endpoint: &RadiusEndpoint,
        request: &DynamicAuthRequest,
    ) -> Result<DynamicAuthReply, ProviderError> {
        self.dynamic(endpoint, code::COA_REQUEST, request).await
    }

    async fn disconnect(
        &self,
        endpoint: &RadiusEndpoint,
        request: &DynamicAuthRequest,
    ) -> Result<DynamicAuthReply, ProviderError> {
        self.dynamic(endpoint, code::DISCONNECT_REQUEST, request).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
