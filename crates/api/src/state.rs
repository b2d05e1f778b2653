use std::sync::Arc;

use ispsync_core::crypto::CredentialCipher;
use ispsync_core::sync::{AccessGate, SyncDispatcher};

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: ispsync_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Tenant access gate shared with the dispatcher.
    pub gate: Arc<dyn AccessGate>,
    pub dispatcher: Arc<SyncDispatcher>,
    /// Seals integration passwords on create and update.
    pub cipher: CredentialCipher,
    pub event_bus: Arc<ispsync_events::EventBus>,
}
