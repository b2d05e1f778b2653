//! Structured-log sink for platform events.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every event through `tracing`. Anything but a successful sync is
//! logged at warn level.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::PlatformEvent;
use crate::sync::SYNC_SUCCEEDED;

pub struct EventLogger;

impl EventLogger {
    /// Run until `cancel` fires or the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<PlatformEvent>, cancel: CancellationToken) {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event logger stopping");
                    break;
                }
                received = receiver.recv() => received,
            };
            match received {
                Ok(event) => Self::log(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
    }

    fn log(event: &PlatformEvent) {
        let tenant_id = event.tenant_id.map(|id| id.to_string()).unwrap_or_default();
        let source_id = event.source_entity_id.map(|id| id.to_string()).unwrap_or_default();
        if event.event_type == SYNC_SUCCEEDED {
            tracing::info!(
                event_type = %event.event_type,
                tenant_id = %tenant_id,
                source_id = %source_id,
                payload = %event.payload,
                "Platform event"
            );
        } else {
            tracing::warn!(
                event_type = %event.event_type,
                tenant_id = %tenant_id,
                source_id = %source_id,
                payload = %event.payload,
                "Platform event"
            );
        }
    }
}
