//! Platform events emitted by the integration sync engine.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope.
//! - [`sync_events`]: turns a completed sync into the events it should
//!   publish.
//! - [`EventLogger`]: background subscriber writing every event to the
//!   structured log.

pub mod bus;
pub mod logger;
pub mod sync;

pub use bus::{EventBus, PlatformEvent};
pub use logger::EventLogger;
pub use sync::sync_events;
