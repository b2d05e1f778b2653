//! RADIUS transport for the RADIUS provider adapter.

mod client;
pub mod packet;

pub use client::RadiusUdpClient;
pub use packet::RadiusError;
