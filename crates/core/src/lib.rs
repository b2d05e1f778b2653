//! Domain core of the network integration sync engine.
//!
//! Everything here is storage- and transport-agnostic: the sync pipeline
//! talks to the database through the traits in [`sync::store`] and to
//! network devices through the transport traits in [`sync::provider`].

pub mod crypto;
pub mod customer;
pub mod error;
pub mod integration;
pub mod roles;
pub mod speed;
pub mod sync;
pub mod types;
