//! Authentication primitives.
//!
//! - [`jwt`] -- access-token issuing and validation.

pub mod jwt;
