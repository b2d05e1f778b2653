//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row plus the conversion onto the `ispsync-core` domain type. Insert and
//! update DTOs sit next to the entity they write.

pub mod customer;
pub mod integration;
pub mod sync_log;
