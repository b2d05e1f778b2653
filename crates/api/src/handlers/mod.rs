pub mod integrations;
pub mod sync;
