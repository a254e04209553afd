//! Error handling
//!
//! Defines error types and their HTTP mapping for the storage server.

pub mod handlers;
pub mod types;

pub use handlers::status_for;
pub use types::*;
