//! Server core functionality
//!
//! HTTP routing, request handlers and the listener lifecycle.

pub mod core;
pub mod handlers;

pub use self::core::{Server, router};
