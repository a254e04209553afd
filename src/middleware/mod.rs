//! Server middleware
//!
//! Request logging.

pub mod logging;

pub use logging::log_request;
