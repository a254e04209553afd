pub mod config;
pub mod error;
pub mod middleware;
pub mod server;
pub mod storage;

pub use config::{ConfigOverrides, ServerConfig};
pub use error::{ApiError, StorageError};
pub use server::Server;
pub use storage::{PathResolver, StorageGateway};
