use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use log::{error, info};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::middleware::log_request;
use crate::server::handlers::{self, AppState};
use crate::storage::StorageGateway;

pub struct Server {
    listener: TcpListener,
    gateway: AppState,
}

impl Server {
    /// Prepares the data root and binds the listener.
    pub async fn bind(config: &ServerConfig) -> io::Result<Self> {
        let gateway = match StorageGateway::open(config.data_dir_path()) {
            Ok(gateway) => gateway,
            Err(e) => {
                error!("Failed to prepare data directory {}: {}", config.data_dir, e);
                return Err(e);
            }
        };
        info!("Data directory: {}", gateway.root().display());

        let address = config.bind_address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind to {}: {}", address, e);
                return Err(e);
            }
        };
        info!("Server bound to {}", listener.local_addr()?);

        Ok(Self {
            listener,
            gateway: Arc::new(gateway),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until Ctrl+C.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves requests until `shutdown` completes, then lets in-flight requests finish.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            "Starting RyDrive on http://{} (data: {})",
            self.local_addr()?,
            self.gateway.root().display()
        );

        let app = router(self.gateway);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

/// Builds the HTTP routes over a storage gateway.
pub fn router(gateway: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/index.html", get(handlers::index))
        .route("/api/list", get(handlers::list_files))
        .route("/api/download/{*path}", get(handlers::download_file))
        .route("/api/view/{*path}", get(handlers::view_file))
        .route(
            "/api/upload",
            post(handlers::upload_files).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/mkdir", post(handlers::create_folder))
        .route("/api/delete", post(handlers::delete_item))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(gateway)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            // Without a signal handler the server runs until killed.
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
