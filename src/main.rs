//! RyDrive - Entry Point
//!
//! A self-hosted file storage server with a small HTTP API.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use rydrive::{ConfigOverrides, Server, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "rydrive", version, about = "Self-hosted file storage server")]
struct Args {
    /// Config file (defaults to ./rydrive.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory all files are stored in
    #[arg(short, long)]
    data_dir: Option<String>,

    /// Address to bind
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port to bind
    #[arg(short, long)]
    port: Option<u16>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        ConfigOverrides {
            config_file: args.config,
            data_dir: args.data_dir,
            host: args.host,
            port: args.port,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match ServerConfig::load(&args.into()) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Launching RyDrive server...");

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
