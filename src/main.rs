//! ftserve - Entry Point
//!
//! Serves the regular files of one directory to clients that list or fetch
//! them over a control connection plus a server-initiated data connection.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process;

use ftserve::protocol::Framing;
use ftserve::server::{Server, ServerConfig};
use ftserve::utils::logging::setup_logging;

#[derive(Parser, Debug)]
#[command(name = "ftserve", version, about = "Two-channel file sharing server")]
struct Args {
    /// Port the control listener binds to
    port: u16,

    /// Configuration file (defaults to ./ftserve.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory to serve instead of the configured server_root
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Data framing: fixed or length_prefixed
    #[arg(long)]
    framing: Option<Framing>,
}

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    setup_logging();
    let args = Args::parse();

    let mut config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };
    config.control_port = args.port;
    if let Some(root) = &args.root {
        config.server_root = root.to_string_lossy().into_owned();
    }
    if let Some(framing) = args.framing {
        config.framing = framing;
    }
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    info!("Launching file server on port {}...", config.control_port);

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    tokio::select! {
        _ = server.serve() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }
}
