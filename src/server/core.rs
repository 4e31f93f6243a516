use log::{debug, error, info, warn};
use std::io;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::error::{StartupError, handle_session_error};
use crate::server::config::ServerConfig;
use crate::session::{ControlSession, SessionContext, SessionOutcome};
use crate::storage::DirectoryCatalog;
use crate::transfer::resolve_bind;

/// Control-connection listener.
///
/// Connections are served strictly one at a time: each session, including
/// its data transfer, finishes before the next connection is accepted.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    context: SessionContext,
}

impl Server {
    /// Resolves, binds and listens. Any failure here is fatal for the process.
    pub async fn bind(config: &ServerConfig) -> Result<Self, StartupError> {
        let endpoints = resolve_bind(&config.bind_address, config.control_port).await?;

        let mut last_error = None;
        let mut bound = None;
        for addr in endpoints {
            match listen_on(addr, config.listen_backlog) {
                Ok(listener) => {
                    bound = Some(listener);
                    break;
                }
                Err(e) => {
                    warn!("Failed to bind {}: {}", addr, e);
                    last_error = Some(StartupError::Bind(addr, e));
                }
            }
        }

        let listener = match bound {
            Some(listener) => listener,
            None => {
                return Err(last_error.unwrap_or_else(|| {
                    StartupError::NoListener(format!("{}:{}", config.bind_address, config.control_port))
                }));
            }
        };
        let local_addr = listener
            .local_addr()
            .map_err(|e| StartupError::NoListener(e.to_string()))?;

        let root = config.server_root_path();
        if !root.is_dir() {
            warn!("Server root {} is not a directory", root.display());
        }

        info!("Server open on {}", local_addr);
        info!("Serving regular files from {}", root.display());

        let context = SessionContext::new(DirectoryCatalog::new(root), config.session_settings());

        Ok(Self {
            listener,
            local_addr,
            context,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts and serves connections forever.
    pub async fn serve(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    handle_connection(stream, peer, &self.context).await;
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Runs one session on an accepted connection, then closes it.
///
/// Session failures are logged here and never propagate to the listener.
pub async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    context: &SessionContext,
) -> Option<SessionOutcome> {
    info!("Accepted control connection from {}", peer);

    let outcome = match ControlSession::new(&mut stream, peer, context).run().await {
        Ok(outcome) => {
            info!("Session with {} complete: {}", peer, outcome);
            Some(outcome)
        }
        Err(e) => {
            handle_session_error(peer, &e);
            None
        }
    };

    if let Err(e) = stream.shutdown().await {
        debug!("Shutdown of control connection from {} failed: {}", peer, e);
    }
    info!("Connection closed. Waiting for new connection.");

    outcome
}

fn listen_on(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}
