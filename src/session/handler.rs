//! Control session handler
//!
//! Drives one accepted control connection through the handshake, dispatches
//! the list or fetch command, and opens the data channel back to the client
//! when there is a payload to deliver.
//!
//! Exchange on the control connection, one token per step:
//!
//! ```text
//! client: <data port>      server: NE
//! client: <command>        server: NE
//! client: <host>           server: NCE | CE
//! client: <file name>      server: NFE | FE      (fetch only)
//! ```
//!
//! The session never closes the control connection itself; the caller does
//! that once [`ControlSession::run`] returns.

use log::{debug, info, warn};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::SessionError;
use crate::protocol::{Command, Field, Reply, Token, read_token, write_token};
use crate::server::config::SessionSettings;
use crate::session::results::SessionOutcome;
use crate::session::state::SessionState;
use crate::storage::DirectoryCatalog;
use crate::transfer::{DataChannel, DataTarget, open_for_transfer, send_listing, stream_file};
use crate::utils::validation::sanitize_for_log;

/// Shared, read-only inputs every session needs
#[derive(Debug, Clone)]
pub struct SessionContext {
    catalog: DirectoryCatalog,
    settings: SessionSettings,
}

impl SessionContext {
    pub fn new(catalog: DirectoryCatalog, settings: SessionSettings) -> Self {
        Self { catalog, settings }
    }
}

/// Values collected from the client during the handshake
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub data_port: Token,
    pub command: Command,
    pub host: Token,
    pub file_name: Option<Token>,
}

pub struct ControlSession<'a, S> {
    stream: &'a mut S,
    peer: SocketAddr,
    context: &'a SessionContext,
    state: SessionState,
}

impl<'a, S> ControlSession<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: &'a mut S, peer: SocketAddr, context: &'a SessionContext) -> Self {
        Self {
            stream,
            peer,
            context,
            state: SessionState::AwaitDataPort,
        }
    }

    /// Runs the session to completion. Any error ends the session; nothing
    /// is retried.
    pub async fn run(mut self) -> Result<SessionOutcome, SessionError> {
        let result = match self.handshake().await {
            Ok(mut request) => self.dispatch(&mut request).await,
            Err(e) => Err(e),
        };
        self.transition(SessionState::Closed);
        result
    }

    async fn handshake(&mut self) -> Result<SessionRequest, SessionError> {
        let data_port = self.read_field(Field::DataPort).await?;
        self.reply(Reply::NoError).await?;
        self.transition(SessionState::AwaitCommand);

        let raw_command = self.read_field(Field::Command).await?;
        self.reply(Reply::NoError).await?;
        self.transition(SessionState::AwaitHost);

        let host = self.read_field(Field::Host).await?;
        info!(
            "Connection from {} at {}",
            self.peer,
            sanitize_for_log(host.as_str())
        );

        Ok(SessionRequest {
            data_port,
            command: Command::parse(raw_command.as_str()),
            host,
            file_name: None,
        })
    }

    async fn dispatch(&mut self, request: &mut SessionRequest) -> Result<SessionOutcome, SessionError> {
        self.transition(SessionState::Dispatch(request.command.clone()));

        match request.command.clone() {
            Command::List => self.handle_list(request).await,
            Command::Get => self.handle_get(request).await,
            Command::Invalid(token) => {
                info!(
                    "Received invalid command {:?} from {}",
                    sanitize_for_log(&token),
                    self.peer
                );
                self.reply(Reply::CommandError).await?;
                Ok(SessionOutcome::InvalidCommand { token })
            }
        }
    }

    async fn handle_list(&mut self, request: &SessionRequest) -> Result<SessionOutcome, SessionError> {
        self.reply(Reply::CommandOk).await?;
        info!("List directory requested on port {}", request.data_port);

        // Enumerate before connecting so an unreadable directory never
        // leaves a half-opened data connection behind.
        let entries = self.context.catalog.list_regular_files().await?;

        let mut channel = self.open_data_channel(request).await?;
        self.transition(SessionState::DataTransfer);
        info!(
            "Sending directory contents to {}",
            channel.peer_addr()
        );

        let sent = send_listing(&mut channel, &entries, self.context.settings.framing).await?;
        channel.close().await?;

        Ok(SessionOutcome::Listed { entries: sent })
    }

    async fn handle_get(&mut self, request: &mut SessionRequest) -> Result<SessionOutcome, SessionError> {
        self.reply(Reply::CommandOk).await?;

        let file_name = self.read_field(Field::FileName).await?;
        let name = file_name.as_str().to_string();
        request.file_name = Some(file_name);
        info!(
            "File {} requested on port {}",
            sanitize_for_log(&name),
            request.data_port
        );

        let path = match self.context.catalog.find(&name).await {
            Ok(Some(path)) => path,
            Ok(None) => return self.file_not_found(name).await,
            Err(e) => {
                warn!("Cannot search for {}: {}", sanitize_for_log(&name), e);
                return self.file_not_found(name).await;
            }
        };

        // The listing is a snapshot; the file may be gone by now.
        let mut file = match open_for_transfer(&path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("{}", e);
                return self.file_not_found(name).await;
            }
        };

        self.reply(Reply::FileFound).await?;

        let mut channel = self.open_data_channel(request).await?;
        self.transition(SessionState::DataTransfer);
        info!(
            "Sending {} to {}",
            sanitize_for_log(&name),
            channel.peer_addr()
        );

        let settings = &self.context.settings;
        let bytes = stream_file(
            &mut channel,
            &mut file,
            &path,
            settings.chunk_size,
            settings.framing,
        )
        .await?;
        channel.close().await?;

        Ok(SessionOutcome::FileSent { name, bytes })
    }

    async fn file_not_found(&mut self, name: String) -> Result<SessionOutcome, SessionError> {
        info!(
            "File not found. Sending error message to {}",
            self.peer
        );
        self.reply(Reply::FileError).await?;
        Ok(SessionOutcome::FileNotFound { name })
    }

    async fn open_data_channel(&self, request: &SessionRequest) -> Result<DataChannel, SessionError> {
        let settings = &self.context.settings;

        let target = DataTarget::parse(&request.host, &request.data_port, settings.min_client_port)?;
        debug!("Resolving data target {} for {}", target, self.peer);
        let restrict_to = settings
            .restrict_data_host_to_peer
            .then(|| self.peer.ip());
        let endpoints = target.resolve(restrict_to).await?;

        Ok(DataChannel::open(&endpoints, settings.data_connect_timeout).await?)
    }

    async fn read_field(&mut self, field: Field) -> Result<Token, SessionError> {
        let token = read_token(
            &mut *self.stream,
            field,
            self.context.settings.control_read_timeout,
        )
        .await?;
        debug!(
            "{} sent {}: {:?}",
            self.peer,
            field,
            sanitize_for_log(token.as_str())
        );
        Ok(token)
    }

    async fn reply(&mut self, reply: Reply) -> Result<(), SessionError> {
        write_token(&mut *self.stream, reply.as_bytes()).await?;
        debug!("Replied {} to {}", reply.as_str(), self.peer);
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_advance_to(&next),
            "illegal session transition {} -> {}",
            self.state,
            next
        );
        debug!("Session {}: {} -> {}", self.peer, self.state, next);
        self.state = next;
    }
}
