//! Module `client`
//!
//! A client for the file server. It opens its own data listener before
//! starting the handshake, so the server's data connection can never
//! arrive before something is listening for it.

use log::{debug, info};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::ClientError;
use crate::protocol::{Field, Framing, Reply, read_token};

/// A request the client can make
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    List,
    Get(String),
    /// Any other command token; the server is expected to refuse it
    Raw(String),
}

impl Request {
    fn command_token(&self) -> &str {
        match self {
            Request::List => "l",
            Request::Get(_) => "g",
            Request::Raw(token) => token,
        }
    }
}

/// What the server answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Listing(Vec<String>),
    File(Vec<u8>),
    FileNotFound,
    CommandError,
}

#[derive(Debug, Clone)]
pub struct FileClient {
    server_host: String,
    server_port: u16,
    data_port: u16,
    data_host: Option<String>,
    framing: Framing,
    timeout: Option<Duration>,
}

impl FileClient {
    pub fn new(server_host: impl Into<String>, server_port: u16) -> Self {
        Self {
            server_host: server_host.into(),
            server_port,
            data_port: 0,
            data_host: None,
            framing: Framing::Fixed,
            timeout: None,
        }
    }

    /// Port to receive the data connection on; 0 picks a free one.
    pub fn data_port(mut self, port: u16) -> Self {
        self.data_port = port;
        self
    }

    /// Host to advertise for the data connection. Defaults to the local
    /// address of the control connection.
    pub fn data_host(mut self, host: impl Into<String>) -> Self {
        self.data_host = Some(host.into());
        self
    }

    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Bounds each wait for the server, including the data connection.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn list(&self) -> Result<Response, ClientError> {
        self.execute(&Request::List).await
    }

    pub async fn fetch(&self, name: &str) -> Result<Response, ClientError> {
        self.execute(&Request::Get(name.to_string())).await
    }

    pub async fn execute(&self, request: &Request) -> Result<Response, ClientError> {
        let data_listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, self.data_port))
            .await
            .map_err(ClientError::DataListener)?;
        let data_port = data_listener.local_addr()?.port();

        let server = format!("{}:{}", self.server_host, self.server_port);
        let mut control = TcpStream::connect((self.server_host.as_str(), self.server_port))
            .await
            .map_err(|e| ClientError::Connect(server.clone(), e))?;

        let data_host = match &self.data_host {
            Some(host) => host.clone(),
            None => control.local_addr()?.ip().to_string(),
        };
        debug!("Advertising data endpoint {}:{} to {}", data_host, data_port, server);

        send(&mut control, &data_port.to_string()).await?;
        self.expect(&mut control, Reply::NoError).await?;
        send(&mut control, request.command_token()).await?;
        self.expect(&mut control, Reply::NoError).await?;
        send(&mut control, &data_host).await?;

        match self.read_reply(&mut control).await? {
            Reply::CommandOk => {}
            Reply::CommandError => return Ok(Response::CommandError),
            other => {
                return Err(ClientError::UnexpectedReply {
                    expected: "NCE or CE",
                    got: other.as_str().to_string(),
                });
            }
        }

        if let Request::Get(name) = request {
            send(&mut control, name).await?;
            match self.read_reply(&mut control).await? {
                Reply::FileFound => {}
                Reply::FileError => return Ok(Response::FileNotFound),
                other => {
                    return Err(ClientError::UnexpectedReply {
                        expected: "NFE or FE",
                        got: other.as_str().to_string(),
                    });
                }
            }
        }

        let payload = self.receive(&mut control, &data_listener).await?;
        info!("Received {} payload bytes from {}", payload.len(), server);

        match request {
            Request::List => Ok(Response::Listing(self.framing.decode_listing(&payload)?)),
            Request::Get(_) => Ok(Response::File(self.framing.decode_file(&payload)?)),
            Request::Raw(token) => Err(ClientError::UnexpectedReply {
                expected: "CE",
                got: format!("NCE for command {:?}", token),
            }),
        }
    }

    async fn read_reply(&self, control: &mut TcpStream) -> Result<Reply, ClientError> {
        let token = read_token(control, Field::Reply, self.timeout).await?;
        Reply::from_token(token.as_str()).ok_or_else(|| ClientError::UnexpectedReply {
            expected: "reply token",
            got: token.into_string(),
        })
    }

    async fn expect(&self, control: &mut TcpStream, expected: Reply) -> Result<(), ClientError> {
        let reply = self.read_reply(control).await?;
        if reply != expected {
            return Err(ClientError::UnexpectedReply {
                expected: expected.as_str(),
                got: reply.as_str().to_string(),
            });
        }
        Ok(())
    }

    async fn receive(&self, control: &mut TcpStream, listener: &TcpListener) -> Result<Vec<u8>, ClientError> {
        let accepted = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, accept_data(control, listener))
                .await
                .map_err(|_| {
                    io::Error::new(io::ErrorKind::TimedOut, "server never opened the data connection")
                })?,
            None => accept_data(control, listener).await,
        };
        let (mut stream, peer) = accepted?;
        debug!("Data connection from {}", peer);

        let mut payload = Vec::new();
        stream.read_to_end(&mut payload).await?;
        Ok(payload)
    }
}

async fn send(control: &mut TcpStream, token: &str) -> Result<(), ClientError> {
    control.write_all(token.as_bytes()).await?;
    control.flush().await?;
    Ok(())
}

/// Waits for the server's data connection. The server gives up on a session
/// by closing the control connection, so that ends the wait too.
async fn accept_data(
    control: &mut TcpStream,
    listener: &TcpListener,
) -> Result<(TcpStream, SocketAddr), ClientError> {
    let mut unexpected = [0u8; 1];
    tokio::select! {
        // A finished session closes control only after the data connection
        // was established, so a pending connection always wins.
        biased;
        accepted = listener.accept() => Ok(accepted?),
        read = control.read(&mut unexpected) => match read {
            Ok(0) => Err(ClientError::ControlClosed),
            Ok(_) => Err(ClientError::UnexpectedReply {
                expected: "data connection",
                got: "more data on the control connection".to_string(),
            }),
            Err(e) => Err(ClientError::Io(e)),
        },
    }
}
