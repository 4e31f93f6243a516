//! Error types
//!
//! Defines domain-specific error types for each module of the file server.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::protocol::Field;

/// Control-connection and wire-format errors
#[derive(Debug)]
pub enum ProtocolError {
    ConnectionClosed(Field),
    TokenTooLong { field: Field, limit: usize },
    InvalidEncoding(Field),
    ReadTimeout(Field),
    Read(Field, io::Error),
    Write(io::Error),
    MalformedPayload(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::ConnectionClosed(field) => {
                write!(f, "Connection closed while waiting for {}", field)
            }
            ProtocolError::TokenTooLong { field, limit } => {
                write!(f, "{} exceeds {} bytes", field, limit)
            }
            ProtocolError::InvalidEncoding(field) => write!(f, "{} is not valid UTF-8", field),
            ProtocolError::ReadTimeout(field) => write!(f, "Timed out waiting for {}", field),
            ProtocolError::Read(field, e) => write!(f, "Failed to read {}: {}", field, e),
            ProtocolError::Write(e) => write!(f, "Failed to write reply: {}", e),
            ProtocolError::MalformedPayload(msg) => write!(f, "Malformed payload: {}", msg),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Read(_, e) | ProtocolError::Write(e) => Some(e),
            _ => None,
        }
    }
}

/// Address resolution and data-target validation errors
#[derive(Debug)]
pub enum ResolutionError {
    InvalidHost(String),
    InvalidPort(String),
    PortOutOfRange { port: u16, min: u16 },
    Lookup { target: String, source: io::Error },
    NoIpv4Address(String),
    PeerMismatch { expected: IpAddr, host: String },
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::InvalidHost(h) => write!(f, "Invalid host: {:?}", h),
            ResolutionError::InvalidPort(p) => write!(f, "Invalid port: {:?}", p),
            ResolutionError::PortOutOfRange { port, min } => {
                write!(f, "Invalid port {}: must be between {} and 65535", port, min)
            }
            ResolutionError::Lookup { target, source } => {
                write!(f, "Failed to resolve {}: {}", target, source)
            }
            ResolutionError::NoIpv4Address(target) => {
                write!(f, "No IPv4 address found for {}", target)
            }
            ResolutionError::PeerMismatch { expected, host } => {
                write!(f, "Host {} does not resolve to control peer {}", host, expected)
            }
        }
    }
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolutionError::Lookup { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Data connection establishment errors
#[derive(Debug)]
pub enum ConnectError {
    NoEndpoint,
    Connect(SocketAddr, io::Error),
    Timeout(SocketAddr),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::NoEndpoint => write!(f, "No endpoint to connect to"),
            ConnectError::Connect(addr, e) => write!(f, "Failed to connect to {}: {}", addr, e),
            ConnectError::Timeout(addr) => write!(f, "Timeout connecting to {}", addr),
        }
    }
}

impl std::error::Error for ConnectError {}

/// Directory enumeration errors
#[derive(Debug)]
pub enum DirectoryError {
    Open(PathBuf, io::Error),
    Read(PathBuf, io::Error),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::Open(p, e) => write!(f, "Cannot open directory {}: {}", p.display(), e),
            DirectoryError::Read(p, e) => write!(f, "Cannot read directory {}: {}", p.display(), e),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Payload transfer errors
#[derive(Debug)]
pub enum TransferError {
    FileOpen(PathBuf, io::Error),
    FileRead(PathBuf, io::Error),
    Write(io::Error),
    WriteZero,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::FileOpen(p, e) => write!(f, "Failed to open {}: {}", p.display(), e),
            TransferError::FileRead(p, e) => write!(f, "Failed to read {}: {}", p.display(), e),
            TransferError::Write(e) => write!(f, "Failed to write to data connection: {}", e),
            TransferError::WriteZero => write!(f, "Data connection accepted zero bytes"),
        }
    }
}

impl std::error::Error for TransferError {}

/// Everything that can end a single control session early
#[derive(Debug)]
pub enum SessionError {
    Protocol(ProtocolError),
    Resolution(ResolutionError),
    Connect(ConnectError),
    Directory(DirectoryError),
    Transfer(TransferError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Protocol(e) => write!(f, "Protocol error: {}", e),
            SessionError::Resolution(e) => write!(f, "Resolution error: {}", e),
            SessionError::Connect(e) => write!(f, "Connect error: {}", e),
            SessionError::Directory(e) => write!(f, "Directory error: {}", e),
            SessionError::Transfer(e) => write!(f, "Transfer error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ProtocolError> for SessionError {
    fn from(error: ProtocolError) -> Self {
        SessionError::Protocol(error)
    }
}

impl From<ResolutionError> for SessionError {
    fn from(error: ResolutionError) -> Self {
        SessionError::Resolution(error)
    }
}

impl From<ConnectError> for SessionError {
    fn from(error: ConnectError) -> Self {
        SessionError::Connect(error)
    }
}

impl From<DirectoryError> for SessionError {
    fn from(error: DirectoryError) -> Self {
        SessionError::Directory(error)
    }
}

impl From<TransferError> for SessionError {
    fn from(error: TransferError) -> Self {
        SessionError::Transfer(error)
    }
}

/// Fatal errors raised while bringing the listener up
#[derive(Debug)]
pub enum StartupError {
    Config(config::ConfigError),
    Resolution(ResolutionError),
    Bind(SocketAddr, io::Error),
    NoListener(String),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(e) => write!(f, "Configuration error: {}", e),
            StartupError::Resolution(e) => write!(f, "Erroneous listening address: {}", e),
            StartupError::Bind(addr, e) => write!(f, "Error in binding socket to {}: {}", addr, e),
            StartupError::NoListener(target) => write!(f, "No usable address for {}", target),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<config::ConfigError> for StartupError {
    fn from(error: config::ConfigError) -> Self {
        StartupError::Config(error)
    }
}

impl From<ResolutionError> for StartupError {
    fn from(error: ResolutionError) -> Self {
        StartupError::Resolution(error)
    }
}

/// Reference client errors
#[derive(Debug)]
pub enum ClientError {
    Connect(String, io::Error),
    DataListener(io::Error),
    Io(io::Error),
    UnexpectedReply { expected: &'static str, got: String },
    ControlClosed,
    Protocol(ProtocolError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Connect(target, e) => write!(f, "Failed to connect to {}: {}", target, e),
            ClientError::DataListener(e) => write!(f, "Failed to open data listener: {}", e),
            ClientError::Io(e) => write!(f, "I/O error: {}", e),
            ClientError::UnexpectedReply { expected, got } => {
                write!(f, "Expected {} from server, got {:?}", expected, got)
            }
            ClientError::ControlClosed => {
                write!(f, "Server closed the control connection without sending data")
            }
            ClientError::Protocol(e) => write!(f, "Protocol error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<io::Error> for ClientError {
    fn from(error: io::Error) -> Self {
        ClientError::Io(error)
    }
}

impl From<ProtocolError> for ClientError {
    fn from(error: ProtocolError) -> Self {
        ClientError::Protocol(error)
    }
}
