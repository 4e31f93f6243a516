//! Bounded control tokens
//!
//! Every value a client sends on the control connection (data port,
//! command, host, file name) is a short text token delivered in a single
//! write. Tokens are read with one bounded read and never exceed
//! [`MAX_TOKEN_LEN`] bytes; anything longer is rejected instead of being
//! split across two fields.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Size of the token buffer and of one fixed listing frame.
pub const BUFFER_SIZE: usize = 100;

/// Longest token accepted. One byte of the buffer is kept for the terminator
/// a C client would append.
pub const MAX_TOKEN_LEN: usize = BUFFER_SIZE - 1;

/// Which control field a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    DataPort,
    Command,
    Host,
    FileName,
    Reply,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::DataPort => "data port",
            Field::Command => "command",
            Field::Host => "host",
            Field::FileName => "file name",
            Field::Reply => "reply",
        };
        f.write_str(name)
    }
}

/// A UTF-8 token of at most [`MAX_TOKEN_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(field: Field, value: &str) -> Result<Self, ProtocolError> {
        if value.len() > MAX_TOKEN_LEN {
            return Err(ProtocolError::TokenTooLong {
                field,
                limit: MAX_TOKEN_LEN,
            });
        }
        Ok(Token(value.to_string()))
    }

    /// Decodes raw bytes as received. Everything from the first NUL on is
    /// dropped, as are trailing CR/LF characters.
    pub fn from_wire(field: Field, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let mut trimmed = &bytes[..end];
        while let [rest @ .., b'\r' | b'\n'] = trimmed {
            trimmed = rest;
        }

        let text = std::str::from_utf8(trimmed).map_err(|_| ProtocolError::InvalidEncoding(field))?;
        Token::new(field, text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads a single token with one read call.
///
/// A read that fills the whole buffer means the peer sent more than
/// [`MAX_TOKEN_LEN`] bytes, which is reported as [`ProtocolError::TokenTooLong`].
pub async fn read_token<R>(
    reader: &mut R,
    field: Field,
    timeout: Option<Duration>,
) -> Result<Token, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; BUFFER_SIZE];

    let read = reader.read(&mut buf);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, read)
            .await
            .map_err(|_| ProtocolError::ReadTimeout(field))?,
        None => read.await,
    };
    let n = result.map_err(|e| ProtocolError::Read(field, e))?;

    if n == 0 {
        return Err(ProtocolError::ConnectionClosed(field));
    }
    if n > MAX_TOKEN_LEN {
        return Err(ProtocolError::TokenTooLong {
            field,
            limit: MAX_TOKEN_LEN,
        });
    }

    Token::from_wire(field, &buf[..n])
}

/// Writes a bare token and flushes it.
pub async fn write_token<W>(writer: &mut W, token: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(token).await.map_err(ProtocolError::Write)?;
    writer.flush().await.map_err(ProtocolError::Write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn strips_nul_terminator_and_line_endings() {
        let token = Token::from_wire(Field::Host, b"127.0.0.1\0garbage").unwrap();
        assert_eq!(token.as_str(), "127.0.0.1");

        let token = Token::from_wire(Field::Command, b"l\r\n").unwrap();
        assert_eq!(token.as_str(), "l");
    }

    #[test]
    fn rejects_non_utf8() {
        let err = Token::from_wire(Field::FileName, &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidEncoding(Field::FileName)));
    }

    #[test]
    fn accepts_token_at_max_length() {
        let value = "a".repeat(MAX_TOKEN_LEN);
        let token = Token::new(Field::FileName, &value).unwrap();
        assert_eq!(token.as_str().len(), MAX_TOKEN_LEN);
        assert!(Token::new(Field::FileName, &"a".repeat(MAX_TOKEN_LEN + 1)).is_err());
    }

    #[tokio::test]
    async fn reads_one_token_per_read() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.write_all(b"30021").await.unwrap();

        let token = read_token(&mut server, Field::DataPort, None).await.unwrap();
        assert_eq!(token.as_str(), "30021");
    }

    #[tokio::test]
    async fn overlong_token_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(512);
        client.write_all(&[b'x'; BUFFER_SIZE + 20]).await.unwrap();

        let err = read_token(&mut server, Field::FileName, None).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TokenTooLong {
                field: Field::FileName,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn closed_connection_is_reported_per_field() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let err = read_token(&mut server, Field::Command, None).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed(Field::Command)));
    }

    #[tokio::test]
    async fn read_timeout_is_honoured() {
        let (_client, mut server) = tokio::io::duplex(64);

        let err = read_token(&mut server, Field::Host, Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::ReadTimeout(Field::Host)));
    }
}
