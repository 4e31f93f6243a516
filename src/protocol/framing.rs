//! Data-connection framing
//!
//! Two framings are supported for listing entries and file chunks:
//!
//! * `Fixed` is what existing clients expect: every listing entry is a
//!   [`BUFFER_SIZE`]-byte zero-padded frame, file bytes are sent raw, and the
//!   payload ends with the bare sentinel followed by connection close.
//! * `LengthPrefixed` prefixes every entry and chunk with a big-endian `u32`
//!   length and ends the payload with a zero-length frame and the sentinel,
//!   so a file containing `EOF` can never be mistaken for the end marker.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ProtocolError;
use crate::protocol::responses::Sentinel;
use crate::protocol::token::{BUFFER_SIZE, MAX_TOKEN_LEN};

const LENGTH_PREFIX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    #[default]
    Fixed,
    LengthPrefixed,
}

impl Framing {
    /// Encodes one listing entry. Names that could not be requested back
    /// as a file-name token are not listed.
    pub fn encode_entry(&self, name: &str) -> Option<Vec<u8>> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > MAX_TOKEN_LEN {
            return None;
        }

        match self {
            Framing::Fixed => {
                let mut frame = vec![0u8; BUFFER_SIZE];
                frame[..bytes.len()].copy_from_slice(bytes);
                Some(frame)
            }
            Framing::LengthPrefixed => Some(length_prefixed(bytes)),
        }
    }

    /// Encodes one chunk of file content. Fixed framing sends it untouched.
    pub fn encode_chunk<'a>(&self, chunk: &'a [u8]) -> Cow<'a, [u8]> {
        match self {
            Framing::Fixed => Cow::Borrowed(chunk),
            Framing::LengthPrefixed => Cow::Owned(length_prefixed(chunk)),
        }
    }

    pub fn encode_end(&self, sentinel: Sentinel) -> Vec<u8> {
        match self {
            Framing::Fixed => sentinel.as_bytes().to_vec(),
            Framing::LengthPrefixed => {
                let mut out = vec![0u8; LENGTH_PREFIX];
                out.extend_from_slice(sentinel.as_bytes());
                out
            }
        }
    }

    /// Decodes a complete listing payload, as read until the server closed
    /// the data connection.
    pub fn decode_listing(&self, payload: &[u8]) -> Result<Vec<String>, ProtocolError> {
        let frames: Vec<&[u8]> = match self {
            Framing::Fixed => {
                let body = strip_sentinel(payload, Sentinel::EndOfDirectory)?;
                if body.len() % BUFFER_SIZE != 0 {
                    return Err(ProtocolError::MalformedPayload(format!(
                        "listing body of {} bytes is not a multiple of {}",
                        body.len(),
                        BUFFER_SIZE
                    )));
                }
                body.chunks(BUFFER_SIZE)
                    .map(|frame| {
                        let end = frame.iter().position(|&b| b == 0).unwrap_or(frame.len());
                        &frame[..end]
                    })
                    .collect()
            }
            Framing::LengthPrefixed => split_frames(payload, Sentinel::EndOfDirectory)?,
        };

        frames
            .into_iter()
            .map(|frame| {
                String::from_utf8(frame.to_vec()).map_err(|_| {
                    ProtocolError::MalformedPayload("listing entry is not valid UTF-8".into())
                })
            })
            .collect()
    }

    /// Decodes a complete file payload back into the file's bytes.
    pub fn decode_file(&self, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Framing::Fixed => Ok(strip_sentinel(payload, Sentinel::EndOfFile)?.to_vec()),
            Framing::LengthPrefixed => Ok(split_frames(payload, Sentinel::EndOfFile)?.concat()),
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::Fixed => f.write_str("fixed"),
            Framing::LengthPrefixed => f.write_str("length_prefixed"),
        }
    }
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Framing::Fixed),
            "length_prefixed" | "length-prefixed" => Ok(Framing::LengthPrefixed),
            other => Err(format!("unknown framing {:?} (expected fixed or length_prefixed)", other)),
        }
    }
}

// Chunk sizes are capped by config validation, so the length fits in a u32.
fn length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(LENGTH_PREFIX + bytes.len());
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
    out
}

fn strip_sentinel(payload: &[u8], sentinel: Sentinel) -> Result<&[u8], ProtocolError> {
    payload.strip_suffix(sentinel.as_bytes()).ok_or_else(|| {
        ProtocolError::MalformedPayload(format!(
            "payload does not end with {}",
            String::from_utf8_lossy(sentinel.as_bytes())
        ))
    })
}

fn split_frames(payload: &[u8], sentinel: Sentinel) -> Result<Vec<&[u8]>, ProtocolError> {
    let mut frames = Vec::new();
    let mut rest = payload;

    loop {
        if rest.len() < LENGTH_PREFIX {
            return Err(ProtocolError::MalformedPayload("truncated length prefix".into()));
        }
        let (prefix, tail) = rest.split_at(LENGTH_PREFIX);
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;

        if len == 0 {
            if tail == sentinel.as_bytes() {
                return Ok(frames);
            }
            return Err(ProtocolError::MalformedPayload(
                "terminating frame is not followed by the sentinel".into(),
            ));
        }
        if tail.len() < len {
            return Err(ProtocolError::MalformedPayload("truncated frame".into()));
        }

        let (frame, next) = tail.split_at(len);
        frames.push(frame);
        rest = next;
    }
}
