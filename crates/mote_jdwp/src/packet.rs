//! Command and reply packet framing.
//!
//! Command: `length(4) | id(4) | flags(1) | command_set(1) | command(1) | data`.
//! Reply:   `length(4) | id(4) | flags(1) = 0x80 | error(2) | data`.
//! `length` counts the whole packet, header included.

use smallvec::SmallVec;
use thiserror::Error;

use crate::constants::ErrorCode;
use crate::stream::{InputStream, OutputStream};

pub const HEADER_SIZE: usize = 11;
pub const FLAG_REPLY: u8 = 0x80;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("packet header needs {HEADER_SIZE} bytes, got {0}")]
    ShortHeader(usize),
    #[error("declared packet length {0} is shorter than the header")]
    BadLength(u32),
    #[error("expected a command packet, got a reply (id {0})")]
    UnexpectedReply(u32),
    #[error("expected a reply packet (id {0})")]
    ExpectedReply(u32),
    #[error("packet declares {declared} body bytes, {received} arrived")]
    Truncated { declared: usize, received: usize },
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub length: u32,
    pub id: u32,
    pub flags: u8,
    pub command_set: u8,
    pub command: u8,
}

impl CommandHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        let Some(h) = bytes.get(..HEADER_SIZE) else {
            return Err(PacketError::ShortHeader(bytes.len()));
        };
        let header = CommandHeader {
            length: be_u32(&h[0..4]),
            id: be_u32(&h[4..8]),
            flags: h[8],
            command_set: h[9],
            command: h[10],
        };
        if (header.length as usize) < HEADER_SIZE {
            return Err(PacketError::BadLength(header.length));
        }
        if header.flags & FLAG_REPLY != 0 {
            return Err(PacketError::UnexpectedReply(header.id));
        }
        Ok(header)
    }

    pub fn body_len(&self) -> usize {
        self.length as usize - HEADER_SIZE
    }
}

/// A command packet whose data arrived as one or more chunks.
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: CommandHeader,
    chunks: SmallVec<[Vec<u8>; 4]>,
}

impl Packet {
    pub fn new(header: CommandHeader, chunks: impl IntoIterator<Item = Vec<u8>>) -> Result<Self, PacketError> {
        let chunks: SmallVec<[Vec<u8>; 4]> = chunks.into_iter().collect();
        let received: usize = chunks.iter().map(Vec::len).sum();
        if received != header.body_len() {
            return Err(PacketError::Truncated { declared: header.body_len(), received });
        }
        Ok(Self { header, chunks })
    }

    /// Parses a packet held in one contiguous buffer.
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        let header = CommandHeader::parse(bytes)?;
        let end = header.length as usize;
        let Some(body) = bytes.get(HEADER_SIZE..end) else {
            return Err(PacketError::Truncated { declared: header.body_len(), received: bytes.len() - HEADER_SIZE });
        };
        Self::new(header, [body.to_vec()])
    }

    pub fn input(&self) -> InputStream<'_> {
        InputStream::new(self.chunks.iter().map(Vec::as_slice))
    }

    pub fn segments(&self) -> usize {
        self.chunks.len()
    }
}

/// Encodes a command packet, as a debugger would send it.
pub fn encode_command(id: u32, command_set: u8, command: u8, data: &[u8]) -> Vec<u8> {
    let mut out = OutputStream::new();
    out.write_u32((HEADER_SIZE + data.len()) as u32);
    out.write_u32(id);
    out.write_u8(0);
    out.write_u8(command_set);
    out.write_u8(command);
    out.write_bytes(data);
    out.into_bytes()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub id: u32,
    pub error: u16,
    pub data: Vec<u8>,
}

impl Reply {
    /// Frames the handler output in `body` as the reply to packet `id`.
    /// When `body` carries an error the data is dropped.
    pub fn encode(id: u32, body: &OutputStream) -> Vec<u8> {
        let mut out = OutputStream::new();
        let start = out.position();
        out.write_u32(0);
        out.write_u32(id);
        out.write_u8(FLAG_REPLY);
        out.write_u16(body.error().code());
        if body.is_ok() {
            out.write_bytes(body.as_bytes());
        }
        let length = (out.position() - start) as u32;
        out.rewrite_u32(start, length);
        out.into_bytes()
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        let Some(h) = bytes.get(..HEADER_SIZE) else {
            return Err(PacketError::ShortHeader(bytes.len()));
        };
        let length = be_u32(&h[0..4]);
        let id = be_u32(&h[4..8]);
        if h[8] & FLAG_REPLY == 0 {
            return Err(PacketError::ExpectedReply(id));
        }
        if (length as usize) < HEADER_SIZE {
            return Err(PacketError::BadLength(length));
        }
        let error = u16::from_be_bytes([h[9], h[10]]);
        let declared = length as usize - HEADER_SIZE;
        let Some(data) = bytes.get(HEADER_SIZE..length as usize) else {
            return Err(PacketError::Truncated { declared, received: bytes.len() - HEADER_SIZE });
        };
        Ok(Reply { id, error, data: data.to_vec() })
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.error)
    }
}
