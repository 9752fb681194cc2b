use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{KissError, Result};
use crate::port::{data_command, split_port_command, CMD_DATA};

/// Frame delimiter.
pub const FEND: u8 = 0xC0;

/// Escape introducer.
pub const FESC: u8 = 0xDB;

/// Escaped FEND (follows FESC).
pub const TFEND: u8 = 0xDC;

/// Escaped FESC (follows FESC).
pub const TFESC: u8 = 0xDD;

/// Default maximum decoded payload: AX.25 frames never approach this.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// A decoded KISS data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KissFrame {
    /// TNC port the frame arrived on (high nibble of the command byte).
    pub port: u8,
    /// The unescaped payload (a raw AX.25 frame, no FCS).
    pub payload: Bytes,
}

impl KissFrame {
    /// Create a new frame.
    pub fn new(port: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            port,
            payload: payload.into(),
        }
    }

    /// Size of this frame once escaped and delimited.
    pub fn wire_size(&self) -> usize {
        let escapes = self
            .payload
            .iter()
            .filter(|&&b| b == FEND || b == FESC)
            .count();
        3 + self.payload.len() + escapes
    }
}

/// Encode one KISS frame.
///
/// Wire format:
/// ```text
/// FEND | port<<4 | cmd | payload (FEND -> FESC TFEND, FESC -> FESC TFESC) | FEND
/// ```
///
/// Returns the number of bytes appended to `dst`.
pub fn encode_frame(payload: &[u8], command_byte: u8, dst: &mut BytesMut) -> usize {
    let start = dst.len();
    dst.reserve(payload.len() + 3);
    dst.put_u8(FEND);
    dst.put_u8(command_byte);
    for &byte in payload {
        match byte {
            FEND => dst.put_slice(&[FESC, TFEND]),
            FESC => dst.put_slice(&[FESC, TFESC]),
            other => dst.put_u8(other),
        }
    }
    dst.put_u8(FEND);
    dst.len() - start
}

/// Encode a data frame for `port`.
///
/// Fails with `InvalidPort` for ports whose command byte is not
/// representable; nothing is appended to `dst` in that case.
pub fn encode_data(port: u8, payload: &[u8], dst: &mut BytesMut) -> Result<usize> {
    let command = data_command(port)?;
    Ok(encode_frame(payload, command, dst))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Discarding bytes until a FEND.
    Outside,
    /// Saw a FEND; the next non-FEND byte is the command byte.
    Command,
    /// Collecting payload bytes.
    Inside,
    /// Previous byte was FESC.
    Escaped,
}

/// Incremental KISS decoder.
///
/// Bytes can arrive in arbitrary fragments; state carries across calls. A
/// closing FEND also opens the next frame, so back-to-back frames may share
/// a delimiter and runs of FENDs are treated as idle fill. A frame with an
/// empty payload is returned like any other. After an error the decoder
/// discards input until the next FEND.
#[derive(Debug)]
pub struct KissDecoder {
    state: DecodeState,
    port: u8,
    buf: BytesMut,
    max_payload: usize,
}

impl KissDecoder {
    /// Create a decoder that rejects payloads longer than `max_payload`.
    pub fn new(max_payload: usize) -> Self {
        Self {
            state: DecodeState::Outside,
            port: 0,
            buf: BytesMut::with_capacity(max_payload.min(DEFAULT_MAX_PAYLOAD)),
            max_payload,
        }
    }

    /// Feed one byte. Returns a frame when this byte completes one.
    pub fn push(&mut self, byte: u8) -> Result<Option<KissFrame>> {
        match self.state {
            DecodeState::Outside => {
                if byte == FEND {
                    self.state = DecodeState::Command;
                }
                Ok(None)
            }
            DecodeState::Command => {
                if byte == FEND {
                    return Ok(None);
                }
                let (port, command) = split_port_command(byte);
                if command != CMD_DATA {
                    self.state = DecodeState::Outside;
                    return Err(KissError::BadFrame { port, command });
                }
                self.port = port;
                self.buf.clear();
                self.state = DecodeState::Inside;
                Ok(None)
            }
            DecodeState::Inside => match byte {
                FEND => {
                    self.state = DecodeState::Command;
                    let payload = self.buf.split().freeze();
                    Ok(Some(KissFrame {
                        port: self.port,
                        payload,
                    }))
                }
                FESC => {
                    self.state = DecodeState::Escaped;
                    Ok(None)
                }
                other => self.store(other),
            },
            DecodeState::Escaped => {
                self.state = DecodeState::Inside;
                match byte {
                    TFEND => self.store(FEND),
                    TFESC => self.store(FESC),
                    other => {
                        trace!(byte = other, "dropping invalid escape sequence");
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Consume bytes from `src` until a frame completes or `src` is empty.
    ///
    /// Bytes after a completed frame are left in `src` for the next call.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<KissFrame>> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(frame) = self.push(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    /// Drop any partial frame and wait for the next FEND.
    pub fn reset(&mut self) {
        self.state = DecodeState::Outside;
        self.buf.clear();
    }

    /// Whether a frame is partially collected.
    pub fn in_frame(&self) -> bool {
        matches!(self.state, DecodeState::Inside | DecodeState::Escaped)
    }

    /// Update the payload limit for frames started after this call.
    pub fn set_max_payload(&mut self, max_payload: usize) {
        self.max_payload = max_payload;
    }

    fn store(&mut self, byte: u8) -> Result<Option<KissFrame>> {
        if self.buf.len() >= self.max_payload {
            self.state = DecodeState::Outside;
            self.buf.clear();
            return Err(KissError::BufferOverflow {
                max: self.max_payload,
            });
        }
        self.buf.put_u8(byte);
        Ok(None)
    }
}

impl Default for KissDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

/// Configuration for KISS readers and writers.
#[derive(Debug, Clone)]
pub struct KissConfig {
    /// Maximum payload size in bytes. Default: 1024.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for KissConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
