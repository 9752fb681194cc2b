//! KISS command byte layout.
//!
//! The byte following a FEND carries the TNC port in the high nibble and the
//! command in the low nibble. Only [`CMD_DATA`] frames carry AX.25 payloads.
//!
//! A data frame for port 12 would have command byte 0xC0, which is FEND.
//! The decoder reads that byte as idle fill, so port 12 cannot carry data
//! and [`data_command`] rejects it.

use crate::codec::FEND;
use crate::error::{KissError, Result};

/// Data frame (AX.25 payload follows).
pub const CMD_DATA: u8 = 0x00;

/// Highest addressable TNC port.
pub const MAX_PORT: u8 = 0x0F;

/// Pack a port number and command into a KISS command byte.
pub fn port_command(port: u8, command: u8) -> u8 {
    ((port & MAX_PORT) << 4) | (command & 0x0F)
}

/// Split a KISS command byte into `(port, command)`.
pub fn split_port_command(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0F)
}

/// The data command byte for `port`.
pub fn data_command(port: u8) -> Result<u8> {
    if port > MAX_PORT {
        return Err(KissError::InvalidPort { port });
    }
    match port_command(port, CMD_DATA) {
        FEND => Err(KissError::InvalidPort { port }),
        byte => Ok(byte),
    }
}

/// Whether `port` can carry data frames.
pub fn is_data_port(port: u8) -> bool {
    data_command(port).is_ok()
}
