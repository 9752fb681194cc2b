//! AX.25 link-layer addressing for KISS payloads.
//!
//! Frames arrive without HDLC flags or FCS. This crate decodes and encodes
//! the address block (destination, source, up to eight vias), control and
//! PID bytes bit-exactly, and treats everything after them as the
//! information field.

pub mod address;
pub mod checksum;
pub mod error;
pub mod frame;

pub use address::{Address, ADDRESS_LEN, CALLSIGN_LEN, MAX_SSID};
pub use checksum::info_crc;
pub use error::{AddressField, Ax25Error, Result};
pub use frame::{
    carries_pid, Ax25Frame, CommandResponse, Header, Tnc2, CTRL_UI, MAX_VIAS, PID_NO_LAYER3,
};
