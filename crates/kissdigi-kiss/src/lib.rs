//! KISS framing between the station and a TNC.
//!
//! Every frame on the wire is:
//! - An opening FEND (0xC0)
//! - A command byte: TNC port in the high nibble, command in the low nibble
//! - The payload, with FEND and FESC escaped as FESC TFEND / FESC TFESC
//! - A closing FEND
//!
//! The decoder is incremental and survives garbage between frames.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod port;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::KissCodec;
pub use codec::{
    encode_data, encode_frame, KissConfig, KissDecoder, KissFrame, DEFAULT_MAX_PAYLOAD, FEND,
    FESC, TFEND, TFESC,
};
pub use error::{KissError, Result};
pub use port::{data_command, is_data_port, port_command, split_port_command, CMD_DATA};
pub use reader::{read_one, KissReader};
pub use writer::KissWriter;
