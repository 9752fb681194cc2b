//! Byte-stream links between the station and a KISS TNC.
//!
//! A radio modem is just a full-duplex byte stream to this workspace:
//! - KISS over TCP (software modems such as Direwolf, network TNCs)
//! - Unix domain sockets (local bridges, test harnesses)
//!
//! This is the lowest layer of kissdigi. Everything else builds on top of
//! the [`ModemStream`] type provided here.

pub mod endpoint;
pub mod error;
pub mod stream;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use stream::ModemStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
