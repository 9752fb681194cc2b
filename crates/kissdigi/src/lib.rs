//! KISS/AX.25 APRS digipeater.
//!
//! kissdigi talks to a TNC over a KISS byte stream, repeats APRS traffic
//! according to its WIDEn-N path and originates its own beacons.
//!
//! # Crate Structure
//!
//! - [`transport`]: Modem links (TCP, Unix domain sockets)
//! - [`kiss`]: KISS framing, blocking reader/writer, optional async codec
//! - [`ax25`]: AX.25 address and header encoding
//! - [`table`]: In-flight frame table and payload arena
//! - [`digi`]: Digipeater pipeline, beacons, heard list, station runtime

/// Re-export transport types.
pub mod transport {
    pub use kissdigi_transport::*;
}

/// Re-export KISS framing types.
pub mod kiss {
    pub use kissdigi_kiss::*;
}

/// Re-export AX.25 types.
pub mod ax25 {
    pub use kissdigi_ax25::*;
}

/// Re-export frame table types.
pub mod table {
    pub use kissdigi_table::*;
}

/// Re-export digipeater types.
pub mod digi {
    pub use kissdigi_digi::*;
}
