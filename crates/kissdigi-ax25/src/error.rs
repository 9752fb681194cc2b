use std::fmt;

/// Which address field of a header failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Destination,
    Source,
    /// Zero-based index into the via path.
    Via(usize),
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destination => f.write_str("destination"),
            Self::Source => f.write_str("source"),
            Self::Via(index) => write!(f, "via {index}"),
        }
    }
}

/// Errors that can occur while decoding or building AX.25 frames.
#[derive(Debug, thiserror::Error)]
pub enum Ax25Error {
    /// An address field held an invalid character or extension bit.
    #[error("invalid {field} address")]
    Address { field: AddressField },

    /// More than eight via addresses.
    #[error("via path exceeds {max} addresses")]
    ViaOverflow { max: usize },

    /// The frame ended before the control (or PID) byte.
    #[error("frame truncated: {len} bytes")]
    Truncated { len: usize },

    /// A textual callsign could not be parsed.
    #[error("invalid callsign {0:?} (expected CALL or CALL-SSID, up to 6 of A-Z 0-9, SSID 0-15)")]
    InvalidCallsign(String),
}

pub type Result<T> = std::result::Result<T, Ax25Error>;
