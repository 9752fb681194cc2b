use std::path::PathBuf;

use kissdigi_ax25::Ax25Error;
use kissdigi_kiss::KissError;
use kissdigi_table::TableError;
use kissdigi_transport::TransportError;

/// Errors raised by the station runtime and its configuration.
#[derive(Debug, thiserror::Error)]
pub enum DigiError {
    /// Frame table or arena failure.
    #[error(transparent)]
    Table(#[from] TableError),

    /// KISS framing or stream failure.
    #[error(transparent)]
    Kiss(#[from] KissError),

    /// AX.25 address or header failure.
    #[error(transparent)]
    Ax25(#[from] Ax25Error),

    /// Modem link failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON for a station config.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration values are out of range.
    #[error("invalid config: {0}")]
    Config(String),

    /// The receive thread panicked.
    #[error("receive thread panicked")]
    ReceiverPanicked,

    /// All beacon entries are in use.
    #[error("beacon table full ({max} entries)")]
    BeaconTableFull { max: usize },
}

pub type Result<T> = std::result::Result<T, DigiError>;
