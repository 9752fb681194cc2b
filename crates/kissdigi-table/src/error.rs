use std::time::Duration;

use kissdigi_ax25::Ax25Error;

/// Errors that can occur while managing frame slots and payload storage.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The arena has fewer free bytes than requested.
    #[error("insufficient arena space: requested {requested} bytes, {free} free")]
    InsufficientSpace { requested: usize, free: usize },

    /// Every slot is in use.
    #[error("no frame slots available")]
    NoSlotsAvailable,

    /// The slot index is out of range.
    #[error("invalid frame slot {0}")]
    InvalidSlot(usize),

    /// The handle does not name a live arena region.
    #[error("stale or foreign arena handle")]
    InvalidHandle,

    /// The table lock could not be acquired in time.
    #[error("timed out after {waited:?} waiting for the frame table lock")]
    LockTimeout { waited: Duration },

    /// A thread panicked while holding the table lock.
    #[error("frame table lock poisoned")]
    Poisoned,

    /// The raw frame did not decode.
    #[error("frame decode failed: {0}")]
    Decode(#[from] Ax25Error),
}

pub type Result<T> = std::result::Result<T, TableError>;
