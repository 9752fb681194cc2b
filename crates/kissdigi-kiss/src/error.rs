/// Errors that can occur during KISS encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum KissError {
    /// The underlying stream failed while reading or writing.
    #[error("bad stream: {0}")]
    BadStream(#[from] std::io::Error),

    /// The frame carried a command other than data (0).
    #[error("bad frame: unsupported kiss command {command:#x} on port {port}")]
    BadFrame { port: u8, command: u8 },

    /// The port cannot carry data frames (out of range, or port 12 whose
    /// command byte would be FEND).
    #[error("invalid kiss port {port}")]
    InvalidPort { port: u8 },

    /// The decoded payload would exceed the configured maximum.
    #[error("buffer overflow: frame exceeds {max} bytes")]
    BufferOverflow { max: usize },

    /// The stream reached EOF.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, KissError>;
