use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use kissdigi_transport::ModemStream;

use crate::codec::{KissConfig, KissDecoder, KissFrame};
use crate::error::{KissError, Result};

const READ_CHUNK_SIZE: usize = 512;

/// Reads complete KISS frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// Decode errors are returned for the offending frame only, and the next
/// call resumes at the following FEND.
pub struct KissReader<T> {
    inner: T,
    buf: BytesMut,
    decoder: KissDecoder,
    config: KissConfig,
}

impl<T: Read> KissReader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, KissConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: KissConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            decoder: KissDecoder::new(config.max_payload_size),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(KissError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<KissFrame> {
        loop {
            if let Some(frame) = self.decoder.decode(&mut self.buf)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(KissError::BadStream(err)),
            };

            if read == 0 {
                return Err(KissError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
        self.decoder.set_max_payload(max_payload_size);
    }

    /// Current reader configuration.
    pub fn config(&self) -> &KissConfig {
        &self.config
    }
}

impl KissReader<ModemStream> {
    /// Create a reader for a modem link and apply the read timeout from config.
    pub fn with_config_modem(inner: ModemStream, config: KissConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_kiss_error)?;
        Ok(Self::with_config(inner, config))
    }
}

/// Decode exactly one frame from `stream`, reading one byte at a time.
///
/// Never reads past the closing FEND, so the stream can be handed to
/// another consumer afterwards.
pub fn read_one<R: Read>(stream: &mut R, max_payload: usize) -> Result<KissFrame> {
    let mut decoder = KissDecoder::new(max_payload);
    let mut byte = [0u8; 1];
    loop {
        match stream.read(&mut byte) {
            Ok(0) => return Err(KissError::ConnectionClosed),
            Ok(_) => {
                if let Some(frame) = decoder.push(byte[0])? {
                    return Ok(frame);
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(KissError::BadStream(err)),
        }
    }
}

pub(crate) fn transport_to_kiss_error(err: kissdigi_transport::TransportError) -> KissError {
    match err {
        kissdigi_transport::TransportError::Io(io)
        | kissdigi_transport::TransportError::Accept(io) => KissError::BadStream(io),
        kissdigi_transport::TransportError::Bind { source, .. }
        | kissdigi_transport::TransportError::Connect { source, .. } => {
            KissError::BadStream(source)
        }
        other => KissError::BadStream(std::io::Error::other(other.to_string())),
    }
}
