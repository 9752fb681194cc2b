use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use kissdigi_transport::ModemStream;

use crate::codec::{encode_data, KissConfig, KissFrame};
use crate::error::{KissError, Result};
use crate::reader::transport_to_kiss_error;

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Writes complete KISS frames to any `Write` stream.
pub struct KissWriter<T> {
    inner: T,
    buf: BytesMut,
    config: KissConfig,
}

impl<T: Write> KissWriter<T> {
    /// Create a new writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, KissConfig::default())
    }

    /// Create a new writer with explicit configuration.
    pub fn with_config(inner: T, config: KissConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete data frame (blocking).
    pub fn write_frame(&mut self, frame: &KissFrame) -> Result<()> {
        self.send(frame.port, frame.payload.as_ref())
    }

    /// Encode and send a data payload on a TNC port.
    pub fn send(&mut self, port: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(KissError::BufferOverflow {
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_data(port, payload, &mut self.buf)?;
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(KissError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(KissError::BadStream(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(KissError::BadStream(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &KissConfig {
        &self.config
    }
}

impl KissWriter<ModemStream> {
    /// Create a writer for a modem link and apply the write timeout from config.
    pub fn with_config_modem(inner: ModemStream, config: KissConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_kiss_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{KissDecoder, FEND};

    fn written(writer: KissWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn write_single_frame() {
        let mut writer = KissWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(0, b"hello").unwrap();

        let mut wire = BytesMut::from(written(writer).as_slice());
        let frame = KissDecoder::default().decode(&mut wire).unwrap().unwrap();
        assert_eq!(frame.port, 0);
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn write_frame_method() {
        let mut writer = KissWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&KissFrame::new(3, "abc")).unwrap();

        let bytes = written(writer);
        assert_eq!(bytes, vec![FEND, 0x30, b'a', b'b', b'c', FEND]);
    }

    #[test]
    fn port_twelve_writes_nothing() {
        let mut writer = KissWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer.send(12, b"x").unwrap_err();
        assert!(matches!(err, KissError::InvalidPort { port: 12 }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn empty_payload_is_framed() {
        let mut writer = KissWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(1, b"").unwrap();
        assert_eq!(written(writer), vec![FEND, 0x10, FEND]);
    }

    #[test]
    fn payload_too_large_rejected() {
        let cfg = KissConfig {
            max_payload_size: 4,
            ..KissConfig::default()
        };
        let mut writer = KissWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer.send(0, b"oversized").unwrap_err();
        assert!(matches!(err, KissError::BufferOverflow { max: 4 }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = KissWriter::new(sink);

        writer.send(0, b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut writer = KissWriter::new(InterruptedWriteThenFlush::default());
        writer.send(0, b"retry").unwrap();
        assert_eq!(writer.get_ref().data.len(), 8);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = KissWriter::new(ZeroWriter);
        let err = writer.send(0, b"x").unwrap_err();
        assert!(matches!(err, KissError::ConnectionClosed));
    }

    #[test]
    fn written_bytes_decode_through_reader() {
        let mut writer = KissWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(0, &[0xC0, 0x01]).unwrap();
        writer.send(2, &[0xDB]).unwrap();

        let mut reader = crate::reader::KissReader::new(Cursor::new(written(writer)));
        let first = reader.read_frame().unwrap();
        let second = reader.read_frame().unwrap();
        assert_eq!(first.payload.as_ref(), &[0xC0, 0x01]);
        assert_eq!((second.port, second.payload.as_ref()), (2, [0xDB].as_ref()));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
