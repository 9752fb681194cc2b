//! `tokio_util::codec` adapter for KISS framing.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_data, KissDecoder, KissFrame, DEFAULT_MAX_PAYLOAD};
use crate::error::{KissError, Result};

/// KISS data-frame codec for `Framed`, `FramedRead` and `FramedWrite`.
#[derive(Debug)]
pub struct KissCodec {
    decoder: KissDecoder,
    max_payload: usize,
}

impl KissCodec {
    /// Create a codec that rejects payloads longer than `max_payload`.
    pub fn new(max_payload: usize) -> Self {
        Self {
            decoder: KissDecoder::new(max_payload),
            max_payload,
        }
    }
}

impl Default for KissCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for KissCodec {
    type Item = KissFrame;
    type Error = KissError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<KissFrame>> {
        self.decoder.decode(src)
    }
}

impl Encoder<KissFrame> for KissCodec {
    type Error = KissError;

    fn encode(&mut self, item: KissFrame, dst: &mut BytesMut) -> Result<()> {
        if item.payload.len() > self.max_payload {
            return Err(KissError::BufferOverflow {
                max: self.max_payload,
            });
        }
        encode_data(item.port, &item.payload, dst)?;
        Ok(())
    }
}
