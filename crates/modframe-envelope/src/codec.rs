//! `tokio_util` codec for networked framing.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::envelope::{networked_frame_len, PREFIX_SIZE};
use crate::error::EnvelopeError;
use crate::message::Message;
use crate::payload::{Payload, RawPayload};

/// Splits a byte stream into networked messages using the declared data length.
///
/// Headless framing carries no length on the wire and cannot be delimited by
/// this codec; encoding still honours each message's own headless flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Message<RawPayload>;
    type Error = EnvelopeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame_len) = networked_frame_len(src) else {
            src.reserve(PREFIX_SIZE - src.len());
            return Ok(None);
        };
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len).freeze();
        Message::decode(&mut frame.reader(), false).map(Some)
    }
}

impl<'a, P: Payload> Encoder<&'a Message<P>> for EnvelopeCodec {
    type Error = EnvelopeError;

    fn encode(&mut self, item: &'a Message<P>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.envelope().header_len() + item.payload().encoded_len());
        item.write_to(&mut dst.writer())
    }
}
