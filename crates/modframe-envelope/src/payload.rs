//! Function-specific message bodies.
//!
//! The envelope never interprets the payload. Each concrete message variant
//! implements [`Payload`] to append its body after the header on encode and to
//! consume its body after the header on decode.

use std::io::{Read, Write};

use bytes::Bytes;

use crate::envelope::Envelope;

/// Hooks a message variant supplies to the framing codec.
pub trait Payload {
    /// Number of bytes [`write_payload`](Self::write_payload) will produce.
    fn encoded_len(&self) -> usize;

    /// Write exactly the function-specific body.
    fn write_payload(&self, sink: &mut dyn Write) -> std::io::Result<()>;

    /// Read exactly the function-specific body.
    ///
    /// `envelope` holds the header that was just decoded, so the body length can
    /// be inferred from the function code or the declared data length.
    fn read_payload(&mut self, envelope: &Envelope, source: &mut dyn Read)
        -> std::io::Result<()>;
}

/// Messages without a body.
impl Payload for () {
    fn encoded_len(&self) -> usize {
        0
    }

    fn write_payload(&self, _sink: &mut dyn Write) -> std::io::Result<()> {
        Ok(())
    }

    fn read_payload(
        &mut self,
        _envelope: &Envelope,
        _source: &mut dyn Read,
    ) -> std::io::Result<()> {
        Ok(())
    }
}

/// An opaque body carried as raw bytes.
///
/// In networked mode the body is the `data_length - 2` bytes declared in the
/// header. In headless mode there is no declared length, so the body runs to
/// the end of the source; the link layer is expected to hand over one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPayload {
    body: Bytes,
}

impl RawPayload {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }
}

impl Payload for RawPayload {
    fn encoded_len(&self) -> usize {
        self.body.len()
    }

    fn write_payload(&self, sink: &mut dyn Write) -> std::io::Result<()> {
        sink.write_all(&self.body)
    }

    fn read_payload(
        &mut self,
        envelope: &Envelope,
        source: &mut dyn Read,
    ) -> std::io::Result<()> {
        let body = if envelope.is_headless() {
            let mut body = Vec::new();
            source.read_to_end(&mut body)?;
            body
        } else {
            let mut body = vec![0u8; envelope.payload_len()];
            source.read_exact(&mut body)?;
            body
        };
        self.body = Bytes::from(body);
        Ok(())
    }
}
