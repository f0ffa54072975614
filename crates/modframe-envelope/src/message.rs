use std::fmt::Write as _;
use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::envelope::Envelope;
use crate::error::Result;
use crate::payload::Payload;

/// One request or response: an [`Envelope`] plus its function-specific body.
///
/// The message exclusively owns its envelope. A message represents a single
/// exchange; build a new one for the next request rather than reusing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<P> {
    envelope: Envelope,
    payload: P,
}

impl<P: Payload> Message<P> {
    /// Create a networked message and derive its data length from `payload`.
    pub fn new(unit_id: u8, function_code: u8, payload: P) -> Result<Self> {
        let mut envelope = Envelope::new();
        envelope.set_unit_id(unit_id);
        envelope.set_function_code(function_code);
        envelope.set_payload_len(payload.encoded_len())?;
        Ok(Self { envelope, payload })
    }

    /// Assemble a message from an existing envelope without touching its fields.
    pub fn from_parts(envelope: Envelope, payload: P) -> Self {
        Self { envelope, payload }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    pub fn into_parts(self) -> (Envelope, P) {
        (self.envelope, self.payload)
    }

    /// Recompute the data length after the payload has changed.
    pub fn sync_data_length(&mut self) -> Result<()> {
        self.envelope.set_payload_len(self.payload.encoded_len())
    }

    /// See [`Envelope::output_length`].
    pub fn output_length(&self) -> usize {
        self.envelope.output_length()
    }

    /// Write the header and then the payload to `sink`.
    ///
    /// Any sink error aborts the write and is returned as-is; bytes already
    /// accepted by the sink are not rolled back.
    pub fn write_to<W: Write>(&self, sink: &mut W) -> Result<()> {
        self.envelope.write_header(sink)?;
        self.payload.write_payload(sink)?;
        trace!(
            transaction_id = self.envelope.transaction_id(),
            unit_id = self.envelope.unit_id(),
            function_code = self.envelope.function_code(),
            headless = self.envelope.is_headless(),
            "wrote message"
        );
        Ok(())
    }

    /// Read the header and then the payload from `source`, in place.
    ///
    /// The framing mode is taken from the envelope's current headless flag. On
    /// error the message is left partially populated and must be discarded.
    pub fn read_from<R: Read>(&mut self, source: &mut R) -> Result<()> {
        self.envelope.read_header(source)?;
        self.payload.read_payload(&self.envelope, source)?;
        trace!(
            transaction_id = self.envelope.transaction_id(),
            unit_id = self.envelope.unit_id(),
            function_code = self.envelope.function_code(),
            data_length = self.envelope.data_length(),
            "read message"
        );
        Ok(())
    }

    /// Encode the whole message into a contiguous buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let capacity = self.envelope.header_len() + self.payload.encoded_len();
        let mut writer = BytesMut::with_capacity(capacity).writer();
        self.write_to(&mut writer)?;
        Ok(writer.into_inner().freeze())
    }

    /// Encoded message as space-separated lowercase hex, for diagnostics.
    pub fn to_hex(&self) -> Result<String> {
        Ok(to_hex(&self.to_bytes()?))
    }
}

impl<P: Payload + Default> Message<P> {
    /// Decode a fresh message from `source`.
    ///
    /// Returns the message only if the header and the payload were read in
    /// full; nothing is returned on a short read.
    pub fn decode<R: Read>(source: &mut R, headless: bool) -> Result<Self> {
        let mut envelope = Envelope::new();
        envelope.set_headless(headless);
        let mut message = Self::from_parts(envelope, P::default());
        message.read_from(source)?;
        Ok(message)
    }
}

/// Format bytes as space-separated lowercase hex pairs.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, ErrorKind};

    use super::*;
    use crate::envelope::{HEADER_SIZE, MAX_PAYLOAD_LEN};
    use crate::error::EnvelopeError;
    use crate::payload::RawPayload;

    fn sample(n: usize, headless: bool) -> Message<RawPayload> {
        let body: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
        let mut msg = Message::new(1, 3, RawPayload::new(body)).unwrap();
        let env = msg.envelope_mut();
        env.set_transaction_id(42);
        env.set_protocol_id(0);
        env.set_headless(headless);
        msg
    }

    #[test]
    fn networked_roundtrip() {
        for n in [0usize, 1, 253] {
            let msg = sample(n, false);
            let wire = msg.to_bytes().unwrap();
            assert_eq!(wire.len(), HEADER_SIZE + n);

            let decoded =
                Message::<RawPayload>::decode(&mut Cursor::new(wire.as_ref()), false).unwrap();
            let env = decoded.envelope();
            assert_eq!(env.transaction_id(), 42);
            assert_eq!(env.protocol_id(), 0);
            assert_eq!(env.unit_id(), 1);
            assert_eq!(env.function_code(), 3);
            assert_eq!(usize::from(env.data_length()), n + 2);
            assert_eq!(decoded.payload().as_bytes(), msg.payload().as_bytes());
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn headless_roundtrip() {
        for n in [0usize, 1, 253] {
            let msg = sample(n, true);
            let wire = msg.to_bytes().unwrap();
            assert_eq!(wire.len(), 2 + n);
            assert_eq!(&wire[..2], &[1, 3]);

            let decoded =
                Message::<RawPayload>::decode(&mut Cursor::new(wire.as_ref()), true).unwrap();
            let env = decoded.envelope();
            assert!(env.is_headless());
            assert_eq!(env.unit_id(), 1);
            assert_eq!(env.function_code(), 3);
            // Prefix fields never travel in headless mode.
            assert_eq!(env.transaction_id(), 0);
            assert_eq!(env.data_length(), 0);
            assert_eq!(decoded.payload().as_bytes(), msg.payload().as_bytes());
        }
    }

    #[test]
    fn output_length_matches_written_bytes() {
        for n in 0..=MAX_PAYLOAD_LEN {
            let networked = sample(n, false);
            assert_eq!(networked.output_length(), networked.to_bytes().unwrap().len());

            // Headless declares two bytes beyond the body for the link-layer checksum.
            let headless = sample(n, true);
            assert_eq!(headless.output_length(), headless.to_bytes().unwrap().len() + 2);
        }
    }

    #[test]
    fn new_rejects_oversized_payload() {
        let err = Message::new(1, 16, RawPayload::new(vec![0u8; MAX_PAYLOAD_LEN + 1])).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidLength { length: 254, .. }));
    }

    #[test]
    fn truncated_stream_yields_no_message() {
        let wire = sample(10, false).to_bytes().unwrap();
        for cut in 0..wire.len() {
            let result = Message::<RawPayload>::decode(&mut Cursor::new(&wire[..cut]), false);
            match result {
                Err(EnvelopeError::Io(err)) => assert_eq!(err.kind(), ErrorKind::UnexpectedEof),
                other => panic!("cut at {cut}: expected I/O failure, got {other:?}"),
            }
        }
    }

    #[test]
    fn truncated_headless_header_fails() {
        let result = Message::<RawPayload>::decode(&mut Cursor::new(&[0x01][..]), true);
        assert!(matches!(result, Err(EnvelopeError::Io(_))));
    }

    #[test]
    fn sink_error_propagates_unchanged() {
        let msg = sample(20, false);
        let mut sink = FailAfter { remaining: 4 };
        let err = msg.write_to(&mut sink).unwrap_err();
        match err {
            EnvelopeError::Io(err) => assert_eq!(err.kind(), ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other:?}"),
        }

        let mut sink = FailAfter { remaining: 8 };
        assert!(msg.write_to(&mut sink).unwrap_err().is_io());
    }

    #[test]
    fn decode_keeps_unvalidated_data_length() {
        // Declares 0x0103 bytes after the prefix; the header itself decodes fine,
        // only the body read runs short.
        let wire = [0x00, 0x07, 0x00, 0x00, 0x01, 0x03, 0x01, 0x03];
        let mut env = Envelope::new();
        env.read_header(&mut Cursor::new(&wire[..])).unwrap();
        assert_eq!(env.data_length(), 0x0103);

        let result = Message::<RawPayload>::decode(&mut Cursor::new(&wire[..]), false);
        assert!(matches!(result, Err(EnvelopeError::Io(_))));
    }

    #[test]
    fn sync_data_length_tracks_payload() {
        let mut msg = Message::new(1, 6, RawPayload::new(vec![0u8; 4])).unwrap();
        assert_eq!(msg.envelope().data_length(), 6);

        *msg.payload_mut() = RawPayload::new(vec![0u8; 10]);
        msg.sync_data_length().unwrap();
        assert_eq!(msg.envelope().data_length(), 12);
    }

    #[test]
    fn hex_dump() {
        let mut msg = Message::new(0x11, 0x03, RawPayload::new(vec![0x00, 0x6B, 0x00, 0x03]))
            .unwrap();
        msg.envelope_mut().set_transaction_id(1);
        assert_eq!(
            msg.to_hex().unwrap(),
            "00 01 00 00 00 06 11 03 00 6b 00 03"
        );
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn separate_messages_on_separate_threads() {
        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                std::thread::spawn(move || {
                    let mut msg = Message::new(i as u8, 3, RawPayload::new(vec![i as u8; 4]))
                        .unwrap();
                    msg.envelope_mut().set_transaction_id(1000 + i);
                    let wire = msg.to_bytes().unwrap();
                    let decoded =
                        Message::<RawPayload>::decode(&mut Cursor::new(wire.as_ref()), false)
                            .unwrap();
                    assert_eq!(u32::from(decoded.envelope().transaction_id()), 1000 + i);
                    assert_eq!(decoded.envelope().unit_id(), i as u8);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    /// Read holding registers (function 0x03), with a body shape that depends on direction.
    #[derive(Debug, Default, PartialEq)]
    enum ReadRegisters {
        #[default]
        Empty,
        Request { start: u16, count: u16 },
        Response(Vec<u16>),
    }

    impl Payload for ReadRegisters {
        fn encoded_len(&self) -> usize {
            match self {
                Self::Empty => 0,
                Self::Request { .. } => 4,
                Self::Response(regs) => 1 + regs.len() * 2,
            }
        }

        fn write_payload(&self, sink: &mut dyn Write) -> std::io::Result<()> {
            match self {
                Self::Empty => Ok(()),
                Self::Request { start, count } => {
                    sink.write_all(&start.to_be_bytes())?;
                    sink.write_all(&count.to_be_bytes())
                }
                Self::Response(regs) => {
                    sink.write_all(&[(regs.len() * 2) as u8])?;
                    for reg in regs {
                        sink.write_all(&reg.to_be_bytes())?;
                    }
                    Ok(())
                }
            }
        }

        fn read_payload(
            &mut self,
            envelope: &Envelope,
            source: &mut dyn Read,
        ) -> std::io::Result<()> {
            // Responses carry a byte count; requests are a fixed 4 bytes.
            if envelope.payload_len() == 4 {
                let mut buf = [0u8; 4];
                source.read_exact(&mut buf)?;
                *self = Self::Request {
                    start: u16::from_be_bytes([buf[0], buf[1]]),
                    count: u16::from_be_bytes([buf[2], buf[3]]),
                };
            } else {
                let mut count = [0u8; 1];
                source.read_exact(&mut count)?;
                let mut raw = vec![0u8; usize::from(count[0])];
                source.read_exact(&mut raw)?;
                *self = Self::Response(
                    raw.chunks_exact(2)
                        .map(|c| u16::from_be_bytes([c[0], c[1]]))
                        .collect(),
                );
            }
            Ok(())
        }
    }

    #[test]
    fn typed_payload_hooks() {
        let request = Message::new(1, 3, ReadRegisters::Request { start: 0x6B, count: 3 }).unwrap();
        let wire = request.to_bytes().unwrap();
        assert_eq!(wire.as_ref(), &[0, 0, 0, 0, 0, 6, 1, 3, 0, 0x6B, 0, 3]);
        let decoded = Message::<ReadRegisters>::decode(&mut Cursor::new(wire.as_ref()), false)
            .unwrap();
        assert_eq!(decoded.payload(), request.payload());

        let response =
            Message::new(1, 3, ReadRegisters::Response(vec![0x022B, 0x0000, 0x0064])).unwrap();
        assert_eq!(response.envelope().data_length(), 9);
        let wire = response.to_bytes().unwrap();
        let decoded = Message::<ReadRegisters>::decode(&mut Cursor::new(wire.as_ref()), false)
            .unwrap();
        assert_eq!(
            decoded.payload(),
            &ReadRegisters::Response(vec![0x022B, 0x0000, 0x0064])
        );
    }

    struct FailAfter {
        remaining: usize,
    }

    impl Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                return Err(std::io::Error::from(ErrorKind::BrokenPipe));
            }
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
