use std::io::{Cursor, ErrorKind, Read};

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::config::FramingConfig;
use crate::envelope::networked_frame_len;
use crate::error::{EnvelopeError, Result};
use crate::message::Message;
use crate::payload::{Payload, RawPayload};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete messages from any `Read` stream.
///
/// In networked mode the declared data length delimits each message, so the
/// reader buffers exactly one frame before handing it to the payload hook and
/// stays aligned even if a hook under-reads. In headless mode there is no
/// length on the wire; the payload hook reads straight from the stream.
pub struct EnvelopeReader<T> {
    inner: T,
    buf: BytesMut,
    config: FramingConfig,
}

impl<T: Read> EnvelopeReader<T> {
    /// Create a reader for networked framing.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FramingConfig::default())
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(inner: T, config: FramingConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(EnvelopeError::ConnectionClosed)` when the stream ends on a
    /// message boundary, and an `UnexpectedEof` I/O error when it ends mid-message.
    pub fn read_message<P: Payload + Default>(&mut self) -> Result<Message<P>> {
        if self.config.headless {
            return self.read_headless();
        }

        loop {
            if let Some(frame_len) = networked_frame_len(&self.buf) {
                if self.buf.len() >= frame_len {
                    let frame = self.buf.split_to(frame_len).freeze();
                    let mut src = Cursor::new(frame.as_ref());
                    let message: Message<P> = Message::decode(&mut src, false)?;

                    let unconsumed = frame_len - src.position() as usize;
                    if unconsumed > 0 {
                        warn!(
                            unconsumed,
                            function_code = message.envelope().function_code(),
                            "payload left bytes unread, discarding"
                        );
                    }
                    return Ok(message);
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(EnvelopeError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Err(EnvelopeError::ConnectionClosed);
                }
                debug!(buffered = self.buf.len(), "stream ended mid-message");
                return Err(EnvelopeError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "stream ended mid-message",
                )));
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next message with an opaque body.
    pub fn read_raw(&mut self) -> Result<Message<RawPayload>> {
        self.read_message()
    }

    fn read_headless<P: Payload + Default>(&mut self) -> Result<Message<P>> {
        let mut first = [0u8; 1];
        loop {
            match self.inner.read(&mut first) {
                Ok(0) => return Err(EnvelopeError::ConnectionClosed),
                Ok(_) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(EnvelopeError::Io(err)),
            }
        }

        let mut src = Cursor::new(first).chain(&mut self.inner);
        Message::decode(&mut src, true)
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
    ///
    /// Bytes already buffered for the next message are dropped.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FramingConfig {
        &self.config
    }
}
