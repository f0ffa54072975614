use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::config::FramingConfig;
use crate::error::{EnvelopeError, Result};
use crate::message::Message;
use crate::payload::{Payload, RawPayload};

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Writes complete messages to any `Write` stream.
///
/// Each message is staged in an internal buffer and handed to the stream as a
/// whole, then the stream is flushed.
pub struct EnvelopeWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FramingConfig,
    next_transaction_id: u32,
}

impl<T: Write> EnvelopeWriter<T> {
    /// Create a writer for networked framing.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FramingConfig::default())
    }

    /// Create a writer with explicit configuration.
    pub fn with_config(inner: T, config: FramingConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            next_transaction_id: 0,
        }
    }

    /// Write a complete message (blocking).
    ///
    /// The message is framed in the writer's configured mode regardless of the
    /// headless flag on its own envelope.
    pub fn write_message<P: Payload>(&mut self, message: &Message<P>) -> Result<()> {
        self.buf.clear();
        {
            let mut staged = (&mut self.buf).writer();
            if message.envelope().is_headless() == self.config.headless {
                message.write_to(&mut staged)?;
            } else {
                let mut envelope = message.envelope().clone();
                envelope.set_headless(self.config.headless);
                envelope.write_header(&mut staged)?;
                message.payload().write_payload(&mut staged)?;
            }
        }

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(EnvelopeError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(EnvelopeError::Io(err)),
            }
        }
        trace!(bytes = offset, "message written to stream");

        self.flush()
    }

    /// Frame and send an opaque body, stamping the next transaction id.
    ///
    /// The counter starts at 0 and wraps after 65535. Returns the id used.
    pub fn send(&mut self, unit_id: u8, function_code: u8, body: &[u8]) -> Result<u16> {
        let mut message = Message::new(unit_id, function_code, RawPayload::new(body.to_vec()))?;
        message
            .envelope_mut()
            .set_transaction_id(self.next_transaction_id);
        message.envelope_mut().set_headless(self.config.headless);
        let tid = message.envelope().transaction_id();

        self.write_message(&message)?;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1);
        Ok(tid)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(EnvelopeError::Io(err)),
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
    pub fn config(&self) -> &FramingConfig {
        &self.config
    }
}
