use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use crate::error::{EnvelopeError, Result};

/// Networked prefix: transaction id (2) + protocol id (2) + data length (2) = 6 bytes.
pub const PREFIX_SIZE: usize = 6;

/// Unit id (1) + function code (1), present in every framing mode.
pub const ADDRESS_SIZE: usize = 2;

/// Full networked header: prefix + unit id + function code = 8 bytes.
pub const HEADER_SIZE: usize = PREFIX_SIZE + ADDRESS_SIZE;

/// Largest payload the validated length setter accepts.
pub const MAX_PAYLOAD_LEN: usize = 253;

/// Largest data length the validated length setter can store (payload + unit id + function code).
pub const MAX_DATA_LENGTH: u16 = 255;

pub const DEFAULT_TRANSACTION_ID: u16 = 0;
pub const DEFAULT_PROTOCOL_ID: u16 = 0;
pub const DEFAULT_UNIT_ID: u8 = 0;

/// Header fields shared by every request and response.
///
/// One instance describes exactly one in-flight message. It carries no
/// synchronization: build it, frame it, and drop it once the exchange is done.
/// Use a separate envelope per message when handling messages on several threads.
///
/// `data_length` counts the unit id and function code in addition to the
/// payload, so a message with an `N`-byte body carries `N + 2` in that field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    transaction_id: u16,
    protocol_id: u16,
    data_length: u16,
    unit_id: u8,
    function_code: u8,
    headless: bool,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            transaction_id: DEFAULT_TRANSACTION_ID,
            protocol_id: DEFAULT_PROTOCOL_ID,
            data_length: 0,
            unit_id: DEFAULT_UNIT_ID,
            function_code: 0,
            headless: false,
        }
    }
}

impl Envelope {
    /// Create an envelope for networked (length-prefixed) framing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an envelope for headless framing.
    pub fn headless() -> Self {
        Self {
            headless: true,
            ..Self::default()
        }
    }

    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Set the transaction id, keeping only the low 16 bits.
    ///
    /// Overflow wraps silently so callers can use a free-running counter.
    pub fn set_transaction_id(&mut self, tid: u32) {
        self.transaction_id = (tid & 0xFFFF) as u16;
    }

    pub fn protocol_id(&self) -> u16 {
        self.protocol_id
    }

    /// Set the protocol id. Stored exactly as given; 0 is the conventional value.
    pub fn set_protocol_id(&mut self, pid: u16) {
        self.protocol_id = pid;
    }

    /// Stored data length, i.e. payload bytes + 2.
    pub fn data_length(&self) -> u16 {
        self.data_length
    }

    /// Set the data length from a payload byte count.
    ///
    /// Stores `payload_bytes + 2` to account for the unit id and function code.
    /// Fails with [`EnvelopeError::InvalidLength`] when `payload_bytes` is
    /// negative or the stored value would exceed 255.
    pub fn set_data_length(&mut self, payload_bytes: i32) -> Result<()> {
        if payload_bytes < 0 || payload_bytes > i32::from(MAX_DATA_LENGTH) - 2 {
            return Err(EnvelopeError::InvalidLength {
                length: i64::from(payload_bytes),
                max: MAX_PAYLOAD_LEN,
            });
        }
        self.data_length = (payload_bytes + 2) as u16;
        Ok(())
    }

    /// [`set_data_length`](Self::set_data_length) for a `usize` byte count.
    pub fn set_payload_len(&mut self, len: usize) -> Result<()> {
        match i32::try_from(len) {
            Ok(len) => self.set_data_length(len),
            Err(_) => Err(EnvelopeError::InvalidLength {
                length: i64::try_from(len).unwrap_or(i64::MAX),
                max: MAX_PAYLOAD_LEN,
            }),
        }
    }

    /// Payload bytes implied by the stored data length.
    pub fn payload_len(&self) -> usize {
        usize::from(self.data_length.saturating_sub(ADDRESS_SIZE as u16))
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn set_unit_id(&mut self, unit_id: u8) {
        self.unit_id = unit_id;
    }

    pub fn function_code(&self) -> u8 {
        self.function_code
    }

    pub fn set_function_code(&mut self, code: u8) {
        self.function_code = code;
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    pub fn set_headless(&mut self, headless: bool) {
        self.headless = headless;
    }

    /// Bytes of the transaction/protocol/length prefix in the current mode.
    pub fn prefix_len(&self) -> usize {
        if self.headless {
            0
        } else {
            PREFIX_SIZE
        }
    }

    /// Bytes of header written before the payload in the current mode.
    pub fn header_len(&self) -> usize {
        self.prefix_len() + ADDRESS_SIZE
    }

    /// Declared packet size.
    ///
    /// `2 + data_length`, plus 4 in networked mode. In networked mode this is
    /// exactly the number of bytes [`write_header`](Self::write_header) and the
    /// payload produce. In headless mode it exceeds them by 2, leaving room for
    /// the checksum a serial link layer appends.
    pub fn output_length(&self) -> usize {
        let len = 2 + usize::from(self.data_length);
        if self.headless {
            len
        } else {
            len + 4
        }
    }

    /// Encode the header fields into `dst`.
    ///
    /// Wire format (big-endian):
    /// ```text
    /// networked: ┌─────────┬──────────┬──────────┬──────┬──────────┐
    ///            │ TID (2) │ PID (2)  │ LEN (2)  │ UNIT │ FUNCTION │
    ///            └─────────┴──────────┴──────────┴──────┴──────────┘
    /// headless:  ┌──────┬──────────┐
    ///            │ UNIT │ FUNCTION │
    ///            └──────┴──────────┘
    /// ```
    pub fn encode_header<B: BufMut>(&self, dst: &mut B) {
        if !self.headless {
            dst.put_u16(self.transaction_id);
            dst.put_u16(self.protocol_id);
            dst.put_u16(self.data_length);
        }
        dst.put_u8(self.unit_id);
        dst.put_u8(self.function_code);
    }

    /// Write the header fields to `sink`. Sink errors are returned unchanged.
    pub fn write_header<W: Write + ?Sized>(&self, sink: &mut W) -> std::io::Result<()> {
        let mut header = [0u8; HEADER_SIZE];
        {
            let mut dst = &mut header[..];
            self.encode_header(&mut dst);
        }
        sink.write_all(&header[..self.header_len()])
    }

    /// Read the header fields from `source`.
    ///
    /// The data length is taken from the wire as-is and is not validated the
    /// way [`set_data_length`](Self::set_data_length) validates it. On error
    /// the envelope may be partially overwritten and must be discarded.
    pub fn read_header<R: Read + ?Sized>(&mut self, source: &mut R) -> std::io::Result<()> {
        if !self.headless {
            let mut prefix = [0u8; PREFIX_SIZE];
            source.read_exact(&mut prefix)?;
            let mut src = &prefix[..];
            self.set_transaction_id(u32::from(src.get_u16()));
            self.set_protocol_id(src.get_u16());
            self.data_length = src.get_u16();
        }

        let mut address = [0u8; ADDRESS_SIZE];
        source.read_exact(&mut address)?;
        self.set_unit_id(address[0]);
        self.set_function_code(address[1]);
        Ok(())
    }
}

/// Total size of the networked frame starting at `prefix`, read from its data length.
///
/// The unit id and function code are always on the wire, so a frame never
/// spans fewer than [`HEADER_SIZE`] bytes even when it declares a data length
/// of 0 or 1. Returns `None` if fewer than [`PREFIX_SIZE`] bytes are available.
pub fn networked_frame_len(prefix: &[u8]) -> Option<usize> {
    if prefix.len() < PREFIX_SIZE {
        return None;
    }
    let data_length = u16::from_be_bytes([prefix[4], prefix[5]]);
    Some((PREFIX_SIZE + usize::from(data_length)).max(HEADER_SIZE))
}
