//! Modbus-style message envelope.
//!
//! Every request and response starts with the same header:
//! - networked framing: transaction id, protocol id and data length (2 bytes each,
//!   big-endian), then unit id and function code
//! - headless framing: unit id and function code only, for serial links that
//!   delimit frames themselves
//!
//! The function-specific body is opaque here. Message variants plug it in
//! through the [`Payload`] hooks.

#[cfg(feature = "async")]
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod message;
pub mod payload;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use codec::EnvelopeCodec;
pub use config::FramingConfig;
pub use envelope::{
    networked_frame_len, Envelope, ADDRESS_SIZE, HEADER_SIZE, MAX_DATA_LENGTH, MAX_PAYLOAD_LEN,
    PREFIX_SIZE,
};
pub use error::{EnvelopeError, Result};
pub use message::{to_hex, Message};
pub use payload::{Payload, RawPayload};
pub use reader::EnvelopeReader;
pub use writer::EnvelopeWriter;
