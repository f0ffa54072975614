//! Modbus-style message envelopes.
//!
//! modframe frames function-specific payloads in the envelope shared by every
//! Modbus-style request and response, in either networked (length-prefixed)
//! or headless (serial) mode.
//!
//! # Crate Structure
//!
//! - [`envelope`] — Header fields, framing codec, payload hooks and stream reader/writer
//!
//! The `modframe` binary (behind the `cli` feature) encodes and decodes
//! envelopes from the shell.

/// Re-export envelope types.
pub mod envelope {
    pub use modframe_envelope::*;
}

pub use modframe_envelope::{Envelope, EnvelopeError, Message, Payload, RawPayload};
