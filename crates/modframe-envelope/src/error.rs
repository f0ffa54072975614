/// Errors that can occur while building, encoding, or decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The payload length handed to the validated length setter is out of range.
    #[error("invalid length: {length} (payload must be 0..={max} bytes)")]
    InvalidLength { length: i64, max: usize },

    /// An I/O error occurred while reading or writing an envelope.
    #[error("envelope I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before the first byte of a new message.
    #[error("connection closed (no further messages)")]
    ConnectionClosed,
}

impl EnvelopeError {
    /// True when the error came from the byte sink or source rather than field validation.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
