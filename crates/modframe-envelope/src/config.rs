/// Framing options shared by [`EnvelopeReader`](crate::EnvelopeReader) and
/// [`EnvelopeWriter`](crate::EnvelopeWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramingConfig {
    /// Omit the transaction/protocol/length prefix (serial links).
    /// Default: false (networked framing).
    pub headless: bool,
}

impl FramingConfig {
    pub fn networked() -> Self {
        Self { headless: false }
    }

    pub fn headless() -> Self {
        Self { headless: true }
    }
}
