/// Deepest nesting of element values and attributes accepted while decoding.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Settings for one decode call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Stop at unexpected end of data and keep what was fully decoded.
    ///
    /// Attribute payloads that cannot be structured within their declared
    /// length are kept as opaque bytes instead of failing the decode.
    pub tolerant: bool,
    /// Log every decoded structure with its byte offset at trace level.
    pub trace: bool,
}
impl DecodeOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn tolerant() -> Self {
        Self {
            tolerant: true,
            ..Self::default()
        }
    }

    pub fn with_trace(self, trace: bool) -> Self {
        Self { trace, ..self }
    }
}

/// Settings for one encode call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Log every encoded structure with its byte offset at trace level.
    pub trace: bool,
}
impl EncodeOptions {
    pub fn with_trace(self, trace: bool) -> Self {
        Self { trace }
    }
}
