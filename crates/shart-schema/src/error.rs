use crate::field::FieldKind;

/// Errors raised while building a registry or converting payloads.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The field widths of a layout do not add up to the declared payload length.
    #[error("layout is {computed} bytes but payload length is declared as {declared}")]
    LayoutLength { declared: usize, computed: usize },

    /// A payload handed to the decoder does not match its spec's length.
    #[error("payload is {actual} bytes, layout expects {expected}")]
    LayoutMismatch { expected: usize, actual: usize },

    /// A struct-format string could not be parsed.
    #[error("invalid layout format {format:?}: {reason}")]
    InvalidFormat { format: String, reason: String },

    /// A field kind name is not recognized.
    #[error("unknown field kind {0:?}")]
    UnknownFieldKind(String),

    /// The tag was registered more than once.
    #[error("packet tag 0x{0:02X} is already registered")]
    DuplicateTag(u8),

    /// The value count does not match the layout.
    #[error("expected {expected} field values, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    /// A value does not have the kind its layout slot declares.
    #[error("field {index} expects {expected}, got {actual}")]
    ValueKind {
        index: usize,
        expected: FieldKind,
        actual: FieldKind,
    },

    /// The registry file could not be loaded.
    #[error("failed to load registry: {0}")]
    LoadFailed(String),

    /// The registry document is not valid JSON for the expected shape.
    #[error("registry is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
