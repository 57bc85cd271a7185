use thiserror::Error;

use tracelens_buffers::BufferError;

/// Errors surfaced while opening or decoding a capture stream.
///
/// Truncation is deliberately absent: a stream that ends mid-record is a
/// normal condition and is reported through empty values, dropped calls,
/// and the `INCOMPLETE` call flag. The structural variants here mean the
/// stream is corrupt; it cannot be resynchronized and the parser should be
/// dropped.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error("unsupported trace format version {0}")]
    UnsupportedVersion(u64),

    #[error("unknown event {0:#04x}")]
    UnknownEvent(u8),

    #[error("unknown call detail {tag:#04x} in {function}")]
    UnknownCallDetail { tag: u8, function: String },

    #[error("unknown value type {0:#04x}")]
    UnknownType(u8),

    #[error("unexpected type {0:#04x} for a signed integer")]
    UnexpectedType(u8),

    #[error("signature id {0} out of range")]
    SignatureIdOutOfRange(u64),

    #[error("argument index {0} out of range")]
    ArgIndexOutOfRange(u64),

    #[error("parser is not open")]
    NotOpen,
}
