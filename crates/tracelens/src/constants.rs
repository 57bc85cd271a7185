//! Wire tag constants shared with the recorder.
//!
//! The integer assignments below are fixed by the capture format; both the
//! recorder and this parser must agree on them byte for byte.

/// Highest wire-format version this parser understands.
///
/// The file header is a single varint version; streams newer than this are
/// rejected at open. Version gates inside the stream:
/// * `>= 3` — enum signatures carry multiple name/value pairs and enum
///   values carry an explicit signed integer.
/// * `>= 4` — ENTER events carry a thread id.
pub const TRACE_VERSION: u32 = 5;

/// Event tags.
pub const EVENT_ENTER: u8 = 0x00;
pub const EVENT_LEAVE: u8 = 0x01;

/// Call detail tags, following an ENTER or LEAVE payload prefix.
pub const CALL_END: u8 = 0x00;
pub const CALL_ARG: u8 = 0x01;
pub const CALL_RET: u8 = 0x02;

/// Value type tags.
pub const TYPE_NULL: u8 = 0x01;
pub const TYPE_FALSE: u8 = 0x02;
pub const TYPE_TRUE: u8 = 0x03;
pub const TYPE_SINT: u8 = 0x04;
pub const TYPE_UINT: u8 = 0x05;
pub const TYPE_FLOAT: u8 = 0x06;
pub const TYPE_DOUBLE: u8 = 0x07;
pub const TYPE_STRING: u8 = 0x08;
pub const TYPE_BLOB: u8 = 0x09;
pub const TYPE_ENUM: u8 = 0x0a;
pub const TYPE_BITMASK: u8 = 0x0b;
pub const TYPE_ARRAY: u8 = 0x0c;
pub const TYPE_STRUCT: u8 = 0x0d;
pub const TYPE_OPAQUE: u8 = 0x0e;

/// Signature IDs are wire-supplied table indices; anything above this cap
/// is treated as corruption rather than grown into memory.
pub const MAX_SIG_ID: u64 = 1 << 20;

/// Argument indices are wire-supplied too; same reasoning as [`MAX_SIG_ID`].
pub const MAX_ARG_INDEX: u64 = 1 << 16;
