//! Interned signature records and per-function call flags.
//!
//! Signatures are defined lazily in the stream on first reference and
//! interned by small integer ID; every later reference shares the same
//! record. Each record remembers the byte offset immediately past its
//! first definition — the decoder compares the current stream offset
//! against it to distinguish a re-definition (which must be skipped) from
//! a bare ID reference.

use bitflags::bitflags;

bitflags! {
    /// Flags attached to a call, mostly inherited from its function
    /// signature at definition time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CallFlags: u32 {
        /// Not a real invocation; synthesized by the recorder.
        const FAKE = 1 << 0;
        /// Results may differ between capture and replay.
        const NON_REPRODUCIBLE = 1 << 1;
        /// Queries state without changing it.
        const NO_SIDE_EFFECTS = 1 << 2;
        /// Issues rendering work.
        const RENDER = 1 << 3;
        /// Changes the current render target.
        const SWAP_RENDERTARGET = 1 << 4;
        /// Marks the end of a frame.
        const END_FRAME = 1 << 5;
        /// The stream ended before the call's LEAVE was seen.
        const INCOMPLETE = 1 << 6;
        /// Uninteresting unless verbose output was requested.
        const VERBOSE = 1 << 7;
    }
}

/// A function signature: name, argument names, and derived flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub id: u32,
    pub name: String,
    pub arg_names: Vec<String>,
    pub flags: CallFlags,
    /// Offset just past the signature's first definition in the stream.
    pub offset: u64,
}

/// A struct signature: name and ordered member names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructSig {
    pub id: u32,
    pub name: String,
    pub member_names: Vec<String>,
    pub offset: u64,
}

/// One symbolic enum entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

/// An enum signature. Streams older than wire version 3 define exactly one
/// entry per signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSig {
    pub id: u32,
    pub values: Vec<EnumValue>,
    pub offset: u64,
}

/// One named bitmask flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmaskFlag {
    pub name: String,
    pub value: u64,
}

/// A bitmask signature: the named flags a value decomposes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmaskSig {
    pub id: u32,
    pub flags: Vec<BitmaskFlag>,
    pub offset: u64,
}

/// Static per-function flag table, sorted by name for binary search.
///
/// Flag policy is resolved here once, when a function signature is first
/// defined; per-call code never compares names.
const CALL_FLAG_TABLE: &[(&str, CallFlags)] = &[
    ("eglSwapBuffers", CallFlags::END_FRAME.union(CallFlags::SWAP_RENDERTARGET)),
    ("free", CallFlags::FAKE),
    ("glClear", CallFlags::RENDER),
    ("glDrawArrays", CallFlags::RENDER),
    ("glDrawElements", CallFlags::RENDER),
    ("glDrawRangeElements", CallFlags::RENDER),
    ("glGetError", CallFlags::NO_SIDE_EFFECTS),
    ("glGetString", CallFlags::NO_SIDE_EFFECTS),
    ("glXGetProcAddress", CallFlags::NON_REPRODUCIBLE),
    ("glXSwapBuffers", CallFlags::END_FRAME.union(CallFlags::SWAP_RENDERTARGET)),
    ("malloc", CallFlags::FAKE),
    ("memcpy", CallFlags::FAKE),
    ("realloc", CallFlags::FAKE),
    ("wglGetProcAddress", CallFlags::NON_REPRODUCIBLE),
    ("wglSwapBuffers", CallFlags::END_FRAME.union(CallFlags::SWAP_RENDERTARGET)),
];

/// Returns the flags recorded for `name`, or empty when unlisted.
pub fn lookup_call_flags(name: &str) -> CallFlags {
    match CALL_FLAG_TABLE.binary_search_by(|(n, _)| n.cmp(&name)) {
        Ok(i) => CALL_FLAG_TABLE[i].1,
        Err(_) => CallFlags::empty(),
    }
}
