//! Byte-source layer for the tracelens parser.
//!
//! A trace stream is consumed through the [`TraceFile`] trait: a seekable
//! byte source with an EOF-tolerant `getc`. Two implementations are
//! provided: [`BytesFile`] over an in-memory buffer and [`StdFile`] over a
//! file on disk. [`create_for_read`] opens a path and transparently
//! inflates gzip-compressed captures.
//!
//! The crate also carries the base-128 varint codec shared by readers and
//! writers, and a growable binary [`Writer`] used to assemble wire images.

use thiserror::Error;

mod file;
mod reader;
mod varint;
mod writer;

pub use file::{create_for_read, StdFile};
pub use reader::BytesFile;
pub use varint::{read_vuint, skip_vuint, vuint_len, write_vuint};
pub use writer::Writer;

/// Errors surfaced by the byte-source layer.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The underlying file could not be opened or read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A seekable trace byte source.
///
/// End-of-stream is a normal condition, not an error: `getc` returns
/// `None`, `read` returns a short count, and `skip` stops at the end.
/// Offsets are absolute byte positions within the (decompressed) stream.
pub trait TraceFile {
    /// Reads one byte, or `None` at end of stream.
    fn getc(&mut self) -> Option<u8>;

    /// Reads up to `buf.len()` bytes and returns how many were read.
    ///
    /// A return value smaller than `buf.len()` means the stream was
    /// truncated; the position is then at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Advances the position by `n` bytes, stopping at end of stream.
    fn skip(&mut self, n: u64);

    /// Returns the current absolute byte offset.
    fn current_offset(&self) -> u64;

    /// Repositions the stream to an absolute byte offset.
    fn set_current_offset(&mut self, offset: u64);
}
