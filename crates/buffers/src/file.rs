//! File-backed trace byte source.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::{BufferError, BytesFile, TraceFile};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A [`TraceFile`] over a file on disk, buffered.
pub struct StdFile {
    inner: BufReader<File>,
    offset: u64,
    len: u64,
}

impl StdFile {
    /// Opens `path` for reading, positioned at the start.
    pub fn open(path: &Path) -> Result<Self, BufferError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            inner: BufReader::new(file),
            offset: 0,
            len,
        })
    }
}

impl TraceFile for StdFile {
    fn getc(&mut self) -> Option<u8> {
        let mut b = [0u8; 1];
        match self.inner.read(&mut b) {
            Ok(1) => {
                self.offset += 1;
                Some(b[0])
            }
            _ => None,
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) | Err(_) => break,
                Ok(n) => filled += n,
            }
        }
        self.offset += filled as u64;
        filled
    }

    fn skip(&mut self, n: u64) {
        let target = self.offset.saturating_add(n).min(self.len);
        self.set_current_offset(target);
    }

    fn current_offset(&self) -> u64 {
        self.offset
    }

    fn set_current_offset(&mut self, offset: u64) {
        let offset = offset.min(self.len);
        if self.inner.seek(SeekFrom::Start(offset)).is_ok() {
            self.offset = offset;
        }
    }
}

/// Opens a capture file for reading.
///
/// Gzip-compressed captures (magic `1f 8b`) are inflated into memory at
/// open so the stream stays seekable; plain captures are read from disk.
pub fn create_for_read(path: impl AsRef<Path>) -> Result<Box<dyn TraceFile>, BufferError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let got = file.read(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    if got == 2 && magic == GZIP_MAGIC {
        let mut data = Vec::new();
        GzDecoder::new(BufReader::new(file)).read_to_end(&mut data)?;
        Ok(Box::new(BytesFile::new(data)))
    } else {
        drop(file);
        Ok(Box::new(StdFile::open(path)?))
    }
}
