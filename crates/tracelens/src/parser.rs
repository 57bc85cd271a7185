//! The event decoder state machine.
//!
//! [`Parser`] turns a capture byte stream into [`Call`] records. The
//! decoder interleaves three concerns:
//!
//! * **signature interning** — function/struct/enum/bitmask signatures are
//!   defined lazily at their first reference and interned by wire ID;
//!   later references carry only the ID, except after a bookmark rewind,
//!   where an already-known definition is skipped by comparing the stream
//!   offset against the signature's recorded first-definition offset;
//! * **call assembly** — a call's ENTER and LEAVE events may be separated
//!   by events from other threads, so partially built calls wait in an
//!   in-flight list keyed by call number until their LEAVE arrives;
//! * **value decoding** — arguments and return values form a recursive
//!   tagged tree, either materialized ([`Mode::Full`]) or byte-accurately
//!   consumed without allocation ([`Mode::Scan`]).
//!
//! End of stream is never an error: varints cut short yield their partial
//! bits, truncated calls are dropped or surfaced as `INCOMPLETE`, and
//! `parse_call` returns `Ok(None)` once everything in flight has drained.

use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use tracelens_buffers::{create_for_read, read_vuint, skip_vuint, BytesFile, TraceFile};

use crate::call::Call;
use crate::constants::{
    CALL_ARG, CALL_END, CALL_RET, EVENT_ENTER, EVENT_LEAVE, MAX_ARG_INDEX, MAX_SIG_ID,
    TRACE_VERSION, TYPE_ARRAY, TYPE_BITMASK, TYPE_BLOB, TYPE_DOUBLE, TYPE_ENUM, TYPE_FALSE,
    TYPE_FLOAT, TYPE_NULL, TYPE_OPAQUE, TYPE_SINT, TYPE_STRING, TYPE_STRUCT, TYPE_TRUE, TYPE_UINT,
};
use crate::error::ParseError;
use crate::sig::{
    lookup_call_flags, BitmaskFlag, BitmaskSig, CallFlags, EnumSig, EnumValue, FunctionSig,
    StructSig,
};
use crate::value::Value;

/// How much of each value to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Build full value trees.
    Full,
    /// Consume value bytes without allocating; used for index building.
    Scan,
}

/// A resumable position: stream offset plus the next call number.
///
/// Bookmarks must be captured at an event-tag boundary (i.e. between
/// `parse_call` invocations); restoring one taken mid-record is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    pub offset: u64,
    pub next_call_no: u64,
}

/// Streaming parser over one capture byte source.
///
/// Single-threaded; signatures are `Rc`-shared between the parser and the
/// calls it emits, so a `Parser` and its calls stay on one thread.
///
/// # Example
///
/// ```no_run
/// use tracelens::{Mode, Parser};
///
/// let mut parser = Parser::new();
/// parser.open("app.trace")?;
/// while let Some(call) = parser.parse_call(Mode::Full)? {
///     println!("{} {}", call.no, call.name());
/// }
/// # Ok::<(), tracelens::ParseError>(())
/// ```
#[derive(Default)]
pub struct Parser {
    file: Option<Box<dyn TraceFile>>,
    version: u32,
    functions: Vec<Option<Rc<FunctionSig>>>,
    structs: Vec<Option<Rc<StructSig>>>,
    enums: Vec<Option<Rc<EnumSig>>>,
    bitmasks: Vec<Option<Rc<BitmaskSig>>>,
    /// Calls whose ENTER has been seen but whose LEAVE has not.
    calls: VecDeque<Call>,
    next_call_no: u64,
    /// Cached at definition so flag adjustment never compares names.
    gl_get_error_sig: Option<Rc<FunctionSig>>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a capture file, inflating gzip transparently.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), ParseError> {
        let file = create_for_read(path)?;
        self.open_file(file)
    }

    /// Opens an in-memory capture image.
    pub fn open_bytes(&mut self, data: Vec<u8>) -> Result<(), ParseError> {
        self.open_file(Box::new(BytesFile::new(data)))
    }

    /// Opens an arbitrary byte source.
    ///
    /// Reads the header varint and rejects versions newer than
    /// [`TRACE_VERSION`]; on rejection the parser stays closed.
    pub fn open_file(&mut self, mut file: Box<dyn TraceFile>) -> Result<(), ParseError> {
        self.close();
        let version = read_vuint(&mut *file);
        if version > u64::from(TRACE_VERSION) {
            return Err(ParseError::UnsupportedVersion(version));
        }
        self.version = version as u32;
        self.file = Some(file);
        Ok(())
    }

    /// Releases the byte source, the signature tables, and any in-flight
    /// calls.
    pub fn close(&mut self) {
        self.file = None;
        self.version = 0;
        self.functions.clear();
        self.structs.clear();
        self.enums.clear();
        self.bitmasks.clear();
        self.calls.clear();
        self.next_call_no = 0;
        self.gl_get_error_sig = None;
    }

    /// The wire version captured at open.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Snapshot of the current resume position.
    pub fn bookmark(&self) -> Result<Bookmark, ParseError> {
        let file = self.file.as_ref().ok_or(ParseError::NotOpen)?;
        Ok(Bookmark {
            offset: file.current_offset(),
            next_call_no: self.next_call_no,
        })
    }

    /// Rewinds to a previously captured [`Bookmark`].
    ///
    /// In-flight calls belong to the abandoned future and are dropped.
    pub fn set_bookmark(&mut self, bookmark: &Bookmark) -> Result<(), ParseError> {
        let file = self.file.as_mut().ok_or(ParseError::NotOpen)?;
        file.set_current_offset(bookmark.offset);
        self.next_call_no = bookmark.next_call_no;
        self.calls.clear();
        Ok(())
    }

    /// Decodes events until a call completes.
    ///
    /// Returns the next completed call in LEAVE order, or `Ok(None)` at
    /// end of stream once in-flight calls have drained (each surfacing
    /// once with [`CallFlags::INCOMPLETE`]).
    pub fn parse_call(&mut self, mode: Mode) -> Result<Option<Call>, ParseError> {
        let mut file = self.file.take().ok_or(ParseError::NotOpen)?;
        let result = self.parse_call_inner(&mut *file, mode);
        self.file = Some(file);
        result
    }

    fn parse_call_inner(
        &mut self,
        f: &mut dyn TraceFile,
        mode: Mode,
    ) -> Result<Option<Call>, ParseError> {
        loop {
            match f.getc() {
                Some(EVENT_ENTER) => self.parse_enter(f, mode)?,
                Some(EVENT_LEAVE) => {
                    if let Some(mut call) = self.parse_leave(f, mode)? {
                        self.adjust_call_flags(&mut call);
                        return Ok(Some(call));
                    }
                }
                Some(tag) => return Err(ParseError::UnknownEvent(tag)),
                None => {
                    return Ok(self.calls.pop_front().map(|mut call| {
                        call.flags |= CallFlags::INCOMPLETE;
                        self.adjust_call_flags(&mut call);
                        call
                    }))
                }
            }
        }
    }

    fn parse_enter(&mut self, f: &mut dyn TraceFile, mode: Mode) -> Result<(), ParseError> {
        let thread_id = if self.version >= 4 {
            read_vuint(f) as u32
        } else {
            0
        };
        let sig = self.parse_function_sig(f)?;
        let no = self.next_call_no;
        self.next_call_no += 1;
        let mut call = Call::new(sig, thread_id, no);
        // A truncated detail section drops the call; its number stays
        // consumed.
        if self.parse_call_details(f, &mut call, mode)? {
            self.calls.push_back(call);
        }
        Ok(())
    }

    fn parse_leave(
        &mut self,
        f: &mut dyn TraceFile,
        mode: Mode,
    ) -> Result<Option<Call>, ParseError> {
        let call_time = Value::UInt(read_vuint(f));
        let call_no = read_vuint(f);
        let Some(pos) = self.calls.iter().position(|c| c.no == call_no) else {
            // Stray LEAVE: no matching ENTER in flight. Ignored.
            return Ok(None);
        };
        let Some(mut call) = self.calls.remove(pos) else {
            return Ok(None);
        };
        call.call_time = Some(call_time);
        if self.parse_call_details(f, &mut call, mode)? {
            Ok(Some(call))
        } else {
            Ok(None)
        }
    }

    /// Per-call flag adjustment; resolved by signature identity, never by
    /// name comparison.
    fn adjust_call_flags(&self, call: &mut Call) {
        if let Some(sig) = &self.gl_get_error_sig {
            if Rc::ptr_eq(sig, &call.sig) && call.ret.as_ref().and_then(Value::to_sint) == Some(0) {
                call.flags |= CallFlags::VERBOSE;
            }
        }
    }

    fn parse_call_details(
        &mut self,
        f: &mut dyn TraceFile,
        call: &mut Call,
        mode: Mode,
    ) -> Result<bool, ParseError> {
        loop {
            let Some(tag) = f.getc() else {
                return Ok(false);
            };
            match tag {
                CALL_END => return Ok(true),
                CALL_ARG => self.parse_arg(f, call, mode)?,
                CALL_RET => match mode {
                    Mode::Full => call.ret = self.parse_value(f)?,
                    Mode::Scan => self.scan_value(f)?,
                },
                tag => {
                    return Err(ParseError::UnknownCallDetail {
                        tag,
                        function: call.name().to_owned(),
                    })
                }
            }
        }
    }

    fn parse_arg(
        &mut self,
        f: &mut dyn TraceFile,
        call: &mut Call,
        mode: Mode,
    ) -> Result<(), ParseError> {
        let index = read_vuint(f);
        if index > MAX_ARG_INDEX {
            return Err(ParseError::ArgIndexOutOfRange(index));
        }
        match mode {
            Mode::Scan => self.scan_value(f)?,
            Mode::Full => {
                // A value lost to truncation leaves the slot empty.
                if let Some(value) = self.parse_value(f)? {
                    let index = index as usize;
                    if index >= call.args.len() {
                        call.args.resize(index + 1, None);
                    }
                    call.args[index] = Some(value);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// Materializes one value. `Ok(None)` means the stream ended at or
    /// inside the value.
    fn parse_value(&mut self, f: &mut dyn TraceFile) -> Result<Option<Value>, ParseError> {
        let Some(tag) = f.getc() else {
            return Ok(None);
        };
        let value = match tag {
            TYPE_NULL => Value::Null,
            TYPE_FALSE => Value::Bool(false),
            TYPE_TRUE => Value::Bool(true),
            TYPE_SINT => Value::SInt((read_vuint(f) as i64).wrapping_neg()),
            TYPE_UINT => Value::UInt(read_vuint(f)),
            TYPE_FLOAT => {
                let mut raw = [0u8; 4];
                if f.read(&mut raw) < raw.len() {
                    return Ok(None);
                }
                Value::Float(f32::from_ne_bytes(raw))
            }
            TYPE_DOUBLE => {
                let mut raw = [0u8; 8];
                if f.read(&mut raw) < raw.len() {
                    return Ok(None);
                }
                Value::Double(f64::from_ne_bytes(raw))
            }
            TYPE_STRING => Value::String(read_string(f)),
            TYPE_BLOB => {
                let size = read_vuint(f);
                Value::Blob(read_bytes(f, size))
            }
            TYPE_OPAQUE => Value::Pointer(read_vuint(f)),
            TYPE_ENUM => {
                if self.version >= 3 {
                    let sig = self.parse_enum_sig(f)?;
                    let value = read_sint(f)?;
                    Value::Enum(sig, value)
                } else {
                    let sig = self.parse_old_enum_sig(f)?;
                    let value = sig.values.first().map_or(0, |e| e.value);
                    Value::Enum(sig, value)
                }
            }
            TYPE_BITMASK => {
                let sig = self.parse_bitmask_sig(f)?;
                let value = read_vuint(f);
                Value::Bitmask(sig, value)
            }
            TYPE_ARRAY => {
                let len = read_vuint(f);
                let mut values = Vec::new();
                for _ in 0..len {
                    match self.parse_value(f)? {
                        Some(v) => values.push(v),
                        None => break,
                    }
                }
                Value::Array(values)
            }
            TYPE_STRUCT => {
                let sig = self.parse_struct_sig(f)?;
                let mut members = Vec::with_capacity(sig.member_names.len());
                for _ in 0..sig.member_names.len() {
                    members.push(self.parse_value(f)?);
                }
                Value::Struct(sig, members)
            }
            tag => return Err(ParseError::UnknownType(tag)),
        };
        Ok(Some(value))
    }

    /// Advances past one value without materializing it. Lands on exactly
    /// the same offset `parse_value` would.
    fn scan_value(&mut self, f: &mut dyn TraceFile) -> Result<(), ParseError> {
        let Some(tag) = f.getc() else {
            return Ok(());
        };
        match tag {
            TYPE_NULL | TYPE_FALSE | TYPE_TRUE => {}
            TYPE_SINT | TYPE_UINT | TYPE_OPAQUE => skip_vuint(f),
            TYPE_FLOAT => f.skip(4),
            TYPE_DOUBLE => f.skip(8),
            TYPE_STRING => skip_string(f),
            TYPE_BLOB => {
                let size = read_vuint(f);
                f.skip(size);
            }
            TYPE_ENUM => {
                // Scanning still interns the signature.
                if self.version >= 3 {
                    self.parse_enum_sig(f)?;
                    skip_sint(f);
                } else {
                    self.parse_old_enum_sig(f)?;
                }
            }
            TYPE_BITMASK => {
                self.parse_bitmask_sig(f)?;
                skip_vuint(f);
            }
            TYPE_ARRAY => {
                let len = read_vuint(f);
                for _ in 0..len {
                    let before = f.current_offset();
                    self.scan_value(f)?;
                    if f.current_offset() == before {
                        break;
                    }
                }
            }
            TYPE_STRUCT => {
                let sig = self.parse_struct_sig(f)?;
                for _ in 0..sig.member_names.len() {
                    let before = f.current_offset();
                    self.scan_value(f)?;
                    if f.current_offset() == before {
                        break;
                    }
                }
            }
            tag => return Err(ParseError::UnknownType(tag)),
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Signatures
    //
    // Each kind follows the same shape: read the ID; an empty slot means
    // the definition payload follows and is read; an occupied slot whose
    // recorded offset lies ahead of the cursor means the payload was
    // re-encountered (bookmark rewind) and is skipped; otherwise only the
    // ID was on the wire.
    // ------------------------------------------------------------------

    fn parse_function_sig(
        &mut self,
        f: &mut dyn TraceFile,
    ) -> Result<Rc<FunctionSig>, ParseError> {
        let id = read_vuint(f);
        match lookup(&mut self.functions, id)? {
            Some(sig) => {
                if f.current_offset() < sig.offset {
                    skip_string(f); // name
                    let num_args = read_vuint(f);
                    for _ in 0..num_args {
                        let before = f.current_offset();
                        skip_string(f);
                        if f.current_offset() == before {
                            break;
                        }
                    }
                }
                Ok(sig)
            }
            None => {
                let name = read_string(f);
                let num_args = read_vuint(f);
                let mut arg_names = Vec::new();
                for _ in 0..num_args {
                    let before = f.current_offset();
                    arg_names.push(read_string(f));
                    if f.current_offset() == before {
                        break;
                    }
                }
                let sig = Rc::new(FunctionSig {
                    id: id as u32,
                    flags: lookup_call_flags(&name),
                    name,
                    arg_names,
                    offset: f.current_offset(),
                });
                if sig.arg_names.is_empty() && sig.name == "glGetError" {
                    self.gl_get_error_sig = Some(sig.clone());
                }
                self.functions[id as usize] = Some(sig.clone());
                Ok(sig)
            }
        }
    }

    fn parse_struct_sig(&mut self, f: &mut dyn TraceFile) -> Result<Rc<StructSig>, ParseError> {
        let id = read_vuint(f);
        match lookup(&mut self.structs, id)? {
            Some(sig) => {
                if f.current_offset() < sig.offset {
                    skip_string(f); // name
                    let num_members = read_vuint(f);
                    for _ in 0..num_members {
                        let before = f.current_offset();
                        skip_string(f);
                        if f.current_offset() == before {
                            break;
                        }
                    }
                }
                Ok(sig)
            }
            None => {
                let name = read_string(f);
                let num_members = read_vuint(f);
                let mut member_names = Vec::new();
                for _ in 0..num_members {
                    let before = f.current_offset();
                    member_names.push(read_string(f));
                    if f.current_offset() == before {
                        break;
                    }
                }
                let sig = Rc::new(StructSig {
                    id: id as u32,
                    name,
                    member_names,
                    offset: f.current_offset(),
                });
                self.structs[id as usize] = Some(sig.clone());
                Ok(sig)
            }
        }
    }

    fn parse_enum_sig(&mut self, f: &mut dyn TraceFile) -> Result<Rc<EnumSig>, ParseError> {
        let id = read_vuint(f);
        match lookup(&mut self.enums, id)? {
            Some(sig) => {
                if f.current_offset() < sig.offset {
                    let num_values = read_vuint(f);
                    for _ in 0..num_values {
                        let before = f.current_offset();
                        skip_string(f);
                        skip_sint(f);
                        if f.current_offset() == before {
                            break;
                        }
                    }
                }
                Ok(sig)
            }
            None => {
                let num_values = read_vuint(f);
                let mut values = Vec::new();
                for _ in 0..num_values {
                    let before = f.current_offset();
                    let name = read_string(f);
                    let value = read_sint(f)?;
                    values.push(EnumValue { name, value });
                    if f.current_offset() == before {
                        break;
                    }
                }
                let sig = Rc::new(EnumSig {
                    id: id as u32,
                    values,
                    offset: f.current_offset(),
                });
                self.enums[id as usize] = Some(sig.clone());
                Ok(sig)
            }
        }
    }

    /// Enum signatures on streams older than wire version 3: a single
    /// name/value pair, with the value encoded as a tagged integer.
    fn parse_old_enum_sig(&mut self, f: &mut dyn TraceFile) -> Result<Rc<EnumSig>, ParseError> {
        let id = read_vuint(f);
        match lookup(&mut self.enums, id)? {
            Some(sig) => {
                if f.current_offset() < sig.offset {
                    skip_string(f); // name
                    skip_sint(f); // value
                }
                Ok(sig)
            }
            None => {
                let name = read_string(f);
                let value = read_sint(f)?;
                let sig = Rc::new(EnumSig {
                    id: id as u32,
                    values: vec![EnumValue { name, value }],
                    offset: f.current_offset(),
                });
                self.enums[id as usize] = Some(sig.clone());
                Ok(sig)
            }
        }
    }

    fn parse_bitmask_sig(&mut self, f: &mut dyn TraceFile) -> Result<Rc<BitmaskSig>, ParseError> {
        let id = read_vuint(f);
        match lookup(&mut self.bitmasks, id)? {
            Some(sig) => {
                if f.current_offset() < sig.offset {
                    let num_flags = read_vuint(f);
                    for _ in 0..num_flags {
                        let before = f.current_offset();
                        skip_string(f);
                        skip_vuint(f);
                        if f.current_offset() == before {
                            break;
                        }
                    }
                }
                Ok(sig)
            }
            None => {
                let num_flags = read_vuint(f);
                let mut flags = Vec::new();
                for _ in 0..num_flags {
                    let before = f.current_offset();
                    let name = read_string(f);
                    let value = read_vuint(f);
                    if value == 0 && !flags.is_empty() {
                        log::warn!("bitmask flag {name} is zero but is not the first flag");
                    }
                    flags.push(BitmaskFlag { name, value });
                    if f.current_offset() == before {
                        break;
                    }
                }
                let sig = Rc::new(BitmaskSig {
                    id: id as u32,
                    flags,
                    offset: f.current_offset(),
                });
                self.bitmasks[id as usize] = Some(sig.clone());
                Ok(sig)
            }
        }
    }
}

/// Grow-on-demand slot lookup for the signature tables.
fn lookup<T>(table: &mut Vec<Option<Rc<T>>>, id: u64) -> Result<Option<Rc<T>>, ParseError> {
    if id > MAX_SIG_ID {
        return Err(ParseError::SignatureIdOutOfRange(id));
    }
    let index = id as usize;
    if index >= table.len() {
        table.resize(index + 1, None);
    }
    Ok(table[index].clone())
}

/// Reads a tagged signed integer: `TYPE_SINT` negates the varint that
/// follows, `TYPE_UINT` keeps it positive, EOF yields 0.
fn read_sint(f: &mut dyn TraceFile) -> Result<i64, ParseError> {
    match f.getc() {
        None => Ok(0),
        Some(TYPE_SINT) => Ok((read_vuint(f) as i64).wrapping_neg()),
        Some(TYPE_UINT) => Ok(read_vuint(f) as i64),
        Some(tag) => Err(ParseError::UnexpectedType(tag)),
    }
}

fn skip_sint(f: &mut dyn TraceFile) {
    f.skip(1); // type tag
    skip_vuint(f);
}

/// Reads up to `len` bytes, stopping early at end of stream. Bounded
/// reads keep a corrupt length prefix from allocating unbounded memory.
fn read_bytes(f: &mut dyn TraceFile, len: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut remaining = len;
    let mut chunk = [0u8; 4096];
    while remaining > 0 {
        let want = chunk.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let got = f.read(&mut chunk[..want]);
        out.extend_from_slice(&chunk[..got]);
        if got < want {
            break;
        }
        remaining -= want as u64;
    }
    out
}

fn read_string(f: &mut dyn TraceFile) -> String {
    let len = read_vuint(f);
    let bytes = read_bytes(f, len);
    String::from_utf8_lossy(&bytes).into_owned()
}

fn skip_string(f: &mut dyn TraceFile) {
    let len = read_vuint(f);
    f.skip(len);
}
