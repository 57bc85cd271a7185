//! Streaming parser for binary API-call capture streams.
//!
//! A capture records a process's API function invocations as a stream of
//! ENTER/LEAVE events with lazily-defined, integer-interned signatures.
//! [`Parser`] reconstructs them into [`Call`] records: function name,
//! thread, ordered arguments, optional return value, and timing.
//!
//! ```no_run
//! use tracelens::dump::{dump_call, DumpFlags};
//! use tracelens::{Mode, Parser};
//!
//! let mut parser = Parser::new();
//! parser.open("app.trace")?;
//! while let Some(call) = parser.parse_call(Mode::Full)? {
//!     print!("{}", dump_call(&call, DumpFlags::empty()));
//! }
//! # Ok::<(), tracelens::ParseError>(())
//! ```

pub mod constants;
pub mod dump;

mod call;
mod error;
mod parser;
mod sig;
mod value;

pub use call::Call;
pub use error::ParseError;
pub use parser::{Bookmark, Mode, Parser};
pub use sig::{
    lookup_call_flags, BitmaskFlag, BitmaskSig, CallFlags, EnumSig, EnumValue, FunctionSig,
    StructSig,
};
pub use value::Value;
