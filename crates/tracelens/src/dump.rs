//! Plain-text rendering of calls and values.
//!
//! One call renders as one line:
//!
//! ```text
//! 12 glClearColor(red = 0, green = 0, blue = 0, alpha = 1) // call time = 340
//! ```
//!
//! Enum values render by symbolic name when the signature knows one,
//! bitmask values decompose into their named flags, and blobs render as
//! `blob(<size>)` rather than their contents.

use std::fmt::{self, Write};

use bitflags::bitflags;

use crate::call::Call;
use crate::sig::CallFlags;
use crate::value::Value;

bitflags! {
    /// Rendering options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DumpFlags: u32 {
        /// Suppress `name = ` prefixes on arguments.
        const NO_ARG_NAMES = 1 << 0;
    }
}

/// Streams textual renderings of calls and values into a writer.
pub struct Dumper<'a, W: Write> {
    out: &'a mut W,
    flags: DumpFlags,
}

impl<'a, W: Write> Dumper<'a, W> {
    pub fn new(out: &'a mut W, flags: DumpFlags) -> Self {
        Self { out, flags }
    }

    pub fn value(&mut self, value: &Value) -> fmt::Result {
        match value {
            Value::Null => self.out.write_str("NULL"),
            Value::Bool(true) => self.out.write_str("true"),
            Value::Bool(false) => self.out.write_str("false"),
            Value::SInt(v) => write!(self.out, "{v}"),
            Value::UInt(v) => write!(self.out, "{v}"),
            Value::Float(v) => write!(self.out, "{v}"),
            Value::Double(v) => write!(self.out, "{v}"),
            Value::String(s) => self.string(s),
            Value::Blob(data) => write!(self.out, "blob({})", data.len()),
            Value::Pointer(p) => write!(self.out, "{p:#x}"),
            Value::Enum(sig, v) => match sig.values.iter().find(|e| e.value == *v) {
                Some(entry) => self.out.write_str(&entry.name),
                None => write!(self.out, "{v}"),
            },
            Value::Bitmask(sig, v) => self.bitmask(sig, *v),
            Value::Array(values) => self.array(values),
            Value::Struct(sig, members) => {
                self.out.write_char('{')?;
                let mut sep = "";
                for (name, member) in sig.member_names.iter().zip(members.iter()) {
                    write!(self.out, "{sep}{name} = ")?;
                    match member {
                        Some(v) => self.value(v)?,
                        None => self.out.write_char('?')?,
                    }
                    sep = ", ";
                }
                self.out.write_char('}')
            }
        }
    }

    /// Renders one call as a single line (plus a blank line after
    /// end-of-frame calls).
    pub fn call(&mut self, call: &Call) -> fmt::Result {
        write!(self.out, "{} {}(", call.no, call.name())?;
        let mut sep = "";
        for (i, arg) in call.args.iter().enumerate() {
            self.out.write_str(sep)?;
            if !self.flags.contains(DumpFlags::NO_ARG_NAMES) {
                if let Some(name) = call.sig.arg_names.get(i) {
                    write!(self.out, "{name} = ")?;
                }
            }
            match arg {
                Some(v) => self.value(v)?,
                None => self.out.write_char('?')?,
            }
            sep = ", ";
        }
        self.out.write_char(')')?;

        if let Some(ret) = &call.ret {
            self.out.write_str(" = ")?;
            self.value(ret)?;
        }
        if let Some(time) = &call.call_time {
            self.out.write_str(" // call time = ")?;
            self.value(time)?;
        }
        if call.flags.contains(CallFlags::INCOMPLETE) {
            self.out.write_str(" // incomplete")?;
        }
        self.out.write_char('\n')?;
        if call.flags.contains(CallFlags::END_FRAME) {
            self.out.write_char('\n')?;
        }
        Ok(())
    }

    /// Quoted string with C-style escapes; non-printable bytes render as
    /// octal escapes.
    fn string(&mut self, s: &str) -> fmt::Result {
        self.out.write_char('"')?;
        for b in s.bytes() {
            match b {
                b'"' => self.out.write_str("\\\"")?,
                b'\\' => self.out.write_str("\\\\")?,
                b'\t' => self.out.write_char('\t')?,
                b'\r' => {} // carriage returns are dropped
                b'\n' => self.out.write_char('\n')?,
                0x20..=0x7e => self.out.write_char(b as char)?,
                _ => {
                    self.out.write_char('\\')?;
                    let (o2, o1, o0) = ((b >> 6) & 0x7, (b >> 3) & 0x7, b & 0x7);
                    if o2 != 0 {
                        write!(self.out, "{o2}")?;
                    }
                    if o2 != 0 || o1 != 0 {
                        write!(self.out, "{o1}")?;
                    }
                    write!(self.out, "{o0}")?;
                }
            }
        }
        self.out.write_char('"')
    }

    /// `FLAG_A | FLAG_B | 0x<residue>`; a zero value renders as `0x0`.
    fn bitmask(&mut self, sig: &crate::sig::BitmaskSig, value: u64) -> fmt::Result {
        let mut remaining = value;
        let mut first = true;
        for flag in &sig.flags {
            if remaining == 0 {
                break;
            }
            if flag.value != 0 && remaining & flag.value == flag.value {
                if !first {
                    self.out.write_str(" | ")?;
                }
                self.out.write_str(&flag.name)?;
                remaining &= !flag.value;
                first = false;
            }
        }
        if remaining != 0 || first {
            if !first {
                self.out.write_str(" | ")?;
            }
            write!(self.out, "{remaining:#x}")?;
        }
        Ok(())
    }

    /// Single-element arrays render as a reference to the element.
    fn array(&mut self, values: &[Value]) -> fmt::Result {
        if let [single] = values {
            self.out.write_char('&')?;
            return self.value(single);
        }
        self.out.write_char('{')?;
        let mut sep = "";
        for v in values {
            self.out.write_str(sep)?;
            self.value(v)?;
            sep = ", ";
        }
        self.out.write_char('}')
    }
}

/// Renders one call to a string.
pub fn dump_call(call: &Call, flags: DumpFlags) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = Dumper::new(&mut out, flags).call(call);
    out
}

/// Renders one value to a string.
pub fn dump_value(value: &Value) -> String {
    let mut out = String::new();
    let _ = Dumper::new(&mut out, DumpFlags::empty()).value(value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig::{BitmaskFlag, BitmaskSig, EnumSig, EnumValue, StructSig};
    use std::rc::Rc;

    fn bitmask_sig(flags: &[(&str, u64)]) -> Rc<BitmaskSig> {
        Rc::new(BitmaskSig {
            id: 0,
            flags: flags
                .iter()
                .map(|(name, value)| BitmaskFlag {
                    name: (*name).to_owned(),
                    value: *value,
                })
                .collect(),
            offset: 0,
        })
    }

    #[test]
    fn scalars() {
        assert_eq!(dump_value(&Value::Null), "NULL");
        assert_eq!(dump_value(&Value::Bool(true)), "true");
        assert_eq!(dump_value(&Value::SInt(-5)), "-5");
        assert_eq!(dump_value(&Value::Pointer(0xbeef)), "0xbeef");
        assert_eq!(dump_value(&Value::Blob(vec![0; 3])), "blob(3)");
    }

    #[test]
    fn string_escapes() {
        assert_eq!(dump_value(&Value::String("a\"b\\c".into())), "\"a\\\"b\\\\c\"");
        assert_eq!(dump_value(&Value::String("\x01".into())), "\"\\1\"");
    }

    #[test]
    fn enum_renders_symbolically() {
        let sig = Rc::new(EnumSig {
            id: 0,
            values: vec![EnumValue {
                name: "GL_TEXTURE_2D".into(),
                value: 0x0de1,
            }],
            offset: 0,
        });
        assert_eq!(dump_value(&Value::Enum(sig.clone(), 0x0de1)), "GL_TEXTURE_2D");
        assert_eq!(dump_value(&Value::Enum(sig, 7)), "7");
    }

    #[test]
    fn bitmask_decomposition() {
        let sig = bitmask_sig(&[("ZERO", 0), ("A", 1), ("B", 2)]);
        assert_eq!(dump_value(&Value::Bitmask(sig.clone(), 3)), "A | B");
        // A zero value never matches named flags, zero-valued ones included.
        assert_eq!(dump_value(&Value::Bitmask(sig.clone(), 0)), "0x0");
        assert_eq!(dump_value(&Value::Bitmask(sig.clone(), 9)), "A | 0x8");
        assert_eq!(dump_value(&Value::Bitmask(bitmask_sig(&[]), 0)), "0x0");
    }

    #[test]
    fn arrays_and_structs() {
        assert_eq!(
            dump_value(&Value::Array(vec![Value::UInt(1), Value::UInt(2)])),
            "{1, 2}"
        );
        assert_eq!(dump_value(&Value::Array(vec![Value::UInt(1)])), "&1");
        assert_eq!(dump_value(&Value::Array(vec![])), "{}");

        let sig = Rc::new(StructSig {
            id: 0,
            name: "rect".into(),
            member_names: vec!["w".into(), "h".into()],
            offset: 0,
        });
        assert_eq!(
            dump_value(&Value::Struct(sig, vec![Some(Value::UInt(4)), None])),
            "{w = 4, h = ?}"
        );
    }
}
