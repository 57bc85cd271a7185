//! Shared wire-image builder for parser tests.

use tracelens::constants::{
    CALL_ARG, CALL_END, CALL_RET, EVENT_ENTER, EVENT_LEAVE, TYPE_ARRAY, TYPE_BITMASK, TYPE_BLOB,
    TYPE_DOUBLE, TYPE_ENUM, TYPE_FALSE, TYPE_FLOAT, TYPE_NULL, TYPE_OPAQUE, TYPE_SINT,
    TYPE_STRING, TYPE_STRUCT, TYPE_TRUE, TYPE_UINT,
};
use tracelens_buffers::Writer;

/// Builds capture byte streams the way the recorder would emit them.
///
/// Signature-defining methods (`*_def`) write the full payload;
/// `*_ref` methods write only the ID, as the recorder does after the
/// first occurrence.
pub struct TraceBuilder {
    w: Writer,
    version: u32,
}

#[allow(dead_code)] // not every test file uses every value kind
impl TraceBuilder {
    pub fn new(version: u32) -> Self {
        let mut w = Writer::new();
        w.vuint(u64::from(version));
        Self { w, version }
    }

    /// Bytes written so far; the next event would start here.
    pub fn offset(&self) -> u64 {
        self.w.len() as u64
    }

    pub fn finish(self) -> Vec<u8> {
        self.w.flush()
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.w.bytes(bytes);
        self
    }

    // -- events ---------------------------------------------------------

    pub fn enter(&mut self, thread_id: u32) -> &mut Self {
        self.w.u8(EVENT_ENTER);
        if self.version >= 4 {
            self.w.vuint(u64::from(thread_id));
        }
        self
    }

    pub fn leave(&mut self, call_time: u64, call_no: u64) -> &mut Self {
        self.w.u8(EVENT_LEAVE);
        self.w.vuint(call_time);
        self.w.vuint(call_no);
        self
    }

    // -- call details ---------------------------------------------------

    pub fn end(&mut self) -> &mut Self {
        self.w.u8(CALL_END);
        self
    }

    pub fn arg(&mut self, index: u64) -> &mut Self {
        self.w.u8(CALL_ARG);
        self.w.vuint(index);
        self
    }

    pub fn ret(&mut self) -> &mut Self {
        self.w.u8(CALL_RET);
        self
    }

    // -- function signatures -------------------------------------------

    pub fn func_def(&mut self, id: u64, name: &str, arg_names: &[&str]) -> &mut Self {
        self.w.vuint(id);
        self.w.string(name);
        self.w.vuint(arg_names.len() as u64);
        for a in arg_names {
            self.w.string(a);
        }
        self
    }

    pub fn func_ref(&mut self, id: u64) -> &mut Self {
        self.w.vuint(id);
        self
    }

    // -- values ---------------------------------------------------------

    pub fn v_null(&mut self) -> &mut Self {
        self.w.u8(TYPE_NULL);
        self
    }

    pub fn v_bool(&mut self, value: bool) -> &mut Self {
        self.w.u8(if value { TYPE_TRUE } else { TYPE_FALSE });
        self
    }

    /// A signed integer the way the recorder writes one: sign in the tag,
    /// magnitude in the varint.
    pub fn v_sint(&mut self, value: i64) -> &mut Self {
        self.sint_body(value);
        self
    }

    /// A non-negative value forced onto the `TYPE_SINT` encoding
    /// (`-varint`); only `0` survives the negation unchanged.
    pub fn v_sint_tagged(&mut self, magnitude: u64) -> &mut Self {
        self.w.u8(TYPE_SINT);
        self.w.vuint(magnitude);
        self
    }

    pub fn v_uint(&mut self, value: u64) -> &mut Self {
        self.w.u8(TYPE_UINT);
        self.w.vuint(value);
        self
    }

    pub fn v_float(&mut self, value: f32) -> &mut Self {
        self.w.u8(TYPE_FLOAT);
        self.w.f32(value);
        self
    }

    pub fn v_double(&mut self, value: f64) -> &mut Self {
        self.w.u8(TYPE_DOUBLE);
        self.w.f64(value);
        self
    }

    pub fn v_string(&mut self, s: &str) -> &mut Self {
        self.w.u8(TYPE_STRING);
        self.w.string(s);
        self
    }

    pub fn v_blob(&mut self, data: &[u8]) -> &mut Self {
        self.w.u8(TYPE_BLOB);
        self.w.lp_bytes(data);
        self
    }

    pub fn v_opaque(&mut self, addr: u64) -> &mut Self {
        self.w.u8(TYPE_OPAQUE);
        self.w.vuint(addr);
        self
    }

    /// Array header; follow with exactly `len` value calls.
    pub fn v_array(&mut self, len: u64) -> &mut Self {
        self.w.u8(TYPE_ARRAY);
        self.w.vuint(len);
        self
    }

    /// Struct value with a first-time signature definition; follow with
    /// one value per member.
    pub fn v_struct_def(&mut self, id: u64, name: &str, members: &[&str]) -> &mut Self {
        self.w.u8(TYPE_STRUCT);
        self.w.vuint(id);
        self.w.string(name);
        self.w.vuint(members.len() as u64);
        for m in members {
            self.w.string(m);
        }
        self
    }

    pub fn v_struct_ref(&mut self, id: u64) -> &mut Self {
        self.w.u8(TYPE_STRUCT);
        self.w.vuint(id);
        self
    }

    fn sint_body(&mut self, value: i64) {
        if value < 0 {
            self.w.u8(TYPE_SINT);
            self.w.vuint(value.unsigned_abs());
        } else {
            self.w.u8(TYPE_UINT);
            self.w.vuint(value as u64);
        }
    }

    /// Enum value with a first-time signature definition (wire version 3+).
    pub fn v_enum_def(&mut self, id: u64, entries: &[(&str, i64)], value: i64) -> &mut Self {
        self.w.u8(TYPE_ENUM);
        self.w.vuint(id);
        self.w.vuint(entries.len() as u64);
        for (name, v) in entries {
            self.w.string(name);
            self.sint_body(*v);
        }
        self.sint_body(value);
        self
    }

    /// Enum value referencing an interned signature (wire version 3+).
    pub fn v_enum_ref(&mut self, id: u64, value: i64) -> &mut Self {
        self.w.u8(TYPE_ENUM);
        self.w.vuint(id);
        self.sint_body(value);
        self
    }

    /// Legacy enum (wire version <3): the signature holds the one value.
    pub fn v_enum_legacy_def(&mut self, id: u64, name: &str, value: i64) -> &mut Self {
        self.w.u8(TYPE_ENUM);
        self.w.vuint(id);
        self.w.string(name);
        self.sint_body(value);
        self
    }

    pub fn v_enum_legacy_ref(&mut self, id: u64) -> &mut Self {
        self.w.u8(TYPE_ENUM);
        self.w.vuint(id);
        self
    }

    /// Bitmask value with a first-time signature definition.
    pub fn v_bitmask_def(&mut self, id: u64, flags: &[(&str, u64)], value: u64) -> &mut Self {
        self.w.u8(TYPE_BITMASK);
        self.w.vuint(id);
        self.w.vuint(flags.len() as u64);
        for (name, v) in flags {
            self.w.string(name);
            self.w.vuint(*v);
        }
        self.w.vuint(value);
        self
    }

    pub fn v_bitmask_ref(&mut self, id: u64, value: u64) -> &mut Self {
        self.w.u8(TYPE_BITMASK);
        self.w.vuint(id);
        self.w.vuint(value);
        self
    }
}
