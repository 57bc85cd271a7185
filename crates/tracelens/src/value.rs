//! The recursive value model.
//!
//! Every argument, return value, and struct member decoded from the wire
//! is a [`Value`]: a tagged tree. Enum, bitmask, and struct nodes borrow
//! their interned signatures via `Rc`, so values stay cheap to clone and
//! signatures are shared across every call that references them.

use std::rc::Rc;

use crate::sig::{BitmaskSig, EnumSig, StructSig};

/// A decoded wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    SInt(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    /// Wire strings are length-prefixed byte runs; they are decoded
    /// lossily to UTF-8 and stored without a terminator.
    String(String),
    Blob(Vec<u8>),
    /// An opaque pointer captured from the recorded process.
    Pointer(u64),
    Enum(Rc<EnumSig>, i64),
    Bitmask(Rc<BitmaskSig>, u64),
    Array(Vec<Value>),
    /// Struct members are ordered per the signature; a `None` slot marks a
    /// member lost to truncation.
    Struct(Rc<StructSig>, Vec<Option<Value>>),
}

impl Value {
    /// Coerces to a signed integer where the value has one.
    pub fn to_sint(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::SInt(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Enum(_, v) => Some(*v),
            Value::Bitmask(_, v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Coerces to an unsigned integer where the value has one.
    pub fn to_uint(&self) -> Option<u64> {
        match self {
            Value::Bool(b) => Some(u64::from(*b)),
            Value::SInt(v) => u64::try_from(*v).ok(),
            Value::UInt(v) => Some(*v),
            Value::Enum(_, v) => u64::try_from(*v).ok(),
            Value::Bitmask(_, v) => Some(*v),
            Value::Pointer(v) => Some(*v),
            _ => None,
        }
    }

    /// Converts to a `serde_json::Value` for downstream tooling.
    ///
    /// Blobs render as `{"blob": <size>}`, pointers as hex strings, enums
    /// as their symbolic name when the signature knows one, bitmasks as
    /// their raw number, and structs as objects keyed by member name.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::SInt(v) => Json::from(*v),
            Value::UInt(v) => Json::from(*v),
            Value::Float(f) => Json::from(f64::from(*f)),
            Value::Double(f) => Json::from(*f),
            Value::String(s) => Json::String(s.clone()),
            Value::Blob(data) => serde_json::json!({ "blob": data.len() }),
            Value::Pointer(p) => Json::String(format!("{p:#x}")),
            Value::Enum(sig, v) => match sig.values.iter().find(|e| e.value == *v) {
                Some(entry) => Json::String(entry.name.clone()),
                None => Json::from(*v),
            },
            Value::Bitmask(_, v) => Json::from(*v),
            Value::Array(values) => Json::Array(values.iter().map(Value::to_json).collect()),
            Value::Struct(sig, members) => {
                let fields = sig
                    .member_names
                    .iter()
                    .zip(members.iter())
                    .map(|(name, member)| {
                        let v = member.as_ref().map_or(Json::Null, Value::to_json);
                        (name.clone(), v)
                    })
                    .collect();
                Json::Object(fields)
            }
        }
    }
}
