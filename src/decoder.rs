//! The byte-cursor driven recursive-descent decoder: the inverse of [`crate::encoder`].
//!
//! Every read is bounds-checked before it happens and every decoded length is checked against
//! the bytes actually remaining before it's used to size an allocation — arbitrary input can
//! only ever produce a value tuple or one of [`Error`]'s variants, never a panic or an
//! out-of-bounds read.

use crate::custom::TypedTable;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::number::Number;
use crate::tag::{self, Tag};
use crate::template;
use crate::value::{Table, Value};

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Cursor<'a> {
        Cursor { buf, pos: 0 }
    }

    fn has_more(&self) -> bool {
        self.pos < self.buf.len()
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn remaining_slice(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn read_u8(&mut self) -> Result<u8> {
        if self.pos >= self.buf.len() {
            return Err(Error::TruncatedInput {
                offset: self.pos,
                needed: 1,
                remaining: 0,
            });
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::TruncatedInput {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }
}

struct DecodeState {
    identity: Vec<Value>,
}

/// Decode as many values as the buffer holds (or until `max` values have been produced, if
/// given) from `bytes`.
pub fn decode(instance: &Instance, bytes: &[u8], max: Option<usize>) -> Result<Vec<Value>> {
    let mut cursor = Cursor::new(bytes);
    let mut state = DecodeState {
        identity: Vec::new(),
    };
    let mut out = Vec::new();
    while cursor.has_more() {
        if let Some(m) = max {
            if out.len() >= m {
                break;
            }
        }
        out.push(decode_value(instance, &mut state, &mut cursor)?);
    }
    Ok(out)
}

fn decode_value(instance: &Instance, state: &mut DecodeState, cursor: &mut Cursor) -> Result<Value> {
    let offset = cursor.pos;
    let byte = cursor.read_u8()?;
    let tag = Tag::from_u8(byte).ok_or(Error::BadTag { offset, tag: byte })?;
    match tag {
        Tag::InlineInt(v) => Ok(Value::Number(Number::Int(v))),
        Tag::Null => Ok(Value::Null),
        Tag::True => Ok(Value::Bool(true)),
        Tag::False => Ok(Value::Bool(false)),
        Tag::Float => {
            let mut slice = cursor.remaining_slice();
            let n = Number::decode_float_body(&mut slice, offset)?;
            let consumed = cursor.remaining() - slice.len();
            cursor.advance(consumed);
            Ok(Value::Number(n))
        }
        Tag::BigInt => {
            let mut slice = cursor.remaining_slice();
            let n = Number::decode_bigint_body(&mut slice, offset)?;
            let consumed = cursor.remaining() - slice.len();
            cursor.advance(consumed);
            Ok(Value::Number(n))
        }
        Tag::String => decode_string(instance, state, cursor, offset),
        Tag::Table => decode_table(instance, state, cursor),
        Tag::BackRef => decode_backref(instance, state, cursor, offset),
        Tag::Custom => decode_custom(instance, state, cursor, offset),
        Tag::Procedure => decode_procedure(instance, state, cursor, offset),
        Tag::Resource => decode_resource(instance, state, cursor, offset),
    }
}

/// Decode a nested value-encoded non-negative count, bounds-checked against the bytes still
/// remaining so a malicious oversized count cannot drive an unbounded allocation.
fn decode_count(instance: &Instance, state: &mut DecodeState, cursor: &mut Cursor) -> Result<usize> {
    let offset = cursor.pos;
    let v = decode_value(instance, state, cursor)?;
    match v {
        Value::Number(Number::Int(n)) if n >= 0 && (n as usize) <= cursor.remaining() => {
            Ok(n as usize)
        }
        Value::Number(Number::Int(n)) => Err(Error::BadLength { offset, len: n }),
        _ => Err(Error::BadLength { offset, len: -1 }),
    }
}

fn decode_string(
    instance: &Instance,
    state: &mut DecodeState,
    cursor: &mut Cursor,
    _offset: usize,
) -> Result<Value> {
    let len = decode_count(instance, state, cursor)?;
    let bytes = cursor.read_bytes(len)?;
    // Preserved exactly, valid UTF-8 or not: §3 defines a string as raw bytes, not text.
    let value = Value::bytes(bytes.to_vec());
    state.identity.push(value.clone());
    Ok(value)
}

fn decode_table(instance: &Instance, state: &mut DecodeState, cursor: &mut Cursor) -> Result<Value> {
    let value = Value::table(Table::empty());
    // Installed before its contents are decoded, so a back-reference inside the table (a cycle)
    // resolves to this same value.
    state.identity.push(value.clone());

    let array_len = decode_count(instance, state, cursor)?;
    let mut array = Vec::with_capacity(array_len);
    for _ in 0..array_len {
        array.push(decode_value(instance, state, cursor)?);
    }
    let map_len = decode_count(instance, state, cursor)?;
    let mut map = Vec::with_capacity(map_len);
    for _ in 0..map_len {
        let k = decode_value(instance, state, cursor)?;
        let v = decode_value(instance, state, cursor)?;
        map.push((k, v));
    }
    if let Value::Table(rc) = &value {
        *rc.borrow_mut() = Table { array, map };
    }
    Ok(value)
}

fn decode_backref(
    instance: &Instance,
    state: &mut DecodeState,
    cursor: &mut Cursor,
    offset: usize,
) -> Result<Value> {
    let idx_val = decode_value(instance, state, cursor)?;
    let idx = match idx_val {
        Value::Number(Number::Int(n)) => n,
        _ => {
            return Err(Error::BadReference {
                offset,
                index: -1,
                table_len: state.identity.len(),
            })
        }
    };
    if idx < 1 || idx as usize > state.identity.len() {
        return Err(Error::BadReference {
            offset,
            index: idx,
            table_len: state.identity.len(),
        });
    }
    Ok(state.identity[idx as usize - 1].clone())
}

fn decode_custom(
    instance: &Instance,
    state: &mut DecodeState,
    cursor: &mut Cursor,
    offset: usize,
) -> Result<Value> {
    let name_val = decode_value(instance, state, cursor)?;
    let name = name_val
        .as_str()
        .ok_or_else(|| Error::UnknownRegistration("custom object type name is not a string".into()))?
        .to_string();
    let k = decode_count(instance, state, cursor)?;
    let mut args = Vec::with_capacity(k);
    for _ in 0..k {
        args.push(decode_value(instance, state, cursor)?);
    }
    let entry = instance
        .types()
        .by_name(&name)
        .ok_or_else(|| Error::UnknownRegistration(name.clone()))?;
    let value = if let Some(codec) = &entry.codec {
        Value::Custom((codec.load)(&args)?)
    } else {
        let table = template::decode_object(&args, entry.template.as_ref())?;
        Value::custom(TypedTable::new(entry.name.clone(), table))
    };
    let _ = offset;
    state.identity.push(value.clone());
    Ok(value)
}

fn decode_procedure(
    instance: &Instance,
    state: &mut DecodeState,
    cursor: &mut Cursor,
    _offset: usize,
) -> Result<Value> {
    let len = decode_count(instance, state, cursor)?;
    let bytes = cursor.read_bytes(len)?;
    let hooks = instance
        .procedure_hooks()
        .ok_or_else(|| Error::UnknownRegistration("no load hook installed for procedures".into()))?;
    let rc = (hooks.load)(bytes)?;
    let value = Value::Procedure(rc);
    state.identity.push(value.clone());
    Ok(value)
}

fn decode_resource(
    instance: &Instance,
    state: &mut DecodeState,
    cursor: &mut Cursor,
    _offset: usize,
) -> Result<Value> {
    let name_val = decode_value(instance, state, cursor)?;
    let name = name_val
        .as_str()
        .ok_or_else(|| Error::UnknownRegistration("resource name is not a string".into()))?;
    let resource = instance
        .resources()
        .by_name(name)
        .ok_or_else(|| Error::UnknownRegistration(name.to_string()))?;
    Ok(resource.clone().into())
}
