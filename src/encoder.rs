//! The tree-walking encoder: assigns identity indices to shareable values as they're first seen
//! and emits the tagged byte stream described by `§4.1`.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::custom::{downcast_ref, CustomValue, TypedTable};
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::number::Number;
use crate::tag;
use crate::template;
use crate::value::Value;

struct EncodeState {
    /// Pointer identity of an already-emitted shareable value to its 1-based back-reference
    /// index.
    visited: HashMap<*const (), i64>,
    /// Custom objects currently mid-encode, to catch a constructor argument graph that loops
    /// back to the object it's building.
    in_progress: HashSet<*const ()>,
    next_index: i64,
    buf: Vec<u8>,
}

impl EncodeState {
    fn new() -> EncodeState {
        EncodeState {
            visited: HashMap::new(),
            in_progress: HashSet::new(),
            next_index: 1,
            buf: Vec::new(),
        }
    }

    fn assign_index(&mut self, ptr: *const ()) {
        self.visited.insert(ptr, self.next_index);
        self.next_index += 1;
    }

    fn emit_backref(&mut self, idx: i64) {
        self.buf.push(tag::TAG_BACKREF);
        Number::Int(idx).encode(&mut self.buf);
    }
}

/// Encode an ordered tuple of values into a byte string.
pub fn encode(instance: &Instance, values: &[Value]) -> Result<Vec<u8>> {
    let mut state = EncodeState::new();
    for v in values {
        encode_value(instance, &mut state, v)?;
    }
    Ok(state.buf)
}

fn encode_value(instance: &Instance, state: &mut EncodeState, v: &Value) -> Result<()> {
    match v {
        Value::Null => {
            state.buf.push(tag::TAG_NULL);
            Ok(())
        }
        Value::Bool(true) => {
            state.buf.push(tag::TAG_TRUE);
            Ok(())
        }
        Value::Bool(false) => {
            state.buf.push(tag::TAG_FALSE);
            Ok(())
        }
        Value::Number(n) => {
            n.encode(&mut state.buf);
            Ok(())
        }
        Value::Str(s) => {
            let ptr = Rc::as_ptr(s) as *const ();
            if let Some(&idx) = state.visited.get(&ptr) {
                state.emit_backref(idx);
                return Ok(());
            }
            if let Some(name) = instance.resources().name_for_identity(ptr) {
                return emit_resource(instance, state, name);
            }
            state.assign_index(ptr);
            state.buf.push(tag::TAG_STRING);
            Number::Int(s.len() as i64).encode(&mut state.buf);
            state.buf.extend_from_slice(s);
            Ok(())
        }
        Value::Table(_) | Value::Custom(_) | Value::Procedure(_) => {
            encode_shareable_container(instance, state, v)
        }
    }
}

fn emit_resource(instance: &Instance, state: &mut EncodeState, name: Rc<str>) -> Result<()> {
    state.buf.push(tag::TAG_RESOURCE);
    encode_value(instance, state, &Value::str(name.as_ref()))
}

fn encode_shareable_container(instance: &Instance, state: &mut EncodeState, v: &Value) -> Result<()> {
    let ptr = v.identity_ptr().expect("shareable container always has identity");
    if let Some(&idx) = state.visited.get(&ptr) {
        state.emit_backref(idx);
        return Ok(());
    }
    if state.in_progress.contains(&ptr) {
        return Err(Error::InfiniteConstructor(format!(
            "custom object's own constructor graph refers back to {v:?}"
        )));
    }
    if let Some(name) = instance.resources().name_for_identity(ptr) {
        return emit_resource(instance, state, name);
    }
    match v {
        Value::Custom(rc) => encode_custom(instance, state, ptr, rc),
        Value::Procedure(rc) => encode_procedure(instance, state, ptr, rc),
        Value::Table(rc) => {
            state.assign_index(ptr);
            state.buf.push(tag::TAG_TABLE);
            let table = rc.borrow();
            Number::Int(table.array.len() as i64).encode(&mut state.buf);
            for v in &table.array {
                encode_value(instance, state, v)?;
            }
            Number::Int(table.map.len() as i64).encode(&mut state.buf);
            for (k, v) in &table.map {
                encode_value(instance, state, k)?;
                encode_value(instance, state, v)?;
            }
            Ok(())
        }
        _ => unreachable!("only Table, Custom, Procedure reach here"),
    }
}

fn encode_custom(
    instance: &Instance,
    state: &mut EncodeState,
    ptr: *const (),
    rc: &Rc<dyn CustomValue>,
) -> Result<()> {
    let type_id = rc.as_any().type_id();
    let entry = instance
        .types()
        .by_type(type_id)
        .ok_or_else(|| Error::Unserializable(format!("type {type_id:?} is not registered")))?;
    state.in_progress.insert(ptr);
    state.buf.push(tag::TAG_CUSTOM);
    let name = entry.name.clone();
    let template = entry.template.clone();
    let args = if let Some(codec) = &entry.codec {
        (codec.dump)(rc.as_ref())
    } else {
        let typed = downcast_ref::<TypedTable>(rc.as_ref()).ok_or_else(|| {
            Error::Unserializable(format!(
                "{name} has no custom codec and is not a TypedTable"
            ))
        })?;
        template::encode_object(&typed.table, template.as_ref())
    };
    encode_value(instance, state, &Value::str(name.as_ref()))?;
    Number::Int(args.len() as i64).encode(&mut state.buf);
    for a in &args {
        encode_value(instance, state, a)?;
    }
    state.in_progress.remove(&ptr);
    state.assign_index(ptr);
    Ok(())
}

fn encode_procedure(
    instance: &Instance,
    state: &mut EncodeState,
    ptr: *const (),
    rc: &Rc<dyn CustomValue>,
) -> Result<()> {
    let hooks = instance
        .procedure_hooks()
        .ok_or_else(|| Error::Unserializable("no dump hook installed for procedures".into()))?;
    let body = (hooks.dump)(rc.as_ref());
    state.buf.push(tag::TAG_PROCEDURE);
    Number::Int(body.len() as i64).encode(&mut state.buf);
    state.buf.extend_from_slice(&body);
    state.assign_index(ptr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Table;

    #[test]
    fn inline_values_need_no_identity() {
        let instance = Instance::new();
        let out = encode(&instance, &[Value::Null, Value::Bool(true), Value::from(5i64)]).unwrap();
        assert_eq!(out, vec![tag::TAG_NULL, tag::TAG_TRUE, 106]);
    }

    #[test]
    fn repeated_string_back_references() {
        let instance = Instance::new();
        let s = Value::str("next");
        let t = Value::table(Table::from_array(vec![s.clone(), s.clone(), s.clone()]));
        let out = encode(&instance, &[s.clone(), t]).unwrap();
        // First string: tag + len(4, inline) + 4 bytes = 6 bytes.
        assert_eq!(&out[0..6], &[tag::TAG_STRING, 105, b'n', b'e', b'x', b't']);
        // Each subsequent occurrence is a 2-byte back-reference to index 1.
        let backref_count = out.windows(2).filter(|w| w == &[tag::TAG_BACKREF, 102]).count();
        assert_eq!(backref_count, 3);
    }

    #[test]
    fn self_referential_table_encodes_without_looping() {
        let instance = Instance::new();
        let t = Value::table(Table::empty());
        if let Value::Table(rc) = &t {
            rc.borrow_mut().map.push((Value::str("cycle"), t.clone()));
        }
        let out = encode(&instance, std::slice::from_ref(&t)).unwrap();
        assert!(!out.is_empty());
    }
}
