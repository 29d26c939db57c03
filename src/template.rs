//! The template engine: positional layout for a registered type's fields, as an alternative to
//! repeating key strings on every encode.
//!
//! A template only governs the *default* custom-object codec — the one used when a registered
//! type supplies no explicit `(encoder, decoder)` pair, since only that path has a well-defined,
//! reorderable field set. See `DESIGN.md` for why a fully custom codec ignores any template
//! declared alongside it.

use crate::error::{Error, Result};
use crate::number::Number;
use crate::value::{Table, Value};

/// One entry of a [`Template`]: either a plain key whose value travels positionally, or a key
/// whose value is itself expected to be a table, template-encoded recursively by a sub-template.
#[derive(Clone, Debug)]
pub enum TemplateEntry {
    Leaf(Value),
    Nested(Value, Template),
}

/// An ordered, possibly-nested field layout for a registered type.
#[derive(Clone, Debug, Default)]
pub struct Template(pub Vec<TemplateEntry>);

impl Template {
    pub fn new(entries: Vec<TemplateEntry>) -> Template {
        Template(entries)
    }
}

/// Produce the flat argument list the encoder writes for tag `209`, given the object's fields as
/// a table and an optional template.
///
/// Without a template, every field (array part treated as positions `1, 2, …`, then the map
/// part) becomes a flat `k1, v1, k2, v2, …` stream. With a template, template fields are emitted
/// positionally first (missing values as null), followed by a count and then the key/value tail
/// of whatever top-level fields the template didn't cover. A nested entry applies this same
/// encode-then-tail protocol recursively to its own sub-table (§4.6: "apply sub-template
/// recursively"), so a field of a nested object that its sub-template doesn't name still travels,
/// in that sub-object's own tail, instead of being silently dropped.
pub fn encode_object(table: &Table, template: Option<&Template>) -> Vec<Value> {
    match template {
        None => flatten_table_kv(table),
        Some(t) => {
            let mut out = Vec::new();
            encode_templated(table, t, &mut out);
            out
        }
    }
}

fn encode_templated(table: &Table, t: &Template, out: &mut Vec<Value>) {
    let mut used = Vec::new();
    for entry in &t.0 {
        encode_entry(table, entry, out);
        used.push(entry_key(entry).clone());
    }
    let tail = tail_entries(table, &used);
    out.push(Value::from(tail.len() as i64));
    for (k, v) in tail {
        out.push(k);
        out.push(v);
    }
}

/// Reconstruct the object's fields (as a [`Table`]) from the flat argument list the decoder read
/// for tag `209`. The inverse of [`encode_object`].
pub fn decode_object(args: &[Value], template: Option<&Template>) -> Result<Table> {
    match template {
        None => unflatten_table_kv(args),
        Some(t) => {
            let mut idx = 0;
            decode_templated(args, &mut idx, t)
        }
    }
}

/// Read one template's worth of leaf values plus its own tail from `args`, starting at `*idx` and
/// advancing it past everything consumed. Shared by [`decode_object`] and, recursively, by a
/// nested [`TemplateEntry`], so a sub-template's tail is read from the same position in the flat
/// stream its `encode_templated` counterpart wrote it to.
fn decode_templated(args: &[Value], idx: &mut usize, t: &Template) -> Result<Table> {
    let mut entries = Vec::new();
    for entry in &t.0 {
        decode_entry(args, idx, entry, &mut entries)?;
    }
    let tail_count = match args.get(*idx) {
        Some(Value::Number(Number::Int(n))) if *n >= 0 => *n as usize,
        _ => {
            return Err(Error::Unserializable(
                "missing or invalid template tail count".into(),
            ))
        }
    };
    *idx += 1;
    for _ in 0..tail_count {
        let k = args
            .get(*idx)
            .cloned()
            .ok_or_else(|| Error::Unserializable("template tail truncated".into()))?;
        *idx += 1;
        let v = args
            .get(*idx)
            .cloned()
            .ok_or_else(|| Error::Unserializable("template tail truncated".into()))?;
        *idx += 1;
        entries.push((k, v));
    }
    Ok(Table::new(entries))
}

fn entry_key(entry: &TemplateEntry) -> &Value {
    match entry {
        TemplateEntry::Leaf(k) => k,
        TemplateEntry::Nested(k, _) => k,
    }
}

fn encode_entry(table: &Table, entry: &TemplateEntry, out: &mut Vec<Value>) {
    match entry {
        TemplateEntry::Leaf(key) => out.push(table.get(key).cloned().unwrap_or(Value::Null)),
        TemplateEntry::Nested(key, sub) => {
            let sub_table = table.get(key).and_then(Value::as_table).cloned();
            let src = match sub_table {
                Some(rc) => rc.borrow().clone(),
                None => Table::empty(),
            };
            encode_templated(&src, sub, out);
        }
    }
}

fn decode_entry(
    args: &[Value],
    idx: &mut usize,
    entry: &TemplateEntry,
    out: &mut Vec<(Value, Value)>,
) -> Result<()> {
    match entry {
        TemplateEntry::Leaf(key) => {
            let v = args
                .get(*idx)
                .cloned()
                .ok_or_else(|| Error::Unserializable("template argument count mismatch".into()))?;
            *idx += 1;
            out.push((key.clone(), v));
            Ok(())
        }
        TemplateEntry::Nested(key, sub) => {
            let table = decode_templated(args, idx, sub)?;
            out.push((key.clone(), Value::table(table)));
            Ok(())
        }
    }
}

fn tail_entries(table: &Table, used: &[Value]) -> Vec<(Value, Value)> {
    let mut out = Vec::new();
    for (i, v) in table.array.iter().enumerate() {
        let k = Value::from((i + 1) as i64);
        if !used.contains(&k) {
            out.push((k, v.clone()));
        }
    }
    for (k, v) in &table.map {
        if !used.contains(k) {
            out.push((k.clone(), v.clone()));
        }
    }
    out
}

fn flatten_table_kv(table: &Table) -> Vec<Value> {
    let mut out = Vec::with_capacity(table.len() * 2);
    for (i, v) in table.array.iter().enumerate() {
        out.push(Value::from((i + 1) as i64));
        out.push(v.clone());
    }
    for (k, v) in &table.map {
        out.push(k.clone());
        out.push(v.clone());
    }
    out
}

fn unflatten_table_kv(args: &[Value]) -> Result<Table> {
    if args.len() % 2 != 0 {
        return Err(Error::Unserializable(
            "custom object argument list has odd length".into(),
        ));
    }
    let entries = args
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    Ok(Table::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_template_round_trip() {
        let t = Table::new(vec![
            (Value::str("a"), Value::from(1i64)),
            (Value::str("b"), Value::from(2i64)),
        ]);
        let args = encode_object(&t, None);
        let back = decode_object(&args, None).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn template_round_trip_with_tail() {
        let t = Table::new(vec![
            (Value::str("a"), Value::from(1i64)),
            (Value::str("b"), Value::from(2i64)),
            (Value::str("c"), Value::from(3i64)),
        ]);
        let template = Template::new(vec![
            TemplateEntry::Leaf(Value::str("a")),
            TemplateEntry::Leaf(Value::str("b")),
        ]);
        let args = encode_object(&t, Some(&template));
        // a, b, tail-count(1), "c", 3
        assert_eq!(args.len(), 5);
        let back = decode_object(&args, Some(&template)).unwrap();
        assert_eq!(back.get(&Value::str("a")), Some(&Value::from(1i64)));
        assert_eq!(back.get(&Value::str("b")), Some(&Value::from(2i64)));
        assert_eq!(back.get(&Value::str("c")), Some(&Value::from(3i64)));
    }

    #[test]
    fn missing_template_key_encodes_as_null() {
        let t = Table::new(vec![(Value::str("a"), Value::from(1i64))]);
        let template = Template::new(vec![
            TemplateEntry::Leaf(Value::str("a")),
            TemplateEntry::Leaf(Value::str("missing")),
        ]);
        let args = encode_object(&t, Some(&template));
        assert_eq!(args[1], Value::Null);
    }

    #[test]
    fn nested_template_round_trip() {
        let inner = Table::new(vec![(Value::str("x"), Value::from(9i64))]);
        let t = Table::new(vec![
            (Value::str("name"), Value::str("outer")),
            (Value::str("inner"), Value::table(inner)),
        ]);
        let template = Template::new(vec![
            TemplateEntry::Leaf(Value::str("name")),
            TemplateEntry::Nested(
                Value::str("inner"),
                Template::new(vec![TemplateEntry::Leaf(Value::str("x"))]),
            ),
        ]);
        let args = encode_object(&t, Some(&template));
        let back = decode_object(&args, Some(&template)).unwrap();
        let inner_back = back.get(&Value::str("inner")).unwrap().as_table().unwrap();
        assert_eq!(
            inner_back.borrow().get(&Value::str("x")),
            Some(&Value::from(9i64))
        );
    }

    #[test]
    fn nested_template_preserves_fields_the_sub_template_does_not_name() {
        // The inner object has a field ("y") that its own sub-template never mentions — it must
        // still survive the round trip, via the nested object's own tail.
        let inner = Table::new(vec![
            (Value::str("x"), Value::from(9i64)),
            (Value::str("y"), Value::from(99i64)),
        ]);
        let t = Table::new(vec![
            (Value::str("name"), Value::str("outer")),
            (Value::str("inner"), Value::table(inner)),
        ]);
        let template = Template::new(vec![
            TemplateEntry::Leaf(Value::str("name")),
            TemplateEntry::Nested(
                Value::str("inner"),
                Template::new(vec![TemplateEntry::Leaf(Value::str("x"))]),
            ),
        ]);
        let args = encode_object(&t, Some(&template));
        let back = decode_object(&args, Some(&template)).unwrap();
        let inner_back = back.get(&Value::str("inner")).unwrap().as_table().unwrap();
        let inner_back = inner_back.borrow();
        assert_eq!(inner_back.get(&Value::str("x")), Some(&Value::from(9i64)));
        assert_eq!(inner_back.get(&Value::str("y")), Some(&Value::from(99i64)));
    }
}
