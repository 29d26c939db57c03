//! The dynamic value model: [`Value`] and the [`Table`] container it can hold.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::custom::CustomValue;
use crate::number::Number;

/// A table's contents, split into an **array part** (values at consecutive positive integer
/// keys starting at 1) and a **map part** (everything else).
///
/// The split is computed once, at construction time, by [`Table::new`] — not recomputed from a
/// generic sparse map on every encode. See `DESIGN.md` for why.
#[derive(Clone, Default, Debug)]
pub struct Table {
    pub array: Vec<Value>,
    pub map: Vec<(Value, Value)>,
}

impl Table {
    /// An empty table.
    pub fn empty() -> Table {
        Table {
            array: Vec::new(),
            map: Vec::new(),
        }
    }

    /// A table whose array part is exactly `items` and whose map part is empty.
    pub fn from_array(items: Vec<Value>) -> Table {
        Table {
            array: items,
            map: Vec::new(),
        }
    }

    /// Build a table from a flat, ordered list of key/value entries, splitting it into array and
    /// map parts the way the encoder would: scan positive integer keys `1, 2, 3, …` for as long
    /// as each is present with a non-null value, then put everything else — including the first
    /// gap itself, whether the gap is an explicit null or simply absent, and every key at or past
    /// it — into the map part, in their original relative order.
    ///
    /// This reproduces the reference behavior for an explicit null gap (e.g. keys `1, 2, 4`
    /// present but `3` holding null): the scan stops at `3`, and `4` lands in the map part even
    /// though it would otherwise extend the array.
    pub fn new(entries: Vec<(Value, Value)>) -> Table {
        let mut remaining = entries;
        let mut array = Vec::new();
        let mut next = 1i64;
        loop {
            let pos = remaining
                .iter()
                .position(|(k, _)| matches!(k, Value::Number(Number::Int(n)) if *n == next));
            let Some(idx) = pos else { break };
            if matches!(remaining[idx].1, Value::Null) {
                break;
            }
            let (_, v) = remaining.remove(idx);
            array.push(v);
            next += 1;
        }
        Table {
            array,
            map: remaining,
        }
    }

    pub fn len(&self) -> usize {
        self.array.len() + self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.map.is_empty()
    }

    /// Look up a value by key, checking the array part first (for integer keys within its
    /// range) and falling back to a linear scan of the map part.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        if let Value::Number(Number::Int(n)) = key {
            if *n >= 1 && (*n as usize) <= self.array.len() {
                return Some(&self.array[*n as usize - 1]);
            }
        }
        self.map.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.array == other.array && self.map == other.map
    }
}

/// A shardwire value: the dynamically typed unit the codec encodes and decodes.
///
/// `Str`, `Table`, `Custom`, and `Procedure` are the shareable kinds — they carry identity via
/// `Rc` pointer equality, not structural equality, so that two `Rc::clone`s of the same value are
/// recognized as "the same in-memory value" for back-reference purposes while two merely
/// equal-looking values are not.
///
/// `Str` holds raw bytes, not text: §3's data model defines a string as an immutable byte
/// sequence, not necessarily valid UTF-8, and the wire format describes its payload as "L raw
/// bytes". [`Value::str`] is sugar for the common case of wrapping actual text.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    Str(Rc<[u8]>),
    Table(Rc<RefCell<Table>>),
    Custom(Rc<dyn CustomValue>),
    Procedure(Rc<dyn CustomValue>),
}

impl Value {
    /// Wrap UTF-8 text as a string value.
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(Rc::from(s.into().into_bytes()))
    }

    /// Wrap an arbitrary byte sequence as a string value, valid UTF-8 or not.
    pub fn bytes(b: impl Into<Vec<u8>>) -> Value {
        Value::Str(Rc::from(b.into()))
    }

    pub fn table(t: Table) -> Value {
        Value::Table(Rc::new(RefCell::new(t)))
    }

    pub fn custom<T: CustomValue>(t: T) -> Value {
        Value::Custom(Rc::new(t))
    }

    pub fn procedure<T: CustomValue>(t: T) -> Value {
        Value::Procedure(Rc::new(t))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_table(&self) -> Option<&Rc<RefCell<Table>>> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// The string's text, or `None` if it's not a string or its bytes aren't valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => std::str::from_utf8(s).ok(),
            _ => None,
        }
    }

    /// The string's raw bytes, valid UTF-8 or not.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The identity this value would be tracked under for back-reference purposes, or `None`
    /// for the non-shareable kinds (null, bool, number).
    pub(crate) fn identity_ptr(&self) -> Option<*const ()> {
        match self {
            Value::Str(s) => Some(Rc::as_ptr(s) as *const ()),
            Value::Table(t) => Some(Rc::as_ptr(t) as *const ()),
            Value::Custom(c) => Some(Rc::as_ptr(c) as *const ()),
            Value::Procedure(p) => Some(Rc::as_ptr(p) as *const ()),
            Value::Null | Value::Bool(_) | Value::Number(_) => None,
        }
    }

    /// True if `a` and `b` are the *same* shareable value (same underlying allocation), not
    /// merely structurally equal. Non-shareable kinds are never "the same" under this relation
    /// even if equal.
    pub fn same_identity(a: &Value, b: &Value) -> bool {
        match (a.identity_ptr(), b.identity_ptr()) {
            (Some(pa), Some(pb)) => pa == pb,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n:?})"),
            Value::Str(s) => write!(f, "Str({:?})", String::from_utf8_lossy(s)),
            Value::Table(t) => write!(f, "Table(@{:p})", Rc::as_ptr(t)),
            Value::Custom(c) => write!(f, "Custom(@{:p})", Rc::as_ptr(c)),
            Value::Procedure(p) => write!(f, "Procedure(@{:p})", Rc::as_ptr(p)),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality: tables compare their contents (with a same-pointer shortcut so
    /// self-referential tables don't recurse forever), while custom objects and procedures —
    /// being host-opaque — only compare equal to the exact same allocation.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || **a == **b,
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Custom(a), Value::Custom(b)) => Rc::ptr_eq(a, b),
            (Value::Procedure(a), Value::Procedure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

macro_rules! impl_value_from_int {
    ($t:ty) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Value {
                Value::Number(Number::Int(v as i64))
            }
        }
    };
}

impl_value_from_int!(i8);
impl_value_from_int!(i16);
impl_value_from_int!(i32);
impl_value_from_int!(i64);
impl_value_from_int!(u8);
impl_value_from_int!(u16);
impl_value_from_int!(u32);

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Number(Number::Float(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::str(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::str(v)
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Value {
        Value::table(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_array_prefix_scan() {
        let t = Table::new(vec![
            (Value::from(1i64), Value::from(4i64)),
            (Value::from(2i64), Value::from(8i64)),
            (Value::from(3i64), Value::from(12i64)),
            (Value::from(4i64), Value::from(16i64)),
        ]);
        assert_eq!(t.array.len(), 4);
        assert!(t.map.is_empty());
    }

    #[test]
    fn null_gap_stops_the_scan() {
        // Keys 1, 2, 4 present, key 3 explicitly null.
        let t = Table::new(vec![
            (Value::from(1i64), Value::from(10i64)),
            (Value::from(2i64), Value::from(20i64)),
            (Value::from(3i64), Value::Null),
            (Value::from(4i64), Value::from(40i64)),
        ]);
        assert_eq!(t.array.len(), 2);
        assert_eq!(t.map.len(), 2);
    }

    #[test]
    fn absent_gap_behaves_like_null_gap() {
        let t = Table::new(vec![
            (Value::from(1i64), Value::from(10i64)),
            (Value::from(2i64), Value::from(20i64)),
            (Value::from(4i64), Value::from(40i64)),
        ]);
        assert_eq!(t.array.len(), 2);
        assert_eq!(t.map.len(), 1);
    }

    #[test]
    fn same_identity_requires_shared_allocation() {
        let a = Value::str("hi");
        let b = Value::str("hi");
        assert_eq!(a, b, "structurally equal");
        assert!(!Value::same_identity(&a, &b), "but distinct allocations");
        let c = a.clone();
        assert!(Value::same_identity(&a, &c));
    }

    #[test]
    fn string_holds_raw_bytes_not_necessarily_utf8() {
        let invalid_utf8 = vec![0xff, 0x00, 0xfe, b'a'];
        let v = Value::bytes(invalid_utf8.clone());
        assert_eq!(v.as_bytes(), Some(invalid_utf8.as_slice()));
        assert_eq!(v.as_str(), None);
    }

    #[test]
    fn self_referential_table_equality_terminates() {
        let t = Value::table(Table::empty());
        if let Value::Table(rc) = &t {
            rc.borrow_mut().map.push((Value::str("cycle"), t.clone()));
        }
        assert_eq!(t, t.clone());
    }
}
