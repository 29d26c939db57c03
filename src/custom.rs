//! Host-opaque objects: the [`CustomValue`] trait that type-erases a registered Rust type behind
//! `Rc<dyn CustomValue>`, plus the default representation used for a type with no custom codec.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::value::{Table, Value};

/// A value a registered type can hide behind. Blanket-implemented for every `'static + Debug`
/// type, so any concrete type can be wrapped in [`Value::custom`] or [`Value::procedure`]
/// without an explicit `impl`.
///
/// Custom objects still compare by pointer identity, not by this `Debug` output (see [`Value`]'s
/// `PartialEq` impl) — the bound is here only so `Rc<dyn CustomValue>` itself can be printed.
pub trait CustomValue: Any {
    fn as_any(&self) -> &dyn Any;
    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T: Any + fmt::Debug> CustomValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Debug for dyn CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_debug(f)
    }
}

/// Attempt to downcast a custom value back to its concrete host type.
pub fn downcast_ref<T: Any>(v: &dyn CustomValue) -> Option<&T> {
    v.as_any().downcast_ref::<T>()
}

/// The representation used for a registered type that has no custom `(encoder, decoder)` pair:
/// its fields travel as an ordinary table, tagged with the type name so the decoder knows which
/// registry entry to hand it back to.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedTable {
    pub type_name: Rc<str>,
    pub table: Table,
}

impl TypedTable {
    pub fn new(type_name: impl Into<Rc<str>>, table: Table) -> TypedTable {
        TypedTable {
            type_name: type_name.into(),
            table,
        }
    }
}

/// The pair of hooks a registered custom type can install to take over its own wire
/// representation: a `dump` that turns an instance into an argument [`Value`] list, and a `load`
/// that turns such a list back into an instance.
pub struct Codec {
    pub dump: Box<dyn Fn(&dyn CustomValue) -> Vec<Value>>,
    pub load: Box<dyn Fn(&[Value]) -> Result<Rc<dyn CustomValue>, crate::error::Error>>,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

/// The single, instance-wide hook pair that lets opaque procedures be encoded/decoded at all.
/// Unlike [`Codec`], this isn't per-type: §1 treats procedure dump/load as one host collaborator,
/// not a family of named types, so there is exactly one optional pair per [`Instance`].
///
/// [`Instance`]: crate::instance::Instance
pub struct ProcedureHooks {
    pub dump: Box<dyn Fn(&dyn CustomValue) -> Vec<u8>>,
    pub load: Box<dyn Fn(&[u8]) -> Result<Rc<dyn CustomValue>, crate::error::Error>>,
}

impl std::fmt::Debug for ProcedureHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureHooks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn downcast_round_trip() {
        let v = Value::custom(Point { x: 1, y: 2 });
        if let Value::Custom(rc) = &v {
            let p = downcast_ref::<Point>(rc.as_ref()).unwrap();
            assert_eq!(p, &Point { x: 1, y: 2 });
        } else {
            panic!("expected Custom");
        }
    }
}
