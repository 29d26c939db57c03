//! A binary serializer for a dynamically typed value model: nested containers, shared
//! substructure, cycles, user-registered typed objects, and opaque external resources.
//!
//! An ordered tuple of [`Value`]s is turned into a self-describing byte string by [`serialize`],
//! and recovered losslessly — including shared references becoming shared again — by
//! [`deserialize`]. Every tag byte and its wire layout are documented on [`tag`]; the numeric
//! micro-encoding lives in [`number`].
//!
//! ```
//! let bytes = shardwire::serialize(&[shardwire::Value::from(45i64)]).unwrap();
//! let back = shardwire::deserialize(&bytes).unwrap();
//! assert_eq!(back[0], shardwire::Value::from(45i64));
//! ```
//!
//! Most programs only need the free functions ([`serialize`], [`deserialize`],
//! [`deserialize_n`], [`register`], [`register_resource`]), which operate against a thread-local
//! default [`Instance`]. Programs that need more than one independent set of registered types
//! should call [`new_instance`] and use the methods on the returned [`Instance`] directly.

mod custom;
mod encoder;
mod decoder;
mod error;
mod instance;
mod number;
mod registry;
mod tag;
mod template;
mod value;

pub use crate::custom::{Codec, CustomValue, ProcedureHooks, TypedTable};
pub use crate::error::{Error, Result};
pub use crate::instance::{
    deserialize, deserialize_n, new_instance, register, register_resource, serialize,
    unregister_by_name, unregister_by_type, unregister_resource, Instance,
};
pub use crate::number::Number;
pub use crate::registry::Resource;
pub use crate::template::{Template, TemplateEntry};
pub use crate::value::{Table, Value};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_functions_round_trip_a_shared_string() {
        let s = Value::str("shared");
        let t = Table::from_array(vec![s.clone(), s.clone()]);
        let bytes = serialize(&[s, Value::table(t)]).unwrap();
        let out = deserialize(&bytes).unwrap();
        let table = out[1].as_table().unwrap().borrow();
        assert!(Value::same_identity(&table.array[0], &out[0]));
        assert!(Value::same_identity(&table.array[1], &out[0]));
    }

    #[test]
    fn concatenated_serializations_decode_as_one_tuple() {
        let a = serialize(&[Value::from(1i64), Value::str("a")]).unwrap();
        let b = serialize(&[Value::from(2i64), Value::str("b")]).unwrap();
        let mut both = a.clone();
        both.extend_from_slice(&b);

        let combined = deserialize(&both).unwrap();
        let separate: Vec<Value> = deserialize(&a)
            .unwrap()
            .into_iter()
            .chain(deserialize(&b).unwrap())
            .collect();
        assert_eq!(combined, separate);
    }

    #[test]
    fn new_instance_is_independent_of_the_default() {
        let scoped = new_instance();
        let bytes = scoped.serialize(&[Value::from(3i64)]).unwrap();
        assert_eq!(scoped.deserialize(&bytes).unwrap(), vec![Value::from(3i64)]);
    }
}
