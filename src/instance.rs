//! [`Instance`]: an independent codec with its own type and resource registries, plus the
//! thread-local default instance the crate's free functions operate against.

use std::any::TypeId;
use std::cell::RefCell;
use std::rc::Rc;

use crate::custom::{Codec, ProcedureHooks};
use crate::error::Result;
use crate::registry::{Resource, ResourceRegistry, TypeRegistry};
use crate::template::Template;
use crate::value::Value;

/// A codec instance: a type registry, a resource registry, and an optional procedure hook pair,
/// none of which are shared with any other instance.
///
/// Registries are mutated only by explicit `register`/`unregister` calls, never by encoding or
/// decoding. `Value`'s `Rc`-based sharing isn't `Send`/`Sync`, so instances — and the crate's
/// default instance below — are confined to the thread that creates them, matching the single-
/// threaded cooperative scheduling model this codec is built for.
#[derive(Default)]
pub struct Instance {
    types: TypeRegistry,
    resources: ResourceRegistry,
    procedure_hooks: Option<ProcedureHooks>,
}

impl Instance {
    pub fn new() -> Instance {
        Instance::default()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn procedure_hooks(&self) -> Option<&ProcedureHooks> {
        self.procedure_hooks.as_ref()
    }

    pub fn register(
        &mut self,
        type_id: TypeId,
        name: impl Into<Rc<str>>,
        codec: Option<Codec>,
        template: Option<Template>,
    ) -> Result<()> {
        self.types.register(type_id, name, codec, template)
    }

    pub fn unregister_by_name(&mut self, name: &str) -> bool {
        self.types.unregister_by_name(name)
    }

    pub fn unregister_by_type(&mut self, type_id: TypeId) -> bool {
        self.types.unregister_by_type(type_id)
    }

    pub fn register_resource(&mut self, name: impl Into<Rc<str>>, object: Resource) -> Result<()> {
        self.resources.register(name, object)
    }

    pub fn unregister_resource(&mut self, name: &str) -> bool {
        self.resources.unregister(name)
    }

    pub fn set_procedure_hooks(&mut self, hooks: Option<ProcedureHooks>) {
        self.procedure_hooks = hooks;
    }

    pub fn serialize(&self, values: &[Value]) -> Result<Vec<u8>> {
        crate::encoder::encode(self, values)
    }

    pub fn deserialize(&self, bytes: &[u8]) -> Result<Vec<Value>> {
        crate::decoder::decode(self, bytes, None)
    }

    pub fn deserialize_n(&self, bytes: &[u8], n: usize) -> Result<Vec<Value>> {
        crate::decoder::decode(self, bytes, Some(n))
    }
}

thread_local! {
    static DEFAULT: RefCell<Instance> = RefCell::new(Instance::new());
}

/// Serialize an ordered tuple of values against the thread-local default instance.
pub fn serialize(values: &[Value]) -> Result<Vec<u8>> {
    DEFAULT.with(|i| i.borrow().serialize(values))
}

/// Deserialize every value in `bytes` against the thread-local default instance.
pub fn deserialize(bytes: &[u8]) -> Result<Vec<Value>> {
    DEFAULT.with(|i| i.borrow().deserialize(bytes))
}

/// Deserialize at most `n` values from `bytes` against the thread-local default instance.
pub fn deserialize_n(bytes: &[u8], n: usize) -> Result<Vec<Value>> {
    DEFAULT.with(|i| i.borrow().deserialize_n(bytes, n))
}

pub fn register(
    type_id: TypeId,
    name: impl Into<Rc<str>>,
    codec: Option<Codec>,
    template: Option<Template>,
) -> Result<()> {
    DEFAULT.with(|i| i.borrow_mut().register(type_id, name, codec, template))
}

pub fn unregister_by_name(name: &str) -> bool {
    DEFAULT.with(|i| i.borrow_mut().unregister_by_name(name))
}

pub fn unregister_by_type(type_id: TypeId) -> bool {
    DEFAULT.with(|i| i.borrow_mut().unregister_by_type(type_id))
}

pub fn register_resource(name: impl Into<Rc<str>>, object: Resource) -> Result<()> {
    DEFAULT.with(|i| i.borrow_mut().register_resource(name, object))
}

pub fn unregister_resource(name: &str) -> bool {
    DEFAULT.with(|i| i.borrow_mut().unregister_resource(name))
}

/// An independent codec instance with empty registries and no procedure hooks.
pub fn new_instance() -> Instance {
    Instance::new()
}
