//! The type and resource registries: the bidirectional name/identity mappings an [`Instance`]
//! consults while encoding and decoding custom objects and resource references.
//!
//! [`Instance`]: crate::instance::Instance

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::custom::{Codec, CustomValue};
use crate::error::{Error, Result};
use crate::template::Template;
use crate::value::{Table, Value};

/// One registered type: its stable name, its host type identity, and the optional codec/template
/// pair that control how instances of it travel on the wire.
pub struct TypeEntry {
    pub name: Rc<str>,
    pub type_id: TypeId,
    pub codec: Option<Codec>,
    pub template: Option<Template>,
}

/// `name ↔ type-identity`, plus each name's optional codec and template.
#[derive(Default)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    by_name: HashMap<Rc<str>, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    pub fn register(
        &mut self,
        type_id: TypeId,
        name: impl Into<Rc<str>>,
        codec: Option<Codec>,
        template: Option<Template>,
    ) -> Result<()> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateRegistration(name.to_string()));
        }
        if self.by_type.contains_key(&type_id) {
            return Err(Error::DuplicateRegistration(format!("{type_id:?}")));
        }
        let idx = self.entries.len();
        self.by_name.insert(name.clone(), idx);
        self.by_type.insert(type_id, idx);
        self.entries.push(TypeEntry {
            name,
            type_id,
            codec,
            template,
        });
        Ok(())
    }

    pub fn unregister_by_name(&mut self, name: &str) -> bool {
        let Some(&idx) = self.by_name.get(name) else {
            return false;
        };
        self.remove_index(idx);
        true
    }

    pub fn unregister_by_type(&mut self, type_id: TypeId) -> bool {
        let Some(&idx) = self.by_type.get(&type_id) else {
            return false;
        };
        self.remove_index(idx);
        true
    }

    fn remove_index(&mut self, idx: usize) {
        let removed = self.entries.remove(idx);
        self.by_name.remove(&removed.name);
        self.by_type.remove(&removed.type_id);
        // Every index after `idx` shifted down by one.
        for v in self.by_name.values_mut() {
            if *v > idx {
                *v -= 1;
            }
        }
        for v in self.by_type.values_mut() {
            if *v > idx {
                *v -= 1;
            }
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&TypeEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn by_type(&self, type_id: TypeId) -> Option<&TypeEntry> {
        self.by_type.get(&type_id).map(|&idx| &self.entries[idx])
    }
}

/// One of the shareable value kinds — the only kinds a resource (or a custom object) is allowed
/// to be, enforced here at the type level rather than at runtime.
#[derive(Clone)]
pub enum Resource {
    Str(Rc<[u8]>),
    Table(Rc<RefCell<Table>>),
    Custom(Rc<dyn CustomValue>),
    Procedure(Rc<dyn CustomValue>),
}

impl Resource {
    pub(crate) fn identity_ptr(&self) -> *const () {
        match self {
            Resource::Str(s) => Rc::as_ptr(s) as *const (),
            Resource::Table(t) => Rc::as_ptr(t) as *const (),
            Resource::Custom(c) => Rc::as_ptr(c) as *const (),
            Resource::Procedure(p) => Rc::as_ptr(p) as *const (),
        }
    }
}

impl From<Resource> for Value {
    fn from(r: Resource) -> Value {
        match r {
            Resource::Str(s) => Value::Str(s),
            Resource::Table(t) => Value::Table(t),
            Resource::Custom(c) => Value::Custom(c),
            Resource::Procedure(p) => Value::Procedure(p),
        }
    }
}

impl TryFrom<Value> for Resource {
    type Error = Error;

    fn try_from(v: Value) -> Result<Resource> {
        match v {
            Value::Str(s) => Ok(Resource::Str(s)),
            Value::Table(t) => Ok(Resource::Table(t)),
            Value::Custom(c) => Ok(Resource::Custom(c)),
            Value::Procedure(p) => Ok(Resource::Procedure(p)),
            other => Err(Error::Unserializable(format!(
                "{other:?} has no identity to register as a resource"
            ))),
        }
    }
}

/// `name ↔ object-identity`. The reverse index lets the encoder recognize, by pointer identity,
/// that a value it's about to serialize is a registered resource.
#[derive(Default)]
pub struct ResourceRegistry {
    by_name: HashMap<Rc<str>, Resource>,
    by_identity: HashMap<*const (), Rc<str>>,
}

impl ResourceRegistry {
    pub fn new() -> ResourceRegistry {
        ResourceRegistry::default()
    }

    pub fn register(&mut self, name: impl Into<Rc<str>>, object: Resource) -> Result<()> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateRegistration(name.to_string()));
        }
        let ptr = object.identity_ptr();
        if self.by_identity.contains_key(&ptr) {
            return Err(Error::DuplicateRegistration(name.to_string()));
        }
        self.by_identity.insert(ptr, name.clone());
        self.by_name.insert(name, object);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(object) = self.by_name.remove(name) else {
            return false;
        };
        self.by_identity.remove(&object.identity_ptr());
        true
    }

    pub fn by_name(&self, name: &str) -> Option<&Resource> {
        self.by_name.get(name)
    }

    /// The registered name for this identity, if any, as the *same* `Rc<str>` allocation the
    /// registry holds — so encoding it again is recognized as a repeat of the same string rather
    /// than a fresh allocation that can never back-reference.
    pub fn name_for_identity(&self, ptr: *const ()) -> Option<Rc<str>> {
        self.by_identity.get(&ptr).cloned()
    }
}
