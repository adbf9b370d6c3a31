//! Collaborator interfaces the marshaling core needs from its host
//!
//! The core never inspects instances directly. It asks a [`TypeClassifier`]
//! what an object is, a [`Factory`] for fresh instances and a
//! [`FieldAccessor`] to read and write their state. [`TypeRegistry`]
//! implements all three from registered schemas.
//!
//! [`TypeRegistry`]: crate::TypeRegistry

use crate::error::Result;
use crate::heap::{Heap, ObjRef};
use crate::types::Kind;
use crate::value::{Entry, Key, Value};

/// How the host treats an object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Domain,
    Plain,
    Collection,
    KeyedCollection,
}

impl ObjectKind {
    /// Node kind this object marshals as
    pub fn node_kind(self) -> Kind {
        match self {
            ObjectKind::Domain => Kind::DomainObject,
            ObjectKind::Plain => Kind::PlainObject,
            ObjectKind::Collection => Kind::Collection,
            ObjectKind::KeyedCollection => Kind::KeyedCollection,
        }
    }

    pub fn from_node_kind(kind: Kind) -> Option<Self> {
        match kind {
            Kind::DomainObject => Some(ObjectKind::Domain),
            Kind::PlainObject => Some(ObjectKind::Plain),
            Kind::Collection => Some(ObjectKind::Collection),
            Kind::KeyedCollection => Some(ObjectKind::KeyedCollection),
            Kind::Primitive | Kind::Array | Kind::DateTime => None,
        }
    }
}

/// Classification of one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectClass {
    pub kind: ObjectKind,
    pub type_name: String,
}

/// Reports what an object is.
///
/// Only [`Value::Object`] needs the host: every other variant of [`Value`]
/// already names its kind.
pub trait TypeClassifier {
    fn classify(&self, heap: &Heap, obj: ObjRef) -> Result<ObjectClass>;
}

/// Builds fresh, otherwise uninitialized instances by type name
pub trait Factory {
    /// Fails with [`MarshalError::UnknownType`](crate::MarshalError::UnknownType)
    /// if `type_name` cannot be instantiated.
    fn create(&self, heap: &mut Heap, type_name: &str) -> Result<ObjRef>;
}

/// Reads and writes instance state regardless of field visibility
pub trait FieldAccessor {
    /// Every field of the instance's type, non-public ones included, in
    /// declaration order
    fn field_names(&self, heap: &Heap, obj: ObjRef) -> Result<Vec<String>>;

    fn get_field(&self, heap: &Heap, obj: ObjRef, name: &str) -> Result<Value>;

    /// Fails with [`MarshalError::UnknownField`](crate::MarshalError::UnknownField)
    /// if the type has no field `name`.
    fn set_field(&self, heap: &mut Heap, obj: ObjRef, name: &str, value: Value) -> Result<()>;

    /// Members of a collection in iteration order
    fn members(&self, heap: &Heap, obj: ObjRef) -> Result<Vec<Entry>>;

    /// Add a member to a keyed collection
    fn attach_member(&self, heap: &mut Heap, obj: ObjRef, value: Value) -> Result<()>;

    /// Store a member of an array-like collection under `key`
    fn assign_index(&self, heap: &mut Heap, obj: ObjRef, key: Key, value: Value) -> Result<()>;
}

/// Everything the marshaling core needs from a host
pub trait Host: TypeClassifier + Factory + FieldAccessor {}

impl<T: TypeClassifier + Factory + FieldAccessor + ?Sized> Host for T {}

/// Field-inclusion policy consulted once per field during deflation
pub trait FieldFilter {
    fn include(&self, type_name: &str, field: &str) -> bool;
}

impl<F> FieldFilter for F
where
    F: Fn(&str, &str) -> bool,
{
    fn include(&self, type_name: &str, field: &str) -> bool {
        self(type_name, field)
    }
}

/// Default policy: every field is marshalled
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeAll;

impl FieldFilter for IncludeAll {
    fn include(&self, _type_name: &str, _field: &str) -> bool {
        true
    }
}
