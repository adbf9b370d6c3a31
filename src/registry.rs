//! Schema-backed host implementation
//!
//! A [`TypeRegistry`] stands in for runtime reflection: every marshallable
//! type is registered up front with its kind and its fields, and the
//! registry then acts as classifier, factory and field accessor for
//! instances on a [`Heap`].

use std::collections::{HashMap, HashSet};

use crate::error::{MarshalError, Result};
use crate::heap::{Heap, Instance, ObjRef};
use crate::host::{Factory, FieldAccessor, FieldFilter, ObjectClass, ObjectKind, TypeClassifier};
use crate::value::{Entry, Key, Value};

/// Declared access level of a field. Marshaling ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub visibility: Visibility,
}

/// Registered description of one type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    name: String,
    kind: ObjectKind,
    fields: Vec<FieldSchema>,
}

impl TypeSchema {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: Vec::new(),
        }
    }

    pub fn domain(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Domain)
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Plain)
    }

    pub fn collection(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Collection)
    }

    pub fn keyed_collection(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::KeyedCollection)
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        self.field_with(name, Visibility::Public)
    }

    pub fn protected_field(self, name: impl Into<String>) -> Self {
        self.field_with(name, Visibility::Protected)
    }

    pub fn private_field(self, name: impl Into<String>) -> Self {
        self.field_with(name, Visibility::Private)
    }

    pub fn field_with(mut self, name: impl Into<String>, visibility: Visibility) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            visibility,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Registry of marshallable types.
///
/// Only declared fields are marshalled. An instance carrying a slot its
/// schema does not declare fails with [`MarshalError::UnknownField`]
/// instead of losing that slot silently.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeSchema>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any earlier one with the same name
    pub fn register(&mut self, schema: TypeSchema) -> &mut Self {
        self.types.insert(schema.name.clone(), schema);
        self
    }

    /// Builder form of [`TypeRegistry::register`]
    pub fn with_type(mut self, schema: TypeSchema) -> Self {
        self.register(schema);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeSchema> {
        self.types.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Field filter that skips every non-public field of the registered types
    pub fn public_only(&self) -> PublicOnly {
        let hidden = self
            .types
            .values()
            .flat_map(|schema| {
                schema
                    .fields
                    .iter()
                    .filter(|f| f.visibility != Visibility::Public)
                    .map(|f| (schema.name.clone(), f.name.clone()))
            })
            .collect();
        PublicOnly { hidden }
    }

    fn schema(&self, type_name: &str) -> Result<&TypeSchema> {
        self.get(type_name)
            .ok_or_else(|| MarshalError::UnknownType(type_name.to_string()))
    }

    fn schema_of(&self, heap: &Heap, obj: ObjRef) -> Result<&TypeSchema> {
        self.schema(instance(heap, obj)?.type_name())
    }
}

fn instance(heap: &Heap, obj: ObjRef) -> Result<&Instance> {
    heap.get(obj).ok_or(MarshalError::InvalidHandle(obj))
}

fn instance_mut(heap: &mut Heap, obj: ObjRef) -> Result<&mut Instance> {
    heap.get_mut(obj).ok_or(MarshalError::InvalidHandle(obj))
}

impl TypeClassifier for TypeRegistry {
    fn classify(&self, heap: &Heap, obj: ObjRef) -> Result<ObjectClass> {
        let schema = self.schema_of(heap, obj)?;
        Ok(ObjectClass {
            kind: schema.kind,
            type_name: schema.name.clone(),
        })
    }
}

impl Factory for TypeRegistry {
    fn create(&self, heap: &mut Heap, type_name: &str) -> Result<ObjRef> {
        let schema = self.schema(type_name)?;
        let mut inst = Instance::new(schema.name.clone());
        for field in &schema.fields {
            inst.set(field.name.clone(), Value::Null);
        }
        Ok(heap.alloc(inst))
    }
}

impl FieldAccessor for TypeRegistry {
    fn field_names(&self, heap: &Heap, obj: ObjRef) -> Result<Vec<String>> {
        let schema = self.schema_of(heap, obj)?;
        let undeclared = instance(heap, obj)?
            .fields()
            .iter()
            .find(|slot| !schema.has_field(&slot.name));
        if let Some(slot) = undeclared {
            return Err(MarshalError::UnknownField {
                type_name: schema.name.clone(),
                field: slot.name.clone(),
            });
        }
        Ok(schema.fields.iter().map(|f| f.name.clone()).collect())
    }

    fn get_field(&self, heap: &Heap, obj: ObjRef, name: &str) -> Result<Value> {
        let schema = self.schema_of(heap, obj)?;
        if !schema.has_field(name) {
            return Err(MarshalError::UnknownField {
                type_name: schema.name.clone(),
                field: name.to_string(),
            });
        }
        // Declared but never assigned reads as null
        Ok(instance(heap, obj)?
            .field(name)
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn set_field(&self, heap: &mut Heap, obj: ObjRef, name: &str, value: Value) -> Result<()> {
        let schema = self.schema_of(heap, obj)?;
        if !schema.has_field(name) {
            return Err(MarshalError::UnknownField {
                type_name: schema.name.clone(),
                field: name.to_string(),
            });
        }
        instance_mut(heap, obj)?.set(name, value);
        Ok(())
    }

    fn members(&self, heap: &Heap, obj: ObjRef) -> Result<Vec<Entry>> {
        Ok(instance(heap, obj)?.members().to_vec())
    }

    fn attach_member(&self, heap: &mut Heap, obj: ObjRef, value: Value) -> Result<()> {
        instance_mut(heap, obj)?.attach(value);
        Ok(())
    }

    fn assign_index(&self, heap: &mut Heap, obj: ObjRef, key: Key, value: Value) -> Result<()> {
        instance_mut(heap, obj)?.put_member(key, value);
        Ok(())
    }
}

/// Filter built by [`TypeRegistry::public_only`]
#[derive(Debug, Clone, Default)]
pub struct PublicOnly {
    hidden: HashSet<(String, String)>,
}

impl FieldFilter for PublicOnly {
    fn include(&self, type_name: &str, field: &str) -> bool {
        !self
            .hidden
            .contains(&(type_name.to_string(), field.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(
                TypeSchema::domain("User")
                    .field("name")
                    .private_field("password_hash"),
            )
            .with_type(TypeSchema::keyed_collection("UserStorage"))
    }

    #[test]
    fn test_create_initializes_declared_fields() {
        let registry = registry();
        let mut heap = Heap::new();
        let user = registry.create(&mut heap, "User").unwrap();

        let inst = heap.get(user).unwrap();
        assert_eq!(inst.type_name(), "User");
        assert_eq!(inst.fields().len(), 2);
        assert!(inst.field("password_hash").unwrap().is_null());
    }

    #[test]
    fn test_create_unknown_type() {
        let mut heap = Heap::new();
        let err = registry().create(&mut heap, "Ghost").unwrap_err();
        assert!(matches!(err, MarshalError::UnknownType(name) if name == "Ghost"));
        assert!(heap.is_empty());
    }

    #[test]
    fn test_set_field_reaches_private_fields() {
        let registry = registry();
        let mut heap = Heap::new();
        let user = registry.create(&mut heap, "User").unwrap();

        registry
            .set_field(&mut heap, user, "password_hash", Value::str("x1"))
            .unwrap();
        assert_eq!(
            registry.get_field(&heap, user, "password_hash").unwrap(),
            Value::str("x1")
        );
    }

    #[test]
    fn test_set_unknown_field() {
        let registry = registry();
        let mut heap = Heap::new();
        let user = registry.create(&mut heap, "User").unwrap();

        let err = registry
            .set_field(&mut heap, user, "email", Value::Null)
            .unwrap_err();
        assert!(matches!(
            err,
            MarshalError::UnknownField { type_name, field } if type_name == "User" && field == "email"
        ));
    }

    #[test]
    fn test_field_names_rejects_undeclared_slot() {
        let registry = registry();
        let mut heap = Heap::new();
        let user = heap.alloc(Instance::new("User").with("name", "ada").with("email", "a@b.c"));

        let err = registry.field_names(&heap, user).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::UnknownField { type_name, field } if type_name == "User" && field == "email"
        ));

        let declared = heap.alloc(Instance::new("User").with("name", "ada"));
        assert_eq!(
            registry.field_names(&heap, declared).unwrap(),
            vec!["name".to_string(), "password_hash".to_string()]
        );
    }

    #[test]
    fn test_get_unassigned_field_is_null() {
        let registry = registry();
        let mut heap = Heap::new();
        let user = heap.alloc(Instance::new("User"));
        assert!(registry.get_field(&heap, user, "name").unwrap().is_null());
    }

    #[test]
    fn test_classify_and_invalid_handle() {
        let registry = registry();
        let mut heap = Heap::new();
        let storage = registry.create(&mut heap, "UserStorage").unwrap();

        let class = registry.classify(&heap, storage).unwrap();
        assert_eq!(class.kind, ObjectKind::KeyedCollection);

        let other = Heap::new();
        assert!(matches!(
            registry.classify(&other, storage),
            Err(MarshalError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_public_only_filter() {
        let filter = registry().public_only();
        assert!(filter.include("User", "name"));
        assert!(!filter.include("User", "password_hash"));
        assert!(filter.include("Other", "password_hash"));
    }
}
