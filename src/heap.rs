//! Arena of object instances addressed by stable handles

use std::fmt;

use crate::value::{Entry, Key, Value};

/// Stable handle to an instance on a [`Heap`].
///
/// Handles are only meaningful for the heap that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(usize);

impl ObjRef {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Named field slot on an instance
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub value: Value,
}

/// An object instance: a concrete type name, named fields and, for
/// collection types, ordered members.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_name: String,
    fields: Vec<Slot>,
    members: Vec<Entry>,
}

impl Instance {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Builder form of [`Instance::set`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder form of [`Instance::put_member`]
    pub fn with_member(mut self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.put_member(key.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[Slot] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|s| s.name == name).map(|s| &s.value)
    }

    /// Set a field, keeping its position if it already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|s| s.name == name) {
            Some(slot) => slot.value = value,
            None => self.fields.push(Slot { name, value }),
        }
    }

    pub fn members(&self) -> &[Entry] {
        &self.members
    }

    /// Store a member under `key`, replacing an existing member with that key
    pub fn put_member(&mut self, key: Key, value: Value) {
        match self.members.iter_mut().find(|e| e.key == key) {
            Some(existing) => existing.value = value,
            None => self.members.push(Entry { key, value }),
        }
    }

    /// Attach a member under the next free integer key.
    ///
    /// Attaching an object that is already a member is a no-op, so keyed
    /// collections behave as sets of objects.
    pub fn attach(&mut self, value: Value) {
        if let Value::Object(obj) = value {
            if self.members.iter().any(|e| e.value == Value::Object(obj)) {
                return;
            }
        }
        let keys: Vec<i64> = self
            .members
            .iter()
            .filter_map(|e| match e.key {
                Key::Int(i) => Some(i),
                Key::Str(_) => None,
            })
            .collect();
        let next = match keys.iter().max() {
            None => 0,
            Some(max) => match max.checked_add(1) {
                Some(next) => next,
                // i64::MAX is taken: fall back to the lowest free key
                None => (0..i64::MAX).find(|k| !keys.contains(k)).unwrap_or(0),
            },
        };
        self.members.push(Entry::new(next, value));
    }
}

/// Arena owning every instance of an object graph
#[derive(Debug, Clone, Default)]
pub struct Heap {
    objects: Vec<Instance>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, instance: Instance) -> ObjRef {
        self.objects.push(instance);
        ObjRef(self.objects.len() - 1)
    }

    pub fn get(&self, obj: ObjRef) -> Option<&Instance> {
        self.objects.get(obj.0)
    }

    pub fn get_mut(&mut self, obj: ObjRef) -> Option<&mut Instance> {
        self.objects.get_mut(obj.0)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
