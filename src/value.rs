//! Live values held by a host object graph

use std::fmt;

use chrono::{DateTime, Utc};

use crate::heap::ObjRef;

/// Key of an array or collection entry.
///
/// Integer and string keys are distinct: `Key::Int(1)` and `Key::Str("1")`
/// never compare equal and both survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}

/// Keyed entry of an array or collection
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Key,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<Key>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A value in a host object graph.
///
/// Objects live in a [`Heap`](crate::Heap) and are referred to by handle, so
/// sharing and cycles are expressed by repeating the same [`ObjRef`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Instant in UTC. Marshals with whole-second precision only.
    DateTime(DateTime<Utc>),
    /// Ordinary ordered/associative container, insertion order preserved
    Array(Vec<Entry>),
    /// Handle to an instance on the heap
    Object(ObjRef),
    /// Function value; can never be marshalled. Holds a description used in errors.
    Closure(String),
}

impl Value {
    pub fn null() -> Self {
        Value::Null
    }

    pub fn str(v: impl Into<String>) -> Self {
        Value::Str(v.into())
    }

    pub fn closure(description: impl Into<String>) -> Self {
        Value::Closure(description.into())
    }

    /// Create a list keyed `0..n`
    pub fn list(items: Vec<Value>) -> Self {
        Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| Entry::new(i as i64, v))
                .collect(),
        )
    }

    /// Create an array from explicit entries
    pub fn map(entries: Vec<Entry>) -> Self {
        Value::Array(entries)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<ObjRef> {
        match self {
            Value::Object(obj) => Some(*obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Entry]> {
        match self {
            Value::Array(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Get an array member by key
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.as_array()?
            .iter()
            .find(|e| &e.key == key)
            .map(|e| &e.value)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<ObjRef> for Value {
    fn from(v: ObjRef) -> Self {
        Value::Object(v)
    }
}

/// Helper to create an entry
pub fn entry(key: impl Into<Key>, value: impl Into<Value>) -> Entry {
    Entry::new(key, value.into())
}
