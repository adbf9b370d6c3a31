//! Tagged node tree types

use std::fmt;

use crate::identity::Identity;
use crate::value::{Key, Value};

/// Semantic kind of a tagged node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Scalar: null, bool, integer, float or string
    Primitive,
    /// Ordinary ordered/associative container
    Array,
    /// Host-managed entity, identity-tracked with full field marshaling
    DomainObject,
    /// Any other typed object with fields
    PlainObject,
    /// Array-like collection wrapper type
    Collection,
    /// Collection that behaves as a set of attached members
    KeyedCollection,
    /// Instant stored as whole epoch seconds
    DateTime,
}

impl Kind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Primitive => "primitive",
            Kind::Array => "array",
            Kind::DomainObject => "domain_object",
            Kind::PlainObject => "plain_object",
            Kind::Collection => "collection",
            Kind::KeyedCollection => "keyed_collection",
            Kind::DateTime => "datetime",
        }
    }

    /// Parse a wire name
    pub fn parse(s: &str) -> Option<Kind> {
        Some(match s {
            "primitive" => Kind::Primitive,
            "array" => Kind::Array,
            "domain_object" => Kind::DomainObject,
            "plain_object" => Kind::PlainObject,
            "collection" => Kind::Collection,
            "keyed_collection" => Kind::KeyedCollection,
            "datetime" => Kind::DateTime,
            _ => return None,
        })
    }

    /// Object-like kinds carry a type name and an identity
    pub fn is_object_like(&self) -> bool {
        matches!(
            self,
            Kind::DomainObject | Kind::PlainObject | Kind::Collection | Kind::KeyedCollection
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar payload of a primitive or datetime node
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(i) => Value::Int(i),
            Scalar::Float(f) => Value::Float(f),
            Scalar::Str(s) => Value::Str(s),
        }
    }
}

/// Body of a tagged node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    Scalar(Scalar),
    /// Ordered members or fields
    Entries(Vec<NodeEntry>),
    /// Back-reference to an object emitted earlier in the same pass
    Reference(Identity),
}

/// Keyed child of a node body
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub key: Key,
    pub node: TaggedNode,
}

impl NodeEntry {
    pub fn new(key: impl Into<Key>, node: TaggedNode) -> Self {
        Self {
            key: key.into(),
            node,
        }
    }
}

/// Wire-level unit produced by deflation and consumed by inflation
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedNode {
    pub kind: Kind,
    pub type_name: Option<String>,
    pub identity: Option<Identity>,
    pub body: NodeBody,
}

// ============================================================
// Builder functions
// ============================================================

impl TaggedNode {
    pub fn primitive(value: Scalar) -> Self {
        Self {
            kind: Kind::Primitive,
            type_name: None,
            identity: None,
            body: NodeBody::Scalar(value),
        }
    }

    /// DateTime node from epoch seconds
    pub fn datetime(timestamp: i64) -> Self {
        Self {
            kind: Kind::DateTime,
            type_name: None,
            identity: None,
            body: NodeBody::Scalar(Scalar::Int(timestamp)),
        }
    }

    pub fn array(entries: Vec<NodeEntry>) -> Self {
        Self {
            kind: Kind::Array,
            type_name: None,
            identity: None,
            body: NodeBody::Entries(entries),
        }
    }

    /// Full definition of an object-like node
    pub fn object(
        kind: Kind,
        type_name: impl Into<String>,
        identity: Identity,
        entries: Vec<NodeEntry>,
    ) -> Self {
        Self {
            kind,
            type_name: Some(type_name.into()),
            identity: Some(identity),
            body: NodeBody::Entries(entries),
        }
    }

    /// Back-reference to an object-like node emitted earlier
    pub fn reference(kind: Kind, type_name: impl Into<String>, identity: Identity) -> Self {
        Self {
            kind,
            type_name: Some(type_name.into()),
            identity: Some(identity),
            body: NodeBody::Reference(identity),
        }
    }

    // ============================================================
    // Inspection
    // ============================================================

    pub fn is_reference(&self) -> bool {
        matches!(self.body, NodeBody::Reference(_))
    }

    pub fn entries(&self) -> Option<&[NodeEntry]> {
        match &self.body {
            NodeBody::Entries(entries) => Some(entries),
            _ => None,
        }
    }

    /// Get a child node by string key
    pub fn get(&self, key: &str) -> Option<&TaggedNode> {
        self.entries()?
            .iter()
            .find(|e| matches!(&e.key, Key::Str(k) if k == key))
            .map(|e| &e.node)
    }

    /// Number of nodes in this tree, back-references included
    pub fn node_count(&self) -> usize {
        1 + self
            .entries()
            .map(|entries| entries.iter().map(|e| e.node.node_count()).sum())
            .unwrap_or(0)
    }
}
