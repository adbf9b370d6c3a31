//! Inflation: tagged node tree back to a live object graph

use chrono::{DateTime, Utc};
use tracing::{trace, warn};

use crate::error::{malformed, MarshalError, Result};
use crate::heap::Heap;
use crate::host::{Host, ObjectKind};
use crate::identity::{Identity, LiveSet};
use crate::options::MarshalOptions;
use crate::types::{Kind, NodeBody, NodeEntry, Scalar, TaggedNode};
use crate::value::{Entry, Key, Value};

/// Condition noticed during a lenient inflation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A back-reference whose identity was never registered; inflated as null
    DanglingReference {
        identity: Identity,
        kind: Kind,
        type_name: Option<String>,
    },
}

/// Depth-first walker rebuilding values from tagged nodes
pub struct Inflator<'a, H: Host + ?Sized> {
    host: &'a H,
    heap: &'a mut Heap,
    max_depth: usize,
    depth: usize,
    strict: bool,
    encountered: LiveSet,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, H: Host + ?Sized> Inflator<'a, H> {
    pub fn new(host: &'a H, heap: &'a mut Heap, options: &MarshalOptions) -> Self {
        Self {
            host,
            heap,
            max_depth: options.depth_limit(),
            depth: 0,
            strict: options.strict_references,
            encountered: LiveSet::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Instances created so far, by identity
    pub fn encountered(&self) -> &LiveSet {
        &self.encountered
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn inflate(&mut self, node: &TaggedNode) -> Result<Value> {
        self.depth += 1;
        let value = if self.depth > self.max_depth {
            Err(MarshalError::DepthExceeded(self.max_depth))
        } else {
            self.inflate_node(node)
        };
        self.depth -= 1;
        value
    }

    fn inflate_node(&mut self, node: &TaggedNode) -> Result<Value> {
        match (node.kind, &node.body) {
            (Kind::Primitive, NodeBody::Scalar(scalar)) => Ok(scalar.clone().into()),
            (Kind::DateTime, NodeBody::Scalar(Scalar::Int(timestamp))) => {
                DateTime::<Utc>::from_timestamp(*timestamp, 0)
                    .map(Value::DateTime)
                    .ok_or_else(|| malformed(format!("timestamp {timestamp} out of range")))
            }
            (Kind::Array, NodeBody::Entries(entries)) => {
                Ok(Value::Array(self.inflate_entries(entries)?))
            }
            (kind, body) => match ObjectKind::from_node_kind(kind) {
                Some(object_kind) => self.inflate_object(node, object_kind, body),
                None => Err(malformed(format!("{kind} node with mismatched body"))),
            },
        }
    }

    fn inflate_entries(&mut self, entries: &[NodeEntry]) -> Result<Vec<Entry>> {
        let mut values = Vec::with_capacity(entries.len());
        for entry in entries {
            values.push(Entry::new(entry.key.clone(), self.inflate(&entry.node)?));
        }
        Ok(values)
    }

    fn inflate_object(
        &mut self,
        node: &TaggedNode,
        object_kind: ObjectKind,
        body: &NodeBody,
    ) -> Result<Value> {
        let entries = match body {
            NodeBody::Reference(identity) => return self.resolve(node, object_kind, *identity),
            NodeBody::Entries(entries) => entries,
            NodeBody::Scalar(_) => {
                return Err(malformed(format!("{} node with scalar body", node.kind)))
            }
        };
        let type_name = node
            .type_name
            .as_deref()
            .ok_or_else(|| malformed(format!("{} node without a type name", node.kind)))?;

        let obj = self.host.create(self.heap, type_name)?;
        let class = self.host.classify(self.heap, obj)?;
        if class.kind != object_kind {
            return Err(MarshalError::KindMismatch {
                type_name: type_name.to_string(),
                expected: node.kind,
                found: class.kind.node_kind(),
            });
        }

        // Register before descending so nested back-references resolve to this instance
        if let Some(identity) = node.identity {
            if self.encountered.register(identity, obj).is_some() {
                return Err(malformed(format!("{identity} defined more than once")));
            }
            trace!(%identity, %type_name, "inflating object");
        }

        for entry in entries {
            let value = self.inflate(&entry.node)?;
            match object_kind {
                ObjectKind::Domain | ObjectKind::Plain => {
                    let Key::Str(name) = &entry.key else {
                        return Err(malformed(format!(
                            "field key {} on {type_name} is not a name",
                            entry.key
                        )));
                    };
                    self.host.set_field(self.heap, obj, name, value)?;
                }
                ObjectKind::KeyedCollection => self.host.attach_member(self.heap, obj, value)?,
                ObjectKind::Collection => {
                    self.host
                        .assign_index(self.heap, obj, entry.key.clone(), value)?
                }
            }
        }
        Ok(Value::Object(obj))
    }

    fn resolve(
        &mut self,
        node: &TaggedNode,
        object_kind: ObjectKind,
        identity: Identity,
    ) -> Result<Value> {
        let Some(obj) = self.encountered.resolve(identity) else {
            return self.dangling(node, identity);
        };

        // A reference must describe the instance it resolves to
        let class = self.host.classify(self.heap, obj)?;
        if class.kind != object_kind {
            return Err(MarshalError::KindMismatch {
                type_name: class.type_name,
                expected: node.kind,
                found: class.kind.node_kind(),
            });
        }
        if let Some(declared) = node.type_name.as_deref() {
            if declared != class.type_name {
                return Err(MarshalError::TypeMismatch {
                    identity,
                    expected: declared.to_string(),
                    found: class.type_name,
                });
            }
        }
        Ok(Value::Object(obj))
    }

    fn dangling(&mut self, node: &TaggedNode, identity: Identity) -> Result<Value> {
        if self.strict {
            return Err(MarshalError::DanglingReference(identity));
        }
        warn!(%identity, kind = %node.kind, "dangling back-reference inflated as null");
        self.diagnostics.push(Diagnostic::DanglingReference {
            identity,
            kind: node.kind,
            type_name: node.type_name.clone(),
        });
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{TypeRegistry, TypeSchema};

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(TypeSchema::domain("Node").field("label").field("next"))
            .with_type(TypeSchema::domain("Leaf").field("label"))
            .with_type(TypeSchema::collection("Bag"))
    }

    fn scalar(v: &str) -> TaggedNode {
        TaggedNode::primitive(Scalar::Str(v.into()))
    }

    #[test]
    fn test_self_reference_resolves_to_same_instance() {
        let id = Identity::new(1);
        let tree = TaggedNode::object(
            Kind::DomainObject,
            "Node",
            id,
            vec![
                NodeEntry::new("label", scalar("a")),
                NodeEntry::new("next", TaggedNode::reference(Kind::DomainObject, "Node", id)),
            ],
        );

        let registry = registry();
        let mut heap = Heap::new();
        let mut inflator = Inflator::new(&registry, &mut heap, &MarshalOptions::default());
        let value = inflator.inflate(&tree).unwrap();
        assert!(inflator.diagnostics().is_empty());

        let obj = value.as_object().unwrap();
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.get(obj).unwrap().field("next"), Some(&Value::Object(obj)));
    }

    #[test]
    fn test_dangling_reference_is_reported() {
        let tree = TaggedNode::object(
            Kind::DomainObject,
            "Node",
            Identity::new(1),
            vec![NodeEntry::new(
                "next",
                TaggedNode::reference(Kind::DomainObject, "Node", Identity::new(9)),
            )],
        );

        let registry = registry();
        let mut heap = Heap::new();
        let mut inflator = Inflator::new(&registry, &mut heap, &MarshalOptions::default());
        let value = inflator.inflate(&tree).unwrap();
        assert_eq!(
            inflator.into_diagnostics(),
            vec![Diagnostic::DanglingReference {
                identity: Identity::new(9),
                kind: Kind::DomainObject,
                type_name: Some("Node".into()),
            }]
        );
        let obj = value.as_object().unwrap();
        assert!(heap.get(obj).unwrap().field("next").unwrap().is_null());

        let mut heap = Heap::new();
        let mut inflator = Inflator::new(&registry, &mut heap, &MarshalOptions::strict());
        assert!(matches!(
            inflator.inflate(&tree),
            Err(MarshalError::DanglingReference(id)) if id == Identity::new(9)
        ));
    }

    #[test]
    fn test_kind_mismatch() {
        let tree = TaggedNode::object(Kind::Collection, "Node", Identity::new(1), vec![]);
        let registry = registry();
        let mut heap = Heap::new();
        let mut inflator = Inflator::new(&registry, &mut heap, &MarshalOptions::default());
        assert!(matches!(
            inflator.inflate(&tree),
            Err(MarshalError::KindMismatch { expected: Kind::Collection, found: Kind::DomainObject, .. })
        ));
    }

    fn self_reference_as(kind: Kind, type_name: &str) -> TaggedNode {
        TaggedNode::object(
            Kind::DomainObject,
            "Node",
            Identity::new(1),
            vec![NodeEntry::new(
                "next",
                TaggedNode::reference(kind, type_name, Identity::new(1)),
            )],
        )
    }

    #[test]
    fn test_reference_kind_must_match_target() {
        let registry = registry();
        let mut heap = Heap::new();
        let mut inflator = Inflator::new(&registry, &mut heap, &MarshalOptions::default());
        assert!(matches!(
            inflator.inflate(&self_reference_as(Kind::Collection, "Bag")),
            Err(MarshalError::KindMismatch { expected: Kind::Collection, found: Kind::DomainObject, .. })
        ));
    }

    #[test]
    fn test_reference_type_must_match_target() {
        let registry = registry();
        let mut heap = Heap::new();
        let mut inflator = Inflator::new(&registry, &mut heap, &MarshalOptions::default());
        let err = inflator
            .inflate(&self_reference_as(Kind::DomainObject, "Leaf"))
            .unwrap_err();
        assert!(matches!(
            err,
            MarshalError::TypeMismatch { ref expected, ref found, .. } if expected == "Leaf" && found == "Node"
        ));
    }

    #[test]
    fn test_collection_keeps_keys() {
        let tree = TaggedNode::object(
            Kind::Collection,
            "Bag",
            Identity::new(1),
            vec![
                NodeEntry::new("x", scalar("first")),
                NodeEntry::new(4i64, scalar("second")),
            ],
        );
        let registry = registry();
        let mut heap = Heap::new();
        let mut inflator = Inflator::new(&registry, &mut heap, &MarshalOptions::default());
        let obj = inflator.inflate(&tree).unwrap().as_object().unwrap();

        let keys: Vec<_> = heap.get(obj).unwrap().members().iter().map(|e| e.key.clone()).collect();
        assert_eq!(keys, vec![Key::from("x"), Key::Int(4)]);
    }

    #[test]
    fn test_out_of_range_timestamp() {
        let registry = registry();
        let mut heap = Heap::new();
        let mut inflator = Inflator::new(&registry, &mut heap, &MarshalOptions::default());
        assert!(matches!(
            inflator.inflate(&TaggedNode::datetime(i64::MAX)),
            Err(MarshalError::Malformed(_))
        ));
    }

    #[test]
    fn test_int_keyed_field_is_malformed() {
        let tree = TaggedNode::object(
            Kind::DomainObject,
            "Node",
            Identity::new(1),
            vec![NodeEntry::new(0i64, scalar("a"))],
        );
        let registry = registry();
        let mut heap = Heap::new();
        let mut inflator = Inflator::new(&registry, &mut heap, &MarshalOptions::default());
        assert!(matches!(inflator.inflate(&tree), Err(MarshalError::Malformed(_))));
    }
}
