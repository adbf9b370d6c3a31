//! Deflation: live object graph to tagged node tree

use tracing::trace;

use crate::error::{MarshalError, Result};
use crate::heap::{Heap, ObjRef};
use crate::host::{FieldFilter, Host, IncludeAll, ObjectKind};
use crate::identity::EmittedSet;
use crate::options::MarshalOptions;
use crate::types::{NodeEntry, Scalar, TaggedNode};
use crate::value::{Entry, Key, Value};

/// Depth-first walker turning values into tagged nodes.
///
/// One deflator serves one pass: its encountered set decides which objects
/// get a full body and which get a back-reference, so reusing it across
/// unrelated roots makes the second tree refer into the first.
pub struct Deflator<'a, H: Host + ?Sized> {
    host: &'a H,
    heap: &'a Heap,
    filter: &'a dyn FieldFilter,
    max_depth: usize,
    depth: usize,
    path: String,
    encountered: EmittedSet,
}

impl<'a, H: Host + ?Sized> Deflator<'a, H> {
    pub fn new(host: &'a H, heap: &'a Heap, options: &MarshalOptions) -> Self {
        Self {
            host,
            heap,
            filter: &IncludeAll,
            max_depth: options.depth_limit(),
            depth: 0,
            path: String::from("$"),
            encountered: EmittedSet::new(),
        }
    }

    pub fn with_filter(mut self, filter: &'a dyn FieldFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Objects given a full body so far
    pub fn encountered(&self) -> &EmittedSet {
        &self.encountered
    }

    pub fn deflate(&mut self, value: &Value) -> Result<TaggedNode> {
        self.depth += 1;
        let node = if self.depth > self.max_depth {
            Err(MarshalError::DepthExceeded(self.max_depth))
        } else {
            self.deflate_value(value)
        };
        self.depth -= 1;
        node
    }

    fn deflate_value(&mut self, value: &Value) -> Result<TaggedNode> {
        let scalar = match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Int(i) => Scalar::Int(*i),
            Value::Float(f) => Scalar::Float(*f),
            Value::Str(s) => Scalar::Str(s.clone()),
            // Whole seconds only; sub-second precision is dropped
            Value::DateTime(dt) => return Ok(TaggedNode::datetime(dt.timestamp())),
            Value::Array(entries) => return Ok(TaggedNode::array(self.deflate_entries(entries)?)),
            Value::Object(obj) => return self.deflate_object(*obj),
            Value::Closure(description) => {
                return Err(MarshalError::UnsupportedType {
                    path: self.path.clone(),
                    found: format!("closure {description}"),
                })
            }
        };
        Ok(TaggedNode::primitive(scalar))
    }

    fn deflate_object(&mut self, obj: ObjRef) -> Result<TaggedNode> {
        let class = self.host.classify(self.heap, obj)?;
        let kind = class.kind.node_kind();

        if let Some(identity) = self.encountered.lookup(obj) {
            return Ok(TaggedNode::reference(kind, class.type_name, identity));
        }
        let identity = self.encountered.register(obj);
        trace!(%identity, type_name = %class.type_name, "deflating object");

        let entries = match class.kind {
            ObjectKind::Domain | ObjectKind::Plain => self.deflate_fields(obj, &class.type_name)?,
            ObjectKind::Collection => {
                let members = self.host.members(self.heap, obj)?;
                self.deflate_entries(&members)?
            }
            ObjectKind::KeyedCollection => {
                // Flatten to a plain sequence first; keys carry no meaning here
                let members: Vec<Entry> = self
                    .host
                    .members(self.heap, obj)?
                    .into_iter()
                    .enumerate()
                    .map(|(i, e)| Entry::new(i as i64, e.value))
                    .collect();
                self.deflate_entries(&members)?
            }
        };
        Ok(TaggedNode::object(kind, class.type_name, identity, entries))
    }

    fn deflate_fields(&mut self, obj: ObjRef, type_name: &str) -> Result<Vec<NodeEntry>> {
        let mut fields = Vec::new();
        for name in self.host.field_names(self.heap, obj)? {
            if !self.filter.include(type_name, &name) {
                continue;
            }
            let value = self.host.get_field(self.heap, obj, &name)?;
            let mark = self.path.len();
            self.path.push('.');
            self.path.push_str(&name);
            let node = self.deflate(&value);
            self.path.truncate(mark);
            fields.push(NodeEntry::new(name, node?));
        }
        Ok(fields)
    }

    fn deflate_entries(&mut self, entries: &[Entry]) -> Result<Vec<NodeEntry>> {
        let mut nodes = Vec::with_capacity(entries.len());
        for entry in entries {
            let mark = self.path.len();
            match &entry.key {
                Key::Int(i) => self.path.push_str(&format!("[{i}]")),
                Key::Str(s) => self.path.push_str(&format!("[{s:?}]")),
            }
            let node = self.deflate(&entry.value);
            self.path.truncate(mark);
            nodes.push(NodeEntry::new(entry.key.clone(), node?));
        }
        Ok(nodes)
    }
}
