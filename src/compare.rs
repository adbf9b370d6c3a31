//! Structural comparison of object graphs across heaps

use std::collections::HashMap;

use crate::heap::{Heap, ObjRef};
use crate::value::{Entry, Value};

/// Check whether two values describe the same object graph.
///
/// Objects are matched by structure, not by handle: the first time a pair
/// of objects is compared they are bound to each other, and every later
/// occurrence must respect that binding. Sharing and cycles therefore have to
/// line up exactly, while handles may differ. Fields compare by name with a
/// missing field reading as null; collection members compare in order.
pub fn graph_eq(left_heap: &Heap, left: &Value, right_heap: &Heap, right: &Value) -> bool {
    GraphEq {
        left_heap,
        right_heap,
        forward: HashMap::new(),
        backward: HashMap::new(),
    }
    .values(left, right)
}

struct GraphEq<'a> {
    left_heap: &'a Heap,
    right_heap: &'a Heap,
    forward: HashMap<ObjRef, ObjRef>,
    backward: HashMap<ObjRef, ObjRef>,
}

impl GraphEq<'_> {
    fn values(&mut self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Object(l), Value::Object(r)) => self.objects(*l, *r),
            (Value::Array(l), Value::Array(r)) => self.entries(l, r),
            (Value::Object(_), _) | (_, Value::Object(_)) => false,
            (Value::Array(_), _) | (_, Value::Array(_)) => false,
            _ => left == right,
        }
    }

    fn entries(&mut self, left: &[Entry], right: &[Entry]) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .all(|(l, r)| l.key == r.key && self.values(&l.value, &r.value))
    }

    fn objects(&mut self, left: ObjRef, right: ObjRef) -> bool {
        match (self.forward.get(&left), self.backward.get(&right)) {
            (Some(bound), _) => return *bound == right,
            (None, Some(_)) => return false,
            (None, None) => {}
        }
        self.forward.insert(left, right);
        self.backward.insert(right, left);

        let (Some(l), Some(r)) = (self.left_heap.get(left), self.right_heap.get(right)) else {
            return false;
        };
        if l.type_name() != r.type_name() || !self.entries(l.members(), r.members()) {
            return false;
        }

        let mut names: Vec<&str> = l.fields().iter().map(|s| s.name.as_str()).collect();
        for slot in r.fields() {
            if !names.contains(&slot.name.as_str()) {
                names.push(&slot.name);
            }
        }
        names.into_iter().all(|name| {
            let lv = l.field(name).unwrap_or(&Value::Null);
            let rv = r.field(name).unwrap_or(&Value::Null);
            self.values(lv, rv)
        })
    }
}
