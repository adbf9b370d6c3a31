//! Identity tokens and the per-call encountered sets

use std::collections::HashMap;
use std::fmt;

use crate::heap::ObjRef;

/// Process-local identity token of an object-like node.
///
/// Assigned in encounter order during one deflation pass. It is not a
/// persisted key and means nothing outside the tree that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(u64);

impl Identity {
    pub fn new(token: u64) -> Self {
        Self(token)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Deflation side: objects whose full definition has been emitted
#[derive(Debug, Default)]
pub struct EmittedSet {
    seen: HashMap<ObjRef, Identity>,
    next: u64,
}

impl EmittedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, obj: ObjRef) -> Option<Identity> {
        self.seen.get(&obj).copied()
    }

    /// Assign the next identity to `obj`. Must be called once per object.
    pub fn register(&mut self, obj: ObjRef) -> Identity {
        debug_assert!(!self.seen.contains_key(&obj), "{obj} registered twice");
        self.next += 1;
        let identity = Identity(self.next);
        self.seen.insert(obj, identity);
        identity
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Inflation side: live instances by the identity they were emitted under
#[derive(Debug, Default)]
pub struct LiveSet {
    live: HashMap<Identity, ObjRef>,
}

impl LiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous instance if `identity` was already registered
    pub fn register(&mut self, identity: Identity, obj: ObjRef) -> Option<ObjRef> {
        self.live.insert(identity, obj)
    }

    pub fn resolve(&self, identity: Identity) -> Option<ObjRef> {
        self.live.get(&identity).copied()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::{Heap, Instance};

    #[test]
    fn test_identities_follow_encounter_order() {
        let mut heap = Heap::new();
        let a = heap.alloc(Instance::new("A"));
        let b = heap.alloc(Instance::new("B"));

        let mut emitted = EmittedSet::new();
        assert_eq!(emitted.register(b), Identity::new(1));
        assert_eq!(emitted.register(a), Identity::new(2));
        assert_eq!(emitted.lookup(b), Some(Identity::new(1)));
        assert_eq!(emitted.len(), 2);
    }

    #[test]
    fn test_live_set_resolves_registered_only() {
        let mut heap = Heap::new();
        let a = heap.alloc(Instance::new("A"));

        let mut live = LiveSet::new();
        assert!(live.register(Identity::new(7), a).is_none());
        assert_eq!(live.resolve(Identity::new(7)), Some(a));
        assert_eq!(live.resolve(Identity::new(8)), None);
    }
}
