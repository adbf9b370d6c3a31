//! Cycle-aware object-graph marshaling
//!
//! Converts a graph of typed objects, including shared and cyclic
//! references, date/time values and collection types, into a tagged node
//! tree and a JSON byte encoding of it, then rebuilds an equivalent graph.
//!
//! Every object is emitted in full once per pass; later encounters become
//! back-references carrying the object's identity, which inflation resolves
//! to the same rebuilt instance. Instances are created through a
//! [`Factory`] and populated through a [`FieldAccessor`]; [`TypeRegistry`]
//! provides both from registered schemas.
//!
//! # Example
//!
//! ```rust
//! use graph_marshal::{Heap, Instance, Marshaller, TypeRegistry, TypeSchema, Value};
//!
//! let registry = TypeRegistry::new()
//!     .with_type(TypeSchema::domain("Person").field("name").private_field("friend"));
//! let marshaller = Marshaller::new(registry);
//!
//! let mut heap = Heap::new();
//! let alice = heap.alloc(Instance::new("Person").with("name", "Alice"));
//! heap.get_mut(alice).unwrap().set("friend", alice);
//!
//! let bytes = marshaller.marshall(&heap, &Value::Object(alice))?;
//!
//! let mut restored = Heap::new();
//! let value = marshaller.unmarshall(&mut restored, &bytes, "Person")?.unwrap();
//! let copy = value.as_object().unwrap();
//! assert_eq!(restored.get(copy).unwrap().field("friend"), Some(&Value::Object(copy)));
//! # Ok::<(), graph_marshal::MarshalError>(())
//! ```

mod compare;
mod deflate;
mod error;
mod heap;
mod host;
mod identity;
mod inflate;
mod marshaller;
mod options;
mod registry;
mod types;
mod value;
pub mod wire;

pub use compare::*;
pub use deflate::*;
pub use error::*;
pub use heap::*;
pub use host::*;
pub use identity::*;
pub use inflate::*;
pub use marshaller::*;
pub use options::*;
pub use registry::*;
pub use types::*;
pub use value::*;
