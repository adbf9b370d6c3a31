//! Marshall / unmarshall entry points

use tracing::debug;

use crate::deflate::Deflator;
use crate::error::{MarshalError, Result};
use crate::heap::Heap;
use crate::host::{FieldFilter, Host, IncludeAll};
use crate::inflate::{Diagnostic, Inflator};
use crate::options::MarshalOptions;
use crate::types::TaggedNode;
use crate::value::Value;
use crate::wire;

/// Root types an unmarshall call may produce
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AllowedRoots {
    /// No restriction
    #[default]
    Any,
    /// Only the listed concrete types
    Only(Vec<String>),
}

impl AllowedRoots {
    pub fn any() -> Self {
        AllowedRoots::Any
    }

    pub fn only(type_name: impl Into<String>) -> Self {
        AllowedRoots::Only(vec![type_name.into()])
    }

    pub fn one_of<I, S>(type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowedRoots::Only(type_names.into_iter().map(Into::into).collect())
    }

    pub fn permits(&self, type_name: &str) -> bool {
        match self {
            AllowedRoots::Any => true,
            AllowedRoots::Only(names) => names.iter().any(|n| n == type_name),
        }
    }
}

impl From<&str> for AllowedRoots {
    fn from(type_name: &str) -> Self {
        AllowedRoots::only(type_name)
    }
}

impl From<String> for AllowedRoots {
    fn from(type_name: String) -> Self {
        AllowedRoots::only(type_name)
    }
}

impl From<&[&str]> for AllowedRoots {
    fn from(type_names: &[&str]) -> Self {
        AllowedRoots::one_of(type_names.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for AllowedRoots {
    fn from(type_names: [&str; N]) -> Self {
        AllowedRoots::one_of(type_names)
    }
}

impl From<Vec<String>> for AllowedRoots {
    fn from(type_names: Vec<String>) -> Self {
        AllowedRoots::Only(type_names)
    }
}

/// Outcome of [`Marshaller::unmarshall_with_report`]
#[derive(Debug, Clone, PartialEq)]
pub struct Unmarshalled {
    /// `None` when the input had no root type marker
    pub value: Option<Value>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Facade composing deflation, the wire codec and inflation
pub struct Marshaller<H> {
    host: H,
    options: MarshalOptions,
    filter: Box<dyn FieldFilter>,
}

impl<H: Host> Marshaller<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            options: MarshalOptions::default(),
            filter: Box::new(IncludeAll),
        }
    }

    pub fn with_options(mut self, options: MarshalOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the field-inclusion policy used during deflation
    pub fn with_field_filter(mut self, filter: impl FieldFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn options(&self) -> &MarshalOptions {
        &self.options
    }

    /// Deflate `value` in a fresh pass
    pub fn deflate(&self, heap: &Heap, value: &Value) -> Result<TaggedNode> {
        let mut deflator =
            Deflator::new(&self.host, heap, &self.options).with_filter(self.filter.as_ref());
        let node = deflator.deflate(value)?;
        debug!(
            objects = deflator.encountered().len(),
            nodes = node.node_count(),
            "deflated object graph"
        );
        Ok(node)
    }

    /// Inflate `node` into `heap` in a fresh pass
    pub fn inflate(&self, heap: &mut Heap, node: &TaggedNode) -> Result<(Value, Vec<Diagnostic>)> {
        let mut inflator = Inflator::new(&self.host, heap, &self.options);
        let value = inflator.inflate(node)?;
        debug!(
            objects = inflator.encountered().len(),
            dangling = inflator.diagnostics().len(),
            "inflated object graph"
        );
        Ok((value, inflator.into_diagnostics()))
    }

    /// Deflate and encode. Fails without output on any unsupported value.
    pub fn marshall(&self, heap: &Heap, value: &Value) -> Result<Vec<u8>> {
        let node = self.deflate(heap, value)?;
        wire::encode(&node, self.options.transport_safe)
    }

    /// Decode, check the root type, and inflate into `heap`.
    ///
    /// Returns `Ok(None)` when the input has no root type marker, e.g. a
    /// marshalled scalar or array. Dangling back-references inflate as null;
    /// use [`Marshaller::unmarshall_with_report`] to observe them.
    pub fn unmarshall(
        &self,
        heap: &mut Heap,
        bytes: &[u8],
        allowed: impl Into<AllowedRoots>,
    ) -> Result<Option<Value>> {
        Ok(self.unmarshall_with_report(heap, bytes, allowed)?.value)
    }

    pub fn unmarshall_with_report(
        &self,
        heap: &mut Heap,
        bytes: &[u8],
        allowed: impl Into<AllowedRoots>,
    ) -> Result<Unmarshalled> {
        if let Some(limit) = self.options.max_input_len {
            if bytes.len() > limit {
                return Err(MarshalError::InputTooLarge {
                    len: bytes.len(),
                    limit,
                });
            }
        }

        let Some(node) = wire::decode(bytes)? else {
            debug!("no root type marker, nothing to inflate");
            return Ok(Unmarshalled {
                value: None,
                diagnostics: Vec::new(),
            });
        };

        // decode only yields trees that carry a root type
        let root_type = node.type_name.as_deref().unwrap_or_default();
        if !allowed.into().permits(root_type) {
            return Err(MarshalError::DisallowedRootType(root_type.to_string()));
        }

        let (value, diagnostics) = self.inflate(heap, &node)?;
        Ok(Unmarshalled {
            value: Some(value),
            diagnostics,
        })
    }
}
