//! Error types for graph marshaling

use thiserror::Error;

use crate::heap::ObjRef;
use crate::identity::Identity;
use crate::types::Kind;

/// Errors that can occur while marshalling or unmarshalling an object graph
#[derive(Error, Debug)]
pub enum MarshalError {
    #[error("Unsupported type at {path}: {found}")]
    UnsupportedType { path: String, found: String },

    #[error("Disallowed root type: {0}")]
    DisallowedRootType(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Unknown field {field} on type {type_name}")]
    UnknownField { type_name: String, field: String },

    #[error("Dangling reference to {0}")]
    DanglingReference(Identity),

    #[error("Maximum nesting depth of {0} exceeded")]
    DepthExceeded(usize),

    #[error("Unknown node kind: {0}")]
    UnknownKind(String),

    #[error("Type {type_name} is {found}, node declares {expected}")]
    KindMismatch {
        type_name: String,
        expected: Kind,
        found: Kind,
    },

    #[error("Reference {identity} declares type {expected}, resolves to {found}")]
    TypeMismatch {
        identity: Identity,
        expected: String,
        found: String,
    },

    #[error("Object handle {0} does not belong to this heap")]
    InvalidHandle(ObjRef),

    #[error("Malformed node: {0}")]
    Malformed(String),

    #[error("Input of {len} bytes exceeds the limit of {limit}")]
    InputTooLarge { len: usize, limit: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MarshalError>;

pub(crate) fn malformed(msg: impl Into<String>) -> MarshalError {
    MarshalError::Malformed(msg.into())
}
