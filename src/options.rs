//! Marshaling options

use serde::{Deserialize, Serialize};

/// Default nesting ceiling
pub const DEFAULT_MAX_DEPTH: usize = 60;

/// Deepest tree that still decodes. Each node costs two levels of JSON
/// nesting and serde_json refuses documents nested 128 levels deep, so a
/// larger `max_depth` is capped here.
pub const MAX_DECODABLE_DEPTH: usize = 63;

/// Options for marshalling and unmarshalling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshalOptions {
    /// Maximum nesting depth of values; deeper graphs fail with `DepthExceeded`.
    /// Never exceeds [`MAX_DECODABLE_DEPTH`] in effect, see [`MarshalOptions::depth_limit`].
    pub max_depth: usize,
    /// Escape all non-ASCII text as `\uXXXX` when encoding
    pub transport_safe: bool,
    /// Fail on dangling back-references instead of inflating them as null
    pub strict_references: bool,
    /// Reject unmarshall input longer than this many bytes
    pub max_input_len: Option<usize>,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            transport_safe: false,
            strict_references: false,
            max_input_len: None,
        }
    }
}

impl MarshalOptions {
    /// Options producing pure-ASCII output
    pub fn transport() -> Self {
        Self {
            transport_safe: true,
            ..Self::default()
        }
    }

    /// Options that treat dangling references as errors
    pub fn strict() -> Self {
        Self {
            strict_references: true,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Depth ceiling both passes enforce
    pub fn depth_limit(&self) -> usize {
        self.max_depth.min(MAX_DECODABLE_DEPTH)
    }
}
