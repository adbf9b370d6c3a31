//! JSON wire format for tagged node trees
//!
//! Every node is a JSON object:
//!
//! ```text
//! {"kind": "domain_object", "type": "Post", "id": 3, "value": [ ...children ]}
//! ```
//!
//! Children are node objects carrying an extra `"key"` member, kept in an
//! array so insertion order and the integer/string distinction of keys
//! survive. A back-reference is an object-like node whose `"value"` is the
//! identity number instead of an array. The root's `"type"` member is the
//! root marker checked by the unmarshall gate.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{malformed, MarshalError, Result};
use crate::identity::Identity;
use crate::types::{Kind, NodeBody, NodeEntry, Scalar, TaggedNode};
use crate::value::Key;

/// Convert a tagged node tree to JSON
pub fn to_json(node: &TaggedNode) -> JsonValue {
    JsonValue::Object(node_to_map(node))
}

fn node_to_map(node: &TaggedNode) -> Map<String, JsonValue> {
    let mut map = Map::new();
    map.insert("kind".to_string(), JsonValue::String(node.kind.as_str().to_string()));
    if let Some(type_name) = &node.type_name {
        map.insert("type".to_string(), JsonValue::String(type_name.clone()));
    }
    if let Some(identity) = node.identity {
        map.insert("id".to_string(), JsonValue::Number(identity.get().into()));
    }
    let value = match &node.body {
        NodeBody::Scalar(scalar) => scalar_to_json(scalar),
        NodeBody::Reference(identity) => JsonValue::Number(identity.get().into()),
        NodeBody::Entries(entries) => JsonValue::Array(
            entries
                .iter()
                .map(|entry| {
                    let mut child = Map::new();
                    child.insert("key".to_string(), key_to_json(&entry.key));
                    child.extend(node_to_map(&entry.node));
                    JsonValue::Object(child)
                })
                .collect(),
        ),
    };
    map.insert("value".to_string(), value);
    map
}

fn scalar_to_json(scalar: &Scalar) -> JsonValue {
    match scalar {
        Scalar::Null => JsonValue::Null,
        Scalar::Bool(b) => JsonValue::Bool(*b),
        Scalar::Int(i) => JsonValue::Number((*i).into()),
        // JSON has no NaN or infinity
        Scalar::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Scalar::Str(s) => JsonValue::String(s.clone()),
    }
}

fn key_to_json(key: &Key) -> JsonValue {
    match key {
        Key::Int(i) => JsonValue::Number((*i).into()),
        Key::Str(s) => JsonValue::String(s.clone()),
    }
}

/// Convert JSON back to a tagged node tree
pub fn from_json(json: &JsonValue) -> Result<TaggedNode> {
    let map = json
        .as_object()
        .ok_or_else(|| malformed("node is not a JSON object"))?;

    let kind_name = map
        .get("kind")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| malformed("node without a kind"))?;
    let kind = Kind::parse(kind_name).ok_or_else(|| MarshalError::UnknownKind(kind_name.to_string()))?;

    let type_name = match map.get("type") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s.clone()),
        Some(other) => return Err(malformed(format!("type name {other} is not a string"))),
    };
    let identity = match map.get("id") {
        None | Some(JsonValue::Null) => None,
        Some(id) => Some(identity_from_json(id)?),
    };

    let value = map.get("value").unwrap_or(&JsonValue::Null);
    let body = match kind {
        Kind::Primitive | Kind::DateTime => NodeBody::Scalar(scalar_from_json(value)?),
        Kind::Array => NodeBody::Entries(entries_from_json(value)?),
        _ => match value {
            JsonValue::Array(_) => NodeBody::Entries(entries_from_json(value)?),
            other => NodeBody::Reference(identity_from_json(other)?),
        },
    };

    Ok(TaggedNode {
        kind,
        type_name,
        identity,
        body,
    })
}

fn entries_from_json(json: &JsonValue) -> Result<Vec<NodeEntry>> {
    let items = json
        .as_array()
        .ok_or_else(|| malformed(format!("expected an array of entries, got {json}")))?;
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let key = item
            .get("key")
            .ok_or_else(|| malformed("entry without a key"))
            .and_then(key_from_json)?;
        entries.push(NodeEntry::new(key, from_json(item)?));
    }
    Ok(entries)
}

fn key_from_json(json: &JsonValue) -> Result<Key> {
    match json {
        JsonValue::String(s) => Ok(Key::Str(s.clone())),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Key::Int)
            .ok_or_else(|| malformed(format!("key {n} is not an integer"))),
        other => Err(malformed(format!("key {other} is neither integer nor string"))),
    }
}

fn scalar_from_json(json: &JsonValue) -> Result<Scalar> {
    match json {
        JsonValue::Null => Ok(Scalar::Null),
        JsonValue::Bool(b) => Ok(Scalar::Bool(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Scalar::Int(i))
            } else if n.is_f64() {
                Ok(Scalar::Float(n.as_f64().unwrap_or_default()))
            } else {
                Err(malformed(format!("integer {n} out of range")))
            }
        }
        JsonValue::String(s) => Ok(Scalar::Str(s.clone())),
        other => Err(malformed(format!("expected a scalar, got {other}"))),
    }
}

fn identity_from_json(json: &JsonValue) -> Result<Identity> {
    json.as_u64()
        .map(Identity::new)
        .ok_or_else(|| malformed(format!("identity {json} is not an unsigned integer")))
}

/// Root marker of an encoded tree: the concrete type of the root object
pub fn root_type(json: &JsonValue) -> Option<&str> {
    json.get("type").and_then(JsonValue::as_str)
}

// ============================================================
// Byte encoding
// ============================================================

/// Encode a tree to bytes. Transport-safe output is pure ASCII.
///
/// Raw NUL bytes never appear in either mode: JSON escapes control
/// characters inside strings.
pub fn encode(node: &TaggedNode, transport_safe: bool) -> Result<Vec<u8>> {
    let json = to_json(node);
    let mut out = Vec::new();
    if transport_safe {
        let mut ser = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
        json.serialize(&mut ser)?;
    } else {
        serde_json::to_writer(&mut out, &json)?;
    }
    Ok(out)
}

/// Decode bytes to a tree.
///
/// Blank input, and input whose root carries no type marker, decode to
/// `None`: there is nothing to inflate.
pub fn decode(bytes: &[u8]) -> Result<Option<TaggedNode>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let json: JsonValue = serde_json::from_slice(bytes)?;
    if root_type(&json).is_none() {
        return Ok(None);
    }
    from_json(&json).map(Some)
}

/// Compact JSON formatter escaping every non-ASCII character as `\uXXXX`
#[derive(Debug, Clone, Copy, Default)]
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        let mut units = [0u16; 2];
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> TaggedNode {
        TaggedNode::object(
            Kind::DomainObject,
            "Post",
            Identity::new(1),
            vec![
                NodeEntry::new("title", TaggedNode::primitive(Scalar::Str("Hi".into()))),
                NodeEntry::new(
                    "tags",
                    TaggedNode::array(vec![
                        NodeEntry::new(0i64, TaggedNode::primitive(Scalar::Int(7))),
                        NodeEntry::new("0", TaggedNode::primitive(Scalar::Float(1.5))),
                    ]),
                ),
                NodeEntry::new("published", TaggedNode::datetime(-86400)),
                NodeEntry::new(
                    "parent",
                    TaggedNode::reference(Kind::DomainObject, "Post", Identity::new(1)),
                ),
            ],
        )
    }

    #[test]
    fn test_to_json_shape() {
        let expected = json!({
            "kind": "domain_object",
            "type": "Post",
            "id": 1,
            "value": [
                {"key": "title", "kind": "primitive", "value": "Hi"},
                {"key": "tags", "kind": "array", "value": [
                    {"key": 0, "kind": "primitive", "value": 7},
                    {"key": "0", "kind": "primitive", "value": 1.5}
                ]},
                {"key": "published", "kind": "datetime", "value": -86400},
                {"key": "parent", "kind": "domain_object", "type": "Post", "id": 1, "value": 1}
            ]
        });
        assert_eq!(to_json(&sample()), expected);
    }

    #[test]
    fn test_from_json_restores_tree() {
        let tree = sample();
        assert_eq!(from_json(&to_json(&tree)).unwrap(), tree);
    }

    #[test]
    fn test_float_stays_float() {
        let bytes = encode(&TaggedNode::primitive(Scalar::Float(2.0)), false).unwrap();
        let json: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            from_json(&json).unwrap().body,
            NodeBody::Scalar(Scalar::Float(2.0))
        );
    }

    #[test]
    fn test_unknown_kind() {
        let err = from_json(&json!({"kind": "closure", "value": null})).unwrap_err();
        assert!(matches!(err, MarshalError::UnknownKind(k) if k == "closure"));
    }

    #[test]
    fn test_malformed_entries() {
        let no_key = json!({"kind": "array", "value": [{"kind": "primitive", "value": 1}]});
        assert!(matches!(from_json(&no_key), Err(MarshalError::Malformed(_))));

        let float_key = json!({"kind": "array", "value": [{"key": 1.5, "kind": "primitive", "value": 1}]});
        assert!(matches!(from_json(&float_key), Err(MarshalError::Malformed(_))));

        let bad_ref = json!({"kind": "domain_object", "type": "Post", "value": "abc"});
        assert!(matches!(from_json(&bad_ref), Err(MarshalError::Malformed(_))));
    }

    #[test]
    fn test_transport_safe_is_ascii() {
        let node = TaggedNode::object(
            Kind::PlainObject,
            "Note",
            Identity::new(1),
            vec![NodeEntry::new(
                "text",
                TaggedNode::primitive(Scalar::Str("naïve 日本 🎉\0end".into())),
            )],
        );
        let bytes = encode(&node, true).unwrap();
        assert!(bytes.is_ascii());
        assert!(!bytes.contains(&0));

        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("na\\u00efve"));
        assert!(text.contains("\\ud83c\\udf89"));

        assert_eq!(decode(&bytes).unwrap(), Some(node));
    }

    #[test]
    fn test_plain_encoding_keeps_utf8() {
        let node = TaggedNode::primitive(Scalar::Str("日本".into()));
        let bytes = encode(&node, false).unwrap();
        assert!(!bytes.is_ascii());
    }

    #[test]
    fn test_decode_without_root_marker() {
        assert_eq!(decode(b"").unwrap(), None);
        assert_eq!(decode(b"  \n").unwrap(), None);
        assert_eq!(decode(b"null").unwrap(), None);
        assert_eq!(
            decode(br#"{"kind":"primitive","value":42}"#).unwrap(),
            None
        );
        assert!(matches!(decode(b"{not json"), Err(MarshalError::Json(_))));
    }
}
