//! Schema-less content tree

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use super::blob::BinaryHandle;

/// One node of an editable content tree
///
/// Mirrors `serde_json::Value` with one extra variant for binary handles,
/// which are shared with the editing host and never serialized as bytes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ContentNode {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<ContentNode>),
    Object(BTreeMap<String, ContentNode>),
    Blob(BinaryHandle),
}

impl ContentNode {
    /// Build an object node from `(key, value)` pairs
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ContentNode)>,
    {
        ContentNode::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn string(value: impl Into<String>) -> Self {
        ContentNode::String(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContentNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ContentNode>> {
        match self {
            ContentNode::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, ContentNode>> {
        match self {
            ContentNode::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ContentNode]> {
        match self {
            ContentNode::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&BinaryHandle> {
        match self {
            ContentNode::Blob(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ContentNode::Null)
    }

    /// Field lookup on object nodes; `None` for every other shape
    pub fn get(&self, key: &str) -> Option<&ContentNode> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// String field lookup on object nodes
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ContentNode::as_str)
    }

    /// Short shape name for log messages
    pub fn kind(&self) -> &'static str {
        match self {
            ContentNode::Null => "null",
            ContentNode::Bool(_) => "bool",
            ContentNode::Number(_) => "number",
            ContentNode::String(_) => "string",
            ContentNode::Array(_) => "array",
            ContentNode::Object(_) => "object",
            ContentNode::Blob(_) => "blob",
        }
    }

    /// Whether the node can be walked as a document root
    pub fn is_traversable(&self) -> bool {
        matches!(self, ContentNode::Array(_) | ContentNode::Object(_))
    }

    /// Every binary handle reachable from this node, in traversal order
    pub fn handles(&self) -> Vec<BinaryHandle> {
        let mut out = Vec::new();
        self.collect_handles(&mut out);
        out
    }

    fn collect_handles(&self, out: &mut Vec<BinaryHandle>) {
        match self {
            ContentNode::Blob(handle) => out.push(handle.clone()),
            ContentNode::Array(items) => items.iter().for_each(|item| item.collect_handles(out)),
            ContentNode::Object(map) => map.values().for_each(|value| value.collect_handles(out)),
            _ => {}
        }
    }

    /// Convert to JSON. Handles are written as their blob URL.
    pub fn to_json(&self) -> Value {
        match self {
            ContentNode::Null => Value::Null,
            ContentNode::Bool(b) => Value::Bool(*b),
            ContentNode::Number(n) => Value::Number(n.clone()),
            ContentNode::String(s) => Value::String(s.clone()),
            ContentNode::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ContentNode::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            ContentNode::Blob(handle) => Value::String(handle.url().to_string()),
        }
    }
}

impl From<Value> for ContentNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ContentNode::Null,
            Value::Bool(b) => ContentNode::Bool(b),
            Value::Number(n) => ContentNode::Number(n),
            Value::String(s) => ContentNode::String(s),
            Value::Array(items) => ContentNode::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                ContentNode::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for ContentNode {
    fn from(value: &str) -> Self {
        ContentNode::String(value.to_string())
    }
}

impl From<BinaryHandle> for ContentNode {
    fn from(handle: BinaryHandle) -> Self {
        ContentNode::Blob(handle)
    }
}
