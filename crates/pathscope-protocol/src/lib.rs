use std::borrow::Cow;
use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub mod kinds;

/// Backend graph id of a node.
pub type NodeId = i64;
/// Backend graph id of a relationship.
pub type RelationshipId = i64;

/// Search endpoint payload: result key (the node id) to node record.
pub type SearchResponse = BTreeMap<String, Node>;

/// Canonical array-index key: a decimal integer with no sign or leading zero.
fn index_key(key: &str) -> Option<u32> {
    let index: u32 = key.parse().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

/// Flattens a search payload: integer keys in numeric order, then the rest
/// in key order.
pub fn search_results(response: SearchResponse) -> Vec<Node> {
    let mut entries: Vec<(String, Node)> = response.into_iter().collect();
    entries.sort_by_cached_key(|(key, _)| match index_key(key) {
        Some(index) => (false, index),
        None => (true, 0),
    });
    entries.into_iter().map(|(_, node)| node).collect()
}

/// The backend serialises empty Go maps and slices as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Property bag attached to nodes and relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Properties {
    #[serde(default, deserialize_with = "null_as_default")]
    pub map: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deleted: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub modified: BTreeMap<String, Value>,
}

impl Properties {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.map.insert(key.into(), value.into());
        self
    }

    /// String view of a property. Numbers and booleans are rendered; other
    /// shapes are treated as absent.
    pub fn get_str(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.map.get(key)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Integer `layer` tag. The backend string-encodes it; plain numbers are
    /// accepted too.
    pub fn layer(&self) -> Option<i64> {
        match self.map.get("layer")? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kinds: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Properties,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            kinds: Vec::new(),
            properties: Properties::default(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties = self.properties.with(key, value);
        self
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k == kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Relationship {
    #[serde(rename = "ID")]
    pub id: RelationshipId,
    #[serde(rename = "StartID")]
    pub start_id: NodeId,
    #[serde(rename = "EndID")]
    pub end_id: NodeId,
    #[serde(rename = "Kind", default)]
    pub kind: String,
    #[serde(rename = "Properties", default, deserialize_with = "null_as_default")]
    pub properties: Properties,
}

impl Relationship {
    pub fn new(
        id: RelationshipId,
        start_id: NodeId,
        end_id: NodeId,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id,
            start_id,
            end_id,
            kind: kind.into(),
            properties: Properties::default(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties = self.properties.with(key, value);
        self
    }

    pub fn layer(&self) -> Option<i64> {
        self.properties.layer()
    }
}

/// Ordered node and edge sequence returned by a path query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Path {
    #[serde(rename = "Nodes", default, deserialize_with = "null_as_default")]
    pub nodes: Vec<Node>,
    #[serde(rename = "Edges", default, deserialize_with = "null_as_default")]
    pub edges: Vec<Relationship>,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// One row of a principal → resource permission listing, carrying the path
/// that grants it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionPathEntry {
    pub principal_id: NodeId,
    #[serde(default)]
    pub principal_arn: String,
    #[serde(default)]
    pub resource_id: Option<NodeId>,
    #[serde(default)]
    pub resource_arn: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub path: Path,
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub statement: Option<Node>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conditions: Vec<Node>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relationship_uses_backend_field_names() {
        let rel: Relationship = serde_json::from_value(json!({
            "ID": 7,
            "StartID": 1,
            "EndID": 2,
            "Kind": "MemberOf",
            "Properties": { "map": { "layer": "2" }, "deleted": {}, "modified": {} }
        }))
        .unwrap();
        assert_eq!(rel.id, 7);
        assert_eq!(rel.start_id, 1);
        assert_eq!(rel.end_id, 2);
        assert_eq!(rel.layer(), Some(2));
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let path: Path = serde_json::from_value(json!({ "Nodes": null, "Edges": null })).unwrap();
        assert!(path.is_empty());

        let node: Node = serde_json::from_value(json!({
            "id": 3,
            "kinds": null,
            "properties": { "map": null, "deleted": null, "modified": null }
        }))
        .unwrap();
        assert!(node.kinds.is_empty());
        assert!(node.properties.map.is_empty());
    }

    #[test]
    fn layer_accepts_numbers_and_rejects_garbage() {
        let numeric = Properties::default().with("layer", 1);
        assert_eq!(numeric.layer(), Some(1));
        let garbage = Properties::default().with("layer", "two");
        assert_eq!(garbage.layer(), None);
        assert_eq!(Properties::default().layer(), None);
    }

    #[test]
    fn get_str_renders_scalars() {
        let props = Properties::default()
            .with("name", "alice")
            .with("count", 4)
            .with("flag", true)
            .with("nested", json!({"a": 1}));
        assert_eq!(props.get_str("name").as_deref(), Some("alice"));
        assert_eq!(props.get_str("count").as_deref(), Some("4"));
        assert_eq!(props.get_str("flag").as_deref(), Some("true"));
        assert_eq!(props.get_str("nested"), None);
    }

    #[test]
    fn search_results_order_numeric_keys_by_value() {
        let response: SearchResponse = serde_json::from_value(json!({
            "100": { "id": 100 },
            "9": { "id": 9 },
            "arn": { "id": 2 },
            "10": { "id": 10 },
            "007": { "id": 7 },
        }))
        .unwrap();
        let ids: Vec<NodeId> = search_results(response).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![9, 10, 100, 7, 2]);
    }
}
