//! Canonical set of rendered nodes and edges plus the active selection.
//!
//! The store is the only owner of its collections. Every other component
//! mutates it through the primitives below; none of them can fail.

use std::collections::{HashMap, HashSet};

use pathscope_protocol::{Node, Relationship};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::projection::{GraphEdge, GraphNode};

/// The element shown in the detail panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "element", rename_all = "snake_case")]
pub enum ActiveElement {
    #[default]
    None,
    Node(Node),
    Edge(Relationship),
}

impl ActiveElement {
    /// Renderer id of the selected element.
    pub fn id(&self) -> Option<String> {
        match self {
            ActiveElement::None => None,
            ActiveElement::Node(node) => Some(node.id.to_string()),
            ActiveElement::Edge(rel) => Some(rel.id.to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ActiveElement::None)
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            ActiveElement::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Relationship> {
        match self {
            ActiveElement::Edge(rel) => Some(rel),
            _ => None,
        }
    }
}

/// Serializable copy of the store for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub active: ActiveElement,
    pub selections: Vec<String>,
}

#[derive(Debug, Default)]
pub struct GraphStateStore {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    active: ActiveElement,
    selections: Vec<String>,
    revision: u64,
}

impl GraphStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `node` unless its id is already present. Returns whether an
    /// insertion happened; an existing entry is never updated.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.index.contains_key(&node.id) {
            trace!(target: "pathscope::store", id = %node.id, "node already present");
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        self.bump();
        true
    }

    /// Appends `edge`. Edges are not deduplicated by id.
    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.edges.push(edge);
        self.bump();
    }

    /// Bulk replace; later duplicates of an id are dropped.
    pub fn set_nodes(&mut self, nodes: Vec<GraphNode>) {
        let mut index = HashMap::with_capacity(nodes.len());
        let mut kept = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !index.contains_key(&node.id) {
                index.insert(node.id.clone(), kept.len());
                kept.push(node);
            }
        }
        if kept == self.nodes {
            return;
        }
        self.nodes = kept;
        self.index = index;
        self.bump();
    }

    pub fn set_edges(&mut self, edges: Vec<GraphEdge>) {
        if edges == self.edges {
            return;
        }
        self.edges = edges;
        self.bump();
    }

    /// Replaces the active element and the highlight set together.
    pub fn set_active_element(&mut self, element: ActiveElement) {
        if element == self.active {
            return;
        }
        self.selections = element.id().into_iter().collect();
        self.active = element;
        self.bump();
    }

    /// User-initiated graph reset.
    pub fn clear(&mut self) {
        self.set_nodes(Vec::new());
        self.set_edges(Vec::new());
        self.set_active_element(ActiveElement::None);
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn active(&self) -> &ActiveElement {
        &self.active
    }

    pub fn selections(&self) -> &[String] {
        &self.selections
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Bumped on every mutation that changed something.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Edges referencing at least one node that is not in the store.
    pub fn dangling_edges(&self) -> Vec<&GraphEdge> {
        self.edges
            .iter()
            .filter(|e| !self.contains_node(&e.source) || !self.contains_node(&e.target))
            .collect()
    }

    /// Distinct edge ids, for callers that want to detect repeated merges.
    pub fn distinct_edge_ids(&self) -> HashSet<&str> {
        self.edges.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            active: self.active.clone(),
            selections: self.selections.clone(),
        }
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gnode(id: &str, label: &str) -> GraphNode {
        GraphNode {
            id: id.into(),
            label: label.into(),
            icon: String::new(),
            fill: None,
        }
    }

    fn gedge(id: &str, source: &str, target: &str) -> GraphEdge {
        GraphEdge {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: "MemberOf".into(),
            weight: 3,
        }
    }

    #[test]
    fn first_insertion_wins() {
        let mut store = GraphStateStore::new();
        assert!(store.add_node(gnode("1", "first")));
        store.add_edge(gedge("e", "1", "1"));
        assert!(!store.add_node(gnode("1", "second")));
        store.set_active_element(ActiveElement::Node(Node::new(1)));
        assert!(!store.add_node(gnode("1", "third")));

        assert_eq!(store.node_count(), 1);
        assert_eq!(store.node("1").map(|n| n.label.as_str()), Some("first"));
    }

    #[test]
    fn add_node_leaves_selection_alone() {
        let mut store = GraphStateStore::new();
        store.set_active_element(ActiveElement::Node(Node::new(4)));
        store.add_node(gnode("5", "five"));
        assert_eq!(store.selections(), ["4".to_string()]);
        assert_eq!(store.active().as_node().map(|n| n.id), Some(4));
    }

    #[test]
    fn edges_accumulate_without_dedup() {
        let mut store = GraphStateStore::new();
        store.add_node(gnode("1", "a"));
        store.add_node(gnode("2", "b"));
        store.add_edge(gedge("9", "1", "2"));
        store.add_edge(gedge("9", "1", "2"));
        assert_eq!(store.edge_count(), 2);
        assert_eq!(store.distinct_edge_ids().len(), 1);
        assert!(store.dangling_edges().is_empty());
    }

    #[test]
    fn dangling_edges_are_reported() {
        let mut store = GraphStateStore::new();
        store.add_node(gnode("1", "a"));
        store.add_edge(gedge("9", "1", "2"));
        let dangling = store.dangling_edges();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].target, "2");
    }

    #[test]
    fn active_element_drives_highlight_set() {
        let mut store = GraphStateStore::new();
        store.set_active_element(ActiveElement::Edge(Relationship::new(30, 1, 2, "ActsOn")));
        assert_eq!(store.selections(), ["30".to_string()]);
        store.set_active_element(ActiveElement::Node(Node::new(8)));
        assert_eq!(store.selections(), ["8".to_string()]);
        store.set_active_element(ActiveElement::None);
        assert!(store.selections().is_empty());
        assert!(store.active().is_none());
    }

    #[test]
    fn clear_resets_everything_and_allows_reinsertion() {
        let mut store = GraphStateStore::new();
        store.add_node(gnode("1", "old"));
        store.add_edge(gedge("9", "1", "1"));
        store.set_active_element(ActiveElement::Node(Node::new(1)));
        let before = store.revision();
        store.clear();
        assert!(store.is_empty());
        assert!(store.active().is_none());
        assert!(store.revision() > before);
        assert!(store.add_node(gnode("1", "new")));
        assert_eq!(store.node("1").map(|n| n.label.as_str()), Some("new"));
    }

    #[test]
    fn set_nodes_keeps_ids_unique() {
        let mut store = GraphStateStore::new();
        store.set_nodes(vec![gnode("1", "a"), gnode("1", "b"), gnode("2", "c")]);
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.node("1").map(|n| n.label.as_str()), Some("a"));
    }

    #[test]
    fn snapshot_serializes_tagged_active_element() {
        let mut store = GraphStateStore::new();
        store.add_node(gnode("1", "a"));
        store.set_active_element(ActiveElement::Node(Node::new(1)));
        let json = serde_json::to_value(store.snapshot()).expect("json");
        assert_eq!(json["active"]["type"], "node");
        assert_eq!(json["active"]["element"]["id"], 1);
        assert_eq!(json["selections"][0], "1");
    }

    #[test]
    fn revision_ignores_mutations_that_change_nothing() {
        let mut store = GraphStateStore::new();
        store.set_active_element(ActiveElement::None);
        store.set_edges(Vec::new());
        store.set_nodes(Vec::new());
        store.clear();
        assert_eq!(store.revision(), 0);

        store.add_node(gnode("1", "a"));
        store.set_active_element(ActiveElement::Node(Node::new(1)));
        let before = store.revision();
        store.set_active_element(ActiveElement::Node(Node::new(1)));
        store.set_nodes(vec![gnode("1", "a")]);
        assert_eq!(store.revision(), before);
        assert_eq!(store.selections(), ["1".to_string()]);
    }
}
