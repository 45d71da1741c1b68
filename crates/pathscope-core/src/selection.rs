use pathscope_protocol::{Node, NodeId, Relationship, RelationshipId};
use serde::Serialize;
use tracing::debug;

use crate::config::SelectionConfig;
use crate::coordinator::{AsyncQueryCoordinator, Generation, QueryIntent, QueryOutput, Ticket};
use crate::gateway::{QueryGateway, Requests};
use crate::store::{ActiveElement, GraphStateStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SelectionPhase {
    #[default]
    Idle,
    Pending {
        generation: Generation,
    },
    Active,
}

/// Outcome of applying a fetched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Activated,
    /// The edge was fetched but sits on a layer that is not selectable.
    Filtered,
}

/// Click-to-inspect for nodes and edges. Node and edge clicks share the
/// `Selection` intent, so the last click wins regardless of element type.
#[derive(Debug, Clone)]
pub struct SelectionController {
    selectable_edge_layer: i64,
    phase: SelectionPhase,
}

impl SelectionController {
    pub fn new(config: &SelectionConfig) -> Self {
        Self {
            selectable_edge_layer: config.selectable_edge_layer,
            phase: SelectionPhase::Idle,
        }
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn selectable_edge_layer(&self) -> i64 {
        self.selectable_edge_layer
    }

    pub fn select_node<G: QueryGateway>(
        &mut self,
        coordinator: &mut AsyncQueryCoordinator,
        requests: &Requests<G>,
        id: NodeId,
    ) -> Ticket {
        let query = requests.node(id).map(QueryOutput::SelectedNode);
        let ticket = coordinator.dispatch(QueryIntent::Selection, query);
        self.phase = SelectionPhase::Pending {
            generation: ticket.generation,
        };
        ticket
    }

    pub fn select_edge<G: QueryGateway>(
        &mut self,
        coordinator: &mut AsyncQueryCoordinator,
        requests: &Requests<G>,
        id: RelationshipId,
    ) -> Ticket {
        let query = requests.relationship(id).map(QueryOutput::SelectedEdge);
        let ticket = coordinator.dispatch(QueryIntent::Selection, query);
        self.phase = SelectionPhase::Pending {
            generation: ticket.generation,
        };
        ticket
    }

    /// Drops the active element and abandons any pending fetch.
    pub fn clear_selection(
        &mut self,
        coordinator: &mut AsyncQueryCoordinator,
        store: &mut GraphStateStore,
    ) {
        coordinator.cancel(&QueryIntent::Selection);
        store.set_active_element(ActiveElement::None);
        self.phase = SelectionPhase::Idle;
    }

    pub fn resolve_node(&mut self, store: &mut GraphStateStore, node: Node) -> Resolution {
        debug!(target: "pathscope::selection", id = node.id, "node selected");
        store.set_active_element(ActiveElement::Node(node));
        self.phase = SelectionPhase::Active;
        Resolution::Activated
    }

    pub fn resolve_edge(&mut self, store: &mut GraphStateStore, edge: Relationship) -> Resolution {
        if edge.layer() != Some(self.selectable_edge_layer) {
            debug!(
                target: "pathscope::selection",
                id = edge.id,
                layer = ?edge.layer(),
                "edge not on selectable layer"
            );
            self.settle_unchanged(store);
            return Resolution::Filtered;
        }
        debug!(target: "pathscope::selection", id = edge.id, "edge selected");
        store.set_active_element(ActiveElement::Edge(edge));
        self.phase = SelectionPhase::Active;
        Resolution::Activated
    }

    /// A fetch failed or came back empty; whatever was active stays active.
    pub fn reject(&mut self, store: &GraphStateStore) {
        self.settle_unchanged(store);
    }

    fn settle_unchanged(&mut self, store: &GraphStateStore) {
        self.phase = if store.active().is_none() {
            SelectionPhase::Idle
        } else {
            SelectionPhase::Active
        };
    }
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(&SelectionConfig::default())
    }
}

/// Nodes kept open in the tab strip until explicitly closed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PinnedTabs {
    tabs: Vec<Node>,
}

impl PinnedTabs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins `node`, refreshing the stored record if it is already open.
    /// Returns whether a new tab was opened.
    pub fn pin(&mut self, node: Node) -> bool {
        match self.tabs.iter_mut().find(|tab| tab.id == node.id) {
            Some(existing) => {
                *existing = node;
                false
            }
            None => {
                self.tabs.push(node);
                true
            }
        }
    }

    pub fn close(&mut self, id: NodeId) -> Option<Node> {
        let pos = self.tabs.iter().position(|tab| tab.id == id)?;
        Some(self.tabs.remove(pos))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.tabs.iter()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.tabs.iter().map(|tab| tab.id).collect()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: i64, layer: &str) -> Relationship {
        Relationship::new(id, 1, 2, "ActsOn").with_property("layer", layer)
    }

    #[test]
    fn selectable_layer_edges_become_active() {
        let mut selection = SelectionController::default();
        let mut store = GraphStateStore::new();
        assert_eq!(
            selection.resolve_edge(&mut store, edge(30, "2")),
            Resolution::Activated
        );
        assert_eq!(store.selections(), ["30".to_string()]);
        assert_eq!(selection.phase(), SelectionPhase::Active);
    }

    #[test]
    fn other_layers_leave_active_element_unchanged() {
        let mut selection = SelectionController::default();
        let mut store = GraphStateStore::new();
        selection.resolve_node(&mut store, Node::new(4));
        assert_eq!(
            selection.resolve_edge(&mut store, edge(31, "1")),
            Resolution::Filtered
        );
        assert_eq!(store.active().as_node().map(|n| n.id), Some(4));
        assert_eq!(selection.phase(), SelectionPhase::Active);

        let mut empty = GraphStateStore::new();
        let mut idle = SelectionController::default();
        idle.resolve_edge(&mut empty, Relationship::new(32, 1, 2, "ActsOn"));
        assert!(empty.active().is_none());
        assert_eq!(idle.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn configured_layer_replaces_the_default() {
        let mut selection = SelectionController::new(&SelectionConfig {
            selectable_edge_layer: 3,
        });
        let mut store = GraphStateStore::new();
        assert_eq!(
            selection.resolve_edge(&mut store, edge(1, "2")),
            Resolution::Filtered
        );
        assert_eq!(
            selection.resolve_edge(&mut store, edge(2, "3")),
            Resolution::Activated
        );
    }

    #[test]
    fn reject_keeps_prior_selection() {
        let mut selection = SelectionController::default();
        let mut store = GraphStateStore::new();
        selection.reject(&store);
        assert_eq!(selection.phase(), SelectionPhase::Idle);
        selection.resolve_node(&mut store, Node::new(9));
        selection.reject(&store);
        assert_eq!(selection.phase(), SelectionPhase::Active);
        assert_eq!(store.selections(), ["9".to_string()]);
    }

    #[test]
    fn tabs_keep_insertion_order_and_refresh_in_place() {
        let mut tabs = PinnedTabs::new();
        assert!(tabs.pin(Node::new(3)));
        assert!(tabs.pin(Node::new(1)));
        assert!(!tabs.pin(Node::new(3).with_property("name", "fresh")));
        assert_eq!(tabs.ids(), vec![3, 1]);
        assert_eq!(
            tabs.get(3).and_then(|n| n.properties.get_str("name")).as_deref(),
            Some("fresh")
        );
        assert_eq!(tabs.close(3).map(|n| n.id), Some(3));
        assert!(tabs.close(3).is_none());
        assert_eq!(tabs.len(), 1);
    }
}
