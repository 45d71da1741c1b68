//! Two-anchor path queries.

use pathscope_protocol::{Node, NodeId};
use serde::Serialize;
use tracing::debug;

use crate::coordinator::{AsyncQueryCoordinator, QueryIntent, QueryOutput, Ticket};
use crate::gateway::{PathKind, PathQuery, QueryGateway, Requests};

/// Which path query the pathfinder issues between its anchors.
pub type PathMode = PathKind;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Pathfinder {
    mode: PathMode,
    action: Option<String>,
    anchors: Vec<Node>,
}

impl Pathfinder {
    pub fn new(mode: PathMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> PathMode {
        self.mode
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn anchors(&self) -> &[Node] {
        &self.anchors
    }

    pub fn anchor_ids(&self) -> Vec<NodeId> {
        self.anchors.iter().map(|n| n.id).collect()
    }

    /// Appends `node` as an anchor unless it already is one.
    pub fn pick(&mut self, node: Node) -> bool {
        if self.anchors.iter().any(|a| a.id == node.id) {
            return false;
        }
        self.anchors.push(node);
        true
    }

    /// Returns whether the mode changed.
    pub fn set_mode(&mut self, mode: PathMode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }

    /// Narrows permission paths to one action. Blank input clears it.
    pub fn set_action(&mut self, action: Option<String>) -> bool {
        let action = action
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        let changed = self.action != action;
        self.action = action;
        changed
    }

    pub fn clear_anchors(&mut self, coordinator: &mut AsyncQueryCoordinator) {
        coordinator.cancel(&QueryIntent::Pathfinder);
        self.anchors.clear();
    }

    /// The query between the first two anchors, if there are two.
    pub fn query(&self) -> Option<PathQuery> {
        let [start, end, ..] = self.anchors.as_slice() else {
            return None;
        };
        let mut query = PathQuery::new(self.mode, start.id, end.id);
        if self.mode == PathKind::Permission {
            if let Some(action) = &self.action {
                query = query.with_action(action.clone());
            }
        }
        Some(query)
    }

    /// Issues the current query, superseding any in-flight one.
    pub fn dispatch<G: QueryGateway>(
        &self,
        coordinator: &mut AsyncQueryCoordinator,
        requests: &Requests<G>,
    ) -> Option<Ticket> {
        let query = self.query()?;
        debug!(
            target: "pathscope::pathfinder",
            kind = query.kind.segment(),
            start = query.start,
            end = query.end,
            action = ?query.action,
            "dispatching path query"
        );
        let pending = requests.paths(query).map(QueryOutput::Paths);
        Some(coordinator.dispatch(QueryIntent::Pathfinder, pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_needs_two_anchors_and_uses_the_first_two() {
        let mut finder = Pathfinder::default();
        assert!(finder.query().is_none());
        finder.pick(Node::new(10));
        assert!(finder.query().is_none());
        finder.pick(Node::new(20));
        finder.pick(Node::new(30));
        assert_eq!(
            finder.query(),
            Some(PathQuery::new(PathKind::Identity, 10, 20))
        );
    }

    #[test]
    fn duplicate_anchor_is_ignored() {
        let mut finder = Pathfinder::default();
        assert!(finder.pick(Node::new(10)));
        assert!(!finder.pick(Node::new(10)));
        assert_eq!(finder.anchor_ids(), vec![10]);
    }

    #[test]
    fn action_only_narrows_permission_queries() {
        let mut finder = Pathfinder::new(PathKind::Shortest);
        finder.pick(Node::new(1));
        finder.pick(Node::new(2));
        assert!(finder.set_action(Some(" s3:GetObject ".into())));
        assert_eq!(finder.query().and_then(|q| q.action), None);

        assert!(finder.set_mode(PathKind::Permission));
        assert!(!finder.set_mode(PathKind::Permission));
        assert_eq!(
            finder.query().and_then(|q| q.action).as_deref(),
            Some("s3:GetObject")
        );

        assert!(finder.set_action(Some("  ".into())));
        assert_eq!(finder.action(), None);
    }
}
