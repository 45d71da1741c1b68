use pathscope_protocol::{ActionPathEntry, Node, Path, Relationship};
use serde::Serialize;
use tracing::debug;

use crate::projection::Projector;
use crate::store::GraphStateStore;

/// Counts of what a merge actually inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub paths: usize,
    pub nodes_added: usize,
    pub edges_added: usize,
}

impl MergeReport {
    pub fn absorb(&mut self, other: MergeReport) {
        self.paths += other.paths;
        self.nodes_added += other.nodes_added;
        self.edges_added += other.edges_added;
    }
}

/// Folds path query results into the store.
///
/// Nodes are inserted before edges so that every edge of a well-formed path
/// finds both endpoints present.
#[derive(Debug, Clone, Default)]
pub struct PathMergeEngine {
    projector: Projector,
}

impl PathMergeEngine {
    pub fn new(projector: Projector) -> Self {
        Self { projector }
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn merge_node(&self, store: &mut GraphStateStore, node: &Node) -> bool {
        store.add_node(self.projector.node(node))
    }

    pub fn merge_edge(&self, store: &mut GraphStateStore, edge: &Relationship) {
        store.add_edge(self.projector.edge(edge));
    }

    pub fn merge_path(&self, store: &mut GraphStateStore, path: &Path) -> MergeReport {
        let mut report = MergeReport {
            paths: 1,
            ..MergeReport::default()
        };
        for node in &path.nodes {
            if self.merge_node(store, node) {
                report.nodes_added += 1;
            }
        }
        for edge in &path.edges {
            self.merge_edge(store, edge);
            report.edges_added += 1;
        }
        report
    }

    /// Merges `paths` in the order received.
    pub fn merge_paths(&self, store: &mut GraphStateStore, paths: &[Path]) -> MergeReport {
        let mut report = MergeReport::default();
        for path in paths {
            report.absorb(self.merge_path(store, path));
        }
        debug!(
            target: "pathscope::merge",
            paths = report.paths,
            nodes_added = report.nodes_added,
            edges_added = report.edges_added,
            "merged paths"
        );
        report
    }

    pub fn merge_action_paths(
        &self,
        store: &mut GraphStateStore,
        entries: &[ActionPathEntry],
    ) -> MergeReport {
        let mut report = MergeReport::default();
        for entry in entries {
            report.absorb(self.merge_path(store, &entry.path));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathscope_protocol::kinds;

    fn path(nodes: &[i64], edges: &[(i64, i64, i64)]) -> Path {
        Path {
            nodes: nodes
                .iter()
                .map(|&id| Node::new(id).with_kind(kinds::AWS_ROLE))
                .collect(),
            edges: edges
                .iter()
                .map(|&(id, s, t)| Relationship::new(id, s, t, "MemberOf"))
                .collect(),
        }
    }

    #[test]
    fn empty_paths_are_no_ops() {
        let engine = PathMergeEngine::default();
        let mut store = GraphStateStore::new();
        let report = engine.merge_paths(&mut store, &[Path::default(), Path::default()]);
        assert_eq!(report.nodes_added, 0);
        assert_eq!(report.edges_added, 0);
        assert!(store.is_empty());
        assert_eq!(engine.merge_paths(&mut store, &[]), MergeReport::default());
    }

    #[test]
    fn shared_intermediate_collapses_to_one_node() {
        let engine = PathMergeEngine::default();
        let mut store = GraphStateStore::new();
        let a = path(&[1, 50, 2], &[(100, 1, 50), (101, 50, 2)]);
        let b = path(&[3, 50, 2], &[(102, 3, 50), (103, 50, 2)]);
        let report = engine.merge_paths(&mut store, &[a, b]);

        assert_eq!(store.node_count(), 4);
        assert_eq!(store.edge_count(), 4);
        assert_eq!(report.nodes_added, 4);
        assert_eq!(report.edges_added, 4);
        assert!(store.dangling_edges().is_empty());
    }

    #[test]
    fn nodes_keep_first_merge_order() {
        let engine = PathMergeEngine::default();
        let mut store = GraphStateStore::new();
        engine.merge_paths(
            &mut store,
            &[path(&[5, 6], &[(1, 5, 6)]), path(&[7, 5], &[(2, 7, 5)])],
        );
        let ids: Vec<&str> = store.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["5", "6", "7"]);
    }

    #[test]
    fn action_entries_merge_their_paths() {
        let engine = PathMergeEngine::default();
        let mut store = GraphStateStore::new();
        let entry = ActionPathEntry {
            principal_id: 1,
            action: "s3:GetObject".into(),
            path: path(&[1, 2], &[(9, 1, 2)]),
            ..ActionPathEntry::default()
        };
        let report = engine.merge_action_paths(&mut store, &[entry]);
        assert_eq!(report.paths, 1);
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
    }
}
