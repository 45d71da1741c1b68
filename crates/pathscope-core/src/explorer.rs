//! Account tree browsing. Listings never touch the graph store.

use std::collections::BTreeMap;

use pathscope_protocol::{Node, NodeId};
use serde::Serialize;
use tracing::debug;

use crate::coordinator::{AsyncQueryCoordinator, QueryIntent, QueryOutput, Ticket};
use crate::gateway::{NodeFilter, QueryGateway, Requests};
use crate::projection::node_label;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplorerEntry {
    pub id: NodeId,
    pub label: String,
    pub kind: String,
}

impl ExplorerEntry {
    fn from_node(node: &Node, kind: &str) -> Self {
        Self {
            id: node.id,
            label: node_label(node),
            kind: kind.to_string(),
        }
    }
}

/// Folder key for an account/kind pair.
pub fn folder_key(account_id: &str, kind: &str) -> String {
    format!("{account_id}/{kind}")
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeExplorer {
    accounts: Vec<String>,
    listings: BTreeMap<String, Vec<ExplorerEntry>>,
}

impl NodeExplorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn listing(&self, folder: &str) -> Option<&[ExplorerEntry]> {
        self.listings.get(folder).map(Vec::as_slice)
    }

    pub fn load_accounts<G: QueryGateway>(
        &self,
        coordinator: &mut AsyncQueryCoordinator,
        requests: &Requests<G>,
    ) -> Ticket {
        let query = requests.accounts().map(QueryOutput::Accounts);
        coordinator.dispatch(QueryIntent::scoped("accounts"), query)
    }

    /// Lists nodes of `kind` in `account_id`. Each folder has its own scope,
    /// so open folders load side by side; re-expanding a folder supersedes
    /// its pending listing.
    pub fn expand<G: QueryGateway>(
        &self,
        coordinator: &mut AsyncQueryCoordinator,
        requests: &Requests<G>,
        account_id: &str,
        kind: &str,
    ) -> Ticket {
        let parent = folder_key(account_id, kind);
        let intent = QueryIntent::scoped(format!("explorer/{parent}"));
        let filter = NodeFilter::kind(kind).in_account(account_id);
        let query = requests
            .nodes(filter)
            .map(move |nodes| QueryOutput::Listing { parent, nodes });
        coordinator.dispatch(intent, query)
    }

    /// Fetches a node for the tab strip; each node id gets its own scope.
    pub fn open<G: QueryGateway>(
        &self,
        coordinator: &mut AsyncQueryCoordinator,
        requests: &Requests<G>,
        id: NodeId,
    ) -> Ticket {
        let query = requests.node(id).map(QueryOutput::Tab);
        coordinator.dispatch(QueryIntent::scoped(format!("tab/{id}")), query)
    }

    pub fn apply_accounts(&mut self, mut accounts: Vec<String>) -> &[String] {
        accounts.sort();
        accounts.dedup();
        self.accounts = accounts;
        &self.accounts
    }

    pub fn apply_listing(&mut self, parent: String, nodes: &[Node]) -> &[ExplorerEntry] {
        let kind = parent.rsplit('/').next().unwrap_or_default().to_string();
        let entries: Vec<ExplorerEntry> = nodes
            .iter()
            .filter(|n| n.id != 0)
            .map(|n| ExplorerEntry::from_node(n, &kind))
            .collect();
        debug!(target: "pathscope::explorer", %parent, entries = entries.len(), "listing loaded");
        self.listings.insert(parent.clone(), entries);
        self.listings
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn collapse(&mut self, folder: &str) -> bool {
        self.listings.remove(folder).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathscope_protocol::kinds;

    #[test]
    fn listing_entries_use_node_labels() {
        let mut explorer = NodeExplorer::new();
        let nodes = vec![
            Node::new(4)
                .with_kind(kinds::AWS_ROLE)
                .with_property("rolename", "deployer"),
            Node::new(0),
            Node::new(5).with_kind(kinds::AWS_ROLE),
        ];
        let key = folder_key("1234", kinds::AWS_ROLE);
        let entries = explorer.apply_listing(key.clone(), &nodes).to_vec();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "deployer");
        assert_eq!(entries[0].kind, kinds::AWS_ROLE);
        assert_eq!(entries[1].label, "5");
        assert!(explorer.listing(&key).is_some());
        assert!(explorer.collapse(&key));
        assert!(explorer.listing(&key).is_none());
    }

    #[test]
    fn accounts_are_sorted_and_unique() {
        let mut explorer = NodeExplorer::new();
        explorer.apply_accounts(vec!["2".into(), "1".into(), "2".into()]);
        assert_eq!(explorer.accounts(), ["1".to_string(), "2".to_string()]);
    }
}
