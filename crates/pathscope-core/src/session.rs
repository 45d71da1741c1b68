use std::sync::Arc;

use pathscope_events::{topics, Bus};
use pathscope_protocol::{Node, NodeId, RelationshipId};
use serde_json::json;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::coordinator::{
    AsyncQueryCoordinator, CoordinatorStats, QueryIntent, QueryOutput, Settled, Ticket,
};
use crate::error::QueryError;
use crate::explorer::{ExplorerEntry, NodeExplorer};
use crate::gateway::{PathKind, PathQuery, QueryGateway, Requests};
use crate::merge::{MergeReport, PathMergeEngine};
use crate::pathfinder::{PathMode, Pathfinder};
use crate::projection::Projector;
use crate::search::{SearchState, Suggestions};
use crate::selection::{PinnedTabs, Resolution, SelectionController};
use crate::store::{ActiveElement, GraphSnapshot, GraphStateStore};

/// What applying one settled query changed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SuggestionsUpdated(Suggestions),
    GraphMerged {
        intent: QueryIntent,
        report: MergeReport,
    },
    SelectionChanged(ActiveElement),
    /// A clicked edge was fetched but is not on the selectable layer.
    EdgeFiltered {
        id: RelationshipId,
        layer: Option<i64>,
    },
    AccountsLoaded(Vec<String>),
    ListingLoaded {
        parent: String,
        entries: Vec<ExplorerEntry>,
    },
    TabPinned(NodeId),
    NotFound {
        intent: QueryIntent,
        what: String,
    },
    Failed {
        intent: QueryIntent,
        error: QueryError,
    },
}

/// One user's view of the graph: the store plus every component that feeds
/// it. All mutations happen on the task that owns the session.
pub struct Session<G: QueryGateway> {
    requests: Requests<G>,
    store: GraphStateStore,
    merge: PathMergeEngine,
    coordinator: AsyncQueryCoordinator,
    selection: SelectionController,
    tabs: PinnedTabs,
    search: SearchState,
    pathfinder: Pathfinder,
    explorer: NodeExplorer,
    bus: Bus,
}

impl<G: QueryGateway> Session<G> {
    pub fn new(config: &EngineConfig, gateway: Arc<G>) -> Self {
        Self {
            requests: Requests::new(gateway),
            store: GraphStateStore::new(),
            merge: PathMergeEngine::new(Projector::new(config.projection.clone())),
            coordinator: AsyncQueryCoordinator::new(),
            selection: SelectionController::new(&config.selection),
            tabs: PinnedTabs::new(),
            search: SearchState::new(&config.search),
            pathfinder: Pathfinder::default(),
            explorer: NodeExplorer::new(),
            bus: Bus::default(),
        }
    }

    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = bus;
        self
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn gateway(&self) -> &Arc<G> {
        self.requests.gateway()
    }

    pub fn store(&self) -> &GraphStateStore {
        &self.store
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.store.snapshot()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn tabs(&self) -> &PinnedTabs {
        &self.tabs
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    pub fn explorer(&self) -> &NodeExplorer {
        &self.explorer
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    pub fn in_flight(&self, intent: &QueryIntent) -> bool {
        self.coordinator.in_flight(intent).is_some()
    }

    // --- search and pathfinder ---

    pub fn type_search(&mut self, text: &str) -> Option<Ticket> {
        let ticket = self
            .search
            .type_query(&mut self.coordinator, &self.requests, text);
        if ticket.is_none() {
            self.publish_suggestions();
        }
        ticket
    }

    /// Adds a suggestion to the graph and to the pathfinder anchors, then
    /// re-issues the path query if the anchors changed.
    pub fn pick_suggestion(&mut self, node: Node) -> Option<Ticket> {
        self.merge.merge_node(&mut self.store, &node);
        let added = self.pathfinder.pick(node);
        self.search.reset(&mut self.coordinator);
        if !added {
            return None;
        }
        self.pathfinder.dispatch(&mut self.coordinator, &self.requests)
    }

    pub fn set_path_mode(&mut self, mode: PathMode) -> Option<Ticket> {
        if !self.pathfinder.set_mode(mode) {
            return None;
        }
        self.pathfinder.dispatch(&mut self.coordinator, &self.requests)
    }

    pub fn set_path_action(&mut self, action: Option<String>) -> Option<Ticket> {
        if !self.pathfinder.set_action(action) || self.pathfinder.mode() != PathKind::Permission {
            return None;
        }
        self.pathfinder.dispatch(&mut self.coordinator, &self.requests)
    }

    /// Re-issues the current path query, e.g. when the pathfinder reopens.
    pub fn refresh_paths(&mut self) -> Option<Ticket> {
        self.pathfinder.dispatch(&mut self.coordinator, &self.requests)
    }

    pub fn clear_anchors(&mut self) {
        self.pathfinder.clear_anchors(&mut self.coordinator);
    }

    // --- selection ---

    pub fn click_node(&mut self, id: NodeId) -> Ticket {
        self.selection
            .select_node(&mut self.coordinator, &self.requests, id)
    }

    pub fn click_edge(&mut self, id: RelationshipId) -> Ticket {
        self.selection
            .select_edge(&mut self.coordinator, &self.requests, id)
    }

    /// Background click: nothing is selected afterwards.
    pub fn click_canvas(&mut self) {
        self.selection
            .clear_selection(&mut self.coordinator, &mut self.store);
        self.publish_selection();
    }

    pub fn clear_graph(&mut self) {
        self.selection
            .clear_selection(&mut self.coordinator, &mut self.store);
        self.store.clear();
        info!(target: "pathscope::store", "graph cleared");
        self.bus.publish(topics::TOPIC_GRAPH_CLEARED, &json!({}));
    }

    // --- other path sources ---

    pub fn load_tier_zero(&mut self, account_id: &str) -> Ticket {
        let query = self
            .requests
            .tier_zero_paths(account_id)
            .map(QueryOutput::Paths);
        self.coordinator
            .dispatch(QueryIntent::scoped(format!("tierzero/{account_id}")), query)
    }

    pub fn load_action_paths(&mut self, action: &str) -> Ticket {
        let query = self
            .requests
            .action_policies(action)
            .map(QueryOutput::Paths);
        self.coordinator
            .dispatch(QueryIntent::scoped(format!("action-policies/{action}")), query)
    }

    /// Merges the result of an explicit path query, independent of the
    /// pathfinder anchors. Each endpoint pair has its own scope.
    pub fn load_paths(&mut self, query: PathQuery) -> Ticket {
        let scope = format!("{}/{}/{}", query.kind.segment(), query.start, query.end);
        let pending = self.requests.paths(query).map(QueryOutput::Paths);
        self.coordinator
            .dispatch(QueryIntent::scoped(scope), pending)
    }

    pub fn permission_path_with_action(
        &mut self,
        start: NodeId,
        end: NodeId,
        action: &str,
    ) -> Ticket {
        self.load_paths(PathQuery::new(PathKind::Permission, start, end).with_action(action))
    }

    // --- explorer and tabs ---

    pub fn load_accounts(&mut self) -> Ticket {
        self.explorer
            .load_accounts(&mut self.coordinator, &self.requests)
    }

    pub fn explore(&mut self, account_id: &str, kind: &str) -> Ticket {
        self.explorer
            .expand(&mut self.coordinator, &self.requests, account_id, kind)
    }

    pub fn open_in_tab(&mut self, id: NodeId) -> Ticket {
        self.explorer
            .open(&mut self.coordinator, &self.requests, id)
    }

    /// Closing a tab never touches the graph.
    pub fn close_tab(&mut self, id: NodeId) -> Option<Node> {
        let closed = self.tabs.close(id)?;
        self.bus.publish(topics::TOPIC_TAB_CLOSED, &json!({ "id": id }));
        Some(closed)
    }

    // --- lifecycle ---

    /// Abandons the in-flight query of `intent`, e.g. when its panel closes.
    /// An abandoned selection fetch leaves the current element in place.
    pub fn cancel(&mut self, intent: &QueryIntent) -> bool {
        let cancelled = self.coordinator.cancel(intent);
        if *intent == QueryIntent::Selection {
            self.selection.reject(&self.store);
        }
        cancelled
    }

    pub fn shutdown(&mut self) {
        self.coordinator.cancel_all();
    }

    /// Waits for the next query worth applying and applies it. Returns
    /// `None` once nothing is outstanding.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let settled = self.coordinator.next_settled().await?;
        Some(self.apply(settled))
    }

    /// Applies everything that is already settled without waiting.
    pub fn poll_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(settled) = self.coordinator.try_next_settled() {
            events.push(self.apply(settled));
        }
        events
    }

    /// Drives every outstanding query to completion.
    pub async fn settle_pending(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn apply(&mut self, settled: Settled) -> SessionEvent {
        match settled {
            Settled::Applied { ticket, output } => self.apply_output(ticket.intent, output),
            Settled::NotFound { ticket, what } => {
                match ticket.intent {
                    QueryIntent::Selection => self.selection.reject(&self.store),
                    QueryIntent::Search => {
                        self.search.apply(Vec::new());
                        self.publish_suggestions();
                    }
                    _ => {}
                }
                SessionEvent::NotFound {
                    intent: ticket.intent,
                    what,
                }
            }
            Settled::Failed { ticket, error } => {
                if ticket.intent == QueryIntent::Selection {
                    self.selection.reject(&self.store);
                }
                self.bus.publish(
                    topics::TOPIC_QUERY_FAILED,
                    &json!({
                        "intent": ticket.intent.to_string(),
                        "generation": ticket.generation,
                        "kind": error.slug(),
                        "error": error.to_string(),
                    }),
                );
                SessionEvent::Failed {
                    intent: ticket.intent,
                    error,
                }
            }
        }
    }

    fn apply_output(&mut self, intent: QueryIntent, output: QueryOutput) -> SessionEvent {
        match output {
            QueryOutput::Suggestions(nodes) => {
                let suggestions = self.search.apply(nodes).clone();
                self.publish_suggestions();
                SessionEvent::SuggestionsUpdated(suggestions)
            }
            QueryOutput::Paths(paths) => {
                let report = self.merge.merge_paths(&mut self.store, &paths);
                self.bus.publish(
                    topics::TOPIC_GRAPH_MERGED,
                    &json!({
                        "intent": intent.to_string(),
                        "report": report,
                        "revision": self.store.revision(),
                    }),
                );
                SessionEvent::GraphMerged { intent, report }
            }
            QueryOutput::SelectedNode(node) => {
                self.selection.resolve_node(&mut self.store, node.clone());
                self.pin(node);
                self.publish_selection();
                SessionEvent::SelectionChanged(self.store.active().clone())
            }
            QueryOutput::SelectedEdge(edge) => {
                let (id, layer) = (edge.id, edge.layer());
                match self.selection.resolve_edge(&mut self.store, edge) {
                    Resolution::Activated => {
                        self.publish_selection();
                        SessionEvent::SelectionChanged(self.store.active().clone())
                    }
                    Resolution::Filtered => SessionEvent::EdgeFiltered { id, layer },
                }
            }
            QueryOutput::Accounts(accounts) => {
                SessionEvent::AccountsLoaded(self.explorer.apply_accounts(accounts).to_vec())
            }
            QueryOutput::Listing { parent, nodes } => {
                let entries = self.explorer.apply_listing(parent.clone(), &nodes).to_vec();
                SessionEvent::ListingLoaded { parent, entries }
            }
            QueryOutput::Tab(node) if node.id == 0 => {
                debug!(target: "pathscope::selection", "tab lookup returned no node");
                SessionEvent::NotFound {
                    intent,
                    what: "node".to_string(),
                }
            }
            QueryOutput::Tab(node) => {
                let id = node.id;
                self.pin(node);
                SessionEvent::TabPinned(id)
            }
        }
    }

    fn pin(&mut self, node: Node) {
        let id = node.id;
        if self.tabs.pin(node) {
            self.bus.publish(topics::TOPIC_TAB_PINNED, &json!({ "id": id }));
        }
    }

    fn publish_selection(&self) {
        self.bus.publish(
            topics::TOPIC_SELECTION_CHANGED,
            &json!({ "selections": self.store.selections() }),
        );
    }

    fn publish_suggestions(&self) {
        let suggestions = self.search.suggestions();
        self.bus.publish(
            topics::TOPIC_SEARCH_SUGGESTIONS,
            &json!({
                "query": self.search.query(),
                "count": suggestions.len(),
                "truncated": suggestions.truncated,
            }),
        );
    }
}
