//! Search-as-you-type.

use pathscope_protocol::Node;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::SearchConfig;
use crate::coordinator::{AsyncQueryCoordinator, QueryIntent, QueryOutput, Ticket};
use crate::gateway::{QueryGateway, Requests};

/// Properties checked, in order, for the text a suggestion matched on.
const MATCH_PROPERTIES: &[&str] = &["arn", "name", "hash"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Suggestions {
    pub items: Vec<Node>,
    /// More results existed than were kept.
    pub truncated: bool,
}

impl Suggestions {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Lower-cased value of the first matchable property containing `query`
/// (case-insensitive); empty when nothing matches.
pub fn matched_term(node: &Node, query: &str) -> String {
    let needle = query.to_lowercase();
    MATCH_PROPERTIES
        .iter()
        .filter_map(|key| node.properties.get_str(key))
        .map(|value| value.to_lowercase())
        .find(|value| value.contains(&needle))
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SearchState {
    min_query_len: usize,
    max_suggestions: usize,
    query: String,
    suggestions: Suggestions,
}

impl SearchState {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            min_query_len: config.min_query_len,
            max_suggestions: config.max_suggestions,
            query: String::new(),
            suggestions: Suggestions::default(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &Suggestions {
        &self.suggestions
    }

    /// Length is counted in characters, not bytes.
    pub fn should_dispatch(&self, text: &str) -> bool {
        text.chars().count() > self.min_query_len
    }

    /// Records `text` as the current query. Short queries clear suggestions
    /// on the spot and abandon any search still in flight; longer ones
    /// supersede it.
    pub fn type_query<G: QueryGateway>(
        &mut self,
        coordinator: &mut AsyncQueryCoordinator,
        requests: &Requests<G>,
        text: &str,
    ) -> Option<Ticket> {
        self.query = text.to_string();
        if !self.should_dispatch(text) {
            trace!(target: "pathscope::search", len = text.chars().count(), "below threshold");
            coordinator.cancel(&QueryIntent::Search);
            self.suggestions = Suggestions::default();
            return None;
        }
        let query = requests.search(text).map(QueryOutput::Suggestions);
        Some(coordinator.dispatch(QueryIntent::Search, query))
    }

    /// Keeps the first `max_suggestions` results.
    pub fn apply(&mut self, mut results: Vec<Node>) -> &Suggestions {
        let truncated = results.len() > self.max_suggestions;
        results.truncate(self.max_suggestions);
        debug!(
            target: "pathscope::search",
            query = %self.query,
            shown = results.len(),
            truncated,
            "suggestions updated"
        );
        self.suggestions = Suggestions {
            items: results,
            truncated,
        };
        &self.suggestions
    }

    /// Empties the query and suggestions and abandons any pending search.
    pub fn reset(&mut self, coordinator: &mut AsyncQueryCoordinator) {
        coordinator.cancel(&QueryIntent::Search);
        self.query.clear();
        self.suggestions = Suggestions::default();
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}
