//! Canonical notification topics. Favor dot.case names.

// Graph store
pub const TOPIC_GRAPH_CLEARED: &str = "graph.cleared";
pub const TOPIC_GRAPH_MERGED: &str = "graph.merged";

// Selection
pub const TOPIC_SELECTION_CHANGED: &str = "selection.changed";
pub const TOPIC_TAB_PINNED: &str = "selection.tab.pinned";
pub const TOPIC_TAB_CLOSED: &str = "selection.tab.closed";

// Queries
pub const TOPIC_QUERY_FAILED: &str = "query.failed";
pub const TOPIC_SEARCH_SUGGESTIONS: &str = "search.suggestions";
