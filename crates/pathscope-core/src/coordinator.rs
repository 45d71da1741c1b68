use std::collections::HashMap;
use std::fmt;

use pathscope_protocol::{Node, Path, Relationship};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::QueryError;
use crate::gateway::{CancelHandle, PendingQuery};

/// Logical query category. A dispatch supersedes the in-flight query of the
/// same intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Search,
    Pathfinder,
    Selection,
    /// Caller-chosen scope, e.g. one panel or one tree folder.
    Scoped(String),
}

impl QueryIntent {
    pub fn scoped(scope: impl Into<String>) -> Self {
        QueryIntent::Scoped(scope.into())
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryIntent::Search => f.write_str("search"),
            QueryIntent::Pathfinder => f.write_str("pathfinder"),
            QueryIntent::Selection => f.write_str("selection"),
            QueryIntent::Scoped(scope) => write!(f, "scoped:{scope}"),
        }
    }
}

pub type Generation = u64;

/// Identifies one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    pub intent: QueryIntent,
    pub generation: Generation,
}

/// Response payloads, tagged with what the owner should do with them.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Suggestions(Vec<Node>),
    Paths(Vec<Path>),
    SelectedNode(Node),
    SelectedEdge(Relationship),
    Listing { parent: String, nodes: Vec<Node> },
    Accounts(Vec<String>),
    Tab(Node),
}

/// A completion that survived the staleness and cancellation filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Applied { ticket: Ticket, output: QueryOutput },
    NotFound { ticket: Ticket, what: String },
    Failed { ticket: Ticket, error: QueryError },
}

impl Settled {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Settled::Applied { ticket, .. }
            | Settled::NotFound { ticket, .. }
            | Settled::Failed { ticket, .. } => ticket,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    pub dispatched: u64,
    pub cancelled: u64,
    pub stale_dropped: u64,
    pub applied: u64,
    pub not_found: u64,
    pub failed: u64,
}

struct InFlight {
    generation: Generation,
    cancel: CancelHandle,
}

struct Completion {
    intent: QueryIntent,
    generation: Generation,
    outcome: Result<QueryOutput, QueryError>,
}

/// Owns the lifecycle of every issued query.
///
/// Queries run on the tokio runtime; their completions are funnelled back
/// through a channel and handed out one at a time by [`next_settled`], so the
/// owner applies them sequentially with exclusive access to its state.
///
/// [`next_settled`]: AsyncQueryCoordinator::next_settled
pub struct AsyncQueryCoordinator {
    generations: HashMap<QueryIntent, Generation>,
    in_flight: HashMap<QueryIntent, InFlight>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    outstanding: usize,
    stats: CoordinatorStats,
}

impl AsyncQueryCoordinator {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            generations: HashMap::new(),
            in_flight: HashMap::new(),
            tx,
            rx,
            outstanding: 0,
            stats: CoordinatorStats::default(),
        }
    }

    /// Cancels the in-flight query of `intent` (if any) and issues `query` as
    /// its successor. Must be called from within a tokio runtime.
    pub fn dispatch(&mut self, intent: QueryIntent, query: PendingQuery<QueryOutput>) -> Ticket {
        self.supersede(&intent);
        let generation = {
            let g = self.generations.entry(intent.clone()).or_insert(0);
            *g += 1;
            *g
        };
        self.in_flight.insert(
            intent.clone(),
            InFlight {
                generation,
                cancel: query.cancel_handle(),
            },
        );
        let tx = self.tx.clone();
        let task_intent = intent.clone();
        tokio::spawn(async move {
            let outcome = query.wait().await;
            // Receiver lives as long as the coordinator; a send error only
            // means the session is gone.
            let _ = tx.send(Completion {
                intent: task_intent,
                generation,
                outcome,
            });
        });
        self.outstanding += 1;
        self.stats.dispatched += 1;
        debug!(target: "pathscope::coordinator", %intent, generation, "dispatched");
        Ticket { intent, generation }
    }

    /// Cancels the in-flight query of `intent`. Safe to call repeatedly.
    pub fn cancel(&mut self, intent: &QueryIntent) -> bool {
        self.supersede(intent)
    }

    /// Cancels every in-flight query (session teardown).
    pub fn cancel_all(&mut self) {
        let intents: Vec<QueryIntent> = self.in_flight.keys().cloned().collect();
        for intent in intents {
            self.supersede(&intent);
        }
    }

    pub fn in_flight(&self, intent: &QueryIntent) -> Option<Generation> {
        self.in_flight.get(intent).map(|f| f.generation)
    }

    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn latest_generation(&self, intent: &QueryIntent) -> Generation {
        self.generations.get(intent).copied().unwrap_or(0)
    }

    /// Issued queries whose completion has not been received yet, including
    /// cancelled ones still winding down.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    /// Waits for the next completion that should be applied. Returns `None`
    /// once nothing issued remains outstanding.
    pub async fn next_settled(&mut self) -> Option<Settled> {
        while self.outstanding > 0 {
            let completion = self.rx.recv().await?;
            self.outstanding -= 1;
            if let Some(settled) = self.classify(completion) {
                return Some(settled);
            }
        }
        None
    }

    /// Non-blocking variant of [`next_settled`](Self::next_settled).
    pub fn try_next_settled(&mut self) -> Option<Settled> {
        while let Ok(completion) = self.rx.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            if let Some(settled) = self.classify(completion) {
                return Some(settled);
            }
        }
        None
    }

    fn supersede(&mut self, intent: &QueryIntent) -> bool {
        match self.in_flight.remove(intent) {
            Some(previous) => {
                previous.cancel.cancel();
                self.stats.cancelled += 1;
                debug!(
                    target: "pathscope::coordinator",
                    %intent,
                    generation = previous.generation,
                    "cancelled in-flight query"
                );
                true
            }
            None => false,
        }
    }

    fn classify(&mut self, completion: Completion) -> Option<Settled> {
        let Completion {
            intent,
            generation,
            outcome,
        } = completion;
        let current = self.in_flight.get(&intent).map(|f| f.generation);
        if current != Some(generation) {
            self.stats.stale_dropped += 1;
            debug!(
                target: "pathscope::coordinator",
                %intent,
                generation,
                latest = self.latest_generation(&intent),
                "dropped stale completion"
            );
            return None;
        }
        self.in_flight.remove(&intent);
        let ticket = Ticket { intent, generation };
        match outcome {
            Ok(output) => {
                self.stats.applied += 1;
                Some(Settled::Applied { ticket, output })
            }
            Err(QueryError::Cancelled) => {
                debug!(
                    target: "pathscope::coordinator",
                    intent = %ticket.intent,
                    generation,
                    "transport reported cancellation"
                );
                None
            }
            Err(QueryError::NotFound { what }) => {
                self.stats.not_found += 1;
                debug!(target: "pathscope::coordinator", intent = %ticket.intent, %what, "not found");
                Some(Settled::NotFound { ticket, what })
            }
            Err(error) => {
                self.stats.failed += 1;
                warn!(
                    target: "pathscope::coordinator",
                    intent = %ticket.intent,
                    generation,
                    kind = error.slug(),
                    %error,
                    "query failed"
                );
                Some(Settled::Failed { ticket, error })
            }
        }
    }
}

impl Default for AsyncQueryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncQueryCoordinator {
    fn drop(&mut self) {
        for (_, in_flight) in self.in_flight.drain() {
            in_flight.cancel.cancel();
        }
    }
}
