//! In-memory [`QueryGateway`] for tests.
//!
//! Responses are scripted per request key (see [`keys`]). A key can be held so
//! that calls block until [`ScriptedGateway::release`] is called, which lets a
//! test decide the order in which concurrent queries settle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use pathscope_protocol::{Node, NodeId, Path, Relationship, RelationshipId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::QueryError;
use crate::gateway::{NodeFilter, PathQuery, QueryGateway};

/// Request keys understood by [`ScriptedGateway`].
pub mod keys {
    use pathscope_protocol::{NodeId, RelationshipId};

    use crate::gateway::{NodeFilter, PathQuery};

    pub fn node(id: NodeId) -> String {
        format!("node/{id}")
    }

    pub fn nodes(filter: &NodeFilter) -> String {
        let pairs: Vec<String> = filter
            .pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("nodes?{}", pairs.join("&"))
    }

    pub fn relationship(id: RelationshipId) -> String {
        format!("relationship/{id}")
    }

    pub fn path(query: &PathQuery) -> String {
        let base = format!(
            "path/{}/{}/{}",
            query.kind.segment(),
            query.start,
            query.end
        );
        match &query.action {
            Some(action) => format!("{base}?action={action}"),
            None => base,
        }
    }

    pub fn search(text: &str) -> String {
        format!("search/{text}")
    }

    pub fn tier_zero(account_id: &str) -> String {
        format!("tierzero/{account_id}")
    }

    pub fn action_policies(action: &str) -> String {
        format!("actions/{action}")
    }

    pub fn accounts() -> String {
        "accounts".to_string()
    }
}

#[derive(Default)]
struct Script {
    replies: HashMap<String, Result<Value, QueryError>>,
    gates: HashMap<String, Arc<Semaphore>>,
    calls: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
    cancellations: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Every call on `key` succeeds with `value`.
    pub fn respond<T: Serialize>(&self, key: impl Into<String>, value: &T) -> &Self {
        let value = serde_json::to_value(value).map_err(|e| QueryError::Decode(e.to_string()));
        self.lock().replies.insert(key.into(), value);
        self
    }

    pub fn fail(&self, key: impl Into<String>, error: QueryError) -> &Self {
        self.lock().replies.insert(key.into(), Err(error));
        self
    }

    /// Calls on `key` block until released, one call per release.
    pub fn hold(&self, key: impl Into<String>) -> &Self {
        self.lock()
            .gates
            .insert(key.into(), Arc::new(Semaphore::new(0)));
        self
    }

    /// Lets the oldest blocked (or next) call on `key` proceed.
    pub fn release(&self, key: &str) {
        if let Some(gate) = self.lock().gates.get(key) {
            gate.add_permits(1);
        }
    }

    /// Keys requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.as_str() == key).count()
    }

    /// Calls that observed their token firing while blocked.
    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        key: String,
        cancel: CancellationToken,
    ) -> Result<T, QueryError> {
        let gate = {
            let mut script = self.lock();
            script.calls.push(key.clone());
            script.gates.get(&key).cloned()
        };
        if let Some(gate) = gate {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.cancellations.fetch_add(1, Ordering::SeqCst);
                    return Err(QueryError::Cancelled);
                }
                permit = gate.acquire() => {
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                }
            }
        }
        if cancel.is_cancelled() {
            self.cancellations.fetch_add(1, Ordering::SeqCst);
            return Err(QueryError::Cancelled);
        }
        let reply = self
            .lock()
            .replies
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Err(QueryError::not_found(key.clone())))?;
        serde_json::from_value(reply).map_err(|e| QueryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl QueryGateway for ScriptedGateway {
    async fn node_by_id(&self, id: NodeId, cancel: CancellationToken) -> Result<Node, QueryError> {
        self.call(keys::node(id), cancel).await
    }

    async fn nodes(
        &self,
        filter: NodeFilter,
        cancel: CancellationToken,
    ) -> Result<Vec<Node>, QueryError> {
        self.call(keys::nodes(&filter), cancel).await
    }

    async fn relationship_by_id(
        &self,
        id: RelationshipId,
        cancel: CancellationToken,
    ) -> Result<Relationship, QueryError> {
        self.call(keys::relationship(id), cancel).await
    }

    async fn paths(
        &self,
        query: PathQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<Path>, QueryError> {
        self.call(keys::path(&query), cancel).await
    }

    async fn search(
        &self,
        text: String,
        cancel: CancellationToken,
    ) -> Result<Vec<Node>, QueryError> {
        self.call(keys::search(&text), cancel).await
    }

    async fn tier_zero_paths(
        &self,
        account_id: String,
        cancel: CancellationToken,
    ) -> Result<Vec<Path>, QueryError> {
        self.call(keys::tier_zero(&account_id), cancel).await
    }

    async fn action_policies(
        &self,
        action: String,
        cancel: CancellationToken,
    ) -> Result<Vec<Path>, QueryError> {
        self.call(keys::action_policies(&action), cancel).await
    }

    async fn accounts(&self, cancel: CancellationToken) -> Result<Vec<String>, QueryError> {
        self.call(keys::accounts(), cancel).await
    }
}
