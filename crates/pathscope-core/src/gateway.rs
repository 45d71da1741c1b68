use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use pathscope_protocol::{Node, NodeId, Path, Relationship, RelationshipId};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::QueryError;

/// Filter parameters for the node listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFilter {
    pub kind: Option<String>,
    pub account_id: Option<String>,
    pub arn: Option<String>,
}

impl NodeFilter {
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn arn(arn: impl Into<String>) -> Self {
        Self {
            arn: Some(arn.into()),
            ..Self::default()
        }
    }

    pub fn in_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Query pairs in a stable order; unset fields are omitted.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if let Some(kind) = self.kind.as_deref() {
            out.push(("kind", kind));
        }
        if let Some(account) = self.account_id.as_deref() {
            out.push(("account_id", account));
        }
        if let Some(arn) = self.arn.as_deref() {
            out.push(("arn", arn));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    #[default]
    Identity,
    Permission,
    Shortest,
}

impl PathKind {
    /// Route segment used by the backend for this path kind.
    pub fn segment(&self) -> &'static str {
        match self {
            PathKind::Identity => "identitypath",
            PathKind::Permission => "permissionpath",
            PathKind::Shortest => "shortestpath",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "identity" | "identitypath" => Some(PathKind::Identity),
            "permission" | "permissionpath" => Some(PathKind::Permission),
            "shortest" | "shortestpath" => Some(PathKind::Shortest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathQuery {
    pub kind: PathKind,
    pub start: NodeId,
    pub end: NodeId,
    /// Narrows a permission path to the paths enabling this action.
    pub action: Option<String>,
}

impl PathQuery {
    pub fn new(kind: PathKind, start: NodeId, end: NodeId) -> Self {
        Self {
            kind,
            start,
            end,
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// Backend operations the engine consumes.
///
/// Every call receives the token of the query it belongs to; implementations
/// must stop promptly and return [`QueryError::Cancelled`] once it fires.
#[async_trait]
pub trait QueryGateway: Send + Sync + 'static {
    async fn node_by_id(&self, id: NodeId, cancel: CancellationToken)
        -> Result<Node, QueryError>;

    async fn nodes(
        &self,
        filter: NodeFilter,
        cancel: CancellationToken,
    ) -> Result<Vec<Node>, QueryError>;

    async fn relationship_by_id(
        &self,
        id: RelationshipId,
        cancel: CancellationToken,
    ) -> Result<Relationship, QueryError>;

    async fn paths(
        &self,
        query: PathQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<Path>, QueryError>;

    /// Free-text search, flattened in result-key order.
    async fn search(&self, text: String, cancel: CancellationToken)
        -> Result<Vec<Node>, QueryError>;

    async fn tier_zero_paths(
        &self,
        account_id: String,
        cancel: CancellationToken,
    ) -> Result<Vec<Path>, QueryError>;

    async fn action_policies(
        &self,
        action: String,
        cancel: CancellationToken,
    ) -> Result<Vec<Path>, QueryError>;

    async fn accounts(&self, cancel: CancellationToken) -> Result<Vec<String>, QueryError>;
}

/// Cancels one issued query. Cloning shares the same underlying signal.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    /// Idempotent; never panics.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// An issued, not yet awaited query and the handle that aborts it.
pub struct PendingQuery<T> {
    cancel: CancelHandle,
    future: BoxFuture<'static, Result<T, QueryError>>,
}

impl<T: Send + 'static> PendingQuery<T> {
    pub fn new<F, Fut>(op: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, QueryError>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let future = op(token.clone()).boxed();
        Self {
            cancel: CancelHandle(token),
            future,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn map<U, F>(self, f: F) -> PendingQuery<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        PendingQuery {
            cancel: self.cancel,
            future: self.future.map(|res| res.map(f)).boxed(),
        }
    }

    /// Resolves with the operation's result, or `Cancelled` if the handle
    /// fires and the operation does not settle on its own.
    pub async fn wait(self) -> Result<T, QueryError> {
        let token = self.cancel.0.clone();
        tokio::select! {
            biased;
            res = self.future => res,
            _ = token.cancelled() => Err(QueryError::Cancelled),
        }
    }
}

/// Builds [`PendingQuery`] values for each backend operation.
pub struct Requests<G> {
    gateway: Arc<G>,
}

impl<G> Clone for Requests<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<G: QueryGateway> Requests<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn node(&self, id: NodeId) -> PendingQuery<Node> {
        let gw = Arc::clone(&self.gateway);
        PendingQuery::new(move |cancel| async move { gw.node_by_id(id, cancel).await })
    }

    pub fn nodes(&self, filter: NodeFilter) -> PendingQuery<Vec<Node>> {
        let gw = Arc::clone(&self.gateway);
        PendingQuery::new(move |cancel| async move { gw.nodes(filter, cancel).await })
    }

    pub fn relationship(&self, id: RelationshipId) -> PendingQuery<Relationship> {
        let gw = Arc::clone(&self.gateway);
        PendingQuery::new(move |cancel| async move { gw.relationship_by_id(id, cancel).await })
    }

    pub fn paths(&self, query: PathQuery) -> PendingQuery<Vec<Path>> {
        let gw = Arc::clone(&self.gateway);
        PendingQuery::new(move |cancel| async move { gw.paths(query, cancel).await })
    }

    pub fn search(&self, text: impl Into<String>) -> PendingQuery<Vec<Node>> {
        let gw = Arc::clone(&self.gateway);
        let text = text.into();
        PendingQuery::new(move |cancel| async move { gw.search(text, cancel).await })
    }

    pub fn tier_zero_paths(&self, account_id: impl Into<String>) -> PendingQuery<Vec<Path>> {
        let gw = Arc::clone(&self.gateway);
        let account_id = account_id.into();
        PendingQuery::new(move |cancel| async move { gw.tier_zero_paths(account_id, cancel).await })
    }

    pub fn action_policies(&self, action: impl Into<String>) -> PendingQuery<Vec<Path>> {
        let gw = Arc::clone(&self.gateway);
        let action = action.into();
        PendingQuery::new(move |cancel| async move { gw.action_policies(action, cancel).await })
    }

    pub fn accounts(&self) -> PendingQuery<Vec<String>> {
        let gw = Arc::clone(&self.gateway);
        PendingQuery::new(move |cancel| async move { gw.accounts(cancel).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn filter_pairs_skip_unset_fields() {
        let filter = NodeFilter::kind("AWSRole").in_account("1234");
        assert_eq!(filter.pairs(), vec![("kind", "AWSRole"), ("account_id", "1234")]);
        assert!(NodeFilter::default().pairs().is_empty());
    }

    #[test]
    fn path_kind_slugs_round_trip_segments() {
        for kind in [PathKind::Identity, PathKind::Permission, PathKind::Shortest] {
            assert_eq!(PathKind::from_slug(kind.segment()), Some(kind));
        }
        assert_eq!(PathKind::from_slug(" Shortest "), Some(PathKind::Shortest));
        assert_eq!(PathKind::from_slug("rsop"), None);
    }

    #[tokio::test]
    async fn pending_query_resolves_and_maps() {
        let q = PendingQuery::new(|_cancel| async { Ok::<_, QueryError>(21) });
        assert_eq!(q.map(|v| v * 2).wait().await, Ok(42));
    }

    #[tokio::test]
    async fn cancel_wins_over_an_operation_that_ignores_it() {
        let q: PendingQuery<u8> = PendingQuery::new(|_cancel| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1)
        });
        let handle = q.cancel_handle();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(q.wait().await, Err(QueryError::Cancelled));
    }
}
