//! REST client for the graph backend.

use std::time::Duration;

use async_trait::async_trait;
use pathscope_core::gateway::{NodeFilter, PathQuery, QueryGateway};
use pathscope_core::{GatewayConfig, QueryError};
use pathscope_protocol::{
    search_results, Node, NodeId, Path, Relationship, RelationshipId, SearchResponse,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("invalid base url {url}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("http client: {0}")]
    Client(String),
}

/// [`QueryGateway`] over HTTP. Every request races its cancellation token;
/// a fired token drops the in-flight request.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base = Url::parse(base_url).map_err(|e| GatewayError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::BaseUrl {
                url: base_url.to_string(),
                reason: "not a hierarchical url".into(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        what: &str,
        cancel: CancellationToken,
    ) -> Result<T, QueryError> {
        debug!(target: "pathscope::gateway", %url, "GET");
        let request = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(transport)?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(QueryError::not_found(what));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(QueryError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            let bytes = response.bytes().await.map_err(transport)?;
            serde_json::from_slice::<T>(&bytes).map_err(|e| QueryError::Decode(e.to_string()))
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(target: "pathscope::gateway", %url, "request aborted");
                Err(QueryError::Cancelled)
            }
            res = request => res,
        }
    }

    /// Lists may come back as JSON `null`.
    async fn get_list<T: DeserializeOwned>(
        &self,
        url: Url,
        what: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<T>, QueryError> {
        let list: Option<Vec<T>> = self.get(url, what, cancel).await?;
        Ok(list.unwrap_or_default())
    }
}

fn transport(err: reqwest::Error) -> QueryError {
    QueryError::Transport(err.to_string())
}

#[async_trait]
impl QueryGateway for HttpGateway {
    async fn node_by_id(&self, id: NodeId, cancel: CancellationToken) -> Result<Node, QueryError> {
        let what = format!("node {id}");
        let url = self.url(&["nodes", &id.to_string()]);
        let node: Node = self.get(url, &what, cancel).await?;
        // The backend answers unknown ids with an empty record.
        if node.id == 0 {
            return Err(QueryError::not_found(what));
        }
        Ok(node)
    }

    async fn nodes(
        &self,
        filter: NodeFilter,
        cancel: CancellationToken,
    ) -> Result<Vec<Node>, QueryError> {
        let mut url = self.url(&["nodes"]);
        url.query_pairs_mut().extend_pairs(filter.pairs());
        self.get_list(url, "nodes", cancel).await
    }

    async fn relationship_by_id(
        &self,
        id: RelationshipId,
        cancel: CancellationToken,
    ) -> Result<Relationship, QueryError> {
        let what = format!("relationship {id}");
        let url = self.url(&["relationship", &id.to_string()]);
        let rel: Relationship = self.get(url, &what, cancel).await?;
        if rel.id == 0 {
            return Err(QueryError::not_found(what));
        }
        Ok(rel)
    }

    async fn paths(
        &self,
        query: PathQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<Path>, QueryError> {
        let mut url = self.url(&[
            "node",
            &query.start.to_string(),
            query.kind.segment(),
            &query.end.to_string(),
        ]);
        if let Some(action) = query.action.as_deref() {
            url.query_pairs_mut().append_pair("action", action);
        }
        self.get_list(url, query.kind.segment(), cancel).await
    }

    async fn search(
        &self,
        text: String,
        cancel: CancellationToken,
    ) -> Result<Vec<Node>, QueryError> {
        let mut url = self.url(&["search"]);
        url.query_pairs_mut().append_pair("searchQuery", &text);
        let results: Option<SearchResponse> = self.get(url, "search", cancel).await?;
        Ok(results.map(search_results).unwrap_or_default())
    }

    async fn tier_zero_paths(
        &self,
        account_id: String,
        cancel: CancellationToken,
    ) -> Result<Vec<Path>, QueryError> {
        let url = self.url(&["nodes", &account_id, "tierzeropaths"]);
        self.get_list(url, "tier-zero paths", cancel).await
    }

    async fn action_policies(
        &self,
        action: String,
        cancel: CancellationToken,
    ) -> Result<Vec<Path>, QueryError> {
        let url = self.url(&["actions", &action, "policies"]);
        self.get_list(url, "action policies", cancel).await
    }

    async fn accounts(&self, cancel: CancellationToken) -> Result<Vec<String>, QueryError> {
        let url = self.url(&["accounts"]);
        self.get_list(url, "accounts", cancel).await
    }
}
