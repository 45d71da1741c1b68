/// Outcome classes for a failed or aborted backend query.
///
/// Only the variants for which [`QueryError::is_failure`] holds reach the
/// notification layer; cancellations and empty lookups are absorbed where
/// they originate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query cancelled")]
    Cancelled,
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl QueryError {
    pub fn not_found(what: impl Into<String>) -> Self {
        QueryError::NotFound { what: what.into() }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryError::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::NotFound { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_cancelled() && !self.is_not_found()
    }

    pub fn slug(&self) -> &'static str {
        match self {
            QueryError::Cancelled => "cancelled",
            QueryError::NotFound { .. } => "not_found",
            QueryError::Status { .. } => "status",
            QueryError::Transport(_) => "transport",
            QueryError::Decode(_) => "decode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_separates_failures() {
        assert!(!QueryError::Cancelled.is_failure());
        assert!(!QueryError::not_found("node 4").is_failure());
        assert!(QueryError::Transport("reset".into()).is_failure());
        assert!(QueryError::Status {
            status: 500,
            body: String::new()
        }
        .is_failure());
        assert_eq!(QueryError::not_found("node 4").to_string(), "node 4 not found");
    }
}
