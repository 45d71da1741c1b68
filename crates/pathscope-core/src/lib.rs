mod config;
pub use config::{
    config_schema_json, load_config, parse_config, write_schema_file, EngineConfig, GatewayConfig,
    ProjectionConfig, SearchConfig, SelectionConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};
pub mod coordinator;
mod error;
pub use error::QueryError;
pub mod explorer;
pub mod gateway;
pub mod merge;
pub mod pathfinder;
pub mod projection;
pub mod search;
pub mod selection;
mod session;
pub use session::{Session, SessionEvent};
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use coordinator::{AsyncQueryCoordinator, QueryIntent, Settled, Ticket};
pub use gateway::{CancelHandle, NodeFilter, PathKind, PathQuery, PendingQuery, QueryGateway};
pub use merge::{MergeReport, PathMergeEngine};
pub use pathfinder::PathMode;
pub use store::{ActiveElement, GraphSnapshot, GraphStateStore};

pub use pathscope_protocol as protocol;
