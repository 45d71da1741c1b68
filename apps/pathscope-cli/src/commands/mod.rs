pub mod config;
pub mod explore;
pub mod graph;
pub mod util;

pub use config::ConfigCmd;
pub use explore::ExploreArgs;
pub use graph::{EdgeArgs, NodeArgs, PathArgs, SearchArgs};
pub use util::GlobalArgs;
