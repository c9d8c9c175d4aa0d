pub mod classifier;
pub mod config;
pub mod detector;
pub mod discovery;
pub mod error;
pub mod exchange_flow;
pub mod profile;
pub mod ranker;
pub mod registry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::classify;
pub use config::{DiscoveryConfig, WhaleConfig};
pub use detector::WhaleDetector;
pub use discovery::{DiscoveryRequest, WhaleDiscoveryEngine};
pub use error::{BoundExceeded, WhaleError};
pub use exchange_flow::ExchangeFlowTracker;
pub use profile::ProfileBuilder;
pub use ranker::ComparisonRanker;
pub use registry::{EntityKind, KnownEntity, KnownEntityRegistry};
pub use types::{
    ComparisonReport, DiscoveryReport, ExchangeFlowEvent, ExchangeFlowReport, FlowDirection,
    FlowSummary, MovementKind, MovementReport, Significance, WhaleMovement, WhaleProfile,
    WhaleTier,
};
