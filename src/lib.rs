pub mod explorer;
pub mod explorer_config;
pub mod strategy;
pub mod whale;

pub use explorer_config::{ConfigError, ExplorerConfig};

pub use explorer::{
    Address,
    ExplorerClient,
    ExplorerError,
    RateLimiter,
    RejectionKind,
};

pub use strategy::{
    ActivityScorer,
    ScoringConfig,
};

pub use whale::{
    config::WhaleConfig,
    DiscoveryRequest,
    KnownEntityRegistry,
    WhaleDetector,
    WhaleError,
    WhaleTier,
};
