use std::env;
use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::explorer_config::{env_or, ConfigError};
use crate::strategy::ScoringConfig;

/// Bounds of the frontier expansion in `discover_top_whales`.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveryConfig {
    /// Registry addresses used as starting points.
    pub seed_limit: usize,
    pub seed_page_size: u32,
    /// Default per-transaction threshold when the caller gives none.
    pub seed_min_tx_eth: Decimal,
    /// Unique candidates classified before discovery stops.
    pub candidate_cap: usize,
    pub max_results: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            seed_limit: 5,
            seed_page_size: 50,
            seed_min_tx_eth: Decimal::new(50, 0),
            candidate_cap: 30,
            max_results: 20,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WhaleConfig {
    pub scoring: ScoringConfig,
    /// Recent transactions sampled per profile. Full history is never fetched.
    pub activity_sample_size: u32,
    pub token_sample_size: u32,
    pub min_compare_batch: usize,
    pub max_compare_batch: usize,
    pub discovery: DiscoveryConfig,
    pub exchange_limit: usize,
    pub exchange_page_size: u32,
    pub movement_monitor_limit: usize,
    pub movement_page_size: u32,
    pub max_movements: usize,
    pub known_entities_path: Option<PathBuf>,
}

impl Default for WhaleConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            activity_sample_size: 100,
            token_sample_size: 50,
            min_compare_batch: 2,
            max_compare_batch: 10,
            discovery: DiscoveryConfig::default(),
            exchange_limit: 5,
            exchange_page_size: 30,
            movement_monitor_limit: 10,
            movement_page_size: 20,
            max_movements: 50,
            known_entities_path: None,
        }
    }
}

impl WhaleConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.scoring.large_tx_threshold_eth =
            env_or("LARGE_TX_THRESHOLD_ETH", config.scoring.large_tx_threshold_eth)?;
        config.activity_sample_size = env_or("ACTIVITY_SAMPLE_SIZE", config.activity_sample_size)?;
        config.discovery.candidate_cap =
            env_or("DISCOVERY_CANDIDATE_CAP", config.discovery.candidate_cap)?;
        config.known_entities_path = env::var("KNOWN_ENTITIES_PATH").ok().map(PathBuf::from);

        Ok(config)
    }
}
