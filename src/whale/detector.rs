use std::sync::Arc;

use log::info;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::explorer::types::wei_to_eth;
use crate::explorer::{Address, ExplorerClient, ExplorerError, GasPrices, TokenTransfer, Transaction};
use crate::strategy::ActivityScorer;

use super::classifier::classify;
use super::config::WhaleConfig;
use super::discovery::{DiscoveryRequest, WhaleDiscoveryEngine};
use super::error::WhaleError;
use super::exchange_flow::ExchangeFlowTracker;
use super::profile::ProfileBuilder;
use super::ranker::ComparisonRanker;
use super::registry::KnownEntityRegistry;
use super::types::{
    BalanceReport, ComparisonReport, DiscoveryReport, ExchangeFlowReport, MovementReport,
    TierReport, WhaleProfile,
};

/// Entry point for every outward operation. Address arguments arrive as
/// text and are validated here, before any request is made.
pub struct WhaleDetector {
    client: Arc<ExplorerClient>,
    registry: KnownEntityRegistry,
    scorer: ActivityScorer,
    config: WhaleConfig,
}

impl WhaleDetector {
    pub fn new(client: Arc<ExplorerClient>, registry: KnownEntityRegistry, config: WhaleConfig) -> Self {
        let scorer = ActivityScorer::new(config.scoring.clone());
        Self::with_scorer(client, registry, scorer, config)
    }

    pub fn with_scorer(
        client: Arc<ExplorerClient>,
        registry: KnownEntityRegistry,
        scorer: ActivityScorer,
        config: WhaleConfig,
    ) -> Self {
        Self {
            client,
            registry,
            scorer,
            config,
        }
    }

    pub fn registry(&self) -> &KnownEntityRegistry {
        &self.registry
    }

    fn profiles(&self) -> ProfileBuilder<'_> {
        ProfileBuilder::new(&self.client, &self.registry, &self.scorer, &self.config)
    }

    pub async fn check_balance(&self, address: &str) -> Result<BalanceReport, WhaleError> {
        let address = Address::parse(address)?;
        let balance_wei = self.client.get_balance(&address).await?;
        let balance_eth = wei_to_eth(balance_wei).ok_or_else(|| {
            ExplorerError::MalformedResponse(format!("balance of {address} out of range: {balance_wei}"))
        })?;

        Ok(BalanceReport {
            address,
            balance_wei,
            balance_eth,
        })
    }

    pub async fn get_transactions(
        &self,
        address: &str,
        start_block: Option<u64>,
        end_block: Option<u64>,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Transaction>, WhaleError> {
        let address = Address::parse(address)?;
        Ok(self
            .client
            .get_transactions(&address, start_block, end_block, page, page_size)
            .await?)
    }

    pub async fn get_token_transfers(
        &self,
        address: &str,
        contract: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<TokenTransfer>, WhaleError> {
        let address = Address::parse(address)?;
        let contract = contract.map(Address::parse).transpose()?;
        Ok(self
            .client
            .get_token_transfers(&address, contract.as_ref(), page, page_size)
            .await?)
    }

    pub async fn get_contract_abi(&self, address: &str) -> Result<Value, WhaleError> {
        let address = Address::parse(address)?;
        Ok(self.client.get_contract_abi(&address).await?)
    }

    pub async fn get_gas_prices(&self) -> Result<GasPrices, WhaleError> {
        Ok(self.client.get_gas_prices().await?)
    }

    pub async fn analyze_whale(&self, address: &str) -> Result<WhaleProfile, WhaleError> {
        let address = Address::parse(address)?;
        let profile = self.profiles().build(&address).await?;
        info!(
            "{} is a {} holding {} ETH (activity {:.1}, risk {:.1})",
            address.short(),
            profile.tier,
            profile.balance_eth,
            profile.activity_score,
            profile.risk_score
        );
        Ok(profile)
    }

    /// Tier only: one balance lookup, no transaction sampling.
    pub async fn detect_whale_class(&self, address: &str) -> Result<TierReport, WhaleError> {
        let address = Address::parse(address)?;
        let balance_eth = self.profiles().balance_eth(&address).await?;
        let tier = classify(balance_eth);

        Ok(TierReport {
            known_entity_label: self.registry.label(&address).map(str::to_string),
            description: tier.description().to_string(),
            address,
            balance_eth,
            tier,
        })
    }

    pub async fn compare_whales<S: AsRef<str>>(&self, addresses: &[S]) -> Result<ComparisonReport, WhaleError> {
        ComparisonRanker::new(self.profiles()).compare(addresses).await
    }

    pub async fn discover_whale_movements(&self, min_value_eth: Decimal) -> Result<MovementReport, WhaleError> {
        WhaleDiscoveryEngine::new(self.profiles())
            .discover_movements(min_value_eth)
            .await
    }

    pub async fn discover_top_whales(&self, request: &DiscoveryRequest) -> Result<DiscoveryReport, WhaleError> {
        WhaleDiscoveryEngine::new(self.profiles()).discover(request).await
    }

    pub async fn track_exchange_whales(&self, min_amount_eth: Decimal) -> Result<ExchangeFlowReport, WhaleError> {
        ExchangeFlowTracker::new(self.profiles()).track(min_amount_eth).await
    }
}
