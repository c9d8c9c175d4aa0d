use std::collections::{HashMap, HashSet};

use log::warn;
use rust_decimal::Decimal;

use crate::explorer::types::wei_to_eth;
use crate::explorer::{Address, ExplorerClient, ExplorerError, TokenTransfer, Transaction};
use crate::strategy::ActivityScorer;

use super::classifier::classify;
use super::config::WhaleConfig;
use super::registry::KnownEntityRegistry;
use super::types::{OperationStep, StepFailure, WhaleProfile, WhaleTier};

/// Assembles a `WhaleProfile` from one balance lookup, one page of recent
/// transactions and one page of token transfers.
#[derive(Clone, Copy)]
pub struct ProfileBuilder<'a> {
    client: &'a ExplorerClient,
    registry: &'a KnownEntityRegistry,
    scorer: &'a ActivityScorer,
    config: &'a WhaleConfig,
}

impl<'a> ProfileBuilder<'a> {
    pub fn new(
        client: &'a ExplorerClient,
        registry: &'a KnownEntityRegistry,
        scorer: &'a ActivityScorer,
        config: &'a WhaleConfig,
    ) -> Self {
        Self {
            client,
            registry,
            scorer,
            config,
        }
    }

    pub fn client(&self) -> &'a ExplorerClient {
        self.client
    }

    pub fn registry(&self) -> &'a KnownEntityRegistry {
        self.registry
    }

    pub fn config(&self) -> &'a WhaleConfig {
        self.config
    }

    pub async fn balance_eth(&self, address: &Address) -> Result<Decimal, ExplorerError> {
        let wei = self.client.get_balance(address).await?;
        wei_to_eth(wei).ok_or_else(|| {
            ExplorerError::MalformedResponse(format!("balance of {address} out of range: {wei}"))
        })
    }

    /// Tier of `address` from its balance. Lookups are memoized in `tiers`;
    /// a failed lookup is recorded once as a `Classify` failure.
    pub async fn tier_of(
        &self,
        address: &Address,
        tiers: &mut HashMap<Address, Option<WhaleTier>>,
        failures: &mut Vec<StepFailure>,
    ) -> Option<WhaleTier> {
        if let Some(tier) = tiers.get(address) {
            return *tier;
        }

        let tier = match self.balance_eth(address).await {
            Ok(balance_eth) => Some(classify(balance_eth)),
            Err(e) => {
                warn!("Could not classify {}: {}", address.short(), e);
                failures.push(StepFailure {
                    step: OperationStep::Classify,
                    address: Some(address.clone()),
                    message: e.to_string(),
                });
                None
            }
        };
        tiers.insert(address.clone(), tier);
        tier
    }

    pub async fn build(&self, address: &Address) -> Result<WhaleProfile, ExplorerError> {
        let balance_eth = self.balance_eth(address).await?;
        self.build_with_balance(address, balance_eth).await
    }

    /// `build` for a caller that already holds the balance.
    pub async fn build_with_balance(
        &self,
        address: &Address,
        balance_eth: Decimal,
    ) -> Result<WhaleProfile, ExplorerError> {
        let sample = self
            .client
            .get_transactions(address, None, None, 1, self.config.activity_sample_size)
            .await?;
        let transfers = self
            .client
            .get_token_transfers(address, None, 1, self.config.token_sample_size)
            .await?;

        Ok(self.assemble(address.clone(), balance_eth, &sample, &transfers))
    }

    /// Pure part of `build`: derives every field from already fetched data.
    pub fn assemble(
        &self,
        address: Address,
        balance_eth: Decimal,
        sample: &[Transaction],
        transfers: &[TokenTransfer],
    ) -> WhaleProfile {
        let (activity, risk) = self.scorer.score(&address, sample, self.registry);

        let values: Vec<Decimal> = sample.iter().map(Transaction::value_eth).collect();
        let max_tx_value_eth = values.iter().copied().max().unwrap_or(Decimal::ZERO);
        let avg_tx_value_eth = if values.is_empty() {
            Decimal::ZERO
        } else {
            let total: Decimal = values.iter().copied().sum();
            (total / Decimal::from(values.len())).round_dp(18)
        };

        let first_seen = sample.iter().min_by_key(|tx| tx.timestamp).and_then(Transaction::time);
        let last_activity = sample.iter().max_by_key(|tx| tx.timestamp).and_then(Transaction::time);

        let token_diversity = transfers
            .iter()
            .map(|transfer| &transfer.token_contract)
            .collect::<HashSet<_>>()
            .len();

        WhaleProfile {
            tier: classify(balance_eth),
            balance_eth,
            activity_score: activity.score,
            risk_score: risk.score,
            total_tx_count: sample.len(),
            large_tx_count: activity.large_tx_count,
            known_entity_label: self.registry.label(&address).map(str::to_string),
            exchange_name: self.registry.exchange_name(&address).map(str::to_string),
            avg_tx_value_eth,
            max_tx_value_eth,
            first_seen,
            last_activity,
            token_diversity,
            activity,
            risk,
            address,
        }
    }
}
