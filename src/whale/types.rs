use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::explorer::{Address, Transaction};
use crate::strategy::types::{ActivityBreakdown, RiskBreakdown};

use super::error::{BoundExceeded, WhaleError};

/// Balance-based whale size. Declaration order is the size order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WhaleTier {
    Shrimp,
    SmallWhale,
    MediumWhale,
    LargeWhale,
    MegaWhale,
}

impl WhaleTier {
    pub const ALL: [WhaleTier; 5] = [
        WhaleTier::Shrimp,
        WhaleTier::SmallWhale,
        WhaleTier::MediumWhale,
        WhaleTier::LargeWhale,
        WhaleTier::MegaWhale,
    ];

    /// Inclusive lower bound in ETH.
    pub fn lower_bound(&self) -> Decimal {
        match self {
            WhaleTier::Shrimp => Decimal::ZERO,
            WhaleTier::SmallWhale => Decimal::new(10, 0),
            WhaleTier::MediumWhale => Decimal::new(100, 0),
            WhaleTier::LargeWhale => Decimal::new(1_000, 0),
            WhaleTier::MegaWhale => Decimal::new(10_000, 0),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WhaleTier::Shrimp => "Shrimp",
            WhaleTier::SmallWhale => "Small Whale",
            WhaleTier::MediumWhale => "Medium Whale",
            WhaleTier::LargeWhale => "Large Whale",
            WhaleTier::MegaWhale => "Mega Whale",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WhaleTier::Shrimp => "Retail holder",
            WhaleTier::SmallWhale => "Notable position",
            WhaleTier::MediumWhale => "Significant holder",
            WhaleTier::LargeWhale => "Major market participant",
            WhaleTier::MegaWhale => "Institutional-level holdings",
        }
    }
}

impl fmt::Display for WhaleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How notable a single movement is, by ETH value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Notable,
    Significant,
    Major,
    Critical,
    Mega,
}

impl Significance {
    pub fn from_value(value_eth: Decimal) -> Self {
        if value_eth >= Decimal::new(10_000, 0) {
            Significance::Mega
        } else if value_eth >= Decimal::new(5_000, 0) {
            Significance::Critical
        } else if value_eth >= Decimal::new(1_000, 0) {
            Significance::Major
        } else if value_eth >= Decimal::new(500, 0) {
            Significance::Significant
        } else {
            Significance::Notable
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WhaleProfile {
    pub address: Address,
    pub balance_eth: Decimal,
    pub tier: WhaleTier,
    pub activity_score: f64,
    pub risk_score: f64,
    pub total_tx_count: usize,
    pub large_tx_count: usize,
    pub known_entity_label: Option<String>,
    pub exchange_name: Option<String>,
    pub avg_tx_value_eth: Decimal,
    pub max_tx_value_eth: Decimal,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub token_diversity: usize,
    pub activity: ActivityBreakdown,
    pub risk: RiskBreakdown,
}

/// Balance lookup result for `check_balance`.
#[derive(Clone, Debug, Serialize)]
pub struct BalanceReport {
    pub address: Address,
    pub balance_wei: alloy_primitives::U256,
    pub balance_eth: Decimal,
}

/// Result of `detect_whale_class`.
#[derive(Clone, Debug, Serialize)]
pub struct TierReport {
    pub address: Address,
    pub balance_eth: Decimal,
    pub tier: WhaleTier,
    pub description: String,
    pub known_entity_label: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    ExchangeDeposit,
    ExchangeWithdrawal,
    WhaleTransfer,
}

#[derive(Clone, Debug, Serialize)]
pub struct WhaleMovement {
    pub tx_hash: String,
    pub from: Address,
    pub to: Option<Address>,
    pub value_eth: Decimal,
    pub block_number: u64,
    pub timestamp: u64,
    pub from_tier: Option<WhaleTier>,
    pub to_tier: Option<WhaleTier>,
    pub from_label: Option<String>,
    pub to_label: Option<String>,
    pub from_exchange: Option<String>,
    pub to_exchange: Option<String>,
    pub kind: MovementKind,
    pub significance: Significance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    /// External address → exchange.
    Deposit,
    /// Exchange → external address.
    Withdrawal,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExchangeFlowEvent {
    pub exchange_address: Address,
    pub exchange_name: String,
    pub counterparty: Address,
    /// `None` when the counterparty's balance lookup failed.
    pub counterparty_tier: Option<WhaleTier>,
    pub counterparty_label: Option<String>,
    pub direction: FlowDirection,
    pub amount_eth: Decimal,
    pub significance: Significance,
    pub transaction: Transaction,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FlowSummary {
    pub deposit_count: usize,
    pub withdrawal_count: usize,
    pub total_deposits_eth: Decimal,
    pub total_withdrawals_eth: Decimal,
    /// Withdrawals minus deposits.
    pub net_flow_eth: Decimal,
    pub active_exchanges: usize,
}

/// Step of a multi-call operation that failed while the rest carried on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStep {
    Seed,
    Classify,
    ScanExchange,
    ScanMonitored,
    Analyze,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepFailure {
    pub step: OperationStep,
    pub address: Option<Address>,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExchangeFlowReport {
    pub min_amount_eth: Decimal,
    pub events: Vec<ExchangeFlowEvent>,
    pub summary: FlowSummary,
    pub failures: Vec<StepFailure>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovementReport {
    pub min_value_eth: Decimal,
    pub movements: Vec<WhaleMovement>,
    pub total_value_eth: Decimal,
    pub failures: Vec<StepFailure>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankedWhale {
    /// 1-based.
    pub rank: usize,
    /// Balance relative to the top entry, 1 for the top entry itself.
    pub relative_size: Decimal,
    pub profile: WhaleProfile,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComparisonReport {
    pub ranked: Vec<RankedWhale>,
    pub total_eth: Decimal,
    pub average_activity_score: f64,
    pub failures: Vec<StepFailure>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DiscoveryReport {
    pub min_balance_eth: Decimal,
    /// Profiles of the whales that passed the balance filter, best first.
    pub whales: Vec<WhaleProfile>,
    /// Unique candidates whose balance was looked up.
    pub candidates_scanned: usize,
    pub bound_exceeded: Option<BoundExceeded>,
    pub failures: Vec<StepFailure>,
}

impl DiscoveryReport {
    /// The hit cap as an error, for callers that treat truncation as failure.
    pub fn bound_error(&self) -> Option<WhaleError> {
        self.bound_exceeded.clone().map(WhaleError::from)
    }
}
