use std::collections::{HashMap, HashSet};

use log::{info, warn};
use rust_decimal::Decimal;

use crate::explorer::{Address, ExplorerError, Transaction};

use super::error::WhaleError;
use super::profile::ProfileBuilder;
use super::types::{
    ExchangeFlowEvent, ExchangeFlowReport, FlowDirection, FlowSummary, OperationStep,
    Significance, StepFailure,
};

/// Direction of `tx` relative to `exchange` and the address on the other
/// side. Self transfers, contract creations and failed executions are not
/// flows.
pub fn classify_flow(exchange: &Address, tx: &Transaction) -> Option<(FlowDirection, Address)> {
    let to = tx.to.as_ref()?;
    if tx.is_error || &tx.from == to {
        return None;
    }

    if to == exchange {
        Some((FlowDirection::Deposit, tx.from.clone()))
    } else if &tx.from == exchange {
        Some((FlowDirection::Withdrawal, to.clone()))
    } else {
        None
    }
}

pub fn summarize(events: &[ExchangeFlowEvent]) -> FlowSummary {
    let mut summary = FlowSummary::default();
    let mut exchanges = HashSet::new();

    for event in events {
        exchanges.insert(&event.exchange_address);
        match event.direction {
            FlowDirection::Deposit => {
                summary.deposit_count += 1;
                summary.total_deposits_eth += event.amount_eth;
            }
            FlowDirection::Withdrawal => {
                summary.withdrawal_count += 1;
                summary.total_withdrawals_eth += event.amount_eth;
            }
        }
    }

    summary.net_flow_eth = summary.total_withdrawals_eth - summary.total_deposits_eth;
    summary.active_exchanges = exchanges.len();
    summary
}

pub struct ExchangeFlowTracker<'a> {
    profiles: ProfileBuilder<'a>,
}

impl<'a> ExchangeFlowTracker<'a> {
    pub fn new(profiles: ProfileBuilder<'a>) -> Self {
        Self { profiles }
    }

    pub async fn track(&self, min_amount_eth: Decimal) -> Result<ExchangeFlowReport, WhaleError> {
        let config = self.profiles.config();
        let client = self.profiles.client();

        let mut events = Vec::new();
        let mut failures = Vec::new();
        let mut first_error: Option<ExplorerError> = None;
        let mut scanned = 0;
        let mut tiers = HashMap::new();

        for exchange in self.profiles.registry().exchanges().take(config.exchange_limit) {
            let transactions = match client
                .get_transactions(&exchange.address, None, None, 1, config.exchange_page_size)
                .await
            {
                Ok(transactions) => transactions,
                Err(e) => {
                    warn!("Scan of {} ({}) failed: {}", exchange.label, exchange.address.short(), e);
                    failures.push(StepFailure {
                        step: OperationStep::ScanExchange,
                        address: Some(exchange.address.clone()),
                        message: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            scanned += 1;

            for tx in transactions {
                let amount_eth = tx.value_eth();
                if amount_eth < min_amount_eth {
                    continue;
                }
                let Some((direction, counterparty)) = classify_flow(&exchange.address, &tx) else {
                    continue;
                };
                let counterparty_tier = self
                    .profiles
                    .tier_of(&counterparty, &mut tiers, &mut failures)
                    .await;

                events.push(ExchangeFlowEvent {
                    exchange_address: exchange.address.clone(),
                    exchange_name: exchange.label.clone(),
                    counterparty_label: self.profiles.registry().label(&counterparty).map(str::to_string),
                    counterparty_tier,
                    counterparty,
                    direction,
                    amount_eth,
                    significance: Significance::from_value(amount_eth),
                    transaction: tx,
                });
            }
        }

        if scanned == 0 {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        // A transfer between two tracked exchanges shows up once per side.
        events.sort_by(|a, b| {
            b.transaction
                .block_number
                .cmp(&a.transaction.block_number)
                .then_with(|| b.transaction.timestamp.cmp(&a.transaction.timestamp))
                .then_with(|| a.transaction.hash.cmp(&b.transaction.hash))
        });
        let summary = summarize(&events);

        info!(
            "Tracked {} exchange flows ({} deposits, {} withdrawals, net {} ETH)",
            events.len(),
            summary.deposit_count,
            summary.withdrawal_count,
            summary.net_flow_eth
        );

        Ok(ExchangeFlowReport {
            min_amount_eth,
            events,
            summary,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::testing::{envelope, not_ok, reverted, routed, tx_json, wei};
    use crate::whale::types::WhaleTier;
    use crate::whale::registry::{EntityKind, KnownEntityRegistry};
    use crate::whale::testing::{addr, entity, Fixture};
    use alloy_primitives::U256;
    use serde_json::json;

    const HOT_WALLET: &str = "0x28c6c06298d514db089934071355e5743bf21d60";
    const COLD_WALLET: &str = "0xbe0eb53f46cd790cd13851d5eff43d12404d33e8";
    const TRADER: &str = "0x4444444444444444444444444444444444444444";
    const FUND: &str = "0x5555555555555555555555555555555555555555";

    fn transfer(from: &str, to: Option<&str>) -> Transaction {
        Transaction {
            hash: "0xabc".to_string(),
            from: addr(from),
            to: to.map(addr),
            value_wei: U256::from(1u8),
            block_number: 1,
            timestamp: 1,
            gas_used: 21_000,
            gas_price: U256::ZERO,
            is_error: false,
        }
    }

    #[test]
    fn direction_follows_which_side_is_the_exchange() {
        let exchange = addr(HOT_WALLET);

        assert_eq!(
            classify_flow(&exchange, &transfer(TRADER, Some(HOT_WALLET))),
            Some((FlowDirection::Deposit, addr(TRADER)))
        );
        assert_eq!(
            classify_flow(&exchange, &transfer(HOT_WALLET, Some(FUND))),
            Some((FlowDirection::Withdrawal, addr(FUND)))
        );
    }

    #[test]
    fn self_transfers_and_contract_creation_are_skipped() {
        let exchange = addr(HOT_WALLET);
        let mut failed = transfer(TRADER, Some(HOT_WALLET));
        failed.is_error = true;

        assert_eq!(classify_flow(&exchange, &failed), None);

        assert_eq!(classify_flow(&exchange, &transfer(HOT_WALLET, Some(HOT_WALLET))), None);
        assert_eq!(classify_flow(&exchange, &transfer(HOT_WALLET, None)), None);
        assert_eq!(classify_flow(&exchange, &transfer(TRADER, Some(FUND))), None);
    }

    #[tokio::test(start_paused = true)]
    async fn flows_above_the_minimum_are_reported_newest_first() {
        let registry = KnownEntityRegistry::new([
            entity(HOT_WALLET, "Binance 14", EntityKind::Exchange),
            entity(COLD_WALLET, "Binance 7", EntityKind::Exchange),
            entity(FUND, "Some Fund", EntityKind::Other),
        ]);
        let transport = routed(|action, address| match (action, address) {
            ("txlist", HOT_WALLET) => envelope(json!([
                tx_json("0xf1", TRADER, Some(HOT_WALLET), 750, 300, 1_700_003_000),
                tx_json("0xf2", HOT_WALLET, Some(FUND), 2_000, 290, 1_700_002_900),
                tx_json("0xf3", TRADER, Some(HOT_WALLET), 499, 280, 1_700_002_800),
                tx_json("0xf4", HOT_WALLET, Some(HOT_WALLET), 900, 270, 1_700_002_700),
                tx_json("0xf5", HOT_WALLET, None, 900, 260, 1_700_002_600),
            ])),
            ("txlist", COLD_WALLET) => envelope(json!([
                tx_json("0xf6", COLD_WALLET, Some(TRADER), 500, 295, 1_700_002_950),
                reverted(tx_json("0xf7", TRADER, Some(COLD_WALLET), 8_000, 299, 1_700_002_990)),
            ])),
            ("balance", TRADER) => envelope(json!(wei(1_200))),
            ("balance", FUND) => envelope(json!(wei(15_000))),
            _ => not_ok("No transactions found", json!([])),
        });
        let fixture = Fixture::new(transport, registry);
        let tracker = ExchangeFlowTracker::new(fixture.profiles());

        let report = tracker.track(Decimal::new(500, 0)).await.unwrap();

        let hashes: Vec<_> = report.events.iter().map(|e| e.transaction.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xf1", "0xf6", "0xf2"]);
        assert!(report.events.iter().all(|e| e.amount_eth >= Decimal::new(500, 0)));

        assert_eq!(report.events[0].direction, FlowDirection::Deposit);
        assert_eq!(report.events[0].counterparty, addr(TRADER));
        assert_eq!(report.events[0].counterparty_tier, Some(WhaleTier::LargeWhale));
        assert_eq!(report.events[0].counterparty_label, None);
        assert_eq!(report.events[1].direction, FlowDirection::Withdrawal);
        assert_eq!(report.events[1].exchange_name, "Binance 7");
        assert_eq!(report.events[2].significance, Significance::Major);
        assert_eq!(report.events[2].counterparty_tier, Some(WhaleTier::MegaWhale));
        assert_eq!(report.events[2].counterparty_label.as_deref(), Some("Some Fund"));
        assert!(report.failures.is_empty());

        assert_eq!(report.summary.deposit_count, 1);
        assert_eq!(report.summary.withdrawal_count, 2);
        assert_eq!(report.summary.total_deposits_eth, Decimal::new(750, 0));
        assert_eq!(report.summary.total_withdrawals_eth, Decimal::new(2_500, 0));
        assert_eq!(report.summary.net_flow_eth, Decimal::new(1_750, 0));
        assert_eq!(report.summary.active_exchanges, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_failures_travel_with_partial_results() {
        let registry = KnownEntityRegistry::new([
            entity(HOT_WALLET, "Binance 14", EntityKind::Exchange),
            entity(COLD_WALLET, "Binance 7", EntityKind::Exchange),
        ]);
        let transport = routed(|action, address| match (action, address) {
            ("txlist", HOT_WALLET) => not_ok("NOTOK", json!("Query Timeout occured. Please select a smaller result dataset")),
            ("txlist", COLD_WALLET) => envelope(json!([
                tx_json("0xf6", COLD_WALLET, Some(TRADER), 600, 295, 1_700_002_950),
            ])),
            ("balance", _) => envelope(json!("0")),
            _ => not_ok("No transactions found", json!([])),
        });
        let fixture = Fixture::new(transport, registry);
        let tracker = ExchangeFlowTracker::new(fixture.profiles());

        let report = tracker.track(Decimal::new(500, 0)).await.unwrap();

        assert_eq!(report.events.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, OperationStep::ScanExchange);
        assert_eq!(report.failures[0].address, Some(addr(HOT_WALLET)));
    }

    #[tokio::test(start_paused = true)]
    async fn counterparty_that_cannot_be_classified_is_recorded_once() {
        let registry = KnownEntityRegistry::new([entity(HOT_WALLET, "Binance 14", EntityKind::Exchange)]);
        let transport = routed(|action, address| match (action, address) {
            ("txlist", HOT_WALLET) => envelope(json!([
                tx_json("0xf1", TRADER, Some(HOT_WALLET), 750, 300, 1_700_003_000),
                tx_json("0xf2", HOT_WALLET, Some(TRADER), 600, 299, 1_700_002_990),
            ])),
            ("balance", TRADER) => not_ok("NOTOK", json!("Error! Invalid address format")),
            _ => not_ok("No transactions found", json!([])),
        });
        let fixture = Fixture::new(transport, registry);
        let tracker = ExchangeFlowTracker::new(fixture.profiles());

        let report = tracker.track(Decimal::new(500, 0)).await.unwrap();

        assert_eq!(report.events.len(), 2);
        assert!(report.events.iter().all(|e| e.counterparty_tier.is_none()));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, OperationStep::Classify);
        assert_eq!(report.failures[0].address, Some(addr(TRADER)));
    }
}
