use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use rust_decimal::Decimal;

use crate::explorer::{Address, ExplorerError, Transaction};

use super::classifier::classify;
use super::error::{BoundExceeded, WhaleError};
use super::profile::ProfileBuilder;
use super::types::{
    DiscoveryReport, MovementKind, MovementReport, OperationStep, Significance, StepFailure,
    WhaleMovement, WhaleTier,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Offer {
    Inserted(usize),
    Duplicate(usize),
    Full,
}

/// Bounded, insertion-ordered set of candidate addresses. Slots are never
/// removed, so an index stays valid for the lifetime of the arena.
#[derive(Debug)]
pub(crate) struct CandidateArena {
    slots: Vec<Address>,
    index: HashMap<Address, usize>,
    visited: Vec<bool>,
    cap: usize,
    turned_away: HashSet<Address>,
}

impl CandidateArena {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            slots: Vec::with_capacity(cap),
            index: HashMap::with_capacity(cap),
            visited: Vec::with_capacity(cap),
            cap,
            turned_away: HashSet::new(),
        }
    }

    pub fn offer(&mut self, address: &Address) -> Offer {
        if let Some(&slot) = self.index.get(address) {
            return Offer::Duplicate(slot);
        }
        if self.is_full() {
            self.turned_away.insert(address.clone());
            return Offer::Full;
        }

        let slot = self.slots.len();
        self.slots.push(address.clone());
        self.visited.push(false);
        self.index.insert(address.clone(), slot);
        Offer::Inserted(slot)
    }

    /// Marks the oldest unvisited slot as visited and returns it.
    pub fn next_unvisited(&mut self) -> Option<(usize, &Address)> {
        let slot = self.visited.iter().position(|visited| !visited)?;
        self.visited[slot] = true;
        Some((slot, &self.slots[slot]))
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.cap
    }

    /// Distinct addresses turned away because the arena was full.
    pub fn overflow(&self) -> usize {
        self.turned_away.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveryRequest {
    pub min_balance_eth: Decimal,
    /// Per-transaction threshold for expanding a seed's counterparties.
    pub min_tx_value_eth: Option<Decimal>,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
}

impl DiscoveryRequest {
    pub fn new(min_balance_eth: Decimal) -> Self {
        Self {
            min_balance_eth,
            min_tx_value_eth: None,
            start_block: None,
            end_block: None,
        }
    }
}

/// Finds whales by walking the large transfers of known addresses.
pub struct WhaleDiscoveryEngine<'a> {
    profiles: ProfileBuilder<'a>,
}

impl<'a> WhaleDiscoveryEngine<'a> {
    pub fn new(profiles: ProfileBuilder<'a>) -> Self {
        Self { profiles }
    }

    /// Fails only when every seed scan failed; otherwise step failures are
    /// carried in the report next to the partial result.
    pub async fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryReport, WhaleError> {
        let config = &self.profiles.config().discovery;
        let client = self.profiles.client();
        let registry = self.profiles.registry();
        let threshold = request.min_tx_value_eth.unwrap_or(config.seed_min_tx_eth);

        let seeds: Vec<Address> = registry
            .monitored()
            .take(config.seed_limit)
            .map(|entity| entity.address.clone())
            .collect();

        let mut arena = CandidateArena::with_cap(config.candidate_cap);
        let mut failures = Vec::new();
        let mut first_error: Option<ExplorerError> = None;
        let mut scanned_seeds = 0;
        let mut unscanned_seeds = 0;

        for (position, seed) in seeds.iter().enumerate() {
            if arena.is_full() {
                unscanned_seeds = seeds.len() - position;
                break;
            }

            let transactions = match client
                .get_transactions(
                    seed,
                    request.start_block,
                    request.end_block,
                    1,
                    config.seed_page_size,
                )
                .await
            {
                Ok(transactions) => transactions,
                Err(e) => {
                    warn!("Seed scan of {} failed: {}", seed.short(), e);
                    failures.push(StepFailure {
                        step: OperationStep::Seed,
                        address: Some(seed.clone()),
                        message: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            scanned_seeds += 1;

            for tx in transactions
                .iter()
                .filter(|tx| !tx.is_error && tx.value_eth() >= threshold)
            {
                for participant in std::iter::once(&tx.from).chain(tx.to.as_ref()) {
                    arena.offer(participant);
                }
            }
            debug!("Seed {} expanded, {} candidates", seed.short(), arena.len());
        }

        if scanned_seeds == 0 {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        let bound_exceeded = (arena.overflow() > 0 || unscanned_seeds > 0).then(|| BoundExceeded {
            limit: config.candidate_cap,
            skipped_candidates: arena.overflow(),
            unscanned_seeds,
        });
        if let Some(bound) = &bound_exceeded {
            warn!("{}", bound);
        }

        let mut rich: Vec<(Address, Decimal, WhaleTier)> = Vec::new();
        while let Some((_, candidate)) = arena.next_unvisited() {
            let candidate = candidate.clone();
            match self.profiles.balance_eth(&candidate).await {
                Ok(balance_eth) if balance_eth >= request.min_balance_eth => {
                    rich.push((candidate, balance_eth, classify(balance_eth)));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Balance lookup for {} failed: {}", candidate.short(), e);
                    failures.push(StepFailure {
                        step: OperationStep::Classify,
                        address: Some(candidate),
                        message: e.to_string(),
                    });
                }
            }
        }

        rich.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.1.cmp(&a.1)).then_with(|| a.0.cmp(&b.0)));
        rich.truncate(config.max_results);

        let mut whales = Vec::with_capacity(rich.len());
        for (address, balance_eth, _) in rich {
            match self.profiles.build_with_balance(&address, balance_eth).await {
                Ok(profile) => whales.push(profile),
                Err(e) => {
                    warn!("Could not profile {}: {}", address.short(), e);
                    failures.push(StepFailure {
                        step: OperationStep::Analyze,
                        address: Some(address),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Discovered {} whales above {} ETH from {} candidates",
            whales.len(),
            request.min_balance_eth,
            arena.len()
        );

        Ok(DiscoveryReport {
            min_balance_eth: request.min_balance_eth,
            whales,
            candidates_scanned: arena.len(),
            bound_exceeded,
            failures,
        })
    }

    /// Large transfers seen on the recent pages of monitored addresses.
    pub async fn discover_movements(&self, min_value_eth: Decimal) -> Result<MovementReport, WhaleError> {
        let config = self.profiles.config();
        let client = self.profiles.client();
        let registry = self.profiles.registry();

        let monitored: Vec<Address> = registry
            .monitored()
            .take(config.movement_monitor_limit)
            .map(|entity| entity.address.clone())
            .collect();

        let mut failures = Vec::new();
        let mut first_error: Option<ExplorerError> = None;
        let mut scanned = 0;
        let mut seen = HashSet::new();
        let mut large: Vec<Transaction> = Vec::new();

        for address in &monitored {
            match client
                .get_transactions(address, None, None, 1, config.movement_page_size)
                .await
            {
                Ok(transactions) => {
                    scanned += 1;
                    large.extend(transactions.into_iter().filter(|tx| {
                        !tx.is_error
                            && tx.value_eth() >= min_value_eth
                            && seen.insert(tx.hash.clone())
                    }));
                }
                Err(e) => {
                    warn!("Scan of monitored address {} failed: {}", address.short(), e);
                    failures.push(StepFailure {
                        step: OperationStep::ScanMonitored,
                        address: Some(address.clone()),
                        message: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        if scanned == 0 {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        let mut tiers: HashMap<Address, Option<WhaleTier>> = HashMap::new();
        let mut movements = Vec::with_capacity(large.len());

        for tx in large {
            let from_tier = self.profiles.tier_of(&tx.from, &mut tiers, &mut failures).await;
            let to_tier = match &tx.to {
                Some(to) => self.profiles.tier_of(to, &mut tiers, &mut failures).await,
                None => None,
            };

            let from_exchange = registry.exchange_name(&tx.from).map(str::to_string);
            let to_exchange = tx
                .to
                .as_ref()
                .and_then(|to| registry.exchange_name(to))
                .map(str::to_string);
            let kind = if to_exchange.is_some() {
                MovementKind::ExchangeDeposit
            } else if from_exchange.is_some() {
                MovementKind::ExchangeWithdrawal
            } else {
                MovementKind::WhaleTransfer
            };
            let value_eth = tx.value_eth();

            movements.push(WhaleMovement {
                from_label: registry.label(&tx.from).map(str::to_string),
                to_label: tx.to.as_ref().and_then(|to| registry.label(to)).map(str::to_string),
                tx_hash: tx.hash,
                from: tx.from,
                to: tx.to,
                value_eth,
                block_number: tx.block_number,
                timestamp: tx.timestamp,
                from_tier,
                to_tier,
                from_exchange,
                to_exchange,
                kind,
                significance: Significance::from_value(value_eth),
            });
        }

        movements.sort_by(by_value_desc);
        movements.truncate(config.max_movements);
        let total_value_eth = movements.iter().map(|m| m.value_eth).sum();

        info!(
            "Found {} whale movements of at least {} ETH",
            movements.len(),
            min_value_eth
        );

        Ok(MovementReport {
            min_value_eth,
            movements,
            total_value_eth,
            failures,
        })
    }
}

fn by_value_desc(a: &WhaleMovement, b: &WhaleMovement) -> Ordering {
    b.value_eth
        .cmp(&a.value_eth)
        .then_with(|| b.block_number.cmp(&a.block_number))
        .then_with(|| a.tx_hash.cmp(&b.tx_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::testing::{envelope, not_ok, reverted, routed, tx_json, wei};
    use crate::whale::config::WhaleConfig;
    use crate::whale::registry::{EntityKind, KnownEntityRegistry};
    use crate::whale::testing::{addr, entity, Fixture};
    use serde_json::{json, Value};

    const SEED_1: &str = "0x1000000000000000000000000000000000000001";
    const SEED_2: &str = "0x1000000000000000000000000000000000000002";
    const A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "0xcccccccccccccccccccccccccccccccccccccccc";
    const D: &str = "0xdddddddddddddddddddddddddddddddddddddddd";

    fn seeds() -> KnownEntityRegistry {
        KnownEntityRegistry::new([
            entity(SEED_1, "Seed One", EntityKind::Exchange),
            entity(SEED_2, "Seed Two", EntityKind::Other),
        ])
    }

    fn seed_pages(action: &str, address: &str) -> Value {
        match (action, address) {
            ("txlist", SEED_1) => envelope(json!([
                tx_json("0x01", SEED_1, Some(A), 100, 40, 1_700_000_400),
                tx_json("0x02", B, Some(SEED_1), 60, 30, 1_700_000_300),
                tx_json("0x03", SEED_1, Some(C), 10, 20, 1_700_000_200),
                tx_json("0x04", A, Some(SEED_1), 200, 10, 1_700_000_100),
            ])),
            ("txlist", SEED_2) => envelope(json!([
                tx_json("0x05", SEED_2, Some(A), 500, 50, 1_700_000_500),
                tx_json("0x06", SEED_2, Some(D), 70, 45, 1_700_000_450),
            ])),
            ("balance", SEED_1) => envelope(json!(wei(5_000))),
            ("balance", SEED_2) => envelope(json!(wei(999))),
            ("balance", A) => envelope(json!(wei(20_000))),
            ("balance", B) => envelope(json!(wei(1_500))),
            ("balance", D) => envelope(json!(wei(1_000))),
            ("balance", _) => envelope(json!("0")),
            _ => not_ok("No transactions found", json!([])),
        }
    }

    #[test]
    fn arena_deduplicates_and_counts_overflow() {
        let mut arena = CandidateArena::with_cap(2);

        assert_eq!(arena.offer(&addr(A)), Offer::Inserted(0));
        assert_eq!(arena.offer(&addr(A)), Offer::Duplicate(0));
        assert_eq!(arena.offer(&addr(B)), Offer::Inserted(1));
        assert_eq!(arena.offer(&addr(C)), Offer::Full);
        assert_eq!(arena.offer(&addr(B)), Offer::Duplicate(1));
        assert_eq!(arena.offer(&addr(C)), Offer::Full);
        assert_eq!(arena.overflow(), 1);
        assert_eq!(arena.offer(&addr(D)), Offer::Full);
        assert_eq!(arena.overflow(), 2);

        assert_eq!(arena.next_unvisited().map(|(slot, _)| slot), Some(0));
        assert_eq!(arena.next_unvisited().map(|(_, a)| a.clone()), Some(addr(B)));
        assert!(arena.next_unvisited().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_keeps_only_rich_candidates_in_rank_order() {
        let fixture = Fixture::new(routed(seed_pages), seeds());
        let engine = WhaleDiscoveryEngine::new(fixture.profiles());

        let report = engine
            .discover(&DiscoveryRequest::new(Decimal::new(1_000, 0)))
            .await
            .unwrap();

        let found: Vec<_> = report.whales.iter().map(|w| w.address.as_str()).collect();
        assert_eq!(found, vec![A, SEED_1, B, D]);
        assert!(report.whales.iter().all(|w| w.balance_eth >= Decimal::new(1_000, 0)));
        assert_eq!(report.whales[0].tier, WhaleTier::MegaWhale);
        assert_eq!(report.whales[0].balance_eth, Decimal::new(20_000, 0));
        assert_eq!(report.whales[1].exchange_name.as_deref(), Some("Seed One"));
        assert_eq!(report.whales[1].known_entity_label.as_deref(), Some("Seed One"));
        // Full profiles: the seed's own page is its activity sample.
        assert_eq!(report.whales[1].total_tx_count, 4);
        assert_eq!(report.whales[1].max_tx_value_eth, Decimal::new(200, 0));
        assert!(report.whales[1].last_activity.is_some());
        assert_eq!(report.whales[0].total_tx_count, 0);
        // SEED_1, A, B from the first seed; SEED_2 and D from the second. C is below 50 ETH.
        assert_eq!(report.candidates_scanned, 5);
        assert!(report.bound_exceeded.is_none());
        assert!(report.failures.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hitting_the_candidate_cap_is_reported_with_partial_results() {
        let mut config = WhaleConfig::default();
        config.discovery.candidate_cap = 3;
        let fixture = Fixture::with_config(routed(seed_pages), seeds(), config);
        let engine = WhaleDiscoveryEngine::new(fixture.profiles());

        let report = engine
            .discover(&DiscoveryRequest::new(Decimal::new(1_000, 0)))
            .await
            .unwrap();

        assert_eq!(report.candidates_scanned, 3);
        assert_eq!(
            report.bound_exceeded,
            Some(BoundExceeded {
                limit: 3,
                skipped_candidates: 0,
                unscanned_seeds: 1,
            })
        );
        assert!(matches!(
            report.bound_error(),
            Some(WhaleError::DiscoveryBoundExceeded(_))
        ));
        assert_eq!(report.whales.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_seed_is_recorded_and_the_rest_continue() {
        let transport = routed(|action, address| match (action, address) {
            ("txlist", SEED_1) => not_ok("NOTOK", json!("Error! Invalid address format")),
            other => seed_pages(other.0, other.1),
        });
        let fixture = Fixture::new(transport, seeds());
        let engine = WhaleDiscoveryEngine::new(fixture.profiles());

        let report = engine
            .discover(&DiscoveryRequest::new(Decimal::new(1_000, 0)))
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, OperationStep::Seed);
        assert_eq!(report.failures[0].address, Some(addr(SEED_1)));
        let found: Vec<_> = report.whales.iter().map(|w| w.address.as_str()).collect();
        assert_eq!(found, vec![A, D]);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_transfers_do_not_expand_the_candidate_set() {
        let transport = routed(|action, address| match (action, address) {
            ("txlist", SEED_2) => envelope(json!([
                reverted(tx_json("0x07", SEED_2, Some(C), 900, 55, 1_700_000_550)),
                tx_json("0x05", SEED_2, Some(A), 500, 50, 1_700_000_500),
                tx_json("0x06", SEED_2, Some(D), 70, 45, 1_700_000_450),
            ])),
            ("balance", C) => envelope(json!(wei(30_000))),
            other => seed_pages(other.0, other.1),
        });
        let fixture = Fixture::new(transport, seeds());
        let engine = WhaleDiscoveryEngine::new(fixture.profiles());

        let report = engine
            .discover(&DiscoveryRequest::new(Decimal::new(1_000, 0)))
            .await
            .unwrap();

        assert_eq!(report.candidates_scanned, 5);
        assert!(report.whales.iter().all(|w| w.address != addr(C)));
    }

    #[tokio::test(start_paused = true)]
    async fn whale_that_cannot_be_profiled_is_reported_as_a_failure() {
        let transport = routed(|action, address| match (action, address) {
            ("tokentx", A) => not_ok("NOTOK", json!("Error! Invalid address format")),
            other => seed_pages(other.0, other.1),
        });
        let fixture = Fixture::new(transport, seeds());
        let engine = WhaleDiscoveryEngine::new(fixture.profiles());

        let report = engine
            .discover(&DiscoveryRequest::new(Decimal::new(1_000, 0)))
            .await
            .unwrap();

        let found: Vec<_> = report.whales.iter().map(|w| w.address.as_str()).collect();
        assert_eq!(found, vec![SEED_1, B, D]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, OperationStep::Analyze);
        assert_eq!(report.failures[0].address, Some(addr(A)));
    }

    #[tokio::test(start_paused = true)]
    async fn every_seed_failing_is_an_error() {
        let transport = routed(|_, _| not_ok("NOTOK", json!("Invalid API Key")));
        let fixture = Fixture::new(transport, seeds());
        let engine = WhaleDiscoveryEngine::new(fixture.profiles());

        let error = engine
            .discover(&DiscoveryRequest::new(Decimal::ZERO))
            .await
            .unwrap_err();

        assert!(matches!(error, WhaleError::Explorer(ExplorerError::UpstreamRejection { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn movements_are_labelled_deduplicated_and_sorted_by_value() {
        const EXCHANGE: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
        const WHALE: &str = "0x9999999999999999999999999999999999999999";
        const P: &str = "0x0000000000000000000000000000000000000a0a";
        const Q: &str = "0x0000000000000000000000000000000000000b0b";
        const R: &str = "0x0000000000000000000000000000000000000c0c";
        const Y: &str = "0x0000000000000000000000000000000000000d0d";

        let registry = KnownEntityRegistry::new([
            entity(EXCHANGE, "Big Exchange", EntityKind::Exchange),
            entity(WHALE, "Old Whale", EntityKind::Other),
        ]);
        let transport = routed(|action, address| match (action, address) {
            ("txlist", EXCHANGE) => envelope(json!([
                tx_json("0xd1", P, Some(EXCHANGE), 800, 110, 1_700_001_100),
                tx_json("0xd2", EXCHANGE, Some(Q), 50, 109, 1_700_001_090),
                tx_json("0xd3", WHALE, Some(EXCHANGE), 12_000, 108, 1_700_001_080),
                tx_json("0xd4", EXCHANGE, Some(Y), 150, 107, 1_700_001_070),
            ])),
            ("txlist", WHALE) => envelope(json!([
                tx_json("0xd3", WHALE, Some(EXCHANGE), 12_000, 108, 1_700_001_080),
                tx_json("0xd5", WHALE, Some(R), 300, 106, 1_700_001_060),
                reverted(tx_json("0xd6", WHALE, Some(Y), 40_000, 105, 1_700_001_050)),
            ])),
            ("balance", EXCHANGE) => envelope(json!(wei(1_000_000))),
            ("balance", WHALE) => envelope(json!(wei(50_000))),
            ("balance", P) => envelope(json!(wei(2_000))),
            ("balance", R) => not_ok("NOTOK", json!("Error! Invalid address format")),
            ("balance", _) => envelope(json!("0")),
            _ => not_ok("No transactions found", json!([])),
        });
        let fixture = Fixture::new(transport, registry);
        let engine = WhaleDiscoveryEngine::new(fixture.profiles());

        let report = engine.discover_movements(Decimal::new(100, 0)).await.unwrap();

        let hashes: Vec<_> = report.movements.iter().map(|m| m.tx_hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xd3", "0xd1", "0xd5", "0xd4"]);
        assert_eq!(report.total_value_eth, Decimal::new(13_250, 0));

        let top = &report.movements[0];
        assert_eq!(top.kind, MovementKind::ExchangeDeposit);
        assert_eq!(top.significance, Significance::Mega);
        assert_eq!(top.from_tier, Some(WhaleTier::MegaWhale));
        assert_eq!(top.from_label.as_deref(), Some("Old Whale"));
        assert_eq!(top.to_exchange.as_deref(), Some("Big Exchange"));

        assert_eq!(report.movements[1].from_tier, Some(WhaleTier::LargeWhale));
        assert_eq!(report.movements[2].kind, MovementKind::WhaleTransfer);
        assert_eq!(report.movements[2].to_tier, None);
        assert_eq!(report.movements[3].kind, MovementKind::ExchangeWithdrawal);
        assert_eq!(report.movements[3].to_tier, Some(WhaleTier::Shrimp));

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].step, OperationStep::Classify);
        assert_eq!(report.failures[0].address, Some(addr(R)));
    }
}
