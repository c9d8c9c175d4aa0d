use std::collections::HashSet;

use log::{info, warn};
use rust_decimal::Decimal;

use crate::explorer::{Address, ExplorerError};

use super::error::WhaleError;
use super::profile::ProfileBuilder;
use super::types::{ComparisonReport, OperationStep, RankedWhale, StepFailure, WhaleProfile};

/// Checks batch size, then address syntax. Nothing here touches the
/// network. Repeated addresses are compared once.
pub fn validate<S: AsRef<str>>(
    inputs: &[S],
    min: usize,
    max: usize,
) -> Result<Vec<Address>, WhaleError> {
    if inputs.len() > max {
        return Err(WhaleError::BatchTooLarge {
            requested: inputs.len(),
            max,
        });
    }
    if inputs.len() < min {
        return Err(WhaleError::BatchTooSmall {
            requested: inputs.len(),
            min,
        });
    }

    let mut seen = HashSet::new();
    let mut addresses = Vec::with_capacity(inputs.len());
    for input in inputs {
        let address = Address::parse(input.as_ref())?;
        if seen.insert(address.clone()) {
            addresses.push(address);
        }
    }
    Ok(addresses)
}

/// Orders profiles by balance, largest first, and sizes each against the
/// top entry.
pub fn rank(mut profiles: Vec<WhaleProfile>) -> Vec<RankedWhale> {
    profiles.sort_by(|a, b| {
        b.balance_eth
            .cmp(&a.balance_eth)
            .then_with(|| a.address.cmp(&b.address))
    });

    let top = profiles.first().map(|p| p.balance_eth).unwrap_or(Decimal::ZERO);
    profiles
        .into_iter()
        .enumerate()
        .map(|(position, profile)| RankedWhale {
            rank: position + 1,
            relative_size: if top.is_zero() {
                Decimal::ONE
            } else {
                (profile.balance_eth / top).round_dp(6)
            },
            profile,
        })
        .collect()
}

pub struct ComparisonRanker<'a> {
    profiles: ProfileBuilder<'a>,
}

impl<'a> ComparisonRanker<'a> {
    pub fn new(profiles: ProfileBuilder<'a>) -> Self {
        Self { profiles }
    }

    pub async fn compare<S: AsRef<str>>(&self, inputs: &[S]) -> Result<ComparisonReport, WhaleError> {
        let config = self.profiles.config();
        let addresses = validate(inputs, config.min_compare_batch, config.max_compare_batch)?;

        let mut profiles = Vec::with_capacity(addresses.len());
        let mut failures = Vec::new();
        let mut first_error: Option<ExplorerError> = None;
        for address in addresses {
            match self.profiles.build(&address).await {
                Ok(profile) => profiles.push(profile),
                Err(e) => {
                    warn!("Could not analyze {} for comparison: {}", address.short(), e);
                    failures.push(StepFailure {
                        step: OperationStep::Analyze,
                        address: Some(address),
                        message: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        if profiles.is_empty() {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }

        let total_eth: Decimal = profiles.iter().map(|p| p.balance_eth).sum();
        let average_activity_score = if profiles.is_empty() {
            0.0
        } else {
            profiles.iter().map(|p| p.activity_score).sum::<f64>() / profiles.len() as f64
        };
        let ranked = rank(profiles);

        info!(
            "Compared {} addresses, {} failed, {} ETH in total",
            ranked.len() + failures.len(),
            failures.len(),
            total_eth
        );

        Ok(ComparisonReport {
            ranked,
            total_eth,
            average_activity_score,
            failures,
        })
    }
}
