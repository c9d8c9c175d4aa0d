use std::collections::HashSet;

use crate::explorer::{Address, Transaction};
use crate::whale::registry::KnownEntityRegistry;

use super::types::{clamp_score, ActivityBreakdown, RiskBreakdown, ScoringConfig};

const SECONDS_PER_DAY: f64 = 86_400.0;

pub trait ActivityStrategy: Send + Sync {
    fn score(&self, subject: &Address, sample: &[Transaction]) -> ActivityBreakdown;
}

pub trait RiskStrategy: Send + Sync {
    fn score(
        &self,
        subject: &Address,
        sample: &[Transaction],
        registry: &KnownEntityRegistry,
    ) -> RiskBreakdown;
}

/// Frequency over the sampled window with exponential saturation, blended
/// with the share of large transfers.
#[derive(Clone, Debug)]
pub struct SaturatingActivity {
    config: ScoringConfig,
}

impl SaturatingActivity {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }
}

impl ActivityStrategy for SaturatingActivity {
    fn score(&self, _subject: &Address, sample: &[Transaction]) -> ActivityBreakdown {
        if sample.is_empty() {
            return ActivityBreakdown::default();
        }

        let n = sample.len();
        let newest = sample.iter().map(|tx| tx.timestamp).max().unwrap_or(0);
        let oldest = sample.iter().map(|tx| tx.timestamp).min().unwrap_or(0);
        let window_days = ((newest - oldest) as f64 / SECONDS_PER_DAY).max(1.0);
        let tx_per_day = n as f64 / window_days;

        let saturation = self.config.saturation_tx_per_day.max(f64::EPSILON);
        let frequency_component = 100.0 * (1.0 - (-tx_per_day / saturation).exp());

        let large_tx_count = sample
            .iter()
            .filter(|tx| !tx.is_error && tx.value_eth() > self.config.large_tx_threshold_eth)
            .count();
        let large_tx_fraction = large_tx_count as f64 / n as f64;

        let score = clamp_score(
            self.config.frequency_weight * frequency_component
                + self.config.large_tx_weight * 100.0 * large_tx_fraction,
        );

        ActivityBreakdown {
            sample_size: n,
            window_days,
            tx_per_day,
            frequency_component,
            large_tx_count,
            large_tx_fraction,
            score,
        }
    }
}

/// Counterparty concentration weighted by volume, plus exposure to known
/// exchanges and mixers.
#[derive(Clone, Debug)]
pub struct ConcentrationExposureRisk {
    config: ScoringConfig,
}

impl ConcentrationExposureRisk {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }
}

impl RiskStrategy for ConcentrationExposureRisk {
    fn score(
        &self,
        subject: &Address,
        sample: &[Transaction],
        registry: &KnownEntityRegistry,
    ) -> RiskBreakdown {
        if sample.is_empty() {
            return RiskBreakdown::default();
        }

        let n = sample.len();
        let mut counterparties = HashSet::new();
        let mut exchange_tx_count = 0;
        let mut mixer_tx_count = 0;

        for tx in sample {
            let Some(counterparty) = tx.counterparty_of(subject) else {
                continue;
            };
            counterparties.insert(counterparty);
            if registry.is_mixer(counterparty) {
                mixer_tx_count += 1;
            } else if registry.is_exchange(counterparty) {
                exchange_tx_count += 1;
            }
        }

        let distinct_counterparties = counterparties.len();
        let diversity = distinct_counterparties as f64 / n as f64;
        let volume_factor =
            (n as f64 / self.config.concentration_volume.max(1) as f64).min(1.0);
        let concentration_component = 100.0 * (1.0 - diversity) * volume_factor;

        let weighted_exposure =
            exchange_tx_count as f64 + self.config.mixer_weight * mixer_tx_count as f64;
        let exposure_component = 100.0 * (weighted_exposure / n as f64).min(1.0);

        let score = clamp_score(
            self.config.concentration_weight * concentration_component
                + self.config.exposure_weight * exposure_component,
        );

        RiskBreakdown {
            sample_size: n,
            distinct_counterparties,
            diversity,
            volume_factor,
            concentration_component,
            exchange_tx_count,
            mixer_tx_count,
            exposure_component,
            score,
        }
    }
}

/// Runs the configured activity and risk strategies over a transaction
/// sample. The sample is only the most recent page of history, so both
/// scores describe recent behaviour, not the account's lifetime.
pub struct ActivityScorer {
    config: ScoringConfig,
    activity: Box<dyn ActivityStrategy>,
    risk: Box<dyn RiskStrategy>,
}

impl ActivityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            activity: Box::new(SaturatingActivity::new(config.clone())),
            risk: Box::new(ConcentrationExposureRisk::new(config.clone())),
            config,
        }
    }

    pub fn with_strategies(
        config: ScoringConfig,
        activity: Box<dyn ActivityStrategy>,
        risk: Box<dyn RiskStrategy>,
    ) -> Self {
        Self {
            config,
            activity,
            risk,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(
        &self,
        subject: &Address,
        sample: &[Transaction],
        registry: &KnownEntityRegistry,
    ) -> (ActivityBreakdown, RiskBreakdown) {
        (
            self.activity.score(subject, sample),
            self.risk.score(subject, sample, registry),
        )
    }
}

impl Default for ActivityScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
