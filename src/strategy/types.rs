use rust_decimal::Decimal;
use serde::Serialize;

/// Constants of the activity and risk formulas.
///
/// activity = frequency_weight × 100 × (1 − e^(−tx_per_day / saturation_tx_per_day))
///          + large_tx_weight × 100 × large_fraction
///
/// risk = concentration_weight × 100 × (1 − diversity) × min(1, n / concentration_volume)
///      + exposure_weight × 100 × min(1, (exchange_txs + mixer_weight × mixer_txs) / n)
#[derive(Clone, Debug, PartialEq)]
pub struct ScoringConfig {
    /// Transactions strictly above this count as large.
    pub large_tx_threshold_eth: Decimal,
    pub saturation_tx_per_day: f64,
    pub frequency_weight: f64,
    pub large_tx_weight: f64,
    pub concentration_volume: usize,
    pub concentration_weight: f64,
    pub exposure_weight: f64,
    pub mixer_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            large_tx_threshold_eth: Decimal::new(50, 0),
            saturation_tx_per_day: 5.0,
            frequency_weight: 0.7,
            large_tx_weight: 0.3,
            concentration_volume: 20,
            concentration_weight: 0.6,
            exposure_weight: 0.4,
            mixer_weight: 2.0,
        }
    }
}

/// Inputs and intermediate values behind an activity score.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ActivityBreakdown {
    pub sample_size: usize,
    pub window_days: f64,
    pub tx_per_day: f64,
    pub frequency_component: f64,
    pub large_tx_count: usize,
    pub large_tx_fraction: f64,
    pub score: f64,
}

/// Inputs and intermediate values behind a risk score.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RiskBreakdown {
    pub sample_size: usize,
    pub distinct_counterparties: usize,
    pub diversity: f64,
    pub volume_factor: f64,
    pub concentration_component: f64,
    pub exchange_tx_count: usize,
    pub mixer_tx_count: usize,
    pub exposure_component: f64,
    pub score: f64,
}

pub(crate) fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}
