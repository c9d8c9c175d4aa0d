pub mod analyzer;
pub mod types;

pub use analyzer::{
    ActivityScorer,
    ActivityStrategy,
    ConcentrationExposureRisk,
    RiskStrategy,
    SaturatingActivity,
};
pub use types::{
    ActivityBreakdown,
    RiskBreakdown,
    ScoringConfig,
};
