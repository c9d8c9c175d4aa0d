use serde::Serialize;
use thiserror::Error;

use crate::explorer::ExplorerError;

/// Discovery stopped at its candidate cap. Informational: it travels with
/// the partial results rather than replacing them.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error(
    "Discovery stopped at its cap of {limit} candidates \
     ({skipped_candidates} candidates and {unscanned_seeds} seeds left unexplored)"
)]
pub struct BoundExceeded {
    pub limit: usize,
    pub skipped_candidates: usize,
    pub unscanned_seeds: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WhaleError {
    #[error(transparent)]
    Explorer(#[from] ExplorerError),

    #[error("Batch of {requested} addresses exceeds the maximum of {max}")]
    BatchTooLarge { requested: usize, max: usize },

    #[error("At least {min} addresses are required, got {requested}")]
    BatchTooSmall { requested: usize, min: usize },

    #[error(transparent)]
    DiscoveryBoundExceeded(#[from] BoundExceeded),
}

impl WhaleError {
    pub fn is_invalid_address(&self) -> bool {
        matches!(self, WhaleError::Explorer(ExplorerError::InvalidAddress { .. }))
    }
}
