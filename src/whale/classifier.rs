use rust_decimal::Decimal;

use super::types::WhaleTier;

/// Tier whose range contains `balance_eth`.
///
/// Walks the tiers from the top and returns the first one whose inclusive
/// lower bound the balance reaches. Negative input cannot come from the
/// explorer and is treated as zero.
pub fn classify(balance_eth: Decimal) -> WhaleTier {
    WhaleTier::ALL
        .iter()
        .rev()
        .copied()
        .find(|tier| balance_eth >= tier.lower_bound())
        .unwrap_or(WhaleTier::Shrimp)
}
