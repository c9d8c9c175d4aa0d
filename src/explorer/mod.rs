pub mod cache;
pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod retry;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::ResponseCache;
pub use client::ExplorerClient;
pub use error::{ExplorerError, RejectionKind};
pub use rate_limiter::RateLimiter;
pub use retry::{RetryConfig, RetryHandler};
pub use transport::{HttpTransport, Transport};
pub use types::{Address, GasPrices, TokenTransfer, Transaction};
