//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Value};
use tokio::time::Duration;
use zeroize::Zeroizing;

use super::cache::ResponseCache;
use super::client::ExplorerClient;
use super::rate_limiter::RateLimiter;
use super::retry::{RetryConfig, RetryHandler};
use super::transport::MockTransport;

pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

pub fn client_with(transport: MockTransport) -> ExplorerClient {
    ExplorerClient::new(
        Zeroizing::new("test-key".to_string()),
        Arc::new(transport),
        Arc::new(RateLimiter::per_second(5)),
        ResponseCache::with_ttl(Duration::from_secs(30)),
        RetryHandler::new(RetryConfig::default()),
    )
}

/// A transport that answers every request with `handler(action, address)`.
/// `address` is empty for actions that take none.
pub fn routed<F>(handler: F) -> MockTransport
where
    F: Fn(&str, &str) -> Value + Send + 'static,
{
    let mut transport = MockTransport::new();
    transport.expect_get().returning(move |query| {
        let action = param(&query, "action").unwrap_or_default();
        let address = param(&query, "address").unwrap_or_default();
        let body = handler(&action, &address);
        async move { Ok(body) }.boxed()
    });
    transport
}

pub fn envelope(result: Value) -> Value {
    json!({ "status": "1", "message": "OK", "result": result })
}

pub fn not_ok(message: &str, result: Value) -> Value {
    json!({ "status": "0", "message": message, "result": result })
}

pub fn param(query: &[(String, String)], name: &str) -> Option<String> {
    query
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}

pub fn wei(eth: u64) -> String {
    (u128::from(eth) * WEI_PER_ETH).to_string()
}

/// A `txlist` row moving `value_eth` whole ether.
pub fn tx_json(
    hash: &str,
    from: &str,
    to: Option<&str>,
    value_eth: u64,
    block: u64,
    timestamp: u64,
) -> Value {
    json!({
        "blockNumber": block.to_string(),
        "timeStamp": timestamp.to_string(),
        "hash": hash,
        "from": from,
        "to": to.unwrap_or(""),
        "value": wei(value_eth),
        "gas": "21000",
        "gasPrice": "20000000000",
        "gasUsed": "21000",
        "isError": "0",
        "contractAddress": if to.is_none() { "0x0000000000000000000000000000000000000001" } else { "" }
    })
}

/// Marks a `txlist` row as a failed (reverted) execution.
pub fn reverted(mut row: Value) -> Value {
    row["isError"] = json!("1");
    row
}
