use std::sync::Arc;

use alloy_primitives::U256;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use zeroize::Zeroizing;

use super::cache::ResponseCache;
use super::error::{ExplorerError, RejectionKind};
use super::rate_limiter::RateLimiter;
use super::retry::RetryHandler;
use super::transport::{HttpTransport, Transport};
use super::types::{
    parse_wei, Address, ApiEnvelope, GasPrices, RawGasOracle, RawTokenTransfer, RawTransaction,
    TokenTransfer, Transaction,
};
use crate::explorer_config::{ConfigError, ExplorerConfig};

// Upstream replies with status "0" for empty lists; these are not failures.
const EMPTY_RESULT_MESSAGES: [&str; 3] = [
    "No transactions found",
    "No token transfers found",
    "No records found",
];

const DEFAULT_END_BLOCK: u64 = 99_999_999;
const MAX_PAGE_SIZE: u32 = 10_000;

/// Typed access to the explorer API.
///
/// Every request goes cache → rate limiter → transport, with retries for
/// transient failures. Callers only ever see typed values.
pub struct ExplorerClient {
    api_key: Zeroizing<String>,
    transport: Arc<dyn Transport>,
    rate_limiter: Arc<RateLimiter>,
    cache: ResponseCache,
    retry_handler: RetryHandler,
}

impl ExplorerClient {
    pub fn new(
        api_key: Zeroizing<String>,
        transport: Arc<dyn Transport>,
        rate_limiter: Arc<RateLimiter>,
        cache: ResponseCache,
        retry_handler: RetryHandler,
    ) -> Self {
        Self {
            api_key,
            transport,
            rate_limiter,
            cache,
            retry_handler,
        }
    }

    pub fn from_config(
        config: &ExplorerConfig,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config.base_url.clone(), config.create_http_client()?);

        Ok(Self::new(
            config.api_key.clone(),
            Arc::new(transport),
            rate_limiter,
            ResponseCache::new(config.cache_ttl, config.cache_capacity),
            RetryHandler::new(config.retry.clone()),
        ))
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Balance in wei.
    pub async fn get_balance(&self, address: &Address) -> Result<U256, ExplorerError> {
        let result = self
            .request(
                "account",
                "balance",
                vec![("address", address.to_string()), ("tag", "latest".to_string())],
            )
            .await?;

        match result {
            Value::String(wei) => parse_wei(&wei),
            other => Err(ExplorerError::MalformedResponse(format!(
                "balance is not a string: {other}"
            ))),
        }
    }

    /// One page of normal transactions, newest block first.
    pub async fn get_transactions(
        &self,
        address: &Address,
        start_block: Option<u64>,
        end_block: Option<u64>,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Transaction>, ExplorerError> {
        let result = self
            .request(
                "account",
                "txlist",
                vec![
                    ("address", address.to_string()),
                    ("startblock", start_block.unwrap_or(0).to_string()),
                    ("endblock", end_block.unwrap_or(DEFAULT_END_BLOCK).to_string()),
                    ("page", page.max(1).to_string()),
                    ("offset", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
                    ("sort", "desc".to_string()),
                ],
            )
            .await?;

        let raw: Vec<RawTransaction> = decode(result)?;
        let mut transactions = raw
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        transactions.sort_by(|a, b| b.block_number.cmp(&a.block_number));

        Ok(transactions)
    }

    /// One page of ERC-20 transfers, optionally for a single token contract.
    pub async fn get_token_transfers(
        &self,
        address: &Address,
        contract: Option<&Address>,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<TokenTransfer>, ExplorerError> {
        let mut params = vec![
            ("address", address.to_string()),
            ("page", page.max(1).to_string()),
            ("offset", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("sort", "desc".to_string()),
        ];
        if let Some(contract) = contract {
            params.push(("contractaddress", contract.to_string()));
        }

        let result = self.request("account", "tokentx", params).await?;

        let raw: Vec<RawTokenTransfer> = decode(result)?;
        let mut transfers = raw
            .into_iter()
            .map(TokenTransfer::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        transfers.sort_by(|a, b| b.transaction.block_number.cmp(&a.transaction.block_number));

        Ok(transfers)
    }

    /// ABI of a verified contract as parsed JSON.
    pub async fn get_contract_abi(&self, address: &Address) -> Result<Value, ExplorerError> {
        let result = self
            .request("contract", "getabi", vec![("address", address.to_string())])
            .await?;

        match result {
            Value::String(abi) => serde_json::from_str(&abi)
                .map_err(|e| ExplorerError::MalformedResponse(format!("ABI is not JSON: {e}"))),
            Value::Array(_) => Ok(result),
            other => Err(ExplorerError::MalformedResponse(format!(
                "unexpected ABI payload: {other}"
            ))),
        }
    }

    pub async fn get_gas_prices(&self) -> Result<GasPrices, ExplorerError> {
        let result = self.request("gastracker", "gasoracle", Vec::new()).await?;
        let raw: RawGasOracle = decode(result)?;
        GasPrices::try_from(raw)
    }

    async fn request(
        &self,
        module: &str,
        action: &str,
        params: Vec<(&str, String)>,
    ) -> Result<Value, ExplorerError> {
        let endpoint = format!("{module}/{action}");
        let key = ResponseCache::cache_key(&endpoint, &params);

        if let Some(hit) = self.cache.get(&key).await {
            debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        let mut query: Vec<(String, String)> = Vec::with_capacity(params.len() + 3);
        query.push(("module".to_string(), module.to_string()));
        query.push(("action".to_string(), action.to_string()));
        query.extend(params.into_iter().map(|(name, value)| (name.to_string(), value)));
        query.push(("apikey".to_string(), self.api_key.as_str().to_string()));

        let endpoint_name = endpoint.as_str();
        let result = self
            .retry_handler
            .retry(endpoint_name, || {
                let query = query.clone();
                async move {
                    self.rate_limiter.acquire().await;
                    debug!("GET {}", endpoint_name);
                    let body = self.transport.get(query).await?;
                    unwrap_envelope(endpoint_name, body)
                }
            })
            .await?;

        self.cache.insert(key, result.clone()).await;
        Ok(result)
    }
}

fn unwrap_envelope(endpoint: &str, body: Value) -> Result<Value, ExplorerError> {
    let envelope: ApiEnvelope = serde_json::from_value(body)
        .map_err(|e| ExplorerError::MalformedResponse(format!("{endpoint}: {e}")))?;

    if envelope.status == "1" {
        return Ok(envelope.result);
    }

    if EMPTY_RESULT_MESSAGES
        .iter()
        .any(|empty| envelope.message.starts_with(empty))
    {
        return Ok(Value::Array(Vec::new()));
    }

    let detail = match &envelope.result {
        Value::String(text) if !text.is_empty() => text.clone(),
        _ => envelope.message.clone(),
    };
    let kind = match RejectionKind::from_upstream_message(&detail) {
        RejectionKind::Other => RejectionKind::from_upstream_message(&envelope.message),
        kind => kind,
    };

    Err(ExplorerError::UpstreamRejection {
        endpoint: endpoint.to_string(),
        kind,
        message: detail,
    })
}

fn decode<T: DeserializeOwned>(result: Value) -> Result<T, ExplorerError> {
    serde_json::from_value(result).map_err(|e| ExplorerError::MalformedResponse(e.to_string()))
}
