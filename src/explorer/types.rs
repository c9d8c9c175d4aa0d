use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::error::ExplorerError;

pub const WEI_DECIMALS: u32 = 18;

// rust_decimal cannot represent more fractional digits than this
const MAX_DECIMAL_SCALE: u32 = 28;
const MAX_DECIMAL_MANTISSA: u128 = (1 << 96) - 1;

/// Account identifier in canonical lower-case `0x` form.
///
/// Parsing accepts any casing (checksummed or not) and a missing prefix, so
/// two spellings of the same account always compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(input: &str) -> Result<Self, ExplorerError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ExplorerError::InvalidAddress {
                input: input.to_string(),
            });
        }

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x12345678...abcdef`, for log lines.
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..10], &self.0[self.0.len() - 6..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ExplorerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Converts an integer amount in base units into a decimal amount.
///
/// Amounts wider than a 96-bit mantissa lose their lowest fractional
/// digits. Returns `None` only when the integer part itself does not fit.
pub fn units_to_decimal(raw: U256, decimals: u32) -> Option<Decimal> {
    let max_mantissa = U256::from(MAX_DECIMAL_MANTISSA);
    let ten = U256::from(10u8);
    let mut mantissa = raw;
    let mut scale = i64::from(decimals);

    while mantissa > max_mantissa || scale > i64::from(MAX_DECIMAL_SCALE) {
        if scale == 0 {
            return None;
        }
        mantissa /= ten;
        scale -= 1;
    }

    let mantissa = i128::try_from(mantissa.to::<u128>()).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, u32::try_from(scale).ok()?).ok()
}

pub fn wei_to_eth(wei: U256) -> Option<Decimal> {
    units_to_decimal(wei, WEI_DECIMALS).map(|eth| eth.normalize())
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub hash: String,
    pub from: Address,
    /// `None` only for contract creation.
    pub to: Option<Address>,
    pub value_wei: U256,
    pub block_number: u64,
    pub timestamp: u64,
    pub gas_used: u64,
    pub gas_price: U256,
    pub is_error: bool,
}

impl Transaction {
    pub fn value_eth(&self) -> Decimal {
        wei_to_eth(self.value_wei).unwrap_or(Decimal::MAX)
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp as i64, 0).single()
    }

    /// The other side of the transfer as seen from `address`.
    pub fn counterparty_of(&self, address: &Address) -> Option<&Address> {
        if &self.from == address {
            self.to.as_ref()
        } else {
            Some(&self.from)
        }
    }

    pub fn touches(&self, address: &Address) -> bool {
        &self.from == address || self.to.as_ref() == Some(address)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TokenTransfer {
    pub transaction: Transaction,
    pub token_contract: Address,
    pub token_name: String,
    pub token_symbol: String,
    pub token_decimals: u32,
}

impl TokenTransfer {
    /// Human-facing amount, i.e. the raw value divided by 10^decimals.
    pub fn amount(&self) -> Option<Decimal> {
        units_to_decimal(self.transaction.value_wei, self.token_decimals).map(|a| a.normalize())
    }
}

// Wei values go out as decimal strings next to their ETH (or token) amount.
impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_struct("Transaction", 10)?;
        row.serialize_field("hash", &self.hash)?;
        row.serialize_field("from", &self.from)?;
        row.serialize_field("to", &self.to)?;
        row.serialize_field("value_wei", &self.value_wei.to_string())?;
        row.serialize_field("value_eth", &self.value_eth())?;
        row.serialize_field("block_number", &self.block_number)?;
        row.serialize_field("timestamp", &self.timestamp)?;
        row.serialize_field("gas_used", &self.gas_used)?;
        row.serialize_field("gas_price", &self.gas_price.to_string())?;
        row.serialize_field("is_error", &self.is_error)?;
        row.end()
    }
}

impl Serialize for TokenTransfer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tx = &self.transaction;
        let mut row = serializer.serialize_struct("TokenTransfer", 12)?;
        row.serialize_field("hash", &tx.hash)?;
        row.serialize_field("from", &tx.from)?;
        row.serialize_field("to", &tx.to)?;
        row.serialize_field("raw_value", &tx.value_wei.to_string())?;
        row.serialize_field("amount", &self.amount())?;
        row.serialize_field("token_contract", &self.token_contract)?;
        row.serialize_field("token_name", &self.token_name)?;
        row.serialize_field("token_symbol", &self.token_symbol)?;
        row.serialize_field("token_decimals", &self.token_decimals)?;
        row.serialize_field("block_number", &tx.block_number)?;
        row.serialize_field("timestamp", &tx.timestamp)?;
        row.serialize_field("is_error", &tx.is_error)?;
        row.end()
    }
}

/// Gas oracle prices in gwei.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GasPrices {
    pub safe: Decimal,
    pub standard: Decimal,
    pub fast: Decimal,
    pub suggested_base_fee: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTransaction {
    hash: String,
    from: String,
    #[serde(default)]
    to: String,
    value: String,
    block_number: String,
    time_stamp: String,
    #[serde(default)]
    gas_used: String,
    #[serde(default)]
    gas_price: String,
    #[serde(default)]
    is_error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTokenTransfer {
    #[serde(flatten)]
    transaction: RawTransaction,
    contract_address: String,
    #[serde(default)]
    token_name: String,
    #[serde(default)]
    token_symbol: String,
    #[serde(default)]
    token_decimal: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGasOracle {
    #[serde(rename = "SafeGasPrice")]
    safe: String,
    #[serde(rename = "ProposeGasPrice")]
    propose: String,
    #[serde(rename = "FastGasPrice")]
    fast: String,
    #[serde(rename = "suggestBaseFee", default)]
    suggest_base_fee: Option<String>,
}

fn malformed(field: &str, value: &str) -> ExplorerError {
    ExplorerError::MalformedResponse(format!("unparseable {field}: {value:?}"))
}

fn parse_u64(field: &str, value: &str) -> Result<u64, ExplorerError> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| malformed(field, value))
}

fn parse_u256(field: &str, value: &str) -> Result<U256, ExplorerError> {
    if value.is_empty() {
        return Ok(U256::ZERO);
    }
    value.parse().map_err(|_| malformed(field, value))
}

fn parse_gwei(field: &str, value: &str) -> Result<Decimal, ExplorerError> {
    Decimal::from_str(value.trim()).map_err(|_| malformed(field, value))
}

pub(crate) fn parse_wei(value: &str) -> Result<U256, ExplorerError> {
    parse_u256("balance", value.trim())
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = ExplorerError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let from = Address::parse(&raw.from).map_err(|_| malformed("from", &raw.from))?;
        let to = if raw.to.is_empty() {
            None
        } else {
            Some(Address::parse(&raw.to).map_err(|_| malformed("to", &raw.to))?)
        };

        Ok(Self {
            hash: raw.hash,
            from,
            to,
            value_wei: parse_u256("value", &raw.value)?,
            block_number: parse_u64("blockNumber", &raw.block_number)?,
            timestamp: parse_u64("timeStamp", &raw.time_stamp)?,
            gas_used: parse_u64("gasUsed", &raw.gas_used)?,
            gas_price: parse_u256("gasPrice", &raw.gas_price)?,
            is_error: raw.is_error == "1",
        })
    }
}

impl TryFrom<RawTokenTransfer> for TokenTransfer {
    type Error = ExplorerError;

    fn try_from(raw: RawTokenTransfer) -> Result<Self, Self::Error> {
        let token_contract = Address::parse(&raw.contract_address)
            .map_err(|_| malformed("contractAddress", &raw.contract_address))?;
        let token_decimals = if raw.token_decimal.is_empty() {
            0
        } else {
            raw.token_decimal
                .trim()
                .parse::<u32>()
                .map_err(|_| malformed("tokenDecimal", &raw.token_decimal))?
        };

        Ok(Self {
            transaction: Transaction::try_from(raw.transaction)?,
            token_contract,
            token_name: raw.token_name,
            token_symbol: raw.token_symbol,
            token_decimals,
        })
    }
}

impl TryFrom<RawGasOracle> for GasPrices {
    type Error = ExplorerError;

    fn try_from(raw: RawGasOracle) -> Result<Self, Self::Error> {
        let suggested_base_fee = match raw.suggest_base_fee {
            Some(fee) if !fee.is_empty() => Some(parse_gwei("suggestBaseFee", &fee)?),
            _ => None,
        };

        Ok(Self {
            safe: parse_gwei("SafeGasPrice", &raw.safe)?,
            standard: parse_gwei("ProposeGasPrice", &raw.propose)?,
            fast: parse_gwei("FastGasPrice", &raw.fast)?,
            suggested_base_fee,
        })
    }
}
