use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;

use eth_whale_intel::{
    DiscoveryRequest, ExplorerClient, ExplorerConfig, KnownEntityRegistry, RateLimiter,
    WhaleConfig, WhaleDetector,
};

/// Whale intelligence over the Etherscan API
#[derive(Parser, Debug)]
#[command(name = "eth_whale_intel", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// ETH balance of an address
    Balance { address: String },
    /// One page of normal transactions
    Transactions {
        address: String,
        #[arg(long)]
        start_block: Option<u64>,
        #[arg(long)]
        end_block: Option<u64>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// One page of ERC-20 transfers
    Tokens {
        address: String,
        #[arg(long)]
        contract: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// ABI of a verified contract
    Abi { address: String },
    /// Current gas oracle prices
    Gas,
    /// Full whale profile with activity and risk scores
    Analyze { address: String },
    /// Whale tier from the balance alone
    Class { address: String },
    /// Rank 2 to 10 addresses against each other
    Compare { addresses: Vec<String> },
    /// Large transfers around known addresses
    Movements {
        #[arg(long, default_value = "100")]
        min_eth: Decimal,
    },
    /// Whales found among the counterparties of known addresses
    Discover {
        #[arg(long, default_value = "1000")]
        min_balance: Decimal,
        #[arg(long)]
        min_tx_eth: Option<Decimal>,
        #[arg(long)]
        start_block: Option<u64>,
        #[arg(long)]
        end_block: Option<u64>,
    },
    /// Deposits to and withdrawals from known exchanges
    Exchanges {
        #[arg(long, default_value = "500")]
        min_amount: Decimal,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let explorer_config = ExplorerConfig::load_from_env()?;
    let whale_config = WhaleConfig::load_from_env()?;
    info!("Using {:?}", explorer_config);

    let rate_limiter = Arc::new(RateLimiter::per_second(explorer_config.requests_per_second));
    let client = Arc::new(ExplorerClient::from_config(&explorer_config, rate_limiter)?);
    let registry = match &whale_config.known_entities_path {
        Some(path) => KnownEntityRegistry::builtin_with_file(path)?,
        None => KnownEntityRegistry::builtin(),
    };
    let detector = WhaleDetector::new(client, registry, whale_config);

    match cli.command {
        Command::Balance { address } => print(&detector.check_balance(&address).await?),
        Command::Transactions {
            address,
            start_block,
            end_block,
            page,
            page_size,
        } => print(
            &detector
                .get_transactions(&address, start_block, end_block, page, page_size)
                .await?,
        ),
        Command::Tokens {
            address,
            contract,
            page,
            page_size,
        } => print(
            &detector
                .get_token_transfers(&address, contract.as_deref(), page, page_size)
                .await?,
        ),
        Command::Abi { address } => print(&detector.get_contract_abi(&address).await?),
        Command::Gas => print(&detector.get_gas_prices().await?),
        Command::Analyze { address } => print(&detector.analyze_whale(&address).await?),
        Command::Class { address } => print(&detector.detect_whale_class(&address).await?),
        Command::Compare { addresses } => print(&detector.compare_whales(&addresses).await?),
        Command::Movements { min_eth } => {
            print(&detector.discover_whale_movements(min_eth).await?)
        }
        Command::Discover {
            min_balance,
            min_tx_eth,
            start_block,
            end_block,
        } => {
            let request = DiscoveryRequest {
                min_balance_eth: min_balance,
                min_tx_value_eth: min_tx_eth,
                start_block,
                end_block,
            };
            print(&detector.discover_top_whales(&request).await?)
        }
        Command::Exchanges { min_amount } => {
            print(&detector.track_exchange_whales(min_amount).await?)
        }
    }
}

fn print<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
