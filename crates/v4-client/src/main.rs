//! v4 client CLI.
//!
//! Read-only helpers: resolve market metadata and preview the wire order an
//! intent would produce. Nothing is signed or broadcast.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use v4_client::{message_builder, ClientConfig};
use v4_core::{
    ExecutionMode, ExpiryRequest, OrderIntent, OrderKind, OrderSide, Price, Size, Subaccount,
};
use v4_executor::{KeySource, LocalWallet};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via V4_CLIENT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print scaling metadata for a market.
    Market { ticker: String },

    /// Print the wire order for an intent without signing it.
    BuildOrder {
        #[arg(long)]
        market: String,
        #[arg(long)]
        side: OrderSide,
        #[arg(long)]
        price: Price,
        #[arg(long)]
        size: Size,
        #[arg(long, default_value_t = 0)]
        client_id: u32,
        /// Long-term validity in seconds; omit for a short-term order.
        #[arg(long)]
        good_til_secs: Option<u64>,
        /// Explicit short-term expiry block.
        #[arg(long, conflicts_with = "good_til_secs")]
        good_til_block: Option<u32>,
        #[arg(long, default_value = "default")]
        execution: ExecutionMode,
        #[arg(long)]
        reduce_only: bool,
        /// Owner address of the subaccount.
        #[arg(long)]
        address: String,
        #[arg(long, default_value_t = 0)]
        subaccount: u32,
        /// Env var holding the hex private key.
        #[arg(long, default_value = "V4_PRIVATE_KEY")]
        key_env: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    v4_client::init_logging();

    let config = match args.config {
        Some(path) => ClientConfig::from_file(&path)?,
        None => ClientConfig::load()?,
    };
    info!(chain_id = %config.chain_id, indexer_url = %config.indexer_url, "Configuration loaded");

    let builder = message_builder(&config)?;

    match args.command {
        Command::Market { ticker } => {
            let market = builder.market(&ticker).await?;
            println!("{}", serde_json::to_string_pretty(&market)?);
        }
        Command::BuildOrder {
            market,
            side,
            price,
            size,
            client_id,
            good_til_secs,
            good_til_block,
            execution,
            reduce_only,
            address,
            subaccount,
            key_env,
        } => {
            let wallet = LocalWallet::load(&KeySource::EnvVar { var_name: key_env })?
                .with_address(address);
            let subaccount = Subaccount::new(Arc::new(wallet), subaccount)?;

            let mut intent = match good_til_secs {
                Some(secs) => OrderIntent::long_term(market, side, price, size, client_id, secs),
                None => OrderIntent::new(market, side, price, size, client_id, OrderKind::ShortTerm),
            }
            .with_execution(execution);
            if let Some(block) = good_til_block {
                intent = intent.with_expiry(ExpiryRequest::AtBlock(block));
            }
            if reduce_only {
                intent = intent.reduce_only();
            }

            let order = builder.build_order(&subaccount, &intent).await?;
            println!("{}", serde_json::to_string_pretty(&order)?);
        }
    }

    Ok(())
}
