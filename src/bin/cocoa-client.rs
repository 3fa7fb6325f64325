//! Command-line client for a running cocoa-node.

use clap::{Parser, Subcommand};
use cocoa_ledger::client::CocoaClient;
use std::process::ExitCode;

#[derive(Parser)]
#[clap(name = "cocoa-client", version, about = "Talk to a cocoa-node REST API")]
struct Cli {
    /// Base URL of the node
    #[clap(long, default_value = "http://localhost:3001")]
    node: String,

    /// Attempts for read requests
    #[clap(long, default_value_t = 3)]
    retries: u32,

    #[clap(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Show API info
    Info,
    /// Register a seller (the node's operator wallet when omitted)
    Register {
        #[clap(long)]
        wallet: Option<String>,
    },
    /// Record a sale
    Sale {
        #[clap(long)]
        seller: String,
        #[clap(long)]
        buyer: String,
        /// Quantity in kilograms
        #[clap(long)]
        quantity: u64,
        /// Price per kilogram
        #[clap(long)]
        price: u64,
    },
    /// List all sales
    Sales,
    /// Show one seller
    Seller { seller_id: String },
    /// Sales statistics
    Summary,
    /// Ledger totals
    Blockchain,
    /// Mining information
    Mine,
    /// Latest blocks
    Blocks {
        #[clap(long)]
        limit: Option<usize>,
    },
    /// Validate the chain
    Verify,
    /// Health check
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let client = match CocoaClient::new(&cli.node) {
        Ok(client) => client.with_max_retries(cli.retries),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.cmd {
        Cmd::Info => client.info().await,
        Cmd::Register { wallet } => client.register(wallet.as_deref()).await,
        Cmd::Sale {
            seller,
            buyer,
            quantity,
            price,
        } => client.record_sale(&seller, &buyer, quantity, price).await,
        Cmd::Sales => client.sales().await,
        Cmd::Seller { seller_id } => client.seller(&seller_id).await,
        Cmd::Summary => client.sales_summary().await,
        Cmd::Blockchain => client.blockchain().await,
        Cmd::Mine => client.mine().await,
        Cmd::Blocks { limit } => client.blocks(limit).await,
        Cmd::Verify => client.verify().await,
        Cmd::Health => client.health().await,
    };

    match result {
        Ok(body) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
