//! Pool Discovery - list liquid candidate routes for a token pair
//!
//! Run with: cargo run --bin discover-pools -- USDT WBNB
//!           cargo run --bin discover-pools -- USDT WBNB --amount 1000
//!
//! Without `--amount` only discovery runs (factory lookups + liquidity
//! checks). With it, every candidate is also quoted.

use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smart_router::cartographer::{KnownPools, PoolDiscovery, PoolRef};
use smart_router::chain::{ChainClient, RpcChainClient};
use smart_router::config::Config;
use smart_router::contracts::ContractRegistry;
use smart_router::simulator::RouteQuoter;
use smart_router::tokens::{format_amount, parse_amount, TokenRegistry};

#[derive(Parser, Debug)]
#[command(author, version, about = "List liquid V2/V3 routes between two tokens")]
struct Args {
    /// Input token symbol or address
    from: String,
    /// Output token symbol or address
    to: String,
    /// Quote every route for this decimal input amount
    #[arg(long)]
    amount: Option<String>,
    /// Comma-separated bridge tokens (defaults to BRIDGE_TOKENS or the chain default)
    #[arg(long, value_delimiter = ',')]
    bridges: Vec<String>,
}

fn describe_pool(pool: &PoolRef) -> String {
    match pool {
        PoolRef::V2 { pair } => format!("V2 pair {:?}", pair),
        PoolRef::V3 { pool, fee } => format!("V3 pool {:?} ({:.2}%)", pool, *fee as f64 / 10_000.0),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smart_router=info".parse()?),
        )
        .init();

    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║               SMART ROUTER POOL DISCOVERY                  ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if !args.bridges.is_empty() {
        config.bridge_tokens = args.bridges.clone();
    }
    config.validate()?;

    let tokens = TokenRegistry::with_defaults();
    let contracts = ContractRegistry::with_defaults();
    let input = tokens.resolve(config.chain_id, &args.from)?.clone();
    let output = tokens.resolve(config.chain_id, &args.to)?.clone();
    let bridges = config.bridge_tokens(&tokens)?;

    println!("📡 Chain {} via {}", config.chain_id, config.rpc_url);
    println!(
        "🔗 Bridges: {}",
        bridges.iter().map(|t| t.symbol.as_str()).collect::<Vec<_>>().join(", ")
    );
    println!();

    let client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(&config.rpc_url, config.chain_id));
    let discovery = PoolDiscovery::new(
        client.clone(),
        config.chain_id,
        &contracts,
        KnownPools::with_defaults(&tokens),
    )?;

    let start = Instant::now();
    let routes = discovery.discover_routes(&input, &output, &bridges).await;
    println!(
        "{}",
        style(format!(
            "═══ {} CANDIDATE ROUTES {} → {} ({:?}) ═══",
            routes.len(),
            input.symbol,
            output.symbol,
            start.elapsed()
        ))
        .blue()
        .bold()
    );

    for (i, route) in routes.iter().enumerate() {
        println!("{:>3}. {}", i + 1, style(route.describe()).bold());
        for pool in route.hops() {
            println!("       {}", style(describe_pool(&pool)).dim());
        }
    }
    println!();

    let Some(amount) = args.amount else {
        return Ok(());
    };

    let amount_in = parse_amount(&amount, input.decimals)?;
    let quoter = RouteQuoter::new(client, config.chain_id, &contracts)?;
    let quoted = quoter.quote_all(routes.clone(), amount_in).await;

    println!(
        "{}",
        style(format!(
            "═══ QUOTES FOR {} {} ({}/{} succeeded) ═══",
            amount,
            input.symbol,
            quoted.len(),
            routes.len()
        ))
        .blue()
        .bold()
    );
    for (route, amount_out) in &quoted {
        println!(
            "  {:<48} {:>22} {}",
            route.describe(),
            format_amount(*amount_out, output.decimals),
            output.symbol
        );
    }
    println!();

    Ok(())
}
