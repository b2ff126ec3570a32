//! Smart Router CLI
//!
//! Run with: cargo run -- quote USDT WBNB 1000
//!
//! Commands:
//! - `quote`:   one discovery + quoting cycle, print every route
//! - `watch`:   keep the quote fresh (debounce + periodic refresh) until Ctrl-C
//! - `swap`:    quote, check allowance, submit the best route, wait for the receipt
//! - `approve`: approve the smart router to spend a token

use alloy_primitives::U256;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smart_router::brain::RouteQuote;
use smart_router::cartographer::KnownPools;
use smart_router::chain::{signer_from_env, signer_from_key, ChainClient, RpcChainClient};
use smart_router::config::Config;
use smart_router::contracts::ContractRegistry;
use smart_router::executor::{SwapExecutor, SwapState};
use smart_router::tokens::{format_amount, parse_amount, Token, TokenRegistry};
use smart_router::{SmartRouter, SwapIntent};

/// Receipt polls before giving up on a submitted swap
const CONFIRMATION_POLLS: u32 = 60;
const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(author, version, about = "V2/V3 smart router: discover, quote and execute swaps")]
struct Cli {
    /// TOML config file. Environment variables (and .env) are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quote every route once and print them
    Quote(TradeArgs),
    /// Keep re-quoting until Ctrl-C
    Watch(TradeArgs),
    /// Quote and execute the best route
    Swap(TradeArgs),
    /// Approve the smart router to spend a token
    Approve {
        /// Token symbol or address
        token: String,
        /// Decimal amount; unlimited when omitted
        #[arg(long)]
        amount: Option<String>,
    },
}

#[derive(Args, Debug)]
struct TradeArgs {
    /// Input token symbol or address
    from: String,
    /// Output token symbol or address
    to: String,
    /// Decimal amount of the input token
    amount: String,
    /// Slippage tolerance in percent (defaults to DEFAULT_SLIPPAGE_PCT)
    #[arg(long)]
    slippage: Option<f64>,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🧭 SMART ROUTER - V2/V3 Route Discovery & Execution").cyan().bold()
    );
    println!(
        "{}",
        style("    Direct | Multi-hop | Mixed V2/V3 Multicall").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            dotenvy::dotenv().ok();
            Config::from_file(path)?
        }
        None => Config::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn build_client(config: &Config) -> Result<Arc<dyn ChainClient>> {
    let mut client = RpcChainClient::new(&config.rpc_url, config.chain_id);
    // Keys never live in config files, so fall back to the environment
    let signer = match &config.private_key {
        Some(key) => Some(signer_from_key(key)?),
        None => signer_from_env("PRIVATE_KEY"),
    };
    if let Some(signer) = signer {
        client = client.with_signer(signer);
    }
    Ok(Arc::new(client))
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

fn build_intent(args: &TradeArgs, tokens: &TokenRegistry, config: &Config) -> Result<SwapIntent> {
    let input = tokens.resolve(config.chain_id, &args.from)?.clone();
    let output = tokens.resolve(config.chain_id, &args.to)?.clone();
    Ok(SwapIntent::new(input, output, args.amount.clone())
        .with_slippage(args.slippage.unwrap_or(config.default_slippage_pct))
        .with_deadline(config.deadline_minutes))
}

fn print_routes(routes: &[RouteQuote], best: Option<&RouteQuote>, output: &Token) {
    println!();
    println!(
        "{}",
        style(format!("═══ {} ROUTES ═══", routes.len())).blue().bold()
    );
    for quote in routes {
        let is_best = best == Some(quote);
        let marker = if is_best { style("★").green().bold() } else { style(" ").dim() };
        let gas = if quote.gas_simulated {
            format!("{}", quote.gas_estimate)
        } else {
            format!("~{}", quote.gas_estimate)
        };
        let line = format!(
            "{} {:<48} {:>22} {}  impact {:>6.3}%  gas {:>8}  rel {:.3}",
            marker,
            quote.route.describe(),
            format_amount(quote.output_amount, output.decimals),
            output.symbol,
            quote.price_impact_pct,
            gas,
            quote.reliability_score,
        );
        if is_best {
            println!("{}", style(line).green());
        } else {
            println!("{}", line);
        }
    }
    println!();
}

async fn run_quote(router: &SmartRouter, intent: SwapIntent) -> Result<()> {
    let output = intent.output_token.clone();
    let bar = spinner(&format!(
        "Routing {} {} → {}",
        intent.amount, intent.input_token.symbol, output.symbol
    ))?;
    let result = router.quote_once(intent).await;
    bar.finish_and_clear();

    let outcome = result?;
    print_routes(&outcome.all_routes, outcome.best_route.as_ref(), &output);
    info!("Cycle finished in {:?}", outcome.elapsed);
    Ok(())
}

async fn run_watch(router: &SmartRouter, intent: SwapIntent) -> Result<()> {
    let output = intent.output_token.clone();
    println!(
        "{}",
        style(format!(
            "Watching {} {} → {} (Ctrl-C to stop)",
            intent.amount, intent.input_token.symbol, output.symbol
        ))
        .yellow()
    );
    router.set_intent(intent);

    let bar = spinner("Waiting for the first quote")?;
    let mut last_update = None;
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let snapshot = router.snapshot();
                if snapshot.updated_at == last_update {
                    continue;
                }
                last_update = snapshot.updated_at;

                bar.suspend(|| match &snapshot.error {
                    Some(e) => println!("{} {}", style("✗").red(), e),
                    None => print_routes(&snapshot.all_routes, snapshot.best_route.as_ref(), &output),
                });
                bar.set_message(format!(
                    "Generation {} | next refresh pending",
                    snapshot.generation
                ));
            }
        }
    }

    bar.finish_and_clear();
    router.clear_intent();
    Ok(())
}

async fn run_swap(router: &SmartRouter, intent: SwapIntent) -> Result<()> {
    let input = intent.input_token.clone();
    let output = intent.output_token.clone();
    let slippage = intent.slippage_pct;

    let bar = spinner("Finding the best route")?;
    let result = router.quote_once(intent).await;
    bar.finish_and_clear();
    let outcome = result?;
    print_routes(&outcome.all_routes, outcome.best_route.as_ref(), &output);

    if let Some(missing) = router.check_approval().await? {
        println!(
            "{} Allowance short by {} {}. Run: smart-router approve {}",
            style("⚠").yellow(),
            format_amount(missing, input.decimals),
            input.symbol,
            input.symbol
        );
        return Err(eyre!("insufficient allowance for {}", input.symbol));
    }

    let tx_hash = router.execute_swap(slippage).await?;
    println!("{} Swap submitted: {:?}", style("✓").green(), tx_hash);

    let bar = spinner("Waiting for confirmation")?;
    for _ in 0..CONFIRMATION_POLLS {
        tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
        match router.poll_confirmation().await? {
            SwapState::Submitted { .. } => continue,
            SwapState::Confirmed { tx_hash } => {
                bar.finish_and_clear();
                println!("{} Swap confirmed: {:?}", style("✓").green().bold(), tx_hash);
                return Ok(());
            }
            SwapState::Failed { reason } => {
                bar.finish_and_clear();
                return Err(eyre!(reason));
            }
            other => {
                bar.finish_and_clear();
                return Err(eyre!("unexpected swap state {}", other));
            }
        }
    }

    bar.finish_and_clear();
    println!(
        "{} Still pending after {:?}; check {:?} manually",
        style("⏳").yellow(),
        CONFIRMATION_POLL_INTERVAL * CONFIRMATION_POLLS,
        tx_hash
    );
    Ok(())
}

async fn run_approve(
    client: Arc<dyn ChainClient>,
    config: &Config,
    contracts: &ContractRegistry,
    token: &Token,
    amount: Option<&str>,
) -> Result<()> {
    let amount = match amount {
        Some(amount) => parse_amount(amount, token.decimals)?,
        None => U256::MAX,
    };
    let executor = SwapExecutor::new(client, config.chain_id, contracts)?;
    let tx_hash = executor.approve(token, amount).await?;
    println!("{} Approval submitted: {:?}", style("✓").green(), tx_hash);
    Ok(())
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

    let cli = Cli::parse();
    print_banner();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            error!("Please check your .env file");
            return Err(e);
        }
    };
    config.print_summary();
    println!();

    let tokens = TokenRegistry::with_defaults();
    let contracts = ContractRegistry::with_defaults();
    let client = build_client(&config)?;

    if let Command::Approve { token, amount } = &cli.command {
        let token = tokens.resolve(config.chain_id, token)?.clone();
        return run_approve(client, &config, &contracts, &token, amount.as_deref()).await;
    }

    let router = SmartRouter::new(
        client,
        config.chain_id,
        &contracts,
        KnownPools::with_defaults(&tokens),
        config.bridge_tokens(&tokens)?,
        config.router_settings(),
    )?;

    match &cli.command {
        Command::Quote(args) => run_quote(&router, build_intent(args, &tokens, &config)?).await,
        Command::Watch(args) => run_watch(&router, build_intent(args, &tokens, &config)?).await,
        Command::Swap(args) => run_swap(&router, build_intent(args, &tokens, &config)?).await,
        Command::Approve { .. } => Ok(()),
    }
}
