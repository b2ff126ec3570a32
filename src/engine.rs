//! One routing cycle: discovery → quoting → impact/gas → selection
//!
//! Every cycle recomputes from scratch. Nothing is carried over between
//! cycles because pool state can change every block.

use alloy_primitives::U256;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::brain::{select_best, RouteQuote};
use crate::cartographer::{KnownPools, PoolDiscovery};
use crate::chain::ChainClient;
use crate::contracts::ContractRegistry;
use crate::error::{RegistryError, Result, RouterError};
use crate::executor::swap_deadline;
use crate::simulator::{GasEstimator, PriceImpactCalculator, RouteQuoter};
use crate::tokens::{format_amount, parse_amount, Token};

/// What the user wants to swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapIntent {
    pub input_token: Token,
    pub output_token: Token,
    /// Decimal string in whole input-token units, e.g. `"1000.5"`
    pub amount: String,
    pub slippage_pct: f64,
    pub deadline_minutes: u64,
}

impl SwapIntent {
    pub fn new(input_token: Token, output_token: Token, amount: impl Into<String>) -> Self {
        Self {
            input_token,
            output_token,
            amount: amount.into(),
            slippage_pct: 0.5,
            deadline_minutes: 20,
        }
    }

    pub fn with_slippage(mut self, slippage_pct: f64) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    pub fn with_deadline(mut self, deadline_minutes: u64) -> Self {
        self.deadline_minutes = deadline_minutes;
        self
    }

    /// Same tokens and amount: a change in these triggers a new cycle
    pub fn same_trade(&self, other: &SwapIntent) -> bool {
        self.input_token == other.input_token
            && self.output_token == other.output_token
            && self.amount.trim() == other.amount.trim()
    }

    /// Raw input amount. Zero, negative and malformed amounts are rejected.
    pub fn amount_in(&self) -> Result<U256> {
        let amount = parse_amount(&self.amount, self.input_token.decimals)?;
        if amount.is_zero() {
            return Err(RouterError::InvalidAmount(format!(
                "{:?}: amount must be greater than zero",
                self.amount
            )));
        }
        Ok(amount)
    }

    fn validate(&self, chain_id: u64) -> Result<U256> {
        if self.input_token == self.output_token {
            return Err(RouterError::InvalidRoute(
                "input and output token are the same".into(),
            ));
        }
        if self.input_token.chain_id != chain_id || self.output_token.chain_id != chain_id {
            return Err(RouterError::InvalidRoute(format!(
                "tokens must be on chain {}",
                chain_id
            )));
        }
        self.amount_in()
    }
}

/// Result of one completed cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub amount_in: U256,
    /// Every successfully quoted route, in discovery order
    pub all_routes: Vec<RouteQuote>,
    pub best_route: Option<RouteQuote>,
    #[serde(skip)]
    pub elapsed: Duration,
}

pub struct RouteEngine {
    chain_id: u64,
    discovery: PoolDiscovery,
    quoter: RouteQuoter,
    impact: PriceImpactCalculator,
    gas: GasEstimator,
}

impl RouteEngine {
    pub fn new(
        client: Arc<dyn ChainClient>,
        chain_id: u64,
        contracts: &ContractRegistry,
        known_pools: KnownPools,
    ) -> std::result::Result<Self, RegistryError> {
        Ok(Self {
            chain_id,
            discovery: PoolDiscovery::new(client.clone(), chain_id, contracts, known_pools)?,
            quoter: RouteQuoter::new(client.clone(), chain_id, contracts)?,
            impact: PriceImpactCalculator::new(client.clone(), chain_id),
            gas: GasEstimator::new(client, chain_id, contracts)?,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Run one full cycle for `intent`. Selection happens only after every
    /// quote has settled.
    pub async fn run_cycle(&self, intent: &SwapIntent, bridges: &[Token]) -> Result<CycleOutcome> {
        let start = Instant::now();
        let amount_in = intent.validate(self.chain_id)?;
        let input = &intent.input_token;
        let output = &intent.output_token;

        let candidates = self.discovery.discover_routes(input, output, bridges).await;
        let candidate_count = candidates.len();
        let quoted = self.quoter.quote_all(candidates, amount_in).await;

        let deadline = swap_deadline(intent.deadline_minutes);
        let all_routes: Vec<RouteQuote> = join_all(quoted.into_iter().map(|(route, amount_out)| async move {
            let (impact, gas) = futures::join!(
                self.impact.price_impact(&route, amount_in, amount_out),
                self.gas.estimate(&route, amount_in, amount_out, deadline),
            );
            RouteQuote::new(route, amount_out, impact, gas)
        }))
        .await;

        let best_route = select_best(&all_routes).cloned();
        let elapsed = start.elapsed();

        match &best_route {
            Some(best) => info!(
                "🎯 {} {} -> {}: {}/{} routes quoted, best {} = {} {} in {:?}",
                intent.amount,
                input.symbol,
                output.symbol,
                all_routes.len(),
                candidate_count,
                best.route.describe(),
                format_amount(best.output_amount, output.decimals),
                output.symbol,
                elapsed
            ),
            None => info!(
                "{} {} -> {}: no routes ({} candidates) in {:?}",
                intent.amount, input.symbol, output.symbol, candidate_count, elapsed
            ),
        }

        Ok(CycleOutcome {
            amount_in,
            all_routes,
            best_route,
            elapsed,
        })
    }
}
