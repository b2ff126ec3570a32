//! Price Impact
//!
//! Compares the quoted execution price with the pre-trade mid price read
//! from pool state. Prices are raw-unit ratios; both sides get the same
//! decimal adjustment so the impact is unitless.

use alloy_primitives::U256;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

use crate::abi::{IV2Pair, IV3Pool};
use crate::cartographer::{CandidateRoute, PoolRef};
use crate::chain::{read_call, ChainClient};
use crate::error::QuoteError;
use crate::tokens::{u256_to_f64, Token};

/// Reported when the mid price cannot be read
pub const DEFAULT_PRICE_IMPACT_PCT: f64 = 0.1;

const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0; // 2^96

pub struct PriceImpactCalculator {
    client: Arc<dyn ChainClient>,
    chain_id: u64,
}

impl PriceImpactCalculator {
    pub fn new(client: Arc<dyn ChainClient>, chain_id: u64) -> Self {
        Self { client, chain_id }
    }

    /// Impact of trading `amount_in` for `amount_out` along `route`, in percent
    pub async fn price_impact(
        &self,
        route: &CandidateRoute,
        amount_in: U256,
        amount_out: U256,
    ) -> f64 {
        let (Some(input), Some(output)) = (route.token_in(), route.token_out()) else {
            return DEFAULT_PRICE_IMPACT_PCT;
        };

        let mid = match self.mid_price(route).await {
            Ok(mid) => mid,
            Err(e) => {
                debug!("Mid price unavailable for {}: {}", route.describe(), e);
                return DEFAULT_PRICE_IMPACT_PCT;
            }
        };

        let exec = execution_price(amount_in, amount_out, input.decimals, output.decimals);
        let mid = decimal_adjusted(mid, input.decimals, output.decimals);
        impact_pct(exec, mid)
    }

    /// Raw-unit mid price of the whole route: product of every hop
    pub async fn mid_price(&self, route: &CandidateRoute) -> Result<f64, QuoteError> {
        route
            .check_shape()
            .map_err(|e| QuoteError::Encoding(e.to_string()))?;
        let path = route.path();
        let hops = route.hops();

        let prices = try_join_all(
            hops.iter()
                .enumerate()
                .map(|(i, hop)| self.hop_mid_price(&path[i], &path[i + 1], hop)),
        )
        .await?;

        Ok(prices.into_iter().product())
    }

    /// Raw units of `token_out` per raw unit of `token_in` at the pool's current state
    async fn hop_mid_price(
        &self,
        token_in: &Token,
        token_out: &Token,
        hop: &PoolRef,
    ) -> Result<f64, QuoteError> {
        let client = self.client.as_ref();

        match *hop {
            PoolRef::V2 { pair } => {
                let (reserves, token0) = futures::try_join!(
                    read_call(client, self.chain_id, pair, &IV2Pair::getReservesCall {}),
                    read_call(client, self.chain_id, pair, &IV2Pair::token0Call {}),
                )?;
                let r0 = u256_to_f64(U256::from(reserves.reserve0));
                let r1 = u256_to_f64(U256::from(reserves.reserve1));
                let (reserve_in, reserve_out) = if token0 == token_in.address {
                    (r0, r1)
                } else {
                    (r1, r0)
                };
                if reserve_in <= 0.0 {
                    return Err(QuoteError::PoolState(pair));
                }
                Ok(reserve_out / reserve_in)
            }
            PoolRef::V3 { pool, .. } => {
                let (slot0, token0) = futures::try_join!(
                    read_call(client, self.chain_id, pool, &IV3Pool::slot0Call {}),
                    read_call(client, self.chain_id, pool, &IV3Pool::token0Call {}),
                )?;
                let sqrt_price = u256_to_f64(U256::from(slot0.sqrtPriceX96)) / Q96;
                // token1 per token0
                let price = sqrt_price * sqrt_price;
                if price <= 0.0 || !price.is_finite() {
                    return Err(QuoteError::PoolState(pool));
                }
                if token0 == token_out.address {
                    Ok(1.0 / price)
                } else {
                    Ok(price)
                }
            }
        }
    }
}

/// Scale a raw-unit price by `10^(in_decimals - out_decimals)`
pub fn decimal_adjusted(raw_price: f64, in_decimals: u8, out_decimals: u8) -> f64 {
    raw_price * 10f64.powi(in_decimals as i32 - out_decimals as i32)
}

/// Decimal-adjusted `amount_out / amount_in`
pub fn execution_price(amount_in: U256, amount_out: U256, in_decimals: u8, out_decimals: u8) -> f64 {
    let amount_in = u256_to_f64(amount_in);
    if amount_in == 0.0 {
        return 0.0;
    }
    decimal_adjusted(u256_to_f64(amount_out) / amount_in, in_decimals, out_decimals)
}

/// `min(100, |1 - exec/mid| * 100)`
pub fn impact_pct(execution_price: f64, mid_price: f64) -> f64 {
    if mid_price <= 0.0 || !mid_price.is_finite() {
        return DEFAULT_PRICE_IMPACT_PCT;
    }
    let impact = ((1.0 - execution_price / mid_price).abs() * 100.0).min(100.0);
    if impact.is_finite() {
        impact
    } else {
        DEFAULT_PRICE_IMPACT_PCT
    }
}
