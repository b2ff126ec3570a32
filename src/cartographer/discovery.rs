//! Pool Discovery
//!
//! Finds liquid V2 pairs and V3 pools for a token pair straight from the
//! factories, then expands them into direct and 2-hop bridge routes.
//!
//! Every lookup runs concurrently. A failed RPC call only removes that one
//! pool from consideration.

use alloy_primitives::aliases::U24;
use alloy_primitives::Address;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::known_pools::{distinct_bridges, KnownPools};
use super::route::{CandidateRoute, PoolRef};
use crate::abi::{IV2Factory, IV2Pair, IV3Factory, IV3Pool};
use crate::chain::{read_call, ChainClient};
use crate::contracts::{ContractRegistry, ContractType};
use crate::error::RegistryError;
use crate::tokens::Token;

/// V3 fee tiers probed for every token pair (0.01%, 0.05%, 0.25%, 1%)
pub const V3_FEE_TIERS: [u32; 4] = [100, 500, 2500, 10000];

pub struct PoolDiscovery {
    client: Arc<dyn ChainClient>,
    chain_id: u64,
    v2_factory: Address,
    v3_factory: Address,
    known_pools: KnownPools,
}

impl PoolDiscovery {
    pub fn new(
        client: Arc<dyn ChainClient>,
        chain_id: u64,
        contracts: &ContractRegistry,
        known_pools: KnownPools,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            client,
            chain_id,
            v2_factory: contracts.get_contract_address(chain_id, ContractType::V2Factory)?,
            v3_factory: contracts.get_contract_address(chain_id, ContractType::V3Factory)?,
            known_pools,
        })
    }

    /// Candidate routes from `input` to `output`: direct pools first, then
    /// every liquid combination through each bridge token.
    ///
    /// Falls back to the static pool list if the chain cannot be reached.
    pub async fn discover_routes(
        &self,
        input: &Token,
        output: &Token,
        bridges: &[Token],
    ) -> Vec<CandidateRoute> {
        let start = Instant::now();

        if let Err(e) = self.client.block_number(self.chain_id).await {
            warn!("Chain unavailable ({}), using {} known pools", e, self.known_pools.pool_count());
            return self.known_pools.routes(input, output, bridges);
        }

        let bridges = distinct_bridges(input, output, bridges);

        let direct_lookup = self.liquid_pools(input, output);
        let bridge_lookups = join_all(bridges.iter().map(|bridge| async move {
            let (first, second) =
                futures::join!(self.liquid_pools(input, bridge), self.liquid_pools(bridge, output));
            (*bridge, first, second)
        }));
        let (direct, bridged) = futures::join!(direct_lookup, bridge_lookups);

        let mut routes: Vec<CandidateRoute> = direct
            .into_iter()
            .map(|pool| CandidateRoute::direct(input.clone(), output.clone(), pool))
            .collect();

        for (bridge, first, second) in bridged {
            for a in &first {
                for b in &second {
                    let path = vec![input.clone(), bridge.clone(), output.clone()];
                    match CandidateRoute::from_hops(path, vec![*a, *b]) {
                        Ok(route) => routes.push(route),
                        Err(e) => debug!("Skipping bridge route via {}: {}", bridge, e),
                    }
                }
            }
        }

        info!(
            "Discovered {} routes {} -> {} in {:?}",
            routes.len(),
            input,
            output,
            start.elapsed()
        );
        routes
    }

    /// Liquid pools joining `a` and `b`: V3 tiers in fee order, then V2
    pub async fn liquid_pools(&self, a: &Token, b: &Token) -> Vec<PoolRef> {
        let v3_lookups = join_all(
            V3_FEE_TIERS
                .iter()
                .map(|&fee| self.liquid_v3_pool(a.address, b.address, fee)),
        );
        let v2_lookup = self.liquid_v2_pair(a.address, b.address);
        let (v3, v2) = futures::join!(v3_lookups, v2_lookup);

        v3.into_iter().flatten().chain(v2).collect()
    }

    async fn liquid_v3_pool(&self, a: Address, b: Address, fee: u32) -> Option<PoolRef> {
        let client = self.client.as_ref();
        let call = IV3Factory::getPoolCall {
            tokenA: a,
            tokenB: b,
            fee: U24::saturating_from(fee),
        };
        let pool = match read_call(client, self.chain_id, self.v3_factory, &call).await {
            Ok(pool) if pool != Address::ZERO => pool,
            Ok(_) => return None,
            Err(e) => {
                debug!("getPool({:?}, {:?}, {}) failed: {}", a, b, fee, e);
                return None;
            }
        };

        match read_call(client, self.chain_id, pool, &IV3Pool::liquidityCall {}).await {
            Ok(liquidity) if liquidity > 0 => Some(PoolRef::V3 { pool, fee }),
            Ok(_) => {
                debug!("V3 pool {:?} has no liquidity", pool);
                None
            }
            Err(e) => {
                debug!("liquidity() on {:?} failed: {}", pool, e);
                None
            }
        }
    }

    async fn liquid_v2_pair(&self, a: Address, b: Address) -> Option<PoolRef> {
        let client = self.client.as_ref();
        let call = IV2Factory::getPairCall { tokenA: a, tokenB: b };
        let pair = match read_call(client, self.chain_id, self.v2_factory, &call).await {
            Ok(pair) if pair != Address::ZERO => pair,
            Ok(_) => return None,
            Err(e) => {
                debug!("getPair({:?}, {:?}) failed: {}", a, b, e);
                return None;
            }
        };

        match read_call(client, self.chain_id, pair, &IV2Pair::getReservesCall {}).await {
            Ok(reserves) if !reserves.reserve0.is_zero() && !reserves.reserve1.is_zero() => {
                Some(PoolRef::V2 { pair })
            }
            Ok(_) => {
                debug!("V2 pair {:?} has empty reserves", pair);
                None
            }
            Err(e) => {
                debug!("getReserves() on {:?} failed: {}", pair, e);
                None
            }
        }
    }
}
