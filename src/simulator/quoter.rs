//! Route Quoter - read/simulate based quoting
//!
//! One call per route:
//! - V2: `getAmountsOut` on the smart router, retried once on the plain V2 router
//! - V3: simulated `exactInput` with the connected account as sender
//! - Mixed: the mixed-route quoter with a per-hop protocol flag array

use alloy_primitives::{Address, U256};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use super::path::{encode_mixed_path, encode_v3_path};
use crate::abi::{IMixedRouteQuoter, ISmartRouter, IV2Router};
use crate::cartographer::{CandidateRoute, RouteProtocol};
use crate::chain::{read_call, simulate_call, simulation_sender, ChainClient};
use crate::contracts::{ContractRegistry, ContractType};
use crate::error::{QuoteError, RegistryError};

pub struct RouteQuoter {
    client: Arc<dyn ChainClient>,
    chain_id: u64,
    smart_router: Address,
    v2_router: Address,
    mixed_quoter: Address,
}

impl RouteQuoter {
    pub fn new(
        client: Arc<dyn ChainClient>,
        chain_id: u64,
        contracts: &ContractRegistry,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            client,
            chain_id,
            smart_router: contracts.get_contract_address(chain_id, ContractType::SmartRouter)?,
            v2_router: contracts.get_contract_address(chain_id, ContractType::V2Router)?,
            mixed_quoter: contracts
                .get_contract_address(chain_id, ContractType::MixedRouteQuoter)?,
        })
    }

    /// Expected output of swapping `amount_in` along `route`
    pub async fn quote(&self, route: &CandidateRoute, amount_in: U256) -> Result<U256, QuoteError> {
        route
            .check_shape()
            .map_err(|e| QuoteError::Encoding(e.to_string()))?;
        let amount_out = match route.protocol() {
            RouteProtocol::V2 => self.quote_v2(route, amount_in).await?,
            RouteProtocol::V3 => self.quote_v3(route, amount_in).await?,
            RouteProtocol::Mixed => self.quote_mixed(route, amount_in).await?,
        };

        if amount_out.is_zero() {
            return Err(QuoteError::ZeroOutput);
        }
        Ok(amount_out)
    }

    /// Quote every route concurrently. Failed routes are dropped; the rest
    /// keep their discovery order.
    pub async fn quote_all(
        &self,
        routes: Vec<CandidateRoute>,
        amount_in: U256,
    ) -> Vec<(CandidateRoute, U256)> {
        let results = join_all(routes.iter().map(|route| self.quote(route, amount_in))).await;

        routes
            .into_iter()
            .zip(results)
            .filter_map(|(route, result)| match result {
                Ok(amount_out) => Some((route, amount_out)),
                Err(e) => {
                    warn!("Dropping route {}: {}", route.describe(), e);
                    None
                }
            })
            .collect()
    }

    async fn quote_v2(&self, route: &CandidateRoute, amount_in: U256) -> Result<U256, QuoteError> {
        let path: Vec<Address> = route.path().iter().map(|t| t.address).collect();

        match self.v2_amounts_out(self.smart_router, &path, amount_in).await {
            Ok(out) => Ok(out),
            Err(e) => {
                debug!("Smart router getAmountsOut failed ({}), retrying on V2 router", e);
                self.v2_amounts_out(self.v2_router, &path, amount_in).await
            }
        }
    }

    async fn v2_amounts_out(
        &self,
        router: Address,
        path: &[Address],
        amount_in: U256,
    ) -> Result<U256, QuoteError> {
        let call = IV2Router::getAmountsOutCall {
            amountIn: amount_in,
            path: path.to_vec(),
        };
        let amounts = read_call(self.client.as_ref(), self.chain_id, router, &call).await?;
        amounts.last().copied().ok_or(QuoteError::EmptyResult)
    }

    async fn quote_v3(&self, route: &CandidateRoute, amount_in: U256) -> Result<U256, QuoteError> {
        let sender = simulation_sender(self.client.as_ref());
        let call = ISmartRouter::exactInputCall {
            params: ISmartRouter::ExactInputParams {
                path: encode_v3_path(route)?,
                recipient: sender,
                amountIn: amount_in,
                amountOutMinimum: U256::ZERO,
            },
        };

        let amount_out =
            simulate_call(self.client.as_ref(), self.chain_id, sender, self.smart_router, &call)
                .await?;
        Ok(amount_out)
    }

    async fn quote_mixed(&self, route: &CandidateRoute, amount_in: U256) -> Result<U256, QuoteError> {
        let (path, flag) = encode_mixed_path(route)?;
        let call = IMixedRouteQuoter::quoteExactInputCall {
            path,
            flag,
            amountIn: amount_in,
        };

        let sender = simulation_sender(self.client.as_ref());
        let quote =
            simulate_call(self.client.as_ref(), self.chain_id, sender, self.mixed_quoter, &call)
                .await?;
        Ok(quote.amountOut)
    }
}
