//! Gas Estimator
//!
//! Estimates the exact call the executor would send. The simulation uses a
//! fixed 5% output floor rather than the user's slippage setting; if it
//! fails, a per-shape default is used instead.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::cartographer::CandidateRoute;
use crate::chain::{simulation_sender, ChainClient};
use crate::contracts::{ContractRegistry, ContractType};
use crate::error::RegistryError;
use crate::executor::encode_swap;

/// Output floor used for gas simulation, in bps of the quote
pub const GAS_SIMULATION_FLOOR_BPS: u64 = 9_500;

pub const FALLBACK_GAS_V3_DIRECT: u64 = 150_000;
pub const FALLBACK_GAS_V2_DIRECT: u64 = 120_000;
pub const FALLBACK_GAS_MULTI_HOP: u64 = 220_000;
pub const FALLBACK_GAS_MIXED: u64 = 250_000;

/// Gas for one route and whether it came from a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GasEstimate {
    pub gas: u64,
    pub simulated: bool,
}

impl GasEstimate {
    pub fn fallback(route: &CandidateRoute) -> Self {
        Self {
            gas: fallback_gas(route),
            simulated: false,
        }
    }
}

/// Hardcoded estimate by route shape
pub fn fallback_gas(route: &CandidateRoute) -> u64 {
    match route {
        CandidateRoute::V3Direct { .. } => FALLBACK_GAS_V3_DIRECT,
        CandidateRoute::V2Direct { .. } => FALLBACK_GAS_V2_DIRECT,
        CandidateRoute::V2MultiHop { .. } | CandidateRoute::V3MultiHop { .. } => {
            FALLBACK_GAS_MULTI_HOP
        }
        CandidateRoute::Mixed { .. } => FALLBACK_GAS_MIXED,
    }
}

/// `output * 0.95`, independent of user slippage
pub fn simulation_min_out(output_amount: U256) -> U256 {
    output_amount * U256::from(GAS_SIMULATION_FLOOR_BPS) / U256::from(10_000u64)
}

pub struct GasEstimator {
    client: Arc<dyn ChainClient>,
    chain_id: u64,
    smart_router: Address,
}

impl GasEstimator {
    pub fn new(
        client: Arc<dyn ChainClient>,
        chain_id: u64,
        contracts: &ContractRegistry,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            client,
            chain_id,
            smart_router: contracts.get_contract_address(chain_id, ContractType::SmartRouter)?,
        })
    }

    /// Gas for swapping `amount_in` along `route`, expecting `output_amount`
    pub async fn estimate(
        &self,
        route: &CandidateRoute,
        amount_in: U256,
        output_amount: U256,
        deadline: u64,
    ) -> GasEstimate {
        let sender = simulation_sender(self.client.as_ref());
        let min_out = simulation_min_out(output_amount);

        let calldata = match encode_swap(route, amount_in, min_out, sender, deadline) {
            Ok(data) => data,
            Err(e) => {
                debug!("Cannot encode {} for gas estimate: {}", route.describe(), e);
                return GasEstimate::fallback(route);
            }
        };

        match self
            .client
            .estimate_gas(self.chain_id, sender, self.smart_router, calldata)
            .await
        {
            Ok(gas) => GasEstimate {
                gas,
                simulated: true,
            },
            Err(e) => {
                debug!(
                    "Gas simulation failed for {} ({}), using {}",
                    route.describe(),
                    e,
                    fallback_gas(route)
                );
                GasEstimate::fallback(route)
            }
        }
    }
}
