//! Contract address registry
//!
//! Maps `(chain_id, ContractType)` to a deployed address. Owned by the caller
//! and passed by reference, so tests can build their own registry.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::RegistryError;

/// BNB Smart Chain mainnet
pub const BSC_CHAIN_ID: u64 = 56;

/// Ethereum mainnet
pub const ETHEREUM_CHAIN_ID: u64 = 1;

/// Contracts the router talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
    /// Constant-product pair factory (`getPair`)
    V2Factory,
    /// Concentrated-liquidity pool factory (`getPool`)
    V3Factory,
    /// Swap router: `exactInput`, `swapExactTokensForTokens`, `multicall`
    SmartRouter,
    /// Plain V2 router, fallback for `getAmountsOut`
    V2Router,
    /// Quoter accepting a per-hop protocol flag array
    MixedRouteQuoter,
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractType::V2Factory => write!(f, "V2Factory"),
            ContractType::V3Factory => write!(f, "V3Factory"),
            ContractType::SmartRouter => write!(f, "SmartRouter"),
            ContractType::V2Router => write!(f, "V2Router"),
            ContractType::MixedRouteQuoter => write!(f, "MixedRouteQuoter"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    addresses: HashMap<(u64, ContractType), Address>,
}

impl ContractRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the PancakeSwap deployments on BSC and Ethereum
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // The v3 stack is deployed at the same addresses on both chains
        for chain_id in [BSC_CHAIN_ID, ETHEREUM_CHAIN_ID] {
            registry.register(
                chain_id,
                ContractType::V3Factory,
                address!("0BFbCF9fa4f9C56B0F40a671Ad40E0805A091865"),
            );
            registry.register(
                chain_id,
                ContractType::SmartRouter,
                address!("13f4EA83D0bd40E75C8222255bc855a974568Dd4"),
            );
            registry.register(
                chain_id,
                ContractType::MixedRouteQuoter,
                address!("678Aa4bF4E210cf2166753e054d5b7c31cc7fa86"),
            );
        }

        registry.register(
            BSC_CHAIN_ID,
            ContractType::V2Factory,
            address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73"),
        );
        registry.register(
            BSC_CHAIN_ID,
            ContractType::V2Router,
            address!("10ED43C718714eb63d5aA57B78B54704E256024E"),
        );
        registry.register(
            ETHEREUM_CHAIN_ID,
            ContractType::V2Factory,
            address!("1097053Fd2ea711dad45caCcc45EfF7548fCB362"),
        );
        registry.register(
            ETHEREUM_CHAIN_ID,
            ContractType::V2Router,
            address!("EfF92A263d31888d860bD50809A8D171709b7b1c"),
        );

        registry
    }

    pub fn register(&mut self, chain_id: u64, contract: ContractType, address: Address) {
        self.addresses.insert((chain_id, contract), address);
    }

    /// Look up a contract. Missing entries are a hard configuration error.
    pub fn get_contract_address(
        &self,
        chain_id: u64,
        contract: ContractType,
    ) -> Result<Address, RegistryError> {
        self.addresses
            .get(&(chain_id, contract))
            .copied()
            .ok_or(RegistryError::ContractNotFound { chain_id, contract })
    }
}
