//! In-memory `ChainClient` for tests
//!
//! Holds V2 pairs and V3 pools and answers the factory, pool, router, quoter
//! and ERC-20 calls the router issues. Failures can be switched on per target.

use alloy_primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::ChainClient;
use crate::abi::{
    IMixedRouteQuoter, ISmartRouter, IV2Factory, IV2Pair, IV2Router, IV3Factory, IV3Pool, IERC20,
};
use crate::contracts::{ContractRegistry, ContractType};
use crate::error::ChainError;
use crate::tokens::{Token, TokenRegistry};

pub const CHAIN_ID: u64 = 31337;

pub const V2_FACTORY: Address = address!("00000000000000000000000000000000000f0001");
pub const V3_FACTORY: Address = address!("00000000000000000000000000000000000f0002");
pub const SMART_ROUTER: Address = address!("00000000000000000000000000000000000f0003");
pub const V2_ROUTER: Address = address!("00000000000000000000000000000000000f0004");
pub const MIXED_QUOTER: Address = address!("00000000000000000000000000000000000f0005");

/// Account used when a test "connects" a wallet
pub const USER: Address = address!("00000000000000000000000000000000000a11ce");

/// Gas reported by `estimate_gas` per call shape
pub const V2_SWAP_GAS: u64 = 110_000;
pub const V3_SWAP_GAS: u64 = 140_000;
pub const MULTICALL_GAS: u64 = 230_000;

// ============================================
// FIXTURES
// ============================================

pub fn usdc() -> Token {
    Token::new(CHAIN_ID, address!("000000000000000000000000000000000000c001"), "USDC", 6)
}

pub fn weth() -> Token {
    Token::new(CHAIN_ID, address!("000000000000000000000000000000000000c002"), "WETH", 18)
}

pub fn dai() -> Token {
    Token::new(CHAIN_ID, address!("000000000000000000000000000000000000c003"), "DAI", 18)
}

pub fn wbtc() -> Token {
    Token::new(CHAIN_ID, address!("000000000000000000000000000000000000c004"), "WBTC", 8)
}

pub fn contracts() -> ContractRegistry {
    let mut registry = ContractRegistry::new();
    registry.register(CHAIN_ID, ContractType::V2Factory, V2_FACTORY);
    registry.register(CHAIN_ID, ContractType::V3Factory, V3_FACTORY);
    registry.register(CHAIN_ID, ContractType::SmartRouter, SMART_ROUTER);
    registry.register(CHAIN_ID, ContractType::V2Router, V2_ROUTER);
    registry.register(CHAIN_ID, ContractType::MixedRouteQuoter, MIXED_QUOTER);
    registry
}

pub fn tokens() -> TokenRegistry {
    let mut registry = TokenRegistry::new();
    for token in [usdc(), weth(), dai(), wbtc()] {
        registry.register(token);
    }
    registry
}

// ============================================
// STATE
// ============================================

#[derive(Debug, Clone)]
struct MockPair {
    address: Address,
    token0: Address,
    token1: Address,
    reserve0: u128,
    reserve1: u128,
}

#[derive(Debug, Clone)]
struct MockPool {
    address: Address,
    token0: Address,
    token1: Address,
    fee: u32,
    liquidity: u128,
    /// token1 per token0, raw units
    price: f64,
}

/// A transaction accepted by `send_transaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub to: Address,
    pub calldata: Bytes,
    pub gas_limit: Option<u64>,
    pub hash: B256,
}

#[derive(Default)]
struct MockState {
    pairs: Vec<MockPair>,
    pools: Vec<MockPool>,
    next_address: u64,
    failing: HashSet<Address>,
    unavailable: bool,
    router_amounts_out_fails: bool,
    gas_fails: bool,
    reject_submissions: bool,
    account: Option<Address>,
    allowances: HashMap<(Address, Address, Address), U256>,
    sent: Vec<SentTx>,
    pending: HashSet<B256>,
    reads: usize,
}

impl MockState {
    fn fresh_address(&mut self) -> Address {
        self.next_address += 1;
        let mut bytes = [0u8; 20];
        bytes[0] = 0xaa;
        bytes[12..].copy_from_slice(&self.next_address.to_be_bytes());
        Address::from(bytes)
    }

    fn pair(&self, a: Address, b: Address) -> Option<&MockPair> {
        self.pairs
            .iter()
            .find(|p| (p.token0 == a && p.token1 == b) || (p.token0 == b && p.token1 == a))
    }

    fn pool(&self, a: Address, b: Address, fee: u32) -> Option<&MockPool> {
        self.pools.iter().find(|p| {
            p.fee == fee && ((p.token0 == a && p.token1 == b) || (p.token0 == b && p.token1 == a))
        })
    }

    fn check_target(&self, target: Address) -> Result<(), ChainError> {
        if self.failing.contains(&target) {
            return Err(ChainError::Transport(format!("rpc error reading {:?}", target)));
        }
        Ok(())
    }

    fn v2_out(&self, token_in: Address, token_out: Address, amount_in: U256) -> Result<U256, ChainError> {
        let pair = self
            .pair(token_in, token_out)
            .ok_or_else(|| ChainError::Reverted("PancakeLibrary: INVALID_PATH".into()))?;
        self.check_target(pair.address)?;
        let (reserve_in, reserve_out) = if pair.token0 == token_in {
            (pair.reserve0, pair.reserve1)
        } else {
            (pair.reserve1, pair.reserve0)
        };
        if reserve_in == 0 || reserve_out == 0 {
            return Err(ChainError::Reverted("INSUFFICIENT_LIQUIDITY".into()));
        }
        let amount_in_with_fee = amount_in * U256::from(9975u64);
        let numerator = amount_in_with_fee * U256::from(reserve_out);
        let denominator = U256::from(reserve_in) * U256::from(10_000u64) + amount_in_with_fee;
        Ok(numerator / denominator)
    }

    fn v3_out(&self, token_in: Address, token_out: Address, fee: u32, amount_in: U256) -> Result<U256, ChainError> {
        let pool = self
            .pool(token_in, token_out, fee)
            .ok_or_else(|| ChainError::Reverted("pool not found".into()))?;
        self.check_target(pool.address)?;
        if pool.liquidity == 0 {
            return Err(ChainError::Reverted("no liquidity".into()));
        }
        let price = if pool.token0 == token_in { pool.price } else { 1.0 / pool.price };
        let amount: f64 = amount_in.to_string().parse().unwrap_or(0.0);
        let out = amount * price * (1.0 - fee as f64 / 1_000_000.0);
        Ok(U256::from(out as u128))
    }
}

/// Decode a packed `(token, fee, token, ...)` path
fn decode_packed_path(path: &[u8]) -> (Vec<Address>, Vec<u32>) {
    let mut tokens = Vec::new();
    let mut fees = Vec::new();
    let mut offset = 0;
    while offset + 20 <= path.len() {
        tokens.push(Address::from_slice(&path[offset..offset + 20]));
        offset += 20;
        if offset + 3 <= path.len() {
            let fee = u32::from_be_bytes([0, path[offset], path[offset + 1], path[offset + 2]]);
            fees.push(fee);
            offset += 3;
        }
    }
    (tokens, fees)
}

fn revert(reason: &str) -> ChainError {
    ChainError::Reverted(reason.to_string())
}

fn decode_err(e: impl std::fmt::Display) -> ChainError {
    ChainError::Decode(e.to_string())
}

// ============================================
// MOCK CHAIN
// ============================================

pub struct MockChain {
    state: Mutex<MockState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Add a V2 pair holding `reserve_a` of `a` and `reserve_b` of `b`
    pub fn add_v2_pair(&self, a: &Token, b: &Token, reserve_a: u128, reserve_b: u128) -> Address {
        let mut state = self.state();
        let address = state.fresh_address();
        let (token0, token1, reserve0, reserve1) = if a.address < b.address {
            (a.address, b.address, reserve_a, reserve_b)
        } else {
            (b.address, a.address, reserve_b, reserve_a)
        };
        state.pairs.push(MockPair { address, token0, token1, reserve0, reserve1 });
        address
    }

    /// Add a V3 pool quoting `price_b_per_a` raw units of `b` per raw unit of `a`
    pub fn add_v3_pool(&self, a: &Token, b: &Token, fee: u32, liquidity: u128, price_b_per_a: f64) -> Address {
        let mut state = self.state();
        let address = state.fresh_address();
        let (token0, token1, price) = if a.address < b.address {
            (a.address, b.address, price_b_per_a)
        } else {
            (b.address, a.address, 1.0 / price_b_per_a)
        };
        state.pools.push(MockPool { address, token0, token1, fee, liquidity, price });
        address
    }

    /// Every call targeting `target` fails with a transport error
    pub fn fail_reads_from(&self, target: Address) {
        self.state().failing.insert(target);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// `getAmountsOut` on the smart router fails; the plain V2 router still answers
    pub fn fail_router_amounts_out(&self) {
        self.state().router_amounts_out_fails = true;
    }

    pub fn fail_gas_estimates(&self) {
        self.state().gas_fails = true;
    }

    pub fn reject_submissions(&self) {
        self.state().reject_submissions = true;
    }

    /// Submitted transactions stay pending until `mine_all`
    pub fn keep_pending(&self, hash: B256) {
        self.state().pending.insert(hash);
    }

    pub fn connect(&self, account: Address) {
        self.state().account = Some(account);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state().allowances.insert((token, owner, spender), amount);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state().sent.clone()
    }

    pub fn read_count(&self) -> usize {
        self.state().reads
    }

    fn handle_read(&self, to: Address, data: &[u8]) -> Result<Bytes, ChainError> {
        let mut state = self.state();
        if state.unavailable {
            return Err(ChainError::Transport("connection refused".into()));
        }
        state.reads += 1;
        state.check_target(to)?;

        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| revert("missing selector"))?;

        let encoded = match selector {
            IV3Factory::getPoolCall::SELECTOR if to == V3_FACTORY => {
                let call = IV3Factory::getPoolCall::abi_decode(data).map_err(decode_err)?;
                let fee: u32 = call.fee.to();
                let pool = state
                    .pool(call.tokenA, call.tokenB, fee)
                    .map(|p| p.address)
                    .unwrap_or(Address::ZERO);
                (pool,).abi_encode_params()
            }
            IV2Factory::getPairCall::SELECTOR if to == V2_FACTORY => {
                let call = IV2Factory::getPairCall::abi_decode(data).map_err(decode_err)?;
                let pair = state
                    .pair(call.tokenA, call.tokenB)
                    .map(|p| p.address)
                    .unwrap_or(Address::ZERO);
                (pair,).abi_encode_params()
            }
            IV3Pool::liquidityCall::SELECTOR => {
                let pool = state.pools.iter().find(|p| p.address == to).ok_or_else(|| revert("not a pool"))?;
                (U256::from(pool.liquidity),).abi_encode_params()
            }
            IV3Pool::slot0Call::SELECTOR => {
                let pool = state.pools.iter().find(|p| p.address == to).ok_or_else(|| revert("not a pool"))?;
                let sqrt_price = pool.price.sqrt() * 2f64.powi(96);
                (
                    U256::from(sqrt_price as u128),
                    U256::ZERO,
                    U256::ZERO,
                    U256::ZERO,
                    U256::ZERO,
                    U256::ZERO,
                    true,
                )
                    .abi_encode_params()
            }
            IV2Pair::getReservesCall::SELECTOR => {
                let pair = state.pairs.iter().find(|p| p.address == to).ok_or_else(|| revert("not a pair"))?;
                (U256::from(pair.reserve0), U256::from(pair.reserve1), U256::ZERO).abi_encode_params()
            }
            // token0() has the same selector on pairs and pools
            IV2Pair::token0Call::SELECTOR => {
                let token0 = state
                    .pairs
                    .iter()
                    .find(|p| p.address == to)
                    .map(|p| p.token0)
                    .or_else(|| state.pools.iter().find(|p| p.address == to).map(|p| p.token0))
                    .ok_or_else(|| revert("no token0"))?;
                (token0,).abi_encode_params()
            }
            IV2Router::getAmountsOutCall::SELECTOR if to == SMART_ROUTER || to == V2_ROUTER => {
                if to == SMART_ROUTER && state.router_amounts_out_fails {
                    return Err(revert("function selector was not recognized"));
                }
                let call = IV2Router::getAmountsOutCall::abi_decode(data).map_err(decode_err)?;
                let mut amounts = vec![call.amountIn];
                for hop in call.path.windows(2) {
                    let last = *amounts.last().unwrap_or(&U256::ZERO);
                    amounts.push(state.v2_out(hop[0], hop[1], last)?);
                }
                (amounts,).abi_encode_params()
            }
            IERC20::allowanceCall::SELECTOR => {
                let call = IERC20::allowanceCall::abi_decode(data).map_err(decode_err)?;
                let amount = state
                    .allowances
                    .get(&(to, call.owner, call.spender))
                    .copied()
                    .unwrap_or(U256::ZERO);
                (amount,).abi_encode_params()
            }
            _ => return Err(revert("unsupported call")),
        };

        Ok(Bytes::from(encoded))
    }

    fn handle_simulate(&self, to: Address, data: &[u8]) -> Result<Bytes, ChainError> {
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| revert("missing selector"))?;

        {
            let mut state = self.state();
            if state.unavailable {
                return Err(ChainError::Transport("connection refused".into()));
            }
            state.reads += 1;

            match selector {
                ISmartRouter::exactInputCall::SELECTOR if to == SMART_ROUTER => {
                    let call = ISmartRouter::exactInputCall::abi_decode(data).map_err(decode_err)?;
                    let (tokens, fees) = decode_packed_path(&call.params.path);
                    let mut amount = call.params.amountIn;
                    for (i, fee) in fees.iter().enumerate() {
                        amount = state.v3_out(tokens[i], tokens[i + 1], *fee, amount)?;
                    }
                    return Ok(Bytes::from((amount,).abi_encode_params()));
                }
                IMixedRouteQuoter::quoteExactInputCall::SELECTOR if to == MIXED_QUOTER => {
                    let call = IMixedRouteQuoter::quoteExactInputCall::abi_decode(data).map_err(decode_err)?;
                    let (tokens, fees) = decode_packed_path(&call.path);
                    if call.flag.len() != fees.len() {
                        return Err(revert("flag length mismatch"));
                    }
                    let mut amount = call.amountIn;
                    for (i, fee) in fees.iter().enumerate() {
                        amount = if call.flag[i] == U256::from(1u64) {
                            state.v2_out(tokens[i], tokens[i + 1], amount)?
                        } else {
                            state.v3_out(tokens[i], tokens[i + 1], *fee, amount)?
                        };
                    }
                    let empty: Vec<U256> = Vec::new();
                    return Ok(Bytes::from(
                        (amount, empty.clone(), empty, U256::from(90_000u64)).abi_encode_params(),
                    ));
                }
                _ => {}
            }
        }

        // Plain view functions simulate the same as reads
        self.handle_read(to, data)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn block_number(&self, chain_id: u64) -> Result<u64, ChainError> {
        if chain_id != CHAIN_ID {
            return Err(ChainError::WrongChain { expected: CHAIN_ID, actual: chain_id });
        }
        if self.state().unavailable {
            return Err(ChainError::Transport("connection refused".into()));
        }
        Ok(1_000)
    }

    async fn read_contract(&self, chain_id: u64, to: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
        if chain_id != CHAIN_ID {
            return Err(ChainError::WrongChain { expected: CHAIN_ID, actual: chain_id });
        }
        self.handle_read(to, &calldata)
    }

    async fn simulate_contract(
        &self,
        chain_id: u64,
        _from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, ChainError> {
        if chain_id != CHAIN_ID {
            return Err(ChainError::WrongChain { expected: CHAIN_ID, actual: chain_id });
        }
        self.handle_simulate(to, &calldata)
    }

    async fn estimate_gas(
        &self,
        chain_id: u64,
        _from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<u64, ChainError> {
        if chain_id != CHAIN_ID {
            return Err(ChainError::WrongChain { expected: CHAIN_ID, actual: chain_id });
        }
        let state = self.state();
        if state.gas_fails || state.unavailable {
            return Err(revert("STF"));
        }
        if to != SMART_ROUTER {
            return Err(revert("unexpected target"));
        }
        match calldata.get(..4).and_then(|s| <[u8; 4]>::try_from(s).ok()) {
            Some(ISmartRouter::swapExactTokensForTokensCall::SELECTOR) => Ok(V2_SWAP_GAS),
            Some(ISmartRouter::exactInputCall::SELECTOR) => Ok(V3_SWAP_GAS),
            Some(ISmartRouter::multicallCall::SELECTOR) => Ok(MULTICALL_GAS),
            _ => Err(revert("unsupported call")),
        }
    }

    async fn send_transaction(
        &self,
        chain_id: u64,
        to: Address,
        calldata: Bytes,
        gas_limit: Option<u64>,
    ) -> Result<B256, ChainError> {
        if chain_id != CHAIN_ID {
            return Err(ChainError::WrongChain { expected: CHAIN_ID, actual: chain_id });
        }
        let mut state = self.state();
        let account = state.account.ok_or(ChainError::NoSigner)?;
        if state.reject_submissions {
            return Err(ChainError::Rejected("user rejected the request".into()));
        }

        if calldata.get(..4) == Some(&IERC20::approveCall::SELECTOR[..]) {
            let call = IERC20::approveCall::abi_decode(&calldata).map_err(decode_err)?;
            state.allowances.insert((to, account, call.spender), call.amount);
        }

        let mut preimage = calldata.to_vec();
        preimage.extend_from_slice(&(state.sent.len() as u64).to_be_bytes());
        let hash = keccak256(&preimage);

        state.sent.push(SentTx { to, calldata, gas_limit, hash });
        Ok(hash)
    }

    async fn receipt_status(&self, chain_id: u64, tx_hash: B256) -> Result<Option<bool>, ChainError> {
        if chain_id != CHAIN_ID {
            return Err(ChainError::WrongChain { expected: CHAIN_ID, actual: chain_id });
        }
        let state = self.state();
        if state.pending.contains(&tx_hash) {
            return Ok(None);
        }
        Ok(Some(state.sent.iter().any(|tx| tx.hash == tx_hash)))
    }

    fn account(&self) -> Option<Address> {
        self.state().account
    }
}
