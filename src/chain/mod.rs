//! Chain Client
//!
//! The router never talks to an RPC node directly. Every read, simulation,
//! gas estimate and submission goes through `ChainClient`, always scoped to an
//! explicit chain id.

mod rpc;
mod signer;

#[cfg(test)]
pub mod mock;

pub use rpc::RpcChainClient;
pub use signer::{signer_from_env, signer_from_key};

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;

use crate::error::ChainError;

/// Read/write access to a blockchain
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Liveness probe
    async fn block_number(&self, chain_id: u64) -> Result<u64, ChainError>;

    /// `eth_call` with no sender context
    async fn read_contract(
        &self,
        chain_id: u64,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, ChainError>;

    /// `eth_call` executed as `from`
    async fn simulate_contract(
        &self,
        chain_id: u64,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, ChainError>;

    async fn estimate_gas(
        &self,
        chain_id: u64,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<u64, ChainError>;

    /// Sign and broadcast. Returns as soon as the node accepts the transaction.
    async fn send_transaction(
        &self,
        chain_id: u64,
        to: Address,
        calldata: Bytes,
        gas_limit: Option<u64>,
    ) -> Result<B256, ChainError>;

    /// `None` while pending, `Some(success)` once mined
    async fn receipt_status(&self, chain_id: u64, tx_hash: B256) -> Result<Option<bool>, ChainError>;

    /// Connected account, if a signer is available
    fn account(&self) -> Option<Address>;
}

/// Typed read: encode `call`, run it, decode the return value
pub async fn read_call<C: SolCall>(
    client: &dyn ChainClient,
    chain_id: u64,
    to: Address,
    call: &C,
) -> Result<C::Return, ChainError> {
    let calldata = Bytes::from(call.abi_encode());
    let output = client.read_contract(chain_id, to, calldata).await?;
    C::abi_decode_returns(&output).map_err(|e| ChainError::Decode(e.to_string()))
}

/// Typed simulation with sender context
pub async fn simulate_call<C: SolCall>(
    client: &dyn ChainClient,
    chain_id: u64,
    from: Address,
    to: Address,
    call: &C,
) -> Result<C::Return, ChainError> {
    let calldata = Bytes::from(call.abi_encode());
    let output = client.simulate_contract(chain_id, from, to, calldata).await?;
    C::abi_decode_returns(&output).map_err(|e| ChainError::Decode(e.to_string()))
}

/// Sender used for simulations: the connected account, or the zero address
pub fn simulation_sender(client: &dyn ChainClient) -> Address {
    client.account().unwrap_or(Address::ZERO)
}
