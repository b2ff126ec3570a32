//! Error taxonomy for the smart router.
//!
//! - `RegistryError`: unregistered chain / contract / token. Fatal, never retried.
//! - `ChainError`: anything the Chain Client reports (transport, revert, rejection).
//! - `QuoteError`: a single route could not be quoted. Recovered by dropping the route.
//! - `RouterError`: top-level error surfaced to callers of the router and executor.

use alloy_primitives::Address;
use thiserror::Error;

use crate::contracts::ContractType;

/// Result alias used across the crate
pub type Result<T, E = RouterError> = std::result::Result<T, E>;

/// Lookup failure in the token/contract registries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("chain {0} is not registered")]
    UnknownChain(u64),

    #[error("contract {contract} is not registered on chain {chain_id}")]
    ContractNotFound {
        chain_id: u64,
        contract: ContractType,
    },

    #[error("token {token} is not registered on chain {chain_id}")]
    TokenNotFound { chain_id: u64, token: String },
}

/// Failure reported by the Chain Client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("failed to decode return data: {0}")]
    Decode(String),

    #[error("client is bound to chain {expected}, call targeted chain {actual}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("no signer connected")]
    NoSigner,

    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// Why a single route could not be quoted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("quote call failed: {0}")]
    Call(#[from] ChainError),

    #[error("quote returned zero output")]
    ZeroOutput,

    #[error("quote returned no amounts")]
    EmptyResult,

    #[error("cannot encode route: {0}")]
    Encoding(String),

    #[error("pool {0} has no usable state")]
    PoolState(Address),
}

/// Top-level router error
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("configuration error: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid slippage tolerance: {0}%")]
    InvalidSlippage(f64),

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("no routes found")]
    NoRoutes,

    #[error("no swap intent set")]
    NoIntent,

    /// Inputs changed while the cycle was running; its results were discarded
    #[error("superseded by a newer quote request")]
    Superseded,

    #[error("wallet not connected")]
    NotConnected,

    #[error("a swap is already being executed")]
    SwapInFlight,

    #[error("no submitted swap to confirm")]
    NothingSubmitted,

    #[error("swap submission failed: {0}")]
    Submission(ChainError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
