//! Phase 4: The Executor
//!
//! This module turns the selected route into an on-chain swap:
//! - Slippage guard (`minAmountOut`) from the user's tolerance
//! - Calldata for V2, V3 and mixed multicall routes
//! - Allowance check and approval
//! - Swap state machine up to submission and confirmation
//!
//! ⚠️  WARNING: This module interacts with real funds!

mod approval;
mod encoding;

pub use approval::{allowance, approval_shortfall, encode_approve};
pub use encoding::{
    encode_swap, min_amount_out, slippage_bps, split_segments, Segment, ADDRESS_THIS,
    CONTRACT_BALANCE,
};

use alloy_primitives::{Address, B256, U256};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::brain::RouteQuote;
use crate::chain::ChainClient;
use crate::contracts::{ContractRegistry, ContractType};
use crate::error::{RegistryError, Result, RouterError};
use crate::tokens::{format_amount, Token};

/// Submission gas limit over a simulated estimate, in percent
const GAS_LIMIT_MARGIN_PCT: u64 = 120;

/// Swap lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SwapState {
    Idle,
    Quoting,
    Quoted,
    ApprovalCheck,
    Executing,
    Submitted { tx_hash: B256 },
    Confirmed { tx_hash: B256 },
    Failed { reason: String },
}

impl SwapState {
    /// A transaction is being built or awaits confirmation
    pub fn is_busy(&self) -> bool {
        matches!(self, SwapState::Executing | SwapState::Submitted { .. })
    }
}

impl std::fmt::Display for SwapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapState::Idle => write!(f, "IDLE"),
            SwapState::Quoting => write!(f, "QUOTING"),
            SwapState::Quoted => write!(f, "QUOTED"),
            SwapState::ApprovalCheck => write!(f, "APPROVAL_CHECK"),
            SwapState::Executing => write!(f, "EXECUTING"),
            SwapState::Submitted { tx_hash } => write!(f, "SUBMITTED ({:?})", tx_hash),
            SwapState::Confirmed { tx_hash } => write!(f, "CONFIRMED ({:?})", tx_hash),
            SwapState::Failed { reason } => write!(f, "FAILED ({})", reason),
        }
    }
}

/// Executes the best route through the smart router
pub struct SwapExecutor {
    client: Arc<dyn ChainClient>,
    chain_id: u64,
    smart_router: Address,
    state: Mutex<SwapState>,
}

impl SwapExecutor {
    pub fn new(
        client: Arc<dyn ChainClient>,
        chain_id: u64,
        contracts: &ContractRegistry,
    ) -> std::result::Result<Self, RegistryError> {
        Ok(Self {
            client,
            chain_id,
            smart_router: contracts.get_contract_address(chain_id, ContractType::SmartRouter)?,
            state: Mutex::new(SwapState::Idle),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SwapState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SwapState {
        self.lock().clone()
    }

    /// A quoting cycle started. Ignored while a swap is in progress.
    pub fn begin_quoting(&self) {
        let mut state = self.lock();
        if !state.is_busy() {
            *state = SwapState::Quoting;
        }
    }

    /// A quoting cycle finished, with or without a usable route
    pub fn finish_quoting(&self, has_route: bool) {
        let mut state = self.lock();
        if !state.is_busy() {
            *state = if has_route { SwapState::Quoted } else { SwapState::Idle };
        }
    }

    /// Allowance shortfall of `owner` towards the smart router, if any
    pub async fn check_approval(
        &self,
        token: &Token,
        owner: Address,
        amount_in: U256,
    ) -> Result<Option<U256>> {
        {
            let mut state = self.lock();
            if !state.is_busy() {
                *state = SwapState::ApprovalCheck;
            }
        }

        let current =
            allowance(self.client.as_ref(), self.chain_id, token.address, owner, self.smart_router)
                .await?;
        let shortfall = approval_shortfall(current, amount_in);

        match shortfall {
            Some(missing) => info!(
                "Allowance for {} short by {} {}",
                token,
                format_amount(missing, token.decimals),
                token.symbol
            ),
            None => info!("✓ Allowance for {} covers the swap", token),
        }
        Ok(shortfall)
    }

    /// Approve the smart router to spend `amount` of `token`
    pub async fn approve(&self, token: &Token, amount: U256) -> Result<B256> {
        if self.client.account().is_none() {
            return Err(RouterError::NotConnected);
        }

        let calldata = encode_approve(self.smart_router, amount);
        let tx_hash = self
            .client
            .send_transaction(self.chain_id, token.address, calldata, None)
            .await
            .map_err(RouterError::Submission)?;

        info!("📝 Approval for {} submitted: {:?}", token, tx_hash);
        Ok(tx_hash)
    }

    /// Submit `quote` for `amount_in`, guarded by `slippage_pct`.
    ///
    /// Returns as soon as the transaction is accepted. Confirmation is
    /// tracked separately through [`SwapExecutor::poll_confirmation`].
    pub async fn execute(
        &self,
        quote: Option<&RouteQuote>,
        amount_in: U256,
        slippage_pct: f64,
        deadline_minutes: u64,
    ) -> Result<B256> {
        let quote = quote.ok_or(RouterError::NoRoutes)?;
        let recipient = self.client.account().ok_or(RouterError::NotConnected)?;
        let bps = slippage_bps(slippage_pct)?;

        {
            let mut state = self.lock();
            if *state == SwapState::Executing {
                return Err(RouterError::SwapInFlight);
            }
            *state = SwapState::Executing;
        }

        let min_out = min_amount_out(quote.output_amount, bps);
        let deadline = swap_deadline(deadline_minutes);

        let calldata = match encode_swap(&quote.route, amount_in, min_out, recipient, deadline) {
            Ok(data) => data,
            Err(e) => {
                *self.lock() = SwapState::Failed {
                    reason: e.to_string(),
                };
                return Err(e);
            }
        };

        let gas_limit = quote
            .gas_simulated
            .then(|| quote.gas_estimate.saturating_mul(GAS_LIMIT_MARGIN_PCT) / 100);

        info!("🚀 Executing {}", quote.route);
        info!("   Input:      {}", amount_in);
        info!("   Expected:   {}", quote.output_amount);
        info!("   Min output: {} ({} bps slippage)", min_out, bps);

        match self
            .client
            .send_transaction(self.chain_id, self.smart_router, calldata, gas_limit)
            .await
        {
            Ok(tx_hash) => {
                info!("✅ Swap submitted: {:?}", tx_hash);
                *self.lock() = SwapState::Submitted { tx_hash };
                Ok(tx_hash)
            }
            Err(e) => {
                error!("❌ Swap submission failed: {}", e);
                *self.lock() = SwapState::Failed {
                    reason: e.to_string(),
                };
                Err(RouterError::Submission(e))
            }
        }
    }

    /// Check the receipt of the submitted swap. Stays `Submitted` while pending.
    pub async fn poll_confirmation(&self) -> Result<SwapState> {
        let tx_hash = match self.state() {
            SwapState::Submitted { tx_hash } => tx_hash,
            _ => return Err(RouterError::NothingSubmitted),
        };

        let status = self.client.receipt_status(self.chain_id, tx_hash).await?;
        let mut state = self.lock();
        match status {
            Some(true) => {
                info!("✅ Swap confirmed: {:?}", tx_hash);
                *state = SwapState::Confirmed { tx_hash };
            }
            Some(false) => {
                warn!("Swap reverted on-chain: {:?}", tx_hash);
                *state = SwapState::Failed {
                    reason: format!("transaction {:?} reverted", tx_hash),
                };
            }
            None => {}
        }
        Ok(state.clone())
    }
}

/// Unix timestamp `minutes` from now, clamped to `u64::MAX`
pub fn swap_deadline(minutes: u64) -> u64 {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    now.saturating_add(minutes.saturating_mul(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{IERC20, ISmartRouter};
    use crate::cartographer::{CandidateRoute, PoolRef};
    use crate::chain::mock::{self, usdc, weth, MockChain, USER};
    use crate::error::ChainError;
    use crate::simulator::GasEstimate;
    use alloy_sol_types::SolCall;

    fn executor(chain: Arc<MockChain>) -> SwapExecutor {
        SwapExecutor::new(chain, mock::CHAIN_ID, &mock::contracts()).unwrap()
    }

    fn v2_quote(output: u64, simulated: bool) -> RouteQuote {
        let route = CandidateRoute::direct(usdc(), weth(), PoolRef::V2 { pair: Address::ZERO });
        RouteQuote::new(
            route,
            U256::from(output),
            0.1,
            GasEstimate {
                gas: 100_000,
                simulated,
            },
        )
    }

    #[tokio::test]
    async fn test_execute_applies_slippage_and_submits() {
        let chain = Arc::new(MockChain::new());
        chain.connect(USER);
        let exec = executor(chain.clone());
        let quote = v2_quote(1_000_000, true);

        let tx_hash = exec
            .execute(Some(&quote), U256::from(500u64), 0.5, 20)
            .await
            .unwrap();

        assert_eq!(exec.state(), SwapState::Submitted { tx_hash });
        let sent = chain.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, mock::SMART_ROUTER);
        assert_eq!(sent[0].gas_limit, Some(120_000));

        let call = ISmartRouter::swapExactTokensForTokensCall::abi_decode(&sent[0].calldata).unwrap();
        assert_eq!(call.amountIn, U256::from(500u64));
        assert_eq!(call.amountOutMin, U256::from(995_000u64));
        assert_eq!(call.to, USER);
    }

    #[tokio::test]
    async fn test_fallback_gas_leaves_limit_to_client() {
        let chain = Arc::new(MockChain::new());
        chain.connect(USER);
        let exec = executor(chain.clone());

        exec.execute(Some(&v2_quote(1_000, false)), U256::from(1u64), 1.0, 20)
            .await
            .unwrap();
        assert_eq!(chain.sent()[0].gas_limit, None);
    }

    #[tokio::test]
    async fn test_no_route_rejects_before_submission() {
        let chain = Arc::new(MockChain::new());
        chain.connect(USER);
        let exec = executor(chain.clone());

        let err = exec.execute(None, U256::from(1u64), 0.5, 20).await.unwrap_err();
        assert!(matches!(err, RouterError::NoRoutes));
        assert!(chain.sent().is_empty());
        assert_eq!(exec.state(), SwapState::Idle);
    }

    #[tokio::test]
    async fn test_requires_connected_signer() {
        let chain = Arc::new(MockChain::new());
        let exec = executor(chain.clone());

        let err = exec
            .execute(Some(&v2_quote(1_000, true)), U256::from(1u64), 0.5, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::NotConnected));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_moves_to_failed_with_message() {
        let chain = Arc::new(MockChain::new());
        chain.connect(USER);
        chain.reject_submissions();
        let exec = executor(chain.clone());

        let err = exec
            .execute(Some(&v2_quote(1_000, true)), U256::from(1u64), 0.5, 20)
            .await
            .unwrap_err();

        assert!(matches!(err, RouterError::Submission(ChainError::Rejected(_))));
        assert!(err.to_string().contains("user rejected the request"));
        match exec.state() {
            SwapState::Failed { reason } => assert!(reason.contains("user rejected the request")),
            other => panic!("unexpected state {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_slippage_is_rejected() {
        let chain = Arc::new(MockChain::new());
        chain.connect(USER);
        let exec = executor(chain);

        let err = exec
            .execute(Some(&v2_quote(1_000, true)), U256::from(1u64), 150.0, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::InvalidSlippage(_)));
    }

    #[tokio::test]
    async fn test_poll_confirmation() {
        let chain = Arc::new(MockChain::new());
        chain.connect(USER);
        let exec = executor(chain.clone());

        assert!(matches!(
            exec.poll_confirmation().await,
            Err(RouterError::NothingSubmitted)
        ));

        let tx_hash = exec
            .execute(Some(&v2_quote(1_000, true)), U256::from(1u64), 0.5, 20)
            .await
            .unwrap();

        chain.keep_pending(tx_hash);
        assert_eq!(exec.poll_confirmation().await.unwrap(), SwapState::Submitted { tx_hash });
    }

    #[tokio::test]
    async fn test_poll_confirmation_confirms_mined_swap() {
        let chain = Arc::new(MockChain::new());
        chain.connect(USER);
        let exec = executor(chain);

        let tx_hash = exec
            .execute(Some(&v2_quote(1_000, true)), U256::from(1u64), 0.5, 20)
            .await
            .unwrap();
        assert_eq!(exec.poll_confirmation().await.unwrap(), SwapState::Confirmed { tx_hash });
    }

    #[tokio::test]
    async fn test_quoting_does_not_clobber_submitted_swap() {
        let chain = Arc::new(MockChain::new());
        chain.connect(USER);
        let exec = executor(chain);

        exec.begin_quoting();
        assert_eq!(exec.state(), SwapState::Quoting);
        exec.finish_quoting(true);
        assert_eq!(exec.state(), SwapState::Quoted);

        let tx_hash = exec
            .execute(Some(&v2_quote(1_000, true)), U256::from(1u64), 0.5, 20)
            .await
            .unwrap();
        exec.begin_quoting();
        exec.finish_quoting(false);
        assert_eq!(exec.state(), SwapState::Submitted { tx_hash });
    }

    #[tokio::test]
    async fn test_approval_flow() {
        let chain = Arc::new(MockChain::new());
        chain.connect(USER);
        let exec = executor(chain.clone());
        let token = usdc();

        let shortfall = exec
            .check_approval(&token, USER, U256::from(1_000u64))
            .await
            .unwrap();
        assert_eq!(shortfall, Some(U256::from(1_000u64)));
        assert_eq!(exec.state(), SwapState::ApprovalCheck);

        exec.approve(&token, U256::MAX).await.unwrap();
        let sent = chain.sent();
        assert_eq!(sent[0].to, token.address);
        let call = IERC20::approveCall::abi_decode(&sent[0].calldata).unwrap();
        assert_eq!(call.spender, mock::SMART_ROUTER);

        let shortfall = exec
            .check_approval(&token, USER, U256::from(1_000u64))
            .await
            .unwrap();
        assert_eq!(shortfall, None);
    }

    #[test]
    fn test_deadline_is_in_the_future() {
        let now = chrono::Utc::now().timestamp() as u64;
        let deadline = swap_deadline(20);
        assert!(deadline >= now + 20 * 60);
        assert!(deadline <= now + 20 * 60 + 5);
    }

    #[test]
    fn test_huge_deadline_saturates() {
        assert_eq!(swap_deadline(u64::MAX), u64::MAX);
        assert_eq!(swap_deadline(u64::MAX / 60), u64::MAX);
    }
}
