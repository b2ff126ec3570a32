//! HTTP JSON-RPC implementation of `ChainClient`
//!
//! Builds a provider per call from the configured URL, exactly like the
//! quoter and pool fetcher do, so the client itself stays `Send + Sync`
//! without holding a connection.

use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer as _;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::ChainClient;
use crate::error::ChainError;

/// Chain client bound to a single chain id
pub struct RpcChainClient {
    rpc_url: String,
    chain_id: u64,
    signer: Option<PrivateKeySigner>,
}

impl RpcChainClient {
    pub fn new(rpc_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
            signer: None,
        }
    }

    /// Attach a signer for approvals and swap submission
    pub fn with_signer(mut self, signer: PrivateKeySigner) -> Self {
        info!("Chain client for chain {} signing as {:?}", self.chain_id, signer.address());
        self.signer = Some(signer);
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn check_chain(&self, chain_id: u64) -> Result<(), ChainError> {
        if chain_id != self.chain_id {
            return Err(ChainError::WrongChain {
                expected: self.chain_id,
                actual: chain_id,
            });
        }
        Ok(())
    }

    fn url(&self) -> Result<Url, ChainError> {
        self.rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::Transport(format!("invalid RPC URL: {}", e)))
    }
}

/// Map an RPC failure: node-reported reverts vs everything else
fn classify(err: impl std::fmt::Display) -> ChainError {
    let message = err.to_string();
    if message.to_lowercase().contains("revert") {
        ChainError::Reverted(message)
    } else {
        ChainError::Transport(message)
    }
}

fn call_request(from: Option<Address>, to: Address, calldata: Bytes) -> TransactionRequest {
    let tx = TransactionRequest::default().to(to).input(calldata.into());
    match from {
        Some(from) => tx.from(from),
        None => tx,
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn block_number(&self, chain_id: u64) -> Result<u64, ChainError> {
        self.check_chain(chain_id)?;
        let provider = ProviderBuilder::new().connect_http(self.url()?);
        provider.get_block_number().await.map_err(classify)
    }

    async fn read_contract(
        &self,
        chain_id: u64,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, ChainError> {
        self.check_chain(chain_id)?;
        let provider = ProviderBuilder::new().connect_http(self.url()?);
        provider
            .call(call_request(None, to, calldata))
            .await
            .map_err(classify)
    }

    async fn simulate_contract(
        &self,
        chain_id: u64,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<Bytes, ChainError> {
        self.check_chain(chain_id)?;
        let provider = ProviderBuilder::new().connect_http(self.url()?);
        provider
            .call(call_request(Some(from), to, calldata))
            .await
            .map_err(classify)
    }

    async fn estimate_gas(
        &self,
        chain_id: u64,
        from: Address,
        to: Address,
        calldata: Bytes,
    ) -> Result<u64, ChainError> {
        self.check_chain(chain_id)?;
        let provider = ProviderBuilder::new().connect_http(self.url()?);
        provider
            .estimate_gas(call_request(Some(from), to, calldata))
            .await
            .map_err(classify)
    }

    async fn send_transaction(
        &self,
        chain_id: u64,
        to: Address,
        calldata: Bytes,
        gas_limit: Option<u64>,
    ) -> Result<B256, ChainError> {
        self.check_chain(chain_id)?;
        let signer = self.signer.clone().ok_or(ChainError::NoSigner)?;
        let from = signer.address();
        let selector = hex::encode(calldata.get(..4).unwrap_or_default());

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.url()?);

        let mut tx = call_request(Some(from), to, calldata);
        if let Some(gas) = gas_limit {
            tx = tx.gas_limit(gas);
        }

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::Rejected(e.to_string()))?;
        let hash = *pending.tx_hash();

        debug!("Submitted transaction {:?} to {:?} (selector 0x{})", hash, to, selector);
        Ok(hash)
    }

    async fn receipt_status(&self, chain_id: u64, tx_hash: B256) -> Result<Option<bool>, ChainError> {
        self.check_chain(chain_id)?;
        let provider = ProviderBuilder::new().connect_http(self.url()?);
        let receipt = provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(classify)?;
        Ok(receipt.map(|r| r.status()))
    }

    fn account(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[tokio::test]
    async fn test_wrong_chain_is_rejected_before_any_io() {
        let client = RpcChainClient::new("http://127.0.0.1:1", 56);
        let err = assert_err!(client.block_number(1).await);
        assert_eq!(err, ChainError::WrongChain { expected: 56, actual: 1 });
    }

    #[tokio::test]
    async fn test_read_only_client_cannot_submit() {
        let client = RpcChainClient::new("http://127.0.0.1:1", 56);
        assert_eq!(client.account(), None);
        let err = assert_err!(client.send_transaction(56, Address::ZERO, Bytes::new(), None).await);
        assert_eq!(err, ChainError::NoSigner);
    }

    #[test]
    fn test_classify_revert() {
        assert!(matches!(classify("execution reverted: STF"), ChainError::Reverted(_)));
        assert!(matches!(classify("connection refused"), ChainError::Transport(_)));
    }
}
