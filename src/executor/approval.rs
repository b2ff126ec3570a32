//! ERC-20 allowance helpers

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;

use crate::abi::IERC20;
use crate::chain::{read_call, ChainClient};
use crate::error::ChainError;

pub async fn allowance(
    client: &dyn ChainClient,
    chain_id: u64,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, ChainError> {
    read_call(client, chain_id, token, &IERC20::allowanceCall { owner, spender }).await
}

/// How much more allowance `required` needs, if any
pub fn approval_shortfall(allowance: U256, required: U256) -> Option<U256> {
    (allowance < required).then(|| required - allowance)
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortfall() {
        assert_eq!(approval_shortfall(U256::ZERO, U256::from(10)), Some(U256::from(10)));
        assert_eq!(approval_shortfall(U256::from(4), U256::from(10)), Some(U256::from(6)));
        assert_eq!(approval_shortfall(U256::from(10), U256::from(10)), None);
        assert_eq!(approval_shortfall(U256::MAX, U256::from(10)), None);
    }

    #[test]
    fn test_encode_approve() {
        let data = encode_approve(Address::repeat_byte(1), U256::MAX);
        let call = IERC20::approveCall::abi_decode(&data).unwrap();
        assert_eq!(call.spender, Address::repeat_byte(1));
        assert_eq!(call.amount, U256::MAX);
    }
}
