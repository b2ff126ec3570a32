//! Packed path encoding
//!
//! `exactInput` and the mixed-route quoter take `token (20) | fee (3) | token ...`.

use alloy_primitives::{Address, Bytes, U256};

use crate::cartographer::{CandidateRoute, PoolRef};
use crate::error::QuoteError;

/// Fee slot written for V2 hops in a mixed path
pub const V2_FEE_PLACEHOLDER: u32 = 0;

/// Quoter flag per hop
pub const FLAG_V3: u64 = 0;
pub const FLAG_V2: u64 = 1;

const MAX_FEE: u32 = (1 << 24) - 1;

/// Encode `tokens[0], fees[0], tokens[1], ...`
pub fn encode_packed_path(tokens: &[Address], fees: &[u32]) -> Result<Bytes, QuoteError> {
    if tokens.len() < 2 || tokens.len() != fees.len() + 1 {
        return Err(QuoteError::Encoding(format!(
            "{} tokens for {} fees",
            tokens.len(),
            fees.len()
        )));
    }

    let mut path = Vec::with_capacity(20 + fees.len() * 23);
    path.extend_from_slice(tokens[0].as_slice());
    for (fee, token) in fees.iter().zip(&tokens[1..]) {
        if *fee > MAX_FEE {
            return Err(QuoteError::Encoding(format!("fee {} does not fit in uint24", fee)));
        }
        path.extend_from_slice(&fee.to_be_bytes()[1..]);
        path.extend_from_slice(token.as_slice());
    }
    Ok(path.into())
}

/// Path for a pure-V3 route
pub fn encode_v3_path(route: &CandidateRoute) -> Result<Bytes, QuoteError> {
    let tokens: Vec<Address> = route.path().iter().map(|t| t.address).collect();
    let fees = route
        .hops()
        .iter()
        .map(|hop| {
            hop.fee()
                .ok_or_else(|| QuoteError::Encoding("V2 hop in a V3 path".into()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    encode_packed_path(&tokens, &fees)
}

/// Path plus per-hop protocol flags for the mixed-route quoter
pub fn encode_mixed_path(route: &CandidateRoute) -> Result<(Bytes, Vec<U256>), QuoteError> {
    let tokens: Vec<Address> = route.path().iter().map(|t| t.address).collect();
    let hops = route.hops();

    let fees: Vec<u32> = hops
        .iter()
        .map(|hop| hop.fee().unwrap_or(V2_FEE_PLACEHOLDER))
        .collect();
    let flags: Vec<U256> = hops
        .iter()
        .map(|hop| match hop {
            PoolRef::V3 { .. } => U256::from(FLAG_V3),
            PoolRef::V2 { .. } => U256::from(FLAG_V2),
        })
        .collect();

    Ok((encode_packed_path(&tokens, &fees)?, flags))
}
