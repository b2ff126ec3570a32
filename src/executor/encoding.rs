//! Swap calldata for the smart router
//!
//! Three call shapes:
//! - V2: `swapExactTokensForTokens(amountIn, amountOutMin, path, to)`
//! - V3: `exactInput({path, recipient, amountIn, amountOutMinimum})`
//! - Mixed: one call per same-protocol segment, batched with `multicall(deadline, data)`

use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::SolCall;

use crate::abi::ISmartRouter;
use crate::cartographer::{CandidateRoute, PoolRef, Protocol};
use crate::error::RouterError;
use crate::simulator::encode_packed_path;
use crate::tokens::Token;

/// Recipient meaning "the router itself" for intermediate segments
pub const ADDRESS_THIS: Address = address!("0000000000000000000000000000000000000002");

/// `amountIn` meaning "the router's whole balance of the input token"
pub const CONTRACT_BALANCE: U256 = U256::ZERO;

const BPS_DENOMINATOR: u64 = 10_000;

/// `round(pct * 100)`, rejecting anything outside 0..=100%
pub fn slippage_bps(slippage_pct: f64) -> Result<u64, RouterError> {
    if !slippage_pct.is_finite() || !(0.0..=100.0).contains(&slippage_pct) {
        return Err(RouterError::InvalidSlippage(slippage_pct));
    }
    Ok((slippage_pct * 100.0).round() as u64)
}

/// `floor(output * (10000 - bps) / 10000)`
pub fn min_amount_out(output_amount: U256, slippage_bps: u64) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps);
    output_amount * U256::from(keep) / U256::from(BPS_DENOMINATOR)
}

/// A contiguous run of hops on one protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub protocol: Protocol,
    pub path: Vec<Token>,
    pub hops: Vec<PoolRef>,
}

/// Split a route wherever the hop protocol changes
pub fn split_segments(route: &CandidateRoute) -> Result<Vec<Segment>, RouterError> {
    route.check_shape()?;
    let path = route.path();
    let mut segments: Vec<Segment> = Vec::new();

    for (i, hop) in route.hops().into_iter().enumerate() {
        match segments.last_mut() {
            Some(segment) if segment.protocol == hop.protocol() => {
                segment.hops.push(hop);
                segment.path.push(path[i + 1].clone());
            }
            _ => segments.push(Segment {
                protocol: hop.protocol(),
                path: vec![path[i].clone(), path[i + 1].clone()],
                hops: vec![hop],
            }),
        }
    }

    Ok(segments)
}

/// Calldata for a single segment
fn encode_segment(
    segment: &Segment,
    amount_in: U256,
    min_out: U256,
    recipient: Address,
) -> Result<Bytes, RouterError> {
    let tokens: Vec<Address> = segment.path.iter().map(|t| t.address).collect();

    let calldata = match segment.protocol {
        Protocol::V2 => ISmartRouter::swapExactTokensForTokensCall {
            amountIn: amount_in,
            amountOutMin: min_out,
            path: tokens,
            to: recipient,
        }
        .abi_encode(),
        Protocol::V3 => {
            let fees: Vec<u32> = segment.hops.iter().filter_map(PoolRef::fee).collect();
            let path = encode_packed_path(&tokens, &fees)
                .map_err(|e| RouterError::InvalidRoute(e.to_string()))?;
            ISmartRouter::exactInputCall {
                params: ISmartRouter::ExactInputParams {
                    path,
                    recipient,
                    amountIn: amount_in,
                    amountOutMinimum: min_out,
                },
            }
            .abi_encode()
        }
    };

    Ok(calldata.into())
}

/// Calldata for swapping `amount_in` along `route` to `recipient`.
///
/// Single-segment routes (including a "mixed" route that collapses to one
/// protocol) are sent as the plain call. Multi-segment routes chain through
/// the router: earlier segments pay `ADDRESS_THIS` with no minimum, later
/// ones spend `CONTRACT_BALANCE`, and only the last carries `min_out`.
pub fn encode_swap(
    route: &CandidateRoute,
    amount_in: U256,
    min_out: U256,
    recipient: Address,
    deadline: u64,
) -> Result<Bytes, RouterError> {
    let segments = split_segments(route)?;

    match segments.as_slice() {
        [] => Err(RouterError::InvalidRoute("route has no hops".into())),
        [single] => encode_segment(single, amount_in, min_out, recipient),
        many => {
            let last = many.len() - 1;
            let data = many
                .iter()
                .enumerate()
                .map(|(i, segment)| {
                    let segment_in = if i == 0 { amount_in } else { CONTRACT_BALANCE };
                    let (segment_min, segment_to) = if i == last {
                        (min_out, recipient)
                    } else {
                        (U256::ZERO, ADDRESS_THIS)
                    };
                    encode_segment(segment, segment_in, segment_min, segment_to)
                })
                .collect::<Result<Vec<Bytes>, _>>()?;

            Ok(ISmartRouter::multicallCall {
                deadline: U256::from(deadline),
                data,
            }
            .abi_encode()
            .into())
        }
    }
}
