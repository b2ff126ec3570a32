//! Route Selector
//!
//! Scores quoted routes by `output × reliability` and picks the best.
//! Reliability is a fixed weighting by route shape, not a learned metric.

use alloy_primitives::U256;
use serde::Serialize;

use crate::cartographer::CandidateRoute;
use crate::simulator::GasEstimate;
use crate::tokens::u256_to_f64;

/// Static reliability weight in `(0, 1]`
pub fn reliability_score(route: &CandidateRoute) -> f64 {
    let mut score = 1.0;

    score *= match route {
        CandidateRoute::V3Direct { .. } => 0.98,
        CandidateRoute::V3MultiHop { .. } => 0.95,
        _ => 0.90,
    };
    score *= if route.hop_count() == 1 { 0.98 } else { 0.95 };

    score
}

/// A successfully quoted route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteQuote {
    pub route: CandidateRoute,
    pub output_amount: U256,
    pub price_impact_pct: f64,
    pub gas_estimate: u64,
    /// False when `gas_estimate` is a hardcoded fallback
    pub gas_simulated: bool,
    pub reliability_score: f64,
    pub rank_score: f64,
}

impl RouteQuote {
    pub fn new(
        route: CandidateRoute,
        output_amount: U256,
        price_impact_pct: f64,
        gas: GasEstimate,
    ) -> Self {
        let reliability_score = reliability_score(&route);
        Self {
            rank_score: u256_to_f64(output_amount) * reliability_score,
            route,
            output_amount,
            price_impact_pct,
            gas_estimate: gas.gas,
            gas_simulated: gas.simulated,
            reliability_score,
        }
    }
}

/// Highest `rank_score`; the earliest quote wins ties
pub fn select_best(quotes: &[RouteQuote]) -> Option<&RouteQuote> {
    let mut best: Option<&RouteQuote> = None;
    for quote in quotes {
        match best {
            Some(current) if quote.rank_score <= current.rank_score => {}
            _ => best = Some(quote),
        }
    }
    best
}
