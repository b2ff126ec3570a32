//! Phase 3: The Simulator
//!
//! Responsible for:
//! - Quoting every candidate route against live chain state
//! - Measuring price impact against pool mid prices
//! - Estimating gas for the exact call the executor would send

mod gas;
mod path;
mod price_impact;
mod quoter;

pub use gas::{
    fallback_gas, simulation_min_out, GasEstimate, GasEstimator, GAS_SIMULATION_FLOOR_BPS,
};
pub use path::{encode_mixed_path, encode_packed_path, encode_v3_path, V2_FEE_PLACEHOLDER};
pub use price_impact::{
    execution_price, impact_pct, PriceImpactCalculator, DEFAULT_PRICE_IMPACT_PCT,
};
pub use quoter::RouteQuoter;
