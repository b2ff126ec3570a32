//! Phase 1: The Cartographer (Pool Discovery)
//!
//! Responsible for:
//! - Finding liquid V2 pairs and V3 pools for a token pair
//! - Expanding them into direct and bridged candidate routes
//! - Falling back to a static pool graph when the chain is unreachable

mod discovery;
mod known_pools;
mod route;

pub use discovery::{PoolDiscovery, V3_FEE_TIERS};
pub use known_pools::KnownPools;
pub use route::{CandidateRoute, PoolRef, Protocol, RouteProtocol};
