//! Smart Router
//!
//! Finds, quotes, scores and executes token swap routes across V2 pairs and
//! V3 pools, including mixed V2/V3 multi-hop paths.
//!
//! - `cartographer`: candidate route discovery
//! - `simulator`: on-chain quoting, price impact and gas
//! - `brain`: reliability scoring and route selection
//! - `executor`: calldata encoding and the swap state machine
//! - `router`: the debounced, self-refreshing facade

pub mod abi;
pub mod brain;
pub mod cartographer;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod executor;
pub mod router;
pub mod scheduler;
pub mod simulator;
pub mod tokens;

pub use engine::{CycleOutcome, RouteEngine, SwapIntent};
pub use error::{Result, RouterError};
pub use router::{RouterSettings, RouterSnapshot, SmartRouter};
