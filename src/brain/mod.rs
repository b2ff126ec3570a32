//! Phase 2: The Brain
//!
//! Responsible for:
//! - Weighting routes by a static reliability score
//! - Picking the best quoted route

mod selector;

pub use selector::{reliability_score, select_best, RouteQuote};
