//! Candidate Routes
//!
//! A route is one of five shapes. Each variant carries exactly the pool data
//! it needs, so a V2 route never has a fee and only `Mixed` keeps per-hop
//! protocol information.

use alloy_primitives::Address;
use serde::Serialize;

use crate::error::RouterError;
use crate::tokens::Token;

/// Pool protocol of a single hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Protocol {
    /// Constant-product pair
    V2,
    /// Concentrated-liquidity pool
    V3,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::V2 => write!(f, "V2"),
            Protocol::V3 => write!(f, "V3"),
        }
    }
}

/// Protocol of a whole route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RouteProtocol {
    V2,
    V3,
    Mixed,
}

impl std::fmt::Display for RouteProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteProtocol::V2 => write!(f, "V2"),
            RouteProtocol::V3 => write!(f, "V3"),
            RouteProtocol::Mixed => write!(f, "MIXED"),
        }
    }
}

/// A pool used by one hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "protocol")]
pub enum PoolRef {
    V2 { pair: Address },
    V3 { pool: Address, fee: u32 },
}

impl PoolRef {
    pub fn protocol(&self) -> Protocol {
        match self {
            PoolRef::V2 { .. } => Protocol::V2,
            PoolRef::V3 { .. } => Protocol::V3,
        }
    }

    pub fn address(&self) -> Address {
        match self {
            PoolRef::V2 { pair } => *pair,
            PoolRef::V3 { pool, .. } => *pool,
        }
    }

    /// Fee tier in hundredths of a bip; V2 pairs have none
    pub fn fee(&self) -> Option<u32> {
        match self {
            PoolRef::V2 { .. } => None,
            PoolRef::V3 { fee, .. } => Some(*fee),
        }
    }
}

/// A discovered path from input to output token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum CandidateRoute {
    V2Direct {
        path: [Token; 2],
        pair: Address,
    },
    V2MultiHop {
        path: Vec<Token>,
        pairs: Vec<Address>,
    },
    V3Direct {
        path: [Token; 2],
        pool: Address,
        fee: u32,
    },
    V3MultiHop {
        path: Vec<Token>,
        pools: Vec<Address>,
        fees: Vec<u32>,
    },
    Mixed {
        path: Vec<Token>,
        hops: Vec<PoolRef>,
    },
}

impl CandidateRoute {
    /// 1-hop route through `pool`
    pub fn direct(token_in: Token, token_out: Token, pool: PoolRef) -> Self {
        match pool {
            PoolRef::V2 { pair } => CandidateRoute::V2Direct {
                path: [token_in, token_out],
                pair,
            },
            PoolRef::V3 { pool, fee } => CandidateRoute::V3Direct {
                path: [token_in, token_out],
                pool,
                fee,
            },
        }
    }

    /// Build a route from a token path and the pool used by each hop.
    ///
    /// The variant is picked from the hop protocols: a single protocol gives a
    /// plain V2/V3 route, anything else is `Mixed`.
    pub fn from_hops(path: Vec<Token>, hops: Vec<PoolRef>) -> Result<Self, RouterError> {
        if hops.is_empty() || path.len() != hops.len() + 1 {
            return Err(RouterError::InvalidRoute(format!(
                "{} tokens for {} hops",
                path.len(),
                hops.len()
            )));
        }
        if path.windows(2).any(|w| w[0] == w[1]) {
            return Err(RouterError::InvalidRoute("hop swaps a token for itself".into()));
        }

        if hops.len() == 1 {
            let mut tokens = path.into_iter();
            let (token_in, token_out) = match (tokens.next(), tokens.next()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(RouterError::InvalidRoute("empty path".into())),
            };
            return Ok(Self::direct(token_in, token_out, hops[0]));
        }

        let all_v2 = hops.iter().all(|h| h.protocol() == Protocol::V2);
        let all_v3 = hops.iter().all(|h| h.protocol() == Protocol::V3);

        let route = if all_v2 {
            CandidateRoute::V2MultiHop {
                path,
                pairs: hops.iter().map(PoolRef::address).collect(),
            }
        } else if all_v3 {
            CandidateRoute::V3MultiHop {
                path,
                pools: hops.iter().map(PoolRef::address).collect(),
                fees: hops.iter().filter_map(PoolRef::fee).collect(),
            }
        } else {
            CandidateRoute::Mixed { path, hops }
        };
        Ok(route)
    }

    pub fn path(&self) -> &[Token] {
        match self {
            CandidateRoute::V2Direct { path, .. } | CandidateRoute::V3Direct { path, .. } => &path[..],
            CandidateRoute::V2MultiHop { path, .. }
            | CandidateRoute::V3MultiHop { path, .. }
            | CandidateRoute::Mixed { path, .. } => &path[..],
        }
    }

    /// Pool used by each hop, in path order
    pub fn hops(&self) -> Vec<PoolRef> {
        match self {
            CandidateRoute::V2Direct { pair, .. } => vec![PoolRef::V2 { pair: *pair }],
            CandidateRoute::V3Direct { pool, fee, .. } => vec![PoolRef::V3 {
                pool: *pool,
                fee: *fee,
            }],
            CandidateRoute::V2MultiHop { pairs, .. } => {
                pairs.iter().map(|&pair| PoolRef::V2 { pair }).collect()
            }
            CandidateRoute::V3MultiHop { pools, fees, .. } => pools
                .iter()
                .zip(fees)
                .map(|(&pool, &fee)| PoolRef::V3 { pool, fee })
                .collect(),
            CandidateRoute::Mixed { hops, .. } => hops.clone(),
        }
    }

    pub fn hop_count(&self) -> usize {
        self.path().len().saturating_sub(1)
    }

    pub fn protocol(&self) -> RouteProtocol {
        match self {
            CandidateRoute::V2Direct { .. } | CandidateRoute::V2MultiHop { .. } => RouteProtocol::V2,
            CandidateRoute::V3Direct { .. } | CandidateRoute::V3MultiHop { .. } => RouteProtocol::V3,
            CandidateRoute::Mixed { .. } => RouteProtocol::Mixed,
        }
    }

    /// Variant fields are public, so a hand-built route can disagree with
    /// itself. Requires at least one hop, one more token than hops and one
    /// fee per V3 pool.
    pub fn check_shape(&self) -> Result<(), RouterError> {
        if let CandidateRoute::V3MultiHop { pools, fees, .. } = self {
            if pools.len() != fees.len() {
                return Err(RouterError::InvalidRoute(format!(
                    "{} pools with {} fees",
                    pools.len(),
                    fees.len()
                )));
            }
        }
        let (tokens, hops) = (self.path().len(), self.hops().len());
        if hops == 0 || tokens != hops + 1 {
            return Err(RouterError::InvalidRoute(format!(
                "{} tokens for {} hops",
                tokens, hops
            )));
        }
        Ok(())
    }

    pub fn token_in(&self) -> Option<&Token> {
        self.path().first()
    }

    pub fn token_out(&self) -> Option<&Token> {
        self.path().last()
    }

    /// Short form for logs, e.g. `USDC -[V3 0.05%]-> WBNB -[V2]-> CAKE`
    pub fn describe(&self) -> String {
        let mut out = self
            .token_in()
            .map(|t| t.symbol.clone())
            .unwrap_or_default();
        for (hop, token) in self.hops().iter().zip(self.path().iter().skip(1)) {
            match hop {
                PoolRef::V2 { .. } => out.push_str(" -[V2]-> "),
                PoolRef::V3 { fee, .. } => {
                    out.push_str(&format!(" -[V3 {}%]-> ", *fee as f64 / 10_000.0))
                }
            }
            out.push_str(&token.symbol);
        }
        out
    }
}

impl std::fmt::Display for CandidateRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.describe(), self.protocol())
    }
}
