//! Static Known-Good Pools
//!
//! Used when the chain client is unreachable: routes are enumerated from a
//! small hand-maintained pool graph instead of the factories. Pools carry no
//! liquidity data here, so quoting still decides whether a route is usable.

use alloy_primitives::{address, Address};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::debug;

use super::route::{CandidateRoute, PoolRef, Protocol};
use crate::contracts::BSC_CHAIN_ID;
use crate::tokens::{Token, TokenRegistry};

/// Undirected token graph, one edge per known pool
#[derive(Debug, Clone, Default)]
pub struct KnownPools {
    graph: UnGraph<Token, PoolRef>,
    nodes: HashMap<Token, NodeIndex>,
}

impl KnownPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// PancakeSwap pools on BSC with deep, long-lived liquidity
    pub fn with_defaults(tokens: &TokenRegistry) -> Self {
        let mut known = Self::new();

        let pools: [(&str, &str, PoolRef); 8] = [
            ("USDT", "WBNB", PoolRef::V3 { pool: address!("36696169C63e42cd08ce11f5deeBbCeBae652050"), fee: 500 }),
            ("USDT", "USDC", PoolRef::V3 { pool: address!("92b7807bF19b7DDdf89b706143896d05228f3121"), fee: 100 }),
            ("WBNB", "BUSD", PoolRef::V2 { pair: address!("58F876857a02D6762E0101bb5C46A8c1ED44Dc16") }),
            ("USDT", "WBNB", PoolRef::V2 { pair: address!("16b9a82891338f9bA80E2D6970FddA79D1eb0daE") }),
            ("CAKE", "WBNB", PoolRef::V2 { pair: address!("0eD7e52944161450477ee417DE9Cd3a859b14fD0") }),
            ("ETH", "WBNB", PoolRef::V2 { pair: address!("74E4716E431f45807DCF19f284c7aA99F18a4fbc") }),
            ("BTCB", "WBNB", PoolRef::V2 { pair: address!("61EB789d75A95CAa3fF50ed7E47b96c132fEc082") }),
            ("USDT", "BUSD", PoolRef::V2 { pair: address!("7EFaEf62fDdCCa950418312c6C91Aef321375A00") }),
        ];

        for (a, b, pool) in pools {
            match (
                tokens.find_by_symbol(BSC_CHAIN_ID, a),
                tokens.find_by_symbol(BSC_CHAIN_ID, b),
            ) {
                (Ok(a), Ok(b)) => known.add_pool(a.clone(), b.clone(), pool),
                _ => debug!("Skipping known pool {}/{}: token not registered", a, b),
            }
        }

        known
    }

    pub fn add_pool(&mut self, a: Token, b: Token, pool: PoolRef) {
        let na = self.node(a);
        let nb = self.node(b);
        self.graph.add_edge(na, nb, pool);
    }

    fn node(&mut self, token: Token) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&token) {
            return idx;
        }
        let idx = self.graph.add_node(token.clone());
        self.nodes.insert(token, idx);
        idx
    }

    pub fn pool_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Pools joining `a` and `b`: V3 by ascending fee, then V2
    pub fn pools_between(&self, a: &Token, b: &Token) -> Vec<PoolRef> {
        let (Some(&na), Some(&nb)) = (self.nodes.get(a), self.nodes.get(b)) else {
            return Vec::new();
        };
        let mut pools: Vec<PoolRef> = self
            .graph
            .edges_connecting(na, nb)
            .map(|edge| *edge.weight())
            .collect();
        pools.sort_by_key(|p| {
            let order = match p.protocol() {
                Protocol::V3 => 0,
                Protocol::V2 => 1,
            };
            (order, p.fee().unwrap_or(0), p.address())
        });
        pools
    }

    /// Direct and bridged routes in the same order live discovery emits them
    pub fn routes(&self, input: &Token, output: &Token, bridges: &[Token]) -> Vec<CandidateRoute> {
        let mut routes: Vec<CandidateRoute> = self
            .pools_between(input, output)
            .into_iter()
            .map(|pool| CandidateRoute::direct(input.clone(), output.clone(), pool))
            .collect();

        for bridge in distinct_bridges(input, output, bridges) {
            let first = self.pools_between(input, bridge);
            let second = self.pools_between(bridge, output);
            for a in &first {
                for b in &second {
                    let path = vec![input.clone(), bridge.clone(), output.clone()];
                    if let Ok(route) = CandidateRoute::from_hops(path, vec![*a, *b]) {
                        routes.push(route);
                    }
                }
            }
        }

        routes
    }
}

/// Bridges other than the endpoints, each token once, in first-seen order
pub(crate) fn distinct_bridges<'a>(
    input: &Token,
    output: &Token,
    bridges: &'a [Token],
) -> Vec<&'a Token> {
    let mut distinct: Vec<&Token> = Vec::with_capacity(bridges.len());
    for bridge in bridges {
        if bridge != input && bridge != output && !distinct.contains(&bridge) {
            distinct.push(bridge);
        }
    }
    distinct
}
