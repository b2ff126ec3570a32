//! Token definitions and the owned token registry
//!
//! Tokens are immutable and identified by `(chain_id, address)`. The registry
//! is constructed once and passed by reference instead of living in a global.

use alloy_primitives::utils::{format_units, parse_units, ParseUnits};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::contracts::{BSC_CHAIN_ID, ETHEREUM_CHAIN_ID};
use crate::error::{RegistryError, RouterError};

/// An ERC-20 token on a specific chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub chain_id: u64,
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(chain_id: u64, address: Address, symbol: &str, decimals: u8) -> Self {
        Self {
            chain_id,
            address,
            symbol: symbol.to_string(),
            decimals,
        }
    }
}

// Identity is (chain_id, address). Address equality is byte-wise, so two hex
// spellings that differ only in case are the same token.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

// ============================================
// REGISTRY
// ============================================

#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<u64, Vec<Token>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the base tokens of every supported chain
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        let bsc = [
            ("0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c", "WBNB", 18),
            ("0x55d398326f99059fF775485246999027B3197955", "USDT", 18),
            ("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d", "USDC", 18),
            ("0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56", "BUSD", 18),
            ("0x2170Ed0880ac9A755fd29B2688956BD959F933F8", "ETH", 18),
            ("0x7130d2A12B9BCbFAe4f2634d864A1Ee1Ce3Ead9c", "BTCB", 18),
            ("0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82", "CAKE", 18),
        ];
        let ethereum = [
            ("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "WETH", 18),
            ("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USDC", 6),
            ("0xdAC17F958D2ee523a2206206994597C13D831ec7", "USDT", 6),
            ("0x6B175474E89094C44Da98b954EedcdeCB5BE3830", "DAI", 18),
            ("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", "WBTC", 8),
            ("0x152649eA73beAb28c5b49B26eb48f7EAD6d4c898", "CAKE", 18),
        ];

        for (chain_id, list) in [(BSC_CHAIN_ID, &bsc[..]), (ETHEREUM_CHAIN_ID, &ethereum[..])] {
            for (addr, symbol, decimals) in list {
                if let Ok(address) = Address::from_str(addr) {
                    registry.register(Token::new(chain_id, address, symbol, *decimals));
                }
            }
        }

        registry
    }

    /// Add a token, replacing an existing entry with the same identity
    pub fn register(&mut self, token: Token) {
        let list = self.tokens.entry(token.chain_id).or_default();
        list.retain(|t| t != &token);
        list.push(token);
    }

    pub fn chain_tokens(&self, chain_id: u64) -> Result<&[Token], RegistryError> {
        self.tokens
            .get(&chain_id)
            .map(Vec::as_slice)
            .ok_or(RegistryError::UnknownChain(chain_id))
    }

    pub fn find(&self, chain_id: u64, address: &Address) -> Result<&Token, RegistryError> {
        self.chain_tokens(chain_id)?
            .iter()
            .find(|t| &t.address == address)
            .ok_or_else(|| RegistryError::TokenNotFound {
                chain_id,
                token: address.to_string(),
            })
    }

    /// Case-insensitive symbol lookup
    pub fn find_by_symbol(&self, chain_id: u64, symbol: &str) -> Result<&Token, RegistryError> {
        self.chain_tokens(chain_id)?
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| RegistryError::TokenNotFound {
                chain_id,
                token: symbol.to_string(),
            })
    }

    /// Resolve either a `0x` address or a symbol
    pub fn resolve(&self, chain_id: u64, symbol_or_address: &str) -> Result<&Token, RegistryError> {
        let needle = symbol_or_address.trim();
        if needle.starts_with("0x") {
            if let Ok(address) = Address::from_str(needle) {
                return self.find(chain_id, &address);
            }
        }
        self.find_by_symbol(chain_id, needle)
    }

    /// Default bridge tokens for 2-hop routes
    pub fn default_bridges(&self, chain_id: u64) -> Result<Vec<Token>, RegistryError> {
        let symbols: &[&str] = match chain_id {
            BSC_CHAIN_ID => &["WBNB", "USDT", "USDC", "ETH"],
            ETHEREUM_CHAIN_ID => &["WETH", "USDC", "USDT", "DAI"],
            _ => &[],
        };
        symbols
            .iter()
            .map(|s| self.find_by_symbol(chain_id, s).cloned())
            .collect()
    }
}

// ============================================
// AMOUNTS
// ============================================

/// Parse a user-entered decimal string into raw token units
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, RouterError> {
    let parsed = parse_units(amount.trim(), decimals)
        .map_err(|e| RouterError::InvalidAmount(format!("{amount:?}: {e}")))?;

    match parsed {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => Err(RouterError::InvalidAmount(format!(
            "{amount:?}: amount must not be negative"
        ))),
    }
}

/// Format raw token units as a decimal string
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

/// Lossy conversion used for prices and scores
pub fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}
