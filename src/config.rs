//! Runtime Configuration for the Smart Router
//!
//! Loaded from environment variables (with `.env` support) or a TOML file,
//! validated before the router is built.

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::brain::RouteQuote;
use crate::contracts::BSC_CHAIN_ID;
use crate::engine::CycleOutcome;
use crate::router::RouterSettings;
use crate::tokens::{format_amount, Token, TokenRegistry};

/// Bridge tokens beyond this make the 2-hop search explode combinatorially
pub const MAX_BRIDGE_TOKENS: usize = 4;

/// Highest slippage tolerance accepted from configuration, in percent
pub const MAX_SLIPPAGE_PCT: f64 = 50.0;

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Chain ID (56 = BNB Smart Chain, 1 = Ethereum)
    pub chain_id: u64,

    // ========== Routing Settings ==========
    /// Bridge token symbols or addresses; empty means the chain default
    pub bridge_tokens: Vec<String>,

    /// Wait after the last input change before quoting
    pub debounce_ms: u64,

    /// Period between refreshes of the current quote
    pub refresh_interval_secs: u64,

    // ========== Execution Settings ==========
    /// Default slippage tolerance, in percent
    pub default_slippage_pct: f64,

    /// Swap deadline, in minutes from submission
    pub deadline_minutes: u64,

    /// Signing key (KEEP SECRET!). Read-only mode when unset.
    #[serde(skip_serializing)]
    pub private_key: Option<String>,

    // ========== Logging ==========
    /// Append every committed cycle to a JSONL file
    pub quote_log: bool,

    /// Path of the quote log
    pub quote_log_path: String,
}

fn env_or<T: FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or(defaults.rpc_url),
            chain_id: env_or("CHAIN_ID", defaults.chain_id),
            bridge_tokens: env::var("BRIDGE_TOKENS")
                .map(|s| {
                    s.split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            debounce_ms: env_or("DEBOUNCE_MS", defaults.debounce_ms),
            refresh_interval_secs: env_or("REFRESH_INTERVAL_SECS", defaults.refresh_interval_secs),
            default_slippage_pct: env_or("DEFAULT_SLIPPAGE_PCT", defaults.default_slippage_pct),
            deadline_minutes: env_or("DEADLINE_MINUTES", defaults.deadline_minutes),
            private_key: env::var("PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty()),
            quote_log: env_or("QUOTE_LOG", defaults.quote_log),
            quote_log_path: env::var("QUOTE_LOG_PATH").unwrap_or(defaults.quote_log_path),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file. The private key is never written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration before building the router
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.trim().is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre!("Invalid RPC_URL - please set a reachable JSON-RPC endpoint"));
        }
        if self.bridge_tokens.len() > MAX_BRIDGE_TOKENS {
            return Err(eyre!(
                "BRIDGE_TOKENS lists {} tokens, at most {} are allowed",
                self.bridge_tokens.len(),
                MAX_BRIDGE_TOKENS
            ));
        }
        if !(0.0..=MAX_SLIPPAGE_PCT).contains(&self.default_slippage_pct) {
            return Err(eyre!(
                "DEFAULT_SLIPPAGE_PCT should be between 0-{}% (currently {:.2}%)",
                MAX_SLIPPAGE_PCT,
                self.default_slippage_pct
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(eyre!("REFRESH_INTERVAL_SECS must be greater than zero"));
        }
        if self.deadline_minutes == 0 {
            return Err(eyre!("DEADLINE_MINUTES must be greater than zero"));
        }
        Ok(())
    }

    /// Resolve the configured bridge tokens, or the chain default if none are set
    pub fn bridge_tokens(&self, tokens: &TokenRegistry) -> Result<Vec<Token>> {
        if self.bridge_tokens.is_empty() {
            return Ok(tokens.default_bridges(self.chain_id)?);
        }
        self.bridge_tokens
            .iter()
            .map(|t| Ok(tokens.resolve(self.chain_id, t)?.clone()))
            .collect()
    }

    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            debounce: Duration::from_millis(self.debounce_ms),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            quote_log: self.quote_log.then(|| PathBuf::from(&self.quote_log_path)),
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              SMART ROUTER - CONFIGURATION                  ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Chain ID:          {:^40} ║", self.chain_id);
        println!("║ RPC:               {:^40} ║", truncate(&self.rpc_url, 40));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ ROUTING                                                    ║");
        println!("║ • Bridge Tokens:   {:^40} ║",
            if self.bridge_tokens.is_empty() {
                "chain default".to_string()
            } else {
                self.bridge_tokens.join(",")
            }
        );
        println!("║ • Debounce:        {:>37} ms ║", self.debounce_ms);
        println!("║ • Refresh:         {:>38} s ║", self.refresh_interval_secs);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ EXECUTION                                                  ║");
        println!("║ • Slippage:        {:>38.2}% ║", self.default_slippage_pct);
        println!("║ • Deadline:        {:>36} min ║", self.deadline_minutes);
        println!("║ • Signer Key:      {:^40} ║",
            if self.private_key.is_some() { "✓ Configured" } else { "✗ Read-only" }
        );
        println!("║ • Quote Log:       {:^40} ║",
            if self.quote_log { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://bsc-dataseed.bnbchain.org".to_string(),
            chain_id: BSC_CHAIN_ID,
            bridge_tokens: vec![],
            debounce_ms: 3_000,
            refresh_interval_secs: 30,
            default_slippage_pct: 0.5,
            deadline_minutes: 20,
            private_key: None,
            quote_log: false,
            quote_log_path: "./logs/quotes.jsonl".to_string(),
        }
    }
}

// ============================================
// QUOTE LOGGER
// ============================================

/// One committed routing cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLog {
    pub timestamp: DateTime<Utc>,
    pub chain_id: u64,
    pub input_token: String,
    pub output_token: String,
    pub amount_in: String,
    pub route_count: usize,
    pub best_route: Option<String>,
    pub best_output: Option<String>,
    pub price_impact_pct: Option<f64>,
    pub gas_estimate: Option<u64>,
    pub elapsed_ms: u64,
}

impl QuoteLog {
    pub fn from_outcome(input: &Token, output: &Token, outcome: &CycleOutcome) -> Self {
        let best: Option<&RouteQuote> = outcome.best_route.as_ref();
        Self {
            timestamp: Utc::now(),
            chain_id: input.chain_id,
            input_token: input.symbol.clone(),
            output_token: output.symbol.clone(),
            amount_in: format_amount(outcome.amount_in, input.decimals),
            route_count: outcome.all_routes.len(),
            best_route: best.map(|q| q.route.describe()),
            best_output: best.map(|q| format_amount(q.output_amount, output.decimals)),
            price_impact_pct: best.map(|q| q.price_impact_pct),
            gas_estimate: best.map(|q| q.gas_estimate),
            elapsed_ms: outcome.elapsed.as_millis() as u64,
        }
    }

    /// Append this log to a file
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let json = serde_json::to_string(self)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

// ============================================
// TESTS
// ============================================
