//! Wallet signer loading
//!
//! ⚠️  SECURITY WARNING:
//! - Never log or expose private keys
//! - Use environment variables, not hardcoded keys

use alloy_signer::Signer as _;
use alloy_signer_local::PrivateKeySigner;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::ChainError;

/// Parse a hex private key (with or without `0x`)
pub fn signer_from_key(key: &str) -> Result<PrivateKeySigner, ChainError> {
    let key = key.trim().trim_start_matches("0x");
    PrivateKeySigner::from_str(key)
        .map_err(|e| ChainError::Transport(format!("invalid private key: {}", e)))
}

/// Load a signer from an environment variable. Missing or malformed keys
/// leave the client read-only.
pub fn signer_from_env(var: &str) -> Option<PrivateKeySigner> {
    match std::env::var(var) {
        Ok(key) => match signer_from_key(&key) {
            Ok(signer) => {
                info!("✓ Signer loaded: {:?}", signer.address());
                Some(signer)
            }
            Err(e) => {
                warn!("Failed to parse {}: {}", var, e);
                None
            }
        },
        Err(_) => {
            debug!("{} not set (read-only mode)", var);
            None
        }
    }
}
