//! # Bootstrap Configuration
//!
//! The per-deployment parameters fetched from the server at session
//! start. Everything here is public knowledge; the config exists so the
//! same binary works against any deployment.
//!
//! The global salt is the load-bearing field: every hash-chain and
//! key-derivation step mixes it in, so two deployments with different
//! salts produce disjoint commitment and vault-key spaces.

use serde::Deserialize;

use crate::codec;
use crate::crypto::hash::GlobalSalt;
use crate::error::{Error, Result};

/// Deployment parameters for one session
#[derive(Clone, Debug, Deserialize)]
pub struct BootstrapConfig {
    /// Process-wide domain-separation salt, 32 bytes
    pub global_salt: GlobalSalt,

    /// Minimum withdrawal amount in the token's smallest unit
    pub min_amount: u128,

    /// The stablecoin token contract address
    pub token_address: String,
}

impl BootstrapConfig {
    /// Parse a config from the server's JSON bootstrap payload
    ///
    /// ## Errors
    ///
    /// Returns [`Error::ConfigInvalid`] on malformed JSON or a config
    /// that fails [`BootstrapConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::ConfigInvalid(format!("Malformed bootstrap payload: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config shape
    ///
    /// ## Errors
    ///
    /// Returns [`Error::ConfigInvalid`] for a zero minimum amount or a
    /// malformed token address.
    pub fn validate(&self) -> Result<()> {
        if self.min_amount == 0 {
            return Err(Error::ConfigInvalid("min_amount must be positive".into()));
        }
        if !codec::is_address(&self.token_address) {
            return Err(Error::ConfigInvalid(format!(
                "Invalid token address: {}",
                self.token_address
            )));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SALT_HEX: &str = "0x0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b";
    const TOKEN: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_parse_valid_config() {
        let json = format!(
            r#"{{"global_salt": "{}", "min_amount": 100, "token_address": "{}"}}"#,
            SALT_HEX, TOKEN
        );
        let config = BootstrapConfig::from_json(&json).unwrap();
        assert_eq!(config.global_salt.to_hex(), SALT_HEX);
        assert_eq!(config.min_amount, 100);
        assert_eq!(config.token_address, TOKEN);
    }

    #[test]
    fn test_reject_zero_min_amount() {
        let json = format!(
            r#"{{"global_salt": "{}", "min_amount": 0, "token_address": "{}"}}"#,
            SALT_HEX, TOKEN
        );
        assert!(matches!(
            BootstrapConfig::from_json(&json),
            Err(Error::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_reject_bad_token_address() {
        let json = format!(
            r#"{{"global_salt": "{}", "min_amount": 100, "token_address": "0x1234"}}"#,
            SALT_HEX
        );
        assert!(matches!(
            BootstrapConfig::from_json(&json),
            Err(Error::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_reject_bad_salt() {
        let json = format!(
            r#"{{"global_salt": "0xabcd", "min_amount": 100, "token_address": "{}"}}"#,
            TOKEN
        );
        assert!(matches!(
            BootstrapConfig::from_json(&json),
            Err(Error::ConfigInvalid(_))
        ));
    }
}
