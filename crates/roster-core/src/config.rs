//! network configuration and chain identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// environment variable carrying the expected chain id for deployments
pub const CHAIN_ID_ENV: &str = "ROSTER_CHAIN_ID";

/// chain identifier as reported by the wallet
///
/// wallets deliver EIP-695 hex strings ("0xaa36a7"), configuration tends to
/// use decimal; `parse` accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let trimmed = text.trim();
        let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed
            .map(Self)
            .map_err(|_| ConfigError::InvalidChainId(text.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// known network configurations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// network name, shown by shells in the network status line
    pub name: String,
    /// chain id the session accepts
    pub chain_id: ChainId,
    /// currency symbol
    pub symbol: String,
}

impl NetworkConfig {
    /// ethereum mainnet
    pub fn mainnet() -> Self {
        Self {
            name: "ethereum".into(),
            chain_id: ChainId(1),
            symbol: "ETH".into(),
        }
    }

    /// sepolia testnet
    pub fn sepolia() -> Self {
        Self {
            name: "sepolia".into(),
            chain_id: ChainId(11_155_111),
            symbol: "ETH".into(),
        }
    }

    /// local development node (anvil/hardhat default)
    pub fn dev() -> Self {
        Self {
            name: "devnet".into(),
            chain_id: ChainId(31_337),
            symbol: "ETH".into(),
        }
    }
}

/// session configuration
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// network the session expects the wallet to be on
    pub network: NetworkConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::sepolia(),
        }
    }
}

impl SessionConfig {
    pub fn new(network: NetworkConfig) -> Self {
        Self { network }
    }

    /// read the expected chain id from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(CHAIN_ID_ENV).map_err(|_| ConfigError::MissingEnv(CHAIN_ID_ENV))?;
        let chain_id = ChainId::parse(&raw)?;
        Ok(Self {
            network: NetworkConfig {
                name: format!("chain-{}", chain_id),
                chain_id,
                symbol: "ETH".into(),
            },
        })
    }

    pub fn expected_chain_id(&self) -> ChainId {
        self.network.chain_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal() {
        assert_eq!(ChainId::parse("1").unwrap(), ChainId(1));
        assert_eq!(ChainId::parse(" 31337 ").unwrap(), ChainId(31_337));
    }

    #[test]
    fn parses_eip695_hex() {
        assert_eq!(ChainId::parse("0x1").unwrap(), ChainId(1));
        assert_eq!(ChainId::parse("0xaa36a7").unwrap(), ChainId(11_155_111));
        assert_eq!(ChainId::parse("0XAA36A7").unwrap(), ChainId(11_155_111));
    }

    #[test]
    fn rejects_garbage() {
        assert!(ChainId::parse("").is_err());
        assert!(ChainId::parse("0x").is_err());
        assert!(ChainId::parse("mainnet").is_err());
        assert!(ChainId::parse("-4").is_err());
    }

    #[test]
    fn presets_carry_expected_ids() {
        assert_eq!(NetworkConfig::mainnet().chain_id, ChainId(1));
        assert_eq!(NetworkConfig::sepolia().chain_id, ChainId(11_155_111));
        assert_eq!(NetworkConfig::dev().chain_id, ChainId(31_337));
    }

    #[test]
    fn reads_chain_id_from_env() {
        // single test owns the variable so parallel test runs don't race on it
        std::env::remove_var(CHAIN_ID_ENV);
        assert_eq!(
            SessionConfig::from_env().unwrap_err(),
            ConfigError::MissingEnv(CHAIN_ID_ENV)
        );

        std::env::set_var(CHAIN_ID_ENV, "0xaa36a7");
        let config = SessionConfig::from_env().unwrap();
        assert_eq!(config.expected_chain_id(), ChainId(11_155_111));

        std::env::set_var(CHAIN_ID_ENV, "not-a-chain");
        assert!(SessionConfig::from_env().is_err());
        std::env::remove_var(CHAIN_ID_ENV);
    }
}
