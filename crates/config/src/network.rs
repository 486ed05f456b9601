//! Per-network settings.

use alloy_primitives::{Address, address};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vault_primitives::{NetworkId, TokenInfo};

/// Settings of a single network.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address of the deployed vault contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault: Option<Address>,
    /// JSON-RPC endpoint handed to the contract caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    /// Overrides [`NetworkId::default_settle_delay`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,
    /// Tokens listed for this network, with their decimals.
    pub tokens: Vec<TokenInfo>,
}

impl NetworkConfig {
    fn with_tokens(tokens: Vec<TokenInfo>) -> Self {
        Self { tokens, ..Default::default() }
    }

    /// Returns the listed token at `address`.
    pub fn token(&self, address: Address) -> Option<&TokenInfo> {
        self.tokens.iter().find(|token| token.address == address)
    }

    /// Returns the configured settle delay, if overridden.
    pub fn settle_delay(&self) -> Option<Duration> {
        self.settle_delay_ms.map(Duration::from_millis)
    }
}

/// One [`NetworkConfig`] per supported network.
///
/// Kept as named fields so that the toml reads as `[networks.bsc]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Networks {
    pub ethereum: NetworkConfig,
    pub bsc: NetworkConfig,
    pub base: NetworkConfig,
}

impl Networks {
    pub fn get(&self, network: NetworkId) -> &NetworkConfig {
        match network {
            NetworkId::Ethereum => &self.ethereum,
            NetworkId::Bsc => &self.bsc,
            NetworkId::Base => &self.base,
        }
    }

    pub fn get_mut(&mut self, network: NetworkId) -> &mut NetworkConfig {
        match network {
            NetworkId::Ethereum => &mut self.ethereum,
            NetworkId::Bsc => &mut self.bsc,
            NetworkId::Base => &mut self.base,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NetworkId, &NetworkConfig)> {
        NetworkId::ALL.into_iter().map(|network| (network, self.get(network)))
    }
}

impl Default for Networks {
    fn default() -> Self {
        Self {
            ethereum: NetworkConfig::with_tokens(vec![
                TokenInfo::new(address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), "USDC", 6),
                TokenInfo::new(address!("0xdAC17F958D2ee523a2206206994597C13D831ec7"), "USDT", 6),
            ]),
            // Binance-peg stablecoins use 18 decimals.
            bsc: NetworkConfig::with_tokens(vec![
                TokenInfo::new(address!("0x55d398326f99059fF775485246999027B3197955"), "USDT", 18),
                TokenInfo::new(address!("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"), "USDC", 18),
            ]),
            base: NetworkConfig::with_tokens(vec![TokenInfo::new(
                address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
                "USDC",
                6,
            )]),
        }
    }
}
