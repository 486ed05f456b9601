use alloy_chains::NamedChain;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

/// The blockchain networks the vault is deployed on.
///
/// This is a closed set: all transaction state is partitioned by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Ethereum,
    Bsc,
    Base,
}

impl NetworkId {
    /// Every supported network, in a stable order.
    pub const ALL: [Self; 3] = [Self::Ethereum, Self::Bsc, Self::Base];

    /// Returns the EIP-155 chain id.
    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::Bsc => 56,
            Self::Base => 8453,
        }
    }

    /// Returns the lowercase name used in configuration files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Bsc => "bsc",
            Self::Base => "base",
        }
    }

    /// Returns the symbol of the network's native coin.
    pub fn native_symbol(self) -> &'static str {
        self.named_chain().native_currency_symbol().unwrap_or("ETH")
    }

    /// Returns the matching [`NamedChain`].
    pub const fn named_chain(self) -> NamedChain {
        match self {
            Self::Ethereum => NamedChain::Mainnet,
            Self::Bsc => NamedChain::BinanceSmartChain,
            Self::Base => NamedChain::Base,
        }
    }

    /// Built-in wait between confirmation and the balance refresh.
    ///
    /// Secondary read paths (indexers, load-balanced RPC nodes) lag behind the head of the
    /// chain; slower block times need a longer wait.
    pub const fn default_settle_delay(self) -> Duration {
        match self {
            Self::Ethereum => Duration::from_millis(12_000),
            Self::Bsc => Duration::from_millis(3_000),
            Self::Base => Duration::from_millis(2_000),
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a network name or chain id is not supported.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UnsupportedNetwork {
    #[error("unsupported network `{0}`, expected one of ethereum, bsc, base")]
    Name(String),
    #[error("unsupported chain id {0}")]
    ChainId(u64),
}

impl FromStr for NetworkId {
    type Err = UnsupportedNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" | "mainnet" | "eth" => Ok(Self::Ethereum),
            "bsc" | "bnb" | "binance" => Ok(Self::Bsc),
            "base" => Ok(Self::Base),
            _ => Err(UnsupportedNetwork::Name(s.to_string())),
        }
    }
}

impl TryFrom<u64> for NetworkId {
    type Error = UnsupportedNetwork;

    fn try_from(chain_id: u64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|network| network.chain_id() == chain_id)
            .ok_or(UnsupportedNetwork::ChainId(chain_id))
    }
}

impl TryFrom<NamedChain> for NetworkId {
    type Error = UnsupportedNetwork;

    fn try_from(chain: NamedChain) -> Result<Self, Self::Error> {
        Self::try_from(chain as u64)
    }
}

impl From<NetworkId> for NamedChain {
    fn from(network: NetworkId) -> Self {
        network.named_chain()
    }
}
