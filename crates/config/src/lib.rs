//! # vault-config
//!
//! Layered configuration for the vault wallet.
//!
//! Values are resolved in order, later sources winning:
//!
//! 1. compiled defaults ([`VaultConfig::default`])
//! 2. `vault.toml` in the project root, or the file named by `VAULT_CONFIG`
//! 3. `VAULT_`-prefixed environment variables, nested with `__`
//!    (`VAULT_NETWORKS__BSC__SETTLE_DELAY_MS=5000`)

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use alloy_primitives::Address;
use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use vault_primitives::{DEFAULT_TOKEN_DECIMALS, NetworkId, TokenInfo};
use vault_units::DisplayOptions;

pub use figment;

mod display;
pub use display::DisplayConfig;

pub mod error;
pub use error::{ExtractConfigError, SettingError, SettingOrigin};

mod network;
pub use network::{NetworkConfig, Networks};

/// Vault wallet configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Network selected at startup.
    pub active_network: NetworkId,
    /// Decimals assumed when a token's metadata cannot be read.
    pub default_decimals: u8,
    /// How balances are rendered.
    pub display: DisplayConfig,
    /// Per-network settings, `[networks.<name>]`.
    pub networks: Networks,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            active_network: NetworkId::Ethereum,
            default_decimals: DEFAULT_TOKEN_DECIMALS,
            display: DisplayConfig::default(),
            networks: Networks::default(),
        }
    }
}

impl VaultConfig {
    /// File name of the project config.
    pub const FILE_NAME: &'static str = "vault.toml";

    /// Environment variable pointing at an alternative config file.
    pub const PATH_ENV: &'static str = "VAULT_CONFIG";

    /// Prefix of environment overrides.
    pub const ENV_PREFIX: &'static str = "VAULT_";

    /// Loads the config from the current directory.
    ///
    /// See [`figment`](Self::figment) for the sources involved.
    pub fn load() -> Result<Self, ExtractConfigError> {
        Self::try_from(Self::figment())
    }

    /// Loads the config with `vault.toml` looked up in `root`.
    pub fn load_with_root(root: impl AsRef<Path>) -> Result<Self, ExtractConfigError> {
        Self::try_from(Self::figment_with_root(root))
    }

    /// Attempts to extract a `VaultConfig` from `provider`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vault_config::{
    ///     VaultConfig,
    ///     figment::providers::{Format, Toml},
    /// };
    ///
    /// // allow values from `other.toml` to supersede the defaults
    /// let figment = VaultConfig::figment().merge(Toml::file("other.toml"));
    ///
    /// let config = VaultConfig::try_from(figment);
    /// ```
    pub fn try_from<T: Provider>(provider: T) -> Result<Self, ExtractConfigError> {
        let figment = Figment::from(provider);
        let config = figment.extract::<Self>().map_err(ExtractConfigError::new)?;
        trace!(active_network = %config.active_network, "loaded vault config");
        Ok(config)
    }

    /// Returns the default figment rooted at the current directory.
    pub fn figment() -> Figment {
        Self::figment_with_root(".")
    }

    /// Returns the default figment with `vault.toml` looked up in `root`.
    pub fn figment_with_root(root: impl AsRef<Path>) -> Figment {
        let file = Env::var(Self::PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| root.as_ref().join(Self::FILE_NAME));
        trace!(file = %file.display(), "resolving vault config");

        Figment::from(Self::default())
            .merge(Toml::file(file))
            .merge(Env::prefixed(Self::ENV_PREFIX).ignore(&["CONFIG"]).split("__"))
    }

    /// Returns the settings of `network`.
    pub fn network(&self, network: NetworkId) -> &NetworkConfig {
        self.networks.get(network)
    }

    /// Wait between confirmation and the balance refresh on `network`.
    pub fn settle_delay(&self, network: NetworkId) -> Duration {
        self.network(network).settle_delay().unwrap_or_else(|| network.default_settle_delay())
    }

    /// Settle delays of every network that overrides the built-in value.
    pub fn settle_delay_overrides(&self) -> impl Iterator<Item = (NetworkId, Duration)> + '_ {
        self.networks
            .iter()
            .filter_map(|(network, config)| config.settle_delay().map(|delay| (network, delay)))
    }

    /// Address of the vault contract on `network`, if configured.
    pub fn vault_address(&self, network: NetworkId) -> Option<Address> {
        self.network(network).vault
    }

    /// Returns the listed token at `address` on `network`.
    pub fn token(&self, network: NetworkId, address: Address) -> Option<&TokenInfo> {
        self.network(network).token(address)
    }

    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions::from(&self.display)
    }
}

impl Provider for VaultConfig {
    fn metadata(&self) -> Metadata {
        Metadata::named("Vault Config")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
