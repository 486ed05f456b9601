use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimals of every supported network's native coin.
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimals assumed when a token's metadata cannot be read.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// What an operation moves: the network's native coin or an ERC20 token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Native,
    Token(Address),
}

impl Asset {
    /// Returns the token address, or `None` for the native coin.
    pub const fn token(&self) -> Option<Address> {
        match self {
            Self::Native => None,
            Self::Token(address) => Some(*address),
        }
    }

    /// Address used by the vault contract to key balances: the zero address stands for the
    /// native coin.
    pub const fn vault_key(&self) -> Address {
        match self {
            Self::Native => Address::ZERO,
            Self::Token(address) => *address,
        }
    }

    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl From<Address> for Asset {
    fn from(address: Address) -> Self {
        if address.is_zero() { Self::Native } else { Self::Token(address) }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Token(address) => address.fmt(f),
        }
    }
}

/// ERC20 metadata with explicit decimals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self { address, symbol: symbol.into(), decimals }
    }
}
