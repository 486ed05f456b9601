use crate::UnitsError;
use alloy_primitives::U256;
use num_bigint::BigUint;
use num_traits::Zero;
use std::{fmt, str::FromStr};

/// An amount in a token's smallest indivisible unit ("wei" for 18-decimal tokens).
///
/// Backed by an arbitrary-precision integer so that any decimals value up to
/// [`MAX_DECIMALS`](crate::MAX_DECIMALS) can be scaled without overflow. On-chain reads come in
/// as [`U256`] and convert losslessly; the way back is checked.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaseUnits(BigUint);

impl BaseUnits {
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns the underlying integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn into_biguint(self) -> BigUint {
        self.0
    }

    /// Converts into a 256-bit word for contract calls.
    pub fn to_u256(&self) -> Result<U256, UnitsError> {
        U256::try_from_be_slice(&self.0.to_bytes_be())
            .ok_or_else(|| UnitsError::Overflow(self.0.to_string()))
    }

    /// Subtracts `other`, returning `None` when it is larger than `self`.
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        (self.0 >= other.0).then(|| Self(&self.0 - &other.0))
    }
}

impl fmt::Display for BaseUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BaseUnits {
    type Err = UnitsError;

    /// Parses a plain decimal integer, e.g. a balance returned by an indexer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UnitsError::invalid(s, "base units must be a non-negative integer"));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| UnitsError::invalid(s, "base units must be a non-negative integer"))
    }
}

impl From<BigUint> for BaseUnits {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<U256> for BaseUnits {
    fn from(value: U256) -> Self {
        Self(BigUint::from_bytes_be(&value.to_be_bytes::<32>()))
    }
}

impl From<u64> for BaseUnits {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for BaseUnits {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl TryFrom<&BaseUnits> for U256 {
    type Error = UnitsError;

    fn try_from(value: &BaseUnits) -> Result<Self, Self::Error> {
        value.to_u256()
    }
}
