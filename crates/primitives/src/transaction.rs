use alloy_primitives::TxHash;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Opaque handle of a submitted call, used to wait for its inclusion.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From, Into, Serialize, Deserialize,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct TxHandle(TxHash);

impl TxHandle {
    pub const fn new(hash: TxHash) -> Self {
        Self(hash)
    }

    /// Returns the underlying transaction hash.
    pub const fn hash(&self) -> TxHash {
        self.0
    }
}
