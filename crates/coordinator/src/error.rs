use crate::TxPhase;
use alloy_primitives::{Address, U256};
use vault_primitives::{NetworkId, TxHandle};
use vault_units::UnitsError;

/// Why an operation ended without reaching the chain, or failed on it.
///
/// This is what a network's `last_error` holds.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("amount {amount} must exceed the vault fee of {fee}")]
    AmountMustExceedFee { amount: U256, fee: U256 },
    #[error("invalid recipient {0}")]
    InvalidRecipient(Address),
    #[error("insufficient balance: {available} available, {required} required")]
    InsufficientBalance { required: U256, available: U256 },
    #[error("insufficient allowance: {allowance} approved, {required} required")]
    InsufficientAllowance { required: U256, allowance: U256 },
    #[error("invalid batch: {0}")]
    InvalidBatch(String),
    /// A balance, allowance or fee read failed before anything was submitted.
    #[error("pre-flight read failed: {0}")]
    PreflightRead(#[from] CallError),
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    #[error(transparent)]
    Amount(#[from] UnitsError),
}

impl TxError {
    /// Classifies a failure to submit or to see a submitted call through.
    pub fn submission(err: CallError) -> Self {
        match err {
            CallError::Rejected(reason) => Self::SubmissionRejected(reason),
            err => Self::SubmissionFailed(err.to_string()),
        }
    }
}

/// A transition the coordinator refused to apply.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("an operation is already in flight on {network} ({phase})")]
    Busy { network: NetworkId, phase: TxPhase },
    #[error("{network} is not the active network")]
    InactiveNetwork { network: NetworkId },
    #[error("event for {handle} does not belong to the pending operation on {network}")]
    WrongNetworkEvent { network: NetworkId, handle: TxHandle },
    #[error("cannot {action} on {network} while {phase}")]
    InvalidTransition { network: NetworkId, phase: TxPhase, action: &'static str },
}

impl CoordinatorError {
    /// Whether the event was stale and dropped rather than rejected.
    pub fn is_dropped_event(&self) -> bool {
        matches!(self, Self::InactiveNetwork { .. } | Self::WrongNetworkEvent { .. })
    }
}

/// Failure reported by a collaborator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// The user declined to sign.
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("failed to decode {signature} result: {reason}")]
    Decode { signature: &'static str, reason: String },
}

/// Error returned by [`VaultSession`](crate::VaultSession) operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Amount conversion failed before anything was started.
    #[error(transparent)]
    Amount(#[from] UnitsError),
    /// The operation ran and failed; the same error is stored in the network's state.
    #[error(transparent)]
    Tx(#[from] TxError),
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error("no vault contract configured for {0}")]
    MissingVault(NetworkId),
}
