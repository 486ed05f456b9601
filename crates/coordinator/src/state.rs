use crate::TxError;
use alloy_primitives::{Address, U256};
use std::fmt;
use vault_primitives::TxHandle;

/// Lifecycle phase of a network's operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TxPhase {
    /// Nothing outstanding.
    #[default]
    Idle,
    /// Pre-flight balance and allowance checks are running; nothing was sent yet.
    Simulating,
    /// Sent, a handle was obtained.
    Submitted,
    /// Included, waiting for finality.
    Confirming,
    /// Confirmed, waiting out the settle delay before dependent reads are trusted.
    Settling,
}

impl TxPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Simulating => "simulating",
            Self::Submitted => "submitted",
            Self::Confirming => "confirming",
            Self::Settling => "settling",
        }
    }

    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deposit waiting on its allowance approval.
///
/// Consumed exactly once, when the approval handle confirms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingApproval {
    pub token: Address,
    /// Deposit amount, which is also the approved amount.
    pub amount: U256,
    pub symbol: String,
    pub approval_handle: TxHandle,
}

/// Snapshot of one network's transaction state.
///
/// Only the coordinator changes these values; callers receive copies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionState {
    pub(crate) phase: TxPhase,
    pub(crate) pending_handle: Option<TxHandle>,
    pub(crate) has_refreshed_since_confirmation: bool,
    pub(crate) last_error: Option<TxError>,
    pub(crate) pending_approval: Option<PendingApproval>,
    pub(crate) epoch: u64,
}

impl TransactionState {
    pub fn phase(&self) -> TxPhase {
        self.phase
    }

    /// Handle of the in-flight submission.
    pub fn pending_handle(&self) -> Option<TxHandle> {
        self.pending_handle
    }

    /// Whether the refresh signal fired after the last confirmation.
    pub fn has_refreshed_since_confirmation(&self) -> bool {
        self.has_refreshed_since_confirmation
    }

    pub fn last_error(&self) -> Option<&TxError> {
        self.last_error.as_ref()
    }

    pub fn pending_approval(&self) -> Option<&PendingApproval> {
        self.pending_approval.as_ref()
    }

    /// Bumped whenever a new operation starts or the state is reset.
    ///
    /// Work started under an older epoch must not drive this state.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns to Idle, dropping everything but the epoch counter.
    pub(crate) fn reset(&mut self) {
        *self = Self { epoch: self.epoch + 1, ..Default::default() };
    }
}
