//! Observability capability.
//!
//! The coordinator reports every state change through a [`TxObserver`] handed to it at
//! construction. Nothing is published through global state.

use crate::{CoordinatorError, PendingApproval, TxError, TxPhase};
use vault_primitives::{NetworkId, TxHandle};

/// Something the coordinator did or refused to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxEvent {
    PhaseChanged { network: NetworkId, from: TxPhase, to: TxPhase, handle: Option<TxHandle> },
    Failed { network: NetworkId, error: TxError },
    /// The approval confirmed; the linked deposit is about to fire.
    ApprovalConfirmed { network: NetworkId, approval: PendingApproval },
    /// Dependent data (balances) may be reloaded now.
    RefreshRequested { network: NetworkId },
    NetworkSwitched { from: NetworkId, to: NetworkId },
    /// A stale event was ignored.
    Dropped { network: NetworkId, reason: CoordinatorError },
}

/// Receives coordinator events.
pub trait TxObserver: Send + Sync {
    fn on_event(&self, event: &TxEvent);
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl TxObserver for TracingObserver {
    fn on_event(&self, event: &TxEvent) {
        match event {
            TxEvent::PhaseChanged { network, from, to, handle } => {
                debug!(%network, %from, %to, ?handle, "transaction phase changed");
            }
            TxEvent::Failed { network, error } => {
                warn!(%network, %error, "operation failed");
            }
            TxEvent::ApprovalConfirmed { network, approval } => {
                info!(
                    %network,
                    token = %approval.token,
                    symbol = %approval.symbol,
                    amount = %approval.amount,
                    "approval confirmed, firing deposit"
                );
            }
            TxEvent::RefreshRequested { network } => {
                info!(%network, "refreshing balances");
            }
            TxEvent::NetworkSwitched { from, to } => {
                info!(%from, %to, "switched network");
            }
            TxEvent::Dropped { network, reason } => {
                debug!(%network, %reason, "dropped stale event");
            }
        }
    }
}
