use crate::{
    CoordinatorError, PendingApproval, TracingObserver, TransactionState, TxError, TxEvent,
    TxObserver, TxPhase,
};
use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};
use vault_config::VaultConfig;
use vault_primitives::{NetworkId, TxHandle};

/// What a confirmation leads to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Confirmation {
    /// Wait `delay`, then call [`on_settled`](ChainTransactionCoordinator::on_settled).
    Settling { delay: Duration },
    /// The approval confirmed. The network is back in `Simulating` and the caller must fire the
    /// linked deposit.
    Approval(PendingApproval),
}

/// Tracks the lifecycle of the in-flight operation of every network.
///
/// Each [`NetworkId`] owns one [`TransactionState`], changed only through the transition
/// methods below. Events carrying a handle are applied only when the handle is the addressed
/// network's pending handle and that network is still active; anything else is dropped and
/// reported as [`TxEvent::Dropped`].
pub struct ChainTransactionCoordinator {
    active: NetworkId,
    states: BTreeMap<NetworkId, TransactionState>,
    settle_delays: BTreeMap<NetworkId, Duration>,
    observer: Arc<dyn TxObserver>,
}

impl fmt::Debug for ChainTransactionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainTransactionCoordinator")
            .field("active", &self.active)
            .field("states", &self.states)
            .field("settle_delays", &self.settle_delays)
            .finish_non_exhaustive()
    }
}

impl Default for ChainTransactionCoordinator {
    fn default() -> Self {
        Self::new(NetworkId::Ethereum, Arc::new(TracingObserver))
    }
}

impl ChainTransactionCoordinator {
    /// Creates a coordinator with every network Idle.
    pub fn new(active: NetworkId, observer: Arc<dyn TxObserver>) -> Self {
        let states =
            NetworkId::ALL.into_iter().map(|id| (id, TransactionState::default())).collect();
        Self { active, states, settle_delays: BTreeMap::new(), observer }
    }

    /// Creates a coordinator from the active network and settle delay overrides in `config`.
    pub fn from_config(config: &VaultConfig, observer: Arc<dyn TxObserver>) -> Self {
        let mut coordinator = Self::new(config.active_network, observer);
        coordinator.settle_delays.extend(config.settle_delay_overrides());
        coordinator
    }

    /// Overrides the settle delay of `network`.
    pub fn with_settle_delay(mut self, network: NetworkId, delay: Duration) -> Self {
        self.settle_delays.insert(network, delay);
        self
    }

    pub fn active_network(&self) -> NetworkId {
        self.active
    }

    /// Returns a snapshot of `network`'s state.
    pub fn state(&self, network: NetworkId) -> TransactionState {
        self.states.get(&network).cloned().unwrap_or_default()
    }

    /// Wait between confirmation and the refresh signal on `network`.
    pub fn settle_delay(&self, network: NetworkId) -> Duration {
        self.settle_delays.get(&network).copied().unwrap_or_else(|| network.default_settle_delay())
    }

    pub fn settle_delay_ms(&self, network: NetworkId) -> u64 {
        u64::try_from(self.settle_delay(network).as_millis()).unwrap_or(u64::MAX)
    }

    /// Starts the pre-flight checks of a new operation.
    ///
    /// Clears the previous error and refresh flag.
    pub fn begin_simulation(&mut self, network: NetworkId) -> Result<(), CoordinatorError> {
        self.ensure_active(network)?;
        let phase = self.slot(network).phase;
        if !phase.is_idle() {
            return Err(CoordinatorError::Busy { network, phase });
        }
        let state = self.slot(network);
        state.last_error = None;
        state.has_refreshed_since_confirmation = false;
        state.epoch += 1;
        self.transition(network, TxPhase::Simulating);
        Ok(())
    }

    /// Ends the operation because a pre-flight check failed. Nothing reached the network.
    pub fn fail_simulation(
        &mut self,
        network: NetworkId,
        error: TxError,
    ) -> Result<(), CoordinatorError> {
        self.ensure_active(network)?;
        self.expect_phase(network, &[TxPhase::Simulating], "fail simulation")?;
        self.fail(network, error);
        Ok(())
    }

    /// Records the handle of the submitted call.
    pub fn begin_submission(
        &mut self,
        network: NetworkId,
        handle: TxHandle,
    ) -> Result<(), CoordinatorError> {
        self.ensure_active(network)?;
        self.expect_phase(network, &[TxPhase::Simulating], "submit")?;
        self.slot(network).pending_handle = Some(handle);
        self.transition(network, TxPhase::Submitted);
        Ok(())
    }

    /// Records a submitted allowance approval as the tracked operation, linking it to the
    /// deposit that fires once it confirms.
    pub fn begin_approval(
        &mut self,
        network: NetworkId,
        approval: PendingApproval,
    ) -> Result<(), CoordinatorError> {
        self.ensure_active(network)?;
        self.expect_phase(network, &[TxPhase::Simulating], "submit approval")?;
        let state = self.slot(network);
        if state.pending_approval.is_some() {
            return Err(CoordinatorError::InvalidTransition {
                network,
                phase: TxPhase::Simulating,
                action: "submit a second approval",
            });
        }
        state.pending_handle = Some(approval.approval_handle);
        state.pending_approval = Some(approval);
        self.transition(network, TxPhase::Submitted);
        Ok(())
    }

    /// The watcher saw `handle` included.
    pub fn on_included(
        &mut self,
        network: NetworkId,
        handle: TxHandle,
    ) -> Result<(), CoordinatorError> {
        self.check_event(network, handle)?;
        self.expect_phase(network, &[TxPhase::Submitted], "mark included")?;
        self.transition(network, TxPhase::Confirming);
        Ok(())
    }

    /// `handle` reached finality.
    ///
    /// A confirmed approval hands its [`PendingApproval`] back and clears the slot, so the
    /// linked deposit fires at most once. Any other confirmation starts the settle delay.
    pub fn on_confirmed(
        &mut self,
        network: NetworkId,
        handle: TxHandle,
    ) -> Result<Confirmation, CoordinatorError> {
        self.check_event(network, handle)?;
        self.expect_phase(network, &[TxPhase::Submitted, TxPhase::Confirming], "confirm")?;

        let state = self.slot(network);
        if let Some(approval) =
            state.pending_approval.take_if(|approval| approval.approval_handle == handle)
        {
            state.pending_handle = None;
            self.transition(network, TxPhase::Simulating);
            self.emit(TxEvent::ApprovalConfirmed { network, approval: approval.clone() });
            return Ok(Confirmation::Approval(approval));
        }

        self.transition(network, TxPhase::Settling);
        Ok(Confirmation::Settling { delay: self.settle_delay(network) })
    }

    /// The settle delay elapsed: signal the refresh and return to Idle.
    pub fn on_settled(
        &mut self,
        network: NetworkId,
        handle: TxHandle,
    ) -> Result<(), CoordinatorError> {
        self.check_event(network, handle)?;
        self.expect_phase(network, &[TxPhase::Settling], "settle")?;
        let state = self.slot(network);
        state.pending_handle = None;
        state.has_refreshed_since_confirmation = true;
        self.transition(network, TxPhase::Idle);
        self.emit(TxEvent::RefreshRequested { network });
        Ok(())
    }

    /// Ends the operation with `error`.
    ///
    /// `handle` is `None` when the failure happened before a handle was obtained, e.g. the user
    /// declined to sign.
    pub fn on_failed(
        &mut self,
        network: NetworkId,
        handle: Option<TxHandle>,
        error: TxError,
    ) -> Result<(), CoordinatorError> {
        match handle {
            Some(handle) => self.check_event(network, handle)?,
            None => {
                if network != self.active {
                    return Err(self.drop_event(CoordinatorError::InactiveNetwork { network }));
                }
                let state = self.slot(network);
                if state.pending_handle.is_some() {
                    return Err(CoordinatorError::InvalidTransition {
                        network,
                        phase: state.phase,
                        action: "fail without the pending handle",
                    });
                }
            }
        }
        let phase = self.slot(network).phase;
        if phase.is_idle() {
            return Err(CoordinatorError::InvalidTransition { network, phase, action: "fail" });
        }
        self.fail(network, error);
        Ok(())
    }

    /// Makes `to` the active network.
    ///
    /// Both the old and the new network return to Idle with their handles and approval slots
    /// cleared. In-flight work on the old network is not cancelled; its events are dropped
    /// when they arrive.
    pub fn switch_network(&mut self, to: NetworkId) {
        let from = self.active;
        if from == to {
            return;
        }
        self.reset(from);
        self.reset(to);
        self.active = to;
        self.emit(TxEvent::NetworkSwitched { from, to });
    }

    /// Returns `network` to Idle.
    pub fn reset(&mut self, network: NetworkId) {
        let state = self.slot(network);
        let from = state.phase;
        state.reset();
        if !from.is_idle() {
            self.emit(TxEvent::PhaseChanged { network, from, to: TxPhase::Idle, handle: None });
        }
    }

    pub fn reset_all(&mut self) {
        for network in NetworkId::ALL {
            self.reset(network);
        }
    }

    fn slot(&mut self, network: NetworkId) -> &mut TransactionState {
        self.states.entry(network).or_default()
    }

    fn ensure_active(&self, network: NetworkId) -> Result<(), CoordinatorError> {
        if network == self.active {
            Ok(())
        } else {
            Err(CoordinatorError::InactiveNetwork { network })
        }
    }

    fn expect_phase(
        &mut self,
        network: NetworkId,
        allowed: &[TxPhase],
        action: &'static str,
    ) -> Result<(), CoordinatorError> {
        let phase = self.slot(network).phase;
        if allowed.contains(&phase) {
            Ok(())
        } else {
            Err(CoordinatorError::InvalidTransition { network, phase, action })
        }
    }

    /// Attribution check for handle-bearing events.
    fn check_event(
        &mut self,
        network: NetworkId,
        handle: TxHandle,
    ) -> Result<(), CoordinatorError> {
        if network != self.active {
            return Err(self.drop_event(CoordinatorError::InactiveNetwork { network }));
        }
        if self.slot(network).pending_handle != Some(handle) {
            return Err(self.drop_event(CoordinatorError::WrongNetworkEvent { network, handle }));
        }
        Ok(())
    }

    fn drop_event(&self, reason: CoordinatorError) -> CoordinatorError {
        let network = match &reason {
            CoordinatorError::Busy { network, .. }
            | CoordinatorError::InactiveNetwork { network }
            | CoordinatorError::WrongNetworkEvent { network, .. }
            | CoordinatorError::InvalidTransition { network, .. } => *network,
        };
        trace!(%network, active = %self.active, %reason, "ignoring event");
        self.emit(TxEvent::Dropped { network, reason: reason.clone() });
        reason
    }

    fn fail(&mut self, network: NetworkId, error: TxError) {
        let state = self.slot(network);
        state.pending_handle = None;
        state.pending_approval = None;
        state.last_error = Some(error.clone());
        self.transition(network, TxPhase::Idle);
        self.emit(TxEvent::Failed { network, error });
    }

    fn transition(&mut self, network: NetworkId, to: TxPhase) {
        let state = self.slot(network);
        let from = std::mem::replace(&mut state.phase, to);
        let handle = state.pending_handle;
        self.emit(TxEvent::PhaseChanged { network, from, to, handle });
    }

    fn emit(&self, event: TxEvent) {
        self.observer.on_event(&event);
    }
}
