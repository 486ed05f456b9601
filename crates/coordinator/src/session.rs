use crate::{
    CallError, ChainTransactionCoordinator, Confirmation, ContractCall, ContractCaller,
    CoordinatorError, Erc20Metadata, HandleWatcher, PendingApproval, SessionError,
    TokenMetadataSource, TracingObserver, TransactionState, TxError, TxObserver,
    bindings::{IERC20, IVault},
};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use vault_config::VaultConfig;
use vault_primitives::{Asset, NATIVE_DECIMALS, NetworkId, TokenInfo, TxHandle};
use vault_units::{AmountInput, BaseUnits, format_for_display, to_base_units};

/// Symbol shown for tokens whose metadata cannot be read.
const UNKNOWN_SYMBOL: &str = "ERC20";

/// The external services a [`VaultSession`] drives.
#[derive(Clone)]
pub struct Collaborators {
    pub caller: Arc<dyn ContractCaller>,
    pub watcher: Arc<dyn HandleWatcher>,
    pub metadata: Arc<dyn TokenMetadataSource>,
}

impl Collaborators {
    /// Reads token metadata through `caller`.
    pub fn new(caller: Arc<dyn ContractCaller>, watcher: Arc<dyn HandleWatcher>) -> Self {
        let metadata = Arc::new(Erc20Metadata::new(caller.clone()));
        Self { caller, watcher, metadata }
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn TokenMetadataSource>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// How an operation ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Confirmed, settled, and the refresh signal fired.
    Settled { handle: TxHandle },
    /// The network was switched or reset while in flight; the result was discarded.
    Superseded { handle: Option<TxHandle> },
}

impl OperationOutcome {
    pub fn handle(&self) -> Option<TxHandle> {
        match self {
            Self::Settled { handle } => Some(*handle),
            Self::Superseded { handle } => *handle,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }
}

/// A balance read from the chain, with its display string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Balance {
    pub asset: Asset,
    pub symbol: String,
    pub decimals: u8,
    pub amount: BaseUnits,
    pub display: String,
}

/// Most tokens a single batch operation may move.
pub const MAX_BATCH_TOKENS: usize = 5;

/// One asset of an operation, amount in base units.
#[derive(Clone, Debug)]
struct Entry {
    asset: Asset,
    amount: U256,
    symbol: String,
}

#[derive(Clone, Copy, Debug)]
enum Action {
    Deposit,
    Withdraw,
    Transfer { to: Address },
}

#[derive(Clone, Debug)]
enum Assets {
    Single(Entry),
    /// Tokens only; moved by one `*MultipleTokens*` call.
    Batch(Vec<Entry>),
}

impl Assets {
    fn entries(&self) -> &[Entry] {
        match self {
            Self::Single(entry) => std::slice::from_ref(entry),
            Self::Batch(entries) => entries,
        }
    }
}

#[derive(Clone, Debug)]
struct Operation {
    action: Action,
    assets: Assets,
}

#[derive(Debug)]
enum Plan {
    Submit(ContractCall),
    Approve { call: ContractCall, token: Address, amount: U256, symbol: String },
}

enum Tracked {
    Settled,
    Superseded,
    Approved(PendingApproval),
}

/// Vault operations for one wallet owner.
///
/// Every operation runs the whole lifecycle on the active network: pre-flight checks,
/// submission, inclusion, finality, settle delay and refresh. The coordinator is shared between
/// clones, so a network switch made through any clone supersedes operations running on others.
#[derive(Clone)]
pub struct VaultSession {
    owner: Address,
    config: Arc<VaultConfig>,
    coordinator: Arc<Mutex<ChainTransactionCoordinator>>,
    caller: Arc<dyn ContractCaller>,
    watcher: Arc<dyn HandleWatcher>,
    metadata: Arc<dyn TokenMetadataSource>,
}

impl VaultSession {
    /// Creates a session reporting to `tracing`.
    pub fn new(owner: Address, config: VaultConfig, collaborators: Collaborators) -> Self {
        Self::with_observer(owner, config, collaborators, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        owner: Address,
        config: VaultConfig,
        collaborators: Collaborators,
        observer: Arc<dyn TxObserver>,
    ) -> Self {
        let coordinator = ChainTransactionCoordinator::from_config(&config, observer);
        let Collaborators { caller, watcher, metadata } = collaborators;
        Self {
            owner,
            config: Arc::new(config),
            coordinator: Arc::new(Mutex::new(coordinator)),
            caller,
            watcher,
            metadata,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn active_network(&self) -> NetworkId {
        self.coordinator.lock().active_network()
    }

    pub fn state(&self, network: NetworkId) -> TransactionState {
        self.coordinator.lock().state(network)
    }

    /// Switches the active network. Operations running on the old one are superseded.
    pub fn switch_network(&self, to: NetworkId) {
        self.coordinator.lock().switch_network(to);
    }

    /// Deposits `amount` of `asset` from the wallet into the vault.
    ///
    /// A token deposit whose allowance is short first approves exactly `amount` and fires the
    /// deposit once the approval confirms.
    pub async fn deposit(
        &self,
        asset: Asset,
        amount: impl Into<AmountInput>,
    ) -> Result<OperationOutcome, SessionError> {
        self.single(Action::Deposit, asset, amount.into()).await
    }

    /// Withdraws `amount` of `asset` from the vault to the wallet.
    pub async fn withdraw(
        &self,
        asset: Asset,
        amount: impl Into<AmountInput>,
    ) -> Result<OperationOutcome, SessionError> {
        self.single(Action::Withdraw, asset, amount.into()).await
    }

    /// Moves `amount` of `asset` to another vault account without leaving the vault.
    pub async fn transfer_internal(
        &self,
        asset: Asset,
        to: Address,
        amount: impl Into<AmountInput>,
    ) -> Result<OperationOutcome, SessionError> {
        self.single(Action::Transfer { to }, asset, amount.into()).await
    }

    /// Deposits up to [`MAX_BATCH_TOKENS`] tokens in one submission.
    ///
    /// Every token whose allowance is short is approved first, one tracked approval at a time.
    pub async fn deposit_batch<A: Into<AmountInput>>(
        &self,
        amounts: impl IntoIterator<Item = (Address, A)>,
    ) -> Result<OperationOutcome, SessionError> {
        self.batch(Action::Deposit, collect_amounts(amounts)).await
    }

    /// Withdraws up to [`MAX_BATCH_TOKENS`] tokens in one submission.
    pub async fn withdraw_batch<A: Into<AmountInput>>(
        &self,
        amounts: impl IntoIterator<Item = (Address, A)>,
    ) -> Result<OperationOutcome, SessionError> {
        self.batch(Action::Withdraw, collect_amounts(amounts)).await
    }

    /// Moves up to [`MAX_BATCH_TOKENS`] tokens to `to` inside the vault in one submission.
    pub async fn transfer_internal_batch<A: Into<AmountInput>>(
        &self,
        to: Address,
        amounts: impl IntoIterator<Item = (Address, A)>,
    ) -> Result<OperationOutcome, SessionError> {
        self.batch(Action::Transfer { to }, collect_amounts(amounts)).await
    }

    /// The owner's vault balances on the active network, native coin first.
    pub async fn vault_balances(&self) -> Result<Vec<Balance>, SessionError> {
        let network = self.active_network();
        let vault = self.vault(network)?;

        let native = self
            .read(network, vault, &IVault::balanceOfCall { user: self.owner, token: Address::ZERO })
            .await?;
        let IVault::getMyVaultedTokensReturn { tokens, amounts } =
            self.read(network, vault, &IVault::getMyVaultedTokensCall { user: self.owner }).await?;
        if tokens.len() != amounts.len() {
            return Err(CallError::Decode {
                signature: IVault::getMyVaultedTokensCall::SIGNATURE,
                reason: format!("{} tokens but {} amounts", tokens.len(), amounts.len()),
            }
            .into());
        }

        let mut balances = Vec::with_capacity(tokens.len() + 1);
        balances.push(self.balance(network, Asset::Native, native).await?);
        for (token, amount) in tokens.into_iter().zip(amounts) {
            if token.is_zero() {
                continue;
            }
            balances.push(self.balance(network, Asset::Token(token), amount).await?);
        }
        Ok(balances)
    }

    /// The owner's wallet balance of `asset` on the active network.
    pub async fn wallet_balance(&self, asset: Asset) -> Result<Balance, SessionError> {
        let network = self.active_network();
        let amount = self.wallet_amount(network, asset).await?;
        self.balance(network, asset, amount).await
    }

    async fn single(
        &self,
        action: Action,
        asset: Asset,
        amount: AmountInput,
    ) -> Result<OperationOutcome, SessionError> {
        let network = self.active_network();
        let vault = self.vault(network)?;
        let entry = self.entry(network, asset, amount).await?;
        self.run(network, vault, Operation { action, assets: Assets::Single(entry) }).await
    }

    async fn batch(
        &self,
        action: Action,
        amounts: Vec<(Address, AmountInput)>,
    ) -> Result<OperationOutcome, SessionError> {
        let network = self.active_network();
        let vault = self.vault(network)?;
        let mut entries = Vec::with_capacity(amounts.len());
        for (token, amount) in amounts {
            entries.push(self.entry(network, Asset::Token(token), amount).await?);
        }
        self.run(network, vault, Operation { action, assets: Assets::Batch(entries) }).await
    }

    async fn entry(
        &self,
        network: NetworkId,
        asset: Asset,
        amount: AmountInput,
    ) -> Result<Entry, SessionError> {
        let token = self.token_info(network, asset).await;
        let amount = parse_amount(amount, token.decimals)?;
        Ok(Entry { asset, amount, symbol: token.symbol })
    }

    async fn run(
        &self,
        network: NetworkId,
        vault: Address,
        operation: Operation,
    ) -> Result<OperationOutcome, SessionError> {
        let epoch = {
            let mut coordinator = self.coordinator.lock();
            coordinator.begin_simulation(network)?;
            coordinator.state(network).epoch()
        };
        debug!(%network, ?operation, "simulating");

        // Confirmed approvals of this operation, by token.
        let mut approved = BTreeMap::new();
        loop {
            let plan = match self.simulate(network, vault, &operation, &approved).await {
                Ok(plan) => plan,
                Err(error) => {
                    debug!(%network, %error, "pre-flight check failed");
                    let applied = self.before_handle(network, epoch, |c| {
                        c.fail_simulation(network, error.clone())
                    })?;
                    return match applied {
                        Some(()) => Err(error.into()),
                        None => Ok(OperationOutcome::Superseded { handle: None }),
                    };
                }
            };

            let (call, approval) = match plan {
                Plan::Submit(call) => (call, None),
                Plan::Approve { call, token, amount, symbol } => {
                    (call, Some((token, amount, symbol)))
                }
            };

            let handle = match self.caller.submit(network, &call).await {
                Ok(handle) => handle,
                Err(err) => {
                    let error = TxError::submission(err);
                    let applied = self.before_handle(network, epoch, |c| {
                        c.on_failed(network, None, error.clone())
                    })?;
                    return match applied {
                        Some(()) => Err(error.into()),
                        None => Ok(OperationOutcome::Superseded { handle: None }),
                    };
                }
            };
            info!(%network, %handle, signature = call.signature, "submitted");

            let applied = self.before_handle(network, epoch, |c| match approval {
                Some((token, amount, symbol)) => c.begin_approval(
                    network,
                    PendingApproval { token, amount, symbol, approval_handle: handle },
                ),
                None => c.begin_submission(network, handle),
            })?;
            if applied.is_none() {
                return Ok(OperationOutcome::Superseded { handle: Some(handle) });
            }

            match self.track(network, handle).await? {
                Tracked::Settled => return Ok(OperationOutcome::Settled { handle }),
                Tracked::Superseded => {
                    return Ok(OperationOutcome::Superseded { handle: Some(handle) });
                }
                Tracked::Approved(approval) => {
                    debug!(%network, token = %approval.token, "approval confirmed, resuming");
                    approved.insert(approval.token, approval.amount);
                }
            }
        }
    }

    /// Follows `handle` from inclusion to the refresh signal.
    async fn track(&self, network: NetworkId, handle: TxHandle) -> Result<Tracked, SessionError> {
        let inclusion = self.watcher.await_inclusion(network, handle).await;
        if !inclusion.included {
            let reason = inclusion.error.unwrap_or_else(|| "not included".to_string());
            return self.fail_tracked(network, handle, TxError::SubmissionFailed(reason));
        }
        if self.apply_event(|c| c.on_included(network, handle))?.is_none() {
            return Ok(Tracked::Superseded);
        }

        if let Err(err) = self.watcher.await_finality(network, handle).await {
            return self.fail_tracked(network, handle, TxError::submission(err));
        }
        let Some(confirmation) = self.apply_event(|c| c.on_confirmed(network, handle))? else {
            return Ok(Tracked::Superseded);
        };

        match confirmation {
            Confirmation::Approval(approval) => Ok(Tracked::Approved(approval)),
            Confirmation::Settling { delay } => {
                debug!(%network, %handle, ?delay, "waiting for read paths to settle");
                tokio::time::sleep(delay).await;
                match self.apply_event(|c| c.on_settled(network, handle))? {
                    Some(()) => Ok(Tracked::Settled),
                    None => Ok(Tracked::Superseded),
                }
            }
        }
    }

    fn fail_tracked(
        &self,
        network: NetworkId,
        handle: TxHandle,
        error: TxError,
    ) -> Result<Tracked, SessionError> {
        match self.apply_event(|c| c.on_failed(network, Some(handle), error.clone()))? {
            Some(()) => Err(error.into()),
            None => Ok(Tracked::Superseded),
        }
    }

    /// Applies a transition that has no handle to attribute it by.
    ///
    /// Returns `None` when the operation that started under `epoch` no longer owns the state.
    fn before_handle<R>(
        &self,
        network: NetworkId,
        epoch: u64,
        f: impl FnOnce(&mut ChainTransactionCoordinator) -> Result<R, CoordinatorError>,
    ) -> Result<Option<R>, SessionError> {
        let mut coordinator = self.coordinator.lock();
        if coordinator.active_network() != network || coordinator.state(network).epoch() != epoch {
            debug!(%network, epoch, "operation superseded");
            return Ok(None);
        }
        Ok(Some(f(&mut coordinator)?))
    }

    /// Applies a handle event; stale events yield `None`.
    fn apply_event<R>(
        &self,
        f: impl FnOnce(&mut ChainTransactionCoordinator) -> Result<R, CoordinatorError>,
    ) -> Result<Option<R>, SessionError> {
        match f(&mut self.coordinator.lock()) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_dropped_event() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn simulate(
        &self,
        network: NetworkId,
        vault: Address,
        operation: &Operation,
        approved: &BTreeMap<Address, U256>,
    ) -> Result<Plan, TxError> {
        let entries = operation.assets.entries();
        if let Assets::Batch(entries) = &operation.assets {
            check_batch(entries)?;
        }
        for entry in entries {
            non_zero(entry.amount)?;
        }

        match operation.action {
            Action::Deposit => {
                for entry in entries {
                    if entry.asset.is_native() {
                        let fee = self.read(network, vault, &IVault::getCurrentFeeCall {}).await?;
                        if entry.amount <= fee {
                            return Err(TxError::AmountMustExceedFee { amount: entry.amount, fee });
                        }
                    }
                    covers(entry.amount, self.wallet_amount(network, entry.asset).await?)?;
                }
                for entry in entries {
                    if let Some(plan) = self.approval(network, vault, entry, approved).await? {
                        return Ok(plan);
                    }
                }
            }
            Action::Withdraw => {
                for entry in entries {
                    covers(entry.amount, self.vault_amount(network, vault, entry.asset).await?)?;
                }
            }
            Action::Transfer { to } => {
                if to.is_zero() || to == self.owner {
                    return Err(TxError::InvalidRecipient(to));
                }
                for entry in entries {
                    covers(entry.amount, self.vault_amount(network, vault, entry.asset).await?)?;
                }
            }
        }
        Ok(Plan::Submit(vault_call(vault, operation)))
    }

    /// Plans an approval of exactly `entry.amount` when the vault's allowance falls short.
    ///
    /// Tokens approved earlier in the same operation are not read again: the allowance read
    /// may lag behind the confirmed approval.
    async fn approval(
        &self,
        network: NetworkId,
        vault: Address,
        entry: &Entry,
        approved: &BTreeMap<Address, U256>,
    ) -> Result<Option<Plan>, TxError> {
        let Some(token) = entry.asset.token() else { return Ok(None) };
        let amount = entry.amount;

        let allowance = match approved.get(&token) {
            Some(granted) => *granted,
            None => {
                let call = IERC20::allowanceCall { owner: self.owner, spender: vault };
                self.read(network, token, &call).await?
            }
        };
        if allowance >= amount {
            return Ok(None);
        }
        if approved.contains_key(&token) {
            return Err(TxError::InsufficientAllowance { required: amount, allowance });
        }

        debug!(%network, %token, %allowance, %amount, "allowance too low, approving");
        let call = IERC20::approveCall { spender: vault, amount };
        Ok(Some(Plan::Approve {
            call: ContractCall::new(token, &call),
            token,
            amount,
            symbol: entry.symbol.clone(),
        }))
    }

    async fn read<C: SolCall>(
        &self,
        network: NetworkId,
        to: Address,
        call: &C,
    ) -> Result<C::Return, CallError> {
        let call = ContractCall::new(to, call);
        let output = self.caller.call(network, &call).await?;
        call.decode::<C>(&output)
    }

    async fn wallet_amount(&self, network: NetworkId, asset: Asset) -> Result<U256, CallError> {
        match asset.token() {
            None => self.caller.native_balance(network, self.owner).await,
            Some(token) => {
                self.read(network, token, &IERC20::balanceOfCall { owner: self.owner }).await
            }
        }
    }

    async fn vault_amount(
        &self,
        network: NetworkId,
        vault: Address,
        asset: Asset,
    ) -> Result<U256, CallError> {
        let call = IVault::balanceOfCall { user: self.owner, token: asset.vault_key() };
        self.read(network, vault, &call).await
    }

    async fn balance(
        &self,
        network: NetworkId,
        asset: Asset,
        amount: U256,
    ) -> Result<Balance, SessionError> {
        let TokenInfo { symbol, decimals, .. } = self.token_info(network, asset).await;
        let amount = BaseUnits::from(amount);
        let display =
            format_for_display(&amount, u32::from(decimals), &self.config.display_options())?;
        Ok(Balance { asset, symbol, decimals, amount, display })
    }

    /// Resolves symbol and decimals: native coin, then the configured token list, then the
    /// metadata source with the configured fallbacks.
    async fn token_info(&self, network: NetworkId, asset: Asset) -> TokenInfo {
        let Some(token) = asset.token() else {
            return TokenInfo::new(Address::ZERO, network.native_symbol(), NATIVE_DECIMALS);
        };
        if let Some(info) = self.config.token(network, token) {
            return info.clone();
        }

        let decimals = match self.metadata.decimals_of(network, token).await {
            Ok(decimals) => decimals,
            Err(err) => {
                let fallback = self.config.default_decimals;
                warn!(%network, %token, %err, fallback, "failed to read token decimals");
                fallback
            }
        };
        let symbol = match self.metadata.symbol_of(network, token).await {
            Ok(symbol) => symbol,
            Err(err) => {
                warn!(%network, %token, %err, "failed to read token symbol");
                UNKNOWN_SYMBOL.to_string()
            }
        };
        TokenInfo::new(token, symbol, decimals)
    }

    fn vault(&self, network: NetworkId) -> Result<Address, SessionError> {
        self.config.vault_address(network).ok_or(SessionError::MissingVault(network))
    }
}

fn collect_amounts<A: Into<AmountInput>>(
    amounts: impl IntoIterator<Item = (Address, A)>,
) -> Vec<(Address, AmountInput)> {
    amounts.into_iter().map(|(token, amount)| (token, amount.into())).collect()
}

/// The vault call carrying out a fully checked `operation`.
fn vault_call(vault: Address, operation: &Operation) -> ContractCall {
    let entry = match &operation.assets {
        Assets::Single(entry) => entry,
        Assets::Batch(entries) => {
            let (tokens, amounts): (Vec<_>, Vec<_>) =
                entries.iter().map(|entry| (entry.asset.vault_key(), entry.amount)).unzip();
            return match operation.action {
                Action::Deposit => ContractCall::new(
                    vault,
                    &IVault::depositMultipleTokensCall { tokens, amounts },
                ),
                Action::Withdraw => ContractCall::new(
                    vault,
                    &IVault::withdrawMultipleTokensCall { tokens, amounts },
                ),
                Action::Transfer { to } => ContractCall::new(
                    vault,
                    &IVault::transferMultipleTokensInternalCall { to, tokens, amounts },
                ),
            };
        }
    };

    let amount = entry.amount;
    match (operation.action, entry.asset.token()) {
        (Action::Deposit, None) => {
            ContractCall::new(vault, &IVault::depositNativeCall {}).with_value(amount)
        }
        (Action::Deposit, Some(token)) => {
            ContractCall::new(vault, &IVault::depositTokenCall { token, amount })
        }
        (Action::Withdraw, None) => {
            ContractCall::new(vault, &IVault::withdrawNativeCall { amount })
        }
        (Action::Withdraw, Some(token)) => {
            ContractCall::new(vault, &IVault::withdrawTokenCall { token, amount })
        }
        (Action::Transfer { to }, None) => {
            ContractCall::new(vault, &IVault::transferInternalNativeCall { to, amount })
        }
        (Action::Transfer { to }, Some(token)) => {
            ContractCall::new(vault, &IVault::transferInternalTokenCall { token, to, amount })
        }
    }
}

/// Batches move 1 to [`MAX_BATCH_TOKENS`] distinct tokens.
fn check_batch(entries: &[Entry]) -> Result<(), TxError> {
    if entries.is_empty() || entries.len() > MAX_BATCH_TOKENS {
        return Err(TxError::InvalidBatch(format!(
            "expected 1 to {MAX_BATCH_TOKENS} tokens, got {}",
            entries.len()
        )));
    }
    let mut seen = BTreeSet::new();
    for entry in entries {
        let token = entry.asset.vault_key();
        if !seen.insert(token) {
            return Err(TxError::InvalidBatch(format!("token {token} is listed twice")));
        }
    }
    Ok(())
}

fn parse_amount(amount: AmountInput, decimals: u8) -> Result<U256, SessionError> {
    Ok(to_base_units(amount, u32::from(decimals))?.to_u256()?)
}

fn non_zero(amount: U256) -> Result<U256, TxError> {
    if amount.is_zero() { Err(TxError::ZeroAmount) } else { Ok(amount) }
}

fn covers(required: U256, available: U256) -> Result<(), TxError> {
    if available < required {
        return Err(TxError::InsufficientBalance { required, available });
    }
    Ok(())
}
