//! Interfaces to the wallet connection and the chain.
//!
//! The coordinator never talks to a node itself: reads, submissions and inclusion waits go
//! through these traits so that real RPC clients and test doubles are interchangeable.

use crate::{CallError, bindings::IERC20};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;
use vault_primitives::{NetworkId, TxHandle};

/// An encoded contract call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    /// Human-readable signature, e.g. `balanceOf(address)`.
    pub signature: &'static str,
    pub input: Bytes,
    /// Native coin attached to the call, in base units.
    pub value: U256,
}

impl ContractCall {
    pub fn new<C: SolCall>(to: Address, call: &C) -> Self {
        Self { to, signature: C::SIGNATURE, input: call.abi_encode().into(), value: U256::ZERO }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Decodes the raw result of this call as `C`'s return value.
    pub fn decode<C: SolCall>(&self, output: &[u8]) -> Result<C::Return, CallError> {
        C::abi_decode_returns(output)
            .map_err(|err| CallError::Decode { signature: self.signature, reason: err.to_string() })
    }
}

/// Reads and writes contracts on behalf of the connected wallet.
///
/// Balance-like reads return raw base-unit integers, never pre-rounded decimals.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Executes a read-only call and returns the raw output.
    async fn call(&self, network: NetworkId, call: &ContractCall) -> Result<Bytes, CallError>;

    /// Signs and broadcasts `call`, returning its handle.
    async fn submit(&self, network: NetworkId, call: &ContractCall)
    -> Result<TxHandle, CallError>;

    /// Native coin balance of `owner`, in base units.
    async fn native_balance(&self, network: NetworkId, owner: Address) -> Result<U256, CallError>;
}

/// Outcome of waiting for a handle's inclusion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inclusion {
    pub included: bool,
    pub error: Option<String>,
}

impl Inclusion {
    pub fn included() -> Self {
        Self { included: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { included: false, error: Some(error.into()) }
    }
}

/// Watches submitted handles. Timeouts are the watcher's business and surface as errors.
#[async_trait]
pub trait HandleWatcher: Send + Sync {
    async fn await_inclusion(&self, network: NetworkId, handle: TxHandle) -> Inclusion;

    /// Resolves once `handle` is past the network's required confirmations.
    async fn await_finality(&self, network: NetworkId, handle: TxHandle) -> Result<(), CallError> {
        let _ = (network, handle);
        Ok(())
    }
}

/// ERC20 metadata lookups.
#[async_trait]
pub trait TokenMetadataSource: Send + Sync {
    async fn decimals_of(&self, network: NetworkId, token: Address) -> Result<u8, CallError>;

    async fn symbol_of(&self, network: NetworkId, token: Address) -> Result<String, CallError>;
}

/// Reads token metadata from the token contract itself.
#[derive(Clone)]
pub struct Erc20Metadata {
    caller: Arc<dyn ContractCaller>,
}

impl Erc20Metadata {
    pub fn new(caller: Arc<dyn ContractCaller>) -> Self {
        Self { caller }
    }
}

#[async_trait]
impl TokenMetadataSource for Erc20Metadata {
    async fn decimals_of(&self, network: NetworkId, token: Address) -> Result<u8, CallError> {
        let call = ContractCall::new(token, &IERC20::decimalsCall {});
        let output = self.caller.call(network, &call).await?;
        call.decode::<IERC20::decimalsCall>(&output)
    }

    async fn symbol_of(&self, network: NetworkId, token: Address) -> Result<String, CallError> {
        let call = ContractCall::new(token, &IERC20::symbolCall {});
        let output = self.caller.call(network, &call).await?;
        call.decode::<IERC20::symbolCall>(&output)
    }
}
