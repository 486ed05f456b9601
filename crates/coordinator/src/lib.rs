//! # vault-coordinator
//!
//! Tracks the lifecycle of vault operations per network.
//!
//! [`ChainTransactionCoordinator`] is a synchronous state machine holding one
//! [`TransactionState`] per [`NetworkId`](vault_primitives::NetworkId). [`VaultSession`] drives
//! it against the collaborator traits in [`collaborators`]: it runs the pre-flight checks,
//! submits, waits for inclusion and finality, sleeps through the settle delay and lets the
//! coordinator signal the balance refresh.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod bindings;
pub mod collaborators;
pub use collaborators::{
    ContractCall, ContractCaller, Erc20Metadata, HandleWatcher, Inclusion, TokenMetadataSource,
};

mod coordinator;
pub use coordinator::{ChainTransactionCoordinator, Confirmation};

mod error;
pub use error::{CallError, CoordinatorError, SessionError, TxError};

mod observer;
pub use observer::{TracingObserver, TxEvent, TxObserver};

mod session;
pub use session::{Balance, Collaborators, MAX_BATCH_TOKENS, OperationOutcome, VaultSession};

mod state;
pub use state::{PendingApproval, TransactionState, TxPhase};
