//! Vault wallet primitives.
//!
//! Types shared by the amount codec, the configuration layer and the transaction coordinator.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod asset;
mod network;
mod transaction;

pub use asset::*;
pub use network::*;
pub use transaction::*;
