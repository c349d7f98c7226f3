//! A dual-class proof-of-stake staking ledger.
//!
//! Delegators bond bonding tokens and liquidity tokens to validators in
//! exchange for pool shares, unbond them through time-indexed maturity
//! queues and vote on governance proposals with the resulting stake.

pub mod coins;
pub mod collections;
pub mod encoding;
mod error;
pub mod gov;
mod state_machine;
pub mod store;

pub use error::*;
pub use state_machine::*;
