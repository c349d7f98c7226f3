use crate::coins::{Address, Coin};
use serde::Serialize;

/// Notifications emitted by committed staking operations.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    CompleteUnbonding {
        delegator: Address,
        validator: Address,
        amount: Vec<Coin>,
    },
    CompleteRedelegation {
        delegator: Address,
        src_validator: Address,
        dst_validator: Address,
        amount: Vec<Coin>,
    },
    DelegationModified {
        delegator: Address,
        validator: Address,
    },
    ValidatorJailed {
        validator: Address,
    },
    ValidatorRemoved {
        validator: Address,
    },
    ValidatorScheduledToUnbond {
        validator: Address,
        height: u64,
        start_time: u64,
    },
    ValidatorUnscheduled {
        validator: Address,
    },
    ForcedUnbond {
        validator: Address,
        delegator: Address,
        amount: Coin,
    },
}
